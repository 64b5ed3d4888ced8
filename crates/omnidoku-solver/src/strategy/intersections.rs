use crate::{CandidateState, SolverError, StrategyKind, strategy::Strategy};

/// Locked candidates, pointing form.
///
/// When every candidate of a digit inside a box lies on a single row or
/// column, the digit can be removed from the rest of that line outside the
/// box. Covers pointing pairs and triples alike (and longer runs on wide
/// boxes).
#[derive(Debug, Default, Clone, Copy)]
pub struct PointingPairs;

impl PointingPairs {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for PointingPairs {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PointingPairs
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let topo = std::sync::Arc::clone(state.topology());
        let n = usize::from(topo.n());
        let mut changed = false;

        for box_idx in 0..n {
            let house = topo.box_house(box_idx);
            let placed = state.house_placed_digits(house);
            for digit in placed.complement(topo.n()) {
                let mask = state.house_candidate_mask(house, digit);
                if mask == 0 || mask & (mask - 1) == 0 {
                    continue; // hidden single territory, not ours
                }
                let cells = topo.house(house);
                let mut rows = 0u64;
                let mut cols = 0u64;
                let mut slots = mask;
                while slots != 0 {
                    let slot = slots.trailing_zeros() as usize;
                    slots &= slots - 1;
                    let idx = usize::from(cells[slot]);
                    rows |= 1 << topo.row_of(idx);
                    cols |= 1 << topo.col_of(idx);
                }
                if rows & (rows - 1) == 0 {
                    let row = rows.trailing_zeros() as usize;
                    for &idx in topo.house(topo.row_house(row)) {
                        let idx = usize::from(idx);
                        if topo.box_of(idx) != box_idx {
                            changed |= state.eliminate(idx, digit);
                        }
                    }
                }
                if cols & (cols - 1) == 0 {
                    let col = cols.trailing_zeros() as usize;
                    for &idx in topo.house(topo.col_house(col)) {
                        let idx = usize::from(idx);
                        if topo.box_of(idx) != box_idx {
                            changed |= state.eliminate(idx, digit);
                        }
                    }
                }
            }
        }
        Ok(changed)
    }
}

/// Locked candidates, claiming form (box/line reduction).
///
/// When every candidate of a digit inside a row or column lies in a single
/// box, the digit can be removed from the rest of that box.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoxLineReduction;

impl BoxLineReduction {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for BoxLineReduction {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BoxLineReduction
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let topo = std::sync::Arc::clone(state.topology());
        let n = usize::from(topo.n());
        let mut changed = false;

        for line in 0..2 * n {
            let house = line; // rows 0..n, then columns n..2n
            let placed = state.house_placed_digits(house);
            for digit in placed.complement(topo.n()) {
                let mask = state.house_candidate_mask(house, digit);
                if mask == 0 || mask & (mask - 1) == 0 {
                    continue;
                }
                let cells = topo.house(house);
                let mut boxes = 0u64;
                let mut slots = mask;
                while slots != 0 {
                    let slot = slots.trailing_zeros() as usize;
                    slots &= slots - 1;
                    boxes |= 1 << topo.box_of(usize::from(cells[slot]));
                }
                if boxes & (boxes - 1) != 0 {
                    continue;
                }
                let box_idx = boxes.trailing_zeros() as usize;
                let in_row = line < n;
                for &idx in topo.house(topo.box_house(box_idx)) {
                    let idx = usize::from(idx);
                    let on_line = if in_row {
                        topo.row_of(idx) == line
                    } else {
                        topo.col_of(idx) == line - n
                    };
                    if !on_line {
                        changed |= state.eliminate(idx, digit);
                    }
                }
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use omnidoku_core::Topology;

    use super::*;
    use crate::{CandidateState, testing::StrategyTester};

    #[test]
    fn test_pointing_pair_eliminates_along_row() {
        let mut state = CandidateState::new_empty(Topology::shared(3, 3).unwrap());
        // Confine 5 in box 0 to row 0 (cells 0, 1, 2).
        for idx in [9, 10, 11, 18, 19, 20] {
            state.eliminate(idx, 5);
        }

        StrategyTester::new(state)
            .apply_once(&PointingPairs::new())
            .assert_removed_includes(3, [5])
            .assert_removed_includes(8, [5])
            .assert_no_change(27);
    }

    #[test]
    fn test_pointing_works_on_asymmetric_boxes() {
        // 2x3 boxes: box 0 covers rows 0-1, cols 0-2.
        let mut state = CandidateState::new_empty(Topology::shared(2, 3).unwrap());
        // Confine 4 in box 0 to row 1 (cells 6, 7, 8).
        for idx in [0, 1, 2] {
            state.eliminate(idx, 4);
        }

        StrategyTester::new(state)
            .apply_once(&PointingPairs::new())
            .assert_removed_includes(9, [4])
            .assert_removed_includes(11, [4]);
    }

    #[test]
    fn test_box_line_reduction_clears_rest_of_box() {
        let mut state = CandidateState::new_empty(Topology::shared(3, 3).unwrap());
        // Confine 3 in row 0 to box 0 (cells 0, 1, 2).
        for col in 3..9 {
            state.eliminate(col, 3);
        }

        StrategyTester::new(state)
            .apply_once(&BoxLineReduction::new())
            .assert_removed_includes(9, [3])
            .assert_removed_includes(20, [3])
            .assert_no_change(3);
    }

    #[test]
    fn test_no_progress_on_open_grid() {
        let state = CandidateState::new_empty(Topology::shared(3, 3).unwrap());
        StrategyTester::new(state)
            .apply_none(&PointingPairs::new())
            .apply_none(&BoxLineReduction::new());
    }
}
