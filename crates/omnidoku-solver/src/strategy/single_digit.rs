//! Single-digit patterns built from strong links: Skyscraper, 2-String
//! Kite and Empty Rectangle.

use crate::{
    CandidateState, SolverError, StrategyKind,
    strategy::{Strategy, eliminate_from_cells},
};

/// Lines (rows when `transposed` is false) holding exactly two candidates of
/// a digit, with the cross-line mask of each.
fn strong_lines(state: &CandidateState, digit: u8, transposed: bool) -> Vec<(usize, u64)> {
    let topo = state.topology();
    let n = usize::from(topo.n());
    (0..n)
        .filter_map(|line| {
            let house = if transposed {
                topo.col_house(line)
            } else {
                topo.row_house(line)
            };
            let mask = state.house_candidate_mask(house, digit);
            (mask.count_ones() == 2).then_some((line, mask))
        })
        .collect()
}

fn two_crosses(mask: u64) -> (usize, usize) {
    let first = mask.trailing_zeros() as usize;
    let rest = mask & (mask - 1);
    (first, rest.trailing_zeros() as usize)
}

/// Skyscraper: two lines each holding a digit exactly twice, sharing one
/// cross line. At least one of the two "roof" cells is true, so the digit
/// falls from every cell seeing both roofs.
#[derive(Debug, Default, Clone, Copy)]
pub struct Skyscraper;

impl Skyscraper {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn apply_orientation(state: &mut CandidateState, digit: u8, transposed: bool) -> bool {
        let links = strong_lines(state, digit, transposed);
        let topo = std::sync::Arc::clone(state.topology());
        let cell = |line: usize, cross: usize| {
            if transposed {
                topo.cell_index(cross, line)
            } else {
                topo.cell_index(line, cross)
            }
        };

        for (i, &(line_a, mask_a)) in links.iter().enumerate() {
            for &(line_b, mask_b) in &links[i + 1..] {
                let shared = mask_a & mask_b;
                if shared.count_ones() != 1 {
                    continue;
                }
                let roof_a_cross = (mask_a & !shared).trailing_zeros() as usize;
                let roof_b_cross = (mask_b & !shared).trailing_zeros() as usize;
                let roof_a = cell(line_a, roof_a_cross);
                let roof_b = cell(line_b, roof_b_cross);

                let mut targets = state.common_peers_of(&[roof_a, roof_b]);
                targets.intersect_with(&state.digit_cells(digit));
                // Stop at the first hit: the link table is stale once any
                // candidate falls.
                if eliminate_from_cells(state, &targets, digit) {
                    return true;
                }
            }
        }
        false
    }
}

impl Strategy for Skyscraper {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Skyscraper
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let mut changed = false;
        for digit in 1..=state.n() {
            changed |= Self::apply_orientation(state, digit, false);
            changed |= Self::apply_orientation(state, digit, true);
        }
        Ok(changed)
    }
}

/// 2-String Kite: a row strong link and a column strong link joined through
/// one box. The digit falls from the cell crossing the two free ends.
#[derive(Debug, Default, Clone, Copy)]
pub struct TwoStringKite;

impl TwoStringKite {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for TwoStringKite {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TwoStringKite
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let topo = std::sync::Arc::clone(state.topology());

        for digit in 1..=state.n() {
            let row_links = strong_lines(state, digit, false);
            let col_links = strong_lines(state, digit, true);

            for &(row, row_mask) in &row_links {
                let (col_a, col_b) = two_crosses(row_mask);
                for &(col, col_mask) in &col_links {
                    let (row_a, row_b) = two_crosses(col_mask);
                    // Links must not intersect.
                    if col == col_a || col == col_b || row == row_a || row == row_b {
                        continue;
                    }
                    for (near_col, far_col) in [(col_a, col_b), (col_b, col_a)] {
                        for (near_row, far_row) in [(row_a, row_b), (row_b, row_a)] {
                            let row_end = topo.cell_index(row, near_col);
                            let col_end = topo.cell_index(near_row, col);
                            if topo.box_of(row_end) != topo.box_of(col_end) {
                                continue;
                            }
                            let target = topo.cell_index(far_row, far_col);
                            // Stop at the first hit: the link tables are
                            // stale once any candidate falls.
                            if state.eliminate(target, digit) {
                                return Ok(true);
                            }
                        }
                    }
                }
            }
        }
        Ok(false)
    }
}

/// Empty Rectangle: a box whose candidates for a digit fit inside one row
/// and one column, combined with a strong link pointing at the hinge row or
/// column.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyRectangle;

impl EmptyRectangle {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for EmptyRectangle {
    fn kind(&self) -> StrategyKind {
        StrategyKind::EmptyRectangle
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let topo = std::sync::Arc::clone(state.topology());
        let n = usize::from(topo.n());

        for digit in 1..=state.n() {
            for box_idx in 0..n {
                let house = topo.box_house(box_idx);
                let box_cells: Vec<usize> = topo
                    .house(house)
                    .iter()
                    .map(|&idx| usize::from(idx))
                    .filter(|&idx| state.candidates(idx).contains(digit))
                    .collect();
                if box_cells.len() < 3 {
                    continue; // a 2-cell pattern is a plain strong link
                }
                let (row0, col0) = topo.box_origin(box_idx);
                let rows_used: Vec<usize> = (row0..row0 + usize::from(topo.box_rows()))
                    .filter(|&r| box_cells.iter().any(|&idx| topo.row_of(idx) == r))
                    .collect();
                let cols_used: Vec<usize> = (col0..col0 + usize::from(topo.box_cols()))
                    .filter(|&c| box_cells.iter().any(|&idx| topo.col_of(idx) == c))
                    .collect();

                for &hinge_row in &rows_used {
                    for &hinge_col in &cols_used {
                        let fits = box_cells.iter().all(|&idx| {
                            topo.row_of(idx) == hinge_row || topo.col_of(idx) == hinge_col
                        });
                        if !fits {
                            continue;
                        }
                        // Both arms must actually carry candidates.
                        let on_row = box_cells
                            .iter()
                            .any(|&idx| topo.row_of(idx) == hinge_row && topo.col_of(idx) != hinge_col);
                        let on_col = box_cells
                            .iter()
                            .any(|&idx| topo.col_of(idx) == hinge_col && topo.row_of(idx) != hinge_row);
                        if !on_row || !on_col {
                            continue;
                        }

                        // Column strong link with one end on the hinge row.
                        for &(col, col_mask) in &strong_lines(state, digit, true) {
                            if topo.box_of(topo.cell_index(hinge_row, col)) == box_idx {
                                continue;
                            }
                            let (row_a, row_b) = two_crosses(col_mask);
                            for (near, far) in [(row_a, row_b), (row_b, row_a)] {
                                if near == hinge_row
                                    && state.eliminate(topo.cell_index(far, hinge_col), digit)
                                {
                                    return Ok(true);
                                }
                            }
                        }
                        // Row strong link with one end on the hinge column.
                        for &(row, row_mask) in &strong_lines(state, digit, false) {
                            if topo.box_of(topo.cell_index(row, hinge_col)) == box_idx {
                                continue;
                            }
                            let (col_a, col_b) = two_crosses(row_mask);
                            for (near, far) in [(col_a, col_b), (col_b, col_a)] {
                                if near == hinge_col
                                    && state.eliminate(topo.cell_index(hinge_row, far), digit)
                                {
                                    return Ok(true);
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use omnidoku_core::Topology;

    use super::*;
    use crate::testing::StrategyTester;

    fn open_state() -> CandidateState {
        CandidateState::new_empty(Topology::shared(3, 3).unwrap())
    }

    #[test]
    fn test_skyscraper_eliminates_roof_watchers() {
        let mut state = open_state();
        // Digit 4: column 0 -> rows {1, 4}; column 4 -> rows {1, 5}. Base
        // in row 1, roofs at (4,0) and (5,4) in the same band.
        for row in 0..9 {
            if row != 1 && row != 4 {
                state.eliminate(row * 9, 4);
            }
            if row != 1 && row != 5 {
                state.eliminate(row * 9 + 4, 4);
            }
        }

        // Cells seeing both roofs: row 4 inside the roof box of (5,4), and
        // row 5 inside the roof box of (4,0).
        StrategyTester::new(state)
            .apply_once(&Skyscraper::new())
            .assert_removed_includes(4 * 9 + 3, [4])
            .assert_removed_includes(4 * 9 + 5, [4])
            .assert_removed_includes(5 * 9 + 1, [4])
            .assert_removed_includes(5 * 9 + 2, [4]);
    }

    #[test]
    fn test_two_string_kite_eliminates_crossing() {
        let mut state = open_state();
        // Digit 6: row 4 -> cols {3, 8}; column 5 -> rows {3, 8}.
        // (4,3) and (3,5) share box 4, so (8,8) falls.
        for col in 0..9 {
            if col != 3 && col != 8 {
                state.eliminate(4 * 9 + col, 6);
            }
        }
        for row in 0..9 {
            if row != 3 && row != 8 {
                state.eliminate(row * 9 + 5, 6);
            }
        }

        StrategyTester::new(state)
            .apply_once(&TwoStringKite::new())
            .assert_removed_includes(8 * 9 + 8, [6]);
    }

    #[test]
    fn test_empty_rectangle_eliminates_via_column_link() {
        let mut state = open_state();
        // Digit 2 in box 4 (rows 3-5, cols 3-5) confined to row 4 and col 4.
        for idx in [3 * 9 + 3, 3 * 9 + 5, 5 * 9 + 3, 5 * 9 + 5] {
            state.eliminate(idx, 2);
        }
        // Column 7 strong link: rows {4, 8}.
        for row in 0..9 {
            if row != 4 && row != 8 {
                state.eliminate(row * 9 + 7, 2);
            }
        }

        // Link end (4,7) sits on the hinge row, so (8,4) falls.
        StrategyTester::new(state)
            .apply_once(&EmptyRectangle::new())
            .assert_removed_includes(8 * 9 + 4, [2]);
    }

    #[test]
    fn test_no_progress_on_open_grid() {
        StrategyTester::new(open_state())
            .apply_none(&Skyscraper::new())
            .apply_none(&TwoStringKite::new())
            .apply_none(&EmptyRectangle::new());
    }
}
