use omnidoku_core::DigitSet;

use crate::{
    CandidateState, SolverError, StrategyKind,
    strategy::{Strategy, combinations},
};

/// Naked subset of a given size (pair, triple or quad).
///
/// If `k` empty cells of a house jointly admit exactly `k` digits, those
/// digits can be removed from every other cell of the house.
#[derive(Debug, Clone, Copy)]
pub struct NakedSubset {
    size: usize,
    kind: StrategyKind,
}

impl NakedSubset {
    /// Naked pair.
    #[must_use]
    pub const fn pair() -> Self {
        Self {
            size: 2,
            kind: StrategyKind::NakedPair,
        }
    }

    /// Naked triple.
    #[must_use]
    pub const fn triple() -> Self {
        Self {
            size: 3,
            kind: StrategyKind::NakedTriple,
        }
    }

    /// Naked quad.
    #[must_use]
    pub const fn quad() -> Self {
        Self {
            size: 4,
            kind: StrategyKind::NakedQuad,
        }
    }
}

impl Strategy for NakedSubset {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let topo = std::sync::Arc::clone(state.topology());
        let mut changed = false;

        for house in 0..topo.house_count() {
            // Cells that can participate: empty, 2..=k candidates.
            let members: Vec<usize> = topo
                .house(house)
                .iter()
                .map(|&idx| usize::from(idx))
                .filter(|&idx| {
                    let len = state.candidates(idx).len() as usize;
                    len >= 2 && len <= self.size
                })
                .collect();
            if members.len() < self.size {
                continue;
            }

            combinations(members.len(), self.size, &mut |combo| {
                let mut union = DigitSet::EMPTY;
                for &member in combo {
                    union |= state.candidates(members[member]);
                }
                if union.len() as usize != self.size {
                    return false;
                }
                let chosen: Vec<usize> = combo.iter().map(|&m| members[m]).collect();
                let mut local = false;
                for &idx in topo.house(house) {
                    let idx = usize::from(idx);
                    if chosen.contains(&idx) {
                        continue;
                    }
                    for digit in union {
                        local |= state.eliminate(idx, digit);
                    }
                }
                changed |= local;
                local
            });
        }
        Ok(changed)
    }
}

/// Hidden subset of a given size (pair, triple or quad).
///
/// If `k` digits are jointly confined to `k` cells of a house, those cells
/// can shed every other candidate.
#[derive(Debug, Clone, Copy)]
pub struct HiddenSubset {
    size: usize,
    kind: StrategyKind,
}

impl HiddenSubset {
    /// Hidden pair.
    #[must_use]
    pub const fn pair() -> Self {
        Self {
            size: 2,
            kind: StrategyKind::HiddenPair,
        }
    }

    /// Hidden triple.
    #[must_use]
    pub const fn triple() -> Self {
        Self {
            size: 3,
            kind: StrategyKind::HiddenTriple,
        }
    }

    /// Hidden quad.
    #[must_use]
    pub const fn quad() -> Self {
        Self {
            size: 4,
            kind: StrategyKind::HiddenQuad,
        }
    }
}

impl Strategy for HiddenSubset {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let topo = std::sync::Arc::clone(state.topology());
        let n = topo.n();
        let mut changed = false;

        for house in 0..topo.house_count() {
            let placed = state.house_placed_digits(house);
            // Digits that can participate: unplaced, 2..=k positions.
            let digits: Vec<(u8, u64)> = placed
                .complement(n)
                .iter()
                .map(|digit| (digit, state.house_candidate_mask(house, digit)))
                .filter(|&(_, mask)| {
                    let count = mask.count_ones() as usize;
                    count >= 2 && count <= self.size
                })
                .collect();
            if digits.len() < self.size {
                continue;
            }

            combinations(digits.len(), self.size, &mut |combo| {
                let mut union_mask = 0u64;
                let mut union_digits = DigitSet::EMPTY;
                for &member in combo {
                    let (digit, mask) = digits[member];
                    union_mask |= mask;
                    union_digits.insert(digit);
                }
                if union_mask.count_ones() as usize != self.size {
                    return false;
                }
                let cells = topo.house(house);
                let mut local = false;
                let mut slots = union_mask;
                while slots != 0 {
                    let slot = slots.trailing_zeros() as usize;
                    slots &= slots - 1;
                    local |= state.restrict(usize::from(cells[slot]), union_digits);
                }
                changed |= local;
                local
            });
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use omnidoku_core::{DigitSet, Topology};

    use super::*;
    use crate::testing::StrategyTester;

    fn open_state() -> CandidateState {
        CandidateState::new_empty(Topology::shared(3, 3).unwrap())
    }

    #[test]
    fn test_naked_pair_eliminates_in_row() {
        let mut state = open_state();
        state.restrict(0, DigitSet::from_iter([1u8, 2]));
        state.restrict(5, DigitSet::from_iter([1u8, 2]));

        StrategyTester::new(state)
            .apply_once(&NakedSubset::pair())
            .assert_removed_includes(3, [1, 2])
            .assert_removed_includes(8, [1, 2]);
    }

    #[test]
    fn test_naked_triple_allows_partial_cells() {
        let mut state = open_state();
        // Triple {4,5,6} spread over three cells, one holding only a pair.
        state.restrict(9, DigitSet::from_iter([4u8, 5]));
        state.restrict(10, DigitSet::from_iter([5u8, 6]));
        state.restrict(11, DigitSet::from_iter([4u8, 6]));

        StrategyTester::new(state)
            .apply_once(&NakedSubset::triple())
            .assert_removed_includes(12, [4, 5, 6])
            .assert_removed_includes(17, [4, 5, 6]);
    }

    #[test]
    fn test_hidden_pair_restricts_cells() {
        let mut state = open_state();
        // Confine 8 and 9 in row 0 to columns 0 and 1.
        for col in 2..9 {
            state.eliminate(col, 8);
            state.eliminate(col, 9);
        }

        StrategyTester::new(state)
            .apply_once(&HiddenSubset::pair())
            .assert_candidates(0, [8, 9])
            .assert_candidates(1, [8, 9]);
    }

    #[test]
    fn test_hidden_quad_restricts_cells() {
        let mut state = open_state();
        // Confine 1-4 in column 0 to rows 0-3.
        for row in 4..9 {
            for digit in 1..=4 {
                state.eliminate(row * 9, digit);
            }
        }

        StrategyTester::new(state)
            .apply_once(&HiddenSubset::quad())
            .assert_candidates(0, [1, 2, 3, 4])
            .assert_candidates(27, [1, 2, 3, 4]);
    }

    #[test]
    fn test_no_progress_on_open_grid() {
        StrategyTester::new(open_state())
            .apply_none(&NakedSubset::pair())
            .apply_none(&NakedSubset::triple())
            .apply_none(&NakedSubset::quad())
            .apply_none(&HiddenSubset::pair())
            .apply_none(&HiddenSubset::triple())
            .apply_none(&HiddenSubset::quad());
    }
}
