use crate::{CandidateState, logic};

/// Reports whether a set of tentative assignments survives singles
/// propagation.
///
/// The assignments are applied to a private copy of the state, then naked and
/// hidden singles run to exhaustion. The predicate holds iff no contradiction
/// is reached; it says nothing about solvability beyond singles.
///
/// Conservative strategies use this to prove eliminations: if assigning
/// `(cell, digit)` has no logical support, the digit cannot stand in that
/// cell.
#[must_use]
pub fn has_logical_support_with_assignments(
    state: &CandidateState,
    assignments: &[(usize, u8)],
) -> bool {
    let mut probe = state.clone();
    for &(cell, digit) in assignments {
        if !probe.candidates(cell).contains(digit) {
            return false;
        }
        probe.place(cell, digit);
    }
    logic::propagate_singles(&mut probe).is_ok()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use omnidoku_core::Topology;

    use super::*;

    #[test]
    fn test_open_grid_supports_any_single_assignment() {
        let state = CandidateState::new_empty(Topology::shared(3, 3).unwrap());
        assert!(has_logical_support_with_assignments(&state, &[(0, 1)]));
        assert!(has_logical_support_with_assignments(&state, &[(40, 9)]));
    }

    #[test]
    fn test_missing_candidate_has_no_support() {
        let mut state = CandidateState::new_empty(Topology::shared(3, 3).unwrap());
        state.place(0, 5);
        // 5 is no longer a candidate anywhere in row 0.
        assert!(!has_logical_support_with_assignments(&state, &[(8, 5)]));
    }

    #[test]
    fn test_contradictory_pair_has_no_support() {
        let state = CandidateState::new_empty(Topology::shared(2, 2).unwrap());
        // Restrict a row so assigning both ends the same pair collapses it.
        let mut state = state;
        for idx in [0, 1] {
            state.restrict(idx, omnidoku_core::DigitSet::from_iter([1u8, 2]));
        }
        // Assign 1 and 2 to cells 0 and 1; cells 2 and 3 of row 0 keep their
        // candidates, so this is still supported.
        assert!(has_logical_support_with_assignments(&state, &[(0, 1), (1, 2)]));
        // Assigning 1 to both is impossible: the second place has no
        // candidate 1 left.
        assert!(!has_logical_support_with_assignments(&state, &[(0, 1), (1, 1)]));
    }
}
