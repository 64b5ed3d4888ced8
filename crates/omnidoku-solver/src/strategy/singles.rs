use crate::{CandidateState, SolverError, StrategyKind, logic, strategy::Strategy};

/// Places every empty cell whose candidate set has exactly one digit.
///
/// This is the fundamental propagation step: placements performed here strip
/// the placed digit from every peer, which is the only constraint
/// propagation the rest of the library relies on.
#[derive(Debug, Default, Clone, Copy)]
pub struct NakedSingle;

impl NakedSingle {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for NakedSingle {
    fn kind(&self) -> StrategyKind {
        StrategyKind::NakedSingle
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        Ok(logic::apply_naked_singles(state)? > 0)
    }
}

/// Places every digit that admits a unique cell within some house.
#[derive(Debug, Default, Clone, Copy)]
pub struct HiddenSingle;

impl HiddenSingle {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for HiddenSingle {
    fn kind(&self) -> StrategyKind {
        StrategyKind::HiddenSingle
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        Ok(logic::apply_hidden_singles(state)? > 0)
    }
}

#[cfg(test)]
mod tests {
    use omnidoku_core::{DigitSet, Topology};

    use super::*;
    use crate::testing::StrategyTester;

    #[test]
    fn test_naked_single_places_lone_candidate() {
        let mut state = CandidateState::new_empty(Topology::shared(3, 3).unwrap());
        state.restrict(40, DigitSet::from_elem(5));

        StrategyTester::new(state)
            .apply_once(&NakedSingle::new())
            .assert_value(40, 5)
            .assert_removed_includes(41, [5])
            .assert_removed_includes(4, [5]);
    }

    #[test]
    fn test_naked_single_reports_no_progress() {
        let state = CandidateState::new_empty(Topology::shared(3, 3).unwrap());
        StrategyTester::new(state).apply_none(&NakedSingle::new());
    }

    #[test]
    fn test_hidden_single_places_unique_position() {
        let mut state = CandidateState::new_empty(Topology::shared(3, 3).unwrap());
        // Remove 7 from every row-0 cell except column 4.
        for col in 0..9 {
            if col != 4 {
                state.eliminate(col, 7);
            }
        }

        StrategyTester::new(state)
            .apply_once(&HiddenSingle::new())
            .assert_value(4, 7);
    }

    #[test]
    fn test_hidden_single_detects_homeless_digit() {
        let mut state = CandidateState::new_empty(Topology::shared(3, 3).unwrap());
        for col in 0..9 {
            state.eliminate(col, 7);
        }
        let result = HiddenSingle::new().apply(&mut state);
        assert!(matches!(
            result,
            Err(SolverError::DigitWithoutPlace { house: 0, digit: 7 })
        ));
    }
}
