//! Test utilities for strategy implementations.
//!
//! [`StrategyTester`] tracks the initial and current candidate state of a
//! grid, applies strategies, and asserts the changes they make. All methods
//! return `self` for fluent chaining, and assertion failures use
//! `#[track_caller]` to report the calling test's location.

use std::sync::Arc;

use omnidoku_core::{DigitSet, Topology, parse_grid};

use crate::{CandidateState, strategy::Strategy};

/// A fluent test harness for strategy implementations.
#[derive(Debug)]
pub struct StrategyTester {
    initial: CandidateState,
    current: CandidateState,
}

impl StrategyTester {
    /// Creates a tester from a prepared candidate state.
    #[must_use]
    pub fn new(initial: CandidateState) -> Self {
        let current = initial.clone();
        Self { initial, current }
    }

    /// Creates a tester from a puzzle string for the given geometry.
    ///
    /// # Panics
    ///
    /// Panics if the text does not parse for the geometry.
    #[track_caller]
    pub fn from_puzzle(text: &str, box_rows: u8, box_cols: u8) -> Self {
        let topo = Topology::shared(box_rows, box_cols).unwrap();
        let puzzle = parse_grid(text, topo.n()).unwrap();
        Self::new(CandidateState::from_puzzle(Arc::clone(&topo), &puzzle).unwrap())
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> &CandidateState {
        &self.current
    }

    /// Applies the strategy once, expecting it to make progress.
    ///
    /// # Panics
    ///
    /// Panics if the strategy errors or reports no progress.
    #[track_caller]
    pub fn apply_once<S>(mut self, strategy: &S) -> Self
    where
        S: Strategy,
    {
        let changed = strategy.apply(&mut self.current).unwrap();
        assert!(
            changed,
            "expected {} to make progress",
            strategy.kind()
        );
        self
    }

    /// Applies the strategy once, expecting no progress.
    ///
    /// # Panics
    ///
    /// Panics if the strategy errors or reports progress.
    #[track_caller]
    pub fn apply_none<S>(mut self, strategy: &S) -> Self
    where
        S: Strategy,
    {
        let changed = strategy.apply(&mut self.current).unwrap();
        assert!(
            !changed,
            "expected {} to report no progress",
            strategy.kind()
        );
        self
    }

    /// Applies the strategy until it stops making progress.
    ///
    /// # Panics
    ///
    /// Panics if the strategy errors.
    #[track_caller]
    pub fn apply_until_stuck<S>(mut self, strategy: &S) -> Self
    where
        S: Strategy,
    {
        while strategy.apply(&mut self.current).unwrap() {}
        self
    }

    /// Asserts that a cell now holds the given digit.
    ///
    /// # Panics
    ///
    /// Panics if the cell holds anything else.
    #[track_caller]
    pub fn assert_value(self, idx: usize, digit: u8) -> Self {
        let value = self.current.value(idx);
        assert_eq!(
            value,
            u16::from(digit),
            "expected cell {idx} to hold {digit}, found {value}"
        );
        self
    }

    /// Asserts that all given digits were removed from a cell's candidates.
    ///
    /// The digits must have been present initially; other candidates may
    /// have been removed as well.
    ///
    /// # Panics
    ///
    /// Panics if a digit was initially absent or is still present.
    #[track_caller]
    pub fn assert_removed_includes<D>(self, idx: usize, digits: D) -> Self
    where
        D: IntoIterator<Item = u8>,
    {
        let digits = DigitSet::from_iter(digits);
        let initial = self.initial.candidates(idx);
        let current = self.current.candidates(idx);
        assert_eq!(
            initial & digits,
            digits,
            "expected initial candidates at {idx} to include {digits:?}, found {initial:?}"
        );
        assert!(
            (current & digits).is_empty(),
            "expected {digits:?} removed from {idx}, candidates are {current:?}"
        );
        self
    }

    /// Asserts that a cell's candidates are exactly the given digits.
    ///
    /// # Panics
    ///
    /// Panics on any difference.
    #[track_caller]
    pub fn assert_candidates<D>(self, idx: usize, digits: D) -> Self
    where
        D: IntoIterator<Item = u8>,
    {
        let expected = DigitSet::from_iter(digits);
        let current = self.current.candidates(idx);
        assert_eq!(
            current, expected,
            "expected candidates {expected:?} at {idx}, found {current:?}"
        );
        self
    }

    /// Asserts that a cell's candidates have not changed.
    ///
    /// # Panics
    ///
    /// Panics if the candidates differ from the initial state.
    #[track_caller]
    pub fn assert_no_change(self, idx: usize) -> Self {
        let initial = self.initial.candidates(idx);
        let current = self.current.candidates(idx);
        assert_eq!(
            initial, current,
            "expected no change at {idx}, candidates changed from {initial:?} to {current:?}"
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SolverError, StrategyKind};

    #[derive(Debug)]
    struct NoOp;

    impl Strategy for NoOp {
        fn kind(&self) -> StrategyKind {
            StrategyKind::NakedSingle
        }

        fn apply(&self, _state: &mut CandidateState) -> Result<bool, SolverError> {
            Ok(false)
        }
    }

    #[derive(Debug)]
    struct PlaceOneAtZero;

    impl Strategy for PlaceOneAtZero {
        fn kind(&self) -> StrategyKind {
            StrategyKind::NakedSingle
        }

        fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
            if state.value(0) == 0 {
                state.place(0, 1);
                Ok(true)
            } else {
                Ok(false)
            }
        }
    }

    #[test]
    fn test_apply_once_and_assert_value() {
        let tester = StrategyTester::from_puzzle(&"0".repeat(81), 3, 3);
        tester
            .apply_once(&PlaceOneAtZero)
            .assert_value(0, 1)
            .assert_removed_includes(1, [1]);
    }

    #[test]
    fn test_apply_none_accepts_no_op() {
        let tester = StrategyTester::from_puzzle(&"0".repeat(81), 3, 3);
        tester.apply_none(&NoOp).assert_no_change(0);
    }

    #[test]
    #[should_panic(expected = "expected nakedsingle to make progress")]
    fn test_apply_once_panics_without_progress() {
        let tester = StrategyTester::from_puzzle(&"0".repeat(81), 3, 3);
        let _ = tester.apply_once(&NoOp);
    }

    #[test]
    fn test_apply_until_stuck_converges() {
        let tester = StrategyTester::from_puzzle(&"0".repeat(81), 3, 3);
        tester.apply_until_stuck(&PlaceOneAtZero).assert_value(0, 1);
    }
}
