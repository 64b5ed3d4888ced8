use omnidoku_core::SearchAbortControl;

use crate::{
    CandidateState, SolverError, StrategyKind,
    strategy::{self, BoxedStrategy},
};

/// Outcome of a full engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineOutcome {
    /// The grid reduced to a complete solution.
    Solved,
    /// No strategy could make further progress.
    Stalled,
    /// A contradiction was detected; the puzzle has no solution.
    Contradiction,
    /// The search budget aborted the run.
    Aborted,
}

/// Per-run statistics: how often each strategy fired and the hardest rank
/// that was ever required.
#[derive(Debug, Clone)]
pub struct EngineStats {
    kinds: Vec<StrategyKind>,
    applications: Vec<u64>,
    hardest: Option<StrategyKind>,
    total_steps: u64,
}

impl EngineStats {
    /// Application counts in engine order, zeros included.
    #[must_use]
    pub fn applications(&self) -> &[u64] {
        &self.applications
    }

    /// Strategy kinds in engine order, aligned with
    /// [`EngineStats::applications`].
    #[must_use]
    pub fn kinds(&self) -> &[StrategyKind] {
        &self.kinds
    }

    /// Number of times the given strategy fired.
    #[must_use]
    pub fn uses(&self, kind: StrategyKind) -> u64 {
        self.kinds
            .iter()
            .zip(&self.applications)
            .filter(|&(&k, _)| k == kind)
            .map(|(_, &count)| count)
            .sum()
    }

    /// The hardest strategy that fired, if any.
    #[must_use]
    pub fn hardest(&self) -> Option<StrategyKind> {
        self.hardest
    }

    /// Rank of the hardest strategy that fired (`0` when none fired).
    #[must_use]
    pub fn hardest_rank(&self) -> u8 {
        self.hardest.map_or(0, StrategyKind::rank)
    }

    /// Total successful strategy applications.
    #[must_use]
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    fn record(&mut self, index: usize) {
        self.applications[index] += 1;
        self.total_steps += 1;
        let kind = self.kinds[index];
        if self.hardest.is_none_or(|hardest| kind.rank() > hardest.rank()) {
            self.hardest = Some(kind);
        }
    }
}

/// Round-robin scheduler over a ranked strategy list.
///
/// Strategies are tried in rank order; after any successful application the
/// scheduler restarts from the top of the list, so easier strategies always
/// get the first chance and the hardest strategy rank ever required equals
/// the puzzle's difficulty.
#[derive(Debug)]
pub struct StrategyEngine {
    strategies: Vec<BoxedStrategy>,
}

impl StrategyEngine {
    /// Creates an engine with the given strategies, applied in order.
    #[must_use]
    pub fn new(strategies: Vec<BoxedStrategy>) -> Self {
        Self { strategies }
    }

    /// Creates an engine with the full strategy library in rank order.
    #[must_use]
    pub fn with_all_strategies() -> Self {
        Self::new(strategy::all_strategies())
    }

    /// The configured strategies in application order.
    #[must_use]
    pub fn strategies(&self) -> &[BoxedStrategy] {
        &self.strategies
    }

    /// Creates a statistics object aligned with this engine's order.
    #[must_use]
    pub fn new_stats(&self) -> EngineStats {
        EngineStats {
            kinds: self.strategies.iter().map(|s| s.kind()).collect(),
            applications: vec![0; self.strategies.len()],
            hardest: None,
            total_steps: 0,
        }
    }

    /// Tries each strategy in order and applies the first that progresses.
    ///
    /// Returns `Ok(true)` when some strategy fired, `Ok(false)` when the
    /// engine is stuck.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError`] when the grid is (or becomes) contradictory.
    pub fn step(
        &self,
        state: &mut CandidateState,
        stats: &mut EngineStats,
    ) -> Result<bool, SolverError> {
        debug_assert_eq!(self.strategies.len(), stats.applications.len());
        state.check_consistency()?;
        for (index, strategy) in self.strategies.iter().enumerate() {
            if strategy.apply(state)? {
                stats.record(index);
                log::debug!("applied {}", strategy.kind());
                state.check_consistency()?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Runs the engine until solved, stalled, contradiction or abort.
    ///
    /// The budget is consulted once per applied step; heavyweight strategies
    /// bound their own internal searches.
    pub fn run(
        &self,
        state: &mut CandidateState,
        stats: &mut EngineStats,
        budget: &mut SearchAbortControl,
    ) -> EngineOutcome {
        loop {
            if state.is_solved() {
                return EngineOutcome::Solved;
            }
            if !budget.step() {
                return EngineOutcome::Aborted;
            }
            match self.step(state, stats) {
                Ok(true) => {}
                Ok(false) => return EngineOutcome::Stalled,
                Err(_) => return EngineOutcome::Contradiction,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use omnidoku_core::{Topology, parse_grid};

    use super::*;

    fn state_from(text: &str) -> CandidateState {
        let topo = Topology::shared(3, 3).unwrap();
        let puzzle = parse_grid(text, topo.n()).unwrap();
        CandidateState::from_puzzle(Arc::clone(&topo), &puzzle).unwrap()
    }

    #[test]
    fn test_run_solves_singles_puzzle_at_rank_one() {
        let mut state = state_from(
            "
            530 070 000
            600 195 000
            098 000 060
            800 060 003
            400 803 001
            700 020 006
            060 000 280
            000 419 005
            000 080 079
        ",
        );
        let engine = StrategyEngine::with_all_strategies();
        let mut stats = engine.new_stats();
        let mut budget = SearchAbortControl::new();

        let outcome = engine.run(&mut state, &mut stats, &mut budget);
        assert_eq!(outcome, EngineOutcome::Solved);
        assert_eq!(stats.hardest_rank(), 1);
        assert!(stats.uses(StrategyKind::NakedSingle) + stats.uses(StrategyKind::HiddenSingle) > 0);
    }

    #[test]
    fn test_run_reports_contradiction() {
        let topo = Topology::shared(3, 3).unwrap();
        let mut state = CandidateState::new_empty(topo);
        for digit in 1..=9 {
            state.eliminate(0, digit);
        }
        let engine = StrategyEngine::with_all_strategies();
        let mut stats = engine.new_stats();
        let mut budget = SearchAbortControl::new();
        assert_eq!(
            engine.run(&mut state, &mut stats, &mut budget),
            EngineOutcome::Contradiction
        );
    }

    #[test]
    fn test_run_stalls_on_empty_grid() {
        let topo = Topology::shared(3, 3).unwrap();
        let mut state = CandidateState::new_empty(topo);
        let engine = StrategyEngine::with_all_strategies();
        let mut stats = engine.new_stats();
        let mut budget = SearchAbortControl::new();
        assert_eq!(
            engine.run(&mut state, &mut stats, &mut budget),
            EngineOutcome::Stalled
        );
        assert_eq!(stats.total_steps(), 0);
        assert_eq!(stats.hardest(), None);
    }

    #[test]
    fn test_stats_alignment() {
        let engine = StrategyEngine::with_all_strategies();
        let stats = engine.new_stats();
        assert_eq!(stats.kinds().len(), engine.strategies().len());
        assert_eq!(stats.applications().len(), engine.strategies().len());
    }
}
