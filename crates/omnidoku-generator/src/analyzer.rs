//! Difficulty analyzer: logic certifier, strategy engine, backtracking
//! fallback and uniqueness check combined into one report.

use std::sync::Arc;

use omnidoku_core::{SearchAbortControl, Topology};
use omnidoku_solver::{
    BacktrackOutcome, BacktrackStats, CandidateState, CertifyOutcome, EngineOutcome,
    StrategyEngine, StrategyKind, certify, solve_one,
};

use crate::dlx::UniquenessCounter;

/// Everything the analyzer learned about one puzzle.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// The puzzle is contradictory.
    pub contradiction: bool,
    /// Logic alone (singles and strategies) solved the puzzle.
    pub solved_logically: bool,
    /// The strategy library stalled; guessing was needed.
    pub requires_guessing: bool,
    /// The backtracking fallback produced the solution.
    pub solved_with_backtracking: bool,
    /// Exactly one solution exists (when the uniqueness check ran).
    pub unique_solution: bool,
    /// Solution count from the uniqueness check: `-1` aborted, else the
    /// count clamped at 2.
    pub solution_count: i32,
    /// Clues in the analyzed puzzle.
    pub initial_clues: usize,
    /// Rank of the hardest strategy required (9 when backtracking ran,
    /// 0 when nothing was needed).
    pub hardest_rank: u8,
    /// The hardest strategy required, if any.
    pub hardest_strategy: Option<StrategyKind>,
    /// `(strategy, times fired)` for every strategy that fired.
    pub strategy_usage: Vec<(StrategyKind, u64)>,
    /// Backtracking nodes visited.
    pub backtracking_nodes: u64,
    /// Backtracking digit decisions.
    pub backtracking_decisions: u64,
    /// Backtracking dead ends undone.
    pub backtracking_backtracks: u64,
    /// The solved grid, when any stage reached one.
    pub solution: Option<Vec<u16>>,
    /// Human-readable trail of the stages applied.
    pub debug_log: Vec<String>,
}

impl AnalysisReport {
    /// Times the given strategy fired during analysis.
    #[must_use]
    pub fn uses(&self, kind: StrategyKind) -> u64 {
        self.strategy_usage
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0, |(_, count)| *count)
    }
}

/// Analysis options, a narrow view of the run configuration.
#[derive(Debug, Clone, Copy)]
pub struct AnalyzerOptions {
    /// Run the uniqueness counter with limit 2.
    pub require_unique: bool,
    /// Skip the backtracking fallback; puzzles beyond logic are not
    /// classified further.
    pub strict_logical: bool,
}

/// Combines the certifier, the strategy engine, the backtracking solver
/// and the uniqueness counter.
#[derive(Debug)]
pub struct Analyzer {
    engine: StrategyEngine,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    /// Creates an analyzer with the full strategy library.
    #[must_use]
    pub fn new() -> Self {
        Self {
            engine: StrategyEngine::with_all_strategies(),
        }
    }

    /// Analyzes one puzzle.
    ///
    /// Stages: (1) the singles certifier, (2) the ranked strategy engine if
    /// singles stall, (3) an MRV backtracking solver when logic stalls and
    /// strict-logical mode is off, (4) the uniqueness counter with limit 2.
    #[expect(clippy::too_many_lines)]
    pub fn analyze(
        &self,
        topo: &Arc<Topology>,
        puzzle: &[u16],
        options: AnalyzerOptions,
        budget: &mut SearchAbortControl,
        uniqueness: &mut UniquenessCounter,
    ) -> AnalysisReport {
        let mut report = AnalysisReport {
            contradiction: false,
            solved_logically: false,
            requires_guessing: false,
            solved_with_backtracking: false,
            unique_solution: false,
            solution_count: 0,
            initial_clues: puzzle.iter().filter(|&&v| v != 0).count(),
            hardest_rank: 0,
            hardest_strategy: None,
            strategy_usage: Vec::new(),
            backtracking_nodes: 0,
            backtracking_decisions: 0,
            backtracking_backtracks: 0,
            solution: None,
            debug_log: Vec::new(),
        };

        let Ok(state) = CandidateState::from_puzzle(Arc::clone(topo), puzzle) else {
            report.contradiction = true;
            report.debug_log.push("invalid puzzle".to_owned());
            return report;
        };

        // Stage 1: singles certifier.
        let certified = certify(&state);
        let mut record_singles = |report: &mut AnalysisReport| {
            if certified.naked.placements > 0 {
                report
                    .strategy_usage
                    .push((StrategyKind::NakedSingle, certified.naked.placements));
            }
            if certified.hidden.placements > 0 {
                report
                    .strategy_usage
                    .push((StrategyKind::HiddenSingle, certified.hidden.placements));
            }
        };
        match certified.outcome {
            CertifyOutcome::Contradiction => {
                report.contradiction = true;
                report.debug_log.push("certify: contradiction".to_owned());
                return report;
            }
            CertifyOutcome::Solved => {
                record_singles(&mut report);
                report.solved_logically = true;
                report.hardest_rank = 1;
                report.hardest_strategy = report.strategy_usage.first().map(|&(kind, _)| kind);
                report.solution = certified.solved_values.clone();
                report
                    .debug_log
                    .push(format!("certify: solved in {} steps", certified.steps));
            }
            CertifyOutcome::Stalled => {
                report
                    .debug_log
                    .push(format!("certify: stalled after {} steps", certified.steps));

                // Stage 2: ranked strategies on a fresh state.
                let mut work = state.clone();
                let mut stats = self.engine.new_stats();
                let outcome = self.engine.run(&mut work, &mut stats, budget);
                for (kind, &count) in stats.kinds().iter().zip(stats.applications()) {
                    if count > 0 {
                        report.strategy_usage.push((*kind, count));
                    }
                }
                report.hardest_rank = stats.hardest_rank();
                report.hardest_strategy = stats.hardest();
                match outcome {
                    EngineOutcome::Contradiction => {
                        report.contradiction = true;
                        report.debug_log.push("engine: contradiction".to_owned());
                        return report;
                    }
                    EngineOutcome::Solved => {
                        report.solved_logically = true;
                        report.solution = Some(work.values().to_vec());
                        report.debug_log.push(format!(
                            "engine: solved, hardest {}",
                            stats.hardest().map_or("none".to_owned(), |k| k.to_string())
                        ));
                    }
                    EngineOutcome::Stalled | EngineOutcome::Aborted => {
                        report.requires_guessing = true;
                        report.debug_log.push("engine: stalled".to_owned());

                        // Stage 3: backtracking fallback.
                        if !options.strict_logical {
                            let mut stats = BacktrackStats::default();
                            match solve_one(&state, budget, &mut stats) {
                                BacktrackOutcome::Solved(values) => {
                                    report.solved_with_backtracking = true;
                                    report.solution = Some(values);
                                    report.hardest_rank = 9;
                                    report.hardest_strategy = Some(StrategyKind::Backtracking);
                                    report
                                        .strategy_usage
                                        .push((StrategyKind::Backtracking, 1));
                                    report.debug_log.push(format!(
                                        "backtracking: solved, {} decisions",
                                        stats.decisions
                                    ));
                                }
                                BacktrackOutcome::Unsolvable => {
                                    report.contradiction = true;
                                    report
                                        .debug_log
                                        .push("backtracking: unsolvable".to_owned());
                                }
                                BacktrackOutcome::Aborted => {
                                    report.debug_log.push("backtracking: aborted".to_owned());
                                }
                            }
                            report.backtracking_nodes = stats.nodes;
                            report.backtracking_decisions = stats.decisions;
                            report.backtracking_backtracks = stats.backtracks;
                        }
                    }
                }
            }
        }

        // Stage 4: uniqueness.
        if options.require_unique && !report.contradiction {
            let count = uniqueness.count_solutions_limit2(puzzle, topo, budget);
            report.solution_count = count;
            report.unique_solution = count == 1;
            report.debug_log.push(format!("uniqueness: count {count}"));
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnidoku_core::parse_grid;

    fn analyze(text: &str, options: AnalyzerOptions) -> AnalysisReport {
        let topo = Topology::shared(3, 3).unwrap();
        let puzzle = parse_grid(text, topo.n()).unwrap();
        let analyzer = Analyzer::new();
        let mut budget = SearchAbortControl::new().with_node_limit(5_000_000);
        let mut uniqueness = UniquenessCounter::new();
        analyzer.analyze(&topo, &puzzle, options, &mut budget, &mut uniqueness)
    }

    const EASY_9X9: &str = "
        530 070 000
        600 195 000
        098 000 060
        800 060 003
        400 803 001
        700 020 006
        060 000 280
        000 419 005
        000 080 079
    ";

    #[test]
    fn test_easy_puzzle_ranks_one() {
        let report = analyze(
            EASY_9X9,
            AnalyzerOptions {
                require_unique: true,
                strict_logical: false,
            },
        );
        assert!(report.solved_logically);
        assert!(!report.contradiction);
        assert_eq!(report.hardest_rank, 1);
        assert!(report.unique_solution);
        assert_eq!(report.initial_clues, 30);
        assert!(report.uses(StrategyKind::NakedSingle) + report.uses(StrategyKind::HiddenSingle) > 0);
        assert!(report.solution.is_some());
    }

    #[test]
    fn test_hard_puzzle_classifies_beyond_singles() {
        let report = analyze(
            "
            100 007 090
            030 020 008
            009 600 500
            005 300 900
            010 080 002
            600 004 000
            300 000 010
            040 000 007
            007 000 300
        ",
            AnalyzerOptions {
                require_unique: false,
                strict_logical: false,
            },
        );
        assert!(!report.contradiction);
        assert!(report.hardest_rank > 1 || report.requires_guessing);
        assert!(report.solution.is_some() || report.requires_guessing);
    }

    #[test]
    fn test_contradictory_puzzle_detected() {
        // Two 5s in one row.
        let mut text = "0".repeat(81);
        text.replace_range(0..1, "5");
        text.replace_range(4..5, "5");
        let report = analyze(
            &text,
            AnalyzerOptions {
                require_unique: false,
                strict_logical: false,
            },
        );
        assert!(report.contradiction);
        assert_eq!(report.hardest_rank, 0);
    }

    #[test]
    fn test_strict_logical_skips_backtracking() {
        let report = analyze(
            &"0".repeat(81),
            AnalyzerOptions {
                require_unique: false,
                strict_logical: true,
            },
        );
        assert!(report.requires_guessing);
        assert!(!report.solved_with_backtracking);
        assert_eq!(report.backtracking_nodes, 0);
    }
}
