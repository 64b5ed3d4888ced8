//! Single generation attempt: solved grid, dig, prefilter, certify,
//! uniqueness, difficulty match.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use omnidoku_core::{Board, SearchAbortControl, SharedFlag, Topology};
use omnidoku_solver::{CertifyOutcome, certify};
use rand::Rng;

use crate::{
    analyzer::{Analyzer, AnalyzerOptions},
    config::{GenerateRunConfig, RejectReason},
    dig::DigKernel,
    dlx::UniquenessCounter,
    prefilter::QuickPrefilter,
    solved_kernel::{CandidateCache, SolvedKernel},
};

/// An accepted puzzle with its solution.
#[derive(Debug, Clone)]
pub struct PuzzleCandidate {
    /// The puzzle (0 = empty cell).
    pub puzzle: Vec<u16>,
    /// Its unique completion.
    pub solution: Vec<u16>,
    /// Clue count of the puzzle.
    pub clues: usize,
    /// Difficulty level assigned by the analyzer.
    pub difficulty: u8,
    /// Token of the hardest strategy required (`"none"` if trivial).
    pub strategy: String,
}

/// Per-stage wall-clock and counter samples of one attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttemptPerf {
    /// Time in the solved-grid kernel.
    pub solved_elapsed: Duration,
    /// Time in the dig kernel.
    pub dig_elapsed: Duration,
    /// Time in the prefilter.
    pub prefilter_elapsed: Duration,
    /// Time in the certifier.
    pub logic_elapsed: Duration,
    /// Time in the uniqueness counter.
    pub uniqueness_elapsed: Duration,
    /// Uniqueness-counter invocations.
    pub uniqueness_calls: u64,
    /// Nodes spent in the uniqueness counter.
    pub uniqueness_nodes: u64,
    /// Certifier steps.
    pub logic_steps: u64,
    /// Naked-single scans and hits.
    pub naked_use: u64,
    /// Naked-single scans that progressed.
    pub naked_hit: u64,
    /// Hidden-single scans.
    pub hidden_use: u64,
    /// Hidden-single scans that progressed.
    pub hidden_hit: u64,
}

/// Outcome of one attempt.
#[derive(Debug)]
pub struct AttemptOutcome {
    /// The accepted candidate, or the stage that rejected the attempt.
    pub result: Result<PuzzleCandidate, RejectReason>,
    /// The per-attempt budget expired during the attempt.
    pub timed_out: bool,
    /// Stage samples.
    pub perf: AttemptPerf,
}

/// Reusable per-worker scratch: board, caches and kernels are allocated
/// once at worker start and threaded through every attempt.
#[derive(Debug)]
pub struct AttemptScratch {
    board: Board,
    cache: CandidateCache,
    dig: DigKernel,
    prefilter: QuickPrefilter,
    uniqueness: UniquenessCounter,
    analyzer: Analyzer,
    solution: Vec<u16>,
    puzzle: Vec<u16>,
}

impl AttemptScratch {
    /// Creates scratch for a topology.
    #[must_use]
    pub fn new(topo: &Arc<Topology>) -> Self {
        Self {
            board: Board::new(Arc::clone(topo)),
            cache: CandidateCache::new(),
            dig: DigKernel::new(),
            prefilter: QuickPrefilter::new(),
            uniqueness: UniquenessCounter::new(),
            analyzer: Analyzer::new(),
            solution: Vec::new(),
            puzzle: Vec::new(),
        }
    }
}

/// Builds the scoped per-attempt budget from the configuration and the
/// shared control flags.
fn attempt_budget(
    cfg: &GenerateRunConfig,
    cancel: Option<&SharedFlag>,
    pause: Option<&SharedFlag>,
    global_deadline: Option<Instant>,
) -> SearchAbortControl {
    let mut budget = SearchAbortControl::new();
    if cfg.attempt_time_budget_s > 0.0 {
        let deadline = Instant::now() + Duration::from_secs_f64(cfg.attempt_time_budget_s);
        let deadline = match global_deadline {
            Some(global) => deadline.min(global),
            None => deadline,
        };
        budget = budget.with_deadline(deadline);
    } else if let Some(global) = global_deadline {
        budget = budget.with_deadline(global);
    }
    if cfg.attempt_node_budget > 0 {
        budget = budget.with_node_limit(cfg.attempt_node_budget);
    }
    if let Some(flag) = cancel {
        budget = budget.with_cancel(flag.clone());
    }
    if let Some(flag) = pause {
        budget = budget.with_pause(flag.clone());
    }
    budget
}

/// Runs one generation attempt.
///
/// Each stage may short-circuit with its reject reason; uniqueness budget
/// exhaustion maps to its own reason for observability. The per-attempt
/// budget is scoped to this call and torn down on every exit path.
#[expect(clippy::too_many_lines)]
pub fn generate_one<R>(
    cfg: &GenerateRunConfig,
    topo: &Arc<Topology>,
    kernel: &SolvedKernel,
    scratch: &mut AttemptScratch,
    rng: &mut R,
    cancel: Option<&SharedFlag>,
    pause: Option<&SharedFlag>,
    global_deadline: Option<Instant>,
) -> AttemptOutcome
where
    R: Rng,
{
    let mut perf = AttemptPerf::default();
    let mut budget = attempt_budget(cfg, cancel, pause, global_deadline);

    // Stage 1: solved grid.
    let solved_start = Instant::now();
    let generated = kernel.generate(
        &mut scratch.board,
        &mut scratch.cache,
        rng,
        &mut budget,
        &mut scratch.solution,
    );
    perf.solved_elapsed = solved_start.elapsed();
    if !generated {
        return AttemptOutcome {
            result: Err(RejectReason::Logic),
            timed_out: budget.aborted_by_time() || budget.aborted_by_nodes(),
            perf,
        };
    }

    // Stage 2: dig.
    let dig_start = Instant::now();
    let clues = scratch.dig.dig(
        &scratch.solution,
        topo,
        cfg.min_clues,
        cfg.max_clues,
        cfg.symmetry_center,
        rng,
        &mut scratch.puzzle,
    );
    perf.dig_elapsed = dig_start.elapsed();

    // Stage 3: prefilter.
    let prefilter_start = Instant::now();
    let clean = scratch
        .prefilter
        .check(&scratch.puzzle, topo, cfg.min_clues, cfg.max_clues);
    perf.prefilter_elapsed = prefilter_start.elapsed();
    if !clean {
        return AttemptOutcome {
            result: Err(RejectReason::Prefilter),
            timed_out: false,
            perf,
        };
    }

    // Stage 4: logic certify.
    let logic_start = Instant::now();
    let state = match omnidoku_solver::CandidateState::from_puzzle(Arc::clone(topo), &scratch.puzzle)
    {
        Ok(state) => state,
        Err(_) => {
            return AttemptOutcome {
                result: Err(RejectReason::Logic),
                timed_out: false,
                perf,
            };
        }
    };
    let certified = certify(&state);
    perf.logic_elapsed = logic_start.elapsed();
    perf.logic_steps = certified.steps;
    perf.naked_use = certified.naked.use_count;
    perf.naked_hit = certified.naked.hit_count;
    perf.hidden_use = certified.hidden.use_count;
    perf.hidden_hit = certified.hidden.hit_count;
    match certified.outcome {
        CertifyOutcome::Contradiction => {
            return AttemptOutcome {
                result: Err(RejectReason::Logic),
                timed_out: false,
                perf,
            };
        }
        CertifyOutcome::Stalled if cfg.strict_logical => {
            return AttemptOutcome {
                result: Err(RejectReason::Logic),
                timed_out: false,
                perf,
            };
        }
        _ => {}
    }

    // Stage 5: uniqueness.
    if cfg.require_unique {
        let uniq_start = Instant::now();
        let nodes_before = budget.nodes();
        let count = scratch
            .uniqueness
            .count_solutions_limit2(&scratch.puzzle, topo, &mut budget);
        perf.uniqueness_elapsed = uniq_start.elapsed();
        perf.uniqueness_calls += 1;
        perf.uniqueness_nodes += budget.nodes() - nodes_before;
        match count {
            -1 => {
                return AttemptOutcome {
                    result: Err(RejectReason::UniquenessBudget),
                    timed_out: true,
                    perf,
                };
            }
            0 => {
                return AttemptOutcome {
                    result: Err(RejectReason::Logic),
                    timed_out: false,
                    perf,
                };
            }
            1 => {}
            _ => {
                return AttemptOutcome {
                    result: Err(RejectReason::Uniqueness),
                    timed_out: false,
                    perf,
                };
            }
        }
    }

    // Stage 6/7: difficulty and required strategy.
    let options = AnalyzerOptions {
        require_unique: false, // already checked above
        strict_logical: cfg.strict_logical,
    };
    let report = scratch
        .analyzer
        .analyze(topo, &scratch.puzzle, options, &mut budget, &mut scratch.uniqueness);
    if report.contradiction {
        return AttemptOutcome {
            result: Err(RejectReason::Logic),
            timed_out: false,
            perf,
        };
    }
    let difficulty = report.hardest_rank;
    let matches_level = if cfg.fast_test_mode {
        difficulty >= cfg.difficulty_level_required
    } else {
        difficulty == cfg.difficulty_level_required
    };
    if !matches_level {
        return AttemptOutcome {
            result: Err(RejectReason::Strategy),
            timed_out: budget.aborted_by_time() || budget.aborted_by_nodes(),
            perf,
        };
    }
    if let Some(required) = cfg.required_strategy
        && report.uses(required) == 0
    {
        return AttemptOutcome {
            result: Err(RejectReason::Strategy),
            timed_out: false,
            perf,
        };
    }

    // The emitted solution: logic's grid when available, else the solved
    // grid the puzzle was dug from.
    let solution = report
        .solution
        .unwrap_or_else(|| scratch.solution.clone());
    let strategy = report
        .hardest_strategy
        .map_or_else(|| "none".to_owned(), |kind| kind.to_string());

    AttemptOutcome {
        result: Ok(PuzzleCandidate {
            puzzle: scratch.puzzle.clone(),
            solution,
            clues,
            difficulty,
            strategy,
        }),
        timed_out: false,
        perf,
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;
    use crate::simd::Backend;

    fn try_generate(cfg: &GenerateRunConfig, seed: u64) -> AttemptOutcome {
        let topo = Topology::shared(cfg.box_rows, cfg.box_cols).unwrap();
        let cfg = cfg.resolved(topo.nn());
        let kernel = SolvedKernel::new(Backend::Scalar);
        let mut scratch = AttemptScratch::new(&topo);
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        generate_one(&cfg, &topo, &kernel, &mut scratch, &mut rng, None, None, None)
    }

    #[test]
    fn test_attempt_loop_eventually_accepts_easy_puzzle() {
        let cfg = GenerateRunConfig {
            box_rows: 3,
            box_cols: 3,
            difficulty_level_required: 1,
            min_clues: 40,
            max_clues: 50,
            require_unique: true,
            ..GenerateRunConfig::default()
        };

        let mut accepted = None;
        for seed in 0..200 {
            let outcome = try_generate(&cfg, seed);
            if let Ok(candidate) = outcome.result {
                accepted = Some(candidate);
                break;
            }
        }
        let candidate = accepted.expect("no attempt accepted within 200 seeds");
        assert_eq!(candidate.difficulty, 1);
        assert!((40..=50).contains(&candidate.clues));
        assert_eq!(candidate.puzzle.len(), 81);
        assert!(candidate.solution.iter().all(|&v| v != 0));
        // Puzzle clues agree with the solution.
        for (idx, &value) in candidate.puzzle.iter().enumerate() {
            assert!(value == 0 || value == candidate.solution[idx]);
        }
    }

    #[test]
    fn test_rejections_map_to_stages() {
        // Unsatisfiable clue window: every dig lands outside it.
        let cfg = GenerateRunConfig {
            box_rows: 2,
            box_cols: 2,
            min_clues: 1,
            max_clues: 2,
            require_unique: false,
            ..GenerateRunConfig::default()
        };
        let outcome = try_generate(&cfg, 1);
        // With at most 2 clues a 4x4 is wildly ambiguous; whichever stage
        // fires first, the attempt must not be accepted.
        assert!(outcome.result.is_err());
    }
}
