use omnidoku_solver::StrategyKind;

use crate::simd::Backend;

/// The stage at which a generation attempt was rejected.
///
/// A rejection is a normal outcome of an attempt, not an error; the runner
/// counts each reason separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The dug puzzle failed the quick validity prefilter.
    Prefilter,
    /// The puzzle was contradictory, or strict-logical mode demanded a
    /// singles-solvable puzzle and did not get one.
    Logic,
    /// The puzzle admits more than one solution.
    Uniqueness,
    /// The difficulty or required-strategy constraint did not match.
    Strategy,
    /// Replay validation failed.
    Replay,
    /// The distribution filter rejected the puzzle.
    DistributionBias,
    /// The uniqueness counter exhausted its budget.
    UniquenessBudget,
}

/// Configuration for a generation run.
///
/// Zeroed clue bounds, thread count and seed mean "derive automatically":
/// clue bounds from geometry and difficulty, threads from the hardware, the
/// seed from the clock.
#[derive(Debug, Clone)]
pub struct GenerateRunConfig {
    /// Box height.
    pub box_rows: u8,
    /// Box width.
    pub box_cols: u8,
    /// Stop once this many puzzles are accepted.
    pub target_puzzles: u64,
    /// Minimum clue count (`0` = derive from geometry and difficulty).
    pub min_clues: usize,
    /// Maximum clue count (`0` = derive from geometry and difficulty).
    pub max_clues: usize,
    /// Required difficulty level, 1 through 9.
    pub difficulty_level_required: u8,
    /// Strategy the accepted puzzles must require, if any.
    pub required_strategy: Option<StrategyKind>,
    /// Enforce single-solution puzzles.
    pub require_unique: bool,
    /// Reject puzzles that need backtracking.
    pub strict_logical: bool,
    /// Dig with 180-degree center symmetry.
    pub symmetry_center: bool,
    /// Worker threads (`0` = hardware concurrency).
    pub threads: usize,
    /// Base RNG seed (`0` = time-seeded).
    pub seed: u64,
    /// Reseed workers from the clock at this interval (`0` = never).
    pub reseed_interval_s: u64,
    /// Derive a fresh RNG stream for every attempt.
    pub force_new_seed_per_attempt: bool,
    /// Per-attempt wall-clock budget in seconds (`0.0` = unbounded).
    pub attempt_time_budget_s: f64,
    /// Per-attempt search-node budget (`0` = unbounded).
    pub attempt_node_budget: u64,
    /// Global attempt cap (`0` = unbounded).
    pub max_attempts: u64,
    /// Global wall-clock cap in seconds (`0` = unbounded).
    pub max_total_time_s: u64,
    /// Preferred SIMD backend for the solved-grid kernel scans.
    pub cpu_backend: Backend,
    /// Directory receiving the batch file and per-puzzle files.
    pub output_folder: String,
    /// Batch output file name.
    pub output_file: String,
    /// Also write one `sudoku_<k>.txt` file per accepted puzzle.
    pub write_individual_files: bool,
    /// Relax verification stages and cap the runtime for smoke runs.
    pub fast_test_mode: bool,
}

impl Default for GenerateRunConfig {
    fn default() -> Self {
        Self {
            box_rows: 3,
            box_cols: 3,
            target_puzzles: 100,
            min_clues: 0,
            max_clues: 0,
            difficulty_level_required: 1,
            required_strategy: None,
            require_unique: true,
            strict_logical: false,
            symmetry_center: false,
            threads: 0,
            seed: 0,
            reseed_interval_s: 0,
            force_new_seed_per_attempt: false,
            attempt_time_budget_s: 0.0,
            attempt_node_budget: 0,
            max_attempts: 0,
            max_total_time_s: 0,
            cpu_backend: Backend::Scalar,
            output_folder: "generated_sudoku_files".to_owned(),
            output_file: "generated_sudoku.txt".to_owned(),
            write_individual_files: false,
            fast_test_mode: false,
        }
    }
}

impl GenerateRunConfig {
    /// Effective difficulty level: the configured level raised to the
    /// minimum rank of the required strategy.
    #[must_use]
    pub fn effective_level(&self) -> u8 {
        let level = self.difficulty_level_required.clamp(1, 9);
        match self.required_strategy {
            Some(kind) => level.max(kind.rank()),
            None => level,
        }
    }

    /// Resolves derived settings against a concrete geometry: clue bounds,
    /// fast-test caps and budget defaults. Returns the adjusted copy used
    /// for the run.
    #[must_use]
    pub fn resolved(&self, nn: usize) -> Self {
        let mut cfg = self.clone();
        if cfg.min_clues == 0 || cfg.max_clues == 0 || cfg.max_clues < cfg.min_clues {
            let (auto_min, auto_max) = resolve_auto_clue_range(
                cfg.box_rows,
                cfg.box_cols,
                cfg.difficulty_level_required,
                cfg.required_strategy,
            );
            if cfg.min_clues == 0 {
                cfg.min_clues = auto_min;
            }
            if cfg.max_clues == 0 {
                cfg.max_clues = auto_max;
            }
            if cfg.max_clues < cfg.min_clues {
                cfg.max_clues = cfg.min_clues;
            }
        }
        cfg.min_clues = cfg.min_clues.min(nn);
        cfg.max_clues = cfg.max_clues.clamp(cfg.min_clues, nn);

        if cfg.fast_test_mode {
            // Smoke profile: bounded runtime, heavy verification off.
            cfg.require_unique = false;
            cfg.strict_logical = false;
            if cfg.max_attempts == 0 {
                cfg.max_attempts = 32u64.max(cfg.target_puzzles.saturating_mul(32));
            }
            if cfg.max_total_time_s == 0 {
                cfg.max_total_time_s = 20;
            }
            if cfg.attempt_time_budget_s <= 0.0 {
                cfg.attempt_time_budget_s = if cfg.difficulty_level_required >= 7 {
                    1.2
                } else {
                    0.7
                };
            }
            if cfg.attempt_node_budget == 0 {
                let suggested =
                    suggest_attempt_node_budget(cfg.box_rows, cfg.box_cols, cfg.effective_level());
                cfg.attempt_node_budget = 20_000u64.max(suggested / 8);
            }
        }
        cfg
    }
}

/// Derives a clue range from geometry, difficulty and required strategy.
///
/// Harder levels dig deeper: the upper clue ratio shrinks from 0.62 by
/// 0.035 per level, and the lower bound trails it by a tenth of the board.
#[must_use]
pub fn resolve_auto_clue_range(
    box_rows: u8,
    box_cols: u8,
    difficulty_level: u8,
    required: Option<StrategyKind>,
) -> (usize, usize) {
    let n = usize::from(box_rows.max(1)) * usize::from(box_cols.max(1));
    let nn = n * n;
    let level = usize::from(
        difficulty_level
            .clamp(1, 9)
            .max(required.map_or(1, StrategyKind::rank)),
    );

    #[expect(clippy::cast_precision_loss)]
    let nn_f = nn as f64;
    #[expect(clippy::cast_precision_loss)]
    let ratio_hi = (0.62 - 0.035 * (level as f64 - 1.0)).clamp(0.18, 0.70);
    let ratio_lo = (ratio_hi - 0.10).clamp(0.12, ratio_hi);

    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mut min_clues = (ratio_lo * nn_f) as usize;
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mut max_clues = (ratio_hi * nn_f) as usize;

    min_clues = min_clues.max(4).max(n);
    max_clues = max_clues.max(min_clues + 2.max(n / 4));

    min_clues = min_clues.min(nn);
    max_clues = max_clues.clamp(min_clues, nn);
    (min_clues, max_clues)
}

/// Suggests a per-attempt node budget scaled by board area and level.
#[must_use]
pub fn suggest_attempt_node_budget(box_rows: u8, box_cols: u8, effective_level: u8) -> u64 {
    let n = u64::from(box_rows.max(1)) * u64::from(box_cols.max(1));
    let level = u64::from(effective_level.clamp(1, 9));
    (n * n * (200 + 60 * level)).clamp(50_000, 20_000_000)
}

/// Aggregated counters and derived metrics of a completed run.
#[derive(Debug, Clone, Default)]
pub struct GenerateRunResult {
    /// Puzzles accepted toward the target.
    pub accepted: u64,
    /// Lines written to the batch file.
    pub written: u64,
    /// Generation attempts started.
    pub attempts: u64,
    /// Attempts rejected at any stage.
    pub rejected: u64,

    /// Rejections by the quick prefilter.
    pub reject_prefilter: u64,
    /// Rejections by logic (contradiction or strict-logical miss).
    pub reject_logic: u64,
    /// Rejections for multiple solutions.
    pub reject_uniqueness: u64,
    /// Rejections for difficulty or required-strategy mismatch.
    pub reject_strategy: u64,
    /// Rejections by replay validation.
    pub reject_replay: u64,
    /// Rejections by the distribution filter.
    pub reject_distribution_bias: u64,
    /// Rejections after the uniqueness counter exhausted its budget.
    pub reject_uniqueness_budget: u64,

    /// Uniqueness-counter invocations.
    pub uniqueness_calls: u64,
    /// Search nodes spent inside the uniqueness counter.
    pub uniqueness_nodes: u64,
    /// Wall time spent inside the uniqueness counter, in milliseconds.
    pub uniqueness_elapsed_ms: f64,
    /// Mean uniqueness-counter call time, in milliseconds.
    pub uniqueness_avg_ms: f64,

    /// SIMD backend the run actually used.
    pub cpu_backend_selected: Backend,
    /// Solved-grid kernel invocations (one per attempt).
    pub kernel_calls: u64,
    /// Wall time spent in the solved-grid and dig kernels, in milliseconds.
    pub kernel_time_ms: f64,
    /// Accepted puzzles per kernel second.
    pub backend_efficiency_score: f64,
    /// `max(box_rows, box_cols) / min(box_rows, box_cols)`.
    pub asymmetry_efficiency_index: f64,

    /// Certifier steps across all attempts.
    pub logic_steps_total: u64,
    /// Naked-single scans and hits across all attempts.
    pub strategy_naked_use: u64,
    /// Naked-single scans that progressed.
    pub strategy_naked_hit: u64,
    /// Hidden-single scans across all attempts.
    pub strategy_hidden_use: u64,
    /// Hidden-single scans that progressed.
    pub strategy_hidden_hit: u64,

    /// Worker reseeds performed.
    pub reseeds: u64,
    /// Total wall time of the run, in seconds.
    pub elapsed_s: f64,
    /// Accepted puzzles per second.
    pub accepted_per_sec: f64,
    /// Hash over the key totals (first 16 hex characters of SHA-256).
    pub run_signature: String,
    /// Second hash variant over the same totals.
    pub run_signature_v2: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_clue_range_classic_geometry() {
        let (min_clues, max_clues) = resolve_auto_clue_range(3, 3, 1, None);
        assert!(min_clues >= 9);
        assert!(max_clues <= 81);
        assert!(min_clues < max_clues);

        // Harder levels dig deeper.
        let (hard_min, hard_max) = resolve_auto_clue_range(3, 3, 9, None);
        assert!(hard_max <= max_clues);
        assert!(hard_min <= min_clues);
    }

    #[test]
    fn test_auto_clue_range_respects_required_strategy() {
        let relaxed = resolve_auto_clue_range(3, 3, 1, None);
        let forced = resolve_auto_clue_range(3, 3, 1, Some(StrategyKind::Swordfish));
        assert!(forced.1 <= relaxed.1);
    }

    #[test]
    fn test_node_budget_scales_and_clamps() {
        assert_eq!(suggest_attempt_node_budget(2, 2, 1), 50_000);
        let classic = suggest_attempt_node_budget(3, 3, 5);
        assert!(classic >= 50_000);
        assert!(suggest_attempt_node_budget(8, 8, 9) <= 20_000_000);
    }

    #[test]
    fn test_resolved_fills_clue_bounds() {
        let cfg = GenerateRunConfig {
            box_rows: 3,
            box_cols: 3,
            ..GenerateRunConfig::default()
        };
        let resolved = cfg.resolved(81);
        assert!(resolved.min_clues > 0);
        assert!(resolved.max_clues >= resolved.min_clues);
        assert!(resolved.max_clues <= 81);
    }

    #[test]
    fn test_fast_test_mode_caps_run() {
        let cfg = GenerateRunConfig {
            fast_test_mode: true,
            target_puzzles: 2,
            require_unique: true,
            ..GenerateRunConfig::default()
        };
        let resolved = cfg.resolved(81);
        assert!(!resolved.require_unique);
        assert_eq!(resolved.max_attempts, 64);
        assert_eq!(resolved.max_total_time_s, 20);
        assert!(resolved.attempt_time_budget_s > 0.0);
        assert!(resolved.attempt_node_budget >= 20_000);
    }

    #[test]
    fn test_effective_level_raises_to_strategy_rank() {
        let cfg = GenerateRunConfig {
            difficulty_level_required: 2,
            required_strategy: Some(StrategyKind::Jellyfish),
            ..GenerateRunConfig::default()
        };
        assert_eq!(cfg.effective_level(), 6);
    }
}
