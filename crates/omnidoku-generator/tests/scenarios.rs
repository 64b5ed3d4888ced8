//! End-to-end generation scenarios across geometries and configurations.

use std::{
    fs,
    path::Path,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use omnidoku_core::{SearchAbortControl, SharedFlag, Topology};
use omnidoku_generator::{
    GenerateRunConfig, UniquenessCounter, parse_line,
    runner::{self, RunHooks},
};
use omnidoku_solver::StrategyKind;
use rayon::prelude::*;

fn unique_output_dir(tag: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir()
        .join(format!("omnidoku_scenario_{tag}_{}_{count}", std::process::id()))
        .to_string_lossy()
        .into_owned()
}

fn read_lines(cfg: &GenerateRunConfig) -> Vec<String> {
    let path = Path::new(&cfg.output_folder).join(&cfg.output_file);
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_owned)
        .collect()
}

fn cleanup(cfg: &GenerateRunConfig) {
    let _ = fs::remove_dir_all(&cfg.output_folder);
}

#[test]
fn scenario_single_easy_puzzle_with_required_strategy() {
    let cfg = GenerateRunConfig {
        box_rows: 3,
        box_cols: 3,
        target_puzzles: 1,
        threads: 1,
        seed: 0xC0FFEE,
        difficulty_level_required: 1,
        required_strategy: Some(StrategyKind::NakedSingle),
        min_clues: 40,
        max_clues: 50,
        require_unique: true,
        max_total_time_s: 120,
        output_folder: unique_output_dir("s1"),
        ..GenerateRunConfig::default()
    };
    let result = runner::run(&cfg, RunHooks::default()).unwrap();

    assert_eq!(result.accepted, 1);
    let lines = read_lines(&cfg);
    assert_eq!(lines.len(), 1);
    let parsed = parse_line(&lines[0]).unwrap();
    assert_eq!(parsed.difficulty, 1);
    assert!((40..=50).contains(&parsed.clues));

    // The emitted puzzle is uniquely solvable and its unique completion is
    // exactly the emitted solution.
    let topo = Topology::shared(3, 3).unwrap();
    let mut counter = UniquenessCounter::new();
    let mut budget = SearchAbortControl::new();
    assert_eq!(
        counter.count_solutions_limit2(&parsed.puzzle, &topo, &mut budget),
        1
    );
    let solved = counter.count_solutions_limit(&parsed.solution, &topo, 2, &mut budget);
    assert_eq!(solved, 1, "the emitted solution is a valid full grid");
    for (idx, &value) in parsed.puzzle.iter().enumerate() {
        assert!(value == 0 || value == parsed.solution[idx]);
    }
    cleanup(&cfg);
}

#[test]
fn scenario_asymmetric_geometry_batch() {
    // 2x3 boxes, n = 6: every accepted solution covers each house with
    // digits 1..=6.
    let cfg = GenerateRunConfig {
        box_rows: 2,
        box_cols: 3,
        target_puzzles: 10,
        threads: 2,
        seed: 77,
        difficulty_level_required: 1,
        max_total_time_s: 120,
        max_attempts: 500_000,
        output_folder: unique_output_dir("s3"),
        ..GenerateRunConfig::default()
    };
    let result = runner::run(&cfg, RunHooks::default()).unwrap();
    let lines = read_lines(&cfg);
    assert_eq!(result.written, lines.len() as u64);

    let topo = Topology::shared(2, 3).unwrap();
    for line in &lines {
        let parsed = parse_line(line).unwrap();
        assert_eq!(parsed.puzzle.len(), 36);
        for house in 0..topo.house_count() {
            let mut seen = 0u64;
            for &idx in topo.house(house) {
                let value = parsed.solution[usize::from(idx)];
                assert!((1..=6).contains(&value));
                seen |= 1 << (value - 1);
            }
            assert_eq!(seen, 0b11_1111, "house {house} misses digits");
        }
    }
    cleanup(&cfg);
}

#[test]
fn scenario_cancel_after_first_write() {
    let cfg = GenerateRunConfig {
        box_rows: 3,
        box_cols: 3,
        target_puzzles: 1_000_000,
        threads: 2,
        difficulty_level_required: 1,
        min_clues: 40,
        max_clues: 50,
        max_total_time_s: 60,
        output_folder: unique_output_dir("s4"),
        ..GenerateRunConfig::default()
    };
    let cancel = SharedFlag::new();
    let progress_cancel = cancel.clone();
    let on_progress = move |accepted: u64, _target: u64| {
        if accepted >= 1 {
            progress_cancel.set(true);
        }
    };
    let hooks = RunHooks {
        cancel: Some(cancel),
        on_progress: Some(&on_progress),
        ..RunHooks::default()
    };
    let result = runner::run(&cfg, hooks).unwrap();

    assert!(result.accepted >= 1);
    assert!(!read_lines(&cfg).is_empty());
    cleanup(&cfg);
}

#[test]
fn scenario_global_deadline_keeps_counters_consistent() {
    let cfg = GenerateRunConfig {
        box_rows: 3,
        box_cols: 3,
        target_puzzles: 1_000_000,
        threads: 2,
        difficulty_level_required: 7,
        max_total_time_s: 1,
        attempt_time_budget_s: 0.2,
        output_folder: unique_output_dir("s5"),
        ..GenerateRunConfig::default()
    };
    let started = Instant::now();
    let result = runner::run(&cfg, RunHooks::default()).unwrap();

    // Generous in absolute terms: unoptimized strategy rounds are slow,
    // but the deadline must still cut the run off far below the target.
    assert!(started.elapsed() < Duration::from_secs(45));
    let reject_sum = result.reject_prefilter
        + result.reject_logic
        + result.reject_uniqueness
        + result.reject_strategy
        + result.reject_replay
        + result.reject_distribution_bias
        + result.reject_uniqueness_budget;
    assert_eq!(result.rejected, reject_sum);
    assert_eq!(result.attempts, result.accepted + result.rejected);
    cleanup(&cfg);
}

#[test]
fn scenario_fast_test_mode_smoke() {
    let cfg = GenerateRunConfig {
        box_rows: 2,
        box_cols: 2,
        target_puzzles: 2,
        threads: 1,
        seed: 9,
        fast_test_mode: true,
        output_folder: unique_output_dir("fast"),
        ..GenerateRunConfig::default()
    };
    let started = Instant::now();
    let result = runner::run(&cfg, RunHooks::default()).unwrap();
    assert!(started.elapsed() < Duration::from_secs(30));
    assert!(result.accepted <= 2);
    cleanup(&cfg);
}

#[test]
fn scenario_emitted_batch_replays_in_parallel() {
    // Re-parse and re-verify an accepted batch with rayon: every line's
    // solution completes its puzzle uniquely.
    let cfg = GenerateRunConfig {
        box_rows: 3,
        box_cols: 3,
        target_puzzles: 4,
        threads: 2,
        seed: 1234,
        difficulty_level_required: 1,
        min_clues: 40,
        max_clues: 50,
        max_total_time_s: 120,
        output_folder: unique_output_dir("replay"),
        ..GenerateRunConfig::default()
    };
    let result = runner::run(&cfg, RunHooks::default()).unwrap();
    assert_eq!(result.accepted, 4);

    let lines = read_lines(&cfg);
    let topo = Topology::shared(3, 3).unwrap();
    let failures: Vec<String> = lines
        .par_iter()
        .filter_map(|line| {
            let parsed = parse_line(line).ok()?;
            let mut counter = UniquenessCounter::new();
            let mut budget = SearchAbortControl::new();
            let count = counter.count_solutions_limit2(&parsed.puzzle, &topo, &mut budget);
            (count != 1).then(|| format!("count {count} for seed {}", parsed.seed))
        })
        .collect();
    assert!(failures.is_empty(), "replay failures: {failures:?}");
    cleanup(&cfg);
}
