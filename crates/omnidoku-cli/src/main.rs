//! Command-line front end for the Omnidoku generator.
//!
//! Exit codes: 0 on success (target reached or cancelled after emitting
//! zero or more puzzles), 1 on invalid geometry or catalog failure, 2 on a
//! fatal runtime error.

use std::{
    io::{BufRead as _, IsTerminal as _},
    process::ExitCode,
    thread,
    time::Duration,
};

use clap::Parser;
use omnidoku_core::{SharedFlag, Topology, supported_geometries};
use omnidoku_generator::{
    Backend, GenerateRunConfig, GenerateRunResult, StatsMonitor,
    runner::{self, RunError, RunHooks},
};
use omnidoku_solver::StrategyKind;

/// Generates Sudoku puzzles over generalized rectangular box geometries.
#[derive(Debug, Parser)]
#[command(name = "omnidoku", version, about)]
struct Cli {
    /// Box height.
    #[arg(long, default_value_t = 3)]
    box_rows: u8,

    /// Box width.
    #[arg(long, default_value_t = 3)]
    box_cols: u8,

    /// Number of puzzles to generate.
    #[arg(long, default_value_t = 100)]
    target: u64,

    /// Required difficulty level (1..=9).
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=9))]
    difficulty: u8,

    /// Strategy every accepted puzzle must require (token, e.g. `xwing`).
    #[arg(long)]
    required_strategy: Option<StrategyKind>,

    /// Worker threads (0 = hardware concurrency).
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Base RNG seed (0 = time-seeded).
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Minimum clue count (0 = derive from geometry and difficulty).
    #[arg(long, default_value_t = 0)]
    min_clues: usize,

    /// Maximum clue count (0 = derive from geometry and difficulty).
    #[arg(long, default_value_t = 0)]
    max_clues: usize,

    /// Global wall-clock cap in seconds (0 = unbounded).
    #[arg(long, default_value_t = 0)]
    max_total_time_s: u64,

    /// Per-attempt wall-clock budget in seconds (0 = unbounded).
    #[arg(long, default_value_t = 0.0)]
    attempt_time_budget_s: f64,

    /// Per-attempt search-node budget (0 = unbounded).
    #[arg(long, default_value_t = 0)]
    attempt_node_budget: u64,

    /// Global attempt cap (0 = unbounded).
    #[arg(long, default_value_t = 0)]
    max_attempts: u64,

    /// Reseed workers from the clock at this interval (0 = never).
    #[arg(long, default_value_t = 0)]
    reseed_interval_s: u64,

    /// Output directory.
    #[arg(long, default_value = "generated_sudoku_files")]
    output_folder: String,

    /// Batch output file name.
    #[arg(long, default_value = "generated_sudoku.txt")]
    output_file: String,

    /// Write only the batch file, no per-puzzle files.
    #[arg(long)]
    single_file_only: bool,

    /// Dig with 180-degree center symmetry.
    #[arg(long)]
    symmetry_center: bool,

    /// Relaxed smoke profile with bounded runtime.
    #[arg(long)]
    fast_test: bool,

    /// Reject puzzles that need backtracking.
    #[arg(long)]
    strict_logical: bool,

    /// Accept puzzles with multiple solutions (skips the uniqueness check).
    #[arg(long)]
    allow_non_unique: bool,

    /// SIMD backend preference: scalar, avx2 or avx512.
    #[arg(long, default_value = "scalar")]
    cpu_backend: Backend,

    /// Print every supported (box_rows, box_cols) pair and exit.
    #[arg(long)]
    list_geometries: bool,

    /// Validate one geometry (`--validate-geometry <ROWS> <COLS>`) and exit.
    #[arg(long, num_args = 2, value_names = ["ROWS", "COLS"])]
    validate_geometry: Option<Vec<u8>>,

    /// Validate every supported geometry and exit.
    #[arg(long)]
    validate_geometry_catalog: bool,
}

fn list_geometries() {
    println!("Supported geometries (asymmetric included), n in [4,64]");
    let pairs = supported_geometries();
    for n in 4..=64u16 {
        let row: Vec<String> = pairs
            .iter()
            .filter(|&&(rows, cols)| u16::from(rows) * u16::from(cols) == n)
            .map(|&(rows, cols)| format!("{rows}x{cols}"))
            .collect();
        if !row.is_empty() {
            println!("n={n}: {}", row.join(", "));
        }
    }
}

fn validate_geometry(box_rows: u8, box_cols: u8) -> bool {
    match Topology::build(box_rows, box_cols) {
        Ok(topo) => {
            println!("geometry {box_rows}x{box_cols}: ok");
            println!(
                "n={} nn={} box_rows_count={} box_cols_count={}",
                topo.n(),
                topo.nn(),
                topo.box_rows_count(),
                topo.box_cols_count()
            );
            true
        }
        Err(error) => {
            println!("geometry {box_rows}x{box_cols}: fail");
            println!("reason: {error}");
            false
        }
    }
}

fn validate_geometry_catalog() -> bool {
    let mut cases = 0usize;
    for (box_rows, box_cols) in supported_geometries() {
        let topo = match Topology::build(box_rows, box_cols) {
            Ok(topo) => topo,
            Err(error) => {
                println!("FAIL {box_rows}x{box_cols}: {error}");
                return false;
            }
        };
        if topo.house_count() != 3 * usize::from(topo.n()) {
            println!("FAIL {box_rows}x{box_cols}: house count mismatch");
            return false;
        }
        cases += 1;
    }
    println!("Geometry catalog validation OK. cases={cases}");
    true
}

/// Spawns the hotkey reader: `P` toggles pause, `C`/`Q` cancels, `H`/`?`
/// prints help.
fn spawn_hotkey_thread(cancel: SharedFlag, pause: SharedFlag) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match line.trim().to_ascii_lowercase().as_str() {
                "p" => {
                    pause.set(!pause.get());
                    println!("[CLI] pause={}", pause.get());
                }
                "c" | "q" => {
                    cancel.set(true);
                    println!("[CLI] cancel requested");
                    break;
                }
                "h" | "?" => {
                    println!("[CLI] hotkeys: P pause/resume, C or Q cancel, H help");
                }
                _ => {}
            }
        }
    });
}

/// Spawns the 3-second status line while the run is live.
fn spawn_status_thread(cancel: SharedFlag, pause: SharedFlag, done: SharedFlag) {
    thread::spawn(move || {
        while !done.get() {
            let state = if cancel.get() {
                "cancel_requested"
            } else if pause.get() {
                "paused"
            } else {
                "running"
            };
            println!("[CLI] state={state}");
            for _ in 0..30 {
                if done.get() {
                    return;
                }
                thread::sleep(Duration::from_millis(100));
            }
        }
    });
}

fn print_summary(result: &GenerateRunResult) {
    println!("accepted={} written={} attempts={}", result.accepted, result.written, result.attempts);
    println!(
        "rejected={} (prefilter={} logic={} uniqueness={} strategy={} uniqueness_budget={})",
        result.rejected,
        result.reject_prefilter,
        result.reject_logic,
        result.reject_uniqueness,
        result.reject_strategy,
        result.reject_uniqueness_budget,
    );
    println!(
        "uniqueness: calls={} nodes={} elapsed_ms={:.2} avg_ms={:.3}",
        result.uniqueness_calls,
        result.uniqueness_nodes,
        result.uniqueness_elapsed_ms,
        result.uniqueness_avg_ms,
    );
    println!(
        "kernel: backend={} calls={} time_ms={:.2} efficiency={:.2}",
        result.cpu_backend_selected,
        result.kernel_calls,
        result.kernel_time_ms,
        result.backend_efficiency_score,
    );
    println!(
        "elapsed_s={:.2} accepted_per_sec={:.3} reseeds={} signature={}",
        result.elapsed_s, result.accepted_per_sec, result.reseeds, result.run_signature,
    );
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if cli.list_geometries {
        list_geometries();
        return ExitCode::SUCCESS;
    }
    if let Some(pair) = &cli.validate_geometry {
        let ok = pair.len() == 2 && validate_geometry(pair[0], pair[1]);
        return if ok { ExitCode::SUCCESS } else { ExitCode::from(1) };
    }
    if cli.validate_geometry_catalog {
        return if validate_geometry_catalog() {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(1)
        };
    }

    let cfg = GenerateRunConfig {
        box_rows: cli.box_rows,
        box_cols: cli.box_cols,
        target_puzzles: cli.target,
        difficulty_level_required: cli.difficulty,
        required_strategy: cli.required_strategy,
        threads: cli.threads,
        seed: cli.seed,
        min_clues: cli.min_clues,
        max_clues: cli.max_clues,
        max_total_time_s: cli.max_total_time_s,
        attempt_time_budget_s: cli.attempt_time_budget_s,
        attempt_node_budget: cli.attempt_node_budget,
        max_attempts: cli.max_attempts,
        reseed_interval_s: cli.reseed_interval_s,
        output_folder: cli.output_folder.clone(),
        output_file: cli.output_file.clone(),
        write_individual_files: !cli.single_file_only,
        symmetry_center: cli.symmetry_center,
        fast_test_mode: cli.fast_test,
        strict_logical: cli.strict_logical,
        require_unique: !cli.allow_non_unique,
        cpu_backend: cli.cpu_backend,
        ..GenerateRunConfig::default()
    };

    let cancel = SharedFlag::new();
    let pause = SharedFlag::new();
    let done = SharedFlag::new();
    if std::io::stdin().is_terminal() {
        spawn_hotkey_thread(cancel.clone(), pause.clone());
        spawn_status_thread(cancel.clone(), pause.clone(), done.clone());
    }

    let monitor = StatsMonitor::new();
    let on_progress = |accepted: u64, target: u64| {
        log::info!("progress {accepted}/{target}");
    };
    let on_log = |message: &str| {
        println!("[runner] {message}");
    };
    let hooks = RunHooks {
        monitor: Some(&monitor),
        cancel: Some(cancel.clone()),
        pause: Some(pause.clone()),
        on_progress: Some(&on_progress),
        on_log: Some(&on_log),
    };

    let outcome = runner::run(&cfg, hooks);
    done.set(true);
    match outcome {
        Ok(result) => {
            print_summary(&result);
            ExitCode::SUCCESS
        }
        Err(RunError::Geometry(error)) => {
            eprintln!("invalid geometry: {error}");
            ExitCode::from(1)
        }
        Err(RunError::Io(error)) => {
            eprintln!("fatal runtime error: {error}");
            ExitCode::from(2)
        }
    }
}
