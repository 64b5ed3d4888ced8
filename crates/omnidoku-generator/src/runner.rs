//! Runtime runner: the fixed worker pool around the attempt loop.
//!
//! Workers share atomic counters, a single write mutex for the batch file
//! and a mutex-guarded reject tally. Termination is cooperative: target
//! reached, attempt cap, global deadline or the cancel flag. Pause is a
//! sleep loop; in-flight searches observe both flags through their budgets.

use std::{
    fmt::Write as _,
    fs,
    io::Write as _,
    path::Path,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    thread,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use derive_more::{Display, Error, From};
use omnidoku_core::{GeometryError, SharedFlag, Topology};
use rand::SeedableRng as _;
use rand_pcg::Pcg64Mcg;
use sha2::{Digest as _, Sha256};

use crate::{
    attempt::{AttemptScratch, generate_one},
    config::{GenerateRunConfig, GenerateRunResult, RejectReason},
    line::serialize_line,
    monitor::{StatsMonitor, WorkerRow},
    solved_kernel::SolvedKernel,
};

/// Fatal runner failures; rejections are counters, not errors.
#[derive(Debug, Display, Error, From)]
pub enum RunError {
    /// The configured geometry does not build.
    #[display("invalid geometry: {_0}")]
    Geometry(GeometryError),
    /// The output file or folder cannot be prepared.
    #[display("output i/o failure: {_0}")]
    Io(std::io::Error),
}

/// External collaborators observing or steering the run.
#[derive(Default)]
pub struct RunHooks<'a> {
    /// Statistics sink, updated periodically.
    pub monitor: Option<&'a StatsMonitor>,
    /// Cooperative cancellation; aborts searches at their next budget poll.
    pub cancel: Option<SharedFlag>,
    /// Cooperative pause; workers sleep while set.
    pub pause: Option<SharedFlag>,
    /// Called with `(accepted, target)` after every accepted puzzle.
    pub on_progress: Option<&'a (dyn Fn(u64, u64) + Sync)>,
    /// Called with occasional progress messages.
    pub on_log: Option<&'a (dyn Fn(&str) + Sync)>,
}

impl std::fmt::Debug for RunHooks<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHooks")
            .field("monitor", &self.monitor.is_some())
            .field("cancel", &self.cancel.is_some())
            .field("pause", &self.pause.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct RejectTally {
    rejected: u64,
    prefilter: u64,
    logic: u64,
    uniqueness: u64,
    strategy: u64,
    replay: u64,
    distribution_bias: u64,
    uniqueness_budget: u64,
}

impl RejectTally {
    /// Every attempt increments exactly one reason counter, keeping
    /// `attempts == accepted + sum(reject_*)`.
    fn account(&mut self, reason: RejectReason) {
        self.rejected += 1;
        match reason {
            RejectReason::Prefilter => self.prefilter += 1,
            RejectReason::Logic => self.logic += 1,
            RejectReason::Uniqueness => self.uniqueness += 1,
            RejectReason::Strategy => self.strategy += 1,
            RejectReason::Replay => self.replay += 1,
            RejectReason::DistributionBias => self.distribution_bias += 1,
            RejectReason::UniquenessBudget => self.uniqueness_budget += 1,
        }
    }
}

const GOLDEN_RATIO: u64 = 0x9e37_79b9_7f4a_7c15;
const FNV_PRIME: u64 = 0x1_0000_0001_b3;

fn time_seed() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);
    #[expect(clippy::cast_possible_truncation)]
    let seed = now.as_nanos() as u64;
    seed
}

fn signature_over(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    let mut out = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[expect(clippy::cast_precision_loss)]
fn nanos_to_ms(nanos: u64) -> f64 {
    nanos as f64 / 1e6
}

/// Runs the generation pipeline to completion.
///
/// # Errors
///
/// Returns [`RunError`] when the geometry is invalid or the output file
/// cannot be opened; everything downstream is reported through counters.
#[expect(clippy::too_many_lines)]
pub fn run(cfg: &GenerateRunConfig, hooks: RunHooks<'_>) -> Result<GenerateRunResult, RunError> {
    let topo = Topology::shared(cfg.box_rows, cfg.box_cols)?;
    let run_cfg = cfg.resolved(topo.nn());
    let backend = run_cfg.cpu_backend.resolve();

    let worker_count = if run_cfg.threads == 0 {
        thread::available_parallelism().map_or(1, |parallelism| parallelism.get())
    } else {
        run_cfg.threads
    };

    fs::create_dir_all(&run_cfg.output_folder)?;
    let output_path = Path::new(&run_cfg.output_folder).join(&run_cfg.output_file);
    let batch_out = Mutex::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&output_path)?,
    );

    if let Some(monitor) = hooks.monitor {
        monitor.set_run_info(
            run_cfg.target_puzzles,
            format!(
                "{}x{} level {}",
                run_cfg.box_rows, run_cfg.box_cols, run_cfg.difficulty_level_required
            ),
            worker_count,
        );
        monitor.set_background_status("runtime initialized".to_owned());
    }

    let accepted = AtomicU64::new(0);
    let written = AtomicU64::new(0);
    let attempts = AtomicU64::new(0);
    let uniqueness_calls = AtomicU64::new(0);
    let uniqueness_nodes = AtomicU64::new(0);
    let uniqueness_elapsed_ns = AtomicU64::new(0);
    let logic_steps = AtomicU64::new(0);
    let naked_use = AtomicU64::new(0);
    let naked_hit = AtomicU64::new(0);
    let hidden_use = AtomicU64::new(0);
    let hidden_hit = AtomicU64::new(0);
    let kernel_elapsed_ns = AtomicU64::new(0);
    let kernel_calls = AtomicU64::new(0);
    let reseeds = AtomicU64::new(0);
    let tally = Mutex::new(RejectTally::default());

    let start = Instant::now();
    let global_deadline =
        (run_cfg.max_total_time_s > 0).then(|| start + Duration::from_secs(run_cfg.max_total_time_s));
    let base_seed = if run_cfg.seed == 0 {
        time_seed()
    } else {
        run_cfg.seed
    };

    let is_cancelled = || hooks.cancel.as_ref().is_some_and(SharedFlag::get);
    let is_paused = || hooks.pause.as_ref().is_some_and(SharedFlag::get);

    thread::scope(|scope| {
        for worker_idx in 0..worker_count {
            let run_cfg = &run_cfg;
            let topo = &topo;
            let hooks = &hooks;
            let accepted = &accepted;
            let written = &written;
            let attempts = &attempts;
            let uniqueness_calls = &uniqueness_calls;
            let uniqueness_nodes = &uniqueness_nodes;
            let uniqueness_elapsed_ns = &uniqueness_elapsed_ns;
            let logic_steps = &logic_steps;
            let naked_use = &naked_use;
            let naked_hit = &naked_hit;
            let hidden_use = &hidden_use;
            let hidden_hit = &hidden_hit;
            let kernel_elapsed_ns = &kernel_elapsed_ns;
            let kernel_calls = &kernel_calls;
            let reseeds = &reseeds;
            let tally = &tally;
            let batch_out = &batch_out;
            let is_cancelled = &is_cancelled;
            let is_paused = &is_paused;

            scope.spawn(move || {
                let worker_stride = u64::try_from(worker_idx).unwrap_or(0);
                let mut worker_seed =
                    base_seed ^ GOLDEN_RATIO.wrapping_add(worker_stride.wrapping_mul(FNV_PRIME));
                let mut rng = Pcg64Mcg::seed_from_u64(worker_seed);
                let kernel = SolvedKernel::new(backend);
                let mut scratch = AttemptScratch::new(topo);
                let mut local_attempts = 0u64;
                let mut last_reseed = Instant::now();

                loop {
                    if is_cancelled() {
                        break;
                    }
                    if let Some(deadline) = global_deadline
                        && Instant::now() >= deadline
                    {
                        break;
                    }
                    while is_paused() && !is_cancelled() {
                        thread::sleep(Duration::from_millis(20));
                    }
                    if accepted.load(Ordering::Relaxed) >= run_cfg.target_puzzles {
                        break;
                    }
                    if run_cfg.max_attempts > 0
                        && attempts.load(Ordering::Relaxed) >= run_cfg.max_attempts
                    {
                        break;
                    }

                    if run_cfg.reseed_interval_s > 0
                        && last_reseed.elapsed() >= Duration::from_secs(run_cfg.reseed_interval_s)
                    {
                        worker_seed = time_seed()
                            ^ GOLDEN_RATIO.wrapping_add(worker_stride.wrapping_mul(FNV_PRIME));
                        rng = Pcg64Mcg::seed_from_u64(worker_seed);
                        last_reseed = Instant::now();
                        reseeds.fetch_add(1, Ordering::Relaxed);
                    }

                    local_attempts += 1;
                    attempts.fetch_add(1, Ordering::Relaxed);

                    // A reproducible per-line seed; with per-attempt
                    // reseeding it also drives the RNG stream.
                    let line_seed = worker_seed.wrapping_add(local_attempts);
                    if run_cfg.force_new_seed_per_attempt {
                        rng = Pcg64Mcg::seed_from_u64(line_seed);
                    }

                    let outcome = generate_one(
                        run_cfg,
                        topo,
                        &kernel,
                        &mut scratch,
                        &mut rng,
                        hooks.cancel.as_ref(),
                        hooks.pause.as_ref(),
                        global_deadline,
                    );

                    let perf = outcome.perf;
                    kernel_elapsed_ns.fetch_add(
                        u64::try_from(
                            (perf.solved_elapsed + perf.dig_elapsed).as_nanos(),
                        )
                        .unwrap_or(u64::MAX),
                        Ordering::Relaxed,
                    );
                    kernel_calls.fetch_add(1, Ordering::Relaxed);
                    uniqueness_calls.fetch_add(perf.uniqueness_calls, Ordering::Relaxed);
                    uniqueness_nodes.fetch_add(perf.uniqueness_nodes, Ordering::Relaxed);
                    uniqueness_elapsed_ns.fetch_add(
                        u64::try_from(perf.uniqueness_elapsed.as_nanos()).unwrap_or(u64::MAX),
                        Ordering::Relaxed,
                    );
                    logic_steps.fetch_add(perf.logic_steps, Ordering::Relaxed);
                    naked_use.fetch_add(perf.naked_use, Ordering::Relaxed);
                    naked_hit.fetch_add(perf.naked_hit, Ordering::Relaxed);
                    hidden_use.fetch_add(perf.hidden_use, Ordering::Relaxed);
                    hidden_hit.fetch_add(perf.hidden_hit, Ordering::Relaxed);

                    let mut latest_clues = 0;
                    match outcome.result {
                        Ok(candidate) => {
                            latest_clues = candidate.clues;
                            // Reserve an accepted slot against the target.
                            let mut slot = None;
                            loop {
                                let current = accepted.load(Ordering::Relaxed);
                                if current >= run_cfg.target_puzzles {
                                    break;
                                }
                                if accepted
                                    .compare_exchange_weak(
                                        current,
                                        current + 1,
                                        Ordering::Relaxed,
                                        Ordering::Relaxed,
                                    )
                                    .is_ok()
                                {
                                    slot = Some(current + 1);
                                    break;
                                }
                            }
                            let Some(accepted_idx) = slot else {
                                continue;
                            };

                            let line = serialize_line(
                                line_seed,
                                run_cfg.box_rows,
                                run_cfg.box_cols,
                                candidate.clues,
                                &candidate.puzzle,
                                &candidate.solution,
                                candidate.difficulty,
                                &candidate.strategy,
                            );
                            {
                                let mut out =
                                    batch_out.lock().unwrap_or_else(PoisonError::into_inner);
                                let write_failed = writeln!(out, "{line}").is_err();
                                if write_failed {
                                    log::warn!("batch write failed; line dropped");
                                } else {
                                    written.fetch_add(1, Ordering::Relaxed);
                                }
                                if run_cfg.write_individual_files {
                                    let path = Path::new(&run_cfg.output_folder)
                                        .join(format!("sudoku_{accepted_idx}.txt"));
                                    if let Err(error) = fs::write(&path, format!("{line}\n")) {
                                        log::warn!("per-puzzle write failed: {error}");
                                    }
                                }
                            }

                            if let Some(on_progress) = hooks.on_progress {
                                on_progress(accepted_idx, run_cfg.target_puzzles);
                            }
                            if let Some(on_log) = hooks.on_log
                                && (accepted_idx % 10 == 0
                                    || accepted_idx == run_cfg.target_puzzles)
                            {
                                on_log(&format!(
                                    "accepted={accepted_idx}/{}",
                                    run_cfg.target_puzzles
                                ));
                            }
                        }
                        Err(reason) => {
                            tally
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .account(reason);
                        }
                    }

                    if let Some(monitor) = hooks.monitor
                        && local_attempts % 16 == 0
                    {
                        monitor.set_totals(
                            accepted.load(Ordering::Relaxed),
                            written.load(Ordering::Relaxed),
                            attempts.load(Ordering::Relaxed),
                            tally.lock().unwrap_or_else(PoisonError::into_inner).rejected,
                        );
                        monitor.set_reseeds(reseeds.load(Ordering::Relaxed));
                        monitor.set_worker_row(
                            worker_idx,
                            WorkerRow {
                                worker: format!("worker_{worker_idx}"),
                                clues: latest_clues,
                                seed: worker_seed,
                                attempts: local_attempts,
                                status: if is_paused() { "paused" } else { "running" }
                                    .to_owned(),
                                stage_solved_ms: nanos_to_ms(
                                    u64::try_from(perf.solved_elapsed.as_nanos())
                                        .unwrap_or(u64::MAX),
                                ),
                                stage_dig_ms: nanos_to_ms(
                                    u64::try_from(perf.dig_elapsed.as_nanos())
                                        .unwrap_or(u64::MAX),
                                ),
                                stage_prefilter_ms: nanos_to_ms(
                                    u64::try_from(perf.prefilter_elapsed.as_nanos())
                                        .unwrap_or(u64::MAX),
                                ),
                                stage_logic_ms: nanos_to_ms(
                                    u64::try_from(perf.logic_elapsed.as_nanos())
                                        .unwrap_or(u64::MAX),
                                ),
                                stage_uniqueness_ms: nanos_to_ms(
                                    u64::try_from(perf.uniqueness_elapsed.as_nanos())
                                        .unwrap_or(u64::MAX),
                                ),
                            },
                        );
                    }
                }

                if let Some(monitor) = hooks.monitor {
                    monitor.set_worker_row(
                        worker_idx,
                        WorkerRow {
                            worker: format!("worker_{worker_idx}"),
                            attempts: local_attempts,
                            status: "done".to_owned(),
                            ..WorkerRow::default()
                        },
                    );
                }
            });
        }
    });

    let mut result = GenerateRunResult {
        accepted: accepted.load(Ordering::Relaxed),
        written: written.load(Ordering::Relaxed),
        attempts: attempts.load(Ordering::Relaxed),
        cpu_backend_selected: backend,
        ..GenerateRunResult::default()
    };
    {
        let tally = tally.lock().unwrap_or_else(PoisonError::into_inner);
        result.rejected = tally.rejected;
        result.reject_prefilter = tally.prefilter;
        result.reject_logic = tally.logic;
        result.reject_uniqueness = tally.uniqueness;
        result.reject_strategy = tally.strategy;
        result.reject_replay = tally.replay;
        result.reject_distribution_bias = tally.distribution_bias;
        result.reject_uniqueness_budget = tally.uniqueness_budget;
    }
    result.uniqueness_calls = uniqueness_calls.load(Ordering::Relaxed);
    result.uniqueness_nodes = uniqueness_nodes.load(Ordering::Relaxed);
    result.uniqueness_elapsed_ms = nanos_to_ms(uniqueness_elapsed_ns.load(Ordering::Relaxed));
    #[expect(clippy::cast_precision_loss)]
    {
        result.uniqueness_avg_ms = if result.uniqueness_calls > 0 {
            result.uniqueness_elapsed_ms / result.uniqueness_calls as f64
        } else {
            0.0
        };
    }
    result.kernel_calls = kernel_calls.load(Ordering::Relaxed);
    result.kernel_time_ms = nanos_to_ms(kernel_elapsed_ns.load(Ordering::Relaxed));
    result.logic_steps_total = logic_steps.load(Ordering::Relaxed);
    result.strategy_naked_use = naked_use.load(Ordering::Relaxed);
    result.strategy_naked_hit = naked_hit.load(Ordering::Relaxed);
    result.strategy_hidden_use = hidden_use.load(Ordering::Relaxed);
    result.strategy_hidden_hit = hidden_hit.load(Ordering::Relaxed);
    result.reseeds = reseeds.load(Ordering::Relaxed);

    let asymmetry = f64::from(run_cfg.box_rows.max(run_cfg.box_cols))
        / f64::from(run_cfg.box_rows.min(run_cfg.box_cols).max(1));
    result.asymmetry_efficiency_index = asymmetry;
    #[expect(clippy::cast_precision_loss)]
    {
        result.backend_efficiency_score = if result.kernel_time_ms > 0.0 {
            result.accepted as f64 / (result.kernel_time_ms / 1000.0)
        } else {
            0.0
        };
    }

    result.elapsed_s = start.elapsed().as_secs_f64();
    #[expect(clippy::cast_precision_loss)]
    {
        result.accepted_per_sec = if result.elapsed_s > 0.0 {
            result.accepted as f64 / result.elapsed_s
        } else {
            0.0
        };
    }

    let raw = format!(
        "{}:{}:{}:{}:{}x{}",
        result.accepted,
        result.written,
        result.attempts,
        result.uniqueness_nodes,
        run_cfg.box_rows,
        run_cfg.box_cols
    );
    result.run_signature = signature_over(&raw);
    result.run_signature_v2 = signature_over(&format!("{raw}:v2"));

    if let Some(monitor) = hooks.monitor {
        monitor.set_totals(result.accepted, result.written, result.attempts, result.rejected);
        monitor.set_background_status(format!(
            "done accepted={} written={}",
            result.accepted, result.written
        ));
    }
    log::info!(
        "run done: accepted={} written={} attempts={}",
        result.accepted,
        result.written,
        result.attempts
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;
    use crate::line::parse_line;

    fn unique_output_dir(tag: &str) -> String {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let count = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir()
            .join(format!(
                "omnidoku_runner_{tag}_{}_{count}",
                std::process::id()
            ))
            .to_string_lossy()
            .into_owned()
    }

    fn base_config(tag: &str) -> GenerateRunConfig {
        GenerateRunConfig {
            box_rows: 3,
            box_cols: 3,
            target_puzzles: 1,
            threads: 1,
            seed: 0xC0FF_EE00,
            min_clues: 40,
            max_clues: 50,
            difficulty_level_required: 1,
            max_total_time_s: 60,
            output_folder: unique_output_dir(tag),
            ..GenerateRunConfig::default()
        }
    }

    fn read_lines(cfg: &GenerateRunConfig) -> Vec<String> {
        let path = Path::new(&cfg.output_folder).join(&cfg.output_file);
        fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn test_single_worker_reaches_target() {
        let cfg = base_config("single");
        let result = run(&cfg, RunHooks::default()).unwrap();

        assert_eq!(result.accepted, 1);
        assert_eq!(result.written, 1);
        assert!(result.attempts >= 1);
        assert_eq!(
            result.attempts,
            result.accepted + result.rejected,
            "every attempt accepts or rejects exactly once"
        );

        let lines = read_lines(&cfg);
        assert_eq!(lines.len(), 1);
        let parsed = parse_line(&lines[0]).unwrap();
        assert_eq!(parsed.difficulty, 1);
        assert!((40..=50).contains(&parsed.clues));
        let _ = fs::remove_dir_all(&cfg.output_folder);
    }

    #[test]
    fn test_multi_worker_run_with_monitor() {
        let mut cfg = base_config("multi");
        cfg.target_puzzles = 3;
        cfg.threads = 2;
        let monitor = StatsMonitor::new();
        let hooks = RunHooks {
            monitor: Some(&monitor),
            ..RunHooks::default()
        };
        let result = run(&cfg, hooks).unwrap();

        assert_eq!(result.accepted, 3);
        assert_eq!(read_lines(&cfg).len(), 3);
        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.accepted, 3);
        assert!(snapshot.background_status.starts_with("done"));
        let _ = fs::remove_dir_all(&cfg.output_folder);
    }

    #[test]
    fn test_cancel_stops_run_promptly() {
        let mut cfg = base_config("cancel");
        cfg.target_puzzles = 1_000_000;
        cfg.threads = 2;
        cfg.max_total_time_s = 30;
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
        let started = Instant::now();
        let result = run(&cfg, hooks).unwrap();

        assert!(result.accepted >= 1);
        assert!(!read_lines(&cfg).is_empty());
        assert!(started.elapsed() < Duration::from_secs(25));
        let _ = fs::remove_dir_all(&cfg.output_folder);
    }

    #[test]
    fn test_global_deadline_bounds_run() {
        let mut cfg = base_config("deadline");
        cfg.target_puzzles = u64::MAX;
        cfg.difficulty_level_required = 7;
        cfg.max_total_time_s = 1;
        cfg.threads = 2;
        cfg.attempt_time_budget_s = 0.2;
        let started = Instant::now();
        let result = run(&cfg, RunHooks::default()).unwrap();

        // Generous in absolute terms: unoptimized strategy rounds are slow,
        // but the deadline must still cut the run off far below the target.
        assert!(started.elapsed() < Duration::from_secs(30));
        assert_eq!(
            result.attempts,
            result.accepted + result.rejected,
            "counters stay consistent under the deadline"
        );
        let _ = fs::remove_dir_all(&cfg.output_folder);
    }

    #[test]
    fn test_invalid_geometry_is_fatal() {
        let mut cfg = base_config("geom");
        cfg.box_rows = 1;
        cfg.box_cols = 2;
        assert!(matches!(
            run(&cfg, RunHooks::default()),
            Err(RunError::Geometry(_))
        ));
    }

    #[test]
    fn test_signature_covers_totals() {
        let cfg = base_config("sig");
        let result = run(&cfg, RunHooks::default()).unwrap();
        assert_eq!(result.run_signature.len(), 16);
        assert_eq!(result.run_signature_v2.len(), 16);
        assert_ne!(result.run_signature, result.run_signature_v2);
        let _ = fs::remove_dir_all(&cfg.output_folder);
    }
}
