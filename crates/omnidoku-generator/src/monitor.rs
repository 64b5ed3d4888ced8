//! Thread-safe statistics snapshot for external display collaborators.

use std::sync::{Mutex, PoisonError};

/// One worker's latest published state.
#[derive(Debug, Clone, Default)]
pub struct WorkerRow {
    /// Worker label (`worker_<index>`).
    pub worker: String,
    /// Clue count of the worker's latest candidate.
    pub clues: usize,
    /// Base seed of the worker's RNG.
    pub seed: u64,
    /// Attempts the worker has started.
    pub attempts: u64,
    /// `running`, `paused` or `done`.
    pub status: String,
    /// Milliseconds in the solved kernel on the latest attempt.
    pub stage_solved_ms: f64,
    /// Milliseconds in the dig kernel on the latest attempt.
    pub stage_dig_ms: f64,
    /// Milliseconds in the prefilter on the latest attempt.
    pub stage_prefilter_ms: f64,
    /// Milliseconds in the certifier on the latest attempt.
    pub stage_logic_ms: f64,
    /// Milliseconds in the uniqueness counter on the latest attempt.
    pub stage_uniqueness_ms: f64,
}

/// A consistent copy of the monitor's state.
///
/// Snapshots are eventually consistent: counters published by different
/// workers may be observed mid-transition relative to each other.
#[derive(Debug, Clone, Default)]
pub struct MonitorSnapshot {
    /// Configured puzzle target.
    pub target: u64,
    /// Accepted puzzles.
    pub accepted: u64,
    /// Written lines.
    pub written: u64,
    /// Started attempts.
    pub attempts: u64,
    /// Rejected attempts.
    pub rejected: u64,
    /// Workers currently running.
    pub active_workers: usize,
    /// Worker reseeds performed.
    pub reseeds: u64,
    /// Box geometry and difficulty of the run.
    pub grid_info: String,
    /// Free-form status line published by the runner.
    pub background_status: String,
    /// Per-worker rows.
    pub workers: Vec<WorkerRow>,
}

/// Shared monitor: the runner publishes under a short lock, display
/// collaborators read snapshots and format the text themselves.
#[derive(Debug, Default)]
pub struct StatsMonitor {
    state: Mutex<MonitorSnapshot>,
}

impl StatsMonitor {
    /// Creates an empty monitor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MonitorSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes the run's target and geometry.
    pub fn set_run_info(&self, target: u64, grid_info: String, active_workers: usize) {
        let mut state = self.lock();
        state.target = target;
        state.grid_info = grid_info;
        state.active_workers = active_workers;
        state.workers = vec![WorkerRow::default(); active_workers];
    }

    /// Publishes the shared counters.
    pub fn set_totals(&self, accepted: u64, written: u64, attempts: u64, rejected: u64) {
        let mut state = self.lock();
        state.accepted = accepted;
        state.written = written;
        state.attempts = attempts;
        state.rejected = rejected;
    }

    /// Publishes the reseed counter.
    pub fn set_reseeds(&self, reseeds: u64) {
        self.lock().reseeds = reseeds;
    }

    /// Publishes a worker row.
    pub fn set_worker_row(&self, index: usize, row: WorkerRow) {
        let mut state = self.lock();
        if index < state.workers.len() {
            state.workers[index] = row;
        }
    }

    /// Publishes the free-form status line.
    pub fn set_background_status(&self, status: String) {
        self.lock().background_status = status;
    }

    /// Takes a consistent copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> MonitorSnapshot {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_published_state() {
        let monitor = StatsMonitor::new();
        monitor.set_run_info(10, "3x3 level 2".to_owned(), 2);
        monitor.set_totals(3, 3, 40, 37);
        monitor.set_worker_row(
            1,
            WorkerRow {
                worker: "worker_1".to_owned(),
                attempts: 20,
                status: "running".to_owned(),
                ..WorkerRow::default()
            },
        );

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.target, 10);
        assert_eq!(snapshot.accepted, 3);
        assert_eq!(snapshot.workers.len(), 2);
        assert_eq!(snapshot.workers[1].attempts, 20);
        assert_eq!(snapshot.grid_info, "3x3 level 2");
    }

    #[test]
    fn test_out_of_range_worker_row_is_dropped() {
        let monitor = StatsMonitor::new();
        monitor.set_run_info(1, String::new(), 1);
        monitor.set_worker_row(5, WorkerRow::default());
        assert_eq!(monitor.snapshot().workers.len(), 1);
    }

    #[test]
    fn test_snapshot_from_multiple_threads() {
        let monitor = std::sync::Arc::new(StatsMonitor::new());
        monitor.set_run_info(100, String::new(), 4);
        std::thread::scope(|scope| {
            for worker in 0..4u64 {
                let monitor = std::sync::Arc::clone(&monitor);
                scope.spawn(move || {
                    for attempt in 0..100 {
                        monitor.set_totals(worker, worker, attempt, 0);
                        let _ = monitor.snapshot();
                    }
                });
            }
        });
        assert!(monitor.snapshot().accepted < 4);
    }
}
