//! Multi-threaded Sudoku puzzle generation over generalized box geometries.
//!
//! The pipeline per worker: a randomized MRV solved-grid kernel with
//! SIMD-dispatched cell selection, a dig kernel with optional 180-degree
//! symmetry, a cheap validity prefilter, the logical certifier, a bitset
//! Dancing-Links uniqueness counter, and the difficulty analyzer. The
//! [`RuntimeRunner`](runner::run) coordinates a fixed pool of worker threads
//! under cancel/pause flags, per-attempt budgets and a global deadline, and
//! serializes accepted puzzles one line each.

pub use self::{
    analyzer::{AnalysisReport, Analyzer, AnalyzerOptions},
    attempt::{AttemptOutcome, AttemptPerf, AttemptScratch, PuzzleCandidate, generate_one},
    config::{
        GenerateRunConfig, GenerateRunResult, RejectReason, resolve_auto_clue_range,
        suggest_attempt_node_budget,
    },
    dig::DigKernel,
    dlx::UniquenessCounter,
    line::{LineParseError, ParsedLine, parse_line, serialize_line},
    monitor::{MonitorSnapshot, StatsMonitor, WorkerRow},
    prefilter::QuickPrefilter,
    runner::{RunError, run},
    simd::Backend,
    solved_kernel::{CandidateCache, SolvedKernel},
};

mod analyzer;
mod attempt;
mod config;
mod dig;
mod dlx;
mod line;
mod monitor;
mod prefilter;
pub mod runner;
mod simd;
mod solved_kernel;
