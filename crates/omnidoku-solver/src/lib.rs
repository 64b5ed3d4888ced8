//! Logical Sudoku solving over generalized box geometries.
//!
//! This crate provides the candidate-tracking state shared by every logical
//! kernel, the Level-1 certifier (naked/hidden singles with contradiction
//! detection), a library of ranked human-style solving strategies driven by a
//! round-robin [`StrategyEngine`], and an MRV backtracking solver used as the
//! terminal fallback.
//!
//! Strategy ranks run from 1 (singles) to 9 (backtracking); the hardest rank
//! a puzzle requires is its difficulty.

pub use self::{
    backtrack::{BacktrackOutcome, BacktrackStats, solve_one},
    candidates::CandidateState,
    engine::{EngineOutcome, EngineStats, StrategyEngine},
    error::SolverError,
    kind::StrategyKind,
    logic::{CertifyOutcome, CertifyReport, RuleStats, certify, propagate_singles},
    support::has_logical_support_with_assignments,
};

mod backtrack;
mod candidates;
mod engine;
mod error;
mod kind;
mod logic;
pub mod strategy;
mod support;
pub mod testing;
