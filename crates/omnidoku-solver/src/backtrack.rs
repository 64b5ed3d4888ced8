//! MRV backtracking search over a candidate state.
//!
//! Used by the analyzer as the terminal fallback when logical strategies
//! stall, and counts the work it does so the analysis can report how much
//! guessing a puzzle required.

use omnidoku_core::{DigitSet, SearchAbortControl};

use crate::{CandidateState, logic};

/// Work counters collected during a backtracking run.
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktrackStats {
    /// Recursion frames visited.
    pub nodes: u64,
    /// Digits tried at branch points.
    pub decisions: u64,
    /// Branches undone after a dead end.
    pub backtracks: u64,
}

/// Outcome of a backtracking run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BacktrackOutcome {
    /// A complete grid was found.
    Solved(Vec<u16>),
    /// The search space was exhausted without a solution.
    Unsolvable,
    /// The budget aborted the search.
    Aborted,
}

/// Searches for one solution of the given state.
///
/// Cells are selected by minimum remaining values; candidate digits are tried
/// in increasing order, with singles propagation after every tentative
/// placement. The search honours `budget` at every frame.
pub fn solve_one(
    state: &CandidateState,
    budget: &mut SearchAbortControl,
    stats: &mut BacktrackStats,
) -> BacktrackOutcome {
    let mut root = state.clone();
    match logic::propagate_singles(&mut root) {
        Ok(true) => return BacktrackOutcome::Solved(root.values().to_vec()),
        Ok(false) => {}
        Err(_) => return BacktrackOutcome::Unsolvable,
    }

    let mut stack: Vec<(CandidateState, usize, DigitSet)> = Vec::new();
    let Some((cell, digits)) = best_assumption(&root) else {
        return BacktrackOutcome::Unsolvable;
    };
    stack.push((root, cell, digits));

    while let Some((grid, cell, mut digits)) = stack.pop() {
        if !budget.step() {
            return BacktrackOutcome::Aborted;
        }
        stats.nodes += 1;
        let Some(digit) = digits.pop_smallest() else {
            stats.backtracks += 1;
            continue;
        };
        stats.decisions += 1;

        let mut next = grid.clone();
        stack.push((grid, cell, digits));
        next.place(cell, digit);
        match logic::propagate_singles(&mut next) {
            Ok(true) => return BacktrackOutcome::Solved(next.values().to_vec()),
            Ok(false) => {}
            Err(_) => {
                stats.backtracks += 1;
                continue;
            }
        }
        let Some(assumption) = best_assumption(&next) else {
            stats.backtracks += 1;
            continue;
        };
        stack.push((next, assumption.0, assumption.1));
    }

    BacktrackOutcome::Unsolvable
}

/// Picks the undecided cell with the fewest candidates.
fn best_assumption(state: &CandidateState) -> Option<(usize, DigitSet)> {
    let mut best: Option<(usize, DigitSet)> = None;
    let mut best_len = u32::MAX;
    for idx in 0..state.nn() {
        if state.value(idx) != 0 {
            continue;
        }
        let candidates = state.candidates(idx);
        let len = candidates.len();
        if len < best_len {
            best_len = len;
            best = Some((idx, candidates));
            if len <= 2 {
                break;
            }
        }
    }
    best
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
    fn test_solves_hard_puzzle() {
        let state = state_from(
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
        );
        let mut budget = SearchAbortControl::new();
        let mut stats = BacktrackStats::default();
        let outcome = solve_one(&state, &mut budget, &mut stats);

        let BacktrackOutcome::Solved(values) = outcome else {
            panic!("expected a solution, got {outcome:?}");
        };
        assert!(values.iter().all(|&v| (1..=9).contains(&v)));
        // Clues survive.
        assert_eq!(values[0], 1);
        assert_eq!(values[5], 7);
        assert!(stats.nodes > 0);
    }

    #[test]
    fn test_reports_unsolvable() {
        // Two cells of row 0 restricted to the same single digit.
        let topo = Topology::shared(2, 2).unwrap();
        let mut state = CandidateState::new_empty(topo);
        state.restrict(0, omnidoku_core::DigitSet::from_elem(1));
        state.restrict(3, omnidoku_core::DigitSet::from_elem(1));

        let mut budget = SearchAbortControl::new();
        let mut stats = BacktrackStats::default();
        assert_eq!(
            solve_one(&state, &mut budget, &mut stats),
            BacktrackOutcome::Unsolvable
        );
    }

    #[test]
    fn test_budget_aborts_search() {
        let state = CandidateState::new_empty(Topology::shared(4, 4).unwrap());
        let mut budget = SearchAbortControl::new().with_node_limit(5);
        let mut stats = BacktrackStats::default();
        assert_eq!(
            solve_one(&state, &mut budget, &mut stats),
            BacktrackOutcome::Aborted
        );
    }
}
