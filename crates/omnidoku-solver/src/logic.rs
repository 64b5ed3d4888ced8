//! Level-1 logical certifier: naked and hidden singles to exhaustion.

use std::time::{Duration, Instant};

use crate::{CandidateState, SolverError};

/// Outcome of a certification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertifyOutcome {
    /// The puzzle reduced to a full grid using singles alone.
    Solved,
    /// Singles made no further progress before the grid filled.
    Stalled,
    /// The puzzle reached a contradictory state.
    Contradiction,
}

/// Per-rule accumulators collected during certification.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleStats {
    /// Number of scans of the rule.
    pub use_count: u64,
    /// Number of scans that made progress.
    pub hit_count: u64,
    /// Number of digits placed by the rule.
    pub placements: u64,
    /// Wall time spent inside the rule.
    pub elapsed: Duration,
}

/// Result of running the certifier on a puzzle.
#[derive(Debug, Clone)]
pub struct CertifyReport {
    /// Final outcome.
    pub outcome: CertifyOutcome,
    /// Total placements across both rules.
    pub steps: u64,
    /// Naked-single accumulators.
    pub naked: RuleStats,
    /// Hidden-single accumulators.
    pub hidden: RuleStats,
    /// The fully solved grid, when [`CertifyOutcome::Solved`].
    pub solved_values: Option<Vec<u16>>,
}

/// Applies naked and hidden singles until no progress or contradiction.
///
/// Used both standalone (as the generator's "does this puzzle reduce
/// trivially?" filter) and as a subroutine of the analyzer.
#[must_use]
pub fn certify(state: &CandidateState) -> CertifyReport {
    let mut work = state.clone();
    let mut report = CertifyReport {
        outcome: CertifyOutcome::Stalled,
        steps: 0,
        naked: RuleStats::default(),
        hidden: RuleStats::default(),
        solved_values: None,
    };

    loop {
        let naked_start = Instant::now();
        let naked = apply_naked_singles(&mut work);
        report.naked.use_count += 1;
        report.naked.elapsed += naked_start.elapsed();
        match naked {
            Err(_) => {
                report.outcome = CertifyOutcome::Contradiction;
                return report;
            }
            Ok(placed) if placed > 0 => {
                report.naked.hit_count += 1;
                report.naked.placements += placed;
                report.steps += placed;
                if work.is_solved() {
                    break;
                }
                continue;
            }
            Ok(_) => {}
        }

        let hidden_start = Instant::now();
        let hidden = apply_hidden_singles(&mut work);
        report.hidden.use_count += 1;
        report.hidden.elapsed += hidden_start.elapsed();
        match hidden {
            Err(_) => {
                report.outcome = CertifyOutcome::Contradiction;
                return report;
            }
            Ok(placed) if placed > 0 => {
                report.hidden.hit_count += 1;
                report.hidden.placements += placed;
                report.steps += placed;
                if work.is_solved() {
                    break;
                }
            }
            Ok(_) => return report,
        }
    }

    report.outcome = CertifyOutcome::Solved;
    report.solved_values = Some(work.values().to_vec());
    report
}

/// Runs naked and hidden singles on `state` in place until fixpoint.
///
/// Returns `true` when the grid is fully solved.
///
/// # Errors
///
/// Returns [`SolverError`] on contradiction; the state is left as it was at
/// the point of detection.
pub fn propagate_singles(state: &mut CandidateState) -> Result<bool, SolverError> {
    loop {
        if apply_naked_singles(state)? > 0 {
            continue;
        }
        if apply_hidden_singles(state)? == 0 {
            break;
        }
    }
    Ok(state.is_solved())
}

/// One pass of naked singles: place every empty cell whose candidate set has
/// exactly one digit. Returns the number of placements.
pub(crate) fn apply_naked_singles(state: &mut CandidateState) -> Result<u64, SolverError> {
    let mut placed = 0;
    for idx in 0..state.nn() {
        if state.value(idx) != 0 {
            continue;
        }
        let candidates = state.candidates(idx);
        if candidates.is_empty() {
            return Err(SolverError::EmptyCandidates { cell: idx });
        }
        if let Some(digit) = candidates.smallest()
            && candidates.is_single()
        {
            state.place(idx, digit);
            placed += 1;
        }
    }
    Ok(placed)
}

/// One pass of hidden singles: for each house and unplaced digit with a
/// unique admitting cell, place it. Returns the number of placements.
pub(crate) fn apply_hidden_singles(state: &mut CandidateState) -> Result<u64, SolverError> {
    let n = state.n();
    let mut placed = 0;
    for house in 0..state.topology().house_count() {
        let placed_digits = state.house_placed_digits(house);
        for digit in placed_digits.complement(n) {
            let mask = state.house_candidate_mask(house, digit);
            if mask == 0 {
                return Err(SolverError::DigitWithoutPlace { house, digit });
            }
            if mask & (mask - 1) == 0 {
                let slot = mask.trailing_zeros() as usize;
                let idx = usize::from(state.topology().house(house)[slot]);
                state.place(idx, digit);
                placed += 1;
            }
        }
    }
    Ok(placed)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use omnidoku_core::{Topology, parse_grid};

    use super::*;

    fn state_from(text: &str, box_rows: u8, box_cols: u8) -> CandidateState {
        let topo = Topology::shared(box_rows, box_cols).unwrap();
        let puzzle = parse_grid(text, topo.n()).unwrap();
        CandidateState::from_puzzle(Arc::clone(&topo), &puzzle).unwrap()
    }

    // A classic easy puzzle solvable with singles alone.
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
    fn test_certify_solves_easy_puzzle() {
        let state = state_from(EASY_9X9, 3, 3);
        let report = certify(&state);

        assert_eq!(report.outcome, CertifyOutcome::Solved);
        assert!(report.steps > 0);
        assert!(report.naked.placements + report.hidden.placements == report.steps);

        let solved = report.solved_values.unwrap();
        assert!(solved.iter().all(|&v| v != 0));
        // Clues survive into the solution.
        assert_eq!(solved[0], 5);
        assert_eq!(solved[1], 3);
    }

    #[test]
    fn test_certify_is_deterministic() {
        let state = state_from(EASY_9X9, 3, 3);
        let first = certify(&state);
        let second = certify(&state);

        assert_eq!(first.outcome, second.outcome);
        assert_eq!(first.steps, second.steps);
        assert_eq!(first.solved_values, second.solved_values);
    }

    #[test]
    fn test_certify_reports_contradiction() {
        let topo = Topology::shared(3, 3).unwrap();
        let mut state = CandidateState::new_empty(Arc::clone(&topo));
        // Exhaust a cell by hand.
        for digit in 1..=9 {
            state.eliminate(11, digit);
        }
        let report = certify(&state);
        assert_eq!(report.outcome, CertifyOutcome::Contradiction);
        assert!(report.solved_values.is_none());
    }

    #[test]
    fn test_certify_stalls_on_hard_puzzle() {
        // Far beyond singles.
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
            3,
            3,
        );
        let report = certify(&state);
        assert_eq!(report.outcome, CertifyOutcome::Stalled);
        assert!(report.solved_values.is_none());
    }

    #[test]
    fn test_certify_works_on_asymmetric_geometry() {
        // 2x3 boxes, n=6: a nearly-full grid finishes with singles.
        let state = state_from(
            "
            123 456
            456 123
            231 564
            564 231
            312 645
            645 310
        ",
            2,
            3,
        );
        let report = certify(&state);
        assert_eq!(report.outcome, CertifyOutcome::Solved);
        assert_eq!(report.solved_values.unwrap()[35], 2);
    }

    #[test]
    fn test_propagate_singles_in_place() {
        let mut state = state_from(EASY_9X9, 3, 3);
        let solved = propagate_singles(&mut state).unwrap();
        assert!(solved);
        assert!(state.is_solved());
    }
}
