//! Rank-8 pattern strategies, all restricted to classic 9x9 boards: MSLS,
//! Exocet, Senior Exocet, SK-Loop and the Pattern Overlay Method.
//!
//! MSLS and POM are exact; the exocets and the SK-Loop detect the named
//! geometry and then prove each elimination individually through singles
//! propagation, so a looser pattern match can never over-eliminate.

use omnidoku_core::DigitSet;

use crate::{
    CandidateState, SolverError, StrategyKind, has_logical_support_with_assignments,
    strategy::{Strategy, combinations},
};

/// Multi-Sector Locked Set over four rows and four columns.
///
/// The sixteen intersection cells split their digits into row digits
/// (confined to the chosen columns within each row) and column digits;
/// when the quota count equals sixteen, the set is rank zero and the row
/// and column digits fall outside the intersections.
#[derive(Debug, Default, Clone, Copy)]
pub struct Msls;

impl Msls {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    #[expect(clippy::too_many_lines)]
    fn try_sectors(state: &mut CandidateState, rows: &[usize], cols: &[usize]) -> bool {
        let topo = std::sync::Arc::clone(state.topology());
        let cells: Vec<usize> = rows
            .iter()
            .flat_map(|&r| {
                let topo = std::sync::Arc::clone(&topo);
                cols.iter().map(move |&c| topo.cell_index(r, c))
            })
            .collect();
        if cells.iter().any(|&idx| state.value(idx) != 0) {
            return false;
        }
        let mut union = DigitSet::EMPTY;
        for &idx in &cells {
            union |= state.candidates(idx);
        }

        // Row digits: confined to the chosen columns within every row.
        let col_bits: u64 = cols.iter().map(|&c| 1u64 << c).sum();
        let row_bits: u64 = rows.iter().map(|&r| 1u64 << r).sum();
        let mut row_digits = DigitSet::EMPTY;
        for digit in union {
            let confined = rows.iter().all(|&r| {
                state.house_candidate_mask(topo.row_house(r), digit) & !col_bits == 0
            });
            if confined {
                row_digits.insert(digit);
            }
        }
        let col_digits = union.difference(row_digits);
        for digit in col_digits {
            let confined = cols.iter().all(|&c| {
                state.house_candidate_mask(topo.col_house(c), digit) & !row_bits == 0
            });
            if !confined {
                return false;
            }
        }
        if cells
            .iter()
            .any(|&idx| !state.candidates(idx).is_subset_of(row_digits | col_digits))
        {
            return false;
        }

        // Quota: one placement per (sector, unplaced digit) pair.
        let mut quota = 0usize;
        for &r in rows {
            let placed = state.house_placed_digits(topo.row_house(r));
            quota += (row_digits.difference(placed)).len() as usize;
        }
        for &c in cols {
            let placed = state.house_placed_digits(topo.col_house(c));
            quota += (col_digits.difference(placed)).len() as usize;
        }
        if quota != cells.len() {
            return false;
        }

        let mut changed = false;
        for &r in rows {
            for &idx in topo.house(topo.row_house(r)) {
                let idx = usize::from(idx);
                if cells.contains(&idx) {
                    continue;
                }
                for digit in row_digits {
                    changed |= state.eliminate(idx, digit);
                }
            }
        }
        for &c in cols {
            for &idx in topo.house(topo.col_house(c)) {
                let idx = usize::from(idx);
                if cells.contains(&idx) {
                    continue;
                }
                for digit in col_digits {
                    changed |= state.eliminate(idx, digit);
                }
            }
        }
        changed
    }
}

impl Strategy for Msls {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Msls
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        if state.n() != 9 {
            return Ok(false);
        }
        let mut fired = false;
        combinations(9, 4, &mut |row_combo| {
            let rows = row_combo.to_vec();
            combinations(9, 4, &mut |col_combo| {
                let cols = col_combo.to_vec();
                if Self::try_sectors(state, &rows, &cols) {
                    fired = true;
                }
                fired
            })
        });
        Ok(fired)
    }
}

/// Probe budget shared by the support-verified exotic patterns.
const PROBE_CAP: usize = 64;

/// Base pairs for the exocet family: two empty cells sharing a box and a
/// line, with a joint candidate pool of two to four digits.
fn exocet_bases(state: &CandidateState) -> Vec<(usize, usize, DigitSet)> {
    let topo = state.topology();
    let mut out = Vec::new();
    for box_idx in 0..9 {
        let house = topo.box_house(box_idx);
        let cells = topo.house(house);
        for (i, &a) in cells.iter().enumerate() {
            let a = usize::from(a);
            if state.value(a) != 0 {
                continue;
            }
            for &b in &cells[i + 1..] {
                let b = usize::from(b);
                if state.value(b) != 0 {
                    continue;
                }
                if topo.row_of(a) != topo.row_of(b) && topo.col_of(a) != topo.col_of(b) {
                    continue;
                }
                let pool = state.candidates(a) | state.candidates(b);
                if (2..=4).contains(&pool.len()) {
                    out.push((a, b, pool));
                }
            }
        }
    }
    out
}

/// Verifies and applies non-pool eliminations on a target cell.
fn disprove_non_pool(
    state: &mut CandidateState,
    target: usize,
    pool: DigitSet,
    probes: &mut usize,
) -> bool {
    let mut changed = false;
    for z in state.candidates(target).difference(pool) {
        if *probes >= PROBE_CAP {
            break;
        }
        *probes += 1;
        if !has_logical_support_with_assignments(state, &[(target, z)]) {
            changed |= state.eliminate(target, z);
        }
    }
    changed
}

/// Junior Exocet (conservative): a base pair plus two target cells in the
/// other boxes of the band; target candidates outside the base pool are
/// disproven one by one. 9x9 only.
#[derive(Debug, Default, Clone, Copy)]
pub struct Exocet;

impl Exocet {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for Exocet {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Exocet
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        if state.n() != 9 {
            return Ok(false);
        }
        let topo = std::sync::Arc::clone(state.topology());
        let mut probes = 0usize;
        let mut changed = false;

        for (a, b, pool) in exocet_bases(state) {
            let base_box = topo.box_of(a);
            let along_row = topo.row_of(a) == topo.row_of(b);
            for target in 0..state.nn() {
                if state.value(target) != 0 || target == a || target == b {
                    continue;
                }
                let target_box = topo.box_of(target);
                if target_box == base_box {
                    continue;
                }
                // Same band as the base, off the base line, sharing a pool
                // digit.
                let in_band = if along_row {
                    topo.row_of(target) / usize::from(topo.box_rows())
                        == topo.row_of(a) / usize::from(topo.box_rows())
                        && topo.row_of(target) != topo.row_of(a)
                } else {
                    topo.col_of(target) / usize::from(topo.box_cols())
                        == topo.col_of(a) / usize::from(topo.box_cols())
                        && topo.col_of(target) != topo.col_of(a)
                };
                if !in_band || (state.candidates(target) & pool).is_empty() {
                    continue;
                }
                changed |= disprove_non_pool(state, target, pool, &mut probes);
                if probes >= PROBE_CAP {
                    return Ok(changed);
                }
            }
        }
        Ok(changed)
    }
}

/// Senior Exocet (conservative): like [`Exocet`] with targets anywhere on
/// the base's cross lines outside the band. 9x9 only.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeniorExocet;

impl SeniorExocet {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for SeniorExocet {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SeniorExocet
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        if state.n() != 9 {
            return Ok(false);
        }
        let topo = std::sync::Arc::clone(state.topology());
        let mut probes = 0usize;
        let mut changed = false;

        for (a, b, pool) in exocet_bases(state) {
            let base_box = topo.box_of(a);
            let along_row = topo.row_of(a) == topo.row_of(b);
            if !along_row && topo.col_of(a) != topo.col_of(b) {
                continue;
            }
            // Cross lines: the columns (rows) through the base cells.
            let crosses = if along_row {
                [topo.col_of(a), topo.col_of(b)]
            } else {
                [topo.row_of(a), topo.row_of(b)]
            };
            for &cross in &crosses {
                let house = if along_row {
                    topo.col_house(cross)
                } else {
                    topo.row_house(cross)
                };
                for &target in topo.house(house) {
                    let target = usize::from(target);
                    if state.value(target) != 0
                        || topo.box_of(target) == base_box
                        || (state.candidates(target) & pool).is_empty()
                    {
                        continue;
                    }
                    changed |= disprove_non_pool(state, target, pool, &mut probes);
                    if probes >= PROBE_CAP {
                        return Ok(changed);
                    }
                }
            }
        }
        Ok(changed)
    }
}

/// SK-Loop (conservative): four filled corner cells in four distinct boxes
/// with all sixteen surrounding loop cells empty; loop-digit eliminations
/// on the crossing lines are disproven individually. 9x9 only.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkLoop;

impl SkLoop {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// The sixteen loop cells around the four corners, or `None` when the
    /// geometry does not apply.
    fn loop_cells(
        state: &CandidateState,
        rows: (usize, usize),
        cols: (usize, usize),
    ) -> Option<Vec<usize>> {
        let topo = state.topology();
        let corners = [
            topo.cell_index(rows.0, cols.0),
            topo.cell_index(rows.0, cols.1),
            topo.cell_index(rows.1, cols.0),
            topo.cell_index(rows.1, cols.1),
        ];
        let mut boxes = 0u64;
        for &corner in &corners {
            if state.value(corner) == 0 {
                return None;
            }
            boxes |= 1 << topo.box_of(corner);
        }
        if boxes.count_ones() != 4 {
            return None;
        }

        let mut cells = Vec::with_capacity(16);
        for &corner in &corners {
            let corner_box = topo.box_of(corner);
            let row = topo.row_of(corner);
            let col = topo.col_of(corner);
            for &idx in topo.house(topo.box_house(corner_box)) {
                let idx = usize::from(idx);
                if idx == corner {
                    continue;
                }
                if topo.row_of(idx) == row || topo.col_of(idx) == col {
                    if state.value(idx) != 0 {
                        return None;
                    }
                    cells.push(idx);
                }
            }
        }
        (cells.len() == 16).then_some(cells)
    }
}

impl Strategy for SkLoop {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SkLoop
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        if state.n() != 9 {
            return Ok(false);
        }
        let topo = std::sync::Arc::clone(state.topology());
        let mut probes = 0usize;
        let mut changed = false;

        for r1 in 0..9 {
            for r2 in r1 + 1..9 {
                for c1 in 0..9 {
                    for c2 in c1 + 1..9 {
                        let Some(cells) = Self::loop_cells(state, (r1, r2), (c1, c2)) else {
                            continue;
                        };
                        for line in [
                            topo.row_house(r1),
                            topo.row_house(r2),
                            topo.col_house(c1),
                            topo.col_house(c2),
                        ] {
                            let mut loop_digits = DigitSet::EMPTY;
                            for &idx in topo.house(line) {
                                let idx = usize::from(idx);
                                if cells.contains(&idx) {
                                    loop_digits |= state.candidates(idx);
                                }
                            }
                            for &idx in topo.house(line) {
                                let idx = usize::from(idx);
                                if cells.contains(&idx) || state.value(idx) != 0 {
                                    continue;
                                }
                                for z in state.candidates(idx) & loop_digits {
                                    if probes >= PROBE_CAP {
                                        return Ok(changed);
                                    }
                                    probes += 1;
                                    if !has_logical_support_with_assignments(
                                        state,
                                        &[(idx, z)],
                                    ) {
                                        changed |= state.eliminate(idx, z);
                                    }
                                }
                            }
                        }
                        if changed {
                            return Ok(true);
                        }
                    }
                }
            }
        }
        Ok(changed)
    }
}

/// Pattern cap for the overlay enumeration.
const POM_PATTERN_CAP: usize = 4000;

/// Pattern Overlay Method: enumerate every complete placement of a digit
/// consistent with the fixed cells; a candidate appearing in no pattern
/// falls. Reports no progress when the enumeration overflows its cap.
/// 9x9 only.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternOverlayMethod;

impl PatternOverlayMethod {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Enumerates placements row by row; returns `false` on cap overflow.
    fn enumerate(
        state: &CandidateState,
        digit: u8,
        row: usize,
        used_cols: &mut u64,
        used_boxes: &mut u64,
        pattern: &mut Vec<usize>,
        coverage: &mut Vec<bool>,
        count: &mut usize,
    ) -> bool {
        let topo = state.topology();
        let n = usize::from(topo.n());
        if row == n {
            *count += 1;
            if *count > POM_PATTERN_CAP {
                return false;
            }
            for &idx in pattern.iter() {
                coverage[idx] = true;
            }
            return true;
        }

        // A row already holding the digit contributes its fixed cell.
        for col in 0..n {
            let idx = topo.cell_index(row, col);
            if state.value(idx) == u16::from(digit) {
                let box_bit = 1u64 << topo.box_of(idx);
                if *used_cols & (1 << col) != 0 || *used_boxes & box_bit != 0 {
                    return true; // dead branch, not an overflow
                }
                *used_cols |= 1 << col;
                *used_boxes |= box_bit;
                let ok = Self::enumerate(
                    state, digit, row + 1, used_cols, used_boxes, pattern, coverage, count,
                );
                *used_cols &= !(1 << col);
                *used_boxes &= !box_bit;
                return ok;
            }
        }

        for col in 0..n {
            let idx = topo.cell_index(row, col);
            if !state.candidates(idx).contains(digit) {
                continue;
            }
            let box_bit = 1u64 << topo.box_of(idx);
            if *used_cols & (1 << col) != 0 || *used_boxes & box_bit != 0 {
                continue;
            }
            *used_cols |= 1 << col;
            *used_boxes |= box_bit;
            pattern.push(idx);
            let ok = Self::enumerate(
                state, digit, row + 1, used_cols, used_boxes, pattern, coverage, count,
            );
            pattern.pop();
            *used_cols &= !(1 << col);
            *used_boxes &= !box_bit;
            if !ok {
                return false;
            }
        }
        true
    }
}

impl Strategy for PatternOverlayMethod {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PatternOverlayMethod
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        if state.n() != 9 {
            return Ok(false);
        }
        let mut changed = false;
        for digit in 1..=9u8 {
            let mut coverage = vec![false; state.nn()];
            let mut count = 0usize;
            let mut used_cols = 0u64;
            let mut used_boxes = 0u64;
            let mut pattern = Vec::new();
            let complete = Self::enumerate(
                state,
                digit,
                0,
                &mut used_cols,
                &mut used_boxes,
                &mut pattern,
                &mut coverage,
                &mut count,
            );
            if !complete {
                continue; // cap overflow: report nothing for this digit
            }
            if count == 0 {
                return Err(SolverError::DigitWithoutPlace { house: 0, digit });
            }
            for idx in 0..state.nn() {
                if state.candidates(idx).contains(digit) && !coverage[idx] {
                    changed |= state.eliminate(idx, digit);
                }
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use omnidoku_core::{Topology, parse_grid};

    use super::*;
    use crate::testing::StrategyTester;

    fn open_state() -> CandidateState {
        CandidateState::new_empty(Topology::shared(3, 3).unwrap())
    }

    #[test]
    fn test_pom_respects_fixed_cells() {
        // A nearly-complete grid: POM enumeration must agree with the
        // remaining candidates and eliminate nothing unsound.
        let topo = Topology::shared(3, 3).unwrap();
        let puzzle = parse_grid(
            "
            534 678 912
            672 195 348
            198 342 567
            859 761 423
            426 853 791
            713 924 856
            961 537 284
            287 419 635
            345 286 000
        ",
            9,
        )
        .unwrap();
        let mut state = CandidateState::from_puzzle(Arc::clone(&topo), &puzzle).unwrap();
        let fired = PatternOverlayMethod::new().apply(&mut state).unwrap();
        // Single completion: every candidate participates, nothing falls.
        assert!(!fired);
        assert_eq!(state.candidates(80).smallest(), Some(9));
    }

    #[test]
    fn test_pom_reports_impossible_digit() {
        let mut state = open_state();
        // Digit 1 confined to columns {0,1} in every row: two columns for
        // nine rows admits zero complete placements.
        for row in 0..9 {
            for col in 2..9 {
                state.eliminate(row * 9 + col, 1);
            }
        }
        let result = PatternOverlayMethod::new().apply(&mut state);
        assert!(result.is_err());
    }

    #[test]
    fn test_no_progress_on_open_grid() {
        StrategyTester::new(open_state())
            .apply_none(&Msls::new())
            .apply_none(&Exocet::new())
            .apply_none(&SeniorExocet::new())
            .apply_none(&SkLoop::new());
    }
}
