use omnidoku_core::CellSet;

use crate::{
    CandidateState, SolverError, StrategyKind, has_logical_support_with_assignments,
    strategy::{Strategy, combinations},
};

/// Collects, for one digit, the candidate-column mask of every row (or the
/// candidate-row mask of every column when `transposed`).
fn line_masks(state: &CandidateState, digit: u8, transposed: bool) -> Vec<u64> {
    let topo = state.topology();
    let n = usize::from(topo.n());
    (0..n)
        .map(|line| {
            let house = if transposed {
                topo.col_house(line)
            } else {
                topo.row_house(line)
            };
            state.house_candidate_mask(house, digit)
        })
        .collect()
}

fn cell_at(state: &CandidateState, line: usize, cross: usize, transposed: bool) -> usize {
    let topo = state.topology();
    if transposed {
        topo.cell_index(cross, line)
    } else {
        topo.cell_index(line, cross)
    }
}

/// Basic fish of a given size: X-Wing (2), Swordfish (3), Jellyfish (4).
///
/// If a digit's candidates in `k` base lines are confined to `k` cross
/// lines, the digit can be removed from those cross lines outside the base.
/// A fish whose base cells fit into fewer than `k` boxes is a candidate
/// constraint violation and is reported as a contradiction.
#[derive(Debug, Clone, Copy)]
pub struct BasicFish {
    size: usize,
    kind: StrategyKind,
}

impl BasicFish {
    /// X-Wing (size 2).
    #[must_use]
    pub const fn x_wing() -> Self {
        Self {
            size: 2,
            kind: StrategyKind::XWing,
        }
    }

    /// Swordfish (size 3).
    #[must_use]
    pub const fn swordfish() -> Self {
        Self {
            size: 3,
            kind: StrategyKind::Swordfish,
        }
    }

    /// Jellyfish (size 4).
    #[must_use]
    pub const fn jellyfish() -> Self {
        Self {
            size: 4,
            kind: StrategyKind::Jellyfish,
        }
    }

    fn apply_orientation(
        &self,
        state: &mut CandidateState,
        digit: u8,
        transposed: bool,
    ) -> Result<bool, SolverError> {
        let masks = line_masks(state, digit, transposed);
        let n = masks.len();
        let bases: Vec<usize> = (0..n)
            .filter(|&line| {
                let count = masks[line].count_ones() as usize;
                count >= 2 && count <= self.size
            })
            .collect();
        if bases.len() < self.size {
            return Ok(false);
        }

        let mut result = Ok(false);
        combinations(bases.len(), self.size, &mut |combo| {
            let mut cover = 0u64;
            let mut base_lines = 0u64;
            for &member in combo {
                cover |= masks[bases[member]];
                base_lines |= 1 << bases[member];
            }
            if cover.count_ones() as usize != self.size {
                return false;
            }

            // Pigeonhole check: k lines each demand a placement; if every
            // base cell sits in fewer than k boxes the digit cannot fit.
            let mut boxes = 0u64;
            for &member in combo {
                let line = bases[member];
                let mut cols = masks[line];
                while cols != 0 {
                    let cross = cols.trailing_zeros() as usize;
                    cols &= cols - 1;
                    let idx = cell_at(state, line, cross, transposed);
                    boxes |= 1 << state.topology().box_of(idx);
                }
            }
            if (boxes.count_ones() as usize) < self.size {
                let box_idx = boxes.trailing_zeros() as usize;
                let house = state.topology().box_house(box_idx);
                result = Err(SolverError::DigitWithoutPlace { house, digit });
                return true;
            }

            let mut local = false;
            let mut cross_lines = cover;
            while cross_lines != 0 {
                let cross = cross_lines.trailing_zeros() as usize;
                cross_lines &= cross_lines - 1;
                for line in 0..n {
                    if base_lines & (1 << line) != 0 {
                        continue;
                    }
                    let idx = cell_at(state, line, cross, transposed);
                    local |= state.eliminate(idx, digit);
                }
            }
            if local {
                result = Ok(true);
            }
            local
        });
        result
    }
}

impl Strategy for BasicFish {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let n = state.n();
        let mut changed = false;
        for digit in 1..=n {
            changed |= self.apply_orientation(state, digit, false)?;
            changed |= self.apply_orientation(state, digit, true)?;
        }
        Ok(changed)
    }
}

/// Finned (and sashimi) fish of a given size.
///
/// A fish whose base lines carry up to two extra candidates ("fins") still
/// eliminates, but only inside the box holding every fin: cells of the cover
/// lines in that box, outside the base lines, cannot hold the digit.
#[derive(Debug, Clone, Copy)]
pub struct FinnedFish {
    size: usize,
    kind: StrategyKind,
}

impl FinnedFish {
    /// Finned/sashimi X-Wing (size 2).
    #[must_use]
    pub const fn x_wing() -> Self {
        Self {
            size: 2,
            kind: StrategyKind::FinnedXWingSashimi,
        }
    }

    /// Finned Swordfish (size 3).
    #[must_use]
    pub const fn swordfish() -> Self {
        Self {
            size: 3,
            kind: StrategyKind::FinnedSwordfish,
        }
    }

    /// Finned Jellyfish (size 4).
    #[must_use]
    pub const fn jellyfish() -> Self {
        Self {
            size: 4,
            kind: StrategyKind::FinnedJellyfish,
        }
    }

    fn apply_orientation(&self, state: &mut CandidateState, digit: u8, transposed: bool) -> bool {
        let masks = line_masks(state, digit, transposed);
        let n = masks.len();
        let bases: Vec<usize> = (0..n)
            .filter(|&line| {
                let count = masks[line].count_ones() as usize;
                count >= 2 && count <= self.size + 2
            })
            .collect();
        if bases.len() < self.size {
            return false;
        }

        let mut changed = false;
        combinations(bases.len(), self.size, &mut |combo| {
            let mut union = 0u64;
            let mut base_lines = 0u64;
            for &member in combo {
                union |= masks[bases[member]];
                base_lines |= 1 << bases[member];
            }
            let extra = union.count_ones() as usize;
            if extra <= self.size || extra > self.size + 2 {
                return false;
            }

            // Try every way to pick the cover lines from the union; the rest
            // of the base cells become fins and must share one box.
            let union_lines: Vec<usize> = (0..n).filter(|&c| union & (1 << c) != 0).collect();
            combinations(union_lines.len(), self.size, &mut |cover_combo| {
                let mut cover = 0u64;
                for &member in cover_combo {
                    cover |= 1 << union_lines[member];
                }
                let mut fin_boxes = 0u64;
                let mut fins = Vec::new();
                for &member in combo {
                    let line = bases[member];
                    let mut crosses = masks[line] & !cover;
                    while crosses != 0 {
                        let cross = crosses.trailing_zeros() as usize;
                        crosses &= crosses - 1;
                        let idx = cell_at(state, line, cross, transposed);
                        fin_boxes |= 1 << state.topology().box_of(idx);
                        fins.push(idx);
                    }
                }
                if fins.is_empty() || fin_boxes.count_ones() != 1 {
                    return false;
                }
                let fin_box = fin_boxes.trailing_zeros() as usize;

                let topo = std::sync::Arc::clone(state.topology());
                let mut local = false;
                for &idx in topo.house(topo.box_house(fin_box)) {
                    let idx = usize::from(idx);
                    let (line, cross) = if transposed {
                        (topo.col_of(idx), topo.row_of(idx))
                    } else {
                        (topo.row_of(idx), topo.col_of(idx))
                    };
                    if base_lines & (1 << line) != 0 {
                        continue;
                    }
                    if cover & (1 << cross) == 0 {
                        continue;
                    }
                    local |= state.eliminate(idx, digit);
                }
                changed |= local;
                local
            })
        });
        changed
    }
}

impl Strategy for FinnedFish {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let n = state.n();
        let mut changed = false;
        for digit in 1..=n {
            changed |= self.apply_orientation(state, digit, false);
            changed |= self.apply_orientation(state, digit, true);
        }
        Ok(changed)
    }
}

/// Maximum base/cover size tried by the generalized (franken/mutant) fish.
const GENERAL_FISH_MAX_SIZE: usize = 3;

/// Generalized fish search shared by the franken and mutant variants.
///
/// Base houses must be pairwise disjoint on the digit's candidates; if `k`
/// cover houses absorb every base candidate, the digit falls from cover
/// cells outside the base. Restricted to classic 9x9 boards.
fn general_fish(
    state: &mut CandidateState,
    base_pool: &[usize],
    cover_pool: &[usize],
) -> bool {
    if state.n() != 9 {
        return false;
    }
    let topo = std::sync::Arc::clone(state.topology());
    let nn = topo.nn();
    let mut changed = false;

    for digit in 1..=state.n() {
        let digit_cells = state.digit_cells(digit);
        // Candidate cells of every house, indexed by house id.
        let house_sets: Vec<CellSet> = (0..topo.house_count())
            .map(|house| {
                let mut cells = topo.house_cells(house).clone();
                cells.intersect_with(&digit_cells);
                cells
            })
            .collect();
        let lookup = |house: usize| -> &CellSet { &house_sets[house] };

        let usable_bases: Vec<usize> = base_pool
            .iter()
            .copied()
            .filter(|&house| {
                let count = lookup(house).count();
                count >= 2 && count <= GENERAL_FISH_MAX_SIZE + 1
            })
            .collect();

        for size in 2..=GENERAL_FISH_MAX_SIZE {
            if usable_bases.len() < size {
                continue;
            }
            let fired = combinations(usable_bases.len(), size, &mut |combo| {
                let mut base_cells = CellSet::empty(nn);
                let mut disjoint = true;
                for &member in combo {
                    let cells = lookup(usable_bases[member]);
                    if base_cells.intersects(cells) {
                        disjoint = false;
                        break;
                    }
                    base_cells.union_with(cells);
                }
                if !disjoint || base_cells.is_empty() {
                    return false;
                }

                let candidate_covers: Vec<usize> = cover_pool
                    .iter()
                    .copied()
                    .filter(|&house| {
                        !combo.iter().any(|&m| usable_bases[m] == house)
                            && lookup(house).intersects(&base_cells)
                    })
                    .collect();
                if candidate_covers.len() < size {
                    return false;
                }
                combinations(candidate_covers.len(), size, &mut |cover_combo| {
                    let mut covered = CellSet::empty(nn);
                    let mut elim_pool = CellSet::empty(nn);
                    for &member in cover_combo {
                        let cells = lookup(candidate_covers[member]);
                        covered.union_with(cells);
                        elim_pool.union_with(cells);
                    }
                    if !base_cells.is_subset_of(&covered) {
                        return false;
                    }
                    elim_pool.subtract(&base_cells);
                    let mut local = false;
                    for idx in elim_pool.iter().collect::<Vec<_>>() {
                        local |= state.eliminate(idx, digit);
                    }
                    local
                })
            });
            if fired {
                changed = true;
            }
        }
    }
    changed
}

/// Franken fish: bases from rows and boxes, covers from columns and boxes
/// (and the transposed arrangement). 9x9 only.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrankenFish;

impl FrankenFish {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for FrankenFish {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FrankenFish
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        if state.n() != 9 {
            return Ok(false);
        }
        let topo = state.topology();
        let rows: Vec<usize> = (0..9).map(|r| topo.row_house(r)).collect();
        let cols: Vec<usize> = (0..9).map(|c| topo.col_house(c)).collect();
        let boxes: Vec<usize> = (0..9).map(|b| topo.box_house(b)).collect();

        let rows_and_boxes: Vec<usize> = rows.iter().chain(&boxes).copied().collect();
        let cols_and_boxes: Vec<usize> = cols.iter().chain(&boxes).copied().collect();

        let mut changed = general_fish(state, &rows_and_boxes, &cols_and_boxes);
        changed |= general_fish(state, &cols_and_boxes, &rows_and_boxes);
        Ok(changed)
    }
}

/// Mutant fish: bases and covers drawn from all houses. 9x9 only.
#[derive(Debug, Default, Clone, Copy)]
pub struct MutantFish;

impl MutantFish {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for MutantFish {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MutantFish
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        if state.n() != 9 {
            return Ok(false);
        }
        let all: Vec<usize> = (0..state.topology().house_count()).collect();
        Ok(general_fish(state, &all, &all))
    }
}

/// Kraken fish: a finned fish whose fins are individually disproven.
///
/// For a would-be fish with fins, each potential cover elimination holds if
/// every fin placement lacks logical support under singles propagation.
/// Conservative and 9x9 only.
#[derive(Debug, Default, Clone, Copy)]
pub struct KrakenFish;

impl KrakenFish {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn apply_orientation(state: &mut CandidateState, digit: u8, transposed: bool) -> bool {
        let size = 2;
        let masks = line_masks(state, digit, transposed);
        let n = masks.len();
        let bases: Vec<usize> = (0..n)
            .filter(|&line| {
                let count = masks[line].count_ones() as usize;
                count >= 2 && count <= size + 2
            })
            .collect();
        if bases.len() < size {
            return false;
        }

        let mut changed = false;
        combinations(bases.len(), size, &mut |combo| {
            let mut union = 0u64;
            let mut base_lines = 0u64;
            for &member in combo {
                union |= masks[bases[member]];
                base_lines |= 1 << bases[member];
            }
            let extra = union.count_ones() as usize;
            if extra <= size || extra > size + 2 {
                return false;
            }
            let union_lines: Vec<usize> = (0..n).filter(|&c| union & (1 << c) != 0).collect();
            combinations(union_lines.len(), size, &mut |cover_combo| {
                let mut cover = 0u64;
                for &member in cover_combo {
                    cover |= 1 << union_lines[member];
                }
                let mut fins = Vec::new();
                for &member in combo {
                    let line = bases[member];
                    let mut crosses = masks[line] & !cover;
                    while crosses != 0 {
                        let cross = crosses.trailing_zeros() as usize;
                        crosses &= crosses - 1;
                        fins.push(cell_at(state, line, cross, transposed));
                    }
                }
                if fins.is_empty() || fins.len() > 2 {
                    return false;
                }
                // A fin that survives singles propagation keeps the fish
                // dirty; only a fish whose fins are all disproven eliminates.
                if fins
                    .iter()
                    .any(|&fin| has_logical_support_with_assignments(state, &[(fin, digit)]))
                {
                    return false;
                }

                let mut local = false;
                let mut cross_lines = cover;
                while cross_lines != 0 {
                    let cross = cross_lines.trailing_zeros() as usize;
                    cross_lines &= cross_lines - 1;
                    for line in 0..n {
                        if base_lines & (1 << line) != 0 {
                            continue;
                        }
                        let idx = cell_at(state, line, cross, transposed);
                        local |= state.eliminate(idx, digit);
                    }
                }
                changed |= local;
                local
            })
        });
        changed
    }
}

impl Strategy for KrakenFish {
    fn kind(&self) -> StrategyKind {
        StrategyKind::KrakenFish
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        if state.n() != 9 {
            return Ok(false);
        }
        let mut changed = false;
        for digit in 1..=9 {
            changed |= Self::apply_orientation(state, digit, false);
            changed |= Self::apply_orientation(state, digit, true);
        }
        Ok(changed)
    }
}
