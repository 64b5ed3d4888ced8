//! Uniqueness-based strategies: Unique Rectangle, Unique Loop, Avoidable
//! Rectangle, BUG+1 and Bivalue Oddagon.
//!
//! These rely on the puzzle having a single solution: any pattern that
//! could be relabelled into a second solution must be averted.

use omnidoku_core::DigitSet;

use crate::{
    CandidateState, SolverError, StrategyKind, has_logical_support_with_assignments,
    strategy::Strategy,
};

/// The four cells of a rectangle spanning exactly two boxes, in the order
/// `(r1,c1), (r1,c2), (r2,c1), (r2,c2)`.
fn rectangles(state: &CandidateState) -> Vec<[usize; 4]> {
    let topo = state.topology();
    let n = usize::from(topo.n());
    let mut out = Vec::new();
    for r1 in 0..n {
        for r2 in r1 + 1..n {
            for c1 in 0..n {
                for c2 in c1 + 1..n {
                    let cells = [
                        topo.cell_index(r1, c1),
                        topo.cell_index(r1, c2),
                        topo.cell_index(r2, c1),
                        topo.cell_index(r2, c2),
                    ];
                    let mut boxes = 0u64;
                    for &idx in &cells {
                        boxes |= 1 << topo.box_of(idx);
                    }
                    if boxes.count_ones() == 2 {
                        out.push(cells);
                    }
                }
            }
        }
    }
    out
}

/// Unique Rectangle, types 1 through 6 plus the hidden variant.
///
/// Type 3 is conservative: a roof extra is only eliminated when placing it
/// has no logical support under singles propagation.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniqueRectangle;

impl UniqueRectangle {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    #[expect(clippy::too_many_lines)]
    fn apply_rectangle(state: &mut CandidateState, cells: [usize; 4]) -> bool {
        if cells.iter().any(|&idx| state.value(idx) != 0) {
            return false;
        }
        let sets: Vec<DigitSet> = cells.iter().map(|&idx| state.candidates(idx)).collect();

        // Candidate pairs: bivalue sets among the corners.
        let mut pairs: Vec<DigitSet> = Vec::new();
        for set in &sets {
            if set.len() == 2 && !pairs.contains(set) {
                pairs.push(*set);
            }
        }

        let topo = std::sync::Arc::clone(state.topology());
        let mut changed = false;
        for pair in pairs {
            if !sets.iter().all(|set| pair.is_subset_of(*set)) {
                continue;
            }
            let floors: Vec<usize> = (0..4).filter(|&i| sets[i] == pair).collect();
            let roofs: Vec<usize> = (0..4).filter(|&i| sets[i] != pair).collect();

            match roofs.as_slice() {
                // Type 1: one roof with extras sheds the pair.
                [roof] => {
                    for digit in pair {
                        changed |= state.eliminate(cells[*roof], digit);
                    }
                }
                [roof_a, roof_b] => {
                    let (ra, rb) = (cells[*roof_a], cells[*roof_b]);
                    let extra_a = sets[*roof_a].difference(pair);
                    let extra_b = sets[*roof_b].difference(pair);

                    // Type 2/5: both roofs carry the same single extra.
                    if extra_a == extra_b && extra_a.is_single() {
                        if let Some(z) = extra_a.smallest() {
                            let targets: Vec<usize> = state
                                .common_peers_of(&[ra, rb])
                                .iter()
                                .filter(|&idx| !cells.contains(&idx))
                                .collect();
                            for idx in targets {
                                changed |= state.eliminate(idx, z);
                            }
                        }
                    }

                    // Type 4: roofs share a house where one pair digit is
                    // confined to the roofs; the other pair digit falls.
                    if !changed && state.sees(ra, rb) {
                        for house in shared_houses(state, ra, rb) {
                            for (keep, drop) in [
                                (pair.smallest(), pair.iter().nth(1)),
                                (pair.iter().nth(1), pair.smallest()),
                            ] {
                                let (Some(keep), Some(drop)) = (keep, drop) else {
                                    continue;
                                };
                                let mask = state.house_candidate_mask(house, keep);
                                let roof_mask = house_mask_of(state, house, &[ra, rb]);
                                if mask != 0 && mask & !roof_mask == 0 {
                                    changed |= state.eliminate(ra, drop);
                                    changed |= state.eliminate(rb, drop);
                                }
                            }
                        }
                    }

                    // Type 6: diagonal floors and an X-wing on one pair
                    // digit across the rectangle's rows.
                    if !changed && floors.len() == 2 && !state.sees(cells[floors[0]], cells[floors[1]]) {
                        let (r1, c1) = (topo.row_of(cells[0]), topo.col_of(cells[0]));
                        let (r2, c2) = (topo.row_of(cells[3]), topo.col_of(cells[3]));
                        let col_bits = (1u64 << c1) | (1u64 << c2);
                        for digit in pair {
                            let top = state.house_candidate_mask(topo.row_house(r1), digit);
                            let bottom = state.house_candidate_mask(topo.row_house(r2), digit);
                            if top == col_bits && bottom == col_bits {
                                changed |= state.eliminate(ra, digit);
                                changed |= state.eliminate(rb, digit);
                            }
                        }
                    }

                    // Type 3 (conservative): disprove roof extras one by one.
                    if !changed && floors.len() == 2 {
                        for (&roof, extras) in [(&ra, extra_a), (&rb, extra_b)] {
                            for z in extras {
                                if !has_logical_support_with_assignments(state, &[(roof, z)]) {
                                    changed |= state.eliminate(roof, z);
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
            if changed {
                break;
            }
        }

        // Hidden UR: one bivalue corner; the opposite corner sheds the
        // other pair digit when one digit is conjugate along its lines.
        if !changed {
            for (corner, opposite) in [(0usize, 3usize), (1, 2), (2, 1), (3, 0)] {
                let pair = sets[corner];
                if pair.len() != 2 || !sets.iter().all(|set| pair.is_subset_of(*set)) {
                    continue;
                }
                let opp = cells[opposite];
                let opp_row = topo.row_house(topo.row_of(opp));
                let opp_col = topo.col_house(topo.col_of(opp));
                for p1 in pair {
                    let Some(p2) = pair.difference(DigitSet::from_elem(p1)).smallest() else {
                        continue;
                    };
                    let row_mask = state.house_candidate_mask(opp_row, p2);
                    let col_mask = state.house_candidate_mask(opp_col, p2);
                    let row_rect = house_mask_of(state, opp_row, &cells);
                    let col_rect = house_mask_of(state, opp_col, &cells);
                    if row_mask.count_ones() == 2
                        && col_mask.count_ones() == 2
                        && row_mask & !row_rect == 0
                        && col_mask & !col_rect == 0
                    {
                        changed |= state.eliminate(opp, p1);
                    }
                }
            }
        }
        changed
    }
}

/// Houses shared by two cells.
fn shared_houses(state: &CandidateState, a: usize, b: usize) -> tinyvec::ArrayVec<[usize; 3]> {
    let topo = state.topology();
    let mut out = tinyvec::ArrayVec::new();
    if topo.row_of(a) == topo.row_of(b) {
        out.push(topo.row_house(topo.row_of(a)));
    }
    if topo.col_of(a) == topo.col_of(b) {
        out.push(topo.col_house(topo.col_of(a)));
    }
    if topo.box_of(a) == topo.box_of(b) {
        out.push(topo.box_house(topo.box_of(a)));
    }
    out
}

/// House-local slot mask of the given cells within a house.
fn house_mask_of(state: &CandidateState, house: usize, cells: &[usize]) -> u64 {
    let topo = state.topology();
    let mut mask = 0u64;
    for (slot, &idx) in topo.house(house).iter().enumerate() {
        if cells.contains(&usize::from(idx)) {
            mask |= 1 << slot;
        }
    }
    mask
}

impl Strategy for UniqueRectangle {
    fn kind(&self) -> StrategyKind {
        StrategyKind::UniqueRectangle
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        for cells in rectangles(state) {
            if Self::apply_rectangle(state, cells) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Unique Loop: an even loop of cells sharing one pair, with exactly one
/// cell carrying extras. Every house on the loop holds exactly two loop
/// cells, so the pure cells could be relabelled; the extra cell averts it.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniqueLoop;

impl UniqueLoop {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    const MAX_LOOP: usize = 12;

    fn search(
        state: &CandidateState,
        pair: DigitSet,
        start: usize,
        path: &mut Vec<usize>,
        impure_seen: &mut usize,
    ) -> Option<Vec<usize>> {
        let current = *path.last().unwrap_or(&start);
        if path.len() >= 4 && path.len() % 2 == 0 && state.sees(current, start) {
            let candidate: Vec<usize> = path.clone();
            if loop_is_deadly(state, &candidate) && *impure_seen == 1 {
                return Some(candidate);
            }
        }
        if path.len() >= Self::MAX_LOOP {
            return None;
        }
        let nn = state.nn();
        for next in 0..nn {
            if path.contains(&next) || !state.sees(current, next) {
                continue;
            }
            let set = state.candidates(next);
            if !pair.is_subset_of(set) {
                continue;
            }
            let impure = usize::from(set != pair);
            if *impure_seen + impure > 1 {
                continue;
            }
            *impure_seen += impure;
            path.push(next);
            if let Some(found) = Self::search(state, pair, start, path, impure_seen) {
                return Some(found);
            }
            path.pop();
            *impure_seen -= impure;
        }
        None
    }
}

/// Every house touched by the loop must contain exactly two loop cells,
/// and those two cells must sit at opposite parities of the loop order, so
/// the alternating pair assignment is swappable.
fn loop_is_deadly(state: &CandidateState, cells: &[usize]) -> bool {
    let topo = state.topology();
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); topo.house_count()];
    for (position, &idx) in cells.iter().enumerate() {
        members[topo.row_house(topo.row_of(idx))].push(position);
        members[topo.col_house(topo.col_of(idx))].push(position);
        members[topo.box_house(topo.box_of(idx))].push(position);
    }
    members.iter().all(|positions| match positions.as_slice() {
        [] => true,
        [first, second] => (first + second) % 2 == 1,
        _ => false,
    })
}

impl Strategy for UniqueLoop {
    fn kind(&self) -> StrategyKind {
        StrategyKind::UniqueLoop
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let bivalues = state.bivalue_cells();
        let mut pairs: Vec<DigitSet> = Vec::new();
        for &idx in &bivalues {
            let pair = state.candidates(idx);
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        }

        for pair in pairs {
            // Start the search at an impure cell so the loop contains it.
            let impure_starts: Vec<usize> = (0..state.nn())
                .filter(|&idx| {
                    let set = state.candidates(idx);
                    set != pair && pair.is_subset_of(set)
                })
                .collect();
            for start in impure_starts {
                let mut path = vec![start];
                let mut impure_seen = 1;
                if let Some(found) =
                    Self::search(state, pair, start, &mut path, &mut impure_seen)
                    && found.len() >= 6
                {
                    let mut changed = false;
                    for digit in pair {
                        changed |= state.eliminate(start, digit);
                    }
                    if changed {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }
}

/// Avoidable Rectangle: three solved, non-given corners in an `x/y/y`
/// pattern force the empty fourth corner away from `x`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AvoidableRectangle;

impl AvoidableRectangle {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for AvoidableRectangle {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AvoidableRectangle
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let mut changed = false;
        for cells in rectangles(state) {
            // Orientations: the empty corner and its row/col neighbours.
            for (empty, same_row, same_col, diagonal) in [
                (0, 1, 2, 3),
                (1, 0, 3, 2),
                (2, 3, 0, 1),
                (3, 2, 1, 0),
            ] {
                let empty_idx = cells[empty];
                if state.value(empty_idx) != 0 {
                    continue;
                }
                let solved = [cells[same_row], cells[same_col], cells[diagonal]];
                if solved
                    .iter()
                    .any(|&idx| state.value(idx) == 0 || state.is_given(idx))
                {
                    continue;
                }
                let x = state.value(cells[diagonal]);
                let y_row = state.value(cells[same_row]);
                let y_col = state.value(cells[same_col]);
                if y_row != y_col || y_row == x {
                    continue;
                }
                #[expect(clippy::cast_possible_truncation)]
                let x_digit = x as u8;
                changed |= state.eliminate(empty_idx, x_digit);
            }
        }
        Ok(changed)
    }
}

/// BUG+1: when every empty cell is bivalue except one trivalue cell, the
/// candidate appearing three times in that cell's houses must be placed.
#[derive(Debug, Default, Clone, Copy)]
pub struct BugPlusOne;

impl BugPlusOne {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for BugPlusOne {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BugPlusOne
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let mut bug_cell = None;
        for idx in 0..state.nn() {
            if state.value(idx) != 0 {
                continue;
            }
            match state.candidates(idx).len() {
                2 => {}
                3 if bug_cell.is_none() => bug_cell = Some(idx),
                _ => return Ok(false),
            }
        }
        let Some(cell) = bug_cell else {
            return Ok(false);
        };

        let topo = std::sync::Arc::clone(state.topology());
        let houses = [
            topo.row_house(topo.row_of(cell)),
            topo.col_house(topo.col_of(cell)),
            topo.box_house(topo.box_of(cell)),
        ];
        for digit in state.candidates(cell) {
            let odd_everywhere = houses.iter().all(|&house| {
                state.house_candidate_mask(house, digit).count_ones() % 2 == 1
            });
            if odd_everywhere {
                state.place(cell, digit);
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Bivalue Oddagon: an odd cycle of cells sharing one pair, with exactly
/// one cell carrying extras; the pure assignment cannot two-color an odd
/// cycle, so the extra cell sheds the pair.
#[derive(Debug, Default, Clone, Copy)]
pub struct BivalueOddagon;

impl BivalueOddagon {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    const MAX_LOOP: usize = 9;

    fn odd_cycle_through(
        state: &CandidateState,
        pure: &[usize],
        start: usize,
        path: &mut Vec<usize>,
    ) -> bool {
        let current = *path.last().unwrap_or(&start);
        if path.len() >= 3 && path.len() % 2 == 1 && state.sees(current, start) {
            return true;
        }
        if path.len() >= Self::MAX_LOOP {
            return false;
        }
        for &next in pure {
            if path.contains(&next) || !state.sees(current, next) {
                continue;
            }
            path.push(next);
            if Self::odd_cycle_through(state, pure, start, path) {
                return true;
            }
            path.pop();
        }
        false
    }
}

impl Strategy for BivalueOddagon {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BivalueOddagon
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let bivalues = state.bivalue_cells();
        let mut pairs: Vec<DigitSet> = Vec::new();
        for &idx in &bivalues {
            let pair = state.candidates(idx);
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        }

        for pair in pairs {
            let pure: Vec<usize> = bivalues
                .iter()
                .copied()
                .filter(|&idx| state.candidates(idx) == pair)
                .collect();
            if pure.len() < 2 {
                continue;
            }
            let impures: Vec<usize> = (0..state.nn())
                .filter(|&idx| {
                    let set = state.candidates(idx);
                    set != pair && pair.is_subset_of(set)
                })
                .collect();
            for start in impures {
                let mut path = vec![start];
                if Self::odd_cycle_through(state, &pure, start, &mut path) {
                    let mut changed = false;
                    for digit in pair {
                        changed |= state.eliminate(start, digit);
                    }
                    if changed {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }
}
