//! Almost-locked-set strategies: ALS-XZ, ALS-XY-Wing, ALS chains, Sue de
//! Coq and Death Blossom.

use omnidoku_core::{CellSet, DigitSet};

use crate::{
    CandidateState, SolverError, StrategyKind,
    strategy::{Strategy, combinations},
};

/// An almost locked set: `k` empty cells of one house whose candidates
/// union to `k + 1` digits.
#[derive(Debug, Clone)]
struct Als {
    cells: Vec<usize>,
    digits: DigitSet,
}

/// Upper bound on collected ALSs per scan.
const ALS_CAP: usize = 256;

/// Largest ALS cell count considered.
const ALS_MAX_SIZE: usize = 4;

fn collect_als(state: &CandidateState) -> Vec<Als> {
    let topo = state.topology();
    let mut out: Vec<Als> = Vec::new();
    for house in 0..topo.house_count() {
        let members: Vec<usize> = topo
            .house(house)
            .iter()
            .map(|&idx| usize::from(idx))
            .filter(|&idx| state.value(idx) == 0)
            .collect();
        for size in 1..=ALS_MAX_SIZE.min(members.len()) {
            combinations(members.len(), size, &mut |combo| {
                let mut digits = DigitSet::EMPTY;
                for &member in combo {
                    digits |= state.candidates(members[member]);
                }
                if digits.len() as usize == size + 1 {
                    let cells: Vec<usize> = combo.iter().map(|&m| members[m]).collect();
                    // The same cell set can qualify through several houses.
                    if !out.iter().any(|als| als.cells == cells) {
                        out.push(Als { cells, digits });
                    }
                }
                out.len() >= ALS_CAP
            });
            if out.len() >= ALS_CAP {
                return out;
            }
        }
    }
    out
}

/// Cells of an ALS holding a digit.
fn digit_holders(state: &CandidateState, als: &Als, digit: u8) -> Vec<usize> {
    als.cells
        .iter()
        .copied()
        .filter(|&idx| state.candidates(idx).contains(digit))
        .collect()
}

/// `true` when `digit` is a restricted common between two disjoint ALSs:
/// every holder in one set sees every holder in the other.
fn restricted_common(state: &CandidateState, a: &Als, b: &Als, digit: u8) -> bool {
    if !a.digits.contains(digit) || !b.digits.contains(digit) {
        return false;
    }
    let holders_a = digit_holders(state, a, digit);
    let holders_b = digit_holders(state, b, digit);
    if holders_a.is_empty() || holders_b.is_empty() {
        return false;
    }
    holders_a
        .iter()
        .all(|&x| holders_b.iter().all(|&y| x != y && state.sees(x, y)))
}

fn cells_disjoint(a: &Als, b: &Als) -> bool {
    a.cells.iter().all(|cell| !b.cells.contains(cell))
}

/// Eliminates `digit` from every cell outside the pattern that sees all of
/// its holders across the given ALSs.
fn eliminate_common_watchers(
    state: &mut CandidateState,
    sets: &[&Als],
    digit: u8,
) -> bool {
    let mut holders = Vec::new();
    for als in sets {
        holders.extend(digit_holders(state, als, digit));
    }
    if holders.is_empty() {
        return false;
    }
    let mut watchers = CellSet::empty(state.nn());
    watchers.union_with(&state.peers_set(holders[0]));
    for &holder in &holders[1..] {
        watchers.intersect_with(&state.peers_set(holder));
    }
    for als in sets {
        for &cell in &als.cells {
            watchers.remove(cell);
        }
    }
    watchers.intersect_with(&state.digit_cells(digit));
    let mut changed = false;
    for idx in watchers.iter().collect::<Vec<_>>() {
        changed |= state.eliminate(idx, digit);
    }
    changed
}

/// ALS-XZ: two ALSs with a restricted common `x` share a second digit `z`;
/// `z` falls from cells seeing every `z` holder of both sets.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlsXz;

impl AlsXz {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for AlsXz {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AlsXz
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let sets = collect_als(state);
        for (i, a) in sets.iter().enumerate() {
            for b in &sets[i + 1..] {
                if !cells_disjoint(a, b) {
                    continue;
                }
                let common = a.digits & b.digits;
                for x in common {
                    if !restricted_common(state, a, b, x) {
                        continue;
                    }
                    for z in common.difference(DigitSet::from_elem(x)) {
                        if eliminate_common_watchers(state, &[a, b], z) {
                            return Ok(true);
                        }
                    }
                }
            }
        }
        Ok(false)
    }
}

/// ALS-XY-Wing: a hinge ALS restricted-commons into two others on distinct
/// digits; a digit shared by the outer pair falls from its common watchers.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlsXyWing;

impl AlsXyWing {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for AlsXyWing {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AlsXyWing
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let sets = collect_als(state);
        for (h, hinge) in sets.iter().enumerate() {
            for (i, a) in sets.iter().enumerate() {
                if i == h || !cells_disjoint(hinge, a) {
                    continue;
                }
                for (j, b) in sets.iter().enumerate() {
                    if j == h || j <= i || !cells_disjoint(hinge, b) || !cells_disjoint(a, b) {
                        continue;
                    }
                    for x in hinge.digits & a.digits {
                        if !restricted_common(state, hinge, a, x) {
                            continue;
                        }
                        for y in hinge.digits & b.digits {
                            if y == x || !restricted_common(state, hinge, b, y) {
                                continue;
                            }
                            let shared = (a.digits & b.digits)
                                .difference(DigitSet::from_iter([x, y]));
                            for z in shared {
                                if eliminate_common_watchers(state, &[a, b], z) {
                                    return Ok(true);
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(false)
    }
}

/// Longest ALS chain attempted.
const ALS_CHAIN_MAX: usize = 4;

/// ALS chains: consecutive ALSs joined by restricted commons with distinct
/// digits at each junction; a digit shared by both chain ends (and not used
/// at the adjacent junctions) falls from its common watchers.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlsChain;

impl AlsChain {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn extend(
        state: &mut CandidateState,
        sets: &[Als],
        chain: &mut Vec<usize>,
        rccs: &mut Vec<u8>,
    ) -> bool {
        let last = chain[chain.len() - 1];
        if chain.len() >= 3 {
            let first = &sets[chain[0]];
            let end = &sets[last];
            let shared = first.digits & end.digits;
            for z in shared {
                if rccs.first() == Some(&z) || rccs.last() == Some(&z) {
                    continue;
                }
                if eliminate_common_watchers(state, &[first, end], z) {
                    return true;
                }
            }
        }
        if chain.len() >= ALS_CHAIN_MAX {
            return false;
        }
        for (next, als) in sets.iter().enumerate() {
            if chain.contains(&next) {
                continue;
            }
            if chain
                .iter()
                .any(|&member| !cells_disjoint(&sets[member], als))
            {
                continue;
            }
            for x in sets[last].digits & als.digits {
                if rccs.last() == Some(&x) {
                    continue;
                }
                if !restricted_common(state, &sets[last], als, x) {
                    continue;
                }
                chain.push(next);
                rccs.push(x);
                if Self::extend(state, sets, chain, rccs) {
                    return true;
                }
                rccs.pop();
                chain.pop();
            }
        }
        false
    }
}

impl Strategy for AlsChain {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AlsChain
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let sets = collect_als(state);
        for start in 0..sets.len() {
            let mut chain = vec![start];
            let mut rccs = Vec::new();
            if Self::extend(state, &sets, &mut chain, &mut rccs) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Sue de Coq: two or three box/line intersection cells whose candidates,
/// together with one bivalue in the line rest and one in the box rest,
/// lock every digit of the union.
#[derive(Debug, Default, Clone, Copy)]
pub struct SueDeCoq;

impl SueDeCoq {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for SueDeCoq {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SueDeCoq
    }

    #[expect(clippy::too_many_lines)]
    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let topo = std::sync::Arc::clone(state.topology());
        let n = usize::from(topo.n());
        let mut changed = false;

        for box_idx in 0..n {
            let box_house = topo.box_house(box_idx);
            for line in 0..2 * n {
                let line_cells = topo.house_cells(line);
                let mut intersection: Vec<usize> = topo
                    .house(box_house)
                    .iter()
                    .map(|&idx| usize::from(idx))
                    .filter(|&idx| line_cells.contains(idx) && state.value(idx) == 0)
                    .collect();
                intersection.sort_unstable();
                if intersection.len() < 2 {
                    continue;
                }

                for size in 2..=intersection.len() {
                    let fired = combinations(intersection.len(), size, &mut |combo| {
                        let core: Vec<usize> =
                            combo.iter().map(|&m| intersection[m]).collect();
                        let mut union = DigitSet::EMPTY;
                        for &idx in &core {
                            union |= state.candidates(idx);
                        }
                        if union.len() as usize != size + 2 {
                            return false;
                        }

                        let line_rest: Vec<usize> = topo
                            .house(line)
                            .iter()
                            .map(|&idx| usize::from(idx))
                            .filter(|&idx| {
                                !core.contains(&idx)
                                    && topo.box_of(idx) != box_idx
                                    && state.value(idx) == 0
                            })
                            .collect();
                        let box_rest: Vec<usize> = topo
                            .house(box_house)
                            .iter()
                            .map(|&idx| usize::from(idx))
                            .filter(|&idx| {
                                !core.contains(&idx)
                                    && !line_cells.contains(idx)
                                    && state.value(idx) == 0
                            })
                            .collect();

                        for &line_mate in &line_rest {
                            let line_pair = state.candidates(line_mate);
                            if line_pair.len() != 2 || !line_pair.is_subset_of(union) {
                                continue;
                            }
                            for &box_mate in &box_rest {
                                let box_pair = state.candidates(box_mate);
                                if box_pair.len() != 2
                                    || !box_pair.is_subset_of(union)
                                    || !(box_pair & line_pair).is_empty()
                                {
                                    continue;
                                }
                                // Every digit of the union is consumed by
                                // the pattern: line digits leave the line,
                                // box digits leave the box.
                                let line_digits = line_pair | union.difference(box_pair);
                                let box_digits = box_pair | union.difference(line_pair);
                                let mut local = false;
                                for &idx in &line_rest {
                                    if idx == line_mate {
                                        continue;
                                    }
                                    for digit in line_digits {
                                        local |= state.eliminate(idx, digit);
                                    }
                                }
                                for &idx in &box_rest {
                                    if idx == box_mate {
                                        continue;
                                    }
                                    for digit in box_digits {
                                        local |= state.eliminate(idx, digit);
                                    }
                                }
                                if local {
                                    return true;
                                }
                            }
                        }
                        false
                    });
                    if fired {
                        changed = true;
                    }
                }
            }
        }
        Ok(changed)
    }
}

/// Petal ALSs for one stem digit: every holder of the digit sees the stem.
fn petals_for(state: &CandidateState, sets: &[Als], stem: usize, digit: u8) -> Vec<usize> {
    sets.iter()
        .enumerate()
        .filter(|(_, als)| {
            als.digits.contains(digit)
                && !als.cells.contains(&stem)
                && digit_holders(state, als, digit)
                    .iter()
                    .all(|&idx| state.sees(stem, idx))
        })
        .map(|(i, _)| i)
        .collect()
}

/// Death Blossom: a small stem cell whose every candidate is a restricted
/// common into its own petal ALS; a digit common to all petals (and absent
/// from the stem) falls from cells seeing all of its petal holders.
/// Classic 9x9 boards only.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeathBlossom;

impl DeathBlossom {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for DeathBlossom {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DeathBlossom
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        if state.n() != 9 {
            return Ok(false);
        }
        let sets = collect_als(state);
        for stem in 0..state.nn() {
            let stem_digits = state.candidates(stem);
            if stem_digits.len() != 2 {
                continue;
            }
            let digits: Vec<u8> = stem_digits.iter().collect();
            let first_petals = petals_for(state, &sets, stem, digits[0]);
            let second_petals = petals_for(state, &sets, stem, digits[1]);
            for &first in &first_petals {
                for &second in &second_petals {
                    if first == second || !cells_disjoint(&sets[first], &sets[second]) {
                        continue;
                    }
                    let shared = (sets[first].digits & sets[second].digits)
                        .difference(stem_digits);
                    for z in shared {
                        if eliminate_common_watchers(state, &[&sets[first], &sets[second]], z) {
                            return Ok(true);
                        }
                    }
                }
            }
        }
        Ok(false)
    }
}
