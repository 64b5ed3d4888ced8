//! Wing patterns: Y-Wing, XYZ-Wing, WXYZ-Wing and W-Wing.

use omnidoku_core::DigitSet;

use crate::{
    CandidateState, SolverError, StrategyKind,
    strategy::{Strategy, eliminate_from_cells},
};

/// Y-Wing: a bivalue pivot `{x,y}` with pincers `{x,z}` and `{y,z}` among
/// its peers. One pincer must hold `z`, so `z` falls from every cell seeing
/// both pincers.
#[derive(Debug, Default, Clone, Copy)]
pub struct YWing;

impl YWing {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for YWing {
    fn kind(&self) -> StrategyKind {
        StrategyKind::YWing
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let topo = std::sync::Arc::clone(state.topology());
        let bivalues = state.bivalue_cells();
        let mut changed = false;

        for &pivot in &bivalues {
            let pivot_set = state.candidates(pivot);
            let pincers: Vec<usize> = topo
                .peers(pivot)
                .iter()
                .map(|&idx| usize::from(idx))
                .filter(|&idx| {
                    let set = state.candidates(idx);
                    set.len() == 2 && (set & pivot_set).len() == 1 && set != pivot_set
                })
                .collect();

            for (i, &a) in pincers.iter().enumerate() {
                let set_a = state.candidates(a);
                for &b in &pincers[i + 1..] {
                    let set_b = state.candidates(b);
                    // The two pincers share the z digit and cover both pivot
                    // digits between them.
                    let z_set = set_a & set_b;
                    if !z_set.is_single() || (z_set & pivot_set) != DigitSet::EMPTY {
                        continue;
                    }
                    if (set_a | set_b | pivot_set).len() != 3 {
                        continue;
                    }
                    let Some(z) = z_set.smallest() else { continue };
                    let mut targets = state.common_peers_of(&[a, b]);
                    targets.remove(pivot);
                    targets.intersect_with(&state.digit_cells(z));
                    changed |= eliminate_from_cells(state, &targets, z);
                }
            }
        }
        Ok(changed)
    }
}

/// XYZ-Wing: a trivalue pivot `{x,y,z}` with pincers `{x,z}` and `{y,z}`.
/// `z` falls from cells seeing the pivot and both pincers.
#[derive(Debug, Default, Clone, Copy)]
pub struct XyzWing;

impl XyzWing {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for XyzWing {
    fn kind(&self) -> StrategyKind {
        StrategyKind::XyzWing
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let topo = std::sync::Arc::clone(state.topology());
        let mut changed = false;

        for pivot in 0..state.nn() {
            let pivot_set = state.candidates(pivot);
            if pivot_set.len() != 3 {
                continue;
            }
            let pincers: Vec<usize> = topo
                .peers(pivot)
                .iter()
                .map(|&idx| usize::from(idx))
                .filter(|&idx| {
                    let set = state.candidates(idx);
                    set.len() == 2 && set.is_subset_of(pivot_set)
                })
                .collect();

            for (i, &a) in pincers.iter().enumerate() {
                let set_a = state.candidates(a);
                for &b in &pincers[i + 1..] {
                    let set_b = state.candidates(b);
                    let z_set = set_a & set_b;
                    if !z_set.is_single() || (set_a | set_b) != pivot_set {
                        continue;
                    }
                    let Some(z) = z_set.smallest() else { continue };
                    let mut targets = state.common_peers_of(&[pivot, a, b]);
                    targets.intersect_with(&state.digit_cells(z));
                    changed |= eliminate_from_cells(state, &targets, z);
                }
            }
        }
        Ok(changed)
    }
}

/// WXYZ-Wing: a hinge plus three bivalue leaves whose candidates union to
/// four digits with exactly one non-restricted digit `z`. `z` falls from
/// cells seeing every `z` cell of the pattern.
#[derive(Debug, Default, Clone, Copy)]
pub struct WxyzWing;

impl WxyzWing {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for WxyzWing {
    fn kind(&self) -> StrategyKind {
        StrategyKind::WxyzWing
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let topo = std::sync::Arc::clone(state.topology());
        let mut changed = false;

        for hinge in 0..state.nn() {
            let hinge_set = state.candidates(hinge);
            let hinge_len = hinge_set.len();
            if !(2..=4).contains(&hinge_len) {
                continue;
            }
            let leaves: Vec<usize> = topo
                .peers(hinge)
                .iter()
                .map(|&idx| usize::from(idx))
                .filter(|&idx| state.candidates(idx).len() == 2)
                .collect();
            if leaves.len() < 3 {
                continue;
            }

            for (i, &a) in leaves.iter().enumerate() {
                for (j, &b) in leaves.iter().enumerate().skip(i + 1) {
                    for &c in &leaves[j + 1..] {
                        let union = hinge_set
                            | state.candidates(a)
                            | state.candidates(b)
                            | state.candidates(c);
                        if union.len() != 4 {
                            continue;
                        }
                        // The non-restricted digit: present in at least two
                        // pattern cells that do not see each other.
                        let cells = [hinge, a, b, c];
                        let mut fired = false;
                        for z in union {
                            let holders: Vec<usize> = cells
                                .iter()
                                .copied()
                                .filter(|&idx| state.candidates(idx).contains(z))
                                .collect();
                            let restricted = holders.iter().enumerate().all(|(x, &h1)| {
                                holders[x + 1..].iter().all(|&h2| state.sees(h1, h2))
                            });
                            if restricted {
                                continue;
                            }
                            // Every other digit must be restricted common.
                            let others_ok = union.iter().filter(|&d| d != z).all(|d| {
                                let ds: Vec<usize> = cells
                                    .iter()
                                    .copied()
                                    .filter(|&idx| state.candidates(idx).contains(d))
                                    .collect();
                                ds.iter().enumerate().all(|(x, &h1)| {
                                    ds[x + 1..].iter().all(|&h2| state.sees(h1, h2))
                                })
                            });
                            if !others_ok {
                                continue;
                            }
                            let mut targets = state.common_peers_of(&holders);
                            for &cell in &cells {
                                targets.remove(cell);
                            }
                            targets.intersect_with(&state.digit_cells(z));
                            if eliminate_from_cells(state, &targets, z) {
                                fired = true;
                            }
                        }
                        changed |= fired;
                    }
                }
            }
        }
        Ok(changed)
    }
}

/// W-Wing: two bivalue cells with the same pair `{x,y}`, joined by a strong
/// link on `x` whose ends see one cell each. `y` falls from cells seeing
/// both bivalue cells.
#[derive(Debug, Default, Clone, Copy)]
pub struct WWing;

impl WWing {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for WWing {
    fn kind(&self) -> StrategyKind {
        StrategyKind::WWing
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let topo = std::sync::Arc::clone(state.topology());
        let bivalues = state.bivalue_cells();
        let mut changed = false;

        for (i, &cell_a) in bivalues.iter().enumerate() {
            let pair = state.candidates(cell_a);
            for &cell_b in &bivalues[i + 1..] {
                if state.candidates(cell_b) != pair || state.sees(cell_a, cell_b) {
                    continue;
                }
                for x in pair {
                    let Some(y) = pair.difference(DigitSet::from_elem(x)).smallest() else {
                        continue;
                    };
                    // A strong link on x with one end seeing each cell.
                    let mut linked = false;
                    'houses: for house in 0..topo.house_count() {
                        let mask = state.house_candidate_mask(house, x);
                        if mask.count_ones() != 2 {
                            continue;
                        }
                        let cells = topo.house(house);
                        let first = usize::from(cells[mask.trailing_zeros() as usize]);
                        let second_slot = (mask & (mask - 1)).trailing_zeros() as usize;
                        let second = usize::from(cells[second_slot]);
                        if first == cell_a || first == cell_b || second == cell_a || second == cell_b
                        {
                            continue;
                        }
                        for (end_a, end_b) in [(first, second), (second, first)] {
                            if state.sees(end_a, cell_a) && state.sees(end_b, cell_b) {
                                linked = true;
                                break 'houses;
                            }
                        }
                    }
                    if !linked {
                        continue;
                    }
                    let mut targets = state.common_peers_of(&[cell_a, cell_b]);
                    targets.intersect_with(&state.digit_cells(y));
                    changed |= eliminate_from_cells(state, &targets, y);
                }
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use omnidoku_core::{DigitSet, Topology};

    use super::*;
    use crate::testing::StrategyTester;

    fn open_state() -> CandidateState {
        CandidateState::new_empty(Topology::shared(3, 3).unwrap())
    }

    fn pair(a: u8, b: u8) -> DigitSet {
        DigitSet::from_iter([a, b])
    }

    #[test]
    fn test_y_wing_eliminates_z_from_crossing() {
        let mut state = open_state();
        // Pivot (0,0) {1,2}; pincers (0,4) {1,3} and (4,0) {2,3}.
        state.restrict(0, pair(1, 2));
        state.restrict(4, pair(1, 3));
        state.restrict(36, pair(2, 3));

        // (4,4) sees both pincers; z = 3.
        StrategyTester::new(state)
            .apply_once(&YWing::new())
            .assert_removed_includes(40, [3]);
    }

    #[test]
    fn test_xyz_wing_restricts_to_triple_watchers() {
        let mut state = open_state();
        // Pivot (4,4) {1,2,3}; pincers (4,0) {1,3} and (4,5) {2,3} - the
        // second pincer shares box 4 with the pivot.
        state.restrict(40, DigitSet::from_iter([1u8, 2, 3]));
        state.restrict(36, pair(1, 3));
        state.restrict(41, pair(2, 3));

        // Every other row-4 cell sees all three pattern cells; z = 3.
        StrategyTester::new(state)
            .apply_once(&XyzWing::new())
            .assert_removed_includes(39, [3])
            .assert_removed_includes(37, [3])
            .assert_no_change(31);
    }

    #[test]
    fn test_w_wing_eliminates_second_digit() {
        let mut state = open_state();
        // Bivalue {5,6} at (0,1) and (4,7).
        state.restrict(1, pair(5, 6));
        state.restrict(43, pair(5, 6));
        // Strong link on 5 in column 4: rows {0, 4}.
        for row in 1..9 {
            if row != 4 {
                state.eliminate(row * 9 + 4, 5);
            }
        }

        // Link ends (0,4) and (4,4): (0,4) sees (0,1), (4,4) sees (4,7).
        // 6 falls from cells seeing both bivalues: (0,7) and (4,1).
        StrategyTester::new(state)
            .apply_once(&WWing::new())
            .assert_removed_includes(7, [6])
            .assert_removed_includes(37, [6]);
    }

    #[test]
    fn test_no_progress_on_open_grid() {
        StrategyTester::new(open_state())
            .apply_none(&YWing::new())
            .apply_none(&XyzWing::new())
            .apply_none(&WxyzWing::new())
            .apply_none(&WWing::new());
    }
}
