//! Chain strategies: X-Chain, XY-Chain, AIC (plain and grouped), grouped
//! X-Cycles, Continuous Nice Loops and conservative Forcing Chains.
//!
//! All chain searches share one alternating-inference walker over nodes of
//! `(cells, digit)`. A node is a single candidate cell or, when grouped
//! links are enabled, a box/line intersection group. The walker assumes the
//! start node false and follows strong links to "on" nodes and weak links
//! back to "off" nodes; an "on" endpoint reached over an odd number of at
//! least three links yields eliminations.

use std::collections::{HashMap, VecDeque};

use omnidoku_core::DigitSet;
use tinyvec::ArrayVec;

use crate::{CandidateState, SolverError, StrategyKind, logic, strategy::Strategy};

/// A chain node: one or more cells that jointly hold a digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Node {
    cells: Vec<usize>,
    digit: u8,
}

impl Node {
    fn cell(idx: usize, digit: u8) -> Self {
        Self {
            cells: vec![idx],
            digit,
        }
    }

    fn group(mut cells: Vec<usize>, digit: u8) -> Self {
        cells.sort_unstable();
        Self { cells, digit }
    }

    fn is_single(&self) -> bool {
        self.cells.len() == 1
    }

    fn disjoint(&self, other: &Self) -> bool {
        self.cells.iter().all(|cell| !other.cells.contains(cell))
    }
}

/// Search options for the alternating-inference walker.
#[derive(Debug, Clone, Copy)]
struct ChainOptions {
    multi_digit: bool,
    grouped: bool,
    max_nodes: usize,
}

/// Candidate cells of `digit` in a house.
fn house_digit_cells(state: &CandidateState, house: usize, digit: u8) -> Vec<usize> {
    state
        .topology()
        .house(house)
        .iter()
        .map(|&idx| usize::from(idx))
        .filter(|&idx| state.candidates(idx).contains(digit))
        .collect()
}

/// Houses containing every cell of a node.
fn node_houses(state: &CandidateState, node: &Node) -> ArrayVec<[usize; 3]> {
    let topo = state.topology();
    let first = node.cells[0];
    let mut houses = ArrayVec::new();
    for house in [
        topo.row_house(topo.row_of(first)),
        topo.col_house(topo.col_of(first)),
        topo.box_house(topo.box_of(first)),
    ] {
        let cells = topo.house_cells(house);
        if node.cells.iter().all(|&idx| cells.contains(idx)) {
            houses.push(house);
        }
    }
    houses
}

/// Splits `cells` into box groups (when `house` is a line) or line groups
/// (when `house` is a box), keeping groups of at least two cells.
fn grouped_partition(state: &CandidateState, house: usize, cells: &[usize]) -> Vec<Vec<usize>> {
    let topo = state.topology();
    let n = usize::from(topo.n());
    let mut buckets: HashMap<usize, Vec<usize>> = HashMap::new();
    for &idx in cells {
        let key = if house < 2 * n {
            topo.box_of(idx)
        } else {
            topo.row_of(idx)
        };
        buckets.entry(key).or_default().push(idx);
    }
    buckets
        .into_values()
        .filter(|group| group.len() >= 2)
        .collect()
}

/// `true` when `cells` all lie in one box and one line.
fn forms_group(state: &CandidateState, cells: &[usize]) -> bool {
    let topo = state.topology();
    let boxes: Vec<usize> = cells.iter().map(|&idx| topo.box_of(idx)).collect();
    let rows: Vec<usize> = cells.iter().map(|&idx| topo.row_of(idx)).collect();
    let cols: Vec<usize> = cells.iter().map(|&idx| topo.col_of(idx)).collect();
    boxes.windows(2).all(|w| w[0] == w[1])
        && (rows.windows(2).all(|w| w[0] == w[1]) || cols.windows(2).all(|w| w[0] == w[1]))
}

/// Strong-link successors of an "off" node.
fn strong_from(state: &CandidateState, node: &Node, options: ChainOptions) -> Vec<Node> {
    let mut out = Vec::new();
    if options.multi_digit && node.is_single() {
        let cell = node.cells[0];
        let candidates = state.candidates(cell);
        if candidates.len() == 2
            && let Some(other) = candidates
                .difference(DigitSet::from_elem(node.digit))
                .smallest()
        {
            out.push(Node::cell(cell, other));
        }
    }
    for house in node_houses(state, node) {
        let mut rest = house_digit_cells(state, house, node.digit);
        rest.retain(|idx| !node.cells.contains(idx));
        if rest.is_empty() {
            continue;
        }
        if rest.len() == 1 {
            out.push(Node::cell(rest[0], node.digit));
        } else if options.grouped && forms_group(state, &rest) {
            out.push(Node::group(rest, node.digit));
        }
    }
    out
}

/// Weak-link successors of an "on" node.
fn weak_from(state: &CandidateState, node: &Node, options: ChainOptions) -> Vec<Node> {
    let mut out = Vec::new();
    if options.multi_digit && node.is_single() {
        let cell = node.cells[0];
        for other in state
            .candidates(cell)
            .difference(DigitSet::from_elem(node.digit))
        {
            out.push(Node::cell(cell, other));
        }
    }
    for house in node_houses(state, node) {
        let mut rest = house_digit_cells(state, house, node.digit);
        rest.retain(|idx| !node.cells.contains(idx));
        for &idx in &rest {
            out.push(Node::cell(idx, node.digit));
        }
        if options.grouped {
            for group in grouped_partition(state, house, &rest) {
                out.push(Node::group(group, node.digit));
            }
        }
    }
    out
}

/// One reached "on" node together with its link distance.
#[derive(Debug)]
struct OnEndpoint {
    node: Node,
    links: u32,
}

/// Walks the alternating-inference graph from `start` assumed false.
///
/// Returns every "on" node reached, with parent links for loop
/// reconstruction stored in `parents` as `(node, on) -> (node, on)`.
#[expect(clippy::type_complexity)]
fn walk(
    state: &CandidateState,
    start: &Node,
    options: ChainOptions,
    parents: Option<&mut HashMap<(Node, bool), (Node, bool)>>,
) -> Vec<OnEndpoint> {
    let mut endpoints = Vec::new();
    let mut visited: HashMap<(Node, bool), u32> = HashMap::new();
    let mut queue = VecDeque::new();
    let mut parent_map = parents;

    visited.insert((start.clone(), false), 0);
    queue.push_back((start.clone(), false, 0u32));

    while let Some((node, on, links)) = queue.pop_front() {
        if visited.len() > options.max_nodes {
            break;
        }
        let successors = if on {
            weak_from(state, &node, options)
        } else {
            strong_from(state, &node, options)
        };
        for next in successors {
            if !next.disjoint(start) && !(next.is_single() && start.is_single()) {
                continue;
            }
            let key = (next.clone(), !on);
            if visited.contains_key(&key) {
                continue;
            }
            visited.insert(key.clone(), links + 1);
            if let Some(map) = parent_map.as_deref_mut() {
                map.insert(key.clone(), (node.clone(), on));
            }
            if !on {
                endpoints.push(OnEndpoint {
                    node: next.clone(),
                    links: links + 1,
                });
            }
            queue.push_back((next, !on, links + 1));
        }
    }
    endpoints
}

/// Applies the discontinuous-chain eliminations for endpoints `(start, t)`.
fn eliminate_for_endpoints(
    state: &mut CandidateState,
    start: &Node,
    end: &Node,
) -> bool {
    let start_cell = start.cells[0];
    let mut changed = false;
    if end.digit == start.digit {
        if end.cells.contains(&start_cell) {
            return false;
        }
        let mut watchers = state.peers_set(start_cell);
        for &cell in &end.cells {
            watchers.intersect_with(&state.peers_set(cell));
        }
        watchers.intersect_with(&state.digit_cells(end.digit));
        for idx in watchers.iter().collect::<Vec<_>>() {
            changed |= state.eliminate(idx, end.digit);
        }
    } else if end.is_single() {
        let end_cell = end.cells[0];
        if end_cell == start_cell {
            // Either digit occupies the cell: everything else falls.
            let keep = DigitSet::from_iter([start.digit, end.digit]);
            changed |= state.restrict(start_cell, keep);
        } else if state.sees(start_cell, end_cell) {
            changed |= state.eliminate(start_cell, end.digit);
            changed |= state.eliminate(end_cell, start.digit);
        }
    }
    changed
}

/// Runs a discontinuous chain search and applies the first elimination.
fn discontinuous_chain(state: &mut CandidateState, options: ChainOptions, digits: DigitSet) -> bool {
    let nn = state.nn();
    for digit in digits {
        for idx in 0..nn {
            if !state.candidates(idx).contains(digit) {
                continue;
            }
            let start = Node::cell(idx, digit);
            let endpoints = walk(state, &start, options, None);
            for endpoint in endpoints {
                if endpoint.links < 3 || endpoint.links % 2 == 0 {
                    continue;
                }
                if eliminate_for_endpoints(state, &start, &endpoint.node) {
                    return true;
                }
            }
        }
    }
    false
}

/// X-Chain: single-digit alternating chain with strong ends.
#[derive(Debug, Default, Clone, Copy)]
pub struct XChain;

impl XChain {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for XChain {
    fn kind(&self) -> StrategyKind {
        StrategyKind::XChain
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let options = ChainOptions {
            multi_digit: false,
            grouped: false,
            max_nodes: 2048,
        };
        Ok(discontinuous_chain(state, options, DigitSet::full(state.n())))
    }
}

/// XY-Chain: a chain of bivalue cells carrying a shared digit at both ends.
#[derive(Debug, Default, Clone, Copy)]
pub struct XyChain;

impl XyChain {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    const MAX_LEN: usize = 12;

    /// Extends a chain whose current cell carries `carry`; the chain closes
    /// when a cell's other digit equals `z`.
    fn extend(
        state: &mut CandidateState,
        z: u8,
        start: usize,
        path: &mut Vec<usize>,
        carry: u8,
    ) -> bool {
        let current = *path.last().unwrap_or(&start);
        if path.len() > Self::MAX_LEN {
            return false;
        }
        let bivalues: Vec<usize> = state
            .bivalue_cells()
            .into_iter()
            .filter(|&idx| !path.contains(&idx) && state.sees(current, idx))
            .collect();
        for next in bivalues {
            let set = state.candidates(next);
            if !set.contains(carry) {
                continue;
            }
            let Some(other) = set.difference(DigitSet::from_elem(carry)).smallest() else {
                continue;
            };
            if other == z && path.len() >= 2 {
                // Chain ends: z at both ends; cells seeing both lose z.
                let mut watchers = state.peers_set(start);
                watchers.intersect_with(&state.peers_set(next));
                watchers.intersect_with(&state.digit_cells(z));
                let mut changed = false;
                for idx in watchers.iter().collect::<Vec<_>>() {
                    if !path.contains(&idx) {
                        changed |= state.eliminate(idx, z);
                    }
                }
                if changed {
                    return true;
                }
            }
            path.push(next);
            if Self::extend(state, z, start, path, other) {
                return true;
            }
            path.pop();
        }
        false
    }
}

impl Strategy for XyChain {
    fn kind(&self) -> StrategyKind {
        StrategyKind::XyChain
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let bivalues = state.bivalue_cells();
        for &start in &bivalues {
            let set = state.candidates(start);
            for z in set {
                let Some(carry) = set.difference(DigitSet::from_elem(z)).smallest() else {
                    continue;
                };
                let mut path = vec![start];
                if Self::extend(state, z, start, &mut path, carry) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

/// Alternating Inference Chain over cell and digit links.
#[derive(Debug, Default, Clone, Copy)]
pub struct Aic;

impl Aic {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for Aic {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Aic
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let options = ChainOptions {
            multi_digit: true,
            grouped: false,
            max_nodes: 2048,
        };
        Ok(discontinuous_chain(state, options, DigitSet::full(state.n())))
    }
}

/// AIC with grouped single-digit links.
#[derive(Debug, Default, Clone, Copy)]
pub struct GroupedAic;

impl GroupedAic {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for GroupedAic {
    fn kind(&self) -> StrategyKind {
        StrategyKind::GroupedAic
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let options = ChainOptions {
            multi_digit: true,
            grouped: true,
            max_nodes: 3072,
        };
        Ok(discontinuous_chain(state, options, DigitSet::full(state.n())))
    }
}

/// Grouped X-Cycle: single-digit chains with grouped nodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct GroupedXCycle;

impl GroupedXCycle {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for GroupedXCycle {
    fn kind(&self) -> StrategyKind {
        StrategyKind::GroupedXCycle
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let options = ChainOptions {
            multi_digit: false,
            grouped: true,
            max_nodes: 3072,
        };
        Ok(discontinuous_chain(state, options, DigitSet::full(state.n())))
    }
}

/// Continuous Nice Loop: a closed single-digit alternating loop; the digit
/// falls from the free cells of every weak-link house on the loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContinuousNiceLoop;

impl ContinuousNiceLoop {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn shared_house_eliminations(
        state: &mut CandidateState,
        a: &Node,
        b: &Node,
        digit: u8,
    ) -> bool {
        let topo = std::sync::Arc::clone(state.topology());
        let mut changed = false;
        for house in node_houses(state, a) {
            let covers_b = {
                let cells = topo.house_cells(house);
                b.cells.iter().all(|&idx| cells.contains(idx))
            };
            if !covers_b {
                continue;
            }
            for idx in house_digit_cells(state, house, digit) {
                if !a.cells.contains(&idx) && !b.cells.contains(&idx) {
                    changed |= state.eliminate(idx, digit);
                }
            }
        }
        changed
    }
}

impl Strategy for ContinuousNiceLoop {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ContinuousNiceLoop
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let options = ChainOptions {
            multi_digit: false,
            grouped: false,
            max_nodes: 2048,
        };
        let nn = state.nn();
        for digit in 1..=state.n() {
            for idx in 0..nn {
                if !state.candidates(idx).contains(digit) {
                    continue;
                }
                let start = Node::cell(idx, digit);
                let mut parents = HashMap::new();
                let endpoints = walk(state, &start, options, Some(&mut parents));
                for endpoint in endpoints {
                    if endpoint.links < 3 || endpoint.links % 2 == 0 {
                        continue;
                    }
                    // The loop closes if the endpoint weakly links back to
                    // the start (they share a house).
                    let closes = endpoint
                        .node
                        .cells
                        .iter()
                        .all(|&cell| state.sees(cell, idx));
                    if !closes {
                        continue;
                    }

                    // Walk the parent chain and apply weak-link
                    // eliminations, including the closing link.
                    let mut changed =
                        Self::shared_house_eliminations(state, &endpoint.node, &start, digit);
                    let mut cursor = (endpoint.node.clone(), true);
                    while let Some(previous) = parents.get(&cursor) {
                        if !cursor.1 {
                            // Weak link from the previous "on" node.
                            changed |= Self::shared_house_eliminations(
                                state,
                                &previous.0,
                                &cursor.0,
                                digit,
                            );
                        }
                        cursor = previous.clone();
                        if !cursor.1 && cursor.0 == start {
                            break;
                        }
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

/// Number of branching sets a single forcing-chain pass examines.
const FORCING_SET_CAP: usize = 128;

/// Conservative implicative forcing chains (classic 9x9 boards only).
///
/// A branching set is a small cell (two or three candidates) or a digit
/// with two or three positions in a house. Every branch supported by
/// singles propagation is propagated on a private copy; a candidate absent
/// from every supported branch falls. A set with no supported branch at
/// all is a contradiction.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForcingChains;

impl ForcingChains {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Candidate sets after placing `assignment` and propagating singles,
    /// or `None` when the branch is contradictory.
    fn branch_result(state: &CandidateState, assignment: (usize, u8)) -> Option<Vec<DigitSet>> {
        let mut probe = state.clone();
        if !probe.candidates(assignment.0).contains(assignment.1) {
            return None;
        }
        probe.place(assignment.0, assignment.1);
        if logic::propagate_singles(&mut probe).is_err() {
            return None;
        }
        let sets = (0..probe.nn())
            .map(|idx| {
                let value = probe.value(idx);
                if value == 0 {
                    probe.candidates(idx)
                } else {
                    #[expect(clippy::cast_possible_truncation)]
                    DigitSet::from_elem(value as u8)
                }
            })
            .collect();
        Some(sets)
    }

    fn branching_sets(state: &CandidateState) -> Vec<Vec<(usize, u8)>> {
        let topo = state.topology();
        let mut sets = Vec::new();
        for idx in 0..state.nn() {
            let candidates = state.candidates(idx);
            if (2..=3).contains(&candidates.len()) {
                sets.push(candidates.iter().map(|digit| (idx, digit)).collect());
            }
        }
        for house in 0..topo.house_count() {
            let placed = state.house_placed_digits(house);
            for digit in placed.complement(state.n()) {
                let cells = house_digit_cells(state, house, digit);
                if (2..=3).contains(&cells.len()) {
                    sets.push(cells.into_iter().map(|idx| (idx, digit)).collect());
                }
            }
        }
        sets.truncate(FORCING_SET_CAP);
        sets
    }
}

impl Strategy for ForcingChains {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ForcingChains
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        if state.n() != 9 {
            return Ok(false);
        }
        for branches in Self::branching_sets(state) {
            let results: Vec<Vec<DigitSet>> = branches
                .iter()
                .filter_map(|&assignment| Self::branch_result(state, assignment))
                .collect();
            if results.is_empty() {
                // Every branch of an exhaustive set is contradictory.
                return Err(SolverError::EmptyCandidates { cell: branches[0].0 });
            }

            let mut changed = false;
            for idx in 0..state.nn() {
                if state.value(idx) != 0 {
                    continue;
                }
                let original = state.candidates(idx);
                let mut surviving = DigitSet::EMPTY;
                for result in &results {
                    surviving |= result[idx];
                }
                for digit in original.difference(surviving) {
                    changed |= state.eliminate(idx, digit);
                }
            }
            if changed {
                return Ok(true);
            }
        }
        Ok(false)
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
    fn test_x_chain_skyscraper_shape() {
        let mut state = open_state();
        // Digit 4 strong links: column 0 rows {1,4}, column 4 rows {1,5}.
        // The X-chain (4,0)=off -> (1,0)=on -> (1,4)=off -> (5,4)=on
        // eliminates 4 from cells seeing (4,0) and (5,4).
        for row in 0..9 {
            if row != 1 && row != 4 {
                state.eliminate(row * 9, 4);
            }
            if row != 1 && row != 5 {
                state.eliminate(row * 9 + 4, 4);
            }
        }

        StrategyTester::new(state)
            .apply_once(&XChain::new())
            .assert_removed_includes(4 * 9 + 3, [4]);
    }

    #[test]
    fn test_xy_chain_short_loop() {
        let mut state = open_state();
        // (0,0) {1,2} - (0,4) {2,3} - (4,4) {3,1}: both ends carry 1.
        state.restrict(0, pair(1, 2));
        state.restrict(4, pair(2, 3));
        state.restrict(40, pair(1, 3));

        // (4,0) sees (0,0) and (4,4).
        StrategyTester::new(state)
            .apply_once(&XyChain::new())
            .assert_removed_includes(36, [1]);
    }

    #[test]
    fn test_forcing_chains_intersect_branches() {
        let mut state = open_state();
        // Cell (0,0) {1,2} is the branching set. (0,3) {1,9} and (0,5)
        // {2,9} share row 0 with it and box 1 with (0,4).
        state.restrict(0, pair(1, 2));
        state.restrict(3, pair(1, 9));
        state.restrict(5, pair(2, 9));

        // Branch (0,0)=1 forces (0,3)=9; branch (0,0)=2 forces (0,5)=9.
        // Either way box 1 holds a 9, so (0,4) loses it.
        StrategyTester::new(state)
            .apply_once(&ForcingChains::new())
            .assert_removed_includes(4, [9]);
    }

    #[test]
    fn test_no_progress_on_open_grid() {
        StrategyTester::new(open_state())
            .apply_none(&XChain::new())
            .apply_none(&XyChain::new())
            .apply_none(&Aic::new())
            .apply_none(&GroupedAic::new())
            .apply_none(&GroupedXCycle::new())
            .apply_none(&ContinuousNiceLoop::new())
            .apply_none(&ForcingChains::new());
    }
}
