//! Coloring strategies: Simple Coloring, Remote Pairs and 3D Medusa.

use std::collections::VecDeque;

use omnidoku_core::DigitSet;

use crate::{CandidateState, SolverError, StrategyKind, strategy::Strategy};

/// Strong-link neighbours of a candidate cell for one digit: the other cell
/// of every house where the digit has exactly two positions.
fn conjugate_neighbours(state: &CandidateState, digit: u8, idx: usize) -> Vec<usize> {
    let topo = state.topology();
    let mut out = Vec::new();
    for house in [
        topo.row_house(topo.row_of(idx)),
        topo.col_house(topo.col_of(idx)),
        topo.box_house(topo.box_of(idx)),
    ] {
        let mask = state.house_candidate_mask(house, digit);
        if mask.count_ones() != 2 {
            continue;
        }
        for (slot, &cell) in topo.house(house).iter().enumerate() {
            let cell = usize::from(cell);
            if mask & (1 << slot) != 0 && cell != idx {
                out.push(cell);
            }
        }
    }
    out
}

/// Two-colors the strong-link component containing `start`.
///
/// Returns `(color_a, color_b)` cell lists, or `None` when the component
/// carries an odd cycle (left for other strategies to expose).
fn color_component(
    state: &CandidateState,
    digit: u8,
    start: usize,
    visited: &mut [u8],
) -> Option<(Vec<usize>, Vec<usize>)> {
    let mut colors = vec![Vec::new(), Vec::new()];
    let mut queue = VecDeque::new();
    visited[start] = 1;
    queue.push_back((start, 0usize));
    while let Some((idx, color)) = queue.pop_front() {
        colors[color].push(idx);
        for neighbour in conjugate_neighbours(state, digit, idx) {
            let expected = 2 - u8::try_from(color).unwrap_or(0);
            match visited[neighbour] {
                0 => {
                    visited[neighbour] = expected;
                    queue.push_back((neighbour, 1 - color));
                }
                seen if seen != expected => return None,
                _ => {}
            }
        }
    }
    Some((colors.swap_remove(0), colors.remove(0)))
}

/// Simple coloring (single-digit chains).
///
/// Conjugate pairs of a digit are two-colored per component; a color seen
/// twice in one house is false everywhere, and an uncolored candidate seeing
/// both colors falls.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleColoring;

impl SimpleColoring {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for SimpleColoring {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SimpleColoring
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let topo = std::sync::Arc::clone(state.topology());
        let nn = state.nn();
        let mut changed = false;

        for digit in 1..=state.n() {
            let mut visited = vec![0u8; nn];
            for start in 0..nn {
                if visited[start] != 0 || !state.candidates(start).contains(digit) {
                    continue;
                }
                if conjugate_neighbours(state, digit, start).is_empty() {
                    continue;
                }
                let Some((color_a, color_b)) = color_component(state, digit, start, &mut visited)
                else {
                    continue;
                };
                if color_a.is_empty() || color_b.is_empty() {
                    continue;
                }

                // Color wrap: a color twice in one house is false.
                let mut false_color: Option<&[usize]> = None;
                for own in [&color_a, &color_b] {
                    let mut seen_houses = vec![0u8; topo.house_count()];
                    for &idx in own.iter() {
                        for house in [
                            topo.row_house(topo.row_of(idx)),
                            topo.col_house(topo.col_of(idx)),
                            topo.box_house(topo.box_of(idx)),
                        ] {
                            seen_houses[house] += 1;
                            if seen_houses[house] > 1 {
                                false_color = Some(own);
                            }
                        }
                    }
                    if false_color.is_some() {
                        break;
                    }
                }
                if let Some(cells) = false_color {
                    for &idx in cells {
                        changed |= state.eliminate(idx, digit);
                    }
                    continue;
                }

                // Color trap: uncolored candidates seeing both colors.
                for idx in 0..nn {
                    if visited[idx] != 0 || !state.candidates(idx).contains(digit) {
                        continue;
                    }
                    let sees_a = color_a.iter().any(|&cell| state.sees(idx, cell));
                    let sees_b = color_b.iter().any(|&cell| state.sees(idx, cell));
                    if sees_a && sees_b {
                        changed |= state.eliminate(idx, digit);
                    }
                }
            }
        }
        Ok(changed)
    }
}

/// Remote pairs: chains of identical bivalue cells linked as peers.
///
/// A properly two-colored chain alternates its pair values; a cell seeing
/// both colors can hold neither pair digit.
#[derive(Debug, Default, Clone, Copy)]
pub struct RemotePairs;

impl RemotePairs {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for RemotePairs {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RemotePairs
    }

    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let nn = state.nn();
        let bivalues = state.bivalue_cells();
        let mut changed = false;

        // Group bivalue cells by their pair.
        let mut by_pair: Vec<(DigitSet, Vec<usize>)> = Vec::new();
        for &idx in &bivalues {
            let pair = state.candidates(idx);
            match by_pair.iter_mut().find(|(p, _)| *p == pair) {
                Some((_, cells)) => cells.push(idx),
                None => by_pair.push((pair, vec![idx])),
            }
        }

        for (pair, cells) in by_pair {
            if cells.len() < 4 {
                continue;
            }
            let mut visited = vec![0u8; nn];
            for &start in &cells {
                if visited[start] != 0 {
                    continue;
                }
                // BFS over peer links within the same-pair cells.
                let mut color_a = Vec::new();
                let mut color_b = Vec::new();
                let mut queue = VecDeque::new();
                let mut bipartite = true;
                visited[start] = 1;
                queue.push_back((start, 0u8));
                while let Some((idx, color)) = queue.pop_front() {
                    if color == 0 {
                        color_a.push(idx);
                    } else {
                        color_b.push(idx);
                    }
                    for &other in &cells {
                        if other == idx || !state.sees(idx, other) {
                            continue;
                        }
                        let expected = 2 - color;
                        match visited[other] {
                            0 => {
                                visited[other] = expected;
                                queue.push_back((other, 1 - color));
                            }
                            seen if seen != expected => bipartite = false,
                            _ => {}
                        }
                    }
                }
                if !bipartite || color_a.is_empty() || color_b.is_empty() {
                    continue;
                }

                for idx in 0..nn {
                    if visited[idx] != 0 {
                        continue;
                    }
                    let overlap = state.candidates(idx) & pair;
                    if overlap.is_empty() {
                        continue;
                    }
                    let sees_a = color_a.iter().any(|&cell| state.sees(idx, cell));
                    let sees_b = color_b.iter().any(|&cell| state.sees(idx, cell));
                    if sees_a && sees_b {
                        for digit in overlap {
                            changed |= state.eliminate(idx, digit);
                        }
                    }
                }
            }
        }
        Ok(changed)
    }
}

/// 3D Medusa: two-coloring over `(cell, digit)` nodes connected by bivalue
/// cells and conjugate pairs.
///
/// A color that collides (twice in a cell, or twice for a digit in a house)
/// is false everywhere; an uncolored candidate trapped between the two
/// colors falls.
#[derive(Debug, Default, Clone, Copy)]
pub struct Medusa3D;

impl Medusa3D {
    /// Creates the strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for Medusa3D {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Medusa3D
    }

    #[expect(clippy::too_many_lines)]
    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError> {
        let nn = state.nn();
        let n = usize::from(state.n());
        let node = |cell: usize, digit: u8| cell * n + usize::from(digit) - 1;
        let mut visited = vec![0u8; nn * n];
        let mut changed = false;

        for start_cell in 0..nn {
            for start_digit in state.candidates(start_cell) {
                if visited[node(start_cell, start_digit)] != 0 {
                    continue;
                }

                // Collect the component with alternating colors.
                let mut nodes: Vec<(usize, u8, u8)> = Vec::new(); // (cell, digit, color)
                let mut queue = VecDeque::new();
                let mut bipartite = true;
                visited[node(start_cell, start_digit)] = 1;
                queue.push_back((start_cell, start_digit, 0u8));
                while let Some((cell, digit, color)) = queue.pop_front() {
                    nodes.push((cell, digit, color));
                    let expected = 2 - color;
                    let mut links: Vec<(usize, u8)> = Vec::new();
                    let candidates = state.candidates(cell);
                    if candidates.len() == 2 {
                        if let Some(other) =
                            candidates.difference(DigitSet::from_elem(digit)).smallest()
                        {
                            links.push((cell, other));
                        }
                    }
                    for neighbour in conjugate_neighbours(state, digit, cell) {
                        links.push((neighbour, digit));
                    }
                    for (link_cell, link_digit) in links {
                        let id = node(link_cell, link_digit);
                        match visited[id] {
                            0 => {
                                visited[id] = expected;
                                queue.push_back((link_cell, link_digit, 1 - color));
                            }
                            seen if seen != expected => bipartite = false,
                            _ => {}
                        }
                    }
                }
                if !bipartite || nodes.len() < 4 {
                    continue;
                }

                // Collision rules: a color appearing twice in one cell, or
                // twice for one digit in one house, is false.
                let topo = std::sync::Arc::clone(state.topology());
                let mut false_color: Option<u8> = None;
                'outer: for color in [0u8, 1] {
                    let mut cell_seen = vec![false; nn];
                    let mut house_seen = vec![0u64; topo.house_count()];
                    for &(cell, digit, node_color) in &nodes {
                        if node_color != color {
                            continue;
                        }
                        if cell_seen[cell] {
                            false_color = Some(color);
                            break 'outer;
                        }
                        cell_seen[cell] = true;
                        for house in [
                            topo.row_house(topo.row_of(cell)),
                            topo.col_house(topo.col_of(cell)),
                            topo.box_house(topo.box_of(cell)),
                        ] {
                            let bit = 1u64 << (digit - 1);
                            if house_seen[house] & bit != 0 {
                                false_color = Some(color);
                                break 'outer;
                            }
                            house_seen[house] |= bit;
                        }
                    }
                }
                if let Some(color) = false_color {
                    for &(cell, digit, node_color) in &nodes {
                        if node_color == color {
                            changed |= state.eliminate(cell, digit);
                        }
                    }
                    continue;
                }

                // Trap rules for uncolored candidates.
                for cell in 0..nn {
                    for digit in state.candidates(cell) {
                        if visited[node(cell, digit)] != 0 {
                            continue;
                        }
                        let mut sees = [false, false];
                        for &(other_cell, other_digit, color) in &nodes {
                            let watches = (other_digit == digit
                                && state.sees(cell, other_cell))
                                || (other_cell == cell && other_digit != digit);
                            if watches {
                                sees[usize::from(color)] = true;
                            }
                        }
                        if sees[0] && sees[1] {
                            changed |= state.eliminate(cell, digit);
                        }
                    }
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

    #[test]
    fn test_simple_coloring_trap() {
        let mut state = open_state();
        // Digit 7 conjugate chain of three links: row 1 {(1,2),(1,7)},
        // column 7 {(1,7),(6,7)}, row 6 {(6,7),(6,0)}.
        for col in 0..9 {
            if col != 2 && col != 7 {
                state.eliminate(9 + col, 7);
            }
            if col != 7 && col != 0 {
                state.eliminate(6 * 9 + col, 7);
            }
        }
        for row in 0..9 {
            if row != 1 && row != 6 {
                state.eliminate(row * 9 + 7, 7);
            }
        }

        // Colors alternate (1,2)/(6,7) vs (1,7)/(6,0); cell (2,0) sees
        // (1,2) through box 0 and (6,0) through column 0.
        StrategyTester::new(state)
            .apply_once(&SimpleColoring::new())
            .assert_removed_includes(2 * 9, [7]);
    }

    #[test]
    fn test_remote_pairs_elimination() {
        let mut state = open_state();
        // Chain of {4,5} cells: (0,0)-(0,6)-(2,6)-(2,0) is an even loop;
        // break it into a path by keeping (0,0),(0,6),(2,6),(8,6)... use a
        // plain 4-cell path instead.
        let pair = DigitSet::from_iter([4u8, 5]);
        state.restrict(0, pair); // (0,0) color A
        state.restrict(6, pair); // (0,6) color B
        state.restrict(2 * 9 + 6, pair); // (2,6) color A
        state.restrict(2 * 9 + 3, pair); // (2,3) color B

        // (0,3) sees (0,0)/(0,6) [A and B]; eliminations also hit cells
        // seeing (2,3) [B] and (0,0) [A] such as (2,0).
        StrategyTester::new(state)
            .apply_once(&RemotePairs::new())
            .assert_removed_includes(3, [4, 5])
            .assert_removed_includes(2 * 9, [4, 5]);
    }

    #[test]
    fn test_medusa_two_colors_in_one_cell_strip_the_rest() {
        let mut state = open_state();
        // Bivalue bridge at (4,4) {1,2} plus four conjugate links closing a
        // loop through (0,0): digit 1 on row 4 and column 0, digit 2 on
        // column 4 and row 0.
        state.restrict(40, DigitSet::from_iter([1u8, 2]));
        for col in 0..9 {
            if col != 0 && col != 4 {
                state.eliminate(4 * 9 + col, 1);
                state.eliminate(col, 2);
            }
        }
        for row in 0..9 {
            if row != 0 && row != 4 {
                state.eliminate(row * 9 + 4, 2);
                state.eliminate(row * 9, 1);
            }
        }

        // (0,0) ends up holding candidate 1 in one color and candidate 2 in
        // the other, so its remaining candidates all fall.
        StrategyTester::new(state)
            .apply_once(&Medusa3D::new())
            .assert_candidates(0, [1, 2]);
    }

    #[test]
    fn test_no_progress_on_open_grid() {
        StrategyTester::new(open_state())
            .apply_none(&SimpleColoring::new())
            .apply_none(&RemotePairs::new())
            .apply_none(&Medusa3D::new());
    }
}
