use std::sync::Arc;

use omnidoku_core::{CellSet, DigitSet, PuzzleError, Topology};

use crate::SolverError;

/// Candidate-tracking grid state shared by every logical kernel.
///
/// For each cell the state holds its value (`0` = empty) and the set of
/// digits still admissible there. Placements propagate eagerly: placing a
/// digit clears the cell's candidate set and strips the digit from every
/// peer. Strategies mutate the state only through [`CandidateState::place`],
/// [`CandidateState::eliminate`] and [`CandidateState::restrict`].
///
/// Contradictions (an empty cell with no candidates, a digit with no place
/// left in a house) are not raised eagerly by eliminations; callers run
/// [`CandidateState::check_consistency`] at step boundaries, the way the
/// round-robin engine does.
#[derive(Debug, Clone)]
pub struct CandidateState {
    topo: Arc<Topology>,
    values: Vec<u16>,
    candidates: Vec<DigitSet>,
    givens: CellSet,
    unsolved: usize,
}

impl CandidateState {
    /// Creates a state with every cell empty and all candidates available.
    #[must_use]
    pub fn new_empty(topo: Arc<Topology>) -> Self {
        let nn = topo.nn();
        let full = DigitSet::full(topo.n());
        Self {
            givens: CellSet::empty(nn),
            values: vec![0; nn],
            candidates: vec![full; nn],
            unsolved: nn,
            topo,
        }
    }

    /// Builds a state from a puzzle, recording the clue cells as givens.
    ///
    /// Conflicting clues are not rejected here: the conflicting digit simply
    /// exhausts a peer's candidate set, and the contradiction surfaces at the
    /// next consistency check. The quick prefilter is the place to reject
    /// duplicate clues cheaply.
    ///
    /// # Errors
    ///
    /// Returns [`PuzzleError`] on a length mismatch or an out-of-range digit.
    pub fn from_puzzle(topo: Arc<Topology>, puzzle: &[u16]) -> Result<Self, PuzzleError> {
        if puzzle.len() != topo.nn() {
            return Err(PuzzleError::LengthMismatch {
                expected: topo.nn(),
                actual: puzzle.len(),
            });
        }
        let n = topo.n();
        let mut state = Self::new_empty(topo);
        for (idx, &value) in puzzle.iter().enumerate() {
            if value == 0 {
                continue;
            }
            if value > u16::from(n) {
                return Err(PuzzleError::DigitOutOfRange {
                    idx,
                    digit: value,
                    n,
                });
            }
            #[expect(clippy::cast_possible_truncation)]
            state.place(idx, value as u8);
            state.givens.insert(idx);
        }
        Ok(state)
    }

    /// Returns the state's topology.
    #[must_use]
    #[inline]
    pub fn topology(&self) -> &Arc<Topology> {
        &self.topo
    }

    /// Board size.
    #[must_use]
    #[inline]
    pub fn n(&self) -> u8 {
        self.topo.n()
    }

    /// Cell count.
    #[must_use]
    #[inline]
    pub fn nn(&self) -> usize {
        self.topo.nn()
    }

    /// Value of a cell (`0` = empty).
    #[must_use]
    #[inline]
    pub fn value(&self, idx: usize) -> u16 {
        self.values[idx]
    }

    /// The flat value array.
    #[must_use]
    #[inline]
    pub fn values(&self) -> &[u16] {
        &self.values
    }

    /// `true` if the cell held a clue when the state was built.
    #[must_use]
    #[inline]
    pub fn is_given(&self, idx: usize) -> bool {
        self.givens.contains(idx)
    }

    /// Candidate digits of a cell (empty for filled cells).
    #[must_use]
    #[inline]
    pub fn candidates(&self, idx: usize) -> DigitSet {
        self.candidates[idx]
    }

    /// Number of cells still empty.
    #[must_use]
    #[inline]
    pub fn unsolved_cells(&self) -> usize {
        self.unsolved
    }

    /// `true` once every cell holds a digit.
    #[must_use]
    #[inline]
    pub fn is_solved(&self) -> bool {
        self.unsolved == 0
    }

    /// Places a digit: sets the value, clears the cell's candidates, and
    /// strips the digit from every peer.
    pub fn place(&mut self, idx: usize, digit: u8) {
        debug_assert_eq!(self.values[idx], 0);
        self.values[idx] = u16::from(digit);
        self.candidates[idx] = DigitSet::EMPTY;
        self.unsolved -= 1;
        for &peer in self.topo.peers(idx) {
            self.candidates[usize::from(peer)].remove(digit);
        }
    }

    /// Removes a candidate digit from a cell.
    ///
    /// Returns `true` if the candidate was present.
    #[inline]
    pub fn eliminate(&mut self, idx: usize, digit: u8) -> bool {
        let present = self.candidates[idx].contains(digit);
        if present {
            self.candidates[idx].remove(digit);
        }
        present
    }

    /// Restricts a cell to the given candidates.
    ///
    /// Returns `true` if any candidate was removed.
    #[inline]
    pub fn restrict(&mut self, idx: usize, allowed: DigitSet) -> bool {
        let before = self.candidates[idx];
        let after = before & allowed;
        self.candidates[idx] = after;
        before != after
    }

    /// Checks the state for contradictions.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError`] if an empty cell has no candidates or an
    /// unplaced digit has no remaining position in some house.
    pub fn check_consistency(&self) -> Result<(), SolverError> {
        for idx in 0..self.nn() {
            if self.values[idx] == 0 && self.candidates[idx].is_empty() {
                return Err(SolverError::EmptyCandidates { cell: idx });
            }
        }
        for house in 0..self.topo.house_count() {
            let placed = self.house_placed_digits(house);
            for digit in placed.complement(self.n()) {
                if self.house_candidate_mask(house, digit) == 0 {
                    return Err(SolverError::DigitWithoutPlace { house, digit });
                }
            }
        }
        Ok(())
    }

    /// Digits already placed somewhere in a house.
    #[must_use]
    pub fn house_placed_digits(&self, house: usize) -> DigitSet {
        let mut placed = DigitSet::EMPTY;
        for &idx in self.topo.house(house) {
            let value = self.values[usize::from(idx)];
            if value != 0 {
                #[expect(clippy::cast_possible_truncation)]
                placed.insert(value as u8);
            }
        }
        placed
    }

    /// Bitmask over house-local slots of empty cells admitting `digit`.
    ///
    /// For row houses the slot index is the column; for column houses it is
    /// the row; for box houses it is the box-local position.
    #[must_use]
    pub fn house_candidate_mask(&self, house: usize, digit: u8) -> u64 {
        let mut mask = 0u64;
        for (slot, &idx) in self.topo.house(house).iter().enumerate() {
            if self.candidates[usize::from(idx)].contains(digit) {
                mask |= 1 << slot;
            }
        }
        mask
    }

    /// Bitmask over house-local slots of empty cells.
    #[must_use]
    pub fn house_empty_mask(&self, house: usize) -> u64 {
        let mut mask = 0u64;
        for (slot, &idx) in self.topo.house(house).iter().enumerate() {
            if self.values[usize::from(idx)] == 0 {
                mask |= 1 << slot;
            }
        }
        mask
    }

    /// All cells where `digit` is a candidate.
    #[must_use]
    pub fn digit_cells(&self, digit: u8) -> CellSet {
        let mut cells = CellSet::empty(self.nn());
        for idx in 0..self.nn() {
            if self.candidates[idx].contains(digit) {
                cells.insert(idx);
            }
        }
        cells
    }

    /// `true` if two distinct cells share a row, column or box.
    #[must_use]
    #[inline]
    pub fn sees(&self, a: usize, b: usize) -> bool {
        if a == b {
            return false;
        }
        let pa = self.topo.packed(a);
        let pb = self.topo.packed(b);
        Topology::packed_row(pa) == Topology::packed_row(pb)
            || Topology::packed_col(pa) == Topology::packed_col(pb)
            || Topology::packed_box(pa) == Topology::packed_box(pb)
    }

    /// Peers of a cell as a [`CellSet`].
    #[must_use]
    pub fn peers_set(&self, idx: usize) -> CellSet {
        let mut set = CellSet::empty(self.nn());
        for &peer in self.topo.peers(idx) {
            set.insert(usize::from(peer));
        }
        set
    }

    /// Cells that are peers of every cell in `cells`.
    #[must_use]
    pub fn common_peers_of(&self, cells: &[usize]) -> CellSet {
        let mut common = match cells.first() {
            Some(&first) => self.peers_set(first),
            None => return CellSet::empty(self.nn()),
        };
        for &cell in &cells[1..] {
            common.intersect_with(&self.peers_set(cell));
        }
        for &cell in cells {
            common.remove(cell);
        }
        common
    }

    /// Empty cells with exactly two candidates.
    #[must_use]
    pub fn bivalue_cells(&self) -> Vec<usize> {
        (0..self.nn())
            .filter(|&idx| self.values[idx] == 0 && self.candidates[idx].len() == 2)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_9x9() -> CandidateState {
        CandidateState::new_empty(Topology::shared(3, 3).unwrap())
    }

    #[test]
    fn test_place_propagates_to_peers() {
        let mut state = state_9x9();
        state.place(0, 5);

        assert_eq!(state.value(0), 5);
        assert!(state.candidates(0).is_empty());
        assert!(!state.candidates(1).contains(5)); // same row
        assert!(!state.candidates(9).contains(5)); // same column
        assert!(!state.candidates(10).contains(5)); // same box
        assert!(state.candidates(80).contains(5)); // unrelated
        assert_eq!(state.unsolved_cells(), 80);
    }

    #[test]
    fn test_from_puzzle_tracks_givens() {
        let topo = Topology::shared(3, 3).unwrap();
        let mut puzzle = vec![0u16; 81];
        puzzle[0] = 1;
        puzzle[40] = 9;
        let state = CandidateState::from_puzzle(topo, &puzzle).unwrap();

        assert!(state.is_given(0));
        assert!(state.is_given(40));
        assert!(!state.is_given(1));
        assert_eq!(state.unsolved_cells(), 79);
    }

    #[test]
    fn test_house_candidate_mask_tracks_eliminations() {
        let mut state = state_9x9();
        let row0 = state.topology().row_house(0);
        assert_eq!(state.house_candidate_mask(row0, 5), 0x1ff);

        state.eliminate(3, 5);
        assert_eq!(state.house_candidate_mask(row0, 5), 0x1ff & !(1 << 3));
    }

    #[test]
    fn test_check_consistency_flags_exhausted_cell() {
        let mut state = state_9x9();
        for digit in 1..=9 {
            state.eliminate(17, digit);
        }
        assert!(matches!(
            state.check_consistency(),
            Err(SolverError::EmptyCandidates { cell: 17 })
        ));
    }

    #[test]
    fn test_check_consistency_flags_homeless_digit() {
        let mut state = state_9x9();
        let row0 = state.topology().row_house(0);
        for idx in 0..9 {
            state.eliminate(idx, 4);
        }
        assert_eq!(
            state.check_consistency(),
            Err(SolverError::DigitWithoutPlace { house: row0, digit: 4 })
        );
    }

    #[test]
    fn test_sees_relation() {
        let state = state_9x9();
        assert!(state.sees(0, 8)); // row
        assert!(state.sees(0, 72)); // column
        assert!(state.sees(0, 10)); // box
        assert!(!state.sees(0, 50));
        assert!(!state.sees(7, 7));
    }

    #[test]
    fn test_common_peers_of_pincers() {
        let state = state_9x9();
        // Cells (0,0) and (1,1) share box 0; common peers include the rest
        // of box 0 and nothing outside it except row/col crossings.
        let common = state.common_peers_of(&[0, 10]);
        assert!(common.contains(1)); // box 0
        assert!(common.contains(9)); // box 0
        assert!(!common.contains(80));
    }

    #[test]
    fn test_restrict_reports_change() {
        let mut state = state_9x9();
        let allowed = DigitSet::from_iter([1u8, 2]);
        assert!(state.restrict(30, allowed));
        assert_eq!(state.candidates(30), allowed);
        assert!(!state.restrict(30, DigitSet::full(9)));
    }
}
