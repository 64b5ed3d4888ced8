use std::sync::Arc;

use crate::{DigitSet, PuzzleError, Topology};

/// Mutable game state over a [`Topology`].
///
/// The board tracks per-cell values (`0` = empty), per-house "digits used"
/// bitmasks for rows, columns and boxes, and the number of empty cells. The
/// used masks are kept in lock-step with the values: a digit bit is set in
/// the three house masks of a cell exactly when that cell holds the digit.
///
/// State is mutated only through [`Board::place`] and [`Board::unplace`]
/// (or bulk-loaded through [`Board::init_from_puzzle`]), which preserve the
/// mask invariants at every method boundary.
#[derive(Debug, Clone)]
pub struct Board {
    topo: Arc<Topology>,
    values: Vec<u16>,
    row_used: Vec<u64>,
    col_used: Vec<u64>,
    box_used: Vec<u64>,
    empty_cells: usize,
}

impl Board {
    /// Creates an empty board over the given topology.
    #[must_use]
    pub fn new(topo: Arc<Topology>) -> Self {
        let n = usize::from(topo.n());
        let nn = topo.nn();
        Self {
            topo,
            values: vec![0; nn],
            row_used: vec![0; n],
            col_used: vec![0; n],
            box_used: vec![0; n],
            empty_cells: nn,
        }
    }

    /// Clears the board back to all-empty without reallocating.
    pub fn reset(&mut self) {
        self.values.fill(0);
        self.row_used.fill(0);
        self.col_used.fill(0);
        self.box_used.fill(0);
        self.empty_cells = self.topo.nn();
    }

    /// Returns the board's topology.
    #[must_use]
    #[inline]
    pub fn topology(&self) -> &Arc<Topology> {
        &self.topo
    }

    /// Returns the value at a cell (`0` = empty).
    #[must_use]
    #[inline]
    pub fn value(&self, idx: usize) -> u16 {
        self.values[idx]
    }

    /// Returns the flat value array.
    #[must_use]
    #[inline]
    pub fn values(&self) -> &[u16] {
        &self.values
    }

    /// Returns the number of empty cells.
    #[must_use]
    #[inline]
    pub fn empty_cells(&self) -> usize {
        self.empty_cells
    }

    /// Returns `true` if every cell holds a digit.
    #[must_use]
    #[inline]
    pub fn is_full(&self) -> bool {
        self.empty_cells == 0
    }

    /// Returns the "digits used" mask of a row.
    #[must_use]
    #[inline]
    pub fn row_used(&self, row: usize) -> u64 {
        self.row_used[row]
    }

    /// Returns the "digits used" mask of a column.
    #[must_use]
    #[inline]
    pub fn col_used(&self, col: usize) -> u64 {
        self.col_used[col]
    }

    /// Returns the "digits used" mask of a box.
    #[must_use]
    #[inline]
    pub fn box_used(&self, box_idx: usize) -> u64 {
        self.box_used[box_idx]
    }

    /// Returns the union of the three house-used masks of a cell.
    #[must_use]
    #[inline]
    pub fn used_mask(&self, idx: usize) -> u64 {
        let packed = self.topo.packed(idx);
        self.row_used[Topology::packed_row(packed)]
            | self.col_used[Topology::packed_col(packed)]
            | self.box_used[Topology::packed_box(packed)]
    }

    /// Returns the candidate digits of a cell.
    ///
    /// Empty for filled cells; otherwise the digits not yet used in the
    /// cell's row, column or box.
    #[must_use]
    #[inline]
    pub fn candidate_mask_for_idx(&self, idx: usize) -> DigitSet {
        if self.values[idx] != 0 {
            return DigitSet::EMPTY;
        }
        DigitSet::from_bits(!self.used_mask(idx) & self.topo.full_mask())
    }

    /// Places a digit into an empty cell.
    ///
    /// The caller must ensure `digit` is a candidate of the cell; this is
    /// checked only by debug assertion on the hot path.
    #[inline]
    pub fn place(&mut self, idx: usize, digit: u8) {
        debug_assert_eq!(self.values[idx], 0);
        debug_assert!(self.candidate_mask_for_idx(idx).contains(digit));
        let bit = 1u64 << (digit - 1);
        let packed = self.topo.packed(idx);
        self.values[idx] = u16::from(digit);
        self.row_used[Topology::packed_row(packed)] |= bit;
        self.col_used[Topology::packed_col(packed)] |= bit;
        self.box_used[Topology::packed_box(packed)] |= bit;
        self.empty_cells -= 1;
    }

    /// Reverses a [`Board::place`] of `digit` at `idx`.
    #[inline]
    pub fn unplace(&mut self, idx: usize, digit: u8) {
        debug_assert_eq!(self.values[idx], u16::from(digit));
        let bit = 1u64 << (digit - 1);
        let packed = self.topo.packed(idx);
        self.values[idx] = 0;
        self.row_used[Topology::packed_row(packed)] &= !bit;
        self.col_used[Topology::packed_col(packed)] &= !bit;
        self.box_used[Topology::packed_box(packed)] &= !bit;
        self.empty_cells += 1;
    }

    /// Loads a puzzle by bulk-placing every nonzero cell.
    ///
    /// The board is reset first; on error it is left reset.
    ///
    /// # Errors
    ///
    /// Returns [`PuzzleError`] on a length mismatch, an out-of-range digit,
    /// or a clue conflicting with an earlier placement.
    pub fn init_from_puzzle(&mut self, puzzle: &[u16]) -> Result<(), PuzzleError> {
        self.reset();
        if puzzle.len() != self.topo.nn() {
            return Err(PuzzleError::LengthMismatch {
                expected: self.topo.nn(),
                actual: puzzle.len(),
            });
        }
        for (idx, &value) in puzzle.iter().enumerate() {
            if value == 0 {
                continue;
            }
            if value > u16::from(self.topo.n()) {
                let n = self.topo.n();
                self.reset();
                return Err(PuzzleError::DigitOutOfRange {
                    idx,
                    digit: value,
                    n,
                });
            }
            #[expect(clippy::cast_possible_truncation)]
            let digit = value as u8;
            if !self.candidate_mask_for_idx(idx).contains(digit) {
                self.reset();
                return Err(PuzzleError::ConflictingClue { idx, digit: value });
            }
            self.place(idx, digit);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_3x3() -> Board {
        Board::new(Topology::shared(3, 3).unwrap())
    }

    #[test]
    fn test_place_updates_masks_and_count() {
        let mut board = board_3x3();
        assert_eq!(board.empty_cells(), 81);

        board.place(0, 5);
        assert_eq!(board.value(0), 5);
        assert_eq!(board.empty_cells(), 80);
        assert_eq!(board.row_used(0), 1 << 4);
        assert_eq!(board.col_used(0), 1 << 4);
        assert_eq!(board.box_used(0), 1 << 4);
    }

    #[test]
    fn test_unplace_restores_state() {
        let mut board = board_3x3();
        board.place(40, 7);
        board.unplace(40, 7);

        assert_eq!(board.value(40), 0);
        assert_eq!(board.empty_cells(), 81);
        assert_eq!(board.row_used(4), 0);
        assert_eq!(board.col_used(4), 0);
        assert_eq!(board.box_used(4), 0);
    }

    #[test]
    fn test_candidates_exclude_peer_digits() {
        let mut board = board_3x3();
        board.place(0, 1); // row 0, col 0, box 0
        board.place(9, 2); // row 1, col 0, box 0

        // Cell (0, 1) shares row 0 and box 0.
        let candidates = board.candidate_mask_for_idx(1);
        assert!(!candidates.contains(1));
        assert!(!candidates.contains(2));
        assert!(candidates.contains(3));

        // Cell (8, 8) shares nothing with the placements.
        assert_eq!(board.candidate_mask_for_idx(80).len(), 9);
    }

    #[test]
    fn test_candidates_empty_for_filled_cell() {
        let mut board = board_3x3();
        board.place(0, 1);
        assert!(board.candidate_mask_for_idx(0).is_empty());
    }

    #[test]
    fn test_init_from_puzzle_accepts_valid_clues() {
        let mut board = board_3x3();
        let mut puzzle = vec![0u16; 81];
        puzzle[0] = 5;
        puzzle[80] = 5;
        board.init_from_puzzle(&puzzle).unwrap();
        assert_eq!(board.value(0), 5);
        assert_eq!(board.value(80), 5);
        assert_eq!(board.empty_cells(), 79);
    }

    #[test]
    fn test_init_from_puzzle_rejects_conflicts() {
        let mut board = board_3x3();
        let mut puzzle = vec![0u16; 81];
        puzzle[0] = 5;
        puzzle[1] = 5; // same row
        let err = board.init_from_puzzle(&puzzle).unwrap_err();
        assert_eq!(err, PuzzleError::ConflictingClue { idx: 1, digit: 5 });
        assert_eq!(board.empty_cells(), 81);
    }

    #[test]
    fn test_init_from_puzzle_rejects_bad_digit() {
        let mut board = board_3x3();
        let mut puzzle = vec![0u16; 81];
        puzzle[3] = 10;
        assert!(matches!(
            board.init_from_puzzle(&puzzle),
            Err(PuzzleError::DigitOutOfRange { idx: 3, digit: 10, n: 9 })
        ));
    }

    #[test]
    fn test_init_from_puzzle_rejects_length_mismatch() {
        let mut board = board_3x3();
        assert!(matches!(
            board.init_from_puzzle(&[0u16; 80]),
            Err(PuzzleError::LengthMismatch { expected: 81, actual: 80 })
        ));
    }
}
