use derive_more::{Display, Error};

/// Errors raised when building a board topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum GeometryError {
    /// One of the box dimensions is zero.
    #[display("box dimensions must be positive: {box_rows}x{box_cols}")]
    ZeroDimension {
        /// Requested box height.
        box_rows: u8,
        /// Requested box width.
        box_cols: u8,
    },
    /// The board size `n = box_rows * box_cols` falls outside `[4, 64]`.
    #[display("board size n={n} is outside the supported range [4, 64]")]
    SizeOutOfRange {
        /// Computed board size.
        n: u16,
    },
}

/// Errors raised when loading a puzzle onto a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum PuzzleError {
    /// The puzzle has the wrong number of cells for the topology.
    #[display("puzzle has {actual} cells, expected {expected}")]
    LengthMismatch {
        /// Cell count required by the topology.
        expected: usize,
        /// Cell count of the supplied puzzle.
        actual: usize,
    },
    /// A clue digit is outside `1..=n`.
    #[display("digit {digit} at cell {idx} is outside 1..={n}")]
    DigitOutOfRange {
        /// Flat cell index of the offending clue.
        idx: usize,
        /// The offending digit.
        digit: u16,
        /// Board size.
        n: u8,
    },
    /// A clue conflicts with an earlier clue in the same house.
    #[display("digit {digit} at cell {idx} conflicts with an earlier clue")]
    ConflictingClue {
        /// Flat cell index of the offending clue.
        idx: usize,
        /// The offending digit.
        digit: u16,
    },
}

/// Errors raised when parsing a grid from its text form.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum GridParseError {
    /// The text does not contain exactly `nn` cell tokens.
    #[display("expected {expected} cells, found {actual}")]
    CellCount {
        /// Cell count required by the geometry.
        expected: usize,
        /// Cell count found in the text.
        actual: usize,
    },
    /// A token is not a digit in `0..=n`.
    #[display("invalid cell token `{token}` for board size n={n}")]
    InvalidToken {
        /// The offending token.
        token: String,
        /// Board size.
        n: u8,
    },
}
