use derive_more::{Display, Error};

/// Errors raised while applying solving logic to a grid.
///
/// Both variants report a contradiction: the grid state cannot be completed.
/// Callers that classify puzzles (rather than solve them) absorb these into a
/// `contradiction` outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum SolverError {
    /// An empty cell has no remaining candidates.
    #[display("cell {cell} has no remaining candidates")]
    EmptyCandidates {
        /// Flat index of the exhausted cell.
        cell: usize,
    },
    /// An unplaced digit has no remaining position in a house.
    #[display("digit {digit} has no remaining position in house {house}")]
    DigitWithoutPlace {
        /// House index (rows, then columns, then boxes).
        house: usize,
        /// The homeless digit.
        digit: u8,
    },
}
