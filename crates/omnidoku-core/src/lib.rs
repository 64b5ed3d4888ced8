//! Core data model for generalized-geometry Sudoku boards.
//!
//! A board geometry is described by a rectangular box of
//! `box_rows x box_cols` cells, producing an `n x n` board with
//! `n = box_rows * box_cols` and `4 <= n <= 64`. This crate provides the
//! immutable [`Topology`] lookup structure shared by every solver and
//! generator kernel, the mutable [`Board`] game state, the digit and cell
//! bit sets used throughout, the cooperative [`SearchAbortControl`] budget
//! carried by recursive searches, and the grid text codec.

pub use self::{
    abort::{SearchAbortControl, SharedFlag},
    board::Board,
    cell_set::CellSet,
    digit_set::DigitSet,
    error::{GeometryError, GridParseError, PuzzleError},
    text::{format_grid, parse_grid},
    topology::{Topology, supported_geometries},
};

mod abort;
mod board;
mod cell_set;
mod digit_set;
mod error;
mod text;
mod topology;

/// Smallest supported board size (`n`).
pub const MIN_N: u8 = 4;

/// Largest supported board size (`n`).
pub const MAX_N: u8 = 64;
