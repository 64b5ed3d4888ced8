//! Output line serialization.
//!
//! One accepted puzzle per line, fixed field order:
//!
//! ```text
//! seed=<u64>;box=<rows>x<cols>;clues=<n>;puzzle=<grid>;solution=<grid>;difficulty=<1..9>;strategy=<token>
//! ```
//!
//! Grids use the canonical text codec: concatenated digits for `n <= 9`,
//! dot-separated tokens for larger boards. Unknown trailing `;key=value`
//! fields are ignored on input.

use derive_more::{Display, Error};
use omnidoku_core::{GridParseError, format_grid, parse_grid};

/// Serializes one accepted puzzle as its output line (no newline).
#[must_use]
pub fn serialize_line(
    seed: u64,
    box_rows: u8,
    box_cols: u8,
    clues: usize,
    puzzle: &[u16],
    solution: &[u16],
    difficulty: u8,
    strategy: &str,
) -> String {
    let n = box_rows * box_cols;
    format!(
        "seed={seed};box={box_rows}x{box_cols};clues={clues};puzzle={};solution={};difficulty={difficulty};strategy={strategy}",
        format_grid(puzzle, n),
        format_grid(solution, n),
    )
}

/// A parsed output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// Seed recorded for the puzzle.
    pub seed: u64,
    /// Box height.
    pub box_rows: u8,
    /// Box width.
    pub box_cols: u8,
    /// Clue count.
    pub clues: usize,
    /// The puzzle grid.
    pub puzzle: Vec<u16>,
    /// The solution grid.
    pub solution: Vec<u16>,
    /// Difficulty level.
    pub difficulty: u8,
    /// Hardest-strategy token.
    pub strategy: String,
}

/// Errors raised when parsing an output line.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum LineParseError {
    /// A required field is missing.
    #[display("missing field `{field}`")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },
    /// A field value does not parse.
    #[display("invalid value for `{field}`: {value}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// The offending value.
        value: String,
    },
    /// A grid field does not parse.
    #[display("invalid grid: {_0}")]
    Grid(GridParseError),
}

fn field<'a>(pairs: &[(&'a str, &'a str)], name: &'static str) -> Result<&'a str, LineParseError> {
    pairs
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| *value)
        .ok_or(LineParseError::MissingField { field: name })
}

fn parse_number<T>(pairs: &[(&str, &str)], name: &'static str) -> Result<T, LineParseError>
where
    T: std::str::FromStr,
{
    let raw = field(pairs, name)?;
    raw.parse().map_err(|_| LineParseError::InvalidField {
        field: name,
        value: raw.to_owned(),
    })
}

/// Parses one output line; unknown fields are ignored.
///
/// # Errors
///
/// Returns [`LineParseError`] when a required field is missing or invalid.
pub fn parse_line(line: &str) -> Result<ParsedLine, LineParseError> {
    let pairs: Vec<(&str, &str)> = line
        .trim_end()
        .split(';')
        .filter_map(|part| part.split_once('='))
        .collect();

    let seed = parse_number(&pairs, "seed")?;
    let box_raw = field(&pairs, "box")?;
    let (box_rows, box_cols) = box_raw
        .split_once('x')
        .and_then(|(rows, cols)| Some((rows.parse().ok()?, cols.parse().ok()?)))
        .ok_or_else(|| LineParseError::InvalidField {
            field: "box",
            value: box_raw.to_owned(),
        })?;
    let clues = parse_number(&pairs, "clues")?;
    let n = box_rows * box_cols;
    let puzzle = parse_grid(field(&pairs, "puzzle")?, n).map_err(LineParseError::Grid)?;
    let solution = parse_grid(field(&pairs, "solution")?, n).map_err(LineParseError::Grid)?;
    let difficulty = parse_number(&pairs, "difficulty")?;
    let strategy = field(&pairs, "strategy")?.to_owned();

    Ok(ParsedLine {
        seed,
        box_rows,
        box_cols,
        clues,
        puzzle,
        solution,
        difficulty,
        strategy,
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_roundtrip_classic_board() {
        let mut puzzle = vec![0u16; 81];
        puzzle[0] = 5;
        let mut solution = vec![1u16; 81];
        solution[80] = 9;
        let line = serialize_line(42, 3, 3, 30, &puzzle, &solution, 3, "xwing");
        let parsed = parse_line(&line).unwrap();

        assert_eq!(parsed.seed, 42);
        assert_eq!((parsed.box_rows, parsed.box_cols), (3, 3));
        assert_eq!(parsed.clues, 30);
        assert_eq!(parsed.puzzle, puzzle);
        assert_eq!(parsed.solution, solution);
        assert_eq!(parsed.difficulty, 3);
        assert_eq!(parsed.strategy, "xwing");
    }

    #[test]
    fn test_roundtrip_large_board_uses_tokens() {
        let puzzle = vec![0u16; 144];
        let solution = vec![12u16; 144];
        let line = serialize_line(7, 3, 4, 100, &puzzle, &solution, 1, "none");
        assert!(line.contains("box=3x4"));
        let parsed = parse_line(&line).unwrap();
        assert_eq!(parsed.solution[0], 12);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let puzzle = vec![0u16; 16];
        let solution = vec![1u16; 16];
        let mut line = serialize_line(1, 2, 2, 8, &puzzle, &solution, 1, "nakedsingle");
        line.push_str(";vendor=extra;note=ok");
        let parsed = parse_line(&line).unwrap();
        assert_eq!(parsed.strategy, "nakedsingle");
    }

    #[test]
    fn test_missing_field_is_an_error() {
        assert!(matches!(
            parse_line("seed=1;box=3x3"),
            Err(LineParseError::MissingField { field: "clues" })
        ));
    }

    #[test]
    fn test_bad_box_is_an_error() {
        assert!(matches!(
            parse_line("seed=1;box=9;clues=1;puzzle=0;solution=0;difficulty=1;strategy=none"),
            Err(LineParseError::InvalidField { field: "box", .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_roundtrip(seed: u64, clues in 0usize..=81, difficulty in 1u8..=9) {
            let mut state = seed;
            let grid: Vec<u16> = (0..81)
                .map(|_| {
                    state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
                    #[expect(clippy::cast_possible_truncation)]
                    let value = (state >> 33) as u16 % 10;
                    value
                })
                .collect();
            let line = serialize_line(seed, 3, 3, clues, &grid, &grid, difficulty, "aic");
            let parsed = parse_line(&line).unwrap();
            prop_assert_eq!(parsed.puzzle, grid.clone());
            prop_assert_eq!(parsed.solution, grid);
            prop_assert_eq!(parsed.seed, seed);
        }
    }
}
