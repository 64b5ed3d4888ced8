//! Grid text codec.
//!
//! Two forms are used depending on board size:
//!
//! - `n <= 9`: `nn` concatenated decimal digits, `0` for an empty cell.
//!   `.` and `_` are also accepted as empty on input, and whitespace is
//!   ignored, so hand-written test layouts stay readable.
//! - `n > 9`: `nn` dot-separated decimal tokens using `1..=n`, `0` for an
//!   empty cell.

use std::fmt::Write as _;

use crate::GridParseError;

/// Formats a grid as its canonical text form for board size `n`.
#[must_use]
pub fn format_grid(values: &[u16], n: u8) -> String {
    if n <= 9 {
        let mut out = String::with_capacity(values.len());
        for &value in values {
            #[expect(clippy::cast_possible_truncation)]
            out.push(char::from(b'0' + value as u8));
        }
        out
    } else {
        let mut out = String::with_capacity(values.len() * 3);
        for (i, &value) in values.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            let _ = write!(out, "{value}");
        }
        out
    }
}

/// Parses a grid from its text form for board size `n`.
///
/// # Errors
///
/// Returns [`GridParseError`] when the cell count does not match `n * n` or a
/// token is not a digit in `0..=n`.
pub fn parse_grid(text: &str, n: u8) -> Result<Vec<u16>, GridParseError> {
    let nn = usize::from(n) * usize::from(n);
    let mut values = Vec::with_capacity(nn);

    if n <= 9 {
        for ch in text.chars() {
            if ch.is_whitespace() {
                continue;
            }
            let value = match ch {
                '.' | '_' => 0,
                '0'..='9' => u16::from(ch as u8 - b'0'),
                _ => {
                    return Err(GridParseError::InvalidToken {
                        token: ch.to_string(),
                        n,
                    });
                }
            };
            if value > u16::from(n) {
                return Err(GridParseError::InvalidToken {
                    token: ch.to_string(),
                    n,
                });
            }
            values.push(value);
        }
    } else {
        for token in text.split('.') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let value: u16 = token.parse().map_err(|_| GridParseError::InvalidToken {
                token: token.to_owned(),
                n,
            })?;
            if value > u16::from(n) {
                return Err(GridParseError::InvalidToken {
                    token: token.to_owned(),
                    n,
                });
            }
            values.push(value);
        }
    }

    if values.len() != nn {
        return Err(GridParseError::CellCount {
            expected: nn,
            actual: values.len(),
        });
    }
    Ok(values)
}
