//! Bitset Dancing-Links uniqueness counter.
//!
//! Exact cover over `4 * nn` constraint columns (cell filled, row has
//! digit, column has digit, box has digit) and `n^3` rows, one per
//! `(row, col, digit)`. Row-to-column incidence is four `u16` entries per
//! row; column-to-row incidence is one bitset block per column. The search
//! keeps bitsets of still-selectable rows and still-uncovered columns,
//! with value-snapshot undo stacks rolled back strictly LIFO to markers
//! captured at every choice point.

use omnidoku_core::{SearchAbortControl, Topology};

/// Counts solutions of a puzzle up to a limit.
///
/// The workspace is rebuilt lazily when the topology changes and reused
/// across calls; per-depth scratch rows keep branch iteration stable across
/// rollbacks.
#[derive(Debug, Default)]
pub struct UniquenessCounter {
    n: usize,
    nn: usize,
    rows: usize,
    cols: usize,
    row_words: usize,
    col_words: usize,
    max_depth: usize,
    row_cols: Vec<[u16; 4]>,
    col_rows_bits: Vec<u64>,
    active_rows: Vec<u64>,
    uncovered_cols: Vec<u64>,
    undo_active: Vec<(u16, u64)>,
    undo_cols: Vec<(u16, u64)>,
    recursion_stack: Vec<u64>,
}

fn row_id_for(n: usize, row: usize, col: usize, digit0: usize) -> usize {
    (row * n + col) * n + digit0
}

impl UniquenessCounter {
    /// Creates an empty counter; the workspace is sized on first use.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(&self, topo: &Topology) -> bool {
        self.n == usize::from(topo.n()) && self.nn == topo.nn()
    }

    fn build_if_needed(&mut self, topo: &Topology) {
        if self.matches(topo) {
            return;
        }
        let n = usize::from(topo.n());
        let nn = topo.nn();
        self.n = n;
        self.nn = nn;
        self.rows = n * n * n;
        self.cols = 4 * nn;
        self.row_words = self.rows.div_ceil(64);
        self.col_words = self.cols.div_ceil(64);
        self.max_depth = nn + 1;

        self.row_cols = vec![[0u16; 4]; self.rows];
        self.col_rows_bits = vec![0u64; self.cols * self.row_words];
        self.active_rows = vec![0u64; self.row_words];
        self.uncovered_cols = vec![0u64; self.col_words];
        self.undo_active = Vec::with_capacity(self.row_words * 16);
        self.undo_cols = Vec::with_capacity(self.col_words * 16);
        self.recursion_stack = vec![0u64; self.max_depth * self.row_words];

        for row in 0..n {
            for col in 0..n {
                let box_idx = topo.box_of(row * n + col);
                for digit0 in 0..n {
                    let row_id = row_id_for(n, row, col, digit0);
                    let cols4 = [
                        row * n + col,
                        nn + row * n + digit0,
                        2 * nn + col * n + digit0,
                        3 * nn + box_idx * n + digit0,
                    ];
                    #[expect(clippy::cast_possible_truncation)]
                    {
                        self.row_cols[row_id] =
                            [cols4[0] as u16, cols4[1] as u16, cols4[2] as u16, cols4[3] as u16];
                    }
                    let word = row_id >> 6;
                    let bit = 1u64 << (row_id & 63);
                    for &constraint in &cols4 {
                        self.col_rows_bits[constraint * self.row_words + word] |= bit;
                    }
                }
            }
        }
    }

    fn rollback_to(&mut self, active_marker: usize, col_marker: usize) {
        while self.undo_active.len() > active_marker {
            let Some((word, old)) = self.undo_active.pop() else {
                break;
            };
            self.active_rows[usize::from(word)] = old;
        }
        while self.undo_cols.len() > col_marker {
            let Some((word, old)) = self.undo_cols.pop() else {
                break;
            };
            self.uncovered_cols[usize::from(word)] = old;
        }
    }

    /// Covers a row's four columns and deactivates every conflicting row.
    ///
    /// Returns `false` when the row is inactive or touches an already
    /// covered column; the caller rolls back to its markers.
    fn apply_row(&mut self, row_id: usize) -> bool {
        let word = row_id >> 6;
        let bit = 1u64 << (row_id & 63);
        if self.active_rows[word] & bit == 0 {
            return false;
        }

        let cols4 = self.row_cols[row_id];
        for &col in &cols4 {
            let col = usize::from(col);
            if self.uncovered_cols[col >> 6] & (1u64 << (col & 63)) == 0 {
                return false;
            }
        }

        for &col in &cols4 {
            let col = usize::from(col);
            let col_word = col >> 6;
            let col_bit = 1u64 << (col & 63);
            let old_word = self.uncovered_cols[col_word];
            let new_word = old_word & !col_bit;
            if new_word != old_word {
                #[expect(clippy::cast_possible_truncation)]
                self.undo_cols.push((col_word as u16, old_word));
                self.uncovered_cols[col_word] = new_word;
            }

            let base = col * self.row_words;
            for w in 0..self.row_words {
                let old = self.active_rows[w];
                let new = old & !self.col_rows_bits[base + w];
                if new != old {
                    #[expect(clippy::cast_possible_truncation)]
                    self.undo_active.push((w as u16, old));
                    self.active_rows[w] = new;
                }
            }
        }
        true
    }

    /// Recursive search; returns `true` once the count reaches the limit.
    fn search(
        &mut self,
        out_count: &mut i32,
        limit: i32,
        budget: &mut SearchAbortControl,
        depth: usize,
    ) -> bool {
        if !budget.step() {
            return false;
        }

        if self.uncovered_cols.iter().all(|&word| word == 0) {
            *out_count += 1;
            return *out_count >= limit;
        }
        if depth >= self.max_depth {
            return false;
        }

        // Select the uncovered column with the fewest active rows, lowest
        // id on ties; stash its restricted row set in the per-depth scratch
        // so iteration stays stable across rollbacks.
        let scratch_base = depth * self.row_words;
        let mut best_col = usize::MAX;
        let mut best_count = u32::MAX;
        'select: for col_word in 0..self.col_words {
            let mut word = self.uncovered_cols[col_word];
            while word != 0 {
                let col = (col_word << 6) + word.trailing_zeros() as usize;
                word &= word - 1;
                if col >= self.cols {
                    continue;
                }
                let base = col * self.row_words;
                let mut count = 0u32;
                for w in 0..self.row_words {
                    count += (self.active_rows[w] & self.col_rows_bits[base + w]).count_ones();
                }
                if count == 0 {
                    return false;
                }
                if count < best_count {
                    best_count = count;
                    best_col = col;
                    for w in 0..self.row_words {
                        self.recursion_stack[scratch_base + w] =
                            self.active_rows[w] & self.col_rows_bits[base + w];
                    }
                    if count == 1 {
                        break 'select;
                    }
                }
            }
        }
        if best_col == usize::MAX {
            return false;
        }

        for w in 0..self.row_words {
            let mut rows_word = self.recursion_stack[scratch_base + w];
            while rows_word != 0 {
                let row_id = (w << 6) + rows_word.trailing_zeros() as usize;
                rows_word &= rows_word - 1;
                if row_id >= self.rows {
                    continue;
                }

                let active_marker = self.undo_active.len();
                let col_marker = self.undo_cols.len();
                if !self.apply_row(row_id) {
                    self.rollback_to(active_marker, col_marker);
                    continue;
                }
                if self.search(out_count, limit, budget, depth + 1) {
                    return true;
                }
                self.rollback_to(active_marker, col_marker);
                if budget.aborted() {
                    return false;
                }
            }
        }
        false
    }

    /// Counts solutions of `puzzle` up to `limit`.
    ///
    /// Returns `-1` when the budget aborts the search, `0` when the puzzle
    /// is unsolvable, the exact count when it is at most `limit`, and
    /// `limit` otherwise.
    pub fn count_solutions_limit(
        &mut self,
        puzzle: &[u16],
        topo: &Topology,
        limit: i32,
        budget: &mut SearchAbortControl,
    ) -> i32 {
        if limit <= 0 || puzzle.len() != topo.nn() {
            return 0;
        }
        self.build_if_needed(topo);

        self.active_rows.fill(u64::MAX);
        let valid_row_bits = self.rows & 63;
        if valid_row_bits != 0 {
            self.active_rows[self.row_words - 1] = (1u64 << valid_row_bits) - 1;
        }
        self.uncovered_cols.fill(u64::MAX);
        let valid_col_bits = self.cols & 63;
        if valid_col_bits != 0 {
            self.uncovered_cols[self.col_words - 1] = (1u64 << valid_col_bits) - 1;
        }
        self.undo_active.clear();
        self.undo_cols.clear();

        for (idx, &value) in puzzle.iter().enumerate() {
            if value == 0 {
                continue;
            }
            if value > u16::from(topo.n()) {
                return 0;
            }
            let packed = topo.packed(idx);
            let row_id = row_id_for(
                self.n,
                Topology::packed_row(packed),
                Topology::packed_col(packed),
                usize::from(value) - 1,
            );
            let active_marker = self.undo_active.len();
            let col_marker = self.undo_cols.len();
            if !self.apply_row(row_id) {
                self.rollback_to(active_marker, col_marker);
                return 0;
            }
        }

        let mut out_count = 0;
        let finished = self.search(&mut out_count, limit, budget, 0);
        if budget.aborted() && !finished {
            return -1;
        }
        out_count
    }

    /// Counts solutions up to two: the uniqueness check.
    pub fn count_solutions_limit2(
        &mut self,
        puzzle: &[u16],
        topo: &Topology,
        budget: &mut SearchAbortControl,
    ) -> i32 {
        self.count_solutions_limit(puzzle, topo, 2, budget)
    }
}

#[cfg(test)]
mod tests {
    use omnidoku_core::parse_grid;

    use super::*;

    fn count(puzzle_text: &str, box_rows: u8, box_cols: u8, limit: i32) -> i32 {
        let topo = Topology::shared(box_rows, box_cols).unwrap();
        let puzzle = parse_grid(puzzle_text, topo.n()).unwrap();
        let mut counter = UniquenessCounter::new();
        let mut budget = SearchAbortControl::new();
        counter.count_solutions_limit(&puzzle, &topo, limit, &mut budget)
    }

    const UNIQUE_9X9: &str = "
        530 070 000
        600 195 000
        098 000 060
        800 060 003
        400 803 001
        700 020 006
        060 000 280
        000 419 005
        000 080 079
    ";

    #[test]
    fn test_unique_puzzle_counts_one() {
        assert_eq!(count(UNIQUE_9X9, 3, 3, 2), 1);
    }

    #[test]
    fn test_empty_grid_hits_limit() {
        let empty = "0".repeat(81);
        assert_eq!(count(&empty, 3, 3, 2), 2);
    }

    #[test]
    fn test_unsolvable_counts_zero() {
        // Duplicate 5 in row 0 conflicts at apply time.
        let mut text = "0".repeat(81);
        text.replace_range(0..1, "5");
        text.replace_range(3..4, "5");
        assert_eq!(count(&text, 3, 3, 2), 0);
    }

    #[test]
    fn test_solved_grid_counts_one() {
        let solved = "
            534 678 912
            672 195 348
            198 342 567
            859 761 423
            426 853 791
            713 924 856
            961 537 284
            287 419 635
            345 286 179
        ";
        assert_eq!(count(solved, 3, 3, 2), 1);
    }

    #[test]
    fn test_asymmetric_geometry() {
        // A full valid 6x6 grid with 2x3 boxes has exactly one solution.
        let solved = "
            123 456
            456 123
            231 564
            564 231
            312 645
            645 312
        ";
        assert_eq!(count(solved, 2, 3, 2), 1);
    }

    #[test]
    fn test_budget_abort_returns_minus_one() {
        let topo = Topology::shared(3, 3).unwrap();
        let puzzle = vec![0u16; 81];
        let mut counter = UniquenessCounter::new();
        let mut budget = SearchAbortControl::new().with_node_limit(3);
        assert_eq!(
            counter.count_solutions_limit(&puzzle, &topo, 2, &mut budget),
            -1
        );
    }

    #[test]
    fn test_matches_brute_force_on_small_board() {
        // 4x4 puzzle with two clues: compare against a simple backtracking
        // count bounded at 8.
        let topo = Topology::shared(2, 2).unwrap();
        let puzzle: Vec<u16> = vec![1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2];

        fn brute(values: &mut Vec<u16>, topo: &Topology, limit: usize) -> usize {
            let Some(idx) = values.iter().position(|&v| v == 0) else {
                return 1;
            };
            let mut total = 0;
            for digit in 1..=4u16 {
                let conflict = topo.peers(idx).iter().any(|&peer| {
                    values[usize::from(peer)] == digit
                });
                if conflict {
                    continue;
                }
                values[idx] = digit;
                total += brute(values, topo, limit - total);
                values[idx] = 0;
                if total >= limit {
                    break;
                }
            }
            total.min(limit)
        }

        let mut scratch = puzzle.clone();
        let expected = brute(&mut scratch, &topo, 8);
        let mut counter = UniquenessCounter::new();
        let mut budget = SearchAbortControl::new();
        #[expect(clippy::cast_possible_wrap)]
        let expected_i32 = expected as i32;
        assert_eq!(
            counter.count_solutions_limit(&puzzle, &topo, 8, &mut budget),
            expected_i32
        );
    }
}
