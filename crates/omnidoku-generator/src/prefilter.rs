//! Quick validity prefilter for dug puzzles.

use omnidoku_core::Topology;

/// One-pass puzzle validity check: no duplicate digit in any house, clue
/// count within bounds, early abort once the remaining cells cannot reach
/// the minimum.
#[derive(Debug, Default)]
pub struct QuickPrefilter {
    row_used: Vec<u64>,
    col_used: Vec<u64>,
    box_used: Vec<u64>,
}

impl QuickPrefilter {
    /// Creates a prefilter with empty scratch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the puzzle passes.
    pub fn check(
        &mut self,
        puzzle: &[u16],
        topo: &Topology,
        min_clues: usize,
        max_clues: usize,
    ) -> bool {
        if puzzle.len() != topo.nn() {
            return false;
        }
        let n = usize::from(topo.n());
        self.row_used.clear();
        self.row_used.resize(n, 0);
        self.col_used.clear();
        self.col_used.resize(n, 0);
        self.box_used.clear();
        self.box_used.resize(n, 0);

        let mut clues = 0usize;
        for (idx, &value) in puzzle.iter().enumerate() {
            if value == 0 {
                let remaining = topo.nn() - idx - 1;
                if clues + remaining < min_clues {
                    return false;
                }
                continue;
            }
            if value > u16::from(topo.n()) {
                return false;
            }
            clues += 1;
            if clues > max_clues {
                return false;
            }
            let packed = topo.packed(idx);
            let bit = 1u64 << (value - 1);
            let row = Topology::packed_row(packed);
            let col = Topology::packed_col(packed);
            let box_idx = Topology::packed_box(packed);
            if self.row_used[row] & bit != 0
                || self.col_used[col] & bit != 0
                || self.box_used[box_idx] & bit != 0
            {
                return false;
            }
            self.row_used[row] |= bit;
            self.col_used[col] |= bit;
            self.box_used[box_idx] |= bit;
        }
        clues >= min_clues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_clean_puzzle() {
        let topo = Topology::shared(2, 2).unwrap();
        let mut filter = QuickPrefilter::new();
        let puzzle = vec![1, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 1];
        assert!(filter.check(&puzzle, &topo, 2, 8));
    }

    #[test]
    fn test_rejects_duplicate_in_row() {
        let topo = Topology::shared(2, 2).unwrap();
        let mut filter = QuickPrefilter::new();
        let puzzle = vec![1, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(!filter.check(&puzzle, &topo, 1, 16));
    }

    #[test]
    fn test_rejects_duplicate_in_box() {
        let topo = Topology::shared(2, 2).unwrap();
        let mut filter = QuickPrefilter::new();
        let puzzle = vec![1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(!filter.check(&puzzle, &topo, 1, 16));
    }

    #[test]
    fn test_rejects_clue_count_out_of_bounds() {
        let topo = Topology::shared(2, 2).unwrap();
        let mut filter = QuickPrefilter::new();
        let sparse = vec![1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(!filter.check(&sparse, &topo, 5, 16));

        let dense = vec![1, 2, 3, 4, 3, 4, 1, 2, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(!filter.check(&dense, &topo, 1, 4));
    }

    #[test]
    fn test_rejects_out_of_range_digit() {
        let topo = Topology::shared(2, 2).unwrap();
        let mut filter = QuickPrefilter::new();
        let puzzle = vec![5, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(!filter.check(&puzzle, &topo, 1, 16));
    }
}
