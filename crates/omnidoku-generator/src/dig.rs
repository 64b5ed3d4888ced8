//! Dig kernel: removes clues from a solved grid toward a target count.

use omnidoku_core::Topology;
use rand::{Rng, RngExt};

/// Removes clues from solved grids, optionally preserving 180-degree
/// center symmetry. No uniqueness checking happens here; that is the
/// analyzer's job.
#[derive(Debug, Default)]
pub struct DigKernel {
    order: Vec<usize>,
}

impl DigKernel {
    /// Creates a kernel with an empty permutation scratch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Digs `solved` down toward a clue count drawn uniformly from
    /// `[min_clues, max_clues]`, writing the puzzle into `out_puzzle`.
    ///
    /// Cells are visited in a random permutation. With symmetry enabled, a
    /// cell and its center partner are cleared together when that does not
    /// undershoot the target. Returns the remaining clue count.
    pub fn dig<R>(
        &mut self,
        solved: &[u16],
        topo: &Topology,
        min_clues: usize,
        max_clues: usize,
        symmetry_center: bool,
        rng: &mut R,
        out_puzzle: &mut Vec<u16>,
    ) -> usize
    where
        R: Rng,
    {
        out_puzzle.clear();
        out_puzzle.extend_from_slice(solved);
        let nn = topo.nn();
        let min_clues = min_clues.min(nn);
        let max_clues = max_clues.clamp(min_clues, nn);
        let target_clues = rng.random_range(min_clues..=max_clues);

        self.order.clear();
        self.order.extend(0..nn);
        for i in (1..nn).rev() {
            let j = rng.random_range(0..=i);
            self.order.swap(i, j);
        }

        let mut clues = nn;
        for position in 0..nn {
            if clues <= target_clues {
                break;
            }
            let idx = self.order[position];
            if out_puzzle[idx] == 0 {
                continue;
            }
            let sym = symmetry_center.then(|| topo.sym_partner(idx));
            match sym {
                Some(partner) if partner != idx && out_puzzle[partner] != 0 => {
                    if clues - 2 < target_clues {
                        continue;
                    }
                    out_puzzle[idx] = 0;
                    out_puzzle[partner] = 0;
                    clues -= 2;
                }
                _ => {
                    if clues - 1 < target_clues {
                        continue;
                    }
                    out_puzzle[idx] = 0;
                    clues -= 1;
                }
            }
        }
        clues
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;

    fn solved_4x4() -> Vec<u16> {
        vec![1, 2, 3, 4, 3, 4, 1, 2, 2, 1, 4, 3, 4, 3, 2, 1]
    }

    #[test]
    fn test_dig_reaches_target_range() {
        let topo = Topology::shared(2, 2).unwrap();
        let mut kernel = DigKernel::new();
        let mut rng = Pcg64Mcg::seed_from_u64(5);
        let mut puzzle = Vec::new();
        let clues = kernel.dig(&solved_4x4(), &topo, 6, 9, false, &mut rng, &mut puzzle);

        assert!((6..=9).contains(&clues));
        assert_eq!(puzzle.iter().filter(|&&v| v != 0).count(), clues);
        // Remaining clues agree with the solution.
        for (idx, &value) in puzzle.iter().enumerate() {
            assert!(value == 0 || value == solved_4x4()[idx]);
        }
    }

    #[test]
    fn test_fixed_clue_count() {
        let topo = Topology::shared(2, 2).unwrap();
        let mut kernel = DigKernel::new();
        let mut rng = Pcg64Mcg::seed_from_u64(6);
        let mut puzzle = Vec::new();
        let clues = kernel.dig(&solved_4x4(), &topo, 8, 8, false, &mut rng, &mut puzzle);
        assert_eq!(clues, 8);
    }

    #[test]
    fn test_symmetric_dig_preserves_center_symmetry() {
        let topo = Topology::shared(3, 3).unwrap();
        // Build any full valid 9x9 grid by cyclic shifts.
        let mut solved = vec![0u16; 81];
        for row in 0..9 {
            for col in 0..9 {
                let shift = (row % 3) * 3 + row / 3;
                #[expect(clippy::cast_possible_truncation)]
                {
                    solved[row * 9 + col] = ((col + shift) % 9 + 1) as u16;
                }
            }
        }
        let mut kernel = DigKernel::new();
        let mut rng = Pcg64Mcg::seed_from_u64(7);
        let mut puzzle = Vec::new();
        let clues = kernel.dig(&solved, &topo, 31, 41, true, &mut rng, &mut puzzle);

        assert!((31..=41).contains(&clues));
        for idx in 0..81 {
            let partner = topo.sym_partner(idx);
            assert_eq!(
                puzzle[idx] == 0,
                puzzle[partner] == 0,
                "symmetry broken at cell {idx}"
            );
        }
    }
}
