//! Randomized solved-grid kernel: MRV backtracking with a per-thread
//! candidate cache for large boards and SIMD-dispatched scans for small
//! ones.

use omnidoku_core::{Board, SearchAbortControl, Topology};
use rand::{Rng, RngExt};

use crate::simd::{self, Backend, ScanOutcome};

/// Boards of at least this size use the incremental candidate cache; the
/// recompute path with SIMD scans wins below it.
const CACHE_MRV_MIN_N: u8 = 25;

/// Per-thread candidate cache for the large-board MRV fill.
///
/// Tracks the candidate mask and its popcount per cell, a one-bit-per-cell
/// singleton bitmap for fast naked-single discovery, and an append-only
/// undo log of `(cell, old mask, old popcount)` triples. Rollback truncates
/// the log to a caller-captured marker, strictly LIFO.
#[derive(Debug, Default)]
pub struct CandidateCache {
    prepared_nn: usize,
    candidates: Vec<u64>,
    candidate_popcnt: Vec<u8>,
    singleton_words: Vec<u64>,
    undo: Vec<(u32, u64, u8)>,
}

impl CandidateCache {
    /// Creates an empty cache; storage is sized lazily per topology.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sizes the cache for a topology and clears the undo log.
    pub fn ensure(&mut self, topo: &Topology) {
        if self.prepared_nn != topo.nn() {
            self.candidates.resize(topo.nn(), 0);
            self.candidate_popcnt.resize(topo.nn(), 0);
            self.singleton_words.resize(topo.nn().div_ceil(64), 0);
            let per_depth = (3 * usize::from(topo.n())).clamp(8, 64);
            self.undo.reserve(topo.nn() * per_depth);
            self.prepared_nn = topo.nn();
        }
        self.undo.clear();
    }

    #[inline]
    fn set(&mut self, idx: usize, mask: u64, count: u8) {
        self.candidates[idx] = mask;
        self.candidate_popcnt[idx] = count;
        let word = &mut self.singleton_words[idx >> 6];
        let bit = 1u64 << (idx & 63);
        if count == 1 {
            *word |= bit;
        } else {
            *word &= !bit;
        }
    }

    /// Rebuilds the cache from the board. Returns `false` when some empty
    /// cell already has no candidates.
    fn init_from_board(&mut self, board: &Board) -> bool {
        let topo = board.topology();
        self.singleton_words.fill(0);
        for idx in 0..topo.nn() {
            if board.value(idx) != 0 {
                self.set(idx, 0, 0);
                continue;
            }
            let mask = !board.used_mask(idx) & topo.full_mask();
            if mask == 0 {
                return false;
            }
            #[expect(clippy::cast_possible_truncation)]
            self.set(idx, mask, mask.count_ones() as u8);
        }
        self.undo.clear();
        true
    }

    /// Scans for the best cell: singleton bitmap first, then a bucketed
    /// linear pass where a cached cell's pressure is `n - popcount`.
    fn select_best_cell(&self, n: u8) -> ScanOutcome {
        for (word_idx, &word) in self.singleton_words.iter().enumerate() {
            let mut bits = word;
            while bits != 0 {
                let idx = (word_idx << 6) + bits.trailing_zeros() as usize;
                bits &= bits - 1;
                if idx >= self.prepared_nn {
                    break;
                }
                let mask = self.candidates[idx];
                if mask != 0 {
                    return ScanOutcome::Pick { idx, mask };
                }
            }
        }

        let mut best_bucket = u32::from(n) + 1;
        let mut best_idx = usize::MAX;
        let mut best_pressure = 0u32;
        let mut found = false;
        for idx in 0..self.prepared_nn {
            let count = u32::from(self.candidate_popcnt[idx]);
            if count == 0 {
                continue;
            }
            found = true;
            let pressure = u32::from(n) - count;
            if count < best_bucket || (count == best_bucket && pressure > best_pressure) {
                best_bucket = count;
                best_idx = idx;
                best_pressure = pressure;
            }
        }
        if found {
            ScanOutcome::Pick {
                idx: best_idx,
                mask: self.candidates[best_idx],
            }
        } else {
            ScanOutcome::Complete
        }
    }

    /// Places a digit and propagates the elimination to every peer,
    /// recording undo entries. Returns `false` when a peer runs out of
    /// candidates; the caller rolls back to `marker`.
    fn try_place(&mut self, board: &mut Board, idx: usize, digit: u8) -> (usize, bool) {
        let marker = self.undo.len();
        let placed_bit = 1u64 << (digit - 1);

        #[expect(clippy::cast_possible_truncation)]
        self.undo
            .push((idx as u32, self.candidates[idx], self.candidate_popcnt[idx]));
        self.set(idx, 0, 0);
        board.place(idx, digit);

        let topo = std::sync::Arc::clone(board.topology());
        for &peer in topo.peers(idx) {
            let peer = usize::from(peer);
            let old_mask = self.candidates[peer];
            if old_mask == 0 || old_mask & placed_bit == 0 {
                continue;
            }
            #[expect(clippy::cast_possible_truncation)]
            self.undo
                .push((peer as u32, old_mask, self.candidate_popcnt[peer]));
            let new_mask = old_mask & !placed_bit;
            if new_mask == 0 {
                self.set(peer, 0, 0);
                return (marker, false);
            }
            #[expect(clippy::cast_possible_truncation)]
            self.set(peer, new_mask, new_mask.count_ones() as u8);
        }
        (marker, true)
    }

    /// Rolls the cache back to a marker and unplaces the digit.
    fn rollback_place(&mut self, board: &mut Board, idx: usize, digit: u8, marker: usize) {
        while self.undo.len() > marker {
            let Some((cell, old_mask, old_count)) = self.undo.pop() else {
                break;
            };
            self.set(cell as usize, old_mask, old_count);
        }
        board.unplace(idx, digit);
    }
}

/// Extracts the digits of `mask` in a uniformly random order.
///
/// No allocation: digits land in `out` and the filled count is returned.
/// Single- and two-digit masks take shortcuts; larger masks get a full
/// Fisher-Yates shuffle.
pub(crate) fn shuffled_digits_from_mask<R>(mask: u64, rng: &mut R, out: &mut [u8; 64]) -> usize
where
    R: Rng,
{
    let mut bits = mask;
    let mut count = 0;
    while bits != 0 {
        #[expect(clippy::cast_possible_truncation)]
        {
            out[count] = bits.trailing_zeros() as u8 + 1;
        }
        bits &= bits - 1;
        count += 1;
    }
    match count {
        0 | 1 => {}
        2 => {
            if rng.random::<bool>() {
                out.swap(0, 1);
            }
        }
        _ => {
            for i in (1..count).rev() {
                let j = rng.random_range(0..=i);
                out.swap(i, j);
            }
        }
    }
    count
}

/// Generates full valid grids by randomized MRV backtracking.
#[derive(Debug, Clone, Copy)]
pub struct SolvedKernel {
    backend: Backend,
}

impl SolvedKernel {
    /// Creates a kernel with a resolved SIMD backend.
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        Self {
            backend: backend.resolve(),
        }
    }

    /// The backend the kernel scans with.
    #[must_use]
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Fills the board with a random valid completion.
    ///
    /// Returns `false` on a dead end or when the budget aborts; the board
    /// is unwound to its input state in either case.
    pub fn fill<R>(
        &self,
        board: &mut Board,
        cache: &mut CandidateCache,
        rng: &mut R,
        budget: &mut SearchAbortControl,
    ) -> bool
    where
        R: Rng,
    {
        if board.topology().n() < CACHE_MRV_MIN_N {
            return self.fill_recompute(board, rng, budget);
        }
        cache.ensure(board.topology());
        if !cache.init_from_board(board) {
            return false;
        }
        Self::fill_cached(board, cache, rng, budget)
    }

    /// Generates a fresh solved grid into `out_solution`.
    pub fn generate<R>(
        &self,
        board: &mut Board,
        cache: &mut CandidateCache,
        rng: &mut R,
        budget: &mut SearchAbortControl,
        out_solution: &mut Vec<u16>,
    ) -> bool
    where
        R: Rng,
    {
        board.reset();
        if !self.fill(board, cache, rng, budget) {
            return false;
        }
        out_solution.clear();
        out_solution.extend_from_slice(board.values());
        true
    }

    fn fill_recompute<R>(
        &self,
        board: &mut Board,
        rng: &mut R,
        budget: &mut SearchAbortControl,
    ) -> bool
    where
        R: Rng,
    {
        if !budget.step() {
            return false;
        }
        let (idx, mask) = match simd::select_best_cell(board, self.backend) {
            ScanOutcome::Complete => return true,
            ScanOutcome::DeadEnd => return false,
            ScanOutcome::Pick { idx, mask } => (idx, mask),
        };

        let mut digits = [0u8; 64];
        let count = shuffled_digits_from_mask(mask, rng, &mut digits);
        for &digit in &digits[..count] {
            board.place(idx, digit);
            if self.fill_recompute(board, rng, budget) {
                return true;
            }
            board.unplace(idx, digit);
            if budget.aborted() {
                return false;
            }
        }
        false
    }

    fn fill_cached<R>(
        board: &mut Board,
        cache: &mut CandidateCache,
        rng: &mut R,
        budget: &mut SearchAbortControl,
    ) -> bool
    where
        R: Rng,
    {
        if !budget.step() {
            return false;
        }
        let (idx, mask) = match cache.select_best_cell(board.topology().n()) {
            ScanOutcome::Complete => return true,
            ScanOutcome::DeadEnd => return false,
            ScanOutcome::Pick { idx, mask } => (idx, mask),
        };

        let mut digits = [0u8; 64];
        let count = shuffled_digits_from_mask(mask, rng, &mut digits);
        for &digit in &digits[..count] {
            let (marker, ok) = cache.try_place(board, idx, digit);
            if ok && Self::fill_cached(board, cache, rng, budget) {
                return true;
            }
            cache.rollback_place(board, idx, digit, marker);
            if budget.aborted() {
                return false;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use omnidoku_core::DigitSet;
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;

    fn grid_is_valid(values: &[u16], topo: &Topology) -> bool {
        for house in 0..topo.house_count() {
            let mut seen = DigitSet::EMPTY;
            for &idx in topo.house(house) {
                let value = values[usize::from(idx)];
                if value == 0 {
                    return false;
                }
                #[expect(clippy::cast_possible_truncation)]
                let digit = value as u8;
                if seen.contains(digit) {
                    return false;
                }
                seen.insert(digit);
            }
        }
        true
    }

    fn generate_for(box_rows: u8, box_cols: u8, seed: u64) -> Vec<u16> {
        let topo = Topology::shared(box_rows, box_cols).unwrap();
        let kernel = SolvedKernel::new(Backend::Scalar);
        let mut board = Board::new(Arc::clone(&topo));
        let mut cache = CandidateCache::new();
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let mut budget = SearchAbortControl::new();
        let mut solution = Vec::new();
        assert!(kernel.generate(&mut board, &mut cache, &mut rng, &mut budget, &mut solution));
        solution
    }

    #[test]
    fn test_generates_valid_grids_across_geometries() {
        for (box_rows, box_cols) in [(2, 2), (2, 3), (3, 3), (3, 4)] {
            let topo = Topology::shared(box_rows, box_cols).unwrap();
            let solution = generate_for(box_rows, box_cols, 0xC0FFEE);
            assert!(
                grid_is_valid(&solution, &topo),
                "invalid grid for {box_rows}x{box_cols}"
            );
        }
    }

    #[test]
    fn test_cached_path_on_large_board() {
        // 5x5 boxes cross the cache threshold (n = 25).
        let topo = Topology::shared(5, 5).unwrap();
        let solution = generate_for(5, 5, 42);
        assert!(grid_is_valid(&solution, &topo));
    }

    #[test]
    fn test_same_seed_same_grid() {
        let first = generate_for(3, 3, 7);
        let second = generate_for(3, 3, 7);
        assert_eq!(first, second);
    }

    #[test]
    fn test_different_seeds_differ() {
        assert_ne!(generate_for(3, 3, 1), generate_for(3, 3, 2));
    }

    #[test]
    fn test_budget_abort_unwinds_board() {
        let topo = Topology::shared(4, 4).unwrap();
        let kernel = SolvedKernel::new(Backend::Scalar);
        let mut board = Board::new(Arc::clone(&topo));
        let mut cache = CandidateCache::new();
        let mut rng = Pcg64Mcg::seed_from_u64(3);
        let mut budget = SearchAbortControl::new().with_node_limit(10);
        let mut solution = Vec::new();
        assert!(!kernel.generate(&mut board, &mut cache, &mut rng, &mut budget, &mut solution));
        assert!(budget.aborted_by_nodes());
        assert_eq!(board.empty_cells(), topo.nn());
    }

    #[test]
    fn test_shuffled_digits_cover_mask() {
        let mut rng = Pcg64Mcg::seed_from_u64(9);
        let mut out = [0u8; 64];
        let mask = 0b1010_1101u64;
        let count = shuffled_digits_from_mask(mask, &mut rng, &mut out);
        assert_eq!(count, 5);
        let mut rebuilt = 0u64;
        for &digit in &out[..count] {
            rebuilt |= 1 << (digit - 1);
        }
        assert_eq!(rebuilt, mask);
    }

    #[test]
    fn test_shuffled_digits_all_orders_reachable() {
        // Two-digit shortcut: both orders appear over many draws.
        let mut rng = Pcg64Mcg::seed_from_u64(11);
        let mut out = [0u8; 64];
        let mut seen_forward = false;
        let mut seen_swapped = false;
        for _ in 0..64 {
            shuffled_digits_from_mask(0b11, &mut rng, &mut out);
            match (out[0], out[1]) {
                (1, 2) => seen_forward = true,
                (2, 1) => seen_swapped = true,
                other => panic!("unexpected digits {other:?}"),
            }
        }
        assert!(seen_forward && seen_swapped);
    }
}
