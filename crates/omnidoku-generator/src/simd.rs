//! SIMD-dispatched MRV cell selection.
//!
//! The scan visits every empty cell, computes its used and candidate masks,
//! and keeps the best `(bucket, pressure)` pick: lowest candidate count
//! first, then densest houses, first cell on remaining ties. Three
//! implementations produce identical decisions: a scalar loop, a 16-lane
//! AVX2 pass over the `u16` value array with 4-lane batched popcounts, and
//! a 32-lane AVX-512 pass with 8-lane batches. Backend selection combines
//! the configured preference with a runtime capability probe and never
//! branches per scan.

use std::{fmt, str::FromStr};

use omnidoku_core::Board;

/// SIMD backend for the MRV scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backend {
    /// Plain scalar loop; always available.
    #[default]
    Scalar,
    /// 16 lanes of `u16` values per iteration.
    Avx2,
    /// 32 lanes of `u16` values per iteration.
    Avx512,
}

impl Backend {
    /// Downgrades the preference to the best backend the CPU supports.
    #[must_use]
    pub fn resolve(self) -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            match self {
                Self::Avx512 if is_x86_feature_detected!("avx512bw") => Self::Avx512,
                Self::Avx512 | Self::Avx2 if is_x86_feature_detected!("avx2") => Self::Avx2,
                _ => Self::Scalar,
            }
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            let _ = self;
            Self::Scalar
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scalar => "scalar",
            Self::Avx2 => "avx2",
            Self::Avx512 => "avx512",
        };
        f.write_str(name)
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scalar" => Ok(Self::Scalar),
            "avx2" => Ok(Self::Avx2),
            "avx512" => Ok(Self::Avx512),
            other => Err(format!("unknown cpu backend `{other}`")),
        }
    }
}

/// Result of one MRV scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// No empty cell remains.
    Complete,
    /// The best empty cell and its candidate mask.
    Pick {
        /// Flat cell index.
        idx: usize,
        /// Candidate bitmask of the cell.
        mask: u64,
    },
    /// Some empty cell has no candidates.
    DeadEnd,
}

/// Running best-pick state shared by every scan implementation.
#[derive(Debug)]
struct MrvState {
    best_bucket: u32,
    best_idx: usize,
    best_mask: u64,
    best_pressure: u32,
    found_empty: bool,
}

impl MrvState {
    fn new() -> Self {
        Self {
            best_bucket: 65,
            best_idx: usize::MAX,
            best_mask: 0,
            best_pressure: 0,
            found_empty: false,
        }
    }

    /// Accounts one empty cell; returns `false` on a zero-candidate cell.
    #[inline]
    fn consider(
        &mut self,
        idx: usize,
        candidate_mask: u64,
        candidate_count: u32,
        pressure: u32,
    ) -> bool {
        if candidate_count == 0 {
            return false;
        }
        self.found_empty = true;
        if candidate_count < self.best_bucket {
            self.best_bucket = candidate_count;
            self.best_idx = idx;
            self.best_mask = candidate_mask;
            // A forced cell can never be displaced by a pressure tie-break.
            self.best_pressure = if candidate_count == 1 { 64 } else { pressure };
        } else if candidate_count == self.best_bucket
            && candidate_count > 1
            && pressure > self.best_pressure
        {
            self.best_idx = idx;
            self.best_mask = candidate_mask;
            self.best_pressure = pressure;
        }
        true
    }

    fn finish(self) -> ScanOutcome {
        if self.found_empty {
            ScanOutcome::Pick {
                idx: self.best_idx,
                mask: self.best_mask,
            }
        } else {
            ScanOutcome::Complete
        }
    }
}

#[inline]
fn used_and_candidates(board: &Board, idx: usize) -> (u64, u64) {
    let used = board.used_mask(idx);
    (used, !used & board.topology().full_mask())
}

/// Selects the best empty cell using the given backend.
///
/// The backend must have been resolved against the CPU (see
/// [`Backend::resolve`]); an unresolved preference falls back to scalar on
/// non-x86 targets only.
#[must_use]
pub fn select_best_cell(board: &Board, backend: Backend) -> ScanOutcome {
    match backend {
        #[cfg(target_arch = "x86_64")]
        Backend::Avx2 => unsafe { select_best_cell_avx2(board) },
        #[cfg(target_arch = "x86_64")]
        Backend::Avx512 => unsafe { select_best_cell_avx512(board) },
        _ => select_best_cell_scalar(board),
    }
}

fn select_best_cell_scalar(board: &Board) -> ScanOutcome {
    let mut state = MrvState::new();
    for idx in 0..board.topology().nn() {
        if board.value(idx) != 0 {
            continue;
        }
        let (used, candidates) = used_and_candidates(board, idx);
        if !state.consider(idx, candidates, candidates.count_ones(), used.count_ones()) {
            return ScanOutcome::DeadEnd;
        }
    }
    state.finish()
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn popcount4x64_avx2(masks: &[u64; 4]) -> [u32; 4] {
    use std::arch::x86_64::{
        __m256i, _mm256_add_epi8, _mm256_and_si256, _mm256_loadu_si256, _mm256_sad_epu8,
        _mm256_set1_epi8, _mm256_setr_epi8, _mm256_setzero_si256, _mm256_shuffle_epi8,
        _mm256_srli_epi16, _mm256_storeu_si256,
    };

    let mut lanes = [0u64; 4];
    unsafe {
        let x = _mm256_loadu_si256(masks.as_ptr().cast::<__m256i>());
        let low_nibble = _mm256_set1_epi8(0x0f);
        let lut = _mm256_setr_epi8(
            0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4, 0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2,
            3, 3, 4,
        );
        let lo = _mm256_and_si256(x, low_nibble);
        let hi = _mm256_and_si256(_mm256_srli_epi16(x, 4), low_nibble);
        let counts = _mm256_add_epi8(_mm256_shuffle_epi8(lut, lo), _mm256_shuffle_epi8(lut, hi));
        let sums = _mm256_sad_epu8(counts, _mm256_setzero_si256());
        _mm256_storeu_si256(lanes.as_mut_ptr().cast::<__m256i>(), sums);
    }
    #[expect(clippy::cast_possible_truncation)]
    [
        lanes[0] as u32,
        lanes[1] as u32,
        lanes[2] as u32,
        lanes[3] as u32,
    ]
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn select_best_cell_avx2(board: &Board) -> ScanOutcome {
    use std::arch::x86_64::{
        __m256i, _mm256_cmpeq_epi16, _mm256_loadu_si256, _mm256_movemask_epi8,
        _mm256_setzero_si256,
    };

    const LANES: usize = 16;

    let mut state = MrvState::new();
    let nn = board.topology().nn();
    let values = board.values();

    let mut batch_idx = [0usize; 4];
    let mut batch_used = [0u64; 4];
    let mut batch_cand = [0u64; 4];
    let mut batch_len = 0usize;

    macro_rules! flush {
        () => {{
            let used_counts;
            let cand_counts;
            if batch_len == 4 {
                used_counts = unsafe { popcount4x64_avx2(&batch_used) };
                cand_counts = unsafe { popcount4x64_avx2(&batch_cand) };
            } else {
                let mut u = [0u32; 4];
                let mut c = [0u32; 4];
                for i in 0..batch_len {
                    u[i] = batch_used[i].count_ones();
                    c[i] = batch_cand[i].count_ones();
                }
                used_counts = u;
                cand_counts = c;
            }
            for i in 0..batch_len {
                if !state.consider(batch_idx[i], batch_cand[i], cand_counts[i], used_counts[i]) {
                    return ScanOutcome::DeadEnd;
                }
            }
            batch_len = 0;
        }};
    }

    let mut idx = 0;
    while idx + LANES <= nn {
        let mut pair_mask = unsafe {
            let v = _mm256_loadu_si256(values.as_ptr().add(idx).cast::<__m256i>());
            let eq_zero = _mm256_cmpeq_epi16(v, _mm256_setzero_si256());
            #[expect(clippy::cast_sign_loss)]
            let bytes = _mm256_movemask_epi8(eq_zero) as u32;
            // One bit per lane: both bytes of an empty `u16` compare equal.
            bytes & (bytes >> 1) & 0x5555_5555
        };
        while pair_mask != 0 {
            let lane = (pair_mask.trailing_zeros() >> 1) as usize;
            pair_mask &= pair_mask - 1;
            let cell = idx + lane;
            let (used, candidates) = used_and_candidates(board, cell);
            batch_idx[batch_len] = cell;
            batch_used[batch_len] = used;
            batch_cand[batch_len] = candidates;
            batch_len += 1;
            if batch_len == 4 {
                flush!();
            }
        }
        idx += LANES;
    }
    while idx < nn {
        if values[idx] == 0 {
            let (used, candidates) = used_and_candidates(board, idx);
            batch_idx[batch_len] = idx;
            batch_used[batch_len] = used;
            batch_cand[batch_len] = candidates;
            batch_len += 1;
            if batch_len == 4 {
                flush!();
            }
        }
        idx += 1;
    }
    flush!();
    state.finish()
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx512f,avx512vpopcntdq")]
unsafe fn popcount8x64_avx512(masks: &[u64; 8]) -> [u32; 8] {
    use std::arch::x86_64::{__m512i, _mm512_loadu_si512, _mm512_popcnt_epi64, _mm512_storeu_si512};

    let mut lanes = [0u64; 8];
    unsafe {
        let x = _mm512_loadu_si512(masks.as_ptr().cast::<__m512i>());
        let counts = _mm512_popcnt_epi64(x);
        _mm512_storeu_si512(lanes.as_mut_ptr().cast::<__m512i>(), counts);
    }
    let mut out = [0u32; 8];
    for (slot, &lane) in out.iter_mut().zip(&lanes) {
        #[expect(clippy::cast_possible_truncation)]
        {
            *slot = lane as u32;
        }
    }
    out
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx512f,avx512bw")]
unsafe fn select_best_cell_avx512(board: &Board) -> ScanOutcome {
    use std::arch::x86_64::{
        __m512i, _mm512_cmpeq_epi16_mask, _mm512_loadu_si512, _mm512_setzero_si512,
    };

    const LANES: usize = 32;

    let has_vpopcnt = is_x86_feature_detected!("avx512vpopcntdq");
    let mut state = MrvState::new();
    let nn = board.topology().nn();
    let values = board.values();

    let mut batch_idx = [0usize; 8];
    let mut batch_used = [0u64; 8];
    let mut batch_cand = [0u64; 8];
    let mut batch_len = 0usize;

    macro_rules! flush {
        () => {{
            let used_counts;
            let cand_counts;
            if batch_len == 8 && has_vpopcnt {
                used_counts = unsafe { popcount8x64_avx512(&batch_used) };
                cand_counts = unsafe { popcount8x64_avx512(&batch_cand) };
            } else {
                let mut u = [0u32; 8];
                let mut c = [0u32; 8];
                for i in 0..batch_len {
                    u[i] = batch_used[i].count_ones();
                    c[i] = batch_cand[i].count_ones();
                }
                used_counts = u;
                cand_counts = c;
            }
            for i in 0..batch_len {
                if !state.consider(batch_idx[i], batch_cand[i], cand_counts[i], used_counts[i]) {
                    return ScanOutcome::DeadEnd;
                }
            }
            batch_len = 0;
        }};
    }

    let mut idx = 0;
    while idx + LANES <= nn {
        let mut empty_mask = unsafe {
            let v = _mm512_loadu_si512(values.as_ptr().add(idx).cast::<__m512i>());
            _mm512_cmpeq_epi16_mask(v, _mm512_setzero_si512())
        };
        while empty_mask != 0 {
            let lane = empty_mask.trailing_zeros() as usize;
            empty_mask &= empty_mask - 1;
            let cell = idx + lane;
            let (used, candidates) = used_and_candidates(board, cell);
            batch_idx[batch_len] = cell;
            batch_used[batch_len] = used;
            batch_cand[batch_len] = candidates;
            batch_len += 1;
            if batch_len == 8 {
                flush!();
            }
        }
        idx += LANES;
    }
    while idx < nn {
        if values[idx] == 0 {
            let (used, candidates) = used_and_candidates(board, idx);
            batch_idx[batch_len] = idx;
            batch_used[batch_len] = used;
            batch_cand[batch_len] = candidates;
            batch_len += 1;
            if batch_len == 8 {
                flush!();
            }
        }
        idx += 1;
    }
    flush!();
    state.finish()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use omnidoku_core::Topology;

    use super::*;

    fn seeded_board(box_rows: u8, box_cols: u8, placements: &[(usize, u8)]) -> Board {
        let topo = Topology::shared(box_rows, box_cols).unwrap();
        let mut board = Board::new(Arc::clone(&topo));
        for &(idx, digit) in placements {
            board.place(idx, digit);
        }
        board
    }

    #[test]
    fn test_scalar_picks_min_bucket() {
        // Fill most of row 0 so its remaining cells carry the fewest
        // candidates.
        let board = seeded_board(
            3,
            3,
            &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 6), (6, 7)],
        );
        let ScanOutcome::Pick { idx, mask } = select_best_cell_scalar(&board) else {
            panic!("expected a pick");
        };
        assert!(idx == 7 || idx == 8);
        assert_eq!(mask.count_ones(), 2);
    }

    #[test]
    fn test_scalar_reports_complete() {
        let mut board = seeded_board(2, 2, &[]);
        let solution = [1u8, 2, 3, 4, 3, 4, 1, 2, 2, 1, 4, 3, 4, 3, 2, 1];
        for (idx, &digit) in solution.iter().enumerate() {
            board.place(idx, digit);
        }
        assert_eq!(select_best_cell_scalar(&board), ScanOutcome::Complete);
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("scalar".parse::<Backend>().unwrap(), Backend::Scalar);
        assert_eq!("AVX2".parse::<Backend>().unwrap(), Backend::Avx2);
        assert_eq!("avx512".parse::<Backend>().unwrap(), Backend::Avx512);
        assert!("neon".parse::<Backend>().is_err());
    }

    #[test]
    fn test_resolve_never_upgrades() {
        assert_eq!(Backend::Scalar.resolve(), Backend::Scalar);
        // Whatever the host supports, resolution returns something runnable.
        let resolved = Backend::Avx512.resolve();
        let _ = select_best_cell(&seeded_board(3, 3, &[(0, 1)]), resolved);
    }

    #[test]
    fn test_backends_agree_on_decisions() {
        let board = seeded_board(
            4,
            4,
            &[(0, 1), (1, 2), (2, 3), (17, 4), (34, 5), (51, 6), (100, 7)],
        );
        let scalar = select_best_cell_scalar(&board);
        for backend in [Backend::Avx2, Backend::Avx512] {
            if backend.resolve() == backend {
                assert_eq!(select_best_cell(&board, backend), scalar);
            }
        }
    }
}
