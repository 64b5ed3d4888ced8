use std::{
    collections::HashMap,
    sync::{Arc, LazyLock, Mutex, PoisonError},
};

use crate::{CellSet, GeometryError, MAX_N, MIN_N};

/// Immutable constant-time lookup structure for a `(box_rows, box_cols)`
/// board geometry.
///
/// The topology maps every flat cell index to its row, column and box,
/// provides the flat house list (rows, then columns, then boxes) and the
/// deduplicated peer list of every cell. Hot paths read the packed
/// row/col/box word of a cell with a single load and decode it with the
/// `packed_*` helpers.
///
/// Topologies are shared process-wide: [`Topology::shared`] returns an
/// [`Arc`] from a registry keyed by `(box_rows, box_cols)` so concurrent
/// workers reuse one instance per geometry.
///
/// # Examples
///
/// ```
/// use omnidoku_core::Topology;
///
/// let topo = Topology::shared(2, 3)?;
/// assert_eq!(topo.n(), 6);
/// assert_eq!(topo.nn(), 36);
/// assert_eq!(topo.house_count(), 18);
/// # Ok::<(), omnidoku_core::GeometryError>(())
/// ```
#[derive(Debug)]
pub struct Topology {
    box_rows: u8,
    box_cols: u8,
    n: u8,
    nn: usize,
    box_rows_count: u8,
    box_cols_count: u8,
    full_mask: u64,
    cell_row: Vec<u8>,
    cell_col: Vec<u8>,
    cell_box: Vec<u8>,
    cell_rcb_packed: Vec<u32>,
    cell_center_sym: Vec<u16>,
    house_offsets: Vec<u32>,
    houses_flat: Vec<u16>,
    house_cells: Vec<CellSet>,
    peer_offsets: Vec<u32>,
    peers_flat: Vec<u16>,
}

static REGISTRY: LazyLock<Mutex<HashMap<(u8, u8), Arc<Topology>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn pack_rcb(row: usize, col: usize, box_idx: usize) -> u32 {
    #[expect(clippy::cast_possible_truncation)]
    let packed = ((row & 63) | ((col & 63) << 6) | ((box_idx & 63) << 12)) as u32;
    packed
}

impl Topology {
    /// Builds a topology for the given box dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if either dimension is zero or
    /// `n = box_rows * box_cols` falls outside `[4, 64]`.
    pub fn build(box_rows: u8, box_cols: u8) -> Result<Self, GeometryError> {
        if box_rows == 0 || box_cols == 0 {
            return Err(GeometryError::ZeroDimension { box_rows, box_cols });
        }
        let n_wide = u16::from(box_rows) * u16::from(box_cols);
        if n_wide < u16::from(MIN_N) || n_wide > u16::from(MAX_N) {
            return Err(GeometryError::SizeOutOfRange { n: n_wide });
        }
        #[expect(clippy::cast_possible_truncation)]
        let n = n_wide as u8;
        let nu = usize::from(n);
        let nn = nu * nu;
        let box_rows_count = n / box_rows;
        let box_cols_count = n / box_cols;
        let full_mask = if n == 64 { u64::MAX } else { (1 << n) - 1 };

        let mut cell_row = vec![0u8; nn];
        let mut cell_col = vec![0u8; nn];
        let mut cell_box = vec![0u8; nn];
        let mut cell_rcb_packed = vec![0u32; nn];
        let mut cell_center_sym = vec![0u16; nn];

        for row in 0..nu {
            for col in 0..nu {
                let idx = row * nu + col;
                let box_idx =
                    (row / usize::from(box_rows)) * usize::from(box_cols_count)
                        + col / usize::from(box_cols);
                #[expect(clippy::cast_possible_truncation)]
                {
                    cell_row[idx] = row as u8;
                    cell_col[idx] = col as u8;
                    cell_box[idx] = box_idx as u8;
                    cell_center_sym[idx] = ((nu - 1 - row) * nu + (nu - 1 - col)) as u16;
                }
                cell_rcb_packed[idx] = pack_rcb(row, col, box_idx);
            }
        }

        let house_count = 3 * nu;
        let mut house_offsets = Vec::with_capacity(house_count + 1);
        let mut houses_flat = Vec::with_capacity(house_count * nu);
        #[expect(clippy::cast_possible_truncation)]
        let push_cell = |flat: &mut Vec<u16>, idx: usize| flat.push(idx as u16);

        for row in 0..nu {
            house_offsets.push(houses_flat.len() as u32);
            for col in 0..nu {
                push_cell(&mut houses_flat, row * nu + col);
            }
        }
        for col in 0..nu {
            house_offsets.push(houses_flat.len() as u32);
            for row in 0..nu {
                push_cell(&mut houses_flat, row * nu + col);
            }
        }
        for box_idx in 0..nu {
            house_offsets.push(houses_flat.len() as u32);
            let row0 = (box_idx / usize::from(box_cols_count)) * usize::from(box_rows);
            let col0 = (box_idx % usize::from(box_cols_count)) * usize::from(box_cols);
            for dr in 0..usize::from(box_rows) {
                for dc in 0..usize::from(box_cols) {
                    push_cell(&mut houses_flat, (row0 + dr) * nu + (col0 + dc));
                }
            }
        }
        house_offsets.push(houses_flat.len() as u32);

        let mut house_cells = Vec::with_capacity(house_count);
        for house in 0..house_count {
            let start = house_offsets[house] as usize;
            let end = house_offsets[house + 1] as usize;
            let mut cells = CellSet::empty(nn);
            for &idx in &houses_flat[start..end] {
                cells.insert(usize::from(idx));
            }
            house_cells.push(cells);
        }

        // Peers of a cell: union of its three houses minus the cell itself,
        // deduplicated in row, column, box order.
        let mut peer_offsets = Vec::with_capacity(nn + 1);
        let mut peers_flat = Vec::with_capacity(nn * 3 * nu);
        let mut seen = vec![false; nn];
        for idx in 0..nn {
            seen.fill(false);
            peer_offsets.push(peers_flat.len() as u32);
            let row = usize::from(cell_row[idx]);
            let col = usize::from(cell_col[idx]);
            let box_idx = usize::from(cell_box[idx]);
            for house in [row, nu + col, 2 * nu + box_idx] {
                let start = house_offsets[house] as usize;
                let end = house_offsets[house + 1] as usize;
                for &peer in &houses_flat[start..end] {
                    let peer_idx = usize::from(peer);
                    if peer_idx == idx || seen[peer_idx] {
                        continue;
                    }
                    seen[peer_idx] = true;
                    peers_flat.push(peer);
                }
            }
        }
        peer_offsets.push(peers_flat.len() as u32);

        Ok(Self {
            box_rows,
            box_cols,
            n,
            nn,
            box_rows_count,
            box_cols_count,
            full_mask,
            cell_row,
            cell_col,
            cell_box,
            cell_rcb_packed,
            cell_center_sym,
            house_offsets,
            houses_flat,
            house_cells,
            peer_offsets,
            peers_flat,
        })
    }

    /// Returns the shared topology for the given box dimensions.
    ///
    /// Topologies are cached process-wide; concurrent builders serialize on a
    /// short-lived registry lock and receive the same [`Arc`].
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the geometry is invalid.
    pub fn shared(box_rows: u8, box_cols: u8) -> Result<Arc<Self>, GeometryError> {
        let mut registry = REGISTRY
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(topo) = registry.get(&(box_rows, box_cols)) {
            return Ok(Arc::clone(topo));
        }
        let topo = Arc::new(Self::build(box_rows, box_cols)?);
        registry.insert((box_rows, box_cols), Arc::clone(&topo));
        Ok(topo)
    }

    /// Box height.
    #[must_use]
    #[inline]
    pub fn box_rows(&self) -> u8 {
        self.box_rows
    }

    /// Box width.
    #[must_use]
    #[inline]
    pub fn box_cols(&self) -> u8 {
        self.box_cols
    }

    /// Board size (`box_rows * box_cols`).
    #[must_use]
    #[inline]
    pub fn n(&self) -> u8 {
        self.n
    }

    /// Total cell count (`n * n`).
    #[must_use]
    #[inline]
    pub fn nn(&self) -> usize {
        self.nn
    }

    /// Number of box bands stacked vertically (`n / box_rows`).
    #[must_use]
    #[inline]
    pub fn box_rows_count(&self) -> u8 {
        self.box_rows_count
    }

    /// Number of box stacks side by side (`n / box_cols`).
    #[must_use]
    #[inline]
    pub fn box_cols_count(&self) -> u8 {
        self.box_cols_count
    }

    /// Bitmask with the low `n` bits set.
    #[must_use]
    #[inline]
    pub fn full_mask(&self) -> u64 {
        self.full_mask
    }

    /// Row of a flat cell index.
    #[must_use]
    #[inline]
    pub fn row_of(&self, idx: usize) -> usize {
        usize::from(self.cell_row[idx])
    }

    /// Column of a flat cell index.
    #[must_use]
    #[inline]
    pub fn col_of(&self, idx: usize) -> usize {
        usize::from(self.cell_col[idx])
    }

    /// Box of a flat cell index.
    #[must_use]
    #[inline]
    pub fn box_of(&self, idx: usize) -> usize {
        usize::from(self.cell_box[idx])
    }

    /// Packed `(row, col, box)` word of a flat cell index.
    ///
    /// Decode with [`Topology::packed_row`], [`Topology::packed_col`] and
    /// [`Topology::packed_box`].
    #[must_use]
    #[inline]
    pub fn packed(&self, idx: usize) -> u32 {
        self.cell_rcb_packed[idx]
    }

    /// Row encoded in a packed cell word.
    #[must_use]
    #[inline]
    pub const fn packed_row(packed: u32) -> usize {
        (packed & 63) as usize
    }

    /// Column encoded in a packed cell word.
    #[must_use]
    #[inline]
    pub const fn packed_col(packed: u32) -> usize {
        ((packed >> 6) & 63) as usize
    }

    /// Box encoded in a packed cell word.
    #[must_use]
    #[inline]
    pub const fn packed_box(packed: u32) -> usize {
        ((packed >> 12) & 63) as usize
    }

    /// 180-degree center-symmetric partner of a flat cell index.
    #[must_use]
    #[inline]
    pub fn sym_partner(&self, idx: usize) -> usize {
        usize::from(self.cell_center_sym[idx])
    }

    /// Flat cell index of `(row, col)`.
    #[must_use]
    #[inline]
    pub fn cell_index(&self, row: usize, col: usize) -> usize {
        row * usize::from(self.n) + col
    }

    /// Number of houses (`3 * n`: rows, then columns, then boxes).
    #[must_use]
    #[inline]
    pub fn house_count(&self) -> usize {
        3 * usize::from(self.n)
    }

    /// House index of row `row`.
    #[must_use]
    #[inline]
    pub fn row_house(&self, row: usize) -> usize {
        row
    }

    /// House index of column `col`.
    #[must_use]
    #[inline]
    pub fn col_house(&self, col: usize) -> usize {
        usize::from(self.n) + col
    }

    /// House index of box `box_idx`.
    #[must_use]
    #[inline]
    pub fn box_house(&self, box_idx: usize) -> usize {
        2 * usize::from(self.n) + box_idx
    }

    /// Cells of a house, in house-local order.
    #[must_use]
    #[inline]
    pub fn house(&self, house: usize) -> &[u16] {
        let start = self.house_offsets[house] as usize;
        let end = self.house_offsets[house + 1] as usize;
        &self.houses_flat[start..end]
    }

    /// Cells of a house as a [`CellSet`].
    #[must_use]
    #[inline]
    pub fn house_cells(&self, house: usize) -> &CellSet {
        &self.house_cells[house]
    }

    /// Top-left `(row, col)` of a box.
    #[must_use]
    #[inline]
    pub fn box_origin(&self, box_idx: usize) -> (usize, usize) {
        let row0 = (box_idx / usize::from(self.box_cols_count)) * usize::from(self.box_rows);
        let col0 = (box_idx % usize::from(self.box_cols_count)) * usize::from(self.box_cols);
        (row0, col0)
    }

    /// Unique peers of a cell: every other cell sharing a row, column or box.
    #[must_use]
    #[inline]
    pub fn peers(&self, idx: usize) -> &[u16] {
        let start = self.peer_offsets[idx] as usize;
        let end = self.peer_offsets[idx + 1] as usize;
        &self.peers_flat[start..end]
    }
}

/// Returns every supported `(box_rows, box_cols)` pair, grouped by `n`.
///
/// For each `n` in `[4, 64]`, every factorization `box_rows * box_cols = n`
/// is listed, asymmetric boxes included.
#[must_use]
pub fn supported_geometries() -> Vec<(u8, u8)> {
    let mut pairs = Vec::new();
    for n in MIN_N..=MAX_N {
        for box_rows in 1..=n {
            if n % box_rows == 0 {
                pairs.push((box_rows, n / box_rows));
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_rejects_invalid_geometries() {
        assert!(matches!(
            Topology::build(0, 3),
            Err(GeometryError::ZeroDimension { .. })
        ));
        assert!(matches!(
            Topology::build(1, 3),
            Err(GeometryError::SizeOutOfRange { n: 3 })
        ));
        assert!(matches!(
            Topology::build(5, 13),
            Err(GeometryError::SizeOutOfRange { n: 65 })
        ));
    }

    #[test]
    fn test_classic_9x9_layout() {
        let topo = Topology::build(3, 3).unwrap();
        assert_eq!(topo.n(), 9);
        assert_eq!(topo.nn(), 81);
        assert_eq!(topo.house_count(), 27);
        assert_eq!(topo.box_of(topo.cell_index(4, 4)), 4);
        assert_eq!(topo.box_of(topo.cell_index(8, 8)), 8);
        assert_eq!(topo.peers(40).len(), 20);
    }

    #[test]
    fn test_asymmetric_2x3_layout() {
        let topo = Topology::build(2, 3).unwrap();
        assert_eq!(topo.n(), 6);
        assert_eq!(topo.box_rows_count(), 3);
        assert_eq!(topo.box_cols_count(), 2);
        // Cell (2, 3) sits in the middle-right box.
        assert_eq!(topo.box_of(topo.cell_index(2, 3)), 3);
        assert_eq!(topo.box_origin(3), (2, 3));
    }

    #[test]
    fn test_packed_word_roundtrip() {
        let topo = Topology::build(3, 4).unwrap();
        for idx in 0..topo.nn() {
            let packed = topo.packed(idx);
            assert_eq!(Topology::packed_row(packed), topo.row_of(idx));
            assert_eq!(Topology::packed_col(packed), topo.col_of(idx));
            assert_eq!(Topology::packed_box(packed), topo.box_of(idx));
        }
    }

    #[test]
    fn test_center_symmetry_is_involutive() {
        let topo = Topology::build(3, 3).unwrap();
        for idx in 0..topo.nn() {
            assert_eq!(topo.sym_partner(topo.sym_partner(idx)), idx);
        }
        // The center cell is its own partner on odd n.
        assert_eq!(topo.sym_partner(40), 40);
    }

    #[test]
    fn test_every_cell_in_exactly_three_houses() {
        for (box_rows, box_cols) in [(2, 2), (2, 3), (3, 3), (3, 4), (4, 4)] {
            let topo = Topology::build(box_rows, box_cols).unwrap();
            let mut membership = vec![0usize; topo.nn()];
            for house in 0..topo.house_count() {
                for &idx in topo.house(house) {
                    membership[usize::from(idx)] += 1;
                }
            }
            assert!(membership.iter().all(|&count| count == 3));
        }
    }

    #[test]
    fn test_peers_match_house_union() {
        for (box_rows, box_cols) in [(2, 3), (3, 3), (3, 4)] {
            let topo = Topology::build(box_rows, box_cols).unwrap();
            let n = usize::from(topo.n());
            // Row + column + box peers, minus the box/line overlaps and the
            // cell itself: 3n - 1 - box_rows - box_cols.
            let expected_count =
                3 * n - 1 - usize::from(topo.box_rows()) - usize::from(topo.box_cols());
            for idx in 0..topo.nn() {
                let peers = topo.peers(idx);
                assert_eq!(peers.len(), expected_count);

                let mut union = CellSet::empty(topo.nn());
                for house in [
                    topo.row_house(topo.row_of(idx)),
                    topo.col_house(topo.col_of(idx)),
                    topo.box_house(topo.box_of(idx)),
                ] {
                    union.union_with(topo.house_cells(house));
                }
                union.remove(idx);
                assert_eq!(peers.len(), union.count());
                for &peer in peers {
                    assert!(union.contains(usize::from(peer)));
                }
            }
        }
    }

    #[test]
    fn test_shared_returns_same_instance() {
        let a = Topology::shared(3, 3).unwrap();
        let b = Topology::shared(3, 3).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_supported_geometries_catalog() {
        let pairs = supported_geometries();
        assert!(pairs.contains(&(3, 3)));
        assert!(pairs.contains(&(2, 3)));
        assert!(pairs.contains(&(1, 4)));
        assert!(pairs.contains(&(8, 8)));
        for (box_rows, box_cols) in pairs {
            assert!(Topology::build(box_rows, box_cols).is_ok());
        }
    }
}
