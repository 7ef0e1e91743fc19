//! Uniform grid of cubic chunk cells over a bounding box.

use glam::Vec3;
use mesh::BoundingBox;
use serde::{Deserialize, Serialize};

use crate::error::ChunkError;

/// Product of the per-axis cell counts, or `None` on overflow
pub fn checked_cell_count(amount: [usize; 3]) -> Option<usize> {
    amount.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
}

/// Integer cell coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridIndex {
    pub i: usize,
    pub j: usize,
    pub k: usize,
}

impl GridIndex {
    pub fn new(i: usize, j: usize, k: usize) -> Self {
        Self { i, j, k }
    }
}

/// Cubic cells of edge `chunk_size` anchored at the minimum corner of
/// `bounds`, with `amount` cells per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkGrid {
    bounds: BoundingBox,
    chunk_size: f32,
    amount: [usize; 3],
}

impl ChunkGrid {
    /// Cover `bounds` with cells of edge `chunk_size`.
    ///
    /// Each axis gets `ceil(extent / chunk_size)` cells, at least one, so a
    /// flat or single-point mesh still maps to a valid grid. Fails with
    /// [`ChunkError::GridTooLarge`] when the cell count overflows `usize`.
    pub fn from_bounds(bounds: BoundingBox, chunk_size: f32) -> Result<Self, ChunkError> {
        bounds.check().map_err(ChunkError::InvalidBounds)?;
        if !(chunk_size.is_finite() && chunk_size > 0.0) {
            return Err(strata_config::ConfigError::InvalidChunkSize(chunk_size).into());
        }
        let cells = (bounds.size() / chunk_size).ceil();
        let too_large = || ChunkError::GridTooLarge {
            cells: cells.to_array(),
            chunk_size,
        };
        // f32 -> usize casts saturate, so range-check before converting
        if cells.to_array().iter().any(|c| !(*c <= u32::MAX as f32)) {
            return Err(too_large());
        }
        let amount = [cells.x, cells.y, cells.z].map(|c| (c as usize).max(1));
        if checked_cell_count(amount).is_none() {
            return Err(too_large());
        }

        tracing::debug!(
            "ChunkGrid::from_bounds: {:?} cells of size {} over {:?}",
            amount,
            chunk_size,
            bounds
        );
        Ok(Self {
            bounds,
            chunk_size,
            amount,
        })
    }

    /// Rebuild a grid from persisted parts without recomputing `amount`.
    pub(crate) fn from_parts(bounds: BoundingBox, chunk_size: f32, amount: [usize; 3]) -> Self {
        Self {
            bounds,
            chunk_size,
            amount,
        }
    }

    /// Bounds the grid was built from
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn chunk_size(&self) -> f32 {
        self.chunk_size
    }

    /// Cells per axis
    pub fn amount(&self) -> [usize; 3] {
        self.amount
    }

    pub fn total_cells(&self) -> usize {
        self.amount.iter().product()
    }

    /// Hash of an in-range cell: `i * amount_y * amount_z + j * amount_z + k`.
    ///
    /// # Panics
    ///
    /// Panics if any index is outside the grid.
    #[inline]
    pub fn hash_value(&self, i: usize, j: usize, k: usize) -> usize {
        let [ax, ay, az] = self.amount;
        assert!(
            i < ax && j < ay && k < az,
            "grid index ({i}, {j}, {k}) outside grid of {:?} cells",
            self.amount
        );
        i * ay * az + j * az + k
    }

    /// Checked variant of [`ChunkGrid::hash_value`]
    pub fn try_hash_value(&self, i: usize, j: usize, k: usize) -> Result<usize, ChunkError> {
        let [ax, ay, az] = self.amount;
        if i < ax && j < ay && k < az {
            Ok(i * ay * az + j * az + k)
        } else {
            Err(ChunkError::GridIndexOutOfRange {
                i,
                j,
                k,
                amount: self.amount,
            })
        }
    }

    /// Decode a hash back into cell coordinates
    pub fn grid_index(&self, hash: usize) -> Option<GridIndex> {
        if hash >= self.total_cells() {
            return None;
        }
        let [_, ay, az] = self.amount;
        Some(GridIndex::new(hash / (ay * az), (hash / az) % ay, hash % az))
    }

    /// Cell containing a point, clamped to the grid.
    pub fn cell_coordinates(&self, point: Vec3) -> GridIndex {
        let cell = ((point - self.bounds.min) / self.chunk_size).floor();
        let clamp = |v: f32, n: usize| (v.max(0.0) as usize).min(n - 1);
        GridIndex::new(
            clamp(cell.x, self.amount[0]),
            clamp(cell.y, self.amount[1]),
            clamp(cell.z, self.amount[2]),
        )
    }

    /// Hash of the cell containing a point
    pub fn cell_index(&self, point: Vec3) -> usize {
        let GridIndex { i, j, k } = self.cell_coordinates(point);
        self.hash_value(i, j, k)
    }

    /// Spatial extent of a cell
    pub fn cell_bounds(&self, index: GridIndex) -> BoundingBox {
        let min = self.bounds.min
            + Vec3::new(index.i as f32, index.j as f32, index.k as f32) * self.chunk_size;
        BoundingBox::new(min, min + Vec3::splat(self.chunk_size))
    }

    /// Region covered by all cells
    pub fn extent(&self) -> BoundingBox {
        let cells = Vec3::new(
            self.amount[0] as f32,
            self.amount[1] as f32,
            self.amount[2] as f32,
        );
        BoundingBox::new(self.bounds.min, self.bounds.min + cells * self.chunk_size)
    }

    /// Hashes of all cells overlapping `area`, boundary inclusive, in
    /// ascending order. Empty when the area misses the grid.
    pub fn cells_in_area(&self, area: &BoundingBox) -> Vec<usize> {
        if !area.is_valid() || !area.intersects(&self.extent()) {
            return Vec::new();
        }
        let lo = self.cell_coordinates(area.min);
        let hi = self.cell_coordinates(area.max);

        let mut hashes = Vec::new();
        for i in lo.i..=hi.i {
            for j in lo.j..=hi.j {
                for k in lo.k..=hi.k {
                    hashes.push(self.hash_value(i, j, k));
                }
            }
        }
        hashes
    }
}
