//! Query phase: area extraction over stored chunks.

use std::sync::Arc;

use mesh::{BoundingBox, MeshBuffer};
use strata_config::{ChunkingConfig, MissingChunkPolicy};

use crate::error::{ChunkError, StoreError};
use crate::grid::{ChunkGrid, checked_cell_count};
use crate::hash_grid::ChunkHashGrid;
use crate::merge::merge_chunks;
use crate::partition::MeshChunker;
use crate::store::{ChunkStore, METADATA_VERSION};

/// Answers spatial queries over a chunked mesh.
///
/// A manager is created either by building chunks from a mesh
/// ([`ChunkManager::build`]) or by opening a store that already holds them
/// ([`ChunkManager::open`]). Queries take `&self`; chunks are loaded lazily
/// through a shared [`ChunkHashGrid`].
#[derive(Debug)]
pub struct ChunkManager<S: ChunkStore> {
    config: ChunkingConfig,
    grid: ChunkGrid,
    /// Ascending hashes of non-empty cells
    occupied: Vec<usize>,
    hash_grid: ChunkHashGrid<S>,
}

impl<S: ChunkStore> ChunkManager<S> {
    /// Chunk `mesh` into `store` and return a manager over the result.
    pub fn build(mesh: &MeshBuffer, config: ChunkingConfig, store: S) -> Result<Self, ChunkError> {
        MeshChunker::new(config, store)?.build(mesh)
    }

    /// Open a store written by an earlier build.
    ///
    /// Only the metadata is read. Chunk size and overlap come from the
    /// metadata; cache size, weld tolerance and the missing chunk policy come
    /// from `config`.
    pub fn open(store: S, config: ChunkingConfig) -> Result<Self, ChunkError> {
        let metadata = store.read_metadata()?;
        if metadata.version != METADATA_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: metadata.version,
                expected: METADATA_VERSION,
            }
            .into());
        }

        let config = ChunkingConfig {
            chunk_size: metadata.chunk_size,
            max_chunk_overlap: metadata.max_chunk_overlap,
            ..config
        };
        config.validate()?;
        metadata
            .bounding_box
            .check()
            .map_err(ChunkError::InvalidBounds)?;

        if metadata.amount.contains(&0) || checked_cell_count(metadata.amount).is_none() {
            return Err(StoreError::InvalidMetadata(format!(
                "grid dimensions {:?} must be positive with an indexable product",
                metadata.amount
            ))
            .into());
        }

        let grid = ChunkGrid::from_parts(metadata.bounding_box, metadata.chunk_size, metadata.amount);
        let mut occupied = metadata.occupied;
        occupied.sort_unstable();
        occupied.dedup();
        if let Some(&last) = occupied.last() {
            if last >= grid.total_cells() {
                return Err(StoreError::InvalidMetadata(format!(
                    "occupied hash {last} outside grid of {:?} cells",
                    grid.amount()
                ))
                .into());
            }
        }

        tracing::debug!(
            "ChunkManager::open: {} occupied of {} cells",
            occupied.len(),
            grid.total_cells()
        );
        let hash_grid = ChunkHashGrid::new(store, config.cache_size);
        Ok(Self::from_parts(config, grid, occupied, hash_grid))
    }

    pub(crate) fn from_parts(
        config: ChunkingConfig,
        grid: ChunkGrid,
        occupied: Vec<usize>,
        hash_grid: ChunkHashGrid<S>,
    ) -> Self {
        Self {
            config,
            grid,
            occupied,
            hash_grid,
        }
    }

    /// Assemble the part of the mesh stored in chunks overlapping `area`.
    ///
    /// Chunks are merged in ascending hash order. The result contains whole
    /// chunks, so it generally extends past `area`. An area missing the grid
    /// yields an empty buffer.
    ///
    /// A chunk that is missing from the store, fails to decode or fails
    /// validation aborts the query under [`MissingChunkPolicy::Strict`] and is
    /// skipped under [`MissingChunkPolicy::BestEffort`]. Chunks whose channel
    /// sets disagree are always an error.
    pub fn extract_area(&self, area: &BoundingBox) -> Result<MeshBuffer, ChunkError> {
        area.check().map_err(ChunkError::InvalidArea)?;

        let hashes: Vec<usize> = self
            .grid
            .cells_in_area(area)
            .into_iter()
            .filter(|hash| self.is_occupied(*hash))
            .collect();

        let best_effort = self.config.missing_chunk_policy == MissingChunkPolicy::BestEffort;
        let mut chunks: Vec<(usize, Arc<MeshBuffer>)> = Vec::with_capacity(hashes.len());
        for hash in hashes {
            let loaded = self.hash_grid.get(hash).and_then(|chunk| {
                chunk
                    .validate()
                    .map_err(|source| ChunkError::MalformedChunk { hash, source })?;
                Ok(chunk)
            });
            match loaded {
                Ok(chunk) => chunks.push((hash, chunk)),
                Err(e @ (ChunkError::Store(_) | ChunkError::MalformedChunk { .. }))
                    if best_effort =>
                {
                    tracing::warn!("extract_area: skipping chunk {}: {}", hash, e);
                }
                Err(e) => return Err(e),
            }
        }

        let merged = merge_chunks(&chunks, self.config.weld_tolerance)?;
        tracing::debug!(
            "extract_area: {} chunks -> {} vertices, {} faces",
            chunks.len(),
            merged.num_vertices(),
            merged.num_faces()
        );
        Ok(merged)
    }

    /// Make every occupied chunk resident, regardless of cache size.
    pub fn load_all_chunks(&self) -> Result<(), ChunkError> {
        self.hash_grid.load_all(&self.occupied)
    }

    /// Chunk stored for a cell, or `None` if the cell is empty.
    pub fn get_chunk(&self, hash: usize) -> Result<Option<Arc<MeshBuffer>>, ChunkError> {
        if !self.is_occupied(hash) {
            return Ok(None);
        }
        self.hash_grid.get(hash).map(Some)
    }

    pub fn is_occupied(&self, hash: usize) -> bool {
        self.occupied.binary_search(&hash).is_ok()
    }

    /// See [`ChunkGrid::hash_value`]
    pub fn hash_value(&self, i: usize, j: usize, k: usize) -> usize {
        self.grid.hash_value(i, j, k)
    }

    pub fn grid(&self) -> &ChunkGrid {
        &self.grid
    }

    /// Bounds of the mesh the chunks were built from
    pub fn bounding_box(&self) -> &BoundingBox {
        self.grid.bounds()
    }

    pub fn chunk_size(&self) -> f32 {
        self.grid.chunk_size()
    }

    /// Cells per axis
    pub fn amount(&self) -> [usize; 3] {
        self.grid.amount()
    }

    pub fn occupied_hashes(&self) -> &[usize] {
        &self.occupied
    }

    pub fn resident_count(&self) -> usize {
        self.hash_grid.resident_count()
    }

    pub fn cache_size(&self) -> usize {
        self.hash_grid.cache_size()
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        self.hash_grid.store()
    }
}
