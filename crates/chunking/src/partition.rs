//! Build phase: partitioning a mesh into grid chunks.

use std::collections::BTreeMap;

use mesh::{BoundingBox, HalfEdgeError, HalfEdgeMesh, MeshBuffer};
use strata_config::ChunkingConfig;

use crate::builder::ChunkBuilder;
use crate::error::ChunkError;
use crate::grid::ChunkGrid;
use crate::hash_grid::ChunkHashGrid;
use crate::manager::ChunkManager;
use crate::split::cut_large_faces;
use crate::store::{ChunkMetadata, ChunkStore, METADATA_VERSION};

/// Splits a mesh into chunks and writes them to a store.
///
/// Consumed by [`MeshChunker::build`], which returns the [`ChunkManager`]
/// used to query the chunks.
#[derive(Debug)]
pub struct MeshChunker<S> {
    config: ChunkingConfig,
    store: S,
}

impl<S: ChunkStore> MeshChunker<S> {
    pub fn new(config: ChunkingConfig, store: S) -> Result<Self, ChunkError> {
        config.validate()?;
        Ok(Self { config, store })
    }

    /// Partition `mesh`, persist every non-empty chunk and the metadata.
    ///
    /// 1. Bound all vertices and lay a grid of `chunk_size` cells over them
    /// 2. Split faces reaching too far across cell borders
    /// 3. Assign every face to the cell containing its centroid
    /// 4. Build one buffer per occupied cell and write it through the cache
    pub fn build(self, mesh: &MeshBuffer) -> Result<ChunkManager<S>, ChunkError> {
        mesh.validate()?;
        if mesh.num_vertices() == 0 {
            return Err(ChunkError::EmptyMesh);
        }

        let bounds = init_bounding_box(mesh)?;
        let grid = ChunkGrid::from_bounds(bounds, self.config.chunk_size)?;

        let mut half_edge_mesh = HalfEdgeMesh::from_buffer(mesh)?;
        let maps = cut_large_faces(
            &mut half_edge_mesh,
            &grid,
            self.config.max_chunk_overlap,
        )?;

        let mut builders: BTreeMap<usize, ChunkBuilder> = BTreeMap::new();
        for face in half_edge_mesh.face_ids() {
            let centroid = half_edge_mesh
                .get_face_centroid(face)
                .ok_or(HalfEdgeError::InvalidFace(face))?;
            let hash = grid.cell_index(centroid);
            builders
                .entry(hash)
                .or_insert_with(|| ChunkBuilder::new(hash))
                .add_face(&half_edge_mesh, face)?;
        }

        let hash_grid = ChunkHashGrid::new(self.store, self.config.cache_size);
        let mut occupied = Vec::with_capacity(builders.len());
        for (hash, builder) in builders {
            let chunk = builder.build(mesh, &half_edge_mesh, &maps)?;
            hash_grid.put(hash, chunk)?;
            occupied.push(hash);
        }

        let metadata = ChunkMetadata {
            version: METADATA_VERSION,
            chunk_size: self.config.chunk_size,
            max_chunk_overlap: self.config.max_chunk_overlap,
            amount: grid.amount(),
            bounding_box: bounds,
            occupied,
        };
        hash_grid.store().write_metadata(&metadata)?;

        tracing::info!(
            "MeshChunker::build: {} faces into {} of {} cells ({} split)",
            mesh.num_faces(),
            metadata.occupied.len(),
            grid.total_cells(),
            maps.split_count()
        );
        Ok(ChunkManager::from_parts(
            self.config,
            grid,
            metadata.occupied,
            hash_grid,
        ))
    }
}

/// Bounding box over every vertex of the input, referenced or not
pub fn init_bounding_box(mesh: &MeshBuffer) -> Result<BoundingBox, ChunkError> {
    let bounds = mesh.bounding_box();
    bounds.check().map_err(ChunkError::InvalidBounds)?;
    Ok(bounds)
}
