//! Strata chunking - spatially indexed storage for large meshes
//!
//! A mesh is cut into cubic grid cells ("chunks"), each stored as a
//! self-contained [`MeshBuffer`](mesh::MeshBuffer) in a [`ChunkStore`].
//! Queries reassemble the chunks overlapping a bounding box into one mesh.
//!
//! # Architecture
//!
//! - [`MeshChunker`] - Build phase: bounds, grid, face splitting, per-cell builders
//! - [`ChunkManager`] - Query phase: area extraction and chunk access
//! - [`ChunkHashGrid`] - LRU cache of resident chunks keyed by grid hash
//! - [`ChunkGrid`] - Cell coordinates and hash values
//! - [`ChunkStore`] - Persistence, with in-memory and directory implementations

pub mod builder;
pub mod error;
pub mod grid;
pub mod hash_grid;
pub mod manager;
pub mod merge;
pub mod partition;
pub mod split;
pub mod store;

pub use builder::ChunkBuilder;
pub use error::{ChunkError, StoreError};
pub use grid::{ChunkGrid, GridIndex};
pub use hash_grid::ChunkHashGrid;
pub use manager::ChunkManager;
pub use merge::merge_chunks;
pub use partition::{MeshChunker, init_bounding_box};
pub use split::{SplitMaps, VertexSource, cut_large_faces};
pub use store::{ChunkMetadata, ChunkStore, DirectoryChunkStore, METADATA_VERSION, MemoryChunkStore};

pub use strata_config::{ChunkingConfig, MissingChunkPolicy};
