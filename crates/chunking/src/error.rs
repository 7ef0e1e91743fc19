//! Error types for chunk building, storage and queries.

use mesh::{BoundsError, HalfEdgeError, MeshBufferError};
use strata_config::ConfigError;

/// Errors reported by a [`crate::ChunkStore`]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("chunk {0} not found in store")]
    NotFound(usize),
    #[error("store has no chunk metadata")]
    MissingMetadata,
    #[error("invalid chunk metadata: {0}")]
    InvalidMetadata(String),
    #[error("unsupported metadata version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("metadata serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("chunk serialization failed: {0}")]
    Bincode(#[from] bincode::Error),
}

/// Errors reported while building or querying chunks
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid query area: {0}")]
    InvalidArea(#[source] BoundsError),
    #[error("invalid mesh bounds: {0}")]
    InvalidBounds(#[source] BoundsError),
    #[error("input mesh has no vertices")]
    EmptyMesh,
    #[error("grid of {cells:?} cells of size {chunk_size} is too large to index")]
    GridTooLarge { cells: [f32; 3], chunk_size: f32 },
    #[error("grid index ({i}, {j}, {k}) outside grid of {amount:?} cells")]
    GridIndexOutOfRange {
        i: usize,
        j: usize,
        k: usize,
        amount: [usize; 3],
    },
    #[error("chunk {hash} has channels {found:?}, expected {expected:?}")]
    InconsistentChannels {
        hash: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("chunk {hash} is malformed: {source}")]
    MalformedChunk {
        hash: usize,
        #[source]
        source: MeshBufferError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Mesh(#[from] HalfEdgeError),
    #[error(transparent)]
    Buffer(#[from] MeshBufferError),
}
