//! Persistent chunk storage.
//!
//! A [`ChunkStore`] holds the authoritative copy of every chunk plus the
//! metadata needed to reopen a chunked mesh. Two implementations ship with
//! the crate:
//! - [`MemoryChunkStore`] - maps behind a `RwLock`, for tests and short-lived use
//! - [`DirectoryChunkStore`] - `metadata.json` plus one bincode blob per chunk

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use mesh::{BoundingBox, MeshBuffer};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Current on-disk metadata format
pub const METADATA_VERSION: u32 = 1;

const METADATA_FILE: &str = "metadata.json";
const CHUNK_DIR: &str = "chunks";

/// Everything needed to reopen a chunked mesh without its chunks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub version: u32,
    pub chunk_size: f32,
    pub max_chunk_overlap: f32,
    /// Cells per axis
    pub amount: [usize; 3],
    pub bounding_box: BoundingBox,
    /// Hashes of non-empty cells, ascending
    pub occupied: Vec<usize>,
}

/// Backing store for chunks and their metadata.
///
/// Methods take `&self` so a store can be shared by concurrent readers;
/// implementations synchronise internally.
pub trait ChunkStore: Send + Sync {
    fn read_metadata(&self) -> Result<ChunkMetadata, StoreError>;

    fn write_metadata(&self, metadata: &ChunkMetadata) -> Result<(), StoreError>;

    /// Read a chunk, failing with [`StoreError::NotFound`] if it was never written.
    fn read_chunk(&self, hash: usize) -> Result<MeshBuffer, StoreError>;

    fn write_chunk(&self, hash: usize, chunk: &MeshBuffer) -> Result<(), StoreError>;
}

impl<S: ChunkStore + ?Sized> ChunkStore for Arc<S> {
    fn read_metadata(&self) -> Result<ChunkMetadata, StoreError> {
        (**self).read_metadata()
    }

    fn write_metadata(&self, metadata: &ChunkMetadata) -> Result<(), StoreError> {
        (**self).write_metadata(metadata)
    }

    fn read_chunk(&self, hash: usize) -> Result<MeshBuffer, StoreError> {
        (**self).read_chunk(hash)
    }

    fn write_chunk(&self, hash: usize, chunk: &MeshBuffer) -> Result<(), StoreError> {
        (**self).write_chunk(hash, chunk)
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Chunk store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryChunkStore {
    metadata: RwLock<Option<ChunkMetadata>>,
    chunks: RwLock<HashMap<usize, MeshBuffer>>,
    reads: AtomicUsize,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `read_chunk` calls so far
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.read().expect("chunk store lock poisoned").len()
    }

    /// Delete a stored chunk
    pub fn remove_chunk(&self, hash: usize) -> Option<MeshBuffer> {
        self.chunks
            .write()
            .expect("chunk store lock poisoned")
            .remove(&hash)
    }
}

impl ChunkStore for MemoryChunkStore {
    fn read_metadata(&self) -> Result<ChunkMetadata, StoreError> {
        self.metadata
            .read()
            .expect("chunk store lock poisoned")
            .clone()
            .ok_or(StoreError::MissingMetadata)
    }

    fn write_metadata(&self, metadata: &ChunkMetadata) -> Result<(), StoreError> {
        *self.metadata.write().expect("chunk store lock poisoned") = Some(metadata.clone());
        Ok(())
    }

    fn read_chunk(&self, hash: usize) -> Result<MeshBuffer, StoreError> {
        let chunk = self
            .chunks
            .read()
            .expect("chunk store lock poisoned")
            .get(&hash)
            .cloned()
            .ok_or(StoreError::NotFound(hash))?;
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(chunk)
    }

    fn write_chunk(&self, hash: usize, chunk: &MeshBuffer) -> Result<(), StoreError> {
        self.chunks
            .write()
            .expect("chunk store lock poisoned")
            .insert(hash, chunk.clone());
        Ok(())
    }
}

// ============================================================================
// Directory store
// ============================================================================

/// Chunk store in a directory:
///
/// ```text
/// <root>/metadata.json
/// <root>/chunks/<hash>.chunk
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryChunkStore {
    root: PathBuf,
}

impl DirectoryChunkStore {
    /// Use `root` as a store, creating the directory layout if needed.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(root.join(CHUNK_DIR))?;
        tracing::debug!("DirectoryChunkStore::create: {}", root.display());
        Ok(Self { root })
    }

    /// Use an existing store directory. Nothing is read until first access.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    fn chunk_path(&self, hash: usize) -> PathBuf {
        self.root.join(CHUNK_DIR).join(format!("{hash}.chunk"))
    }
}

impl ChunkStore for DirectoryChunkStore {
    fn read_metadata(&self) -> Result<ChunkMetadata, StoreError> {
        let bytes = match fs::read(self.metadata_path()) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::MissingMetadata),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_metadata(&self, metadata: &ChunkMetadata) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(metadata)?;
        fs::write(self.metadata_path(), json)?;
        Ok(())
    }

    fn read_chunk(&self, hash: usize) -> Result<MeshBuffer, StoreError> {
        let bytes = match fs::read(self.chunk_path(hash)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound(hash)),
            Err(e) => return Err(e.into()),
        };
        Ok(bincode::deserialize(&bytes)?)
    }

    fn write_chunk(&self, hash: usize, chunk: &MeshBuffer) -> Result<(), StoreError> {
        let bytes = bincode::serialize(chunk)?;
        fs::write(self.chunk_path(hash), &bytes)?;
        tracing::trace!("write_chunk: {} ({} bytes)", hash, bytes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn metadata() -> ChunkMetadata {
        ChunkMetadata {
            version: METADATA_VERSION,
            chunk_size: 2.5,
            max_chunk_overlap: 0.1,
            amount: [2, 1, 3],
            bounding_box: BoundingBox::new(Vec3::ZERO, Vec3::new(5.0, 1.0, 7.5)),
            occupied: vec![0, 4, 5],
        }
    }

    fn chunk() -> MeshBuffer {
        MeshBuffer::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.5]],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryChunkStore::new();
        assert!(matches!(store.read_metadata(), Err(StoreError::MissingMetadata)));
        assert!(matches!(store.read_chunk(3), Err(StoreError::NotFound(3))));

        store.write_metadata(&metadata()).unwrap();
        store.write_chunk(3, &chunk()).unwrap();
        assert_eq!(store.read_metadata().unwrap(), metadata());
        assert_eq!(store.read_chunk(3).unwrap(), chunk());
        assert_eq!(store.read_count(), 1);
        assert_eq!(store.chunk_count(), 1);

        assert!(store.remove_chunk(3).is_some());
        assert!(store.read_chunk(3).is_err());
    }

    #[test]
    fn test_directory_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryChunkStore::create(dir.path().join("store")).unwrap();
        assert!(matches!(store.read_metadata(), Err(StoreError::MissingMetadata)));
        assert!(matches!(store.read_chunk(0), Err(StoreError::NotFound(0))));

        store.write_metadata(&metadata()).unwrap();
        store.write_chunk(4, &chunk()).unwrap();

        let reopened = DirectoryChunkStore::open(store.root());
        assert_eq!(reopened.read_metadata().unwrap(), metadata());
        assert_eq!(reopened.read_chunk(4).unwrap(), chunk());
        assert!(dir.path().join("store/chunks/4.chunk").exists());
    }

    #[test]
    fn test_directory_store_corrupt_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryChunkStore::create(dir.path()).unwrap();
        fs::write(dir.path().join("chunks/1.chunk"), b"not a chunk").unwrap();
        assert!(matches!(store.read_chunk(1), Err(StoreError::Bincode(_))));
    }
}
