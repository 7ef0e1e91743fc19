//! Capacity-bounded chunk cache in front of a [`ChunkStore`].

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use mesh::MeshBuffer;

use crate::error::ChunkError;
use crate::store::ChunkStore;

struct Resident {
    chunk: Arc<MeshBuffer>,
    last_used: u64,
}

#[derive(Default)]
struct CacheState {
    resident: HashMap<usize, Resident>,
    /// Access tick -> hash, oldest first
    lru: BTreeMap<u64, usize>,
    tick: u64,
}

impl CacheState {
    fn touch(&mut self, hash: usize) -> Option<Arc<MeshBuffer>> {
        self.tick += 1;
        let tick = self.tick;
        let entry = self.resident.get_mut(&hash)?;
        self.lru.remove(&entry.last_used);
        entry.last_used = tick;
        self.lru.insert(tick, hash);
        Some(Arc::clone(&entry.chunk))
    }

    fn insert(&mut self, hash: usize, chunk: Arc<MeshBuffer>) {
        self.tick += 1;
        if let Some(old) = self.resident.insert(
            hash,
            Resident {
                chunk,
                last_used: self.tick,
            },
        ) {
            self.lru.remove(&old.last_used);
        }
        self.lru.insert(self.tick, hash);
    }

    /// Evict least recently used entries until `capacity - 1` remain.
    fn make_room(&mut self, capacity: usize) {
        while self.resident.len() >= capacity {
            let Some((_, victim)) = self.lru.pop_first() else {
                break;
            };
            self.resident.remove(&victim);
            tracing::trace!("ChunkHashGrid: evicted chunk {}", victim);
        }
    }
}

/// Chunk cache keyed by grid hash value.
///
/// At most `cache_size` chunks stay resident; loading a chunk into a full
/// cache evicts the least recently used one. Eviction only drops the
/// in-memory copy: the store stays authoritative. Chunks are handed out as
/// `Arc`s, so an evicted chunk stays alive for callers still holding it.
///
/// A `cache_size` of zero keeps nothing resident and reloads on every access.
pub struct ChunkHashGrid<S> {
    store: S,
    cache_size: usize,
    state: Mutex<CacheState>,
}

impl<S: ChunkStore> std::fmt::Debug for ChunkHashGrid<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let resident = self.state.lock().map(|s| s.resident.len()).unwrap_or(0);
        f.debug_struct("ChunkHashGrid")
            .field("cache_size", &self.cache_size)
            .field("resident", &resident)
            .finish()
    }
}

impl<S: ChunkStore> ChunkHashGrid<S> {
    pub fn new(store: S, cache_size: usize) -> Self {
        Self {
            store,
            cache_size,
            state: Mutex::new(CacheState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().expect("chunk cache lock poisoned")
    }

    /// Get a chunk, loading it from the store on a miss.
    ///
    /// The store read happens without holding the cache lock. If another
    /// thread inserts the same chunk meanwhile, its copy wins and is returned.
    pub fn get(&self, hash: usize) -> Result<Arc<MeshBuffer>, ChunkError> {
        if let Some(chunk) = self.lock().touch(hash) {
            return Ok(chunk);
        }

        let loaded = Arc::new(self.store.read_chunk(hash)?);
        tracing::trace!("ChunkHashGrid::get: loaded chunk {}", hash);

        if self.cache_size == 0 {
            return Ok(loaded);
        }
        let mut state = self.lock();
        if let Some(existing) = state.touch(hash) {
            return Ok(existing);
        }
        state.make_room(self.cache_size);
        state.insert(hash, Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Write a chunk through to the store and keep it resident.
    pub fn put(&self, hash: usize, chunk: MeshBuffer) -> Result<Arc<MeshBuffer>, ChunkError> {
        self.store.write_chunk(hash, &chunk)?;
        let chunk = Arc::new(chunk);
        if self.cache_size > 0 {
            let mut state = self.lock();
            if !state.resident.contains_key(&hash) {
                state.make_room(self.cache_size);
            }
            state.insert(hash, Arc::clone(&chunk));
        }
        Ok(chunk)
    }

    /// Make every listed chunk resident, ignoring the capacity.
    ///
    /// The cache shrinks back to `cache_size` as later misses evict.
    pub fn load_all(&self, hashes: &[usize]) -> Result<(), ChunkError> {
        for &hash in hashes {
            if self.is_resident(hash) {
                continue;
            }
            let loaded = Arc::new(self.store.read_chunk(hash)?);
            let mut state = self.lock();
            if state.touch(hash).is_none() {
                state.insert(hash, loaded);
            }
        }
        tracing::debug!(
            "ChunkHashGrid::load_all: {} chunks resident",
            self.resident_count()
        );
        Ok(())
    }

    pub fn is_resident(&self, hash: usize) -> bool {
        self.lock().resident.contains_key(&hash)
    }

    pub fn resident_count(&self) -> usize {
        self.lock().resident.len()
    }

    /// Resident hashes, least recently used first
    pub fn resident_hashes(&self) -> Vec<usize> {
        self.lock().lru.values().copied().collect()
    }

    pub fn cache_size(&self) -> usize {
        self.cache_size
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryChunkStore;

    fn store_with_chunks(count: usize) -> Arc<MemoryChunkStore> {
        let store = Arc::new(MemoryChunkStore::new());
        for hash in 0..count {
            let x = hash as f32;
            let chunk = MeshBuffer::new(
                vec![[x, 0.0, 0.0], [x + 1.0, 0.0, 0.0], [x, 1.0, 0.0]],
                vec![[0, 1, 2]],
            );
            store.write_chunk(hash, &chunk).unwrap();
        }
        store
    }

    #[test]
    fn test_hit_does_not_reload() {
        let store = store_with_chunks(2);
        let grid = ChunkHashGrid::new(Arc::clone(&store), 4);

        let first = grid.get(1).unwrap();
        let second = grid.get(1).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.read_count(), 1);
        assert_eq!(first.positions()[0], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_lru_eviction_order() {
        let store = store_with_chunks(4);
        let grid = ChunkHashGrid::new(Arc::clone(&store), 2);

        grid.get(0).unwrap();
        grid.get(1).unwrap();
        grid.get(0).unwrap(); // 1 is now least recently used
        grid.get(2).unwrap();

        assert_eq!(grid.resident_count(), 2);
        assert!(grid.is_resident(0));
        assert!(!grid.is_resident(1));
        assert!(grid.is_resident(2));
        assert_eq!(grid.resident_hashes(), vec![0, 2]);

        // Reloading the victim goes back to the store
        grid.get(1).unwrap();
        assert_eq!(store.read_count(), 4);
        assert!(!grid.is_resident(0));
    }

    #[test]
    fn test_zero_capacity_always_reloads() {
        let store = store_with_chunks(1);
        let grid = ChunkHashGrid::new(Arc::clone(&store), 0);
        grid.get(0).unwrap();
        grid.get(0).unwrap();
        assert_eq!(store.read_count(), 2);
        assert_eq!(grid.resident_count(), 0);
    }

    #[test]
    fn test_put_writes_through() {
        let store = Arc::new(MemoryChunkStore::new());
        let grid = ChunkHashGrid::new(Arc::clone(&store), 1);
        let chunk = MeshBuffer::new(vec![[0.0; 3]; 3], vec![[0, 1, 2]]);

        grid.put(7, chunk.clone()).unwrap();
        grid.put(8, chunk.clone()).unwrap();
        assert_eq!(store.chunk_count(), 2);
        assert_eq!(grid.resident_hashes(), vec![8]);
        assert_eq!(*grid.get(7).unwrap(), chunk);
    }

    #[test]
    fn test_load_all_ignores_capacity() {
        let store = store_with_chunks(5);
        let grid = ChunkHashGrid::new(Arc::clone(&store), 2);
        grid.load_all(&[0, 1, 2, 3, 4]).unwrap();
        assert_eq!(grid.resident_count(), 5);
        assert!(grid.get(4).is_ok());
        assert_eq!(store.read_count(), 5);

        // Loading an already resident chunk is a no-op
        grid.load_all(&[1]).unwrap();
        assert_eq!(store.read_count(), 5);
    }

    #[test]
    fn test_missing_chunk() {
        let grid = ChunkHashGrid::new(MemoryChunkStore::new(), 2);
        assert!(matches!(
            grid.get(3),
            Err(ChunkError::Store(crate::error::StoreError::NotFound(3)))
        ));
        assert_eq!(grid.resident_count(), 0);
    }
}
