//! Shared configuration for Strata
//!
//! This crate provides the single source of truth for chunk sizing, the
//! allowed overlap across chunk borders, cache capacity, and the knobs used
//! when chunks are merged back into one mesh.

use serde::{Deserialize, Serialize};

/// Default chunk edge length in mesh units
pub const DEFAULT_CHUNK_SIZE: f32 = 10.0;

/// Default allowed overlap across a chunk border, relative to the chunk size
pub const DEFAULT_MAX_CHUNK_OVERLAP: f32 = 0.1;

/// Default number of chunks kept resident by the chunk cache
pub const DEFAULT_CACHE_SIZE: usize = 200;

/// Default weld tolerance when merging chunks (0.0 = exact position match)
pub const DEFAULT_WELD_TOLERANCE: f32 = 0.0;

/// What an area query does when a chunk listed in the metadata is missing or
/// corrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingChunkPolicy {
    /// Abort the whole query with an error.
    #[default]
    Strict,
    /// Skip the bad chunk and log a warning. The result is lossy.
    BestEffort,
}

/// Errors reported by [`ChunkingConfig::validate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("chunk size must be positive and finite, got {0}")]
    InvalidChunkSize(f32),
    #[error("max chunk overlap must be non-negative and finite, got {0}")]
    InvalidOverlap(f32),
    #[error("weld tolerance must be non-negative and finite, got {0}")]
    InvalidWeldTolerance(f32),
}

/// Configuration for chunking a mesh and querying the resulting chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Edge length of a cubic chunk, in mesh units
    pub chunk_size: f32,
    /// Maximum overlap of a face across a chunk border, as a fraction of
    /// `chunk_size`. Faces reaching further are split.
    pub max_chunk_overlap: f32,
    /// Maximum number of chunks resident in memory. Zero disables caching.
    pub cache_size: usize,
    /// Distance under which seam vertices of different chunks are welded
    /// during area extraction. Zero requires bit-identical positions.
    pub weld_tolerance: f32,
    /// Behaviour when a chunk is missing or corrupt during area extraction
    pub missing_chunk_policy: MissingChunkPolicy,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_chunk_overlap: DEFAULT_MAX_CHUNK_OVERLAP,
            cache_size: DEFAULT_CACHE_SIZE,
            weld_tolerance: DEFAULT_WELD_TOLERANCE,
            missing_chunk_policy: MissingChunkPolicy::default(),
        }
    }
}

impl ChunkingConfig {
    /// Create a config with the given chunk size and overlap, other fields default
    pub fn new(chunk_size: f32, max_chunk_overlap: f32) -> Self {
        Self {
            chunk_size,
            max_chunk_overlap,
            ..Self::default()
        }
    }

    /// Builder-style setter for the cache capacity
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    /// Builder-style setter for the weld tolerance
    pub fn with_weld_tolerance(mut self, weld_tolerance: f32) -> Self {
        self.weld_tolerance = weld_tolerance;
        self
    }

    /// Builder-style setter for the missing chunk policy
    pub fn with_missing_chunk_policy(mut self, policy: MissingChunkPolicy) -> Self {
        self.missing_chunk_policy = policy;
        self
    }

    /// Absolute overlap distance in mesh units
    pub fn overlap_distance(&self) -> f32 {
        self.chunk_size * self.max_chunk_overlap
    }

    /// Check that all values are usable.
    ///
    /// A cache size of zero is accepted: it means every chunk access reloads
    /// from the store.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.chunk_size.is_finite() && self.chunk_size > 0.0) {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }
        if !(self.max_chunk_overlap.is_finite() && self.max_chunk_overlap >= 0.0) {
            return Err(ConfigError::InvalidOverlap(self.max_chunk_overlap));
        }
        if !(self.weld_tolerance.is_finite() && self.weld_tolerance >= 0.0) {
            return Err(ConfigError::InvalidWeldTolerance(self.weld_tolerance));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChunkingConfig::default();
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.max_chunk_overlap, DEFAULT_MAX_CHUNK_OVERLAP);
        assert_eq!(config.cache_size, DEFAULT_CACHE_SIZE);
        assert_eq!(config.missing_chunk_policy, MissingChunkPolicy::Strict);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlap_distance() {
        let config = ChunkingConfig::new(10.0, 0.01);
        assert!((config.overlap_distance() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert_eq!(
            ChunkingConfig::new(0.0, 0.1).validate(),
            Err(ConfigError::InvalidChunkSize(0.0))
        );
        assert_eq!(
            ChunkingConfig::new(1.0, -0.5).validate(),
            Err(ConfigError::InvalidOverlap(-0.5))
        );
        assert!(
            ChunkingConfig::new(1.0, 0.1)
                .with_weld_tolerance(f32::NAN)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_zero_cache_is_valid() {
        let config = ChunkingConfig::default().with_cache_size(0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ChunkingConfig =
            serde_json::from_str(r#"{ "chunk_size": 2.5, "missing_chunk_policy": "best_effort" }"#)
                .unwrap();
        assert_eq!(config.chunk_size, 2.5);
        assert_eq!(config.cache_size, DEFAULT_CACHE_SIZE);
        assert_eq!(config.missing_chunk_policy, MissingChunkPolicy::BestEffort);
    }
}
