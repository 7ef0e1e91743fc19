//! Merging of chunks into one mesh buffer.
//!
//! Chunks share the vertices on their borders. Each chunk stores its own
//! copy of such a vertex, so merging welds vertices of a later chunk onto
//! vertices already emitted by an earlier chunk at the same position.

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec3;
use mesh::buffer::{FACE_INDICES, empty_channels_like, push_triangle};
use mesh::{Channel, MeshBuffer, MeshBufferError};

use crate::error::ChunkError;

/// Spatial hash of the vertices emitted by earlier chunks.
///
/// With a zero tolerance a vertex welds only to a bit-identical position
/// (`-0.0` and `0.0` are equal). Otherwise positions are bucketed into cubes
/// of edge `tolerance` and a vertex welds to the nearest earlier vertex
/// within that Euclidean distance, searching its own and the 26 adjacent
/// cubes.
struct Welder {
    tolerance: f32,
    cells: HashMap<[i64; 3], Vec<(u32, Vec3)>>,
}

impl Welder {
    fn new(tolerance: f32) -> Self {
        Self {
            tolerance,
            cells: HashMap::new(),
        }
    }

    fn key(&self, position: Vec3) -> [i64; 3] {
        if self.tolerance > 0.0 {
            (position / self.tolerance).floor().to_array().map(|c| c as i64)
        } else {
            position
                .to_array()
                .map(|c| if c == 0.0 { 0i64 } else { c.to_bits() as i64 })
        }
    }

    fn find(&self, position: Vec3) -> Option<u32> {
        let key = self.key(position);
        if self.tolerance <= 0.0 {
            return self.cells.get(&key).and_then(|v| v.first()).map(|&(i, _)| i);
        }

        let mut best: Option<(f32, u32)> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let neighbour = [
                        key[0].saturating_add(dx),
                        key[1].saturating_add(dy),
                        key[2].saturating_add(dz),
                    ];
                    for &(index, other) in self.cells.get(&neighbour).into_iter().flatten() {
                        let distance = position.distance(other);
                        if distance <= self.tolerance
                            && best.is_none_or(|(d, i)| (distance, index) < (d, i))
                        {
                            best = Some((distance, index));
                        }
                    }
                }
            }
        }
        best.map(|(_, index)| index)
    }

    fn insert(&mut self, position: Vec3, index: u32) {
        let key = self.key(position);
        self.cells.entry(key).or_default().push((index, position));
    }
}

/// Channel names with their layouts, used to check chunks agree
fn channel_signature(buffer: &MeshBuffer) -> Vec<String> {
    let describe = |kind: &str, name: &str, channel: &Channel| {
        format!(
            "{kind}/{name}: {:?} x {}",
            channel.element_type(),
            channel.width()
        )
    };
    buffer
        .vertex_channels()
        .map(|(name, c)| describe("vertex", name, c))
        .chain(buffer.face_channels().map(|(name, c)| describe("face", name, c)))
        .collect()
}

/// Merge chunks in the given order.
///
/// Every chunk must carry the same set of channels with the same layouts.
/// A vertex is welded only to vertices from earlier chunks, never to one of
/// its own chunk. With `weld_tolerance == 0` positions must be bit-identical;
/// otherwise a vertex welds to the nearest earlier vertex no further than
/// `weld_tolerance` away.
pub fn merge_chunks(
    chunks: &[(usize, Arc<MeshBuffer>)],
    weld_tolerance: f32,
) -> Result<MeshBuffer, ChunkError> {
    let Some((_, first)) = chunks.first() else {
        return Ok(MeshBuffer::default());
    };

    let expected = channel_signature(first);
    let (mut vertex_channels, mut face_channels) = empty_channels_like(first);

    let mut welder = Welder::new(weld_tolerance);
    let mut emitted = 0u32;
    let mut welded_count = 0usize;

    for (hash, chunk) in chunks {
        let hash = *hash;
        chunk
            .validate()
            .map_err(|source| ChunkError::MalformedChunk { hash, source })?;
        let found = channel_signature(chunk);
        if found != expected {
            return Err(ChunkError::InconsistentChannels {
                hash,
                expected,
                found,
            });
        }

        let mut local_to_merged = Vec::with_capacity(chunk.num_vertices());
        let mut pending = Vec::new();
        for (local, position) in chunk.positions().iter().enumerate() {
            let position = Vec3::from_array(*position);
            if let Some(merged) = welder.find(position) {
                local_to_merged.push(merged);
                welded_count += 1;
                continue;
            }
            for (name, channel) in vertex_channels.iter_mut() {
                let src = chunk
                    .vertex_channel(name)
                    .ok_or_else(|| MeshBufferError::MissingChannel(name.clone()))?;
                channel.push_from(src, local)?;
            }
            local_to_merged.push(emitted);
            pending.push((position, emitted));
            emitted += 1;
        }
        for (position, merged) in pending {
            welder.insert(position, merged);
        }

        for (face, triangle) in chunk.face_indices().iter().enumerate() {
            for (name, channel) in face_channels.iter_mut() {
                if name == FACE_INDICES {
                    push_triangle(channel, triangle.map(|v| local_to_merged[v as usize]))?;
                } else {
                    let src = chunk
                        .face_channel(name)
                        .ok_or_else(|| MeshBufferError::MissingChannel(name.clone()))?;
                    channel.push_from(src, face)?;
                }
            }
        }
    }

    tracing::debug!(
        "merge_chunks: {} chunks -> {} vertices ({} welded)",
        chunks.len(),
        emitted,
        welded_count
    );
    Ok(MeshBuffer::from_channels(vertex_channels, face_channels)?)
}
