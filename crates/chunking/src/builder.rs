//! Accumulation of one grid cell's geometry into a standalone mesh buffer.

use std::collections::{BTreeMap, HashMap};

use mesh::buffer::{FACE_INDICES, POSITIONS};
use mesh::{Channel, FaceId, HalfEdgeError, HalfEdgeMesh, MeshBuffer, VertexId};

use crate::error::ChunkError;
use crate::split::{SplitMaps, VertexSource};

/// Collects the faces of one chunk and turns them into a [`MeshBuffer`].
///
/// Vertices are deduplicated per chunk by their handle in the split mesh, so
/// a vertex shared by several faces of the chunk is emitted once. Vertices on
/// a chunk border appear in every chunk that uses them.
#[derive(Debug, Clone)]
pub struct ChunkBuilder {
    hash: usize,
    /// Split-mesh vertex -> local index
    original_to_local: HashMap<VertexId, u32>,
    /// Local index -> split-mesh vertex
    vertices: Vec<VertexId>,
    faces: Vec<FaceId>,
}

impl ChunkBuilder {
    pub fn new(hash: usize) -> Self {
        Self {
            hash,
            original_to_local: HashMap::new(),
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Hash of the cell this builder fills
    pub fn hash(&self) -> usize {
        self.hash
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Add a face of the split mesh to this chunk.
    pub fn add_face(&mut self, mesh: &HalfEdgeMesh, face: FaceId) -> Result<(), ChunkError> {
        let corners = mesh
            .get_vertices_of_face(face)
            .ok_or(HalfEdgeError::InvalidFace(face))?;
        for vertex in corners {
            if !self.original_to_local.contains_key(&vertex) {
                self.original_to_local
                    .insert(vertex, self.vertices.len() as u32);
                self.vertices.push(vertex);
            }
        }
        self.faces.push(face);
        Ok(())
    }

    /// Produce the chunk's mesh buffer.
    ///
    /// Every vertex and face channel of `source` is carried over. Positions
    /// come from the split mesh; other vertex channels are copied for input
    /// vertices and blended over the three corners for inserted centroids.
    /// Faces created by splitting copy the face attributes of the face they
    /// replaced.
    pub fn build(
        self,
        source: &MeshBuffer,
        mesh: &HalfEdgeMesh,
        maps: &SplitMaps,
    ) -> Result<MeshBuffer, ChunkError> {
        let positions = self
            .vertices
            .iter()
            .map(|&v| {
                mesh.get_vertex_position(v)
                    .map(|p| p.to_array())
                    .ok_or(HalfEdgeError::InvalidVertex(v))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut triangles = Vec::with_capacity(self.faces.len());
        for &face in &self.faces {
            let corners = mesh
                .get_vertices_of_face(face)
                .ok_or(HalfEdgeError::InvalidFace(face))?;
            triangles.push(corners.map(|v| self.original_to_local[&v]));
        }

        let mut vertex_channels = BTreeMap::new();
        for (name, src) in source.vertex_channels() {
            let channel = if name == POSITIONS {
                Channel::from_vec3(&positions)
            } else {
                let mut channel = src.empty_like();
                for &v in &self.vertices {
                    match maps.vertex_source(v) {
                        VertexSource::Original(original) => {
                            channel.push_from(src, original.0 as usize)?
                        }
                        VertexSource::Centroid(corners) => {
                            channel.push_blend_from(src, &corners.map(|c| c.0 as usize))?
                        }
                    }
                }
                channel
            };
            vertex_channels.insert(name.to_string(), channel);
        }

        let mut face_channels = BTreeMap::new();
        for (name, src) in source.face_channels() {
            let channel = if name == FACE_INDICES {
                Channel::from_triangles(&triangles)
            } else {
                let mut channel = src.empty_like();
                for &face in &self.faces {
                    channel.push_from(src, maps.source_face(face).0 as usize)?;
                }
                channel
            };
            face_channels.insert(name.to_string(), channel);
        }

        tracing::trace!(
            "ChunkBuilder::build: chunk {} with {} vertices, {} faces",
            self.hash,
            self.vertices.len(),
            self.faces.len()
        );
        Ok(MeshBuffer::from_channels(vertex_channels, face_channels)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh::buffer::{COLORS, FACE_MATERIALS};

    fn source() -> MeshBuffer {
        let mut buffer = MeshBuffer::new(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        );
        buffer
            .add_vertex_channel(
                COLORS,
                Channel::uchars(3, vec![0, 0, 0, 30, 30, 30, 60, 60, 60, 90, 90, 90]).unwrap(),
            )
            .unwrap();
        buffer
            .add_face_channel(FACE_MATERIALS, Channel::uints(1, vec![4, 8]).unwrap())
            .unwrap();
        buffer
    }

    #[test]
    fn test_build_dedups_and_reindexes() {
        let source = source();
        let mesh = HalfEdgeMesh::from_buffer(&source).unwrap();
        let maps = SplitMaps::default();

        let mut builder = ChunkBuilder::new(5);
        builder.add_face(&mesh, FaceId(1)).unwrap();
        builder.add_face(&mesh, FaceId(0)).unwrap();
        assert_eq!(builder.num_vertices(), 4);
        assert_eq!(builder.num_faces(), 2);

        let chunk = builder.build(&source, &mesh, &maps).unwrap();
        // Local order follows first use: 0, 2, 3, then 1
        assert_eq!(chunk.face_indices(), &[[0, 1, 2], [0, 3, 1]]);
        assert_eq!(chunk.positions()[3], [1.0, 0.0, 0.0]);
        assert_eq!(
            chunk.vertex_channel(COLORS).unwrap().as_uchars().unwrap(),
            &[0, 0, 0, 60, 60, 60, 90, 90, 90, 30, 30, 30]
        );
        assert_eq!(
            chunk.face_channel(FACE_MATERIALS).unwrap().as_uints().unwrap(),
            &[8, 4]
        );
    }

    #[test]
    fn test_build_interpolates_centroids() {
        let source = source();
        let mut mesh = HalfEdgeMesh::from_buffer(&source).unwrap();
        let mut maps = SplitMaps::default();

        mesh.remove_face(FaceId(0)).unwrap();
        let center = mesh.add_vertex(glam::Vec3::new(2.0 / 3.0, 1.0 / 3.0, 0.0));
        maps.vertex_origins
            .insert(center, [VertexId(0), VertexId(1), VertexId(2)]);
        let fan = mesh.add_face(VertexId(0), VertexId(1), center).unwrap();
        maps.face_origins.insert(fan, FaceId(0));

        let mut builder = ChunkBuilder::new(0);
        builder.add_face(&mesh, fan).unwrap();
        let chunk = builder.build(&source, &mesh, &maps).unwrap();

        assert_eq!(chunk.num_vertices(), 3);
        assert_eq!(
            chunk.vertex_channel(COLORS).unwrap().as_uchars().unwrap(),
            &[0, 0, 0, 30, 30, 30, 30, 30, 30]
        );
        assert_eq!(
            chunk.face_channel(FACE_MATERIALS).unwrap().as_uints().unwrap(),
            &[4]
        );
    }
}
