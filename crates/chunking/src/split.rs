//! Splitting of faces that reach too far across chunk borders.

use std::collections::HashMap;

use glam::Vec3;
use mesh::{FaceId, HalfEdgeError, HalfEdgeMesh, VertexId};

use crate::error::ChunkError;
use crate::grid::ChunkGrid;

/// Where a vertex of the split mesh gets its attributes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexSource {
    /// Vertex of the input mesh
    Original(VertexId),
    /// Centroid inserted between three input vertices
    Centroid([VertexId; 3]),
}

/// Provenance of the vertices and faces created by [`cut_large_faces`].
#[derive(Debug, Clone, Default)]
pub struct SplitMaps {
    /// New vertex -> the three corners of the face it was inserted into
    pub vertex_origins: HashMap<VertexId, [VertexId; 3]>,
    /// New face -> the face it replaced
    pub face_origins: HashMap<FaceId, FaceId>,
}

impl SplitMaps {
    pub fn vertex_source(&self, vertex: VertexId) -> VertexSource {
        match self.vertex_origins.get(&vertex) {
            Some(&corners) => VertexSource::Centroid(corners),
            None => VertexSource::Original(vertex),
        }
    }

    /// Input face a face of the split mesh descends from
    pub fn source_face(&self, face: FaceId) -> FaceId {
        self.face_origins.get(&face).copied().unwrap_or(face)
    }

    /// Number of faces that were split
    pub fn split_count(&self) -> usize {
        self.vertex_origins.len()
    }
}

/// Split every face that does not fit its chunk.
///
/// A face fits when all three corners lie inside the cell containing its
/// centroid, grown by `overlap_ratio * chunk_size` on every side. A face that
/// does not fit is replaced by a fan of three triangles around its centroid;
/// each fan triangle is later assigned to the cell of its own centroid.
///
/// Splitting is a single pass: a fan triangle may itself still reach beyond
/// the allowed overlap when the original face spans several cells.
pub fn cut_large_faces(
    mesh: &mut HalfEdgeMesh,
    grid: &ChunkGrid,
    overlap_ratio: f32,
) -> Result<SplitMaps, ChunkError> {
    let overlap = overlap_ratio * grid.chunk_size();
    let mut maps = SplitMaps::default();

    let faces: Vec<FaceId> = mesh.face_ids().collect();
    for face in faces {
        let positions = mesh
            .get_vertex_positions_of_face(face)
            .ok_or(HalfEdgeError::InvalidFace(face))?;
        let centroid = positions.iter().copied().sum::<Vec3>() / 3.0;
        let allowed = grid
            .cell_bounds(grid.cell_coordinates(centroid))
            .expanded(overlap);
        if positions.iter().all(|p| allowed.contains_point(*p)) {
            continue;
        }

        let [v0, v1, v2] = mesh
            .get_vertices_of_face(face)
            .ok_or(HalfEdgeError::InvalidFace(face))?;
        mesh.remove_face(face)?;
        let center = mesh.add_vertex(centroid);
        maps.vertex_origins.insert(center, [v0, v1, v2]);

        for (a, b) in [(v0, v1), (v1, v2), (v2, v0)] {
            let fan = mesh.add_face(a, b, center)?;
            maps.face_origins.insert(fan, face);
        }
    }

    tracing::debug!(
        "cut_large_faces: split {} of {} faces (overlap {})",
        maps.split_count(),
        mesh.face_count() - 2 * maps.split_count(),
        overlap
    );
    Ok(maps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh::{BoundingBox, MeshBuffer};

    fn grid() -> ChunkGrid {
        ChunkGrid::from_bounds(
            BoundingBox::new(Vec3::ZERO, Vec3::new(20.0, 10.0, 0.0)),
            10.0,
        )
        .unwrap()
    }

    #[test]
    fn test_small_faces_untouched() {
        let buffer = MeshBuffer::new(
            vec![[1.0, 1.0, 0.0], [2.0, 1.0, 0.0], [1.0, 2.0, 0.0]],
            vec![[0, 1, 2]],
        );
        let mut mesh = HalfEdgeMesh::from_buffer(&buffer).unwrap();
        let maps = cut_large_faces(&mut mesh, &grid(), 0.1).unwrap();
        assert_eq!(maps.split_count(), 0);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(maps.source_face(FaceId(0)), FaceId(0));
    }

    #[test]
    fn test_overlap_within_ratio_is_kept() {
        // Centroid in cell 0, one corner 0.5 past the border at x = 10
        let buffer = MeshBuffer::new(
            vec![[8.0, 1.0, 0.0], [10.5, 2.0, 0.0], [8.0, 3.0, 0.0]],
            vec![[0, 1, 2]],
        );
        let mut mesh = HalfEdgeMesh::from_buffer(&buffer).unwrap();
        let maps = cut_large_faces(&mut mesh, &grid(), 0.1).unwrap();
        assert_eq!(maps.split_count(), 0);

        let maps = cut_large_faces(&mut mesh, &grid(), 0.01).unwrap();
        assert_eq!(maps.split_count(), 1);
    }

    #[test]
    fn test_large_face_is_fanned() {
        let buffer = MeshBuffer::new(
            vec![[6.0, 1.0, 0.0], [14.0, 1.0, 0.0], [9.0, 4.0, 0.0]],
            vec![[0, 1, 2]],
        );
        let mut mesh = HalfEdgeMesh::from_buffer(&buffer).unwrap();
        let maps = cut_large_faces(&mut mesh, &grid(), 0.1).unwrap();

        assert_eq!(maps.split_count(), 1);
        assert_eq!(mesh.face_count(), 3);
        assert_eq!(mesh.vertex_count(), 4);
        assert!(mesh.validate().is_ok());

        let center = VertexId(3);
        assert_eq!(
            maps.vertex_source(center),
            VertexSource::Centroid([VertexId(0), VertexId(1), VertexId(2)])
        );
        assert_eq!(maps.vertex_source(VertexId(1)), VertexSource::Original(VertexId(1)));
        let position = mesh.get_vertex_position(center).unwrap();
        approx::assert_relative_eq!(position.x, 29.0 / 3.0);
        approx::assert_relative_eq!(position.y, 2.0);

        for face in mesh.face_ids() {
            assert_eq!(maps.source_face(face), FaceId(0));
            assert!(mesh.get_vertices_of_face(face).unwrap().contains(&center));
        }
    }
}
