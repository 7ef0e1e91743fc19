//! Half-edge mesh data structure
//!
//! Provides topology information (vertex-face adjacency, face neighbours,
//! boundary detection) that is not available in an indexed triangle buffer.
//! Handles are stable: removing a face never invalidates other handles, and
//! holes are only dropped by an explicit [`HalfEdgeMesh::compact`].

mod construction;
mod modification;
mod stable;
mod topology;
mod types;
mod validation;

use std::collections::HashMap;

pub use modification::CompactionMap;
pub use types::{Face, FaceId, HalfEdge, HalfEdgeError, HalfEdgeId, Vertex, VertexId};

use stable::StableVec;

/// Half-edge triangle mesh
#[derive(Debug, Clone, Default)]
pub struct HalfEdgeMesh {
    pub(crate) vertices: StableVec<Vertex>,
    /// Allocated in twin pairs; never individually removed
    pub(crate) half_edges: Vec<HalfEdge>,
    pub(crate) faces: StableVec<Face>,
    /// Map from (origin, destination) vertex pair to half-edge
    pub(crate) edge_map: HashMap<(VertexId, VertexId), HalfEdgeId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::MeshBuffer;
    use glam::Vec3;

    /// Two triangles sharing the diagonal of a unit quad.
    fn create_test_quad() -> HalfEdgeMesh {
        let buffer = MeshBuffer::new(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        );
        HalfEdgeMesh::from_buffer(&buffer).unwrap()
    }

    /// Closed tetrahedron with consistent outward winding.
    fn create_test_tetrahedron() -> HalfEdgeMesh {
        let buffer = MeshBuffer::new(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ],
            vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]],
        );
        HalfEdgeMesh::from_buffer(&buffer).unwrap()
    }

    #[test]
    fn test_from_buffer_quad() {
        let mesh = create_test_quad();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.edge_count(), 5);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_face_vertices_and_positions() {
        let mesh = create_test_quad();
        let verts = mesh.get_vertices_of_face(FaceId(1)).unwrap();
        assert_eq!(verts, [VertexId(0), VertexId(2), VertexId(3)]);

        let positions = mesh.get_vertex_positions_of_face(FaceId(0)).unwrap();
        assert_eq!(positions[1], Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(mesh.get_vertex_position(VertexId(3)), Some(Vec3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_face_normal() {
        let mesh = create_test_quad();
        let normal = mesh.get_face_normal(FaceId(0)).unwrap();
        approx::assert_relative_eq!(normal.z, 1.0);
        approx::assert_relative_eq!(normal.x, 0.0);

        let centroid = mesh.get_face_centroid(FaceId(1)).unwrap();
        approx::assert_relative_eq!(centroid.x, 1.0 / 3.0);
        approx::assert_relative_eq!(centroid.y, 2.0 / 3.0);
    }

    #[test]
    fn test_face_neighbours() {
        let mesh = create_test_quad();
        let neighbours = mesh.get_neighbours_of_face(FaceId(0)).unwrap();
        // Edges 0->1 and 1->2 are on the boundary, 2->0 is shared with face 1
        assert_eq!(neighbours, [None, None, Some(FaceId(1))]);

        let diagonal = mesh.edge_between(VertexId(0), VertexId(2)).unwrap();
        let faces = mesh.get_faces_of_edge(diagonal).unwrap();
        assert_eq!(faces, [Some(FaceId(1)), Some(FaceId(0))]);
        assert_eq!(
            mesh.get_vertices_of_edge(diagonal),
            Some([VertexId(0), VertexId(2)])
        );
        assert!(!mesh.is_boundary_edge(diagonal));
    }

    #[test]
    fn test_edges_of_face_form_cycle() {
        let mesh = create_test_quad();
        let edges = mesh.get_edges_of_face(FaceId(0)).unwrap();
        for (i, &edge) in edges.iter().enumerate() {
            assert_eq!(mesh.half_edge(edge).unwrap().next, Some(edges[(i + 1) % 3]));
            assert_eq!(mesh.half_edge(edge).unwrap().face, Some(FaceId(0)));
        }
    }

    #[test]
    fn test_faces_of_vertex_open_fan() {
        let mesh = create_test_quad();
        let mut faces = mesh.get_faces_of_vertex(VertexId(0));
        faces.sort();
        assert_eq!(faces, vec![FaceId(0), FaceId(1)]);
        assert_eq!(mesh.get_faces_of_vertex(VertexId(1)), vec![FaceId(0)]);
        // 0->1 and 0->2 border faces, 0->3 is the boundary half of edge 3->0
        assert_eq!(mesh.get_outgoing_edges(VertexId(0)).len(), 3);
    }

    #[test]
    fn test_faces_of_vertex_closed() {
        let mesh = create_test_tetrahedron();
        assert!(mesh.validate().is_ok());
        for v in 0..4 {
            assert_eq!(mesh.get_faces_of_vertex(VertexId(v)).len(), 3);
        }
        for h in 0..mesh.half_edge_count() as u32 {
            assert!(!mesh.is_boundary_edge(HalfEdgeId(h)));
        }
    }

    #[test]
    fn test_add_face_rejects_degenerate() {
        let mut mesh = HalfEdgeMesh::new();
        let a = mesh.add_vertex(Vec3::ZERO);
        let b = mesh.add_vertex(Vec3::X);
        let result = mesh.add_face(a, b, a);
        assert_eq!(result, Err(HalfEdgeError::DegenerateFace(a, b, a)));
        assert_eq!(mesh.face_count(), 0);
        assert_eq!(mesh.half_edge_count(), 0);
    }

    #[test]
    fn test_add_face_rejects_unknown_vertex() {
        let mut mesh = HalfEdgeMesh::new();
        let a = mesh.add_vertex(Vec3::ZERO);
        let b = mesh.add_vertex(Vec3::X);
        let result = mesh.add_face(a, b, VertexId(7));
        assert_eq!(result, Err(HalfEdgeError::InvalidVertex(VertexId(7))));
        assert_eq!(mesh.half_edge_count(), 0);
    }

    #[test]
    fn test_add_face_non_manifold_is_atomic() {
        let mut mesh = create_test_quad();
        let extra = mesh.add_vertex(Vec3::new(2.0, 0.0, 0.0));
        let edges_before = mesh.half_edge_count();

        // 0 -> 1 already borders face 0
        let result = mesh.add_face(VertexId(0), VertexId(1), extra);
        assert_eq!(
            result,
            Err(HalfEdgeError::NonManifoldEdge {
                from: VertexId(0),
                to: VertexId(1)
            })
        );
        assert_eq!(mesh.half_edge_count(), edges_before);
        assert_eq!(mesh.face_count(), 2);
        assert!(mesh.validate().is_ok());

        // Opposite winding shares the edge correctly
        let face = mesh.add_face(VertexId(1), VertexId(0), extra).unwrap();
        assert_eq!(mesh.face_count(), 3);
        let edge = mesh.edge_between(VertexId(0), VertexId(1)).unwrap();
        assert_eq!(
            mesh.get_faces_of_edge(edge).unwrap(),
            [Some(FaceId(0)), Some(face)]
        );
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_remove_face_keeps_handles() {
        let mut mesh = create_test_quad();
        mesh.remove_face(FaceId(0)).unwrap();

        assert_eq!(mesh.face_count(), 1);
        assert!(mesh.face(FaceId(0)).is_none());
        assert!(mesh.get_vertices_of_face(FaceId(0)).is_none());
        assert_eq!(
            mesh.get_vertices_of_face(FaceId(1)),
            Some([VertexId(0), VertexId(2), VertexId(3)])
        );
        assert_eq!(mesh.remove_face(FaceId(0)), Err(HalfEdgeError::InvalidFace(FaceId(0))));

        // Vertex 1 lost its only face, vertex 0 still reaches face 1
        assert_eq!(mesh.vertex(VertexId(1)).unwrap().outgoing, None);
        assert_eq!(mesh.get_faces_of_vertex(VertexId(0)), vec![FaceId(1)]);
        assert!(mesh.validate().is_ok());

        // The freed directed edge can be reused by a new face
        let c = mesh.add_vertex(Vec3::new(0.5, -1.0, 0.0));
        assert!(mesh.add_face(VertexId(0), VertexId(1), c).is_ok());
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_remove_face_reanchors_bow_tie() {
        // Two triangles touching only at vertex 0
        let buffer = MeshBuffer::new(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [-1.0, 0.0, 0.0],
                [-1.0, -1.0, 0.0],
            ],
            vec![[0, 1, 2], [0, 3, 4]],
        );
        let mut mesh = HalfEdgeMesh::from_buffer(&buffer).unwrap();
        let anchor = mesh.vertex(VertexId(0)).unwrap().outgoing.unwrap();
        assert_eq!(mesh.half_edge(anchor).unwrap().face, Some(FaceId(0)));

        mesh.remove_face(FaceId(0)).unwrap();
        let anchor = mesh.vertex(VertexId(0)).unwrap().outgoing.unwrap();
        assert_eq!(mesh.half_edge(anchor).unwrap().face, Some(FaceId(1)));
        assert_eq!(mesh.get_faces_of_vertex(VertexId(0)), vec![FaceId(1)]);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_compact() {
        let mut mesh = create_test_quad();
        mesh.remove_face(FaceId(0)).unwrap();
        let map = mesh.compact().unwrap();

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.edge_count(), 3);
        assert!(!map.vertex_map.contains_key(&VertexId(1)));
        assert_eq!(map.vertex_map[&VertexId(3)], VertexId(2));
        assert_eq!(map.face_map[&FaceId(1)], FaceId(0));
        assert!(mesh.validate().is_ok());

        let buffer = mesh.to_buffer();
        assert_eq!(buffer.face_indices(), &[[0, 1, 2]]);
        assert_eq!(buffer.positions()[2], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_find_edge_around_vertex() {
        let mesh = create_test_tetrahedron();
        let found = mesh
            .find_edge_around_vertex(VertexId(0), |he| {
                mesh.half_edge(he).map(|h| h.target) == Some(VertexId(3))
            })
            .unwrap();
        assert_eq!(mesh.edge_between(VertexId(0), VertexId(3)), Some(found));
        assert!(mesh.find_edge_around_vertex(VertexId(0), |_| false).is_none());
    }

    #[test]
    fn test_from_buffer_reports_face_index() {
        let buffer = MeshBuffer::new(
            vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![[0, 1, 2], [2, 2, 1]],
        );
        let err = HalfEdgeMesh::from_buffer(&buffer).unwrap_err();
        assert!(matches!(err, HalfEdgeError::FaceRejected { index: 1, .. }));
    }
}
