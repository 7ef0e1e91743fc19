//! Topology query methods for HalfEdgeMesh.

use std::collections::{HashSet, VecDeque};

use glam::Vec3;

use super::types::{Face, FaceId, HalfEdge, HalfEdgeId, Vertex, VertexId};
use super::HalfEdgeMesh;

impl HalfEdgeMesh {
    // ========================================================================
    // Accessors
    // ========================================================================

    /// Get vertex by ID
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.0)
    }

    /// Get half-edge by ID
    pub fn half_edge(&self, id: HalfEdgeId) -> Option<&HalfEdge> {
        self.half_edges.get(id.0 as usize)
    }

    /// Get face by ID
    pub fn face(&self, id: FaceId) -> Option<&Face> {
        self.faces.get(id.0)
    }

    /// Live vertex handles in ascending order
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.iter().map(|(i, _)| VertexId(i))
    }

    /// Live face handles in ascending order
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.faces.iter().map(|(i, _)| FaceId(i))
    }

    /// Number of live vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of live faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn half_edge_count(&self) -> usize {
        self.half_edges.len()
    }

    /// Number of edges (one per twin pair)
    pub fn edge_count(&self) -> usize {
        self.half_edges.len() / 2
    }

    // ========================================================================
    // Topology Queries
    // ========================================================================

    pub fn get_vertex_position(&self, vertex_id: VertexId) -> Option<Vec3> {
        self.vertex(vertex_id).map(|v| v.position)
    }

    /// Get the three corners of a face in winding order
    pub fn get_vertices_of_face(&self, face_id: FaceId) -> Option<[VertexId; 3]> {
        self.face(face_id).map(|f| f.vertices)
    }

    pub fn get_vertex_positions_of_face(&self, face_id: FaceId) -> Option<[Vec3; 3]> {
        let [a, b, c] = self.get_vertices_of_face(face_id)?;
        Some([
            self.get_vertex_position(a)?,
            self.get_vertex_position(b)?,
            self.get_vertex_position(c)?,
        ])
    }

    /// Mean of the three corner positions
    pub fn get_face_centroid(&self, face_id: FaceId) -> Option<Vec3> {
        let [a, b, c] = self.get_vertex_positions_of_face(face_id)?;
        Some((a + b + c) / 3.0)
    }

    /// Unit normal following the winding order (zero for sliver triangles)
    pub fn get_face_normal(&self, face_id: FaceId) -> Option<Vec3> {
        let [a, b, c] = self.get_vertex_positions_of_face(face_id)?;
        Some((b - a).cross(c - a).normalize_or_zero())
    }

    /// The face's half-edges, starting at `v0 -> v1`
    pub fn get_edges_of_face(&self, face_id: FaceId) -> Option<[HalfEdgeId; 3]> {
        let e0 = self.face(face_id)?.half_edge;
        let e1 = self.half_edge(e0)?.next?;
        let e2 = self.half_edge(e1)?.next?;
        Some([e0, e1, e2])
    }

    /// Faces across each edge of a face, in edge order (None on the boundary)
    pub fn get_neighbours_of_face(&self, face_id: FaceId) -> Option<[Option<FaceId>; 3]> {
        let edges = self.get_edges_of_face(face_id)?;
        Some(edges.map(|he| self.half_edge(he.twin()).and_then(|twin| twin.face)))
    }

    /// Origin of a half-edge (the target of its twin)
    pub fn origin(&self, he: HalfEdgeId) -> Option<VertexId> {
        self.half_edge(he.twin()).map(|twin| twin.target)
    }

    /// Origin and target of a half-edge
    pub fn get_vertices_of_edge(&self, he: HalfEdgeId) -> Option<[VertexId; 2]> {
        Some([self.origin(he)?, self.half_edge(he)?.target])
    }

    /// Faces on both sides of an edge: the half-edge's own face, then its twin's
    pub fn get_faces_of_edge(&self, he: HalfEdgeId) -> Option<[Option<FaceId>; 2]> {
        Some([self.half_edge(he)?.face, self.half_edge(he.twin())?.face])
    }

    /// Half-edge `from -> to`, if the edge exists
    pub fn edge_between(&self, from: VertexId, to: VertexId) -> Option<HalfEdgeId> {
        self.edge_map.get(&(from, to)).copied()
    }

    /// Whether at most one side of the edge borders a face
    pub fn is_boundary_edge(&self, he: HalfEdgeId) -> bool {
        match self.get_faces_of_edge(he) {
            Some([Some(_), Some(_)]) => false,
            _ => true,
        }
    }

    /// All faces incident to a vertex
    pub fn get_faces_of_vertex(&self, vertex_id: VertexId) -> Vec<FaceId> {
        self.get_outgoing_edges(vertex_id)
            .into_iter()
            .filter_map(|he| self.half_edge(he).and_then(|h| h.face))
            .collect()
    }

    /// All half-edges leaving a vertex, reachable through its face fan
    pub fn get_outgoing_edges(&self, vertex_id: VertexId) -> Vec<HalfEdgeId> {
        let mut edges = Vec::new();
        self.walk_outgoing(vertex_id, |he| {
            edges.push(he);
            false
        });
        edges
    }

    /// First outgoing half-edge of a vertex that satisfies `pred`.
    ///
    /// The walk rotates in both directions from the vertex's anchor edge, so
    /// open fans are covered up to the boundary on each side.
    pub fn find_edge_around_vertex<F>(&self, vertex_id: VertexId, pred: F) -> Option<HalfEdgeId>
    where
        F: FnMut(HalfEdgeId) -> bool,
    {
        self.walk_outgoing(vertex_id, pred)
    }

    fn walk_outgoing<F>(&self, vertex_id: VertexId, mut visit: F) -> Option<HalfEdgeId>
    where
        F: FnMut(HalfEdgeId) -> bool,
    {
        let start = self.vertex(vertex_id)?.outgoing?;
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            if visit(current) {
                return Some(current);
            }
            if let Some(next) = self.rotate_forward(current) {
                queue.push_back(next);
            }
            if let Some(prev) = self.rotate_backward(current) {
                queue.push_back(prev);
            }
        }
        None
    }

    /// `v -> x` inside a face: the face's edge into `v`, reversed
    fn rotate_forward(&self, he: HalfEdgeId) -> Option<HalfEdgeId> {
        let edge = self.half_edge(he)?;
        edge.face?;
        let into_origin = self.half_edge(edge.next?)?.next?;
        Some(into_origin.twin())
    }

    /// `v -> x` whose twin borders a face: the twin's successor
    fn rotate_backward(&self, he: HalfEdgeId) -> Option<HalfEdgeId> {
        let twin = self.half_edge(he.twin())?;
        twin.face?;
        twin.next
    }
}
