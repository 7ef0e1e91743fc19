//! Construction methods for HalfEdgeMesh.

use glam::Vec3;

use super::types::{Face, FaceId, HalfEdge, HalfEdgeError, HalfEdgeId, Vertex, VertexId};
use super::HalfEdgeMesh;
use crate::buffer::MeshBuffer;

impl HalfEdgeMesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a half-edge mesh from a mesh buffer.
    ///
    /// Vertex and face handles match the buffer's element indices. Only
    /// positions and face indices are read; attribute channels stay in the
    /// buffer.
    pub fn from_buffer(buffer: &MeshBuffer) -> Result<Self, HalfEdgeError> {
        buffer.validate()?;

        let mut mesh = Self::new();
        for position in buffer.positions() {
            mesh.add_vertex(Vec3::from_array(*position));
        }

        for (index, &[a, b, c]) in buffer.face_indices().iter().enumerate() {
            mesh.add_face(VertexId(a), VertexId(b), VertexId(c))
                .map_err(|source| HalfEdgeError::FaceRejected {
                    index,
                    source: Box::new(source),
                })?;
        }

        tracing::debug!(
            "from_buffer: {} vertices, {} faces, {} edges",
            mesh.vertex_count(),
            mesh.face_count(),
            mesh.edge_count()
        );
        Ok(mesh)
    }

    /// Export positions and face indices.
    ///
    /// Live vertices and faces are renumbered densely in handle order, so a
    /// compacted mesh exports with indices equal to its handles.
    pub fn to_buffer(&self) -> MeshBuffer {
        let mut remap = vec![u32::MAX; self.vertices.slot_count()];
        let mut positions = Vec::with_capacity(self.vertex_count());
        for (index, vertex) in self.vertices.iter() {
            remap[index as usize] = positions.len() as u32;
            positions.push(vertex.position.to_array());
        }

        let faces = self
            .faces
            .iter()
            .map(|(_, face)| face.vertices.map(|v| remap[v.0 as usize]))
            .collect();

        MeshBuffer::new(positions, faces)
    }

    /// Add an isolated vertex
    pub fn add_vertex(&mut self, position: Vec3) -> VertexId {
        VertexId(self.vertices.push(Vertex {
            position,
            outgoing: None,
        }))
    }

    /// Add a triangle with corners in winding order.
    ///
    /// Existing half-edges are reused; missing edges are created as twin
    /// pairs. Every check runs before the mesh is touched, so an error leaves
    /// the mesh unchanged.
    pub fn add_face(
        &mut self,
        v0: VertexId,
        v1: VertexId,
        v2: VertexId,
    ) -> Result<FaceId, HalfEdgeError> {
        let corners = [v0, v1, v2];
        for v in corners {
            if self.vertex(v).is_none() {
                return Err(HalfEdgeError::InvalidVertex(v));
            }
        }
        if v0 == v1 || v1 == v2 || v2 == v0 {
            return Err(HalfEdgeError::DegenerateFace(v0, v1, v2));
        }
        for i in 0..3 {
            let (from, to) = (corners[i], corners[(i + 1) % 3]);
            if let Some(&he) = self.edge_map.get(&(from, to)) {
                if self.half_edges[he.0 as usize].face.is_some() {
                    return Err(HalfEdgeError::NonManifoldEdge { from, to });
                }
            }
        }

        // === Mutation ===
        let face_id = FaceId(self.faces.push(Face {
            vertices: corners,
            half_edge: HalfEdgeId(0),
        }));
        let edges = [
            self.find_or_create_edge_between(v0, v1),
            self.find_or_create_edge_between(v1, v2),
            self.find_or_create_edge_between(v2, v0),
        ];
        if let Some(face) = self.faces.get_mut(face_id.0) {
            face.half_edge = edges[0];
        }

        for i in 0..3 {
            let he = &mut self.half_edges[edges[i].0 as usize];
            he.next = Some(edges[(i + 1) % 3]);
            he.face = Some(face_id);
        }

        for i in 0..3 {
            let needs_outgoing = match self.vertex(corners[i]).and_then(|v| v.outgoing) {
                None => true,
                Some(he) => self.half_edges[he.0 as usize].face.is_none(),
            };
            if needs_outgoing {
                if let Some(vertex) = self.vertices.get_mut(corners[i].0) {
                    vertex.outgoing = Some(edges[i]);
                }
            }
        }

        tracing::trace!("add_face: {:?} = ({:?}, {:?}, {:?})", face_id, v0, v1, v2);
        Ok(face_id)
    }

    /// Return the half-edge `from -> to`, creating the edge pair if needed.
    pub(crate) fn find_or_create_edge_between(&mut self, from: VertexId, to: VertexId) -> HalfEdgeId {
        match self.edge_map.get(&(from, to)) {
            Some(&he) => he,
            None => self.add_edge_pair(from, to),
        }
    }

    /// Allocate `from -> to` and its twin `to -> from`, returning the former.
    fn add_edge_pair(&mut self, from: VertexId, to: VertexId) -> HalfEdgeId {
        let forward = HalfEdgeId(self.half_edges.len() as u32);
        self.half_edges.push(HalfEdge {
            target: to,
            next: None,
            face: None,
        });
        self.half_edges.push(HalfEdge {
            target: from,
            next: None,
            face: None,
        });
        self.edge_map.insert((from, to), forward);
        self.edge_map.insert((to, from), forward.twin());
        forward
    }
}
