//! Validation methods for HalfEdgeMesh.

use super::types::{HalfEdgeError, HalfEdgeId, VertexId};
use super::HalfEdgeMesh;

impl HalfEdgeMesh {
    /// Check mesh connectivity.
    ///
    /// Validates that:
    /// 1. Half-edges come in pairs and the edge map agrees with them
    /// 2. Half-edges with a face form a 3-cycle inside that face, those without have no `next`
    /// 3. Each face's anchor and corners match its cycle
    /// 4. Vertex anchors leave their vertex and border a face
    pub fn validate(&self) -> Result<(), HalfEdgeError> {
        let invalid = |msg: String| Err(HalfEdgeError::InvalidTopology(msg));

        if self.half_edges.len() % 2 != 0 {
            return invalid(format!("odd half-edge count {}", self.half_edges.len()));
        }

        for index in 0..self.half_edges.len() as u32 {
            let id = HalfEdgeId(index);
            let he = &self.half_edges[index as usize];
            if self.vertex(he.target).is_none() {
                return invalid(format!("{:?}: target {:?} missing", id, he.target));
            }
            let origin = self.origin(id).ok_or(HalfEdgeError::InvalidHalfEdge(id.twin()))?;
            if self.edge_between(origin, he.target) != Some(id) {
                return invalid(format!(
                    "{:?}: edge map entry for {:?} -> {:?} disagrees",
                    id, origin, he.target
                ));
            }

            match (he.face, he.next) {
                (None, None) => {}
                (None, Some(_)) => {
                    return invalid(format!("{:?}: boundary half-edge has a successor", id));
                }
                (Some(face), None) => {
                    return invalid(format!("{:?}: in {:?} but has no successor", id, face));
                }
                (Some(face), Some(_)) => {
                    if self.face(face).is_none() {
                        return invalid(format!("{:?}: references removed {:?}", id, face));
                    }
                    let mut current = id;
                    for _ in 0..3 {
                        let edge = self
                            .half_edge(current)
                            .ok_or(HalfEdgeError::InvalidHalfEdge(current))?;
                        if edge.face != Some(face) {
                            return invalid(format!("{:?}: cycle leaves {:?}", id, face));
                        }
                        current = edge.next.ok_or(HalfEdgeError::InvalidHalfEdge(current))?;
                    }
                    if current != id {
                        return invalid(format!("{:?}: face cycle is not a triangle", id));
                    }
                }
            }
        }

        for face_id in self.face_ids() {
            let edges = self
                .get_edges_of_face(face_id)
                .ok_or(HalfEdgeError::InvalidFace(face_id))?;
            let corners = self
                .get_vertices_of_face(face_id)
                .ok_or(HalfEdgeError::InvalidFace(face_id))?;
            for (edge, corner) in edges.into_iter().zip(corners) {
                if self.half_edge(edge).and_then(|h| h.face) != Some(face_id) {
                    return invalid(format!("{:?}: anchor cycle not owned", face_id));
                }
                if self.origin(edge) != Some(corner) {
                    return invalid(format!(
                        "{:?}: corner {:?} does not match edge {:?}",
                        face_id, corner, edge
                    ));
                }
            }
        }

        for vertex_id in self.vertex_ids() {
            self.validate_anchor(vertex_id)?;
        }
        Ok(())
    }

    fn validate_anchor(&self, vertex_id: VertexId) -> Result<(), HalfEdgeError> {
        let Some(anchor) = self.vertex(vertex_id).and_then(|v| v.outgoing) else {
            return Ok(());
        };
        if self.origin(anchor) != Some(vertex_id) {
            return Err(HalfEdgeError::InvalidTopology(format!(
                "{:?}: outgoing {:?} does not leave the vertex",
                vertex_id, anchor
            )));
        }
        if self.half_edge(anchor).and_then(|h| h.face).is_none() {
            return Err(HalfEdgeError::InvalidTopology(format!(
                "{:?}: outgoing {:?} borders no face",
                vertex_id, anchor
            )));
        }
        Ok(())
    }
}
