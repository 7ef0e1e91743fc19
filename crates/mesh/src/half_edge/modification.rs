//! Modification methods for HalfEdgeMesh.

use std::collections::HashMap;

use glam::Vec3;
use tracing::trace;

use super::types::{FaceId, HalfEdgeError, HalfEdgeId, VertexId};
use super::HalfEdgeMesh;

/// Result of mesh compaction - maps old IDs to new IDs.
///
/// Handles missing from a map were dropped: removed faces, edges no longer
/// bordering any face, and vertices without faces.
#[derive(Debug, Default)]
pub struct CompactionMap {
    pub vertex_map: HashMap<VertexId, VertexId>,
    pub half_edge_map: HashMap<HalfEdgeId, HalfEdgeId>,
    pub face_map: HashMap<FaceId, FaceId>,
}

impl HalfEdgeMesh {
    /// Set the position of a vertex
    pub fn set_vertex_position(
        &mut self,
        vertex_id: VertexId,
        position: Vec3,
    ) -> Result<(), HalfEdgeError> {
        let vertex = self
            .vertices
            .get_mut(vertex_id.0)
            .ok_or(HalfEdgeError::InvalidVertex(vertex_id))?;
        vertex.position = position;
        Ok(())
    }

    /// Remove a face, leaving its edges in place.
    ///
    /// The face's half-edges become boundary half-edges. Corner vertices whose
    /// anchor edge bordered the removed face are re-anchored on another
    /// incident face, or left without an anchor when none remains. Faces in
    /// the anchor's fan are found by walking it; other fans of a non-manifold
    /// vertex are found by scanning the edges leaving it.
    pub fn remove_face(&mut self, face_id: FaceId) -> Result<(), HalfEdgeError> {
        let edges = self
            .get_edges_of_face(face_id)
            .ok_or(HalfEdgeError::InvalidFace(face_id))?;
        let corners = self
            .get_vertices_of_face(face_id)
            .ok_or(HalfEdgeError::InvalidFace(face_id))?;

        // Re-anchor while the fan around each corner is still intact
        let mut anchors = Vec::with_capacity(3);
        for v in corners {
            let anchor = self.vertex(v).and_then(|vertex| vertex.outgoing);
            let on_removed = anchor
                .and_then(|he| self.half_edge(he))
                .is_some_and(|he| he.face == Some(face_id));
            if on_removed {
                let borders_other =
                    |he: HalfEdgeId| self.half_edge(he).and_then(|h| h.face).is_some_and(|f| f != face_id);
                // A bow-tie vertex has fans the walk cannot reach
                let replacement = self
                    .find_edge_around_vertex(v, borders_other)
                    .or_else(|| {
                        self.edge_map
                            .iter()
                            .filter(|&(&(from, _), &he)| from == v && borders_other(he))
                            .map(|(_, &he)| he)
                            .min()
                    });
                anchors.push((v, replacement));
            }
        }

        for he in edges {
            let edge = &mut self.half_edges[he.0 as usize];
            edge.face = None;
            edge.next = None;
        }
        for (v, replacement) in anchors {
            if let Some(vertex) = self.vertices.get_mut(v.0) {
                vertex.outgoing = replacement;
            }
        }
        self.faces.remove(face_id.0);

        trace!("remove_face: {:?}", face_id);
        Ok(())
    }

    /// Drop removed faces, faceless edges and isolated vertices, renumbering
    /// all handles densely in their previous order.
    pub fn compact(&mut self) -> Result<CompactionMap, HalfEdgeError> {
        tracing::debug!(
            "compact: START ({} verts, {} half-edges, {} faces)",
            self.vertex_count(),
            self.half_edge_count(),
            self.face_count()
        );

        let mut used = vec![false; self.vertices.slot_count()];
        for (_, face) in self.faces.iter() {
            for v in face.vertices {
                used[v.0 as usize] = true;
            }
        }

        let mut map = CompactionMap::default();
        let mut compacted = HalfEdgeMesh::new();
        for (index, vertex) in self.vertices.iter() {
            if used[index as usize] {
                let new_id = compacted.add_vertex(vertex.position);
                map.vertex_map.insert(VertexId(index), new_id);
            }
        }

        for (index, face) in self.faces.iter() {
            let [a, b, c] = face.vertices.map(|v| map.vertex_map[&v]);
            let new_id = compacted.add_face(a, b, c)?;
            map.face_map.insert(FaceId(index), new_id);
        }

        for (&(from, to), &old) in &self.edge_map {
            let (Some(&new_from), Some(&new_to)) =
                (map.vertex_map.get(&from), map.vertex_map.get(&to))
            else {
                continue;
            };
            if let Some(new) = compacted.edge_between(new_from, new_to) {
                map.half_edge_map.insert(old, new);
            }
        }

        tracing::debug!(
            "compact: END ({} verts, {} half-edges, {} faces)",
            compacted.vertex_count(),
            compacted.half_edge_count(),
            compacted.face_count()
        );
        *self = compacted;
        Ok(map)
    }
}
