//! Type definitions for the half-edge mesh data structure.

use glam::Vec3;

use crate::buffer::MeshBufferError;

/// Type-safe vertex identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub u32);

/// Type-safe half-edge identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HalfEdgeId(pub u32);

/// Type-safe face identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceId(pub u32);

impl HalfEdgeId {
    /// The opposite half-edge. Half-edges are allocated in pairs, so the twin
    /// is always the other member of the pair.
    #[inline]
    pub fn twin(self) -> HalfEdgeId {
        HalfEdgeId(self.0 ^ 1)
    }
}

/// A vertex in the half-edge mesh
#[derive(Debug, Clone)]
pub struct Vertex {
    pub position: Vec3,
    /// One outgoing half-edge bordering a face, if the vertex has any faces
    pub outgoing: Option<HalfEdgeId>,
}

/// A half-edge in the mesh
///
/// The origin is not stored: it is the target of the twin.
#[derive(Debug, Clone)]
pub struct HalfEdge {
    /// The vertex this half-edge points to
    pub target: VertexId,
    /// The next half-edge around the face (None on boundary half-edges)
    pub next: Option<HalfEdgeId>,
    /// The face this half-edge borders (None for boundary half-edges)
    pub face: Option<FaceId>,
}

/// A triangle in the mesh
#[derive(Debug, Clone)]
pub struct Face {
    /// Corners in winding order
    pub vertices: [VertexId; 3],
    /// The half-edge from `vertices[0]` to `vertices[1]`
    pub half_edge: HalfEdgeId,
}

/// Errors that can occur during half-edge mesh operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HalfEdgeError {
    #[error("Vertex {0:?} does not exist")]
    InvalidVertex(VertexId),
    #[error("Face {0:?} does not exist")]
    InvalidFace(FaceId),
    #[error("Half-edge {0:?} does not exist")]
    InvalidHalfEdge(HalfEdgeId),
    #[error("Degenerate face ({0:?}, {1:?}, {2:?}) repeats a vertex")]
    DegenerateFace(VertexId, VertexId, VertexId),
    #[error("Non-manifold edge: {from:?} -> {to:?} already borders a face")]
    NonManifoldEdge { from: VertexId, to: VertexId },
    #[error("Invalid mesh topology: {0}")]
    InvalidTopology(String),
    #[error("Face {index} of the input buffer was rejected: {source}")]
    FaceRejected {
        index: usize,
        #[source]
        source: Box<HalfEdgeError>,
    },
    #[error(transparent)]
    Buffer(#[from] MeshBufferError),
}
