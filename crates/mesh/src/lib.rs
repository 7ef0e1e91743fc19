//! Strata mesh core - buffers, topology and spatial primitives
//!
//! This crate provides the geometry types shared by the chunking engine:
//! - [`buffer::MeshBuffer`] - Named, typed vertex and face channels
//! - [`half_edge::HalfEdgeMesh`] - Triangle mesh with full adjacency and stable handles
//! - [`bounds::BoundingBox`] - Axis-aligned bounding box helpers
//! - [`octree::PointOctree`] - Arena-backed octree over a point set

pub mod bounds;
pub mod buffer;
pub mod half_edge;
pub mod octree;

pub use bounds::{BoundingBox, BoundsError};
pub use buffer::{Channel, ChannelData, ChannelType, MeshBuffer, MeshBufferError};
pub use half_edge::{CompactionMap, FaceId, HalfEdgeError, HalfEdgeId, HalfEdgeMesh, VertexId};
pub use octree::{NodeId, OctreeError, OctreeNode, PointOctree};
