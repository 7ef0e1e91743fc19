//! Arena-backed octree over a static point set.
//!
//! Points are sorted along a Morton curve so each leaf owns a contiguous run
//! of the reordered point buffer. Nodes live in a flat `Vec` and refer to
//! their children by [`NodeId`].

use glam::Vec3;

use crate::bounds::BoundingBox;

/// Deepest subdivision supported (3 bits per level fit in a `u64` code)
pub const MAX_DEPTH: u32 = 21;

/// Index of a node in the octree arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// Octree node
#[derive(Debug, Clone, PartialEq)]
pub enum OctreeNode {
    /// Interior node. Bit `o` of `valid_mask` is set when child `o` exists,
    /// bit `o` of `leaf_mask` when that child is a leaf.
    Internal {
        children: [Option<NodeId>; 8],
        valid_mask: u8,
        leaf_mask: u8,
    },
    /// Run of points in [`PointOctree::points`]
    Leaf { point_start: u32, point_count: u32 },
}

/// Errors that can occur while building an octree
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OctreeError {
    #[error("voxel size must be positive and finite, got {0}")]
    InvalidVoxelSize(f32),
    #[error("point {0} is not finite")]
    NonFinitePoint(usize),
}

/// Octree over a point set with leaves no larger than a voxel
#[derive(Debug, Clone)]
pub struct PointOctree {
    nodes: Vec<OctreeNode>,
    root: Option<NodeId>,
    bounds: BoundingBox,
    depth: u32,
    /// Points in leaf order
    points: Vec<Vec3>,
    /// Original index of each entry in `points`
    indices: Vec<u32>,
}

/// Child octant of a point relative to a center (x = 1, y = 2, z = 4)
fn octant_for_point(point: Vec3, center: Vec3) -> usize {
    let mut index = 0;
    if point.x >= center.x {
        index |= 1;
    }
    if point.y >= center.y {
        index |= 2;
    }
    if point.z >= center.z {
        index |= 4;
    }
    index
}

fn octant_bounds(bounds: &BoundingBox, octant: usize) -> BoundingBox {
    let center = bounds.center();
    let pick = |bit: usize, low: f32, high: f32| if octant & bit != 0 { high } else { low };
    BoundingBox::new(
        Vec3::new(
            pick(1, bounds.min.x, center.x),
            pick(2, bounds.min.y, center.y),
            pick(4, bounds.min.z, center.z),
        ),
        Vec3::new(
            pick(1, center.x, bounds.max.x),
            pick(2, center.y, bounds.max.y),
            pick(4, center.z, bounds.max.z),
        ),
    )
}

/// Interleave quantized coordinates, most significant level first.
fn morton_code(cell: [u32; 3], depth: u32) -> u64 {
    let mut code = 0u64;
    for level in (0..depth).rev() {
        let octant = ((cell[0] >> level) & 1) | (((cell[1] >> level) & 1) << 1) | (((cell[2] >> level) & 1) << 2);
        code = (code << 3) | octant as u64;
    }
    code
}

impl PointOctree {
    /// Build an octree whose leaf cells have an edge length of at most
    /// `voxel_size`.
    ///
    /// The root cell is the points' bounding box padded by one voxel and made
    /// cubic. Depth is `ceil(log2(side / voxel_size))`, clamped to
    /// `1..=MAX_DEPTH`.
    pub fn build(points: &[Vec3], voxel_size: f32) -> Result<Self, OctreeError> {
        if !(voxel_size.is_finite() && voxel_size > 0.0) {
            return Err(OctreeError::InvalidVoxelSize(voxel_size));
        }
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(OctreeError::NonFinitePoint(index));
        }
        if points.is_empty() {
            return Ok(Self {
                nodes: Vec::new(),
                root: None,
                bounds: BoundingBox::empty(),
                depth: 0,
                points: Vec::new(),
                indices: Vec::new(),
            });
        }

        let bounds = BoundingBox::from_points(points.iter().copied())
            .expanded(voxel_size)
            .to_cube();
        let side = bounds.longest_side();
        let depth = ((side / voxel_size).log2().ceil() as u32).clamp(1, MAX_DEPTH);
        let cells_per_axis = 1u32 << depth;
        let cell_size = side / cells_per_axis as f32;

        let mut keyed: Vec<(u64, u32)> = points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let rel = (*p - bounds.min) / cell_size;
                let q = |v: f32| (v.floor().max(0.0) as u32).min(cells_per_axis - 1);
                (morton_code([q(rel.x), q(rel.y), q(rel.z)], depth), i as u32)
            })
            .collect();
        keyed.sort_unstable();

        let mut octree = Self {
            nodes: Vec::new(),
            root: None,
            bounds,
            depth,
            points: keyed.iter().map(|&(_, i)| points[i as usize]).collect(),
            indices: keyed.iter().map(|&(_, i)| i).collect(),
        };
        let codes: Vec<u64> = keyed.into_iter().map(|(code, _)| code).collect();
        octree.root = Some(octree.build_node(&codes, 0, 0));

        tracing::debug!(
            "PointOctree::build: {} points, depth {}, {} nodes, {} leaves",
            octree.points.len(),
            depth,
            octree.nodes.len(),
            octree.leaf_count()
        );
        Ok(octree)
    }

    /// Build the subtree for `codes` (a sorted slice starting at `offset` in
    /// the point buffer) at the given level.
    fn build_node(&mut self, codes: &[u64], offset: usize, level: u32) -> NodeId {
        if level == self.depth {
            return self.push(OctreeNode::Leaf {
                point_start: offset as u32,
                point_count: codes.len() as u32,
            });
        }

        let shift = 3 * (self.depth - 1 - level);
        let mut children = [None; 8];
        let mut valid_mask = 0u8;
        let mut leaf_mask = 0u8;
        let mut start = 0;
        while start < codes.len() {
            let octant = ((codes[start] >> shift) & 7) as usize;
            let end = start + codes[start..].partition_point(|c| ((c >> shift) & 7) as usize == octant);
            let child = self.build_node(&codes[start..end], offset + start, level + 1);
            children[octant] = Some(child);
            valid_mask |= 1 << octant;
            if matches!(self.nodes[child.0 as usize], OctreeNode::Leaf { .. }) {
                leaf_mask |= 1 << octant;
            }
            start = end;
        }

        self.push(OctreeNode::Internal {
            children,
            valid_mask,
            leaf_mask,
        })
    }

    fn push(&mut self, node: OctreeNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Original indices of all points inside `area` (boundary inclusive)
    pub fn query_box(&self, area: &BoundingBox) -> Vec<usize> {
        let mut found = Vec::new();
        let Some(root) = self.root else {
            return found;
        };

        let mut stack = vec![(root, self.bounds)];
        while let Some((id, cell)) = stack.pop() {
            if !cell.intersects(area) {
                continue;
            }
            match &self.nodes[id.0 as usize] {
                OctreeNode::Leaf {
                    point_start,
                    point_count,
                } => {
                    let range = *point_start as usize..(*point_start + *point_count) as usize;
                    for i in range {
                        if area.contains_point(self.points[i]) {
                            found.push(self.indices[i] as usize);
                        }
                    }
                }
                OctreeNode::Internal { children, .. } => {
                    for (octant, child) in children.iter().enumerate() {
                        if let Some(child) = child {
                            stack.push((*child, octant_bounds(&cell, octant)));
                        }
                    }
                }
            }
        }
        found
    }

    /// Leaf containing a point, if the point lies in an occupied cell
    pub fn find_leaf(&self, point: Vec3) -> Option<NodeId> {
        if !self.bounds.contains_point(point) {
            return None;
        }
        let mut id = self.root?;
        let mut cell = self.bounds;
        loop {
            match &self.nodes[id.0 as usize] {
                OctreeNode::Leaf { .. } => return Some(id),
                OctreeNode::Internal { children, .. } => {
                    let octant = octant_for_point(point, cell.center());
                    id = children[octant]?;
                    cell = octant_bounds(&cell, octant);
                }
            }
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&OctreeNode> {
        self.nodes.get(id.0 as usize)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Cubic root cell
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, OctreeNode::Leaf { .. }))
            .count()
    }

    /// Points reordered so that each leaf's points are contiguous
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Original index of each entry of [`PointOctree::points`]
    pub fn original_indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
