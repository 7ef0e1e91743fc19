//! Axis-aligned bounding boxes.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Errors for malformed boxes
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BoundsError {
    #[error("bounding box min {min:?} exceeds max {max:?} on at least one axis")]
    Inverted { min: Vec3, max: Vec3 },
    #[error("bounding box has non-finite corners: min {min:?}, max {max:?}")]
    NonFinite { min: Vec3, max: Vec3 },
}

/// Axis-aligned bounding box.
///
/// `min <= max` holds per axis for every box except the accumulator returned
/// by [`BoundingBox::empty`], which reports itself as invalid until a point
/// is included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// Create a box from min/max corners without checking them.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create a box from min/max corners, rejecting inverted or non-finite input.
    pub fn try_new(min: Vec3, max: Vec3) -> Result<Self, BoundsError> {
        let bounds = Self { min, max };
        bounds.check()?;
        Ok(bounds)
    }

    /// Create a box that contains nothing (for accumulation).
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    /// Smallest box containing all points. Empty input yields [`BoundingBox::empty`].
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut bounds = Self::empty();
        for point in points {
            bounds.include_point(point);
        }
        bounds
    }

    /// Expand this box to include a point.
    pub fn include_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Expand this box to include another box.
    pub fn include_box(&mut self, other: &BoundingBox) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Check the min <= max and finiteness invariants.
    pub fn check(&self) -> Result<(), BoundsError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(BoundsError::NonFinite {
                min: self.min,
                max: self.max,
            });
        }
        if self.min.cmpgt(self.max).any() {
            return Err(BoundsError::Inverted {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Whether the box satisfies its invariants.
    pub fn is_valid(&self) -> bool {
        self.check().is_ok()
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Per-axis extent.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn longest_side(&self) -> f32 {
        self.size().max_element()
    }

    /// Get the longest axis (0=x, 1=y, 2=z).
    pub fn longest_axis(&self) -> usize {
        let size = self.size();
        if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        }
    }

    /// Check if this box contains a point (boundary inclusive).
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Check if two boxes overlap (touching counts as overlap).
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// Grow the box by `amount` on every side.
    pub fn expanded(&self, amount: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(amount),
            max: self.max + Vec3::splat(amount),
        }
    }

    /// Smallest cube sharing this box's min corner that contains the box.
    pub fn to_cube(&self) -> Self {
        Self {
            min: self.min,
            max: self.min + Vec3::splat(self.longest_side()),
        }
    }
}
