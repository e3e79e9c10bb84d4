use crate::{Interval, Vec3};

/// Axis-Aligned Bounding Box.
///
/// An AABB is defined by three intervals (one per axis). Unlike boxes used
/// for BVH traversal, these bounds are never padded: a flat triangle keeps
/// a zero-width axis so reported bounds match the source vertices exactly.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// Create an AABB from two corner points.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            x: Interval::new(a.x.min(b.x), a.x.max(b.x)),
            y: Interval::new(a.y.min(b.y), a.y.max(b.y)),
            z: Interval::new(a.z.min(b.z), a.z.max(b.z)),
        }
    }

    /// Smallest AABB containing every point of the iterator.
    pub fn from_iter_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        points
            .into_iter()
            .fold(Self::EMPTY, |aabb, p| aabb.include_point(p))
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    /// Grow the box so it contains `p`.
    pub fn include_point(&self, p: Vec3) -> Self {
        Self {
            x: self.x.include(p.x),
            y: self.y.include(p.y),
            z: self.z.include(p.z),
        }
    }

    /// True if any axis is empty.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty() || self.z.is_empty()
    }

    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// The 8 corners, x varying fastest.
    pub fn corners(&self) -> [Vec3; 8] {
        let lo = self.min();
        let hi = self.max();
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Inclusive point containment.
    pub fn contains_point(&self, p: Vec3) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y) && self.z.contains(p.z)
    }

    /// Same as `contains_point` but tolerant to float rounding.
    pub fn contains_point_eps(&self, p: Vec3, eps: f32) -> bool {
        p.x >= self.x.min - eps
            && p.x <= self.x.max + eps
            && p.y >= self.y.min - eps
            && p.y <= self.y.max + eps
            && p.z >= self.z.min - eps
            && p.z <= self.z.max + eps
    }

    /// Contains nothing; the identity of [`Aabb::surrounding`].
    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };
}
