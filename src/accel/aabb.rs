//! Axis-aligned bounding box used by both builders.

use glam::Vec3;
use std::fmt;

/// Axis-aligned bounding box.
///
/// [`Aabb::EMPTY`] is inverted (`min = +inf`, `max = -inf`) so that the
/// first expansion snaps it onto the expanded point or box.
#[derive(Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Empty bounding box (inverted, will expand on first point).
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create a new bounding box from min and max points.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Bounds of a triangle.
    #[inline]
    pub fn from_triangle(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self {
            min: v0.min(v1).min(v2),
            max: v0.max(v1).max(v2),
        }
    }

    /// True until the box has been expanded at least once.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow to include a point.
    #[inline]
    pub fn expand_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Grow to include another box.
    #[inline]
    pub fn expand(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Size along each axis.
    #[inline]
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Surface area (for SAH cost).
    ///
    /// Flat boxes give zero; an empty box gives a meaningless value, so
    /// callers check [`Aabb::is_empty`] first.
    #[inline]
    pub fn surface_area(&self) -> f32 {
        let d = self.extent();
        2.0 * (d.x * d.y + d.x * d.z + d.y * d.z)
    }

    /// Axis with the largest extent (0=x, 1=y, 2=z). Ties go to the lower axis.
    #[inline]
    pub fn longest_axis(&self) -> usize {
        let d = self.extent();
        if d.y > d.x && d.y > d.z {
            1
        } else if d.z > d.x && d.z > d.y {
            2
        } else {
            0
        }
    }

    /// True if `other` lies inside this box (boundaries inclusive).
    #[inline]
    pub fn contains(&self, other: &Aabb) -> bool {
        self.min.cmple(other.min).all() && other.max.cmple(self.max).all()
    }

    /// True if the boxes share any point (touching counts).
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// Split into the halves below and above a plane on `axis`.
    #[inline]
    pub fn split(&self, axis: usize, position: f32) -> (Aabb, Aabb) {
        let mut below = *self;
        let mut above = *self;
        below.max[axis] = position;
        above.min[axis] = position;
        (below, above)
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aabb({:?} - {:?})", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_expands_to_point() {
        let mut b = Aabb::EMPTY;
        assert!(b.is_empty());

        b.expand_point(Vec3::ZERO);
        assert!(!b.is_empty());
        assert_eq!(b.min, Vec3::ZERO);
        assert_eq!(b.max, Vec3::ZERO);
        assert_eq!(b.surface_area(), 0.0);

        b.expand_point(Vec3::ONE);
        assert_eq!(b.extent(), Vec3::ONE);
    }

    #[test]
    fn test_expand_by_box() {
        let mut b = Aabb::new(Vec3::ZERO, Vec3::ONE);
        b.expand(&Aabb::EMPTY);
        assert_eq!(b, Aabb::new(Vec3::ZERO, Vec3::ONE));

        b.expand(&Aabb::new(Vec3::splat(-1.0), Vec3::splat(0.5)));
        assert_eq!(b.min, Vec3::splat(-1.0));
        assert_eq!(b.max, Vec3::ONE);
    }

    #[test]
    fn test_surface_area() {
        let b = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(b.surface_area(), 2.0 * (2.0 + 3.0 + 6.0));

        // Flat box: one side of zero thickness still has area.
        let flat = Aabb::new(Vec3::ZERO, Vec3::new(2.0, 2.0, 0.0));
        assert_eq!(flat.surface_area(), 8.0);
    }

    #[test]
    fn test_longest_axis() {
        assert_eq!(Aabb::new(Vec3::ZERO, Vec3::new(3.0, 1.0, 1.0)).longest_axis(), 0);
        assert_eq!(Aabb::new(Vec3::ZERO, Vec3::new(1.0, 3.0, 1.0)).longest_axis(), 1);
        assert_eq!(Aabb::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 3.0)).longest_axis(), 2);
        assert_eq!(Aabb::new(Vec3::ZERO, Vec3::ONE).longest_axis(), 0);
    }

    #[test]
    fn test_split_and_contains() {
        let b = Aabb::new(Vec3::ZERO, Vec3::splat(4.0));
        let (below, above) = b.split(1, 1.0);
        assert_eq!(below.max.y, 1.0);
        assert_eq!(above.min.y, 1.0);
        assert!(b.contains(&below));
        assert!(b.contains(&above));
        assert!(below.overlaps(&above));
        assert!(!below.contains(&b));
    }
}
