// bounds.rs — Swept query shapes
//
// A `Bounds` is a path from `start` to `end` plus the shape being moved
// along it: a point (ray), a sphere, or an axis-aligned box given relative
// to the moving origin.

use crate::error::TraceError;
use crate::q_shared::{vector_is_zero, vector_min_max, Vec3, VEC3_ORIGIN};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub start: Vec3,
    pub end: Vec3,
    /// Ray: 0, box zero. Sphere: > 0, box zero. Box: 0, box non-zero.
    pub sphere_radius: f32,
    pub box_min: Vec3,
    pub box_max: Vec3,
}

/// The validated kind of a `Bounds`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TraceShape {
    Ray,
    Sphere { radius: f32 },
    Box { mins: Vec3, maxs: Vec3, extents: Vec3 },
}

impl Bounds {
    pub fn ray(start: Vec3, end: Vec3) -> Self {
        Self {
            start,
            end,
            sphere_radius: 0.0,
            box_min: VEC3_ORIGIN,
            box_max: VEC3_ORIGIN,
        }
    }

    pub fn sphere(start: Vec3, end: Vec3, radius: f32) -> Self {
        Self {
            sphere_radius: radius,
            ..Self::ray(start, end)
        }
    }

    pub fn aabb(start: Vec3, end: Vec3, box_min: Vec3, box_max: Vec3) -> Self {
        Self {
            box_min,
            box_max,
            ..Self::ray(start, end)
        }
    }

    /// Classify the query, rejecting configurations that mix shapes or
    /// have an inverted box or a bad radius.
    pub fn shape(&self) -> Result<TraceShape, TraceError> {
        let invalid = |reason: &'static str| -> Result<TraceShape, TraceError> {
            Err(TraceError::InvalidBoundsConfiguration { reason })
        };

        if !self.start.iter().chain(&self.end).all(|c| c.is_finite()) {
            return invalid("start or end is not finite");
        }
        if !self.sphere_radius.is_finite() {
            return invalid("sphere radius is not finite");
        }
        if self.sphere_radius < 0.0 {
            return invalid("negative sphere radius");
        }

        let has_box = !vector_is_zero(&self.box_min) || !vector_is_zero(&self.box_max);
        if !has_box {
            if self.sphere_radius > 0.0 {
                return Ok(TraceShape::Sphere {
                    radius: self.sphere_radius,
                });
            }
            return Ok(TraceShape::Ray);
        }

        if self.sphere_radius > 0.0 {
            return invalid("both a sphere radius and a box were given");
        }
        if (0..3).any(|i| !(self.box_min[i] <= self.box_max[i])) {
            return invalid("box min exceeds box max");
        }
        Ok(TraceShape::Box {
            mins: self.box_min,
            maxs: self.box_max,
            extents: self.extents(),
        })
    }

    /// Largest distance from the moving origin to the box along each axis.
    /// Zero for rays and spheres.
    pub fn extents(&self) -> Vec3 {
        let mut extents = VEC3_ORIGIN;
        for i in 0..3 {
            extents[i] = self.box_min[i].abs().max(self.box_max[i].abs());
        }
        extents
    }

    /// AABB covering every position the shape occupies along the path.
    pub fn swept_bounds(&self) -> (Vec3, Vec3) {
        let (mut mins, mut maxs) = vector_min_max(&self.start, &self.end);
        let extents = self.extents();
        for i in 0..3 {
            let grow = self.sphere_radius + extents[i];
            mins[i] -= grow;
            maxs[i] += grow;
        }
        (mins, maxs)
    }
}

/// True when the two boxes can't overlap even after growing each by
/// `epsilon` on every axis.
#[inline]
pub fn aabb_disjoint(min_a: &Vec3, max_a: &Vec3, min_b: &Vec3, max_b: &Vec3, epsilon: f32) -> bool {
    (0..3).any(|i| min_a[i] - epsilon > max_b[i] + epsilon || max_a[i] + epsilon < min_b[i] - epsilon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_shape() {
        let b = Bounds::ray([0.0; 3], [1.0, 0.0, 0.0]);
        assert_eq!(b.shape(), Ok(TraceShape::Ray));
        assert_eq!(b.extents(), [0.0; 3]);
    }

    #[test]
    fn test_sphere_shape() {
        let b = Bounds::sphere([0.0; 3], [1.0, 0.0, 0.0], 5.0);
        assert_eq!(b.shape(), Ok(TraceShape::Sphere { radius: 5.0 }));
        assert_eq!(b.extents(), [0.0; 3]);
    }

    #[test]
    fn test_box_shape_and_extents() {
        let b = Bounds::aabb([0.0; 3], [0.0; 3], [-20.0, -90.0, -20.0], [20.0, 40.0, 30.0]);
        match b.shape() {
            Ok(TraceShape::Box { extents, .. }) => assert_eq!(extents, [20.0, 90.0, 30.0]),
            other => panic!("expected box, got {:?}", other),
        }
    }

    #[test]
    fn test_one_sided_box_is_a_box() {
        let b = Bounds::aabb([0.0; 3], [0.0; 3], [0.0; 3], [1.0, 1.0, 1.0]);
        assert!(matches!(b.shape(), Ok(TraceShape::Box { .. })));
    }

    #[test]
    fn test_invalid_configurations() {
        let mut b = Bounds::aabb([0.0; 3], [1.0; 3], [-1.0; 3], [1.0; 3]);
        b.sphere_radius = 2.0;
        assert!(b.shape().is_err());

        assert!(Bounds::sphere([0.0; 3], [1.0; 3], -1.0).shape().is_err());
        assert!(Bounds::sphere([0.0; 3], [1.0; 3], f32::NAN).shape().is_err());
        assert!(Bounds::sphere([0.0; 3], [1.0; 3], f32::INFINITY).shape().is_err());
        assert!(Bounds::aabb([0.0; 3], [1.0; 3], [1.0; 3], [-1.0; 3]).shape().is_err());
        assert!(Bounds::aabb([0.0; 3], [1.0; 3], [f32::NAN; 3], [1.0; 3]).shape().is_err());
    }

    #[test]
    fn test_non_finite_endpoints() {
        let bad = [f32::NAN, f32::INFINITY, f32::NEG_INFINITY];
        for c in bad {
            assert!(Bounds::ray([c, 0.0, 0.0], [1.0; 3]).shape().is_err());
            assert!(Bounds::sphere([0.0; 3], [1.0, c, 1.0], 2.0).shape().is_err());
            assert!(Bounds::aabb([0.0; 3], [1.0, 1.0, c], [-1.0; 3], [1.0; 3]).shape().is_err());
        }
        assert_eq!(
            Bounds::ray([f32::NAN; 3], [0.0; 3]).shape(),
            Err(TraceError::InvalidBoundsConfiguration {
                reason: "start or end is not finite"
            })
        );
    }

    #[test]
    fn test_swept_bounds() {
        let b = Bounds::ray([5.0, -1.0, 0.0], [-5.0, 1.0, 2.0]);
        assert_eq!(b.swept_bounds(), ([-5.0, -1.0, 0.0], [5.0, 1.0, 2.0]));

        let s = Bounds::sphere([0.0; 3], [10.0, 0.0, 0.0], 2.0);
        assert_eq!(s.swept_bounds(), ([-2.0; 3], [12.0, 2.0, 2.0]));

        let x = Bounds::aabb([0.0; 3], [0.0, 0.0, 4.0], [-1.0, -2.0, -3.0], [1.0, 1.0, 1.0]);
        assert_eq!(x.swept_bounds(), ([-1.0, -2.0, -3.0], [1.0, 2.0, 7.0]));
    }

    #[test]
    fn test_aabb_disjoint() {
        let a = ([0.0; 3], [1.0; 3]);
        let touching = ([1.0, 0.0, 0.0], [2.0, 1.0, 1.0]);
        let near = ([1.1, 0.0, 0.0], [2.0, 1.0, 1.0]);
        let far = ([3.0, 0.0, 0.0], [4.0, 1.0, 1.0]);

        assert!(!aabb_disjoint(&a.0, &a.1, &touching.0, &touching.1, 0.0));
        assert!(aabb_disjoint(&a.0, &a.1, &near.0, &near.1, 0.0));
        assert!(!aabb_disjoint(&a.0, &a.1, &near.0, &near.1, 0.125));
        assert!(aabb_disjoint(&a.0, &a.1, &far.0, &far.1, 0.125));
        assert!(aabb_disjoint(&far.0, &far.1, &a.0, &a.1, 0.125));
    }

    #[test]
    fn test_aabb_disjoint_unbounded() {
        let inf = ([f32::NEG_INFINITY; 3], [f32::INFINITY; 3]);
        let far = ([1.0e6; 3], [1.0e6 + 1.0; 3]);
        assert!(!aabb_disjoint(&inf.0, &inf.1, &far.0, &far.1, 0.125));
    }
}
