//! Basic geometric primitives shared by the containment and tiling code.
//!
//! All surfaces handled by this crate are horizontal, so most of the math here
//! happens in the `(x, z)` plane. The `y` axis is "up", both in a boundary's
//! local frame and in world space.

use nalgebra::{Point3, Vector3};

/// Number of corners on a hexagon. Shocking, I know.
pub const HEXAGON_CORNERS: usize = 6;

/// Determinants smaller than this are treated as a ray running parallel to a
/// triangle (or a degenerate triangle), i.e. no hit.
const PARALLEL_EPSILON: f64 = 1e-12;

/// An axis-aligned bounding box over the horizontal `(x, z)` plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds2 {
    pub min_x: f64,
    pub max_x: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl Bounds2 {
    /// Compute the horizontal bounds of a set of points. The `y` component of
    /// each point is ignored. Returns `None` if there are no points, or if any
    /// point has a non-finite `x` or `z`. A box built from garbage coordinates
    /// would make the lattice enumeration run forever, so we refuse it here.
    pub fn from_points<'a>(
        points: impl IntoIterator<Item = &'a Point3<f64>>,
    ) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bounds = Self {
            min_x: first.x,
            max_x: first.x,
            min_z: first.z,
            max_z: first.z,
        };

        for point in std::iter::once(first).chain(points) {
            // f64::min/max silently swallow NaN, so check explicitly
            if !(point.x.is_finite() && point.z.is_finite()) {
                return None;
            }
            bounds.min_x = bounds.min_x.min(point.x);
            bounds.max_x = bounds.max_x.max(point.x);
            bounds.min_z = bounds.min_z.min(point.z);
            bounds.max_z = bounds.max_z.max(point.z);
        }

        Some(bounds)
    }

    /// Extent along the x axis
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Extent along the z axis
    pub fn depth(&self) -> f64 {
        self.max_z - self.min_z
    }

    /// Length of the box's diagonal
    pub fn diagonal(&self) -> f64 {
        self.width().hypot(self.depth())
    }

    /// Is the given horizontal coordinate inside the box? Inclusive on all
    /// edges.
    pub fn contains(&self, x: f64, z: f64) -> bool {
        (self.min_x..=self.max_x).contains(&x)
            && (self.min_z..=self.max_z).contains(&z)
    }
}

/// Calculate the 6 corners of a flat hexagon lying in the horizontal plane.
/// Corner `k` sits at an angle of `60° * k`, measured from the +x axis towards
/// the +z axis, at `radius` distance from the center. All corners share the
/// center's `y`.
pub fn hexagon_corners(
    center: &Point3<f64>,
    radius: f64,
) -> [Point3<f64>; HEXAGON_CORNERS] {
    let mut corners = [*center; HEXAGON_CORNERS];
    for (k, corner) in corners.iter_mut().enumerate() {
        let angle = (60.0 * k as f64).to_radians();
        corner.x += radius * angle.cos();
        corner.z += radius * angle.sin();
    }
    corners
}

/// A half-infinite line. The direction is always normalized, so distances
/// along the ray are in the same units as the coordinate space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f64>,
    pub direction: Vector3<f64>,
}

impl Ray {
    /// Create a new ray. The direction will be normalized. A zero direction
    /// produces a ray that never hits anything.
    pub fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get the point at the given distance along the ray
    pub fn point_at(&self, distance: f64) -> Point3<f64> {
        self.origin + self.direction * distance
    }

    /// Intersect this ray with a triangle, using the Möller–Trumbore algorithm.
    /// Both faces of the triangle count. Returns the distance from the ray
    /// origin to the hit, if there is a hit within `[0, max_distance]`.
    pub fn intersect_triangle(
        &self,
        triangle: &[Point3<f64>; 3],
        max_distance: f64,
    ) -> Option<f64> {
        let edge1 = triangle[1] - triangle[0];
        let edge2 = triangle[2] - triangle[0];
        let p = self.direction.cross(&edge2);
        let det = edge1.dot(&p);
        if det.abs() < PARALLEL_EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;

        let s = self.origin - triangle[0];
        let u = s.dot(&p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = self.direction.dot(&q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let distance = edge2.dot(&q) * inv_det;
        if (0.0..=max_distance).contains(&distance) {
            Some(distance)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn unit_triangle() -> [Point3<f64>; 3] {
        [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ]
    }

    #[test]
    fn test_bounds_from_points() {
        let points = vec![
            Point3::new(1.0, 5.0, -2.0),
            Point3::new(-3.0, -1.0, 4.0),
            Point3::new(0.5, 0.0, 0.0),
        ];
        let bounds = Bounds2::from_points(&points).unwrap();
        assert_eq!(
            bounds,
            Bounds2 {
                min_x: -3.0,
                max_x: 1.0,
                min_z: -2.0,
                max_z: 4.0,
            }
        );
        assert_approx_eq!(bounds.width(), 4.0);
        assert_approx_eq!(bounds.depth(), 6.0);
        assert_approx_eq!(bounds.diagonal(), 52.0_f64.sqrt());
        assert!(bounds.contains(1.0, 4.0));
        assert!(!bounds.contains(1.1, 0.0));
    }

    #[test]
    fn test_bounds_degenerate() {
        assert_eq!(Bounds2::from_points(&[]), None);
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(f64::NAN, 0.0, 1.0),
        ];
        assert_eq!(Bounds2::from_points(&points), None);
        // Only the horizontal components need to be finite
        let points = vec![Point3::new(0.0, f64::INFINITY, 0.0)];
        assert!(Bounds2::from_points(&points).is_some());
    }

    #[test]
    fn test_hexagon_corners() {
        let center = Point3::new(1.0, 2.0, 3.0);
        let corners = hexagon_corners(&center, 0.5);

        // First corner lies straight along +x, the fourth straight along -x
        assert_approx_eq!(corners[0].x, 1.5);
        assert_approx_eq!(corners[0].z, 3.0);
        assert_approx_eq!(corners[3].x, 0.5);
        assert_approx_eq!(corners[3].z, 3.0);
        for corner in &corners {
            assert_approx_eq!(corner.y, 2.0);
            assert_approx_eq!((corner - center).norm(), 0.5);
        }
        // Adjacent corners are one side length (== radius) apart
        for k in 0..HEXAGON_CORNERS {
            let next = corners[(k + 1) % HEXAGON_CORNERS];
            assert_approx_eq!((next - corners[k]).norm(), 0.5);
        }
    }

    #[test]
    fn test_ray_hit() {
        let ray = Ray::new(
            Point3::new(0.25, 5.0, 0.25),
            Vector3::new(0.0, -2.0, 0.0),
        );
        let distance = ray.intersect_triangle(&unit_triangle(), 10.0).unwrap();
        assert_approx_eq!(distance, 5.0);
        assert_approx_eq!(ray.point_at(distance).y, 0.0);

        // Winding of the triangle doesn't matter
        let mut flipped = unit_triangle();
        flipped.swap(1, 2);
        assert!(ray.intersect_triangle(&flipped, 10.0).is_some());
    }

    #[test]
    fn test_ray_miss() {
        let down = Vector3::new(0.0, -1.0, 0.0);
        // Outside the triangle's hypotenuse
        let ray = Ray::new(Point3::new(0.6, 5.0, 0.6), down);
        assert_eq!(ray.intersect_triangle(&unit_triangle(), 10.0), None);
        // Too far away
        let ray = Ray::new(Point3::new(0.25, 50.0, 0.25), down);
        assert_eq!(ray.intersect_triangle(&unit_triangle(), 10.0), None);
        // Pointing away from the triangle
        let ray = Ray::new(Point3::new(0.25, 5.0, 0.25), -down);
        assert_eq!(ray.intersect_triangle(&unit_triangle(), 10.0), None);
        // Parallel to the triangle
        let ray = Ray::new(Point3::new(-1.0, 0.0, 0.25), Vector3::x());
        assert_eq!(ray.intersect_triangle(&unit_triangle(), 10.0), None);
    }
}
