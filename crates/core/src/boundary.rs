use crate::geometry::{Bounds2, Ray};
use derive_more::{Display, From};
use nalgebra::{Isometry3, Point2, Point3};
use serde::{Deserialize, Serialize};

/// Stable identity of a tracked surface. This is whatever tracking ID the
/// plane detection system hands out, and it stays the same across every update
/// to that surface.
#[derive(
    Clone,
    Debug,
    Display,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    From,
    Serialize,
    Deserialize,
)]
#[display(fmt = "{}", _0)]
#[serde(transparent)]
pub struct BoundaryId(String);

impl BoundaryId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BoundaryId {
    fn from(id: &str) -> Self {
        Self(id.into())
    }
}

/// A snapshot of a tracked horizontal surface. The plane tracking system owns
/// the real thing; we only ever read a snapshot of it during a single tiling
/// pass.
///
/// ## Geometry
///
/// `vertices` are in the boundary's **local** frame, where the surface is
/// (roughly) the plane `y = 0`. Their order doubles as the outline of the
/// surface, which is how plane trackers report boundary polygons.
/// `triangles` index into `vertices` and describe the triangulated surface,
/// which is what ray probes are cast against. Either can be empty, in which
/// case any containment strategy that needs it won't be usable.
///
/// `pose` maps the local frame into world space.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaneBoundary {
    pub id: BoundaryId,

    #[serde(
        with = "crate::util::serde_pose",
        default = "crate::util::serde_pose::identity"
    )]
    pub pose: Isometry3<f64>,

    #[serde(with = "crate::util::serde_points", default)]
    pub vertices: Vec<Point3<f64>>,

    #[serde(default)]
    pub triangles: Vec<[u32; 3]>,
}

impl PlaneBoundary {
    pub fn new(
        id: impl Into<BoundaryId>,
        pose: Isometry3<f64>,
        vertices: Vec<Point3<f64>>,
        triangles: Vec<[u32; 3]>,
    ) -> Self {
        Self {
            id: id.into(),
            pose,
            vertices,
            triangles,
        }
    }

    /// Build a flat boundary from an ordered, **convex** outline of `(x, z)`
    /// local coordinates. The surface gets triangulated as a fan around the
    /// first vertex, which is only correct for convex outlines. For anything
    /// else, bring your own triangles.
    pub fn from_convex_outline(
        id: impl Into<BoundaryId>,
        pose: Isometry3<f64>,
        outline: &[(f64, f64)],
    ) -> Self {
        let vertices = outline
            .iter()
            .map(|&(x, z)| Point3::new(x, 0.0, z))
            .collect();
        let triangles = (1..outline.len().saturating_sub(1) as u32)
            .map(|i| [0, i, i + 1])
            .collect();
        Self::new(id, pose, vertices, triangles)
    }

    /// Horizontal bounding box of all vertices, in the local frame. `None` if
    /// there are no (finite) vertices.
    pub fn local_bounds(&self) -> Option<Bounds2> {
        Bounds2::from_points(&self.vertices)
    }

    /// Get the outline of this boundary, projected onto the local `(x, z)`
    /// plane. The returned points use `x` and `y` for local `x` and `z`.
    pub fn outline(&self) -> impl Iterator<Item = Point2<f64>> + '_ {
        self.vertices.iter().map(|v| Point2::new(v.x, v.z))
    }

    /// Map a point from this boundary's local frame into world space
    pub fn to_world(&self, local: &Point3<f64>) -> Point3<f64> {
        self.pose.transform_point(local)
    }

    /// Get every triangle of the surface mesh, in world space. Triangles that
    /// reference a vertex that doesn't exist are skipped.
    pub fn world_triangles(
        &self,
    ) -> impl Iterator<Item = [Point3<f64>; 3]> + '_ {
        self.triangles.iter().filter_map(move |&[a, b, c]| {
            let vertex = |index: u32| {
                self.vertices
                    .get(index as usize)
                    .map(|local| self.to_world(local))
            };
            Some([vertex(a)?, vertex(b)?, vertex(c)?])
        })
    }

    /// Does this boundary have at least one usable triangle?
    pub fn has_mesh(&self) -> bool {
        self.world_triangles().next().is_some()
    }

    /// Cast a world-space ray against the surface mesh. Returns the distance
    /// to the closest hit within `max_distance`, or `None` if nothing was hit
    /// (including when there is no mesh at all).
    pub fn raycast(&self, ray: &Ray, max_distance: f64) -> Option<f64> {
        self.world_triangles()
            .filter_map(|triangle| {
                ray.intersect_triangle(&triangle, max_distance)
            })
            .fold(None, |closest: Option<f64>, distance| {
                Some(closest.map_or(distance, |closest| closest.min(distance)))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use nalgebra::{Translation3, UnitQuaternion, Vector3};

    fn square(pose: Isometry3<f64>) -> PlaneBoundary {
        PlaneBoundary::from_convex_outline(
            "square",
            pose,
            &[(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)],
        )
    }

    #[test]
    fn test_convex_outline_fan() {
        let boundary = square(Isometry3::identity());
        assert_eq!(boundary.vertices.len(), 4);
        assert_eq!(boundary.triangles, vec![[0, 1, 2], [0, 2, 3]]);
        assert!(boundary.has_mesh());

        // Not enough vertices for a single triangle
        let line = PlaneBoundary::from_convex_outline(
            "line",
            Isometry3::identity(),
            &[(0.0, 0.0), (1.0, 0.0)],
        );
        assert!(line.triangles.is_empty());
        assert!(!line.has_mesh());
    }

    #[test]
    fn test_invalid_triangles_skipped() {
        let mut boundary = square(Isometry3::identity());
        boundary.triangles = vec![[0, 1, 7]];
        assert!(!boundary.has_mesh());
        let ray = Ray::new(Point3::new(0.5, 1.0, -0.5), -Vector3::y());
        assert_eq!(boundary.raycast(&ray, 10.0), None);
    }

    #[test]
    fn test_raycast_posed() {
        // Lift the square 2 units and spin it 45° around +y
        let pose = Isometry3::from_parts(
            Translation3::new(0.0, 2.0, 0.0),
            UnitQuaternion::from_axis_angle(
                &Vector3::y_axis(),
                std::f64::consts::FRAC_PI_4,
            ),
        );
        let boundary = square(pose);

        // Straight down through the middle hits at the lifted height
        let ray = Ray::new(Point3::new(0.0, 5.0, 0.0), -Vector3::y());
        assert_approx_eq!(boundary.raycast(&ray, 10.0).unwrap(), 3.0);

        // (1.3, 0) is outside the unrotated square, but inside the rotated
        // one, since its corners now lie on the axes at distance √2
        let ray = Ray::new(Point3::new(1.3, 5.0, 0.0), -Vector3::y());
        assert!(boundary.raycast(&ray, 10.0).is_some());
        let ray = Ray::new(Point3::new(0.9, 5.0, 0.9), -Vector3::y());
        assert_eq!(boundary.raycast(&ray, 10.0), None);
    }

    #[test]
    fn test_local_bounds() {
        let boundary = square(Isometry3::translation(10.0, 0.0, 10.0));
        // Bounds are always local, regardless of pose
        let bounds = boundary.local_bounds().unwrap();
        assert_approx_eq!(bounds.min_x, -1.0);
        assert_approx_eq!(bounds.max_z, 1.0);

        let empty = PlaneBoundary::new(
            "empty",
            Isometry3::identity(),
            vec![],
            vec![],
        );
        assert_eq!(empty.local_bounds(), None);
    }

    #[test]
    fn test_deserialize() {
        let boundary: PlaneBoundary = serde_json::from_str(
            r#"{
                "id": "plane-1",
                "pose": {"position": [0, 1, 0]},
                "vertices": [[0, 0, 0], [1, 0, 0], [0, 0, 1]],
                "triangles": [[0, 1, 2]]
            }"#,
        )
        .unwrap();
        assert_eq!(boundary.id, BoundaryId::from("plane-1"));
        assert_eq!(boundary.id.to_string(), "plane-1");
        assert_eq!(boundary.to_world(&Point3::origin()).y, 1.0);
        assert!(boundary.has_mesh());
    }
}
