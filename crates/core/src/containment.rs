//! Containment oracles answer one question: is this world-space point inside
//! the horizontal outline of a boundary? The tiler only ever accepts a hexagon
//! when all of its corners pass, so every oracle here must be conservative:
//! points right on an edge can go either way, but nothing meaningfully outside
//! the surface may be reported as inside.

use crate::{
    boundary::PlaneBoundary,
    geometry::{Bounds2, Ray},
};
use nalgebra::{Isometry3, Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// A predicate over world-space points, bound to a single boundary snapshot
pub trait Containment {
    /// Is the point inside the boundary's horizontal outline?
    fn contains(&self, point: &Point3<f64>) -> bool;
}

/// The different ways of testing containment against a boundary. Each
/// strategy needs different geometry from the boundary, see the variants.
#[derive(
    Copy,
    Clone,
    Debug,
    Display,
    PartialEq,
    Eq,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContainmentStrategy {
    /// Cast a vertical probe down through the triangulated surface. Needs a
    /// mesh. See [MeshProbe].
    MeshProbe,
    /// Winding number of the boundary outline, in the boundary's local frame.
    /// Needs at least 3 outline vertices. See [OutlineWinding].
    OutlineWinding,
}

impl ContainmentStrategy {
    /// Bind this strategy to a particular boundary snapshot. Returns `None` if
    /// the boundary doesn't have the geometry this strategy needs, in which
    /// case containment is undefined and nothing can be placed on it.
    pub fn bind(
        self,
        boundary: &PlaneBoundary,
    ) -> Option<Box<dyn Containment>> {
        match self {
            Self::MeshProbe => MeshProbe::new(boundary)
                .map(|probe| Box::new(probe) as Box<dyn Containment>),
            Self::OutlineWinding => OutlineWinding::new(boundary)
                .map(|winding| Box::new(winding) as Box<dyn Containment>),
        }
    }
}

impl Default for ContainmentStrategy {
    fn default() -> Self {
        Self::MeshProbe
    }
}

/// Tests containment by dropping a ray straight down onto the surface mesh.
/// The ray starts [Self::PROBE_HEIGHT] above the point and travels at most
/// [Self::PROBE_LENGTH]; the point is inside iff the ray hits a triangle. This
/// handles non-convex surfaces (and ones that aren't perfectly flat) without
/// any polygon math.
///
/// The mesh is transformed into world space once on construction, so probing
/// many points against the same snapshot stays cheap.
#[derive(Clone, Debug)]
pub struct MeshProbe {
    triangles: Vec<[Point3<f64>; 3]>,
    /// Horizontal world-space bounds of the mesh, for a quick reject before
    /// testing every triangle
    bounds: Bounds2,
}

impl MeshProbe {
    /// Distance above the query point where the probe starts
    pub const PROBE_HEIGHT: f64 = 5.0;
    /// Maximum distance the probe travels
    pub const PROBE_LENGTH: f64 = 10.0;

    /// Snapshot a boundary's mesh. `None` if it has no usable triangles.
    pub fn new(boundary: &PlaneBoundary) -> Option<Self> {
        let triangles: Vec<_> = boundary.world_triangles().collect();
        let bounds = Bounds2::from_points(triangles.iter().flatten())?;
        Some(Self { triangles, bounds })
    }

    /// Build the downward probe for a point
    pub fn probe(point: &Point3<f64>) -> Ray {
        Ray::new(point + Vector3::y() * Self::PROBE_HEIGHT, -Vector3::y())
    }
}

impl Containment for MeshProbe {
    fn contains(&self, point: &Point3<f64>) -> bool {
        if !self.bounds.contains(point.x, point.z) {
            return false;
        }
        let probe = Self::probe(point);
        self.triangles.iter().any(|triangle| {
            probe
                .intersect_triangle(triangle, Self::PROBE_LENGTH)
                .is_some()
        })
    }
}

/// Tests containment with a winding number over the boundary's outline. World
/// points are mapped back into the boundary's local frame first, then only
/// their `(x, z)` components are considered, so height is irrelevant. A
/// non-zero winding number means inside, which handles non-convex and even
/// self-overlapping outlines.
#[derive(Clone, Debug)]
pub struct OutlineWinding {
    pose: Isometry3<f64>,
    outline: Vec<Point2<f64>>,
}

impl OutlineWinding {
    /// Snapshot a boundary's outline. `None` if there are fewer than 3
    /// vertices or any of them are non-finite.
    pub fn new(boundary: &PlaneBoundary) -> Option<Self> {
        let outline: Vec<_> = boundary.outline().collect();
        let finite =
            outline.iter().all(|p| p.x.is_finite() && p.y.is_finite());
        if outline.len() < 3 || !finite {
            return None;
        }
        Some(Self {
            pose: boundary.pose,
            outline,
        })
    }
}

impl Containment for OutlineWinding {
    fn contains(&self, point: &Point3<f64>) -> bool {
        let local = self.pose.inverse_transform_point(point);
        winding_number(&self.outline, &Point2::new(local.x, local.z)) != 0
    }
}

/// Calculate the winding number of a closed polygon around a point. The last
/// vertex implicitly connects back to the first.
///
/// http://geomalgorithms.com/a03-_inclusion.html
fn winding_number(polygon: &[Point2<f64>], point: &Point2<f64>) -> i32 {
    let edges = polygon.iter().zip(polygon.iter().cycle().skip(1));
    let mut winding = 0;
    for (a, b) in edges {
        if a.y <= point.y {
            // Upward crossing with the point strictly left of the edge
            if b.y > point.y && side_of(a, b, point) > 0.0 {
                winding += 1;
            }
        } else if b.y <= point.y && side_of(a, b, point) < 0.0 {
            // Downward crossing with the point strictly right of the edge
            winding -= 1;
        }
    }
    winding
}

/// Positive if `point` is left of the line `a -> b`, negative if right, zero if
/// it's on the line
fn side_of(a: &Point2<f64>, b: &Point2<f64>, point: &Point2<f64>) -> f64 {
    (b.x - a.x) * (point.y - a.y) - (point.x - a.x) * (b.y - a.y)
}
