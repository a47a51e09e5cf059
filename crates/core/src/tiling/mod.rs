//! Hexagon tiling for a single boundary. See [HexTiler].

mod lattice;

pub use self::lattice::{HexLattice, LatticeCoord};
use crate::{
    boundary::{BoundaryId, PlaneBoundary},
    config::TilingConfig,
    containment::ContainmentStrategy,
    geometry::{hexagon_corners, HEXAGON_CORNERS},
};
use anyhow::Context;
use log::{debug, trace};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One accepted hexagon. Placements are only ever created by a tiling pass,
/// and they're only valid for the boundary snapshot that pass was run on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HexPlacement {
    /// The boundary this hexagon sits on
    pub boundary: BoundaryId,

    /// Where the hexagon sits in the lattice. Unique within a single pass.
    pub coord: LatticeCoord,

    /// Center of the hexagon, in the boundary's **local** frame. This is
    /// where a tile should be placed relative to its parent surface.
    #[serde(with = "crate::util::serde_point")]
    pub position: Point3<f64>,

    /// Decorative category, which is `coord.row % category_count`
    pub category: usize,
}

/// Generates hexagon placements for boundaries. A tiler is built from a
/// [TilingConfig] and from there can tile any number of boundaries any number
/// of times. It holds no state between passes: every call to [Self::tile]
/// starts from scratch.
///
/// ## Algorithm
///
/// 1. Take the horizontal bounding box of the boundary's local vertices
/// 2. Enumerate candidate centers from the [HexLattice], anchored at the
///    box's minimum corner
/// 3. For each candidate, compute its 6 corners, move them into world space
///    with the boundary's pose, and test each one against the configured
///    [ContainmentStrategy]
/// 4. Accept the hexagon only if **all 6** corners are inside. Hexagons that
///    hang over the edge at all are rejected, so tiles never overflow the
///    surface.
#[derive(Copy, Clone, Debug)]
pub struct HexTiler {
    lattice: HexLattice,
    category_count: usize,
    containment: ContainmentStrategy,
}

impl HexTiler {
    /// Build a new tiler. Returns an error if the config is invalid.
    pub fn new(config: &TilingConfig) -> anyhow::Result<Self> {
        config.validate().context("invalid tiling config")?;
        Ok(Self {
            lattice: HexLattice::new(config.hex_radius)?,
            category_count: config.category_count,
            containment: config.containment,
        })
    }

    /// The lattice that candidates are drawn from
    pub fn lattice(&self) -> &HexLattice {
        &self.lattice
    }

    /// Number of categories that placements cycle through
    pub fn category_count(&self) -> usize {
        self.category_count
    }

    /// The containment strategy used to accept/reject hexagons
    pub fn containment(&self) -> ContainmentStrategy {
        self.containment
    }

    /// Generate all placements for a boundary. The output is ordered by
    /// lattice coordinate (rows, then columns).
    ///
    /// If the boundary doesn't have the geometry required by the containment
    /// strategy, this returns nothing. That's a perfectly normal state for a
    /// freshly detected surface, so it isn't treated as an error.
    pub fn tile(&self, boundary: &PlaneBoundary) -> Vec<HexPlacement> {
        let bounds = boundary.local_bounds();
        let containment = self.containment.bind(boundary);
        let (bounds, containment) = match (bounds, containment) {
            (Some(bounds), Some(containment)) => (bounds, containment),
            _ => {
                debug!(
                    "Boundary {} has no usable geometry for {}, skipping",
                    boundary.id, self.containment
                );
                return Vec::new();
            }
        };

        let placements: Vec<HexPlacement> = self
            .lattice
            .candidates(bounds)
            .filter_map(|coord| {
                let position = self.lattice.center(&bounds, coord);
                let corners = self.world_corners(boundary, &position);
                if corners.iter().all(|corner| containment.contains(corner)) {
                    Some(HexPlacement {
                        boundary: boundary.id.clone(),
                        coord,
                        position,
                        category: coord.row as usize % self.category_count,
                    })
                } else {
                    trace!("Rejected hexagon {} on {}", coord, boundary.id);
                    None
                }
            })
            .collect();

        debug!(
            "Tiled boundary {} with {} hexagons",
            boundary.id,
            placements.len()
        );
        placements
    }

    /// Get the 6 corners of a hexagon in world space, given its local-frame
    /// center. Corners are laid out around the center in the boundary's local
    /// frame, then the whole hexagon is moved by the boundary's pose. These
    /// are the exact points that [Self::tile] tests for containment.
    pub fn world_corners(
        &self,
        boundary: &PlaneBoundary,
        local_center: &Point3<f64>,
    ) -> [Point3<f64>; HEXAGON_CORNERS] {
        let mut corners = hexagon_corners(local_center, self.lattice.radius());
        for corner in corners.iter_mut() {
            *corner = boundary.to_world(corner);
        }
        corners
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Isometry3;

    fn square(half_size: f64) -> PlaneBoundary {
        PlaneBoundary::from_convex_outline(
            "square",
            Isometry3::identity(),
            &[
                (-half_size, -half_size),
                (half_size, -half_size),
                (half_size, half_size),
                (-half_size, half_size),
            ],
        )
    }

    #[test]
    fn test_invalid_config() {
        let config = TilingConfig {
            hex_radius: 0.0,
            ..Default::default()
        };
        assert!(HexTiler::new(&config).is_err());
    }

    #[test]
    fn test_anchor_rejected() {
        // The first candidate is centered right on the min corner of the
        // bounds, so it always hangs off the surface
        let tiler = HexTiler::new(&TilingConfig::default()).unwrap();
        let placements = tiler.tile(&square(2.0));
        assert!(!placements.is_empty());
        assert!(placements
            .iter()
            .all(|placement| placement.coord != LatticeCoord::new(0, 0)));
    }

    #[test]
    fn test_categories() {
        let config = TilingConfig {
            category_count: 2,
            ..Default::default()
        };
        let tiler = HexTiler::new(&config).unwrap();
        for placement in tiler.tile(&square(3.0)) {
            assert_eq!(placement.category, placement.coord.row as usize % 2);
            assert_eq!(placement.boundary, BoundaryId::from("square"));
        }
    }

    #[test]
    fn test_missing_geometry() {
        let tiler = HexTiler::new(&TilingConfig::default()).unwrap();
        let mut boundary = square(2.0);
        boundary.triangles.clear();
        assert_eq!(tiler.tile(&boundary), vec![]);

        let empty = PlaneBoundary::new(
            "empty",
            Isometry3::identity(),
            vec![],
            vec![],
        );
        assert_eq!(tiler.tile(&empty), vec![]);
    }
}
