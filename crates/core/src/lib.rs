//! hexfloor covers tracked horizontal surfaces (floors, tables, the ground
//! plane from an AR session...) with a grid of hexagon tiles. A hexagon is
//! only ever placed where it fits **entirely** on the surface.
//!
//! This crate is only the geometric core. Plane detection, rendering, and
//! input all live in the host application, which feeds surface snapshots in
//! and gets tile placements back out.
//!
//! ```
//! use hexfloor::{nalgebra::Isometry3, HexTiler, PlaneBoundary, TilingConfig};
//!
//! let tiler = HexTiler::new(&TilingConfig::default()).unwrap();
//! let floor = PlaneBoundary::from_convex_outline(
//!     "floor",
//!     Isometry3::identity(),
//!     &[(-2.0, -2.0), (2.0, -2.0), (2.0, 2.0), (-2.0, 2.0)],
//! );
//! for placement in tiler.tile(&floor) {
//!     println!("{} at {}", placement.coord, placement.position);
//! }
//! ```
//!
//! For a host that receives a stream of surface changes, [TileRegistry] keeps
//! track of which tiles belong to which surface and replaces them whenever the
//! surface changes. See [TilingConfig] for the available knobs.

mod boundary;
mod config;
mod containment;
mod events;
mod geometry;
mod registry;
mod tiling;
mod util;

pub use crate::{
    boundary::{BoundaryId, PlaneBoundary},
    config::TilingConfig,
    containment::{
        Containment, ContainmentStrategy, MeshProbe, OutlineWinding,
    },
    events::{PlaneEventBus, PlanesChanged, Subscription},
    geometry::{hexagon_corners, Bounds2, Ray, HEXAGON_CORNERS},
    registry::{CategoryPalette, TileRegistry, TileSink},
    tiling::{HexLattice, HexPlacement, HexTiler, LatticeCoord},
};
pub use nalgebra;
