//! The candidate lattice. Hexagons are laid out in rows that run along the z
//! axis, with rows stepping along the x axis. Every odd row is pushed half a
//! step along z, which gives the staggered, brick-like packing.
//!
//! ```text
//!        row 0   row 1   row 2
//! z ^
//!   |     o               o
//!   |             o
//!   |     o               o
//!   |             o
//!   |     o               o
//!   +------------------------> x
//! ```
//!
//! The spacing is fixed by the radius `r`: rows are `w = √3·r/2` apart along
//! x, and hexagons within a row are `h = 2r + w` apart along z.

use crate::geometry::Bounds2;
use anyhow::bail;
use derive_more::Display;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Position of a hexagon within the lattice. `row` steps along x, `column`
/// steps along z within a row. Every candidate the lattice produces has a
/// unique coordinate.
#[derive(
    Copy,
    Clone,
    Debug,
    Display,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[display(fmt = "[{}, {}]", row, column)]
pub struct LatticeCoord {
    pub row: u32,
    pub column: u32,
}

impl LatticeCoord {
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Is this an odd row, i.e. one that gets the half-step z offset?
    pub fn is_offset(self) -> bool {
        self.row % 2 == 1
    }
}

/// Spacing rules for one hexagon radius. Stateless and cheap to copy; the
/// lattice gets anchored to a particular boundary only when enumerating.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HexLattice {
    radius: f64,
    x_pitch: f64,
    z_pitch: f64,
}

impl HexLattice {
    /// Build a lattice for the given hexagon radius. Returns an error if the
    /// radius isn't finite and strictly positive, since enumeration would
    /// never terminate (or would produce nonsense) otherwise.
    pub fn new(radius: f64) -> anyhow::Result<Self> {
        if !(radius.is_finite() && radius > 0.0) {
            bail!(
                "degenerate hex radius {}; radius must be finite and > 0",
                radius
            );
        }
        let x_pitch = 3.0_f64.sqrt() * radius / 2.0;
        Ok(Self {
            radius,
            x_pitch,
            z_pitch: 2.0 * radius + x_pitch,
        })
    }

    /// Distance from a hexagon's center to each of its corners
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Distance between two adjacent rows, along x (`w`)
    pub fn x_pitch(&self) -> f64 {
        self.x_pitch
    }

    /// Distance between two adjacent hexagons in the same row, along z (`h`)
    pub fn z_pitch(&self) -> f64 {
        self.z_pitch
    }

    /// Get the local-frame center of the hexagon at a lattice coordinate, with
    /// the lattice anchored at the minimum corner of `bounds`. The center
    /// always sits at `y = 0`.
    pub fn center(&self, bounds: &Bounds2, coord: LatticeCoord) -> Point3<f64> {
        let x = bounds.min_x + f64::from(coord.row) * self.x_pitch;
        // The odd-row offset only shifts the hexagon itself; the cursor that
        // decides how many hexagons fit in the row doesn't include it
        let mut z = self.column_cursor(bounds, coord.column);
        if coord.is_offset() {
            z += self.z_pitch / 2.0;
        }
        Point3::new(x, 0.0, z)
    }

    /// Enumerate every candidate coordinate for a boundary with the given
    /// bounds, in order: rows ascending, then columns ascending within each
    /// row. A row exists while `min_x + row·w ≤ max_x`, and a column exists
    /// while `min_z + column·h ≤ max_z`. Each coordinate appears exactly once.
    /// Indices never go past `u32::MAX`, no matter how dense the lattice is
    /// relative to the bounds.
    pub fn candidates(
        self,
        bounds: Bounds2,
    ) -> impl Iterator<Item = LatticeCoord> {
        let last_row = last_index(bounds.width(), self.x_pitch);
        let last_column = last_index(bounds.depth(), self.z_pitch);
        let rows = (0..=last_row).take_while(move |&row| {
            bounds.min_x + f64::from(row) * self.x_pitch <= bounds.max_x
        });
        rows.flat_map(move |row| {
            (0..=last_column)
                .take_while(move |&column| {
                    self.column_cursor(&bounds, column) <= bounds.max_z
                })
                .map(move |column| LatticeCoord::new(row, column))
        })
    }

    /// Number of rows [Self::candidates] will enumerate for the given bounds.
    /// Rows step along x, so this is `floor(width / w) + 1`, **not** the
    /// number of hexagons that fit along z.
    pub fn row_count(&self, bounds: &Bounds2) -> usize {
        self.candidates(*bounds)
            .filter(|coord| coord.column == 0)
            .count()
    }

    /// Position of the z cursor for a column, before any row offset. Computed
    /// from the column index rather than accumulated, so there's no float
    /// drift over long rows.
    fn column_cursor(&self, bounds: &Bounds2, column: u32) -> f64 {
        bounds.min_z + f64::from(column) * self.z_pitch
    }
}

/// Upper bound on the index of the last step of `pitch` that fits in
/// `extent`. One past the exact value, so float rounding can never cut off a
/// step that the exact comparison in [HexLattice::candidates] would allow.
/// Float to int casts saturate, so huge extents stop at `u32::MAX`.
fn last_index(extent: f64, pitch: f64) -> u32 {
    ((extent / pitch).floor() as u32).saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::collections::HashSet;

    fn bounds(min_x: f64, max_x: f64, min_z: f64, max_z: f64) -> Bounds2 {
        Bounds2 {
            min_x,
            max_x,
            min_z,
            max_z,
        }
    }

    #[test]
    fn test_pitches() {
        let lattice = HexLattice::new(0.5).unwrap();
        assert_approx_eq!(lattice.radius(), 0.5);
        assert_approx_eq!(lattice.x_pitch(), 0.4330127018922193);
        assert_approx_eq!(lattice.z_pitch(), 1.4330127018922193);
    }

    #[test]
    fn test_degenerate_radius() {
        for radius in [0.0, -1.0, f64::NAN, f64::INFINITY].iter() {
            assert!(
                HexLattice::new(*radius).is_err(),
                "radius {} should be rejected",
                radius
            );
        }
    }

    #[test]
    fn test_centers() {
        let lattice = HexLattice::new(0.5).unwrap();
        let bounds = bounds(-2.0, 2.0, -2.0, 2.0);
        let h = lattice.z_pitch();

        let origin = lattice.center(&bounds, LatticeCoord::new(0, 0));
        assert_eq!(origin, Point3::new(-2.0, 0.0, -2.0));

        // Even rows don't get the offset
        let center = lattice.center(&bounds, LatticeCoord::new(2, 1));
        assert_approx_eq!(center.x, -2.0 + 2.0 * lattice.x_pitch());
        assert_approx_eq!(center.z, -2.0 + h);

        // Odd rows do
        let center = lattice.center(&bounds, LatticeCoord::new(1, 1));
        assert_approx_eq!(center.x, -2.0 + lattice.x_pitch());
        assert_approx_eq!(center.z, -2.0 + h + h / 2.0);
        assert_eq!(center.y, 0.0);
    }

    #[test]
    fn test_candidates() {
        let lattice = HexLattice::new(0.5).unwrap();
        let bounds = bounds(-2.0, 2.0, -2.0, 2.0);
        let candidates: Vec<_> = lattice.candidates(bounds).collect();

        // floor(4 / w) + 1 rows, floor(4 / h) + 1 columns per row
        let rows = (4.0 / lattice.x_pitch()).floor() as u32 + 1;
        let columns = (4.0 / lattice.z_pitch()).floor() as u32 + 1;
        assert_eq!(rows, 10);
        assert_eq!(columns, 3);
        assert_eq!(lattice.row_count(&bounds), rows as usize);
        assert_eq!(candidates.len(), (rows * columns) as usize);

        // Row-major ordering, no duplicates
        assert_eq!(candidates[0], LatticeCoord::new(0, 0));
        assert_eq!(candidates[1], LatticeCoord::new(0, 1));
        assert_eq!(candidates[3], LatticeCoord::new(1, 0));
        let unique: HashSet<_> = candidates.iter().collect();
        assert_eq!(unique.len(), candidates.len());
        let mut sorted = candidates.clone();
        sorted.sort();
        assert_eq!(sorted, candidates);
    }

    #[test]
    fn test_candidates_degenerate_bounds() {
        let lattice = HexLattice::new(0.5).unwrap();
        // A single point still gets exactly one candidate
        let candidates: Vec<_> =
            lattice.candidates(bounds(1.0, 1.0, 1.0, 1.0)).collect();
        assert_eq!(candidates, vec![LatticeCoord::new(0, 0)]);
    }

    #[test]
    fn test_last_index() {
        assert_eq!(last_index(4.0, 1.4330127018922193), 3);
        assert_eq!(last_index(0.0, 0.5), 1);
        // Way more steps than a u32 can count
        assert_eq!(last_index(1e12, 1e-6), u32::MAX);
        assert_eq!(last_index(f64::INFINITY, 0.5), u32::MAX);
    }

    #[test]
    fn test_candidates_dense() {
        // Far more columns than fit in a u32, but the first few are fine
        let lattice = HexLattice::new(1e-6).unwrap();
        let candidates: Vec<_> = lattice
            .candidates(bounds(0.0, 0.0, 0.0, 1e9))
            .take(3)
            .collect();
        assert_eq!(
            candidates,
            vec![
                LatticeCoord::new(0, 0),
                LatticeCoord::new(0, 1),
                LatticeCoord::new(0, 2)
            ]
        );
    }
}
