use crate::containment::ContainmentStrategy;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Configuration that defines how surfaces get tiled. Tiling the same boundary
/// snapshot with the same config always produces the same placements.
///
/// This is validated once, up front, when building a
/// [HexTiler](crate::HexTiler) or [TileRegistry](crate::TileRegistry). A bad
/// config is a startup error, never a per-frame one.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(
    function = "validate_hex_radius",
    skip_on_field_errors = false
))]
pub struct TilingConfig {
    /// Distance from the center of a hexagon to any of its corners, in the
    /// same units as the boundary geometry. Must be finite and strictly
    /// positive; a zero radius would make the lattice infinitely dense. If you
    /// only know the width of your tile model, see
    /// [Self::radius_from_tile_width].
    pub hex_radius: f64,

    /// Number of decorative categories (e.g. materials) that placements
    /// cycle through. Each placement gets `row % category_count`. Whatever
    /// supplies the actual categories must provide at least this many.
    #[validate(range(min = 1, max = 64))]
    pub category_count: usize,

    /// How to decide whether a hexagon corner lies on the surface. See
    /// [ContainmentStrategy] for the options.
    pub containment: ContainmentStrategy,
}

impl TilingConfig {
    /// Derive a hexagon radius from the width of a reference tile model. The
    /// width of a hexagon (measured between two opposite sides) is `√3 * r`,
    /// so `r = width / √3`.
    ///
    /// Returns 0 for a non-positive (or NaN) width. That's not a usable radius,
    /// so it will fail validation rather than silently producing garbage.
    pub fn radius_from_tile_width(width: f64) -> f64 {
        if width > 0.0 {
            width / 3.0_f64.sqrt()
        } else {
            0.0
        }
    }
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            hex_radius: 0.5,
            category_count: 3,
            containment: ContainmentStrategy::default(),
        }
    }
}

fn validate_hex_radius(config: &TilingConfig) -> Result<(), ValidationError> {
    if config.hex_radius.is_finite() && config.hex_radius > 0.0 {
        Ok(())
    } else {
        let mut error = ValidationError::new("degenerate_radius");
        error.add_param("hex_radius".into(), &config.hex_radius);
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_radius_from_tile_width() {
        assert_approx_eq!(
            TilingConfig::radius_from_tile_width(3.0_f64.sqrt()),
            1.0
        );
        assert_eq!(TilingConfig::radius_from_tile_width(0.0), 0.0);
        assert_eq!(TilingConfig::radius_from_tile_width(-1.0), 0.0);
        assert_eq!(TilingConfig::radius_from_tile_width(f64::NAN), 0.0);
    }

    #[test]
    fn test_default_is_valid() {
        TilingConfig::default().validate().unwrap();
    }

    #[test]
    fn test_deserialize_partial() {
        let config: TilingConfig = serde_json::from_str(
            r#"{"hex_radius": 0.25, "containment": "outline_winding"}"#,
        )
        .unwrap();
        assert_eq!(
            config,
            TilingConfig {
                hex_radius: 0.25,
                category_count: 3,
                containment: ContainmentStrategy::OutlineWinding,
            }
        );
    }
}
