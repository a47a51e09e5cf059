use crate::{color::Color3, scene::TiledScene};
use hexfloor::{nalgebra::Point3, Bounds2, PlaneBoundary};
use svg::{
    node::{
        element::{Group, Polygon},
        Comment,
    },
    Document,
};

const PLANE_COLOR: Color3 = Color3::new_int(0xf4, 0xf1, 0xde);
const OUTLINE_COLOR: Color3 = Color3::new_int(0x30, 0x30, 0x30);
/// Hexagon edges are drawn in a darker shade of their fill
const EDGE_SHADE: f32 = 0.6;
/// Empty space around the scene, in scene units
const MARGIN: f64 = 0.5;

/// Render a tiled scene as an SVG. This is a top-down view: world x goes to
/// the right and world z goes down. Height (y) is ignored entirely.
pub fn scene_to_svg(scene: &TiledScene) -> Document {
    let outlines: Vec<(&PlaneBoundary, Vec<Point3<f64>>)> = scene
        .planes()
        .map(|plane| (plane, world_outline(plane)))
        .collect();

    // Fit the view box around every outline vertex
    let bounds = Bounds2::from_points(
        outlines.iter().flat_map(|(_, outline)| outline.iter()),
    )
    .unwrap_or(Bounds2 {
        min_x: -1.0,
        max_x: 1.0,
        min_z: -1.0,
        max_z: 1.0,
    });
    let mut document = Document::new()
        .set(
            "viewBox",
            (
                // Top-left corner
                bounds.min_x - MARGIN,
                bounds.min_z - MARGIN,
                // Width and height
                bounds.width() + MARGIN * 2.0,
                bounds.depth() + MARGIN * 2.0,
            ),
        )
        .add(Comment::new(format!("\n{:#?}\n", scene.registry.tiler())));

    for (plane, outline) in outlines {
        document = document.add(draw_plane(scene, plane, &outline));
    }

    document
}

/// The outline of a plane's mesh in world space, in vertex order
fn world_outline(plane: &PlaneBoundary) -> Vec<Point3<f64>> {
    plane
        .vertices
        .iter()
        .map(|vertex| plane.to_world(vertex))
        .collect()
}

/// Draw a plane, plus all the tiles on it
fn draw_plane(
    scene: &TiledScene,
    plane: &PlaneBoundary,
    outline: &[Point3<f64>],
) -> Group {
    let tiler = scene.registry.tiler();
    let mut group = Group::new()
        .add(Comment::new(plane.id.to_string())) // Readability!
        .add(
            Polygon::new()
                .set("points", to_svg_points(outline))
                .set("fill", PLANE_COLOR.to_html())
                .set("stroke", OUTLINE_COLOR.to_html())
                .set("stroke-width", 0.05),
        );

    for tile in scene
        .registry
        .sink()
        .tiles()
        .filter(|tile| tile.parent == plane.id)
    {
        let corners = tiler.world_corners(plane, &tile.placement.position);
        group = group.add(
            Polygon::new()
                .set("points", to_svg_points(&corners))
                .set("fill", tile.color.to_html())
                .set("fill-opacity", 0.8)
                .set("stroke", (tile.color * EDGE_SHADE).to_html())
                .set("stroke-width", 0.02),
        );
    }

    group
}

/// Flatten points onto the x/z plane
fn to_svg_points(points: &[Point3<f64>]) -> Vec<(f64, f64)> {
    points.iter().map(|point| (point.x, point.z)).collect()
}
