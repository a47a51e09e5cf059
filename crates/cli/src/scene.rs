use crate::color::Color3;
use anyhow::{anyhow, Context};
use config::{Config, File};
use hexfloor::{
    BoundaryId, HexPlacement, PlaneBoundary, PlaneEventBus, PlanesChanged,
    TileRegistry, TileSink, TilingConfig,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    path::Path,
    rc::Rc,
};

/// A recorded plane tracking session: the surfaces that exist at the start,
/// plus any changes that happen afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub tiling: TilingConfig,

    /// One color per category, as `#rrggbb`. Must have at least
    /// `tiling.category_count` entries.
    #[serde(default = "default_palette")]
    pub palette: Vec<Color3>,

    /// Surfaces that are present from the start
    #[serde(default)]
    pub planes: Vec<PlaneBoundary>,

    /// Changes to replay, in order, after the initial planes are added
    #[serde(default)]
    pub events: Vec<PlanesChanged>,
}

fn default_palette() -> Vec<Color3> {
    vec![
        Color3::new_int(0xe0, 0x7a, 0x5f),
        Color3::new_int(0x3d, 0x40, 0x5b),
        Color3::new_int(0x81, 0xb2, 0x9a),
    ]
}

impl SceneConfig {
    /// Load a scene from a file. Supported formats: JSON, TOML
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut settings = Config::new();
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("invalid character in path {:?}", path))?;
        settings
            .merge(File::with_name(path_str))
            .context("error reading scene file")?;
        settings.try_into().context("error reading scene")
    }

    /// The full sequence of changes in this scene, starting with the initial
    /// planes being added
    pub fn changes(&self) -> impl Iterator<Item = PlanesChanged> + '_ {
        let initial = PlanesChanged {
            added: self.planes.clone(),
            ..Default::default()
        };
        std::iter::once(initial)
            .chain(self.events.iter().cloned())
            .filter(|event| !event.is_empty())
    }
}

/// A tile that's been "rendered" into the scene
#[derive(Clone, Debug)]
pub struct SceneTile {
    pub parent: BoundaryId,
    pub placement: HexPlacement,
    pub color: Color3,
}

/// Stands in for a real scene graph: just remembers every live tile
#[derive(Debug, Default)]
pub struct SceneSink {
    next_handle: u64,
    tiles: BTreeMap<u64, SceneTile>,
}

impl SceneSink {
    /// Every live tile, in the order they were spawned
    pub fn tiles(&self) -> impl Iterator<Item = &SceneTile> {
        self.tiles.values()
    }
}

impl TileSink for SceneSink {
    type Material = Color3;
    type Handle = u64;

    fn spawn(
        &mut self,
        parent: &BoundaryId,
        placement: &HexPlacement,
        material: &Color3,
    ) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.tiles.insert(
            handle,
            SceneTile {
                parent: parent.clone(),
                placement: placement.clone(),
                color: *material,
            },
        );
        handle
    }

    fn despawn(&mut self, handle: u64) {
        self.tiles.remove(&handle);
    }
}

/// The end state of a replayed scene
pub struct TiledScene {
    pub registry: TileRegistry<SceneSink>,
    /// Latest snapshot of each surface that's still tracked
    pub planes: HashMap<BoundaryId, PlaneBoundary>,
}

impl TiledScene {
    /// Surfaces in the order they were first seen, with their latest
    /// snapshot
    pub fn planes(&self) -> impl Iterator<Item = &PlaneBoundary> {
        self.registry
            .boundary_ids()
            .filter_map(move |id| self.planes.get(id))
    }
}

/// Play every change in a scene through an event bus, the same way a live
/// tracking session would deliver them
pub fn replay(scene: &SceneConfig) -> anyhow::Result<TiledScene> {
    let registry = Rc::new(RefCell::new(TileRegistry::new(
        scene.tiling,
        scene.palette.clone(),
        SceneSink::default(),
    )?));
    let planes: Rc<RefCell<HashMap<BoundaryId, PlaneBoundary>>> =
        Rc::default();

    let bus = PlaneEventBus::new();
    let registry_subscription = TileRegistry::attach(&registry, &bus);
    let planes_handle = Rc::clone(&planes);
    let planes_subscription = bus.subscribe(move |event| {
        let mut planes = planes_handle.borrow_mut();
        for boundary in event.added.iter().chain(&event.updated) {
            planes.insert(boundary.id.clone(), boundary.clone());
        }
        for id in &event.removed {
            planes.remove(id);
        }
    });

    for (i, event) in scene.changes().enumerate() {
        debug!("Replaying change {}", i);
        bus.publish(&event);
    }
    drop(registry_subscription);
    drop(planes_subscription);

    let registry = Rc::try_unwrap(registry)
        .map_err(|_| anyhow!("registry is still shared after replay"))?
        .into_inner();
    let planes = Rc::try_unwrap(planes)
        .map_err(|_| anyhow!("planes are still shared after replay"))?
        .into_inner();
    info!(
        "Scene has {} tiles across {} planes",
        registry.total_tiles(),
        planes.len()
    );
    Ok(TiledScene { registry, planes })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r##"{
        "tiling": {"hex_radius": 0.5},
        "palette": ["#ff0000", "#00ff00", "#0000ff"],
        "planes": [
            {
                "id": "floor",
                "vertices": [[-2, 0, -2], [2, 0, -2], [2, 0, 2], [-2, 0, 2]],
                "triangles": [[0, 1, 2], [0, 2, 3]]
            },
            {
                "id": "table",
                "pose": {"position": [5, 0.8, 0]},
                "vertices": [[-1, 0, -1], [1, 0, -1], [1, 0, 1], [-1, 0, 1]],
                "triangles": [[0, 1, 2], [0, 2, 3]]
            }
        ],
        "events": [
            {"removed": ["table"]}
        ]
    }"##;

    #[test]
    fn test_replay() {
        let scene: SceneConfig = serde_json::from_str(SCENE).unwrap();
        assert_eq!(scene.changes().count(), 2);

        let tiled = replay(&scene).unwrap();
        assert_eq!(tiled.registry.total_tiles(), 14);
        assert_eq!(tiled.registry.sink().tiles().count(), 14);
        assert_eq!(
            tiled.planes().map(|plane| plane.id.as_str()).collect::<Vec<_>>(),
            vec!["floor"]
        );
        for tile in tiled.registry.sink().tiles() {
            assert_eq!(tile.parent, BoundaryId::from("floor"));
            assert_eq!(tile.color, scene.palette[tile.placement.category]);
        }
    }

    #[test]
    fn test_short_palette() {
        let mut scene: SceneConfig = serde_json::from_str(SCENE).unwrap();
        scene.palette.truncate(2);
        assert!(replay(&scene).is_err());
    }

    #[test]
    fn test_demo_scene() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../demos/scene.toml");
        let scene = SceneConfig::load(&path).unwrap();
        assert_eq!(scene.planes.len(), 2);
        assert_eq!(scene.changes().count(), 3);

        let tiled = replay(&scene).unwrap();
        assert_eq!(
            tiled.planes().map(|plane| plane.id.as_str()).collect::<Vec<_>>(),
            vec!["floor"]
        );
        assert!(tiled.registry.total_tiles() > 0);
        assert!(tiled
            .registry
            .sink()
            .tiles()
            .all(|tile| tile.parent.as_str() == "floor"));
    }

    #[test]
    fn test_defaults() {
        let scene: SceneConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(scene.palette.len(), scene.tiling.category_count);
        assert_eq!(scene.changes().count(), 0);
    }
}
