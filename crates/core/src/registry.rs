use crate::{
    boundary::{BoundaryId, PlaneBoundary},
    config::TilingConfig,
    events::{PlaneEventBus, PlanesChanged, Subscription},
    tiling::{HexPlacement, HexTiler},
    timed,
};
use anyhow::{bail, Context};
use fnv::FnvBuildHasher;
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::{cell::RefCell, rc::Rc};

/// The rendering side of tiling. A sink turns placements into whatever
/// concrete tile objects the host application uses (scene nodes, ECS
/// entities, draw calls...), and destroys them again when they go stale.
pub trait TileSink {
    /// Decorative category value, e.g. a material. Supplied through a
    /// [CategoryPalette].
    type Material;

    /// Whatever the sink needs to find a spawned tile again later
    type Handle;

    /// Create a tile for a placement. `placement.position` is relative to the
    /// surface identified by `parent`.
    fn spawn(
        &mut self,
        parent: &BoundaryId,
        placement: &HexPlacement,
        material: &Self::Material,
    ) -> Self::Handle;

    /// Destroy a previously spawned tile
    fn despawn(&mut self, handle: Self::Handle);
}

/// An ordered list of category values. Category `i` maps to the `i`th entry.
#[derive(Clone, Debug)]
pub struct CategoryPalette<M> {
    entries: Vec<M>,
}

impl<M> CategoryPalette<M> {
    /// Build a palette that must cover `category_count` categories. Returns an
    /// error if there are fewer entries than that. Extra entries are allowed
    /// (and never used).
    pub fn new(entries: Vec<M>, category_count: usize) -> anyhow::Result<Self> {
        if entries.len() < category_count {
            bail!(
                "insufficient categories: {} required, {} supplied",
                category_count,
                entries.len()
            );
        }
        Ok(Self { entries })
    }

    /// Get the value for a category, if the palette covers it
    pub fn get(&self, category: usize) -> Option<&M> {
        self.entries.get(category)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything we've spawned for one boundary
#[derive(Debug)]
struct TileSet<H> {
    placements: Vec<HexPlacement>,
    handles: Vec<H>,
}

/// The ownership table between tracked surfaces and their tiles. Each
/// boundary ID owns exactly one set of placements (and the tiles spawned for
/// them), and that set is only ever replaced wholesale.
///
/// A registry is single-threaded and synchronous: every recomputation runs to
/// completion before control returns to the caller. Boundaries are kept in
/// the order they were first seen, so iteration (and thus any output built
/// from it) is deterministic.
#[derive(Debug)]
pub struct TileRegistry<S: TileSink> {
    tiler: HexTiler,
    palette: CategoryPalette<S::Material>,
    sink: S,
    tiles: IndexMap<BoundaryId, TileSet<S::Handle>, FnvBuildHasher>,
}

impl<S: TileSink> TileRegistry<S> {
    /// Set up a registry. All configuration is checked here, so that a bad
    /// radius or a short palette fails loudly at startup instead of quietly on
    /// every frame.
    pub fn new(
        config: TilingConfig,
        palette: Vec<S::Material>,
        sink: S,
    ) -> anyhow::Result<Self> {
        let tiler = HexTiler::new(&config)?;
        let palette = CategoryPalette::new(palette, config.category_count)
            .context("invalid category palette")?;
        Ok(Self {
            tiler,
            palette,
            sink,
            tiles: IndexMap::default(),
        })
    }

    /// Handle a batch of surface changes. Added and updated boundaries are
    /// both fully re-tiled; removed boundaries lose all their tiles.
    pub fn apply(&mut self, event: &PlanesChanged) {
        for boundary in event.added.iter().chain(&event.updated) {
            self.recompute(boundary);
        }
        for id in &event.removed {
            self.remove(id);
        }
        info!(
            "Applied plane changes (+{} ~{} -{}), {} tiles across {} boundaries",
            event.added.len(),
            event.updated.len(),
            event.removed.len(),
            self.total_tiles(),
            self.tiles.len()
        );
    }

    /// Re-tile a boundary from scratch, replacing whatever it had before.
    /// Returns the number of tiles it has now.
    pub fn recompute(&mut self, boundary: &PlaneBoundary) -> usize {
        let placements = timed!(
            format!("Tiling boundary {}", boundary.id),
            self.tiler.tile(boundary)
        );
        self.set_placements(boundary.id.clone(), placements)
    }

    /// Replace all placements for a boundary. Every tile from the previous set
    /// is despawned before any new one is spawned, so the sink never sees
    /// stale tiles mixed in with fresh ones. Returns the number of tiles
    /// spawned.
    ///
    /// Placements with a category the palette doesn't cover are dropped, as
    /// are placements that belong to a different boundary. Neither can happen
    /// for placements from this registry's own tiler.
    pub fn set_placements(
        &mut self,
        id: BoundaryId,
        placements: Vec<HexPlacement>,
    ) -> usize {
        let despawned = self.despawn_all(&id);

        let palette = &self.palette;
        let sink = &mut self.sink;
        let mut kept = Vec::with_capacity(placements.len());
        let mut handles = Vec::with_capacity(placements.len());
        for placement in placements {
            if placement.boundary != id {
                warn!(
                    "Dropping placement {} on {}: it belongs to {}",
                    placement.coord, id, placement.boundary
                );
                continue;
            }
            match palette.get(placement.category) {
                Some(material) => {
                    handles.push(sink.spawn(&id, &placement, material));
                    kept.push(placement);
                }
                None => warn!(
                    "Dropping placement {} on {}: no material for category {}",
                    placement.coord, id, placement.category
                ),
            }
        }

        debug!(
            "Replaced {} tiles on {} with {}",
            despawned,
            id,
            handles.len()
        );
        let spawned = handles.len();
        self.tiles.insert(
            id,
            TileSet {
                placements: kept,
                handles,
            },
        );
        spawned
    }

    /// Forget a boundary entirely, despawning all its tiles. Returns the
    /// number of tiles despawned.
    pub fn remove(&mut self, id: &BoundaryId) -> usize {
        let despawned = self.despawn_all(id);
        self.tiles.shift_remove(id);
        despawned
    }

    /// Despawn every tile on every boundary
    pub fn clear(&mut self) {
        let ids: Vec<BoundaryId> = self.tiles.keys().cloned().collect();
        for id in ids {
            self.remove(&id);
        }
    }

    /// Current placements for a boundary. Empty if the boundary is unknown.
    pub fn placements(&self, id: &BoundaryId) -> &[HexPlacement] {
        self.tiles
            .get(id)
            .map(|set| set.placements.as_slice())
            .unwrap_or(&[])
    }

    /// Current tile handles for a boundary, in the same order as
    /// [Self::placements]. Empty if the boundary is unknown.
    pub fn handles(&self, id: &BoundaryId) -> &[S::Handle] {
        self.tiles
            .get(id)
            .map(|set| set.handles.as_slice())
            .unwrap_or(&[])
    }

    /// All known boundaries, in the order they were first seen
    pub fn boundary_ids(&self) -> impl Iterator<Item = &BoundaryId> {
        self.tiles.keys()
    }

    /// Total number of live tiles across all boundaries
    pub fn total_tiles(&self) -> usize {
        self.tiles.values().map(|set| set.handles.len()).sum()
    }

    pub fn tiler(&self) -> &HexTiler {
        &self.tiler
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Take the sink back out of the registry. Live tiles are **not**
    /// despawned; call [Self::clear] first if that's what you want.
    pub fn into_sink(self) -> S {
        self.sink
    }

    fn despawn_all(&mut self, id: &BoundaryId) -> usize {
        match self.tiles.get_mut(id) {
            Some(set) => {
                set.placements.clear();
                let count = set.handles.len();
                for handle in set.handles.drain(..) {
                    self.sink.despawn(handle);
                }
                count
            }
            None => 0,
        }
    }
}

impl<S> TileRegistry<S>
where
    S: TileSink + 'static,
{
    /// Hook a shared registry up to an event bus, so that every published
    /// [PlanesChanged] gets applied to it. The registry stays subscribed until
    /// the returned [Subscription] is dropped. The bus only holds a weak
    /// reference, so dropping the registry also effectively unsubscribes it.
    pub fn attach(
        registry: &Rc<RefCell<Self>>,
        bus: &PlaneEventBus,
    ) -> Subscription {
        let registry = Rc::downgrade(registry);
        bus.subscribe(move |event| {
            if let Some(registry) = registry.upgrade() {
                registry.borrow_mut().apply(event);
            }
        })
    }
}
