use crate::boundary::{BoundaryId, PlaneBoundary};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

/// A batch of changes reported by the plane tracking system. Trackers tend to
/// report changes once per frame, so a single event can carry any number of
/// boundaries in each list.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanesChanged {
    /// Surfaces that were detected for the first time
    pub added: Vec<PlaneBoundary>,
    /// Surfaces whose geometry or pose changed since the last event
    pub updated: Vec<PlaneBoundary>,
    /// Surfaces that tracking lost (or merged into another surface)
    pub removed: Vec<BoundaryId>,
}

impl PlanesChanged {
    /// Does this event carry no changes at all?
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
    }
}

type Handler = Box<dyn FnMut(&PlanesChanged)>;

#[derive(Default)]
struct Handlers {
    next_id: u64,
    entries: Vec<(u64, Handler)>,
    /// Set while the entries are checked out for a publish. Unsubscribes that
    /// happen during that window get recorded here instead.
    publishing: bool,
    unsubscribed_while_publishing: Vec<u64>,
}

/// A single-threaded broadcaster for [PlanesChanged] events. This is the glue
/// between the plane tracking system (which publishes) and anything that
/// reacts to surface changes, most notably a
/// [TileRegistry](crate::TileRegistry).
///
/// Subscriptions are scoped: [Self::subscribe] hands back a [Subscription],
/// and the handler stays registered exactly as long as that value is alive.
/// Handlers are free to subscribe or unsubscribe (on this same bus) while an
/// event is being published; changes take effect from the next publish.
#[derive(Default)]
pub struct PlaneEventBus {
    handlers: Rc<RefCell<Handlers>>,
}

impl PlaneEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. It will be called for every published event until
    /// the returned [Subscription] is dropped.
    #[must_use = "the handler is unsubscribed as soon as this is dropped"]
    pub fn subscribe(
        &self,
        handler: impl FnMut(&PlanesChanged) + 'static,
    ) -> Subscription {
        let mut handlers = self.handlers.borrow_mut();
        let id = handlers.next_id;
        handlers.next_id += 1;
        handlers.entries.push((id, Box::new(handler)));
        Subscription {
            id,
            handlers: Rc::downgrade(&self.handlers),
        }
    }

    /// Deliver an event to every live handler, in the order they subscribed.
    /// Publishing from inside a handler isn't supported; the nested event is
    /// dropped with a warning. If a handler panics, the bus is left intact
    /// and every subscription (including the panicking one) stays live.
    pub fn publish(&self, event: &PlanesChanged) {
        // Check the handlers out so they can touch the bus while they run
        let mut checkout = {
            let mut handlers = self.handlers.borrow_mut();
            if handlers.publishing {
                warn!("Ignoring nested publish of {:?}", event);
                return;
            }
            handlers.publishing = true;
            Checkout {
                entries: std::mem::take(&mut handlers.entries),
                handlers: &self.handlers,
            }
        };

        for (_, handler) in checkout.entries.iter_mut() {
            handler(event);
        }
    }

    /// Number of live subscriptions. Mid-publish, this only counts handlers
    /// that subscribed during the publish.
    pub fn subscriber_count(&self) -> usize {
        self.handlers.borrow().entries.len()
    }
}

/// Handlers that are checked out of a bus for the duration of a publish. They
/// get returned on drop, so a panicking handler can't take the others with it.
struct Checkout<'a> {
    entries: Vec<(u64, Handler)>,
    handlers: &'a RefCell<Handlers>,
}

impl Drop for Checkout<'_> {
    fn drop(&mut self) {
        let mut handlers = self.handlers.borrow_mut();
        let unsubscribed =
            std::mem::take(&mut handlers.unsubscribed_while_publishing);
        let mut entries = std::mem::take(&mut self.entries);
        entries.retain(|(id, _)| !unsubscribed.contains(id));
        // Anything subscribed during the publish goes after the existing ones
        entries.append(&mut handlers.entries);
        handlers.entries = entries;
        handlers.publishing = false;
    }
}

/// Keeps a handler registered on a [PlaneEventBus]. Drop it to unsubscribe.
/// Outliving the bus is fine, dropping it then does nothing.
pub struct Subscription {
    id: u64,
    handlers: Weak<RefCell<Handlers>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(handlers) = self.handlers.upgrade() {
            let mut handlers = handlers.borrow_mut();
            let id = self.id;
            handlers.entries.retain(|(entry_id, _)| *entry_id != id);
            if handlers.publishing {
                handlers.unsubscribed_while_publishing.push(id);
            }
        }
    }
}
