//! Structural change notifications for rendered lists.
//!
//! A view re-renders its list on every data update, but listeners only care
//! when the *set of rendered items* changes shape: an item appears, goes
//! away, moves, or the active marker lands on a different item.
//! [`RenderedItems`] detects exactly that, and [`ChangeFeed`] fans the event
//! out to subscribers synchronously on the UI thread.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// What changed between two renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuralChange {
    /// Item count after the change
    pub len: usize,
    /// Position of the active item after the change
    pub active: Option<usize>,
}

/// The ordered keys of the currently rendered items plus the active marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedItems<K> {
    keys: Vec<K>,
    active: Option<usize>,
}

impl<K> Default for RenderedItems<K> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            active: None,
        }
    }
}

impl<K: PartialEq> RenderedItems<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Position of the active item, if any
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    /// Key of the active item, if any
    pub fn active_key(&self) -> Option<&K> {
        self.active.and_then(|i| self.keys.get(i))
    }

    /// Record a new render.
    ///
    /// Returns a change only if items were inserted, removed or reordered, or
    /// if a different element now carries the active marker. An out-of-range
    /// `active` is treated as "no active item".
    pub fn replace(&mut self, keys: Vec<K>, active: Option<usize>) -> Option<StructuralChange> {
        let active = active.filter(|&i| i < keys.len());
        let reshaped = self.keys != keys;
        let marker_moved = self.active_key() != active.and_then(|i| keys.get(i));

        self.keys = keys;
        self.active = active;

        if reshaped || marker_moved {
            Some(StructuralChange {
                len: self.keys.len(),
                active,
            })
        } else {
            None
        }
    }
}

type Listener = Rc<RefCell<dyn FnMut(&StructuralChange)>>;

struct Entry {
    id: u64,
    /// Shared with the owning [`Subscription`]
    released: Rc<Cell<bool>>,
    listener: Listener,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<Entry>,
}

/// Single-threaded observer list for structural changes
#[derive(Clone, Default)]
pub struct ChangeFeed {
    inner: Rc<RefCell<Listeners>>,
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It stays registered until the returned
    /// [`Subscription`] is released or dropped.
    pub fn subscribe(&self, listener: impl FnMut(&StructuralChange) + 'static) -> Subscription {
        let released = Rc::new(Cell::new(false));
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.push(Entry {
            id,
            released: released.clone(),
            listener: Rc::new(RefCell::new(listener)),
        });
        Subscription {
            id,
            feed: Rc::downgrade(&self.inner),
            released,
        }
    }

    /// Invoke every live listener, in subscription order.
    ///
    /// Listeners run against a snapshot taken outside the borrow, so they may
    /// subscribe, unsubscribe or notify again. A listener released mid-pass
    /// is not called, and a listener already running is not re-entered.
    pub fn notify(&self, change: &StructuralChange) {
        let snapshot: Vec<(Rc<Cell<bool>>, Listener)> = self
            .inner
            .borrow()
            .entries
            .iter()
            .map(|e| (e.released.clone(), e.listener.clone()))
            .collect();

        for (released, listener) in snapshot {
            if released.get() {
                continue;
            }
            let Ok(mut running) = listener.try_borrow_mut() else {
                tracing::trace!("listener already running, skipped nested change");
                continue;
            };
            (*running)(change);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().entries.len()
    }
}

/// Handle to a registered listener
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    feed: Weak<RefCell<Listeners>>,
    released: Rc<Cell<bool>>,
}

impl Subscription {
    /// Release the listener. Returns `true` only for the call that actually
    /// released it.
    pub fn unsubscribe(&mut self) -> bool {
        if self.released.replace(true) {
            return false;
        }
        if let Some(feed) = self.feed.upgrade() {
            feed.borrow_mut().entries.retain(|e| e.id != self.id);
        }
        true
    }

    pub fn is_released(&self) -> bool {
        self.released.get()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
