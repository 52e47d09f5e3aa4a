//! Keeps the active list item vertically centered in its scroll container.
//!
//! Geometry is read through [`ScrollContainer`] and [`ActiveItemSource`], so
//! the centering math does not depend on how items are laid out or drawn.
//! [`ScrollCenterer`] wires a container to a [`ChangeFeed`] and re-centers
//! after every structural change of the rendered items.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::changes::{ChangeFeed, StructuralChange, Subscription};

/// On-screen bounding rectangle (y grows downwards)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Bounds {
    pub fn new(top: f64, bottom: f64, left: f64, right: f64) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn midpoint_y(&self) -> f64 {
        self.top + self.height() / 2.0
    }
}

/// A scrollable viewport owned by the rendering layer
pub trait ScrollContainer {
    /// Current on-screen rectangle of the container
    fn bounding_rect(&self) -> Bounds;

    /// Height of the visible content area
    fn client_height(&self) -> f64;

    /// Distance the content is currently shifted up
    fn scroll_top(&self) -> f64;

    /// Apply a new offset. Clamping to the valid range is up to the container.
    fn set_scroll_top(&mut self, offset: f64);
}

/// Locates the element currently carrying the active marker
pub trait ActiveItemSource {
    fn active_rect(&self) -> Option<Bounds>;
}

/// Offset that puts the midpoint of `active` at the midpoint of the
/// container's visible height.
pub fn center_offset(container_rect: Bounds, scroll_top: f64, client_height: f64, active: Bounds) -> f64 {
    // Position from the content origin, independent of the current scroll.
    let active_top = active.top - container_rect.top + scroll_top;
    active_top - client_height / 2.0 + active.height() / 2.0
}

/// Scroll `container` so `active` is centered, or back to the top if there
/// is no active element. The target is not clamped here.
pub fn recenter<C: ScrollContainer + ?Sized>(container: &mut C, active: Option<Bounds>) {
    let Some(active) = active else {
        container.set_scroll_top(0.0);
        return;
    };

    let target = center_offset(
        container.bounding_rect(),
        container.scroll_top(),
        container.client_height(),
        active,
    );
    container.set_scroll_top(target);
}

/// [`recenter`] using the container's own active element lookup
pub fn recenter_active<C: ScrollContainer + ActiveItemSource + ?Sized>(container: &mut C) {
    let active = container.active_rect();
    recenter(container, active);
}

/// Re-centers a container whenever its rendered items change structurally.
///
/// The centerer holds the container weakly: once the view that owns the
/// container is gone, pending notifications do nothing.
#[derive(Debug, Default)]
pub struct ScrollCenterer {
    subscription: Option<Subscription>,
}

impl ScrollCenterer {
    /// Center once now, then after every change published on `feed`
    pub fn attach<C>(container: &Rc<RefCell<C>>, feed: &ChangeFeed) -> Self
    where
        C: ScrollContainer + ActiveItemSource + 'static,
    {
        recenter_active(&mut *container.borrow_mut());

        let target: Weak<RefCell<C>> = Rc::downgrade(container);
        let subscription = feed.subscribe(move |change: &StructuralChange| {
            let Some(shared) = target.upgrade() else {
                return;
            };
            let Ok(mut container) = shared.try_borrow_mut() else {
                tracing::warn!("scroll container busy, skipped recenter");
                return;
            };
            recenter_active(&mut *container);
            tracing::trace!(
                len = change.len,
                active = ?change.active,
                scroll_top = container.scroll_top(),
                "recentered after structural change"
            );
        });

        Self {
            subscription: Some(subscription),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.as_ref().is_some_and(|s| !s.is_released())
    }

    /// Stop listening. Returns `false` if already detached.
    pub fn detach(&mut self) -> bool {
        match self.subscription.take() {
            Some(mut subscription) => subscription.unsubscribe(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Container whose active child sits at a fixed content position
    struct Panel {
        rect: Bounds,
        scroll_top: f64,
        active: Option<(f64, f64)>,
    }

    impl Panel {
        fn new(top: f64, height: f64) -> Self {
            Self {
                rect: Bounds::new(top, top + height, 0.0, 80.0),
                scroll_top: 0.0,
                active: None,
            }
        }
    }

    impl ScrollContainer for Panel {
        fn bounding_rect(&self) -> Bounds {
            self.rect
        }

        fn client_height(&self) -> f64 {
            self.rect.height()
        }

        fn scroll_top(&self) -> f64 {
            self.scroll_top
        }

        fn set_scroll_top(&mut self, offset: f64) {
            self.scroll_top = offset;
        }
    }

    impl ActiveItemSource for Panel {
        fn active_rect(&self) -> Option<Bounds> {
            self.active.map(|(content_top, height)| {
                let top = self.rect.top + content_top - self.scroll_top;
                Bounds::new(top, top + height, 0.0, 80.0)
            })
        }
    }

    #[test]
    fn test_concrete_scenario() {
        let mut panel = Panel::new(0.0, 100.0);
        recenter(&mut panel, Some(Bounds::new(240.0, 260.0, 0.0, 80.0)));
        assert_eq!(panel.scroll_top, 200.0);
    }

    #[test]
    fn test_no_active_resets_to_zero() {
        let mut panel = Panel::new(5.0, 100.0);
        panel.scroll_top = 321.0;
        recenter(&mut panel, None);
        assert_eq!(panel.scroll_top, 0.0);
    }

    #[test]
    fn test_active_midpoint_lands_on_container_midpoint() {
        let mut panel = Panel::new(12.0, 40.0);
        panel.scroll_top = 17.0;
        panel.active = Some((130.0, 3.0));

        recenter_active(&mut panel);

        let active = panel.active_rect().unwrap();
        let container_mid = panel.rect.top + panel.client_height() / 2.0;
        assert!((active.midpoint_y() - container_mid).abs() < 1e-9);
    }

    #[test]
    fn test_recenter_is_idempotent() {
        let mut panel = Panel::new(3.0, 50.0);
        panel.scroll_top = 9.0;
        panel.active = Some((77.0, 2.0));

        recenter_active(&mut panel);
        let first = panel.scroll_top;
        recenter_active(&mut panel);
        assert_eq!(panel.scroll_top, first);
    }

    #[test]
    fn test_target_is_not_clamped() {
        let mut panel = Panel::new(0.0, 100.0);
        panel.active = Some((10.0, 20.0));
        recenter_active(&mut panel);
        assert_eq!(panel.scroll_top, -30.0);
    }

    #[test]
    fn test_centerer_recenters_on_attach_and_on_change() {
        let panel = Rc::new(RefCell::new(Panel::new(0.0, 100.0)));
        panel.borrow_mut().active = Some((240.0, 20.0));
        let feed = ChangeFeed::new();

        let mut centerer = ScrollCenterer::attach(&panel, &feed);
        assert_eq!(panel.borrow().scroll_top, 200.0);

        panel.borrow_mut().active = Some((500.0, 20.0));
        feed.notify(&StructuralChange { len: 1, active: Some(0) });
        assert_eq!(panel.borrow().scroll_top, 460.0);

        panel.borrow_mut().active = None;
        feed.notify(&StructuralChange { len: 1, active: None });
        assert_eq!(panel.borrow().scroll_top, 0.0);

        assert!(centerer.detach());
        assert!(!centerer.detach());
        assert!(!centerer.is_attached());

        panel.borrow_mut().active = Some((240.0, 20.0));
        feed.notify(&StructuralChange { len: 1, active: Some(0) });
        assert_eq!(panel.borrow().scroll_top, 0.0);
    }

    #[test]
    fn test_busy_container_skips_recenter() {
        let panel = Rc::new(RefCell::new(Panel::new(0.0, 100.0)));
        panel.borrow_mut().active = Some((240.0, 20.0));
        let feed = ChangeFeed::new();
        let _centerer = ScrollCenterer::attach(&panel, &feed);
        assert_eq!(panel.borrow().scroll_top, 200.0);

        {
            let mut held = panel.borrow_mut();
            held.active = Some((500.0, 20.0));
            feed.notify(&StructuralChange { len: 1, active: Some(0) });
            assert_eq!(held.scroll_top, 200.0);
        }

        feed.notify(&StructuralChange { len: 1, active: Some(0) });
        assert_eq!(panel.borrow().scroll_top, 460.0);
    }

    #[test]
    fn test_dropped_container_is_ignored() {
        let panel = Rc::new(RefCell::new(Panel::new(0.0, 100.0)));
        let feed = ChangeFeed::new();
        let _centerer = ScrollCenterer::attach(&panel, &feed);
        drop(panel);
        feed.notify(&StructuralChange { len: 0, active: None });
    }
}
