//! Points scroll view.
//!
//! [`Scroller`] is the terminal scroll container: it lays points out in rows,
//! answers geometry queries in screen coordinates and clamps its own offset.
//! [`ScrollView`] owns the scroller together with the rendered item set and a
//! [`ScrollCenterer`], so the active point stays centered whenever the list
//! changes shape. [`PointListWidget`] draws the visible part.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::Widget,
};

use crate::changes::{ChangeFeed, RenderedItems};
use crate::models::{generate_points, Point};
use crate::scroll::{ActiveItemSource, Bounds, ScrollCenterer, ScrollContainer};
use crate::theme::{colors, styles};

/// Rows taken by a point with a creation date (label + date line)
const DATED_ROW_HEIGHT: f64 = 2.0;
/// Rows taken by a point without one
const PLAIN_ROW_HEIGHT: f64 = 1.0;

const ACTIVE_MARKER: &str = "▶ ";
const INACTIVE_MARKER: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq)]
struct RowLayout {
    content_top: f64,
    height: f64,
    active: bool,
}

/// Scrollable viewport over a laid-out list of points
#[derive(Debug, Clone, Default)]
pub struct Scroller {
    viewport: Bounds,
    rows: Vec<RowLayout>,
    scroll_top: f64,
}

impl Scroller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn viewport(&self) -> Bounds {
        self.viewport
    }

    /// Move or resize the viewport; the offset is clamped to the new range
    pub fn set_viewport(&mut self, viewport: Bounds) {
        self.viewport = viewport;
        self.set_scroll_top(self.scroll_top);
    }

    /// Lay out `points`, marking the one numbered `active`
    pub fn set_rows(&mut self, points: &[Point], active: Option<u32>) {
        let mut content_top = 0.0;
        self.rows = points
            .iter()
            .map(|p| {
                let height = if p.created_at.is_some() {
                    DATED_ROW_HEIGHT
                } else {
                    PLAIN_ROW_HEIGHT
                };
                let row = RowLayout {
                    content_top,
                    height,
                    active: Some(p.point) == active,
                };
                content_top += height;
                row
            })
            .collect();
        self.set_scroll_top(self.scroll_top);
    }

    pub fn content_height(&self) -> f64 {
        self.rows.last().map_or(0.0, |r| r.content_top + r.height)
    }

    pub fn max_scroll_top(&self) -> f64 {
        (self.content_height() - self.client_height()).max(0.0)
    }

    /// Offset in whole terminal rows, as drawn
    pub fn rendered_offset(&self) -> i64 {
        self.scroll_top.round() as i64
    }

    /// On-screen rectangle of row `index` at the current offset
    pub fn item_rect(&self, index: usize) -> Option<Bounds> {
        let row = self.rows.get(index)?;
        let top = self.viewport.top + row.content_top - self.scroll_top;
        Some(Bounds::new(
            top,
            top + row.height,
            self.viewport.left,
            self.viewport.right,
        ))
    }

    fn active_index(&self) -> Option<usize> {
        self.rows.iter().position(|r| r.active)
    }
}

impl ScrollContainer for Scroller {
    fn bounding_rect(&self) -> Bounds {
        self.viewport
    }

    fn client_height(&self) -> f64 {
        self.viewport.height().max(0.0)
    }

    fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    fn set_scroll_top(&mut self, offset: f64) {
        let offset = if offset.is_finite() { offset } else { 0.0 };
        self.scroll_top = offset.clamp(0.0, self.max_scroll_top());
    }
}

impl ActiveItemSource for Scroller {
    fn active_rect(&self) -> Option<Bounds> {
        self.item_rect(self.active_index()?)
    }
}

/// Convert a terminal area into scroll geometry
pub fn rect_bounds(area: Rect) -> Bounds {
    Bounds::new(
        f64::from(area.y),
        f64::from(area.y) + f64::from(area.height),
        f64::from(area.x),
        f64::from(area.x) + f64::from(area.width),
    )
}

/// The points demo view
#[derive(Debug)]
pub struct ScrollView {
    scroller: Rc<RefCell<Scroller>>,
    points: Vec<Point>,
    active_point: Option<u32>,
    rendered: RenderedItems<u32>,
    feed: ChangeFeed,
    /// Attached after the first layout
    centerer: Option<ScrollCenterer>,
    rng: StdRng,
    size: u32,
}

impl ScrollView {
    pub fn new(size: u32, rng: StdRng) -> Self {
        Self {
            scroller: Rc::new(RefCell::new(Scroller::new())),
            points: Vec::new(),
            active_point: None,
            rendered: RenderedItems::new(),
            feed: ChangeFeed::new(),
            centerer: None,
            rng,
            size,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn active_point(&self) -> Option<u32> {
        self.active_point
    }

    pub fn scroller(&self) -> Ref<'_, Scroller> {
        self.scroller.borrow()
    }

    pub fn is_laid_out(&self) -> bool {
        self.centerer.is_some()
    }

    #[cfg(test)]
    pub fn feed(&self) -> ChangeFeed {
        self.feed.clone()
    }

    /// Place the view: the initial layout on the first call, a resize after
    pub fn layout(&mut self, viewport: Bounds) {
        if self.is_laid_out() {
            self.resize(viewport);
        } else {
            self.after_first_layout(viewport);
        }
    }

    /// Initial render hook: center once and start following structural changes
    pub fn after_first_layout(&mut self, viewport: Bounds) {
        if self.is_laid_out() {
            self.resize(viewport);
            return;
        }

        self.scroller.borrow_mut().set_viewport(viewport);
        self.centerer = Some(ScrollCenterer::attach(&self.scroller, &self.feed));
        tracing::debug!(
            top = viewport.top,
            height = viewport.height(),
            width = viewport.width(),
            "scroll view laid out"
        );
    }

    /// Move or resize the viewport. The offset is clamped, not recentered.
    pub fn resize(&mut self, viewport: Bounds) {
        if self.scroller.borrow().viewport() != viewport {
            self.scroller.borrow_mut().set_viewport(viewport);
        }
    }

    /// Replace the points with a fresh random set
    pub fn generate(&mut self, now: DateTime<Local>) {
        let (points, active) = generate_points(&mut self.rng, now, self.size);
        self.set_points(points, active);
    }

    pub fn set_points(&mut self, points: Vec<Point>, active: Option<u32>) {
        self.points = points;
        self.active_point = active;
        self.rerender();
    }

    /// Move the active marker by `delta` points, staying within the list
    pub fn move_active(&mut self, delta: i64) {
        let Some(last) = self.points.last().map(|p| i64::from(p.point)) else {
            return;
        };
        let current = self.active_point.map_or(1, i64::from);
        let next = (current + delta).clamp(1, last);
        self.active_point = u32::try_from(next).ok();
        self.rerender();
    }

    pub fn clear(&mut self) {
        self.set_points(Vec::new(), None);
    }

    /// Push the current points to the scroller and publish a structural
    /// change if the rendered set changed shape.
    fn rerender(&mut self) {
        self.scroller
            .borrow_mut()
            .set_rows(&self.points, self.active_point);

        let keys: Vec<u32> = self.points.iter().map(|p| p.point).collect();
        let active_index = self
            .active_point
            .and_then(|a| self.points.iter().position(|p| p.point == a));

        if let Some(change) = self.rendered.replace(keys, active_index) {
            self.feed.notify(&change);
            tracing::trace!(
                items = self.rendered.len(),
                active = ?self.rendered.active(),
                "points re-rendered"
            );
        }
    }
}

impl Drop for ScrollView {
    fn drop(&mut self) {
        if let Some(centerer) = self.centerer.as_mut() {
            centerer.detach();
            tracing::debug!("scroll view destroyed");
        }
    }
}

/// Draws the visible rows of a [`ScrollView`]
pub struct PointListWidget<'a> {
    view: &'a ScrollView,
}

impl<'a> PointListWidget<'a> {
    pub fn new(view: &'a ScrollView) -> Self {
        Self { view }
    }
}

impl Widget for PointListWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let scroller = self.view.scroller();
        let offset = scroller.rendered_offset();
        let area_top = i64::from(area.y);
        let area_bottom = area_top + i64::from(area.height);

        let mut content_top = 0i64;
        for point in &self.view.points {
            let is_active = Some(point.point) == self.view.active_point;
            let (row_style, marker) = if is_active {
                (styles::selected(), ACTIVE_MARKER)
            } else {
                (styles::text(), INACTIVE_MARKER)
            };

            let mut lines = vec![(format!("{}Point {:>3}", marker, point.point), row_style)];
            if let Some(created_at) = point.created_at {
                let date_style = if is_active {
                    row_style
                } else {
                    styles::text_dim()
                };
                lines.push((
                    format!("    created {}", created_at.format("%Y-%m-%d %H:%M")),
                    date_style,
                ));
            }

            for (i, (text, style)) in lines.iter().enumerate() {
                let y = area_top + content_top + i as i64 - offset;
                if y < area_top || y >= area_bottom {
                    continue;
                }
                let y = y as u16;
                if is_active {
                    buf.set_style(Rect::new(area.x, y, area.width, 1), *style);
                }
                buf.set_stringn(area.x, y, text, area.width as usize, *style);
            }
            content_top += lines.len() as i64;
        }

        if self.view.points.is_empty() && area.height > 0 {
            let hint = "No points. Press g to generate.";
            let style = Style::default()
                .fg(colors::FG_DIM)
                .add_modifier(Modifier::ITALIC);
            buf.set_stringn(area.x, area.y, hint, area.width as usize, style);
        }
    }
}
