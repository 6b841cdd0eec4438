//! Viewport state: which page is shown, at what zoom, and where on screen.

use crate::annotation::Position;
use crate::config::ZoomLimits;
use crate::geometry::{screen_to_document, Scale, ScreenPoint, Size};

/// The page currently displayed and how it maps onto the screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// 1-based page number
    pub page: u32,
    /// Unscaled page dimensions in document units
    pub page_size: Size,
    pub scale: Scale,
    /// Screen position of the page's top-left corner
    pub origin: ScreenPoint,
}

impl Viewport {
    pub fn new(page: u32, page_size: Size, scale: Scale) -> Self {
        Self { page, page_size, scale, origin: ScreenPoint::default() }
    }

    pub fn with_origin(mut self, origin: ScreenPoint) -> Self {
        self.origin = origin;
        self
    }

    /// Position for a tool click at `point`, or `None` when it misses the page
    pub fn place_at(&self, point: ScreenPoint) -> Option<Position> {
        let doc = screen_to_document(point, self.scale, self.origin);
        let inside = (0.0..=self.page_size.width).contains(&doc.x)
            && (0.0..=self.page_size.height).contains(&doc.y);
        inside.then(|| Position::new(self.page, doc.x, doc.y))
    }
}

/// Zoom level clamped to configured limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState {
    scale: Scale,
    limits: ZoomLimits,
}

impl ZoomState {
    /// Invalid limits (e.g. `min > max`) are replaced by the defaults
    pub fn new(limits: ZoomLimits) -> Self {
        let limits = if limits.is_valid() {
            limits
        } else {
            tracing::warn!(?limits, "invalid zoom limits replaced by defaults");
            ZoomLimits::default()
        };
        let mut zoom = Self { scale: Scale::IDENTITY, limits };
        zoom.set(limits.initial);
        zoom
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn zoom_in(&mut self) -> Scale {
        self.set(self.scale.get() + self.limits.step)
    }

    pub fn zoom_out(&mut self) -> Scale {
        self.set(self.scale.get() - self.limits.step)
    }

    pub fn reset(&mut self) -> Scale {
        self.set(self.limits.initial)
    }

    /// Scale at which a page `page_width` wide fills `available_width` pixels
    pub fn fit_width(&mut self, page_width: f32, available_width: f32) -> Scale {
        if page_width > 0.0 && available_width > 0.0 {
            self.set(available_width / page_width)
        } else {
            self.scale
        }
    }

    /// Set the zoom, clamped to the limits; returns the applied scale
    pub fn set(&mut self, value: f32) -> Scale {
        // Round to hundredths so repeated steps don't accumulate drift
        let rounded = (value.clamp(self.limits.min, self.limits.max) * 100.0).round() / 100.0;
        if let Ok(scale) = Scale::new(rounded) {
            self.scale = scale;
        }
        self.scale
    }
}

impl Default for ZoomState {
    fn default() -> Self {
        Self::new(ZoomLimits::default())
    }
}

/// Current page, clamped to `1..=page_count`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    current: u32,
    page_count: u32,
}

impl PageCursor {
    pub fn new(page_count: u32) -> Self {
        Self { current: 1, page_count: page_count.max(1) }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn next(&mut self) -> u32 {
        self.go_to(self.current.saturating_add(1))
    }

    pub fn previous(&mut self) -> u32 {
        self.go_to(self.current.saturating_sub(1))
    }

    pub fn go_to(&mut self, page: u32) -> u32 {
        self.current = page.clamp(1, self.page_count);
        self.current
    }
}
