//! Screen ↔ document coordinate transform
//!
//! Two coordinate spaces meet here:
//! - Document units: the unscaled page space. Origin at the top-left of the
//!   page, X increases to the right, Y increases downward.
//! - Screen units: on-screen pixels, equal to document units multiplied by the
//!   display scale and offset by the page container's origin.
//!
//! Everything stored in the annotation store is in document units. Pointer
//! positions are converted exactly once, at the interaction boundary.

use serde::{Deserialize, Serialize};

/// Error returned when building a [`Scale`] from an unusable value
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ScaleError {
    #[error("scale must be a finite number greater than zero (got {0})")]
    NotPositive(f32),
}

/// Display zoom factor relating screen units to document units (1.0 = 100%)
///
/// Always finite and strictly positive, so division by the scale is safe.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Scale(f32);

impl Scale {
    /// 100% zoom
    pub const IDENTITY: Scale = Scale(1.0);

    pub fn new(value: f32) -> Result<Self, ScaleError> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(ScaleError::NotPositive(value))
        }
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TryFrom<f32> for Scale {
    type Error = ScaleError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Scale> for f32 {
    fn from(scale: Scale) -> Self {
        scale.0
    }
}

/// Point in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Vector from `origin` to this point
    pub fn offset_from(self, origin: ScreenPoint) -> ScreenVector {
        ScreenVector::new(self.x - origin.x, self.y - origin.y)
    }
}

/// Displacement in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenVector {
    pub dx: f32,
    pub dy: f32,
}

impl ScreenVector {
    pub fn new(dx: f32, dy: f32) -> Self {
        Self { dx, dy }
    }

    /// The same displacement expressed in document units
    pub fn to_document(self, scale: Scale) -> (f32, f32) {
        (self.dx / scale.get(), self.dy / scale.get())
    }
}

/// Point in document units (top-left origin, Y down)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DocPoint {
    pub x: f32,
    pub y: f32,
}

impl DocPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Width and height in document units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Component-wise maximum; used to enforce a size floor
    pub fn max(self, floor: Size) -> Size {
        Size::new(self.width.max(floor.width), self.height.max(floor.height))
    }

    pub fn is_positive(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Axis-aligned rectangle in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Square of side `size` centered on `center`
    pub fn centered_on(center: ScreenPoint, size: f32) -> Self {
        Self::new(center.x - size / 2.0, center.y - size / 2.0, size, size)
    }

    pub fn top_left(&self) -> ScreenPoint {
        ScreenPoint::new(self.x, self.y)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, point: ScreenPoint) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }
}

/// Convert a screen point into document units: `(point - origin) / scale`
pub fn screen_to_document(point: ScreenPoint, scale: Scale, origin: ScreenPoint) -> DocPoint {
    DocPoint::new((point.x - origin.x) / scale.get(), (point.y - origin.y) / scale.get())
}

/// Exact inverse of [`screen_to_document`]: `point * scale + origin`
pub fn document_to_screen(point: DocPoint, scale: Scale, origin: ScreenPoint) -> ScreenPoint {
    ScreenPoint::new(point.x * scale.get() + origin.x, point.y * scale.get() + origin.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-3 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn scale_rejects_zero_negative_and_nan() {
        assert!(Scale::new(0.0).is_err());
        assert!(Scale::new(-1.5).is_err());
        assert!(Scale::new(f32::NAN).is_err());
        assert!(Scale::new(f32::INFINITY).is_err());
        assert_eq!(Scale::new(1.5).map(Scale::get), Ok(1.5));
    }

    #[test]
    fn screen_to_document_subtracts_origin_then_divides() {
        let scale = Scale::new(2.0).unwrap();
        let origin = ScreenPoint::new(100.0, 50.0);
        let doc = screen_to_document(ScreenPoint::new(140.0, 90.0), scale, origin);
        assert_eq!(doc, DocPoint::new(20.0, 20.0));
    }

    #[test]
    fn round_trip_holds_across_scales_and_origins() {
        let scales = [0.25_f32, 0.5, 1.0, 1.5, 2.0, 3.0, 7.3];
        let origins = [ScreenPoint::new(0.0, 0.0), ScreenPoint::new(12.5, -40.0)];
        let points = [
            ScreenPoint::new(0.0, 0.0),
            ScreenPoint::new(333.3, 17.1),
            ScreenPoint::new(-20.0, 1024.0),
        ];

        for s in scales {
            let scale = Scale::new(s).unwrap();
            for origin in origins {
                for p in points {
                    let back =
                        document_to_screen(screen_to_document(p, scale, origin), scale, origin);
                    assert!(close(back.x, p.x) && close(back.y, p.y), "{p:?} at {s}");
                }
            }
        }
    }

    #[test]
    fn screen_vector_converts_by_scale_only() {
        let scale = Scale::new(2.0).unwrap();
        assert_eq!(ScreenVector::new(40.0, 20.0).to_document(scale), (20.0, 10.0));
    }

    #[test]
    fn size_floor_is_component_wise() {
        let floored = Size::new(10.0, 100.0).max(Size::new(50.0, 30.0));
        assert_eq!(floored, Size::new(50.0, 100.0));
    }

    #[test]
    fn scale_deserialization_rejects_zero() {
        assert!(serde_json::from_str::<Scale>("0.0").is_err());
        assert_eq!(serde_json::from_str::<Scale>("1.25").unwrap().get(), 1.25);
    }
}
