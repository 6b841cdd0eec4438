//! Annotation overlay core
//!
//! Data model, coordinate transform, store, interaction state machine and
//! on-screen overlay for comments, signatures and stamps placed on document
//! pages. Stored geometry is always in document units.

pub mod annotation;
pub mod color;
pub mod config;
pub mod fonts;
pub mod geometry;
pub mod interaction;
pub mod overlay;
pub mod store;
pub mod viewport;

pub use annotation::{
    Annotation, AnnotationDraft, AnnotationError, AnnotationId, AnnotationKind, AnnotationPatch,
    Comment, Position, RasterPayload, Signature, SignatureContent, Stamp, StampShape,
};
pub use color::{InvalidColor, Rgb};
pub use config::{ConfigError, OverlayConfig, ZoomLimits};
pub use fonts::{FontFamily, StandardFont};
pub use geometry::{
    document_to_screen, screen_to_document, DocPoint, Scale, ScaleError, ScreenPoint, ScreenRect,
    ScreenVector, Size,
};
pub use interaction::{
    GestureState, HitTarget, InputSource, InteractionController, InteractionOutcome, PointerEvent,
    PointerInput,
};
pub use overlay::{render, OverlayFrame, OverlayItem, OverlayVisual};
pub use store::AnnotationStore;
pub use viewport::{PageCursor, Viewport, ZoomState};
