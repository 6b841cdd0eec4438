//! On-screen overlay
//!
//! Maps a store snapshot and a viewport to screen-space draw instructions.
//! Rendering is a pure function of its inputs.

use crate::annotation::{
    typed_signature_font_size, Annotation, AnnotationId, AnnotationKind, RasterPayload,
    SignatureContent, StampShape, STAMP_FONT_SIZE,
};
use crate::color::Rgb;
use crate::fonts::FontFamily;
use crate::geometry::{document_to_screen, DocPoint, Scale, ScreenPoint, ScreenRect};
use crate::interaction::HitTarget;
use crate::store::AnnotationStore;
use crate::viewport::Viewport;

/// Side of the delete control square, in screen pixels
pub const DELETE_CONTROL_SIZE: f32 = 16.0;
/// Side of the resize handle square, in screen pixels
pub const RESIZE_HANDLE_SIZE: f32 = 12.0;

/// Variant-specific visual parameters, already scaled to screen units
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayVisual {
    Comment {
        text: String,
        font_family: FontFamily,
        font_size: f32,
        color: Rgb,
        background: Option<Rgb>,
    },
    TypedSignature {
        text: String,
        font_family: FontFamily,
        font_size: f32,
    },
    ImageSignature {
        image: RasterPayload,
    },
    Stamp {
        text: String,
        background: Rgb,
        text_color: Rgb,
        shape: StampShape,
        font_size: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayItem {
    pub id: AnnotationId,
    pub screen_rect: ScreenRect,
    pub delete_control: ScreenRect,
    /// Present for signatures only
    pub resize_handle: Option<ScreenRect>,
    pub visual: OverlayVisual,
}

/// Everything to draw over one page, bottom-most item first
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayFrame {
    pub page: u32,
    pub scale: Scale,
    pub items: Vec<OverlayItem>,
}

impl OverlayFrame {
    /// Resolve a screen point to what a press there would hit
    ///
    /// Items are tested topmost first; an item's controls win over its body.
    pub fn hit_test(&self, point: ScreenPoint) -> HitTarget {
        for item in self.items.iter().rev() {
            if item.delete_control.contains(point) {
                return HitTarget::DeleteControl(item.id);
            }
            if item.resize_handle.is_some_and(|handle| handle.contains(point)) {
                return HitTarget::ResizeHandle(item.id);
            }
            if item.screen_rect.contains(point) {
                return HitTarget::Body(item.id);
            }
        }
        HitTarget::Empty
    }
}

/// Build the overlay for the viewport's page
pub fn render(store: &AnnotationStore, viewport: &Viewport) -> OverlayFrame {
    let items = store
        .list_by_page(viewport.page)
        .map(|annotation| render_item(annotation, store, viewport))
        .collect();
    OverlayFrame { page: viewport.page, scale: viewport.scale, items }
}

fn render_item(annotation: &Annotation, store: &AnnotationStore, viewport: &Viewport) -> OverlayItem {
    let scale = viewport.scale.get();
    let extent = annotation.extent(store.config());
    let corner = document_to_screen(
        DocPoint::new(annotation.position.x, annotation.position.y),
        viewport.scale,
        viewport.origin,
    );
    let screen_rect = ScreenRect::new(corner.x, corner.y, extent.width * scale, extent.height * scale);
    let delete_control = ScreenRect::centered_on(
        ScreenPoint::new(screen_rect.right(), screen_rect.y),
        DELETE_CONTROL_SIZE,
    );

    let (visual, resize_handle) = match &annotation.kind {
        AnnotationKind::Comment(comment) => (
            OverlayVisual::Comment {
                text: comment.text.clone(),
                font_family: comment.font_family.clone(),
                font_size: comment.font_size * scale,
                color: comment.color,
                background: comment.background_color,
            },
            None,
        ),
        AnnotationKind::Signature(signature) => {
            let visual = match &signature.signature {
                SignatureContent::Typed { text, font } => OverlayVisual::TypedSignature {
                    text: text.clone(),
                    font_family: font.clone(),
                    font_size: typed_signature_font_size(extent.height) * scale,
                },
                SignatureContent::Drawn { image } | SignatureContent::Uploaded { image } => {
                    OverlayVisual::ImageSignature { image: image.clone() }
                }
            };
            let handle = ScreenRect::centered_on(
                ScreenPoint::new(screen_rect.right(), screen_rect.bottom()),
                RESIZE_HANDLE_SIZE,
            );
            (visual, Some(handle))
        }
        AnnotationKind::Stamp(stamp) => (
            OverlayVisual::Stamp {
                text: stamp.text.clone(),
                background: stamp.background_color,
                text_color: stamp.text_color,
                shape: stamp.shape,
                font_size: STAMP_FONT_SIZE * scale,
            },
            None,
        ),
    };

    OverlayItem { id: annotation.id(), screen_rect, delete_control, resize_handle, visual }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationDraft, Comment, Position, Signature, Stamp};
    use crate::geometry::Size;

    fn page_view(page: u32, scale: f32) -> Viewport {
        Viewport::new(page, Size::new(600.0, 800.0), Scale::new(scale).unwrap())
            .with_origin(ScreenPoint::new(5.0, 5.0))
    }

    fn populated_store() -> (AnnotationStore, AnnotationId, AnnotationId) {
        let mut store = AnnotationStore::new();
        let stamp = store
            .create(AnnotationDraft::new(
                Position::new(1, 10.0, 10.0),
                AnnotationKind::Stamp(Stamp::new("draft")),
            ))
            .unwrap();
        let signature = store
            .create(AnnotationDraft::new(
                Position::new(1, 50.0, 20.0),
                AnnotationKind::Signature(Signature {
                    signature: SignatureContent::Typed {
                        text: "Ada".into(),
                        font: FontFamily::BrushScriptMt,
                    },
                }),
            ))
            .unwrap();
        store
            .create(AnnotationDraft::new(
                Position::new(2, 0.0, 0.0),
                AnnotationKind::Comment(Comment::new("elsewhere")),
            ))
            .unwrap();
        (store, stamp, signature)
    }

    #[test]
    fn renders_only_the_viewport_page_in_order() {
        let (store, stamp, signature) = populated_store();
        let frame = render(&store, &page_view(1, 1.0));
        let ids: Vec<_> = frame.items.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![stamp, signature]);
    }

    #[test]
    fn positions_and_sizes_scale_to_screen() {
        let (store, _, signature) = populated_store();
        let frame = render(&store, &page_view(1, 2.0));
        let item = frame.items.iter().find(|item| item.id == signature).unwrap();

        assert_eq!(item.screen_rect, ScreenRect::new(105.0, 45.0, 400.0, 160.0));
        assert_eq!(
            item.resize_handle,
            Some(ScreenRect::centered_on(ScreenPoint::new(505.0, 205.0), RESIZE_HANDLE_SIZE))
        );
        let OverlayVisual::TypedSignature { font_size, .. } = &item.visual else {
            panic!("expected a typed signature");
        };
        assert_eq!(*font_size, 64.0);
    }

    #[test]
    fn comment_font_size_is_stored_size_times_scale() {
        let mut store = AnnotationStore::new();
        store
            .create(AnnotationDraft::new(
                Position::new(1, 0.0, 0.0),
                AnnotationKind::Comment(Comment::new("Hi")),
            ))
            .unwrap();
        let frame = render(&store, &page_view(1, 1.5));
        let OverlayVisual::Comment { font_size, .. } = &frame.items[0].visual else {
            panic!("expected a comment");
        };
        assert_eq!(*font_size, 21.0);
    }

    #[test]
    fn rendering_is_idempotent() {
        let (store, _, _) = populated_store();
        let view = page_view(1, 1.25);
        assert_eq!(render(&store, &view), render(&store, &view));
    }

    #[test]
    fn hit_test_prefers_topmost_and_controls() {
        let (store, stamp, signature) = populated_store();
        let frame = render(&store, &page_view(1, 1.0));

        // Stamp spans x 15..115, y 15..40; signature starts at (55, 25) and is on top
        assert_eq!(frame.hit_test(ScreenPoint::new(20.0, 20.0)), HitTarget::Body(stamp));
        assert_eq!(frame.hit_test(ScreenPoint::new(60.0, 30.0)), HitTarget::Body(signature));
        assert_eq!(frame.hit_test(ScreenPoint::new(255.0, 25.0)), HitTarget::DeleteControl(signature));
        assert_eq!(frame.hit_test(ScreenPoint::new(254.0, 104.0)), HitTarget::ResizeHandle(signature));
        assert_eq!(frame.hit_test(ScreenPoint::new(590.0, 700.0)), HitTarget::Empty);
    }
}
