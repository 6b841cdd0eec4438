//! Drag and resize interaction
//!
//! A small state machine fed with pointer events. Mouse and touch input share
//! one logical channel: the source of the press that starts a gesture decides
//! which input is followed until the gesture ends.
//!
//! Pointer coordinates arrive in screen units and are converted to document
//! units here, once, before anything is written to the store.

use crate::annotation::{AnnotationId, AnnotationPatch, Position};
use crate::geometry::{
    document_to_screen, screen_to_document, DocPoint, ScreenPoint, ScreenVector, Size,
};
use crate::store::AnnotationStore;
use crate::viewport::Viewport;

/// Which device produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Mouse,
    Touch,
}

/// Raw pointer sample
#[derive(Debug, Clone, PartialEq)]
pub enum PointerInput {
    Mouse(ScreenPoint),
    /// Active touch points; the first one drives the gesture
    Touch(Vec<ScreenPoint>),
}

impl PointerInput {
    pub fn source(&self) -> InputSource {
        match self {
            PointerInput::Mouse(_) => InputSource::Mouse,
            PointerInput::Touch(_) => InputSource::Touch,
        }
    }

    pub fn point(&self) -> Option<ScreenPoint> {
        match self {
            PointerInput::Mouse(point) => Some(*point),
            PointerInput::Touch(points) => points.first().copied(),
        }
    }
}

/// What a press landed on, as resolved by the overlay's hit test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Body(AnnotationId),
    ResizeHandle(AnnotationId),
    DeleteControl(AnnotationId),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    Press { input: PointerInput, target: HitTarget },
    Move(PointerInput),
    Release(InputSource),
    Cancel(InputSource),
}

/// Current gesture
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Dragging {
        id: AnnotationId,
        /// Pointer minus the annotation's top-left corner at press time
        grab_offset: ScreenVector,
        source: InputSource,
    },
    Resizing {
        id: AnnotationId,
        anchor_size: Size,
        anchor_pointer: ScreenPoint,
        source: InputSource,
    },
}

impl GestureState {
    fn target(&self) -> Option<(AnnotationId, InputSource)> {
        match *self {
            GestureState::Idle => None,
            GestureState::Dragging { id, source, .. } | GestureState::Resizing { id, source, .. } => {
                Some((id, source))
            }
        }
    }
}

/// Result of feeding one event to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionOutcome {
    Ignored,
    Started(AnnotationId),
    Updated(AnnotationId),
    Finished(AnnotationId),
    Deleted(AnnotationId),
}

#[derive(Debug, Default)]
pub struct InteractionController {
    state: GestureState,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    /// Annotation targeted by the gesture in progress, if any
    pub fn active(&self) -> Option<AnnotationId> {
        self.state.target().map(|(id, _)| id)
    }

    pub fn handle(
        &mut self,
        event: PointerEvent,
        viewport: &Viewport,
        store: &mut AnnotationStore,
    ) -> InteractionOutcome {
        match event {
            PointerEvent::Press { input, target } => self.press(&input, target, viewport, store),
            PointerEvent::Move(input) => self.pointer_move(&input, viewport, store),
            PointerEvent::Release(_) | PointerEvent::Cancel(_) => self.finish(),
        }
    }

    fn press(
        &mut self,
        input: &PointerInput,
        target: HitTarget,
        viewport: &Viewport,
        store: &mut AnnotationStore,
    ) -> InteractionOutcome {
        if self.state != GestureState::Idle {
            tracing::trace!(?target, "press ignored while a gesture is active");
            return InteractionOutcome::Ignored;
        }
        let Some(pointer) = input.point() else {
            return InteractionOutcome::Ignored;
        };

        match target {
            HitTarget::DeleteControl(id) => match store.delete(id) {
                Some(_) => InteractionOutcome::Deleted(id),
                None => InteractionOutcome::Ignored,
            },
            HitTarget::Body(id) => {
                let Some(annotation) = store.get(id) else {
                    return InteractionOutcome::Ignored;
                };
                let top_left = DocPoint::new(annotation.position.x, annotation.position.y);
                let corner = document_to_screen(top_left, viewport.scale, viewport.origin);
                self.state = GestureState::Dragging {
                    id,
                    grab_offset: pointer.offset_from(corner),
                    source: input.source(),
                };
                tracing::debug!(%id, "drag started");
                InteractionOutcome::Started(id)
            }
            HitTarget::ResizeHandle(id) => {
                let Some(anchor_size) = store.get(id).filter(|a| a.kind.is_signature()).and_then(|a| a.size)
                else {
                    return InteractionOutcome::Ignored;
                };
                self.state = GestureState::Resizing {
                    id,
                    anchor_size,
                    anchor_pointer: pointer,
                    source: input.source(),
                };
                tracing::debug!(%id, "resize started");
                InteractionOutcome::Started(id)
            }
            HitTarget::Empty => InteractionOutcome::Ignored,
        }
    }

    fn pointer_move(
        &mut self,
        input: &PointerInput,
        viewport: &Viewport,
        store: &mut AnnotationStore,
    ) -> InteractionOutcome {
        let Some((id, source)) = self.state.target() else {
            return InteractionOutcome::Ignored;
        };
        if input.source() != source {
            return InteractionOutcome::Ignored;
        }
        let Some(pointer) = input.point() else {
            return InteractionOutcome::Ignored;
        };

        let patch = match self.state {
            GestureState::Dragging { grab_offset, .. } => {
                let Some(page) = store.get(id).map(|a| a.page()) else {
                    return InteractionOutcome::Ignored;
                };
                let doc = screen_to_document(pointer, viewport.scale, viewport.origin);
                let (grab_x, grab_y) = grab_offset.to_document(viewport.scale);
                let extent = store.config().drag_extent;
                let max_x = (viewport.page_size.width - extent.width).max(0.0);
                let max_y = (viewport.page_size.height - extent.height).max(0.0);
                AnnotationPatch::position(Position::new(
                    page,
                    (doc.x - grab_x).clamp(0.0, max_x),
                    (doc.y - grab_y).clamp(0.0, max_y),
                ))
            }
            GestureState::Resizing { anchor_size, anchor_pointer, .. } => {
                let (dx, dy) = pointer.offset_from(anchor_pointer).to_document(viewport.scale);
                let grown = Size::new(anchor_size.width + dx, anchor_size.height + dy);
                AnnotationPatch::size(grown.max(store.config().min_size))
            }
            GestureState::Idle => return InteractionOutcome::Ignored,
        };

        match store.update(id, patch) {
            Ok(true) => InteractionOutcome::Updated(id),
            Ok(false) | Err(_) => InteractionOutcome::Ignored,
        }
    }

    fn finish(&mut self) -> InteractionOutcome {
        match std::mem::take(&mut self.state).target() {
            Some((id, _)) => {
                tracing::debug!(%id, "gesture finished");
                InteractionOutcome::Finished(id)
            }
            None => InteractionOutcome::Ignored,
        }
    }
}
