//! Export serializer
//!
//! Replays the annotation store into an output document. Planning turns each
//! annotation into backend-neutral [`DrawOp`]s in output units (PDF points,
//! bottom-left origin); an [`OutputDocument`] turns those into page content.
//!
//! Export is all-or-nothing at the document level and best-effort per
//! annotation: an image that fails to decode is logged and skipped.

use crate::raster::{self, DecodedImage};
use crate::writer::LopdfOutput;
use crate::{PageSize, PdfEngineError};
use overlay_core::annotation::{
    stamp_font, typed_signature_font_size, Annotation, AnnotationKind, SignatureContent,
    StampShape, LINE_HEIGHT,
};
use overlay_core::{AnnotationId, AnnotationStore, OverlayConfig, Rgb, StandardFont};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outline drawn around stamps
pub const STAMP_BORDER: (Rgb, f32) = (Rgb::BLACK, 2.0);
/// Corner radius of rounded stamps
pub const STAMP_CORNER_RADIUS: f32 = 6.0;

/// One drawing primitive in output units
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Rectangle {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Rgb,
        opacity: f32,
        border: Option<(Rgb, f32)>,
        corner_radius: f32,
    },
    Ellipse {
        cx: f32,
        cy: f32,
        rx: f32,
        ry: f32,
        fill: Rgb,
        border: Option<(Rgb, f32)>,
    },
    /// `y` is the top of the text line; writers derive the baseline from the font ascent
    Text {
        x: f32,
        y: f32,
        size: f32,
        font: StandardFont,
        color: Rgb,
        text: String,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        image: Arc<DecodedImage>,
    },
}

/// Capability interface over the output document container
pub trait OutputDocument {
    fn page_count(&self) -> u32;
    /// Size of a 1-based page
    fn page_size(&self, page: u32) -> Result<PageSize, PdfEngineError>;
    fn draw(&mut self, page: u32, ops: &[DrawOp]) -> Result<(), PdfEngineError>;
    fn save(self) -> Result<Vec<u8>, PdfEngineError>
    where
        Self: Sized;
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("source document could not be loaded: {0}")]
    Source(#[source] PdfEngineError),
    #[error("expected {expected} pages but the document has {actual}")]
    PageCountMismatch { expected: u32, actual: u32 },
    #[error("failed to draw page {page}: {source}")]
    Draw {
        page: u32,
        #[source]
        source: PdfEngineError,
    },
    #[error("failed to save output document: {0}")]
    Save(#[source] PdfEngineError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedAnnotation {
    pub id: AnnotationId,
    pub page: u32,
    pub reason: String,
}

/// Summary of one export pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportReport {
    pub pages: u32,
    pub drawn: usize,
    pub skipped: Vec<SkippedAnnotation>,
}

/// File name offered for the exported document
pub fn suggested_file_name(original: &str) -> String {
    format!("annotated_{original}")
}

/// Load `source`, bake every annotation into it and serialize the result
pub fn export_pdf(
    source: &[u8],
    store: &AnnotationStore,
    page_count: u32,
    config: &OverlayConfig,
) -> Result<(Vec<u8>, ExportReport), ExportError> {
    let mut output = LopdfOutput::load(source).map_err(ExportError::Source)?;
    let report = export_annotations(&mut output, store, page_count, config)?;
    let bytes = output.save().map_err(ExportError::Save)?;
    Ok((bytes, report))
}

/// Draw every annotation of `store` onto `output`
pub fn export_annotations<D: OutputDocument>(
    output: &mut D,
    store: &AnnotationStore,
    page_count: u32,
    config: &OverlayConfig,
) -> Result<ExportReport, ExportError> {
    let actual = output.page_count();
    if actual != page_count {
        return Err(ExportError::PageCountMismatch { expected: page_count, actual });
    }

    let mut by_page: BTreeMap<u32, Vec<&Annotation>> = BTreeMap::new();
    for annotation in store.iter() {
        by_page.entry(annotation.page()).or_default().push(annotation);
    }

    let mut report = ExportReport { pages: page_count, ..ExportReport::default() };
    for (&page, annotations) in &by_page {
        if page == 0 || page > page_count {
            for annotation in annotations {
                tracing::warn!(id = %annotation.id(), page, "annotation on missing page skipped");
                report.skipped.push(SkippedAnnotation {
                    id: annotation.id(),
                    page,
                    reason: format!("page {page} does not exist"),
                });
            }
            continue;
        }

        let size = output.page_size(page).map_err(|source| ExportError::Draw { page, source })?;
        let ops = plan_page(annotations.iter().copied(), size, config, &mut report);
        tracing::debug!(page, ops = ops.len(), "page planned");
        if !ops.is_empty() {
            output.draw(page, &ops).map_err(|source| ExportError::Draw { page, source })?;
        }
    }

    Ok(report)
}

/// Plan draw operations for the annotations of one page
///
/// Decode failures are recorded in `report` and the annotation is left out.
pub fn plan_page<'a>(
    annotations: impl IntoIterator<Item = &'a Annotation>,
    page: PageSize,
    config: &OverlayConfig,
    report: &mut ExportReport,
) -> Vec<DrawOp> {
    let mut ops = Vec::new();
    for annotation in annotations {
        match plan_annotation(annotation, page, config) {
            Ok(mut planned) => {
                ops.append(&mut planned);
                report.drawn += 1;
            }
            Err(err) => {
                tracing::warn!(id = %annotation.id(), error = %err, "signature image skipped");
                report.skipped.push(SkippedAnnotation {
                    id: annotation.id(),
                    page: annotation.page(),
                    reason: err.to_string(),
                });
            }
        }
    }
    ops
}

fn plan_annotation(
    annotation: &Annotation,
    page: PageSize,
    config: &OverlayConfig,
) -> Result<Vec<DrawOp>, raster::RasterError> {
    let extent = annotation.extent(config);
    let (width, height) = (extent.width, extent.height);

    // Flip to a bottom-left origin, then keep the box on the page
    let x = annotation.position.x.min(page.width_pt - width).max(0.0);
    let top = (page.height_pt - annotation.position.y).max(height).min(page.height_pt);

    let ops = match &annotation.kind {
        AnnotationKind::Comment(comment) => {
            let mut ops = Vec::new();
            if let Some(background) = comment.background_color {
                ops.push(DrawOp::Rectangle {
                    x,
                    y: top - height,
                    width,
                    height,
                    fill: background,
                    opacity: config.comment_background_opacity,
                    border: None,
                    corner_radius: 0.0,
                });
            }
            let font = comment.font_family.resolve();
            let leading = comment.font_size * LINE_HEIGHT;
            ops.extend(comment.lines().enumerate().map(|(index, line)| DrawOp::Text {
                x,
                y: top - index as f32 * leading,
                size: comment.font_size,
                font,
                color: comment.color,
                text: line.to_owned(),
            }));
            ops
        }
        AnnotationKind::Signature(signature) => match &signature.signature {
            SignatureContent::Typed { text, font } => {
                let size = typed_signature_font_size(height);
                vec![DrawOp::Text {
                    x,
                    y: top - (height - size) / 2.0,
                    size,
                    font: font.resolve(),
                    color: Rgb::BLACK,
                    text: text.clone(),
                }]
            }
            SignatureContent::Drawn { image } | SignatureContent::Uploaded { image } => {
                let decoded = raster::decode(image.bytes())?;
                vec![DrawOp::Image { x, y: top - height, width, height, image: Arc::new(decoded) }]
            }
        },
        AnnotationKind::Stamp(stamp) => {
            let background = match stamp.shape {
                StampShape::Circle => DrawOp::Ellipse {
                    cx: x + width / 2.0,
                    cy: top - height / 2.0,
                    rx: width / 2.0,
                    ry: height / 2.0,
                    fill: stamp.background_color,
                    border: Some(STAMP_BORDER),
                },
                StampShape::Rounded | StampShape::Square => DrawOp::Rectangle {
                    x,
                    y: top - height,
                    width,
                    height,
                    fill: stamp.background_color,
                    opacity: 1.0,
                    border: Some(STAMP_BORDER),
                    corner_radius: if stamp.shape == StampShape::Rounded {
                        STAMP_CORNER_RADIUS
                    } else {
                        0.0
                    },
                },
            };
            let (font, size) = stamp_font();
            let text_width = font.text_width(&stamp.text, size);
            let label = DrawOp::Text {
                x: x + (width - text_width) / 2.0,
                y: top - (height - size) / 2.0,
                size,
                font,
                color: stamp.text_color,
                text: stamp.text.clone(),
            };
            vec![background, label]
        }
    };
    Ok(ops)
}
