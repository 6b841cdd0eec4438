//! Annotation data model
//!
//! An annotation is a common envelope (id, page position, optional size) around
//! one of three variants: a comment, a signature or a stamp. Positions and
//! sizes are always in document units with a top-left origin.
//!
//! The JSON shape of an annotation matches the descriptors emitted by the tool
//! collaborators:
//!
//! ```json
//! { "type": "comment", "position": { "page": 1, "x": 10, "y": 20 },
//!   "text": "Hi", "fontSize": 14, "fontFamily": "Arial", "color": "#000000" }
//! ```

use crate::color::Rgb;
use crate::config::OverlayConfig;
use crate::fonts::{FontFamily, StandardFont};
use crate::geometry::Size;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Maximum stamp text length, in characters
pub const STAMP_MAX_CHARS: usize = 20;
/// Fixed stamp box height in document units
pub const STAMP_HEIGHT: f32 = 25.0;
/// Narrowest stamp box in document units
pub const STAMP_MIN_WIDTH: f32 = 100.0;
/// Stamp box width contributed by each character
pub const STAMP_CHAR_WIDTH: f32 = 10.0;
/// Stamp label font size
pub const STAMP_FONT_SIZE: f32 = 12.0;
/// Largest font size used for a typed signature
pub const SIGNATURE_MAX_FONT_SIZE: f32 = 32.0;
/// Line height as a multiple of the font size
pub const LINE_HEIGHT: f32 = 1.2;

static NEXT_ANNOTATION_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an annotation
///
/// Allocated from a process-wide counter, so ids never collide even when
/// several stores exist or annotations are created in rapid succession.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(u64);

impl AnnotationId {
    pub(crate) fn next() -> Self {
        Self(NEXT_ANNOTATION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where an annotation sits: page number (1-based) and top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub page: u32,
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(page: u32, x: f32, y: f32) -> Self {
        Self { page, x, y }
    }
}

/// Validation failures raised when an annotation is created
#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    #[error("{kind} text must not be empty")]
    EmptyText { kind: &'static str },
    #[error("signature has no content")]
    MissingSignatureContent,
    #[error("font size must be a positive number (got {0})")]
    InvalidFontSize(f32),
    #[error("position coordinates must be finite")]
    InvalidPosition,
    #[error("page {page} does not exist (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("invalid annotation descriptor: {0}")]
    Descriptor(#[from] serde_json::Error),
}

/// Raster payload of a drawn or uploaded signature (PNG or JPEG bytes)
///
/// Serialized as a `data:` URL. Cloning shares the underlying bytes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RasterPayload {
    bytes: Arc<[u8]>,
}

impl RasterPayload {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self { bytes: bytes.into() }
    }

    /// Parse a `data:<mime>;base64,<data>` URL or a bare base64 string
    pub fn from_data_url(url: &str) -> Result<Self, base64::DecodeError> {
        let encoded = match url.split_once(',') {
            Some((header, data)) if header.starts_with("data:") => data,
            _ => url,
        };
        let bytes = BASE64.decode(encoded.trim())?;
        Ok(Self::new(bytes))
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type(), BASE64.encode(&self.bytes))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Media type guessed from the payload signature
    pub fn media_type(&self) -> &'static str {
        if self.bytes.starts_with(&[0xff, 0xd8, 0xff]) {
            "image/jpeg"
        } else {
            "image/png"
        }
    }
}

impl fmt::Debug for RasterPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterPayload").field("len", &self.bytes.len()).finish()
    }
}

impl TryFrom<String> for RasterPayload {
    type Error = base64::DecodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_data_url(&value)
    }
}

impl From<RasterPayload> for String {
    fn from(payload: RasterPayload) -> Self {
        payload.to_data_url()
    }
}

/// Free-text comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub text: String,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default)]
    pub font_family: FontFamily,
    #[serde(default = "default_text_color")]
    pub color: Rgb,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Rgb>,
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_size: default_font_size(),
            font_family: FontFamily::default(),
            color: default_text_color(),
            background_color: None,
        }
    }

    /// Lines of the comment, as drawn
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}

fn default_font_size() -> f32 {
    14.0
}

fn default_text_color() -> Rgb {
    Rgb::BLACK
}

/// How a signature was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SignatureContent {
    Typed {
        text: String,
        #[serde(default = "default_signature_font")]
        font: FontFamily,
    },
    Drawn {
        image: RasterPayload,
    },
    Uploaded {
        image: RasterPayload,
    },
}

fn default_signature_font() -> FontFamily {
    FontFamily::BrushScriptMt
}

impl SignatureContent {
    pub fn image(&self) -> Option<&RasterPayload> {
        match self {
            SignatureContent::Typed { .. } => None,
            SignatureContent::Drawn { image } | SignatureContent::Uploaded { image } => Some(image),
        }
    }
}

/// Signature annotation; the only variant that carries a resizable size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub signature: SignatureContent,
}

/// Stamp outline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StampShape {
    #[default]
    Rounded,
    Square,
    Circle,
}

/// Short upper-case label on a colored background
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stamp {
    pub text: String,
    #[serde(default = "default_stamp_background")]
    pub background_color: Rgb,
    #[serde(default = "default_stamp_text_color")]
    pub text_color: Rgb,
    #[serde(default)]
    pub shape: StampShape,
}

impl Stamp {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: normalize_stamp_text(&text.into()),
            background_color: default_stamp_background(),
            text_color: default_stamp_text_color(),
            shape: StampShape::default(),
        }
    }

    /// Preset stamps offered by the stamp tool
    pub fn presets() -> Vec<Stamp> {
        [
            ("APPROVED", Rgb::new(0x4c, 0xaf, 0x50), Rgb::WHITE),
            ("REJECTED", Rgb::new(0xf4, 0x43, 0x36), Rgb::WHITE),
            ("CONFIDENTIAL", Rgb::new(0xff, 0x98, 0x00), Rgb::BLACK),
            ("DRAFT", Rgb::new(0x9e, 0x9e, 0x9e), Rgb::WHITE),
            ("URGENT", Rgb::new(0xe9, 0x1e, 0x63), Rgb::WHITE),
            ("REVIEWED", Rgb::new(0x21, 0x96, 0xf3), Rgb::WHITE),
        ]
        .into_iter()
        .map(|(text, background_color, text_color)| Stamp {
            text: text.to_owned(),
            background_color,
            text_color,
            shape: StampShape::default(),
        })
        .collect()
    }

    /// Box size derived from the label length
    pub fn box_size(&self) -> Size {
        let chars = self.text.chars().count() as f32;
        Size::new((chars * STAMP_CHAR_WIDTH).max(STAMP_MIN_WIDTH), STAMP_HEIGHT)
    }
}

fn default_stamp_background() -> Rgb {
    Rgb::new(0xff, 0x57, 0x22)
}

fn default_stamp_text_color() -> Rgb {
    Rgb::WHITE
}

/// Upper-case and truncate stamp text to [`STAMP_MAX_CHARS`]
pub fn normalize_stamp_text(text: &str) -> String {
    text.trim().to_uppercase().chars().take(STAMP_MAX_CHARS).collect()
}

/// Variant payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationKind {
    Comment(Comment),
    Signature(Signature),
    Stamp(Stamp),
}

impl AnnotationKind {
    pub fn label(&self) -> &'static str {
        match self {
            AnnotationKind::Comment(_) => "comment",
            AnnotationKind::Signature(_) => "signature",
            AnnotationKind::Stamp(_) => "stamp",
        }
    }

    pub fn is_signature(&self) -> bool {
        matches!(self, AnnotationKind::Signature(_))
    }

    fn validate(&self) -> Result<(), AnnotationError> {
        match self {
            AnnotationKind::Comment(comment) => {
                if comment.text.trim().is_empty() {
                    return Err(AnnotationError::EmptyText { kind: "comment" });
                }
                if !(comment.font_size.is_finite() && comment.font_size > 0.0) {
                    return Err(AnnotationError::InvalidFontSize(comment.font_size));
                }
            }
            AnnotationKind::Signature(signature) => {
                let empty = match &signature.signature {
                    SignatureContent::Typed { text, .. } => text.trim().is_empty(),
                    SignatureContent::Drawn { image } | SignatureContent::Uploaded { image } => {
                        image.is_empty()
                    }
                };
                if empty {
                    return Err(AnnotationError::MissingSignatureContent);
                }
            }
            AnnotationKind::Stamp(stamp) => {
                if stamp.text.trim().is_empty() {
                    return Err(AnnotationError::EmptyText { kind: "stamp" });
                }
            }
        }
        Ok(())
    }

    fn normalize(&mut self) {
        if let AnnotationKind::Stamp(stamp) = self {
            stamp.text = normalize_stamp_text(&stamp.text);
        }
    }
}

/// An annotation as emitted by a tool, before it has an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDraft {
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(flatten)]
    pub kind: AnnotationKind,
}

impl AnnotationDraft {
    pub fn new(position: Position, kind: AnnotationKind) -> Self {
        Self { position, size: None, kind }
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    /// Validate and normalize the draft
    pub(crate) fn into_annotation(
        mut self,
        id: AnnotationId,
        page_count: Option<u32>,
        config: &OverlayConfig,
    ) -> Result<Annotation, AnnotationError> {
        check_position(&self.position, page_count)?;
        self.kind.validate()?;
        self.kind.normalize();

        let size = normalize_size(&self.kind, self.size, config);
        Ok(Annotation { id, position: self.position, size, kind: self.kind })
    }
}

/// Positions must be finite and on a page that exists
///
/// `page_count` is `None` until the renderer has reported the document's
/// page count; the upper page bound is only checked once it is known.
fn check_position(position: &Position, page_count: Option<u32>) -> Result<(), AnnotationError> {
    if !(position.x.is_finite() && position.y.is_finite()) {
        return Err(AnnotationError::InvalidPosition);
    }
    let out_of_range =
        position.page == 0 || page_count.is_some_and(|count| position.page > count);
    if out_of_range {
        return Err(AnnotationError::PageOutOfRange {
            page: position.page,
            page_count: page_count.unwrap_or(0),
        });
    }
    Ok(())
}

/// Signatures always carry a size (defaulted, floored); other variants never do
fn normalize_size(kind: &AnnotationKind, size: Option<Size>, config: &OverlayConfig) -> Option<Size> {
    if !kind.is_signature() {
        return None;
    }
    let size = size.filter(Size::is_positive).unwrap_or(config.default_signature_size);
    Some(size.max(config.min_size))
}

/// A stored annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    id: AnnotationId,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(flatten)]
    pub kind: AnnotationKind,
}

impl Annotation {
    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub fn page(&self) -> u32 {
        self.position.page
    }

    /// Bounding box size in document units
    ///
    /// Shared by the on-screen overlay and the export so both agree on where an
    /// annotation's edges are.
    pub fn extent(&self, config: &OverlayConfig) -> Size {
        match &self.kind {
            AnnotationKind::Comment(comment) => comment_extent(comment),
            AnnotationKind::Signature(_) => self.size.unwrap_or(config.default_signature_size),
            AnnotationKind::Stamp(stamp) => stamp.box_size(),
        }
    }

    /// Apply a shallow patch, re-normalizing what the patch touched
    ///
    /// The patched annotation is checked like a new one; on error `self` is
    /// left unchanged.
    pub(crate) fn apply(
        &mut self,
        patch: AnnotationPatch,
        page_count: Option<u32>,
        config: &OverlayConfig,
    ) -> Result<(), AnnotationError> {
        let position = patch.position.unwrap_or(self.position);
        check_position(&position, page_count)?;
        let kind = match patch.kind {
            Some(mut kind) => {
                kind.validate()?;
                kind.normalize();
                kind
            }
            None => self.kind.clone(),
        };
        let size = normalize_size(&kind, patch.size.or(self.size), config);

        self.position = position;
        self.kind = kind;
        self.size = size;
        Ok(())
    }
}

fn comment_extent(comment: &Comment) -> Size {
    let font = comment.font_family.resolve();
    let (width, lines) = comment.lines().fold((0.0_f32, 0_u32), |(width, lines), line| {
        (width.max(font.text_width(line, comment.font_size)), lines + 1)
    });
    Size::new(width, lines.max(1) as f32 * comment.font_size * LINE_HEIGHT)
}

/// Font size for a typed signature drawn in a box of `height`
pub fn typed_signature_font_size(height: f32) -> f32 {
    (height * 0.5).min(SIGNATURE_MAX_FONT_SIZE)
}

/// Output font and size used for a stamp label
pub fn stamp_font() -> (StandardFont, f32) {
    (StandardFont::HelveticaBold, STAMP_FONT_SIZE)
}

/// Partial update merged shallowly into an existing annotation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationPatch {
    pub position: Option<Position>,
    pub size: Option<Size>,
    pub kind: Option<AnnotationKind>,
}

impl AnnotationPatch {
    pub fn position(position: Position) -> Self {
        Self { position: Some(position), ..Self::default() }
    }

    pub fn size(size: Size) -> Self {
        Self { size: Some(size), ..Self::default() }
    }

    pub fn kind(kind: AnnotationKind) -> Self {
        Self { kind: Some(kind), ..Self::default() }
    }
}
