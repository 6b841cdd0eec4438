use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub mod export;
pub mod raster;
pub mod writer;

pub use export::{
    export_annotations, export_pdf, plan_page, suggested_file_name, DrawOp, ExportError,
    ExportReport, OutputDocument, SkippedAnnotation,
};
pub use raster::{DecodedImage, RasterError, RasterFormat};
pub use writer::LopdfOutput;

/// Used when a page has no usable MediaBox anywhere in its inheritance chain
const DEFAULT_PAGE_SIZE: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0 };

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Page dimensions in output-document units (PDF points)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageSize {
    pub fn to_size(self) -> overlay_core::Size {
        overlay_core::Size::new(self.width_pt, self.height_pt)
    }
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported")]
    EncryptedUnsupported,
    #[error("backend error: {0}")]
    Backend(String),
}

/// Page geometry provider
///
/// Page numbers are 1-based, matching annotation positions.
pub trait PdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError>;
    fn page_size(&self, handle: DocumentHandle, page: u32) -> Result<PageSize, PdfEngineError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError>;
}

#[derive(Debug, Default)]
pub struct LopdfEngine {
    next_handle: u64,
    docs: HashMap<DocumentHandle, Vec<PageSize>>,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn page_sizes(&self, handle: DocumentHandle) -> Result<&[PageSize], PdfEngineError> {
        self.docs.get(&handle).map(Vec::as_slice).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

impl PdfEngine for LopdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
        let bytes = match source {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        let doc = load_document(&bytes)?;
        let sizes: Vec<PageSize> =
            doc.get_pages().into_values().map(|page_id| page_size_of(&doc, page_id)).collect();
        if sizes.is_empty() {
            return Err(PdfEngineError::Backend("document has no pages".to_owned()));
        }

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        tracing::debug!(handle = handle.raw(), pages = sizes.len(), "document opened");
        self.docs.insert(handle, sizes);

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        Ok(self.page_sizes(handle)?.len() as u32)
    }

    fn page_size(&self, handle: DocumentHandle, page: u32) -> Result<PageSize, PdfEngineError> {
        let sizes = self.page_sizes(handle)?;
        page.checked_sub(1)
            .and_then(|index| sizes.get(index as usize))
            .copied()
            .ok_or(PdfEngineError::PageOutOfRange { page, page_count: sizes.len() as u32 })
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

pub fn default_engine() -> LopdfEngine {
    LopdfEngine::new()
}

/// Parse a PDF, rejecting encrypted input up front
pub(crate) fn load_document(bytes: &[u8]) -> Result<Document, PdfEngineError> {
    if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
        return Err(PdfEngineError::EncryptedUnsupported);
    }
    Ok(Document::load_mem(bytes)?)
}

/// A page's MediaBox: lower-left corner and dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MediaBox {
    pub origin: (f32, f32),
    pub size: PageSize,
}

/// The page's MediaBox, inherited from ancestors when absent
pub(crate) fn media_box_of(doc: &Document, page_id: ObjectId) -> MediaBox {
    inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| media_box(doc, obj))
        .unwrap_or(MediaBox { origin: (0.0, 0.0), size: DEFAULT_PAGE_SIZE })
}

pub(crate) fn page_size_of(doc: &Document, page_id: ObjectId) -> PageSize {
    media_box_of(doc, page_id).size
}

/// Look up `key` on a page dictionary, walking `/Parent` links
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let dict = doc.get_dictionary(id).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Resolve a possibly indirect dictionary
pub(crate) fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn media_box(doc: &Document, obj: &Object) -> Option<MediaBox> {
    let resolved = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let array = resolved.as_array().ok()?;
    if array.len() != 4 {
        return None;
    }
    let x0 = array[0].as_float().ok()?;
    let y0 = array[1].as_float().ok()?;
    let x1 = array[2].as_float().ok()?;
    let y1 = array[3].as_float().ok()?;
    let size = PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() };
    (size.width_pt > 0.0 && size.height_pt > 0.0)
        .then_some(MediaBox { origin: (x0.min(x1), y0.min(y1)), size })
}
