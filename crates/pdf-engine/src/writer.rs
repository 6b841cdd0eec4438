//! lopdf-backed output document
//!
//! Overlay content is appended after the page's existing content, which is
//! wrapped in `q`/`Q` so its graphics state cannot leak into the overlay.
//! Fonts are the standard Type1 set and are added once per document. Draw
//! operations are relative to the MediaBox's lower-left corner; pages whose
//! box does not start at the origin get a translation first.

use crate::export::{DrawOp, OutputDocument};
use crate::raster::DecodedImage;
use crate::{
    inherited, load_document, media_box_of, page_size_of, resolve_dict, PageSize, PdfEngineError,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use overlay_core::fonts::encode_text;
use overlay_core::{Rgb, StandardFont};
use std::collections::{BTreeMap, HashMap};

/// Bezier control distance for a quarter circle of radius 1
const KAPPA: f32 = 0.552_284_8;

fn font_resource_name(font: StandardFont) -> &'static str {
    match font {
        StandardFont::Helvetica => "OvHelv",
        StandardFont::HelveticaBold => "OvHelvB",
        StandardFont::HelveticaOblique => "OvHelvO",
        StandardFont::TimesRoman => "OvTiRo",
        StandardFont::Courier => "OvCour",
    }
}

/// Resources a page needs for one batch of draw operations
#[derive(Default)]
struct PageResources {
    entries: Vec<(&'static str, String, ObjectId)>,
}

impl PageResources {
    fn add(&mut self, category: &'static str, name: &str, id: ObjectId) {
        self.entries.push((category, name.to_owned(), id));
    }
}

pub struct LopdfOutput {
    doc: Document,
    pages: BTreeMap<u32, ObjectId>,
    fonts: HashMap<StandardFont, ObjectId>,
    /// Keyed by opacity in thousandths
    opacity_states: HashMap<u16, ObjectId>,
    images: u32,
}

impl LopdfOutput {
    pub fn load(bytes: &[u8]) -> Result<Self, PdfEngineError> {
        let doc = load_document(bytes)?;
        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(PdfEngineError::Backend("document has no pages".to_owned()));
        }
        Ok(Self { doc, pages, fonts: HashMap::new(), opacity_states: HashMap::new(), images: 0 })
    }

    fn page_id(&self, page: u32) -> Result<ObjectId, PdfEngineError> {
        self.pages.get(&page).copied().ok_or(PdfEngineError::PageOutOfRange {
            page,
            page_count: self.pages.len() as u32,
        })
    }

    fn font(&mut self, font: StandardFont) -> ObjectId {
        let doc = &mut self.doc;
        *self.fonts.entry(font).or_insert_with(|| {
            doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            })
        })
    }

    fn opacity_state(&mut self, opacity: f32) -> (String, ObjectId) {
        let key = (opacity.clamp(0.0, 1.0) * 1000.0).round() as u16;
        let doc = &mut self.doc;
        let id = *self.opacity_states.entry(key).or_insert_with(|| {
            let alpha = f32::from(key) / 1000.0;
            doc.add_object(dictionary! {
                "Type" => "ExtGState",
                "ca" => alpha,
                "CA" => alpha,
            })
        });
        (format!("OvGs{key}"), id)
    }

    fn image(&mut self, image: &DecodedImage) -> (String, ObjectId) {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(image.width),
            "Height" => i64::from(image.height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };
        if let Some(alpha) = &image.alpha {
            let smask = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(image.width),
                    "Height" => i64::from(image.height),
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                alpha.clone(),
            );
            dict.set("SMask", self.doc.add_object(smask));
        }
        let id = self.doc.add_object(Stream::new(dict, image.rgb.clone()));
        self.images += 1;
        (format!("OvIm{}", self.images), id)
    }

    fn encode(&mut self, op: &DrawOp, out: &mut Vec<Operation>, resources: &mut PageResources) {
        match op {
            DrawOp::Rectangle { x, y, width, height, fill, opacity, border, corner_radius } => {
                out.push(Operation::new("q", vec![]));
                if *opacity < 1.0 {
                    let (name, id) = self.opacity_state(*opacity);
                    out.push(Operation::new("gs", vec![Object::Name(name.clone().into_bytes())]));
                    resources.add("ExtGState", &name, id);
                }
                push_colors(out, *fill, *border);
                if *corner_radius > 0.0 {
                    rounded_rect_path(out, *x, *y, *width, *height, *corner_radius);
                } else {
                    out.push(Operation::new("re", reals(&[*x, *y, *width, *height])));
                }
                out.push(Operation::new(if border.is_some() { "B" } else { "f" }, vec![]));
                out.push(Operation::new("Q", vec![]));
            }
            DrawOp::Ellipse { cx, cy, rx, ry, fill, border } => {
                out.push(Operation::new("q", vec![]));
                push_colors(out, *fill, *border);
                ellipse_path(out, *cx, *cy, *rx, *ry);
                out.push(Operation::new(if border.is_some() { "b" } else { "f" }, vec![]));
                out.push(Operation::new("Q", vec![]));
            }
            DrawOp::Text { x, y, size, font, color, text } => {
                let name = font_resource_name(*font);
                let id = self.font(*font);
                resources.add("Font", name, id);

                let baseline = y - font.ascent() * size / 1000.0;
                let (r, g, b) = color.to_normalized();
                out.push(Operation::new("BT", vec![]));
                out.push(Operation::new("Tf", vec![Object::Name(name.as_bytes().to_vec()), (*size).into()]));
                out.push(Operation::new("rg", reals(&[r, g, b])));
                out.push(Operation::new("Td", reals(&[*x, baseline])));
                out.push(Operation::new(
                    "Tj",
                    vec![Object::String(encode_text(text), StringFormat::Literal)],
                ));
                out.push(Operation::new("ET", vec![]));
            }
            DrawOp::Image { x, y, width, height, image } => {
                let (name, id) = self.image(image);
                resources.add("XObject", &name, id);
                out.push(Operation::new("q", vec![]));
                out.push(Operation::new("cm", reals(&[*width, 0.0, 0.0, *height, *x, *y])));
                out.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
                out.push(Operation::new("Q", vec![]));
            }
        }
    }

    /// The page's effective resources (own or inherited) with `additions` merged in
    fn merged_resources(&self, page_id: ObjectId, additions: &PageResources) -> Dictionary {
        let mut resources = inherited(&self.doc, page_id, b"Resources")
            .and_then(|obj| resolve_dict(&self.doc, obj))
            .cloned()
            .unwrap_or_else(Dictionary::new);

        for category in ["Font", "ExtGState", "XObject"] {
            let mut entries = additions.entries.iter().filter(|(c, _, _)| *c == category).peekable();
            if entries.peek().is_none() {
                continue;
            }
            let mut dict = resources
                .get(category.as_bytes())
                .ok()
                .and_then(|obj| resolve_dict(&self.doc, obj))
                .cloned()
                .unwrap_or_else(Dictionary::new);
            for (_, name, id) in entries {
                dict.set(name.as_str(), *id);
            }
            resources.set(category, dict);
        }
        resources
    }
}

impl OutputDocument for LopdfOutput {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_size(&self, page: u32) -> Result<PageSize, PdfEngineError> {
        Ok(page_size_of(&self.doc, self.page_id(page)?))
    }

    fn draw(&mut self, page: u32, ops: &[DrawOp]) -> Result<(), PdfEngineError> {
        let page_id = self.page_id(page)?;

        let mut operations = Vec::new();
        let (llx, lly) = media_box_of(&self.doc, page_id).origin;
        let translated = llx != 0.0 || lly != 0.0;
        if translated {
            operations.push(Operation::new("q", vec![]));
            operations.push(Operation::new("cm", reals(&[1.0, 0.0, 0.0, 1.0, llx, lly])));
        }
        let mut additions = PageResources::default();
        for op in ops {
            self.encode(op, &mut operations, &mut additions);
        }
        if translated {
            operations.push(Operation::new("Q", vec![]));
        }
        let overlay = Content { operations }.encode()?;

        let existing = self.doc.get_page_content(page_id)?;
        let mut content = Vec::with_capacity(existing.len() + overlay.len() + 8);
        content.extend_from_slice(b"q\n");
        content.extend_from_slice(&existing);
        content.extend_from_slice(b"\nQ\n");
        content.extend_from_slice(&overlay);
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content));

        let resources = self.merged_resources(page_id, &additions);
        let page_dict = self.doc.get_object_mut(page_id).and_then(Object::as_dict_mut)?;
        page_dict.set("Contents", content_id);
        page_dict.set("Resources", resources);

        tracing::debug!(page, ops = ops.len(), "overlay content written");
        Ok(())
    }

    fn save(self) -> Result<Vec<u8>, PdfEngineError> {
        let mut doc = self.doc;
        doc.prune_objects();
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|err| PdfEngineError::Backend(format!("failed to serialize document: {err}")))?;
        Ok(bytes)
    }
}

fn reals(values: &[f32]) -> Vec<Object> {
    values.iter().map(|&v| v.into()).collect()
}

fn push_colors(out: &mut Vec<Operation>, fill: Rgb, border: Option<(Rgb, f32)>) {
    let (r, g, b) = fill.to_normalized();
    out.push(Operation::new("rg", reals(&[r, g, b])));
    if let Some((color, width)) = border {
        let (r, g, b) = color.to_normalized();
        out.push(Operation::new("RG", reals(&[r, g, b])));
        out.push(Operation::new("w", reals(&[width])));
    }
}

fn ellipse_path(out: &mut Vec<Operation>, cx: f32, cy: f32, rx: f32, ry: f32) {
    let kx = rx * KAPPA;
    let ky = ry * KAPPA;
    out.push(Operation::new("m", reals(&[cx + rx, cy])));
    out.push(Operation::new("c", reals(&[cx + rx, cy + ky, cx + kx, cy + ry, cx, cy + ry])));
    out.push(Operation::new("c", reals(&[cx - kx, cy + ry, cx - rx, cy + ky, cx - rx, cy])));
    out.push(Operation::new("c", reals(&[cx - rx, cy - ky, cx - kx, cy - ry, cx, cy - ry])));
    out.push(Operation::new("c", reals(&[cx + kx, cy - ry, cx + rx, cy - ky, cx + rx, cy])));
}

fn rounded_rect_path(out: &mut Vec<Operation>, x: f32, y: f32, w: f32, h: f32, radius: f32) {
    let r = radius.min(w / 2.0).min(h / 2.0);
    let k = r * KAPPA;
    let (right, top) = (x + w, y + h);
    out.push(Operation::new("m", reals(&[x + r, y])));
    out.push(Operation::new("l", reals(&[right - r, y])));
    out.push(Operation::new("c", reals(&[right - r + k, y, right, y + r - k, right, y + r])));
    out.push(Operation::new("l", reals(&[right, top - r])));
    out.push(Operation::new("c", reals(&[right, top - r + k, right - r + k, top, right - r, top])));
    out.push(Operation::new("l", reals(&[x + r, top])));
    out.push(Operation::new("c", reals(&[x + r - k, top, x, top - r + k, x, top - r])));
    out.push(Operation::new("l", reals(&[x, y + r])));
    out.push(Operation::new("c", reals(&[x, y + r - k, x + r - k, y, x + r, y])));
    out.push(Operation::new("h", vec![]));
}
