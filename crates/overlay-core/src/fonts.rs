//! Font families and the standard output fonts they resolve to
//!
//! Annotations carry a display family name (what the user picked in a tool).
//! Output documents only use the standard Type1 fonts every PDF reader ships,
//! so each family is resolved to one of them with a deterministic lookup:
//! exact names first, then substring heuristics.
//!
//! Width tables are the standard AFM advance widths (1/1000 em) for the
//! printable ASCII range, which makes text measurement exact for the glyphs
//! we emit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Font family name as chosen by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FontFamily {
    #[default]
    Arial,
    Helvetica,
    TimesNewRoman,
    CourierNew,
    Georgia,
    Verdana,
    BrushScriptMt,
    LucidaHandwriting,
    /// Any family name outside the known set, kept verbatim
    Other(String),
}

impl FontFamily {
    /// Families offered by the comment tool
    pub const COMMENT_FAMILIES: [FontFamily; 5] = [
        FontFamily::Arial,
        FontFamily::TimesNewRoman,
        FontFamily::CourierNew,
        FontFamily::Georgia,
        FontFamily::Verdana,
    ];

    /// Families offered by the typed-signature tool
    pub const SIGNATURE_FAMILIES: [FontFamily; 4] = [
        FontFamily::BrushScriptMt,
        FontFamily::LucidaHandwriting,
        FontFamily::CourierNew,
        FontFamily::Georgia,
    ];

    pub fn name(&self) -> &str {
        match self {
            FontFamily::Arial => "Arial",
            FontFamily::Helvetica => "Helvetica",
            FontFamily::TimesNewRoman => "Times New Roman",
            FontFamily::CourierNew => "Courier New",
            FontFamily::Georgia => "Georgia",
            FontFamily::Verdana => "Verdana",
            FontFamily::BrushScriptMt => "Brush Script MT",
            FontFamily::LucidaHandwriting => "Lucida Handwriting",
            FontFamily::Other(name) => name,
        }
    }

    /// Resolve to the output font used when baking this family into a document
    pub fn resolve(&self) -> StandardFont {
        match self {
            FontFamily::Arial | FontFamily::Helvetica | FontFamily::Verdana => {
                StandardFont::Helvetica
            }
            FontFamily::TimesNewRoman | FontFamily::Georgia => StandardFont::TimesRoman,
            FontFamily::CourierNew => StandardFont::Courier,
            FontFamily::BrushScriptMt | FontFamily::LucidaHandwriting => {
                StandardFont::HelveticaOblique
            }
            FontFamily::Other(name) => resolve_by_heuristic(name),
        }
    }
}

impl From<&str> for FontFamily {
    fn from(name: &str) -> Self {
        let known = [
            FontFamily::Arial,
            FontFamily::Helvetica,
            FontFamily::TimesNewRoman,
            FontFamily::CourierNew,
            FontFamily::Georgia,
            FontFamily::Verdana,
            FontFamily::BrushScriptMt,
            FontFamily::LucidaHandwriting,
        ];
        let trimmed = name.trim();
        known
            .into_iter()
            .find(|family| family.name().eq_ignore_ascii_case(trimmed))
            .unwrap_or_else(|| FontFamily::Other(trimmed.to_owned()))
    }
}

impl From<String> for FontFamily {
    fn from(name: String) -> Self {
        FontFamily::from(name.as_str())
    }
}

impl From<FontFamily> for String {
    fn from(family: FontFamily) -> Self {
        family.name().to_owned()
    }
}

impl fmt::Display for FontFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn resolve_by_heuristic(name: &str) -> StandardFont {
    let lower = name.to_ascii_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|needle| lower.contains(needle));

    if has(&["times", "serif", "georgia"]) {
        StandardFont::TimesRoman
    } else if has(&["courier", "mono"]) {
        StandardFont::Courier
    } else if has(&["bold"]) {
        StandardFont::HelveticaBold
    } else if has(&["script", "brush", "handwriting", "lucida"]) {
        StandardFont::HelveticaOblique
    } else {
        StandardFont::Helvetica
    }
}

/// Standard Type1 fonts available in every output document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    TimesRoman,
    Courier,
}

impl StandardFont {
    pub const ALL: [StandardFont; 5] = [
        StandardFont::Helvetica,
        StandardFont::HelveticaBold,
        StandardFont::HelveticaOblique,
        StandardFont::TimesRoman,
        StandardFont::Courier,
    ];

    /// PostScript name used as `/BaseFont`
    pub fn base_font(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::Courier => "Courier",
        }
    }

    /// Ascender height in 1/1000 em
    pub fn ascent(self) -> f32 {
        match self {
            StandardFont::Helvetica
            | StandardFont::HelveticaBold
            | StandardFont::HelveticaOblique => 718.0,
            StandardFont::TimesRoman => 683.0,
            StandardFont::Courier => 629.0,
        }
    }

    /// Advance width of one encoded byte in 1/1000 em
    pub fn glyph_width(self, byte: u8) -> u16 {
        let (ascii, latin1) = match self {
            StandardFont::Helvetica | StandardFont::HelveticaOblique => {
                (&HELVETICA_WIDTHS, &HELVETICA_LATIN1_WIDTHS)
            }
            StandardFont::HelveticaBold => (&HELVETICA_BOLD_WIDTHS, &HELVETICA_BOLD_LATIN1_WIDTHS),
            StandardFont::TimesRoman => (&TIMES_ROMAN_WIDTHS, &TIMES_ROMAN_LATIN1_WIDTHS),
            StandardFont::Courier => return 600,
        };

        match byte {
            32..=126 => ascii[(byte - 32) as usize],
            160..=255 => latin1[(byte - 160) as usize],
            _ => ascii[(b'?' - 32) as usize],
        }
    }

    /// Width of `text` at `size`, measured over the bytes actually emitted
    pub fn text_width(self, text: &str, size: f32) -> f32 {
        let units: u32 = encode_text(text).iter().map(|&b| u32::from(self.glyph_width(b))).sum();
        units as f32 * size / 1000.0
    }
}

/// Encode text for a standard font (WinAnsi/Latin-1 subset)
///
/// Characters outside Latin-1 and control characters become `?`.
pub fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7e | 0xa0..=0xff => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN_WIDTHS: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

// Latin-1 half, 0xA0..=0xFF in WinAnsi order
#[rustfmt::skip]
const HELVETICA_LATIN1_WIDTHS: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

#[rustfmt::skip]
const HELVETICA_BOLD_LATIN1_WIDTHS: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278,
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556,
];

#[rustfmt::skip]
const TIMES_ROMAN_LATIN1_WIDTHS: [u16; 96] = [
    250, 333, 500, 500, 500, 500, 200, 500, 333, 760, 276, 500, 564, 333, 760, 333,
    400, 564, 300, 300, 333, 500, 453, 250, 333, 300, 310, 500, 750, 750, 750, 444,
    722, 722, 722, 722, 722, 722, 889, 667, 611, 611, 611, 611, 333, 333, 333, 333,
    722, 722, 722, 722, 722, 722, 722, 564, 722, 722, 722, 722, 722, 722, 556, 500,
    444, 444, 444, 444, 444, 444, 667, 444, 444, 444, 444, 444, 278, 278, 278, 278,
    500, 500, 500, 500, 500, 500, 500, 564, 500, 500, 500, 500, 500, 500, 500, 500,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_family_names_resolve_directly() {
        assert_eq!(FontFamily::Arial.resolve(), StandardFont::Helvetica);
        assert_eq!(FontFamily::TimesNewRoman.resolve(), StandardFont::TimesRoman);
        assert_eq!(FontFamily::Georgia.resolve(), StandardFont::TimesRoman);
        assert_eq!(FontFamily::CourierNew.resolve(), StandardFont::Courier);
        assert_eq!(FontFamily::BrushScriptMt.resolve(), StandardFont::HelveticaOblique);
    }

    #[test]
    fn unknown_names_fall_back_to_heuristics() {
        let resolve = |name: &str| FontFamily::from(name).resolve();
        assert_eq!(resolve("Palatino Serif"), StandardFont::TimesRoman);
        assert_eq!(resolve("JetBrains Mono"), StandardFont::Courier);
        assert_eq!(resolve("Roboto Bold"), StandardFont::HelveticaBold);
        assert_eq!(resolve("Segoe Script"), StandardFont::HelveticaOblique);
        assert_eq!(resolve("Comic Sans"), StandardFont::Helvetica);
    }

    #[test]
    fn family_names_round_trip_case_insensitively() {
        assert_eq!(FontFamily::from("times new roman"), FontFamily::TimesNewRoman);
        assert_eq!(FontFamily::from("Fira Code"), FontFamily::Other("Fira Code".into()));

        let json = serde_json::to_string(&FontFamily::BrushScriptMt).unwrap();
        assert_eq!(json, "\"Brush Script MT\"");
    }

    #[test]
    fn width_tables_cover_printable_ascii() {
        assert_eq!(StandardFont::Helvetica.glyph_width(b' '), 278);
        assert_eq!(StandardFont::Helvetica.glyph_width(b'~'), 584);
        assert_eq!(StandardFont::HelveticaBold.glyph_width(b'A'), 722);
        assert_eq!(StandardFont::TimesRoman.glyph_width(b'z'), 444);
        assert_eq!(StandardFont::Courier.glyph_width(b'W'), 600);
    }

    #[test]
    fn latin1_bytes_use_their_own_widths() {
        // É = 667 in Helvetica-Bold, ? = 611
        assert_eq!(StandardFont::HelveticaBold.glyph_width(0xc9), 667);
        assert_eq!(StandardFont::Helvetica.glyph_width(0xe9), 556);
        assert_eq!(StandardFont::TimesRoman.glyph_width(0xa9), 760);

        let cafe = StandardFont::HelveticaBold.text_width("CAFÉ", 12.0);
        let expected = (722 + 722 + 611 + 667) as f32 * 12.0 / 1000.0;
        assert!((cafe - expected).abs() < 1e-4);
    }

    #[test]
    fn text_width_scales_with_size() {
        // H = 722, i = 222
        let width = StandardFont::Helvetica.text_width("Hi", 10.0);
        assert!((width - 9.44).abs() < 1e-4);
        assert!((StandardFont::Courier.text_width("abc", 12.0) - 21.6).abs() < 1e-4);
    }

    #[test]
    fn encode_replaces_characters_outside_latin1() {
        assert_eq!(encode_text("café ✓"), vec![b'c', b'a', b'f', 0xe9, b' ', b'?']);
        assert_eq!(encode_text("a\tb"), b"a?b".to_vec());
    }
}
