//! Glyph width and text decoding services resolved from page resources
//!
//! Exact font programs and AFM metrics are owned by the document model;
//! this module reads the width information fonts carry in their own
//! dictionaries (`/FirstChar` + `/Widths`) and falls back to coarse
//! per-family advances for the standard 14 fonts.

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use super::{operand_number, resolve};

/// Glyph advance, in per-mille text-space units, assumed when a font
/// supplies no widths and its family is unrecognized.
pub const DEFAULT_GLYPH_WIDTH: f64 = 500.0;

lazy_static! {
    /// Coarse per-family fallback advances for the standard 14 fonts
    static ref CORE_FONT_WIDTHS: HashMap<&'static str, f64> = {
        let mut m = HashMap::new();
        m.insert("Courier", 600.0);
        m.insert("Helvetica", 556.0);
        m.insert("Times", 500.0);
        m.insert("Symbol", 600.0);
        m.insert("ZapfDingbats", 700.0);
        m
    };
}

/// Width and decoding information for one font resource
#[derive(Debug)]
pub struct FontInfo {
    pub base_font: String,
    /// `/FirstChar` + `/Widths` when the font dictionary carries them
    widths: Option<(u32, Vec<f64>)>,
    fallback_width: f64,
    /// False for composite (Type0) fonts, whose multi-byte encodings are
    /// not decoded here; their runs are skipped with a warning.
    pub supported: bool,
}

impl FontInfo {
    pub fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
        let base_font = dict
            .get(b"BaseFont")
            .ok()
            .and_then(|o| resolve(doc, o).as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_default();
        let subtype = dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| resolve(doc, o).as_name().ok())
            .unwrap_or(b"");
        let supported = subtype != b"Type0";

        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| resolve(doc, o).as_i64().ok());
        let widths = dict.get(b"Widths").ok().and_then(|o| {
            resolve(doc, o).as_array().ok().map(|arr| {
                arr.iter()
                    .filter_map(|w| operand_number(resolve(doc, w)))
                    .collect::<Vec<f64>>()
            })
        });
        let widths = match (first_char, widths) {
            (Some(first), Some(w)) if first >= 0 && !w.is_empty() => Some((first as u32, w)),
            _ => None,
        };

        // Subset tags ("ABCDEF+Helvetica") and style suffixes are ignored
        // for the family lookup.
        let family = base_font
            .rsplit('+')
            .next()
            .unwrap_or(&base_font)
            .to_string();
        let fallback_width = CORE_FONT_WIDTHS
            .iter()
            .find(|(name, _)| family.starts_with(**name))
            .map(|(_, w)| *w)
            .unwrap_or(DEFAULT_GLYPH_WIDTH);

        Self {
            base_font,
            widths,
            fallback_width,
            supported,
        }
    }

    /// Advance width of a character code, in per-mille text-space units
    pub fn width(&self, code: u8) -> f64 {
        if let Some((first, widths)) = &self.widths {
            let code = code as u32;
            if code >= *first {
                if let Some(w) = widths.get((code - first) as usize) {
                    return *w;
                }
            }
        }
        self.fallback_width
    }

    /// Decode a single-byte character code to text (Latin-1 mapping)
    pub fn decode(&self, code: u8) -> char {
        code as char
    }
}

/// Per-traversal cache of resolved fonts, keyed by the font object's
/// identity so the same name in different resource dictionaries cannot
/// collide.
#[derive(Debug, Default)]
pub struct FontCache {
    by_id: HashMap<ObjectId, Arc<FontInfo>>,
}

impl FontCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a `Tf` font name against a resource dictionary
    pub fn resolve_font(
        &mut self,
        doc: &Document,
        resources: &Dictionary,
        name: &[u8],
    ) -> Option<Arc<FontInfo>> {
        let fonts = resolve(doc, resources.get(b"Font").ok()?).as_dict().ok()?;
        let entry = fonts.get(name).ok()?;
        if let Object::Reference(id) = entry {
            if let Some(info) = self.by_id.get(id) {
                return Some(info.clone());
            }
            let dict = doc.get_dictionary(*id).ok()?;
            let info = Arc::new(FontInfo::from_dict(doc, dict));
            self.by_id.insert(*id, info.clone());
            return Some(info);
        }
        // Inline font dictionaries are legal but rare; not cached
        let dict = entry.as_dict().ok()?;
        debug!(name = %String::from_utf8_lossy(name), "inline font dictionary");
        Some(Arc::new(FontInfo::from_dict(doc, dict)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_widths_array_lookup() {
        let doc = Document::with_version("1.5");
        let dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "FirstChar" => 65,
            "Widths" => vec![Object::Integer(700), Object::Integer(720)],
        };
        let font = FontInfo::from_dict(&doc, &dict);
        assert_eq!(font.width(b'A'), 700.0);
        assert_eq!(font.width(b'B'), 720.0);
        // Outside the array: family fallback
        assert_eq!(font.width(b'z'), 556.0);
        assert!(font.supported);
    }

    #[test]
    fn test_core_family_fallback() {
        let doc = Document::with_version("1.5");
        let courier = FontInfo::from_dict(
            &doc,
            &dictionary! { "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Courier-Bold" },
        );
        assert_eq!(courier.width(b'x'), 600.0);

        let subset = FontInfo::from_dict(
            &doc,
            &dictionary! { "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "ABCDEF+Helvetica" },
        );
        assert_eq!(subset.width(b'x'), 556.0);

        let unknown = FontInfo::from_dict(
            &doc,
            &dictionary! { "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Mystery" },
        );
        assert_eq!(unknown.width(b'x'), DEFAULT_GLYPH_WIDTH);
    }

    #[test]
    fn test_composite_font_is_unsupported() {
        let doc = Document::with_version("1.5");
        let font = FontInfo::from_dict(
            &doc,
            &dictionary! { "Type" => "Font", "Subtype" => "Type0", "BaseFont" => "Noto" },
        );
        assert!(!font.supported);
    }
}
