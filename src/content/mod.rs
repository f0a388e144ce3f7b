//! Content-stream traversal: shared state tracking, font services and the
//! glyph extraction adapter

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::geometry::Rect;

pub mod font;
pub mod state;
pub mod walker;

pub use font::{FontCache, FontInfo};
pub use state::{Glyph, StateTracker, TrackEvent};
pub use walker::{GlyphBox, GlyphRun, GlyphStream};

/// A page handle passed to strategies and the rewrite engine
#[derive(Clone, Copy)]
pub struct PageContext<'a> {
    pub doc: &'a Document,
    /// 1-based page number in document order
    pub number: u32,
    pub id: ObjectId,
}

/// Follow reference chains to the referenced object
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    let mut cur = obj;
    // Bounded to survive reference cycles in malformed documents
    for _ in 0..16 {
        match cur {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(next) => cur = next,
                Err(_) => break,
            },
            _ => break,
        }
    }
    cur
}

/// Numeric operand value, integer or real
pub fn operand_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// The page's resource dictionary, following the page-tree inheritance
/// chain when the page itself carries none.
pub fn page_resources<'a>(doc: &'a Document, page_id: ObjectId) -> Option<&'a Dictionary> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    for _ in 0..32 {
        if let Ok(res) = dict.get(b"Resources") {
            return resolve(doc, res).as_dict().ok();
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// The page's media box (inherited when absent); defaults to US Letter
pub fn media_box(doc: &Document, page_id: ObjectId) -> Rect {
    const LETTER: Rect = Rect {
        llx: 0.0,
        lly: 0.0,
        urx: 612.0,
        ury: 792.0,
    };

    let mut dict = match doc.get_dictionary(page_id) {
        Ok(d) => d,
        Err(_) => return LETTER,
    };
    for _ in 0..32 {
        if let Ok(mb) = dict.get(b"MediaBox") {
            if let Ok(values) = resolve(doc, mb).as_array() {
                let nums: Vec<f64> = values
                    .iter()
                    .filter_map(|v| operand_number(resolve(doc, v)))
                    .collect();
                if nums.len() == 4 {
                    return Rect::new(nums[0], nums[1], nums[2], nums[3]);
                }
            }
        }
        match dict
            .get(b"Parent")
            .ok()
            .and_then(|p| p.as_reference().ok())
            .and_then(|id| doc.get_dictionary(id).ok())
        {
            Some(parent) => dict = parent,
            None => break,
        }
    }
    LETTER
}
