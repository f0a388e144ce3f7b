//! Glyph extraction adapter
//!
//! Walks a page's content stream (descending into form XObjects) and
//! yields device-space character boxes in painting order. Strategies
//! consume this stream to locate sensitive text; they never touch raw
//! operators.

use lopdf::{
    content::{Content, Operation},
    Dictionary, Document, Object,
};
use tracing::debug;

use super::font::FontCache;
use super::state::{StateTracker, TrackEvent};
use super::{operand_number, page_resources, resolve, PageContext};
use crate::error::Result;
use crate::geometry::{Quad, Transform};
use crate::warnings::{WarningKind, WarningLog};

/// Nesting limit for form XObject invocations, guarding against
/// self-referential resource dictionaries.
const MAX_FORM_DEPTH: usize = 16;

/// One rendered character with its device-space footprint
#[derive(Debug, Clone)]
pub struct GlyphBox {
    pub ch: char,
    /// `None` when the glyph was shown under a singular transform
    pub quad: Option<Quad>,
}

/// All characters produced by a single text-showing operator
#[derive(Debug, Clone)]
pub struct GlyphRun {
    /// Operator identity within the page (see [`crate::warnings::Warning`])
    pub path: String,
    pub glyphs: Vec<GlyphBox>,
}

struct Frame {
    ops: Vec<Operation>,
    idx: usize,
    /// Operator-path prefix of the invocation that entered this frame;
    /// empty for the page's own stream
    prefix: String,
    resources: Dictionary,
    saved_depth: usize,
}

/// Lazy iterator over a page's glyph runs
pub struct GlyphStream<'a> {
    doc: &'a Document,
    page: u32,
    warnings: &'a mut WarningLog,
    tracker: StateTracker,
    fonts: FontCache,
    frames: Vec<Frame>,
}

impl<'a> GlyphStream<'a> {
    pub fn new(ctx: &PageContext<'a>, warnings: &'a mut WarningLog) -> Result<Self> {
        let data = ctx.doc.get_page_content(ctx.id)?;
        let content = Content::decode(&data)?;
        let resources = page_resources(ctx.doc, ctx.id)
            .cloned()
            .unwrap_or_default();
        Ok(Self {
            doc: ctx.doc,
            page: ctx.number,
            warnings,
            tracker: StateTracker::new(Transform::IDENTITY),
            fonts: FontCache::new(),
            frames: vec![Frame {
                ops: content.operations,
                idx: 0,
                prefix: String::new(),
                resources,
                saved_depth: 0,
            }],
        })
    }

    fn enter_form(&mut self, name: &[u8], path: &str) {
        if self.frames.len() >= MAX_FORM_DEPTH {
            debug!(page = self.page, "form nesting limit reached");
            return;
        }
        let parent = match self.frames.last() {
            Some(f) => f.resources.clone(),
            None => return,
        };
        let Some((ops, resources, matrix)) = load_form(self.doc, &parent, name) else {
            return;
        };
        let saved_depth = self.tracker.depth();
        self.tracker.save();
        if let Some(m) = matrix {
            if self.tracker.concat_matrix(m) {
                self.warnings
                    .report(WarningKind::SingularTransform, self.page, path);
            }
        }
        self.frames.push(Frame {
            ops,
            idx: 0,
            prefix: path.to_string(),
            resources,
            saved_depth,
        });
    }
}

impl<'a> Iterator for GlyphStream<'a> {
    type Item = GlyphRun;

    fn next(&mut self) -> Option<GlyphRun> {
        loop {
            let frame = self.frames.last_mut()?;
            if frame.idx >= frame.ops.len() {
                let depth = frame.saved_depth;
                self.frames.pop();
                if self.frames.is_empty() {
                    return None;
                }
                self.tracker.restore_to_depth(depth);
                continue;
            }
            let idx = frame.idx;
            frame.idx += 1;
            let path = if frame.prefix.is_empty() {
                idx.to_string()
            } else {
                format!("{}/{}", frame.prefix, idx)
            };
            let op = &frame.ops[idx];
            let event =
                self.tracker
                    .handle_operator(op, self.doc, &frame.resources, &mut self.fonts);
            match event {
                TrackEvent::Text(glyphs) => {
                    return Some(GlyphRun {
                        path,
                        glyphs: glyphs
                            .into_iter()
                            .map(|g| GlyphBox {
                                ch: g.ch,
                                quad: g.quad,
                            })
                            .collect(),
                    });
                }
                TrackEvent::SingularTransform => {
                    self.warnings
                        .report(WarningKind::SingularTransform, self.page, &path);
                }
                TrackEvent::UnsupportedText => {
                    self.warnings
                        .report(WarningKind::UnsupportedContent, self.page, &path);
                }
                TrackEvent::XObject(name) => self.enter_form(&name, &path),
                TrackEvent::None => {}
            }
        }
    }
}

/// Resolve a form XObject by name: its operations, resource dictionary
/// and optional `/Matrix`. Image XObjects yield `None`; they carry no
/// text.
fn load_form(
    doc: &Document,
    resources: &Dictionary,
    name: &[u8],
) -> Option<(Vec<Operation>, Dictionary, Option<Transform>)> {
    let xobjects = resolve(doc, resources.get(b"XObject").ok()?).as_dict().ok()?;
    let stream = match resolve(doc, xobjects.get(name).ok()?) {
        Object::Stream(s) => s,
        _ => return None,
    };
    match stream.dict.get(b"Subtype").and_then(|s| s.as_name()) {
        Ok(b"Form") => {}
        _ => return None,
    }
    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    let content = Content::decode(&data).ok()?;
    let form_resources = stream
        .dict
        .get(b"Resources")
        .ok()
        .map(|r| resolve(doc, r))
        .and_then(|r| r.as_dict().ok())
        .cloned()
        .unwrap_or_else(|| resources.clone());
    let matrix = stream.dict.get(b"Matrix").ok().and_then(|m| {
        let arr = m.as_array().ok()?;
        if arr.len() != 6 {
            return None;
        }
        let mut v = [0.0f64; 6];
        for (i, slot) in v.iter_mut().enumerate() {
            *slot = operand_number(&arr[i])?;
        }
        Some(Transform::new(v[0], v[1], v[2], v[3], v[4], v[5]))
    });
    Some((content.operations, form_resources, matrix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    fn first_page(doc: &Document) -> PageContext<'_> {
        let pages = doc.get_pages();
        let (&number, &id) = pages.iter().next().unwrap();
        PageContext {
            doc,
            number,
            id,
        }
    }

    fn build_doc(content: &str, extra_xobjects: Option<Dictionary>) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let mut resources = dictionary! {
            "Font" => dictionary! { "F1" => Object::Reference(font_id) },
        };
        if let Some(x) = extra_xobjects {
            resources.set("XObject", x);
        }
        let resources_id = doc.add_object(resources);
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.as_bytes().to_vec(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(content_id),
            "Resources" => Object::Reference(resources_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    fn collect_text(ctx: &PageContext<'_>, warnings: &mut WarningLog) -> String {
        GlyphStream::new(ctx, warnings)
            .unwrap()
            .flat_map(|run| run.glyphs.into_iter().map(|g| g.ch))
            .collect()
    }

    #[test]
    fn test_extracts_text_in_paint_order() {
        let doc = build_doc(
            "BT /F1 12 Tf 72 700 Td (Hello) Tj 0 -14 Td (World) Tj ET",
            None,
        );
        let ctx = first_page(&doc);
        let mut warnings = WarningLog::new();
        assert_eq!(collect_text(&ctx, &mut warnings), "HelloWorld");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_singular_cm_reported_with_operator_identity() {
        let doc = build_doc(
            "q 0 0 0 0 0 0 cm BT /F1 12 Tf (gone) Tj ET Q \
             BT /F1 12 Tf 72 700 Td (kept) Tj ET",
            None,
        );
        let ctx = first_page(&doc);
        let mut warnings = WarningLog::new();
        let runs: Vec<GlyphRun> = GlyphStream::new(&ctx, &mut warnings).unwrap().collect();
        assert_eq!(warnings.count(WarningKind::SingularTransform), 1);
        // Glyphs under the degenerate transform carry no quads
        let quads: Vec<bool> = runs
            .iter()
            .flat_map(|r| r.glyphs.iter().map(|g| g.quad.is_some()))
            .collect();
        assert_eq!(quads, vec![false, false, false, false, true, true, true, true]);
    }

    #[test]
    fn test_descends_into_form_xobjects() {
        // Form without its own resources: inherits the page's, shifted
        // by the /Matrix translation
        let form = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 100.into(), 100.into()],
                "Matrix" => vec![1.into(), 0.into(), 0.into(), 1.into(), 50.into(), 0.into()],
            },
            b"BT /F1 12 Tf 10 10 Td (In) Tj ET".to_vec(),
        );
        let xobjects = dictionary! { "Fm0" => Object::Stream(form) };
        let doc = build_doc(
            "BT /F1 12 Tf 72 700 Td (Out) Tj ET /Fm0 Do",
            Some(xobjects),
        );
        let ctx = first_page(&doc);
        let mut warnings = WarningLog::new();
        let runs: Vec<GlyphRun> = GlyphStream::new(&ctx, &mut warnings).unwrap().collect();
        let text: String = runs
            .iter()
            .flat_map(|r| r.glyphs.iter().map(|g| g.ch))
            .collect();
        assert_eq!(text, "OutIn");
        // Form glyphs are shifted by the /Matrix translation
        let inner_run = runs.last().unwrap();
        assert!(inner_run.path.contains('/'));
        let rect = inner_run.glyphs[0].quad.unwrap().bounding_rect();
        assert!((rect.llx - 60.0).abs() < 1e-9);
    }
}
