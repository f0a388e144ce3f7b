//! Shared graphics/text state tracking for content-stream traversal
//!
//! Both the glyph extraction adapter and the rewrite engine walk operator
//! streams through this tracker, so location computation follows a single
//! path regardless of the execution mode.

use std::sync::Arc;

use lopdf::{content::Operation, Dictionary, Document, Object};

use super::font::{FontCache, FontInfo};
use super::operand_number;
use crate::config::GEOMETRY_EPSILON;
use crate::geometry::{Point, Quad, Transform};

/// Fraction of the font size above the baseline covered by a glyph quad
pub const GLYPH_ASCENT: f64 = 0.8;
/// Fraction of the font size below the baseline covered by a glyph quad
pub const GLYPH_DESCENT: f64 = -0.2;

/// One rendered character of a text-showing operator
#[derive(Debug, Clone)]
pub struct Glyph {
    /// Raw character code from the string operand
    pub code: u8,
    /// Decoded character
    pub ch: char,
    /// Device-space quad, `None` when the active transform composition is
    /// singular and the glyph cannot be projected
    pub quad: Option<Quad>,
    /// Advance expressed in `TJ`-adjustment units (per-mille of the font
    /// size, including character/word spacing), used by the rewrite
    /// engine to replace a removed glyph with an equivalent displacement
    pub displacement: f64,
    /// Index of the operand element this glyph came from (`TJ` arrays)
    pub element: usize,
}

/// Outcome of feeding one operator through the tracker
#[derive(Debug)]
pub enum TrackEvent {
    /// A text-showing operator; glyph geometry computed, text matrix
    /// advanced
    Text(Vec<Glyph>),
    /// A `cm`/`Tm` whose composition became singular. Reported once per
    /// offending operator by the caller.
    SingularTransform,
    /// Text shown with no font or an unsupported (composite) font
    UnsupportedText,
    /// An XObject invocation; the caller resolves and dispatches it
    XObject(Vec<u8>),
    /// No event of interest; state effects (if any) have been applied
    None,
}

#[derive(Debug, Clone)]
pub struct TextState {
    pub font: Option<Arc<FontInfo>>,
    pub size: f64,
    pub char_spacing: f64,
    pub word_spacing: f64,
    pub horizontal_scaling: f64,
    pub leading: f64,
    pub rise: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GraphicsState {
    pub ctm: Transform,
    pub text: TextState,
}

/// Explicit graphics-state stack pushed/popped in lock-step with `q`/`Q`
/// and nested-block boundaries. Iterative by design to avoid recursion
/// depth concerns on deeply nested documents.
#[derive(Debug)]
pub struct StateTracker {
    pub gs: GraphicsState,
    stack: Vec<GraphicsState>,
    /// Text matrix, valid between `BT` and `ET`
    pub tm: Transform,
    /// Text line matrix
    pub tlm: Transform,
}

impl StateTracker {
    pub fn new(base: Transform) -> Self {
        Self {
            gs: GraphicsState {
                ctm: base,
                text: TextState::default(),
            },
            stack: Vec::new(),
            tm: Transform::IDENTITY,
            tlm: Transform::IDENTITY,
        }
    }

    pub fn save(&mut self) {
        self.stack.push(self.gs.clone());
    }

    pub fn restore(&mut self) {
        if let Some(prev) = self.stack.pop() {
            self.gs = prev;
        }
        // Unbalanced Q: keep the current state rather than abort the page
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Pop back to a recorded depth (form XObject exit)
    pub fn restore_to_depth(&mut self, depth: usize) {
        while self.stack.len() > depth {
            self.restore();
        }
    }

    /// Concatenate a matrix into the CTM; true when the composition just
    /// became singular
    pub fn concat_matrix(&mut self, m: Transform) -> bool {
        let was_singular = self.gs.ctm.is_singular();
        self.gs.ctm = m.then(&self.gs.ctm);
        self.gs.ctm.is_singular() && !was_singular
    }

    fn next_line(&mut self, tx: f64, ty: f64) {
        self.tlm = Transform::translation(tx, ty).then(&self.tlm);
        self.tm = self.tlm;
    }

    /// Apply one operator's state effects and classify it
    pub fn handle_operator(
        &mut self,
        op: &Operation,
        doc: &Document,
        resources: &Dictionary,
        fonts: &mut FontCache,
    ) -> TrackEvent {
        let operands = &op.operands;
        match op.operator.as_str() {
            "q" => {
                self.save();
                TrackEvent::None
            }
            "Q" => {
                self.restore();
                TrackEvent::None
            }
            "cm" => match matrix_operands(operands) {
                Some(m) => {
                    if self.concat_matrix(m) {
                        TrackEvent::SingularTransform
                    } else {
                        TrackEvent::None
                    }
                }
                None => TrackEvent::None,
            },
            "BT" | "ET" => {
                self.tm = Transform::IDENTITY;
                self.tlm = Transform::IDENTITY;
                TrackEvent::None
            }
            "Tm" => match matrix_operands(operands) {
                Some(m) => {
                    self.tlm = m;
                    self.tm = m;
                    if m.is_singular() {
                        TrackEvent::SingularTransform
                    } else {
                        TrackEvent::None
                    }
                }
                None => TrackEvent::None,
            },
            "Td" => {
                if let (Some(tx), Some(ty)) = (num(operands, 0), num(operands, 1)) {
                    self.next_line(tx, ty);
                }
                TrackEvent::None
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (num(operands, 0), num(operands, 1)) {
                    self.gs.text.leading = -ty;
                    self.next_line(tx, ty);
                }
                TrackEvent::None
            }
            "T*" => {
                let leading = self.gs.text.leading;
                self.next_line(0.0, -leading);
                TrackEvent::None
            }
            "Tc" => {
                if let Some(v) = num(operands, 0) {
                    self.gs.text.char_spacing = v;
                }
                TrackEvent::None
            }
            "Tw" => {
                if let Some(v) = num(operands, 0) {
                    self.gs.text.word_spacing = v;
                }
                TrackEvent::None
            }
            "Tz" => {
                if let Some(v) = num(operands, 0) {
                    self.gs.text.horizontal_scaling = v / 100.0;
                }
                TrackEvent::None
            }
            "TL" => {
                if let Some(v) = num(operands, 0) {
                    self.gs.text.leading = v;
                }
                TrackEvent::None
            }
            "Ts" => {
                if let Some(v) = num(operands, 0) {
                    self.gs.text.rise = v;
                }
                TrackEvent::None
            }
            "Tf" => {
                if let (Some(Object::Name(name)), Some(size)) =
                    (operands.first(), num(operands, 1))
                {
                    self.gs.text.font = fonts.resolve_font(doc, resources, name);
                    self.gs.text.size = size;
                }
                TrackEvent::None
            }
            "Tj" => match operands.first() {
                Some(Object::String(bytes, _)) => self.show(&[(0, bytes.as_slice())]),
                _ => TrackEvent::None,
            },
            "TJ" => match operands.first() {
                Some(Object::Array(elements)) => {
                    let mut glyphs = Vec::new();
                    for (k, element) in elements.iter().enumerate() {
                        match element {
                            Object::String(bytes, _) => {
                                match self.show(&[(k, bytes.as_slice())]) {
                                    TrackEvent::Text(g) => glyphs.extend(g),
                                    other => return other,
                                }
                            }
                            _ => {
                                if let Some(adjustment) = operand_number(element) {
                                    self.adjust(adjustment);
                                }
                            }
                        }
                    }
                    TrackEvent::Text(glyphs)
                }
                _ => TrackEvent::None,
            },
            "'" => match operands.first() {
                Some(Object::String(bytes, _)) => {
                    let leading = self.gs.text.leading;
                    self.next_line(0.0, -leading);
                    self.show(&[(0, bytes.as_slice())])
                }
                _ => TrackEvent::None,
            },
            "\"" => {
                if let (Some(aw), Some(ac), Some(Object::String(bytes, _))) =
                    (num(operands, 0), num(operands, 1), operands.get(2))
                {
                    self.gs.text.word_spacing = aw;
                    self.gs.text.char_spacing = ac;
                    let leading = self.gs.text.leading;
                    self.next_line(0.0, -leading);
                    self.show(&[(2, bytes.as_slice())])
                } else {
                    TrackEvent::None
                }
            }
            "Do" => match operands.first() {
                Some(Object::Name(name)) => TrackEvent::XObject(name.clone()),
                _ => TrackEvent::None,
            },
            _ => TrackEvent::None,
        }
    }

    /// `TJ` numeric adjustment
    fn adjust(&mut self, amount: f64) {
        let ts = &self.gs.text;
        let tx = ts.horizontal_scaling * (-amount / 1000.0) * ts.size;
        self.tm = Transform::translation(tx, 0.0).then(&self.tm);
    }

    /// Render the given string elements, producing glyph geometry and
    /// advancing the text matrix
    fn show(&mut self, elements: &[(usize, &[u8])]) -> TrackEvent {
        let font = match &self.gs.text.font {
            Some(f) if f.supported => f.clone(),
            _ => return TrackEvent::UnsupportedText,
        };

        let mut glyphs = Vec::new();
        for &(element, bytes) in elements {
            for &code in bytes {
                glyphs.push(self.show_glyph(&font, code, element));
            }
        }
        TrackEvent::Text(glyphs)
    }

    fn show_glyph(&mut self, font: &FontInfo, code: u8, element: usize) -> Glyph {
        let ts = &self.gs.text;
        let fs = ts.size;
        let th = ts.horizontal_scaling;
        let width = font.width(code);
        let w0 = width / 1000.0;
        let mut spacing = ts.char_spacing;
        if code == b' ' {
            spacing += ts.word_spacing;
        }

        // Glyph space -> text space -> device space
        let tsm = Transform::new(fs * th, 0.0, 0.0, fs, 0.0, ts.rise);
        let trm = tsm.then(&self.tm).then(&self.gs.ctm);
        let quad = if trm.is_singular() {
            None
        } else {
            Some(Quad::new([
                trm.apply(Point::new(0.0, GLYPH_DESCENT)),
                trm.apply(Point::new(w0, GLYPH_DESCENT)),
                trm.apply(Point::new(w0, GLYPH_ASCENT)),
                trm.apply(Point::new(0.0, GLYPH_ASCENT)),
            ]))
        };

        let displacement = if fs.abs() > GEOMETRY_EPSILON {
            width + 1000.0 * spacing / fs
        } else {
            0.0
        };

        let tx = th * (w0 * fs + spacing);
        self.tm = Transform::translation(tx, 0.0).then(&self.tm);

        Glyph {
            code,
            ch: font.decode(code),
            quad,
            displacement,
            element,
        }
    }
}

fn num(operands: &[Object], index: usize) -> Option<f64> {
    operands.get(index).and_then(operand_number)
}

fn matrix_operands(operands: &[Object]) -> Option<Transform> {
    if operands.len() != 6 {
        return None;
    }
    let mut v = [0.0f64; 6];
    for (i, slot) in v.iter_mut().enumerate() {
        *slot = operand_number(&operands[i])?;
    }
    Some(Transform::new(v[0], v[1], v[2], v[3], v[4], v[5]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn test_page() -> (Document, Dictionary) {
        let mut doc = Document::with_version("1.5");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources = dictionary! {
            "Font" => dictionary! { "F1" => Object::Reference(font_id) },
        };
        (doc, resources)
    }

    fn feed(tracker: &mut StateTracker, doc: &Document, res: &Dictionary, ops: Vec<Operation>) -> Vec<TrackEvent> {
        let mut fonts = FontCache::new();
        ops.iter()
            .map(|op| tracker.handle_operator(op, doc, res, &mut fonts))
            .collect()
    }

    #[test]
    fn test_save_restore_roundtrips_ctm() {
        let (doc, res) = test_page();
        let mut tracker = StateTracker::new(Transform::IDENTITY);
        let ops = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![2, 0, 0, 2, 10, 10].into_iter().map(Object::Integer).collect(),
            ),
            Operation::new("Q", vec![]),
        ];
        feed(&mut tracker, &doc, &res, ops);
        assert_eq!(tracker.gs.ctm, Transform::IDENTITY);
        assert_eq!(tracker.depth(), 0);
    }

    #[test]
    fn test_singular_cm_is_flagged_once() {
        let (doc, res) = test_page();
        let mut tracker = StateTracker::new(Transform::IDENTITY);
        let zeros: Vec<Object> = (0..6).map(|_| Object::Integer(0)).collect();
        let events = feed(
            &mut tracker,
            &doc,
            &res,
            vec![
                Operation::new("cm", zeros.clone()),
                Operation::new("cm", zeros),
            ],
        );
        assert!(matches!(events[0], TrackEvent::SingularTransform));
        // Already singular: not flagged again for the same nesting level
        assert!(matches!(events[1], TrackEvent::None));
    }

    #[test]
    fn test_glyph_positions_advance_along_baseline() {
        let (doc, res) = test_page();
        let mut tracker = StateTracker::new(Transform::IDENTITY);
        let events = feed(
            &mut tracker,
            &doc,
            &res,
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
                Operation::new(
                    "Td",
                    vec![Object::Integer(100), Object::Integer(500)],
                ),
                Operation::new(
                    "Tj",
                    vec![Object::String(b"ab".to_vec(), lopdf::StringFormat::Literal)],
                ),
            ],
        );
        let glyphs = match events.last() {
            Some(TrackEvent::Text(g)) => g.clone(),
            other => panic!("expected text event, got {:?}", other),
        };
        assert_eq!(glyphs.len(), 2);
        let a = glyphs[0].quad.unwrap().bounding_rect();
        let b = glyphs[1].quad.unwrap().bounding_rect();
        assert!((a.llx - 100.0).abs() < 1e-9);
        // Helvetica fallback advance: 556/1000 * 10pt
        assert!((b.llx - 105.56).abs() < 1e-9);
        assert!((a.lly - (500.0 + GLYPH_DESCENT * 10.0)).abs() < 1e-9);
        assert!((a.ury - (500.0 + GLYPH_ASCENT * 10.0)).abs() < 1e-9);
    }

    #[test]
    fn test_text_without_font_is_unsupported() {
        let (doc, res) = test_page();
        let mut tracker = StateTracker::new(Transform::IDENTITY);
        let events = feed(
            &mut tracker,
            &doc,
            &res,
            vec![Operation::new(
                "Tj",
                vec![Object::String(b"x".to_vec(), lopdf::StringFormat::Literal)],
            )],
        );
        assert!(matches!(events[0], TrackEvent::UnsupportedText));
    }
}
