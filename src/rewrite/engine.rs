//! Commit-mode and highlight-mode stream surgery
//!
//! The engine re-walks a page's operators with the same state tracker
//! the extraction adapter uses, removes matched glyphs, drops or clips
//! drawing operators under the cleanup regions, and repaints the regions
//! in a closing pass. Untouched operators pass through unchanged.

use lopdf::{
    content::{Content, Operation},
    Dictionary, Document, Object, ObjectId, StringFormat,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{SweepConfig, AREA_EPSILON, GEOMETRY_EPSILON};
use crate::content::state::Glyph;
use crate::content::{
    media_box, operand_number, page_resources, resolve, FontCache, StateTracker, TrackEvent,
};
use crate::error::Result;
use crate::geometry::{intersection_area, Point, Rect, Transform};
use crate::rewrite::painter;
use crate::strategy::CleanupLocation;
use crate::warnings::{WarningKind, WarningLog};

/// Counters for one page's commit pass
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RewriteStats {
    pub glyphs_removed: usize,
    pub operators_dropped: usize,
    pub operators_clipped: usize,
    pub regions_painted: usize,
}

impl RewriteStats {
    pub fn merge(&mut self, other: &RewriteStats) {
        self.glyphs_removed += other.glyphs_removed;
        self.operators_dropped += other.operators_dropped;
        self.operators_clipped += other.operators_clipped;
        self.regions_painted += other.regions_painted;
    }
}

/// Buffered path-construction operators awaiting their paint operator
#[derive(Default)]
struct PathBuffer {
    ops: Vec<Operation>,
    /// Device-space points of every coordinate the path touches
    points: Vec<Point>,
    sets_clip: bool,
}

impl PathBuffer {
    fn push(&mut self, op: &Operation, ctm: &Transform) {
        let coords: Vec<f64> = op.operands.iter().filter_map(operand_number).collect();
        match op.operator.as_str() {
            "re" => {
                if let [x, y, w, h] = coords[..] {
                    for p in Rect::new(x, y, x + w, y + h).corners() {
                        self.points.push(ctm.apply(p));
                    }
                }
            }
            _ => {
                // m/l/c/v/y operand lists are (x y) pairs; control
                // points widen the bound conservatively
                for pair in coords.chunks_exact(2) {
                    self.points.push(ctm.apply(Point::new(pair[0], pair[1])));
                }
            }
        }
        self.ops.push(op.clone());
    }

    fn bounds(&self) -> Option<Rect> {
        let first = self.points.first()?;
        let mut r = Rect::new(first.x, first.y, first.x, first.y);
        for p in &self.points[1..] {
            r = r.union(&Rect::new(p.x, p.y, p.x, p.y));
        }
        Some(r)
    }

    fn take(&mut self) -> PathBuffer {
        std::mem::take(self)
    }
}

/// Incremental `TJ` array builder: kept glyph bytes become string runs,
/// removed glyphs and original adjustments fold into pending
/// displacement numbers so every surviving glyph keeps its exact
/// position.
#[derive(Default)]
struct TjBuilder {
    array: Vec<Object>,
    run: Vec<u8>,
    pending: f64,
}

impl TjBuilder {
    fn keep(&mut self, code: u8) {
        if self.pending.abs() > GEOMETRY_EPSILON {
            self.flush_run();
            self.array.push(Object::Real(self.pending));
            self.pending = 0.0;
        }
        self.run.push(code);
    }

    /// Replace a removed glyph's advance (per-mille units, spacing
    /// included) with a negative adjustment
    fn remove(&mut self, displacement: f64) {
        self.pending -= displacement;
    }

    /// Carry an adjustment number from the source array
    fn adjust(&mut self, amount: f64) {
        self.pending += amount;
    }

    fn flush_run(&mut self) {
        if !self.run.is_empty() {
            self.array
                .push(Object::String(std::mem::take(&mut self.run), StringFormat::Literal));
        }
    }

    /// Trailing adjustments are kept: the text matrix must advance as if
    /// the removed glyphs were still shown
    fn finish(mut self) -> Vec<Object> {
        self.flush_run();
        if self.pending.abs() > GEOMETRY_EPSILON {
            self.array.push(Object::Real(self.pending));
        }
        self.array
    }
}

/// Rewrites page content streams against a set of cleanup locations
pub struct RewriteEngine<'a> {
    config: &'a SweepConfig,
}

impl<'a> RewriteEngine<'a> {
    pub fn new(config: &'a SweepConfig) -> Self {
        Self { config }
    }

    /// Commit mode: remove matched glyphs, drop or clip covered drawing
    /// operators, then paint each region opaquely.
    pub fn redact_page(
        &self,
        doc: &mut Document,
        number: u32,
        id: ObjectId,
        locations: &[CleanupLocation],
        warnings: &mut WarningLog,
    ) -> Result<RewriteStats> {
        let page_locations: Vec<&CleanupLocation> =
            locations.iter().filter(|l| l.page == number).collect();
        if page_locations.is_empty() {
            return Ok(RewriteStats::default());
        }
        let regions: Vec<Rect> = page_locations
            .iter()
            .map(|l| l.region.bounding_rect())
            .collect();

        let data = doc.get_page_content(id)?;
        let content = Content::decode(&data)?;
        let resources = page_resources(doc, id).cloned().unwrap_or_default();
        let media = media_box(doc, id);

        let mut tracker = StateTracker::new(Transform::IDENTITY);
        let mut fonts = FontCache::new();
        let mut path = PathBuffer::default();
        let mut stats = RewriteStats::default();
        let mut out: Vec<Operation> = Vec::with_capacity(content.operations.len());

        for (idx, op) in content.operations.iter().enumerate() {
            let op_path = idx.to_string();
            match op.operator.as_str() {
                "m" | "l" | "c" | "v" | "y" | "re" | "h" => {
                    path.push(op, &tracker.gs.ctm);
                    continue;
                }
                "W" | "W*" => {
                    path.sets_clip = true;
                    path.ops.push(op.clone());
                    continue;
                }
                "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" | "n" => {
                    self.flush_paint(
                        path.take(),
                        op,
                        &regions,
                        &tracker,
                        &media,
                        number,
                        &op_path,
                        warnings,
                        &mut out,
                        &mut stats,
                    );
                    continue;
                }
                _ => {}
            }

            match tracker.handle_operator(op, doc, &resources, &mut fonts) {
                TrackEvent::Text(glyphs) => {
                    self.rewrite_text(op, &glyphs, &regions, &mut out, &mut stats);
                }
                TrackEvent::SingularTransform => {
                    warnings.report(WarningKind::SingularTransform, number, &op_path);
                    out.push(op.clone());
                }
                TrackEvent::UnsupportedText => {
                    warnings.report(WarningKind::UnsupportedContent, number, &op_path);
                    out.push(op.clone());
                }
                TrackEvent::XObject(name) => {
                    self.flush_xobject(
                        doc,
                        &resources,
                        &name,
                        op,
                        &regions,
                        &tracker,
                        &media,
                        number,
                        &op_path,
                        warnings,
                        &mut out,
                        &mut stats,
                    );
                }
                TrackEvent::None => out.push(op.clone()),
            }
        }
        // Dangling construction operators without a paint operator
        out.append(&mut path.ops);

        for location in &page_locations {
            out.extend(painter::fill_ops(location, &self.config.default_fill));
            stats.regions_painted += 1;
        }

        info!(
            page = number,
            glyphs_removed = stats.glyphs_removed,
            operators_dropped = stats.operators_dropped,
            operators_clipped = stats.operators_clipped,
            regions = stats.regions_painted,
            "page redacted"
        );
        let encoded = Content { operations: out }.encode()?;
        doc.change_page_content(id, encoded)?;
        Ok(stats)
    }

    /// Highlight mode: nothing removed; a translucent overlay is drawn
    /// over each region.
    pub fn highlight_page(
        &self,
        doc: &mut Document,
        number: u32,
        id: ObjectId,
        locations: &[CleanupLocation],
    ) -> Result<()> {
        let page_locations: Vec<&CleanupLocation> =
            locations.iter().filter(|l| l.page == number).collect();
        if page_locations.is_empty() {
            return Ok(());
        }
        let gs_name = painter::ensure_overlay_gstate(doc, id, self.config.overlay_alpha)?;
        let data = doc.get_page_content(id)?;
        let mut content = Content::decode(&data)?;
        for location in &page_locations {
            content
                .operations
                .extend(painter::overlay_ops(location, &self.config.default_fill, &gs_name));
        }
        doc.change_page_content(id, content.encode()?)?;
        Ok(())
    }

    /// Consult each glyph of a text-showing operator against the
    /// regions; untouched operators pass through as-is.
    fn rewrite_text(
        &self,
        op: &Operation,
        glyphs: &[Glyph],
        regions: &[Rect],
        out: &mut Vec<Operation>,
        stats: &mut RewriteStats,
    ) {
        let removed: Vec<bool> = glyphs
            .iter()
            .map(|g| match &g.quad {
                Some(quad) => regions
                    .iter()
                    .any(|r| intersection_area(&quad.points, r) > AREA_EPSILON),
                None => false,
            })
            .collect();
        if !removed.iter().any(|&r| r) {
            out.push(op.clone());
            return;
        }

        let mut builder = TjBuilder::default();
        let mut glyph_iter = glyphs.iter().zip(removed.iter()).peekable();
        let mut consume_element = |builder: &mut TjBuilder, element: usize, stats: &mut RewriteStats| {
            while let Some((glyph, _)) = glyph_iter.peek() {
                if glyph.element != element {
                    break;
                }
                let (glyph, &removed) = glyph_iter.next().unwrap();
                if removed {
                    builder.remove(glyph.displacement);
                    stats.glyphs_removed += 1;
                } else {
                    builder.keep(glyph.code);
                }
            }
        };

        match op.operator.as_str() {
            "TJ" => {
                if let Some(Object::Array(elements)) = op.operands.first() {
                    for (k, element) in elements.iter().enumerate() {
                        match element {
                            Object::String(..) => consume_element(&mut builder, k, stats),
                            _ => {
                                if let Some(n) = operand_number(element) {
                                    builder.adjust(n);
                                }
                            }
                        }
                    }
                }
            }
            "Tj" | "'" => consume_element(&mut builder, 0, stats),
            "\"" => consume_element(&mut builder, 2, stats),
            _ => {
                out.push(op.clone());
                return;
            }
        }

        // Line-advance and spacing side effects survive as explicit
        // operators when the show operator itself is rebuilt
        match op.operator.as_str() {
            "'" => out.push(Operation::new("T*", vec![])),
            "\"" => {
                out.push(Operation::new("Tw", vec![op.operands[0].clone()]));
                out.push(Operation::new("Tc", vec![op.operands[1].clone()]));
                out.push(Operation::new("T*", vec![]));
            }
            _ => {}
        }
        let array = builder.finish();
        if !array.is_empty() {
            out.push(Operation::new("TJ", vec![Object::Array(array)]));
        }
    }

    /// Decide the fate of a buffered path at its paint operator
    #[allow(clippy::too_many_arguments)]
    fn flush_paint(
        &self,
        path: PathBuffer,
        paint: &Operation,
        regions: &[Rect],
        tracker: &StateTracker,
        media: &Rect,
        page: u32,
        op_path: &str,
        warnings: &mut WarningLog,
        out: &mut Vec<Operation>,
        stats: &mut RewriteStats,
    ) {
        let mut path = path;
        // Clipping paths and no-op paints define visibility, not drawn
        // content; they pass through untouched
        if path.sets_clip || paint.operator == "n" {
            out.append(&mut path.ops);
            out.push(paint.clone());
            return;
        }
        let Some(bounds) = path.bounds() else {
            out.append(&mut path.ops);
            out.push(paint.clone());
            return;
        };
        match self.cover_state(&bounds, regions) {
            Coverage::Full => {
                debug!(page, operator = op_path, "dropped covered path paint");
                stats.operators_dropped += 1;
            }
            Coverage::Partial(hit) => match complement_clip(&tracker.gs.ctm, media, regions, &hit) {
                Some(clip_ops) => {
                    out.push(Operation::new("q", vec![]));
                    out.extend(clip_ops);
                    out.append(&mut path.ops);
                    out.push(paint.clone());
                    out.push(Operation::new("Q", vec![]));
                    stats.operators_clipped += 1;
                }
                None => {
                    warnings.report(WarningKind::SingularTransform, page, op_path);
                    out.append(&mut path.ops);
                    out.push(paint.clone());
                }
            },
            Coverage::None => {
                out.append(&mut path.ops);
                out.push(paint.clone());
            }
        }
    }

    /// Decide the fate of an XObject invocation from its displayed area
    #[allow(clippy::too_many_arguments)]
    fn flush_xobject(
        &self,
        doc: &Document,
        resources: &Dictionary,
        name: &[u8],
        op: &Operation,
        regions: &[Rect],
        tracker: &StateTracker,
        media: &Rect,
        page: u32,
        op_path: &str,
        warnings: &mut WarningLog,
        out: &mut Vec<Operation>,
        stats: &mut RewriteStats,
    ) {
        let Some(bounds) = xobject_bounds(doc, resources, name, &tracker.gs.ctm) else {
            out.push(op.clone());
            return;
        };
        match self.cover_state(&bounds, regions) {
            Coverage::Full => {
                debug!(page, operator = op_path, "dropped covered XObject");
                stats.operators_dropped += 1;
            }
            Coverage::Partial(hit) => match complement_clip(&tracker.gs.ctm, media, regions, &hit) {
                Some(clip_ops) => {
                    out.push(Operation::new("q", vec![]));
                    out.extend(clip_ops);
                    out.push(op.clone());
                    out.push(Operation::new("Q", vec![]));
                    stats.operators_clipped += 1;
                }
                None => {
                    warnings.report(WarningKind::SingularTransform, page, op_path);
                    out.push(op.clone());
                }
            },
            Coverage::None => out.push(op.clone()),
        }
    }

    fn cover_state(&self, bounds: &Rect, regions: &[Rect]) -> Coverage {
        if regions.iter().any(|r| r.contains_rect(bounds)) {
            return Coverage::Full;
        }
        let hit: Vec<usize> = regions
            .iter()
            .enumerate()
            .filter(|(_, r)| match r.intersection(bounds) {
                Some(overlap) => overlap.area() > AREA_EPSILON,
                None => false,
            })
            .map(|(i, _)| i)
            .collect();
        if hit.is_empty() {
            Coverage::None
        } else {
            Coverage::Partial(hit)
        }
    }
}

enum Coverage {
    Full,
    Partial(Vec<usize>),
    None,
}

/// Even-odd clip excluding the given regions: an outer boundary subpath
/// plus one subpath per region, all mapped from device space into the
/// current user space. `None` when the CTM cannot be inverted.
fn complement_clip(
    ctm: &Transform,
    media: &Rect,
    regions: &[Rect],
    hit: &[usize],
) -> Option<Vec<Operation>> {
    let inverse = ctm.invert().ok()?;
    let mut ops = Vec::new();
    let outer: Vec<Point> = media.corners().iter().map(|p| inverse.apply(*p)).collect();
    ops.extend(painter::polygon_path_ops(&outer));
    for &i in hit {
        let region: Vec<Point> = regions[i]
            .corners()
            .iter()
            .map(|p| inverse.apply(*p))
            .collect();
        ops.extend(painter::polygon_path_ops(&region));
    }
    ops.push(Operation::new("W*", vec![]));
    ops.push(Operation::new("n", vec![]));
    Some(ops)
}

/// Device-space bounds of an XObject's displayed area: the unit square
/// for images, `/BBox` through `/Matrix` for forms.
fn xobject_bounds(
    doc: &Document,
    resources: &Dictionary,
    name: &[u8],
    ctm: &Transform,
) -> Option<Rect> {
    let xobjects = resolve(doc, resources.get(b"XObject").ok()?).as_dict().ok()?;
    let stream = match resolve(doc, xobjects.get(name).ok()?) {
        Object::Stream(s) => s,
        _ => return None,
    };
    let corners: [Point; 4] = match stream.dict.get(b"Subtype").ok()?.as_name().ok()? {
        b"Image" => Rect::new(0.0, 0.0, 1.0, 1.0).corners(),
        b"Form" => {
            let bbox = stream.dict.get(b"BBox").ok()?.as_array().ok()?;
            if bbox.len() != 4 {
                return None;
            }
            let v: Vec<f64> = bbox.iter().filter_map(operand_number).collect();
            if v.len() != 4 {
                return None;
            }
            let rect = Rect::new(v[0], v[1], v[2], v[3]);
            let matrix = stream.dict.get(b"Matrix").ok().and_then(|m| {
                let arr = m.as_array().ok()?;
                if arr.len() != 6 {
                    return None;
                }
                let mut c = [0.0f64; 6];
                for (i, slot) in c.iter_mut().enumerate() {
                    *slot = operand_number(&arr[i])?;
                }
                Some(Transform::new(c[0], c[1], c[2], c[3], c[4], c[5]))
            });
            match matrix {
                Some(m) => rect.corners().map(|p| m.apply(p)),
                None => rect.corners(),
            }
        }
        _ => return None,
    };
    let device = corners.map(|p| ctm.apply(p));
    let mut r = Rect::new(device[0].x, device[0].y, device[0].x, device[0].y);
    for p in &device[1..] {
        r = r.union(&Rect::new(p.x, p.y, p.x, p.y));
    }
    Some(r)
}
