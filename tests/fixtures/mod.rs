//! In-memory PDF builders and extraction helpers for integration tests

use lopdf::{dictionary, Document, Object, Stream};

use pdfsweep::content::{GlyphStream, PageContext};
use pdfsweep::geometry::Quad;
use pdfsweep::warnings::WarningLog;

/// One page, Helvetica as `/F1`, with the given content stream
pub fn single_page_doc(content: &str) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => Object::Reference(font_id) },
    });
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

/// Two lines of body text with one `Dolor` and one `dolor` occurrence
pub fn lorem_doc() -> Document {
    single_page_doc(
        "BT /F1 12 Tf 72 700 Td (Lorem ipsum Dolor sit amet) Tj \
         0 -14 Td (consectetur dolor adipiscing elit) Tj ET",
    )
}

/// Two degenerate `cm` operators in separate save/restore blocks, plus
/// one line of normal text
pub fn noninvertible_doc() -> Document {
    single_page_doc(
        "q 0 0 0 0 0 0 cm BT /F1 12 Tf (lost) Tj ET Q \
         q 0 0 0 0 0 0 cm 10 10 50 50 re f Q \
         BT /F1 12 Tf 72 700 Td (Hello World!) Tj ET",
    )
}

pub fn first_page(doc: &Document) -> PageContext<'_> {
    let pages = doc.get_pages();
    let (&number, &id) = pages.iter().next().unwrap();
    PageContext { doc, number, id }
}

/// The page's logical text in painting order
pub fn extract_text(doc: &Document) -> String {
    glyph_boxes(doc).into_iter().map(|(ch, _)| ch).collect()
}

/// Characters with their device-space quads
pub fn glyph_boxes(doc: &Document) -> Vec<(char, Option<Quad>)> {
    let ctx = first_page(doc);
    let mut warnings = WarningLog::new();
    GlyphStream::new(&ctx, &mut warnings)
        .unwrap()
        .flat_map(|run| run.glyphs.into_iter().map(|g| (g.ch, g.quad)))
        .collect()
}
