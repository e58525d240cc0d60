//! Document assembly with lopdf.

use crate::error::Result;
use crate::font::EmbeddedFont;
use crate::page::{PdfPage, PdfRenderer, FONT_BOLD, FONT_EMBEDDED, FONT_REGULAR, PAGE_HEIGHT, PAGE_WIDTH};
use lopdf::content::Content;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use seat_core::chart::ClassChart;
use seat_core::render::Rendered;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Collects class pages into one PDF document.
///
/// Object ids are allocated in page order and no timestamps are written, so
/// the same pages always serialize to the same bytes.
pub struct PdfWriter {
    doc: Document,
    pages_id: ObjectId,
    fonts: Dictionary,
    kids: Vec<Object>,
    font: Option<Arc<EmbeddedFont>>,
    /// Embedded-font glyphs shown on any page.
    glyphs: BTreeMap<u16, char>,
}

impl PdfWriter {
    /// Start an empty document with the two Helvetica fonts registered.
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });

        Self {
            doc,
            pages_id,
            fonts: dictionary! {
                FONT_REGULAR => regular_id,
                FONT_BOLD => bold_id,
            },
            kids: Vec::new(),
            font: None,
            glyphs: BTreeMap::new(),
        }
    }

    /// Embed `font` for pages that show its glyphs.
    ///
    /// The font is only written when some page used it.
    pub fn with_font(mut self, font: Arc<EmbeddedFont>) -> Self {
        self.font = Some(font);
        self
    }

    /// Append one class page.
    pub fn add_page(&mut self, page: PdfPage) -> Result<()> {
        self.glyphs.extend(page.glyphs);
        let content = Content {
            operations: page.operations,
        };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
        });
        self.kids.push(page_id.into());
        log::debug!("Added PDF page for class {}", page.class_id);
        Ok(())
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Serialize the document.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if let Some(font) = self.font.as_ref().filter(|_| !self.glyphs.is_empty()) {
            let font_id = font.embed(&mut self.doc, &self.glyphs);
            self.fonts.set(FONT_EMBEDDED, font_id);
            log::debug!("Embedded font {} with {} glyphs", font.name(), self.glyphs.len());
        }
        let resources_id = self.doc.add_object(dictionary! { "Font" => self.fonts });

        let count = self.kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(PAGE_WIDTH.into()),
                Object::Real(PAGE_HEIGHT.into()),
            ],
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Render every chart with `renderer` into one document.
///
/// Render fallbacks of all pages are returned alongside the bytes.
pub fn render_document<'a, I>(renderer: &PdfRenderer, charts: I) -> Result<Rendered<Vec<u8>>>
where
    I: IntoIterator<Item = &'a ClassChart>,
{
    let mut writer = match renderer.font() {
        Some(font) => PdfWriter::new().with_font(Arc::clone(font)),
        None => PdfWriter::new(),
    };
    let mut issues = Vec::new();
    for chart in charts {
        let rendered = chart.render(renderer);
        issues.extend(rendered.issues);
        writer.add_page(rendered.output)?;
    }
    Ok(Rendered {
        output: writer.finish()?,
        issues,
    })
}
