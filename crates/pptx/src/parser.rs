//! PPTX photo roster parser implementation.

use seat_core::extract::{pair_with_pictures, roster_entries};
use seat_core::{parse_class_label, ClassId, Error, PhotoRosterEntry, Result, Sheet};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::ZipArchive;

/// Parser for PPTX photo roster decks.
pub struct PptxParser;

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a PPTX file from a reader.
    ///
    /// Every slide yields its table cells as one [`Sheet`] and its pictures
    /// in document order.
    pub fn parse<R: Read + Seek>(&self, reader: R, filename: &str) -> Result<PhotoRoster> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::load(filename, format!("Failed to open ZIP: {}", e)))?;

        let mut roster = PhotoRoster::new(filename);

        let slide_order = self.get_slide_order(&mut archive, filename)?;
        for (idx, slide_path) in slide_order.iter().enumerate() {
            let slide = self.parse_slide(&mut archive, filename, slide_path, idx + 1)?;
            roster.slides.push(slide);
        }

        log::debug!(
            "{}: {} slides, {} pictures",
            filename,
            roster.slides.len(),
            roster.picture_count()
        );
        Ok(roster)
    }

    /// Get the ordered list of slide paths from the presentation relationships.
    fn get_slide_order<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        filename: &str,
    ) -> Result<Vec<String>> {
        let rels_content =
            read_text_from_archive(archive, filename, "ppt/_rels/presentation.xml.rels")?;

        let mut slides: Vec<(String, Option<usize>)> = parse_relationships(&rels_content)
            .map_err(|reason| Error::load(filename, reason))?
            .into_iter()
            .filter(|rel| is_slide_relationship(&rel.rel_type))
            .map(|rel| {
                let order_num =
                    extract_slide_number(&rel.target).or_else(|| extract_slide_number(&rel.id));
                (resolve_target("ppt", &rel.target), order_num)
            })
            .collect();

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    /// Parse a single slide from the archive.
    fn parse_slide<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        filename: &str,
        slide_path: &str,
        slide_number: usize,
    ) -> Result<RosterSlide> {
        let content = read_text_from_archive(archive, filename, slide_path)?;
        let scan = scan_slide_xml(&content);

        let mut table = Sheet::new(format!("slide{}", slide_number));
        for row in scan.table_rows {
            table.push_row(row.into_iter().map(Some));
        }

        let mut slide = RosterSlide {
            number: slide_number,
            table,
            pictures: Vec::new(),
        };
        if scan.embeds.is_empty() {
            return Ok(slide);
        }

        let rels_path = slide_rels_path(slide_path);
        let targets: HashMap<String, String> =
            match read_text_from_archive(archive, filename, &rels_path) {
                Ok(rels) => parse_relationships(&rels)
                    .map_err(|reason| Error::load(filename, reason))?
                    .into_iter()
                    .filter(|rel| !rel.external)
                    .map(|rel| (rel.id, rel.target))
                    .collect(),
                Err(e) => {
                    log::warn!("Slide {} has pictures but no relationships: {}", slide_number, e);
                    HashMap::new()
                }
            };

        let slide_dir = slide_path.rsplit_once('/').map_or("", |(dir, _)| dir);
        for embed in scan.embeds {
            let Some(target) = targets.get(&embed) else {
                log::warn!("Slide {}: unresolved picture reference {}", slide_number, embed);
                continue;
            };
            let media_path = resolve_target(slide_dir, target);
            match read_bytes_from_archive(archive, filename, &media_path) {
                Ok(bytes) => slide.pictures.push(SlidePicture::new(media_path, bytes)),
                Err(e) => log::warn!("Slide {}: {}", slide_number, e),
            }
        }

        Ok(slide)
    }
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

/// A picture embedded on a slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlidePicture {
    /// Path of the media part inside the archive.
    pub media_path: String,
    /// Lowercase file extension of the media part.
    pub extension: String,
    pub bytes: Vec<u8>,
}

impl SlidePicture {
    fn new(media_path: String, bytes: Vec<u8>) -> Self {
        let extension = media_path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_else(|| "bin".to_string());
        Self {
            media_path,
            extension,
            bytes,
        }
    }
}

/// Table cells and pictures of one slide.
#[derive(Debug, Clone)]
pub struct RosterSlide {
    /// 1-based slide number.
    pub number: usize,
    /// Every table row on the slide, in document order.
    pub table: Sheet,
    /// Pictures in document order.
    pub pictures: Vec<SlidePicture>,
}

/// A parsed photo roster deck.
#[derive(Debug, Clone)]
pub struct PhotoRoster {
    pub source_name: String,
    pub slides: Vec<RosterSlide>,
}

/// Roster entries paired with their pictures.
#[derive(Debug, Default)]
pub struct RosterPhotos {
    pub photos: Vec<(PhotoRosterEntry, SlidePicture)>,
    /// Pictures with no roster entry left on their slide.
    pub surplus: Vec<SlidePicture>,
    /// Roster entries with no picture left on their slide.
    pub unpictured: Vec<PhotoRosterEntry>,
}

impl PhotoRoster {
    fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            slides: Vec::new(),
        }
    }

    /// Class named by the file (`picture_5.pptx`), if any.
    pub fn class_hint(&self) -> Option<ClassId> {
        let file = self
            .source_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.source_name);
        parse_class_label(file)
    }

    pub fn picture_count(&self) -> usize {
        self.slides.iter().map(|s| s.pictures.len()).sum()
    }

    /// Pair each slide's roster entries with that slide's pictures in order.
    pub fn assign(self) -> RosterPhotos {
        let hint = self.class_hint();
        let mut out = RosterPhotos::default();

        for slide in self.slides {
            let entries = roster_entries(&slide.table);
            if let Some(hint) = hint {
                for entry in entries.iter().filter(|e| e.class_id != hint) {
                    log::warn!(
                        "{}: {} is listed as class {} in a class {} roster",
                        self.source_name,
                        entry.student_id,
                        entry.class_id,
                        hint
                    );
                }
            }

            let entry_count = entries.len();
            let picture_count = slide.pictures.len();
            let (pairs, surplus) = pair_with_pictures(entries.clone(), slide.pictures);
            if !surplus.is_empty() {
                log::warn!(
                    "{}: slide {} has {} pictures for {} students",
                    self.source_name,
                    slide.number,
                    picture_count,
                    entry_count
                );
            }
            out.unpictured
                .extend(entries.into_iter().skip(pairs.len()));
            out.photos.extend(pairs);
            out.surplus.extend(surplus);
        }

        out
    }
}

/// One `<Relationship>` element.
#[derive(Debug, Clone, Default)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
    external: bool,
}

fn is_slide_relationship(rel_type: &str) -> bool {
    rel_type.ends_with("/slide")
}

/// Parse a `.rels` part.
fn parse_relationships(xml: &str) -> std::result::Result<Vec<Relationship>, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut rels = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut rel = Relationship::default();
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"Id" => rel.id = value,
                        b"Type" => rel.rel_type = value,
                        b"Target" => rel.target = value,
                        b"TargetMode" => rel.external = value == "External",
                        _ => {}
                    }
                }
                rels.push(rel);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("Error parsing relationships: {}", e)),
            _ => {}
        }
    }

    Ok(rels)
}

/// Table cell text and picture references found in a slide.
#[derive(Debug, Default)]
struct SlideScan {
    table_rows: Vec<Vec<String>>,
    /// Relationship ids of `p:pic` blips, in document order.
    embeds: Vec<String>,
}

/// Collect table rows and picture blips from slide XML.
fn scan_slide_xml(xml_content: &str) -> SlideScan {
    let mut scan = SlideScan::default();
    // Untrimmed: run boundaries may carry the only space between words.
    let mut reader = Reader::from_str(xml_content);

    let mut pic_depth = 0usize;
    let mut current_row: Option<Vec<String>> = None;
    let mut current_cell: Option<String> = None;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"pic" => pic_depth += 1,
                b"tr" => current_row = Some(Vec::new()),
                b"tc" => current_cell = Some(String::new()),
                b"p" => {
                    if let Some(cell) = current_cell.as_mut().filter(|c| !c.is_empty()) {
                        cell.push(' ');
                    }
                }
                b"t" => in_text = true,
                b"blip" if pic_depth > 0 => push_embed(&mut scan, e),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"blip" if pic_depth > 0 => push_embed(&mut scan, e),
                b"tc" => {
                    if let Some(row) = current_row.as_mut() {
                        row.push(String::new());
                    }
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if let (true, Some(cell)) = (in_text, current_cell.as_mut()) {
                    cell.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"pic" => pic_depth = pic_depth.saturating_sub(1),
                b"t" => in_text = false,
                b"tc" => {
                    if let (Some(cell), Some(row)) = (current_cell.take(), current_row.as_mut()) {
                        row.push(cell.trim().to_string());
                    }
                }
                b"tr" => {
                    if let Some(row) = current_row.take() {
                        scan.table_rows.push(row);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("XML parsing error (continuing): {}", e);
            }
            _ => {}
        }
    }

    scan
}

fn push_embed(scan: &mut SlideScan, e: &BytesStart) {
    if let Some(attr) = e
        .attributes()
        .flatten()
        .find(|a| local_name(a.key.as_ref()) == b"embed")
    {
        scan.embeds
            .push(String::from_utf8_lossy(&attr.value).to_string());
    }
}

/// Read a text part from the ZIP archive.
fn read_text_from_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    filename: &str,
    path: &str,
) -> Result<String> {
    let bytes = read_bytes_from_archive(archive, filename, path)?;
    String::from_utf8(bytes)
        .map_err(|e| Error::load(filename, format!("'{}' is not UTF-8: {}", path, e)))
}

/// Read a binary part from the ZIP archive.
fn read_bytes_from_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    filename: &str,
    path: &str,
) -> Result<Vec<u8>> {
    let mut file = archive.by_name(path).map_err(|e| {
        Error::load(filename, format!("File not found in archive '{}': {}", path, e))
    })?;

    let mut content = Vec::new();
    file.read_to_end(&mut content)
        .map_err(|e| Error::load(filename, format!("Failed to read '{}': {}", path, e)))?;

    Ok(content)
}

/// `ppt/slides/slide3.xml` -> `ppt/slides/_rels/slide3.xml.rels`.
fn slide_rels_path(slide_path: &str) -> String {
    match slide_path.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", slide_path),
    }
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::ZipWriter;

    const PRESENTATION_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide2.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide1.xml"/>
</Relationships>"#;

    const SLIDE1: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <p:cSld><p:spTree>
    <p:sp><p:spPr><a:blipFill><a:blip r:embed="rId9"/></a:blipFill></p:spPr></p:sp>
    <p:graphicFrame><a:graphic><a:graphicData><a:tbl>
      <a:tr>
        <a:tc><a:txBody><a:p><a:r><a:t>3학년 5반 1번 </a:t></a:r><a:r><a:t>권민지</a:t></a:r></a:p></a:txBody></a:tc>
        <a:tc><a:txBody><a:p><a:r><a:t>3학년 5반 2번</a:t></a:r></a:p><a:p><a:r><a:t>김하늘</a:t></a:r></a:p></a:txBody></a:tc>
        <a:tc/>
      </a:tr>
    </a:tbl></a:graphicData></a:graphic></p:graphicFrame>
    <p:pic><p:blipFill><a:blip r:embed="rId2"/></p:blipFill></p:pic>
    <p:pic><p:blipFill><a:blip r:embed="rId3"/></p:blipFill></p:pic>
    <p:pic><p:blipFill><a:blip r:embed="rId4"/></p:blipFill></p:pic>
  </p:spTree></p:cSld>
</p:sld>"#;

    const SLIDE1_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.jpeg"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image2.PNG"/>
  <Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image3.jpeg"/>
  <Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/fill.png"/>
</Relationships>"#;

    const SLIDE2: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
  <p:cSld><p:spTree>
    <p:graphicFrame><a:graphic><a:graphicData><a:tbl>
      <a:tr><a:tc><a:txBody><a:p><a:r><a:t>3학년 5반 3번 이준</a:t></a:r></a:p></a:txBody></a:tc></a:tr>
    </a:tbl></a:graphicData></a:graphic></p:graphicFrame>
  </p:spTree></p:cSld>
</p:sld>"#;

    fn build_deck() -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        let parts: [(&str, &[u8]); 8] = [
            ("ppt/_rels/presentation.xml.rels", PRESENTATION_RELS.as_bytes()),
            ("ppt/slides/slide1.xml", SLIDE1.as_bytes()),
            ("ppt/slides/_rels/slide1.xml.rels", SLIDE1_RELS.as_bytes()),
            ("ppt/slides/slide2.xml", SLIDE2.as_bytes()),
            ("ppt/media/image1.jpeg", b"first"),
            ("ppt/media/image2.PNG", b"second"),
            ("ppt/media/image3.jpeg", b"third"),
            ("ppt/media/fill.png", b"fill"),
        ];
        for (path, bytes) in parts {
            zip.start_file(path, options).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_parse_roster_deck() {
        let roster = PptxParser::new()
            .parse(Cursor::new(build_deck()), "picture_5.pptx")
            .unwrap();

        assert_eq!(roster.slides.len(), 2);
        assert_eq!(roster.class_hint(), Some(5));

        let first = &roster.slides[0];
        assert_eq!(first.table.cell(0, 0), Some("3학년 5반 1번 권민지"));
        assert_eq!(first.table.cell(0, 1), Some("3학년 5반 2번 김하늘"));
        assert_eq!(first.table.cell(0, 2), None);

        let media: Vec<&str> = first.pictures.iter().map(|p| p.media_path.as_str()).collect();
        assert_eq!(
            media,
            vec!["ppt/media/image1.jpeg", "ppt/media/image2.PNG", "ppt/media/image3.jpeg"]
        );
        assert_eq!(first.pictures[1].extension, "png");
    }

    #[test]
    fn test_assign_pairs_per_slide() {
        let roster = PptxParser::new()
            .parse(Cursor::new(build_deck()), "picture_5.pptx")
            .unwrap();
        let assigned = roster.assign();

        assert_eq!(assigned.photos.len(), 2);
        assert_eq!(assigned.photos[0].0.student_id.as_str(), "30501");
        assert_eq!(assigned.photos[0].0.name, "권민지");
        assert_eq!(assigned.photos[0].1.bytes, b"first");
        assert_eq!(
            assigned.photos[1].0.photo_file_name(&assigned.photos[1].1.extension),
            "30502_김하늘.png"
        );
        assert_eq!(assigned.surplus.len(), 1);
        assert_eq!(assigned.unpictured.len(), 1);
        assert_eq!(assigned.unpictured[0].student_id.as_str(), "30503");
    }

    #[test]
    fn test_not_a_zip_is_load_error() {
        let err = PptxParser::new()
            .parse(Cursor::new(b"plain text".to_vec()), "roster.pptx")
            .unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("ppt/slides", "../media/a.png"), "ppt/media/a.png");
        assert_eq!(resolve_target("ppt", "slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(resolve_target("ppt/slides", "/ppt/media/b.png"), "ppt/media/b.png");
        assert_eq!(slide_rels_path("ppt/slides/slide3.xml"), "ppt/slides/_rels/slide3.xml.rels");
    }

    #[test]
    fn test_extract_slide_number() {
        assert_eq!(extract_slide_number("rId12"), Some(12));
        assert_eq!(extract_slide_number("slides/slide123.xml"), Some(123));
        assert_eq!(extract_slide_number("nodigits"), None);
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:pic"), b"pic");
        assert_eq!(local_name(b"r:embed"), b"embed");
        assert_eq!(local_name(b"tbl"), b"tbl");
    }
}
