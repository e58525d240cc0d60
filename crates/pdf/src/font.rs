//! TrueType font embedding for names the base-14 fonts cannot show.
//!
//! The whole font file is embedded as a `CIDFontType2` under a `Type0` font
//! with `Identity-H` encoding, so shown strings are big-endian glyph ids. A
//! `ToUnicode` map built from the glyphs actually used keeps text
//! extractable.

use crate::error::{Error, Result};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use ttf_parser::Face;

/// Glyph id and advance width, in font units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub id: u16,
    pub advance: u16,
}

/// A parsed TrueType font ready for embedding.
#[derive(Clone)]
pub struct EmbeddedFont {
    name: String,
    data: Vec<u8>,
    units_per_em: u16,
    ascent: i16,
    descent: i16,
    cap_height: i16,
    bbox: [i16; 4],
    glyphs: BTreeMap<char, Glyph>,
}

impl EmbeddedFont {
    /// Load a `.ttf` file; the file stem becomes the PDF font name.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| Error::font(path.display(), e))?;
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        Self::from_bytes(stem, data)
    }

    /// Parse font bytes. Fonts with CFF outlines or no Unicode character
    /// map are rejected.
    pub fn from_bytes(name: &str, data: Vec<u8>) -> Result<Self> {
        let face = Face::parse(&data, 0).map_err(|e| Error::font(name, e))?;
        if face.tables().cff.is_some() {
            return Err(Error::font(name, "CFF outlines are not supported; use a TrueType font"));
        }

        let mut glyphs = BTreeMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables {
                if !subtable.is_unicode() {
                    continue;
                }
                subtable.codepoints(|code| {
                    let (Some(c), Some(id)) = (char::from_u32(code), subtable.glyph_index(code)) else {
                        return;
                    };
                    let advance = face.glyph_hor_advance(id).unwrap_or(0);
                    glyphs.entry(c).or_insert(Glyph { id: id.0, advance });
                });
            }
        }
        if glyphs.is_empty() {
            return Err(Error::font(name, "no Unicode character map"));
        }

        let units_per_em = face.units_per_em();
        let ascent = face.ascender();
        let descent = face.descender();
        let cap_height = face.capital_height().unwrap_or(ascent);
        let rect = face.global_bounding_box();
        let bbox = [rect.x_min, rect.y_min, rect.x_max, rect.y_max];

        log::debug!("Font '{}': {} mapped characters", name, glyphs.len());
        Ok(Self {
            name: pdf_font_name(name),
            data,
            units_per_em,
            ascent,
            descent,
            cap_height,
            bbox,
            glyphs,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of characters with a glyph.
    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    pub fn glyph(&self, c: char) -> Option<Glyph> {
        self.glyphs.get(&c).copied()
    }

    /// Glyphs for every character of `text`, or `None` if any is missing.
    pub fn encode(&self, text: &str) -> Option<Vec<(char, Glyph)>> {
        text.chars().map(|c| self.glyph(c).map(|g| (c, g))).collect()
    }

    /// Advance width of encoded text at `size`, in points.
    pub fn width(&self, glyphs: &[(char, Glyph)], size: f32) -> f32 {
        let units: u32 = glyphs.iter().map(|(_, g)| u32::from(g.advance)).sum();
        units as f32 * size / f32::from(self.units_per_em)
    }

    /// Font units to PDF glyph space (1/1000 em).
    fn scaled(&self, units: i32) -> i64 {
        i64::from(units) * 1000 / i64::from(self.units_per_em)
    }

    /// Add the font objects to `doc` and return the `Type0` font id.
    ///
    /// `used` maps each shown glyph id to its character.
    pub(crate) fn embed(&self, doc: &mut Document, used: &BTreeMap<u16, char>) -> ObjectId {
        let file_id = doc.add_object(Stream::new(
            dictionary! { "Length1" => self.data.len() as i64 },
            self.data.clone(),
        ));
        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => Object::Name(self.name.as_bytes().to_vec()),
            "Flags" => 4_i64,
            "FontBBox" => self
                .bbox
                .iter()
                .map(|&v| Object::Integer(self.scaled(v.into())))
                .collect::<Vec<Object>>(),
            "ItalicAngle" => 0_i64,
            "Ascent" => self.scaled(self.ascent.into()),
            "Descent" => self.scaled(self.descent.into()),
            "CapHeight" => self.scaled(self.cap_height.into()),
            "StemV" => 80_i64,
            "FontFile2" => file_id,
        });

        let mut widths = Vec::with_capacity(used.len() * 2);
        for (&id, &c) in used {
            let advance = self.glyph(c).map_or(0, |g| g.advance);
            widths.push(Object::Integer(id.into()));
            widths.push(Object::Array(vec![Object::Integer(self.scaled(advance.into()))]));
        }
        let cid_font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => Object::Name(self.name.as_bytes().to_vec()),
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0_i64,
            },
            "FontDescriptor" => descriptor_id,
            "CIDToGIDMap" => "Identity",
            "W" => widths,
        });

        let to_unicode_id = doc.add_object(Stream::new(dictionary! {}, to_unicode_cmap(used)));
        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => Object::Name(self.name.as_bytes().to_vec()),
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font_id)],
            "ToUnicode" => to_unicode_id,
        })
    }
}

impl fmt::Debug for EmbeddedFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedFont")
            .field("name", &self.name)
            .field("bytes", &self.data.len())
            .field("glyphs", &self.glyphs.len())
            .finish()
    }
}

/// Keep characters that are safe in a PDF name.
fn pdf_font_name(raw: &str) -> String {
    let name: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if name.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        name
    }
}

const CMAP_HEADER: &str = "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
";

const CMAP_FOOTER: &str = "endcmap
CMapName currentdict /CMap defineresource pop
end
end
";

/// `bfchar` entries per block; the CMap format caps blocks at 100.
const BFCHAR_BLOCK: usize = 100;

fn to_unicode_cmap(used: &BTreeMap<u16, char>) -> Vec<u8> {
    let entries: Vec<(&u16, &char)> = used.iter().collect();
    let mut cmap = String::from(CMAP_HEADER);

    for block in entries.chunks(BFCHAR_BLOCK) {
        cmap.push_str(&format!("{} beginbfchar\n", block.len()));
        for (id, c) in block {
            let mut units = [0u16; 2];
            let utf16: String = c
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{:04X}", u))
                .collect();
            cmap.push_str(&format!("<{:04X}> <{}>\n", id, utf16));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str(CMAP_FOOTER);
    cmap.into_bytes()
}

/// Minimal TrueType file mapping `chars` to glyphs 1.., each 1000 units
/// wide on a 1000-unit em.
#[cfg(test)]
pub(crate) fn tiny_truetype(chars: &[char]) -> Vec<u8> {
    fn u16_be(out: &mut Vec<u8>, v: u16) {
        out.extend_from_slice(&v.to_be_bytes());
    }
    fn u32_be(out: &mut Vec<u8>, v: u32) {
        out.extend_from_slice(&v.to_be_bytes());
    }

    let mut chars = chars.to_vec();
    chars.sort_unstable();
    chars.dedup();
    let num_glyphs = chars.len() as u16 + 1;

    let mut cmap = Vec::new();
    u16_be(&mut cmap, 0);
    u16_be(&mut cmap, 1);
    u16_be(&mut cmap, 3); // Windows
    u16_be(&mut cmap, 10); // UCS-4
    u32_be(&mut cmap, 12);
    u16_be(&mut cmap, 12); // format 12
    u16_be(&mut cmap, 0);
    u32_be(&mut cmap, 16 + 12 * chars.len() as u32);
    u32_be(&mut cmap, 0);
    u32_be(&mut cmap, chars.len() as u32);
    for (idx, c) in chars.iter().enumerate() {
        u32_be(&mut cmap, *c as u32);
        u32_be(&mut cmap, *c as u32);
        u32_be(&mut cmap, idx as u32 + 1);
    }

    let mut head = Vec::new();
    u32_be(&mut head, 0x0001_0000);
    u32_be(&mut head, 0x0001_0000);
    u32_be(&mut head, 0);
    u32_be(&mut head, 0x5F0F_3CF5);
    u16_be(&mut head, 0);
    u16_be(&mut head, 1000);
    head.extend_from_slice(&[0; 16]);
    for v in [0i16, -200, 1000, 800] {
        u16_be(&mut head, v as u16);
    }
    for v in [0u16, 8, 2, 0, 0] {
        u16_be(&mut head, v);
    }

    let mut hhea = Vec::new();
    u32_be(&mut hhea, 0x0001_0000);
    for v in [800i16, -200, 0] {
        u16_be(&mut hhea, v as u16);
    }
    for v in [1000u16, 0, 0, 1000, 1, 0, 0, 0, 0, 0, 0, 0] {
        u16_be(&mut hhea, v);
    }
    u16_be(&mut hhea, num_glyphs);

    let mut hmtx = Vec::new();
    for _ in 0..num_glyphs {
        u16_be(&mut hmtx, 1000);
        u16_be(&mut hmtx, 0);
    }

    let mut maxp = Vec::new();
    u32_be(&mut maxp, 0x0000_5000);
    u16_be(&mut maxp, num_glyphs);

    // Table records must be sorted by tag.
    let tables: [(&[u8; 4], Vec<u8>); 5] = [
        (b"cmap", cmap),
        (b"head", head),
        (b"hhea", hhea),
        (b"hmtx", hmtx),
        (b"maxp", maxp),
    ];

    let mut font = Vec::new();
    u32_be(&mut font, 0x0001_0000);
    u16_be(&mut font, tables.len() as u16);
    for v in [64u16, 2, 16] {
        u16_be(&mut font, v);
    }
    let mut offset = 12 + 16 * tables.len();
    let mut body = Vec::new();
    for (tag, data) in &tables {
        font.extend_from_slice(*tag);
        u32_be(&mut font, 0);
        u32_be(&mut font, offset as u32);
        u32_be(&mut font, data.len() as u32);
        body.extend_from_slice(data);
        while body.len() % 4 != 0 {
            body.push(0);
        }
        offset = 12 + 16 * tables.len() + body.len();
    }
    font.extend_from_slice(&body);
    font
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hangul_font() -> EmbeddedFont {
        EmbeddedFont::from_bytes("Test Gothic", tiny_truetype(&['지', '권', '민'])).unwrap()
    }

    #[test]
    fn test_maps_hangul_to_glyph_ids() {
        let font = hangul_font();
        assert_eq!(font.name(), "TestGothic");
        assert_eq!(font.glyph_count(), 3);

        let glyphs = font.encode("권민지").unwrap();
        let ids: Vec<u16> = glyphs.iter().map(|(_, g)| g.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!((font.width(&glyphs, 10.0) - 30.0).abs() < 0.01);
    }

    #[test]
    fn test_missing_character_is_not_encoded() {
        let font = hangul_font();
        assert_eq!(font.glyph('A'), None);
        assert!(font.encode("권 A").is_none());
    }

    #[test]
    fn test_rejects_non_font_bytes() {
        let err = EmbeddedFont::from_bytes("broken", b"not a font".to_vec()).unwrap_err();
        assert!(matches!(err, Error::Font { .. }));
    }

    #[test]
    fn test_to_unicode_maps_used_glyphs() {
        let used: BTreeMap<u16, char> = [(1, '권'), (3, '지')].into_iter().collect();
        let cmap = String::from_utf8(to_unicode_cmap(&used)).unwrap();

        assert!(cmap.contains("2 beginbfchar\n<0001> <AD8C>\n<0003> <C9C0>\nendbfchar"));
        assert!(cmap.ends_with(CMAP_FOOTER));
    }

    #[test]
    fn test_font_name_is_pdf_safe() {
        assert_eq!(pdf_font_name("Malgun Gothic (Bold)"), "MalgunGothicBold");
        assert_eq!(pdf_font_name("맑은"), "EmbeddedFont");
    }
}
