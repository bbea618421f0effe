//! Embedded annotation font.
//!
//! Font acquisition is an injected dependency so tests can supply a local
//! deterministic TTF and the pipeline never reaches for the network itself.
//! The font is embedded as a Type0 / CIDFontType2 with Identity-H encoding:
//! text is shown as big-endian glyph ids, the W array carries widths for the
//! glyphs actually used, and a ToUnicode CMap keeps the stamped text
//! copyable. Identity-H is required because the label prefix and product
//! names use Cyrillic, which the standard 14 fonts cannot encode.

use crate::error::StampError;
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::BTreeMap;
use ttf_parser::Face;

/// Supplies raw font bytes (`bytes -> EmbeddedFont` is the caller's seam).
pub trait FontProvider {
    fn font_bytes(&self) -> Result<Vec<u8>, StampError>;
}

/// Provider over bytes already in memory.
pub struct StaticFontProvider {
    bytes: Vec<u8>,
}

impl StaticFontProvider {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl FontProvider for StaticFontProvider {
    fn font_bytes(&self) -> Result<Vec<u8>, StampError> {
        if self.bytes.is_empty() {
            return Err(StampError::FontUnavailable("empty font data".to_string()));
        }
        Ok(self.bytes.clone())
    }
}

/// A parsed TrueType font plus the metrics the annotator needs.
#[derive(Debug)]
pub struct EmbeddedFont {
    data: Vec<u8>,
    units_per_em: f64,
    ascent: f64,
    descent: f64,
    base_font: String,
}

impl EmbeddedFont {
    pub fn new(data: Vec<u8>) -> Result<Self, StampError> {
        let face =
            Face::parse(&data, 0).map_err(|e| StampError::FontUnavailable(e.to_string()))?;
        let units_per_em = face.units_per_em() as f64;
        let ascent = face.ascender() as f64;
        let descent = face.descender() as f64;
        let base_font = postscript_name(&face);
        drop(face);
        Ok(Self {
            data,
            units_per_em,
            ascent,
            descent,
            base_font,
        })
    }

    fn face(&self) -> Face<'_> {
        // Parse is cheap (header reads only) and the bytes were validated in
        // the constructor.
        Face::parse(&self.data, 0).expect("font bytes validated at construction")
    }

    /// Rendered width of `text` at `size`, from the advance widths.
    pub fn text_width(&self, text: &str, size: f64) -> f64 {
        let face = self.face();
        let units: f64 = text
            .chars()
            .map(|ch| {
                face.glyph_index(ch)
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .unwrap_or(0) as f64
            })
            .sum();
        units * size / self.units_per_em
    }

    /// Ascent-to-descent height of one line at `size`.
    pub fn line_height(&self, size: f64) -> f64 {
        (self.ascent - self.descent) * size / self.units_per_em
    }

    /// Descent below the baseline at `size` (non-negative).
    pub fn descent(&self, size: f64) -> f64 {
        -self.descent * size / self.units_per_em
    }

    /// Identity-H string payload: big-endian glyph ids, one per char.
    /// Characters without a glyph map to .notdef.
    pub fn glyph_string(&self, text: &str) -> Vec<u8> {
        let face = self.face();
        let mut bytes = Vec::with_capacity(text.chars().count() * 2);
        for ch in text.chars() {
            let gid = face.glyph_index(ch).map(|g| g.0).unwrap_or(0);
            bytes.extend_from_slice(&gid.to_be_bytes());
        }
        bytes
    }

    /// Embed the font into `doc` and return the Type0 font object id.
    /// `texts` is the union of strings that will be shown with this font;
    /// only their glyphs get W-array and ToUnicode entries.
    pub fn embed(&self, doc: &mut Document, texts: &[&str]) -> ObjectId {
        let scale = 1000.0 / self.units_per_em;

        // gid -> (char, advance in glyph-space units)
        let mut used: BTreeMap<u16, (char, u16)> = BTreeMap::new();
        {
            let face = self.face();
            for text in texts {
                for ch in text.chars() {
                    if let Some(gid) = face.glyph_index(ch) {
                        let advance = face.glyph_hor_advance(gid).unwrap_or(0);
                        used.entry(gid.0).or_insert((ch, advance));
                    }
                }
            }
        }

        let font_file_id = doc.add_object(Stream::new(
            dictionary! { "Length1" => Object::Integer(self.data.len() as i64) },
            self.data.clone(),
        ));

        let bbox = {
            let rect = self.face().global_bounding_box();
            vec![
                Object::Integer((rect.x_min as f64 * scale) as i64),
                Object::Integer((rect.y_min as f64 * scale) as i64),
                Object::Integer((rect.x_max as f64 * scale) as i64),
                Object::Integer((rect.y_max as f64 * scale) as i64),
            ]
        };

        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => Object::Name(self.base_font.as_bytes().to_vec()),
            "Flags" => Object::Integer(4),
            "FontBBox" => Object::Array(bbox),
            "ItalicAngle" => Object::Integer(0),
            "Ascent" => Object::Integer((self.ascent * scale) as i64),
            "Descent" => Object::Integer((self.descent * scale) as i64),
            "CapHeight" => Object::Integer((self.ascent * scale) as i64),
            "StemV" => Object::Integer(80),
            "FontFile2" => Object::Reference(font_file_id),
        });

        let mut widths = Vec::with_capacity(used.len() * 2);
        for (&gid, &(_, advance)) in &used {
            widths.push(Object::Integer(gid as i64));
            widths.push(Object::Array(vec![Object::Integer(
                (advance as f64 * scale).round() as i64,
            )]));
        }

        let cid_font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => Object::Name(self.base_font.as_bytes().to_vec()),
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::String(b"Adobe".to_vec(), StringFormat::Literal),
                "Ordering" => Object::String(b"Identity".to_vec(), StringFormat::Literal),
                "Supplement" => Object::Integer(0),
            },
            "FontDescriptor" => Object::Reference(descriptor_id),
            "DW" => Object::Integer(1000),
            "W" => Object::Array(widths),
            "CIDToGIDMap" => "Identity",
        });

        let to_unicode_id = doc.add_object(Stream::new(
            dictionary! {},
            to_unicode_cmap(&used).into_bytes(),
        ));

        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => Object::Name(self.base_font.as_bytes().to_vec()),
            "Encoding" => "Identity-H",
            "DescendantFonts" => Object::Array(vec![Object::Reference(cid_font_id)]),
            "ToUnicode" => Object::Reference(to_unicode_id),
        })
    }
}

/// PostScript name from the name table, sanitized for use as a PDF name;
/// falls back to a fixed name for fonts without one.
fn postscript_name(face: &Face<'_>) -> String {
    let name = face
        .names()
        .into_iter()
        .filter(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
        .find_map(|n| n.to_string());

    let sanitized: String = name
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();

    if sanitized.is_empty() {
        "LabelStampFont".to_string()
    } else {
        sanitized
    }
}

/// Minimal ToUnicode CMap mapping the used glyph ids back to their source
/// characters.
fn to_unicode_cmap(used: &BTreeMap<u16, (char, u16)>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000> <FFFF>\n\
         endcodespacerange\n",
    );

    let entries: Vec<(u16, char)> = used.iter().map(|(&gid, &(ch, _))| (gid, ch)).collect();
    // bfchar blocks are capped at 100 entries by the CMap format
    for chunk in entries.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (gid, ch) in chunk {
            let mut units = [0u16; 2];
            let encoded = ch.encode_utf16(&mut units);
            let target: String = encoded.iter().map(|u| format!("{:04X}", u)).collect();
            cmap.push_str(&format!("<{:04X}> <{}>\n", gid, target));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end\n",
    );
    cmap
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unparseable_font_is_font_unavailable() {
        let err = EmbeddedFont::new(b"definitely not a font".to_vec()).unwrap_err();
        assert!(matches!(err, StampError::FontUnavailable(_)));
    }

    #[test]
    fn test_static_provider_rejects_empty_bytes() {
        let provider = StaticFontProvider::new(Vec::new());
        assert!(matches!(
            provider.font_bytes(),
            Err(StampError::FontUnavailable(_))
        ));
    }

    #[test]
    fn test_static_provider_returns_bytes() {
        let provider = StaticFontProvider::new(vec![1, 2, 3]);
        assert_eq!(provider.font_bytes().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_to_unicode_cmap_shape() {
        let mut used = BTreeMap::new();
        used.insert(5u16, ('А', 500u16));
        used.insert(9u16, (':', 250u16));
        let cmap = to_unicode_cmap(&used);
        assert!(cmap.contains("2 beginbfchar"));
        assert!(cmap.contains("<0005> <0410>"));
        assert!(cmap.contains("<0009> <003A>"));
        assert!(cmap.contains("endbfchar"));
    }
}
