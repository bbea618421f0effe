//! End-to-end pipeline scenarios over in-memory fixture documents.
//!
//! The fixture font is a minimal TrueType built byte-by-byte (head, hhea,
//! maxp, hmtx and two cmap format-6 subtables covering printable ASCII and
//! the base Cyrillic block), so the suite needs no font asset and no
//! network. Fixture PDFs are assembled with lopdf.

use labelstamp_core::annotate::{display_text, BAND_EXTRA_HEIGHT};
use labelstamp_core::{process, EmbeddedFont, StampError, StaticFontProvider};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use pretty_assertions::assert_eq;

// ============================================================
// Fixture font
// ============================================================

const ASCII_FIRST: u16 = 0x20;
const ASCII_COUNT: u16 = 95;
const CYR_FIRST: u16 = 0x0400;
const CYR_COUNT: u16 = 96;
const NUM_GLYPHS: u16 = 1 + ASCII_COUNT + CYR_COUNT;
const ADVANCE: u16 = 500;
const UNITS_PER_EM: u16 = 1000;

fn be16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn bei16(buf: &mut Vec<u8>, v: i16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn be32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

/// Every glyph advances 500/1000 em, so text width at size `s` is simply
/// `chars * s / 2` — handy for exact assertions.
fn build_test_font() -> Vec<u8> {
    let head = {
        let mut t = Vec::new();
        be32(&mut t, 0x0001_0000); // version
        be32(&mut t, 0x0001_0000); // fontRevision
        be32(&mut t, 0); // checkSumAdjustment
        be32(&mut t, 0x5F0F_3CF5); // magic
        be16(&mut t, 0); // flags
        be16(&mut t, UNITS_PER_EM);
        t.extend_from_slice(&[0u8; 16]); // created + modified
        bei16(&mut t, 0); // xMin
        bei16(&mut t, -200); // yMin
        bei16(&mut t, 1000); // xMax
        bei16(&mut t, 800); // yMax
        be16(&mut t, 0); // macStyle
        be16(&mut t, 8); // lowestRecPPEM
        bei16(&mut t, 2); // fontDirectionHint
        bei16(&mut t, 0); // indexToLocFormat
        bei16(&mut t, 0); // glyphDataFormat
        t
    };

    let hhea = {
        let mut t = Vec::new();
        be32(&mut t, 0x0001_0000);
        bei16(&mut t, 800); // ascender
        bei16(&mut t, -200); // descender
        bei16(&mut t, 0); // lineGap
        be16(&mut t, ADVANCE); // advanceWidthMax
        bei16(&mut t, 0); // minLeftSideBearing
        bei16(&mut t, 0); // minRightSideBearing
        bei16(&mut t, 0); // xMaxExtent
        bei16(&mut t, 1); // caretSlopeRise
        bei16(&mut t, 0); // caretSlopeRun
        bei16(&mut t, 0); // caretOffset
        t.extend_from_slice(&[0u8; 8]); // reserved
        bei16(&mut t, 0); // metricDataFormat
        be16(&mut t, NUM_GLYPHS); // numberOfHMetrics
        t
    };

    let maxp = {
        let mut t = Vec::new();
        be32(&mut t, 0x0000_5000); // version 0.5
        be16(&mut t, NUM_GLYPHS);
        t
    };

    let hmtx = {
        let mut t = Vec::new();
        for _ in 0..NUM_GLYPHS {
            be16(&mut t, ADVANCE);
            bei16(&mut t, 0);
        }
        t
    };

    let cmap = {
        let format6 = |first: u16, count: u16, gid_base: u16| {
            let mut s = Vec::new();
            be16(&mut s, 6); // format
            be16(&mut s, 10 + count * 2); // length
            be16(&mut s, 0); // language
            be16(&mut s, first);
            be16(&mut s, count);
            for i in 0..count {
                be16(&mut s, gid_base + i);
            }
            s
        };
        let ascii = format6(ASCII_FIRST, ASCII_COUNT, 1);
        let cyrillic = format6(CYR_FIRST, CYR_COUNT, 1 + ASCII_COUNT);

        let mut t = Vec::new();
        be16(&mut t, 0); // version
        be16(&mut t, 2); // numTables
        be16(&mut t, 0); // platform: Unicode
        be16(&mut t, 3);
        be32(&mut t, 20);
        be16(&mut t, 0);
        be16(&mut t, 3);
        be32(&mut t, 20 + ascii.len() as u32);
        t.extend_from_slice(&ascii);
        t.extend_from_slice(&cyrillic);
        t
    };

    // Directory entries must be sorted by tag.
    let tables: [(&[u8; 4], &Vec<u8>); 5] = [
        (b"cmap", &cmap),
        (b"head", &head),
        (b"hhea", &hhea),
        (b"hmtx", &hmtx),
        (b"maxp", &maxp),
    ];

    let mut font = Vec::new();
    be32(&mut font, 0x0001_0000); // sfnt version
    be16(&mut font, tables.len() as u16);
    be16(&mut font, 64); // searchRange
    be16(&mut font, 2); // entrySelector
    be16(&mut font, 16); // rangeShift

    let mut offset = 12 + 16 * tables.len();
    let mut body = Vec::new();
    for (tag, data) in tables {
        font.extend_from_slice(&tag[..]);
        be32(&mut font, 0); // checksum, not validated by the reader
        be32(&mut font, offset as u32);
        be32(&mut font, data.len() as u32);
        body.extend_from_slice(data);
        let pad = (4 - data.len() % 4) % 4;
        body.extend(std::iter::repeat(0u8).take(pad));
        offset += data.len() + pad;
    }
    font.extend_from_slice(&body);
    font
}

// ============================================================
// Fixture documents
// ============================================================

/// One-text-run-per-page PDF, Helvetica literal strings (the extractor
/// decodes the raw bytes as UTF-8, so Cyrillic survives the round trip).
fn build_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), Object::Integer(12)],
                ),
                Operation::new(
                    "Td",
                    vec![Object::Integer(50), Object::Integer(700)],
                ),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        text.as_bytes().to_vec(),
                        StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
            "Contents" => Object::Reference(content_id),
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn page_media_box(doc: &Document, page_number: u32) -> Vec<f32> {
    let pages = doc.get_pages();
    let page_id = pages[&page_number];
    doc.get_object(page_id)
        .unwrap()
        .as_dict()
        .unwrap()
        .get(b"MediaBox")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_float().unwrap())
        .collect()
}

fn page_operators(doc: &Document, page_number: u32) -> Vec<String> {
    let pages = doc.get_pages();
    let page_id = pages[&page_number];
    let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
    content
        .operations
        .iter()
        .map(|op| op.operator.clone())
        .collect()
}

fn tj_payloads(doc: &Document, page_number: u32) -> Vec<Vec<u8>> {
    let pages = doc.get_pages();
    let page_id = pages[&page_number];
    let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
    content
        .operations
        .iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| match op.operands.first() {
            Some(Object::String(bytes, _)) => Some(bytes.clone()),
            _ => None,
        })
        .collect()
}

// ============================================================
// Fixture font sanity
// ============================================================

#[test]
fn test_fixture_font_parses_with_expected_metrics() {
    let font = EmbeddedFont::new(build_test_font()).unwrap();
    // 10 chars, each 500/1000 em wide, at size 20.
    assert_eq!(font.text_width("Арт: F/034", 20.0), 100.0);
    assert_eq!(font.line_height(10.0), 10.0);
    assert_eq!(font.descent(10.0), 2.0);
}

#[test]
fn test_fixture_font_maps_ascii_and_cyrillic() {
    let font = EmbeddedFont::new(build_test_font()).unwrap();
    // 'A' is U+0041: gid = 1 + (0x41 - 0x20)
    assert_eq!(font.glyph_string("A"), vec![0x00, 0x22]);
    // 'А' is U+0410: gid = 1 + 95 + 0x10
    let gid: u16 = 1 + ASCII_COUNT + 0x10;
    assert_eq!(font.glyph_string("А"), gid.to_be_bytes().to_vec());
    // No glyph for CJK: .notdef
    assert_eq!(font.glyph_string("漢"), vec![0x00, 0x00]);
}

// ============================================================
// End-to-end scenarios
// ============================================================

#[test]
fn test_end_to_end_annotates_matched_page() {
    let orders = build_pdf(&["0149711785-0110-1 Деталь под покраску F/034 1 1785"]);
    let labels = build_pdf(&["0149711785-0110-1"]);
    let provider = StaticFontProvider::new(build_test_font());

    let output = process(&orders, &labels, &provider).unwrap();
    assert_eq!(output.report.page_count, 1);
    assert_eq!(output.report.modified_count, 1);

    let doc = Document::load_mem(&output.bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 1);

    // Geometry: height grew by the fixed margin, bottom edge moved down.
    let media_box = page_media_box(&doc, 1);
    assert_eq!(media_box, vec![0.0, -(BAND_EXTRA_HEIGHT as f32), 612.0, 792.0]);

    // The original label text run is still there, followed by the band:
    // background rectangle plus one more text object.
    let operators = page_operators(&doc, 1);
    assert!(operators.contains(&"re".to_string()));
    assert_eq!(operators.iter().filter(|op| *op == "Tj").count(), 2);

    // The band text is the article string in embedded-font glyph ids.
    let font = EmbeddedFont::new(build_test_font()).unwrap();
    let payloads = tj_payloads(&doc, 1);
    assert_eq!(payloads[0], "0149711785-0110-1".as_bytes().to_vec());
    assert_eq!(payloads[1], font.glyph_string(&display_text("F/034")));

    // The embedded font is reachable from the page resources.
    let pages = doc.get_pages();
    let page = doc.get_object(pages[&1]).unwrap().as_dict().unwrap();
    let fonts = page
        .get(b"Resources")
        .and_then(Object::as_dict)
        .unwrap()
        .get(b"Font")
        .and_then(Object::as_dict)
        .unwrap();
    let stamp_font = fonts.get(b"FStamp").unwrap();
    let stamp_dict = match stamp_font {
        Object::Reference(id) => doc.get_object(*id).unwrap().as_dict().unwrap(),
        Object::Dictionary(dict) => dict,
        other => panic!("unexpected font entry: {:?}", other),
    };
    assert_eq!(stamp_dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Type0");
    assert_eq!(
        stamp_dict.get(b"Encoding").unwrap().as_name().unwrap(),
        b"Identity-H"
    );
}

#[test]
fn test_unmatched_page_is_left_untouched() {
    let orders = build_pdf(&["0149711785-0110-1 Деталь под покраску F/034 1 1785"]);
    let labels = build_pdf(&["0149711785-0110-1", "страница без номера"]);
    let provider = StaticFontProvider::new(build_test_font());

    let output = process(&orders, &labels, &provider).unwrap();
    assert_eq!(output.report.page_count, 2);
    assert_eq!(output.report.modified_count, 1);

    let doc = Document::load_mem(&output.bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 2);
    assert_eq!(page_media_box(&doc, 1)[1], -(BAND_EXTRA_HEIGHT as f32));
    // Page 2 keeps its original geometry and content.
    assert_eq!(page_media_box(&doc, 2), vec![0.0, 0.0, 612.0, 792.0]);
    assert!(!page_operators(&doc, 2).contains(&"re".to_string()));
}

#[test]
fn test_lookup_miss_only_is_no_matches_found() {
    let orders = build_pdf(&["0149711785-0110-1 Деталь под покраску F/034 1 1785"]);
    // Well-formed shipment number, absent from the orders document.
    let labels = build_pdf(&["0149711785-0110-9"]);
    let provider = StaticFontProvider::new(build_test_font());

    assert!(matches!(
        process(&orders, &labels, &provider),
        Err(StampError::NoMatchesFound)
    ));
}

#[test]
fn test_orders_without_records_fails_before_labels_matter() {
    let orders = build_pdf(&["отчет без номеров отправлений"]);
    let labels = build_pdf(&["0149711785-0110-1"]);
    let provider = StaticFontProvider::new(build_test_font());

    assert!(matches!(
        process(&orders, &labels, &provider),
        Err(StampError::NoRecordsExtracted)
    ));
}

#[test]
fn test_font_failure_is_fatal() {
    let orders = build_pdf(&["0149711785-0110-1 Деталь под покраску F/034 1 1785"]);
    let labels = build_pdf(&["0149711785-0110-1"]);
    let provider = StaticFontProvider::new(b"not a font".to_vec());

    assert!(matches!(
        process(&orders, &labels, &provider),
        Err(StampError::FontUnavailable(_))
    ));
}

#[test]
fn test_duplicate_shipment_number_uses_first_article() {
    let orders = build_pdf(&[
        "0149711785-0110-1 Деталь под покраску F/034 1 1785",
        "0149711785-0110-1 Деталь под покраску Z/777 1 1785",
    ]);
    let labels = build_pdf(&["0149711785-0110-1"]);
    let provider = StaticFontProvider::new(build_test_font());

    let output = process(&orders, &labels, &provider).unwrap();
    let doc = Document::load_mem(&output.bytes).unwrap();

    let font = EmbeddedFont::new(build_test_font()).unwrap();
    let payloads = tj_payloads(&doc, 1);
    assert_eq!(payloads[1], font.glyph_string(&display_text("F/034")));
    assert_ne!(payloads[1], font.glyph_string(&display_text("Z/777")));
}

#[test]
fn test_record_without_article_still_stamps_prefix() {
    let orders = build_pdf(&["0149711785-0110-1 Плоская деталь"]);
    let labels = build_pdf(&["0149711785-0110-1"]);
    let provider = StaticFontProvider::new(build_test_font());

    let output = process(&orders, &labels, &provider).unwrap();
    assert_eq!(output.report.modified_count, 1);

    let doc = Document::load_mem(&output.bytes).unwrap();
    let font = EmbeddedFont::new(build_test_font()).unwrap();
    let payloads = tj_payloads(&doc, 1);
    assert_eq!(payloads[1], font.glyph_string(&display_text("")));
}
