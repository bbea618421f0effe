//! Per-page text extraction.
//!
//! The native backend walks each page's content stream with lopdf and
//! concatenates the text-showing operands in operator order, which preserves
//! left-to-right reading order for the fixed-layout reports and labels this
//! pipeline handles. When the native walk finds no text at all (exotic
//! encodings), a pdf-extract fallback extracts the whole document and splits
//! it back into pages on form feeds.

use crate::error::StampError;
use lopdf::{Document, Object};
use shipment_types::PageText;
use tracing::{debug, warn};

/// Load a document and extract its per-page text.
pub fn extract_document(bytes: &[u8]) -> Result<Vec<PageText>, StampError> {
    let doc =
        Document::load_mem(bytes).map_err(|e| StampError::MalformedDocument(e.to_string()))?;
    Ok(extract_with_fallback(&doc, bytes))
}

/// Extract from a pre-parsed document, falling back to pdf-extract when the
/// native walk produced no text. A fallback failure is not fatal; the empty
/// native result is kept and surfaces downstream as a no-records/no-match
/// condition.
pub fn extract_with_fallback(doc: &Document, bytes: &[u8]) -> Vec<PageText> {
    let pages = extract_pages(doc);
    if pages.iter().all(|p| p.text.trim().is_empty()) {
        match extract_pages_fallback(bytes, pages.len() as u32) {
            Ok(fallback) => {
                warn!("native extraction found no text, using pdf-extract fallback");
                return fallback;
            }
            Err(e) => warn!(error = %e, "pdf-extract fallback failed, keeping native result"),
        }
    }
    pages
}

/// Native backend: walk content streams of every page.
pub fn extract_pages(doc: &Document) -> Vec<PageText> {
    let mut pages = Vec::new();

    for (&page_number, &page_id) in doc.get_pages().iter() {
        let mut fragments: Vec<String> = Vec::new();

        if let Ok(content) = doc.get_page_content(page_id) {
            if let Ok(operations) = lopdf::content::Content::decode(&content) {
                for op in operations.operations {
                    match op.operator.as_str() {
                        "Tj" | "TJ" | "'" | "\"" => {
                            let mut fragment = String::new();
                            for operand in &op.operands {
                                if let Some(text) = decode_text_operand(operand) {
                                    fragment.push_str(&text);
                                }
                            }
                            if !fragment.is_empty() {
                                fragments.push(fragment);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        let (width, height) = page_dimensions(doc, page_id);
        let text = fragments.join(" ");
        debug!(page = page_number, chars = text.len(), "extracted page text");
        pages.push(PageText {
            page_number,
            text,
            width,
            height,
        });
    }

    pages
}

/// Decode one text-showing operand: UTF-8 first, UTF-16BE with BOM second,
/// Latin-1 last. TJ arrays interleave strings with kerning adjustments;
/// large negative kerns stand in for word gaps.
fn decode_text_operand(operand: &Object) -> Option<String> {
    match operand {
        Object::String(bytes, _) => {
            if let Ok(s) = String::from_utf8(bytes.clone()) {
                return Some(s);
            }
            if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
                let chars: Vec<u16> = bytes[2..]
                    .chunks(2)
                    .filter_map(|chunk| {
                        if chunk.len() == 2 {
                            Some(u16::from_be_bytes([chunk[0], chunk[1]]))
                        } else {
                            None
                        }
                    })
                    .collect();
                if let Ok(s) = String::from_utf16(&chars) {
                    return Some(s);
                }
            }
            Some(bytes.iter().map(|&b| b as char).collect())
        }
        Object::Array(arr) => {
            let mut text = String::new();
            for item in arr {
                match item {
                    Object::String(_, _) => {
                        if let Some(s) = decode_text_operand(item) {
                            text.push_str(&s);
                        }
                    }
                    Object::Integer(n) if *n < -100 => text.push(' '),
                    Object::Real(n) if *n < -100.0 => text.push(' '),
                    _ => {}
                }
            }
            Some(text)
        }
        _ => None,
    }
}

/// Page dimensions from MediaBox, defaulting to US Letter.
pub fn page_dimensions(doc: &Document, page_id: lopdf::ObjectId) -> (f64, f64) {
    if let Ok(page) = doc.get_object(page_id) {
        if let Ok(dict) = page.as_dict() {
            if let Ok(media_box) = dict.get(b"MediaBox") {
                if let Ok(arr) = media_box.as_array() {
                    if arr.len() >= 4 {
                        let width = arr[2].as_float().unwrap_or(612.0) as f64;
                        let height = arr[3].as_float().unwrap_or(792.0) as f64;
                        return (width, height);
                    }
                }
            }
        }
    }
    (612.0, 792.0)
}

/// Fallback backend: pdf-extract over the whole document, split on form
/// feeds and padded with empty pages up to the real page count.
fn extract_pages_fallback(bytes: &[u8], page_count: u32) -> Result<Vec<PageText>, StampError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| StampError::MalformedDocument(e.to_string()))?;

    let mut pages: Vec<PageText> = if text.contains('\x0C') {
        text.split('\x0C')
            .enumerate()
            .map(|(i, page_text)| PageText {
                page_number: (i + 1) as u32,
                text: page_text.to_string(),
                width: 612.0,
                height: 792.0,
            })
            .collect()
    } else {
        vec![PageText {
            page_number: 1,
            text,
            width: 612.0,
            height: 792.0,
        }]
    };

    while pages.len() < page_count as usize {
        pages.push(PageText {
            page_number: pages.len() as u32 + 1,
            text: String::new(),
            width: 612.0,
            height: 792.0,
        });
    }

    Ok(pages)
}
