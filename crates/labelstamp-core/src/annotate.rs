//! Bottom annotation band.
//!
//! The band is appended below the existing label content by extending the
//! page downward: the visible height grows by a fixed margin and the
//! coordinate origin shifts down by the same amount. In MediaBox terms the
//! two composed transforms collapse into lowering the bottom edge, which
//! leaves every existing drawing at its absolute coordinates; a height-only
//! resize would instead extend the top and leave no room at the bottom.

use crate::error::StampError;
use crate::font::EmbeddedFont;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

/// Fixed extra height of the band, identical on every annotated page.
pub const BAND_EXTRA_HEIGHT: f64 = 40.0;
/// Annotation text size.
pub const BAND_FONT_SIZE: f64 = 14.0;
/// Background patch padding around the text box.
pub const BAND_PADDING: f64 = 4.0;
/// Baseline inset from the new bottom edge.
pub const BAND_BOTTOM_INSET: f64 = 10.0;
/// Resource name the embedded font is registered under.
pub const FONT_RESOURCE: &str = "FStamp";

/// Band text for a record's article; an empty article still produces the
/// prefix so annotated pages stay visually consistent.
pub fn display_text(article: &str) -> String {
    format!("Арт: {}", article)
}

/// Read a page's MediaBox, defaulting to US Letter.
pub fn media_box(doc: &Document, page_id: ObjectId) -> [f64; 4] {
    if let Ok(page) = doc.get_object(page_id) {
        if let Ok(dict) = page.as_dict() {
            if let Ok(arr) = dict.get(b"MediaBox").and_then(Object::as_array) {
                if arr.len() >= 4 {
                    return [
                        arr[0].as_float().unwrap_or(0.0) as f64,
                        arr[1].as_float().unwrap_or(0.0) as f64,
                        arr[2].as_float().unwrap_or(612.0) as f64,
                        arr[3].as_float().unwrap_or(792.0) as f64,
                    ];
                }
            }
        }
    }
    [0.0, 0.0, 612.0, 792.0]
}

/// Grow the page's visible height by `extra` and shift its origin down by
/// the same amount: the new bottom edge sits `extra` units below the old
/// one, existing content does not move. CropBox, when present, is kept in
/// sync so viewers do not clip the new band away.
pub fn extend_page_downward(
    doc: &mut Document,
    page_id: ObjectId,
    extra: f64,
) -> Result<(), StampError> {
    let old = media_box(doc, page_id);
    let new_box = Object::Array(vec![
        Object::Real(old[0] as f32),
        Object::Real((old[1] - extra) as f32),
        Object::Real(old[2] as f32),
        Object::Real(old[3] as f32),
    ]);

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| StampError::OperationError(e.to_string()))?;

    page.set("MediaBox", new_box);

    if let Ok(crop) = page.get(b"CropBox").and_then(Object::as_array).cloned() {
        if crop.len() >= 4 {
            let y0 = crop[1].as_float().unwrap_or(0.0) as f64;
            let mut synced = crop;
            synced[1] = Object::Real((y0 - extra) as f32);
            page.set("CropBox", Object::Array(synced));
        }
    }

    Ok(())
}

/// Append the annotation band to a matched page: extend the page downward,
/// register the embedded font, then draw an opaque background patch and the
/// centered article text inside the new region.
pub fn annotate_page(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
    font: &EmbeddedFont,
    article: &str,
) -> Result<(), StampError> {
    let old = media_box(doc, page_id);
    extend_page_downward(doc, page_id, BAND_EXTRA_HEIGHT)?;
    register_page_font(doc, page_id, font_id)?;

    let text = display_text(article);
    let text_width = font.text_width(&text, BAND_FONT_SIZE);
    let text_height = font.line_height(BAND_FONT_SIZE);
    let descent = font.descent(BAND_FONT_SIZE);

    // Band occupies the freshly created region below the old bottom edge.
    let center_x = old[0] + (old[2] - old[0]) / 2.0;
    let baseline_x = center_x - text_width / 2.0;
    let baseline_y = (old[1] - BAND_EXTRA_HEIGHT) + BAND_BOTTOM_INSET;

    let rect_x = baseline_x - BAND_PADDING;
    let rect_y = baseline_y - descent - BAND_PADDING;
    let rect_w = text_width + 2.0 * BAND_PADDING;
    let rect_h = text_height + 2.0 * BAND_PADDING;

    let ops = vec![
        Operation::new("q", vec![]),
        Operation::new(
            "rg",
            vec![Object::Real(1.0), Object::Real(1.0), Object::Real(1.0)],
        ),
        Operation::new(
            "re",
            vec![
                Object::Real(rect_x as f32),
                Object::Real(rect_y as f32),
                Object::Real(rect_w as f32),
                Object::Real(rect_h as f32),
            ],
        ),
        Operation::new("f", vec![]),
        Operation::new("Q", vec![]),
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![
                Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                Object::Real(BAND_FONT_SIZE as f32),
            ],
        ),
        Operation::new(
            "rg",
            vec![Object::Real(0.0), Object::Real(0.0), Object::Real(0.0)],
        ),
        Operation::new(
            "Td",
            vec![
                Object::Real(baseline_x as f32),
                Object::Real(baseline_y as f32),
            ],
        ),
        Operation::new(
            "Tj",
            vec![Object::String(
                font.glyph_string(&text),
                StringFormat::Hexadecimal,
            )],
        ),
        Operation::new("ET", vec![]),
    ];

    append_page_content(doc, page_id, ops)
}

/// Append operations to a page's content, preserving everything already
/// drawn there.
fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    ops: Vec<Operation>,
) -> Result<(), StampError> {
    let existing = doc
        .get_page_content(page_id)
        .map_err(|e| StampError::OperationError(e.to_string()))?;
    let mut content =
        Content::decode(&existing).map_err(|e| StampError::OperationError(e.to_string()))?;
    content.operations.extend(ops);
    let encoded = content
        .encode()
        .map_err(|e| StampError::OperationError(e.to_string()))?;
    doc.change_page_content(page_id, encoded)
        .map_err(|e| StampError::OperationError(e.to_string()))
}

/// Register the embedded font under [`FONT_RESOURCE`] in the page's Font
/// resources, following references and creating missing dictionaries.
fn register_page_font(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
) -> Result<(), StampError> {
    let op_err = |e: lopdf::Error| StampError::OperationError(e.to_string());

    // Locate the Resources dictionary without holding a mutable borrow.
    let resources_ref = {
        let page = doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(op_err)?;
        match page.get(b"Resources") {
            Ok(Object::Reference(id)) => Some(Some(*id)),
            Ok(Object::Dictionary(_)) => Some(None),
            _ => None,
        }
    };

    let Some(resources_ref) = resources_ref else {
        // No resources at all on this page.
        let mut font_dict = Dictionary::new();
        font_dict.set(FONT_RESOURCE, Object::Reference(font_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(font_dict));
        doc.get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(op_err)?
            .set("Resources", Object::Dictionary(resources));
        return Ok(());
    };

    // The Font entry may itself be a reference.
    let font_dict_ref = {
        let resources = match resources_ref {
            Some(id) => doc.get_object(id).and_then(Object::as_dict).map_err(op_err)?,
            None => doc
                .get_object(page_id)
                .and_then(Object::as_dict)
                .map_err(op_err)?
                .get(b"Resources")
                .and_then(Object::as_dict)
                .map_err(op_err)?,
        };
        match resources.get(b"Font") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        }
    };

    if let Some(font_dict_id) = font_dict_ref {
        doc.get_object_mut(font_dict_id)
            .and_then(Object::as_dict_mut)
            .map_err(op_err)?
            .set(FONT_RESOURCE, Object::Reference(font_id));
        return Ok(());
    }

    let resources = match resources_ref {
        Some(id) => doc
            .get_object_mut(id)
            .and_then(Object::as_dict_mut)
            .map_err(op_err)?,
        None => doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(op_err)?
            .get_mut(b"Resources")
            .and_then(Object::as_dict_mut)
            .map_err(op_err)?,
    };

    if let Ok(font_dict) = resources.get_mut(b"Font").and_then(Object::as_dict_mut) {
        font_dict.set(FONT_RESOURCE, Object::Reference(font_id));
    } else {
        let mut font_dict = Dictionary::new();
        font_dict.set(FONT_RESOURCE, Object::Reference(font_id));
        resources.set("Font", Object::Dictionary(font_dict));
    }

    Ok(())
}
