//! Label stamping core.
//!
//! Reconciles an orders report with a shipping-labels document: recovers
//! `{shipment number -> article}` records from the report text (via
//! orders-engine), locates each label page's shipment number, and stamps
//! matched pages with a bottom annotation band carrying the article code.
//! PDF reading and mutation use lopdf, with a pdf-extract fallback for text
//! extraction.

pub mod annotate;
pub mod error;
pub mod extract;
pub mod font;
pub mod locate;
pub mod pipeline;

pub use annotate::{BAND_EXTRA_HEIGHT, BAND_FONT_SIZE};
pub use error::StampError;
pub use font::{EmbeddedFont, FontProvider, StaticFontProvider};
pub use pipeline::{process, StampOutput};

/// Parse PDF bytes and return the page count.
pub fn get_page_count(bytes: &[u8]) -> Result<u32, StampError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| StampError::MalformedDocument(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}
