//! End-to-end run: orders report in, annotated labels document out.

use crate::annotate::{annotate_page, display_text};
use crate::error::StampError;
use crate::extract;
use crate::font::{EmbeddedFont, FontProvider};
use crate::locate;
use lopdf::Document;
use orders_engine::MappingTable;
use shipment_types::StampReport;
use tracing::{debug, info};

/// Annotated document bytes plus the run summary.
pub struct StampOutput {
    pub bytes: Vec<u8>,
    pub report: StampReport,
}

/// Process one orders/labels pair.
///
/// Sequence: build the mapping table from the orders document (fail if
/// empty), resolve every labels page against it (fail if nothing matched),
/// embed the font, annotate the matched pages in input page order, and
/// serialize. No partial output is ever returned; any failure aborts the
/// whole run with a descriptive error.
pub fn process(
    orders: &[u8],
    labels: &[u8],
    font_provider: &dyn FontProvider,
) -> Result<StampOutput, StampError> {
    if orders.is_empty() || labels.is_empty() {
        return Err(StampError::MissingInput);
    }

    let orders_pages = extract::extract_document(orders)?;
    let table = MappingTable::from_pages(orders_pages.iter().map(|p| p.text.as_str()));
    if table.is_empty() {
        return Err(StampError::NoRecordsExtracted);
    }
    info!(
        pages = orders_pages.len(),
        records = table.len(),
        "built shipment mapping table"
    );

    let mut doc =
        Document::load_mem(labels).map_err(|e| StampError::MalformedDocument(e.to_string()))?;
    let label_pages = extract::extract_with_fallback(&doc, labels);
    let page_ids = doc.get_pages();

    // Matched pages, in input page order.
    let mut matches = Vec::new();
    for page in &label_pages {
        match locate::resolve_page(&page.text, &table) {
            Some(record) => {
                debug!(
                    page = page.page_number,
                    shipment_number = %record.shipment_number,
                    "label page matched"
                );
                if let Some(&page_id) = page_ids.get(&page.page_number) {
                    matches.push((page_id, record));
                }
            }
            None => debug!(page = page.page_number, "label page skipped"),
        }
    }
    if matches.is_empty() {
        return Err(StampError::NoMatchesFound);
    }

    let font = EmbeddedFont::new(font_provider.font_bytes()?)?;
    let texts: Vec<String> = matches
        .iter()
        .map(|(_, record)| display_text(&record.article))
        .collect();
    let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let font_id = font.embed(&mut doc, &text_refs);

    for (page_id, record) in &matches {
        annotate_page(&mut doc, *page_id, font_id, &font, &record.article)?;
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| StampError::OperationError(e.to_string()))?;

    let report = StampReport {
        page_count: label_pages.len() as u32,
        modified_count: matches.len() as u32,
    };
    info!(
        pages = report.page_count,
        modified = report.modified_count,
        "labels document annotated"
    );

    Ok(StampOutput { bytes, report })
}
