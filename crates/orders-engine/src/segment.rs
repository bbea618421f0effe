//! Record segmentation over one page of extracted report text.

use crate::patterns::{strip_leading_noise, ParsedRow, ROW_RULES, SHIPMENT_NUMBER};
use shipment_types::ShipmentRecord;
use tracing::debug;

/// Split one page's text into per-shipment records.
///
/// Shipment numbers delimit consecutive report rows: each record's block runs
/// from the end of its own number match to the start of the next one (or the
/// end of the page). A page with no matches yields no records. A block whose
/// article cannot be recovered still yields a record with an empty article.
pub fn segment_page(text: &str) -> Vec<ShipmentRecord> {
    let matches: Vec<_> = SHIPMENT_NUMBER.find_iter(text).collect();
    let mut records = Vec::with_capacity(matches.len());

    for (i, m) in matches.iter().enumerate() {
        let block_end = matches
            .get(i + 1)
            .map(|next| next.start())
            .unwrap_or(text.len());
        let block = &text[m.end()..block_end];

        let row = parse_block(block);
        debug!(
            shipment_number = m.as_str(),
            article = %row.article,
            "segmented report row"
        );
        records.push(ShipmentRecord {
            shipment_number: m.as_str().to_string(),
            article: row.article,
            product_name: row.product_name,
        });
    }

    records
}

/// Apply the grammar rules in order; when none matches, keep the cleaned
/// block as the product name with an empty article.
fn parse_block(block: &str) -> ParsedRow {
    for (rule, parse) in ROW_RULES {
        if let Some(row) = parse(block) {
            debug!(rule, "row grammar matched");
            return row;
        }
    }
    ParsedRow {
        product_name: strip_leading_noise(block.trim()),
        article: String::new(),
    }
}
