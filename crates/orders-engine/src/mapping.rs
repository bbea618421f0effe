//! Lookup table from shipment number to its extracted record.

use crate::segment::segment_page;
use shipment_types::ShipmentRecord;
use std::collections::HashMap;
use tracing::debug;

/// In-memory mapping built once from the orders document and read-only for
/// the rest of the run.
///
/// If the report repeats a shipment number, the first record in scan order
/// wins; later duplicates are shadowed, not merged.
#[derive(Debug, Default)]
pub struct MappingTable {
    records: HashMap<String, ShipmentRecord>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table by segmenting every page in page order.
    pub fn from_pages<'a, I>(pages: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut table = Self::new();
        for (i, page) in pages.into_iter().enumerate() {
            let records = segment_page(page);
            debug!(page = i + 1, records = records.len(), "segmented orders page");
            for record in records {
                table.insert(record);
            }
        }
        table
    }

    /// Insert a record; an already-present key keeps its earlier record.
    pub fn insert(&mut self, record: ShipmentRecord) {
        self.records
            .entry(record.shipment_number.clone())
            .or_insert(record);
    }

    pub fn lookup(&self, shipment_number: &str) -> Option<&ShipmentRecord> {
        self.records.get(shipment_number)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
