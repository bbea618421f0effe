//! Shipment-number location on label pages.

use orders_engine::{MappingTable, SHIPMENT_NUMBER};
use shipment_types::ShipmentRecord;

/// First shipment-number occurrence on a page. A label page carries at most
/// one number; if stray text produces more, the first occurrence wins.
pub fn find_shipment_number(text: &str) -> Option<&str> {
    SHIPMENT_NUMBER.find(text).map(|m| m.as_str())
}

/// Resolve a page's shipment number against the mapping table. `None` for a
/// page without a number (skipped) as well as for a lookup miss (left
/// unannotated); neither is an error on its own.
pub fn resolve_page<'a>(text: &str, table: &'a MappingTable) -> Option<&'a ShipmentRecord> {
    find_shipment_number(text).and_then(|number| table.lookup(number))
}
