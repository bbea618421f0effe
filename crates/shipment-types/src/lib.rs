//! Shared data types for the labelstamp workspace.

use serde::{Deserialize, Serialize};

/// One row recovered from the orders report.
///
/// `shipment_number` is the natural key and the only field guaranteed
/// non-empty; an empty `article` means the row grammar could not recover an
/// article token, which downstream treats as "nothing to print" rather than
/// an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    pub shipment_number: String,
    pub article: String,
    pub product_name: String,
}

/// Reading-order text of a single page plus its raw dimensions.
///
/// Page numbers are 1-based, matching PDF page numbering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
    pub width: f64,
    pub height: f64,
}

/// Summary of a completed stamping run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StampReport {
    /// Total pages in the labels document.
    pub page_count: u32,
    /// Pages that received an annotation band.
    pub modified_count: u32,
}
