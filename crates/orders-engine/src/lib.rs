//! Orders report extraction engine.
//!
//! Recovers `{shipment number -> article, product name}` records from loosely
//! formatted per-page report text. Segmentation is regex-driven: shipment
//! numbers delimit row blocks, and each block is parsed with a two-tier
//! grammar (structured row first, article-token fallback second).

pub mod mapping;
pub mod patterns;
pub mod segment;

pub use mapping::MappingTable;
pub use patterns::{ParsedRow, SHIPMENT_NUMBER};
pub use segment::segment_page;
