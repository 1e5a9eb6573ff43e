//! Ingestion schema
//!
//! Input records accepted at the store boundary and the adapter that parses them
//! from JSON arrays or NDJSON streams.

mod adapter;
mod record;

pub use adapter::*;
pub use record::*;
