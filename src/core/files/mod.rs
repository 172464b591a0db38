//! File operations
//!
//! Output naming (identity derivation, filename sanitization) and JSON
//! persistence of crawled pages and tracks.

pub mod output;

pub use output::{OutputPersister, OutputUnit};
