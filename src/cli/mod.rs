//! Command Line Interface module
//!
//! - `crawl`: run the search crawl, optionally with lyrics enrichment
//! - `config`: inspect and edit the configuration file

pub mod config;
pub mod crawl;
