//! Core functionality modules
//!
//! This module contains the crawl's business logic organized into layers:
//! - `engine`: request dispatch, concurrency ceiling, retries and cancellation
//! - `auth`: bearer tokens for the catalog and lyrics providers
//! - `services`: provider clients (catalog search pager, lyrics matcher)
//! - `files`: output naming and persistence
//! - `pipeline`: wiring pages and tracks from the pager to the persister

pub mod auth;
pub mod engine;
pub mod files;
pub mod models;
pub mod pipeline;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use pipeline::{CrawlPipeline, CrawlSummary};
