//! Utility modules for common functionality
//!
//! This module contains utility functions and helpers used throughout the application:
//! - `logging`: Logging configuration and setup
//! - `progress`: Progress spinner utilities for crawl feedback

pub mod logging;
pub mod progress;
