//! External services integration
//!
//! This module contains integrations with external APIs:
//! - `spotify`: catalog search and pagination
//! - `genius`: lyrics search, candidate matching and extraction

pub mod genius;
pub mod spotify;
