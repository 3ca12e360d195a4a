//! Utility functions and helpers
//!
//! This module contains utility functions used throughout the application.

pub mod url;
pub mod version;

pub use version::get_version;
