//! Common utilities for docmap
//!
//! This crate provides the error type shared by the validation and mapping crates.

pub mod error;

pub use error::{DocMapError, Result};
