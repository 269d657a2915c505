//! Shared utilities.
//!
//! - [`Error`] / [`Result`] - Error handling

mod error;

pub use error::*;
