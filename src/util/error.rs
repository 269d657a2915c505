//! Error types for acceleration-structure builds.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for scene intake, builds and buffer packing.
#[derive(Error, Debug)]
pub enum Error {
    /// No triangles to build from
    #[error("Scene geometry is empty")]
    EmptyGeometry,

    /// Index array does not describe whole triangles
    #[error("Index count {0} is not a multiple of 3")]
    IndexCountNotTriangles(usize),

    /// Triangle references a vertex that does not exist
    #[error("Index {index} out of range (vertex count: {vertex_count})")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    /// Geometry exceeds what 32-bit GPU indices can address
    #[error("Too many {what}: {count} (max {max})")]
    TooLarge {
        what: &'static str,
        count: usize,
        max: usize,
    },

    /// Settings value rejected by validation
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Settings file does not exist or cannot be accessed
    #[error("Settings file not found: {0}")]
    SettingsNotFound(PathBuf),

    /// Host staging memory could not be reserved
    #[error("Failed to allocate {bytes} bytes for {what}")]
    HostAllocation { what: &'static str, bytes: usize },

    /// Device buffer creation failed
    #[error("Device allocation failed for {what}: {message}")]
    DeviceAllocation { what: &'static str, message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid settings error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidSettings(msg.into())
    }
}

/// Result type alias for acceleration-structure operations.
pub type Result<T> = std::result::Result<T, Error>;
