//! # ImageStory - local asset store for narrated fairy tales
//!
//! A generated fairy tale is assembled from four assets: the story text,
//! the source image, a narration voice and background music. This crate
//! persists them.
//!
//! ImageStory provides:
//! - Plain record types for the five asset kinds
//! - One record gateway per kind over a single SQLite connection
//! - Schema creation, validation against a schema identity hash, and reset
//! - An on-disk asset file store and repositories pairing files with rows
//! - Voice feature descriptors with similarity-based voice recommendation

pub mod record;
pub mod storage;
pub mod files;
pub mod features;
pub mod repository;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use record::{AssetKind, FairyTale, Image, Music, Text, Voice};
pub use storage::{AsyncStore, Database, MismatchPolicy};
pub use files::FileStorage;
pub use features::VoiceFeatures;
pub use repository::Library;

/// Result type alias for ImageStory operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for ImageStory operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema mismatch in table `{table}`: expected {expected}, found {found}")]
    SchemaMismatch {
        table: String,
        expected: String,
        found: String,
    },

    #[error("Schema identity mismatch: expected {expected}, found {found}")]
    SchemaIdentity { expected: String, found: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: AssetKind, id: i64 },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Unknown asset kind: {0}")]
    UnknownKind(String),

    #[error("Database connection lock poisoned")]
    Poisoned,

    #[error("Background task failed: {0}")]
    Task(String),
}
