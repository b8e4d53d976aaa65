//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with one table per asset kind:
//! - fairy_tales(fairy_tales_id, title, voice_id, image_id, text_id, music_id, attribute, created_at)
//! - voices(voice_id, title, voice_path, attribute, created_at)
//! - images(image_id, title, image_path, created_at)
//! - texts(text_id, text_path, created_at)
//! - musics(music_id, title, music_path, attribute, created_at)
//!
//! plus `schema_meta`, which holds the schema identity hash.

pub mod schema;
pub mod gateway;
pub mod database;
pub mod offload;

pub use database::{Database, DbStats, MismatchPolicy};
pub use gateway::{Gateway, Record};
pub use offload::AsyncStore;
