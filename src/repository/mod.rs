//! Repositories - record writes paired with their asset files
//!
//! Each repository stores the file behind a record (story text, image bytes,
//! narration or music audio) and the row that points at it, and removes
//! both on delete.

pub mod fairy_tale;
pub mod voice;
pub mod image;
pub mod text;
pub mod music;

use std::path::Path;
use std::sync::Arc;
use crate::files::{path_string, FileStorage};
use crate::storage::{Database, MismatchPolicy};
use crate::Result;

pub use fairy_tale::{FairyTaleRepository, NewTale, VoiceChoice};
pub use image::ImageRepository;
pub use music::MusicRepository;
pub use text::TextRepository;
pub use voice::VoiceRepository;

/// The database and the asset directory, handing out repositories
#[derive(Clone)]
pub struct Library {
    db: Arc<Database>,
    files: FileStorage,
}

impl Library {
    pub fn new(db: Arc<Database>, files: FileStorage) -> Self {
        Self { db, files }
    }

    /// Open the database at `db_path` and use `data_dir` for asset files
    pub fn open(db_path: &Path, data_dir: &Path, policy: MismatchPolicy) -> Result<Self> {
        let db = Database::open_with(db_path, policy)?;
        Ok(Self::new(Arc::new(db), FileStorage::new(data_dir)))
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn files(&self) -> &FileStorage {
        &self.files
    }

    pub fn fairy_tales(&self) -> FairyTaleRepository<'_> {
        FairyTaleRepository::new(&self.db, &self.files)
    }

    pub fn voices(&self) -> VoiceRepository<'_> {
        VoiceRepository::new(&self.db, &self.files)
    }

    pub fn images(&self) -> ImageRepository<'_> {
        ImageRepository::new(&self.db, &self.files)
    }

    pub fn texts(&self) -> TextRepository<'_> {
        TextRepository::new(&self.db, &self.files)
    }

    pub fn musics(&self) -> MusicRepository<'_> {
        MusicRepository::new(&self.db, &self.files)
    }
}

/// Remove an asset file, logging rather than failing; the row goes regardless.
fn discard_file(files: &FileStorage, path: &str) {
    if path.is_empty() {
        return;
    }
    if let Err(e) = files.delete(path) {
        tracing::warn!("Failed to delete {}: {}", path, e);
    }
}

/// Pass `result` through; on error the file just written for it is removed.
fn keep_on_success<T>(files: &FileStorage, written: &Path, result: Result<T>) -> Result<T> {
    if result.is_err() {
        tracing::debug!("Removing {} after failed write", written.display());
        discard_file(files, &path_string(written));
    }
    result
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// In-memory database plus a temporary asset directory
    pub fn library() -> (Library, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        (Library::new(Arc::new(db), FileStorage::new(dir.path())), dir)
    }

    /// Number of files in one asset directory; 0 when it was never created
    pub fn file_count(dir: &tempfile::TempDir, sub_dir: &str) -> usize {
        std::fs::read_dir(dir.path().join(sub_dir)).map(|entries| entries.count()).unwrap_or(0)
    }
}
