use crate::files::{path_string, FileStorage};
use crate::record::Image;
use crate::storage::Database;
use crate::Result;
use super::{discard_file, keep_on_success};

/// Source images: encoded image file plus row
pub struct ImageRepository<'a> {
    db: &'a Database,
    files: &'a FileStorage,
}

impl<'a> ImageRepository<'a> {
    pub fn new(db: &'a Database, files: &'a FileStorage) -> Self {
        Self { db, files }
    }

    /// Store encoded image bytes (`extension` names the format) and record them
    pub fn save(&self, title: &str, image: &[u8], extension: &str) -> Result<i64> {
        let path = self.files.save_image(image, extension, None)?;
        let id = keep_on_success(self.files, &path, self.db.images().insert(&Image::new(title, path_string(&path))))?;
        tracing::info!("Saved image {} '{}'", id, title);
        Ok(id)
    }

    pub fn get(&self, id: i64) -> Result<Option<Image>> {
        self.db.images().find_by_id(id)
    }

    pub fn all(&self) -> Result<Vec<Image>> {
        self.db.images().all()
    }

    pub fn delete(&self, id: i64) -> Result<bool> {
        let Some(image) = self.db.images().find_by_id(id)? else {
            return Ok(false);
        };
        discard_file(self.files, &image.image_path);
        Ok(self.db.images().delete(id)? > 0)
    }
}
