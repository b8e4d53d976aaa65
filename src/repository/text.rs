use crate::files::{path_string, FileStorage};
use crate::record::Text;
use crate::storage::Database;
use crate::Result;
use super::{discard_file, keep_on_success};

/// Story texts: content file plus row
pub struct TextRepository<'a> {
    db: &'a Database,
    files: &'a FileStorage,
}

impl<'a> TextRepository<'a> {
    pub fn new(db: &'a Database, files: &'a FileStorage) -> Self {
        Self { db, files }
    }

    /// Write `content` to a new file and record it
    pub fn save(&self, content: &str) -> Result<i64> {
        let path = self.files.save_text(content, None)?;
        let id = keep_on_success(self.files, &path, self.db.texts().insert(&Text::new(path_string(&path))))?;
        tracing::info!("Saved text {} at {}", id, path.display());
        Ok(id)
    }

    pub fn get(&self, id: i64) -> Result<Option<Text>> {
        self.db.texts().find_by_id(id)
    }

    /// The record and its file content. An unreadable file reads as empty.
    pub fn get_with_content(&self, id: i64) -> Result<Option<(Text, String)>> {
        let Some(text) = self.db.texts().find_by_id(id)? else {
            return Ok(None);
        };
        let content = match self.files.read_text(&text.text_path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Could not read text {} at {}: {}", id, text.text_path, e);
                String::new()
            }
        };
        Ok(Some((text, content)))
    }

    pub fn all(&self) -> Result<Vec<Text>> {
        self.db.texts().all()
    }

    /// Remove the content file and the row. `false` if there was no such text.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let Some(text) = self.db.texts().find_by_id(id)? else {
            return Ok(false);
        };
        discard_file(self.files, &text.text_path);
        Ok(self.db.texts().delete(id)? > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::files::STORY_CONTENT_DIR;
    use crate::repository::testing::{file_count, library};

    #[test]
    fn test_save_and_read_content() {
        let (library, _dir) = library();
        let id = library.texts().save("The fox and the moon").unwrap();

        let (text, content) = library.texts().get_with_content(id).unwrap().unwrap();
        assert_eq!(text.id, Some(id));
        assert_eq!(content, "The fox and the moon");
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let (library, _dir) = library();
        let id = library.texts().save("gone soon").unwrap();
        let text = library.texts().get(id).unwrap().unwrap();
        std::fs::remove_file(&text.text_path).unwrap();

        let (_, content) = library.texts().get_with_content(id).unwrap().unwrap();
        assert!(content.is_empty());
    }

    #[test]
    fn test_delete_removes_file_and_row() {
        let (library, _dir) = library();
        let id = library.texts().save("short").unwrap();
        let path = library.texts().get(id).unwrap().unwrap().text_path;

        assert!(library.texts().delete(id).unwrap());
        assert!(!std::path::Path::new(&path).exists());
        assert!(library.texts().get_with_content(id).unwrap().is_none());
        assert!(!library.texts().delete(id).unwrap());
    }

    #[test]
    fn test_failed_insert_removes_content_file() {
        let (library, dir) = library();
        library.database().lock().unwrap().execute("DROP TABLE texts", []).unwrap();

        assert!(library.texts().save("never recorded").is_err());
        assert_eq!(file_count(&dir, STORY_CONTENT_DIR), 0);
    }
}
