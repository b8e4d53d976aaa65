use crate::files::{path_string, FileStorage};
use crate::record::Music;
use crate::storage::Database;
use crate::Result;
use super::{discard_file, keep_on_success};

/// Background music: audio file plus row, genre kept in the attribute column
pub struct MusicRepository<'a> {
    db: &'a Database,
    files: &'a FileStorage,
}

impl<'a> MusicRepository<'a> {
    pub fn new(db: &'a Database, files: &'a FileStorage) -> Self {
        Self { db, files }
    }

    pub fn save(&self, title: &str, genre: &str, music: &[u8]) -> Result<i64> {
        let path = self.files.save_music(music, None)?;
        let id = keep_on_success(self.files, &path, self.db.musics().insert(&Music::new(title, path_string(&path), genre)))?;
        tracing::info!("Saved music {} '{}' ({})", id, title, genre);
        Ok(id)
    }

    pub fn get(&self, id: i64) -> Result<Option<Music>> {
        self.db.musics().find_by_id(id)
    }

    pub fn all(&self) -> Result<Vec<Music>> {
        self.db.musics().all()
    }

    pub fn by_genre(&self, genre: &str) -> Result<Vec<Music>> {
        self.db.musics().by_genre(genre)
    }

    pub fn delete(&self, id: i64) -> Result<bool> {
        let Some(music) = self.db.musics().find_by_id(id)? else {
            return Ok(false);
        };
        discard_file(self.files, &music.music_path);
        Ok(self.db.musics().delete(id)? > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::testing::library;

    #[test]
    fn test_genre_lookup() {
        let (library, _dir) = library();
        library.musics().save("Lullaby", "calm", b"a").unwrap();
        let march = library.musics().save("March", "upbeat", b"b").unwrap();

        let upbeat = library.musics().by_genre("upbeat").unwrap();
        assert_eq!(upbeat.len(), 1);
        assert_eq!(upbeat[0].id, Some(march));
        assert_eq!(library.musics().all().unwrap().len(), 2);
    }

    #[test]
    fn test_delete_removes_audio() {
        let (library, _dir) = library();
        let id = library.musics().save("Rain", "ambient", b"mp3").unwrap();
        let path = library.musics().get(id).unwrap().unwrap().music_path;
        assert!(std::path::Path::new(&path).exists());

        assert!(library.musics().delete(id).unwrap());
        assert!(!std::path::Path::new(&path).exists());
    }
}
