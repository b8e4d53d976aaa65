//! Asset file storage
//!
//! Story text, images, audio and voice feature descriptors are kept as
//! files under a data directory; rows only record their paths.

use std::path::{Path, PathBuf};
use crate::features::VoiceFeatures;
use crate::record::now_millis;
use crate::Result;

pub const STORY_CONTENT_DIR: &str = "story_contents";
pub const STORY_IMAGE_DIR: &str = "story_images";
pub const AUDIO_DIR: &str = "audio_files";
pub const MUSIC_DIR: &str = "music_files";
pub const MFCC_DATA_DIR: &str = "mfcc_data";

/// File store rooted at one data directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{prefix}_{millis}_{8 hex chars}.{extension}`
    pub fn unique_file_name(prefix: &str, extension: &str) -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("{}_{}_{}.{}", prefix, now_millis(), &suffix[..8], extension)
    }

    fn write(&self, dir: &str, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let dir = self.root.join(dir);
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }
        let path = dir.join(file_name);
        std::fs::write(&path, bytes)?;
        tracing::debug!("Saved {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    pub fn save_text(&self, content: &str, file_name: Option<&str>) -> Result<PathBuf> {
        let name = file_name
            .map(str::to_string)
            .unwrap_or_else(|| Self::unique_file_name("story_content", "txt"));
        self.write(STORY_CONTENT_DIR, &name, content.as_bytes())
    }

    pub fn save_audio(&self, audio: &[u8], file_name: Option<&str>) -> Result<PathBuf> {
        let name = file_name
            .map(str::to_string)
            .unwrap_or_else(|| Self::unique_file_name("audio", "wav"));
        self.write(AUDIO_DIR, &name, audio)
    }

    /// Store already-encoded image bytes; `extension` names their format
    pub fn save_image(&self, image: &[u8], extension: &str, file_name: Option<&str>) -> Result<PathBuf> {
        let name = file_name
            .map(str::to_string)
            .unwrap_or_else(|| Self::unique_file_name("image", extension));
        self.write(STORY_IMAGE_DIR, &name, image)
    }

    pub fn save_music(&self, music: &[u8], file_name: Option<&str>) -> Result<PathBuf> {
        let name = file_name
            .map(str::to_string)
            .unwrap_or_else(|| Self::unique_file_name("music", "mp3"));
        self.write(MUSIC_DIR, &name, music)
    }

    pub fn save_voice_features(&self, features: &VoiceFeatures, file_name: Option<&str>) -> Result<PathBuf> {
        let name = file_name
            .map(str::to_string)
            .unwrap_or_else(|| Self::unique_file_name("voice_features", "json"));
        self.write(MFCC_DATA_DIR, &name, features.to_json().as_bytes())
    }

    pub fn read_text(&self, path: impl AsRef<Path>) -> Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Read a stored descriptor. Missing fields take the fallback values.
    pub fn read_voice_features(&self, path: impl AsRef<Path>) -> Result<VoiceFeatures> {
        let json = std::fs::read_to_string(path)?;
        Ok(VoiceFeatures::parse_lenient(&json))
    }

    /// Remove a file. `false` if it did not exist.
    pub fn delete(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("File does not exist: {}", path.display());
            return Ok(false);
        }
        std::fs::remove_file(path)?;
        tracing::debug!("Deleted {}", path.display());
        Ok(true)
    }
}

/// Path as stored in a row
pub fn path_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
