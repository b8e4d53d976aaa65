//! Record types - one plain struct per stored asset kind
//!
//! Five kinds are persisted, each in its own table:
//! - `FairyTale`: a finished story, referencing one of each other kind
//! - `Voice`: a narration voice sample plus its feature metadata
//! - `Image`: the picture a story was generated from
//! - `Text`: the generated story text (stored as a file)
//! - `Music`: background music, tagged with a genre

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Current time as epoch milliseconds, the unit of every `created_at`.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// The five asset kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    FairyTale,
    Voice,
    Image,
    Text,
    Music,
}

impl AssetKind {
    /// Get the string representation of the asset kind
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::FairyTale => "fairy_tale",
            AssetKind::Voice => "voice",
            AssetKind::Image => "image",
            AssetKind::Text => "text",
            AssetKind::Music => "music",
        }
    }

    /// Name of the table holding this kind
    pub fn table(&self) -> &'static str {
        match self {
            AssetKind::FairyTale => "fairy_tales",
            AssetKind::Voice => "voices",
            AssetKind::Image => "images",
            AssetKind::Text => "texts",
            AssetKind::Music => "musics",
        }
    }

    /// Get all asset kinds
    pub fn all() -> &'static [AssetKind] {
        &[
            AssetKind::FairyTale,
            AssetKind::Voice,
            AssetKind::Image,
            AssetKind::Text,
            AssetKind::Music,
        ]
    }
}

impl FromStr for AssetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "fairy_tale" | "fairy_tales" | "fairytale" | "tale" | "tales" | "story" | "stories" => {
                Ok(AssetKind::FairyTale)
            }
            "voice" | "voices" | "narrator" => Ok(AssetKind::Voice),
            "image" | "images" | "picture" | "photo" => Ok(AssetKind::Image),
            "text" | "texts" => Ok(AssetKind::Text),
            "music" | "musics" | "song" | "songs" => Ok(AssetKind::Music),
            _ => Err(Error::UnknownKind(s.to_string())),
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A generated fairy tale.
///
/// The four references are soft: nothing stops the referenced rows from
/// being deleted while the tale still points at them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FairyTale {
    /// Identity; `None` until the store assigns one
    pub id: Option<i64>,
    pub title: String,
    pub voice_id: i64,
    pub image_id: i64,
    pub text_id: i64,
    pub music_id: i64,
    /// Free-form JSON attributes (theme, narration audio path, voice features)
    pub attribute: String,
    /// Epoch milliseconds
    pub created_at: i64,
}

impl FairyTale {
    pub fn new(
        title: impl Into<String>,
        voice_id: i64,
        image_id: i64,
        text_id: i64,
        music_id: i64,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            voice_id,
            image_id,
            text_id,
            music_id,
            attribute: attribute.into(),
            created_at: now_millis(),
        }
    }

    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }
}

/// A narration voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub id: Option<i64>,
    pub title: String,
    /// Path of the stored voice sample
    pub voice_path: String,
    /// Voice metadata, usually a JSON object with a feature descriptor
    pub attribute: String,
    pub created_at: i64,
}

impl Voice {
    pub fn new(
        title: impl Into<String>,
        voice_path: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            voice_path: voice_path.into(),
            attribute: attribute.into(),
            created_at: now_millis(),
        }
    }

    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }
}

/// A source image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: Option<i64>,
    pub title: String,
    pub image_path: String,
    pub created_at: i64,
}

impl Image {
    pub fn new(title: impl Into<String>, image_path: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            image_path: image_path.into(),
            created_at: now_millis(),
        }
    }

    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Story text; the content itself lives in the file at `text_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub id: Option<i64>,
    pub text_path: String,
    pub created_at: i64,
}

impl Text {
    pub fn new(text_path: impl Into<String>) -> Self {
        Self {
            id: None,
            text_path: text_path.into(),
            created_at: now_millis(),
        }
    }

    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Background music.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Music {
    pub id: Option<i64>,
    pub title: String,
    pub music_path: String,
    /// Genre label
    pub attribute: String,
    pub created_at: i64,
}

impl Music {
    pub fn new(
        title: impl Into<String>,
        music_path: impl Into<String>,
        genre: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            music_path: music_path.into(),
            attribute: genre.into(),
            created_at: now_millis(),
        }
    }

    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_aliases() {
        assert_eq!("tale".parse::<AssetKind>().unwrap(), AssetKind::FairyTale);
        assert_eq!("Fairy-Tale".parse::<AssetKind>().unwrap(), AssetKind::FairyTale);
        assert_eq!("songs".parse::<AssetKind>().unwrap(), AssetKind::Music);
        assert!(matches!("video".parse::<AssetKind>(), Err(Error::UnknownKind(_))));
    }

    #[test]
    fn test_kind_tables_are_distinct() {
        let mut tables: Vec<_> = AssetKind::all().iter().map(|k| k.table()).collect();
        tables.sort();
        tables.dedup();
        assert_eq!(tables.len(), 5);
    }

    #[test]
    fn test_new_records_have_no_identity() {
        let voice = Voice::new("Narrator", "/voices/a.wav", "calm");
        assert!(voice.id.is_none());
        assert!(voice.created_at > 0);

        let image = Image::new("Forest", "/img/a.jpg").with_created_at(7);
        assert_eq!(image.created_at, 7);
    }
}
