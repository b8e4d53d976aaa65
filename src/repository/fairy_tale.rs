use serde_json::{json, Map, Value};
use crate::features::VoiceFeatures;
use crate::files::{path_string, FileStorage};
use crate::record::{AssetKind, FairyTale};
use crate::storage::Database;
use crate::{Error, Result};
use super::{discard_file, keep_on_success};
use super::text::TextRepository;

/// Attribute key holding the narration audio path
pub const AUDIO_PATH_KEY: &str = "audioPath";

/// Shown when a tale's text row or file is gone
pub const MISSING_CONTENT: &str = "No story content available.";

/// Keys a re-voiced tale never inherits from its original
const VERSION_KEYS: &[&str] = &[
    AUDIO_PATH_KEY,
    "isRecommendedVoiceVersion",
    "isSelectedVoiceVersion",
    "voiceIdChanged",
];

/// Everything needed to save a freshly generated tale
#[derive(Debug, Clone)]
pub struct NewTale<'a> {
    pub title: &'a str,
    pub voice_id: i64,
    pub image_id: i64,
    pub text_id: i64,
    pub music_id: i64,
    pub theme: &'a str,
    /// Narration audio
    pub audio: &'a [u8],
    pub features: &'a VoiceFeatures,
}

/// How the voice of a re-narrated tale was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceChoice {
    Recommended,
    Selected,
}

impl VoiceChoice {
    fn file_prefix(&self) -> &'static str {
        match self {
            VoiceChoice::Recommended => "recommended_voice_audio",
            VoiceChoice::Selected => "selected_voice_audio",
        }
    }

    fn voice_key(&self) -> &'static str {
        match self {
            VoiceChoice::Recommended => "recommendedVoiceId",
            VoiceChoice::Selected => "selectedVoiceId",
        }
    }

    fn creation_method(&self) -> &'static str {
        match self {
            VoiceChoice::Recommended => "ai_recommended_voice",
            VoiceChoice::Selected => "user_selected_voice",
        }
    }
}

/// Fairy tales: narration audio file plus row. Referenced rows are left alone.
pub struct FairyTaleRepository<'a> {
    db: &'a Database,
    files: &'a FileStorage,
}

impl<'a> FairyTaleRepository<'a> {
    pub fn new(db: &'a Database, files: &'a FileStorage) -> Self {
        Self { db, files }
    }

    /// Store the narration and a new tale whose attribute carries the theme,
    /// audio path and narrator features.
    pub fn save(&self, tale: &NewTale<'_>) -> Result<i64> {
        tracing::info!("Saving fairy tale '{}' with voice {}", tale.title, tale.voice_id);
        let audio_path = self.files.save_audio(tale.audio, None)?;

        let attribute = json!({
            "theme": tale.theme,
            "audioPath": path_string(&audio_path),
            "averagePitch": tale.features.average_pitch,
            "pitchStdDev": tale.features.pitch_std_dev,
            "mfccValues": tale.features.mfcc_values,
        });

        let record = FairyTale::new(
            tale.title,
            tale.voice_id,
            tale.image_id,
            tale.text_id,
            tale.music_id,
            attribute.to_string(),
        );
        let id = keep_on_success(self.files, &audio_path, self.db.fairy_tales().insert(&record))?;
        tracing::info!("Fairy tale saved with id {}", id);
        Ok(id)
    }

    pub fn get(&self, id: i64) -> Result<Option<FairyTale>> {
        self.db.fairy_tales().find_by_id(id)
    }

    /// The tale and its story text
    pub fn get_with_text(&self, id: i64) -> Result<(FairyTale, String)> {
        let tale = self
            .db
            .fairy_tales()
            .find_by_id(id)?
            .ok_or(Error::NotFound { kind: AssetKind::FairyTale, id })?;

        let content = TextRepository::new(self.db, self.files)
            .get_with_content(tale.text_id)?
            .map(|(_, content)| content)
            .unwrap_or_else(|| MISSING_CONTENT.to_string());
        Ok((tale, content))
    }

    /// All tales, newest first
    pub fn all(&self) -> Result<Vec<FairyTale>> {
        self.db.fairy_tales().all()
    }

    /// Write `tale` back. With `new_audio`, the narration is written to a new
    /// file and `audioPath` points at it; the old file goes only once the row
    /// has been updated. If no row changed, the new file is removed instead.
    pub fn update(&self, tale: &FairyTale, new_audio: Option<&[u8]>) -> Result<bool> {
        let Some(audio) = new_audio else {
            return Ok(self.db.fairy_tales().update(tale)? > 0);
        };

        let mut attr = attribute_object(&tale.attribute)?;
        let old_path = attr.get(AUDIO_PATH_KEY).and_then(Value::as_str).map(str::to_string);
        let new_path = self.files.save_audio(audio, None)?;
        attr.insert(AUDIO_PATH_KEY.to_string(), Value::String(path_string(&new_path)));
        let updated = FairyTale { attribute: Value::Object(attr).to_string(), ..tale.clone() };

        let changed = keep_on_success(self.files, &new_path, self.db.fairy_tales().update(&updated))? > 0;
        if changed {
            if let Some(old) = old_path {
                discard_file(self.files, &old);
            }
        } else {
            tracing::warn!("Fairy tale {:?} not updated; dropping new narration", tale.id);
            discard_file(self.files, &path_string(&new_path));
        }
        Ok(changed)
    }

    /// Remove the narration file named in the attribute, then the row.
    /// The referenced voice, image, text and music rows stay.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let Some(tale) = self.db.fairy_tales().find_by_id(id)? else {
            return Ok(false);
        };

        match audio_path(&tale) {
            Some(path) => discard_file(self.files, &path),
            None => tracing::warn!("Fairy tale {} has no readable audio path", id),
        }
        Ok(self.db.fairy_tales().delete(id)? > 0)
    }

    /// Save a copy of `original_id` narrated by `voice_id`.
    ///
    /// The copy shares the original's image, text and music, inherits its
    /// attributes except the version keys, and records where it came from.
    pub fn revoice(
        &self,
        original_id: i64,
        voice_id: i64,
        new_title: &str,
        audio: &[u8],
        choice: VoiceChoice,
    ) -> Result<i64> {
        let original = self
            .db
            .fairy_tales()
            .find_by_id(original_id)?
            .ok_or(Error::NotFound { kind: AssetKind::FairyTale, id: original_id })?;
        let voice = self
            .db
            .voices()
            .find_by_id(voice_id)?
            .ok_or(Error::NotFound { kind: AssetKind::Voice, id: voice_id })?;
        tracing::info!("Re-voicing tale {} with voice {} '{}'", original_id, voice_id, voice.title);

        let mut attr: Map<String, Value> = attribute_object(&original.attribute)?
            .into_iter()
            .filter(|(key, _)| !VERSION_KEYS.contains(&key.as_str()))
            .collect();

        let file_name = FileStorage::unique_file_name(choice.file_prefix(), "wav");
        let audio_path = self.files.save_audio(audio, Some(&file_name))?;
        attr.insert(AUDIO_PATH_KEY.to_string(), json!(path_string(&audio_path)));
        attr.insert("isRecommendedVoiceVersion".to_string(), json!(choice == VoiceChoice::Recommended));
        attr.insert("isSelectedVoiceVersion".to_string(), json!(choice == VoiceChoice::Selected));
        attr.insert("originalStoryId".to_string(), json!(original_id));
        attr.insert("voiceIdChanged".to_string(), json!(true));
        attr.insert("previousVoiceId".to_string(), json!(original.voice_id));
        attr.insert(choice.voice_key().to_string(), json!(voice_id));
        attr.insert("creationMethod".to_string(), json!(choice.creation_method()));

        let copy = FairyTale::new(
            new_title,
            voice_id,
            original.image_id,
            original.text_id,
            original.music_id,
            Value::Object(attr).to_string(),
        );
        let id = keep_on_success(self.files, &audio_path, self.db.fairy_tales().insert(&copy))?;
        tracing::info!("Created re-voiced tale {}", id);
        Ok(id)
    }
}

fn attribute_object(attribute: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(attribute)? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::InvalidRecord("fairy tale attribute is not a JSON object".to_string())),
    }
}

/// Narration audio path recorded in a tale's attribute
pub fn audio_path(tale: &FairyTale) -> Option<String> {
    attribute_object(&tale.attribute)
        .ok()?
        .get(AUDIO_PATH_KEY)
        .and_then(Value::as_str)
        .map(str::to_string)
}
