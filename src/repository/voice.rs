use serde_json::Value;
use crate::features::{self, VoiceFeatures, VoicePreset};
use crate::files::{path_string, FileStorage};
use crate::record::Voice;
use crate::storage::Database;
use crate::{Error, Result};
use super::{discard_file, keep_on_success};

/// Attribute key naming the stored feature descriptor file
pub const FEATURES_PATH_KEY: &str = "voiceFeaturesPath";

/// Attribute key holding the text-to-speech provider's voice id
pub const PROVIDER_ID_KEY: &str = "elevenlabsVoiceId";

/// Attribute key holding a preset voice type name
pub const VOICE_TYPE_KEY: &str = "voiceType";

/// Narration voices: voice sample, feature descriptor file, and row
pub struct VoiceRepository<'a> {
    db: &'a Database,
    files: &'a FileStorage,
}

impl<'a> VoiceRepository<'a> {
    pub fn new(db: &'a Database, files: &'a FileStorage) -> Self {
        Self { db, files }
    }

    /// Store a voice sample with its features.
    ///
    /// When `attribute_json` is a JSON object, the path of the written
    /// descriptor is added to it under `voiceFeaturesPath`.
    pub fn save(
        &self,
        title: &str,
        attribute_json: &str,
        audio: &[u8],
        features: &VoiceFeatures,
    ) -> Result<i64> {
        if title.trim().is_empty() {
            return Err(Error::InvalidRecord("voice title must not be blank".to_string()));
        }

        let voice_path = self.files.save_audio(audio, None)?;
        let features_path = keep_on_success(self.files, &voice_path, self.files.save_voice_features(features, None))?;

        let attribute = match serde_json::from_str::<Value>(attribute_json) {
            Ok(Value::Object(mut map)) => {
                map.insert(FEATURES_PATH_KEY.to_string(), Value::String(path_string(&features_path)));
                Value::Object(map).to_string()
            }
            _ => attribute_json.to_string(),
        };

        let inserted = self.db.voices().insert(&Voice::new(title, path_string(&voice_path), attribute));
        let id = keep_on_success(self.files, &features_path, keep_on_success(self.files, &voice_path, inserted))?;
        tracing::info!("Saved voice {} '{}'", id, title);
        Ok(id)
    }

    pub fn get(&self, id: i64) -> Result<Option<Voice>> {
        self.db.voices().find_by_id(id)
    }

    pub fn all(&self) -> Result<Vec<Voice>> {
        self.db.voices().all()
    }

    /// Change only the title. `false` if there was no such voice.
    pub fn rename(&self, id: i64, title: &str) -> Result<bool> {
        let Some(voice) = self.db.voices().find_by_id(id)? else {
            return Ok(false);
        };
        let renamed = Voice { title: title.to_string(), ..voice };
        let changed = self.db.voices().update(&renamed)? > 0;
        tracing::info!("Renamed voice {} to '{}': {}", id, title, changed);
        Ok(changed)
    }

    /// Remove the sample, its descriptor file and the row
    pub fn delete(&self, id: i64) -> Result<bool> {
        let Some(voice) = self.db.voices().find_by_id(id)? else {
            return Ok(false);
        };
        discard_file(self.files, &voice.voice_path);
        if let Some(path) = features_path(&voice) {
            discard_file(self.files, &path);
        }
        Ok(self.db.voices().delete(id)? > 0)
    }

    /// Features of a stored voice; neutral when the voice or its data is missing
    pub fn features(&self, id: i64) -> Result<VoiceFeatures> {
        match self.db.voices().find_by_id(id)? {
            Some(voice) => Ok(self.features_of(&voice)),
            None => Ok(VoiceFeatures::neutral()),
        }
    }

    /// Features from the descriptor file named in the attribute, else from
    /// pitch values inline in the attribute, else from the preset named by
    /// the provider voice id or voice type, else neutral.
    pub fn features_of(&self, voice: &Voice) -> VoiceFeatures {
        let Ok(Value::Object(attr)) = serde_json::from_str::<Value>(&voice.attribute) else {
            return VoiceFeatures::neutral();
        };

        if let Some(path) = attr.get(FEATURES_PATH_KEY).and_then(Value::as_str) {
            return match self.files.read_voice_features(path) {
                Ok(features) => features,
                Err(e) => {
                    tracing::warn!("Could not read features of voice {:?} at {}: {}", voice.id, path, e);
                    VoiceFeatures::neutral()
                }
            };
        }

        if let (Some(average_pitch), Some(pitch_std_dev)) = (
            attr.get("averagePitch").and_then(Value::as_f64),
            attr.get("pitchStdDev").and_then(Value::as_f64),
        ) {
            let mfcc_values = attr
                .get("mfccValues")
                .and_then(|v| serde_json::from_value::<Vec<Vec<f64>>>(v.clone()).ok())
                .unwrap_or_else(|| VoiceFeatures::neutral().mfcc_values);
            return VoiceFeatures::new(average_pitch, pitch_std_dev, mfcc_values);
        }

        let by_id = attr.get(PROVIDER_ID_KEY).and_then(Value::as_str).and_then(VoicePreset::by_provider_id);
        if let Some(preset) = by_id {
            return preset.features();
        }
        match attr.get(VOICE_TYPE_KEY).and_then(Value::as_str).and_then(VoicePreset::by_name) {
            Some(preset) => preset.pitch_features(),
            None => VoiceFeatures::neutral(),
        }
    }

    /// The stored voice closest to `target`; `None` when no voices exist
    pub fn recommend(&self, target: &VoiceFeatures) -> Result<Option<i64>> {
        let candidates: Vec<(i64, VoiceFeatures)> = self
            .all()?
            .iter()
            .filter_map(|voice| voice.id.map(|id| (id, self.features_of(voice))))
            .collect();

        let best = features::best_match(target, &candidates);
        tracing::debug!("Recommended voice {:?} out of {}", best, candidates.len());
        Ok(best)
    }
}

fn features_path(voice: &Voice) -> Option<String> {
    match serde_json::from_str::<Value>(&voice.attribute) {
        Ok(Value::Object(attr)) => attr.get(FEATURES_PATH_KEY).and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::{AUDIO_DIR, MFCC_DATA_DIR};
    use crate::repository::testing::{file_count, library};

    fn features(pitch: f64, std_dev: f64) -> VoiceFeatures {
        VoiceFeatures::new(pitch, std_dev, vec![vec![0.0; 13]])
    }

    #[test]
    fn test_blank_title_is_rejected() {
        let (library, _dir) = library();
        let result = library.voices().save("  ", "{}", b"wav", &features(140.0, 15.0));
        assert!(matches!(result, Err(Error::InvalidRecord(_))));
        assert_eq!(library.database().stats().unwrap().voices, 0);
    }

    #[test]
    fn test_saved_features_are_read_back() {
        let (library, _dir) = library();
        let stored = features(165.0, 15.0);
        let id = library.voices().save("Rachel", r#"{"gender":"female"}"#, b"wav", &stored).unwrap();

        let voice = library.voices().get(id).unwrap().unwrap();
        assert!(voice.attribute.contains("\"gender\":\"female\""));
        assert!(voice.attribute.contains(FEATURES_PATH_KEY));
        assert_eq!(library.voices().features(id).unwrap(), stored);
    }

    #[test]
    fn test_non_object_attribute_is_kept_verbatim() {
        let (library, _dir) = library();
        let id = library.voices().save("Plain", "calm", b"wav", &features(120.0, 10.0)).unwrap();
        let voice = library.voices().get(id).unwrap().unwrap();
        assert_eq!(voice.attribute, "calm");
        assert_eq!(library.voices().features(id).unwrap(), VoiceFeatures::neutral());
    }

    #[test]
    fn test_inline_features_in_attribute() {
        let (library, _dir) = library();
        let voice = Voice::new("Inline", "/v.wav", r#"{"averagePitch":110.0,"pitchStdDev":12.0}"#);
        let id = library.database().voices().insert(&voice).unwrap();

        let found = library.voices().features(id).unwrap();
        assert_eq!(found.average_pitch, 110.0);
        assert_eq!(found.pitch_std_dev, 12.0);
        assert_eq!(found.mfcc_values, vec![vec![0.0; 13]]);
    }

    #[test]
    fn test_missing_voice_has_neutral_features() {
        let (library, _dir) = library();
        assert_eq!(library.voices().features(404).unwrap(), VoiceFeatures::neutral());
    }

    #[test]
    fn test_rename_keeps_other_fields() {
        let (library, _dir) = library();
        let id = library.voices().save("Old", "{}", b"wav", &features(140.0, 15.0)).unwrap();
        let before = library.voices().get(id).unwrap().unwrap();

        assert!(library.voices().rename(id, "New").unwrap());
        let after = library.voices().get(id).unwrap().unwrap();
        assert_eq!(after.title, "New");
        assert_eq!(after.voice_path, before.voice_path);
        assert_eq!(after.created_at, before.created_at);
        assert!(!library.voices().rename(999, "Nobody").unwrap());
    }

    #[test]
    fn test_delete_removes_sample_and_descriptor() {
        let (library, _dir) = library();
        let id = library.voices().save("Temp", "{}", b"wav", &features(140.0, 15.0)).unwrap();
        let voice = library.voices().get(id).unwrap().unwrap();
        let descriptor = features_path(&voice).unwrap();

        assert!(library.voices().delete(id).unwrap());
        assert!(!std::path::Path::new(&voice.voice_path).exists());
        assert!(!std::path::Path::new(&descriptor).exists());
        assert!(!library.voices().delete(id).unwrap());
    }

    #[test]
    fn test_recommend_closest_voice() {
        let (library, _dir) = library();
        assert_eq!(library.voices().recommend(&features(160.0, 16.0)).unwrap(), None);

        library.voices().save("Antoni", "{}", b"a", &features(110.0, 12.0)).unwrap();
        let elli = library.voices().save("Elli", "{}", b"e", &features(160.0, 16.0)).unwrap();
        library.voices().save("Domi", "{}", b"d", &features(170.0, 18.0)).unwrap();

        assert_eq!(library.voices().recommend(&features(158.0, 16.0)).unwrap(), Some(elli));
    }

    #[test]
    fn test_failed_insert_leaves_no_files() {
        let (library, dir) = library();
        library.database().lock().unwrap().execute("DROP TABLE voices", []).unwrap();

        let result = library.voices().save("Orphan", "{}", b"wav", &features(140.0, 15.0));
        assert!(matches!(result, Err(Error::Storage(_))));
        assert_eq!(file_count(&dir, AUDIO_DIR), 0);
        assert_eq!(file_count(&dir, MFCC_DATA_DIR), 0);
    }

    #[test]
    fn test_preset_voice_wins_over_neutral() {
        let (library, _dir) = library();
        let voices = library.database().voices();
        voices.insert(&Voice::new("Plain", "/v/plain.wav", "{}")).unwrap();
        let elli = voices
            .insert(&Voice::new("Elli", "/v/elli.wav", r#"{"elevenlabsVoiceId":"MF3mGyEYCl7XYWbV9V6O"}"#))
            .unwrap();
        let antoni = voices.insert(&Voice::new("Antoni", "/v/antoni.wav", r#"{"voiceType":"antoni"}"#)).unwrap();

        assert_eq!(library.voices().features(elli).unwrap().average_pitch, 160.0);
        assert_eq!(library.voices().features(antoni).unwrap().average_pitch, 110.0);
        assert_eq!(library.voices().recommend(&features(160.0, 16.0)).unwrap(), Some(elli));
        assert_eq!(library.voices().recommend(&features(112.0, 12.0)).unwrap(), Some(antoni));
    }
}
