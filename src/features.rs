//! Voice feature descriptors and voice matching
//!
//! A voice is summarised by its pitch statistics and MFCC frames. Two
//! descriptors are compared with a weighted distance, turned into a
//! similarity in `(0, 1]`.

use serde::{Deserialize, Serialize};

/// Number of MFCC coefficients in a default frame
pub const MFCC_COEFFICIENTS: usize = 13;

/// Pitch statistics and MFCC frames of a voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceFeatures {
    pub average_pitch: f64,
    pub pitch_std_dev: f64,
    pub mfcc_values: Vec<Vec<f64>>,
}

/// Shape used for lenient parsing: every field may be missing.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialFeatures {
    average_pitch: Option<f64>,
    pitch_std_dev: Option<f64>,
    mfcc_values: Option<Vec<Vec<f64>>>,
}

fn zero_frame() -> Vec<Vec<f64>> {
    vec![vec![0.0; MFCC_COEFFICIENTS]]
}

/// One frame alternating `+amplitude`, `-amplitude`
fn alternating_frame(amplitude: f64) -> Vec<Vec<f64>> {
    let frame = (0..MFCC_COEFFICIENTS)
        .map(|i| if i % 2 == 0 { amplitude } else { -amplitude })
        .collect();
    vec![frame]
}

/// Built-in narrator voice with known pitch statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoicePreset {
    pub name: &'static str,
    /// Voice id at the text-to-speech provider (`elevenlabsVoiceId`)
    pub provider_id: &'static str,
    pub average_pitch: f64,
    pub pitch_std_dev: f64,
    mfcc_amplitude: f64,
}

pub const VOICE_PRESETS: &[VoicePreset] = &[
    VoicePreset { name: "rachel", provider_id: "21m00Tcm4TlvDq8ikWAM", average_pitch: 165.0, pitch_std_dev: 15.0, mfcc_amplitude: 1.0 },
    VoicePreset { name: "domi", provider_id: "AZnzlk1XvdvUeBnXmlld", average_pitch: 170.0, pitch_std_dev: 18.0, mfcc_amplitude: 0.8 },
    VoicePreset { name: "bella", provider_id: "EXAVITQu4vr4xnSDxMaL", average_pitch: 155.0, pitch_std_dev: 14.0, mfcc_amplitude: 0.7 },
    VoicePreset { name: "antoni", provider_id: "ErXwobaYiN019PkySvjV", average_pitch: 110.0, pitch_std_dev: 12.0, mfcc_amplitude: 0.5 },
    VoicePreset { name: "elli", provider_id: "MF3mGyEYCl7XYWbV9V6O", average_pitch: 160.0, pitch_std_dev: 16.0, mfcc_amplitude: 0.9 },
];

impl VoicePreset {
    pub fn by_provider_id(id: &str) -> Option<&'static VoicePreset> {
        VOICE_PRESETS.iter().find(|p| p.provider_id == id)
    }

    /// Case-insensitive lookup by voice type name
    pub fn by_name(name: &str) -> Option<&'static VoicePreset> {
        VOICE_PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Features of a provider voice, with its characteristic MFCC frame
    pub fn features(&self) -> VoiceFeatures {
        VoiceFeatures::new(self.average_pitch, self.pitch_std_dev, alternating_frame(self.mfcc_amplitude))
    }

    /// Pitch statistics only, over a zero frame
    pub fn pitch_features(&self) -> VoiceFeatures {
        VoiceFeatures::new(self.average_pitch, self.pitch_std_dev, zero_frame())
    }
}

impl VoiceFeatures {
    pub fn new(average_pitch: f64, pitch_std_dev: f64, mfcc_values: Vec<Vec<f64>>) -> Self {
        Self { average_pitch, pitch_std_dev, mfcc_values }
    }

    /// Descriptor used when a stored one cannot be read
    pub fn fallback() -> Self {
        Self::new(120.0, 15.0, zero_frame())
    }

    /// Descriptor of a voice that carries no feature data at all
    pub fn neutral() -> Self {
        Self::new(140.0, 15.0, zero_frame())
    }

    /// Strict parse; errors on malformed JSON or missing fields
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Parse, filling missing fields from [`VoiceFeatures::fallback`].
    /// Unparsable input yields the fallback descriptor.
    pub fn parse_lenient(json: &str) -> Self {
        match serde_json::from_str::<PartialFeatures>(json) {
            Ok(partial) => Self {
                average_pitch: partial.average_pitch.unwrap_or(120.0),
                pitch_std_dev: partial.pitch_std_dev.unwrap_or(15.0),
                mfcc_values: partial.mfcc_values.unwrap_or_else(zero_frame),
            },
            Err(e) => {
                tracing::warn!("Unparsable voice features, using defaults: {}", e);
                Self::fallback()
            }
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::json!({
            "averagePitch": self.average_pitch,
            "pitchStdDev": self.pitch_std_dev,
            "mfccValues": self.mfcc_values,
        })
        .to_string()
    }

    /// Similarity to `other` in `(0, 1]`; 1 means identical.
    ///
    /// Pitch distance is a scaled euclidean distance over mean and deviation.
    /// MFCC distance uses only the first frame of each side, over the shorter
    /// length. The two are combined 0.7 / 0.3.
    pub fn similarity(&self, other: &VoiceFeatures) -> f64 {
        let pitch_distance = ((self.average_pitch - other.average_pitch).powi(2) / 100.0
            + (self.pitch_std_dev - other.pitch_std_dev).powi(2) / 25.0)
            .sqrt();

        let mfcc_distance = match (self.mfcc_values.first(), other.mfcc_values.first()) {
            (Some(a), Some(b)) => {
                let len = a.len().min(b.len());
                if len == 0 {
                    0.0
                } else {
                    let sum: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
                    sum.sqrt() / len as f64
                }
            }
            _ => 0.0,
        };

        let combined = pitch_distance * 0.7 + mfcc_distance * 0.3;
        1.0 / (1.0 + combined)
    }
}

/// Identity of the candidate most similar to `target`.
///
/// Ties keep the earlier candidate. `None` when there are no candidates.
pub fn best_match(target: &VoiceFeatures, candidates: &[(i64, VoiceFeatures)]) -> Option<i64> {
    let (first_id, _) = candidates.first()?;
    let mut best = *first_id;
    let mut highest = 0.0;

    for (id, features) in candidates {
        let similarity = target.similarity(features);
        if similarity > highest {
            highest = similarity;
            best = *id;
        }
    }
    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_uses_camel_case_keys() {
        let features = VoiceFeatures::new(165.0, 15.0, vec![vec![1.0, -1.0]]);
        let json = features.to_json();
        assert!(json.contains("\"averagePitch\":165.0"));
        assert!(json.contains("\"mfccValues\":[[1.0,-1.0]]"));
        assert_eq!(VoiceFeatures::from_json(&json).unwrap(), features);
    }

    #[test]
    fn test_lenient_parse_fills_defaults() {
        let parsed = VoiceFeatures::parse_lenient(r#"{"averagePitch": 200.0}"#);
        assert_eq!(parsed.average_pitch, 200.0);
        assert_eq!(parsed.pitch_std_dev, 15.0);
        assert_eq!(parsed.mfcc_values, vec![vec![0.0; MFCC_COEFFICIENTS]]);
    }

    #[test]
    fn test_lenient_parse_of_garbage_is_fallback() {
        assert_eq!(VoiceFeatures::parse_lenient("not json"), VoiceFeatures::fallback());
    }

    #[test]
    fn test_identical_features_are_fully_similar() {
        let a = VoiceFeatures::new(150.0, 12.0, vec![vec![0.5; 13]]);
        assert!((a.similarity(&a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_similarity_values() {
        // pitch distance: sqrt(100/100 + 0) = 1, mfcc distance 0
        let a = VoiceFeatures::new(100.0, 10.0, vec![vec![0.0; 4]]);
        let b = VoiceFeatures::new(110.0, 10.0, vec![vec![0.0; 4]]);
        assert!((a.similarity(&b) - 1.0 / 1.7).abs() < 1e-12);

        // mfcc only: sqrt(4 * 1) / 4 = 0.5, combined 0.15
        let c = VoiceFeatures::new(100.0, 10.0, vec![vec![1.0; 4]]);
        assert!((a.similarity(&c) - 1.0 / 1.15).abs() < 1e-12);
    }

    #[test]
    fn test_empty_mfcc_contributes_nothing() {
        let a = VoiceFeatures::new(100.0, 10.0, vec![]);
        let b = VoiceFeatures::new(100.0, 10.0, vec![vec![3.0; 13]]);
        assert_eq!(a.similarity(&b), 1.0);
    }

    #[test]
    fn test_best_match_picks_closest() {
        let target = VoiceFeatures::new(160.0, 16.0, vec![vec![0.0; 13]]);
        let candidates = vec![
            (1, VoiceFeatures::new(110.0, 12.0, vec![vec![0.0; 13]])),
            (2, VoiceFeatures::new(165.0, 15.0, vec![vec![0.0; 13]])),
            (3, VoiceFeatures::new(170.0, 18.0, vec![vec![0.0; 13]])),
        ];
        assert_eq!(best_match(&target, &candidates), Some(2));
    }

    #[test]
    fn test_best_match_ties_keep_first() {
        let target = VoiceFeatures::neutral();
        let candidates = vec![(7, VoiceFeatures::neutral()), (8, VoiceFeatures::neutral())];
        assert_eq!(best_match(&target, &candidates), Some(7));
        assert_eq!(best_match(&target, &[]), None);
    }

    #[test]
    fn test_presets_by_id_and_name() {
        let elli = VoicePreset::by_provider_id("MF3mGyEYCl7XYWbV9V6O").unwrap();
        assert_eq!(elli.name, "elli");
        let features = elli.features();
        assert_eq!((features.average_pitch, features.pitch_std_dev), (160.0, 16.0));
        assert_eq!(&features.mfcc_values[0][..2], &[0.9, -0.9]);

        assert_eq!(VoicePreset::by_name("Antoni").unwrap().pitch_features().average_pitch, 110.0);
        assert!(VoicePreset::by_provider_id("unknown").is_none());
        assert!(VoicePreset::by_name("nobody").is_none());
    }
}
