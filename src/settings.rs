//! Runtime configuration for detection, the fallback classifier, and
//! verse enrichment. Every field has a serde default so partial config
//! files keep working across releases.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CLASSIFIER_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_CLASSIFIER_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_TRANSLATION: &str = "KJV";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Seconds a surfaced reference stays suppressed.
    pub cooldown_secs: u64,
    /// Cache size above which expired cooldown entries are pruned.
    pub cooldown_prune_threshold: usize,
    /// Classifier results below this score are discarded.
    pub classifier_min_confidence: f32,
    /// Concurrent verse-text lookups during enrichment.
    pub enrichment_concurrency: usize,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            cooldown_secs: 60,
            cooldown_prune_threshold: 256,
            classifier_min_confidence: 0.6,
            enrichment_concurrency: 4,
        }
    }
}

impl DetectionSettings {
    pub fn cooldown_window(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Transcripts shorter than this never reach the classifier.
    pub min_transcript_chars: usize,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CLASSIFIER_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_CLASSIFIER_MODEL.to_string(),
            min_transcript_chars: 20,
        }
    }
}

impl ClassifierSettings {
    /// Environment override wins over configured value, which wins over
    /// the default endpoint.
    pub fn effective_base_url(&self) -> String {
        if let Ok(url) = std::env::var("LECTERN_CLASSIFIER_BASE_URL") {
            if !url.trim().is_empty() {
                return url;
            }
        }
        if self.base_url.trim().is_empty() {
            DEFAULT_CLASSIFIER_BASE_URL.to_string()
        } else {
            self.base_url.clone()
        }
    }

    pub fn effective_api_key(&self) -> String {
        if let Ok(key) = std::env::var("LECTERN_CLASSIFIER_API_KEY") {
            if !key.trim().is_empty() {
                return key;
            }
        }
        self.api_key.clone()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerseLookupSettings {
    pub base_url: String,
    pub translation: String,
}

impl Default for VerseLookupSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            translation: DEFAULT_TRANSLATION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let detection = DetectionSettings::default();
        assert_eq!(detection.cooldown_window(), Duration::from_secs(60));
        assert_eq!(detection.classifier_min_confidence, 0.6);

        let classifier = ClassifierSettings::default();
        assert_eq!(classifier.model, DEFAULT_CLASSIFIER_MODEL);
        assert_eq!(classifier.min_transcript_chars, 20);
    }

    #[test]
    fn test_partial_config_deserializes() {
        let detection: DetectionSettings =
            serde_json::from_str(r#"{"cooldown_secs": 30}"#).unwrap();
        assert_eq!(detection.cooldown_secs, 30);
        assert_eq!(detection.enrichment_concurrency, 4);
    }
}
