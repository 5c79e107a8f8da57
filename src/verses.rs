//! Verse-text enrichment.
//!
//! Detections carry the verse text when a lookup backend is configured;
//! enrichment is strictly best-effort and a failed lookup never blocks
//! or drops a detection.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::EnrichmentError;
use crate::settings::VerseLookupSettings;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VerseText {
    pub text: String,
    #[serde(default)]
    pub translation: Option<String>,
}

#[async_trait]
pub trait VerseLookup: Send + Sync {
    /// Fetches the text for a canonical reference string. `Ok(None)`
    /// means the backend does not carry that passage.
    async fn lookup(&self, reference: &str) -> Result<Option<VerseText>, EnrichmentError>;
}

/// Lookup against an HTTP verse API
/// (`GET {base}/verses?reference=...&translation=...`).
pub struct HttpVerseLookup {
    client: reqwest::Client,
    settings: VerseLookupSettings,
}

impl HttpVerseLookup {
    pub fn new(settings: VerseLookupSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }
}

#[async_trait]
impl VerseLookup for HttpVerseLookup {
    async fn lookup(&self, reference: &str) -> Result<Option<VerseText>, EnrichmentError> {
        let url = format!("{}/verses", self.settings.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[
                ("reference", reference),
                ("translation", self.settings.translation.as_str()),
            ])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentError::BadStatus(status));
        }

        let verse: VerseText = response.json().await?;
        Ok(Some(verse))
    }
}

/// In-memory verse store for tests and offline demos.
#[derive(Debug, Default)]
pub struct StaticVerseStore {
    verses: HashMap<String, VerseText>,
}

impl StaticVerseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, reference: &str, text: &str, translation: Option<&str>) {
        self.verses.insert(
            reference.to_string(),
            VerseText {
                text: text.to_string(),
                translation: translation.map(str::to_string),
            },
        );
    }
}

#[async_trait]
impl VerseLookup for StaticVerseStore {
    async fn lookup(&self, reference: &str) -> Result<Option<VerseText>, EnrichmentError> {
        Ok(self.verses.get(reference).cloned())
    }
}

/// Lookup that always misses, for configurations without a verse API.
#[derive(Debug, Default)]
pub struct NoVerseLookup;

#[async_trait]
impl VerseLookup for NoVerseLookup {
    async fn lookup(&self, _reference: &str) -> Result<Option<VerseText>, EnrichmentError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_store_roundtrip() {
        let mut store = StaticVerseStore::new();
        store.insert("John 3:16", "For God so loved the world...", Some("KJV"));

        let hit = store.lookup("John 3:16").await.unwrap();
        assert_eq!(hit.unwrap().translation.as_deref(), Some("KJV"));
        assert!(store.lookup("John 3:17").await.unwrap().is_none());
    }
}
