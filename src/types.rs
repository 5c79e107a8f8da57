use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A structured scripture reference resolved against the canon catalog.
///
/// The `reference` field is the canonical display form, e.g.
/// "1 Corinthians 13:4-7", and doubles as the cooldown/dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptureReference {
    pub book: String,
    pub chapter: u16,
    #[serde(rename = "verseStart")]
    pub verse_start: Option<u16>,
    #[serde(rename = "verseEnd")]
    pub verse_end: Option<u16>,
    pub reference: String,
}

impl ScriptureReference {
    /// Builds a reference with its canonical display string derived
    /// from the structured fields.
    pub fn new(
        book: &str,
        chapter: u16,
        verse_start: Option<u16>,
        verse_end: Option<u16>,
    ) -> Self {
        Self {
            book: book.to_string(),
            chapter,
            verse_start,
            verse_end,
            reference: format_reference(book, chapter, verse_start, verse_end),
        }
    }
}

/// Formats the canonical display form "Book C[:V[-V]]".
///
/// A range collapses to a single verse when both ends are equal.
pub fn format_reference(
    book: &str,
    chapter: u16,
    verse_start: Option<u16>,
    verse_end: Option<u16>,
) -> String {
    let mut out = format!("{} {}", book, chapter);
    if let Some(start) = verse_start {
        out.push(':');
        out.push_str(&start.to_string());
        if let Some(end) = verse_end {
            if end != start {
                out.push('-');
                out.push_str(&end.to_string());
            }
        }
    }
    out
}

/// Confidence tier derived from the normalized score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_score(score: f32) -> Self {
        if score >= 0.9 {
            ConfidenceLevel::High
        } else if score >= 0.7 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

/// Which pipeline stage produced a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionType {
    /// Explicit citation recognized by the pattern parser.
    Deterministic,
    /// Verbatim quote matched against the common-phrase table.
    Phrase,
    /// Implicit allusion identified by the fallback classifier.
    Contextual,
}

/// One detected scripture reference, immutable after construction.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionResult {
    pub id: Uuid,
    pub reference: ScriptureReference,
    /// Source excerpt that triggered the detection.
    #[serde(rename = "matchedText")]
    pub matched_text: String,
    #[serde(rename = "confidenceScore")]
    pub confidence_score: f32,
    pub confidence: ConfidenceLevel,
    #[serde(rename = "detectionType")]
    pub detection_type: DetectionType,
    /// Classifier explanation, present only for contextual detections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(rename = "detectedAt")]
    pub detected_at: DateTime<Utc>,
    #[serde(rename = "verseText", skip_serializing_if = "Option::is_none")]
    pub verse_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
}

impl DetectionResult {
    /// Stamps a fresh detection with an id, timestamp, and the tier
    /// derived from its score. Verse text is attached by enrichment.
    pub fn new(
        reference: ScriptureReference,
        matched_text: String,
        confidence_score: f32,
        detection_type: DetectionType,
        reasoning: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference,
            matched_text,
            confidence_score,
            confidence: ConfidenceLevel::from_score(confidence_score),
            detection_type,
            reasoning,
            detected_at: Utc::now(),
            verse_text: None,
            translation: None,
        }
    }
}

/// A transcript segment delivered by the recognizer front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub id: Uuid,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "isFinal")]
    pub is_final: bool,
    pub confidence: f32,
}

impl TranscriptSegment {
    pub fn now(text: impl Into<String>, is_final: bool, confidence: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            timestamp: Utc::now(),
            is_final,
            confidence,
        }
    }
}

/// An audio input device reported by the recognizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDevice {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_reference_variants() {
        assert_eq!(format_reference("John", 3, Some(16), None), "John 3:16");
        assert_eq!(format_reference("Psalms", 23, None, None), "Psalms 23");
        assert_eq!(
            format_reference("1 Corinthians", 13, Some(4), Some(7)),
            "1 Corinthians 13:4-7"
        );
        // A degenerate range collapses to the single verse.
        assert_eq!(format_reference("John", 3, Some(16), Some(16)), "John 3:16");
    }

    #[test]
    fn test_reference_string_matches_fields() {
        let r = ScriptureReference::new("Romans", 8, Some(28), Some(30));
        assert_eq!(r.reference, "Romans 8:28-30");
        assert_eq!(r.book, "Romans");
        assert_eq!(r.chapter, 8);
    }

    #[test]
    fn test_confidence_tiers() {
        assert_eq!(ConfidenceLevel::from_score(0.95), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.9), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.89), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.7), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.6), ConfidenceLevel::Low);
    }
}
