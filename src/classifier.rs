//! LLM fallback classifier for paraphrased and implicit references.
//!
//! The deterministic stages only catch explicit citations and memorized
//! phrases. When a transcript merely alludes to a passage ("Jesus told
//! of the prodigal son"), an OpenAI-compatible chat completion endpoint
//! is asked to name the passage. The model is prompted conservatively:
//! it should return nothing rather than guess.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::error::ClassifierError;
use crate::settings::ClassifierSettings;
use crate::types::ScriptureReference;

const SYSTEM_PROMPT: &str = "You are a scripture reference detector for live sermon transcription. \
Identify Bible passages that the speaker is referring to, including paraphrases, \
allusions, and partial quotes. Only report a reference when you are genuinely \
confident the speaker means that specific passage; it is always better to return \
no references than to guess. Respond with JSON only, no prose, in this shape: \
{\"references\":[{\"book\":\"John\",\"chapter\":3,\"verseStart\":16,\"verseEnd\":null,\
\"confidence\":0.8,\"reasoning\":\"short explanation\"}]}. \
Use canonical Protestant book names. confidence is 0.0-1.0. \
If nothing is clearly referenced, respond {\"references\":[]}.";

/// One candidate reference as the model reports it, before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReference {
    pub book: String,
    pub chapter: u16,
    #[serde(default)]
    pub verse_start: Option<u16>,
    #[serde(default)]
    pub verse_end: Option<u16>,
    pub confidence: f32,
    #[serde(default)]
    pub reasoning: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ClassifierPayload {
    #[serde(default)]
    references: Vec<RawReference>,
}

/// A validated classifier hit: resolved reference, clamped score, and
/// the model's stated reasoning.
pub type ClassifiedReference = (ScriptureReference, f32, Option<String>);

#[async_trait]
pub trait ClassifierService: Send + Sync {
    /// Returns candidate references for the transcript, or an empty list
    /// when nothing is confidently referenced.
    async fn classify(
        &self,
        transcript: &str,
        context: Option<&str>,
    ) -> Result<Vec<RawReference>, ClassifierError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Classifier backed by an OpenAI-compatible `/chat/completions` route.
pub struct HttpClassifier {
    client: reqwest::Client,
    settings: ClassifierSettings,
}

impl HttpClassifier {
    pub fn new(settings: ClassifierSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    fn build_user_message(transcript: &str, context: Option<&str>) -> String {
        match context {
            Some(ctx) if !ctx.trim().is_empty() => {
                format!("Earlier context:\n{ctx}\n\nCurrent transcript:\n{transcript}")
            }
            _ => format!("Transcript:\n{transcript}"),
        }
    }
}

#[async_trait]
impl ClassifierService for HttpClassifier {
    async fn classify(
        &self,
        transcript: &str,
        context: Option<&str>,
    ) -> Result<Vec<RawReference>, ClassifierError> {
        if transcript.trim().len() < self.settings.min_transcript_chars {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/chat/completions",
            self.settings.effective_base_url().trim_end_matches('/')
        );
        let request = ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Self::build_user_message(transcript, context),
                },
            ],
            temperature: 0.2,
            max_tokens: 1024,
        };

        log::debug!("classifier request to {} ({} chars)", url, transcript.len());

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.settings.effective_api_key())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifierError::BadStatus(status));
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| {
                ClassifierError::MalformedResponse("response carried no choices".to_string())
            })?;

        let payload: ClassifierPayload =
            serde_json::from_str(strip_code_fences(content)).map_err(|e| {
                ClassifierError::MalformedResponse(format!("unparseable payload: {e}"))
            })?;
        Ok(payload.references)
    }
}

/// Models sometimes wrap JSON in markdown fences despite instructions.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

/// Filters raw classifier output down to references the catalog can
/// stand behind: score floor, known book, chapter/verse in bounds,
/// ordered ranges. Scores are clamped to [0, 1].
pub fn validate_classifier_output(
    raw: Vec<RawReference>,
    min_confidence: f32,
) -> Vec<ClassifiedReference> {
    let mut out = Vec::new();
    for candidate in raw {
        if candidate.confidence < min_confidence {
            log::debug!(
                "classifier candidate {} {} below confidence floor ({:.2})",
                candidate.book,
                candidate.chapter,
                candidate.confidence
            );
            continue;
        }
        let Some(book) = catalog::find_book(&candidate.book) else {
            log::debug!("classifier named unknown book {:?}", candidate.book);
            continue;
        };
        if !catalog::validate_reference(book, candidate.chapter, candidate.verse_start) {
            continue;
        }
        if let (Some(vs), Some(ve)) = (candidate.verse_start, candidate.verse_end) {
            if ve < vs || ve > catalog::MAX_VERSE {
                continue;
            }
        }
        let reference = ScriptureReference::new(
            book.name,
            candidate.chapter,
            candidate.verse_start,
            candidate.verse_end,
        );
        out.push((
            reference,
            candidate.confidence.clamp(0.0, 1.0),
            candidate.reasoning,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(book: &str, chapter: u16, confidence: f32) -> RawReference {
        RawReference {
            book: book.to_string(),
            chapter,
            verse_start: None,
            verse_end: None,
            confidence,
            reasoning: Some("test".to_string()),
        }
    }

    #[test]
    fn test_confidence_floor() {
        let out = validate_classifier_output(
            vec![raw("Luke", 15, 0.59), raw("Luke", 15, 0.6)],
            0.6,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0.reference, "Luke 15");
        assert_eq!(out[0].1, 0.6);
    }

    #[test]
    fn test_unknown_book_dropped() {
        let out = validate_classifier_output(vec![raw("Hezekiah", 3, 0.9)], 0.6);
        assert!(out.is_empty());
    }

    #[test]
    fn test_out_of_bounds_dropped() {
        let out = validate_classifier_output(vec![raw("John", 99, 0.9)], 0.6);
        assert!(out.is_empty());
    }

    #[test]
    fn test_inverted_range_dropped() {
        let mut candidate = raw("Romans", 8, 0.9);
        candidate.verse_start = Some(30);
        candidate.verse_end = Some(28);
        assert!(validate_classifier_output(vec![candidate], 0.6).is_empty());
    }

    #[test]
    fn test_book_name_canonicalized() {
        let out = validate_classifier_output(vec![raw("psalm", 23, 0.8)], 0.6);
        assert_eq!(out[0].0.reference, "Psalms 23");
    }

    #[test]
    fn test_score_clamped() {
        let out = validate_classifier_output(vec![raw("John", 3, 1.4)], 0.6);
        assert_eq!(out[0].1, 1.0);
    }

    #[test]
    fn test_payload_parsing_with_fences() {
        let content = "```json\n{\"references\":[{\"book\":\"Luke\",\"chapter\":15,\
                       \"verseStart\":11,\"confidence\":0.8}]}\n```";
        let payload: ClassifierPayload =
            serde_json::from_str(strip_code_fences(content)).unwrap();
        assert_eq!(payload.references.len(), 1);
        assert_eq!(payload.references[0].verse_start, Some(11));
        assert!(payload.references[0].reasoning.is_none());
    }
}
