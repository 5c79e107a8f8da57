//! Detection pipeline orchestrator.
//!
//! Stages run in strict order per transcript:
//!   1. deterministic parser (explicit citations, score 0.95), behind
//!      a cheap citation pre-filter
//!   2. memorized phrase table (verbatim quotes, score 0.90), always
//!      scanned when the parser found nothing
//!   3. LLM fallback classifier (paraphrases, model-scored), behind
//!      the trigger-keyword pre-filter
//!   4. cooldown gate
//!   5. best-effort verse enrichment
//!
//! The engine is infallible at the call boundary: a failing classifier
//! or verse backend degrades to fewer (or unenriched) detections, never
//! to an error.

use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::sync::Mutex;

use crate::catalog;
use crate::classifier::{self, ClassifierService};
use crate::cooldown::CooldownCache;
use crate::parser;
use crate::phrases;
use crate::settings::DetectionSettings;
use crate::types::{DetectionResult, DetectionType, ScriptureReference};
use crate::verses::VerseLookup;

pub const PARSER_CONFIDENCE: f32 = 0.95;
pub const PHRASE_CONFIDENCE: f32 = 0.90;

/// Per-call knobs; the common case is `Default`.
#[derive(Debug, Clone, Default)]
pub struct DetectOptions {
    /// Earlier transcript handed to the classifier for disambiguation.
    pub context: Option<String>,
    /// Skip the LLM stage entirely (offline mode, cost control).
    pub skip_fallback: bool,
    /// Attach verse text to surfaced detections.
    pub fetch_verse_text: bool,
}

struct Candidate {
    reference: ScriptureReference,
    matched_text: String,
    confidence_score: f32,
    detection_type: DetectionType,
    reasoning: Option<String>,
}

/// Stateful detection front door. Cheap to clone via the contained
/// `Arc`s; all clones share one cooldown cache.
#[derive(Clone)]
pub struct DetectionEngine {
    settings: DetectionSettings,
    cooldowns: Arc<Mutex<CooldownCache>>,
    classifier: Arc<dyn ClassifierService>,
    verses: Arc<dyn VerseLookup>,
}

impl DetectionEngine {
    pub fn new(
        settings: DetectionSettings,
        classifier: Arc<dyn ClassifierService>,
        verses: Arc<dyn VerseLookup>,
    ) -> Self {
        let cooldowns = CooldownCache::new(
            settings.cooldown_window(),
            settings.cooldown_prune_threshold,
        );
        Self {
            settings,
            cooldowns: Arc::new(Mutex::new(cooldowns)),
            classifier,
            verses,
        }
    }

    /// Runs the full pipeline over one finalized transcript segment.
    pub async fn detect(&self, text: &str, options: &DetectOptions) -> Vec<DetectionResult> {
        let mut candidates: Vec<Candidate> = Vec::new();

        if catalog::might_contain_scripture(text) {
            for parsed in parser::parse(text) {
                candidates.push(Candidate {
                    reference: parsed.reference,
                    matched_text: parsed.matched_text,
                    confidence_score: PARSER_CONFIDENCE,
                    detection_type: DetectionType::Deterministic,
                    reasoning: None,
                });
            }
        }

        // The phrase scan runs unguarded: a verbatim quote rarely
        // carries the citation tokens the pre-filter looks for.
        if candidates.is_empty() {
            for hit in phrases::find_phrase_matches(text) {
                candidates.push(Candidate {
                    reference: hit.reference,
                    matched_text: hit.matched_text,
                    confidence_score: PHRASE_CONFIDENCE,
                    detection_type: DetectionType::Phrase,
                    reasoning: None,
                });
            }
        }

        if candidates.is_empty()
            && !options.skip_fallback
            && catalog::contains_trigger_keywords(text)
        {
            match self
                .classifier
                .classify(text, options.context.as_deref())
                .await
            {
                Ok(raw) => {
                    let validated = classifier::validate_classifier_output(
                        raw,
                        self.settings.classifier_min_confidence,
                    );
                    for (reference, score, reasoning) in validated {
                        candidates.push(Candidate {
                            matched_text: text.trim().to_string(),
                            reference,
                            confidence_score: score,
                            detection_type: DetectionType::Contextual,
                            reasoning,
                        });
                    }
                }
                Err(e) => {
                    log::warn!("fallback classifier unavailable: {e}");
                }
            }
        }

        if candidates.is_empty() {
            return Vec::new();
        }

        // Single lock acquisition so one transcript's candidates gate
        // atomically against each other and against concurrent calls.
        let admitted: Vec<Candidate> = {
            let mut cooldowns = match self.cooldowns.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            candidates
                .into_iter()
                .filter(|c| {
                    let admit = cooldowns.try_admit(&c.reference.reference);
                    if !admit {
                        log::debug!("{} suppressed by cooldown", c.reference.reference);
                    }
                    admit
                })
                .collect()
        };

        if admitted.is_empty() {
            return Vec::new();
        }

        let fetch = options.fetch_verse_text;
        let concurrency = self.settings.enrichment_concurrency.max(1);
        let results: Vec<DetectionResult> = stream::iter(admitted)
            .map(|candidate| {
                let verses = Arc::clone(&self.verses);
                async move {
                    let verse = if fetch {
                        match verses.lookup(&candidate.reference.reference).await {
                            Ok(v) => v,
                            Err(e) => {
                                log::warn!(
                                    "verse lookup for {} failed: {e}",
                                    candidate.reference.reference
                                );
                                None
                            }
                        }
                    } else {
                        None
                    };
                    let mut result = DetectionResult::new(
                        candidate.reference,
                        candidate.matched_text,
                        candidate.confidence_score,
                        candidate.detection_type,
                        candidate.reasoning,
                    );
                    if let Some(verse) = verse {
                        result.verse_text = Some(verse.text);
                        result.translation = verse.translation;
                    }
                    result
                }
            })
            .buffered(concurrency)
            .collect()
            .await;

        log::info!(
            "detected {} reference(s) in {}-char segment",
            results.len(),
            text.len()
        );
        results
    }

    /// Forgets all cooldown history, e.g. on session start.
    pub fn clear_cooldowns(&self) {
        let mut cooldowns = match self.cooldowns.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cooldowns.clear();
    }
}
