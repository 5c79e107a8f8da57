//! Live scripture reference detection for sermon transcription.
//!
//! Transcript segments flow through a staged pipeline: a deterministic
//! parser for explicit citations, a memorized-phrase table for verbatim
//! quotes, and an LLM fallback classifier for paraphrases, with a
//! per-reference cooldown and optional verse-text enrichment. A
//! [`session::CaptureSession`] wraps the speech recognizer with the
//! pause/resume/restart lifecycle a live service needs.

pub mod catalog;
pub mod classifier;
pub mod cooldown;
pub mod engine;
pub mod error;
pub mod normalizer;
pub mod parser;
pub mod phrases;
pub mod recognizer;
pub mod session;
pub mod settings;
pub mod types;
pub mod verses;

pub use engine::{DetectOptions, DetectionEngine};
pub use error::{CaptureError, ClassifierError, EnrichmentError};
pub use session::{CaptureSession, CaptureState, SessionConfig, SessionEvent};
pub use settings::{ClassifierSettings, DetectionSettings, VerseLookupSettings};
pub use types::{
    ConfidenceLevel, DetectionResult, DetectionType, ScriptureReference, TranscriptSegment,
};
