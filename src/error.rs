use thiserror::Error;

/// Errors surfaced by the capture session lifecycle.
///
/// Only resource acquisition at `start()` produces an actionable
/// user-visible failure; everything else either degrades or is
/// rejected as an illegal transition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("audio input device not available")]
    DeviceNotAvailable,

    #[error("recognizer failed: {0}")]
    RecognizerFailed(String),

    #[error("operation not valid while session is {state}")]
    InvalidState { state: &'static str },
}

/// Failures of the fallback classifier stage. These never reach the
/// caller of `detect()`; the orchestrator degrades them to an empty
/// result set.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("classifier returned status {0}")]
    BadStatus(reqwest::StatusCode),

    #[error("classifier response was not valid JSON: {0}")]
    MalformedResponse(String),
}

/// Failures of the verse-text lookup. A missing verse is not an error;
/// these cover transport problems only, and the detection is still
/// emitted without verse text.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("verse lookup request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("verse lookup returned status {0}")]
    BadStatus(reqwest::StatusCode),
}
