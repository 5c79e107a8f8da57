//! Speech recognizer seam.
//!
//! The capture session drives any backend implementing
//! [`SpeechRecognizer`]; events flow back through a sink callback so the
//! session can apply its state and epoch checks before anything is
//! published.

use std::sync::Arc;

use crate::error::CaptureError;
use crate::types::AudioDevice;

/// Why a recognizer errored, coarse enough to decide on recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognizerErrorKind {
    /// Nothing was said for a while. Routine during sermons.
    NoSpeech,
    /// The recognizer was torn down mid-utterance.
    Aborted,
    AudioCapture,
    Network,
    NotAllowed,
    Other,
}

impl RecognizerErrorKind {
    /// Transient errors are logged and ridden out; the recognizer keeps
    /// running or restarts. Everything else surfaces to the session.
    pub fn is_transient(&self) -> bool {
        matches!(self, RecognizerErrorKind::NoSpeech | RecognizerErrorKind::Aborted)
    }
}

#[derive(Debug, Clone)]
pub enum RecognizerEvent {
    /// A transcription hypothesis. Interim results may be revised;
    /// final results are stable.
    Result {
        text: String,
        is_final: bool,
        confidence: f32,
    },
    Error {
        kind: RecognizerErrorKind,
        message: String,
    },
    /// The backend stopped producing results on its own (many engines
    /// end after a silence timeout). The session decides on restart.
    Ended,
}

pub type RecognizerEventSink = Arc<dyn Fn(RecognizerEvent) + Send + Sync>;

/// A continuous speech-to-text backend.
pub trait SpeechRecognizer: Send + Sync {
    fn list_devices(&self) -> Result<Vec<AudioDevice>, CaptureError>;

    /// Acquires the input device and prepares the audio path.
    fn open(&self, device_id: Option<&str>) -> Result<(), CaptureError>;

    /// Begins streaming; events are delivered on the sink until `stop`
    /// or an `Ended` event.
    fn start(&self, sink: RecognizerEventSink) -> Result<(), CaptureError>;

    fn stop(&self) -> Result<(), CaptureError>;

    /// Releases the device opened by `open`.
    fn close(&self) -> Result<(), CaptureError>;

    /// Current input level in [0.0, 1.0] for the UI meter.
    fn input_level(&self) -> f32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_kinds() {
        assert!(RecognizerErrorKind::NoSpeech.is_transient());
        assert!(RecognizerErrorKind::Aborted.is_transient());
        assert!(!RecognizerErrorKind::Network.is_transient());
        assert!(!RecognizerErrorKind::NotAllowed.is_transient());
    }
}
