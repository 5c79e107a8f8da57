//! Capture session state machine.
//!
//! Wraps a [`SpeechRecognizer`] with the lifecycle a live service
//! needs: explicit state transitions, pause/resume without tearing the
//! audio path down, debounced restart when the backend ends on its own,
//! and an epoch counter so events from a superseded recognizer run can
//! never leak into the current one.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::CaptureError;
use crate::recognizer::{RecognizerEvent, RecognizerEventSink, SpeechRecognizer};
use crate::types::{AudioDevice, TranscriptSegment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Starting,
    Listening,
    Paused,
    Stopping,
}

impl CaptureState {
    pub fn name(&self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::Starting => "starting",
            CaptureState::Listening => "listening",
            CaptureState::Paused => "paused",
            CaptureState::Stopping => "stopping",
        }
    }

    fn is_active(&self) -> bool {
        matches!(
            self,
            CaptureState::Starting | CaptureState::Listening | CaptureState::Paused
        )
    }
}

/// Events published to the session's consumer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(CaptureState),
    /// A finalized transcript segment.
    Transcript(TranscriptSegment),
    /// An in-progress hypothesis, revised until finalized.
    Interim(String),
    /// Input level in [0.0, 1.0].
    Level(f32),
    Error { message: String },
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Wait before restarting after the recognizer ends on its own;
    /// absorbs rapid end/start flapping on silence timeouts.
    pub restart_debounce: Duration,
    pub meter_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            restart_debounce: Duration::from_millis(500),
            meter_interval: Duration::from_millis(100),
        }
    }
}

struct SessionInner {
    state: CaptureState,
    /// Bumped on every stop; events and timers carry the epoch they
    /// were created under and no-op when it no longer matches.
    epoch: u64,
    device_id: Option<String>,
    level: f32,
    last_error: Option<String>,
    transcript: Vec<TranscriptSegment>,
}

/// Clonable handle to one capture session. All clones share state.
#[derive(Clone)]
pub struct CaptureSession {
    inner: Arc<Mutex<SessionInner>>,
    recognizer: Arc<dyn SpeechRecognizer>,
    events: mpsc::UnboundedSender<SessionEvent>,
    config: SessionConfig,
    runtime: tokio::runtime::Handle,
}

impl CaptureSession {
    /// Must be called from within a tokio runtime; restart timers and
    /// the level meter are spawned onto it.
    pub fn new(
        recognizer: Arc<dyn SpeechRecognizer>,
        config: SessionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            inner: Arc::new(Mutex::new(SessionInner {
                state: CaptureState::Idle,
                epoch: 0,
                device_id: None,
                level: 0.0,
                last_error: None,
                transcript: Vec::new(),
            })),
            recognizer,
            events: tx,
            config,
            runtime: tokio::runtime::Handle::current(),
        };
        (session, rx)
    }

    pub fn state(&self) -> CaptureState {
        self.lock().state
    }

    pub fn level(&self) -> f32 {
        self.lock().level
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Finalized segments accumulated since the last start.
    pub fn transcript(&self) -> Vec<TranscriptSegment> {
        self.lock().transcript.clone()
    }

    pub fn list_devices(&self) -> Result<Vec<AudioDevice>, CaptureError> {
        self.recognizer.list_devices()
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn set_state(&self, inner: &mut SessionInner, state: CaptureState) {
        if inner.state != state {
            log::debug!("capture state {} -> {}", inner.state.name(), state.name());
            inner.state = state;
            let _ = self.events.send(SessionEvent::StateChanged(state));
        }
    }

    /// Opens the device and begins listening. Only valid from `Idle`.
    pub fn start(&self, device_id: Option<&str>) -> Result<(), CaptureError> {
        let epoch = {
            let mut inner = self.lock();
            if inner.state != CaptureState::Idle {
                return Err(CaptureError::InvalidState {
                    state: inner.state.name(),
                });
            }
            self.set_state(&mut inner, CaptureState::Starting);
            inner.device_id = device_id.map(str::to_string);
            inner.last_error = None;
            inner.transcript.clear();
            inner.epoch
        };

        if let Err(e) = self.recognizer.open(device_id) {
            self.fail_to_idle(epoch, &e);
            return Err(e);
        }
        // The mutex is not held across acquisition, so a stop() may
        // have landed while open() was blocking. That stop already tore
        // the session down; this start must not resurrect it.
        if let Err(e) = self.check_still_starting(epoch) {
            if let Err(close_err) = self.recognizer.close() {
                log::warn!("closing superseded session: {close_err}");
            }
            return Err(e);
        }
        if let Err(e) = self.recognizer.start(self.make_sink(epoch)) {
            if let Err(close_err) = self.recognizer.close() {
                log::warn!("closing after failed start: {close_err}");
            }
            self.fail_to_idle(epoch, &e);
            return Err(e);
        }

        let mut inner = self.lock();
        if inner.state != CaptureState::Starting || inner.epoch != epoch {
            let state = inner.state.name();
            drop(inner);
            if let Err(stop_err) = self.recognizer.stop() {
                log::warn!("stopping superseded session: {stop_err}");
            }
            if let Err(close_err) = self.recognizer.close() {
                log::warn!("closing superseded session: {close_err}");
            }
            return Err(CaptureError::InvalidState { state });
        }
        self.set_state(&mut inner, CaptureState::Listening);
        drop(inner);
        self.spawn_meter(epoch);
        log::info!("capture session started (device: {:?})", device_id);
        Ok(())
    }

    fn check_still_starting(&self, epoch: u64) -> Result<(), CaptureError> {
        let inner = self.lock();
        if inner.state == CaptureState::Starting && inner.epoch == epoch {
            Ok(())
        } else {
            Err(CaptureError::InvalidState {
                state: inner.state.name(),
            })
        }
    }

    fn fail_to_idle(&self, epoch: u64, error: &CaptureError) {
        let mut inner = self.lock();
        // Only the start that owns this epoch may settle the failure;
        // a concurrent stop() has already settled the state itself.
        if inner.state != CaptureState::Starting || inner.epoch != epoch {
            return;
        }
        inner.last_error = Some(error.to_string());
        let _ = self.events.send(SessionEvent::Error {
            message: error.to_string(),
        });
        self.set_state(&mut inner, CaptureState::Idle);
    }

    /// Stops forwarding results without releasing the device. Finalized
    /// segments arriving while paused are still recorded. Idempotent.
    pub fn pause(&self) -> Result<(), CaptureError> {
        let mut inner = self.lock();
        match inner.state {
            CaptureState::Listening => {
                self.set_state(&mut inner, CaptureState::Paused);
                Ok(())
            }
            CaptureState::Paused => Ok(()),
            _ => Err(CaptureError::InvalidState {
                state: inner.state.name(),
            }),
        }
    }

    /// Idempotent counterpart to [`pause`](Self::pause).
    pub fn resume(&self) -> Result<(), CaptureError> {
        let mut inner = self.lock();
        match inner.state {
            CaptureState::Paused => {
                self.set_state(&mut inner, CaptureState::Listening);
                Ok(())
            }
            CaptureState::Listening => Ok(()),
            _ => Err(CaptureError::InvalidState {
                state: inner.state.name(),
            }),
        }
    }

    /// Tears the session down to `Idle`. The epoch bump happens before
    /// the recognizer is touched, so anything the backend emits while
    /// shutting down (and any pending restart timer) is already stale.
    pub fn stop(&self) -> Result<(), CaptureError> {
        {
            let mut inner = self.lock();
            if !inner.state.is_active() {
                return Err(CaptureError::InvalidState {
                    state: inner.state.name(),
                });
            }
            inner.epoch += 1;
            self.set_state(&mut inner, CaptureState::Stopping);
        }

        if let Err(e) = self.recognizer.stop() {
            log::warn!("recognizer stop: {e}");
        }
        if let Err(e) = self.recognizer.close() {
            log::warn!("recognizer close: {e}");
        }

        let mut inner = self.lock();
        inner.level = 0.0;
        let _ = self.events.send(SessionEvent::Level(0.0));
        self.set_state(&mut inner, CaptureState::Idle);
        log::info!("capture session stopped");
        Ok(())
    }

    fn make_sink(&self, epoch: u64) -> RecognizerEventSink {
        let session = self.clone();
        Arc::new(move |event| session.handle_recognizer_event(epoch, event))
    }

    fn handle_recognizer_event(&self, epoch: u64, event: RecognizerEvent) {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            log::debug!("dropping event from superseded recognizer run");
            return;
        }
        match event {
            RecognizerEvent::Result {
                text,
                is_final,
                confidence,
            } => {
                if text.trim().is_empty() {
                    return;
                }
                if is_final {
                    let segment = TranscriptSegment::now(text, true, confidence);
                    inner.transcript.push(segment.clone());
                    // While paused, segments are recorded but not
                    // published downstream.
                    if inner.state == CaptureState::Listening {
                        let _ = self.events.send(SessionEvent::Transcript(segment));
                    }
                } else if inner.state == CaptureState::Listening {
                    let _ = self.events.send(SessionEvent::Interim(text));
                }
            }
            RecognizerEvent::Error { kind, message } => {
                if kind.is_transient() {
                    log::debug!("transient recognizer error: {message}");
                } else {
                    log::error!("recognizer error: {message}");
                    inner.last_error = Some(message.clone());
                    let _ = self.events.send(SessionEvent::Error { message });
                }
            }
            RecognizerEvent::Ended => {
                drop(inner);
                self.handle_unexpected_end(epoch);
            }
        }
    }

    /// Many engines end on silence timeouts; during a live session that
    /// is a hiccup, not a stop. The restart is debounced and re-checks
    /// state and epoch when the timer fires, so a pause or stop in the
    /// window cancels it.
    fn handle_unexpected_end(&self, epoch: u64) {
        {
            let inner = self.lock();
            if inner.state != CaptureState::Listening || inner.epoch != epoch {
                return;
            }
        }
        log::info!(
            "recognizer ended unexpectedly, restarting in {:?}",
            self.config.restart_debounce
        );
        let session = self.clone();
        let debounce = self.config.restart_debounce;
        self.runtime.spawn(async move {
            tokio::time::sleep(debounce).await;
            session.try_restart(epoch);
        });
    }

    fn try_restart(&self, epoch: u64) {
        {
            let inner = self.lock();
            if inner.state != CaptureState::Listening || inner.epoch != epoch {
                log::debug!("restart cancelled, session moved on");
                return;
            }
        }
        if let Err(e) = self.recognizer.start(self.make_sink(epoch)) {
            log::error!("recognizer restart failed: {e}");
            let mut inner = self.lock();
            if inner.epoch != epoch {
                return;
            }
            inner.last_error = Some(e.to_string());
            let _ = self.events.send(SessionEvent::Error {
                message: e.to_string(),
            });
            self.set_state(&mut inner, CaptureState::Idle);
        }
    }

    /// Polls the input level while the session is active. The task owns
    /// its exit: it stops as soon as the state leaves Listening/Paused
    /// or the epoch moves on.
    fn spawn_meter(&self, epoch: u64) {
        let session = self.clone();
        let interval = self.config.meter_interval;
        self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                {
                    let inner = session.lock();
                    if inner.epoch != epoch
                        || !matches!(
                            inner.state,
                            CaptureState::Listening | CaptureState::Paused
                        )
                    {
                        break;
                    }
                }
                let level = session.recognizer.input_level().clamp(0.0, 1.0);
                session.lock().level = level;
                let _ = session.events.send(SessionEvent::Level(level));
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::RecognizerErrorKind;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Scripted recognizer that records calls and lets tests drive the
    /// event sink by hand.
    struct FakeRecognizer {
        sink: Mutex<Option<RecognizerEventSink>>,
        open_count: AtomicUsize,
        start_count: AtomicUsize,
        stop_count: AtomicUsize,
        close_count: AtomicUsize,
        fail_open: AtomicBool,
        level: Mutex<f32>,
        /// When set, `open()` rendezvouses on the first barrier and
        /// then blocks on the second until the test releases it.
        open_gate: Mutex<Option<(Arc<std::sync::Barrier>, Arc<std::sync::Barrier>)>>,
    }

    impl FakeRecognizer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sink: Mutex::new(None),
                open_count: AtomicUsize::new(0),
                start_count: AtomicUsize::new(0),
                stop_count: AtomicUsize::new(0),
                close_count: AtomicUsize::new(0),
                fail_open: AtomicBool::new(false),
                level: Mutex::new(0.0),
                open_gate: Mutex::new(None),
            })
        }

        fn emit(&self, event: RecognizerEvent) {
            let sink = self.sink.lock().unwrap().clone();
            if let Some(sink) = sink {
                sink(event);
            }
        }

        fn emit_final(&self, text: &str) {
            self.emit(RecognizerEvent::Result {
                text: text.to_string(),
                is_final: true,
                confidence: 0.9,
            });
        }
    }

    impl SpeechRecognizer for FakeRecognizer {
        fn list_devices(&self) -> Result<Vec<AudioDevice>, CaptureError> {
            Ok(vec![AudioDevice {
                device_id: "default".to_string(),
                label: "Default".to_string(),
            }])
        }

        fn open(&self, _device_id: Option<&str>) -> Result<(), CaptureError> {
            self.open_count.fetch_add(1, Ordering::SeqCst);
            let gate = self.open_gate.lock().unwrap().clone();
            if let Some((entered, release)) = gate {
                entered.wait();
                release.wait();
            }
            if self.fail_open.load(Ordering::SeqCst) {
                return Err(CaptureError::DeviceNotAvailable);
            }
            Ok(())
        }

        fn start(&self, sink: RecognizerEventSink) -> Result<(), CaptureError> {
            self.start_count.fetch_add(1, Ordering::SeqCst);
            *self.sink.lock().unwrap() = Some(sink);
            Ok(())
        }

        fn stop(&self) -> Result<(), CaptureError> {
            self.stop_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn close(&self) -> Result<(), CaptureError> {
            self.close_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn input_level(&self) -> f32 {
            *self.level.lock().unwrap()
        }
    }

    fn quick_config() -> SessionConfig {
        SessionConfig {
            restart_debounce: Duration::from_millis(50),
            meter_interval: Duration::from_millis(10),
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_start_and_stop_lifecycle() {
        let recognizer = FakeRecognizer::new();
        let (session, mut rx) = CaptureSession::new(recognizer.clone(), quick_config());

        assert_eq!(session.state(), CaptureState::Idle);
        session.start(Some("default")).unwrap();
        assert_eq!(session.state(), CaptureState::Listening);
        assert_eq!(recognizer.open_count.load(Ordering::SeqCst), 1);
        assert_eq!(recognizer.start_count.load(Ordering::SeqCst), 1);

        session.stop().unwrap();
        assert_eq!(session.state(), CaptureState::Idle);
        assert_eq!(recognizer.stop_count.load(Ordering::SeqCst), 1);
        assert_eq!(recognizer.close_count.load(Ordering::SeqCst), 1);

        let events = drain(&mut rx);
        let states: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::StateChanged(s) => Some(*s),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![
                CaptureState::Starting,
                CaptureState::Listening,
                CaptureState::Stopping,
                CaptureState::Idle
            ]
        );
    }

    #[tokio::test]
    async fn test_double_start_rejected() {
        let recognizer = FakeRecognizer::new();
        let (session, _rx) = CaptureSession::new(recognizer, quick_config());

        session.start(None).unwrap();
        let err = session.start(None).unwrap_err();
        assert_eq!(err, CaptureError::InvalidState { state: "listening" });
    }

    #[tokio::test]
    async fn test_open_failure_lands_back_in_idle() {
        let recognizer = FakeRecognizer::new();
        recognizer.fail_open.store(true, Ordering::SeqCst);
        let (session, _rx) = CaptureSession::new(recognizer.clone(), quick_config());

        let err = session.start(None).unwrap_err();
        assert_eq!(err, CaptureError::DeviceNotAvailable);
        assert_eq!(session.state(), CaptureState::Idle);
        assert!(session.last_error().is_some());
        assert_eq!(recognizer.start_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stop_during_blocking_open_wins() {
        let recognizer = FakeRecognizer::new();
        let entered = Arc::new(std::sync::Barrier::new(2));
        let release = Arc::new(std::sync::Barrier::new(2));
        *recognizer.open_gate.lock().unwrap() =
            Some((Arc::clone(&entered), Arc::clone(&release)));
        let (session, _rx) = CaptureSession::new(recognizer.clone(), quick_config());

        let worker = {
            let session = session.clone();
            std::thread::spawn(move || session.start(None))
        };

        // start() is now blocked inside open(); tear the session down
        // underneath it.
        entered.wait();
        session.stop().unwrap();
        assert_eq!(session.state(), CaptureState::Idle);
        release.wait();

        let result = worker.join().unwrap();
        assert_eq!(result, Err(CaptureError::InvalidState { state: "idle" }));
        // The superseded start must not resurrect the session or leave
        // the recognizer running.
        assert_eq!(session.state(), CaptureState::Idle);
        assert_eq!(recognizer.start_count.load(Ordering::SeqCst), 0);
        // One close from stop(), one from the start undoing its open.
        assert_eq!(recognizer.close_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_final_results_flow_and_pause_holds_them() {
        let recognizer = FakeRecognizer::new();
        let (session, mut rx) = CaptureSession::new(recognizer.clone(), quick_config());
        session.start(None).unwrap();
        drain(&mut rx);

        recognizer.emit_final("turn to john three sixteen");
        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::Transcript(_))));

        session.pause().unwrap();
        // pause is idempotent
        session.pause().unwrap();
        drain(&mut rx);

        recognizer.emit_final("recorded but not forwarded");
        let events = drain(&mut rx);
        assert!(!events
            .iter()
            .any(|e| matches!(e, SessionEvent::Transcript(_))));
        // The segment still lands in the session transcript.
        assert_eq!(session.transcript().len(), 2);

        session.resume().unwrap();
        assert_eq!(session.state(), CaptureState::Listening);
    }

    #[tokio::test]
    async fn test_interim_results_only_while_listening() {
        let recognizer = FakeRecognizer::new();
        let (session, mut rx) = CaptureSession::new(recognizer.clone(), quick_config());
        session.start(None).unwrap();
        session.pause().unwrap();
        drain(&mut rx);

        recognizer.emit(RecognizerEvent::Result {
            text: "partial...".to_string(),
            is_final: false,
            confidence: 0.3,
        });
        assert!(!drain(&mut rx)
            .iter()
            .any(|e| matches!(e, SessionEvent::Interim(_))));
    }

    #[tokio::test]
    async fn test_unexpected_end_restarts_after_debounce() {
        let recognizer = FakeRecognizer::new();
        let (session, _rx) = CaptureSession::new(recognizer.clone(), quick_config());
        session.start(None).unwrap();

        recognizer.emit(RecognizerEvent::Ended);
        assert_eq!(recognizer.start_count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(recognizer.start_count.load(Ordering::SeqCst), 2);
        assert_eq!(session.state(), CaptureState::Listening);
    }

    #[tokio::test]
    async fn test_stop_during_debounce_cancels_restart() {
        let recognizer = FakeRecognizer::new();
        let (session, _rx) = CaptureSession::new(recognizer.clone(), quick_config());
        session.start(None).unwrap();

        recognizer.emit(RecognizerEvent::Ended);
        session.stop().unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(recognizer.start_count.load(Ordering::SeqCst), 1);
        assert_eq!(session.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn test_stale_events_ignored_after_stop() {
        let recognizer = FakeRecognizer::new();
        let (session, mut rx) = CaptureSession::new(recognizer.clone(), quick_config());
        session.start(None).unwrap();
        session.stop().unwrap();
        drain(&mut rx);

        // The sink from the old run still exists; its events are stale.
        recognizer.emit_final("ghost of the previous run");
        assert!(drain(&mut rx).is_empty());
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_transient_errors_do_not_surface() {
        let recognizer = FakeRecognizer::new();
        let (session, mut rx) = CaptureSession::new(recognizer.clone(), quick_config());
        session.start(None).unwrap();
        drain(&mut rx);

        recognizer.emit(RecognizerEvent::Error {
            kind: RecognizerErrorKind::NoSpeech,
            message: "no speech".to_string(),
        });
        assert!(!drain(&mut rx)
            .iter()
            .any(|e| matches!(e, SessionEvent::Error { .. })));
        assert!(session.last_error().is_none());

        recognizer.emit(RecognizerEvent::Error {
            kind: RecognizerErrorKind::Network,
            message: "socket closed".to_string(),
        });
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, SessionEvent::Error { .. })));
        assert_eq!(session.last_error().as_deref(), Some("socket closed"));
    }

    #[tokio::test]
    async fn test_meter_reports_levels_and_stops_with_session() {
        let recognizer = FakeRecognizer::new();
        let (session, mut rx) = CaptureSession::new(recognizer.clone(), quick_config());
        session.start(None).unwrap();
        *recognizer.level.lock().unwrap() = 0.4;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, SessionEvent::Level(l) if (*l - 0.4).abs() < f32::EPSILON)));
        assert!((session.level() - 0.4).abs() < f32::EPSILON);

        session.stop().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        drain(&mut rx);
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Meter task has exited; no further levels arrive.
        assert!(!drain(&mut rx)
            .iter()
            .any(|e| matches!(e, SessionEvent::Level(_))));
        assert_eq!(session.level(), 0.0);
    }
}
