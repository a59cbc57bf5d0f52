// Shared fakes for the integration tests
//
// Sessions are driven through a real `SessionStore`; transcoding and
// recognition are replaced by in-memory fakes and emitted events are
// captured on a channel.

#![allow(dead_code)]

use jarvis_voice::audio::{PcmAudio, Transcoder};
use jarvis_voice::{
    ConnectionId, Recognition, RecognitionError, Recognizer, SessionConfig, SessionContext,
    SessionEvent, SessionHandle, SessionSnapshot, SessionStore, TranscodeError, Transport,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Payload prefix the fake transcoder rejects as corrupt
pub const BAD_AUDIO: &[u8] = b"BAD";

/// Recognizer that replays a queue of outcomes, then reports no speech
#[derive(Default)]
pub struct ScriptedRecognizer {
    script: Mutex<VecDeque<Result<Recognition, RecognitionError>>>,
    delay: Duration,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each recognition takes `delay` (virtual time in paused tests)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn then_text(self, text: &str) -> Self {
        self.push(Ok(Recognition::Final(text.to_string())));
        self
    }

    pub fn then(self, outcome: Recognition) -> Self {
        self.push(Ok(outcome));
        self
    }

    pub fn then_fail(self, error: RecognitionError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn push(&self, outcome: Result<Recognition, RecognitionError>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping `recognize` calls observed
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn recognize(&self, _audio: &PcmAudio) -> Result<Recognition, RecognitionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Recognition::NoSpeech))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Transcoder that turns every byte into one sample and records its input
#[derive(Default)]
pub struct PassthroughTranscoder {
    payloads: Mutex<Vec<Vec<u8>>>,
}

impl PassthroughTranscoder {
    pub fn calls(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Transcoder for PassthroughTranscoder {
    async fn transcode(&self, raw: Vec<u8>, _format_hint: &str) -> Result<PcmAudio, TranscodeError> {
        self.payloads.lock().unwrap().push(raw.clone());

        if raw.starts_with(BAD_AUDIO) {
            return Err(TranscodeError::Malformed("corrupt test payload".to_string()));
        }

        let samples = raw.iter().map(|&b| i16::from(b)).collect();
        Ok(PcmAudio::new(samples, 16_000))
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}

/// Transport that forwards every event to an [`EventLog`]
pub struct RecordingTransport {
    tx: mpsc::UnboundedSender<(ConnectionId, SessionEvent)>,
}

impl Transport for RecordingTransport {
    fn emit(&self, connection: &ConnectionId, event: SessionEvent) {
        let _ = self.tx.send((connection.clone(), event));
    }
}

pub struct EventLog {
    rx: mpsc::UnboundedReceiver<(ConnectionId, SessionEvent)>,
}

impl EventLog {
    /// Next emitted event, from any session
    pub async fn next(&mut self) -> SessionEvent {
        self.next_with_id().await.1
    }

    pub async fn next_with_id(&mut self) -> (ConnectionId, SessionEvent) {
        tokio::time::timeout(Duration::from_secs(60), self.rx.recv())
            .await
            .expect("timed out waiting for a session event")
            .expect("transport closed")
    }

    /// Everything emitted so far, without waiting
    pub fn drain(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok((_, event)) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

pub struct Harness {
    pub store: SessionStore,
    pub recognizer: Arc<ScriptedRecognizer>,
    pub transcoder: Arc<PassthroughTranscoder>,
    pub events: EventLog,
}

impl Harness {
    pub fn new(recognizer: ScriptedRecognizer) -> Self {
        Self::with_config(SessionConfig::default(), recognizer)
    }

    pub fn with_config(config: SessionConfig, recognizer: ScriptedRecognizer) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let recognizer = Arc::new(recognizer);
        let transcoder = Arc::new(PassthroughTranscoder::default());

        let ctx = SessionContext::new(
            config,
            transcoder.clone(),
            recognizer.clone(),
            Arc::new(RecordingTransport { tx }),
        );

        Self {
            store: SessionStore::new(ctx),
            recognizer,
            transcoder,
            events: EventLog { rx },
        }
    }

    /// Create a session and start listening; consumes the `speech_started` event
    pub async fn listening(
        &mut self,
        id: &str,
        mode: jarvis_voice::Mode,
        initial_text: &str,
    ) -> SessionHandle {
        let id = ConnectionId::from(id);
        let handle = self.store.create_if_absent(&id).await;
        handle.start_listening(mode, initial_text);
        assert_eq!(self.events.next().await, SessionEvent::SpeechStarted { mode });
        handle
    }
}

/// Snapshot once no flush is queued or running
pub async fn wait_idle(handle: &SessionHandle) -> SessionSnapshot {
    loop {
        let snapshot = handle.snapshot().await.expect("session is alive");
        if snapshot.flushes_in_flight == 0 {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

/// Audio chunk of `len` bytes filled with `fill`
pub fn chunk(fill: u8, len: usize) -> Vec<u8> {
    vec![fill; len]
}

/// Chunk the fake transcoder rejects
pub fn bad_chunk(len: usize) -> Vec<u8> {
    let mut bytes = BAD_AUDIO.to_vec();
    bytes.resize(len, 0);
    bytes
}

/// Session config with a shorter accumulation window
pub fn fast_flush_config(window_ms: u64) -> SessionConfig {
    SessionConfig {
        accumulation_window_ms: window_ms,
        ..SessionConfig::default()
    }
}
