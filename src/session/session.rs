//! Voice session actor
//!
//! Every session runs as two tasks:
//! - the actor, which owns all session state and is the only thing that
//!   mutates it (commands, timer fires and flush outcomes are handled one at
//!   a time on its loop);
//! - the flush worker, which transcodes and recognizes queued flushes
//!   strictly one after another, so recognition never overlaps for a session
//!   and outcomes come back in the order the flushes were started.
//!
//! Audio ingestion keeps buffering into the next window while the worker is
//! busy. The one exception is `stop_listening`, which waits on the actor for
//! the final flush and any flush still ahead of it before confirming.

use super::config::SessionConfig;
use super::events::{ConnectionId, SessionEvent, Transport};
use super::state::{Mode, VoiceState};
use super::stats::SessionSnapshot;
use super::timers::{self, Deadlines, TimerKind};
use crate::audio::Transcoder;
use crate::error::{RecognitionError, TranscodeError};
use crate::recognition::{Recognition, Recognizer};
use crate::wake_word::WakeWordDetector;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// Collaborators and policy shared by every session
pub struct SessionContext {
    pub config: SessionConfig,
    pub transcoder: Arc<dyn Transcoder>,
    pub recognizer: Arc<dyn Recognizer>,
    pub transport: Arc<dyn Transport>,
    pub wake_words: WakeWordDetector,
}

impl SessionContext {
    pub fn new(
        config: SessionConfig,
        transcoder: Arc<dyn Transcoder>,
        recognizer: Arc<dyn Recognizer>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let wake_words = WakeWordDetector::new(&config.wake_phrases);

        Self {
            config,
            transcoder,
            recognizer,
            transport,
            wake_words,
        }
    }
}

#[derive(Debug)]
pub(crate) enum SessionCommand {
    StartListening { mode: Mode, initial_text: String },
    StopListening,
    AudioChunk(Vec<u8>),
    SetMode(Mode),
    ManualWake,
    ManualSleep,
    ResetTranscript,
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

/// Cheap, cloneable address of a running session.
///
/// Every method returns `false` once the session has been destroyed.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: ConnectionId,
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    fn send(&self, command: SessionCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn start_listening(&self, mode: Mode, initial_text: impl Into<String>) -> bool {
        self.send(SessionCommand::StartListening {
            mode,
            initial_text: initial_text.into(),
        })
    }

    pub fn stop_listening(&self) -> bool {
        self.send(SessionCommand::StopListening)
    }

    pub fn push_audio(&self, bytes: Vec<u8>) -> bool {
        self.send(SessionCommand::AudioChunk(bytes))
    }

    pub fn set_mode(&self, mode: Mode) -> bool {
        self.send(SessionCommand::SetMode(mode))
    }

    pub fn manual_wake(&self) -> bool {
        self.send(SessionCommand::ManualWake)
    }

    pub fn manual_sleep(&self) -> bool {
        self.send(SessionCommand::ManualSleep)
    }

    pub fn reset_transcript(&self) -> bool {
        self.send(SessionCommand::ResetTranscript)
    }

    /// Current state, after every command sent before this call was handled
    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        if !self.send(SessionCommand::Snapshot(tx)) {
            return None;
        }
        rx.await.ok()
    }
}

/// Running tasks of one session, owned by the store
pub(crate) struct SessionTasks {
    closed: Arc<AtomicBool>,
    actor: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl SessionTasks {
    /// Stop the session: silence it, abort both tasks and wait until they are
    /// gone so no deadline or late outcome can touch it afterwards
    pub(crate) async fn shutdown(self) {
        self.closed.store(true, Ordering::SeqCst);
        self.actor.abort();
        self.worker.abort();

        for (name, task) in [("actor", self.actor), ("worker", self.worker)] {
            if let Err(e) = task.await {
                if e.is_panic() {
                    error!("Session {} task panicked: {}", name, e);
                }
            }
        }
    }
}

/// Start the actor and flush worker for a new session
pub(crate) fn spawn(id: ConnectionId, ctx: Arc<SessionContext>) -> (SessionHandle, SessionTasks) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (job_tx, job_rx) = mpsc::unbounded_channel();
    let (result_tx, result_rx) = mpsc::unbounded_channel();
    let closed = Arc::new(AtomicBool::new(false));

    let worker = tokio::spawn(run_flush_worker(
        id.clone(),
        Arc::clone(&ctx),
        job_rx,
        result_tx,
    ));

    let session = VoiceSession {
        id: id.clone(),
        ctx,
        closed: Arc::clone(&closed),
        state: VoiceState::default(),
        transcript: String::new(),
        audio_buffer: Vec::new(),
        timers: Deadlines::new(),
        last_flush_at: Instant::now(),
        last_speech_at: None,
        created_at: Utc::now(),
        jobs: job_tx,
        results: result_rx,
        next_seq: 0,
        stale_before: 0,
        in_flight: 0,
        completed: 0,
    };
    let actor = tokio::spawn(session.run(command_rx));

    (
        SessionHandle {
            id,
            commands: command_tx,
        },
        SessionTasks {
            closed,
            actor,
            worker,
        },
    )
}

struct FlushJob {
    seq: u64,
    audio: Vec<u8>,
}

struct FlushOutcome {
    seq: u64,
    result: Result<Recognition, FlushError>,
}

#[derive(Debug, thiserror::Error)]
enum FlushError {
    #[error(transparent)]
    Transcode(#[from] TranscodeError),
    #[error(transparent)]
    Recognition(#[from] RecognitionError),
}

async fn run_flush_worker(
    id: ConnectionId,
    ctx: Arc<SessionContext>,
    mut jobs: mpsc::UnboundedReceiver<FlushJob>,
    results: mpsc::UnboundedSender<FlushOutcome>,
) {
    while let Some(job) = jobs.recv().await {
        let started = Instant::now();
        let result = process_flush(&ctx, job.audio).await;
        debug!(
            "Flush {} for {} finished in {:?}",
            job.seq,
            id,
            started.elapsed()
        );

        if results
            .send(FlushOutcome {
                seq: job.seq,
                result,
            })
            .is_err()
        {
            break;
        }
    }
}

async fn process_flush(ctx: &SessionContext, audio: Vec<u8>) -> Result<Recognition, FlushError> {
    let pcm = ctx
        .transcoder
        .transcode(audio, &ctx.config.source_format)
        .await?;
    Ok(ctx.recognizer.recognize(&pcm).await?)
}

/// State owned by the session actor
struct VoiceSession {
    /// Connection this session belongs to
    id: ConnectionId,

    /// Shared collaborators and settings
    ctx: Arc<SessionContext>,

    /// Set once the store removes the session; no events are emitted after
    closed: Arc<AtomicBool>,

    /// Listening state and mode
    state: VoiceState,

    /// Running dictation transcript
    transcript: String,

    /// Chunks accumulated for the next flush, in arrival order
    audio_buffer: Vec<Vec<u8>>,

    /// Pending flush, silence and no-input deadlines
    timers: Deadlines,

    /// When the buffer was last handed to the worker
    last_flush_at: Instant,

    /// Wall-clock time of the last recognized speech
    last_speech_at: Option<DateTime<Utc>>,

    created_at: DateTime<Utc>,

    /// Flush jobs for the worker
    jobs: mpsc::UnboundedSender<FlushJob>,

    /// Outcomes back from the worker, in submission order
    results: mpsc::UnboundedReceiver<FlushOutcome>,

    /// Sequence number for the next flush
    next_seq: u64,

    /// Outcomes of flushes numbered below this predate the last mode switch
    stale_before: u64,

    /// Flushes submitted but not yet applied
    in_flight: usize,

    /// Flushes applied or discarded
    completed: u64,
}

impl VoiceSession {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        debug!("Voice session {} started", self.id);

        loop {
            // Completed flushes and due deadlines go before newer commands
            tokio::select! {
                biased;
                Some(outcome) = self.results.recv() => self.apply(outcome),
                kind = timers::wait_next(self.timers.next_due()) => self.on_timer(kind),
                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
            }
        }

        self.timers.cancel_all();
        debug!("Voice session {} finished", self.id);
    }

    async fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::StartListening { mode, initial_text } => {
                self.start_listening(mode, initial_text)
            }
            SessionCommand::StopListening => self.stop_listening().await,
            SessionCommand::AudioChunk(bytes) => self.on_audio_chunk(bytes),
            SessionCommand::SetMode(mode) => self.set_mode(mode),
            SessionCommand::ManualWake => {
                if !self.activate() {
                    debug!(
                        "Ignoring manual wake for {} in state {}",
                        self.id,
                        self.state.name()
                    );
                }
            }
            SessionCommand::ManualSleep => {
                if !self.deactivate() {
                    debug!(
                        "Ignoring manual sleep for {} in state {}",
                        self.id,
                        self.state.name()
                    );
                }
            }
            SessionCommand::ResetTranscript => {
                self.transcript.clear();
                info!("Reset transcript for {}", self.id);
            }
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn start_listening(&mut self, mode: Mode, initial_text: String) {
        self.state = self.state.start(mode);
        if !self.state.is_awake() {
            self.timers.cancel(TimerKind::Silence);
            self.timers.cancel(TimerKind::NoInput);
        }

        // Reflect client-side edits before new speech arrives
        if mode == Mode::Dictation {
            debug!("Initialized transcript for {} with '{}'", self.id, initial_text);
            self.transcript = initial_text;
        }

        info!("Started listening for {} in {} mode", self.id, mode);
        self.emit(SessionEvent::SpeechStarted { mode });
    }

    async fn stop_listening(&mut self) {
        self.timers.cancel_all();

        self.flush();
        self.drain_in_flight().await;

        self.state = self.state.stop();
        self.timers.cancel_all();

        info!("Stopped listening for {}", self.id);
        self.emit(SessionEvent::SpeechStopped);
    }

    /// Apply outcomes in order until every submitted flush has been applied
    async fn drain_in_flight(&mut self) {
        while self.in_flight > 0 {
            match self.results.recv().await {
                Some(outcome) => self.apply(outcome),
                None => break,
            }
        }
    }

    fn on_audio_chunk(&mut self, bytes: Vec<u8>) {
        if !self.state.is_listening() {
            trace!("Dropping {} byte chunk for {}: not listening", bytes.len(), self.id);
            return;
        }

        if bytes.len() < self.ctx.config.min_chunk_bytes {
            debug!("Skipping small audio chunk: {} bytes", bytes.len());
            return;
        }

        trace!("Received audio chunk for {}: {} bytes", self.id, bytes.len());
        self.audio_buffer.push(bytes);

        let window = self.ctx.config.accumulation_window();
        if self.last_flush_at.elapsed() >= window {
            self.flush();
        } else if !self.timers.is_armed(TimerKind::Flush) {
            self.timers.arm_in(TimerKind::Flush, window);
        }
    }

    fn set_mode(&mut self, mode: Mode) {
        self.state = VoiceState::Idle { mode };
        self.transcript.clear();
        self.timers.cancel_all();
        self.stale_before = self.next_seq;

        if !self.audio_buffer.is_empty() {
            debug!(
                "Discarding {} buffered chunks for {} on mode change",
                self.audio_buffer.len(),
                self.id
            );
            self.audio_buffer.clear();
        }

        info!("Session {} mode changed to {}", self.id, mode);
    }

    /// Drain the audio buffer into a flush job. Returns the job's sequence
    /// number when one was submitted.
    fn flush(&mut self) -> Option<u64> {
        self.timers.cancel(TimerKind::Flush);

        if self.audio_buffer.is_empty() {
            return None;
        }

        let chunk_count = self.audio_buffer.len();
        let audio = std::mem::take(&mut self.audio_buffer).concat();
        self.last_flush_at = Instant::now();

        if audio.len() < self.ctx.config.min_flush_bytes {
            debug!(
                "Skipping flush for {}: audio too small ({} bytes)",
                self.id,
                audio.len()
            );
            return None;
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        info!(
            "Processing {} audio chunks for {}, total {} bytes",
            chunk_count,
            self.id,
            audio.len()
        );

        if self.jobs.send(FlushJob { seq, audio }).is_err() {
            warn!("Flush worker for {} is gone, dropping audio", self.id);
            return None;
        }

        self.in_flight += 1;
        Some(seq)
    }

    fn apply(&mut self, outcome: FlushOutcome) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.completed += 1;

        if outcome.seq < self.stale_before {
            debug!(
                "Discarding flush {} for {}: mode changed since it started",
                outcome.seq, self.id
            );
            return;
        }

        match outcome.result {
            Ok(Recognition::Final(text)) if !text.trim().is_empty() => {
                self.last_speech_at = Some(Utc::now());
                self.on_utterance(text.trim().to_string());
            }
            Ok(Recognition::Final(_)) | Ok(Recognition::NoSpeech) => self.on_no_speech(),
            Ok(Recognition::Partial(text)) => self.on_partial(text),
            Err(FlushError::Transcode(e)) => {
                warn!("Abandoning flush {} for {}: {}", outcome.seq, self.id, e);
            }
            Err(FlushError::Recognition(e)) => {
                error!("Speech recognition error for {}: {}", self.id, e);
                self.emit(SessionEvent::SpeechError {
                    error: e.to_string(),
                });
            }
        }
    }

    fn on_utterance(&mut self, text: String) {
        info!(
            "Recognition result for {} [{}]: {}",
            self.id,
            self.state.name(),
            text
        );

        match self.state {
            VoiceState::Dictation
            | VoiceState::Idle {
                mode: Mode::Dictation,
            } => {
                self.transcript.push_str(&text);
                self.transcript.push(' ');
                self.emit(SessionEvent::SpeechFinal {
                    text,
                    full_transcript: Some(self.transcript.clone()),
                });
            }
            VoiceState::CommandAsleep => {
                let Some(wake) = self.ctx.wake_words.detect(&text) else {
                    debug!("No wake phrase in '{}'", text);
                    return;
                };

                info!(
                    "Wake phrase detected for {}, command part: '{}'",
                    self.id, wake.command
                );
                self.activate();
                if !wake.command.is_empty() {
                    self.emit_command(wake.command);
                }
            }
            VoiceState::CommandAwake => self.emit_command(text),
            VoiceState::Idle {
                mode: Mode::Command,
            } => {
                debug!("Dropping command utterance for {}: not listening", self.id);
            }
        }
    }

    fn on_no_speech(&mut self) {
        debug!("No speech detected for {}", self.id);

        // Lets the client clear its "transcribing" indicator
        if self.state.mode() == Mode::Dictation {
            self.emit(SessionEvent::SpeechFinal {
                text: String::new(),
                full_transcript: Some(self.transcript.clone()),
            });
        }
    }

    fn on_partial(&mut self, text: String) {
        if self.state.mode() == Mode::Dictation {
            let full_transcript = format!("{}{}", self.transcript, text);
            self.emit(SessionEvent::SpeechInterim {
                text,
                full_transcript,
            });
        }
    }

    fn emit_command(&mut self, text: String) {
        self.emit(SessionEvent::SpeechFinal {
            text,
            full_transcript: None,
        });
        self.timers
            .arm_in(TimerKind::Silence, self.ctx.config.silence_timeout());
        self.timers
            .arm_in(TimerKind::NoInput, self.ctx.config.no_input_timeout());
    }

    fn activate(&mut self) -> bool {
        let Some(next) = self.state.wake() else {
            return false;
        };

        self.state = next;
        info!("Command mode awake for {}", self.id);
        self.emit(SessionEvent::WakeWordDetected);
        self.timers
            .arm_in(TimerKind::NoInput, self.ctx.config.no_input_timeout());
        true
    }

    fn deactivate(&mut self) -> bool {
        let Some(next) = self.state.sleep() else {
            return false;
        };

        self.state = next;
        self.timers.cancel(TimerKind::Silence);
        self.timers.cancel(TimerKind::NoInput);
        info!("Command mode asleep for {}", self.id);
        self.emit(SessionEvent::TaskModeSleep);
        true
    }

    fn on_timer(&mut self, kind: TimerKind) {
        self.timers.cancel(kind);

        match kind {
            TimerKind::Flush => {
                debug!("Accumulation window elapsed for {}", self.id);
                self.flush();
            }
            TimerKind::Silence => {
                if self.state.is_awake() {
                    info!("Silence timeout for {}", self.id);
                    self.emit(SessionEvent::SilenceTimeout);
                    self.deactivate();
                }
            }
            TimerKind::NoInput => {
                if self.state.is_awake() {
                    info!("No input timeout for {}", self.id);
                    self.deactivate();
                }
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        if self.closed.load(Ordering::SeqCst) {
            debug!("Dropping {} for closed session {}", event.name(), self.id);
            return;
        }
        self.ctx.transport.emit(&self.id, event);
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            connection_id: self.id.clone(),
            state: self.state.name().to_string(),
            mode: self.state.mode(),
            listening: self.state.is_listening(),
            awake: self.state.is_awake(),
            transcript: self.transcript.clone(),
            buffered_chunks: self.audio_buffer.len(),
            buffered_bytes: self.audio_buffer.iter().map(Vec::len).sum(),
            pending_timers: self.timers.pending(),
            flushes_in_flight: self.in_flight,
            flushes_completed: self.completed,
            created_at: self.created_at,
            last_speech_at: self.last_speech_at,
        }
    }
}
