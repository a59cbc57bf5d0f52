//! Per-session deadlines
//!
//! Each session keeps at most one pending deadline per [`TimerKind`]. The
//! session task sleeps until the earliest one, so arming, re-arming and
//! cancelling are plain field updates and a destroyed session can never be
//! called back.

use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Accumulation window elapsed; process the audio buffer
    Flush,
    /// Command mode went quiet after an utterance
    Silence,
    /// Command mode stayed awake without any utterance
    NoInput,
}

impl TimerKind {
    /// All kinds, in tie-break order
    pub const ALL: [TimerKind; 3] = [TimerKind::Flush, TimerKind::Silence, TimerKind::NoInput];
}

/// One optional deadline per timer kind
#[derive(Debug, Default, Clone)]
pub struct Deadlines {
    flush: Option<Instant>,
    silence: Option<Instant>,
    no_input: Option<Instant>,
}

impl Deadlines {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, kind: TimerKind) -> &mut Option<Instant> {
        match kind {
            TimerKind::Flush => &mut self.flush,
            TimerKind::Silence => &mut self.silence,
            TimerKind::NoInput => &mut self.no_input,
        }
    }

    /// Deadline currently set for `kind`
    pub fn deadline(&self, kind: TimerKind) -> Option<Instant> {
        match kind {
            TimerKind::Flush => self.flush,
            TimerKind::Silence => self.silence,
            TimerKind::NoInput => self.no_input,
        }
    }

    /// Set the deadline for `kind`, replacing any pending one
    pub fn arm(&mut self, kind: TimerKind, at: Instant) {
        *self.slot(kind) = Some(at);
    }

    /// Set the deadline for `kind` to `after` from now
    pub fn arm_in(&mut self, kind: TimerKind, after: Duration) {
        self.arm(kind, Instant::now() + after);
    }

    /// Clear the deadline for `kind`. Returns whether one was pending.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.slot(kind).take().is_some()
    }

    pub fn cancel_all(&mut self) {
        for kind in TimerKind::ALL {
            self.cancel(kind);
        }
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.deadline(kind).is_some()
    }

    /// Kinds with a pending deadline
    pub fn pending(&self) -> Vec<TimerKind> {
        TimerKind::ALL
            .into_iter()
            .filter(|&kind| self.is_armed(kind))
            .collect()
    }

    /// Earliest pending deadline; ties resolve in [`TimerKind::ALL`] order
    pub fn next_due(&self) -> Option<(TimerKind, Instant)> {
        TimerKind::ALL
            .into_iter()
            .filter_map(|kind| self.deadline(kind).map(|at| (kind, at)))
            .fold(None, |earliest, (kind, at)| match earliest {
                Some((_, best)) if best <= at => earliest,
                _ => Some((kind, at)),
            })
    }
}

/// Sleep until the earliest deadline and report its kind; pends forever
/// when nothing is armed
pub(crate) async fn wait_next(next: Option<(TimerKind, Instant)>) -> TimerKind {
    match next {
        Some((kind, at)) => {
            tokio::time::sleep_until(at).await;
            kind
        }
        None => std::future::pending().await,
    }
}
