use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// Authoritative status of a dictation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    Idle,
    Listening,
    Recognizing,
    Processing,
    Done,
    Error,
}

impl RecordingState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordingState::Done | RecordingState::Error)
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordingState::Idle => "idle",
            RecordingState::Listening => "listening",
            RecordingState::Recognizing => "recognizing",
            RecordingState::Processing => "processing",
            RecordingState::Done => "done",
            RecordingState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Returned when a transition is not in the table; the state is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: RecordingState,
    pub to: RecordingState,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid transition {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}

type Observer = Box<dyn Fn(RecordingState, RecordingState) + Send>;

/// The recording state machine.
///
/// Transitions outside the table are rejected and reported to the caller as
/// an `InvalidTransition`; the state is left untouched. Observers are invoked
/// synchronously on every accepted transition, in the order transitions
/// occur.
pub struct StateMachine {
    current: RecordingState,
    observers: Vec<Observer>,
    ended_at: Option<DateTime<Utc>>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            current: RecordingState::Idle,
            observers: Vec::new(),
            ended_at: None,
        }
    }

    pub fn current(&self) -> RecordingState {
        self.current
    }

    /// Set exactly once, on the first terminal transition.
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn observe(&mut self, observer: impl Fn(RecordingState, RecordingState) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn transition(&mut self, to: RecordingState) -> Result<(), InvalidTransition> {
        let from = self.current;
        if !allowed(from, to) {
            warn!("rejected state transition {} -> {}", from, to);
            return Err(InvalidTransition { from, to });
        }

        self.current = to;
        if to.is_terminal() && self.ended_at.is_none() {
            self.ended_at = Some(Utc::now());
        }
        for observer in &self.observers {
            observer(from, to);
        }
        Ok(())
    }

    /// Explicit reset: legal from any state, clears the terminal timestamp.
    pub fn reset(&mut self) {
        let from = self.current;
        self.current = RecordingState::Idle;
        self.ended_at = None;
        for observer in &self.observers {
            observer(from, RecordingState::Idle);
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

fn allowed(from: RecordingState, to: RecordingState) -> bool {
    use RecordingState::*;
    matches!(
        (from, to),
        (Idle, Listening)
            | (Listening, Recognizing)
            // stop() is legal before the first fragment arrives
            | (Listening, Processing)
            | (Recognizing, Processing)
            | (Processing, Done)
            | (Processing, Error)
            | (Listening, Error)
            | (Recognizing, Error)
    )
}
