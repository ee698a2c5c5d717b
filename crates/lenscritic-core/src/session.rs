//! Analysis session state and its publication to observers.
//!
//! The orchestrator is the only writer. Observers either watch the latest
//! [`SessionState`] or subscribe to the stream of [`Phase`] transitions,
//! which never skips an intermediate phase.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use crate::pipeline::PreviewImage;
use crate::types::CritiqueResult;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    PreviewReady,
    Loading,
    Succeeded,
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::PreviewReady => "preview-ready",
            Phase::Loading => "loading",
            Phase::Succeeded => "succeeded",
            Phase::Failed => "failed",
        }
    }

    /// Whether only a reset can leave this phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the presentation layer can observe about a session.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Idle,
    PreviewReady {
        preview: Arc<PreviewImage>,
    },
    Loading {
        preview: Arc<PreviewImage>,
    },
    Succeeded {
        preview: Arc<PreviewImage>,
        result: CritiqueResult,
    },
    Failed {
        /// Absent when the image could not be decoded at all
        preview: Option<Arc<PreviewImage>>,
        /// User-facing error message
        message: String,
    },
}

impl SessionState {
    pub fn phase(&self) -> Phase {
        match self {
            SessionState::Idle => Phase::Idle,
            SessionState::PreviewReady { .. } => Phase::PreviewReady,
            SessionState::Loading { .. } => Phase::Loading,
            SessionState::Succeeded { .. } => Phase::Succeeded,
            SessionState::Failed { .. } => Phase::Failed,
        }
    }

    pub fn preview(&self) -> Option<&PreviewImage> {
        match self {
            SessionState::Idle => None,
            SessionState::PreviewReady { preview }
            | SessionState::Loading { preview }
            | SessionState::Succeeded { preview, .. } => Some(preview),
            SessionState::Failed { preview, .. } => preview.as_deref(),
        }
    }

    pub fn result(&self) -> Option<&CritiqueResult> {
        match self {
            SessionState::Succeeded { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SessionState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Write side of a session, shared between the orchestrator and its one
/// outstanding task.
#[derive(Debug)]
pub(crate) struct SessionPublisher {
    state: watch::Sender<SessionState>,
    transitions: broadcast::Sender<Phase>,
    generation: AtomicU64,
}

impl SessionPublisher {
    pub(crate) fn new() -> Arc<Self> {
        let (transitions, _) = broadcast::channel(32);
        Arc::new(Self {
            state: watch::Sender::new(SessionState::Idle),
            transitions,
            generation: AtomicU64::new(0),
        })
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub(crate) fn transitions(&self) -> broadcast::Receiver<Phase> {
        self.transitions.subscribe()
    }

    pub(crate) fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub(crate) fn phase(&self) -> Phase {
        self.state.borrow().phase()
    }

    /// Start a new generation; writes tagged with older generations are dropped.
    pub(crate) fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Claim the session for a new selection.
    ///
    /// The terminal-phase check and the generation bump happen under the
    /// watch lock, so a task finishing concurrently either lands first (and
    /// the selection is refused) or is retired. Returns the new generation
    /// and the phase it replaced, or the terminal phase that blocked it.
    pub(crate) fn begin_selection(&self) -> Result<(u64, Phase), Phase> {
        let mut claimed = Err(Phase::Idle);
        self.state.send_if_modified(|current| {
            let phase = current.phase();
            claimed = if phase.is_terminal() {
                Err(phase)
            } else {
                Ok((self.next_generation(), phase))
            };
            false
        });
        claimed
    }

    /// Unconditional write (orchestrator side).
    pub(crate) fn publish(&self, state: SessionState) {
        self.state.send_modify(|current| {
            *current = state;
            self.announce(current.phase());
        });
    }

    /// Write only if `generation` is still current (task side).
    ///
    /// The generation check and the transition announcement run under the
    /// watch lock, so a superseded task cannot interleave with the write of
    /// a newer selection and both observer views agree.
    pub(crate) fn publish_if_current(&self, generation: u64, state: SessionState) -> bool {
        let mut pending = Some(state);
        self.state.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            match pending.take() {
                Some(state) => {
                    *current = state;
                    self.announce(current.phase());
                    true
                }
                None => false,
            }
        })
    }

    fn announce(&self, phase: Phase) {
        tracing::info!("Session -> {phase}");
        // No subscribers is fine.
        let _ = self.transitions.send(phase);
    }
}
