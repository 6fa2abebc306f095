use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

use crate::generation::{GenerationClient, GenerationError};
use crate::preview::render_preview;
use crate::prompt::{compose_instruction, is_blank};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Generating,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// User-facing toast raised by an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    InputRejected,
    Busy,
    Generated,
    GenerationFailed,
    Downloaded,
}

impl Notice {
    pub const ALL: [Notice; 5] = [
        Notice::InputRejected,
        Notice::Busy,
        Notice::Generated,
        Notice::GenerationFailed,
        Notice::Downloaded,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Notice::InputRejected => "input_rejected",
            Notice::Busy => "busy",
            Notice::Generated => "generated",
            Notice::GenerationFailed => "generation_failed",
            Notice::Downloaded => "downloaded",
        }
    }

    pub fn level(self) -> NoticeLevel {
        match self {
            Notice::Generated | Notice::Downloaded => NoticeLevel::Success,
            Notice::InputRejected | Notice::Busy | Notice::GenerationFailed => NoticeLevel::Error,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Notice::InputRejected => "Please enter a website description.",
            Notice::Busy => "A website is already being generated.",
            Notice::Generated => "Website generated successfully!",
            Notice::GenerationFailed => "Error generating website. Please try again.",
            Notice::Downloaded => "Code downloaded successfully!",
        }
    }
}

impl Serialize for Notice {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Notice", 3)?;
        state.serialize_field("kind", self.key())?;
        state.serialize_field("level", &self.level())?;
        state.serialize_field("message", self.message())?;
        state.end()
    }
}

/// Reasons a generate action did not produce a new artifact.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("website description is empty")]
    InputRejected,
    #[error("a generation is already in flight")]
    Busy,
    #[error(transparent)]
    Failed(#[from] GenerationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub prompt: String,
    pub loading: bool,
    pub phase: Phase,
    pub has_artifact: bool,
    pub preview: String,
}

/// View state of the builder page: draft text, lifecycle phase and the last
/// successful artifact.
#[derive(Debug)]
pub struct Workbench {
    prompt: String,
    phase: Phase,
    artifact: String,
}

impl Default for Workbench {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbench {
    pub fn new() -> Self {
        Self {
            prompt: String::new(),
            phase: Phase::Idle,
            artifact: String::new(),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Generating
    }

    pub fn set_prompt(&mut self, prompt: &str) {
        self.prompt = prompt.to_string();
    }

    /// Records the draft, then either rejects the action or moves to
    /// `Generating` and returns the composed instruction.
    pub fn begin_generation(&mut self, description: &str) -> Result<String, GenerateError> {
        self.set_prompt(description);

        if is_blank(description) {
            return Err(GenerateError::InputRejected);
        }
        if self.is_loading() {
            return Err(GenerateError::Busy);
        }

        self.phase = Phase::Generating;
        Ok(compose_instruction(description))
    }

    /// Settles an in-flight generation. Only a non-empty completion touches
    /// the artifact.
    pub fn finish_generation(
        &mut self,
        result: Result<String, GenerationError>,
    ) -> Result<(), GenerateError> {
        let result = result.and_then(|text| {
            if text.is_empty() {
                Err(GenerationError::EmptyCompletion)
            } else {
                Ok(text)
            }
        });

        match result {
            Ok(text) => {
                self.artifact = text;
                self.phase = Phase::Succeeded;
                Ok(())
            }
            Err(err) => {
                self.phase = Phase::Failed;
                Err(GenerateError::Failed(err))
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            prompt: self.prompt.clone(),
            loading: self.is_loading(),
            phase: self.phase,
            has_artifact: !self.artifact.is_empty(),
            preview: render_preview(&self.artifact),
        }
    }
}

/// Why a generate action ended without a new artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    InputRejected,
    Busy,
    GenerationFailed,
}

impl Rejection {
    pub fn notice(self) -> Notice {
        match self {
            Rejection::InputRejected => Notice::InputRejected,
            Rejection::Busy => Notice::Busy,
            Rejection::GenerationFailed => Notice::GenerationFailed,
        }
    }
}

impl GenerateError {
    pub fn rejection(&self) -> Rejection {
        match self {
            GenerateError::InputRejected => Rejection::InputRejected,
            GenerateError::Busy => Rejection::Busy,
            GenerateError::Failed(_) => Rejection::GenerationFailed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub rejection: Option<Rejection>,
    pub snapshot: Snapshot,
}

impl GenerationOutcome {
    pub fn succeeded(&self) -> bool {
        self.rejection.is_none()
    }

    pub fn notice(&self) -> Notice {
        self.rejection
            .map(Rejection::notice)
            .unwrap_or(Notice::Generated)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("workbench lock poisoned")]
pub struct LockPoisoned;

/// Puts a workbench back to `Idle` if the generation future is dropped
/// before the call settles.
struct InFlight<'a> {
    workbench: &'a Mutex<Workbench>,
    armed: bool,
}

impl InFlight<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(mut bench) = self.workbench.lock() {
            if bench.phase == Phase::Generating {
                bench.phase = Phase::Idle;
                warn!("generation abandoned before completion");
            }
        }
    }
}

/// Runs one generate action against `client`. The lock is released while the
/// call is outstanding so drafts and snapshots stay available.
pub async fn run_generation(
    workbench: &Mutex<Workbench>,
    client: &dyn GenerationClient,
    description: &str,
) -> Result<GenerationOutcome, LockPoisoned> {
    let begun = {
        let mut bench = workbench.lock().map_err(|_| LockPoisoned)?;
        match bench.begin_generation(description) {
            Ok(instruction) => Ok(instruction),
            Err(err) => Err((err, bench.snapshot())),
        }
    };

    let instruction = match begun {
        Ok(instruction) => instruction,
        Err((err, snapshot)) => {
            warn!(reason = %err, "generate action rejected");
            return Ok(GenerationOutcome {
                rejection: Some(err.rejection()),
                snapshot,
            });
        }
    };

    let in_flight = InFlight {
        workbench,
        armed: true,
    };
    let result = client.generate(&instruction).await;

    let mut bench = workbench.lock().map_err(|_| LockPoisoned)?;
    let settled = bench.finish_generation(result);
    let artifact_bytes = bench.artifact().len();
    let snapshot = bench.snapshot();
    drop(bench);
    in_flight.disarm();

    match settled {
        Ok(()) => {
            info!(bytes = artifact_bytes, "website generated");
            Ok(GenerationOutcome {
                rejection: None,
                snapshot,
            })
        }
        Err(err) => {
            error!(error = %err, "generation error");
            Ok(GenerationOutcome {
                rejection: Some(err.rejection()),
                snapshot,
            })
        }
    }
}

pub type SessionId = u64;

/// One fresh [`Workbench`] per page load. The oldest sessions are evicted
/// once [`SessionRegistry::MAX_SESSIONS`] is exceeded.
#[derive(Debug)]
pub struct SessionRegistry {
    next_id: AtomicU64,
    sessions: Mutex<BTreeMap<SessionId, Arc<Mutex<Workbench>>>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub const MAX_SESSIONS: usize = 16;

    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            sessions: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn open(&self) -> Result<(SessionId, Arc<Mutex<Workbench>>), LockPoisoned> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let bench = Arc::new(Mutex::new(Workbench::new()));

        let mut sessions = self.sessions.lock().map_err(|_| LockPoisoned)?;
        sessions.insert(id, bench.clone());
        while sessions.len() > Self::MAX_SESSIONS {
            if sessions.pop_first().is_none() {
                break;
            }
        }
        debug!(session = id, open = sessions.len(), "session opened");
        Ok((id, bench))
    }

    pub fn get(&self, id: SessionId) -> Result<Option<Arc<Mutex<Workbench>>>, LockPoisoned> {
        let sessions = self.sessions.lock().map_err(|_| LockPoisoned)?;
        Ok(sessions.get(&id).cloned())
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
