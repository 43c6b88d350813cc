use chrono::{DateTime, Utc};
use sf_core::types::{StageType, VersionId};
use tokio::sync::broadcast;

/// Notifications for whatever surface is listening (CLI output, a UI toast
/// layer). Failures always reach here; nothing is silently swallowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    StageSaved {
        stage: StageType,
        at: DateTime<Utc>,
    },
    SaveFailed {
        stage: StageType,
        message: String,
    },
    GenerationCompleted {
        stage: StageType,
    },
    GenerationFailed {
        stage: StageType,
        message: String,
    },
    VersionRestored {
        stage: StageType,
        version: VersionId,
    },
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    pub fn publish(
        &self,
        event: EngineEvent,
    ) -> Result<(), broadcast::error::SendError<EngineEvent>> {
        self.sender.send(event).map(|_| ())
    }
}
