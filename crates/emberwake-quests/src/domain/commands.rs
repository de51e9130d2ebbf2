//! Commands for the Quests context.

use emberwake_core::command::Command;
use uuid::Uuid;

/// Accept a quest.
#[derive(Debug, Clone)]
pub struct AcceptQuest {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The subject accepting.
    pub subject_id: Uuid,
    /// The quest.
    pub quest_id: String,
}

impl Command for AcceptQuest {
    fn command_type(&self) -> &'static str {
        "quests.accept"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn subject_id(&self) -> Uuid {
        self.subject_id
    }
}

/// Abandon an active quest.
#[derive(Debug, Clone)]
pub struct AbandonQuest {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The subject abandoning.
    pub subject_id: Uuid,
    /// The quest.
    pub quest_id: String,
}

impl Command for AbandonQuest {
    fn command_type(&self) -> &'static str {
        "quests.abandon"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn subject_id(&self) -> Uuid {
        self.subject_id
    }
}
