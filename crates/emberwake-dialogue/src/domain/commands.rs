//! Commands for the Dialogue context.

use emberwake_core::command::Command;
use uuid::Uuid;

/// Start (or resume) talking to an npc.
#[derive(Debug, Clone)]
pub struct Talk {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The subject talking.
    pub subject_id: Uuid,
    /// The npc talked to.
    pub npc_id: String,
}

impl Command for Talk {
    fn command_type(&self) -> &'static str {
        "dialogue.talk"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn subject_id(&self) -> Uuid {
        self.subject_id
    }
}

/// Answer a dialogue node with one of its visible options.
#[derive(Debug, Clone)]
pub struct ChooseOption {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The subject choosing.
    pub subject_id: Uuid,
    /// The npc spoken to.
    pub npc_id: String,
    /// The node being answered. When absent, the npc's currently
    /// applicable node is used.
    pub dialogue_id: Option<String>,
    /// Position among the options visible to the subject.
    pub option_index: usize,
}

impl Command for ChooseOption {
    fn command_type(&self) -> &'static str {
        "dialogue.choose_option"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn subject_id(&self) -> Uuid {
        self.subject_id
    }
}
