//! What choosing a dialogue option does.

use serde::Serialize;

use emberwake_core::ledger::{ItemGrant, LevelProgress};

/// Where the conversation goes after a choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "dialogue_id", rename_all = "snake_case")]
pub enum NextNode {
    /// Jump to this node, if its condition still holds.
    Node(String),
    /// Resolve the speaker's applicable node again with the new state.
    #[default]
    Resolve,
}

/// A relationship change towards one npc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipChange {
    /// The npc.
    pub npc_id: String,
    /// Signed delta.
    pub delta: i32,
}

/// Mutations applied, in this field order, when an option is chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Consequences {
    /// Flags to set.
    pub set_flags: Vec<String>,
    /// Flags to remove.
    pub remove_flags: Vec<String>,
    /// Items to give.
    pub give_items: Vec<ItemGrant>,
    /// Items to take away. A shortfall is reported, not undone.
    pub remove_items: Vec<ItemGrant>,
    /// Relationship deltas.
    pub relationships: Vec<RelationshipChange>,
    /// Experience to grant.
    pub experience: u32,
    /// Quest offered to the subject.
    pub start_quest: Option<String>,
    /// Next node.
    pub next: NextNode,
}

impl Consequences {
    /// Whether the block changes nothing and just resolves the next node.
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.set_flags.is_empty()
            && self.remove_flags.is_empty()
            && self.give_items.is_empty()
            && self.remove_items.is_empty()
            && self.relationships.is_empty()
            && self.experience == 0
            && self.start_quest.is_none()
    }
}

/// One entry in the effect log of a consequence block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// A flag was set (`newly_set` is false if it already was).
    FlagSet {
        /// Flag name.
        flag: String,
        /// Whether the flag was absent before.
        newly_set: bool,
    },
    /// A flag was removed.
    FlagRemoved {
        /// Flag name.
        flag: String,
        /// Whether the flag was present before.
        removed: bool,
    },
    /// Items were added.
    ItemGranted {
        /// Item identifier.
        item_id: String,
        /// Quantity given.
        quantity: u32,
        /// Quantity now held.
        total: u32,
    },
    /// Items were taken away.
    ItemRemoved {
        /// Item identifier.
        item_id: String,
        /// Quantity removed.
        quantity: u32,
    },
    /// The subject held too few items; nothing was removed.
    ItemRemovalFailed {
        /// Item identifier.
        item_id: String,
        /// Quantity that was required.
        quantity: u32,
    },
    /// A relationship value changed.
    RelationshipChanged {
        /// The npc.
        npc_id: String,
        /// Signed delta.
        delta: i32,
        /// Value after the change.
        value: i32,
    },
    /// Experience was granted. `progress` is absent for subjects without a
    /// character sheet.
    ExperienceGained {
        /// Amount granted.
        amount: u32,
        /// Level state after the grant.
        progress: Option<LevelProgress>,
    },
    /// A quest was offered to the subject.
    QuestOffered {
        /// Quest identifier.
        quest_id: String,
    },
    /// Storage failed; later mutations in the block were skipped.
    StorageFailed {
        /// The step that failed.
        step: String,
        /// User-facing reason.
        message: String,
    },
}

impl Effect {
    /// Whether this entry marks the block as only partially applied.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Effect::ItemRemovalFailed { .. } | Effect::StorageFailed { .. }
        )
    }
}
