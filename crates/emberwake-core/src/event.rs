//! Domain event contract.
//!
//! Every fact broadcast on the event bus is one variant of the closed
//! `WorldEventKind` enumeration, each with a typed payload. Collaborators can
//! publish or subscribe to any variant without the other side changing.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;
use crate::ledger::RewardBundle;

/// The namespaced name of a domain event, used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventName {
    /// `dialogue.completed`
    #[serde(rename = "dialogue.completed")]
    DialogueCompleted,
    /// `dialogue.option_chosen`
    #[serde(rename = "dialogue.option_chosen")]
    DialogueOptionChosen,
    /// `item.obtained`
    #[serde(rename = "item.obtained")]
    ItemObtained,
    /// `item.used`
    #[serde(rename = "item.used")]
    ItemUsed,
    /// `item.removed`
    #[serde(rename = "item.removed")]
    ItemRemoved,
    /// `enemy.killed`
    #[serde(rename = "enemy.killed")]
    EnemyKilled,
    /// `location.visited`
    #[serde(rename = "location.visited")]
    LocationVisited,
    /// `npc.talked`
    #[serde(rename = "npc.talked")]
    NpcTalked,
    /// `quest.accepted`
    #[serde(rename = "quest.accepted")]
    QuestAccepted,
    /// `quest.completed`
    #[serde(rename = "quest.completed")]
    QuestCompleted,
}

impl EventName {
    /// Every event name in the contract.
    pub const ALL: [EventName; 10] = [
        EventName::DialogueCompleted,
        EventName::DialogueOptionChosen,
        EventName::ItemObtained,
        EventName::ItemUsed,
        EventName::ItemRemoved,
        EventName::EnemyKilled,
        EventName::LocationVisited,
        EventName::NpcTalked,
        EventName::QuestAccepted,
        EventName::QuestCompleted,
    ];

    /// Returns the wire name of the event.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventName::DialogueCompleted => "dialogue.completed",
            EventName::DialogueOptionChosen => "dialogue.option_chosen",
            EventName::ItemObtained => "item.obtained",
            EventName::ItemUsed => "item.used",
            EventName::ItemRemoved => "item.removed",
            EventName::EnemyKilled => "enemy.killed",
            EventName::LocationVisited => "location.visited",
            EventName::NpcTalked => "npc.talked",
            EventName::QuestAccepted => "quest.accepted",
            EventName::QuestCompleted => "quest.completed",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| format!("unknown event name: {s}"))
    }
}

/// Payload of `dialogue.completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueCompleted {
    /// The subject that finished the dialogue node.
    pub subject_id: Uuid,
    /// The npc that spoke the node.
    pub npc_id: String,
    /// The dialogue node identifier.
    pub dialogue_id: String,
}

/// Payload of `dialogue.option_chosen`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueOptionChosen {
    /// The subject that chose the option.
    pub subject_id: Uuid,
    /// The npc that spoke the node.
    pub npc_id: String,
    /// The dialogue node identifier.
    pub dialogue_id: String,
    /// The option's position in the node as authored.
    pub option_index: usize,
}

/// Payload of `item.obtained`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemObtained {
    /// The subject that obtained the item.
    pub subject_id: Uuid,
    /// The item identifier.
    pub item_id: String,
    /// How many were obtained.
    pub quantity: u32,
}

/// Payload of `item.used`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUsed {
    /// The subject that used the item.
    pub subject_id: Uuid,
    /// The item identifier.
    pub item_id: String,
}

/// Payload of `item.removed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRemoved {
    /// The subject that lost the item.
    pub subject_id: Uuid,
    /// The item identifier.
    pub item_id: String,
    /// How many were removed.
    pub quantity: u32,
}

/// Payload of `enemy.killed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyKilled {
    /// The subject credited with the kill.
    pub subject_id: Uuid,
    /// The enemy type (what quests count).
    pub enemy_type: String,
    /// The specific enemy instance.
    pub enemy_id: String,
}

/// Payload of `location.visited`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationVisited {
    /// The subject that arrived.
    pub subject_id: Uuid,
    /// The location identifier.
    pub location_id: String,
}

/// Payload of `npc.talked`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcTalked {
    /// The subject that talked.
    pub subject_id: Uuid,
    /// The npc talked to.
    pub npc_id: String,
}

/// Payload of `quest.accepted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestAccepted {
    /// The subject that accepted the quest.
    pub subject_id: Uuid,
    /// The quest identifier.
    pub quest_id: String,
}

/// Payload of `quest.completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestCompleted {
    /// The subject that completed the quest.
    pub subject_id: Uuid,
    /// The quest identifier.
    pub quest_id: String,
    /// The rewards granted on completion.
    pub rewards: RewardBundle,
}

/// Event payload variants. Serialized as `{ "name": ..., "payload": {...} }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "payload")]
pub enum WorldEventKind {
    /// A dialogue node was answered.
    #[serde(rename = "dialogue.completed")]
    DialogueCompleted(DialogueCompleted),
    /// A specific dialogue option was chosen.
    #[serde(rename = "dialogue.option_chosen")]
    DialogueOptionChosen(DialogueOptionChosen),
    /// An item entered a subject's inventory.
    #[serde(rename = "item.obtained")]
    ItemObtained(ItemObtained),
    /// An item was used.
    #[serde(rename = "item.used")]
    ItemUsed(ItemUsed),
    /// An item left a subject's inventory.
    #[serde(rename = "item.removed")]
    ItemRemoved(ItemRemoved),
    /// An enemy was defeated.
    #[serde(rename = "enemy.killed")]
    EnemyKilled(EnemyKilled),
    /// A location was visited.
    #[serde(rename = "location.visited")]
    LocationVisited(LocationVisited),
    /// A conversation with an npc started.
    #[serde(rename = "npc.talked")]
    NpcTalked(NpcTalked),
    /// A quest was accepted.
    #[serde(rename = "quest.accepted")]
    QuestAccepted(QuestAccepted),
    /// A quest was completed and rewarded.
    #[serde(rename = "quest.completed")]
    QuestCompleted(QuestCompleted),
}

impl WorldEventKind {
    /// Returns the event name this payload is published under.
    #[must_use]
    pub fn name(&self) -> EventName {
        match self {
            WorldEventKind::DialogueCompleted(_) => EventName::DialogueCompleted,
            WorldEventKind::DialogueOptionChosen(_) => EventName::DialogueOptionChosen,
            WorldEventKind::ItemObtained(_) => EventName::ItemObtained,
            WorldEventKind::ItemUsed(_) => EventName::ItemUsed,
            WorldEventKind::ItemRemoved(_) => EventName::ItemRemoved,
            WorldEventKind::EnemyKilled(_) => EventName::EnemyKilled,
            WorldEventKind::LocationVisited(_) => EventName::LocationVisited,
            WorldEventKind::NpcTalked(_) => EventName::NpcTalked,
            WorldEventKind::QuestAccepted(_) => EventName::QuestAccepted,
            WorldEventKind::QuestCompleted(_) => EventName::QuestCompleted,
        }
    }

    /// Returns the subject the event is about.
    #[must_use]
    pub fn subject_id(&self) -> Uuid {
        match self {
            WorldEventKind::DialogueCompleted(p) => p.subject_id,
            WorldEventKind::DialogueOptionChosen(p) => p.subject_id,
            WorldEventKind::ItemObtained(p) => p.subject_id,
            WorldEventKind::ItemUsed(p) => p.subject_id,
            WorldEventKind::ItemRemoved(p) => p.subject_id,
            WorldEventKind::EnemyKilled(p) => p.subject_id,
            WorldEventKind::LocationVisited(p) => p.subject_id,
            WorldEventKind::NpcTalked(p) => p.subject_id,
            WorldEventKind::QuestAccepted(p) => p.subject_id,
            WorldEventKind::QuestCompleted(p) => p.subject_id,
        }
    }
}

/// Metadata attached to every published event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Correlation ID of the command that started the cascade.
    pub correlation_id: Uuid,
    /// The event that caused this one, if it was published from a handler.
    pub causation_id: Option<Uuid>,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

/// Envelope published on the event bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: WorldEventKind,
}

impl WorldEvent {
    /// Creates an event at the root of a cascade.
    #[must_use]
    pub fn new(kind: WorldEventKind, correlation_id: Uuid, clock: &dyn Clock) -> Self {
        Self {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                correlation_id,
                causation_id: None,
                occurred_at: clock.now(),
            },
            kind,
        }
    }

    /// Creates an event published in reaction to `cause`, inheriting its
    /// correlation ID.
    #[must_use]
    pub fn caused_by(cause: &WorldEvent, kind: WorldEventKind, clock: &dyn Clock) -> Self {
        Self {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                correlation_id: cause.metadata.correlation_id,
                causation_id: Some(cause.metadata.event_id),
                occurred_at: clock.now(),
            },
            kind,
        }
    }

    /// Returns the event name.
    #[must_use]
    pub fn name(&self) -> EventName {
        self.kind.name()
    }

    /// Returns the subject the event is about.
    #[must_use]
    pub fn subject_id(&self) -> Uuid {
        self.kind.subject_id()
    }
}
