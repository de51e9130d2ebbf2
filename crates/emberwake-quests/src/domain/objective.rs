//! Typed quest objectives and how domain events advance them.

use std::fmt;

use serde::{Deserialize, Serialize};

use emberwake_core::event::{EventName, WorldEventKind};

/// The semantic kind of an objective, independent of how content spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveType {
    /// Obtain an item.
    Collect,
    /// Defeat enemies of a type.
    Defeat,
    /// Visit a location.
    Visit,
    /// Talk to one npc.
    TalkTo,
    /// Talk to each npc of a set; each npc counts once.
    TalkToEach,
    /// Finish one of a set of dialogue nodes.
    Dialogue,
    /// Pick a specific option of a dialogue node.
    DialogueChoice,
}

/// Every accepted spelling of every objective type. Content written for
/// older versions of the game still loads.
const ALIASES: &[(&str, ObjectiveType)] = &[
    ("collect", ObjectiveType::Collect),
    ("collect_item", ObjectiveType::Collect),
    ("recolectar", ObjectiveType::Collect),
    ("defeat", ObjectiveType::Defeat),
    ("kill", ObjectiveType::Defeat),
    ("matar", ObjectiveType::Defeat),
    ("visit", ObjectiveType::Visit),
    ("explore", ObjectiveType::Visit),
    ("explorar", ObjectiveType::Visit),
    ("talk_to", ObjectiveType::TalkTo),
    ("talk_npc", ObjectiveType::TalkTo),
    ("hablar_npc", ObjectiveType::TalkTo),
    ("talk_to_each", ObjectiveType::TalkToEach),
    ("dialogue_multiple", ObjectiveType::TalkToEach),
    ("dialogo_multiple", ObjectiveType::TalkToEach),
    ("dialogue", ObjectiveType::Dialogue),
    ("dialogo", ObjectiveType::Dialogue),
    ("dialogue_choice", ObjectiveType::DialogueChoice),
    ("dialogo_choice", ObjectiveType::DialogueChoice),
];

impl ObjectiveType {
    /// Resolves a content spelling. Matching ignores case and surrounding
    /// whitespace.
    #[must_use]
    pub fn from_alias(name: &str) -> Option<Self> {
        let name = name.trim();
        ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
            .map(|&(_, kind)| kind)
    }

    /// All accepted spellings.
    pub fn aliases() -> impl Iterator<Item = &'static str> {
        ALIASES.iter().map(|&(alias, _)| alias)
    }

    /// The event that advances objectives of this type.
    #[must_use]
    pub fn event(self) -> EventName {
        match self {
            Self::Collect => EventName::ItemObtained,
            Self::Defeat => EventName::EnemyKilled,
            Self::Visit => EventName::LocationVisited,
            Self::TalkTo | Self::TalkToEach => EventName::NpcTalked,
            Self::Dialogue => EventName::DialogueCompleted,
            Self::DialogueChoice => EventName::DialogueOptionChosen,
        }
    }
}

/// The events the quest tracker listens to.
pub const TRACKED_EVENTS: [EventName; 6] = [
    EventName::DialogueCompleted,
    EventName::DialogueOptionChosen,
    EventName::ItemObtained,
    EventName::EnemyKilled,
    EventName::LocationVisited,
    EventName::NpcTalked,
];

/// What an objective asks for, with its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectiveKind {
    /// Obtain `item_id`.
    Collect {
        /// Item identifier.
        item_id: String,
    },
    /// Defeat enemies of `enemy_type`.
    Defeat {
        /// Enemy type.
        enemy_type: String,
    },
    /// Visit `location_id`.
    Visit {
        /// Location identifier.
        location_id: String,
    },
    /// Talk to `npc_id`.
    TalkTo {
        /// Npc identifier.
        npc_id: String,
    },
    /// Talk to each npc in `npc_ids`.
    TalkToEach {
        /// Npc identifiers.
        npc_ids: Vec<String>,
    },
    /// Finish any node in `dialogue_ids`.
    Dialogue {
        /// Dialogue node identifiers.
        dialogue_ids: Vec<String>,
    },
    /// Pick option `option_index` (as authored) of `dialogue_id`.
    DialogueChoice {
        /// Dialogue node identifier.
        dialogue_id: String,
        /// Authored option position.
        option_index: usize,
    },
}

/// How a matching event advances an objective.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Add one.
    Count,
    /// Count this entity once.
    Distinct(String),
}

impl ObjectiveKind {
    /// The semantic type.
    #[must_use]
    pub fn objective_type(&self) -> ObjectiveType {
        match self {
            Self::Collect { .. } => ObjectiveType::Collect,
            Self::Defeat { .. } => ObjectiveType::Defeat,
            Self::Visit { .. } => ObjectiveType::Visit,
            Self::TalkTo { .. } => ObjectiveType::TalkTo,
            Self::TalkToEach { .. } => ObjectiveType::TalkToEach,
            Self::Dialogue { .. } => ObjectiveType::Dialogue,
            Self::DialogueChoice { .. } => ObjectiveType::DialogueChoice,
        }
    }

    /// How `event` advances this objective, or `None` if it does not match.
    #[must_use]
    pub fn advance_for(&self, event: &WorldEventKind) -> Option<Advance> {
        let matched = match (self, event) {
            (Self::Collect { item_id }, WorldEventKind::ItemObtained(p)) => p.item_id == *item_id,
            (Self::Defeat { enemy_type }, WorldEventKind::EnemyKilled(p)) => {
                p.enemy_type == *enemy_type
            }
            (Self::Visit { location_id }, WorldEventKind::LocationVisited(p)) => {
                p.location_id == *location_id
            }
            (Self::TalkTo { npc_id }, WorldEventKind::NpcTalked(p)) => p.npc_id == *npc_id,
            (Self::TalkToEach { npc_ids }, WorldEventKind::NpcTalked(p)) => {
                return npc_ids
                    .contains(&p.npc_id)
                    .then(|| Advance::Distinct(p.npc_id.clone()));
            }
            (Self::Dialogue { dialogue_ids }, WorldEventKind::DialogueCompleted(p)) => {
                dialogue_ids.contains(&p.dialogue_id)
            }
            (
                Self::DialogueChoice {
                    dialogue_id,
                    option_index,
                },
                WorldEventKind::DialogueOptionChosen(p),
            ) => p.dialogue_id == *dialogue_id && p.option_index == *option_index,
            _ => false,
        };
        matched.then_some(Advance::Count)
    }
}

impl fmt::Display for ObjectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collect { item_id } => write!(f, "obtain {item_id}"),
            Self::Defeat { enemy_type } => write!(f, "defeat {enemy_type}"),
            Self::Visit { location_id } => write!(f, "visit {location_id}"),
            Self::TalkTo { npc_id } => write!(f, "talk to {npc_id}"),
            Self::TalkToEach { npc_ids } => write!(f, "talk to each of {}", npc_ids.join(", ")),
            Self::Dialogue { dialogue_ids } => write!(f, "finish {}", dialogue_ids.join(" or ")),
            Self::DialogueChoice {
                dialogue_id,
                option_index,
            } => write!(f, "choose option {option_index} of {dialogue_id}"),
        }
    }
}

/// One objective of a quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    /// What is asked.
    #[serde(flatten)]
    pub kind: ObjectiveKind,
    /// Count needed to satisfy the objective.
    pub required: u32,
    /// Text shown in the quest log; generated from the kind when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Objective {
    /// Text shown in the quest log.
    #[must_use]
    pub fn label(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| self.kind.to_string())
    }
}
