//! Authoring format of content documents.
//!
//! One document may hold any mix of npcs, dialogue nodes and quests. Field
//! aliases accept the spellings used by older content.

use std::collections::BTreeMap;

use serde::Deserialize;

use emberwake_core::ledger::{ItemGrant, RewardBundle};
use emberwake_quests::domain::definition::QuestRequirements;

/// A content document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentDocument {
    /// Npcs.
    pub npcs: Vec<NpcDoc>,
    /// Dialogue nodes, in declaration order.
    #[serde(alias = "dialogue")]
    pub dialogues: Vec<DialogueDoc>,
    /// Quests.
    pub quests: Vec<QuestDoc>,
}

/// An npc.
#[derive(Debug, Clone, Deserialize)]
pub struct NpcDoc {
    /// Npc identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// A condition block. Every listed requirement must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConditionDoc {
    /// Flags that must be set.
    #[serde(alias = "requires_flags")]
    pub flags: Vec<String>,
    /// Flags that must not be set.
    #[serde(alias = "forbids_flags", alias = "forbidden_flags")]
    pub forbids: Vec<String>,
    /// Items the subject must hold. A quantity of 1 when omitted.
    pub items: Vec<ItemGrant>,
    /// Minimum stat values.
    pub stats: BTreeMap<String, i32>,
    /// Minimum relationship values per npc.
    pub relationships: BTreeMap<String, i32>,
}

/// A single stat threshold on an option.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatCheckDoc {
    /// Stat name.
    pub stat: String,
    /// Minimum value.
    pub min: i32,
}

/// What choosing an option does.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsequencesDoc {
    /// Flags to set.
    pub set_flags: Vec<String>,
    /// Flags to remove.
    pub remove_flags: Vec<String>,
    /// Items to give.
    pub give_items: Vec<ItemGrant>,
    /// Items to take.
    pub remove_items: Vec<ItemGrant>,
    /// Relationship deltas per npc.
    pub relationships: BTreeMap<String, i32>,
    /// Experience to grant.
    #[serde(alias = "xp")]
    pub experience: u32,
    /// Quest offered to the subject.
    pub start_quest: Option<String>,
    /// Explicit next node. When absent the speaker's node is resolved again.
    #[serde(alias = "next_dialogue")]
    pub next: Option<String>,
}

/// A dialogue option.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionDoc {
    /// Text shown to the subject.
    pub text: String,
    /// Visibility condition.
    #[serde(default)]
    pub requires: ConditionDoc,
    /// Shorthand for one stat threshold; added to `requires`.
    #[serde(default)]
    pub stat_check: Option<StatCheckDoc>,
    /// Consequences.
    #[serde(default)]
    pub consequences: ConsequencesDoc,
}

/// A dialogue node.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DialogueDoc {
    /// Node identifier.
    pub id: String,
    /// Speaking npc.
    #[serde(alias = "speaker", alias = "npc_id")]
    pub npc: String,
    /// Spoken text.
    pub text: String,
    /// Node condition.
    #[serde(default)]
    pub requires: ConditionDoc,
    /// Options in authored order.
    #[serde(default)]
    pub options: Vec<OptionDoc>,
}

/// A quest objective as authored. Which target field is read depends on
/// the objective type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObjectiveDoc {
    /// Objective type; any spelling in the alias table.
    #[serde(rename = "type", alias = "kind")]
    pub objective_type: String,
    /// Generic target for single-target types.
    pub target: Option<String>,
    /// Item to obtain.
    pub item_id: Option<String>,
    /// Enemy type to defeat.
    pub enemy_type: Option<String>,
    /// Location to visit.
    pub location_id: Option<String>,
    /// Npc to talk to.
    pub npc_id: Option<String>,
    /// Npcs to talk to, each once.
    pub npc_ids: Vec<String>,
    /// Dialogue node to finish or answer.
    pub dialogue_id: Option<String>,
    /// Dialogue nodes, any of which counts.
    pub dialogue_ids: Vec<String>,
    /// Option to choose, as authored.
    pub option_index: Option<usize>,
    /// Count needed. Defaults to the number of npcs for talk-to-each and
    /// to 1 otherwise.
    #[serde(alias = "count", alias = "quantity")]
    pub required: Option<u32>,
    /// Quest log text.
    pub description: Option<String>,
}

/// A quest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuestDoc {
    /// Quest identifier.
    pub id: String,
    /// Title.
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Objectives in authored order.
    pub objectives: Vec<ObjectiveDoc>,
    /// Rewards.
    #[serde(default)]
    pub rewards: RewardBundle,
    /// Accept requirements.
    #[serde(default)]
    pub requirements: QuestRequirements,
}
