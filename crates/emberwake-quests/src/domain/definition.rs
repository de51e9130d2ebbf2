//! Quest content loaded at startup.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use emberwake_core::error::DomainError;
use emberwake_core::ledger::{CharacterSheet, RewardBundle};

use crate::domain::objective::{Objective, ObjectiveKind};

/// Predicates on the subject checked when a quest is accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestRequirements {
    /// Minimum character level.
    pub min_level: Option<u32>,
    /// Minimum standing with the settlement.
    pub min_standing: Option<i32>,
}

impl QuestRequirements {
    /// Whether there is anything to check.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min_level.is_none() && self.min_standing.is_none()
    }

    /// The first unmet requirement, as a user-facing reason.
    #[must_use]
    pub fn unmet_by(&self, sheet: Option<&CharacterSheet>) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let Some(sheet) = sheet else {
            return Some("a character is required".to_owned());
        };
        if let Some(min) = self.min_level
            && sheet.level < min
        {
            return Some(format!("requires level {min}"));
        }
        if let Some(min) = self.min_standing
            && sheet.standing < min
        {
            return Some(format!("requires standing {min}"));
        }
        None
    }
}

/// A quest as authored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestDefinition {
    /// Quest identifier.
    pub id: String,
    /// Title shown in the quest log.
    pub title: String,
    /// Longer description.
    #[serde(default)]
    pub description: String,
    /// Objectives in authored order.
    pub objectives: Vec<Objective>,
    /// Granted once, on completion.
    #[serde(default)]
    pub rewards: RewardBundle,
    /// Checked on accept.
    #[serde(default)]
    pub requirements: QuestRequirements,
}

impl QuestDefinition {
    fn check(&self) -> Result<(), DomainError> {
        if self.objectives.is_empty() {
            return Err(DomainError::Validation(format!(
                "quest {} has no objectives",
                self.id
            )));
        }
        for (position, objective) in self.objectives.iter().enumerate() {
            if objective.required == 0 {
                return Err(DomainError::Validation(format!(
                    "quest {} objective {position} requires nothing",
                    self.id
                )));
            }
            if let ObjectiveKind::TalkToEach { npc_ids } = &objective.kind
                && usize::try_from(objective.required)
                    .map_or(true, |n| n > npc_ids.iter().collect::<HashSet<_>>().len())
            {
                return Err(DomainError::Validation(format!(
                    "quest {} objective {position} needs more npcs than it lists",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

/// Every quest, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct QuestCatalog {
    quests: Vec<QuestDefinition>,
    by_id: HashMap<String, usize>,
}

impl QuestCatalog {
    /// Builds a catalog.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for duplicate ids, quests without
    /// objectives and objectives that can never be satisfied.
    pub fn new(quests: Vec<QuestDefinition>) -> Result<Self, DomainError> {
        let mut by_id = HashMap::with_capacity(quests.len());
        for (position, quest) in quests.iter().enumerate() {
            quest.check()?;
            if by_id.insert(quest.id.clone(), position).is_some() {
                return Err(DomainError::Validation(format!(
                    "duplicate quest id {}",
                    quest.id
                )));
            }
        }
        Ok(Self { quests, by_id })
    }

    /// Looks up a quest.
    #[must_use]
    pub fn get(&self, quest_id: &str) -> Option<&QuestDefinition> {
        self.by_id.get(quest_id).map(|&i| &self.quests[i])
    }

    /// Quests in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &QuestDefinition> {
        self.quests.iter()
    }

    /// Number of quests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.quests.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quests.is_empty()
    }
}
