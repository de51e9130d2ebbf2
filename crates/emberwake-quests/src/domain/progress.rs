//! Per-subject quest progress records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use emberwake_core::error::DomainError;
use emberwake_core::event::WorldEventKind;

use crate::domain::definition::QuestDefinition;
use crate::domain::objective::Advance;

/// Record store namespace holding one progress record per accepted quest,
/// keyed by quest id.
pub const NAMESPACE: &str = "quest_progress";

/// Where a subject stands with a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestState {
    /// Never accepted. Not stored; reported for quests without a record.
    Inactive,
    /// Accepted and being tracked.
    Active,
    /// All objectives satisfied and rewards granted.
    Completed,
    /// Given up by the subject.
    Abandoned,
}

/// Progress on one objective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveProgress {
    /// Count so far.
    pub current: u32,
    /// Count needed.
    pub required: u32,
    /// Entities already counted, for objectives where each counts once.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub counted: Vec<String>,
}

impl ObjectiveProgress {
    fn new(required: u32) -> Self {
        Self {
            current: 0,
            required,
            counted: Vec::new(),
        }
    }

    /// Whether the objective needs nothing more.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.current >= self.required
    }

    fn advance(&mut self, advance: Advance) -> bool {
        match advance {
            Advance::Count => {
                self.current = self.current.saturating_add(1).min(self.required);
                true
            }
            Advance::Distinct(entity) => {
                if self.counted.contains(&entity) {
                    return false;
                }
                self.counted.push(entity);
                self.current = u32::try_from(self.counted.len()).unwrap_or(u32::MAX);
                true
            }
        }
    }
}

/// A subject's progress on one quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestProgress {
    /// The subject.
    pub subject_id: Uuid,
    /// The quest.
    pub quest_id: String,
    /// Lifecycle state.
    pub state: QuestState,
    /// One entry per objective, in authored order.
    pub objectives: Vec<ObjectiveProgress>,
    /// When the quest was (last) accepted.
    pub accepted_at: DateTime<Utc>,
    /// When the quest completed.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// When the quest was abandoned.
    #[serde(default)]
    pub abandoned_at: Option<DateTime<Utc>>,
}

impl QuestProgress {
    /// Fresh active progress for `definition`.
    #[must_use]
    pub fn start(definition: &QuestDefinition, subject_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            subject_id,
            quest_id: definition.id.clone(),
            state: QuestState::Active,
            objectives: definition
                .objectives
                .iter()
                .map(|objective| ObjectiveProgress::new(objective.required))
                .collect(),
            accepted_at: now,
            completed_at: None,
            abandoned_at: None,
        }
    }

    /// Applies `event` to every unsatisfied objective it matches. Returns
    /// whether anything changed. Quests that are not active never change.
    pub fn record_event(&mut self, definition: &QuestDefinition, event: &WorldEventKind) -> bool {
        if self.state != QuestState::Active {
            return false;
        }
        let mut updated = false;
        for (objective, progress) in definition.objectives.iter().zip(&mut self.objectives) {
            if progress.is_satisfied() {
                continue;
            }
            if let Some(advance) = objective.kind.advance_for(event) {
                updated |= progress.advance(advance);
            }
        }
        updated
    }

    /// Whether every objective is satisfied.
    #[must_use]
    pub fn all_satisfied(&self) -> bool {
        self.objectives.iter().all(ObjectiveProgress::is_satisfied)
    }

    /// Marks the quest completed.
    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.state = QuestState::Completed;
        self.completed_at = Some(now);
    }

    /// Marks an active quest abandoned.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the quest is not active.
    pub fn abandon(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.state != QuestState::Active {
            return Err(DomainError::Validation(format!(
                "quest {} is not active",
                self.quest_id
            )));
        }
        self.state = QuestState::Abandoned;
        self.abandoned_at = Some(now);
        Ok(())
    }
}
