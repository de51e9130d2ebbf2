//! Query handlers for the Quests context.
//!
//! Joins progress records with quest content into read-only views for the
//! quest log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use emberwake_core::error::DomainError;
use emberwake_core::ledger::RewardBundle;

use crate::application::tracker::QuestTracker;
use crate::domain::definition::QuestDefinition;
use crate::domain::progress::{QuestProgress, QuestState};

/// One objective as shown in the quest log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectiveView {
    /// What is asked.
    pub description: String,
    /// Count so far.
    pub current: u32,
    /// Count needed.
    pub required: u32,
    /// Whether nothing more is needed.
    pub satisfied: bool,
}

/// One quest in the quest log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestLogEntry {
    /// Quest identifier.
    pub quest_id: String,
    /// Quest title.
    pub title: String,
    /// Lifecycle state.
    pub state: QuestState,
    /// Objectives in authored order.
    pub objectives: Vec<ObjectiveView>,
    /// Rewards granted on completion.
    pub rewards: RewardBundle,
    /// When the quest was accepted.
    pub accepted_at: DateTime<Utc>,
    /// When the quest completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the quest was abandoned.
    pub abandoned_at: Option<DateTime<Utc>>,
}

/// A quest the subject may accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableQuestView {
    /// Quest identifier.
    pub quest_id: String,
    /// Quest title.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// Objectives in authored order.
    pub objectives: Vec<String>,
    /// Rewards granted on completion.
    pub rewards: RewardBundle,
}

fn entry(progress: QuestProgress, definition: Option<&QuestDefinition>) -> QuestLogEntry {
    let labels: Vec<String> = definition.map_or_else(Vec::new, |definition| {
        definition.objectives.iter().map(|o| o.label()).collect()
    });
    let objectives = progress
        .objectives
        .iter()
        .enumerate()
        .map(|(position, objective)| ObjectiveView {
            description: labels
                .get(position)
                .cloned()
                .unwrap_or_else(|| format!("objective {}", position + 1)),
            current: objective.current,
            required: objective.required,
            satisfied: objective.is_satisfied(),
        })
        .collect();

    QuestLogEntry {
        title: definition.map_or_else(|| progress.quest_id.clone(), |d| d.title.clone()),
        rewards: definition.map(|d| d.rewards.clone()).unwrap_or_default(),
        quest_id: progress.quest_id,
        state: progress.state,
        objectives,
        accepted_at: progress.accepted_at,
        completed_at: progress.completed_at,
        abandoned_at: progress.abandoned_at,
    }
}

/// Every quest the subject ever accepted, in acceptance order.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if storage fails.
pub async fn get_quest_log(
    subject_id: Uuid,
    tracker: &QuestTracker,
) -> Result<Vec<QuestLogEntry>, DomainError> {
    Ok(tracker
        .list(subject_id)
        .await?
        .into_iter()
        .map(|progress| {
            let definition = tracker.catalog().get(&progress.quest_id);
            entry(progress, definition)
        })
        .collect())
}

/// The subject's active quests.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if storage fails.
pub async fn get_active_quests(
    subject_id: Uuid,
    tracker: &QuestTracker,
) -> Result<Vec<QuestLogEntry>, DomainError> {
    let mut log = get_quest_log(subject_id, tracker).await?;
    log.retain(|entry| entry.state == QuestState::Active);
    Ok(log)
}

/// Quests the subject has not started, or abandoned, in declaration order.
/// Requirements are not checked here; accepting does that.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if storage fails.
pub async fn get_available_quests(
    subject_id: Uuid,
    tracker: &QuestTracker,
) -> Result<Vec<AvailableQuestView>, DomainError> {
    let taken: Vec<(String, QuestState)> = tracker
        .list(subject_id)
        .await?
        .into_iter()
        .map(|progress| (progress.quest_id, progress.state))
        .collect();

    Ok(tracker
        .catalog()
        .iter()
        .filter(|quest| {
            !taken.iter().any(|(id, state)| {
                id == &quest.id && matches!(state, QuestState::Active | QuestState::Completed)
            })
        })
        .map(|quest| AvailableQuestView {
            quest_id: quest.id.clone(),
            title: quest.title.clone(),
            description: quest.description.clone(),
            objectives: quest.objectives.iter().map(|o| o.label()).collect(),
            rewards: quest.rewards.clone(),
        })
        .collect())
}
