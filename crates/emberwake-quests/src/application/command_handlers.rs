//! Command handlers for the Quests context.

use tracing::info;

use emberwake_core::clock::Clock;
use emberwake_core::command::Command;
use emberwake_core::error::DomainError;
use emberwake_core::event::{QuestAccepted, WorldEvent, WorldEventKind};
use emberwake_event_bus::EventBus;

use crate::application::tracker::QuestTracker;
use crate::domain::commands::{AbandonQuest, AcceptQuest};
use crate::domain::progress::QuestProgress;

/// Handles the `AcceptQuest` command and publishes `quest.accepted`.
///
/// # Errors
///
/// Returns `DomainError::NotFound` for an unknown quest and
/// `DomainError::Validation` if the quest is already active or completed or
/// the subject does not meet its requirements.
pub async fn handle_accept_quest(
    command: &AcceptQuest,
    tracker: &QuestTracker,
    bus: &EventBus,
    clock: &dyn Clock,
) -> Result<QuestProgress, DomainError> {
    let progress = tracker
        .accept(command.subject_id, &command.quest_id)
        .await?;

    bus.publish(&WorldEvent::new(
        WorldEventKind::QuestAccepted(QuestAccepted {
            subject_id: command.subject_id,
            quest_id: command.quest_id.clone(),
        }),
        command.correlation_id(),
        clock,
    ))
    .await;

    info!(
        command = command.command_type(),
        correlation_id = %command.correlation_id,
        quest_id = %command.quest_id,
        "command handled"
    );
    Ok(progress)
}

/// Handles the `AbandonQuest` command.
///
/// # Errors
///
/// Returns `DomainError::NotFound` for an unknown quest and
/// `DomainError::Validation` if the quest is not active.
pub async fn handle_abandon_quest(
    command: &AbandonQuest,
    tracker: &QuestTracker,
) -> Result<QuestProgress, DomainError> {
    let progress = tracker
        .abandon(command.subject_id, &command.quest_id)
        .await?;
    info!(
        command = command.command_type(),
        correlation_id = %command.correlation_id,
        quest_id = %command.quest_id,
        "command handled"
    );
    Ok(progress)
}
