//! Command handlers for the Dialogue context.
//!
//! Each handler validates the command against the catalog, runs the
//! resolver, and publishes the resulting domain events on the bus before
//! returning.

use serde::Serialize;
use tracing::{info, warn};

use emberwake_core::clock::Clock;
use emberwake_core::error::DomainError;
use emberwake_core::event::{
    DialogueCompleted, DialogueOptionChosen, NpcTalked, WorldEvent, WorldEventKind,
};
use emberwake_event_bus::EventBus;

use crate::application::resolver::{DialogueResolver, EventContext, PreparedNode, ResolvedNode};
use crate::domain::catalog::Npc;
use crate::domain::commands::{ChooseOption, Talk};
use crate::domain::consequences::Effect;

/// Result of `Talk`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TalkOutcome {
    /// The npc talked to.
    pub npc: Npc,
    /// What the npc says. `None` when no node applies.
    pub dialogue: Option<PreparedNode>,
}

/// Result of `ChooseOption`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceOutcome {
    /// The npc spoken to.
    pub npc: Npc,
    /// The node answered.
    pub dialogue_id: String,
    /// Authored position of the chosen option.
    pub option_index: usize,
    /// Text of the chosen option.
    pub option_text: String,
    /// Applied effects, in order.
    pub effects: Vec<Effect>,
    /// False when part of the consequence block could not be applied.
    pub complete: bool,
    /// Quest offered by the option.
    pub offered_quest: Option<String>,
    /// The next node.
    pub next_dialogue: Option<PreparedNode>,
    /// True when there is no next node.
    pub end_of_conversation: bool,
}

fn known_npc(resolver: &DialogueResolver, npc_id: &str) -> Result<Npc, DomainError> {
    resolver
        .catalog()
        .npc(npc_id)
        .cloned()
        .ok_or_else(|| DomainError::NotFound(format!("npc {npc_id}")))
}

/// Handles the `Talk` command: resolves the npc's applicable node and
/// publishes `npc.talked`.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the npc is unknown.
pub async fn handle_talk(
    command: &Talk,
    resolver: &DialogueResolver,
    bus: &EventBus,
    clock: &dyn Clock,
) -> Result<TalkOutcome, DomainError> {
    let npc = known_npc(resolver, &command.npc_id)?;
    let dialogue = resolver
        .get_applicable_node(&npc.id, command.subject_id)
        .await;

    bus.publish(&WorldEvent::new(
        WorldEventKind::NpcTalked(NpcTalked {
            subject_id: command.subject_id,
            npc_id: npc.id.clone(),
        }),
        command.correlation_id,
        clock,
    ))
    .await;

    info!(
        subject_id = %command.subject_id,
        npc_id = %npc.id,
        dialogue_id = dialogue.as_ref().map_or("<none>", |d| d.id.as_str()),
        "talk resolved"
    );
    Ok(TalkOutcome { npc, dialogue })
}

async fn answered_node<'r>(
    command: &ChooseOption,
    resolver: &'r DialogueResolver,
) -> Result<ResolvedNode<'r>, DomainError> {
    let Some(dialogue_id) = &command.dialogue_id else {
        return resolver
            .resolve_applicable(&command.npc_id, command.subject_id)
            .await
            .ok_or_else(|| {
                DomainError::Validation(format!("{} has nothing to say", command.npc_id))
            });
    };

    let node = resolver
        .catalog()
        .node(dialogue_id)
        .ok_or_else(|| DomainError::NotFound(format!("dialogue {dialogue_id}")))?;
    if node.npc_id != command.npc_id {
        return Err(DomainError::Validation(format!(
            "dialogue {dialogue_id} is not spoken by {}",
            command.npc_id
        )));
    }
    resolver
        .resolve_by_id(dialogue_id, command.subject_id)
        .await
        .ok_or_else(|| DomainError::Validation(format!("dialogue {dialogue_id} is not available")))
}

/// Handles the `ChooseOption` command: re-validates the answered node,
/// applies the chosen option's consequences, resolves the next node, then
/// publishes `dialogue.completed` and `dialogue.option_chosen`.
///
/// # Errors
///
/// Returns `DomainError::NotFound` for an unknown npc or node, and
/// `DomainError::Validation` when the node no longer applies, belongs to
/// another npc, or the option index is not among the visible options.
pub async fn handle_choose_option(
    command: &ChooseOption,
    resolver: &DialogueResolver,
    bus: &EventBus,
    clock: &dyn Clock,
) -> Result<ChoiceOutcome, DomainError> {
    let npc = known_npc(resolver, &command.npc_id)?;
    let answered = answered_node(command, resolver).await?;
    let Some((option_index, option)) = answered.visible_option(command.option_index) else {
        warn!(
            subject_id = %command.subject_id,
            dialogue_id = %answered.node.id,
            option_index = command.option_index,
            "invalid option index"
        );
        return Err(DomainError::Validation(format!(
            "invalid option {} for dialogue {}",
            command.option_index, answered.node.id
        )));
    };
    let dialogue_id = answered.node.id.clone();

    let outcome = resolver
        .execute_consequences(
            &npc.id,
            command.subject_id,
            &option.consequences,
            EventContext {
                bus,
                clock,
                correlation_id: command.correlation_id,
            },
        )
        .await;

    bus.publish(&WorldEvent::new(
        WorldEventKind::DialogueCompleted(DialogueCompleted {
            subject_id: command.subject_id,
            npc_id: npc.id.clone(),
            dialogue_id: dialogue_id.clone(),
        }),
        command.correlation_id,
        clock,
    ))
    .await;
    bus.publish(&WorldEvent::new(
        WorldEventKind::DialogueOptionChosen(DialogueOptionChosen {
            subject_id: command.subject_id,
            npc_id: npc.id.clone(),
            dialogue_id: dialogue_id.clone(),
            option_index,
        }),
        command.correlation_id,
        clock,
    ))
    .await;

    let end_of_conversation = outcome.next.is_none();
    Ok(ChoiceOutcome {
        npc,
        dialogue_id,
        option_index,
        option_text: option.text.clone(),
        effects: outcome.effects,
        complete: outcome.complete,
        offered_quest: outcome.offered_quest,
        next_dialogue: outcome.next,
        end_of_conversation,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use emberwake_core::event::EventName;
    use emberwake_test_support::{FixedClock, RecordingHandler};
    use uuid::Uuid;

    use super::*;
    use crate::application::test_fixtures::{Fixture, ana_pool, node, option};
    use crate::domain::condition::{Clause, Condition};
    use crate::domain::consequences::{Consequences, NextNode};

    fn job_pool() -> Vec<crate::domain::catalog::DialogueNode> {
        let mut d1 = node("d1", "npc_ana");
        let mut accept = option("accept");
        accept.consequences = Consequences {
            set_flags: vec!["job_taken".into()],
            next: NextNode::Node("d2".into()),
            ..Consequences::default()
        };
        d1.options = vec![accept];
        let mut d2 = node("d2", "npc_ana");
        d2.condition = Condition(vec![Clause::RequiresFlags {
            flags: vec!["job_taken".into()],
        }]);
        // d2 is declared after d1, so d1 must stop applying once the job is taken.
        d1.condition = Condition(vec![Clause::ForbidsFlags {
            flags: vec!["job_taken".into()],
        }]);
        vec![d1, d2]
    }

    fn talk(subject_id: Uuid, npc_id: &str) -> Talk {
        Talk {
            correlation_id: Uuid::new_v4(),
            subject_id,
            npc_id: npc_id.into(),
        }
    }

    fn choose(subject_id: Uuid, dialogue_id: Option<&str>, option_index: usize) -> ChooseOption {
        ChooseOption {
            correlation_id: Uuid::new_v4(),
            subject_id,
            npc_id: "npc_ana".into(),
            dialogue_id: dialogue_id.map(str::to_owned),
            option_index,
        }
    }

    #[tokio::test]
    async fn test_job_conversation_end_to_end() {
        // Arrange
        let fixture = Fixture::new(job_pool());
        let clock = FixedClock::default();
        let subject = Uuid::new_v4();

        // Act
        let first = handle_talk(&talk(subject, "npc_ana"), &fixture.resolver, &fixture.bus, &clock)
            .await
            .unwrap();
        let choice = handle_choose_option(
            &choose(subject, Some("d1"), 0),
            &fixture.resolver,
            &fixture.bus,
            &clock,
        )
        .await
        .unwrap();
        let second = handle_talk(&talk(subject, "npc_ana"), &fixture.resolver, &fixture.bus, &clock)
            .await
            .unwrap();

        // Assert
        assert_eq!(first.dialogue.unwrap().id, "d1");
        assert!(fixture.flags.has(subject, "job_taken").await);
        assert_eq!(choice.next_dialogue.unwrap().id, "d2");
        assert!(!choice.end_of_conversation);
        assert!(choice.complete);
        assert_eq!(second.dialogue.unwrap().id, "d2");
    }

    #[tokio::test]
    async fn test_talk_publishes_npc_talked_and_returns_empty_node_when_nothing_applies() {
        // Arrange
        let fixture = Fixture::new(ana_pool());
        let recorder = Arc::new(RecordingHandler::new());
        fixture.bus.subscribe(EventName::NpcTalked, recorder.clone());
        let subject = Uuid::new_v4();

        // Act
        let outcome = handle_talk(
            &talk(subject, "npc_bo"),
            &fixture.resolver,
            &fixture.bus,
            &FixedClock::default(),
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(outcome.npc.name, "Bo");
        assert!(outcome.dialogue.is_none());
        let events = recorder.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].subject_id(), subject);
    }

    #[tokio::test]
    async fn test_talk_to_unknown_npc_is_not_found() {
        let fixture = Fixture::new(ana_pool());

        let result = handle_talk(
            &talk(Uuid::new_v4(), "npc_ghost"),
            &fixture.resolver,
            &fixture.bus,
            &FixedClock::default(),
        )
        .await;

        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_choose_option_publishes_dialogue_events_in_order() {
        // Arrange
        let fixture = Fixture::new(ana_pool());
        let recorder = Arc::new(RecordingHandler::new());
        fixture
            .bus
            .subscribe(EventName::DialogueCompleted, recorder.clone());
        fixture
            .bus
            .subscribe(EventName::DialogueOptionChosen, recorder.clone());

        // Act
        let choice = handle_choose_option(
            &choose(Uuid::new_v4(), Some("b"), 0),
            &fixture.resolver,
            &fixture.bus,
            &FixedClock::default(),
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(
            recorder.names(),
            vec![EventName::DialogueCompleted, EventName::DialogueOptionChosen]
        );
        assert_eq!(choice.option_text, "goodbye");
        assert_eq!(choice.dialogue_id, "b");
    }

    #[tokio::test]
    async fn test_option_index_counts_visible_options_only() {
        // Arrange
        let mut gated = option("secret");
        gated.condition = Condition(vec![Clause::RequiresFlags {
            flags: vec!["knows_secret".into()],
        }]);
        let mut talk_node = node("t", "npc_ana");
        talk_node.options = vec![gated, option("small talk")];
        let fixture = Fixture::new(vec![talk_node]);

        // Act
        let choice = handle_choose_option(
            &choose(Uuid::new_v4(), Some("t"), 0),
            &fixture.resolver,
            &fixture.bus,
            &FixedClock::default(),
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(choice.option_text, "small talk");
        assert_eq!(choice.option_index, 1);
    }

    #[tokio::test]
    async fn test_choose_option_rejects_invalid_requests() {
        // Arrange
        let fixture = Fixture::new(ana_pool());
        let clock = FixedClock::default();
        let subject = Uuid::new_v4();

        // Act
        let bad_index = handle_choose_option(
            &choose(subject, Some("b"), 5),
            &fixture.resolver,
            &fixture.bus,
            &clock,
        )
        .await;
        let stale_node = handle_choose_option(
            &choose(subject, Some("a"), 0),
            &fixture.resolver,
            &fixture.bus,
            &clock,
        )
        .await;
        let unknown_node = handle_choose_option(
            &choose(subject, Some("zz"), 0),
            &fixture.resolver,
            &fixture.bus,
            &clock,
        )
        .await;

        // Assert
        assert!(matches!(bad_index, Err(DomainError::Validation(_))));
        assert!(matches!(stale_node, Err(DomainError::Validation(_))));
        assert!(matches!(unknown_node, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_choose_option_without_dialogue_id_answers_current_node() {
        let fixture = Fixture::new(ana_pool());

        let choice = handle_choose_option(
            &choose(Uuid::new_v4(), None, 0),
            &fixture.resolver,
            &fixture.bus,
            &FixedClock::default(),
        )
        .await
        .unwrap();

        assert_eq!(choice.dialogue_id, "b");
        // Resolve again lands on the same node.
        assert_eq!(choice.next_dialogue.unwrap().id, "b");
    }
}
