//! Dialogue resolution and consequence execution.
//!
//! Subject state is read through the flag store and the collaborator
//! ledgers. Read failures are logged and make the affected clauses false, so
//! a storage outage looks like "no dialogue applies" rather than an error.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use emberwake_core::clock::Clock;
use emberwake_core::error::DomainError;
use emberwake_core::event::{ItemObtained, ItemRemoved, WorldEvent, WorldEventKind};
use emberwake_core::ledger::{CharacterSheets, Inventory, Relationships};
use emberwake_event_bus::EventBus;
use emberwake_flags::FlagStore;

use crate::domain::catalog::{DialogueCatalog, DialogueNode, DialogueOption};
use crate::domain::condition::{Condition, SubjectSnapshot};
use crate::domain::consequences::{Consequences, Effect, NextNode};

/// An option as shown to the subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedOption {
    /// Position of the option in the node as authored.
    pub index: usize,
    /// Option text.
    pub text: String,
}

/// A node with only the options the subject may pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedNode {
    /// Node identifier.
    pub id: String,
    /// Speaking npc.
    pub npc_id: String,
    /// Spoken text.
    pub text: String,
    /// Visible options, in authored order.
    pub options: Vec<PreparedOption>,
}

/// A node whose condition held, with the positions of its visible options.
#[derive(Debug, Clone)]
pub struct ResolvedNode<'a> {
    /// The node.
    pub node: &'a DialogueNode,
    /// Authored positions of the visible options.
    pub visible: Vec<usize>,
}

impl<'a> ResolvedNode<'a> {
    /// The option at `position` in the visible list, with its authored
    /// index.
    #[must_use]
    pub fn visible_option(&self, position: usize) -> Option<(usize, &'a DialogueOption)> {
        let index = *self.visible.get(position)?;
        Some((index, &self.node.options[index]))
    }

    /// The view sent to the subject.
    #[must_use]
    pub fn prepared(&self) -> PreparedNode {
        PreparedNode {
            id: self.node.id.clone(),
            npc_id: self.node.npc_id.clone(),
            text: self.node.text.clone(),
            options: self
                .visible
                .iter()
                .map(|&index| PreparedOption {
                    index,
                    text: self.node.options[index].text.clone(),
                })
                .collect(),
        }
    }
}

/// Where events raised while applying consequences are published.
#[derive(Clone, Copy)]
pub struct EventContext<'a> {
    /// The bus.
    pub bus: &'a EventBus,
    /// Clock stamping the events.
    pub clock: &'a dyn Clock,
    /// Correlation ID of the originating command.
    pub correlation_id: Uuid,
}

impl EventContext<'_> {
    async fn publish(&self, kind: WorldEventKind) {
        self.bus
            .publish(&WorldEvent::new(kind, self.correlation_id, self.clock))
            .await;
    }
}

/// Result of applying a consequence block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsequenceOutcome {
    /// Everything that was applied or failed, in order.
    pub effects: Vec<Effect>,
    /// False when an item removal fell short or storage failed.
    pub complete: bool,
    /// Quest offered by the block, if any.
    pub offered_quest: Option<String>,
    /// The next node, or `None` at the end of the conversation.
    pub next: Option<PreparedNode>,
}

struct StepFailure {
    step: String,
    error: DomainError,
}

fn at(step: impl Into<String>) -> impl FnOnce(DomainError) -> StepFailure {
    let step = step.into();
    move |error| StepFailure { step, error }
}

/// Selects dialogue nodes for a subject and applies option consequences.
pub struct DialogueResolver {
    catalog: Arc<DialogueCatalog>,
    flags: Arc<FlagStore>,
    inventory: Arc<dyn Inventory>,
    sheets: Arc<dyn CharacterSheets>,
    relationships: Arc<dyn Relationships>,
}

impl DialogueResolver {
    /// Creates a resolver over `catalog`.
    #[must_use]
    pub fn new(
        catalog: Arc<DialogueCatalog>,
        flags: Arc<FlagStore>,
        inventory: Arc<dyn Inventory>,
        sheets: Arc<dyn CharacterSheets>,
        relationships: Arc<dyn Relationships>,
    ) -> Self {
        Self {
            catalog,
            flags,
            inventory,
            sheets,
            relationships,
        }
    }

    /// The content this resolver serves.
    #[must_use]
    pub fn catalog(&self) -> &DialogueCatalog {
        &self.catalog
    }

    /// Reads the subject facts needed to evaluate `conditions`.
    pub async fn snapshot<'c, I>(&self, subject_id: Uuid, conditions: I) -> SubjectSnapshot
    where
        I: IntoIterator<Item = &'c Condition>,
    {
        let mut targets: Vec<String> = Vec::new();
        for condition in conditions {
            for npc_id in condition.relationship_targets() {
                if !targets.iter().any(|t| t == npc_id) {
                    targets.push(npc_id.to_owned());
                }
            }
        }

        let flags = self
            .flags
            .try_names(subject_id)
            .await
            .inspect_err(|e| error!(%subject_id, error = %e, "flag read failed"))
            .ok();
        let items = self
            .inventory
            .list(subject_id)
            .await
            .map(|held| {
                held.into_iter()
                    .map(|grant| (grant.item_id, grant.quantity))
                    .collect::<HashMap<_, _>>()
            })
            .inspect_err(|e| error!(%subject_id, error = %e, "inventory read failed"))
            .ok();
        let stats = match self.sheets.sheet(subject_id).await {
            Ok(sheet) => sheet.map(|sheet| sheet.stats),
            Err(e) => {
                error!(%subject_id, error = %e, "character sheet read failed");
                None
            }
        };
        let mut relationships = HashMap::with_capacity(targets.len());
        for npc_id in targets {
            let value = self
                .relationships
                .value(subject_id, &npc_id)
                .await
                .inspect_err(|e| {
                    error!(%subject_id, npc_id = %npc_id, error = %e, "relationship read failed");
                })
                .ok();
            relationships.insert(npc_id, value);
        }

        SubjectSnapshot {
            flags,
            items,
            stats,
            relationships,
        }
    }

    fn resolve<'a>(node: &'a DialogueNode, facts: &SubjectSnapshot) -> ResolvedNode<'a> {
        let visible = node
            .options
            .iter()
            .enumerate()
            .filter(|(_, option)| option.condition.evaluate(facts))
            .map(|(index, _)| index)
            .collect();
        ResolvedNode { node, visible }
    }

    /// First node of `npc_id`, in declaration order, whose condition holds.
    pub async fn resolve_applicable(
        &self,
        npc_id: &str,
        subject_id: Uuid,
    ) -> Option<ResolvedNode<'_>> {
        let pool: Vec<&DialogueNode> = self.catalog.nodes_for(npc_id).collect();
        if pool.is_empty() {
            debug!(npc_id, "npc has no dialogue nodes");
            return None;
        }

        let conditions: Vec<&Condition> = pool
            .iter()
            .flat_map(|node| {
                std::iter::once(&node.condition).chain(node.options.iter().map(|o| &o.condition))
            })
            .collect();
        let facts = self.snapshot(subject_id, conditions).await;

        let resolved = pool
            .into_iter()
            .find(|node| node.condition.evaluate(&facts))
            .map(|node| Self::resolve(node, &facts));
        if resolved.is_none() {
            debug!(npc_id, %subject_id, "no dialogue node applies");
        }
        resolved
    }

    /// Looks up a node and checks its condition again against current
    /// state. `None` if unknown or no longer applicable.
    pub async fn resolve_by_id(
        &self,
        dialogue_id: &str,
        subject_id: Uuid,
    ) -> Option<ResolvedNode<'_>> {
        let Some(node) = self.catalog.node(dialogue_id) else {
            warn!(dialogue_id, "unknown dialogue id");
            return None;
        };

        let conditions: Vec<&Condition> = std::iter::once(&node.condition)
            .chain(node.options.iter().map(|o| &o.condition))
            .collect();
        let facts = self.snapshot(subject_id, conditions).await;

        if !node.condition.evaluate(&facts) {
            debug!(dialogue_id, %subject_id, "dialogue node no longer applies");
            return None;
        }
        Some(Self::resolve(node, &facts))
    }

    /// The node `npc_id` says to the subject right now, if any.
    pub async fn get_applicable_node(&self, npc_id: &str, subject_id: Uuid) -> Option<PreparedNode> {
        self.resolve_applicable(npc_id, subject_id)
            .await
            .map(|resolved| resolved.prepared())
    }

    /// A specific node, if it still applies to the subject.
    pub async fn get_node_by_id(&self, dialogue_id: &str, subject_id: Uuid) -> Option<PreparedNode> {
        self.resolve_by_id(dialogue_id, subject_id)
            .await
            .map(|resolved| resolved.prepared())
    }

    /// Applies `consequences` for the subject, then resolves the next node.
    ///
    /// Mutations run in a fixed order: flags set, flags removed, items
    /// given, items removed, relationships, experience, quest offer. An item
    /// shortfall is recorded and the block continues. A storage failure
    /// stops the remaining mutations. Nothing applied is rolled back.
    pub async fn execute_consequences(
        &self,
        npc_id: &str,
        subject_id: Uuid,
        consequences: &Consequences,
        events: EventContext<'_>,
    ) -> ConsequenceOutcome {
        let mut effects = Vec::new();
        let mut offered_quest = None;

        if let Err(failure) = self
            .apply(subject_id, consequences, events, &mut effects, &mut offered_quest)
            .await
        {
            error!(
                %subject_id,
                npc_id,
                step = %failure.step,
                error = %failure.error,
                "consequence block aborted"
            );
            effects.push(Effect::StorageFailed {
                step: failure.step,
                message: failure.error.user_message(),
            });
        }

        let next = match &consequences.next {
            NextNode::Node(dialogue_id) => self.get_node_by_id(dialogue_id, subject_id).await,
            NextNode::Resolve => self.get_applicable_node(npc_id, subject_id).await,
        };
        let complete = !effects.iter().any(Effect::is_failure);
        info!(
            %subject_id,
            npc_id,
            effects = effects.len(),
            complete,
            next = next.as_ref().map_or("<end>", |n| n.id.as_str()),
            "consequences applied"
        );

        ConsequenceOutcome {
            effects,
            complete,
            offered_quest,
            next,
        }
    }

    async fn apply(
        &self,
        subject_id: Uuid,
        consequences: &Consequences,
        events: EventContext<'_>,
        effects: &mut Vec<Effect>,
        offered_quest: &mut Option<String>,
    ) -> Result<(), StepFailure> {
        for flag in &consequences.set_flags {
            let newly_set = self
                .flags
                .try_set(subject_id, flag)
                .await
                .map_err(at(format!("set flag {flag}")))?;
            effects.push(Effect::FlagSet {
                flag: flag.clone(),
                newly_set,
            });
        }

        for flag in &consequences.remove_flags {
            let removed = self
                .flags
                .try_remove(subject_id, flag)
                .await
                .map_err(at(format!("remove flag {flag}")))?;
            effects.push(Effect::FlagRemoved {
                flag: flag.clone(),
                removed,
            });
        }

        for grant in &consequences.give_items {
            let total = self
                .inventory
                .give(subject_id, &grant.item_id, grant.quantity)
                .await
                .map_err(at(format!("give item {}", grant.item_id)))?;
            effects.push(Effect::ItemGranted {
                item_id: grant.item_id.clone(),
                quantity: grant.quantity,
                total,
            });
            if grant.quantity > 0 {
                events
                    .publish(WorldEventKind::ItemObtained(ItemObtained {
                        subject_id,
                        item_id: grant.item_id.clone(),
                        quantity: grant.quantity,
                    }))
                    .await;
            }
        }

        for grant in &consequences.remove_items {
            let removed = self
                .inventory
                .remove(subject_id, &grant.item_id, grant.quantity)
                .await
                .map_err(at(format!("remove item {}", grant.item_id)))?;
            if removed {
                effects.push(Effect::ItemRemoved {
                    item_id: grant.item_id.clone(),
                    quantity: grant.quantity,
                });
                events
                    .publish(WorldEventKind::ItemRemoved(ItemRemoved {
                        subject_id,
                        item_id: grant.item_id.clone(),
                        quantity: grant.quantity,
                    }))
                    .await;
            } else {
                warn!(%subject_id, item_id = %grant.item_id, "item removal fell short");
                effects.push(Effect::ItemRemovalFailed {
                    item_id: grant.item_id.clone(),
                    quantity: grant.quantity,
                });
            }
        }

        for change in &consequences.relationships {
            let value = self
                .relationships
                .adjust(subject_id, &change.npc_id, change.delta)
                .await
                .map_err(at(format!("adjust relationship {}", change.npc_id)))?;
            effects.push(Effect::RelationshipChanged {
                npc_id: change.npc_id.clone(),
                delta: change.delta,
                value,
            });
        }

        if consequences.experience > 0 {
            let progress = self
                .sheets
                .grant_experience(subject_id, consequences.experience)
                .await
                .map_err(at("grant experience"))?;
            effects.push(Effect::ExperienceGained {
                amount: consequences.experience,
                progress,
            });
        }

        if let Some(quest_id) = &consequences.start_quest {
            effects.push(Effect::QuestOffered {
                quest_id: quest_id.clone(),
            });
            *offered_quest = Some(quest_id.clone());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_fixtures::{Fixture, ana_pool, node, option};
    use crate::domain::condition::Clause;
    use crate::domain::consequences::RelationshipChange;
    use emberwake_core::event::EventName;
    use emberwake_core::ledger::ItemGrant;
    use emberwake_test_support::{FixedClock, RecordingHandler};

    #[tokio::test]
    async fn test_first_declared_match_wins() {
        // Arrange
        let fixture = Fixture::new(ana_pool());
        let subject = Uuid::new_v4();

        // Act
        let without_flag = fixture.resolver.get_applicable_node("npc_ana", subject).await;
        fixture.flags.set(subject, "f1").await;
        let with_flag = fixture.resolver.get_applicable_node("npc_ana", subject).await;

        // Assert
        assert_eq!(without_flag.unwrap().id, "b");
        assert_eq!(with_flag.unwrap().id, "a");
    }

    #[tokio::test]
    async fn test_no_matching_node_returns_none() {
        // Arrange
        let mut gated = node("gated", "npc_ana");
        gated.condition = Condition(vec![Clause::RequiresFlags {
            flags: vec!["never".into()],
        }]);
        let fixture = Fixture::new(vec![gated]);

        // Act
        let resolved = fixture
            .resolver
            .get_applicable_node("npc_ana", Uuid::new_v4())
            .await;

        // Assert
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn test_get_node_by_id_revalidates_condition() {
        // Arrange
        let mut gated = node("gated", "npc_ana");
        gated.condition = Condition(vec![Clause::ForbidsFlags {
            flags: vec!["done".into()],
        }]);
        let fixture = Fixture::new(vec![gated]);
        let subject = Uuid::new_v4();

        // Act
        let before = fixture.resolver.get_node_by_id("gated", subject).await;
        fixture.flags.set(subject, "done").await;
        let after = fixture.resolver.get_node_by_id("gated", subject).await;
        let unknown = fixture.resolver.get_node_by_id("missing", subject).await;

        // Assert
        assert!(before.is_some());
        assert!(after.is_none());
        assert!(unknown.is_none());
    }

    #[tokio::test]
    async fn test_options_can_demand_a_higher_bar_than_their_node() {
        // Arrange
        let mut talk = node("talk", "npc_ana");
        let mut persuade = option("persuade");
        persuade.condition = Condition(vec![Clause::StatAtLeast {
            stat: "charisma".into(),
            min: 6,
        }]);
        let mut bribe = option("bribe");
        bribe.condition = Condition(vec![Clause::HasItem {
            item_id: "coin_pouch".into(),
            min_quantity: 1,
        }]);
        talk.options = vec![option("leave"), persuade, bribe];
        let fixture = Fixture::new(vec![talk]);
        let subject = Uuid::new_v4();
        fixture.sheets.create(subject, "Mira").await.unwrap();
        fixture.inventory.give(subject, "coin_pouch", 1).await.unwrap();

        // Act
        let prepared = fixture
            .resolver
            .get_applicable_node("npc_ana", subject)
            .await
            .unwrap();

        // Assert
        let visible: Vec<(usize, &str)> = prepared
            .options
            .iter()
            .map(|o| (o.index, o.text.as_str()))
            .collect();
        assert_eq!(visible, vec![(0, "leave"), (2, "bribe")]);
    }

    #[tokio::test]
    async fn test_relationship_gate_reads_ledger() {
        // Arrange
        let mut warm = node("warm", "npc_ana");
        warm.condition = Condition(vec![Clause::RelationshipAtLeast {
            npc_id: "npc_ana".into(),
            min: 10,
        }]);
        let fixture = Fixture::new(vec![warm, node("cold", "npc_ana")]);
        let subject = Uuid::new_v4();

        // Act
        let before = fixture.resolver.get_applicable_node("npc_ana", subject).await;
        fixture
            .relationships
            .adjust(subject, "npc_ana", 10)
            .await
            .unwrap();
        let after = fixture.resolver.get_applicable_node("npc_ana", subject).await;

        // Assert
        assert_eq!(before.unwrap().id, "cold");
        assert_eq!(after.unwrap().id, "warm");
    }

    #[tokio::test]
    async fn test_execute_consequences_applies_in_order_and_publishes_item_events() {
        // Arrange
        let fixture = Fixture::new(ana_pool());
        let subject = Uuid::new_v4();
        fixture.sheets.create(subject, "Mira").await.unwrap();
        let recorder = Arc::new(RecordingHandler::new());
        fixture
            .bus
            .subscribe(EventName::ItemObtained, recorder.clone());
        let consequences = Consequences {
            set_flags: vec!["f1".into()],
            give_items: vec![ItemGrant {
                item_id: "bandage".into(),
                quantity: 2,
            }],
            relationships: vec![RelationshipChange {
                npc_id: "npc_ana".into(),
                delta: 5,
            }],
            experience: 120,
            start_quest: Some("q_rats".into()),
            ..Consequences::default()
        };
        let clock = FixedClock::default();
        let events = EventContext {
            bus: &fixture.bus,
            clock: &clock,
            correlation_id: Uuid::new_v4(),
        };

        // Act
        let outcome = fixture
            .resolver
            .execute_consequences("npc_ana", subject, &consequences, events)
            .await;

        // Assert
        assert!(outcome.complete);
        assert_eq!(outcome.offered_quest.as_deref(), Some("q_rats"));
        assert_eq!(outcome.effects.len(), 5);
        assert!(matches!(outcome.effects[0], Effect::FlagSet { newly_set: true, .. }));
        assert!(matches!(outcome.effects[1], Effect::ItemGranted { total: 2, .. }));
        assert!(matches!(outcome.effects[2], Effect::RelationshipChanged { value: 5, .. }));
        match &outcome.effects[3] {
            Effect::ExperienceGained { progress, .. } => {
                assert_eq!(progress.unwrap().level, 2);
            }
            other => panic!("expected ExperienceGained, got {other:?}"),
        }
        // Resolve picks the first applicable node with the new flag.
        assert_eq!(outcome.next.unwrap().id, "a");
        assert_eq!(recorder.names(), vec![EventName::ItemObtained]);
    }

    #[tokio::test]
    async fn test_item_shortfall_is_reported_without_undoing_earlier_effects() {
        // Arrange
        let fixture = Fixture::new(ana_pool());
        let subject = Uuid::new_v4();
        fixture.inventory.give(subject, "coin_pouch", 1).await.unwrap();
        let consequences = Consequences {
            set_flags: vec!["paid".into()],
            remove_items: vec![ItemGrant {
                item_id: "coin_pouch".into(),
                quantity: 3,
            }],
            next: NextNode::Node("b".into()),
            ..Consequences::default()
        };
        let clock = FixedClock::default();

        // Act
        let outcome = fixture
            .resolver
            .execute_consequences(
                "npc_ana",
                subject,
                &consequences,
                EventContext {
                    bus: &fixture.bus,
                    clock: &clock,
                    correlation_id: Uuid::new_v4(),
                },
            )
            .await;

        // Assert
        assert!(!outcome.complete);
        assert!(fixture.flags.has(subject, "paid").await);
        assert_eq!(fixture.inventory.quantity(subject, "coin_pouch").await.unwrap(), 1);
        assert!(matches!(
            outcome.effects.last(),
            Some(Effect::ItemRemovalFailed { quantity: 3, .. })
        ));
        assert_eq!(outcome.next.unwrap().id, "b");
    }

    #[tokio::test]
    async fn test_unreachable_explicit_next_ends_conversation() {
        // Arrange
        let fixture = Fixture::new(ana_pool());
        let consequences = Consequences {
            next: NextNode::Node("a".into()),
            ..Consequences::default()
        };
        let clock = FixedClock::default();

        // Act
        let outcome = fixture
            .resolver
            .execute_consequences(
                "npc_ana",
                Uuid::new_v4(),
                &consequences,
                EventContext {
                    bus: &fixture.bus,
                    clock: &clock,
                    correlation_id: Uuid::new_v4(),
                },
            )
            .await;

        // Assert
        assert!(outcome.complete);
        assert!(outcome.effects.is_empty());
        assert!(outcome.next.is_none());
    }
}
