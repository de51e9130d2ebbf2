//! Runtime wiring.
//!
//! One `NarrativeRuntime` owns every service, built once at startup from
//! loaded content. Each action holds its subject's lock until the action
//! and every bus cascade it triggers have finished, so progress records are
//! never read and written by two actions for the same subject at once.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};
use uuid::Uuid;

use emberwake_content::Content;
use emberwake_core::clock::Clock;
use emberwake_core::error::DomainError;
use emberwake_core::event::{EventName, WorldEvent, WorldEventKind};
use emberwake_core::ledger::{CharacterSheet, CharacterSheets, Inventory, ItemGrant};
use emberwake_core::record::RecordStore;
use emberwake_core::rng::DeterministicRng;
use emberwake_dialogue::application::command_handlers::{
    self as dialogue_handlers, ChoiceOutcome, TalkOutcome,
};
use emberwake_dialogue::application::resolver::DialogueResolver;
use emberwake_dialogue::domain::commands::{ChooseOption, Talk};
use emberwake_event_bus::EventBus;
use emberwake_flags::{Flag, FlagStore};
use emberwake_ledgers::{StoreCharacterSheets, StoreInventory, StoreRelationships};
use emberwake_quests::application::command_handlers as quest_handlers;
use emberwake_quests::application::query_handlers::{
    self, AvailableQuestView, QuestLogEntry,
};
use emberwake_quests::application::tracker::QuestTracker;
use emberwake_quests::domain::commands::{AbandonQuest, AcceptQuest};
use emberwake_quests::domain::progress::QuestProgress;

/// Result of choosing an option, including the quest it offered.
#[derive(Debug, Clone, Serialize)]
pub struct ChoiceResult {
    /// What the choice did.
    #[serde(flatten)]
    pub choice: ChoiceOutcome,
    /// The offered quest, when it was accepted.
    pub quest_started: Option<String>,
    /// Why the offered quest was not accepted.
    pub quest_message: Option<String>,
}

/// A subject's character sheet with its inventory.
#[derive(Debug, Clone, Serialize)]
pub struct CharacterView {
    /// The sheet.
    #[serde(flatten)]
    pub sheet: CharacterSheet,
    /// Items held.
    pub inventory: Vec<ItemGrant>,
}

/// Lazily created lock per subject.
#[derive(Debug, Default)]
struct SubjectLocks(Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>);

impl SubjectLocks {
    async fn acquire(&self, subject_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(subject_id).or_default())
        };
        lock.lock_owned().await
    }
}

/// The narrative engine wired for serving.
pub struct NarrativeRuntime {
    fingerprint: String,
    flags: Arc<FlagStore>,
    inventory: Arc<dyn Inventory>,
    sheets: Arc<dyn CharacterSheets>,
    resolver: DialogueResolver,
    tracker: Arc<QuestTracker>,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    locks: SubjectLocks,
}

impl std::fmt::Debug for NarrativeRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeRuntime")
            .field("fingerprint", &self.fingerprint)
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl NarrativeRuntime {
    /// Builds every service over `store` and subscribes the quest tracker.
    #[must_use]
    pub fn new(
        content: Content,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        rng: Box<dyn DeterministicRng>,
    ) -> Self {
        let flags = Arc::new(FlagStore::new(Arc::clone(&store), Arc::clone(&clock)));
        let inventory: Arc<dyn Inventory> = Arc::new(StoreInventory::new(Arc::clone(&store)));
        let sheets: Arc<dyn CharacterSheets> =
            Arc::new(StoreCharacterSheets::new(Arc::clone(&store), rng));
        let relationships = Arc::new(StoreRelationships::new(Arc::clone(&store)));

        let resolver = DialogueResolver::new(
            Arc::new(content.dialogue),
            Arc::clone(&flags),
            Arc::clone(&inventory),
            Arc::clone(&sheets),
            relationships,
        );
        let tracker = Arc::new(QuestTracker::new(
            Arc::new(content.quests),
            store,
            Arc::clone(&sheets),
            Arc::clone(&inventory),
            Arc::clone(&clock),
        ));
        let bus = EventBus::new();
        tracker.initialize(&bus);

        Self {
            fingerprint: content.fingerprint,
            flags,
            inventory,
            sheets,
            resolver,
            tracker,
            bus,
            clock,
            locks: SubjectLocks::default(),
        }
    }

    /// Fingerprint of the content being served.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// The bus, for collaborators that subscribe in process.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Number of handlers per event name.
    #[must_use]
    pub fn subscriber_counts(&self) -> BTreeMap<EventName, usize> {
        self.bus.subscriber_counts()
    }

    /// Resolves what `npc_id` says to the subject.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the npc is unknown.
    pub async fn talk(&self, subject_id: Uuid, npc_id: &str) -> Result<TalkOutcome, DomainError> {
        let _guard = self.locks.acquire(subject_id).await;
        let command = Talk {
            correlation_id: Uuid::new_v4(),
            subject_id,
            npc_id: npc_id.to_owned(),
        };
        dialogue_handlers::handle_talk(&command, &self.resolver, &self.bus, self.clock.as_ref())
            .await
    }

    /// Answers a dialogue node, then accepts the quest the option offers.
    /// A refused quest does not fail the choice; the reason is reported in
    /// `quest_message`.
    ///
    /// # Errors
    ///
    /// Returns the errors of the dialogue `ChooseOption` handler.
    pub async fn choose_option(
        &self,
        subject_id: Uuid,
        npc_id: &str,
        dialogue_id: Option<String>,
        option_index: usize,
    ) -> Result<ChoiceResult, DomainError> {
        let _guard = self.locks.acquire(subject_id).await;
        let command = ChooseOption {
            correlation_id: Uuid::new_v4(),
            subject_id,
            npc_id: npc_id.to_owned(),
            dialogue_id,
            option_index,
        };
        let choice = dialogue_handlers::handle_choose_option(
            &command,
            &self.resolver,
            &self.bus,
            self.clock.as_ref(),
        )
        .await?;

        let mut result = ChoiceResult {
            choice,
            quest_started: None,
            quest_message: None,
        };
        if let Some(quest_id) = result.choice.offered_quest.clone() {
            let accept = AcceptQuest {
                correlation_id: command.correlation_id,
                subject_id,
                quest_id: quest_id.clone(),
            };
            match quest_handlers::handle_accept_quest(
                &accept,
                &self.tracker,
                &self.bus,
                self.clock.as_ref(),
            )
            .await
            {
                Ok(_) => result.quest_started = Some(quest_id),
                Err(e) => {
                    warn!(%subject_id, quest_id, error = %e, "offered quest not accepted");
                    result.quest_message = Some(e.user_message());
                }
            }
        }
        Ok(result)
    }

    /// Accepts a quest.
    ///
    /// # Errors
    ///
    /// Returns the errors of the `AcceptQuest` handler.
    pub async fn accept_quest(
        &self,
        subject_id: Uuid,
        quest_id: &str,
    ) -> Result<QuestProgress, DomainError> {
        let _guard = self.locks.acquire(subject_id).await;
        let command = AcceptQuest {
            correlation_id: Uuid::new_v4(),
            subject_id,
            quest_id: quest_id.to_owned(),
        };
        quest_handlers::handle_accept_quest(&command, &self.tracker, &self.bus, self.clock.as_ref())
            .await
    }

    /// Abandons an active quest.
    ///
    /// # Errors
    ///
    /// Returns the errors of the `AbandonQuest` handler.
    pub async fn abandon_quest(
        &self,
        subject_id: Uuid,
        quest_id: &str,
    ) -> Result<QuestProgress, DomainError> {
        let _guard = self.locks.acquire(subject_id).await;
        let command = AbandonQuest {
            correlation_id: Uuid::new_v4(),
            subject_id,
            quest_id: quest_id.to_owned(),
        };
        quest_handlers::handle_abandon_quest(&command, &self.tracker).await
    }

    /// Every quest the subject ever accepted.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if storage fails.
    pub async fn quest_log(&self, subject_id: Uuid) -> Result<Vec<QuestLogEntry>, DomainError> {
        let _guard = self.locks.acquire(subject_id).await;
        query_handlers::get_quest_log(subject_id, &self.tracker).await
    }

    /// The subject's active quests.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if storage fails.
    pub async fn active_quests(&self, subject_id: Uuid) -> Result<Vec<QuestLogEntry>, DomainError> {
        let _guard = self.locks.acquire(subject_id).await;
        query_handlers::get_active_quests(subject_id, &self.tracker).await
    }

    /// Quests the subject may still accept.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if storage fails.
    pub async fn available_quests(
        &self,
        subject_id: Uuid,
    ) -> Result<Vec<AvailableQuestView>, DomainError> {
        let _guard = self.locks.acquire(subject_id).await;
        query_handlers::get_available_quests(subject_id, &self.tracker).await
    }

    /// The subject's flags, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if storage fails.
    pub async fn flags(&self, subject_id: Uuid) -> Result<Vec<Flag>, DomainError> {
        let _guard = self.locks.acquire(subject_id).await;
        self.flags.try_get_all(subject_id).await
    }

    /// Removes one flag. Returns whether it was set.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an empty name and
    /// `DomainError::Infrastructure` if storage fails.
    pub async fn remove_flag(&self, subject_id: Uuid, flag: &str) -> Result<bool, DomainError> {
        let _guard = self.locks.acquire(subject_id).await;
        self.flags.try_remove(subject_id, flag).await
    }

    /// Removes every flag of the subject.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if storage fails.
    pub async fn reset_flags(&self, subject_id: Uuid) -> Result<u64, DomainError> {
        let _guard = self.locks.acquire(subject_id).await;
        self.flags.clear_all(subject_id).await
    }

    /// Creates the subject's character sheet.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an empty name or when the
    /// subject already has a character.
    pub async fn create_character(
        &self,
        subject_id: Uuid,
        name: &str,
    ) -> Result<CharacterView, DomainError> {
        let _guard = self.locks.acquire(subject_id).await;
        let sheet = self.sheets.create(subject_id, name).await?;
        Ok(CharacterView {
            sheet,
            inventory: Vec::new(),
        })
    }

    /// The subject's character sheet and inventory.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` when the subject has no character.
    pub async fn character(&self, subject_id: Uuid) -> Result<CharacterView, DomainError> {
        let _guard = self.locks.acquire(subject_id).await;
        let sheet = self
            .sheets
            .sheet(subject_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("character {subject_id}")))?;
        let inventory = self.inventory.list(subject_id).await?;
        Ok(CharacterView { sheet, inventory })
    }

    /// Publishes an event reported by a collaborator. Quest events are
    /// published by the quest tracker only.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for `quest.accepted` and
    /// `quest.completed`.
    pub async fn publish(&self, kind: WorldEventKind) -> Result<WorldEvent, DomainError> {
        let name = kind.name();
        if matches!(name, EventName::QuestAccepted | EventName::QuestCompleted) {
            return Err(DomainError::Validation(format!(
                "{name} is published by the quest tracker"
            )));
        }

        let subject_id = kind.subject_id();
        let _guard = self.locks.acquire(subject_id).await;
        let event = WorldEvent::new(kind, Uuid::new_v4(), self.clock.as_ref());
        self.bus.publish(&event).await;
        info!(%subject_id, event = %name, "collaborator event published");
        Ok(event)
    }
}
