//! The quest tracker.
//!
//! Subscribes once to the tracked domain events. For each event it loads
//! the subject's progress records, advances every active quest the event
//! matches, and writes the record back with a version check. The write that
//! flips a quest to completed is the only one that grants rewards, so a
//! quest completes and pays out exactly once per subject. Rewards are
//! granted once every matching record has been saved.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use emberwake_core::clock::Clock;
use emberwake_core::error::DomainError;
use emberwake_core::event::{ItemObtained, QuestCompleted, WorldEvent, WorldEventKind};
use emberwake_core::ledger::{CharacterSheets, Inventory};
use emberwake_core::record::{RecordKey, RecordStore, StoredRecord, encode};
use emberwake_event_bus::{EventBus, EventHandler, HandlerError};

use crate::domain::definition::{QuestCatalog, QuestDefinition};
use crate::domain::objective::TRACKED_EVENTS;
use crate::domain::progress::{NAMESPACE, QuestProgress, QuestState};

/// Tracks quest progress for every subject.
pub struct QuestTracker {
    catalog: Arc<QuestCatalog>,
    store: Arc<dyn RecordStore>,
    sheets: Arc<dyn CharacterSheets>,
    inventory: Arc<dyn Inventory>,
    clock: Arc<dyn Clock>,
    initialized: AtomicBool,
}

impl std::fmt::Debug for QuestTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestTracker")
            .field("quests", &self.catalog.len())
            .field("initialized", &self.initialized.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl QuestTracker {
    /// Creates a tracker. It does nothing until [`QuestTracker::initialize`]
    /// subscribes it to a bus.
    #[must_use]
    pub fn new(
        catalog: Arc<QuestCatalog>,
        store: Arc<dyn RecordStore>,
        sheets: Arc<dyn CharacterSheets>,
        inventory: Arc<dyn Inventory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            store,
            sheets,
            inventory,
            clock,
            initialized: AtomicBool::new(false),
        }
    }

    /// Subscribes the tracker to every tracked event. Only the first call
    /// subscribes; it returns `true`, later calls return `false`.
    pub fn initialize(self: &Arc<Self>, bus: &EventBus) -> bool {
        if self.initialized.swap(true, Ordering::SeqCst) {
            debug!("quest tracker already initialized");
            return false;
        }
        for name in TRACKED_EVENTS {
            bus.subscribe(name, Arc::clone(self) as Arc<dyn EventHandler>);
        }
        info!(
            events = TRACKED_EVENTS.len(),
            quests = self.catalog.len(),
            "quest tracker listening"
        );
        true
    }

    /// The quests this tracker knows.
    #[must_use]
    pub fn catalog(&self) -> &QuestCatalog {
        &self.catalog
    }

    fn key(subject_id: Uuid, quest_id: &str) -> RecordKey {
        RecordKey::new(NAMESPACE, subject_id, quest_id)
    }

    fn definition(&self, quest_id: &str) -> Result<&QuestDefinition, DomainError> {
        self.catalog
            .get(quest_id)
            .ok_or_else(|| DomainError::NotFound(format!("quest {quest_id}")))
    }

    async fn load(
        &self,
        subject_id: Uuid,
        quest_id: &str,
    ) -> Result<Option<(QuestProgress, i64)>, DomainError> {
        let record = self.store.get(&Self::key(subject_id, quest_id)).await?;
        record
            .map(|record| -> Result<_, DomainError> { Ok((record.decode()?, record.version)) })
            .transpose()
    }

    /// The subject's progress on one quest, if it was ever accepted.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if storage fails.
    pub async fn progress(
        &self,
        subject_id: Uuid,
        quest_id: &str,
    ) -> Result<Option<QuestProgress>, DomainError> {
        Ok(self
            .load(subject_id, quest_id)
            .await?
            .map(|(progress, _)| progress))
    }

    /// Where the subject stands with a quest. `Inactive` when never
    /// accepted.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if storage fails.
    pub async fn state(&self, subject_id: Uuid, quest_id: &str) -> Result<QuestState, DomainError> {
        Ok(self
            .progress(subject_id, quest_id)
            .await?
            .map_or(QuestState::Inactive, |progress| progress.state))
    }

    /// Every progress record of the subject, in acceptance order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if storage fails or a record
    /// cannot be decoded.
    pub async fn list(&self, subject_id: Uuid) -> Result<Vec<QuestProgress>, DomainError> {
        self.store
            .list(NAMESPACE, subject_id)
            .await?
            .iter()
            .map(StoredRecord::decode)
            .collect()
    }

    /// Starts tracking a quest for the subject.
    ///
    /// A quest that was abandoned may be accepted again and starts over.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` for an unknown quest,
    /// `DomainError::Validation` if the quest is active or completed or the
    /// subject does not meet its requirements, and
    /// `DomainError::ConcurrencyConflict` if the record changed meanwhile.
    pub async fn accept(
        &self,
        subject_id: Uuid,
        quest_id: &str,
    ) -> Result<QuestProgress, DomainError> {
        let definition = self.definition(quest_id)?;

        let expected_version = match self.load(subject_id, quest_id).await? {
            None => 0,
            Some((existing, version)) => match existing.state {
                QuestState::Active => {
                    return Err(DomainError::Validation(format!(
                        "quest {quest_id} is already active"
                    )));
                }
                QuestState::Completed => {
                    return Err(DomainError::Validation(format!(
                        "quest {quest_id} is already completed"
                    )));
                }
                QuestState::Abandoned | QuestState::Inactive => version,
            },
        };

        if !definition.requirements.is_empty() {
            let sheet = self.sheets.sheet(subject_id).await?;
            if let Some(reason) = definition.requirements.unmet_by(sheet.as_ref()) {
                return Err(DomainError::Validation(format!(
                    "quest {quest_id} {reason}"
                )));
            }
        }

        let progress = QuestProgress::start(definition, subject_id, self.clock.now());
        self.store
            .put(
                &Self::key(subject_id, quest_id),
                encode(&progress)?,
                expected_version,
            )
            .await?;
        info!(%subject_id, quest_id, "quest accepted");
        Ok(progress)
    }

    /// Gives up an active quest. Progress is kept as history.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` for an unknown quest,
    /// `DomainError::Validation` if the quest is not active, and
    /// `DomainError::ConcurrencyConflict` if the record changed meanwhile.
    pub async fn abandon(
        &self,
        subject_id: Uuid,
        quest_id: &str,
    ) -> Result<QuestProgress, DomainError> {
        self.definition(quest_id)?;
        let Some((mut progress, version)) = self.load(subject_id, quest_id).await? else {
            return Err(DomainError::Validation(format!(
                "quest {quest_id} is not active"
            )));
        };
        progress.abandon(self.clock.now())?;
        self.store
            .put(&Self::key(subject_id, quest_id), encode(&progress)?, version)
            .await?;
        info!(%subject_id, quest_id, "quest abandoned");
        Ok(progress)
    }

    /// Applies a domain event to the subject's active quests. Returns the
    /// ids of quests completed by it.
    ///
    /// A failure on one quest is logged and does not stop the others.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the subject's progress
    /// records cannot be listed.
    pub async fn on_event(
        &self,
        event: &WorldEvent,
        bus: &EventBus,
    ) -> Result<Vec<String>, DomainError> {
        let subject_id = event.subject_id();
        let records = self.store.list(NAMESPACE, subject_id).await?;
        let mut completed = Vec::new();

        for record in records {
            match self.advance(&record, event).await {
                Ok(Some(quest_id)) => completed.push(quest_id),
                Ok(None) => {}
                Err(DomainError::ConcurrencyConflict { key, .. }) => {
                    warn!(%subject_id, %key, event = %event.name(), "quest progress changed concurrently; update skipped");
                }
                Err(e) => {
                    error!(%subject_id, key = %record.key, event = %event.name(), error = %e, "quest progress update failed");
                }
            }
        }

        // Reward cascades re-enter the tracker, so they run only after every
        // record listed above has been written.
        for quest_id in &completed {
            if let Some(definition) = self.catalog.get(quest_id) {
                self.grant_rewards(definition, subject_id, event, bus).await;
            }
        }
        Ok(completed)
    }

    async fn advance(
        &self,
        record: &StoredRecord,
        event: &WorldEvent,
    ) -> Result<Option<String>, DomainError> {
        let mut progress: QuestProgress = record.decode()?;
        if progress.state != QuestState::Active {
            return Ok(None);
        }
        let Some(definition) = self.catalog.get(&progress.quest_id) else {
            warn!(quest_id = %progress.quest_id, "progress for unknown quest ignored");
            return Ok(None);
        };
        if !progress.record_event(definition, &event.kind) {
            return Ok(None);
        }

        let finished = progress.all_satisfied();
        if finished {
            progress.complete(self.clock.now());
        }
        self.store
            .put(&record.key, encode(&progress)?, record.version)
            .await?;
        debug!(
            subject_id = %progress.subject_id,
            quest_id = %progress.quest_id,
            progress = ?progress.objectives.iter().map(|o| (o.current, o.required)).collect::<Vec<_>>(),
            "quest progress saved"
        );

        if !finished {
            return Ok(None);
        }
        info!(subject_id = %progress.subject_id, quest_id = %progress.quest_id, "quest completed");
        Ok(Some(progress.quest_id))
    }

    async fn grant_rewards(
        &self,
        definition: &QuestDefinition,
        subject_id: Uuid,
        cause: &WorldEvent,
        bus: &EventBus,
    ) {
        let rewards = &definition.rewards;
        let quest_id = definition.id.as_str();

        if rewards.currency > 0 {
            match self.sheets.add_currency(subject_id, rewards.currency).await {
                Ok(Some(balance)) => debug!(%subject_id, quest_id, balance, "currency granted"),
                Ok(None) => warn!(%subject_id, quest_id, "no character sheet; currency reward skipped"),
                Err(e) => error!(%subject_id, quest_id, error = %e, "currency reward failed"),
            }
        }

        if rewards.experience > 0 {
            match self
                .sheets
                .grant_experience(subject_id, rewards.experience)
                .await
            {
                Ok(Some(progress)) => {
                    debug!(%subject_id, quest_id, level = progress.level, "experience granted");
                }
                Ok(None) => warn!(%subject_id, quest_id, "no character sheet; experience reward skipped"),
                Err(e) => error!(%subject_id, quest_id, error = %e, "experience reward failed"),
            }
        }

        for grant in &rewards.items {
            match self
                .inventory
                .give(subject_id, &grant.item_id, grant.quantity)
                .await
            {
                Ok(_) if grant.quantity > 0 => {
                    bus.publish(&WorldEvent::caused_by(
                        cause,
                        WorldEventKind::ItemObtained(ItemObtained {
                            subject_id,
                            item_id: grant.item_id.clone(),
                            quantity: grant.quantity,
                        }),
                        self.clock.as_ref(),
                    ))
                    .await;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(%subject_id, quest_id, item_id = %grant.item_id, error = %e, "item reward failed");
                }
            }
        }

        bus.publish(&WorldEvent::caused_by(
            cause,
            WorldEventKind::QuestCompleted(QuestCompleted {
                subject_id,
                quest_id: quest_id.to_owned(),
                rewards: rewards.clone(),
            }),
            self.clock.as_ref(),
        ))
        .await;
    }
}

#[async_trait]
impl EventHandler for QuestTracker {
    async fn handle(&self, event: &WorldEvent, bus: &EventBus) -> Result<(), HandlerError> {
        self.on_event(event, bus).await?;
        Ok(())
    }
}
