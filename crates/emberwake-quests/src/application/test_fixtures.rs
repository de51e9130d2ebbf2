//! Tracker wiring over an in-memory record store, shared by the tests in
//! this crate.

use std::sync::Arc;

use emberwake_core::ledger::RewardBundle;
use emberwake_event_bus::EventBus;
use emberwake_ledgers::{StoreCharacterSheets, StoreInventory};
use emberwake_store::MemoryRecordStore;
use emberwake_test_support::{FixedClock, MockRng};

use crate::application::tracker::QuestTracker;
use crate::domain::definition::{QuestCatalog, QuestDefinition, QuestRequirements};
use crate::domain::objective::{Objective, ObjectiveKind};

pub(crate) struct Fixture {
    pub tracker: Arc<QuestTracker>,
    pub store: Arc<MemoryRecordStore>,
    pub sheets: Arc<StoreCharacterSheets>,
    pub inventory: Arc<StoreInventory>,
    pub bus: EventBus,
}

impl Fixture {
    /// An initialized tracker over `quests`.
    pub(crate) fn new(quests: Vec<QuestDefinition>) -> Self {
        let store = Arc::new(MemoryRecordStore::new());
        let sheets = Arc::new(StoreCharacterSheets::new(store.clone(), Box::new(MockRng)));
        let inventory = Arc::new(StoreInventory::new(store.clone()));
        let tracker = Arc::new(QuestTracker::new(
            Arc::new(QuestCatalog::new(quests).unwrap()),
            store.clone(),
            sheets.clone(),
            inventory.clone(),
            Arc::new(FixedClock::ticking(FixedClock::default_instant())),
        ));
        let bus = EventBus::new();
        tracker.initialize(&bus);

        Self {
            tracker,
            store,
            sheets,
            inventory,
            bus,
        }
    }
}

pub(crate) fn quest(id: &str, objectives: Vec<Objective>) -> QuestDefinition {
    QuestDefinition {
        id: id.into(),
        title: format!("{id} title"),
        description: String::new(),
        objectives,
        rewards: RewardBundle::default(),
        requirements: QuestRequirements::default(),
    }
}

/// `q_wolves`: defeat `required` wolves.
pub(crate) fn wolves(required: u32) -> QuestDefinition {
    quest(
        "q_wolves",
        vec![Objective {
            kind: ObjectiveKind::Defeat {
                enemy_type: "wolf".into(),
            },
            required,
            description: None,
        }],
    )
}

/// `q_gossip`: talk to each of `npc1` and `npc2`.
pub(crate) fn talk_to_each() -> QuestDefinition {
    quest(
        "q_gossip",
        vec![Objective {
            kind: ObjectiveKind::TalkToEach {
                npc_ids: vec!["npc1".into(), "npc2".into()],
            },
            required: 2,
            description: Some("Ask around town".into()),
        }],
    )
}
