//! Resolver wiring over an in-memory record store, shared by the tests in
//! this crate.

use std::sync::Arc;

use emberwake_event_bus::EventBus;
use emberwake_flags::FlagStore;
use emberwake_ledgers::{StoreCharacterSheets, StoreInventory, StoreRelationships};
use emberwake_store::MemoryRecordStore;
use emberwake_test_support::{FixedClock, MockRng};

use crate::application::resolver::DialogueResolver;
use crate::domain::catalog::{DialogueCatalog, DialogueNode, DialogueOption, Npc};
use crate::domain::condition::{Clause, Condition};
use crate::domain::consequences::Consequences;

pub(crate) struct Fixture {
    pub resolver: DialogueResolver,
    pub flags: Arc<FlagStore>,
    pub inventory: Arc<StoreInventory>,
    pub sheets: Arc<StoreCharacterSheets>,
    pub relationships: Arc<StoreRelationships>,
    pub bus: EventBus,
}

impl Fixture {
    pub(crate) fn new(nodes: Vec<DialogueNode>) -> Self {
        let store = Arc::new(MemoryRecordStore::new());
        let flags = Arc::new(FlagStore::new(
            store.clone(),
            Arc::new(FixedClock::ticking(FixedClock::default_instant())),
        ));
        let inventory = Arc::new(StoreInventory::new(store.clone()));
        let sheets = Arc::new(StoreCharacterSheets::new(store.clone(), Box::new(MockRng)));
        let relationships = Arc::new(StoreRelationships::new(store));
        let npcs = vec![
            Npc {
                id: "npc_ana".into(),
                name: "Ana".into(),
            },
            Npc {
                id: "npc_bo".into(),
                name: "Bo".into(),
            },
        ];
        let catalog = Arc::new(DialogueCatalog::new(npcs, nodes).unwrap());
        let resolver = DialogueResolver::new(
            catalog,
            flags.clone(),
            inventory.clone(),
            sheets.clone(),
            relationships.clone(),
        );

        Self {
            resolver,
            flags,
            inventory,
            sheets,
            relationships,
            bus: EventBus::new(),
        }
    }
}

pub(crate) fn node(id: &str, npc_id: &str) -> DialogueNode {
    DialogueNode {
        id: id.into(),
        npc_id: npc_id.into(),
        text: format!("{id} text"),
        condition: Condition::always(),
        options: vec![option("goodbye")],
    }
}

pub(crate) fn option(text: &str) -> DialogueOption {
    DialogueOption {
        text: text.into(),
        condition: Condition::always(),
        consequences: Consequences::default(),
    }
}

/// `[a (requires f1), b (requires nothing)]` for `npc_ana`.
pub(crate) fn ana_pool() -> Vec<DialogueNode> {
    let mut a = node("a", "npc_ana");
    a.condition = Condition(vec![Clause::RequiresFlags {
        flags: vec!["f1".into()],
    }]);
    vec![a, node("b", "npc_ana")]
}
