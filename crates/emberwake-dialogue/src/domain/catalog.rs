//! Dialogue content: npcs, nodes and options.
//!
//! The catalog is immutable once built. Node order is declaration order and
//! is the authoring priority rule: for a given npc the first node whose
//! condition holds wins.

use std::collections::HashMap;

use serde::Serialize;

use emberwake_core::error::DomainError;

use crate::domain::condition::Condition;
use crate::domain::consequences::Consequences;

/// A character the subject can talk to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Npc {
    /// Npc identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// A line the subject can answer with.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueOption {
    /// Text shown to the subject.
    pub text: String,
    /// Visibility gate, on top of the node's own condition.
    pub condition: Condition,
    /// What choosing the option does.
    pub consequences: Consequences,
}

/// A node an npc can say.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueNode {
    /// Node identifier, unique across the catalog.
    pub id: String,
    /// The speaking npc.
    pub npc_id: String,
    /// Spoken text.
    pub text: String,
    /// When the node applies.
    pub condition: Condition,
    /// Options in authored order.
    pub options: Vec<DialogueOption>,
}

/// Npcs and dialogue nodes loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct DialogueCatalog {
    npcs: HashMap<String, Npc>,
    nodes: Vec<DialogueNode>,
    by_id: HashMap<String, usize>,
}

impl DialogueCatalog {
    /// Builds a catalog. `nodes` must be in declaration order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for duplicate npc or node ids.
    pub fn new(npcs: Vec<Npc>, nodes: Vec<DialogueNode>) -> Result<Self, DomainError> {
        let mut npc_index = HashMap::with_capacity(npcs.len());
        for npc in npcs {
            if npc_index.contains_key(&npc.id) {
                return Err(DomainError::Validation(format!("duplicate npc id {}", npc.id)));
            }
            npc_index.insert(npc.id.clone(), npc);
        }

        let mut by_id = HashMap::with_capacity(nodes.len());
        for (position, node) in nodes.iter().enumerate() {
            if by_id.insert(node.id.clone(), position).is_some() {
                return Err(DomainError::Validation(format!(
                    "duplicate dialogue id {}",
                    node.id
                )));
            }
        }

        Ok(Self {
            npcs: npc_index,
            nodes,
            by_id,
        })
    }

    /// Looks up an npc.
    #[must_use]
    pub fn npc(&self, npc_id: &str) -> Option<&Npc> {
        self.npcs.get(npc_id)
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, dialogue_id: &str) -> Option<&DialogueNode> {
        self.by_id.get(dialogue_id).map(|&position| &self.nodes[position])
    }

    /// The nodes an npc can say, in declaration order.
    pub fn nodes_for<'a, 'b>(&'a self, npc_id: &'b str) -> impl Iterator<Item = &'a DialogueNode> + use<'a, 'b> {
        self.nodes.iter().filter(move |node| node.npc_id == npc_id)
    }

    /// Number of npcs.
    #[must_use]
    pub fn npc_count(&self) -> usize {
        self.npcs.len()
    }

    /// Number of dialogue nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, npc_id: &str) -> DialogueNode {
        DialogueNode {
            id: id.into(),
            npc_id: npc_id.into(),
            text: format!("{id} text"),
            condition: Condition::always(),
            options: Vec::new(),
        }
    }

    fn npc(id: &str) -> Npc {
        Npc {
            id: id.into(),
            name: id.to_uppercase(),
        }
    }

    #[test]
    fn test_nodes_for_keeps_declaration_order() {
        let catalog = DialogueCatalog::new(
            vec![npc("ana"), npc("bo")],
            vec![node("a2", "ana"), node("b1", "bo"), node("a1", "ana")],
        )
        .unwrap();

        let ids: Vec<&str> = catalog.nodes_for("ana").map(|n| n.id.as_str()).collect();

        assert_eq!(ids, vec!["a2", "a1"]);
        assert_eq!(catalog.node("b1").unwrap().npc_id, "bo");
        assert!(catalog.node("zz").is_none());
        assert_eq!(catalog.npc("bo").unwrap().name, "BO");
        assert_eq!((catalog.npc_count(), catalog.node_count()), (2, 3));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let nodes = DialogueCatalog::new(vec![npc("ana")], vec![node("a", "ana"), node("a", "ana")]);
        let npcs = DialogueCatalog::new(vec![npc("ana"), npc("ana")], Vec::new());

        assert!(matches!(nodes, Err(DomainError::Validation(_))));
        assert!(matches!(npcs, Err(DomainError::Validation(_))));
    }
}
