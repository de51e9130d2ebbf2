//! Conditions gating dialogue nodes and options.
//!
//! A condition is a conjunction of clauses. Every clause kind is evaluated
//! against a `SubjectSnapshot` read once per resolution, so the same
//! machinery serves nodes and options.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// One predicate over subject state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Clause {
    /// Every listed flag is set.
    RequiresFlags {
        /// Flag names.
        flags: Vec<String>,
    },
    /// No listed flag is set.
    ForbidsFlags {
        /// Flag names.
        flags: Vec<String>,
    },
    /// The subject holds at least `min_quantity` of an item.
    HasItem {
        /// Item identifier.
        item_id: String,
        /// Threshold, at least 1.
        min_quantity: u32,
    },
    /// A stat is at least `min`.
    StatAtLeast {
        /// Stat name.
        stat: String,
        /// Minimum value.
        min: i32,
    },
    /// The relationship with an npc is at least `min`.
    RelationshipAtLeast {
        /// Npc identifier.
        npc_id: String,
        /// Minimum value.
        min: i32,
    },
}

impl Clause {
    /// Evaluates this clause. Facts that could not be loaded make the clause
    /// false.
    #[must_use]
    pub fn holds(&self, facts: &SubjectSnapshot) -> bool {
        match self {
            Clause::RequiresFlags { flags } => match &facts.flags {
                Some(set) => flags.iter().all(|flag| set.contains(flag)),
                None => flags.is_empty(),
            },
            Clause::ForbidsFlags { flags } => match &facts.flags {
                Some(set) => !flags.iter().any(|flag| set.contains(flag)),
                None => flags.is_empty(),
            },
            Clause::HasItem {
                item_id,
                min_quantity,
            } => facts.items.as_ref().is_some_and(|items| {
                items.get(item_id).copied().unwrap_or(0) >= (*min_quantity).max(1)
            }),
            Clause::StatAtLeast { stat, min } => facts
                .stats
                .as_ref()
                .and_then(|stats| stats.get(stat))
                .is_some_and(|value| value >= min),
            Clause::RelationshipAtLeast { npc_id, min } => facts
                .relationships
                .get(npc_id)
                .copied()
                .flatten()
                .is_some_and(|value| value >= *min),
        }
    }
}

/// Conjunction of clauses. Empty means always true.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Condition(pub Vec<Clause>);

impl Condition {
    /// A condition with no clauses.
    #[must_use]
    pub fn always() -> Self {
        Self::default()
    }

    /// Whether the condition has no clauses.
    #[must_use]
    pub fn is_always(&self) -> bool {
        self.0.is_empty()
    }

    /// The clauses in evaluation order.
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.0
    }

    /// Whether every clause holds.
    #[must_use]
    pub fn evaluate(&self, facts: &SubjectSnapshot) -> bool {
        self.0.iter().all(|clause| clause.holds(facts))
    }

    /// Npcs whose relationship value this condition reads.
    pub fn relationship_targets(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|clause| match clause {
            Clause::RelationshipAtLeast { npc_id, .. } => Some(npc_id.as_str()),
            _ => None,
        })
    }
}

/// Subject state read for one round of condition evaluation.
///
/// `None` marks facts that could not be loaded (or, for stats, a subject
/// without a character sheet).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectSnapshot {
    /// Set flags.
    pub flags: Option<HashSet<String>>,
    /// Held items and quantities.
    pub items: Option<HashMap<String, u32>>,
    /// Character stats.
    pub stats: Option<BTreeMap<String, i32>>,
    /// Relationship values for the npcs the evaluated conditions mention.
    pub relationships: HashMap<String, Option<i32>>,
}

impl SubjectSnapshot {
    /// A snapshot of a subject with no flags, items, sheet or relationships.
    #[must_use]
    pub fn blank() -> Self {
        Self {
            flags: Some(HashSet::new()),
            items: Some(HashMap::new()),
            stats: None,
            relationships: HashMap::new(),
        }
    }

    /// Returns the snapshot with `flags` set.
    #[must_use]
    pub fn with_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags = Some(flags.into_iter().map(Into::into).collect());
        self
    }
}
