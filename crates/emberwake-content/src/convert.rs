//! Turns merged documents into catalogs, collecting every problem found.

use std::collections::HashSet;

use emberwake_dialogue::domain::catalog::{DialogueCatalog, DialogueNode, DialogueOption, Npc};
use emberwake_dialogue::domain::condition::{Clause, Condition};
use emberwake_dialogue::domain::consequences::{Consequences, NextNode, RelationshipChange};
use emberwake_quests::domain::definition::{QuestCatalog, QuestDefinition};
use emberwake_quests::domain::objective::{Objective, ObjectiveKind, ObjectiveType};

use crate::document::{
    ConditionDoc, ConsequencesDoc, ContentDocument, ObjectiveDoc, OptionDoc, QuestDoc,
    StatCheckDoc,
};
use crate::error::ContentError;

fn condition(doc: &ConditionDoc, stat_check: Option<&StatCheckDoc>) -> Condition {
    let mut clauses = Vec::new();
    if !doc.flags.is_empty() {
        clauses.push(Clause::RequiresFlags {
            flags: doc.flags.clone(),
        });
    }
    if !doc.forbids.is_empty() {
        clauses.push(Clause::ForbidsFlags {
            flags: doc.forbids.clone(),
        });
    }
    clauses.extend(doc.items.iter().map(|item| Clause::HasItem {
        item_id: item.item_id.clone(),
        min_quantity: item.quantity.max(1),
    }));
    clauses.extend(doc.stats.iter().map(|(stat, &min)| Clause::StatAtLeast {
        stat: stat.clone(),
        min,
    }));
    if let Some(check) = stat_check {
        clauses.push(Clause::StatAtLeast {
            stat: check.stat.clone(),
            min: check.min,
        });
    }
    clauses.extend(
        doc.relationships
            .iter()
            .map(|(npc_id, &min)| Clause::RelationshipAtLeast {
                npc_id: npc_id.clone(),
                min,
            }),
    );
    Condition(clauses)
}

fn consequences(doc: &ConsequencesDoc) -> Consequences {
    Consequences {
        set_flags: doc.set_flags.clone(),
        remove_flags: doc.remove_flags.clone(),
        give_items: doc.give_items.clone(),
        remove_items: doc.remove_items.clone(),
        relationships: doc
            .relationships
            .iter()
            .map(|(npc_id, &delta)| RelationshipChange {
                npc_id: npc_id.clone(),
                delta,
            })
            .collect(),
        experience: doc.experience,
        start_quest: doc.start_quest.clone(),
        next: doc
            .next
            .clone()
            .map_or(NextNode::Resolve, NextNode::Node),
    }
}

fn option(doc: &OptionDoc) -> DialogueOption {
    DialogueOption {
        text: doc.text.clone(),
        condition: condition(&doc.requires, doc.stat_check.as_ref()),
        consequences: consequences(&doc.consequences),
    }
}

fn single_target(doc: &ObjectiveDoc, specific: Option<&String>) -> Option<String> {
    specific.or(doc.target.as_ref()).cloned()
}

fn objective(doc: &ObjectiveDoc) -> Result<Objective, String> {
    let objective_type = ObjectiveType::from_alias(&doc.objective_type)
        .ok_or_else(|| format!("unknown objective type {:?}", doc.objective_type))?;
    let missing = |field: &str| format!("{:?} objective needs {field}", doc.objective_type);

    let kind = match objective_type {
        ObjectiveType::Collect => ObjectiveKind::Collect {
            item_id: single_target(doc, doc.item_id.as_ref()).ok_or_else(|| missing("item_id"))?,
        },
        ObjectiveType::Defeat => ObjectiveKind::Defeat {
            enemy_type: single_target(doc, doc.enemy_type.as_ref())
                .ok_or_else(|| missing("enemy_type"))?,
        },
        ObjectiveType::Visit => ObjectiveKind::Visit {
            location_id: single_target(doc, doc.location_id.as_ref())
                .ok_or_else(|| missing("location_id"))?,
        },
        ObjectiveType::TalkTo => ObjectiveKind::TalkTo {
            npc_id: single_target(doc, doc.npc_id.as_ref()).ok_or_else(|| missing("npc_id"))?,
        },
        ObjectiveType::TalkToEach => {
            if doc.npc_ids.is_empty() {
                return Err(missing("npc_ids"));
            }
            let mut seen = HashSet::new();
            let npc_ids = doc
                .npc_ids
                .iter()
                .filter(|npc_id| seen.insert(npc_id.as_str()))
                .cloned()
                .collect();
            ObjectiveKind::TalkToEach { npc_ids }
        }
        ObjectiveType::Dialogue => {
            let mut dialogue_ids = doc.dialogue_ids.clone();
            if let Some(single) = single_target(doc, doc.dialogue_id.as_ref()) {
                dialogue_ids.push(single);
            }
            if dialogue_ids.is_empty() {
                return Err(missing("dialogue_id or dialogue_ids"));
            }
            ObjectiveKind::Dialogue { dialogue_ids }
        }
        ObjectiveType::DialogueChoice => ObjectiveKind::DialogueChoice {
            dialogue_id: single_target(doc, doc.dialogue_id.as_ref())
                .ok_or_else(|| missing("dialogue_id"))?,
            option_index: doc.option_index.ok_or_else(|| missing("option_index"))?,
        },
    };

    let required = match (&kind, doc.required) {
        (_, Some(required)) => required,
        (ObjectiveKind::TalkToEach { npc_ids }, None) => {
            u32::try_from(npc_ids.len()).map_err(|_| missing("fewer npc_ids"))?
        }
        (_, None) => 1,
    };
    if required == 0 {
        return Err(format!("{:?} objective has a zero target", doc.objective_type));
    }

    Ok(Objective {
        kind,
        required,
        description: doc.description.clone(),
    })
}

fn quest(doc: &QuestDoc, problems: &mut Vec<String>) -> QuestDefinition {
    let objectives = doc
        .objectives
        .iter()
        .enumerate()
        .filter_map(|(position, objective_doc)| {
            objective(objective_doc)
                .map_err(|problem| {
                    problems.push(format!("quest {} objective {position}: {problem}", doc.id));
                })
                .ok()
        })
        .collect();

    QuestDefinition {
        id: doc.id.clone(),
        title: doc.title.clone(),
        description: doc.description.clone(),
        objectives,
        rewards: doc.rewards.clone(),
        requirements: doc.requirements.clone(),
    }
}

fn duplicates<'a>(kind: &str, ids: impl Iterator<Item = &'a str>, problems: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            problems.push(format!("duplicate {kind} id {id}"));
        }
    }
}

/// Builds the catalogs from one merged document.
pub(crate) fn build(
    document: &ContentDocument,
) -> Result<(DialogueCatalog, QuestCatalog), ContentError> {
    let mut problems = Vec::new();

    duplicates("npc", document.npcs.iter().map(|n| n.id.as_str()), &mut problems);
    duplicates(
        "dialogue",
        document.dialogues.iter().map(|d| d.id.as_str()),
        &mut problems,
    );
    duplicates("quest", document.quests.iter().map(|q| q.id.as_str()), &mut problems);

    let npc_ids: HashSet<&str> = document.npcs.iter().map(|n| n.id.as_str()).collect();
    let dialogue_ids: HashSet<&str> = document.dialogues.iter().map(|d| d.id.as_str()).collect();
    let quest_ids: HashSet<&str> = document.quests.iter().map(|q| q.id.as_str()).collect();

    for dialogue in &document.dialogues {
        if !npc_ids.contains(dialogue.npc.as_str()) {
            problems.push(format!(
                "dialogue {} has unknown speaker {}",
                dialogue.id, dialogue.npc
            ));
        }
        for (position, option) in dialogue.options.iter().enumerate() {
            let consequences = &option.consequences;
            if let Some(next) = &consequences.next
                && !dialogue_ids.contains(next.as_str())
            {
                problems.push(format!(
                    "dialogue {} option {position} points to unknown node {next}",
                    dialogue.id
                ));
            }
            if let Some(quest_id) = &consequences.start_quest
                && !quest_ids.contains(quest_id.as_str())
            {
                problems.push(format!(
                    "dialogue {} option {position} offers unknown quest {quest_id}",
                    dialogue.id
                ));
            }
        }
    }

    let quests: Vec<QuestDefinition> = document
        .quests
        .iter()
        .map(|doc| quest(doc, &mut problems))
        .collect();

    if !problems.is_empty() {
        return Err(ContentError::Invalid(problems));
    }

    let npcs = document
        .npcs
        .iter()
        .map(|doc| Npc {
            id: doc.id.clone(),
            name: doc.name.clone(),
        })
        .collect();
    let nodes = document
        .dialogues
        .iter()
        .map(|doc| DialogueNode {
            id: doc.id.clone(),
            npc_id: doc.npc.clone(),
            text: doc.text.clone(),
            condition: condition(&doc.requires, None),
            options: doc.options.iter().map(option).collect(),
        })
        .collect();

    let dialogue = DialogueCatalog::new(npcs, nodes)
        .map_err(|e| ContentError::Invalid(vec![e.user_message()]))?;
    let quests =
        QuestCatalog::new(quests).map_err(|e| ContentError::Invalid(vec![e.user_message()]))?;
    Ok((dialogue, quests))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> ContentDocument {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn problems(yaml: &str) -> Vec<String> {
        match build(&parse(yaml)) {
            Err(ContentError::Invalid(problems)) => problems,
            other => panic!("expected invalid content, got {other:?}"),
        }
    }

    #[test]
    fn test_option_stat_check_is_folded_into_its_condition() {
        // Arrange
        let document = parse(
            r"
npcs: [{ id: npc_ana, name: Ana }]
dialogues:
  - id: d1
    npc: npc_ana
    text: Hello
    requires: { flags: [met_ana], items: [{ item_id: badge }] }
    options:
      - text: Persuade
        requires: { forbids: [angered_ana] }
        stat_check: { stat: charisma, min: 6 }
",
        );

        // Act
        let (dialogue, _) = build(&document).unwrap();

        // Assert
        let node = dialogue.node("d1").unwrap();
        assert_eq!(
            node.condition.clauses(),
            &[
                Clause::RequiresFlags {
                    flags: vec!["met_ana".into()]
                },
                Clause::HasItem {
                    item_id: "badge".into(),
                    min_quantity: 1
                },
            ]
        );
        assert_eq!(
            node.options[0].condition.clauses(),
            &[
                Clause::ForbidsFlags {
                    flags: vec!["angered_ana".into()]
                },
                Clause::StatAtLeast {
                    stat: "charisma".into(),
                    min: 6
                },
            ]
        );
        assert_eq!(node.options[0].consequences.next, NextNode::Resolve);
    }

    #[test]
    fn test_objective_aliases_and_default_targets() {
        // Arrange
        let document = parse(
            r"
quests:
  - id: q1
    title: Town gossip
    objectives:
      - { type: dialogo_multiple, npc_ids: [npc_a, npc_b, npc_c] }
      - { type: matar, target: wolf, count: 3 }
      - { type: dialogue, dialogue_id: d1, dialogue_ids: [d2] }
",
        );

        // Act
        let (_, quests) = build(&document).unwrap();

        // Assert
        let objectives = &quests.get("q1").unwrap().objectives;
        assert_eq!(objectives[0].required, 3);
        assert_eq!(
            objectives[1].kind,
            ObjectiveKind::Defeat {
                enemy_type: "wolf".into()
            }
        );
        assert_eq!(objectives[1].required, 3);
        assert_eq!(
            objectives[2].kind,
            ObjectiveKind::Dialogue {
                dialogue_ids: vec!["d2".into(), "d1".into()]
            }
        );
    }

    #[test]
    fn test_repeated_npc_ids_are_listed_once() {
        // Arrange
        let document = parse(
            r"
quests:
  - id: q1
    title: Rounds
    objectives:
      - { type: talk_to_each, npc_ids: [npc_a, npc_b, npc_a] }
",
        );

        // Act
        let (_, quests) = build(&document).unwrap();

        // Assert
        let objective = &quests.get("q1").unwrap().objectives[0];
        assert_eq!(
            objective.kind,
            ObjectiveKind::TalkToEach {
                npc_ids: vec!["npc_a".into(), "npc_b".into()]
            }
        );
        assert_eq!(objective.required, 2);
    }

    #[test]
    fn test_cross_reference_problems_are_all_reported() {
        let found = problems(
            r"
npcs:
  - { id: npc_ana, name: Ana }
  - { id: npc_ana, name: Ana again }
dialogues:
  - id: d1
    npc: npc_zed
    text: Who?
    options:
      - text: Go on
        consequences: { next: d404, start_quest: q404 }
",
        );

        assert_eq!(found.len(), 4);
        assert!(found.contains(&"duplicate npc id npc_ana".to_owned()));
        assert!(found.contains(&"dialogue d1 has unknown speaker npc_zed".to_owned()));
        assert!(found.iter().any(|p| p.contains("unknown node d404")));
        assert!(found.iter().any(|p| p.contains("unknown quest q404")));
    }

    #[test]
    fn test_bad_objectives_are_reported() {
        let found = problems(
            r"
quests:
  - id: q1
    title: Broken
    objectives:
      - { type: escort, target: caravan }
      - { type: visit, target: old_mill, required: 0 }
      - { type: collect }
",
        );

        assert_eq!(found.len(), 3);
        assert!(found[0].contains("unknown objective type"));
        assert!(found[1].contains("zero target"));
        assert!(found[2].contains("needs item_id"));
    }
}
