use std::collections::HashSet;

use tracing::info;

use crate::config::BuilderConfig;
use crate::dataset::{Dataset, GroupKind, Occupation, Skill};
use crate::graph::style::{GROUP_SIZE, OCCUPATION_SIZE, SKILL_SIZE, SizeCurve};
use crate::graph::{EdgeKind, EdgeSpec, NodeKind, NodeSpec};

/// Nodes and edges selected for the first render, in insertion order.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<EdgeSpec>,
}

pub(crate) fn occupation_node(dataset: &Dataset, occupation: &Occupation) -> NodeSpec {
    let skill_count = dataset.occupation_skill_count(&occupation.id);
    NodeSpec {
        id: occupation.id.clone(),
        label: occupation.display_label().to_owned(),
        description: occupation.description.clone(),
        kind: NodeKind::Occupation,
        size: OCCUPATION_SIZE.size(skill_count),
        skill_count: Some(skill_count),
    }
}

pub(crate) fn skill_node(dataset: &Dataset, skill: &Skill, curve: SizeCurve) -> NodeSpec {
    NodeSpec {
        id: skill.id.clone(),
        label: skill.display_label().to_owned(),
        description: skill.description.clone(),
        kind: NodeKind::Skill,
        size: curve.size(dataset.skill_connection_count(&skill.id)),
        skill_count: None,
    }
}

/// Skills ordered by relation count, most connected first.
pub(crate) fn skills_by_connections<'a>(
    dataset: &'a Dataset,
    keep: impl Fn(&Skill) -> bool,
) -> Vec<&'a Skill> {
    let mut ranked = dataset
        .skills
        .iter()
        .filter(|skill| keep(skill))
        .collect::<Vec<_>>();
    ranked.sort_by_key(|skill| std::cmp::Reverse(dataset.skill_connection_count(&skill.id)));
    ranked
}

/// Picks the initial graph: capped groups, best-connected occupations and
/// enough skills to reach the node floor.
pub fn select_initial(dataset: &Dataset, config: &BuilderConfig) -> Selection {
    let mut selection = Selection::default();

    let groups = dataset
        .groups
        .iter()
        .filter(|group| group.kind == GroupKind::Occupation)
        .take(config.max_groups)
        .collect::<Vec<_>>();
    for group in &groups {
        let total_skills = dataset.group_total_skills(group);
        selection.nodes.push(NodeSpec {
            id: group.id.clone(),
            label: group.display_label(),
            description: group.description.clone(),
            kind: NodeKind::Group,
            size: GROUP_SIZE.size(total_skills),
            skill_count: Some(total_skills),
        });
    }

    let mut occupations = dataset.occupations.iter().collect::<Vec<_>>();
    occupations.sort_by_key(|occupation| {
        std::cmp::Reverse(dataset.occupation_skill_count(&occupation.id))
    });
    occupations.truncate(config.max_occupations);
    let selected_occupations = occupations
        .iter()
        .map(|occupation| occupation.id.as_str())
        .collect::<HashSet<_>>();
    for occupation in &occupations {
        selection.nodes.push(occupation_node(dataset, occupation));
    }

    let skills_needed = config
        .min_skills
        .max(config.node_floor.saturating_sub(selection.nodes.len()));
    let mut skills = skills_by_connections(dataset, |_| true);
    skills.truncate(skills_needed);
    for skill in &skills {
        selection
            .nodes
            .push(skill_node(dataset, skill, SKILL_SIZE));
    }

    let mut seen = HashSet::new();
    for group in &groups {
        let Some(code) = group.code.as_deref() else {
            continue;
        };
        let members = occupations
            .iter()
            .filter(|occupation| occupation.group_code.as_deref() == Some(code))
            .take(config.hierarchy_edges_per_group);
        for occupation in members {
            if selection.edges.len() >= config.max_edges {
                break;
            }
            let edge = EdgeSpec {
                source: group.id.clone(),
                target: occupation.id.clone(),
                kind: EdgeKind::Hierarchy,
            };
            if seen.insert(edge.key()) {
                selection.edges.push(edge);
            }
        }
    }

    'skills: for skill in &skills {
        let mut added = 0;
        for relation in dataset.relations_for_skill(&skill.id) {
            if selection.edges.len() >= config.max_edges {
                break 'skills;
            }
            if added >= config.max_edges_per_skill {
                break;
            }
            if !selected_occupations.contains(relation.occupation_id.as_str()) {
                continue;
            }
            let edge = EdgeSpec {
                source: skill.id.clone(),
                target: relation.occupation_id.clone(),
                kind: relation.relation_type.into(),
            };
            if seen.insert(edge.key()) {
                selection.edges.push(edge);
                added += 1;
            }
        }
    }

    info!(
        groups = groups.len(),
        occupations = occupations.len(),
        skills = skills.len(),
        edges = selection.edges.len(),
        "selected initial graph"
    );
    selection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::synthetic;

    #[test]
    fn reaches_node_floor_with_few_occupations() {
        let dataset = synthetic(3, 50, 500, |_| 0);
        let selection = select_initial(&dataset, &BuilderConfig::default());

        assert_eq!(selection.nodes.len(), 500);
        let groups = selection
            .nodes
            .iter()
            .filter(|node| node.kind == NodeKind::Group)
            .count();
        assert_eq!(groups, 3);
    }

    #[test]
    fn always_adds_minimum_skills() {
        let dataset = synthetic(30, 600, 1000, |_| 0);
        let config = BuilderConfig {
            node_floor: 100,
            ..BuilderConfig::default()
        };
        let selection = select_initial(&dataset, &config);
        let skills = selection
            .nodes
            .iter()
            .filter(|node| node.kind == NodeKind::Skill)
            .count();
        assert_eq!(skills, 50);
    }

    #[test]
    fn edges_only_join_selected_nodes_and_respect_caps() {
        let dataset = synthetic(5, 300, 800, |index| index % 25);
        let config = BuilderConfig::default();
        let selection = select_initial(&dataset, &config);

        let ids = selection
            .nodes
            .iter()
            .map(|node| node.id.as_str())
            .collect::<HashSet<_>>();
        assert!(selection.edges.len() <= config.max_edges);
        for edge in &selection.edges {
            assert!(ids.contains(edge.source.as_str()));
            assert!(ids.contains(edge.target.as_str()));
        }

        let busiest = selection
            .edges
            .iter()
            .filter(|edge| edge.kind != EdgeKind::Hierarchy)
            .fold(std::collections::HashMap::new(), |mut counts, edge| {
                *counts.entry(edge.source.as_str()).or_insert(0_usize) += 1;
                counts
            })
            .into_values()
            .max()
            .unwrap_or(0);
        assert!(busiest <= config.max_edges_per_skill);

        let hierarchy = selection
            .edges
            .iter()
            .filter(|edge| edge.kind == EdgeKind::Hierarchy)
            .count();
        assert_eq!(hierarchy, 5 * config.hierarchy_edges_per_group);
    }

    #[test]
    fn most_connected_skills_come_first() {
        let dataset = synthetic(1, 20, 10, |index| if index == 7 { 9 } else { 0 });
        let selection = select_initial(&dataset, &BuilderConfig::default());
        let first_skill = selection
            .nodes
            .iter()
            .find(|node| node.kind == NodeKind::Skill)
            .map(|node| node.id.as_str());
        assert_eq!(first_skill, Some("skill-7"));
    }
}
