use std::collections::HashSet;

use tracing::{info, warn};

use super::builder::{occupation_node, skill_node};
use super::insertion::{InsertionJob, JobOrigin};
use crate::config::ExpansionConfig;
use crate::dataset::{Dataset, GroupKind};
use crate::graph::style::EXPANDED_SKILL_SIZE;
use crate::graph::{EdgeKind, EdgeSpec, GraphStore, NodeKind};

#[derive(Debug)]
pub enum Expansion {
    Planned(InsertionJob),
    AlreadyExpanded,
    /// Recorded as expanded but has no members to add.
    Empty,
    UnknownCluster,
}

/// Materializes group members on demand, at most once per group.
#[derive(Debug)]
pub struct ClusterExpander {
    config: ExpansionConfig,
    expanded: HashSet<String>,
}

impl ClusterExpander {
    pub fn new(config: ExpansionConfig) -> Self {
        Self {
            config,
            expanded: HashSet::new(),
        }
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    pub fn expanded_count(&self) -> usize {
        self.expanded.len()
    }

    /// A group node that has not been expanded yet.
    pub fn is_expandable(&self, graph: &dyn GraphStore, id: &str) -> bool {
        !self.is_expanded(id) && graph.node(id).is_some_and(|node| node.kind == NodeKind::Group)
    }

    pub fn plan(&mut self, dataset: &Dataset, graph: &dyn GraphStore, id: &str) -> Expansion {
        if self.is_expanded(id) {
            return Expansion::AlreadyExpanded;
        }
        let Some(group) = dataset.groups.get(id) else {
            warn!(cluster = id, "cannot expand unknown cluster");
            return Expansion::UnknownCluster;
        };
        self.expanded.insert(id.to_owned());

        let code = match (group.kind, group.code.as_deref()) {
            (GroupKind::Occupation, Some(code)) => code,
            _ => {
                info!(cluster = id, "cluster has no occupation members");
                return Expansion::Empty;
            }
        };

        let members = dataset
            .occupations_in_group(code)
            .take(self.config.max_occupations)
            .collect::<Vec<_>>();

        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut planned = HashSet::new();
        let mut push_edge = |edges: &mut Vec<EdgeSpec>, edge: EdgeSpec| {
            let key = edge.key();
            if !graph.has_edge(&key) && planned.insert(key) {
                edges.push(edge);
            }
        };

        for occupation in &members {
            if !graph.has_node(&occupation.id) {
                nodes.push(occupation_node(dataset, occupation));
            }
            push_edge(
                &mut edges,
                EdgeSpec {
                    source: group.id.clone(),
                    target: occupation.id.clone(),
                    kind: EdgeKind::Hierarchy,
                },
            );
        }

        // The first rows pick which skills join; each picked skill then gets
        // every relation it has to a member.
        let mut selected = Vec::new();
        let mut seen = HashSet::new();
        let rows = members
            .iter()
            .flat_map(|occupation| dataset.relations_for_occupation(&occupation.id))
            .take(self.config.max_relations);
        for relation in rows {
            if let Some(skill) = dataset.skills.get(&relation.skill_id)
                && seen.insert(skill.id.as_str())
            {
                selected.push(skill);
            }
        }

        let member_ids = members
            .iter()
            .map(|occupation| occupation.id.as_str())
            .collect::<HashSet<_>>();
        for skill in selected {
            if !graph.has_node(&skill.id) {
                nodes.push(skill_node(dataset, skill, EXPANDED_SKILL_SIZE));
            }
            let relations = dataset
                .relations_for_skill(&skill.id)
                .filter(|relation| member_ids.contains(relation.occupation_id.as_str()));
            for relation in relations {
                push_edge(
                    &mut edges,
                    EdgeSpec {
                        source: skill.id.clone(),
                        target: relation.occupation_id.clone(),
                        kind: relation.relation_type.into(),
                    },
                );
            }
        }

        info!(
            cluster = id,
            occupations = members.len(),
            nodes = nodes.len(),
            edges = edges.len(),
            "expanding cluster"
        );
        Expansion::Planned(InsertionJob::new(
            JobOrigin::Expansion(id.to_owned()),
            nodes,
            edges,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InsertionConfig;
    use crate::dataset::fixtures::synthetic;
    use crate::engine::insertion::{InsertionScheduler, StepOutcome};
    use crate::graph::{MemoryGraph, NodeData, NodeSpec};

    fn graph_with_group(id: &str) -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        graph.add_node(NodeData::from(NodeSpec {
            id: id.to_owned(),
            label: id.to_owned(),
            description: None,
            kind: NodeKind::Group,
            size: 8.0,
            skill_count: None,
        }));
        graph
    }

    fn drain(job: InsertionJob, graph: &mut MemoryGraph) {
        let mut scheduler = InsertionScheduler::new(InsertionConfig::default());
        scheduler.enqueue(job);
        while !matches!(scheduler.step(graph), StepOutcome::Completed(_)) {}
    }

    #[test]
    fn expands_capped_members_with_hierarchy_edges() {
        let dataset = synthetic(2, 60, 120, |_| 2);
        let mut graph = graph_with_group("grp-0");
        let mut expander = ClusterExpander::new(ExpansionConfig::default());

        assert!(expander.is_expandable(&graph, "grp-0"));
        let Expansion::Planned(job) = expander.plan(&dataset, &graph, "grp-0") else {
            panic!("group should expand");
        };
        drain(job, &mut graph);

        assert_eq!(graph.count_kind(NodeKind::Occupation), 10);
        assert_eq!(graph.neighbors("grp-0").len(), 10);
        assert!(graph.count_kind(NodeKind::Skill) <= 15);
        for edge in graph.edges() {
            assert!(graph.has_node(&edge.source) && graph.has_node(&edge.target));
        }
        assert!(!expander.is_expandable(&graph, "grp-0"));
    }

    #[test]
    fn second_expansion_changes_nothing() {
        let dataset = synthetic(2, 60, 120, |_| 2);
        let mut graph = graph_with_group("grp-1");
        let mut expander = ClusterExpander::new(ExpansionConfig::default());

        if let Expansion::Planned(job) = expander.plan(&dataset, &graph, "grp-1") {
            drain(job, &mut graph);
        }
        let counts = (graph.node_count(), graph.edge_count());

        assert!(matches!(
            expander.plan(&dataset, &graph, "grp-1"),
            Expansion::AlreadyExpanded
        ));
        let mut fresh = ClusterExpander::new(ExpansionConfig::default());
        let Expansion::Planned(job) = fresh.plan(&dataset, &graph, "grp-1") else {
            panic!("fresh expander should plan");
        };
        assert!(job.is_empty());
        drain(job, &mut graph);
        assert_eq!((graph.node_count(), graph.edge_count()), counts);
    }

    #[test]
    fn unknown_clusters_leave_state_untouched() {
        let dataset = synthetic(1, 5, 5, |_| 0);
        let graph = MemoryGraph::new();
        let mut expander = ClusterExpander::new(ExpansionConfig::default());

        assert!(matches!(
            expander.plan(&dataset, &graph, "grp-missing"),
            Expansion::UnknownCluster
        ));
        assert_eq!(expander.expanded_count(), 0);
    }

    #[test]
    fn shared_skills_link_to_every_member() {
        let dataset = synthetic(1, 3, 3, |_| 1);
        let mut graph = graph_with_group("grp-0");
        let config = ExpansionConfig {
            max_relations: 1,
            ..ExpansionConfig::default()
        };
        let mut expander = ClusterExpander::new(config);

        let Expansion::Planned(job) = expander.plan(&dataset, &graph, "grp-0") else {
            panic!("group should expand");
        };
        drain(job, &mut graph);

        assert_eq!(graph.count_kind(NodeKind::Skill), 1);
        let mut linked = graph.neighbors("skill-0");
        linked.sort();
        assert_eq!(linked, vec!["occ-0", "occ-1"]);
        assert_eq!(graph.node("skill-0").map(|node| node.base.size), Some(6.0));
    }
}
