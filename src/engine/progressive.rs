use tracing::{info, warn};

use super::builder::{skill_node, skills_by_connections};
use super::insertion::{InsertionJob, JobOrigin};
use crate::config::ProgressiveConfig;
use crate::dataset::Dataset;
use crate::graph::style::PROGRESSIVE_SKILL_SIZE;
use crate::graph::{EdgeSpec, GraphStore};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadSkip {
    /// A previous batch is still being inserted.
    InFlight,
    /// Other insertions are still queued; planning now would miss their occupations.
    Busy,
    /// Every skill is already in the graph.
    Exhausted,
    /// The one-shot initial wave already ran.
    InitialDone,
}

/// Merges not-yet-loaded skills into the graph, most connected first.
///
/// Only one batch may be in flight; overlapping calls are refused.
#[derive(Debug)]
pub struct ProgressiveLoader {
    config: ProgressiveConfig,
    in_flight: bool,
    initial_done: bool,
    last_batch: Vec<String>,
}

impl ProgressiveLoader {
    pub fn new(config: ProgressiveConfig) -> Self {
        Self {
            config,
            in_flight: false,
            initial_done: false,
            last_batch: Vec::new(),
        }
    }

    pub fn default_batch(&self) -> usize {
        self.config.batch_size
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn initial_done(&self) -> bool {
        self.initial_done
    }

    /// Skills selected by the most recent plan.
    pub fn last_batch(&self) -> &[String] {
        &self.last_batch
    }

    pub fn plan_more(
        &mut self,
        dataset: &Dataset,
        graph: &dyn GraphStore,
        batch_size: usize,
    ) -> Result<InsertionJob, LoadSkip> {
        self.plan(dataset, graph, batch_size, JobOrigin::LoadMore)
    }

    pub fn plan_initial(
        &mut self,
        dataset: &Dataset,
        graph: &dyn GraphStore,
    ) -> Result<InsertionJob, LoadSkip> {
        if self.initial_done {
            return Err(LoadSkip::InitialDone);
        }
        let job = self.plan(dataset, graph, self.config.batch_size, JobOrigin::InitialSkills)?;
        self.initial_done = true;
        Ok(job)
    }

    fn plan(
        &mut self,
        dataset: &Dataset,
        graph: &dyn GraphStore,
        batch_size: usize,
        origin: JobOrigin,
    ) -> Result<InsertionJob, LoadSkip> {
        if self.in_flight {
            warn!("skill load already in progress; ignoring request");
            return Err(LoadSkip::InFlight);
        }

        let mut pending = skills_by_connections(dataset, |skill| !graph.has_node(&skill.id));
        if pending.is_empty() || batch_size == 0 {
            info!("no unloaded skills remain");
            return Err(LoadSkip::Exhausted);
        }
        pending.truncate(batch_size);

        let mut nodes = Vec::with_capacity(pending.len());
        let mut edges = Vec::new();
        for skill in &pending {
            nodes.push(skill_node(dataset, skill, PROGRESSIVE_SKILL_SIZE));
            let present = dataset
                .relations_for_skill(&skill.id)
                .filter(|relation| graph.has_node(&relation.occupation_id))
                .take(self.config.max_edges_per_skill);
            for relation in present {
                edges.push(EdgeSpec {
                    source: skill.id.clone(),
                    target: relation.occupation_id.clone(),
                    kind: relation.relation_type.into(),
                });
            }
        }

        self.last_batch = pending.iter().map(|skill| skill.id.clone()).collect();
        self.in_flight = true;
        info!(
            ?origin,
            skills = nodes.len(),
            edges = edges.len(),
            "planned skill batch"
        );
        Ok(InsertionJob::new(origin, nodes, edges))
    }

    /// Releases the guard once the batch has drained into the graph.
    pub fn finish(&mut self) {
        self.in_flight = false;
    }
}
