use std::collections::VecDeque;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::InsertionConfig;
use crate::graph::{EdgeData, EdgeSpec, GraphStore, NodeData, NodeSpec};

/// Why a batch of insertions was queued.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobOrigin {
    InitialBuild,
    LoadMore,
    InitialSkills,
    Expansion(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InsertionProgress {
    pub nodes_inserted: usize,
    pub nodes_total: usize,
    pub edges_inserted: usize,
    pub edges_total: usize,
    pub edges_dropped: usize,
}

impl InsertionProgress {
    pub fn fraction(&self) -> f32 {
        let total = self.nodes_total + self.edges_total;
        if total == 0 {
            return 1.0;
        }
        let done = self.nodes_inserted + self.edges_inserted + self.edges_dropped;
        done as f32 / total as f32
    }
}

/// Nodes first, then edges, so every edge meets its endpoints.
#[derive(Debug)]
pub struct InsertionJob {
    pub origin: JobOrigin,
    nodes: VecDeque<NodeSpec>,
    edges: VecDeque<EdgeSpec>,
    progress: InsertionProgress,
    inserted_ids: Vec<String>,
}

impl InsertionJob {
    pub fn new(origin: JobOrigin, nodes: Vec<NodeSpec>, edges: Vec<EdgeSpec>) -> Self {
        let progress = InsertionProgress {
            nodes_total: nodes.len(),
            edges_total: edges.len(),
            ..InsertionProgress::default()
        };
        Self {
            origin,
            nodes: nodes.into(),
            edges: edges.into(),
            progress,
            inserted_ids: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn progress(&self) -> InsertionProgress {
        self.progress
    }

    fn step(&mut self, graph: &mut dyn GraphStore, config: &InsertionConfig) {
        if !self.nodes.is_empty() {
            let take = config.node_chunk.max(1).min(self.nodes.len());
            for spec in self.nodes.drain(..take) {
                let id = spec.id.clone();
                if graph.add_node(NodeData::from(spec)) {
                    self.progress.nodes_inserted += 1;
                    self.inserted_ids.push(id);
                }
            }
            return;
        }

        let take = config.edge_chunk.max(1).min(self.edges.len());
        for spec in self.edges.drain(..take) {
            match graph.add_edge(EdgeData::from(spec)) {
                Ok(true) => self.progress.edges_inserted += 1,
                Ok(false) => {}
                Err(err) => {
                    debug!(%err, "dropping edge");
                    self.progress.edges_dropped += 1;
                }
            }
        }
    }
}

/// A job that has fully drained into the graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedJob {
    pub origin: JobOrigin,
    pub progress: InsertionProgress,
    /// Ids of nodes that were new to the graph.
    pub inserted_ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Idle,
    Progress(InsertionProgress),
    Completed(CompletedJob),
}

/// Feeds queued jobs into the graph one bounded batch per step.
#[derive(Debug)]
pub struct InsertionScheduler {
    config: InsertionConfig,
    queue: VecDeque<InsertionJob>,
}

impl InsertionScheduler {
    pub fn new(config: InsertionConfig) -> Self {
        Self {
            config,
            queue: VecDeque::new(),
        }
    }

    pub fn enqueue(&mut self, job: InsertionJob) {
        debug!(
            origin = ?job.origin,
            nodes = job.progress.nodes_total,
            edges = job.progress.edges_total,
            "queued insertion job"
        );
        self.queue.push_back(job);
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn current_progress(&self) -> Option<InsertionProgress> {
        self.queue.front().map(InsertionJob::progress)
    }

    pub fn pending_elements(&self) -> usize {
        self.queue
            .iter()
            .map(|job| job.nodes.len() + job.edges.len())
            .sum()
    }

    pub fn step(&mut self, graph: &mut dyn GraphStore) -> StepOutcome {
        let Some(job) = self.queue.front_mut() else {
            return StepOutcome::Idle;
        };

        job.step(graph, &self.config);
        if !job.is_empty() {
            return StepOutcome::Progress(job.progress);
        }

        let Some(job) = self.queue.pop_front() else {
            return StepOutcome::Idle;
        };
        info!(
            origin = ?job.origin,
            nodes = job.progress.nodes_inserted,
            edges = job.progress.edges_inserted,
            dropped = job.progress.edges_dropped,
            "insertion job finished"
        );
        StepOutcome::Completed(CompletedJob {
            origin: job.origin,
            progress: job.progress,
            inserted_ids: job.inserted_ids,
        })
    }
}
