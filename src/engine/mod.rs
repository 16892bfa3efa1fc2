pub mod builder;
pub mod debounce;
pub mod expand;
pub mod insertion;
pub mod interaction;
pub mod progressive;
pub mod quality;
pub mod search;

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::dataset::Dataset;
use crate::graph::style::HighlightScheme;
use crate::graph::{GraphStore, MemoryGraph, NodeKind};
use crate::layout::{ForceLayout, Layout};
use crate::render::{CameraTarget, RenderError, Renderer, RendererEvent};

use expand::{ClusterExpander, Expansion};
use insertion::{
    CompletedJob, InsertionJob, InsertionProgress, InsertionScheduler, JobOrigin, StepOutcome,
};
use interaction::{InteractionController, InteractionState, Tooltip};
use progressive::{LoadSkip, ProgressiveLoader};
use quality::{QualityManager, QualityTier};
use search::{SearchController, SearchHit};

const ZOOM_IN_FACTOR: f32 = 0.7;
const ZOOM_OUT_FACTOR: f32 = 1.3;
const ZOOM_DURATION: Duration = Duration::from_millis(300);
const RESET_VIEW_DURATION: Duration = Duration::from_millis(500);
const SEARCH_CAMERA_DURATION: Duration = Duration::from_millis(1200);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachState {
    Pending { attempts: u32, retry_at: Instant },
    Attached,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Started { skills: usize },
    Skipped(LoadSkip),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpandOutcome {
    Queued { nodes: usize, edges: usize },
    AlreadyExpanded,
    Empty,
    UnknownCluster,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EngineStats {
    pub nodes: usize,
    pub edges: usize,
    pub skills_loaded: usize,
    pub skills_total: usize,
    pub load_percent: f32,
    pub quality: QualityTier,
    pub zoom_ratio: f32,
    pub interacting: bool,
    pub expanded_clusters: usize,
    pub pending_insertions: usize,
    pub insertion: Option<InsertionProgress>,
    pub interaction: InteractionState,
    pub renderer_attached: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectionDetails {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub description: Option<String>,
    pub skill_count: Option<usize>,
    pub neighbors: usize,
}

/// Owns the graph, its renderer and every controller that mutates them.
///
/// All work happens inside `tick`, one insertion batch per call, so the
/// host can call it once per frame.
pub struct Engine<R: Renderer, G: GraphStore = MemoryGraph> {
    config: EngineConfig,
    dataset: Dataset,
    graph: G,
    renderer: R,
    attach: AttachState,
    layout: Box<dyn Layout>,
    scheduler: InsertionScheduler,
    progressive: ProgressiveLoader,
    expander: ClusterExpander,
    quality: QualityManager,
    interaction: InteractionController,
    search: SearchController,
    pending_expansion: Option<(String, Instant)>,
    refresh_retry: Option<Instant>,
}

impl<R: Renderer> Engine<R> {
    pub fn mount(dataset: Dataset, renderer: R, config: EngineConfig, now: Instant) -> Self {
        Self::with_parts(
            dataset,
            MemoryGraph::new(),
            renderer,
            Box::new(ForceLayout::default()),
            config,
            now,
        )
    }
}

impl<R: Renderer, G: GraphStore> Engine<R, G> {
    pub fn with_parts(
        dataset: Dataset,
        graph: G,
        renderer: R,
        layout: Box<dyn Layout>,
        config: EngineConfig,
        now: Instant,
    ) -> Self {
        let timing = &config.timing;
        let mut engine = Self {
            scheduler: InsertionScheduler::new(config.insertion.clone()),
            progressive: ProgressiveLoader::new(config.progressive.clone()),
            expander: ClusterExpander::new(config.expansion.clone()),
            quality: QualityManager::new(
                config.quality.clone(),
                timing.zoom_settle(),
                timing.interaction_cooldown(),
            ),
            interaction: InteractionController::new(timing.hover_delay()),
            search: SearchController::default(),
            attach: AttachState::Pending {
                attempts: 0,
                retry_at: now,
            },
            pending_expansion: None,
            refresh_retry: None,
            layout,
            dataset,
            graph,
            renderer,
            config,
        };

        let selection = builder::select_initial(&engine.dataset, &engine.config.builder);
        engine.scheduler.enqueue(InsertionJob::new(
            JobOrigin::InitialBuild,
            selection.nodes,
            selection.edges,
        ));
        engine
            .renderer
            .apply_settings(engine.quality.tier().render_settings());
        engine.try_attach(now);
        info!("engine mounted");
        engine
    }

    pub fn tick(&mut self, now: Instant) {
        self.try_attach(now);

        for event in self.renderer.drain_events() {
            self.handle_event(event, now);
        }

        if let Some(tier) = self.quality.poll(now) {
            self.renderer.apply_settings(tier.render_settings());
        }
        self.interaction
            .poll_hover(now, &self.graph, &self.renderer);

        let expansion_due = self
            .pending_expansion
            .as_ref()
            .is_some_and(|(_, due)| now >= *due);
        if expansion_due && let Some((id, _)) = self.pending_expansion.take() {
            self.expand(&id);
        }

        if let StepOutcome::Completed(done) = self.scheduler.step(&mut self.graph) {
            self.finish_job(done, now);
        }

        if let Some(due) = self.refresh_retry
            && now >= due
        {
            self.refresh_retry = None;
            self.retry_refresh();
        }
    }

    /// Ticks until queued insertions drain. Timers are left alone.
    pub fn run_until_idle(&mut self, now: Instant) {
        while !self.scheduler.is_idle() {
            self.tick(now);
        }
        self.tick(now);
    }

    pub fn handle_event(&mut self, event: RendererEvent, now: Instant) {
        match event {
            RendererEvent::EnterNode(id) => {
                let allowed =
                    !self.quality.is_interacting() && self.quality.tier() != QualityTier::Low;
                self.interaction.pointer_enter(id, now, allowed);
            }
            RendererEvent::LeaveNode(_) => self.interaction.pointer_leave(),
            RendererEvent::ClickNode(id) => self.click_node(&id, now),
            RendererEvent::ClickStage => self.clear_highlight(now),
            RendererEvent::CameraUpdated { ratio } => self.quality.on_camera_update(ratio, now),
        }
    }

    pub fn click_node(&mut self, id: &str, now: Instant) {
        if self.expander.is_expandable(&self.graph, id) {
            self.expand(id);
            return;
        }
        self.interaction
            .select(&mut self.graph, id, &HighlightScheme::click());
        self.refresh(now);
    }

    pub fn clear_highlight(&mut self, now: Instant) {
        self.interaction.begin_reset(&mut self.graph);
        self.refresh(now);
    }

    pub fn load_more(&mut self, batch_size: Option<usize>) -> LoadOutcome {
        if let Some(skip) = self.load_blocker() {
            return LoadOutcome::Skipped(skip);
        }
        let batch_size = batch_size.unwrap_or(self.progressive.default_batch());
        let planned = self
            .progressive
            .plan_more(&self.dataset, &self.graph, batch_size);
        self.queue_load(planned)
    }

    pub fn load_initial_skills(&mut self) -> LoadOutcome {
        if let Some(skip) = self.load_blocker() {
            return LoadOutcome::Skipped(skip);
        }
        let planned = self.progressive.plan_initial(&self.dataset, &self.graph);
        self.queue_load(planned)
    }

    /// Skills are only planned against a settled graph, so every queued
    /// occupation is present before its relations are resolved.
    fn load_blocker(&self) -> Option<LoadSkip> {
        if self.progressive.is_in_flight() {
            Some(LoadSkip::InFlight)
        } else if self.is_busy() {
            Some(LoadSkip::Busy)
        } else {
            None
        }
    }

    fn queue_load(&mut self, planned: Result<InsertionJob, LoadSkip>) -> LoadOutcome {
        match planned {
            Ok(job) => {
                let skills = job.progress().nodes_total;
                self.scheduler.enqueue(job);
                LoadOutcome::Started { skills }
            }
            Err(skip) => LoadOutcome::Skipped(skip),
        }
    }

    pub fn expand(&mut self, id: &str) -> ExpandOutcome {
        match self.expander.plan(&self.dataset, &self.graph, id) {
            Expansion::Planned(job) => {
                let progress = job.progress();
                self.scheduler.enqueue(job);
                ExpandOutcome::Queued {
                    nodes: progress.nodes_total,
                    edges: progress.edges_total,
                }
            }
            Expansion::AlreadyExpanded => ExpandOutcome::AlreadyExpanded,
            Expansion::Empty => ExpandOutcome::Empty,
            Expansion::UnknownCluster => ExpandOutcome::UnknownCluster,
        }
    }

    /// Centres and highlights the best match. Unmatched queries change nothing.
    pub fn search(&mut self, query: &str, now: Instant) -> Option<SearchHit> {
        let budget = self.quality.search_budget();
        let hits = self.search.find(&self.graph, query, budget);
        let matches = hits.len();
        let Some(best) = hits.into_iter().next() else {
            info!(query, "search found no match");
            return None;
        };

        let tier = self.quality.tier();
        if let Some(display) = self.renderer.node_display_data(&self.graph, &best.id) {
            self.renderer.animate_camera(
                CameraTarget::at(display.framed, tier.search_ratio()),
                SEARCH_CAMERA_DURATION,
            );
        }
        self.interaction
            .select(&mut self.graph, &best.id, &HighlightScheme::search());
        if self.expander.is_expandable(&self.graph, &best.id) {
            self.pending_expansion =
                Some((best.id.clone(), now + self.config.timing.search_expand_delay()));
        }
        self.refresh(now);

        info!(query, node = %best.id, matches, "search matched");
        Some(best)
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(ZOOM_IN_FACTOR);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(ZOOM_OUT_FACTOR);
    }

    fn zoom_by(&mut self, factor: f32) {
        let ratio = self
            .config
            .camera
            .clamp_ratio(self.renderer.camera().ratio * factor);
        self.renderer
            .animate_camera(CameraTarget::ratio(ratio), ZOOM_DURATION);
    }

    pub fn reset_view(&mut self, now: Instant) {
        self.renderer.animate_camera(
            CameraTarget {
                x: Some(0.5),
                y: Some(0.5),
                ratio: Some(1.0),
            },
            RESET_VIEW_DURATION,
        );
        self.clear_highlight(now);
    }

    fn try_attach(&mut self, now: Instant) {
        let AttachState::Pending { attempts, retry_at } = self.attach else {
            return;
        };
        if now < retry_at {
            return;
        }

        if self.renderer.has_size() {
            self.attach = AttachState::Attached;
            info!(attempts, "renderer attached");
            self.refresh(now);
            return;
        }

        let attempts = attempts + 1;
        if attempts >= self.config.timing.attach_max_retries {
            let err = RenderError::ContainerNotSized { attempts };
            error!(%err, "giving up on renderer attach");
            self.attach = AttachState::Failed;
        } else {
            debug!(attempts, "renderer container has no size yet");
            self.attach = AttachState::Pending {
                attempts,
                retry_at: now + self.config.timing.attach_retry(),
            };
        }
    }

    fn finish_job(&mut self, done: CompletedJob, now: Instant) {
        match &done.origin {
            JobOrigin::LoadMore | JobOrigin::InitialSkills => {
                self.progressive.finish();
            }
            JobOrigin::InitialBuild => {
                info!(
                    nodes = self.graph.node_count(),
                    edges = self.graph.edge_count(),
                    "initial graph ready"
                );
            }
            JobOrigin::Expansion(id) => {
                debug!(cluster = %id, "expansion inserted");
            }
        }

        self.layout
            .assign(&mut self.graph, self.config.layout.iterations);
        self.refresh(now);
    }

    fn refresh(&mut self, now: Instant) {
        if self.attach != AttachState::Attached {
            self.interaction.settle();
            return;
        }
        match self.renderer.refresh(&self.graph) {
            Ok(()) => self.interaction.settle(),
            Err(err) => {
                warn!(%err, "renderer refresh failed; retrying once");
                if self.refresh_retry.is_none() {
                    self.refresh_retry = Some(now + self.config.timing.refresh_retry());
                }
            }
        }
    }

    fn retry_refresh(&mut self) {
        if let Err(err) = self.renderer.refresh(&self.graph) {
            error!(%err, "renderer refresh retry failed; view may be stale");
        }
        self.interaction.settle();
    }

    pub fn stats(&self) -> EngineStats {
        let skills_loaded = self.graph.count_kind(NodeKind::Skill);
        let skills_total = self.dataset.skills.len();
        let load_percent = if skills_total == 0 {
            100.0
        } else {
            skills_loaded as f32 / skills_total as f32 * 100.0
        };

        EngineStats {
            nodes: self.graph.node_count(),
            edges: self.graph.edge_count(),
            skills_loaded,
            skills_total,
            load_percent,
            quality: self.quality.tier(),
            zoom_ratio: self.renderer.camera().ratio,
            interacting: self.quality.is_interacting(),
            expanded_clusters: self.expander.expanded_count(),
            pending_insertions: self.scheduler.pending_elements(),
            insertion: self.scheduler.current_progress(),
            interaction: self.interaction.state().clone(),
            renderer_attached: self.attach == AttachState::Attached,
        }
    }

    pub fn selection_details(&self) -> Option<SelectionDetails> {
        let id = self.interaction.selected()?;
        let node = self.graph.node(id)?;
        Some(SelectionDetails {
            id: node.id.clone(),
            label: node.label.clone(),
            kind: node.kind,
            description: node.description.clone(),
            skill_count: node.skill_count,
            neighbors: self.graph.neighbors(id).len(),
        })
    }

    /// Earliest instant a timer inside the engine wants a tick.
    pub fn next_wakeup(&self) -> Option<Instant> {
        let attach = match self.attach {
            AttachState::Pending { retry_at, .. } => Some(retry_at),
            _ => None,
        };
        [
            attach,
            self.quality.next_deadline(),
            self.interaction.hover_deadline(),
            self.pending_expansion.as_ref().map(|(_, due)| *due),
            self.refresh_retry,
        ]
        .into_iter()
        .flatten()
        .min()
    }

    pub fn is_busy(&self) -> bool {
        !self.scheduler.is_idle()
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn attach_state(&self) -> AttachState {
        self.attach
    }

    pub fn quality_tier(&self) -> QualityTier {
        self.quality.tier()
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.interaction.tooltip()
    }

    pub fn interaction_state(&self) -> &InteractionState {
        self.interaction.state()
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expander.is_expanded(id)
    }

    pub fn load_in_flight(&self) -> bool {
        self.progressive.is_in_flight()
    }

    pub fn initial_skills_loaded(&self) -> bool {
        self.progressive.initial_done()
    }

    pub fn last_skill_batch(&self) -> &[String] {
        self.progressive.last_batch()
    }

    /// Tears the engine down and hands the renderer back.
    pub fn dispose(self) -> R {
        info!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "engine disposed"
        );
        self.renderer
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{Vec2, vec2};

    use super::*;
    use crate::dataset::fixtures::synthetic;
    use crate::render::HeadlessRenderer;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn mounted(size: Vec2) -> (Engine<HeadlessRenderer>, Instant) {
        let now = Instant::now();
        let engine = Engine::mount(
            synthetic(3, 50, 500, |index| index % 3),
            HeadlessRenderer::new(size),
            EngineConfig::default(),
            now,
        );
        (engine, now)
    }

    fn ready() -> (Engine<HeadlessRenderer>, Instant) {
        let (mut engine, now) = mounted(vec2(800.0, 600.0));
        engine.run_until_idle(now);
        (engine, now)
    }

    fn first_of_kind(engine: &Engine<HeadlessRenderer>, kind: NodeKind) -> String {
        engine
            .graph()
            .nodes()
            .find(|node| node.kind == kind)
            .map(|node| node.id.clone())
            .unwrap()
    }

    #[test]
    fn attach_gives_up_after_bounded_retries() {
        let (mut engine, start) = mounted(Vec2::ZERO);
        for step in 0..40 {
            engine.tick(start + ms(100) * step);
        }
        assert_eq!(engine.attach_state(), AttachState::Failed);
        assert_eq!(engine.renderer().refresh_count(), 0);
        assert_eq!(
            RenderError::ContainerNotSized { attempts: 20 }.to_string(),
            "container still has no size after 20 attempts"
        );
        assert!(engine.graph().node_count() > 0);
    }

    #[test]
    fn attach_succeeds_once_the_container_has_a_size() {
        let (mut engine, start) = mounted(Vec2::ZERO);
        assert!(matches!(engine.attach_state(), AttachState::Pending { .. }));

        engine.renderer_mut().set_size(vec2(640.0, 480.0));
        engine.tick(start + ms(100));
        assert_eq!(engine.attach_state(), AttachState::Attached);
        assert!(engine.renderer().refresh_count() >= 1);
    }

    #[test]
    fn failed_refresh_is_retried_once() {
        let (mut engine, now) = ready();
        let occupation = first_of_kind(&engine, NodeKind::Occupation);
        let before = engine.renderer().refresh_count();

        engine.renderer_mut().fail_refreshes(1);
        engine.click_node(&occupation, now);
        assert_eq!(engine.renderer().refresh_count(), before);

        engine.tick(now + ms(50));
        assert_eq!(engine.renderer().refresh_count(), before);
        engine.tick(now + ms(100));
        assert_eq!(engine.renderer().refresh_count(), before + 1);
        assert_eq!(
            engine.interaction_state(),
            &InteractionState::Selected(occupation)
        );
    }

    #[test]
    fn reset_settles_even_when_both_refreshes_fail() {
        let (mut engine, now) = ready();
        let occupation = first_of_kind(&engine, NodeKind::Occupation);
        engine.click_node(&occupation, now);

        engine.renderer_mut().fail_refreshes(2);
        engine.clear_highlight(now);
        assert_eq!(engine.interaction_state(), &InteractionState::Resetting);
        engine.tick(now + ms(100));
        assert_eq!(engine.interaction_state(), &InteractionState::Idle);
    }

    #[test]
    fn clicking_a_group_expands_instead_of_highlighting() {
        let (mut engine, now) = ready();
        let group = first_of_kind(&engine, NodeKind::Group);

        engine
            .renderer_mut()
            .push_event(RendererEvent::ClickNode(group.clone()));
        engine.tick(now);
        assert!(engine.is_expanded(&group));
        assert_eq!(engine.interaction_state(), &InteractionState::Idle);

        engine.run_until_idle(now);
        engine.click_node(&group, now);
        assert_eq!(engine.interaction_state(), &InteractionState::Selected(group));
    }

    #[test]
    fn search_hit_on_group_expands_after_delay() {
        let (mut engine, now) = ready();
        let group = first_of_kind(&engine, NodeKind::Group);
        let label = engine.graph().node(&group).map(|n| n.label.clone()).unwrap();

        let hit = engine.search(&label, now).unwrap();
        assert_eq!(hit.id, group);
        let (target, duration) = *engine.renderer().animations().last().unwrap();
        assert_eq!(duration, SEARCH_CAMERA_DURATION);
        assert_eq!(target.ratio, Some(QualityTier::Medium.search_ratio()));

        engine.tick(now + ms(100));
        assert!(!engine.is_expanded(&group));
        engine.tick(now + ms(500));
        assert!(engine.is_expanded(&group));
    }

    #[test]
    fn hover_is_suppressed_while_the_camera_moves() {
        let (mut engine, now) = ready();
        let skill = first_of_kind(&engine, NodeKind::Skill);

        engine.renderer_mut().zoom_to(1.0);
        engine.tick(now);
        engine.handle_event(RendererEvent::EnterNode(skill.clone()), now + ms(10));
        engine.tick(now + ms(200));
        assert!(engine.tooltip().is_none());

        engine.tick(now + ms(400));
        engine.handle_event(RendererEvent::EnterNode(skill.clone()), now + ms(400));
        engine.tick(now + ms(500));
        assert_eq!(engine.tooltip().map(|t| t.node_id.as_str()), Some(skill.as_str()));
    }

    #[test]
    fn hover_is_suppressed_at_the_low_tier() {
        let (mut engine, now) = ready();
        let skill = first_of_kind(&engine, NodeKind::Skill);

        engine.renderer_mut().zoom_to(8.0);
        engine.tick(now);
        engine.tick(now + ms(150));
        assert_eq!(engine.quality_tier(), QualityTier::Low);

        engine.tick(now + ms(400));
        engine.handle_event(RendererEvent::EnterNode(skill), now + ms(400));
        engine.tick(now + ms(600));
        assert!(engine.tooltip().is_none());
    }

    #[test]
    fn camera_updates_drive_quality_settings() {
        let (mut engine, now) = ready();
        engine.renderer_mut().zoom_to(8.0);
        engine.tick(now);
        assert_eq!(engine.quality_tier(), QualityTier::Medium);

        engine.tick(now + ms(150));
        assert_eq!(engine.quality_tier(), QualityTier::Low);
        let settings = engine.renderer().settings();
        assert!(!settings.render_labels && settings.hide_edges_on_move);
        assert_eq!(settings.label_size, 8.0);
    }

    #[test]
    fn zoom_buttons_scale_ratio_within_clamp() {
        let (mut engine, _) = ready();
        engine.zoom_in();
        assert!((engine.renderer().camera().ratio - 0.7).abs() < 1e-6);

        for _ in 0..40 {
            engine.zoom_out();
        }
        assert_eq!(engine.renderer().camera().ratio, 100.0);
        assert_eq!(engine.renderer().animations().last().map(|a| a.1), Some(ZOOM_DURATION));
    }

    #[test]
    fn stats_track_skill_loading() {
        let (mut engine, now) = ready();
        let before = engine.stats();
        assert_eq!(before.skills_total, 500);
        assert_eq!(before.nodes, 500);
        assert!(before.renderer_attached);

        assert!(matches!(
            engine.load_initial_skills(),
            LoadOutcome::Started { skills: 53 }
        ));
        engine.run_until_idle(now);
        let after = engine.stats();
        assert_eq!(after.skills_loaded, 500);
        assert_eq!(after.load_percent, 100.0);
        assert_eq!(after.pending_insertions, 0);
    }

    #[test]
    fn skill_loads_wait_for_the_graph_to_settle() {
        let now = Instant::now();
        let mut engine = Engine::mount(
            synthetic(3, 50, 2000, |index| index % 3),
            HeadlessRenderer::new(vec2(800.0, 600.0)),
            EngineConfig::default(),
            now,
        );
        let nodes = engine.graph().node_count();

        assert_eq!(
            engine.load_initial_skills(),
            LoadOutcome::Skipped(LoadSkip::Busy)
        );
        assert_eq!(engine.load_more(None), LoadOutcome::Skipped(LoadSkip::Busy));
        assert_eq!(engine.graph().node_count(), nodes);
        assert!(!engine.load_in_flight());

        engine.run_until_idle(now);
        assert!(matches!(
            engine.load_initial_skills(),
            LoadOutcome::Started { .. }
        ));
        let batch = engine.last_skill_batch().to_vec();
        engine.run_until_idle(now);

        assert!(!batch.is_empty());
        for skill in &batch {
            assert!(
                !engine.graph().neighbors(skill).is_empty(),
                "{skill} was loaded without edges"
            );
        }
    }
}
