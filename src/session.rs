use crate::config::{Config, Viewport};
use crate::expansion::{ExpandError, ExpansionController, ExpansionOutcome, ExpansionTicket};
use crate::graph::GraphModel;
use crate::layout::{Layout, LayoutParams, compute_layout, redistribute_layout};
use crate::model::{ExpansionPayload, GraphPayload, Metadata, NodeId};
use crate::source::{ExpansionRequest, FetchError, GraphSource, sample_graph};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("prompt is required")]
    EmptyPrompt,
    #[error(transparent)]
    Expand(#[from] ExpandError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphOrigin {
    Upstream,
    /// The upstream fetch failed and the sample dataset was loaded instead.
    Sample,
}

/// Everything one user's graph exploration needs: the graph, the expansion bookkeeping, the UI
/// state that feeds layout, and the most recent layout.
#[derive(Debug)]
pub struct Session {
    config: Config,
    graph: GraphModel,
    controller: ExpansionController,
    metadata: Option<Metadata>,
    active_cluster: Option<String>,
    focus: Option<NodeId>,
    layout: Layout,
}

impl Session {
    pub fn new(config: Config) -> Self {
        let layout = Layout::empty(config.viewport);
        Self {
            config,
            graph: GraphModel::new(),
            controller: ExpansionController::new(),
            metadata: None,
            active_cluster: None,
            focus: None,
            layout,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn graph(&self) -> &GraphModel {
        &self.graph
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn active_cluster(&self) -> Option<&str> {
        self.active_cluster.as_deref()
    }

    /// Node most recently targeted by an expansion.
    pub fn focus(&self) -> Option<NodeId> {
        self.focus
    }

    pub fn generation(&self) -> u64 {
        self.controller.generation()
    }

    pub fn is_loading(&self, id: NodeId) -> bool {
        self.controller.is_loading(id)
    }

    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    /// Discards the graph and invalidates any expansion still in flight.
    pub fn reset(&mut self) {
        self.graph.clear();
        self.controller.reset();
        self.metadata = None;
        self.active_cluster = None;
        self.focus = None;
        self.relayout();
    }

    /// Starts over with a graph for `prompt`, falling back to the sample graph when the
    /// source fails.
    pub fn generate(
        &mut self,
        prompt: &str,
        source: &mut dyn GraphSource,
    ) -> Result<GraphOrigin, SessionError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(SessionError::EmptyPrompt);
        }
        self.reset();
        match source.fetch_graph(prompt) {
            Ok(payload) => {
                self.load(prompt, payload);
                Ok(GraphOrigin::Upstream)
            }
            Err(err) => {
                warn!(error = %err, "graph fetch failed, loading sample graph");
                self.load(prompt, sample_graph(prompt));
                Ok(GraphOrigin::Sample)
            }
        }
    }

    /// Replaces the graph with `payload`.
    pub fn load(&mut self, prompt: &str, payload: GraphPayload) {
        self.reset();
        self.metadata = Some(payload.metadata.unwrap_or_else(|| Metadata::now(prompt)));
        self.graph.set_graph(payload.nodes, payload.edges, payload.clusters);
        info!(
            nodes = self.graph.nodes().len(),
            edges = self.graph.edges().len(),
            clusters = self.graph.clusters().len(),
            "loaded graph"
        );
        self.relayout();
    }

    /// Starts an expansion and focuses its node. Re-requesting an already expanded node still
    /// moves the focus; a request turned away because another one is in flight does not.
    pub fn begin_expansion(
        &mut self,
        request: ExpansionRequest,
    ) -> Result<Option<ExpansionTicket>, ExpandError> {
        let node = request.node_id;
        let blocked = self.controller.is_busy();
        let ticket = self.controller.begin(&self.graph, request)?;
        if (ticket.is_some() || !blocked) && self.focus != Some(node) {
            self.focus = Some(node);
            self.relayout();
        }
        Ok(ticket)
    }

    pub fn complete_expansion(
        &mut self,
        ticket: ExpansionTicket,
        result: Result<ExpansionPayload, FetchError>,
    ) -> Result<ExpansionOutcome, ExpandError> {
        let outcome =
            self.controller
                .complete(&mut self.graph, ticket, result, &self.config.merge)?;
        if matches!(outcome, ExpansionOutcome::Merged(_)) {
            self.relayout();
        }
        Ok(outcome)
    }

    /// Gives up on an outstanding ticket without merging anything.
    pub fn cancel_expansion(&mut self, ticket: &ExpansionTicket) -> bool {
        self.controller.cancel(ticket)
    }

    /// Blocking expansion: begin, fetch from `source`, complete.
    pub fn expand(
        &mut self,
        request: ExpansionRequest,
        source: &mut dyn GraphSource,
    ) -> Result<ExpansionOutcome, ExpandError> {
        let Some(ticket) = self.begin_expansion(request)? else {
            return Ok(ExpansionOutcome::Skipped);
        };
        let result = {
            let _guard = CancelOnUnwind {
                controller: &mut self.controller,
                ticket: &ticket,
            };
            source.fetch_expansion(ticket.request())
        };
        self.complete_expansion(ticket, result)
    }

    /// Activates `cluster`, or clears it when it is already active.
    pub fn toggle_cluster(&mut self, cluster: &str) {
        if self.active_cluster.as_deref() == Some(cluster) {
            self.active_cluster = None;
        } else {
            self.active_cluster = Some(cluster.to_string());
        }
        self.relayout();
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.config.viewport = viewport;
        self.relayout();
    }

    pub fn layout_params(&self) -> LayoutParams {
        LayoutParams {
            expanded: self.focus.into_iter().collect(),
            active_cluster: self.active_cluster.clone(),
            viewport: self.config.viewport,
            force_wide: false,
        }
    }

    pub fn relayout(&mut self) -> &Layout {
        self.layout = compute_layout(&self.graph, &self.layout_params(), &self.config.layout);
        &self.layout
    }

    pub fn redistribute(&mut self) -> &Layout {
        self.layout =
            redistribute_layout(&self.graph, &self.layout_params(), &self.config.layout);
        &self.layout
    }
}

/// Releases the ticket when the fetch panics, so the slot and the loading marker do not leak.
struct CancelOnUnwind<'a> {
    controller: &'a mut ExpansionController,
    ticket: &'a ExpansionTicket,
}

impl Drop for CancelOnUnwind<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.controller.cancel(self.ticket);
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{RecordedSource, SampleSource};
    use std::panic::{AssertUnwindSafe, catch_unwind};

    struct CrashingSource;

    impl GraphSource for CrashingSource {
        fn fetch_graph(&mut self, _prompt: &str) -> Result<GraphPayload, FetchError> {
            Err(FetchError::Upstream("unreachable".to_string()))
        }

        fn fetch_expansion(&mut self, _request: &ExpansionRequest) -> Result<ExpansionPayload, FetchError> {
            panic!("transport crashed");
        }
    }

    #[test]
    fn blank_prompt_changes_nothing() {
        let mut session = Session::default();
        session.load("energy", sample_graph("energy"));
        let generation = session.generation();
        let err = session.generate("   ", &mut SampleSource).expect_err("blank prompt");
        assert!(matches!(err, SessionError::EmptyPrompt));
        assert_eq!(session.generation(), generation);
        assert_eq!(session.graph().nodes().len(), 10);
    }

    #[test]
    fn failed_fetch_falls_back_to_sample_graph() {
        let mut session = Session::default();
        let mut source = RecordedSource::new();
        let origin = session.generate("solar", &mut source).expect("fallback");
        assert_eq!(origin, GraphOrigin::Sample);
        assert_eq!(session.graph().nodes().len(), 10);
        assert_eq!(session.metadata().map(|m| m.prompt.as_str()), Some("solar"));
        assert_eq!(session.layout().nodes.len(), 10);
    }

    #[test]
    fn expansion_failure_surfaces_once_graph_exists() {
        let mut session = Session::default();
        session.generate("energy", &mut SampleSource).expect("sample graph");
        let err = session
            .expand(ExpansionRequest::new(3), &mut RecordedSource::new())
            .expect_err("no recording");
        assert!(matches!(err, ExpandError::Fetch { .. }));
        assert_eq!(session.graph().nodes().len(), 10);
        assert!(!session.is_loading(NodeId(3)));
    }

    #[test]
    fn expansion_relayouts_and_tracks_focus() {
        let mut session = Session::default();
        session.generate("energy", &mut SampleSource).expect("sample graph");
        let outcome = session
            .expand(ExpansionRequest::new(1).with_kind("practical"), &mut SampleSource)
            .expect("expansion");
        let ExpansionOutcome::Merged(report) = outcome else {
            panic!("expected merge, got {outcome:?}");
        };
        assert_eq!(report.added_nodes.len(), 3);
        assert_eq!(session.focus(), Some(NodeId(1)));
        assert_eq!(session.layout().nodes.len(), 13);
        let child = session.layout().node(NodeId(101)).expect("child laid out");
        assert_eq!(child.expansion_type.as_deref(), Some("practical"));
        assert_eq!(
            session.layout().node(NodeId(1)).and_then(|n| n.radius),
            Some(session.config().layout.expanded_node_radius)
        );
    }

    #[test]
    fn toggling_a_cluster_twice_clears_it() {
        let mut session = Session::default();
        session.load("energy", sample_graph("energy"));
        session.toggle_cluster("c2");
        assert_eq!(session.active_cluster(), Some("c2"));
        assert!(session.layout().clusters.iter().any(|c| c.id == "c2" && c.active));
        session.toggle_cluster("c2");
        assert_eq!(session.active_cluster(), None);
    }

    #[test]
    fn reset_discards_in_flight_results() {
        let mut session = Session::default();
        session.load("energy", sample_graph("energy"));
        let ticket = session
            .begin_expansion(ExpansionRequest::new(2))
            .expect("valid")
            .expect("ticket issued");
        session.load("storage", sample_graph("storage"));
        let payload = SampleSource
            .fetch_expansion(ticket.request())
            .expect("sample expansion");
        let outcome = session.complete_expansion(ticket, Ok(payload)).expect("discarded");
        assert_eq!(outcome, ExpansionOutcome::Discarded);
        assert_eq!(session.graph().nodes().len(), 10);
    }

    #[test]
    fn abandoned_ticket_can_be_cancelled() {
        let mut session = Session::default();
        session.load("energy", sample_graph("energy"));
        let ticket = session
            .begin_expansion(ExpansionRequest::new(1))
            .expect("valid")
            .expect("ticket issued");
        assert!(session.cancel_expansion(&ticket));
        drop(ticket);
        assert!(!session.is_loading(NodeId(1)));

        let next = session
            .expand(ExpansionRequest::new(2), &mut SampleSource)
            .expect("slot is free");
        assert!(matches!(next, ExpansionOutcome::Merged(_)));
        assert!(!session.is_busy());
    }

    #[test]
    fn panicking_fetch_releases_the_slot() {
        let mut session = Session::default();
        session.load("energy", sample_graph("energy"));
        let crashed = catch_unwind(AssertUnwindSafe(|| {
            session.expand(ExpansionRequest::new(1), &mut CrashingSource)
        }));
        assert!(crashed.is_err());
        assert!(!session.is_busy());
        assert!(!session.is_loading(NodeId(1)));
        assert_eq!(session.graph().nodes().len(), 10);
    }

    #[test]
    fn turned_away_request_keeps_focus_on_the_running_one() {
        let mut session = Session::default();
        session.load("energy", sample_graph("energy"));
        let ticket = session
            .begin_expansion(ExpansionRequest::new(1))
            .expect("valid")
            .expect("ticket issued");
        assert!(
            session
                .begin_expansion(ExpansionRequest::new(2))
                .expect("valid")
                .is_none()
        );
        assert_eq!(session.focus(), Some(NodeId(1)));

        let payload = SampleSource
            .fetch_expansion(ticket.request())
            .expect("sample expansion");
        session.complete_expansion(ticket, Ok(payload)).expect("merged");
        let other = session
            .begin_expansion(ExpansionRequest::new(3))
            .expect("valid")
            .expect("ticket issued");
        assert!(session.cancel_expansion(&other));
        assert_eq!(session.focus(), Some(NodeId(3)));
        // Re-requesting an expanded node is declined but still refocuses it.
        assert!(
            session
                .begin_expansion(ExpansionRequest::new(1))
                .expect("valid")
                .is_none()
        );
        assert_eq!(session.focus(), Some(NodeId(1)));
    }
}
