//! Turns "expand node N" into a guarded fetch-then-merge.
//!
//! The fetch itself happens outside: [`ExpansionController::begin`] hands out a ticket, the
//! caller awaits its transport of choice, and [`ExpansionController::complete`] applies the
//! result. At most one ticket is outstanding, and tickets issued before a reset are stale.

use crate::config::MergeConfig;
use crate::graph::{GraphModel, MergeReport};
use crate::model::{ExpansionPayload, NodeId};
use crate::source::{ExpansionRequest, FetchError};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ExpandError {
    #[error("invalid node id {0}")]
    InvalidNodeId(NodeId),
    #[error("expansion limit must be positive")]
    InvalidLimit,
    #[error("no graph data exists; generate a graph first")]
    NoGraph,
    #[error("node {0} not found in current graph")]
    UnknownNode(NodeId),
    #[error("failed to expand node {node}")]
    Fetch {
        node: NodeId,
        #[source]
        source: FetchError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionTicket {
    id: u64,
    generation: u64,
    request: ExpansionRequest,
}

impl ExpansionTicket {
    pub fn request(&self) -> &ExpansionRequest {
        &self.request
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpansionOutcome {
    Merged(MergeReport),
    /// Guard hit: the node already has children or another expansion is running.
    Skipped,
    /// The graph was reset (or the ticket superseded) while the fetch was running.
    Discarded,
}

#[derive(Debug, Default)]
pub struct ExpansionController {
    generation: u64,
    next_ticket: u64,
    in_flight: Option<u64>,
    loading: BTreeSet<NodeId>,
}

impl ExpansionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Invalidates every outstanding ticket. Called whenever the graph is replaced.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.in_flight = None;
        self.loading.clear();
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_loading(&self, id: NodeId) -> bool {
        self.loading.contains(&id)
    }

    pub fn loading(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.loading.iter().copied()
    }

    pub fn validate(graph: &GraphModel, request: &ExpansionRequest) -> Result<(), ExpandError> {
        if request.node_id.get() == 0 {
            return Err(ExpandError::InvalidNodeId(request.node_id));
        }
        if request.limit == 0 {
            return Err(ExpandError::InvalidLimit);
        }
        if graph.is_empty() {
            return Err(ExpandError::NoGraph);
        }
        if !graph.contains(request.node_id) {
            return Err(ExpandError::UnknownNode(request.node_id));
        }
        Ok(())
    }

    /// Starts an expansion. `Ok(None)` means the guard declined and nothing was marked.
    pub fn begin(
        &mut self,
        graph: &GraphModel,
        request: ExpansionRequest,
    ) -> Result<Option<ExpansionTicket>, ExpandError> {
        Self::validate(graph, &request)?;
        if graph.has_children(request.node_id) {
            debug!(node = %request.node_id, "node already expanded");
            return Ok(None);
        }
        if self.in_flight.is_some() {
            debug!(node = %request.node_id, "expansion already in flight");
            return Ok(None);
        }

        self.next_ticket += 1;
        let ticket = ExpansionTicket {
            id: self.next_ticket,
            generation: self.generation,
            request,
        };
        self.in_flight = Some(ticket.id);
        self.loading.insert(ticket.request.node_id);
        Ok(Some(ticket))
    }

    /// Releases a ticket whose fetch will never complete, e.g. an abandoned await. Returns
    /// false when the ticket was already stale.
    pub fn cancel(&mut self, ticket: &ExpansionTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        debug!(node = %ticket.request.node_id, "expansion cancelled");
        self.in_flight = None;
        self.loading.remove(&ticket.request.node_id);
        true
    }

    fn is_current(&self, ticket: &ExpansionTicket) -> bool {
        ticket.generation == self.generation && self.in_flight == Some(ticket.id)
    }

    /// Applies a finished fetch. The loading marker is cleared on every path; the graph only
    /// changes on a successful, current result.
    pub fn complete(
        &mut self,
        graph: &mut GraphModel,
        ticket: ExpansionTicket,
        result: Result<ExpansionPayload, FetchError>,
        config: &MergeConfig,
    ) -> Result<ExpansionOutcome, ExpandError> {
        let node = ticket.request.node_id;
        if !self.is_current(&ticket) {
            warn!(node = %node, generation = ticket.generation, "discarding stale expansion result");
            return Ok(ExpansionOutcome::Discarded);
        }
        self.in_flight = None;
        self.loading.remove(&node);

        let payload = result.map_err(|source| {
            warn!(node = %node, error = %source, "expansion fetch failed");
            ExpandError::Fetch { node, source }
        })?;
        let report = graph.merge_expansion(
            node,
            payload.nodes,
            payload.edges,
            Some(ticket.request.kind.as_str()),
            config,
        );
        Ok(ExpansionOutcome::Merged(report))
    }
}
