//! Node map loading, lookup and integrity checks.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::checklist::find_step;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::intake::EntryPoint;
use crate::domain::node::Node;

/// Tree source document: `{"nodes": [...]}`.
#[derive(Debug, Deserialize)]
struct TreeDocument {
    nodes: Vec<Node>,
}

/// Immutable id → node map of one loaded tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeMap {
    nodes: HashMap<String, Node>,
    /// Ids in document order, for deterministic listings.
    order: Vec<String>,
}

impl NodeMap {
    /// Parse a tree source document.
    ///
    /// Fails with `Load` when the text is not a well-formed node list or
    /// when two nodes share an id. Cross references are not checked here.
    pub fn parse(source_name: &str, text: &str) -> DomainResult<Self> {
        let load_err = |reason: String| DomainError::Load {
            source_name: source_name.to_string(),
            reason,
        };
        let document: TreeDocument =
            serde_json::from_str(text).map_err(|e| load_err(e.to_string()))?;
        Self::from_nodes(document.nodes).map_err(|id| load_err(format!("duplicate node id: {id}")))
    }

    /// Build a map from nodes; returns the first duplicated id on conflict.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Result<Self, String> {
        let mut map = NodeMap::default();
        for node in nodes {
            if map.nodes.contains_key(&node.id) {
                return Err(node.id);
            }
            map.order.push(node.id.clone());
            map.nodes.insert(node.id.clone(), node);
        }
        Ok(map)
    }

    pub fn get(&self, id: &str) -> DomainResult<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| DomainError::Lookup(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Follow `next_if_skipped` from `id` until a node whose gate passes,
    /// or one without a redirect.
    ///
    /// Pure: depends only on the map and the done-set. A redirect chain that
    /// revisits a node fails with `GatingCycle`.
    pub fn resolve_gating(&self, id: &str, done: &BTreeSet<String>) -> DomainResult<&Node> {
        let mut chain: Vec<String> = Vec::new();
        let mut node = self.get(id)?;
        loop {
            if chain.iter().any(|seen| *seen == node.id) {
                chain.push(node.id.clone());
                return Err(DomainError::GatingCycle(chain));
            }
            chain.push(node.id.clone());

            if !node.gate_fails(done) {
                return Ok(node);
            }
            match &node.next_if_skipped {
                Some(skip_to) => {
                    debug!("gate failed on {}, redirecting to {}", node.id, skip_to);
                    node = self.get(skip_to)?;
                }
                None => return Ok(node),
            }
        }
    }

    /// Integrity report: dangling references, invalid nodes, redirect
    /// cycles, missing entry nodes and unknown checklist ids.
    pub fn validate(&self) -> Vec<TreeIssue> {
        let mut issues = Vec::new();

        for entry in EntryPoint::ALL {
            if !self.contains(entry.node_id()) {
                issues.push(TreeIssue::MissingEntry(entry.node_id().to_string()));
            }
        }

        for node in self.iter() {
            if node.kind().is_err() {
                issues.push(TreeIssue::NoContent(node.id.clone()));
            }
            if node.is_decision() && node.options.is_empty() {
                issues.push(TreeIssue::NoOptions(node.id.clone()));
            }
            for (field, target) in node.references() {
                if !self.contains(target) {
                    issues.push(TreeIssue::Dangling {
                        node: node.id.clone(),
                        field,
                        target: target.to_string(),
                    });
                }
            }
            let unknown: BTreeSet<&str> = node
                .checklist_ids()
                .filter(|id| find_step(id).is_none())
                .collect();
            for id in unknown {
                issues.push(TreeIssue::UnknownChecklistId {
                    node: node.id.clone(),
                    id: id.to_string(),
                });
            }
        }

        for cycle in self.skip_cycles() {
            issues.push(TreeIssue::SkipCycle(cycle));
        }
        issues
    }

    /// Distinct `next_if_skipped` cycles, each reported once from its
    /// smallest id.
    fn skip_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for start in self.iter() {
            let mut path: Vec<&str> = vec![start.id.as_str()];
            let mut current = start;
            while let Some(next) = current
                .next_if_skipped
                .as_deref()
                .and_then(|id| self.nodes.get(id))
            {
                if let Some(pos) = path.iter().position(|seen| *seen == next.id) {
                    let mut cycle: Vec<String> = path[pos..].iter().map(|s| s.to_string()).collect();
                    let min_pos = cycle
                        .iter()
                        .enumerate()
                        .min_by(|a, b| a.1.cmp(b.1))
                        .map(|(i, _)| i)
                        .unwrap_or(0);
                    cycle.rotate_left(min_pos);
                    if let Some(first) = cycle.first().cloned() {
                        cycles.entry(first).or_insert(cycle);
                    }
                    break;
                }
                path.push(next.id.as_str());
                current = next;
            }
        }
        cycles.into_values().collect()
    }
}

/// One problem found by `NodeMap::validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeIssue {
    MissingEntry(String),
    NoContent(String),
    NoOptions(String),
    Dangling {
        node: String,
        field: &'static str,
        target: String,
    },
    SkipCycle(Vec<String>),
    UnknownChecklistId {
        node: String,
        id: String,
    },
}

impl fmt::Display for TreeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeIssue::MissingEntry(id) => write!(f, "entry node missing: {id}"),
            TreeIssue::NoContent(id) => write!(f, "{id}: neither question nor result"),
            TreeIssue::NoOptions(id) => write!(f, "{id}: question without options"),
            TreeIssue::Dangling {
                node,
                field,
                target,
            } => write!(f, "{node}: {field} -> {target} does not exist"),
            TreeIssue::SkipCycle(cycle) => {
                let first = cycle.first().map(String::as_str).unwrap_or_default();
                write!(f, "nextIfSkipped cycle: {} -> {}", cycle.join(" -> "), first)
            }
            TreeIssue::UnknownChecklistId { node, id } => {
                write!(f, "{node}: unknown checklist id {id}")
            }
        }
    }
}

/// Generation ticket handed out when a load starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// What happened to a completed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer load started before this one completed; result discarded.
    Superseded,
}

/// Holds the current node map and arbitrates concurrent loads.
///
/// The map is swapped atomically; only the newest ticket may install a map.
#[derive(Debug, Clone, Default)]
pub struct TreeRepository {
    nodes: Arc<NodeMap>,
    generation: u64,
    pending: Option<u64>,
}

impl TreeRepository {
    pub fn new(nodes: NodeMap) -> Self {
        Self {
            nodes: Arc::new(nodes),
            generation: 0,
            pending: None,
        }
    }

    pub fn nodes(&self) -> &NodeMap {
        &self.nodes
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Start a load; supersedes any load still in flight.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.pending = Some(self.generation);
        debug!("tree load started: generation {}", self.generation);
        LoadTicket(self.generation)
    }

    /// Whether `ticket` still belongs to the newest load.
    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.pending == Some(ticket.0)
    }

    /// Complete a load. Stale tickets are discarded without touching state.
    /// A failed current load ends the pending state and keeps the old map.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        loaded: DomainResult<NodeMap>,
    ) -> DomainResult<LoadOutcome> {
        if !self.is_current(ticket) {
            warn!(
                "discarding stale tree load: generation {} (current {})",
                ticket.0, self.generation
            );
            return Ok(LoadOutcome::Superseded);
        }
        self.pending = None;
        let nodes = loaded?;
        debug!("tree load applied: {} nodes", nodes.len());
        self.nodes = Arc::new(nodes);
        Ok(LoadOutcome::Applied)
    }

    /// Abandon the current load without installing anything.
    pub fn cancel_load(&mut self, ticket: LoadTicket) {
        if self.is_current(ticket) {
            self.pending = None;
        }
    }
}
