//! Traversal engine: current node, gating, history, restart.
//!
//! All transitions are pure state changes on an owned value. Every
//! operation validates first and commits last, so a failed step leaves
//! current node, history and checklist exactly as they were.

use std::collections::BTreeSet;

use tracing::{debug, instrument};

use crate::domain::checklist::Checklist;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::intake::GraphicsProfile;
use crate::domain::node::{Node, TreeOption};
use crate::domain::tree::{LoadOutcome, LoadTicket, NodeMap, TreeRepository};

#[derive(Debug, Clone, Default)]
pub struct TraversalEngine {
    tree: TreeRepository,
    current: Option<String>,
    history: Vec<String>,
    entry: Option<String>,
    graphics: GraphicsProfile,
}

impl TraversalEngine {
    pub fn new(tree: TreeRepository) -> Self {
        Self {
            tree,
            ..Self::default()
        }
    }

    pub fn with_nodes(nodes: NodeMap) -> Self {
        Self::new(TreeRepository::new(nodes))
    }

    pub fn set_graphics(&mut self, graphics: GraphicsProfile) {
        self.graphics = graphics;
    }

    pub fn graphics(&self) -> &GraphicsProfile {
        &self.graphics
    }

    pub fn nodes(&self) -> &NodeMap {
        self.tree.nodes()
    }

    pub fn is_loading(&self) -> bool {
        self.tree.is_loading()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current_node(&self) -> DomainResult<&Node> {
        let id = self.current.as_deref().ok_or(DomainError::NotStarted)?;
        self.tree.nodes().get(id)
    }

    /// Visited node ids, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn entry(&self) -> Option<&str> {
        self.entry.as_deref()
    }

    pub fn can_go_back(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn can_restart(&self) -> bool {
        self.entry.is_some()
    }

    /// Gating resolution against the checklist collaborator.
    pub fn resolve_gating(&self, id: &str, checklist: &dyn Checklist) -> DomainResult<&Node> {
        self.tree.nodes().resolve_gating(id, &checklist.done_ids())
    }

    /// Options of `node` visible under the intake graphics profile, in
    /// document order.
    pub fn visible_options<'a>(&self, node: &'a Node) -> Vec<(&'a str, &'a TreeOption)> {
        node.options
            .iter()
            .filter(|(_, option)| self.graphics.permits(option.requires_gpu))
            .collect()
    }

    /// Begin at `entry`: it becomes the restart point and history is cleared.
    #[instrument(level = "debug", skip(self, checklist))]
    pub fn start(&mut self, entry: &str, checklist: &dyn Checklist) -> DomainResult<()> {
        self.ensure_ready()?;
        let target = self.displayable(entry, &checklist.done_ids())?;
        self.entry = Some(entry.to_string());
        self.history.clear();
        self.current = Some(target);
        Ok(())
    }

    /// Move to `id` after gating resolution. History is not touched.
    #[instrument(level = "debug", skip(self, checklist))]
    pub fn enter(&mut self, id: &str, checklist: &dyn Checklist) -> DomainResult<()> {
        self.ensure_ready()?;
        let target = self.displayable(id, &checklist.done_ids())?;
        self.current = Some(target);
        Ok(())
    }

    /// Pick a visible option of the current decision node.
    ///
    /// The target's gate is evaluated with the option's checklist marks
    /// already applied, then history, checklist and current node are updated
    /// together.
    #[instrument(level = "debug", skip(self, checklist))]
    pub fn choose(&mut self, label: &str, checklist: &mut dyn Checklist) -> DomainResult<()> {
        self.ensure_ready()?;
        let current = self.current_node()?;
        if !current.is_decision() {
            return Err(DomainError::NotADecision(current.id.clone()));
        }
        let option = self
            .visible_options(current)
            .into_iter()
            .find(|(candidate, _)| *candidate == label)
            .map(|(_, option)| option.clone())
            .ok_or_else(|| DomainError::UnknownOption {
                node: current.id.clone(),
                label: label.to_string(),
            })?;
        let current_id = current.id.clone();

        let mut done = checklist.done_ids();
        done.extend(option.marked_ids().iter().cloned());
        let target = self.displayable(&option.next, &done)?;

        debug!("choose {:?}: {} -> {}", label, current_id, target);
        self.history.push(current_id);
        for id in option.marked_ids() {
            checklist.mark_done(id);
        }
        self.current = Some(target);
        Ok(())
    }

    /// Return to the previous node verbatim, without gating.
    pub fn back(&mut self) -> DomainResult<()> {
        self.ensure_ready()?;
        let previous = self.history.pop().ok_or(DomainError::HistoryEmpty)?;
        debug!("back to {}", previous);
        self.current = Some(previous);
        Ok(())
    }

    /// Clear history and re-enter the entry node.
    pub fn restart(&mut self, checklist: &dyn Checklist) -> DomainResult<()> {
        self.ensure_ready()?;
        let entry = self.entry.clone().ok_or(DomainError::NotStarted)?;
        let target = self.displayable(&entry, &checklist.done_ids())?;
        self.history.clear();
        self.current = Some(target);
        Ok(())
    }

    /// Restore a saved position exactly: history becomes `path` and current
    /// becomes `current`, with no gating re-resolution.
    ///
    /// Every id must exist in the loaded tree.
    #[instrument(level = "debug", skip(self))]
    pub fn resume(
        &mut self,
        path: Vec<String>,
        current: &str,
        entry: Option<&str>,
    ) -> DomainResult<()> {
        self.ensure_ready()?;
        let nodes = self.tree.nodes();
        nodes.get(current)?.kind()?;
        for id in path.iter().map(String::as_str).chain(entry) {
            nodes.get(id)?;
        }
        self.history = path;
        self.current = Some(current.to_string());
        self.entry = entry.map(str::to_string);
        Ok(())
    }

    /// Start a tree load; interactive operations fail with `LoadPending`
    /// until it completes.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.tree.begin_load()
    }

    /// Complete a tree load and optionally bootstrap at `entry`.
    ///
    /// Stale tickets are discarded. On any failure the previous map and
    /// position stay in place. On success history is cleared.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        loaded: DomainResult<NodeMap>,
        entry: Option<&str>,
        checklist: &dyn Checklist,
    ) -> DomainResult<LoadOutcome> {
        if !self.tree.is_current(ticket) {
            return self.tree.complete_load(ticket, loaded);
        }
        let nodes = match loaded {
            Ok(nodes) => nodes,
            Err(e) => {
                self.tree.cancel_load(ticket);
                return Err(e);
            }
        };
        let target = match entry {
            Some(entry) => match displayable_in(&nodes, entry, &checklist.done_ids()) {
                Ok(target) => Some(target),
                Err(e) => {
                    self.tree.cancel_load(ticket);
                    return Err(e);
                }
            },
            None => None,
        };

        let outcome = self.tree.complete_load(ticket, Ok(nodes))?;
        self.history.clear();
        self.entry = entry.map(str::to_string);
        self.current = target;
        Ok(outcome)
    }

    fn ensure_ready(&self) -> DomainResult<()> {
        if self.tree.is_loading() {
            return Err(DomainError::LoadPending);
        }
        Ok(())
    }

    fn displayable(&self, id: &str, done: &BTreeSet<String>) -> DomainResult<String> {
        displayable_in(self.tree.nodes(), id, done)
    }
}

/// Resolve gating from `id` and check the resulting node can be displayed.
fn displayable_in(nodes: &NodeMap, id: &str, done: &BTreeSet<String>) -> DomainResult<String> {
    let node = nodes.resolve_gating(id, done)?;
    node.kind()?;
    Ok(node.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::checklist::ChecklistStore;

    fn engine(json: &str) -> TraversalEngine {
        TraversalEngine::with_nodes(NodeMap::parse("test", json).unwrap())
    }

    const SMALL: &str = r#"{"nodes":[
        {"id":"root","question":"q?","options":{"go":{"next":"leaf"}}},
        {"id":"leaf","result":"done"}
    ]}"#;

    #[test]
    fn given_pending_load_when_navigating_then_load_pending() {
        let mut engine = engine(SMALL);
        let mut checklist = ChecklistStore::new();
        engine.start("root", &checklist).unwrap();
        let _ticket = engine.begin_load();

        assert_eq!(engine.choose("go", &mut checklist), Err(DomainError::LoadPending));
        assert_eq!(engine.restart(&checklist), Err(DomainError::LoadPending));
        assert_eq!(engine.current_id(), Some("root"));
    }

    #[test]
    fn given_result_node_when_choosing_then_not_a_decision() {
        let mut engine = engine(SMALL);
        let mut checklist = ChecklistStore::new();
        engine.start("leaf", &checklist).unwrap();

        assert_eq!(
            engine.choose("go", &mut checklist),
            Err(DomainError::NotADecision("leaf".into()))
        );
        assert!(engine.history().is_empty());
    }

    #[test]
    fn given_new_load_with_bad_entry_when_finishing_then_old_state_survives() {
        let mut engine = engine(SMALL);
        let checklist = ChecklistStore::new();
        engine.start("root", &checklist).unwrap();

        let ticket = engine.begin_load();
        let replacement = NodeMap::parse("new", r#"{"nodes":[{"id":"other","result":"r"}]}"#);
        let err = engine
            .finish_load(ticket, replacement, Some("root"), &checklist)
            .unwrap_err();

        assert_eq!(err, DomainError::Lookup("root".into()));
        assert!(!engine.is_loading());
        assert!(engine.nodes().contains("leaf"));
        assert_eq!(engine.current_id(), Some("root"));
    }
}
