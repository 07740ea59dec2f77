//! Tree loading service
//!
//! Resolves where the decision tree comes from (explicit path, configured
//! path, or the built-in tree) and feeds it into the traversal engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::domain::checklist::Checklist;
use crate::domain::{DomainError, DomainResult, LoadOutcome, NodeMap, TraversalEngine};
use crate::infrastructure::traits::FileSystem;

/// Tree shipped with the binary.
pub const BUILTIN_TREE: &str = include_str!("../../../data/master_path.json");

/// Source name reported for the built-in tree.
pub const BUILTIN_TREE_NAME: &str = "built-in tree";

/// Service for reading decision trees.
pub struct TreeService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl TreeService {
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    /// Tree file to read: `path` wins over the configured `tree_path`.
    /// `None` means the built-in tree.
    pub fn source(&self, path: Option<&Path>) -> Option<PathBuf> {
        path.map(Path::to_path_buf)
            .or_else(|| self.settings.tree_path.clone())
    }

    /// Human-readable name of the tree source.
    pub fn source_name(&self, path: Option<&Path>) -> String {
        match self.source(path) {
            Some(p) => p.display().to_string(),
            None => BUILTIN_TREE_NAME.to_string(),
        }
    }

    /// Read and parse the tree. An unreadable file is a load failure.
    pub fn read(&self, path: Option<&Path>) -> DomainResult<NodeMap> {
        match self.source(path) {
            Some(p) => {
                debug!("read: path={}", p.display());
                let name = p.display().to_string();
                let text = self.fs.read_to_string(&p).map_err(|e| DomainError::Load {
                    source_name: name.clone(),
                    reason: e.to_string(),
                })?;
                NodeMap::parse(&name, &text)
            }
            None => {
                debug!("read: built-in tree");
                NodeMap::parse(BUILTIN_TREE_NAME, BUILTIN_TREE)
            }
        }
    }

    /// Load the tree without an engine (validate, print, inspect).
    pub fn load(&self, path: Option<&Path>) -> ApplicationResult<NodeMap> {
        Ok(self.read(path)?)
    }

    /// Load the tree into `engine`, bootstrapping at `entry` when given.
    ///
    /// The engine rejects interactive operations while the load is in
    /// flight; a failed load leaves its previous tree and position in place.
    #[instrument(level = "debug", skip(self, engine, checklist))]
    pub fn load_into(
        &self,
        engine: &mut TraversalEngine,
        path: Option<&Path>,
        entry: Option<&str>,
        checklist: &dyn Checklist,
    ) -> ApplicationResult<LoadOutcome> {
        let ticket = engine.begin_load();
        let loaded = self.read(path);
        let outcome = engine.finish_load(ticket, loaded, entry, checklist)?;
        debug!("load_into: outcome={:?}", outcome);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TreeIssue;
    use crate::infrastructure::traits::RealFileSystem;

    #[test]
    fn given_builtin_tree_when_validating_then_no_issues() {
        let nodes = NodeMap::parse(BUILTIN_TREE_NAME, BUILTIN_TREE).unwrap();
        let issues: Vec<TreeIssue> = nodes.validate();
        assert!(issues.is_empty(), "issues: {:?}", issues);
    }

    #[test]
    fn given_missing_file_when_reading_then_load_error_names_path() {
        let service = TreeService::new(Arc::new(RealFileSystem), Arc::new(Settings::default()));
        let err = service
            .read(Some(Path::new("/definitely/not/here.json")))
            .unwrap_err();
        match err {
            DomainError::Load { source_name, .. } => assert!(source_name.contains("here.json")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
