//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{SessionService, TreeService, WizardService};
use crate::config::Settings;
use crate::infrastructure::traits::{
    DialoguerPrompter, FileSystem, Prompter, RealFileSystem, Renderer, Selector, SkimSelector,
    TerminalRenderer,
};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Interactive prompts
    pub prompter: Arc<dyn Prompter>,

    /// Rendering surface
    pub renderer: Arc<dyn Renderer>,

    /// Fuzzy finder
    pub selector: Arc<dyn Selector>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(DialoguerPrompter),
            Arc::new(TerminalRenderer),
            Arc::new(SkimSelector),
        )
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        prompter: Arc<dyn Prompter>,
        renderer: Arc<dyn Renderer>,
        selector: Arc<dyn Selector>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            fs,
            prompter,
            renderer,
            selector,
        }
    }

    pub fn tree_service(&self) -> TreeService {
        TreeService::new(self.fs.clone(), self.settings.clone())
    }

    pub fn session_service(&self) -> SessionService {
        SessionService::new(self.fs.clone(), self.settings.clone())
    }

    pub fn wizard_service(&self) -> WizardService {
        WizardService::new(
            self.tree_service(),
            self.session_service(),
            self.prompter.clone(),
            self.renderer.clone(),
        )
    }
}
