//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, Prompter, Renderer)
//! but are themselves concrete structs, not traits.

mod session;
mod tree;
mod wizard;

pub use session::{ExportBundle, SessionService};
pub use tree::{TreeService, BUILTIN_TREE, BUILTIN_TREE_NAME};
pub use wizard::{DiagnosisSession, WizardService};
