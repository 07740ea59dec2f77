//! Domain layer: tree model, traversal engine, intake routing, session codec
//!
//! This layer is independent of external concerns (no I/O, no prompts, no config loading).

pub mod checklist;
pub mod engine;
pub mod error;
pub mod intake;
pub mod node;
pub mod session;
pub mod tree;

pub use checklist::{Category, Checklist, ChecklistStep, ChecklistStore, CATALOG};
pub use engine::TraversalEngine;
pub use error::{DomainError, DomainResult};
pub use intake::{
    classify, Advance, DebugFeature, EntryPoint, GraphicsKind, GraphicsProfile, HardwareChange,
    IntakeAnswers, IntakeStep, IntakeWizard, StepAnswer, Symptom, SystemHistory,
};
pub use node::{ChecklistMarks, Knowledge, Node, NodeKind, Options, TreeOption};
pub use session::SessionState;
pub use tree::{LoadOutcome, LoadTicket, NodeMap, TreeIssue, TreeRepository};
