//! postwiz: interactive no-power / no-POST troubleshooting wizard.
//!
//! An intake questionnaire routes the user to an entry node of a JSON
//! decision tree. The traversal engine walks the tree, skipping nodes whose
//! checklist gate fails, and sessions can be exported as resume codes.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
