//! I/O boundary traits for testability
//!
//! These traits abstract the filesystem, the interactive prompts and the
//! rendering surface, allowing services to be tested with scripted and
//! recording implementations.

use std::collections::BTreeSet;
use std::io;
use std::path::Path;

use colored::Colorize;

use crate::domain::checklist::{steps_in, Category};
use crate::domain::node::{Node, NodeKind, TreeOption};

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// Item for selection prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionItem {
    /// Display text shown in the prompt
    pub display: String,
    /// Actual value (e.g., option label, checklist id)
    pub value: String,
}

impl SelectionItem {
    pub fn new(display: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            display: display.into(),
            value: value.into(),
        }
    }
}

/// Interactive questionnaire prompts.
///
/// `None` from a selection means the user backed out (Esc).
pub trait Prompter: Send + Sync {
    /// Single choice.
    fn select_one(
        &self,
        prompt: &str,
        items: &[SelectionItem],
        default: usize,
    ) -> Result<Option<usize>, String>;

    /// Multiple choice; `checked` pre-selects items.
    fn select_many(
        &self,
        prompt: &str,
        items: &[SelectionItem],
        checked: &[bool],
    ) -> Result<Option<Vec<usize>>, String>;

    /// Free text (may be empty).
    fn input(&self, prompt: &str) -> Result<String, String>;

    /// Yes/no question.
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, String>;
}

/// Fuzzy finder abstraction (FZF-style).
pub trait Selector: Send + Sync {
    /// Present items to user and return selected one.
    /// Returns None if user cancels (Esc/Ctrl-C).
    fn select_one(
        &self,
        items: &[SelectionItem],
        prompt: &str,
    ) -> Result<Option<SelectionItem>, String>;
}

/// Presentation collaborator. The core calls these after each transition;
/// it never reads anything back from the rendering surface.
pub trait Renderer: Send + Sync {
    /// Show a node with its visible options.
    fn display_node(&self, node: &Node, visible: &[(&str, &TreeOption)]);

    /// Show the checklist with `done` ids ticked.
    fn display_checklist(&self, done: &BTreeSet<String>);

    /// Show which navigation controls are available.
    fn display_history_controls(&self, can_go_back: bool, can_restart: bool);

    /// Show a recoverable problem or status line.
    fn display_notice(&self, message: &str);

    /// Show an exported resume code and where the report was saved.
    fn display_resume_code(&self, code: &str, saved_to: Option<&Path>);
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }
}

/// Terminal prompts via dialoguer.
#[derive(Debug, Default)]
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn select_one(
        &self,
        prompt: &str,
        items: &[SelectionItem],
        default: usize,
    ) -> Result<Option<usize>, String> {
        let displays: Vec<&str> = items.iter().map(|i| i.display.as_str()).collect();
        dialoguer::Select::new()
            .with_prompt(prompt)
            .items(&displays)
            .default(default.min(items.len().saturating_sub(1)))
            .interact_opt()
            .map_err(|e| e.to_string())
    }

    fn select_many(
        &self,
        prompt: &str,
        items: &[SelectionItem],
        checked: &[bool],
    ) -> Result<Option<Vec<usize>>, String> {
        let displays: Vec<&str> = items.iter().map(|i| i.display.as_str()).collect();
        dialoguer::MultiSelect::new()
            .with_prompt(prompt)
            .items(&displays)
            .defaults(checked)
            .interact_opt()
            .map_err(|e| e.to_string())
    }

    fn input(&self, prompt: &str) -> Result<String, String> {
        dialoguer::Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| e.to_string())
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, String> {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(|e| e.to_string())
    }
}

/// Real selector implementation using skim (FZF-like).
#[derive(Debug, Default)]
pub struct SkimSelector;

impl Selector for SkimSelector {
    fn select_one(
        &self,
        items: &[SelectionItem],
        prompt: &str,
    ) -> Result<Option<SelectionItem>, String> {
        use skim::prelude::*;
        use std::io::Cursor;

        if items.is_empty() {
            return Ok(None);
        }

        let input = items
            .iter()
            .map(|i| i.display.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let options = SkimOptionsBuilder::default()
            .prompt(Some(prompt))
            .height(Some("50%"))
            .multi(false)
            .build()
            .map_err(|e| format!("failed to build skim options: {e}"))?;

        let item_reader = SkimItemReader::default();
        let source = item_reader.of_bufread(Cursor::new(input));

        match Skim::run_with(&options, Some(source)) {
            Some(out) if out.is_abort => Ok(None),
            Some(out) => Ok(out.selected_items.first().and_then(|selected| {
                let display = selected.output().to_string();
                items.iter().find(|i| i.display == display).cloned()
            })),
            None => Ok(None),
        }
    }
}

/// Colored terminal rendering on stdout.
#[derive(Debug, Default)]
pub struct TerminalRenderer;

impl Renderer for TerminalRenderer {
    fn display_node(&self, node: &Node, visible: &[(&str, &TreeOption)]) {
        println!();
        match node.kind() {
            Ok(NodeKind::Decision { question, .. }) => {
                println!("{}", question.cyan().bold());
                for (label, _) in visible {
                    println!("  {} {}", "•".cyan(), label);
                }
            }
            Ok(NodeKind::Result(result)) => {
                println!("{}", "Result".green().bold());
                println!("{}", result);
            }
            Err(e) => eprintln!("{}: {}", "error".red().bold(), e),
        }
        if let Some(knowledge) = &node.knowledge {
            println!();
            println!("{}", "Knowledge Base".yellow().bold());
            if let Some(text) = &knowledge.text {
                println!("{}", text);
            }
            if let Some(video) = &knowledge.video {
                println!("{} {}", "Video:".yellow(), video.underline());
            }
        }
    }

    fn display_checklist(&self, done: &BTreeSet<String>) {
        println!();
        for category in Category::ALL {
            println!("{}", category.to_string().cyan().bold());
            for step in steps_in(category) {
                let mark = if done.contains(step.id) {
                    "✓".green()
                } else {
                    " ".normal()
                };
                println!("  [{}] {}", mark, step.text);
            }
        }
    }

    fn display_history_controls(&self, can_go_back: bool, can_restart: bool) {
        let mut controls = Vec::new();
        if can_go_back {
            controls.push("⬅ Back");
        }
        if can_restart {
            controls.push("⟳ Restart This Tree");
        }
        if !controls.is_empty() {
            println!("{}", controls.join("   ").dimmed());
        }
    }

    fn display_notice(&self, message: &str) {
        eprintln!("{}: {}", "Warning".yellow(), message);
    }

    fn display_resume_code(&self, code: &str, saved_to: Option<&Path>) {
        println!();
        println!("{}", "Resume code".cyan().bold());
        println!("{}", code);
        if let Some(path) = saved_to {
            println!("{} {}", "✓".green(), format!("Report saved to {}", path.display()));
        }
    }
}
