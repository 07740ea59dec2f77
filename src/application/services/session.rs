//! Session export and import
//!
//! Export snapshots the engine, checklist and intake into a resume code and
//! a plain-text report. Import restores all three, or nothing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tracing::{debug, info, instrument};

use crate::application::report;
use crate::application::{ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{ChecklistStore, IntakeAnswers, SessionState, TraversalEngine};
use crate::infrastructure::traits::FileSystem;

/// Output of an export.
#[derive(Debug, Clone)]
pub struct ExportBundle {
    pub state: SessionState,
    pub code: String,
    pub report: String,
    /// Report file, when writing reports is enabled.
    pub saved_to: Option<PathBuf>,
}

/// Service for exporting and importing diagnosis sessions.
pub struct SessionService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl SessionService {
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    /// Capture the current position, checklist and intake.
    pub fn snapshot(
        engine: &TraversalEngine,
        checklist: &ChecklistStore,
        intake: &IntakeAnswers,
    ) -> SessionState {
        SessionState {
            intake: intake.clone(),
            checklist: checklist.iter().map(str::to_string).collect(),
            path: engine.history().to_vec(),
            current: engine.current_id().map(str::to_string),
            entry: engine.entry().map(str::to_string),
        }
    }

    /// Export the session as resume code and report; writes the report
    /// file into `report_dir` when enabled.
    #[instrument(level = "debug", skip_all)]
    pub fn export(
        &self,
        engine: &TraversalEngine,
        checklist: &ChecklistStore,
        intake: &IntakeAnswers,
    ) -> ApplicationResult<ExportBundle> {
        let state = Self::snapshot(engine, checklist, intake);
        let code = state.encode()?;
        let now = Local::now();
        let report = report::render(&state, &code, &now);

        let saved_to = if self.settings.write_report {
            let path = self.settings.report_dir.join(report::report_file_name(&now));
            self.fs
                .ensure_parent(&path)
                .with_path_context("create report directory", &path)?;
            self.fs
                .write(&path, &report)
                .with_path_context("write report", &path)?;
            info!("report written to {}", path.display());
            Some(path)
        } else {
            None
        };

        Ok(ExportBundle {
            state,
            code,
            report,
            saved_to,
        })
    }

    /// Decode a resume code or pasted report.
    pub fn decode(&self, input: &str) -> ApplicationResult<SessionState> {
        Ok(SessionState::decode(input)?)
    }

    /// Read a resume code (or a saved report) from a file.
    pub fn read_code_file(&self, path: &Path) -> ApplicationResult<String> {
        self.fs
            .read_to_string(path)
            .with_path_context("read resume code", path)
    }

    /// Apply a decoded session.
    ///
    /// The engine resumes at the saved position verbatim (no gating). The
    /// restart point is the saved entry, or the saved position itself for
    /// codes that carry no entry. Saved checklist
    /// ids are added to the current ones, or replace them when
    /// `replace_checklist` is set. On error nothing is modified.
    #[instrument(level = "debug", skip_all)]
    pub fn apply(
        &self,
        state: &SessionState,
        engine: &mut TraversalEngine,
        checklist: &mut ChecklistStore,
        intake: &mut IntakeAnswers,
        replace_checklist: bool,
    ) -> ApplicationResult<()> {
        let mut restored = if replace_checklist {
            ChecklistStore::new()
        } else {
            checklist.clone()
        };
        restored.mark_all(state.checklist.iter().map(String::as_str));

        match &state.current {
            Some(current) => {
                let entry = state.entry.as_deref().unwrap_or(current);
                engine.resume(state.path.clone(), current, Some(entry))?
            }
            None => {
                let entry = state
                    .entry
                    .as_deref()
                    .unwrap_or_else(|| state.intake.entry_point().node_id());
                debug!("apply: no saved position, starting at {}", entry);
                engine.start(entry, &restored)?
            }
        }
        engine.set_graphics(state.intake.graphics_profile());

        *checklist = restored;
        *intake = state.intake.clone();
        debug!(
            "apply: current={:?} history={} checklist={}",
            engine.current_id(),
            engine.history().len(),
            checklist.len()
        );
        Ok(())
    }

    /// Decode `input` and apply it.
    pub fn import(
        &self,
        input: &str,
        engine: &mut TraversalEngine,
        checklist: &mut ChecklistStore,
        intake: &mut IntakeAnswers,
        replace_checklist: bool,
    ) -> ApplicationResult<SessionState> {
        let state = self.decode(input)?;
        self.apply(&state, engine, checklist, intake, replace_checklist)?;
        Ok(state)
    }
}
