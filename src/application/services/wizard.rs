//! Interactive wizard: intake questionnaire and diagnosis loop
//!
//! All user interaction goes through the `Prompter`, all output through the
//! `Renderer`. The engine is only touched through its public transitions.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::application::error_ext::prompt_err;
use crate::application::services::{SessionService, TreeService};
use crate::application::ApplicationResult;
use crate::domain::checklist::Checklist;
use crate::domain::{
    Advance, ChecklistStore, DebugFeature, GraphicsKind, HardwareChange, IntakeAnswers,
    IntakeStep, IntakeWizard, StepAnswer, Symptom, SystemHistory, TraversalEngine, CATALOG,
};
use crate::infrastructure::traits::{Prompter, Renderer, SelectionItem};

/// Live diagnosis state owned by the caller.
#[derive(Debug, Clone, Default)]
pub struct DiagnosisSession {
    pub engine: TraversalEngine,
    pub checklist: ChecklistStore,
    pub intake: IntakeAnswers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Choose(String),
    Back,
    Restart,
    Checklist,
    ResetChecklist,
    Export,
    Quit,
}

/// Service driving the interactive wizard.
pub struct WizardService {
    trees: TreeService,
    sessions: SessionService,
    prompter: Arc<dyn Prompter>,
    renderer: Arc<dyn Renderer>,
}

impl WizardService {
    pub fn new(
        trees: TreeService,
        sessions: SessionService,
        prompter: Arc<dyn Prompter>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            trees,
            sessions,
            prompter,
            renderer,
        }
    }

    /// Start a new diagnosis.
    ///
    /// Without `entry` the intake questionnaire runs first and its answers
    /// pick the entry node. Returns `None` when the user quits the intake.
    #[instrument(level = "debug", skip(self))]
    pub fn start(
        &self,
        tree: Option<&Path>,
        entry: Option<&str>,
    ) -> ApplicationResult<Option<DiagnosisSession>> {
        let mut session = DiagnosisSession::default();
        // read the tree first so a broken tree fails before the questionnaire
        self.trees
            .load_into(&mut session.engine, tree, None, &session.checklist)?;

        let entry = match entry {
            Some(entry) => entry.to_string(),
            None => match self.run_intake(&mut session.checklist)? {
                Some(answers) => {
                    session.intake = answers;
                    session.intake.entry_point().node_id().to_string()
                }
                None => return Ok(None),
            },
        };
        debug!("start: entry={}", entry);

        session
            .engine
            .set_graphics(session.intake.graphics_profile());
        session.engine.start(&entry, &session.checklist)?;
        Ok(Some(session))
    }

    /// Load the tree and restore a session from a resume code or report.
    #[instrument(level = "debug", skip(self, input))]
    pub fn resume(
        &self,
        tree: Option<&Path>,
        input: &str,
        replace_checklist: bool,
    ) -> ApplicationResult<DiagnosisSession> {
        let mut session = DiagnosisSession::default();
        self.trees
            .load_into(&mut session.engine, tree, None, &session.checklist)?;
        self.sessions.import(
            input,
            &mut session.engine,
            &mut session.checklist,
            &mut session.intake,
            replace_checklist,
        )?;
        Ok(session)
    }

    /// Run the intake questionnaire.
    ///
    /// Esc goes back one step; on the first step it offers to quit. Missing
    /// answers are reported and the step is asked again. On completion the
    /// prior-checklist selection is applied to `checklist`.
    pub fn run_intake(
        &self,
        checklist: &mut ChecklistStore,
    ) -> ApplicationResult<Option<IntakeAnswers>> {
        let mut wizard = IntakeWizard::new();
        loop {
            let step = wizard.step();
            let Some(answer) = self.prompt_step(&wizard, checklist)? else {
                if step == IntakeStep::History {
                    if self
                        .prompter
                        .confirm("Quit the wizard?", false)
                        .map_err(prompt_err)?
                    {
                        return Ok(None);
                    }
                } else {
                    wizard.back();
                }
                continue;
            };

            match wizard.submit(answer) {
                Ok(Advance::Next(next)) => debug!("run_intake: {} -> {}", step, next),
                Ok(Advance::Complete(answers)) => {
                    for item in CATALOG {
                        checklist.set_done(item.id, answers.checklist.iter().any(|id| id == item.id));
                    }
                    return Ok(Some(answers));
                }
                Err(e) if e.is_recoverable() => self.renderer.display_notice(&e.to_string()),
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn prompt_step(
        &self,
        wizard: &IntakeWizard,
        checklist: &ChecklistStore,
    ) -> ApplicationResult<Option<StepAnswer>> {
        let answers = wizard.answers();
        let title = wizard.step().title();
        let answer = match wizard.step() {
            IntakeStep::History => {
                let items: Vec<SelectionItem> = SystemHistory::ALL
                    .iter()
                    .map(|h| SelectionItem::new(h.label(), format!("{h:?}")))
                    .collect();
                let default = answers
                    .history
                    .and_then(|h| SystemHistory::ALL.iter().position(|x| *x == h))
                    .unwrap_or(0);
                let Some(index) = self.ask_one(title, &items, default)? else {
                    return Ok(None);
                };
                let history = SystemHistory::ALL.get(index).copied();
                let hardware_changed = if history == Some(SystemHistory::HardwareChange) {
                    self.ask_hardware(&answers.hardware_changed)?
                } else {
                    Vec::new()
                };
                StepAnswer::History {
                    history,
                    hardware_changed,
                }
            }
            IntakeStep::Symptoms => {
                let items: Vec<SelectionItem> = Symptom::ALL
                    .iter()
                    .map(|s| SelectionItem::new(s.label(), s.tag()))
                    .collect();
                let checked: Vec<bool> = Symptom::ALL
                    .iter()
                    .map(|s| answers.symptoms.contains(s))
                    .collect();
                let Some(picked) = self.ask_many(title, &items, &checked)? else {
                    return Ok(None);
                };
                StepAnswer::Symptoms(pick(&Symptom::ALL, &picked))
            }
            IntakeStep::DebugFeatures => {
                let items: Vec<SelectionItem> = DebugFeature::ALL
                    .iter()
                    .map(|d| SelectionItem::new(d.label(), d.tag()))
                    .collect();
                let default = answers
                    .debug
                    .and_then(|d| DebugFeature::ALL.iter().position(|x| *x == d))
                    .unwrap_or(0);
                let Some(index) = self.ask_one(title, &items, default)? else {
                    return Ok(None);
                };
                StepAnswer::DebugFeatures(DebugFeature::ALL.get(index).copied())
            }
            IntakeStep::Graphics => {
                let items: Vec<SelectionItem> = GraphicsKind::ALL
                    .iter()
                    .map(|g| SelectionItem::new(g.label(), g.tag()))
                    .collect();
                let checked: Vec<bool> = GraphicsKind::ALL
                    .iter()
                    .map(|g| answers.graphics.contains(g))
                    .collect();
                let Some(picked) = self.ask_many(title, &items, &checked)? else {
                    return Ok(None);
                };
                StepAnswer::Graphics(pick(&GraphicsKind::ALL, &picked))
            }
            IntakeStep::PriorChecklist => {
                let Some(ids) = self.ask_checklist(title, checklist)? else {
                    return Ok(None);
                };
                StepAnswer::PriorChecklist(ids)
            }
        };
        Ok(Some(answer))
    }

    fn ask_hardware(&self, previous: &[HardwareChange]) -> ApplicationResult<Vec<HardwareChange>> {
        let items: Vec<SelectionItem> = HardwareChange::ALL
            .iter()
            .map(|h| SelectionItem::new(h.label(), h.label()))
            .collect();
        let checked: Vec<bool> = HardwareChange::ALL
            .iter()
            .map(|h| previous.contains(h))
            .collect();
        let picked = self
            .ask_many("What hardware was changed?", &items, &checked)?
            .unwrap_or_default();
        Ok(pick(&HardwareChange::ALL, &picked))
    }

    /// Catalog multi-select pre-checked from `checklist`; returns the
    /// selected ids in catalog order.
    fn ask_checklist(
        &self,
        prompt: &str,
        checklist: &ChecklistStore,
    ) -> ApplicationResult<Option<Vec<String>>> {
        let items: Vec<SelectionItem> = CATALOG
            .iter()
            .map(|s| SelectionItem::new(format!("[{}] {}", s.category, s.text), s.id))
            .collect();
        let checked: Vec<bool> = CATALOG.iter().map(|s| checklist.is_done(s.id)).collect();
        Ok(self.ask_many(prompt, &items, &checked)?.map(|picked| {
            CATALOG
                .iter()
                .enumerate()
                .filter(|(i, _)| picked.contains(i))
                .map(|(_, s)| s.id.to_string())
                .collect()
        }))
    }

    fn ask_one(
        &self,
        prompt: &str,
        items: &[SelectionItem],
        default: usize,
    ) -> ApplicationResult<Option<usize>> {
        self.prompter
            .select_one(prompt, items, default)
            .map_err(prompt_err)
    }

    fn ask_many(
        &self,
        prompt: &str,
        items: &[SelectionItem],
        checked: &[bool],
    ) -> ApplicationResult<Option<Vec<usize>>> {
        self.prompter
            .select_many(prompt, items, checked)
            .map_err(prompt_err)
    }

    /// Diagnosis loop: render the current node, offer its visible options
    /// plus the navigation controls, apply the choice. Navigation failures
    /// are reported and the previous state is kept.
    pub fn run(&self, session: &mut DiagnosisSession) -> ApplicationResult<()> {
        self.renderer
            .display_checklist(&session.checklist.done_ids());
        loop {
            let (prompt, items, actions) = {
                let engine = &session.engine;
                let node = engine.current_node()?;
                let visible = engine.visible_options(node);
                self.renderer.display_node(node, &visible);
                self.renderer
                    .display_history_controls(engine.can_go_back(), engine.can_restart());
                let prompt = node
                    .question
                    .clone()
                    .unwrap_or_else(|| "What next?".to_string());
                let (items, actions) =
                    menu(&visible, engine.can_go_back(), engine.can_restart());
                (prompt, items, actions)
            };

            let selected = self.ask_one(&prompt, &items, 0)?;
            let action = selected
                .and_then(|i| actions.get(i).cloned())
                .unwrap_or(Action::Quit);
            debug!("run: action={:?}", action);

            let outcome = match action {
                Action::Choose(label) => {
                    let before = session.checklist.len();
                    let result = session.engine.choose(&label, &mut session.checklist);
                    if result.is_ok() && session.checklist.len() != before {
                        self.renderer
                            .display_checklist(&session.checklist.done_ids());
                    }
                    result
                }
                Action::Back => session.engine.back(),
                Action::Restart => session.engine.restart(&session.checklist),
                Action::Checklist => {
                    self.edit_checklist(&mut session.checklist)?;
                    Ok(())
                }
                Action::ResetChecklist => {
                    if self
                        .prompter
                        .confirm("Uncheck every checklist step?", false)
                        .map_err(prompt_err)?
                    {
                        session.checklist.reset();
                        self.renderer
                            .display_checklist(&session.checklist.done_ids());
                    }
                    Ok(())
                }
                Action::Export => {
                    self.export(session);
                    Ok(())
                }
                Action::Quit => {
                    if self
                        .prompter
                        .confirm("Quit the diagnosis?", true)
                        .map_err(prompt_err)?
                    {
                        return Ok(());
                    }
                    Ok(())
                }
            };

            if let Err(e) = outcome {
                warn!("run: {}", e);
                self.renderer.display_notice(&e.to_string());
            }
        }
    }

    /// Checklist panel: explicit toggles, so ids may be cleared here.
    fn edit_checklist(&self, checklist: &mut ChecklistStore) -> ApplicationResult<()> {
        if let Some(ids) = self.ask_checklist("Checklist", checklist)? {
            for item in CATALOG {
                checklist.set_done(item.id, ids.iter().any(|id| id == item.id));
            }
        }
        self.renderer.display_checklist(&checklist.done_ids());
        Ok(())
    }

    fn export(&self, session: &DiagnosisSession) {
        match self
            .sessions
            .export(&session.engine, &session.checklist, &session.intake)
        {
            Ok(bundle) => self
                .renderer
                .display_resume_code(&bundle.code, bundle.saved_to.as_deref()),
            Err(e) => {
                warn!("export: {}", e);
                self.renderer.display_notice(&e.to_string());
            }
        }
    }
}

/// Values at `indices` in `all`, in `all` order; out-of-range indices are ignored.
fn pick<T: Copy>(all: &[T], indices: &[usize]) -> Vec<T> {
    all.iter()
        .enumerate()
        .filter(|(i, _)| indices.contains(i))
        .map(|(_, v)| *v)
        .collect()
}

fn menu(
    visible: &[(&str, &crate::domain::TreeOption)],
    can_go_back: bool,
    can_restart: bool,
) -> (Vec<SelectionItem>, Vec<Action>) {
    let mut items = Vec::new();
    let mut actions = Vec::new();
    for (label, _) in visible {
        items.push(SelectionItem::new(*label, *label));
        actions.push(Action::Choose(label.to_string()));
    }
    let mut control = |display: &str, action: Action| {
        items.push(SelectionItem::new(display, format!("{action:?}")));
        actions.push(action);
    };
    if can_go_back {
        control("⬅ Back", Action::Back);
    }
    if can_restart {
        control("⟳ Restart This Tree", Action::Restart);
    }
    control("☑ Checklist", Action::Checklist);
    control("✗ Reset checklist", Action::ResetChecklist);
    control("⇪ Export session", Action::Export);
    control("✕ Quit", Action::Quit);
    (items, actions)
}
