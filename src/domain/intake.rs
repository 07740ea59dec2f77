//! Intake questionnaire and the routing table that picks the tree entry node.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::error::{DomainError, DomainResult};

/// How the system got into its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemHistory {
    NewBuild,
    HardwareChange,
    WasWorking,
}

impl SystemHistory {
    pub const ALL: [SystemHistory; 3] = [
        SystemHistory::NewBuild,
        SystemHistory::HardwareChange,
        SystemHistory::WasWorking,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SystemHistory::NewBuild => "New build (never worked)",
            SystemHistory::HardwareChange => "Recent hardware change",
            SystemHistory::WasWorking => "Was working, now isn't",
        }
    }
}

/// Component swapped during a recent hardware change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HardwareChange {
    #[serde(rename = "CPU/Motherboard")]
    CpuMotherboard,
    #[serde(rename = "RAM")]
    Ram,
    #[serde(rename = "GPU")]
    Gpu,
    #[serde(rename = "PSU")]
    Psu,
    Storage,
}

impl HardwareChange {
    pub const ALL: [HardwareChange; 5] = [
        HardwareChange::CpuMotherboard,
        HardwareChange::Ram,
        HardwareChange::Gpu,
        HardwareChange::Psu,
        HardwareChange::Storage,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            HardwareChange::CpuMotherboard => "CPU/Motherboard",
            HardwareChange::Ram => "RAM",
            HardwareChange::Gpu => "GPU",
            HardwareChange::Psu => "PSU",
            HardwareChange::Storage => "Storage",
        }
    }
}

/// What happens when the power button is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symptom {
    NoPower,
    InstantShutdown,
    PowerCycles,
    FansNoDisplay,
    BootsDisplay,
    FansMax,
    BeepCodes,
}

impl Symptom {
    pub const ALL: [Symptom; 7] = [
        Symptom::NoPower,
        Symptom::InstantShutdown,
        Symptom::PowerCycles,
        Symptom::FansNoDisplay,
        Symptom::BootsDisplay,
        Symptom::FansMax,
        Symptom::BeepCodes,
    ];

    /// Serialized tag, e.g. `no_power`.
    pub fn tag(&self) -> &'static str {
        match self {
            Symptom::NoPower => "no_power",
            Symptom::InstantShutdown => "instant_shutdown",
            Symptom::PowerCycles => "power_cycles",
            Symptom::FansNoDisplay => "fans_no_display",
            Symptom::BootsDisplay => "boots_display",
            Symptom::FansMax => "fans_max",
            Symptom::BeepCodes => "beep_codes",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Symptom::NoPower => "No power at all (no fans, LEDs, or sounds)",
            Symptom::InstantShutdown => "Powers on, then instant shutdown (less than 1 second)",
            Symptom::PowerCycles => "Powers on, then cycles/reboots repeatedly (3-5+ seconds)",
            Symptom::FansNoDisplay => "Fans spin / LEDs on, but no display",
            Symptom::BootsDisplay => "Boots successfully and shows display",
            Symptom::FansMax => "Fans spin to max immediately",
            Symptom::BeepCodes => "Beep codes heard",
        }
    }
}

/// Diagnostic hardware on the motherboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugFeature {
    None,
    Beep,
    Leds,
    Codes,
}

impl DebugFeature {
    pub const ALL: [DebugFeature; 4] = [
        DebugFeature::None,
        DebugFeature::Beep,
        DebugFeature::Leds,
        DebugFeature::Codes,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            DebugFeature::None => "none",
            DebugFeature::Beep => "beep",
            DebugFeature::Leds => "leds",
            DebugFeature::Codes => "codes",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DebugFeature::None => "None",
            DebugFeature::Beep => "Beep Speaker",
            DebugFeature::Leds => "Debug LEDs (CPU, DRAM, VGA, BOOT)",
            DebugFeature::Codes => "Debug Code Display (hex codes)",
        }
    }
}

/// Graphics hardware present; also the tag of an option's `requiresGPU`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphicsKind {
    Dedicated,
    Integrated,
}

impl GraphicsKind {
    pub const ALL: [GraphicsKind; 2] = [GraphicsKind::Dedicated, GraphicsKind::Integrated];

    pub fn tag(&self) -> &'static str {
        match self {
            GraphicsKind::Dedicated => "dedicated",
            GraphicsKind::Integrated => "integrated",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GraphicsKind::Dedicated => "Dedicated GPU (graphics card)",
            GraphicsKind::Integrated => "Integrated graphics (CPU/iGPU/APU)",
        }
    }
}

/// Graphics present on the system. Empty means "unknown", which disables
/// option filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphicsProfile(BTreeSet<GraphicsKind>);

impl GraphicsProfile {
    pub fn new(kinds: impl IntoIterator<Item = GraphicsKind>) -> Self {
        Self(kinds.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, kind: GraphicsKind) -> bool {
        self.0.contains(&kind)
    }

    /// Whether an option tagged with `requirement` is visible.
    pub fn permits(&self, requirement: Option<GraphicsKind>) -> bool {
        match requirement {
            Some(kind) if !self.is_empty() => self.has(kind),
            _ => true,
        }
    }
}

/// Answers collected by the intake questionnaire.
///
/// Field names and value tags match the resume-code format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntakeAnswers {
    pub history: Option<SystemHistory>,
    pub hardware_changed: Vec<HardwareChange>,
    pub symptoms: Vec<Symptom>,
    pub debug: Option<DebugFeature>,
    pub graphics: Vec<GraphicsKind>,
    pub checklist: Vec<String>,
}

impl IntakeAnswers {
    pub fn graphics_profile(&self) -> GraphicsProfile {
        GraphicsProfile::new(self.graphics.iter().copied())
    }

    /// Routing entry for these answers.
    pub fn entry_point(&self) -> EntryPoint {
        classify(&self.symptoms, self.history, self.debug)
    }
}

/// Tree entry nodes selectable by the routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    NoPower,
    InstantShutdownNewBuild,
    InstantShutdown,
    PowerCycles,
    FansMax,
    BeepCodes,
    DebugLeds,
    DebugCodes,
    NoDisplayNewBuild,
    NoDisplayNoDebug,
    BootSuccess,
}

impl EntryPoint {
    pub const ALL: [EntryPoint; 11] = [
        EntryPoint::NoPower,
        EntryPoint::InstantShutdownNewBuild,
        EntryPoint::InstantShutdown,
        EntryPoint::PowerCycles,
        EntryPoint::FansMax,
        EntryPoint::BeepCodes,
        EntryPoint::DebugLeds,
        EntryPoint::DebugCodes,
        EntryPoint::NoDisplayNewBuild,
        EntryPoint::NoDisplayNoDebug,
        EntryPoint::BootSuccess,
    ];

    /// Fallback when no symptom matches.
    pub const DEFAULT: EntryPoint = EntryPoint::NoPower;

    pub fn node_id(&self) -> &'static str {
        match self {
            EntryPoint::NoPower => "no_power_root",
            EntryPoint::InstantShutdownNewBuild => "instant_shutdown_new_build",
            EntryPoint::InstantShutdown => "instant_shutdown_root",
            EntryPoint::PowerCycles => "power_cycles_root",
            EntryPoint::FansMax => "fans_max_root",
            EntryPoint::BeepCodes => "beep_root",
            EntryPoint::DebugLeds => "led_root",
            EntryPoint::DebugCodes => "code_root",
            EntryPoint::NoDisplayNewBuild => "no_display_new_build",
            EntryPoint::NoDisplayNoDebug => "no_display_no_debug",
            EntryPoint::BootSuccess => "boot_success",
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.node_id())
    }
}

/// Route intake answers to a tree entry node.
///
/// Symptoms are checked in priority order; the debug feature and build
/// history only break ties inside the instant-shutdown and no-display
/// branches.
pub fn classify(
    symptoms: &[Symptom],
    history: Option<SystemHistory>,
    debug: Option<DebugFeature>,
) -> EntryPoint {
    let has = |symptom: Symptom| symptoms.contains(&symptom);
    let new_build = history == Some(SystemHistory::NewBuild);

    let entry = if has(Symptom::NoPower) {
        EntryPoint::NoPower
    } else if has(Symptom::InstantShutdown) {
        if new_build {
            EntryPoint::InstantShutdownNewBuild
        } else {
            EntryPoint::InstantShutdown
        }
    } else if has(Symptom::PowerCycles) {
        EntryPoint::PowerCycles
    } else if has(Symptom::FansMax) {
        EntryPoint::FansMax
    } else if has(Symptom::FansNoDisplay) {
        match debug {
            Some(DebugFeature::Beep) => EntryPoint::BeepCodes,
            Some(DebugFeature::Leds) => EntryPoint::DebugLeds,
            Some(DebugFeature::Codes) => EntryPoint::DebugCodes,
            Some(DebugFeature::None) | None if new_build => EntryPoint::NoDisplayNewBuild,
            Some(DebugFeature::None) | None => EntryPoint::NoDisplayNoDebug,
        }
    } else if has(Symptom::BootsDisplay) {
        EntryPoint::BootSuccess
    } else {
        EntryPoint::DEFAULT
    };
    debug!("classify: {:?} -> {}", symptoms, entry);
    entry
}

/// Intake steps in the fixed order they are asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntakeStep {
    History,
    Symptoms,
    DebugFeatures,
    Graphics,
    PriorChecklist,
}

impl IntakeStep {
    pub const ORDER: [IntakeStep; 5] = [
        IntakeStep::History,
        IntakeStep::Symptoms,
        IntakeStep::DebugFeatures,
        IntakeStep::Graphics,
        IntakeStep::PriorChecklist,
    ];

    fn position(&self) -> usize {
        Self::ORDER.iter().position(|s| s == self).unwrap_or(0)
    }

    pub fn next(&self) -> Option<IntakeStep> {
        Self::ORDER.get(self.position() + 1).copied()
    }

    pub fn previous(&self) -> Option<IntakeStep> {
        self.position()
            .checked_sub(1)
            .and_then(|i| Self::ORDER.get(i).copied())
    }

    pub fn title(&self) -> &'static str {
        match self {
            IntakeStep::History => "System History",
            IntakeStep::Symptoms => "System Symptoms",
            IntakeStep::DebugFeatures => "Debug Features",
            IntakeStep::Graphics => "Graphics Setup",
            IntakeStep::PriorChecklist => "Diagnostic Steps Already Tried",
        }
    }
}

impl fmt::Display for IntakeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Answer submitted for one intake step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAnswer {
    History {
        history: Option<SystemHistory>,
        hardware_changed: Vec<HardwareChange>,
    },
    Symptoms(Vec<Symptom>),
    DebugFeatures(Option<DebugFeature>),
    Graphics(Vec<GraphicsKind>),
    PriorChecklist(Vec<String>),
}

impl StepAnswer {
    fn step(&self) -> IntakeStep {
        match self {
            StepAnswer::History { .. } => IntakeStep::History,
            StepAnswer::Symptoms(_) => IntakeStep::Symptoms,
            StepAnswer::DebugFeatures(_) => IntakeStep::DebugFeatures,
            StepAnswer::Graphics(_) => IntakeStep::Graphics,
            StepAnswer::PriorChecklist(_) => IntakeStep::PriorChecklist,
        }
    }
}

/// Result of submitting a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Next(IntakeStep),
    Complete(IntakeAnswers),
}

/// Step-by-step intake state machine.
#[derive(Debug, Clone)]
pub struct IntakeWizard {
    step: IntakeStep,
    answers: IntakeAnswers,
}

impl Default for IntakeWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl IntakeWizard {
    pub fn new() -> Self {
        Self {
            step: IntakeStep::History,
            answers: IntakeAnswers::default(),
        }
    }

    pub fn step(&self) -> IntakeStep {
        self.step
    }

    /// Answers recorded so far (used to pre-fill prompts after going back).
    pub fn answers(&self) -> &IntakeAnswers {
        &self.answers
    }

    /// Validate and record the answer for the current step, then advance.
    ///
    /// A missing required answer, or an answer for a different step, fails
    /// with `Validation` and leaves the wizard untouched.
    pub fn submit(&mut self, answer: StepAnswer) -> DomainResult<Advance> {
        if answer.step() != self.step {
            return Err(self.invalid(format!("expected an answer for {}", self.step)));
        }
        match answer {
            StepAnswer::History {
                history,
                hardware_changed,
            } => {
                let history = history.ok_or_else(|| self.invalid("select an option"))?;
                self.answers.history = Some(history);
                self.answers.hardware_changed = if history == SystemHistory::HardwareChange {
                    hardware_changed
                } else {
                    Vec::new()
                };
            }
            StepAnswer::Symptoms(symptoms) => {
                if symptoms.is_empty() {
                    return Err(self.invalid("select at least one symptom"));
                }
                self.answers.symptoms = symptoms;
            }
            StepAnswer::DebugFeatures(debug) => {
                let debug = debug.ok_or_else(|| self.invalid("select a debug feature option"))?;
                self.answers.debug = Some(debug);
            }
            StepAnswer::Graphics(graphics) => {
                if graphics.is_empty() {
                    return Err(self.invalid("select at least one graphics option"));
                }
                self.answers.graphics = graphics;
            }
            StepAnswer::PriorChecklist(ids) => {
                self.answers.checklist = ids;
                debug!("intake complete: {:?}", self.answers);
                return Ok(Advance::Complete(self.answers.clone()));
            }
        }
        match self.step.next() {
            Some(next) => {
                self.step = next;
                Ok(Advance::Next(next))
            }
            None => Ok(Advance::Complete(self.answers.clone())),
        }
    }

    /// Go back one step; stays on the first step. Never validates.
    pub fn back(&mut self) -> IntakeStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    fn invalid(&self, message: impl Into<String>) -> DomainError {
        DomainError::Validation {
            step: self.step,
            message: message.into(),
        }
    }
}
