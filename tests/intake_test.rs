//! Tests for the intake questionnaire and entry routing

use rstest::rstest;

use postwiz::domain::{
    classify, Advance, DebugFeature, DomainError, EntryPoint, GraphicsKind, HardwareChange,
    IntakeStep, IntakeWizard, StepAnswer, Symptom, SystemHistory,
};

// ============================================================
// Routing
// ============================================================

#[rstest]
#[case(vec![Symptom::NoPower], None, None, EntryPoint::NoPower)]
#[case(vec![Symptom::NoPower, Symptom::InstantShutdown, Symptom::BootsDisplay], Some(SystemHistory::NewBuild), Some(DebugFeature::Codes), EntryPoint::NoPower)]
#[case(vec![Symptom::InstantShutdown], Some(SystemHistory::NewBuild), None, EntryPoint::InstantShutdownNewBuild)]
#[case(vec![Symptom::InstantShutdown], Some(SystemHistory::WasWorking), None, EntryPoint::InstantShutdown)]
#[case(vec![Symptom::InstantShutdown, Symptom::PowerCycles], None, None, EntryPoint::InstantShutdown)]
#[case(vec![Symptom::PowerCycles, Symptom::FansMax], None, None, EntryPoint::PowerCycles)]
#[case(vec![Symptom::FansMax, Symptom::FansNoDisplay], None, Some(DebugFeature::Beep), EntryPoint::FansMax)]
#[case(vec![Symptom::FansNoDisplay], None, Some(DebugFeature::Beep), EntryPoint::BeepCodes)]
#[case(vec![Symptom::FansNoDisplay], None, Some(DebugFeature::Leds), EntryPoint::DebugLeds)]
#[case(vec![Symptom::FansNoDisplay], Some(SystemHistory::NewBuild), Some(DebugFeature::Codes), EntryPoint::DebugCodes)]
#[case(vec![Symptom::FansNoDisplay], Some(SystemHistory::NewBuild), Some(DebugFeature::None), EntryPoint::NoDisplayNewBuild)]
#[case(vec![Symptom::FansNoDisplay], Some(SystemHistory::HardwareChange), Some(DebugFeature::None), EntryPoint::NoDisplayNoDebug)]
#[case(vec![Symptom::FansNoDisplay], None, None, EntryPoint::NoDisplayNoDebug)]
#[case(vec![Symptom::BootsDisplay], None, None, EntryPoint::BootSuccess)]
#[case(vec![Symptom::BeepCodes], None, Some(DebugFeature::Beep), EntryPoint::NoPower)]
#[case(vec![], None, None, EntryPoint::NoPower)]
fn given_intake_answers_when_classifying_then_routes_to_entry(
    #[case] symptoms: Vec<Symptom>,
    #[case] history: Option<SystemHistory>,
    #[case] debug: Option<DebugFeature>,
    #[case] expected: EntryPoint,
) {
    assert_eq!(classify(&symptoms, history, debug), expected);
}

#[rstest]
fn given_symptom_order_when_classifying_then_order_does_not_matter() {
    let a = classify(&[Symptom::FansMax, Symptom::PowerCycles], None, None);
    let b = classify(&[Symptom::PowerCycles, Symptom::FansMax], None, None);
    assert_eq!(a, b);
}

// ============================================================
// Wizard
// ============================================================

fn history(history: SystemHistory) -> StepAnswer {
    StepAnswer::History {
        history: Some(history),
        hardware_changed: vec![HardwareChange::Gpu],
    }
}

#[rstest]
fn given_full_answers_when_submitting_then_completes_with_answers() {
    let mut wizard = IntakeWizard::new();

    assert_eq!(
        wizard.submit(history(SystemHistory::HardwareChange)).unwrap(),
        Advance::Next(IntakeStep::Symptoms)
    );
    wizard
        .submit(StepAnswer::Symptoms(vec![Symptom::FansNoDisplay]))
        .unwrap();
    wizard
        .submit(StepAnswer::DebugFeatures(Some(DebugFeature::Leds)))
        .unwrap();
    wizard
        .submit(StepAnswer::Graphics(vec![GraphicsKind::Dedicated]))
        .unwrap();
    let advance = wizard
        .submit(StepAnswer::PriorChecklist(vec!["ram_reseat".into()]))
        .unwrap();

    let Advance::Complete(answers) = advance else {
        panic!("expected completion, got {advance:?}");
    };
    assert_eq!(answers.history, Some(SystemHistory::HardwareChange));
    assert_eq!(answers.hardware_changed, vec![HardwareChange::Gpu]);
    assert_eq!(answers.checklist, vec!["ram_reseat".to_string()]);
    assert_eq!(answers.entry_point(), EntryPoint::DebugLeds);
    assert!(answers.graphics_profile().has(GraphicsKind::Dedicated));
}

#[rstest]
fn given_history_other_than_hardware_change_when_submitting_then_changes_dropped() {
    let mut wizard = IntakeWizard::new();
    wizard.submit(history(SystemHistory::NewBuild)).unwrap();
    assert!(wizard.answers().hardware_changed.is_empty());
}

#[rstest]
#[case::history(IntakeStep::History, StepAnswer::History { history: None, hardware_changed: vec![] })]
#[case::symptoms(IntakeStep::Symptoms, StepAnswer::Symptoms(vec![]))]
#[case::debug(IntakeStep::DebugFeatures, StepAnswer::DebugFeatures(None))]
#[case::graphics(IntakeStep::Graphics, StepAnswer::Graphics(vec![]))]
fn given_missing_required_answer_when_submitting_then_validation_and_step_kept(
    #[case] step: IntakeStep,
    #[case] answer: StepAnswer,
) {
    let mut wizard = wizard_at(step);

    let err = wizard.submit(answer).unwrap_err();

    assert!(matches!(err, DomainError::Validation { step: s, .. } if s == step));
    assert!(err.is_recoverable());
    assert_eq!(wizard.step(), step);
}

#[rstest]
fn given_empty_prior_checklist_when_submitting_then_completes() {
    let mut wizard = wizard_at(IntakeStep::PriorChecklist);
    let advance = wizard.submit(StepAnswer::PriorChecklist(vec![])).unwrap();
    assert!(matches!(advance, Advance::Complete(a) if a.checklist.is_empty()));
}

#[rstest]
fn given_answer_for_other_step_when_submitting_then_validation() {
    let mut wizard = IntakeWizard::new();
    let err = wizard
        .submit(StepAnswer::Symptoms(vec![Symptom::NoPower]))
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));
    assert_eq!(wizard.step(), IntakeStep::History);
}

#[rstest]
fn given_later_step_when_going_back_then_previous_step_without_validation() {
    let mut wizard = wizard_at(IntakeStep::Graphics);

    assert_eq!(wizard.back(), IntakeStep::DebugFeatures);
    assert_eq!(wizard.back(), IntakeStep::Symptoms);
    // recorded answers survive going back
    assert_eq!(wizard.answers().symptoms, vec![Symptom::PowerCycles]);
}

#[rstest]
fn given_first_step_when_going_back_then_stays() {
    let mut wizard = IntakeWizard::new();
    assert_eq!(wizard.back(), IntakeStep::History);
}

/// Drive a wizard with valid answers until it reaches `step`.
fn wizard_at(step: IntakeStep) -> IntakeWizard {
    let mut wizard = IntakeWizard::new();
    let answers = [
        history(SystemHistory::WasWorking),
        StepAnswer::Symptoms(vec![Symptom::PowerCycles]),
        StepAnswer::DebugFeatures(Some(DebugFeature::None)),
        StepAnswer::Graphics(vec![GraphicsKind::Integrated]),
    ];
    for answer in answers {
        if wizard.step() == step {
            break;
        }
        wizard.submit(answer).unwrap();
    }
    assert_eq!(wizard.step(), step);
    wizard
}
