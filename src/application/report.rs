//! Plain-text diagnostic report
//!
//! The report ends with the resume code after the marker line, so a pasted
//! report can be imported directly.

use std::fmt::Write as _;

use chrono::{DateTime, Local};

use crate::domain::checklist::find_step;
use crate::domain::session::RESUME_CODE_MARKER;
use crate::domain::SessionState;

pub const REPORT_HEADER: &str = "=== POST DIAGNOSTIC REPORT ===";

const RESUME_HINT: &str =
    "To resume this diagnostic session, run `postwiz resume` and paste this code.";

/// File name for a report generated at `at`.
pub fn report_file_name(at: &DateTime<Local>) -> String {
    format!("POST-diagnostic-{}.txt", at.timestamp_millis())
}

/// Render the report for `state` with its resume `code`.
pub fn render(state: &SessionState, code: &str, generated: &DateTime<Local>) -> String {
    let intake = &state.intake;
    let mut out = String::new();

    // writeln! into a String cannot fail
    let _ = writeln!(out, "{REPORT_HEADER}");
    let _ = writeln!(out, "Generated: {}\n", generated.format("%Y-%m-%d %H:%M:%S"));

    let _ = writeln!(out, "SYSTEM INFO:");
    let history = intake.history.map_or("(not answered)", |h| h.label());
    let _ = writeln!(out, "- History: {history}");
    if !intake.hardware_changed.is_empty() {
        let changed: Vec<&str> = intake.hardware_changed.iter().map(|h| h.label()).collect();
        let _ = writeln!(out, "- Hardware Changed: {}", changed.join(", "));
    }

    let _ = writeln!(out, "\nSYMPTOMS:");
    for symptom in &intake.symptoms {
        let _ = writeln!(out, "- {}", symptom.tag().replace('_', " "));
    }

    let debug = intake.debug.map_or("(not answered)", |d| d.tag());
    let _ = writeln!(out, "\nDEBUG FEATURES:\n- {debug}");

    let _ = writeln!(out, "\nGRAPHICS:");
    for kind in &intake.graphics {
        let _ = writeln!(out, "- {}", kind.tag());
    }

    let _ = writeln!(out, "\nSTEPS COMPLETED ({}):", state.checklist.len());
    if state.checklist.is_empty() {
        let _ = writeln!(out, "(none)");
    }
    for step in state.checklist.iter().filter_map(|id| find_step(id)) {
        let _ = writeln!(out, "✓ {}", step.text);
    }

    let current = state.current.as_deref().unwrap_or("(not started)");
    let _ = writeln!(out, "\nDIAGNOSTIC PATH ({} steps):", state.path.len() + 1);
    if state.path.is_empty() {
        let _ = writeln!(out, "1. Started at: {current}");
    } else {
        for (i, id) in state.path.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, id);
        }
        let _ = writeln!(out, "→ Currently at: {current}");
    }

    let _ = writeln!(out, "\n{RESUME_CODE_MARKER}");
    let _ = write!(out, "{code}\n\n{RESUME_HINT}");
    out
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::domain::{
        DebugFeature, GraphicsKind, HardwareChange, IntakeAnswers, Symptom, SystemHistory,
    };

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
    }

    fn state() -> SessionState {
        SessionState {
            intake: IntakeAnswers {
                history: Some(SystemHistory::HardwareChange),
                hardware_changed: vec![HardwareChange::Ram, HardwareChange::Gpu],
                symptoms: vec![Symptom::FansNoDisplay],
                debug: Some(DebugFeature::Leds),
                graphics: vec![GraphicsKind::Dedicated],
                checklist: vec![],
            },
            checklist: vec!["ram_reseat".into(), "not_in_catalog".into()],
            path: vec!["led_root".into(), "memory_check".into()],
            current: Some("memory_single".into()),
            entry: Some("led_root".into()),
        }
    }

    #[test]
    fn given_session_when_rendering_then_contains_all_sections() {
        let report = render(&state(), "CODE123", &at());

        assert!(report.starts_with(REPORT_HEADER));
        assert!(report.contains("Generated: 2024-03-01 12:30:00"));
        assert!(report.contains("- History: Recent hardware change"));
        assert!(report.contains("- Hardware Changed: RAM, GPU"));
        assert!(report.contains("- fans no display"));
        assert!(report.contains("DEBUG FEATURES:\n- leds"));
        assert!(report.contains("GRAPHICS:\n- dedicated"));
        assert!(report.contains("STEPS COMPLETED (2):"));
        assert!(report.contains("DIAGNOSTIC PATH (3 steps):\n1. led_root\n2. memory_check\n→ Currently at: memory_single"));
        assert!(report.contains(&format!("{RESUME_CODE_MARKER}\nCODE123\n")));
    }

    #[test]
    fn given_unknown_checklist_id_when_rendering_then_only_catalog_steps_listed() {
        let report = render(&state(), "C", &at());
        assert_eq!(report.matches('✓').count(), 1);
    }

    #[test]
    fn given_empty_path_when_rendering_then_started_at_line() {
        let mut state = state();
        state.path.clear();
        state.checklist.clear();
        let report = render(&state, "C", &at());

        assert!(report.contains("STEPS COMPLETED (0):\n(none)"));
        assert!(report.contains("DIAGNOSTIC PATH (1 steps):\n1. Started at: memory_single"));
    }

    #[test]
    fn given_timestamp_when_naming_report_then_uses_epoch_millis() {
        let name = report_file_name(&at());
        assert_eq!(name, format!("POST-diagnostic-{}.txt", at().timestamp_millis()));
    }
}
