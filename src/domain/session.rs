//! Portable session snapshots and their resume-code encoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::intake::IntakeAnswers;

/// Marker line preceding the resume code in an exported report.
pub const RESUME_CODE_MARKER: &str = "=== RESUME CODE ===";

/// Everything needed to resume a diagnosis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub intake: IntakeAnswers,
    /// Checklist ids done at export time.
    pub checklist: Vec<String>,
    /// Visited node ids, oldest first.
    pub path: Vec<String>,
    /// Node on screen at export time; absent when exported before the
    /// diagnosis started.
    pub current: Option<String>,
    /// Restart point of the exported session. Codes from the browser tool
    /// omit it; `current` is the restart point then.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
}

impl SessionState {
    /// Encode as a resume code: base64 of the JSON record.
    pub fn encode(&self) -> DomainResult<String> {
        let json =
            serde_json::to_string(self).map_err(|e| DomainError::Encode(e.to_string()))?;
        Ok(STANDARD.encode(json))
    }

    /// Decode a resume code. Accepts either the bare code or a full pasted
    /// report containing one.
    pub fn decode(input: &str) -> DomainResult<Self> {
        let code = extract_code(input).ok_or_else(|| DomainError::Decode("empty code".into()))?;
        let bytes = STANDARD
            .decode(code)
            .map_err(|e| DomainError::Decode(format!("not base64: {e}")))?;
        serde_json::from_slice(&bytes).map_err(|e| DomainError::Decode(format!("bad record: {e}")))
    }
}

/// Pull the resume code out of `input`.
///
/// When the report marker is present the first non-empty line after it is
/// the code; otherwise all whitespace is stripped from the input.
pub fn extract_code(input: &str) -> Option<String> {
    let code = match input.split_once(RESUME_CODE_MARKER) {
        Some((_, rest)) => rest
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string(),
        None => input.split_whitespace().collect(),
    };
    (!code.is_empty()).then_some(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::intake::{DebugFeature, GraphicsKind, Symptom, SystemHistory};

    fn sample() -> SessionState {
        SessionState {
            intake: IntakeAnswers {
                history: Some(SystemHistory::NewBuild),
                symptoms: vec![Symptom::FansNoDisplay],
                debug: Some(DebugFeature::Codes),
                graphics: vec![GraphicsKind::Integrated],
                ..IntakeAnswers::default()
            },
            checklist: vec!["ram_reseat".into()],
            path: vec!["code_root".into()],
            current: Some("memory_check".into()),
            entry: Some("code_root".into()),
        }
    }

    #[test]
    fn given_code_wrapped_in_whitespace_when_decoding_then_ignores_it() {
        let code = sample().encode().unwrap();
        let padded = format!("\n  {}  \n", code);
        assert_eq!(SessionState::decode(&padded).unwrap(), sample());
    }

    #[test]
    fn given_full_report_when_decoding_then_finds_code_after_marker() {
        let code = sample().encode().unwrap();
        let report = format!("=== POST DIAGNOSTIC REPORT ===\n...\n\n{RESUME_CODE_MARKER}\n{code}\n\nTo resume...");
        assert_eq!(SessionState::decode(&report).unwrap(), sample());
    }

    #[test]
    fn given_browser_generated_code_when_decoding_then_accepts_null_current() {
        // btoa(JSON.stringify({...})) as produced before the diagnosis started
        let json = r#"{"intake":{"history":"was_working","hardwareChanged":[],"symptoms":["no_power"],"debug":"none","graphics":["dedicated"],"checklist":[]},"checklist":[],"path":[],"current":null}"#;
        let code = STANDARD.encode(json);

        let state = SessionState::decode(&code).unwrap();
        assert_eq!(state.current, None);
        assert_eq!(state.entry, None);
        assert_eq!(state.intake.symptoms, vec![Symptom::NoPower]);
    }

    #[test]
    fn given_garbage_when_decoding_then_decode_error() {
        assert!(matches!(SessionState::decode("%%%"), Err(DomainError::Decode(_))));
        let not_a_session = STANDARD.encode("[1,2,3]");
        assert!(matches!(
            SessionState::decode(&not_a_session),
            Err(DomainError::Decode(_))
        ));
        assert!(matches!(SessionState::decode("   "), Err(DomainError::Decode(_))));
    }
}
