//! Typed model of the structured answer expected for a rule group.
//!
//! The JSON schema sent to the model is generated from these types, so the
//! schema and the deserialized answer cannot drift apart.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of problem found for one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrType {
    /// Present in the document but wrong.
    Invalid,
    /// Required but absent from the document.
    Missing,
}

/// Final decision for one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The rule is violated.
    ErrorPresent,
    /// The rule holds.
    NoError,
}

/// A document fragment the model relied on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RetrievalChunk {
    /// Fragment text, at most about 120 words.
    pub text: String,
    /// First line of the fragment, 1-based.
    #[schemars(range(min = 1))]
    pub line_start: u32,
    /// Last line of the fragment, 1-based.
    #[schemars(range(min = 1))]
    pub line_end: u32,
}

/// Reasoning trail for one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ThoughtProcess {
    /// Fragments retrieved from the document.
    pub retrieval: Vec<RetrievalChunk>,
    /// Analysis of the fragments.
    pub analysis: String,
    /// Self-critique of the analysis.
    pub critique: String,
    /// Final verification step.
    pub verification: String,
}

/// One concrete occurrence of a violated rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorInstance {
    /// Kind of problem.
    pub err_type: ErrType,
    /// Offending text, if there is any.
    #[serde(default)]
    pub snippet: Option<String>,
    /// First line of the snippet, 1-based.
    #[serde(default)]
    #[schemars(range(min = 1))]
    pub line_start: Option<u32>,
    /// Last line of the snippet, 1-based.
    #[serde(default)]
    #[schemars(range(min = 1))]
    pub line_end: Option<u32>,
    /// Proposed correction.
    #[serde(default)]
    pub suggested_fix: Option<String>,
    /// Why this is a violation.
    pub rationale: String,
}

/// Analysis of a single rule within the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorAnalysis {
    /// Rule code.
    pub code: String,
    /// Reasoning trail.
    pub process: ThoughtProcess,
    /// Decision.
    pub verdict: Verdict,
    /// Occurrences; empty when the verdict is `no_error`.
    pub instances: Vec<ErrorInstance>,
}

/// The structured answer for one rule group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GroupReport {
    /// Identifier of the analysed group.
    pub group_id: String,
    /// Free-form notes written before the per-rule analysis.
    pub preliminary_notes: String,
    /// One entry per rule in the group.
    pub errors: Vec<ErrorAnalysis>,
    /// Closing critique of the whole document.
    #[serde(default)]
    pub overall_critique: Option<String>,
}

impl GroupReport {
    /// Codes of every rule judged violated.
    #[must_use]
    pub fn violated_codes(&self) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.verdict == Verdict::ErrorPresent)
            .map(|e| e.code.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_deserializes_model_answer() {
        let report: GroupReport = serde_json::from_value(json!({
            "group_id": "General 1",
            "preliminary_notes": "Short document.",
            "errors": [
                {
                    "code": "E01",
                    "process": {
                        "retrieval": [{"text": "Deadline: TBD", "line_start": 3, "line_end": 3}],
                        "analysis": "No concrete date.",
                        "critique": "None.",
                        "verification": "Checked twice."
                    },
                    "verdict": "error_present",
                    "instances": [{"err_type": "invalid", "snippet": "TBD", "rationale": "Not a date."}]
                },
                {
                    "code": "E02",
                    "process": {"retrieval": [], "analysis": "", "critique": "", "verification": ""},
                    "verdict": "no_error",
                    "instances": []
                }
            ]
        }))
        .unwrap();

        assert_eq!(report.violated_codes(), vec!["E01"]);
        assert_eq!(report.errors[0].instances[0].err_type, ErrType::Invalid);
        assert!(report.overall_critique.is_none());
    }
}
