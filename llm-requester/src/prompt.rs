//! Builds the conversations and schema sent for document checks.
//!
//! Every function here is pure: same input, same messages.

use std::fmt::Write;

use llm_requester_core::{Message, SchemaDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::report::GroupReport;

/// Name under which the group report schema is sent.
pub const GROUP_REPORT_SCHEMA: &str = "GroupReport";

/// A single check the model applies to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Short unique code, e.g. `E01`.
    pub code: String,
    /// Human-readable title.
    pub title: String,
    /// What the rule requires.
    pub description: String,
    /// How a violation is recognised.
    pub detector: String,
}

/// A set of rules checked together in one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group identifier echoed back in the report.
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Group-specific instructions placed before the rule list.
    pub system_prompt: String,
    /// Codes of the rules in this group, in presentation order.
    pub codes: Vec<String>,
}

fn document_message(document: &str) -> Message {
    Message::user(format!("<DOCUMENT>{document}</DOCUMENT>"))
}

/// Conversation checking one rule against a document.
#[must_use]
pub fn build_rule_messages(document: &str, rule: &Rule, system_prompt: &str) -> Vec<Message> {
    vec![
        Message::system(system_prompt),
        document_message(document),
        Message::user(format!(
            "Rule code: {}\nRule title: {}\nRule description: {}\nDetection method: {}",
            rule.code, rule.title, rule.description, rule.detector
        )),
    ]
}

/// Conversation checking every rule of a group against a document.
///
/// Rules are listed in the order of `group.codes`; codes with no matching
/// entry in `rules` are skipped.
#[must_use]
pub fn build_group_messages(
    document: &str,
    group: &Group,
    rules: &[Rule],
    system_prompt: &str,
) -> Vec<Message> {
    let mut body = String::new();
    let _ = write!(body, "Group {}", group.id);
    if !group.name.is_empty() {
        let _ = write!(body, " ({})", group.name);
    }
    let _ = write!(body, "\n{}\n", group.system_prompt);

    for code in &group.codes {
        let Some(rule) = rules.iter().find(|r| &r.code == code) else {
            continue;
        };
        let _ = write!(
            body,
            "\nCode: {}\nTitle: {}\nDescription: {}\nDetector: {}\n",
            rule.code, rule.title, rule.description, rule.detector
        );
    }
    body.push_str(
        "\nReturn exactly one JSON object with the fields group_id, preliminary_notes, \
         errors and overall_critique. Do not include the schema or any explanation.",
    );

    vec![
        Message::system(system_prompt),
        document_message(document),
        Message::user(body),
    ]
}

/// Schema descriptor for [`GroupReport`] answers.
#[must_use]
pub fn group_report_schema() -> SchemaDescriptor {
    SchemaDescriptor::new(GROUP_REPORT_SCHEMA, json!(schemars::schema_for!(GroupReport)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_requester_core::Role;

    fn rule(code: &str) -> Rule {
        Rule {
            code: code.to_string(),
            title: format!("Title {code}"),
            description: "The deadline must be a date.".to_string(),
            detector: "Look for the word deadline.".to_string(),
        }
    }

    #[test]
    fn test_rule_messages_layout() {
        let messages = build_rule_messages("Deadline: TBD", &rule("E01"), "You are an auditor.");

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "You are an auditor.");
        assert_eq!(messages[1].content, "<DOCUMENT>Deadline: TBD</DOCUMENT>");
        assert!(messages[2].content.contains("Rule code: E01"));
        assert!(messages[2].content.contains("Detection method: Look for the word deadline."));
    }

    #[test]
    fn test_group_messages_follow_code_order() {
        let group = Group {
            id: "General 1".to_string(),
            name: "Dates".to_string(),
            system_prompt: "Check every date.".to_string(),
            codes: vec!["E02".to_string(), "E99".to_string(), "E01".to_string()],
        };
        let rules = vec![rule("E01"), rule("E02")];

        let messages = build_group_messages("doc", &group, &rules, "sys");
        let body = &messages[2].content;

        assert!(body.starts_with("Group General 1 (Dates)\nCheck every date.\n"));
        let e02 = body.find("Code: E02").unwrap();
        let e01 = body.find("Code: E01").unwrap();
        assert!(e02 < e01);
        assert!(!body.contains("E99"));
        assert!(body.ends_with("Do not include the schema or any explanation."));
    }

    #[test]
    fn test_builders_are_deterministic() {
        let a = build_rule_messages("d", &rule("E01"), "s");
        let b = build_rule_messages("d", &rule("E01"), "s");
        assert_eq!(a, b);
    }

    #[test]
    fn test_group_report_schema_lists_required_fields() {
        let descriptor = group_report_schema();
        assert_eq!(descriptor.name, "GroupReport");

        let required = descriptor.schema["required"].as_array().unwrap();
        for field in ["group_id", "preliminary_notes", "errors"] {
            assert!(required.iter().any(|v| v == field), "missing {field}");
        }
        assert!(!required.iter().any(|v| v == "overall_critique"));
    }
}
