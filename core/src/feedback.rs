//! Corrective messages and schema checks for the JSON-repair loop.

use serde_json::Value;

use crate::error::MalformedOutput;
use crate::message::{Message, SchemaDescriptor};

/// Builds the corrective `user` message appended after a malformed answer.
///
/// # Examples
///
/// ```
/// use llm_requester_core::feedback::corrective_message;
/// use llm_requester_core::{MalformedOutput, Role};
///
/// let err = MalformedOutput::new("no JSON found in LLM answer", "Sure! Here it is.");
/// let msg = corrective_message(&err, Some("GroupReport"), 1, 3);
/// assert_eq!(msg.role, Role::User);
/// assert!(msg.content.starts_with("Attempt 1/3"));
/// ```
#[must_use]
pub fn corrective_message(
    error: &MalformedOutput,
    schema_name: Option<&str>,
    attempt: u32,
    max_attempts: u32,
) -> Message {
    let mut content = format!(
        "Attempt {attempt}/{max_attempts}: your previous answer was not valid JSON ({}).\n",
        error.reason
    );
    match schema_name {
        Some(name) => content.push_str(&format!(
            "Return exactly one valid JSON object or array matching the \"{name}\" schema.\n"
        )),
        None => content.push_str("Return exactly one valid JSON object or array.\n"),
    }
    content.push_str("No prose, no markdown fences, no comments, no surrounding quotes.");
    Message::user(content)
}

/// Compiles the descriptor's schema for validation.
///
/// # Errors
///
/// Returns the compilation error text if the schema itself is invalid.
pub fn compile_schema(descriptor: &SchemaDescriptor) -> Result<jsonschema::Validator, String> {
    jsonschema::Validator::new(&descriptor.schema).map_err(|e| e.to_string())
}

/// Collects every validation error, each prefixed with its instance path.
#[must_use]
pub fn collect_validation_errors(validator: &jsonschema::Validator, instance: &Value) -> Vec<String> {
    validator
        .iter_errors(instance)
        .map(|error| format!("At path '{}': {}", error.instance_path, error))
        .collect()
}

/// Checks a parsed value against the schema, producing a [`MalformedOutput`] on violations.
///
/// # Errors
///
/// Returns [`MalformedOutput`] listing every violation when validation fails.
pub fn check_schema(
    validator: &jsonschema::Validator,
    instance: &Value,
    raw: &str,
) -> Result<(), MalformedOutput> {
    let errors = collect_validation_errors(validator, instance);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(MalformedOutput::new(
            format!("schema validation failed: {}", errors.join("; ")),
            raw,
        ))
    }
}
