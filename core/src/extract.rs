//! Pulls a JSON value out of free-form model output.
//!
//! Models wrap JSON in prose, markdown fences, or leak control characters
//! into string literals. Extraction tries, in order:
//!
//! 1. the whole trimmed text, when it already starts with `{` or `[`
//! 2. the body of the first fenced code block (untagged or tagged `json`)
//! 3. the first balanced `{...}` or `[...]` span that parses, in text order
//!
//! ASCII control characters are stripped from the candidate before parsing.

use serde_json::Value;

use crate::error::MalformedOutput;

const FENCE: &str = "```";

/// Result of extraction: raw text when no structure was requested, a JSON value otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// Pass-through model text.
    Text(String),
    /// Parsed JSON object or array.
    Json(Value),
}

/// Extracts the model output according to whether structured output was requested.
///
/// # Errors
///
/// Returns [`MalformedOutput`] when `structured` is set and no JSON object or
/// array can be recovered from `raw`.
pub fn extract(raw: &str, structured: bool) -> Result<Extracted, MalformedOutput> {
    if structured {
        extract_json(raw).map(Extracted::Json)
    } else {
        Ok(Extracted::Text(raw.to_string()))
    }
}

/// Extracts a JSON object or array from `raw`.
///
/// # Errors
///
/// Returns [`MalformedOutput`] when no candidate is found, the candidate does
/// not parse, or the parsed value is neither an object nor an array.
///
/// # Examples
///
/// ```
/// use llm_requester_core::extract_json;
/// use serde_json::json;
///
/// let raw = "Here is the result:\n```json\n{\"a\":1}\n```";
/// assert_eq!(extract_json(raw).unwrap(), json!({"a": 1}));
/// ```
pub fn extract_json(raw: &str) -> Result<Value, MalformedOutput> {
    let trimmed = raw.trim();

    if trimmed.starts_with('{') {
        return parse_candidate(trimmed, raw);
    }
    // A leading bracket may just be prose such as "[note] ...", so fall through on failure.
    if trimmed.starts_with('[') {
        if let Ok(value) = parse_candidate(trimmed, raw) {
            return Ok(value);
        }
    }

    if let Some(body) = fenced_block(trimmed) {
        return parse_candidate(body, raw);
    }

    // The first balanced span that parses wins; bracketed prose is skipped.
    let mut first_error = None;
    for span in balanced_spans(trimmed) {
        match parse_candidate(span, raw) {
            Ok(value) => return Ok(value),
            Err(error) => {
                first_error.get_or_insert(error);
            }
        }
    }
    if let Some(error) = first_error {
        return Err(error);
    }

    let candidate = unbalanced_span(trimmed)
        .ok_or_else(|| MalformedOutput::new("no JSON found in LLM answer", raw))?;
    parse_candidate(candidate, raw)
}

fn parse_candidate(candidate: &str, raw: &str) -> Result<Value, MalformedOutput> {
    let cleaned = strip_control_chars(candidate);
    let value: Value = serde_json::from_str(&cleaned)
        .map_err(|e| MalformedOutput::new(e.to_string(), raw))?;

    if value.is_object() || value.is_array() {
        Ok(value)
    } else {
        Err(MalformedOutput::new(
            format!("expected a JSON object or array, got {}", kind(&value)),
            raw,
        ))
    }
}

/// Removes 0x00-0x1F and 0x7F.
fn strip_control_chars(text: &str) -> String {
    text.chars().filter(|c| !c.is_ascii_control()).collect()
}

/// Body of the first fenced block whose content looks like JSON.
fn fenced_block(text: &str) -> Option<&str> {
    let mut rest = text;
    while let Some(open) = rest.find(FENCE) {
        let after_open = &rest[open + FENCE.len()..];
        let body_start = after_open
            .strip_prefix("json")
            .or_else(|| after_open.strip_prefix("JSON"))
            .unwrap_or(after_open);
        let close = body_start.find(FENCE)?;
        let body = body_start[..close].trim();
        if body.starts_with('{') || body.starts_with('[') {
            return Some(body);
        }
        rest = &body_start[close + FENCE.len()..];
    }
    None
}

/// Balanced `{...}` or `[...]` spans in order of their opening bracket.
/// Scanning resumes after each span, so nested values are not yielded twice.
fn balanced_spans(text: &str) -> impl Iterator<Item = &str> {
    let mut from = 0;
    std::iter::from_fn(move || {
        while let Some(offset) = text[from..].find(['{', '[']) {
            let start = from + offset;
            if let Some(span) = balanced_from(text, start) {
                from = start + span.len();
                return Some(span);
            }
            from = start + 1;
        }
        None
    })
}

/// From the first `{` or `[` to the last matching closer, for truncated output.
fn unbalanced_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..end + close.len_utf8()])
}

/// Scans from `start` to the matching closing bracket, ignoring brackets inside strings.
fn balanced_from(text: &str, start: usize) -> Option<&str> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(ch) {
                    return None;
                }
                if stack.is_empty() {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }
    None
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
