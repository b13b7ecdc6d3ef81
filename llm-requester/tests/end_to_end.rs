//! Settings -> orchestrator -> HTTP round-trips against a local scripted server.

use std::collections::HashMap;

use llm_requester::errors::RequesterError;
use llm_requester::settings::Settings;
use llm_requester::{ask_checked, build_orchestrator, build_group_messages, group_report_schema, Group, GroupReport, Rule};
use llm_requester_core::{AskError, LastRequest, Message};
use responder::serve;
use serde_json::json;

#[path = "../../testing/responder.rs"]
mod responder;

fn chat_body(content: &str, prompt: u64, completion: u64) -> String {
    json!({
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": prompt, "completion_tokens": completion}
    })
    .to_string()
}

fn settings(vars: &[(&str, String)]) -> Settings {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect();
    Settings::from_lookup(|name| map.get(name).cloned()).unwrap()
}

fn group_conversation() -> Vec<Message> {
    let group = Group {
        id: "General 1".to_string(),
        name: "Dates".to_string(),
        system_prompt: "Check dates.".to_string(),
        codes: vec!["E01".to_string()],
    };
    let rules = vec![Rule {
        code: "E01".to_string(),
        title: "Deadline".to_string(),
        description: "A concrete deadline is given.".to_string(),
        detector: "Look for a date.".to_string(),
    }];
    build_group_messages("Deadline: TBD", &group, &rules, "You are an auditor.")
}

fn report_json() -> String {
    json!({
        "group_id": "General 1",
        "preliminary_notes": "",
        "errors": [{
            "code": "E01",
            "process": {"retrieval": [], "analysis": "a", "critique": "c", "verification": "v"},
            "verdict": "error_present",
            "instances": [{"err_type": "invalid", "rationale": "TBD is not a date"}]
        }]
    })
    .to_string()
}

#[tokio::test]
async fn test_group_report_repaired_after_prose_answer() {
    let log_dir = tempfile::tempdir().unwrap();
    let (base_url, server) = serve(vec![
        ("200 OK", chat_body("Let me think about it.", 100, 10)),
        ("503 Service Unavailable", "{\"error\":\"busy\"}".to_string()),
        ("200 OK", chat_body(&format!("```json\n{}\n```", report_json()), 120, 40)),
    ])
    .await;
    let settings = settings(&[
        ("YC_API_KEY", "key".to_string()),
        ("YC_FOLDER_ID", "b1g".to_string()),
        ("YC_BASE_URL", format!("{base_url}/v1")),
        ("LLM_REQUEST_LOG_DIR", log_dir.path().display().to_string()),
        ("LLM_VALIDATE_SCHEMA", "true".to_string()),
    ]);
    let mut requester = settings.requester.clone();
    requester.backoff = llm_requester_core::BackoffConfig::immediate();
    let settings = Settings { requester, ..settings };
    let orchestrator = build_orchestrator(&settings).unwrap();
    let schema = group_report_schema();

    let result = ask_checked(&orchestrator, &group_conversation(), Some(&schema), None)
        .await
        .unwrap();

    assert_eq!(result.attempts, 3);
    assert_eq!(result.model_uri, "gpt://b1g/yandexgpt/latest");
    assert_eq!(result.usage.prompt_tokens, 220);
    assert_eq!(result.usage.total_tokens(), 270);
    let report: GroupReport = serde_json::from_value(result.result.as_json().unwrap().clone()).unwrap();
    assert_eq!(report.violated_codes(), vec!["E01"]);

    let requests = server.await.unwrap();
    assert!(requests[0].contains("\"response_format\""));
    assert!(requests[1].contains("not valid JSON"));
    assert_eq!(
        requests[1].split("\r\n\r\n").nth(1),
        requests[2].split("\r\n\r\n").nth(1)
    );

    let record: LastRequest = serde_json::from_str(
        &std::fs::read_to_string(log_dir.path().join("last_request.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(record.schema_name.as_deref(), Some("GroupReport"));
}

#[tokio::test]
async fn test_native_yandex_backend_without_schema() {
    let log_dir = tempfile::tempdir().unwrap();
    let body = json!({
        "result": {
            "alternatives": [{"message": {"role": "assistant", "text": "The document has no deadline."}}],
            "usage": {"inputTextTokens": "30", "completionTokens": "7", "totalTokens": "37"}
        }
    })
    .to_string();
    let (base_url, server) = serve(vec![("200 OK", body)]).await;
    let settings = settings(&[
        ("YC_API_KEY", "key".to_string()),
        ("YC_FOLDER_ID", "b1g".to_string()),
        ("YC_API", "native".to_string()),
        ("YC_COMPLETION_URL", base_url),
        ("LLM_REQUEST_LOG_DIR", log_dir.path().display().to_string()),
    ]);
    let orchestrator = build_orchestrator(&settings).unwrap();

    let result = ask_checked(&orchestrator, &group_conversation(), None, Some("yandexgpt-lite"))
        .await
        .unwrap();

    assert_eq!(result.result.as_text(), Some("The document has no deadline."));
    assert_eq!(result.usage.total_tokens(), 37);
    assert_eq!(result.model_uri, "gpt://b1g/yandexgpt-lite");
    let requests = server.await.unwrap();
    assert!(requests[0].starts_with("POST /foundationModels/v1/completion "));
}

#[tokio::test]
async fn test_unauthorized_fails_after_one_attempt() {
    let log_dir = tempfile::tempdir().unwrap();
    let (base_url, server) = serve(vec![("401 Unauthorized", "{\"error\":\"bad key\"}".to_string())]).await;
    let settings = settings(&[
        ("YC_API_KEY", "wrong".to_string()),
        ("YC_FOLDER_ID", "b1g".to_string()),
        ("YC_BASE_URL", format!("{base_url}/v1")),
        ("LLM_REQUEST_LOG_DIR", log_dir.path().display().to_string()),
    ]);
    let orchestrator = build_orchestrator(&settings).unwrap();

    let err = ask_checked(&orchestrator, &group_conversation(), Some(&group_report_schema()), None)
        .await
        .unwrap_err();

    match err {
        RequesterError::Ask(AskError::Provider { source, attempts, .. }) => {
            assert_eq!(attempts, 1);
            assert_eq!(source.status, Some(401));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_short_conversation_is_rejected_before_any_call() {
    let settings = settings(&[
        ("YC_API_KEY", "key".to_string()),
        ("YC_FOLDER_ID", "b1g".to_string()),
        ("YC_BASE_URL", "http://127.0.0.1:9/v1".to_string()),
    ]);
    let orchestrator = build_orchestrator(&settings).unwrap();

    let err = ask_checked(&orchestrator, &[Message::user("hi")], None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, RequesterError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_openrouter_registered_only_with_key() {
    let base = [
        ("YC_API_KEY", "key".to_string()),
        ("YC_FOLDER_ID", "b1g".to_string()),
    ];
    let without = build_orchestrator(&settings(&base)).unwrap();
    assert_eq!(without.backends().len(), 1);

    let mut vars = base.to_vec();
    vars.push(("OPENROUTER_API_KEY", "sk-or".to_string()));
    vars.push(("OPENROUTER_REFERER", "https://example.org".to_string()));
    let with = build_orchestrator(&settings(&vars)).unwrap();
    assert_eq!(with.backends().len(), 2);
    assert_eq!(with.resolver().resolve(Some("openrouter/auto")).model_uri, "openrouter/auto");
}
