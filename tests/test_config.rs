//! Unit tests for the file-backed config source
//!
//! Uses temporary directories for config.json and questions.json

use std::fs;

use rtc_chat_session::config::{
    CONFIG_FILE, QUESTIONS_FILE, TEMPLATE_AGENT_ID, TEMPLATE_TOKEN, ensure_config_file,
    ensure_questions_file,
};
use rtc_chat_session::{ChatError, ConfigSource, FileConfigSource};
use serde_json::json;

#[test]
fn test_missing_files_are_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let source = FileConfigSource::in_dir(dir.path());

    assert!(matches!(
        source.load_config(),
        Err(ChatError::ConfigUnavailable(_))
    ));
    assert!(matches!(
        source.load_prompt_queue(),
        Err(ChatError::ConfigUnavailable(_))
    ));
}

#[test]
fn test_ensure_files_writes_templates_once() {
    let dir = tempfile::tempdir().unwrap();
    let source = FileConfigSource::in_dir(dir.path());
    assert!(!source.is_dev());

    source.ensure_files();
    assert!(dir.path().join(CONFIG_FILE).is_file());
    assert!(dir.path().join(QUESTIONS_FILE).is_file());

    let prompts = source.load_prompt_queue().unwrap();
    assert_eq!(prompts.len(), 3);

    // template credentials are not usable
    assert!(matches!(
        source.load_config(),
        Err(ChatError::ConfigUnavailable(_))
    ));

    fs::write(dir.path().join(QUESTIONS_FILE), r#"["mine"]"#).unwrap();
    ensure_questions_file(dir.path()).unwrap();
    assert_eq!(source.load_prompt_queue().unwrap(), vec!["mine"]);
}

#[test]
fn test_template_config_contents() {
    let dir = tempfile::tempdir().unwrap();
    ensure_config_file(dir.path()).unwrap();

    let raw = fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["token"], TEMPLATE_TOKEN);
    assert_eq!(value["agentId"], TEMPLATE_AGENT_ID);
}

#[test]
fn test_valid_config_builds_target() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join(CONFIG_FILE),
        json!({"token": "t-123", "agentId": "agent-9"}).to_string(),
    )
    .unwrap();

    let config = FileConfigSource::in_dir(dir.path()).load_config().unwrap();
    let url = config.target().url().unwrap();
    let query = url.query().unwrap_or_default();
    assert!(query.contains("agentId=agent-9"));
    assert!(query.contains("token=t-123"));
    assert!(!format!("{config:?}").contains("t-123"));
}

#[test]
fn test_malformed_questions_are_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(QUESTIONS_FILE), "{not a list").unwrap();

    let err = FileConfigSource::in_dir(dir.path())
        .load_prompt_queue()
        .unwrap_err();
    assert!(matches!(err, ChatError::ConfigUnavailable(_)));
}
