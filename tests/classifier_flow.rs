mod common;

use std::sync::Arc;

use calendarBot::error::{CollaboratorError, TurnError};
use calendarBot::models::intent::IntentAction;
use calendarBot::service::classifier::{IntentClassifier, OpenAIClassifier};
use common::{FakeOpenAI, seoul};

#[tokio::test]
async fn classifies_fenced_payload_with_calendar_prompt() {
    let openai = Arc::new(FakeOpenAI::replying(
        "```json\n{\"is_calendar_related\":true,\"action\":\"delete\",\"title\":\"팀 미팅\",\"start_datetime\":\"2024-06-11T15:00:00\"}\n```",
    ));
    let classifier = OpenAIClassifier::new(openai.clone());

    let intent = classifier
        .classify("내일 3시 팀 미팅 삭제해줘", seoul(2024, 6, 10, 10, 0))
        .await
        .unwrap();

    assert_eq!(intent.action, IntentAction::Remove);
    assert_eq!(intent.title(), Some("팀 미팅"));
    assert_eq!(intent.start_datetime(), Some("2024-06-11T15:00:00"));

    let prompts = openai.prompts.lock().await;
    assert_eq!(
        prompts.as_slice(),
        &[("내일 3시 팀 미팅 삭제해줘".to_string(), "calendar_intent".to_string())]
    );
}

#[tokio::test]
async fn out_of_domain_payload_is_not_an_error() {
    let openai = Arc::new(FakeOpenAI::replying(r#"{"is_calendar_related":false,"action":"none"}"#));
    let classifier = OpenAIClassifier::new(openai);

    let intent = classifier
        .classify("오늘 날씨 어때?", seoul(2024, 6, 10, 10, 0))
        .await
        .unwrap();

    assert!(!intent.is_calendar_related);
    assert_eq!(intent.action, IntentAction::None);
}

#[tokio::test]
async fn unknown_action_is_a_parse_error() {
    let openai = Arc::new(FakeOpenAI::replying(r#"{"is_calendar_related":true,"action":"archive"}"#));
    let classifier = OpenAIClassifier::new(openai);

    let err = classifier
        .classify("회의 보관해줘", seoul(2024, 6, 10, 10, 0))
        .await
        .unwrap_err();

    assert!(matches!(err, TurnError::Parse(_)));
}

#[tokio::test]
async fn upstream_failure_surfaces_as_collaborator_error() {
    let openai = Arc::new(FakeOpenAI::failing(CollaboratorError::Status {
        status: 500,
        body: "upstream down".to_string(),
    }));
    let classifier = OpenAIClassifier::new(openai);

    let err = classifier
        .classify("내일 일정 알려줘", seoul(2024, 6, 10, 10, 0))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TurnError::Collaborator(CollaboratorError::Status { status: 500, ref body }) if body == "upstream down"
    ));
}
