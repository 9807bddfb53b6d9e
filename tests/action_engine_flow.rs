mod common;

use std::sync::Arc;

use calendarBot::handlers::action::{
    Action, ActionEngine, ActionEvent, ActionPayload, ActionStatus, ActionStore, EXPIRED_MESSAGE,
};
use calendarBot::service::confirmation::PendingDeletion;
use chrono::{Duration, Utc};
use chrono_tz::Asia::Seoul;
use common::{CapturingApprovalPrompt, FakeOpenAI, InMemoryCalendar, orchestrator, timed_event};
use tokio::sync::Mutex;

/// Classifier payload plus a calendar whose only event today is four hours
/// after the requested 09:00, so the turn ends in a near-miss.
fn near_miss_setup() -> (Arc<FakeOpenAI>, Arc<InMemoryCalendar>) {
    let today = Utc::now().with_timezone(&Seoul).date_naive();
    let payload = format!(
        r#"{{"is_calendar_related":true,"action":"remove","start_datetime":"{today}T09:00:00"}}"#
    );
    let dentist_at = today
        .and_hms_opt(13, 0, 0)
        .unwrap()
        .and_local_timezone(Seoul)
        .unwrap();
    let calendar = Arc::new(InMemoryCalendar::with_events(vec![timed_event(
        "evt-dentist",
        "치과",
        dentist_at,
    )]));
    (Arc::new(FakeOpenAI::replying(&payload)), calendar)
}

fn engine(
    openai: Arc<FakeOpenAI>,
    calendar: Arc<InMemoryCalendar>,
    store: Arc<Mutex<ActionStore>>,
    approval: Arc<CapturingApprovalPrompt>,
) -> ActionEngine {
    ActionEngine::new(
        store,
        Arc::new(orchestrator(openai, calendar)),
        approval,
        Arc::new("google-token".to_string()),
    )
}

fn pending_action(id: &str, user_id: &str, expires_in: Duration) -> Action {
    let now = Utc::now();
    let dentist_at = Utc::now().with_timezone(&Seoul) + Duration::hours(4);
    let mut pending = PendingDeletion::new(timed_event("evt-dentist", "치과", dentist_at), 4 * 3_600_000, now);
    pending.expires_at = now + expires_in;
    Action {
        id: id.to_string(),
        status: ActionStatus::AwaitingApproval,
        user_id: user_id.to_string(),
        channel_id: "123".to_string(),
        payload: Some(ActionPayload::PendingDeletion(pending)),
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn near_miss_turn_waits_for_requester_confirmation() {
    let (openai, calendar) = near_miss_setup();
    let store = Arc::new(Mutex::new(ActionStore::new()));
    let approval = Arc::new(CapturingApprovalPrompt::default());
    let engine = engine(openai, calendar.clone(), store.clone(), approval.clone());

    engine
        .handle_event(ActionEvent::TurnRequested {
            text: "일정 삭제해줘".to_string(),
            user_id: "u1".to_string(),
            channel_id: "123".to_string(),
        })
        .await;

    let action_id = {
        let guard = store.lock().await;
        guard.ids().into_iter().next().expect("action exists")
    };
    {
        let guard = store.lock().await;
        let action = guard.get(&action_id).unwrap();
        assert_eq!(action.status, ActionStatus::AwaitingApproval);
        assert_eq!(action.pending_deletion().unwrap().message_id, Some(42));
    }
    assert_eq!(*approval.prompts.lock().await, vec![action_id.clone()]);
    assert!(calendar.deleted.lock().await.is_empty());

    engine
        .handle_event(ActionEvent::DeleteConfirmed {
            action_id: action_id.clone(),
            user_id: "someone-else".to_string(),
        })
        .await;
    assert!(calendar.deleted.lock().await.is_empty());
    assert_eq!(
        store.lock().await.get(&action_id).unwrap().status,
        ActionStatus::AwaitingApproval
    );

    engine
        .handle_event(ActionEvent::DeleteConfirmed {
            action_id: action_id.clone(),
            user_id: "u1".to_string(),
        })
        .await;

    assert_eq!(*calendar.deleted.lock().await, vec!["evt-dentist".to_string()]);
    assert_eq!(
        store.lock().await.get(&action_id).unwrap().status,
        ActionStatus::Completed
    );
    let statuses = approval.statuses.lock().await;
    assert!(statuses.last().unwrap().contains("성공"));
}

#[tokio::test]
async fn resolved_turn_posts_reply_without_pending_action() {
    let (openai, calendar) = near_miss_setup();
    let store = Arc::new(Mutex::new(ActionStore::new()));
    let approval = Arc::new(CapturingApprovalPrompt::default());
    let engine = engine(openai, calendar.clone(), store.clone(), approval.clone());

    engine
        .handle_event(ActionEvent::TurnRequested {
            text: "치과 삭제해줘".to_string(),
            user_id: "u1".to_string(),
            channel_id: "123".to_string(),
        })
        .await;

    assert!(store.lock().await.is_empty());
    assert!(approval.prompts.lock().await.is_empty());
    assert_eq!(*calendar.deleted.lock().await, vec!["evt-dentist".to_string()]);
    let statuses = approval.statuses.lock().await;
    assert!(statuses.last().unwrap().contains("치과"));
}

#[tokio::test]
async fn cancel_marks_rejected() {
    let (openai, calendar) = near_miss_setup();
    let store = Arc::new(Mutex::new(ActionStore::new()));
    let approval = Arc::new(CapturingApprovalPrompt::default());
    let engine = engine(openai, calendar.clone(), store.clone(), approval.clone());

    store.lock().await.insert(pending_action("a1", "u1", Duration::minutes(5)));

    engine
        .handle_event(ActionEvent::DeleteCanceled {
            action_id: "a1".to_string(),
            user_id: "u1".to_string(),
        })
        .await;

    assert_eq!(store.lock().await.get("a1").unwrap().status, ActionStatus::Rejected);
    assert!(calendar.deleted.lock().await.is_empty());
    assert_eq!(approval.statuses.lock().await.len(), 1);
}

#[tokio::test]
async fn expired_confirmation_does_not_delete() {
    let (openai, calendar) = near_miss_setup();
    let store = Arc::new(Mutex::new(ActionStore::new()));
    let approval = Arc::new(CapturingApprovalPrompt::default());
    let engine = engine(openai, calendar.clone(), store.clone(), approval.clone());

    store.lock().await.insert(pending_action("a1", "u1", Duration::minutes(-1)));

    engine
        .handle_event(ActionEvent::DeleteConfirmed {
            action_id: "a1".to_string(),
            user_id: "u1".to_string(),
        })
        .await;

    assert_eq!(store.lock().await.get("a1").unwrap().status, ActionStatus::Expired);
    assert!(calendar.deleted.lock().await.is_empty());
    assert_eq!(
        approval.statuses.lock().await.last().map(String::as_str),
        Some(EXPIRED_MESSAGE)
    );
}

#[tokio::test]
async fn prune_drops_settled_and_expired_actions() {
    let mut store = ActionStore::new();
    store.insert(pending_action("live", "u1", Duration::minutes(5)));
    store.insert(pending_action("stale", "u1", Duration::minutes(-1)));
    let mut done = pending_action("done", "u1", Duration::minutes(5));
    done.status = ActionStatus::Completed;
    store.insert(done);

    store.prune(Utc::now());

    assert_eq!(store.ids(), vec!["live".to_string()]);
}
