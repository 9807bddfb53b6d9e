use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::principal::Principal;
use crate::service::approval_prompt::ApprovalPromptService;
use crate::service::confirmation::PendingDeletion;
use crate::service::orchestrator::IntentOrchestrator;

pub type ActionId = String;

pub const EXPIRED_MESSAGE: &str = "확인 시간이 지나 삭제 요청이 만료되었습니다.";
const CANCELED_MESSAGE: &str = "삭제 요청을 취소했습니다.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    AwaitingApproval,
    Approved,
    Rejected,
    Expired,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ActionPayload {
    PendingDeletion(PendingDeletion),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub status: ActionStatus,
    pub user_id: String,
    pub channel_id: String,
    pub payload: Option<ActionPayload>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Action {
    pub fn pending_deletion(&self) -> Option<&PendingDeletion> {
        match &self.payload {
            Some(ActionPayload::PendingDeletion(pending)) => Some(pending),
            None => None,
        }
    }

    pub fn pending_deletion_mut(&mut self) -> Option<&mut PendingDeletion> {
        match &mut self.payload {
            Some(ActionPayload::PendingDeletion(pending)) => Some(pending),
            None => None,
        }
    }

    fn transition(&mut self, status: ActionStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActionStore {
    actions: HashMap<ActionId, Action>,
}

impl ActionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, action: Action) {
        self.actions.insert(action.id.clone(), action);
    }

    pub fn get(&self, id: &str) -> Option<&Action> {
        self.actions.get(id)
    }

    /// Drops finished actions and confirmations past their deadline.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        self.actions.retain(|_, action| {
            action.status == ActionStatus::AwaitingApproval
                && action
                    .pending_deletion()
                    .is_some_and(|pending| !pending.is_expired(now))
        });
    }

    pub fn ids(&self) -> Vec<ActionId> {
        self.actions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[derive(Debug)]
pub enum ActionEvent {
    TurnRequested {
        text: String,
        user_id: String,
        channel_id: String,
    },
    DeleteConfirmed {
        action_id: String,
        user_id: String,
    },
    DeleteCanceled {
        action_id: String,
        user_id: String,
    },
}

pub struct ActionEngine {
    store: Arc<Mutex<ActionStore>>,
    orchestrator: Arc<IntentOrchestrator>,
    approval: Arc<dyn ApprovalPromptService>,
    access_token: Arc<String>,
}

impl ActionEngine {
    pub fn new(
        store: Arc<Mutex<ActionStore>>,
        orchestrator: Arc<IntentOrchestrator>,
        approval: Arc<dyn ApprovalPromptService>,
        access_token: Arc<String>,
    ) -> Self {
        Self {
            store,
            orchestrator,
            approval,
            access_token,
        }
    }

    fn principal(&self, user_id: &str) -> Principal {
        Principal::new(user_id, self.access_token.as_str())
    }

    pub async fn handle_event(&self, event: ActionEvent) {
        match event {
            ActionEvent::TurnRequested {
                text,
                user_id,
                channel_id,
            } => {
                let principal = self.principal(&user_id);
                let response = self.orchestrator.handle_turn(&text, &principal).await;

                let Some(confirmation) = response.confirmation else {
                    if let Err(err) = self
                        .approval
                        .update_status_message(&channel_id, &user_id, &response.message)
                        .await
                    {
                        warn!(error = %err, channel_id, "failed to post turn response");
                    }
                    return;
                };

                let now = Utc::now();
                let mut action = Action {
                    id: Uuid::new_v4().to_string(),
                    status: ActionStatus::AwaitingApproval,
                    user_id: user_id.clone(),
                    channel_id: channel_id.clone(),
                    payload: Some(ActionPayload::PendingDeletion(PendingDeletion::new(
                        confirmation.event,
                        confirmation.distance_ms,
                        now,
                    ))),
                    created_at: now,
                    updated_at: now,
                };

                if let Err(err) = self.approval.prompt(&mut action).await {
                    warn!(error = %err, action_id = %action.id, "failed to send confirmation prompt");
                    action.transition(ActionStatus::Failed);
                }

                let mut store = self.store.lock().await;
                store.prune(now);
                store.insert(action);
            }
            ActionEvent::DeleteConfirmed { action_id, user_id } => {
                let Some(mut action) = self.awaiting(&action_id, &user_id).await else {
                    return;
                };

                let Some(pending) = action.pending_deletion().cloned() else {
                    action.transition(ActionStatus::Failed);
                    self.store.lock().await.insert(action);
                    return;
                };

                if pending.is_expired(Utc::now()) {
                    action.transition(ActionStatus::Expired);
                    let _ = self.approval.update_status(&action, EXPIRED_MESSAGE).await;
                    self.store.lock().await.insert(action);
                    return;
                }

                action.transition(ActionStatus::Approved);
                let principal = self.principal(&user_id);
                let response = self.orchestrator.confirm_delete(&principal, &pending.event).await;

                // A successful delete echoes the removed event back.
                if response.event_details.is_some() {
                    action.transition(ActionStatus::Completed);
                } else {
                    action.transition(ActionStatus::Failed);
                }
                info!(action_id = %action.id, status = ?action.status, "confirmed deletion processed");
                let _ = self.approval.update_status(&action, &response.message).await;

                self.store.lock().await.insert(action);
            }
            ActionEvent::DeleteCanceled { action_id, user_id } => {
                let Some(mut action) = self.awaiting(&action_id, &user_id).await else {
                    return;
                };

                action.transition(ActionStatus::Rejected);
                let _ = self.approval.update_status(&action, CANCELED_MESSAGE).await;

                self.store.lock().await.insert(action);
            }
        }
    }

    /// Snapshot of an action still awaiting approval from `user_id`.
    async fn awaiting(&self, action_id: &str, user_id: &str) -> Option<Action> {
        let action = {
            let store = self.store.lock().await;
            store.get(action_id).cloned()
        }?;

        if action.user_id != user_id || action.status != ActionStatus::AwaitingApproval {
            warn!(action_id, user_id, "ignoring confirmation from another user or for a settled action");
            return None;
        }
        Some(action)
    }
}
