//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-login session state.

use crate::config::Config;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use translation_workflow_core::domain::{Identity, Project};
use translation_workflow_core::ports::{AccountStore, EventLog};
use translation_workflow_core::workflow::TranslationWorkflow;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub workflow: TranslationWorkflow,
    pub accounts: Arc<dyn AccountStore>,
    pub events: Arc<dyn EventLog>,
    pub sessions: SessionRegistry,
}

impl AppState {
    /// Appends to the access log. A failed append is logged and otherwise ignored.
    pub async fn record_event(&self, username: &str, event: &str) {
        if let Err(e) = self.events.record_event(username, event).await {
            tracing::error!("Failed to record access event for {}: {}", username, e);
        }
    }
}

//=========================================================================================
// SessionState (Specific to One Login)
//=========================================================================================

/// The state owned by one logged-in session: who it is and the project it works on.
pub struct SessionState {
    pub id: Uuid,
    pub identity: Identity,
    /// Milliseconds since the Unix epoch of the last authenticated request.
    last_activity: AtomicI64,
    pub project: Mutex<Project>,
}

impl SessionState {
    pub fn new(identity: Identity) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity,
            last_activity: AtomicI64::new(Utc::now().timestamp_millis()),
            project: Mutex::new(Project::default()),
        }
    }

    pub fn last_activity_millis(&self) -> i64 {
        self.last_activity.load(Ordering::Relaxed)
    }

    pub fn touch(&self, now_millis: i64) {
        self.last_activity.store(now_millis, Ordering::Relaxed);
    }
}

/// Whether a session idle since `last_activity_millis` has outlived `timeout` at `now_millis`.
pub fn is_expired(last_activity_millis: i64, now_millis: i64, timeout: Duration) -> bool {
    let idle = now_millis.saturating_sub(last_activity_millis);
    idle > 0 && idle as u128 > timeout.as_millis()
}

//=========================================================================================
// SessionRegistry
//=========================================================================================

/// All live sessions, keyed by the id carried in the `session` cookie.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<SessionState>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, identity: Identity) -> Arc<SessionState> {
        let session = Arc::new(SessionState::new(identity));
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        session
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<SessionState>> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> Option<Arc<SessionState>> {
        self.sessions.write().await.remove(&id)
    }

    /// Drops every session of `username` and returns how many there were.
    pub async fn remove_user(&self, username: &str) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.identity.username != username);
        before - sessions.len()
    }

    /// Drops the sessions idle for longer than `timeout` and returns them.
    pub async fn sweep_expired(&self, now_millis: i64, timeout: Duration) -> Vec<Arc<SessionState>> {
        let mut sessions = self.sessions.write().await;
        let expired: Vec<Uuid> = sessions
            .values()
            .filter(|s| is_expired(s.last_activity_millis(), now_millis, timeout))
            .map(|s| s.id)
            .collect();
        expired
            .iter()
            .filter_map(|id| sessions.remove(id))
            .collect()
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
