// Collaborator seams: persistence, session creation, notifications, time
//
// The engine holds no global state; everything stateful or external is
// injected through these traits. The in-memory implementations serve
// hosts without real persistence and the test suite.
use crate::error::{EngineError, Result};
use crate::settlement::types::{Invitation, InvitationStatus, SessionData, SettlementEvent};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Injected time source so expiry logic is testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for deterministic expiry tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("clock lock poisoned") = now;
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock poisoned")
    }
}

/// Invitation persistence with compare-and-swap status transitions.
///
/// `compare_and_set_status` must be conditional on the current status so
/// that at most one caller wins a race to transition the same invitation.
pub trait InvitationStore: Send + Sync {
    fn get(&self, id: Uuid) -> Result<Invitation>;

    fn insert(&self, invitation: Invitation) -> Result<()>;

    /// Transition `id` from `expected` to `new_status`, merging `extra`
    /// into its session data, and return the updated record. Fails with
    /// `InvalidStateTransition` when the current status is not `expected`.
    fn compare_and_set_status(
        &self,
        id: Uuid,
        expected: InvitationStatus,
        new_status: InvitationStatus,
        extra: &SessionData,
    ) -> Result<Invitation>;
}

/// Mutex-guarded invitation store.
#[derive(Debug, Default)]
pub struct InMemoryInvitationStore {
    invitations: Mutex<HashMap<Uuid, Invitation>>,
}

impl InMemoryInvitationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Invitation>> {
        self.invitations.lock().expect("invitation store lock poisoned")
    }
}

impl InvitationStore for InMemoryInvitationStore {
    fn get(&self, id: Uuid) -> Result<Invitation> {
        self.lock().get(&id).cloned().ok_or(EngineError::InvitationNotFound { id })
    }

    fn insert(&self, invitation: Invitation) -> Result<()> {
        self.lock().insert(invitation.id, invitation);
        Ok(())
    }

    fn compare_and_set_status(
        &self,
        id: Uuid,
        expected: InvitationStatus,
        new_status: InvitationStatus,
        extra: &SessionData,
    ) -> Result<Invitation> {
        let mut invitations = self.lock();
        let invitation =
            invitations.get_mut(&id).ok_or(EngineError::InvitationNotFound { id })?;
        if invitation.status != expected {
            return Err(EngineError::InvalidStateTransition {
                id,
                status: invitation.status,
                attempted: new_status.as_str(),
            });
        }
        invitation.status = new_status;
        for (key, value) in extra {
            invitation.session_data.insert(key.clone(), value.clone());
        }
        debug!(%id, from = %expected, to = %new_status, "invitation transition");
        Ok(invitation.clone())
    }
}

/// Creates the underlying session record on a successful accept.
pub trait SessionFactory: Send + Sync {
    fn create_session(
        &self,
        kind: &str,
        participants: &[String],
        metadata: &SessionData,
    ) -> std::result::Result<Uuid, String>;
}

/// Records created sessions; can be armed to fail once for rollback
/// testing.
#[derive(Debug, Default)]
pub struct InMemorySessionFactory {
    sessions: Mutex<Vec<(Uuid, String, Vec<String>)>>,
    fail_next: AtomicBool,
}

impl InMemorySessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create_session` call fail.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn created_count(&self) -> usize {
        self.sessions.lock().expect("session factory lock poisoned").len()
    }
}

impl SessionFactory for InMemorySessionFactory {
    fn create_session(
        &self,
        kind: &str,
        participants: &[String],
        _metadata: &SessionData,
    ) -> std::result::Result<Uuid, String> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err("session backend unavailable".to_string());
        }
        let id = Uuid::new_v4();
        self.sessions
            .lock()
            .expect("session factory lock poisoned")
            .push((id, kind.to_string(), participants.to_vec()));
        Ok(id)
    }
}

/// Best-effort observer notifications. Publishing must never fail the
/// calling operation; a consumer that missed events reconciles by
/// re-fetching state.
pub trait NotificationBus: Send + Sync {
    fn publish(&self, event: &SettlementEvent);
}

/// Drops every event.
#[derive(Debug, Default)]
pub struct NullNotificationBus;

impl NotificationBus for NullNotificationBus {
    fn publish(&self, _event: &SettlementEvent) {}
}

/// Buffers events for assertions.
#[derive(Debug, Default)]
pub struct RecordingNotificationBus {
    events: Mutex<Vec<SettlementEvent>>,
}

impl RecordingNotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SettlementEvent> {
        self.events.lock().expect("bus lock poisoned").clone()
    }
}

impl NotificationBus for RecordingNotificationBus {
    fn publish(&self, event: &SettlementEvent) {
        self.events.lock().expect("bus lock poisoned").push(event.clone());
    }
}
