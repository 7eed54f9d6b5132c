//! Registry of live planning sessions, one wizard per session.
//!
//! Each wizard is owned by exactly one entry; sessions never share setups.

use campaign_core::error::{PlannerError, PlannerResult};
use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use crate::wizard::WizardController;

#[derive(Debug, Default)]
pub struct PlanningSessions {
    sessions: DashMap<Uuid, WizardController>,
}

impl PlanningSessions {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Start a new wizard and return its session id.
    pub fn create(&self) -> Uuid {
        let wizard = WizardController::new();
        let id = wizard.id();
        self.sessions.insert(id, wizard);
        info!(session_id = %id, "Planning session created");
        id
    }

    /// Run `f` against a session's wizard while holding its entry.
    pub fn with_session<R>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut WizardController) -> PlannerResult<R>,
    ) -> PlannerResult<R> {
        let mut entry = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| PlannerError::SessionNotFound(id.to_string()))?;
        f(entry.value_mut())
    }

    /// Cloned snapshot of a session's wizard.
    pub fn get(&self, id: &Uuid) -> Option<WizardController> {
        self.sessions.get(id).map(|r| r.clone())
    }

    /// Remove a session, returning its wizard (for hand-off or discard).
    pub fn remove(&self, id: &Uuid) -> PlannerResult<WizardController> {
        let (_, wizard) = self
            .sessions
            .remove(id)
            .ok_or_else(|| PlannerError::SessionNotFound(id.to_string()))?;
        info!(session_id = %id, completed = wizard.is_completed(), "Planning session closed");
        Ok(wizard)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
