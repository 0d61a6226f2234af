use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::export::SurveyExport;
use crate::gate::AccessGate;
use crate::persistence::{ResponseRecord, ResponseRecorder};
use crate::survey::{PathSummary, QuestionnaireDefinition, SurveySession, TraversalError};

use super::views::SessionView;

/// Opaque per-user session handle, also persisted as the record's `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Sessions untouched for this long are dropped from the registry.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

struct SessionEntry {
    session: SurveySession,
    last_touched: Instant,
}

type Registry = HashMap<SessionId, SessionEntry>;

/// Service composing the access gate, the shared definition, per-user sessions and the
/// response recorder.
pub struct TriageService {
    definition: Arc<QuestionnaireDefinition>,
    gate: AccessGate,
    recorder: ResponseRecorder,
    idle_timeout: Duration,
    sessions: Mutex<Registry>,
}

impl TriageService {
    pub fn new(
        definition: Arc<QuestionnaireDefinition>,
        gate: AccessGate,
        recorder: ResponseRecorder,
    ) -> Self {
        Self {
            definition,
            gate,
            recorder,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn definition(&self) -> &Arc<QuestionnaireDefinition> {
        &self.definition
    }

    /// Checks the access code and opens a session on the first path.
    pub fn open_session(&self, access_code: &str) -> Result<SessionView, ServiceError> {
        if !self.gate.verify(access_code) {
            warn!("access code rejected");
            return Err(ServiceError::Unauthorized);
        }

        let session = SurveySession::new(self.definition.clone(), None)?;
        let id = SessionId::generate();
        let view = SessionView::from_session(&id, &session);

        let now = Instant::now();
        let mut sessions = self.lock()?;
        self.evict_idle(&mut sessions, now);
        sessions.insert(
            id.clone(),
            SessionEntry {
                session,
                last_touched: now,
            },
        );
        drop(sessions);
        info!(session_id = %id.0, path_id = %view.path.id, "survey session opened");
        Ok(view)
    }

    pub fn view(&self, id: &SessionId) -> Result<SessionView, ServiceError> {
        self.with_session(id, |session| Ok(SessionView::from_session(id, session)))
    }

    pub fn paths(&self, id: &SessionId) -> Result<Vec<PathSummary>, ServiceError> {
        self.with_session(id, |session| Ok(session.definition().summaries()))
    }

    pub fn select_path(&self, id: &SessionId, path_id: &str) -> Result<SessionView, ServiceError> {
        self.with_session(id, |session| {
            session.select_path(path_id)?;
            Ok(SessionView::from_session(id, session))
        })
    }

    /// Records an answer, then offers the new snapshot to every sink. Sink failures come
    /// back as `warnings` on the view.
    pub async fn answer(&self, id: &SessionId, value: &str) -> Result<SessionView, ServiceError> {
        let (mut view, snapshot) = self.with_session(id, |session| {
            session.answer(value)?;
            Ok((SessionView::from_session(id, session), session.snapshot()))
        })?;

        let record =
            ResponseRecord::from_snapshot(id.0.clone(), self.definition.version(), snapshot);
        let report = self.recorder.record(&record).await;
        view.warnings = report.warnings();

        Ok(view)
    }

    pub fn go_back(&self, id: &SessionId) -> Result<SessionView, ServiceError> {
        self.with_session(id, |session| {
            session.go_back()?;
            Ok(SessionView::from_session(id, session))
        })
    }

    pub fn reset(&self, id: &SessionId) -> Result<SessionView, ServiceError> {
        self.with_session(id, |session| {
            session.reset();
            Ok(SessionView::from_session(id, session))
        })
    }

    pub fn edit(&self, id: &SessionId) -> Result<SessionView, ServiceError> {
        self.with_session(id, |session| {
            session.edit()?;
            Ok(SessionView::from_session(id, session))
        })
    }

    pub fn export(&self, id: &SessionId) -> Result<SurveyExport, ServiceError> {
        self.with_session(id, |session| Ok(SurveyExport::from_session(session)?))
    }

    pub fn close(&self, id: &SessionId) -> Result<(), ServiceError> {
        match self.lock()?.remove(id) {
            Some(_) => {
                info!(session_id = %id.0, "survey session closed");
                Ok(())
            }
            None => Err(ServiceError::SessionNotFound(id.0.clone())),
        }
    }

    pub fn active_sessions(&self) -> Result<usize, ServiceError> {
        Ok(self.lock()?.len())
    }

    fn with_session<T>(
        &self,
        id: &SessionId,
        apply: impl FnOnce(&mut SurveySession) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let now = Instant::now();
        let mut sessions = self.lock()?;
        let expired = sessions
            .get(id)
            .is_some_and(|entry| self.is_idle(entry, now));
        if expired {
            sessions.remove(id);
            debug!(session_id = %id.0, "idle survey session expired");
        }

        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| ServiceError::SessionNotFound(id.0.clone()))?;
        entry.last_touched = now;
        apply(&mut entry.session)
    }

    fn is_idle(&self, entry: &SessionEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.last_touched) > self.idle_timeout
    }

    fn evict_idle(&self, sessions: &mut Registry, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_idle(entry, now));
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "idle survey sessions evicted");
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Registry>, ServiceError> {
        self.sessions
            .lock()
            .map_err(|_| ServiceError::Unavailable("session registry mutex poisoned".to_string()))
    }
}

/// Error raised by the triage service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("access code rejected")]
    Unauthorized,
    #[error("session '{0}' not found")]
    SessionNotFound(String),
    #[error(transparent)]
    Traversal(#[from] TraversalError),
    #[error("service unavailable: {0}")]
    Unavailable(String),
}
