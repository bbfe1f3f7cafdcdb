use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::backend::LoanBackend;
use super::domain::{parse_application_set, ApplicationId, LoanApplication};
use super::error::DashboardError;
use super::notify::{Notification, Notifier};
use super::session::{Role, Session};

pub(crate) const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to view your dashboard";
const LOAD_FAILED_MESSAGE: &str = "Failed to load applications";

/// Which read endpoint a session is entitled to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadScope {
    All,
    Applicant(String),
}

impl LoadScope {
    /// Resolve the scope, failing before any network access when identity is incomplete.
    pub fn for_session(session: &Session) -> Result<Self, DashboardError> {
        match (&session.id, session.role) {
            (Some(_), Some(Role::Admin)) => Ok(Self::All),
            (Some(id), Some(Role::Applicant)) => Ok(Self::Applicant(id.clone())),
            _ => Err(DashboardError::auth(LOGIN_REQUIRED_MESSAGE)),
        }
    }
}

/// Immutable point-in-time copy of the application set.
pub type ApplicationSnapshot = Arc<Vec<LoanApplication>>;

/// Snapshot, loading flag, and last error as observed under a single read of the state.
#[derive(Debug, Clone)]
pub struct LoadState {
    pub applications: ApplicationSnapshot,
    pub loading: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct RepositoryState {
    applications: ApplicationSnapshot,
    applied_generation: u64,
    in_flight: usize,
    last_error: Option<String>,
}

/// Owns the canonical in-memory application set for the current session's scope.
///
/// Every successful load replaces the whole set. Loads carry a generation ticket and a
/// response is applied only when it is newer than the last applied one, so a slow,
/// superseded request cannot overwrite fresher data.
pub struct ApplicationRepository<B> {
    backend: Arc<B>,
    notifier: Arc<dyn Notifier>,
    state: RwLock<RepositoryState>,
    issued: AtomicU64,
}

impl<B> ApplicationRepository<B>
where
    B: LoanBackend + 'static,
{
    pub fn new(backend: Arc<B>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend,
            notifier,
            state: RwLock::new(RepositoryState::default()),
            issued: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Fetch the authoritative set for `session` and make it the current snapshot.
    pub async fn load(&self, session: &Session) -> Result<ApplicationSnapshot, DashboardError> {
        let scope = match LoadScope::for_session(session) {
            Ok(scope) => scope,
            Err(err) => {
                warn!("refusing to load applications without a valid session");
                self.record_failure(&err).await;
                return Err(err);
            }
        };

        let generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.write().await.in_flight += 1;
        debug!(generation, ?scope, "loading applications");

        let result = self.fetch(&scope).await;

        let mut state = self.state.write().await;
        state.in_flight = state.in_flight.saturating_sub(1);

        if generation <= state.applied_generation {
            warn!(
                generation,
                applied = state.applied_generation,
                "discarding superseded application load"
            );
            return match result {
                Ok(_) => Ok(state.applications.clone()),
                Err(err) => Err(err),
            };
        }

        match result {
            Ok(applications) => {
                state.applied_generation = generation;
                state.applications = Arc::new(applications);
                state.last_error = None;
                info!(
                    generation,
                    count = state.applications.len(),
                    "application set refreshed"
                );
                Ok(state.applications.clone())
            }
            Err(err) => {
                let message = err.notification_message();
                warn!(generation, error = %err, "application load failed");
                state.last_error = Some(message.clone());
                drop(state);
                self.notifier.notify(Notification::error(message));
                Err(err)
            }
        }
    }

    async fn fetch(&self, scope: &LoadScope) -> Result<Vec<LoanApplication>, DashboardError> {
        let payload = match scope {
            LoadScope::All => self.backend.all_applications().await,
            LoadScope::Applicant(user_id) => self.backend.user_applications(user_id).await,
        }
        .map_err(|err| DashboardError::network(err, LOAD_FAILED_MESSAGE))?;

        Ok(parse_application_set(payload)?)
    }

    async fn record_failure(&self, err: &DashboardError) {
        let message = err.notification_message();
        self.state.write().await.last_error = Some(message.clone());
        self.notifier.notify(Notification::error(message));
    }

    /// Consistent view of the set and its load status. A load completing concurrently is
    /// either fully reflected or not at all.
    pub async fn load_state(&self) -> LoadState {
        let state = self.state.read().await;
        LoadState {
            applications: state.applications.clone(),
            loading: state.in_flight > 0,
            last_error: state.last_error.clone(),
        }
    }

    pub async fn snapshot(&self) -> ApplicationSnapshot {
        self.state.read().await.applications.clone()
    }

    pub async fn find(&self, application_id: &ApplicationId) -> Option<LoanApplication> {
        self.state
            .read()
            .await
            .applications
            .iter()
            .find(|application| &application.application_id == application_id)
            .cloned()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.in_flight > 0
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }
}
