use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{error, info, warn};

use super::backend::LoanBackend;
use super::domain::{ApplicationId, LoanDecision, LoanSubmission};
use super::error::DashboardError;
use super::notify::{Notification, Notifier};
use super::repository::ApplicationRepository;
use super::session::Session;

const STATUS_UPDATE_FAILED: &str = "Status update failed";
const DISBURSEMENT_FAILED: &str = "Disbursement failed";
const APPLICATION_FAILED: &str = "Application failed";
const APPLY_LOGIN_REQUIRED: &str = "Please log in to apply for a loan";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ActionKind {
    UpdateStatus,
    Disburse,
}

impl ActionKind {
    const fn label(self) -> &'static str {
        match self {
            Self::UpdateStatus => "status update",
            Self::Disburse => "disbursement",
        }
    }
}

type InFlight = Arc<Mutex<HashSet<(ActionKind, ApplicationId)>>>;

/// Releases the single-flight slot when the action finishes, however it finishes.
struct FlightSlot {
    in_flight: InFlight,
    key: (ActionKind, ApplicationId),
}

impl Drop for FlightSlot {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Executes state-changing requests and reloads the repository afterwards.
///
/// Role is not re-checked here; the backing store is the trust boundary. Successful actions
/// never patch the local set, they trigger a full reload instead.
pub struct ActionDispatcher<B> {
    session: Session,
    repository: Arc<ApplicationRepository<B>>,
    notifier: Arc<dyn Notifier>,
    in_flight: InFlight,
}

impl<B> ActionDispatcher<B>
where
    B: LoanBackend + 'static,
{
    pub fn new(
        session: Session,
        repository: Arc<ApplicationRepository<B>>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            session,
            repository,
            notifier,
            in_flight: Arc::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Move a pending application to approved or rejected.
    pub async fn update_status(
        &self,
        application_id: &ApplicationId,
        decision: LoanDecision,
    ) -> Result<(), DashboardError> {
        let _slot = self.claim(ActionKind::UpdateStatus, application_id)?;

        let result = self
            .repository
            .backend()
            .update_status(application_id, decision)
            .await
            .map_err(|err| DashboardError::network(err, STATUS_UPDATE_FAILED));

        match result {
            Ok(()) => {
                let outcome = decision.as_str().to_lowercase();
                info!(%application_id, status = decision.as_str(), "application status updated");
                self.succeed(format!("Application {outcome}!")).await;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Disburse an approved loan for the amount recorded in the current snapshot.
    pub async fn disburse(&self, application_id: &ApplicationId) -> Result<(), DashboardError> {
        let _slot = self.claim(ActionKind::Disburse, application_id)?;

        let Some(application) = self.repository.find(application_id).await else {
            error!(%application_id, "disbursement requested for an application missing from the view");
            return Err(self.fail(DashboardError::StaleView {
                application_id: application_id.clone(),
            }));
        };

        let result = self
            .repository
            .backend()
            .disburse(application_id, application.loan_amount)
            .await
            .map_err(|err| DashboardError::network(err, DISBURSEMENT_FAILED));

        match result {
            Ok(()) => {
                info!(%application_id, amount = application.loan_amount, "loan disbursed");
                self.succeed("Loan disbursed!".to_string()).await;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Submit a new loan application on behalf of the session's user.
    pub async fn submit_application(
        &self,
        submission: &LoanSubmission,
    ) -> Result<(), DashboardError> {
        let Some(user_id) = self.session.id.as_deref() else {
            return Err(self.fail(DashboardError::auth(APPLY_LOGIN_REQUIRED)));
        };

        if let Err(reason) = validate_submission(submission) {
            return Err(self.fail(DashboardError::InvalidSubmission(reason)));
        }

        let result = self
            .repository
            .backend()
            .apply(user_id, submission)
            .await
            .map_err(|err| DashboardError::network(err, APPLICATION_FAILED));

        match result {
            Ok(()) => {
                info!(user_id, purpose = %submission.purpose, "loan application submitted");
                self.succeed("Application submitted successfully!".to_string())
                    .await;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn claim(
        &self,
        kind: ActionKind,
        application_id: &ApplicationId,
    ) -> Result<FlightSlot, DashboardError> {
        let key = (kind, application_id.clone());
        let inserted = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone());

        if !inserted {
            warn!(%application_id, action = kind.label(), "ignoring duplicate in-flight action");
            return Err(DashboardError::ActionInFlight {
                action: kind.label(),
                application_id: application_id.clone(),
            });
        }

        Ok(FlightSlot {
            in_flight: self.in_flight.clone(),
            key,
        })
    }

    /// Notify success, then reload. A failed reload reports through the repository and does
    /// not undo the completed action.
    async fn succeed(&self, message: String) {
        self.notifier.notify(Notification::success(message));
        if let Err(err) = self.repository.load(&self.session).await {
            warn!(error = %err, "reload after action failed");
        }
    }

    fn fail(&self, err: DashboardError) -> DashboardError {
        warn!(error = %err, "dashboard action failed");
        self.notifier
            .notify(Notification::error(err.notification_message()));
        err
    }
}

fn validate_submission(submission: &LoanSubmission) -> Result<(), String> {
    if submission.name.trim().is_empty() {
        return Err("name is required".to_string());
    }
    if submission.purpose.trim().is_empty() {
        return Err("purpose is required".to_string());
    }
    if !submission.loan_amount.is_finite() || submission.loan_amount < 0.0 {
        return Err(format!(
            "loan amount must be a non-negative number, got {}",
            submission.loan_amount
        ));
    }
    Ok(())
}
