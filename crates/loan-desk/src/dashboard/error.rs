use super::backend::BackendError;
use super::domain::ApplicationId;

/// A loaded record that does not match the expected application shape.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataIntegrityError {
    #[error("expected an array of applications, found {found}")]
    NotAnArray { found: &'static str },
    #[error("application record {index} is malformed: {reason}")]
    MalformedRecord { index: usize, reason: String },
    #[error("application record {index} is missing `{field}`")]
    MissingField { index: usize, field: &'static str },
    #[error("application {application_id} has an invalid `{field}`: {raw}")]
    InvalidField {
        application_id: ApplicationId,
        field: &'static str,
        raw: String,
    },
    #[error("application {application_id} has a non-numeric loan amount: {raw}")]
    NonNumericAmount {
        application_id: ApplicationId,
        raw: String,
    },
    #[error("application {application_id} has a negative loan amount: {amount}")]
    NegativeAmount {
        application_id: ApplicationId,
        amount: f64,
    },
    #[error("application {application_id} has an unknown status `{raw}`")]
    UnknownStatus {
        application_id: ApplicationId,
        raw: String,
    },
}

/// Failure surfaced by the repository or the action dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// No usable session. Terminal for the current view.
    #[error("{message}")]
    Auth { message: String },
    /// Request failed or the backing store answered with a non-2xx status.
    #[error("{message}")]
    Network {
        message: String,
        status: Option<u16>,
        #[source]
        source: BackendError,
    },
    #[error("received malformed application data: {0}")]
    DataIntegrity(#[from] DataIntegrityError),
    /// The action referenced an application missing from the current snapshot.
    #[error("application {application_id} is not in the current view; reload before retrying")]
    StaleView { application_id: ApplicationId },
    #[error("{action} for application {application_id} is already in progress")]
    ActionInFlight {
        action: &'static str,
        application_id: ApplicationId,
    },
    #[error("invalid loan submission: {0}")]
    InvalidSubmission(String),
}

impl DashboardError {
    pub(crate) fn auth(message: &str) -> Self {
        Self::Auth {
            message: message.to_string(),
        }
    }

    /// Convert a backend failure, preferring the server's own message over `fallback`.
    pub(crate) fn network(source: BackendError, fallback: &str) -> Self {
        let message = source
            .server_message()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string());
        Self::Network {
            message,
            status: source.status(),
            source,
        }
    }

    /// Message suitable for a user-visible notification.
    pub fn notification_message(&self) -> String {
        self.to_string()
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }
}
