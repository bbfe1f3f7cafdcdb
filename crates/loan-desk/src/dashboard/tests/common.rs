use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::dashboard::backend::{BackendError, LoanBackend};
use crate::dashboard::domain::{ApplicationId, LoanDecision, LoanSubmission};
use crate::dashboard::notify::NotificationLog;
use crate::dashboard::repository::ApplicationRepository;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Call {
    All,
    User(String),
    UpdateStatus(ApplicationId, LoanDecision),
    Disburse(ApplicationId, f64),
    Apply { user_id: String, name: String },
}

/// Read response override, optionally held back until the test releases it.
pub(super) struct ScriptedRead {
    payload: Value,
    gate: Option<oneshot::Receiver<()>>,
}

impl ScriptedRead {
    pub(super) fn immediate(payload: Value) -> Self {
        Self {
            payload,
            gate: None,
        }
    }

    pub(super) fn gated(payload: Value) -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                payload,
                gate: Some(rx),
            },
            tx,
        )
    }
}

/// In-memory loan service enforcing the backing store's own preconditions.
#[derive(Default)]
pub(super) struct FakeLoanStore {
    records: Mutex<Vec<Value>>,
    calls: Mutex<Vec<Call>>,
    read_failures: Mutex<VecDeque<BackendError>>,
    scripted_reads: Mutex<VecDeque<ScriptedRead>>,
    action_failures: Mutex<VecDeque<BackendError>>,
    next_id: Mutex<u64>,
}

impl FakeLoanStore {
    pub(super) fn with_records(records: Vec<Value>) -> Self {
        let store = Self::default();
        *store.next_id.lock().expect("id mutex poisoned") = records.len() as u64 + 100;
        *store.records.lock().expect("records mutex poisoned") = records;
        store
    }

    pub(super) fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    pub(super) fn records(&self) -> Vec<Value> {
        self.records.lock().expect("records mutex poisoned").clone()
    }

    pub(super) fn fail_next_read(&self, error: BackendError) {
        self.read_failures
            .lock()
            .expect("failure mutex poisoned")
            .push_back(error);
    }

    pub(super) fn fail_next_action(&self, error: BackendError) {
        self.action_failures
            .lock()
            .expect("failure mutex poisoned")
            .push_back(error);
    }

    pub(super) fn script_read(&self, read: ScriptedRead) {
        self.scripted_reads
            .lock()
            .expect("script mutex poisoned")
            .push_back(read);
    }

    pub(super) fn set_loan_amount(&self, application_id: &str, amount: Value) {
        let mut records = self.records.lock().expect("records mutex poisoned");
        if let Some(record) = records
            .iter_mut()
            .find(|record| id_of(record) == application_id)
        {
            record["loanAmount"] = amount;
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("calls mutex poisoned").push(call);
    }

    async fn read(&self, scope: Option<&str>) -> Result<Value, BackendError> {
        if let Some(error) = self
            .read_failures
            .lock()
            .expect("failure mutex poisoned")
            .pop_front()
        {
            return Err(error);
        }

        let scripted = self
            .scripted_reads
            .lock()
            .expect("script mutex poisoned")
            .pop_front();
        if let Some(ScriptedRead { payload, gate }) = scripted {
            if let Some(gate) = gate {
                gate.await.ok();
            }
            return Ok(payload);
        }

        let records = self.records();
        Ok(Value::Array(
            records
                .into_iter()
                .filter(|record| match scope {
                    Some(user_id) => record["userId"].as_str() == Some(user_id),
                    None => true,
                })
                .collect(),
        ))
    }

    fn take_action_failure(&self) -> Option<BackendError> {
        self.action_failures
            .lock()
            .expect("failure mutex poisoned")
            .pop_front()
    }

    fn status_of(&self, application_id: &ApplicationId) -> Option<String> {
        self.records()
            .iter()
            .find(|record| id_of(record) == application_id.as_str())
            .and_then(|record| record["status"].as_str().map(str::to_string))
    }
}

#[async_trait]
impl LoanBackend for FakeLoanStore {
    async fn all_applications(&self) -> Result<Value, BackendError> {
        self.record(Call::All);
        self.read(None).await
    }

    async fn user_applications(&self, user_id: &str) -> Result<Value, BackendError> {
        self.record(Call::User(user_id.to_string()));
        self.read(Some(user_id)).await
    }

    async fn update_status(
        &self,
        application_id: &ApplicationId,
        decision: LoanDecision,
    ) -> Result<(), BackendError> {
        self.record(Call::UpdateStatus(application_id.clone(), decision));
        if let Some(error) = self.take_action_failure() {
            return Err(error);
        }

        match self.status_of(application_id).as_deref() {
            Some("PENDING") => {}
            Some(_) => return Err(status_error(400, "Only pending applications can be updated")),
            None => return Err(status_error(404, "Application not found")),
        }

        let mut records = self.records.lock().expect("records mutex poisoned");
        if let Some(record) = records
            .iter_mut()
            .find(|record| id_of(record) == application_id.as_str())
        {
            record["status"] = json!(decision.as_str());
        }
        Ok(())
    }

    async fn disburse(
        &self,
        application_id: &ApplicationId,
        amount: f64,
    ) -> Result<(), BackendError> {
        self.record(Call::Disburse(application_id.clone(), amount));
        if let Some(error) = self.take_action_failure() {
            return Err(error);
        }

        match self.status_of(application_id).as_deref() {
            Some("APPROVED") => Ok(()),
            Some(_) => Err(status_error(400, "Loan must be approved before disbursement")),
            None => Err(status_error(404, "Application not found")),
        }
    }

    async fn apply(&self, user_id: &str, submission: &LoanSubmission) -> Result<(), BackendError> {
        self.record(Call::Apply {
            user_id: user_id.to_string(),
            name: submission.name.clone(),
        });
        if let Some(error) = self.take_action_failure() {
            return Err(error);
        }

        let id = {
            let mut next = self.next_id.lock().expect("id mutex poisoned");
            *next += 1;
            *next
        };
        self.records
            .lock()
            .expect("records mutex poisoned")
            .push(json!({
                "applicationId": id,
                "userId": user_id,
                "name": submission.name,
                "profession": submission.profession,
                "purpose": submission.purpose,
                "loanAmount": submission.loan_amount,
                "creditScore": submission.credit_score,
                "status": "PENDING"
            }));
        Ok(())
    }
}

fn id_of(record: &Value) -> String {
    match &record["applicationId"] {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

pub(super) fn status_error(status: u16, message: &str) -> BackendError {
    BackendError::Status {
        url: "http://loan-store.test".to_string(),
        status,
        message: Some(message.to_string()),
    }
}

pub(super) fn bare_status_error(status: u16) -> BackendError {
    BackendError::Status {
        url: "http://loan-store.test".to_string(),
        status,
        message: None,
    }
}

pub(super) fn record(
    id: u64,
    user_id: &str,
    name: &str,
    purpose: &str,
    amount: Value,
    status: &str,
) -> Value {
    json!({
        "applicationId": id,
        "userId": user_id,
        "name": name,
        "profession": "Engineer",
        "purpose": purpose,
        "loanAmount": amount,
        "creditScore": 720,
        "status": status
    })
}

/// The two-applicant set used throughout the dashboard scenarios.
pub(super) fn alice_and_bob() -> Vec<Value> {
    vec![
        record(1, "u-alice", "Alice", "Home", json!("1000"), "PENDING"),
        record(2, "u-bob", "Bob", "Home", json!("2000"), "APPROVED"),
    ]
}

pub(super) fn repository_over(
    store: FakeLoanStore,
) -> (
    Arc<FakeLoanStore>,
    Arc<ApplicationRepository<FakeLoanStore>>,
    Arc<NotificationLog>,
) {
    let store = Arc::new(store);
    let notifications = Arc::new(NotificationLog::default());
    let repository = Arc::new(ApplicationRepository::new(
        store.clone(),
        notifications.clone(),
    ));
    (store, repository, notifications)
}
