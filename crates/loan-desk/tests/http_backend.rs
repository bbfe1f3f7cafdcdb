use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use loan_desk::dashboard::{
    ActionDispatcher, ApplicationId, ApplicationRepository, Attachment, Dashboard,
    DashboardError, HttpLoanBackend, LoanDecision, LoanStatus, LoanSubmission, NotificationLog,
    Session, StatusFilter,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Debug, Clone, PartialEq)]
enum Received {
    ReadAll,
    ReadUser(String),
    UpdateStatus { id: String, status: Option<String> },
    Disburse { id: String, amount: Option<String> },
    Apply(Vec<FormPart>),
}

#[derive(Debug, Clone, PartialEq)]
struct FormPart {
    name: String,
    file_name: Option<String>,
    body: String,
}

#[derive(Clone, Default)]
struct StubState {
    records: Arc<Mutex<Vec<Value>>>,
    received: Arc<Mutex<Vec<Received>>>,
}

impl StubState {
    fn push(&self, received: Received) {
        self.received.lock().expect("stub mutex").push(received);
    }

    fn received(&self) -> Vec<Received> {
        self.received.lock().expect("stub mutex").clone()
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Application not found" })),
    )
        .into_response()
}

async fn all_loans(State(state): State<StubState>) -> Json<Value> {
    state.push(Received::ReadAll);
    Json(Value::Array(state.records.lock().expect("stub mutex").clone()))
}

async fn user_loans(
    State(state): State<StubState>,
    Path(user_id): Path<String>,
) -> Json<Value> {
    state.push(Received::ReadUser(user_id.clone()));
    let own = state
        .records
        .lock()
        .expect("stub mutex")
        .iter()
        .filter(|record| record["userId"] == user_id.as_str())
        .cloned()
        .collect();
    Json(Value::Array(own))
}

async fn update_status(
    State(state): State<StubState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let status = params.get("status").cloned();
    state.push(Received::UpdateStatus {
        id: id.clone(),
        status: status.clone(),
    });

    let mut records = state.records.lock().expect("stub mutex");
    match records
        .iter_mut()
        .find(|record| record["applicationId"].to_string() == id)
    {
        Some(record) => {
            record["status"] = json!(status);
            StatusCode::OK.into_response()
        }
        None => not_found(),
    }
}

async fn disburse(
    State(state): State<StubState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> StatusCode {
    state.push(Received::Disburse {
        id,
        amount: params.get("amount").cloned(),
    });
    StatusCode::OK
}

async fn apply(State(state): State<StubState>, mut multipart: Multipart) -> StatusCode {
    let mut parts = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let body = field.text().await.unwrap_or_default();
        parts.push(FormPart {
            name,
            file_name,
            body,
        });
    }
    state.push(Received::Apply(parts));
    StatusCode::CREATED
}

async fn spawn_loan_service(records: Vec<Value>) -> (String, StubState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let addr = listener.local_addr().expect("stub address");
    let state = StubState {
        records: Arc::new(Mutex::new(records)),
        ..StubState::default()
    };
    let app = Router::new()
        .route("/api/loans/all", get(all_loans))
        .route("/api/loans/user/:user_id", get(user_loans))
        .route("/api/loans/update-status/:id", put(update_status))
        .route("/api/disbursements/disburse/:id", post(disburse))
        .route("/api/loans/apply", post(apply))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), state)
}

fn seeded_records() -> Vec<Value> {
    vec![
        json!({
            "applicationId": 1,
            "userId": "u-alice",
            "name": "Alice",
            "profession": "Architect",
            "purpose": "Home",
            "loanAmount": "1000",
            "creditScore": 710,
            "status": "PENDING"
        }),
        json!({
            "applicationId": 2,
            "userId": "u-bob",
            "name": "Bob",
            "profession": "Pilot",
            "purpose": "Home",
            "loanAmount": 2000,
            "creditScore": "640",
            "status": "APPROVED"
        }),
    ]
}

fn wire(
    base_url: &str,
) -> (
    Arc<ApplicationRepository<HttpLoanBackend>>,
    Arc<NotificationLog>,
) {
    let backend = Arc::new(HttpLoanBackend::with_client(reqwest::Client::new(), base_url));
    let notifications = Arc::new(NotificationLog::default());
    let repository = Arc::new(ApplicationRepository::new(backend, notifications.clone()));
    (repository, notifications)
}

#[tokio::test]
async fn admin_dashboard_reads_all_applications_over_http() {
    let (base_url, stub) = spawn_loan_service(seeded_records()).await;
    let (repository, _) = wire(&base_url);
    let mut dashboard = Dashboard::new(Session::admin("admin-1"), repository);

    dashboard.refresh().await.expect("load over http");
    dashboard.set_status_filter(StatusFilter::Approved);
    let view = dashboard.view().await;

    assert_eq!(stub.received(), vec![Received::ReadAll]);
    assert_eq!(view.derived.status_counts.total(), 2);
    assert_eq!(view.derived.purpose_totals[0].amount, 3000.0);
    assert_eq!(view.derived.filtered.len(), 1);
    assert_eq!(view.derived.filtered[0].credit_score, 640);
}

#[tokio::test]
async fn applicant_dashboard_reads_only_own_applications() {
    let (base_url, stub) = spawn_loan_service(seeded_records()).await;
    let (repository, _) = wire(&base_url);
    let dashboard = Dashboard::new(Session::applicant("u-alice"), repository);

    let snapshot = dashboard.refresh().await.expect("load over http");

    assert_eq!(stub.received(), vec![Received::ReadUser("u-alice".to_string())]);
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].name, "Alice");
    assert_eq!(dashboard.view().await.title, "My Loan Dashboard");
}

#[tokio::test]
async fn approval_and_disbursement_send_expected_query_parameters() {
    let (base_url, stub) = spawn_loan_service(seeded_records()).await;
    let (repository, notifications) = wire(&base_url);
    let session = Session::admin("admin-1");
    repository.load(&session).await.expect("initial load");
    let dispatcher = ActionDispatcher::new(session, repository.clone(), notifications.clone());

    dispatcher
        .update_status(&ApplicationId::new("1"), LoanDecision::Approved)
        .await
        .expect("approval accepted");
    dispatcher
        .disburse(&ApplicationId::new("2"))
        .await
        .expect("disbursement accepted");

    assert_eq!(
        stub.received(),
        vec![
            Received::ReadAll,
            Received::UpdateStatus {
                id: "1".to_string(),
                status: Some("APPROVED".to_string())
            },
            Received::ReadAll,
            Received::Disburse {
                id: "2".to_string(),
                amount: Some("2000".to_string())
            },
            Received::ReadAll,
        ]
    );
    let alice = repository
        .find(&ApplicationId::new("1"))
        .await
        .expect("alice listed");
    assert_eq!(alice.status, LoanStatus::Approved);
    assert_eq!(
        notifications.messages(),
        vec!["Application approved!".to_string(), "Loan disbursed!".to_string()]
    );
}

#[tokio::test]
async fn server_error_message_reaches_the_notification() {
    let (base_url, _stub) = spawn_loan_service(seeded_records()).await;
    let (repository, notifications) = wire(&base_url);
    let dispatcher =
        ActionDispatcher::new(Session::admin("admin-1"), repository, notifications.clone());

    let err = dispatcher
        .update_status(&ApplicationId::new("999"), LoanDecision::Rejected)
        .await
        .expect_err("unknown application");

    match &err {
        DashboardError::Network {
            message, status, ..
        } => {
            assert_eq!(message, "Application not found");
            assert_eq!(*status, Some(404));
        }
        other => panic!("expected network error, got {other:?}"),
    }
    assert_eq!(
        notifications.messages(),
        vec!["Application not found".to_string()]
    );
}

#[tokio::test]
async fn submission_is_sent_as_multipart_form() {
    let (base_url, stub) = spawn_loan_service(Vec::new()).await;
    let (repository, notifications) = wire(&base_url);
    let dispatcher =
        ActionDispatcher::new(Session::applicant("u-carol"), repository, notifications.clone());

    let submission = LoanSubmission {
        name: "Carol".to_string(),
        profession: "Nurse".to_string(),
        purpose: "Education".to_string(),
        loan_amount: 4500.0,
        credit_score: 690,
        pf_account_pdf: Some(Attachment::pdf("pf.pdf", b"pf-statement".to_vec())),
        salary_slip: Some(Attachment::pdf("slip.pdf", b"salary-slip".to_vec())),
    };
    dispatcher
        .submit_application(&submission)
        .await
        .expect("submission accepted");

    let received = stub.received();
    assert_eq!(received.len(), 2);
    let Received::Apply(parts) = &received[0] else {
        panic!("expected multipart submission, got {:?}", received[0]);
    };
    let field = |name: &str| {
        parts
            .iter()
            .find(|part| part.name == name)
            .unwrap_or_else(|| panic!("missing form field {name}"))
    };
    assert_eq!(field("name").body, "Carol");
    assert_eq!(field("profession").body, "Nurse");
    assert_eq!(field("purpose").body, "Education");
    assert_eq!(field("loanAmount").body, "4500");
    assert_eq!(field("creditScore").body, "690");
    assert_eq!(field("userId").body, "u-carol");
    assert_eq!(field("pfAccountPdf").file_name.as_deref(), Some("pf.pdf"));
    assert_eq!(field("pfAccountPdf").body, "pf-statement");
    assert_eq!(field("salarySlip").file_name.as_deref(), Some("slip.pdf"));
    assert_eq!(received[1], Received::ReadUser("u-carol".to_string()));
    assert_eq!(
        notifications.messages(),
        vec!["Application submitted successfully!".to_string()]
    );
}

#[tokio::test]
async fn identifiers_cannot_escape_their_path_segment() {
    let (base_url, stub) = spawn_loan_service(seeded_records()).await;
    let (repository, notifications) = wire(&base_url);

    let snapshot = repository
        .load(&Session::applicant("../all"))
        .await
        .expect("scoped load");
    assert!(snapshot.is_empty(), "applicant scope must not widen to every record");

    let dispatcher =
        ActionDispatcher::new(Session::admin("admin-1"), repository, notifications.clone());
    for raw in ["1?status=REJECTED", "7/8"] {
        let err = dispatcher
            .update_status(&ApplicationId::new(raw), LoanDecision::Approved)
            .await
            .expect_err("no application carries that id");
        assert_eq!(err.notification_message(), "Application not found");
    }

    assert_eq!(
        stub.received(),
        vec![
            Received::ReadUser("../all".to_string()),
            Received::UpdateStatus {
                id: "1?status=REJECTED".to_string(),
                status: Some("APPROVED".to_string())
            },
            Received::UpdateStatus {
                id: "7/8".to_string(),
                status: Some("APPROVED".to_string())
            },
        ]
    );
}
