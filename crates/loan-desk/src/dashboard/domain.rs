use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::DataIntegrityError;

/// Identifier assigned by the backing store to every submitted application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a loan application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
}

impl LoanStatus {
    pub const fn ordered() -> [Self; 3] {
        [Self::Pending, Self::Approved, Self::Rejected]
    }

    /// Wire representation used by the backing store.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Status an administrator may move a pending application into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanDecision {
    Approved,
    Rejected,
}

impl LoanDecision {
    pub const fn status(self) -> LoanStatus {
        match self {
            Self::Approved => LoanStatus::Approved,
            Self::Rejected => LoanStatus::Rejected,
        }
    }

    pub const fn as_str(self) -> &'static str {
        self.status().as_str()
    }
}

/// One loan request as held in the dashboard's application set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanApplication {
    pub application_id: ApplicationId,
    pub name: String,
    pub profession: String,
    pub purpose: String,
    pub loan_amount: f64,
    pub credit_score: i64,
    pub status: LoanStatus,
}

/// Record shape as it arrives from the backing store. Every field is optional so that
/// validation can name exactly what is missing instead of failing the whole payload.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLoanApplication {
    #[serde(default)]
    application_id: Option<Value>,
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    profession: Option<Value>,
    #[serde(default)]
    purpose: Option<Value>,
    #[serde(default)]
    loan_amount: Option<Value>,
    #[serde(default)]
    credit_score: Option<Value>,
    #[serde(default)]
    status: Option<Value>,
}

/// Parse a backing-store response into the application set.
///
/// The payload must be a JSON array. Each element is validated independently and the first
/// failure aborts the parse, so aggregation never sees a partially trusted record.
pub fn parse_application_set(payload: Value) -> Result<Vec<LoanApplication>, DataIntegrityError> {
    let Value::Array(items) = payload else {
        return Err(DataIntegrityError::NotAnArray {
            found: json_kind(&payload),
        });
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| parse_application(index, item))
        .collect()
}

fn parse_application(index: usize, item: Value) -> Result<LoanApplication, DataIntegrityError> {
    if !item.is_object() {
        return Err(DataIntegrityError::MalformedRecord {
            index,
            reason: format!("expected an object, found {}", json_kind(&item)),
        });
    }

    let raw: RawLoanApplication =
        serde_json::from_value(item).map_err(|err| DataIntegrityError::MalformedRecord {
            index,
            reason: err.to_string(),
        })?;

    let application_id = identifier(index, "applicationId", raw.application_id)?;
    let record = RecordContext {
        index,
        application_id: &application_id,
    };

    let name = record.text("name", raw.name)?;
    let profession = record.text("profession", raw.profession)?;
    let purpose = record.text("purpose", raw.purpose)?;
    let loan_amount = record.amount(raw.loan_amount)?;
    let credit_score = record.integer("creditScore", raw.credit_score)?;

    let status_raw = record.text("status", raw.status)?;
    let status = LoanStatus::parse(&status_raw).ok_or_else(|| DataIntegrityError::UnknownStatus {
        application_id: application_id.clone(),
        raw: status_raw,
    })?;

    Ok(LoanApplication {
        application_id,
        name,
        profession,
        purpose,
        loan_amount,
        credit_score,
        status,
    })
}

fn identifier(
    index: usize,
    field: &'static str,
    value: Option<Value>,
) -> Result<ApplicationId, DataIntegrityError> {
    match value {
        Some(Value::String(raw)) if !raw.trim().is_empty() => Ok(ApplicationId(raw)),
        Some(Value::Number(number)) => Ok(ApplicationId(number.to_string())),
        Some(Value::String(_)) | Some(Value::Null) | None => {
            Err(DataIntegrityError::MissingField { index, field })
        }
        Some(other) => Err(DataIntegrityError::MalformedRecord {
            index,
            reason: format!("{field} must be a string or number, found {}", json_kind(&other)),
        }),
    }
}

struct RecordContext<'a> {
    index: usize,
    application_id: &'a ApplicationId,
}

impl RecordContext<'_> {
    fn missing(&self, field: &'static str) -> DataIntegrityError {
        DataIntegrityError::MissingField {
            index: self.index,
            field,
        }
    }

    fn invalid(&self, field: &'static str, raw: &Value) -> DataIntegrityError {
        DataIntegrityError::InvalidField {
            application_id: self.application_id.clone(),
            field,
            raw: raw.to_string(),
        }
    }

    fn text(&self, field: &'static str, value: Option<Value>) -> Result<String, DataIntegrityError> {
        match value {
            Some(Value::String(text)) => Ok(text),
            Some(Value::Null) | None => Err(self.missing(field)),
            Some(other) => Err(self.invalid(field, &other)),
        }
    }

    fn amount(&self, value: Option<Value>) -> Result<f64, DataIntegrityError> {
        let value = match value {
            Some(Value::Null) | None => return Err(self.missing("loanAmount")),
            Some(value) => value,
        };

        let parsed = match &value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        };

        match parsed {
            Some(amount) if amount.is_finite() && amount >= 0.0 => Ok(amount),
            Some(amount) if amount.is_finite() => Err(DataIntegrityError::NegativeAmount {
                application_id: self.application_id.clone(),
                amount,
            }),
            _ => Err(DataIntegrityError::NonNumericAmount {
                application_id: self.application_id.clone(),
                raw: value.to_string(),
            }),
        }
    }

    fn integer(&self, field: &'static str, value: Option<Value>) -> Result<i64, DataIntegrityError> {
        let value = match value {
            Some(Value::Null) | None => return Err(self.missing(field)),
            Some(value) => value,
        };

        let parsed = match &value {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse::<i64>().ok(),
            _ => None,
        };

        parsed.ok_or_else(|| self.invalid(field, &value))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A document attached to a new loan submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: mime::Mime,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn pdf(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: mime::APPLICATION_PDF,
            bytes,
        }
    }
}

/// Applicant-entered form values for `POST /api/loans/apply`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanSubmission {
    pub name: String,
    pub profession: String,
    pub purpose: String,
    pub loan_amount: f64,
    pub credit_score: i64,
    pub pf_account_pdf: Option<Attachment>,
    pub salary_slip: Option<Attachment>,
}
