use std::io::Write;

use serde::Serialize;

use super::domain::LoanApplication;

const HEADER: [&str; 7] = [
    "application_id",
    "name",
    "profession",
    "purpose",
    "loan_amount",
    "credit_score",
    "status",
];

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    application_id: &'a str,
    name: &'a str,
    profession: &'a str,
    purpose: &'a str,
    loan_amount: f64,
    credit_score: i64,
    status: &'static str,
}

/// Write applications as CSV, one row per record, in the given order. The header row is
/// always written, even for an empty view.
pub fn write_csv<'a, W, I>(writer: W, applications: I) -> Result<(), csv::Error>
where
    W: Write,
    I: IntoIterator<Item = &'a LoanApplication>,
{
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(HEADER)?;
    for application in applications {
        csv_writer.serialize(ExportRow {
            application_id: application.application_id.as_str(),
            name: &application.name,
            profession: &application.profession,
            purpose: &application.purpose,
            loan_amount: application.loan_amount,
            credit_score: application.credit_score,
            status: application.status.as_str(),
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}
