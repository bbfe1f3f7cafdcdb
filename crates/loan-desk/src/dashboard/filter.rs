use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::domain::{LoanApplication, LoanStatus};

/// Status predicate selected in the filter menu.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Approved,
    Rejected,
}

impl StatusFilter {
    pub const fn ordered() -> [Self; 4] {
        [Self::All, Self::Pending, Self::Approved, Self::Rejected]
    }

    pub fn matches(self, status: LoanStatus) -> bool {
        match self {
            Self::All => true,
            Self::Pending => status == LoanStatus::Pending,
            Self::Approved => status == LoanStatus::Approved,
            Self::Rejected => status == LoanStatus::Rejected,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All Statuses",
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ordered()
            .into_iter()
            .find(|filter| filter.as_str().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| {
                format!("unknown status filter '{raw}' (expected ALL, PENDING, APPROVED or REJECTED)")
            })
    }
}

/// Search text and status selection forwarded from the view.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    pub search: String,
    pub status: StatusFilter,
}

impl ViewQuery {
    pub fn new(search: impl Into<String>, status: StatusFilter) -> Self {
        Self {
            search: search.into(),
            status,
        }
    }

    pub fn matches(&self, application: &LoanApplication) -> bool {
        self.status.matches(application.status) && matches_search(application, &self.search)
    }

    pub fn apply<'a, I>(&self, applications: I) -> Vec<&'a LoanApplication>
    where
        I: IntoIterator<Item = &'a LoanApplication>,
    {
        filter_applications(applications, &self.search, self.status)
    }
}

/// Order-preserving subsequence of `applications` passing both the status predicate and a
/// case-insensitive substring match of `search` against name or purpose.
pub fn filter_applications<'a, I>(
    applications: I,
    search: &str,
    status: StatusFilter,
) -> Vec<&'a LoanApplication>
where
    I: IntoIterator<Item = &'a LoanApplication>,
{
    let needle = search.to_lowercase();
    applications
        .into_iter()
        .filter(|application| status.matches(application.status))
        .filter(|application| contains_needle(application, &needle))
        .collect()
}

fn matches_search(application: &LoanApplication, search: &str) -> bool {
    contains_needle(application, &search.to_lowercase())
}

fn contains_needle(application: &LoanApplication, needle: &str) -> bool {
    needle.is_empty()
        || application.name.to_lowercase().contains(needle)
        || application.purpose.to_lowercase().contains(needle)
}
