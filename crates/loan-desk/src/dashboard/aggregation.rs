use std::collections::HashMap;

use chrono::Month;
use serde::Serialize;

use super::domain::{LoanApplication, LoanStatus};

/// Application tally per status. Every bucket exists and defaults to zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl StatusCounts {
    pub fn tally<'a, I>(applications: I) -> Self
    where
        I: IntoIterator<Item = &'a LoanApplication>,
    {
        applications
            .into_iter()
            .fold(Self::default(), |mut counts, application| {
                *counts.bucket_mut(application.status) += 1;
                counts
            })
    }

    pub fn get(&self, status: LoanStatus) -> usize {
        match status {
            LoanStatus::Pending => self.pending,
            LoanStatus::Approved => self.approved,
            LoanStatus::Rejected => self.rejected,
        }
    }

    fn bucket_mut(&mut self, status: LoanStatus) -> &mut usize {
        match status {
            LoanStatus::Pending => &mut self.pending,
            LoanStatus::Approved => &mut self.approved,
            LoanStatus::Rejected => &mut self.rejected,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.approved + self.rejected
    }

    /// Proportion-chart input. Empty buckets are left out rather than drawn as zero slices.
    pub fn slices(&self) -> Vec<StatusSlice> {
        LoanStatus::ordered()
            .into_iter()
            .filter_map(|status| {
                let count = self.get(status);
                (count > 0).then_some(StatusSlice {
                    status,
                    label: status.label(),
                    count,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSlice {
    pub status: LoanStatus,
    pub label: &'static str,
    pub count: usize,
}

/// Summed loan amount for one purpose.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurposeTotal {
    pub purpose: String,
    pub amount: f64,
}

/// Group by exact purpose text and sum amounts, keeping groups in first-seen order.
pub fn purpose_totals<'a, I>(applications: I) -> Vec<PurposeTotal>
where
    I: IntoIterator<Item = &'a LoanApplication>,
{
    let mut positions: HashMap<&'a str, usize> = HashMap::new();
    let mut totals: Vec<PurposeTotal> = Vec::new();

    for application in applications {
        match positions.get(application.purpose.as_str()) {
            Some(&position) => totals[position].amount += application.loan_amount,
            None => {
                positions.insert(application.purpose.as_str(), totals.len());
                totals.push(PurposeTotal {
                    purpose: application.purpose.clone(),
                    amount: application.loan_amount,
                });
            }
        }
    }

    totals
}

/// Headline figures shown above the charts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct PortfolioTotals {
    pub applications: usize,
    pub requested_amount: f64,
    pub approved_amount: f64,
}

impl PortfolioTotals {
    pub fn compute<'a, I>(applications: I) -> Self
    where
        I: IntoIterator<Item = &'a LoanApplication>,
    {
        applications
            .into_iter()
            .fold(Self::default(), |mut totals, application| {
                totals.applications += 1;
                totals.requested_amount += application.loan_amount;
                if application.status == LoanStatus::Approved {
                    totals.approved_amount += application.loan_amount;
                }
                totals
            })
    }
}

/// One point of the applications-over-time chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub month: &'static str,
    pub applications: u32,
    pub approved: u32,
}

/// Source of the trend chart series.
///
/// Application records carry no timestamps yet, so the shipped source is illustrative.
/// A source that buckets real submission dates can be swapped in without touching the
/// rest of the dashboard.
pub trait TrendSource: Send + Sync {
    fn series(&self, applications: &[LoanApplication]) -> Vec<TrendPoint>;
}

/// Fixed six-month illustration; ignores its input.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderTrend;

const PLACEHOLDER_SERIES: [(Month, u32, u32); 6] = [
    (Month::January, 12, 8),
    (Month::February, 18, 12),
    (Month::March, 15, 10),
    (Month::April, 22, 16),
    (Month::May, 19, 14),
    (Month::June, 25, 18),
];

impl TrendSource for PlaceholderTrend {
    fn series(&self, _applications: &[LoanApplication]) -> Vec<TrendPoint> {
        PLACEHOLDER_SERIES
            .iter()
            .map(|&(month, applications, approved)| TrendPoint {
                month: short_month(month),
                applications,
                approved,
            })
            .collect()
    }
}

fn short_month(month: Month) -> &'static str {
    &month.name()[..3]
}
