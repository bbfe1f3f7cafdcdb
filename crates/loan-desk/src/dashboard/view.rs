use std::sync::Arc;

use serde::Serialize;

use super::aggregation::{
    purpose_totals, PlaceholderTrend, PortfolioTotals, PurposeTotal, StatusCounts, StatusSlice,
    TrendPoint, TrendSource,
};
use super::backend::LoanBackend;
use super::domain::LoanApplication;
use super::error::DashboardError;
use super::filter::{StatusFilter, ViewQuery};
use super::repository::{ApplicationRepository, ApplicationSnapshot};
use super::session::Session;

/// Everything the view derives from the application set and the current query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedView {
    pub status_counts: StatusCounts,
    pub status_slices: Vec<StatusSlice>,
    pub purpose_totals: Vec<PurposeTotal>,
    pub totals: PortfolioTotals,
    pub filtered: Vec<LoanApplication>,
}

impl DerivedView {
    /// Aggregates cover the whole set; only `filtered` honours the query.
    pub fn derive(applications: &[LoanApplication], query: &ViewQuery) -> Self {
        let status_counts = StatusCounts::tally(applications);
        Self {
            status_counts,
            status_slices: status_counts.slices(),
            purpose_totals: purpose_totals(applications),
            totals: PortfolioTotals::compute(applications),
            filtered: query.apply(applications).into_iter().cloned().collect(),
        }
    }
}

/// Render model handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub title: &'static str,
    pub user_name: String,
    pub loading: bool,
    pub error: Option<String>,
    pub search: String,
    pub status_filter: StatusFilter,
    pub derived: DerivedView,
    pub trend: Vec<TrendPoint>,
}

/// Holds the view inputs and produces render models over the repository's snapshot.
pub struct Dashboard<B> {
    session: Session,
    repository: Arc<ApplicationRepository<B>>,
    query: ViewQuery,
    trend: Box<dyn TrendSource>,
}

impl<B> Dashboard<B>
where
    B: LoanBackend + 'static,
{
    pub fn new(session: Session, repository: Arc<ApplicationRepository<B>>) -> Self {
        Self {
            session,
            repository,
            query: ViewQuery::default(),
            trend: Box::new(PlaceholderTrend),
        }
    }

    pub fn with_trend_source(mut self, trend: Box<dyn TrendSource>) -> Self {
        self.trend = trend;
        self
    }

    pub fn title(&self) -> &'static str {
        if self.session.is_admin() {
            "Admin Dashboard"
        } else {
            "My Loan Dashboard"
        }
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.query.search = search.into();
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) {
        self.query.status = status;
    }

    pub fn query(&self) -> &ViewQuery {
        &self.query
    }

    /// Initial load. Failures are never retried automatically.
    pub async fn refresh(&self) -> Result<ApplicationSnapshot, DashboardError> {
        self.repository.load(&self.session).await
    }

    /// User-initiated reload after a failed or stale view.
    pub async fn retry(&self) -> Result<ApplicationSnapshot, DashboardError> {
        self.refresh().await
    }

    pub async fn view(&self) -> DashboardView {
        let state = self.repository.load_state().await;
        DashboardView {
            title: self.title(),
            user_name: self.session.display_name().to_string(),
            loading: state.loading,
            error: state.last_error,
            search: self.query.search.clone(),
            status_filter: self.query.status,
            derived: DerivedView::derive(&state.applications, &self.query),
            trend: self.trend.series(&state.applications),
        }
    }
}
