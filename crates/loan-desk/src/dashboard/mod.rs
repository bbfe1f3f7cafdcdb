//! Loan review dashboard core: application loading, derived statistics, filtering, and
//! administrator actions against the loan service.
//!
//! The presentation layer owns nothing here. It constructs a [`Dashboard`] and an
//! [`ActionDispatcher`] around a shared [`ApplicationRepository`], forwards search text,
//! status selections, and action intents, and renders the [`DashboardView`] it gets back.

pub mod aggregation;
pub mod backend;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod export;
pub mod filter;
pub mod notify;
pub mod repository;
pub mod session;
pub mod view;

#[cfg(test)]
mod tests;

pub use aggregation::{
    purpose_totals, PlaceholderTrend, PortfolioTotals, PurposeTotal, StatusCounts, StatusSlice,
    TrendPoint, TrendSource,
};
pub use backend::{BackendError, HttpLoanBackend, LoanBackend};
pub use dispatcher::ActionDispatcher;
pub use domain::{
    parse_application_set, ApplicationId, Attachment, LoanApplication, LoanDecision, LoanStatus,
    LoanSubmission,
};
pub use error::{DashboardError, DataIntegrityError};
pub use export::write_csv;
pub use filter::{filter_applications, StatusFilter, ViewQuery};
pub use notify::{Notification, NotificationLevel, NotificationLog, Notifier, SilentNotifier};
pub use repository::{ApplicationRepository, ApplicationSnapshot, LoadScope, LoadState};
pub use session::{FileStore, KeyValueStore, MemoryStore, Role, Session, SESSION_STORAGE_KEY};
pub use view::{Dashboard, DashboardView, DerivedView};
