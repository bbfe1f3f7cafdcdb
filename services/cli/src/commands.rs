use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use loan_desk::config::AppConfig;
use loan_desk::dashboard::{
    write_csv, ActionDispatcher, ApplicationId, ApplicationRepository, Attachment, Dashboard,
    FileStore, HttpLoanBackend, KeyValueStore, LoanDecision, LoanSubmission, Notifier, Session,
    SilentNotifier, ViewQuery, SESSION_STORAGE_KEY,
};
use loan_desk::error::AppError;
use tracing::info;

use crate::cli::{ApplyArgs, ExportArgs, QueryArgs, TargetArgs};
use crate::render::{render_applications, render_summary, ConsoleNotifier};

type Repository = Arc<ApplicationRepository<HttpLoanBackend>>;

/// Resolved configuration plus the session read once from the session file.
pub(crate) struct Context {
    config: AppConfig,
    store: FileStore,
    session: Session,
}

impl Context {
    pub(crate) fn new(config: AppConfig) -> Self {
        let store = FileStore::new(config.session.file.clone());
        let session = Session::from_store(&store);
        Self {
            config,
            store,
            session,
        }
    }

    fn repository(&self, notifier: Arc<dyn Notifier>) -> Result<Repository, AppError> {
        let backend = Arc::new(HttpLoanBackend::new(&self.config.backend)?);
        Ok(Arc::new(ApplicationRepository::new(backend, notifier)))
    }

    fn dispatcher(&self) -> Result<(Repository, ActionDispatcher<HttpLoanBackend>), AppError> {
        let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
        let repository = self.repository(notifier.clone())?;
        let dispatcher = ActionDispatcher::new(self.session.clone(), repository.clone(), notifier);
        Ok((repository, dispatcher))
    }
}

pub(crate) async fn summary(context: &Context) -> Result<(), AppError> {
    let repository = context.repository(Arc::new(ConsoleNotifier))?;
    let dashboard = Dashboard::new(context.session.clone(), repository);
    dashboard.refresh().await?;
    render_summary(&dashboard.view().await);
    Ok(())
}

pub(crate) async fn list(context: &Context, args: QueryArgs) -> Result<(), AppError> {
    let repository = context.repository(Arc::new(ConsoleNotifier))?;
    let mut dashboard = Dashboard::new(context.session.clone(), repository);
    dashboard.set_search(args.search);
    dashboard.set_status_filter(args.status);
    dashboard.refresh().await?;
    render_applications(&dashboard.view().await);
    Ok(())
}

pub(crate) async fn approve(context: &Context, args: TargetArgs) -> Result<(), AppError> {
    decide(context, args, LoanDecision::Approved).await
}

pub(crate) async fn reject(context: &Context, args: TargetArgs) -> Result<(), AppError> {
    decide(context, args, LoanDecision::Rejected).await
}

async fn decide(context: &Context, args: TargetArgs, decision: LoanDecision) -> Result<(), AppError> {
    let (_, dispatcher) = context.dispatcher()?;
    dispatcher
        .update_status(&ApplicationId::new(args.id), decision)
        .await?;
    Ok(())
}

pub(crate) async fn disburse(context: &Context, args: TargetArgs) -> Result<(), AppError> {
    let (repository, dispatcher) = context.dispatcher()?;
    // The amount comes from the loaded set, so load it before acting.
    repository.load(&context.session).await?;
    dispatcher.disburse(&ApplicationId::new(args.id)).await?;
    Ok(())
}

pub(crate) async fn apply(context: &Context, args: ApplyArgs) -> Result<(), AppError> {
    let submission = LoanSubmission {
        name: args.name,
        profession: args.profession,
        purpose: args.purpose,
        loan_amount: args.amount,
        credit_score: args.credit_score,
        pf_account_pdf: args.pf_account_pdf.as_deref().map(read_attachment).transpose()?,
        salary_slip: args.salary_slip.as_deref().map(read_attachment).transpose()?,
    };

    let (_, dispatcher) = context.dispatcher()?;
    dispatcher.submit_application(&submission).await?;
    Ok(())
}

pub(crate) async fn export(context: &Context, args: ExportArgs) -> Result<(), AppError> {
    let repository = context.repository(Arc::new(SilentNotifier))?;
    let snapshot = repository.load(&context.session).await?;
    let query = ViewQuery::new(args.query.search, args.query.status);
    let rows = query.apply(snapshot.iter());

    let writer = BufWriter::new(File::create(&args.output)?);
    write_csv(writer, rows.iter().copied())?;
    info!(rows = rows.len(), path = %args.output.display(), "applications exported");
    println!(
        "Exported {} application(s) to {}",
        rows.len(),
        args.output.display()
    );
    Ok(())
}

pub(crate) fn logout(context: &Context) -> Result<(), AppError> {
    context.store.remove(SESSION_STORAGE_KEY)?;
    info!(path = %context.store.path().display(), "session cleared");
    println!("Signed out");
    Ok(())
}

fn read_attachment(path: &Path) -> Result<Attachment, AppError> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("attachment.pdf")
        .to_string();
    let content_type = mime_guess::from_path(path)
        .first()
        .unwrap_or(mime::APPLICATION_PDF);
    Ok(Attachment {
        file_name,
        content_type,
        bytes,
    })
}
