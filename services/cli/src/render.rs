use loan_desk::dashboard::{DashboardView, Notification, NotificationLevel, Notifier};

/// Prints notifications as they are raised: successes to stdout, errors to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => println!("[ok] {}", notification.message),
            NotificationLevel::Error => eprintln!("[error] {}", notification.message),
        }
    }
}

pub(crate) fn render_summary(view: &DashboardView) {
    println!("{} ({})", view.title, view.user_name);
    if let Some(error) = &view.error {
        println!("Last load failed: {error}");
    }

    let derived = &view.derived;
    println!(
        "\n{} applications | {:.2} requested | {:.2} approved",
        derived.totals.applications, derived.totals.requested_amount, derived.totals.approved_amount
    );

    if derived.status_slices.is_empty() {
        println!("\nStatus breakdown: no applications");
    } else {
        println!("\nStatus breakdown");
        for slice in &derived.status_slices {
            println!("- {}: {}", slice.label, slice.count);
        }
    }

    if !derived.purpose_totals.is_empty() {
        println!("\nLoan amount by purpose");
        for total in &derived.purpose_totals {
            println!("- {}: {:.2}", total.purpose, total.amount);
        }
    }

    println!("\nApplications trend");
    for point in &view.trend {
        println!(
            "- {}: {} submitted, {} approved",
            point.month, point.applications, point.approved
        );
    }
}

pub(crate) fn render_applications(view: &DashboardView) {
    println!(
        "{}: {} of {} applications (status {}, search '{}')",
        view.title,
        view.derived.filtered.len(),
        view.derived.status_counts.total(),
        view.status_filter.label(),
        view.search
    );

    if view.derived.filtered.is_empty() {
        println!("No applications match the current filters");
        return;
    }

    println!(
        "\n{:<8} {:<24} {:<16} {:<16} {:>12} {:>6}  {}",
        "ID", "Name", "Profession", "Purpose", "Amount", "Score", "Status"
    );
    for application in &view.derived.filtered {
        println!(
            "{:<8} {:<24} {:<16} {:<16} {:>12.2} {:>6}  {}",
            application.application_id.as_str(),
            application.name,
            application.profession,
            application.purpose,
            application.loan_amount,
            application.credit_score,
            application.status.label()
        );
    }
}
