use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::schedule::{employee_reminder, incident_reminder, plan_review_reminder, ReminderKind};
use crate::organization::{
    DirectoryError, Employee, Incident, Organization, OrganizationDirectory, OrganizationId,
};

/// Templated message handed to the notification transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderNotification {
    pub template: String,
    pub recipient: String,
    pub organization_id: OrganizationId,
    pub template_data: BTreeMap<String, String>,
}

/// Outbound notification transport (e-mail, SMS, ...).
pub trait Notifier: Send + Sync {
    fn send(&self, notification: &ReminderNotification) -> Result<(), NotifierError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("recipient rejected: {0}")]
    Rejected(String),
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// A reminder that is due today, before delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueReminder {
    /// Employee, organization, or incident identifier the reminder concerns.
    pub target: String,
    pub recipient: Option<String>,
    pub kind: ReminderKind,
    pub template_data: BTreeMap<String, String>,
}

/// Evaluate every reminder rule for one organization. Performs no I/O.
pub fn collect_due_reminders(
    organization: &Organization,
    employees: &[Employee],
    incidents: &[Incident],
    today: NaiveDate,
) -> Vec<DueReminder> {
    let mut due = Vec::new();

    for employee in employees {
        let Some(kind) = employee_reminder(employee, today) else {
            continue;
        };
        let mut data = base_data(organization);
        data.insert("employee_name".to_string(), employee.name.clone());
        if let Some(date) = employee.next_training_due_date {
            data.insert("due_date".to_string(), date.to_string());
        }
        insert_offset(&mut data, kind);
        due.push(DueReminder {
            target: employee.id.0.clone(),
            recipient: employee.email.clone(),
            kind,
            template_data: data,
        });
    }

    if let Some(kind) = plan_review_reminder(organization, today) {
        let mut data = base_data(organization);
        if let Some(date) = organization.next_plan_review_due_date {
            data.insert("due_date".to_string(), date.to_string());
        }
        insert_offset(&mut data, kind);
        due.push(DueReminder {
            target: organization.id.0.clone(),
            recipient: organization.contact_email.clone(),
            kind,
            template_data: data,
        });
    }

    for incident in incidents {
        let Some(kind) = incident_reminder(incident, today) else {
            continue;
        };
        let mut data = base_data(organization);
        data.insert("incident_summary".to_string(), incident.summary.clone());
        data.insert("occurred_on".to_string(), incident.occurred_on.to_string());
        data.insert(
            "investigation_status".to_string(),
            incident.investigation.label().to_string(),
        );
        insert_offset(&mut data, kind);
        due.push(DueReminder {
            target: incident.id.0.clone(),
            recipient: organization.contact_email.clone(),
            kind,
            template_data: data,
        });
    }

    due
}

fn base_data(organization: &Organization) -> BTreeMap<String, String> {
    let mut data = BTreeMap::new();
    data.insert("organization_name".to_string(), organization.name.clone());
    data
}

fn insert_offset(data: &mut BTreeMap<String, String>, kind: ReminderKind) {
    let (key, value) = match kind {
        ReminderKind::TrainingDue { days_until_due }
        | ReminderKind::PlanReviewDue { days_until_due } => ("days_until_due", days_until_due),
        ReminderKind::TrainingOverdue { days_overdue } => ("days_overdue", days_overdue),
        ReminderKind::IncidentFollowup {
            days_since_incident,
        } => ("days_since_incident", days_since_incident),
    };
    data.insert(key.to_string(), value.to_string());
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReminderDetail {
    pub organization_id: OrganizationId,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder: Option<ReminderKind>,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate outcome of one tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReminderTickReport {
    pub run_date: Option<NaiveDate>,
    pub organizations_scanned: usize,
    pub sent: usize,
    pub errors: usize,
    pub skipped: usize,
    pub details: Vec<ReminderDetail>,
}

impl ReminderTickReport {
    fn record(&mut self, detail: ReminderDetail) {
        match detail.status {
            DeliveryStatus::Sent => self.sent += 1,
            DeliveryStatus::Failed => self.errors += 1,
            DeliveryStatus::Skipped => self.skipped += 1,
        }
        self.details.push(detail);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReminderTickError {
    #[error("unable to page organizations: {0}")]
    Directory(#[from] DirectoryError),
}

/// Walks organizations page by page and delivers every reminder due on the run date.
///
/// Delivery is best effort: a failed recipient is counted and the run moves on. There are
/// no retries within a tick and no record of what earlier ticks sent, so running twice on
/// the same day sends twice.
pub struct ReminderDispatcher<D, N> {
    directory: Arc<D>,
    notifier: Arc<N>,
    page_size: usize,
}

impl<D, N> ReminderDispatcher<D, N>
where
    D: OrganizationDirectory + 'static,
    N: Notifier + 'static,
{
    pub fn new(directory: Arc<D>, notifier: Arc<N>, page_size: usize) -> Self {
        Self {
            directory,
            notifier,
            page_size: page_size.max(1),
        }
    }

    pub fn run_tick(&self, today: NaiveDate) -> Result<ReminderTickReport, ReminderTickError> {
        let mut report = ReminderTickReport {
            run_date: Some(today),
            ..ReminderTickReport::default()
        };
        let mut cursor: Option<OrganizationId> = None;

        loop {
            let page = self.directory.organizations(cursor.as_ref(), self.page_size)?;
            for organization in &page.organizations {
                report.organizations_scanned += 1;
                self.process_organization(organization, today, &mut report);
            }

            match page.next_cursor {
                Some(next) if cursor.as_ref() != Some(&next) => cursor = Some(next),
                _ => break,
            }
        }

        info!(
            run_date = %today,
            organizations = report.organizations_scanned,
            sent = report.sent,
            errors = report.errors,
            skipped = report.skipped,
            "reminder tick finished"
        );
        Ok(report)
    }

    fn process_organization(
        &self,
        organization: &Organization,
        today: NaiveDate,
        report: &mut ReminderTickReport,
    ) {
        let employees = match self.directory.employees(&organization.id) {
            Ok(employees) => employees,
            Err(err) => {
                warn!(organization = %organization.id, error = %err, "roster unavailable");
                report.record(lookup_failure(organization, "employees", &err));
                Vec::new()
            }
        };
        let incidents = match self.directory.incidents(&organization.id) {
            Ok(incidents) => incidents,
            Err(err) => {
                warn!(organization = %organization.id, error = %err, "incident log unavailable");
                report.record(lookup_failure(organization, "incidents", &err));
                Vec::new()
            }
        };

        for due in collect_due_reminders(organization, &employees, &incidents, today) {
            report.record(self.deliver(organization, due));
        }
    }

    fn deliver(&self, organization: &Organization, due: DueReminder) -> ReminderDetail {
        let DueReminder {
            target,
            recipient,
            kind,
            template_data,
        } = due;

        let Some(recipient) = recipient.filter(|address| !address.trim().is_empty()) else {
            return ReminderDetail {
                organization_id: organization.id.clone(),
                target,
                recipient: None,
                reminder: Some(kind),
                status: DeliveryStatus::Skipped,
                error: Some("no recipient address on file".to_string()),
            };
        };

        let notification = ReminderNotification {
            template: kind.template().to_string(),
            recipient: recipient.clone(),
            organization_id: organization.id.clone(),
            template_data,
        };

        let (status, error) = match self.notifier.send(&notification) {
            Ok(()) => {
                info!(
                    organization = %organization.id,
                    target = %target,
                    template = kind.template(),
                    "reminder sent"
                );
                (DeliveryStatus::Sent, None)
            }
            Err(err) => {
                warn!(
                    organization = %organization.id,
                    target = %target,
                    template = kind.template(),
                    error = %err,
                    "reminder delivery failed"
                );
                (DeliveryStatus::Failed, Some(err.to_string()))
            }
        };

        ReminderDetail {
            organization_id: organization.id.clone(),
            target,
            recipient: Some(recipient),
            reminder: Some(kind),
            status,
            error,
        }
    }
}

fn lookup_failure(
    organization: &Organization,
    target: &str,
    err: &DirectoryError,
) -> ReminderDetail {
    ReminderDetail {
        organization_id: organization.id.clone(),
        target: target.to_string(),
        recipient: None,
        reminder: None,
        status: DeliveryStatus::Failed,
        error: Some(err.to_string()),
    }
}
