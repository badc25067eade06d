//! Due-date arithmetic and the scheduled reminder tick.

pub mod dispatcher;
pub mod router;
pub mod schedule;

pub use dispatcher::{
    collect_due_reminders, DeliveryStatus, DueReminder, Notifier, NotifierError,
    ReminderDetail, ReminderDispatcher, ReminderNotification, ReminderTickError,
    ReminderTickReport,
};
pub use router::{reminder_router, ReminderEndpoint};
pub use schedule::{
    is_incident_followup_day, is_overdue_reminder_day, is_reminder_day, next_annual_due_date,
    ReminderKind, ANNUAL_REVIEW_THRESHOLDS, TRAINING_DUE_THRESHOLDS,
};
