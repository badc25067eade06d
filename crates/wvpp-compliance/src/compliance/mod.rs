//! Organization compliance score: four pillars, alerts, and upcoming deadlines.

pub mod router;
pub mod score;
pub mod service;

pub use router::compliance_router;
pub use score::{
    score, AlertCode, AlertSeverity, ComplianceAlert, ComplianceDeadline, ComplianceScore,
    ComplianceSnapshot, DeadlineKind, PillarScores, DEADLINE_WINDOW_DAYS,
    REVIEW_GRACE_MONTHS,
};
pub use service::{ComplianceService, ComplianceServiceError};
