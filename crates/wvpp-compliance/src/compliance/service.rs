use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use super::score::{score, ComplianceScore, ComplianceSnapshot};
use crate::organization::{DirectoryError, Organization, OrganizationDirectory, OrganizationId};
use crate::reminders::schedule::next_annual_due_date;

#[derive(Debug, thiserror::Error)]
pub enum ComplianceServiceError {
    #[error("organization {0} not found")]
    OrganizationNotFound(OrganizationId),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Read-side compliance scoring plus the plan review write.
pub struct ComplianceService<D> {
    directory: Arc<D>,
}

impl<D> ComplianceService<D>
where
    D: OrganizationDirectory + 'static,
{
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }

    pub fn compute_compliance_score(
        &self,
        organization_id: &OrganizationId,
        today: NaiveDate,
    ) -> Result<ComplianceScore, ComplianceServiceError> {
        let organization = self.organization(organization_id)?;
        let snapshot = ComplianceSnapshot {
            active_plan: self.directory.active_plan(organization_id)?,
            employees: self.directory.employees(organization_id)?,
            incidents: self.directory.incidents(organization_id)?,
            pending_flagged_questions: self.directory.pending_flagged_questions(organization_id)?,
            new_anonymous_reports: self.directory.new_anonymous_reports(organization_id)?,
            organization,
        };

        let result = score(&snapshot, today);
        info!(
            organization = %organization_id,
            overall = result.overall,
            plan = result.pillars.plan,
            training = result.pillars.training,
            review = result.pillars.review,
            incident = result.pillars.incident,
            alerts = result.alerts.len(),
            "compliance score computed"
        );
        Ok(result)
    }

    /// Stamp a completed annual plan review and schedule the next one.
    pub fn record_plan_review(
        &self,
        organization_id: &OrganizationId,
        reviewed_on: NaiveDate,
    ) -> Result<Organization, ComplianceServiceError> {
        let mut organization = self.organization(organization_id)?;
        organization.last_plan_review_date = Some(reviewed_on);
        organization.next_plan_review_due_date = Some(next_annual_due_date(reviewed_on));
        self.directory.update_organization(organization.clone())?;

        info!(
            organization = %organization_id,
            reviewed_on = %reviewed_on,
            "plan review recorded"
        );
        Ok(organization)
    }

    fn organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Organization, ComplianceServiceError> {
        self.directory
            .organization(organization_id)?
            .ok_or_else(|| ComplianceServiceError::OrganizationNotFound(organization_id.clone()))
    }
}
