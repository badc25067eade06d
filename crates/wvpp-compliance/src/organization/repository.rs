use super::domain::{Employee, EmployeeId, Incident, Organization, OrganizationId, WvppPlan};

/// One page of organizations in identifier order.
#[derive(Debug, Clone, Default)]
pub struct OrganizationPage {
    pub organizations: Vec<Organization>,
    /// Cursor to pass back for the next page; `None` once the listing is exhausted.
    pub next_cursor: Option<OrganizationId>,
}

/// Document-store read model the engine consults for organizations and their people.
pub trait OrganizationDirectory: Send + Sync {
    /// Organizations with identifiers strictly greater than `after`, at most `limit` of them.
    fn organizations(
        &self,
        after: Option<&OrganizationId>,
        limit: usize,
    ) -> Result<OrganizationPage, DirectoryError>;
    fn organization(&self, id: &OrganizationId) -> Result<Option<Organization>, DirectoryError>;
    fn update_organization(&self, organization: Organization) -> Result<(), DirectoryError>;

    fn employees(&self, organization: &OrganizationId) -> Result<Vec<Employee>, DirectoryError>;
    fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>, DirectoryError>;
    fn update_employee(&self, employee: Employee) -> Result<(), DirectoryError>;

    fn incidents(&self, organization: &OrganizationId) -> Result<Vec<Incident>, DirectoryError>;
    fn active_plan(&self, organization: &OrganizationId)
        -> Result<Option<WvppPlan>, DirectoryError>;

    /// AI Q&A answers flagged for human review and not yet resolved.
    fn pending_flagged_questions(
        &self,
        organization: &OrganizationId,
    ) -> Result<usize, DirectoryError>;
    /// Anonymous reports not yet acknowledged by the organization.
    fn new_anonymous_reports(&self, organization: &OrganizationId)
        -> Result<usize, DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}
