//! Read model of the organizations, employees, plans, and incidents the engine evaluates.

pub mod domain;
pub mod repository;

pub use domain::{
    Employee, EmployeeId, Incident, IncidentId, InvestigationStatus, Organization,
    OrganizationId, PlanId, WvppPlan,
};
pub use repository::{DirectoryError, OrganizationDirectory, OrganizationPage};
