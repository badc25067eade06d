use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use super::service::{ComplianceService, ComplianceServiceError};
use crate::organization::{DirectoryError, OrganizationDirectory, OrganizationId};

#[derive(Debug, Default, Deserialize)]
pub struct PlanReviewRequest {
    #[serde(default)]
    pub reviewed_on: Option<NaiveDate>,
}

pub fn compliance_router<D>(service: Arc<ComplianceService<D>>) -> Router
where
    D: OrganizationDirectory + 'static,
{
    Router::new()
        .route(
            "/api/v1/organizations/:organization_id/compliance",
            get(score_handler::<D>),
        )
        .route(
            "/api/v1/organizations/:organization_id/plan-review",
            post(plan_review_handler::<D>),
        )
        .with_state(service)
}

pub(crate) async fn score_handler<D>(
    State(service): State<Arc<ComplianceService<D>>>,
    Path(organization_id): Path<String>,
) -> Response
where
    D: OrganizationDirectory + 'static,
{
    let today = Utc::now().date_naive();
    match service.compute_compliance_score(&OrganizationId(organization_id), today) {
        Ok(score) => (StatusCode::OK, Json(score)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn plan_review_handler<D>(
    State(service): State<Arc<ComplianceService<D>>>,
    Path(organization_id): Path<String>,
    body: Result<Json<PlanReviewRequest>, JsonRejection>,
) -> Response
where
    D: OrganizationDirectory + 'static,
{
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": rejection.body_text() })),
            )
                .into_response()
        }
    };
    let reviewed_on = request
        .reviewed_on
        .unwrap_or_else(|| Utc::now().date_naive());
    match service.record_plan_review(&OrganizationId(organization_id), reviewed_on) {
        Ok(organization) => (StatusCode::OK, Json(organization)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: ComplianceServiceError) -> Response {
    let status = match &err {
        ComplianceServiceError::OrganizationNotFound(_)
        | ComplianceServiceError::Directory(DirectoryError::NotFound { .. }) => {
            StatusCode::NOT_FOUND
        }
        ComplianceServiceError::Directory(DirectoryError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
