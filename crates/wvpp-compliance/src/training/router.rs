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

use super::domain::{ModuleId, SubmittedAnswer};
use super::repository::{ModuleCatalog, ProgressRepository, RepositoryError, TrainingRecordSink};
use super::service::{ProgressTracker, TrainingServiceError, VideoProgressReport};
use crate::organization::{DirectoryError, EmployeeId, OrganizationDirectory};

type SharedTracker<C, P, D, S> = Arc<ProgressTracker<C, P, D, S>>;

#[derive(Debug, Deserialize)]
pub struct QuizSubmissionRequest {
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssignmentRequest {
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// Router exposing learner progress, quiz, and catalog endpoints.
pub fn training_router<C, P, D, S>(tracker: SharedTracker<C, P, D, S>) -> Router
where
    C: ModuleCatalog + 'static,
    P: ProgressRepository + 'static,
    D: OrganizationDirectory + 'static,
    S: TrainingRecordSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/training/employees/:employee_id/modules",
            get(catalog_handler::<C, P, D, S>),
        )
        .route(
            "/api/v1/training/employees/:employee_id/modules/:module_id/video",
            post(video_handler::<C, P, D, S>),
        )
        .route(
            "/api/v1/training/employees/:employee_id/modules/:module_id/quiz",
            post(quiz_handler::<C, P, D, S>),
        )
        .route(
            "/api/v1/training/employees/:employee_id/assignments",
            post(assignment_handler::<C, P, D, S>),
        )
        .route(
            "/api/v1/training/modules/:module_id/questions",
            get(questions_handler::<C, P, D, S>),
        )
        .with_state(tracker)
}

pub(crate) async fn catalog_handler<C, P, D, S>(
    State(tracker): State<SharedTracker<C, P, D, S>>,
    Path(employee_id): Path<String>,
) -> Response
where
    C: ModuleCatalog + 'static,
    P: ProgressRepository + 'static,
    D: OrganizationDirectory + 'static,
    S: TrainingRecordSink + 'static,
{
    match tracker.catalog_for(&EmployeeId(employee_id)) {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn video_handler<C, P, D, S>(
    State(tracker): State<SharedTracker<C, P, D, S>>,
    Path((employee_id, module_id)): Path<(String, String)>,
    body: Result<Json<VideoProgressReport>, JsonRejection>,
) -> Response
where
    C: ModuleCatalog + 'static,
    P: ProgressRepository + 'static,
    D: OrganizationDirectory + 'static,
    S: TrainingRecordSink + 'static,
{
    let Json(report) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    let employee_id = EmployeeId(employee_id);
    let module_id = ModuleId(module_id);
    let result = tracker
        .ensure_unlocked(&employee_id, &module_id)
        .and_then(|()| {
            tracker.report_video_progress(&employee_id, &module_id, report, Utc::now())
        });
    match result {
        Ok(update) => (StatusCode::OK, Json(update)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn quiz_handler<C, P, D, S>(
    State(tracker): State<SharedTracker<C, P, D, S>>,
    Path((employee_id, module_id)): Path<(String, String)>,
    body: Result<Json<QuizSubmissionRequest>, JsonRejection>,
) -> Response
where
    C: ModuleCatalog + 'static,
    P: ProgressRepository + 'static,
    D: OrganizationDirectory + 'static,
    S: TrainingRecordSink + 'static,
{
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    let employee_id = EmployeeId(employee_id);
    let module_id = ModuleId(module_id);
    let result = tracker
        .ensure_unlocked(&employee_id, &module_id)
        .and_then(|()| {
            tracker.submit_quiz(&employee_id, &module_id, &request.answers, Utc::now())
        });
    match result {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn assignment_handler<C, P, D, S>(
    State(tracker): State<SharedTracker<C, P, D, S>>,
    Path(employee_id): Path<String>,
    body: Result<Json<AssignmentRequest>, JsonRejection>,
) -> Response
where
    C: ModuleCatalog + 'static,
    P: ProgressRepository + 'static,
    D: OrganizationDirectory + 'static,
    S: TrainingRecordSink + 'static,
{
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match tracker.assign_training(&EmployeeId(employee_id), request.due_date, Utc::now()) {
        Ok(created) => {
            let payload = json!({ "assigned": created.len(), "records": created });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn questions_handler<C, P, D, S>(
    State(tracker): State<SharedTracker<C, P, D, S>>,
    Path(module_id): Path<String>,
) -> Response
where
    C: ModuleCatalog + 'static,
    P: ProgressRepository + 'static,
    D: OrganizationDirectory + 'static,
    S: TrainingRecordSink + 'static,
{
    match tracker.questions_for(&ModuleId(module_id)) {
        Ok(questions) => (StatusCode::OK, Json(questions)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Malformed or incomplete bodies are validation failures, not unprocessable entities.
fn rejection_response(rejection: JsonRejection) -> Response {
    error_response(TrainingServiceError::Validation(rejection.body_text()))
}

fn error_response(err: TrainingServiceError) -> Response {
    let status = match &err {
        TrainingServiceError::ModuleNotFound(_)
        | TrainingServiceError::EmployeeNotFound(_)
        | TrainingServiceError::Repository(RepositoryError::NotFound)
        | TrainingServiceError::Directory(DirectoryError::NotFound { .. }) => StatusCode::NOT_FOUND,
        TrainingServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        TrainingServiceError::ModuleLocked(_) => StatusCode::FORBIDDEN,
        TrainingServiceError::PrerequisiteNotMet(_)
        | TrainingServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        TrainingServiceError::AttemptLimitExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        TrainingServiceError::Repository(RepositoryError::Unavailable(_))
        | TrainingServiceError::Directory(DirectoryError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    };

    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
