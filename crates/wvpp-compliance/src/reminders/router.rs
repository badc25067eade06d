use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use subtle::ConstantTimeEq;
use tracing::{error, warn};

use super::dispatcher::{Notifier, ReminderDispatcher};
use crate::organization::OrganizationDirectory;

/// Scheduler-facing tick endpoint guarded by a shared secret.
pub struct ReminderEndpoint<D, N> {
    dispatcher: ReminderDispatcher<D, N>,
    cron_secret: Option<String>,
}

impl<D, N> ReminderEndpoint<D, N> {
    pub fn new(dispatcher: ReminderDispatcher<D, N>, cron_secret: Option<String>) -> Self {
        Self {
            dispatcher,
            cron_secret,
        }
    }

    pub fn dispatcher(&self) -> &ReminderDispatcher<D, N> {
        &self.dispatcher
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(secret) = self.cron_secret.as_deref().filter(|s| !s.is_empty()) else {
            return false;
        };
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token_matches(token.trim(), secret))
            .unwrap_or(false)
    }
}

/// Compare bearer tokens without leaking a matching prefix through timing.
/// Slices of different lengths compare unequal.
fn token_matches(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Optional body letting the scheduler replay a specific run date.
#[derive(Debug, Default, Deserialize)]
pub struct TickRequest {
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

type SharedEndpoint<D, N> = Arc<ReminderEndpoint<D, N>>;

pub fn reminder_router<D, N>(endpoint: SharedEndpoint<D, N>) -> Router
where
    D: OrganizationDirectory + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route("/api/v1/reminders/tick", post(tick_handler::<D, N>))
        .with_state(endpoint)
}

pub(crate) async fn tick_handler<D, N>(
    State(endpoint): State<SharedEndpoint<D, N>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    D: OrganizationDirectory + 'static,
    N: Notifier + 'static,
{
    if !endpoint.authorized(&headers) {
        warn!("rejected reminder tick without a valid scheduler secret");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "unauthorized" })),
        )
            .into_response();
    }

    let request = if body.is_empty() {
        TickRequest::default()
    } else {
        match serde_json::from_slice::<TickRequest>(&body) {
            Ok(request) => request,
            Err(err) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("invalid tick request: {err}") })),
                )
                    .into_response()
            }
        }
    };
    let today = request.today.unwrap_or_else(|| Utc::now().date_naive());

    let worker = endpoint.clone();
    match tokio::task::spawn_blocking(move || worker.dispatcher.run_tick(today)).await {
        Ok(Ok(report)) => (StatusCode::OK, Json(report)).into_response(),
        Ok(Err(err)) => {
            error!(error = %err, "reminder tick aborted");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
        Err(err) => {
            error!(error = %err, "reminder tick task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "reminder tick failed" })),
            )
                .into_response()
        }
    }
}
