use axum::{
	Json, Router,
	body::Bytes,
	extract::{Path, Query, State},
	http::{HeaderMap, StatusCode, header},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use scout_domain::signal::PushEnvelope;
use scout_service::{DispatchReport, Error as ServiceError, IngestionReport};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/inbound/push", post(inbound_push))
		.route("/v1/runs/entry-ingestion", post(run_entry_ingestion))
		.route("/v1/runs/scout-dispatch/{robot_id}", post(run_scout_dispatch))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Default, Deserialize)]
struct PushQuery {
	#[serde(default)]
	token: Option<String>,
}

/// Push endpoints only care about the status code: anything but 2xx is redelivered.
async fn inbound_push(
	State(state): State<AppState>,
	Query(query): Query<PushQuery>,
	body: Bytes,
) -> StatusCode {
	if let Some(expected) = state.engine.cfg.security.push_token.as_deref()
		&& query.token.as_deref() != Some(expected)
	{
		tracing::warn!("Rejected push notification without a valid token.");

		return StatusCode::UNAUTHORIZED;
	}

	let envelope = match serde_json::from_slice::<PushEnvelope>(&body) {
		Ok(envelope) => envelope,
		Err(err) => {
			tracing::warn!(error = %err, "Rejected malformed push envelope.");

			return StatusCode::BAD_REQUEST;
		},
	};

	match state.engine.handle_push(&envelope).await {
		Ok(_) => StatusCode::OK,
		Err(ServiceError::InvalidRequest { message }) => {
			tracing::warn!(error = %message, "Rejected undecodable push notification.");

			StatusCode::BAD_REQUEST
		},
		Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
	}
}

async fn run_entry_ingestion(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<IngestionReport>, ApiError> {
	authorize(&state, &headers)?;

	let report = state.engine.run_entry_ingestion().await?;

	Ok(Json(report))
}

async fn run_scout_dispatch(
	State(state): State<AppState>,
	Path(robot_id): Path<Uuid>,
	headers: HeaderMap,
) -> Result<Json<DispatchReport>, ApiError> {
	authorize(&state, &headers)?;

	let report = state.engine.run_scout_dispatch(robot_id).await?;

	Ok(Json(report))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
	let Some(expected) = state.engine.cfg.security.trigger_token.as_deref() else {
		return Ok(());
	};

	if read_bearer_token(headers).is_some_and(|token| token == expected) {
		return Ok(());
	}

	Err(ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized", "A valid bearer token is required."))
}

fn read_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let raw = headers.get(header::AUTHORIZATION)?;
	let value = raw.to_str().ok()?.trim();
	let token = value.strip_prefix("Bearer ")?.trim();

	if token.is_empty() { None } else { Some(token) }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let message = err.to_string();

		match err {
			ServiceError::AlreadyRunning { .. } =>
				Self::new(StatusCode::CONFLICT, "already_running", message),
			ServiceError::InvalidRequest { .. } =>
				Self::new(StatusCode::BAD_REQUEST, "invalid_request", message),
			ServiceError::Configuration { .. } =>
				Self::new(StatusCode::UNPROCESSABLE_ENTITY, "configuration", message),
			ServiceError::Storage { .. } =>
				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage", message),
			ServiceError::Aborted { .. } =>
				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "aborted", message),
			ServiceError::Mailbox { .. } | ServiceError::Signal { .. } =>
				Self::new(StatusCode::BAD_GATEWAY, "mailbox", message),
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
