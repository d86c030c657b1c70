use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use tower::util::ServiceExt;
use uuid::Uuid;

use scout_api::{routes, state::AppState};
use scout_config::Config;
use scout_domain::{Provider, signal};
use scout_service::{FlightKey, ScoutEngine};
use scout_testkit::fixtures::{self, Harness, OPERATOR};

const TRIGGER_TOKEN: &str = "trigger-secret";
const PUSH_TOKEN: &str = "push-secret";

fn app(h: Harness) -> (Router, Arc<ScoutEngine>) {
	let engine = Arc::new(h.engine);

	(routes::router(AppState::from_engine(engine.clone())), engine)
}

fn guarded_config() -> Config {
	let mut cfg = fixtures::config();

	cfg.security.trigger_token = Some(TRIGGER_TOKEN.to_string());
	cfg.security.push_token = Some(PUSH_TOKEN.to_string());

	cfg
}

fn push_body(address: &str) -> String {
	let payload = serde_json::json!({ "emailAddress": address, "historyId": 42 });

	serde_json::json!({
		"message": { "data": STANDARD.encode(payload.to_string()), "messageId": "1" },
		"subscription": "projects/scout/subscriptions/inbound",
	})
	.to_string()
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri(uri)
		.header("content-type", "application/json")
		.body(body.into())
		.expect("Failed to build request.")
}

fn authorized_post(uri: &str) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri(uri)
		.header("authorization", format!("Bearer {TRIGGER_TOKEN}"))
		.body(Body::empty())
		.expect("Failed to build request.")
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");

	serde_json::from_slice(&body).expect("Failed to parse response.")
}

#[tokio::test]
async fn health_ok() {
	let (app, _) = app(Harness::new(fixtures::config()).expect("Failed to build harness."));
	let response = app
		.oneshot(Request::builder().uri("/health").body(Body::empty()).expect("Failed to build request."))
		.await
		.expect("Failed to call /health.");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn push_queues_entries_and_answers_ok() {
	let h = Harness::new(fixtures::config()).expect("Failed to build harness.");
	let query = signal::rule_for(Provider::Ran).expect("No RAN rule.").query();

	h.seed_robot(Provider::Ran).expect("Failed to seed robot.");
	h.mailbox.deliver(&query, "m-1", "応募者ID：R-77");

	let store = h.store.clone();
	let (app, _) = app(h);
	let response = app
		.oneshot(post("/v1/inbound/push", push_body(fixtures::INBOUND)))
		.await
		.expect("Failed to call push.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(store.pending_ids(), vec!["R-77".to_string()]);
}

#[tokio::test]
async fn malformed_pushes_are_bad_requests() {
	let h = Harness::new(fixtures::config()).expect("Failed to build harness.");
	let notifier = h.notifier.clone();
	let (app, _) = app(h);
	let not_json = app
		.clone()
		.oneshot(post("/v1/inbound/push", "not json"))
		.await
		.expect("Failed to call push.");
	let bad_data = app
		.oneshot(post("/v1/inbound/push", r#"{"message":{"data":"%%%"}}"#))
		.await
		.expect("Failed to call push.");

	assert_eq!(not_json.status(), StatusCode::BAD_REQUEST);
	assert_eq!(bad_data.status(), StatusCode::BAD_REQUEST);
	assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn push_for_an_unknown_mailbox_fails_and_alerts() {
	let h = Harness::new(fixtures::config()).expect("Failed to build harness.");
	let notifier = h.notifier.clone();
	let (app, _) = app(h);
	let response = app
		.oneshot(post("/v1/inbound/push", push_body("nobody@example.com")))
		.await
		.expect("Failed to call push.");

	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

	let sent = notifier.sent();

	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].to, vec![OPERATOR.to_string()]);
}

#[tokio::test]
async fn push_token_is_enforced_when_configured() {
	let h = Harness::new(guarded_config()).expect("Failed to build harness.");

	h.seed_robot(Provider::Ran).expect("Failed to seed robot.");

	let (app, _) = app(h);
	let missing = app
		.clone()
		.oneshot(post("/v1/inbound/push", push_body(fixtures::INBOUND)))
		.await
		.expect("Failed to call push.");
	let wrong = app
		.clone()
		.oneshot(post("/v1/inbound/push?token=guess", push_body(fixtures::INBOUND)))
		.await
		.expect("Failed to call push.");
	let valid = app
		.oneshot(post(&format!("/v1/inbound/push?token={PUSH_TOKEN}"), push_body(fixtures::INBOUND)))
		.await
		.expect("Failed to call push.");

	assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(valid.status(), StatusCode::OK);
}

#[tokio::test]
async fn run_triggers_require_the_bearer_token() {
	let (app, _) = app(Harness::new(guarded_config()).expect("Failed to build harness."));
	let anonymous = app
		.clone()
		.oneshot(post("/v1/runs/entry-ingestion", Body::empty()))
		.await
		.expect("Failed to call ingestion.");

	assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(json_body(anonymous).await["error_code"], "unauthorized");

	let response = app
		.oneshot(authorized_post("/v1/runs/entry-ingestion"))
		.await
		.expect("Failed to call ingestion.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = json_body(response).await;

	assert_eq!(json["partitions"], serde_json::json!([]));
	assert_eq!(json["digest_sent"], false);
}

#[tokio::test]
async fn dispatch_reports_the_run_outcome() {
	let h = Harness::new(fixtures::config()).expect("Failed to build harness.");
	let (robot, _) = h.seed_robot(Provider::Ran).expect("Failed to seed robot.");

	h.store.state().robots[0].is_scout_active = false;

	let (app, _) = app(h);
	let response = app
		.oneshot(post(&format!("/v1/runs/scout-dispatch/{}", robot.robot_id), Body::empty()))
		.await
		.expect("Failed to call dispatch.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = json_body(response).await;

	assert_eq!(json["robot_id"], robot.robot_id.to_string());
	assert_eq!(json["outcome"]["status"], "inactive");
	assert_eq!(json["sent"], 0);
}

#[tokio::test]
async fn overlapping_dispatch_is_a_conflict() {
	let robot_id = Uuid::new_v4();
	let (app, engine) = app(Harness::new(fixtures::config()).expect("Failed to build harness."));
	let _guard = engine.flight().try_acquire(FlightKey::Robot(robot_id)).expect("Key was free.");
	let response = app
		.oneshot(post(&format!("/v1/runs/scout-dispatch/{robot_id}"), Body::empty()))
		.await
		.expect("Failed to call dispatch.");

	assert_eq!(response.status(), StatusCode::CONFLICT);
	assert_eq!(json_body(response).await["error_code"], "already_running");
}

#[tokio::test]
async fn dispatch_rejects_a_malformed_robot_id() {
	let (app, _) = app(Harness::new(fixtures::config()).expect("Failed to build harness."));
	let response = app
		.oneshot(post("/v1/runs/scout-dispatch/not-a-uuid", Body::empty()))
		.await
		.expect("Failed to call dispatch.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
