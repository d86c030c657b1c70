use time::{Duration, OffsetDateTime, macros::date};
use uuid::Uuid;

use scout_config::Postgres;
use scout_domain::{CandidateDraft, Gender};
use scout_storage::{
	db::Db,
	models::{AgentRobot, NewCandidate, ScoutService, ScoutServiceTemplate},
	queries,
};
use scout_testkit::TestDatabase;

async fn bootstrap(test_db: &TestDatabase) -> Db {
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 2 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");
	// A second bootstrap must be a no-op.
	db.ensure_schema().await.expect("Failed to re-run schema.");

	db
}

fn robot() -> AgentRobot {
	AgentRobot {
		robot_id: Uuid::new_v4(),
		agency_id: Uuid::new_v4(),
		name: "Tokyo desk".to_string(),
		is_scout_active: true,
		staff_email: "staff@example.com".to_string(),
		inbound_address: "Robot-Inbox@example.com".to_string(),
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SCOUT_PG_DSN to run."]
async fn robots_services_and_templates_round_trip() {
	let Some(base_dsn) = scout_testkit::env_dsn() else {
		eprintln!("Skipping robots_services_and_templates_round_trip; set SCOUT_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;
	let robot = robot();
	let service = ScoutService {
		service_id: Uuid::new_v4(),
		robot_id: robot.robot_id,
		provider: "ambi".to_string(),
		login_id: "desk@example.com".to_string(),
		password_sealed: "sealed".to_string(),
		is_active: true,
		last_send_count: 0,
		reply_template_id: None,
	};
	let template = ScoutServiceTemplate {
		template_id: Uuid::new_v4(),
		service_id: service.service_id,
		position: 0,
		search_title: "営業 30代".to_string(),
		message_title: "営業職のご案内".to_string(),
		scout_type: "normal".to_string(),
		trigger_hour: 14,
		trigger_minute: 0,
		weekday_mask: 0b111_1011,
		send_ceiling: 100,
		age_limit: Some(40),
		last_send_at: None,
		last_send_count: 0,
	};

	queries::insert_robot(&db, &robot).await.expect("Failed to insert robot.");
	queries::insert_service(&db, &service).await.expect("Failed to insert service.");
	queries::insert_template(&db, &template).await.expect("Failed to insert template.");

	let found = queries::robot_by_inbound_address(&db, "robot-inbox@EXAMPLE.com")
		.await
		.expect("Failed to look up robot.");

	assert_eq!(found.as_ref().map(|robot| robot.robot_id), Some(robot.robot_id));

	let sent_at = OffsetDateTime::now_utc();

	queries::record_template_send(&db, template.template_id, sent_at, 100)
		.await
		.expect("Failed to record send.");
	queries::update_service_send_count(&db, service.service_id, 100)
		.await
		.expect("Failed to update service count.");

	let templates =
		queries::list_templates(&db, service.service_id).await.expect("Failed to list templates.");
	let services =
		queries::list_scout_services(&db, robot.robot_id).await.expect("Failed to list services.");

	assert_eq!(templates.len(), 1);
	assert_eq!(templates[0].last_send_count, 100);
	assert!(templates[0].last_send_at.is_some());
	assert_eq!(services[0].last_send_count, 100);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SCOUT_PG_DSN to run."]
async fn pending_entries_are_enqueued_once_until_processed() {
	let Some(base_dsn) = scout_testkit::env_dsn() else {
		eprintln!("Skipping pending_entries_are_enqueued_once_until_processed; set SCOUT_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;
	let robot = robot();
	let now = OffsetDateTime::now_utc();

	queries::insert_robot(&db, &robot).await.expect("Failed to insert robot.");

	assert!(queries::enqueue_entry(&db, robot.robot_id, "ran", "A-1", now).await.expect("enqueue"));
	assert!(!queries::enqueue_entry(&db, robot.robot_id, "ran", "A-1", now).await.expect("enqueue"));

	let pending = queries::list_unprocessed_entries(&db).await.expect("Failed to list entries.");
	let ids = pending.iter().map(|entry| entry.entry_id).collect::<Vec<_>>();

	assert_eq!(pending.len(), 1);
	assert_eq!(queries::mark_entries_processed(&db, &ids, now).await.expect("mark"), 1);
	assert!(queries::list_unprocessed_entries(&db).await.expect("list").is_empty());
	// Once processed, the same id may arrive again as a new entry.
	assert!(queries::enqueue_entry(&db, robot.robot_id, "ran", "A-1", now).await.expect("enqueue"));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SCOUT_PG_DSN to run."]
async fn candidate_creation_writes_all_siblings() {
	let Some(base_dsn) = scout_testkit::env_dsn() else {
		eprintln!("Skipping candidate_creation_writes_all_siblings; set SCOUT_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;
	let robot = robot();
	let now = OffsetDateTime::now_utc();
	let draft = CandidateDraft {
		last_name: "山田".to_string(),
		first_name: "太郎".to_string(),
		email: Some("taro@example.com".to_string()),
		gender: Some(Gender::Male),
		..CandidateDraft::default()
	};

	queries::insert_robot(&db, &robot).await.expect("Failed to insert robot.");

	let created = queries::create_candidate(
		&db,
		&NewCandidate {
			agency_id: robot.agency_id,
			robot_id: robot.robot_id,
			provider: "ambi".to_string(),
			draft,
			due_on: date!(2026 - 10 - 21),
			created_at: now,
		},
	)
	.await
	.expect("Failed to create candidate.");
	let due_on: time::Date = sqlx::query_scalar(
		"\
SELECT t.due_on
FROM tasks t
JOIN task_groups g ON g.task_group_id = t.task_group_id
WHERE g.job_seeker_id = $1",
	)
	.bind(created.job_seeker_id)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to load task.");
	let shells: i64 =
		sqlx::query_scalar("SELECT count(*) FROM job_seeker_documents WHERE job_seeker_id = $1")
			.bind(created.job_seeker_id)
			.fetch_one(&db.pool)
			.await
			.expect("Failed to count documents.");
	let recent = queries::recent_candidates(&db, robot.agency_id, now - Duration::days(2))
		.await
		.expect("Failed to list recent candidates.");

	assert_eq!(due_on, date!(2026 - 10 - 21));
	assert_eq!(shells, 1);
	assert_eq!(recent.len(), 1);
	assert_eq!(recent[0].email.as_deref(), Some("taro@example.com"));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
