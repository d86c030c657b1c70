use time::{Duration, OffsetDateTime, macros::{date, datetime}};

use scout_domain::{CandidateDraft, Provider, RawRecord};
use scout_service::{Error, FailureKind, FlightKey, PartitionStatus, Store};
use scout_testkit::fixtures::{self, Harness, OPERATOR};

const NOW: OffsetDateTime = datetime!(2026-10-21 05:00 UTC);

fn harness() -> Harness {
	Harness::new(fixtures::config()).expect("Failed to build harness.")
}

fn ambi_row(id: &str, name: &str, kana: &str, email: &str) -> RawRecord {
	RawRecord::new(
		Some(id.to_string()),
		[
			id,
			name,
			kana,
			"男性",
			"1990/01/02",
			"東京都",
			email,
			"090-1234-5678",
			"早稲田大学",
			"株式会社サンプル",
			"営業",
			"550万円",
			"法人営業 5年",
			"粘り強さ",
		],
	)
}

async fn enqueue(h: &Harness, robot_id: uuid::Uuid, provider: Provider, ids: &[&str]) {
	for id in ids {
		h.store.enqueue_entry(robot_id, provider, id, NOW).await.expect("Failed to enqueue.");
	}
}

#[tokio::test]
async fn ambi_entry_becomes_one_candidate_with_workflow_rows() {
	let h = harness();
	let (robot, _) = h.seed_robot(Provider::Ambi).expect("Failed to seed robot.");

	enqueue(&h, robot.robot_id, Provider::Ambi, &["1001"]).await;
	h.portals.with_records(
		Provider::Ambi,
		vec![ambi_row("1001", "山田 太郎", "ヤマダ タロウ", "taro@example.com")],
	);

	let report = h.engine.run_entry_ingestion_at(NOW).await.expect("Ingestion failed.");
	let partition = &report.partitions[0];

	assert_eq!(partition.status, PartitionStatus::Completed);
	assert_eq!((partition.created, partition.duplicates, partition.invalid), (1, 0, 0));

	{
		let state = h.store.state();
		let candidate = &state.candidates[0];

		assert_eq!(state.candidates.len(), 1);
		assert_eq!(candidate.draft.last_name, "山田");
		assert_eq!(candidate.draft.first_name, "太郎");
		assert_eq!(candidate.draft.email.as_deref(), Some("taro@example.com"));
		assert_eq!(candidate.draft.annual_income, Some(550));
		assert_eq!(candidate.provider, "ambi");
		assert_eq!(state.documents, vec![(state.documents[0].0, candidate.job_seeker_id)]);
		assert_eq!(state.message_groups.len(), 1);
		assert_eq!(state.message_groups[0].channel_id, None);
		assert_eq!(state.tasks.len(), 1);
		assert_eq!(state.tasks[0].job_seeker_id, candidate.job_seeker_id);
		assert_eq!(state.tasks[0].kind, "interview_scheduling");
		assert_eq!(state.tasks[0].due_on, date!(2026 - 10 - 21));
	}

	assert!(h.store.pending_ids().is_empty());
	assert_eq!(h.portals.fetched(), vec![(Provider::Ambi, vec!["1001".to_string()])]);
	assert_eq!(h.portals.open_sessions(), 0);

	let mails = h.notifier.sent();

	assert_eq!(mails.len(), 1);
	assert_eq!(mails[0].to, vec![OPERATOR.to_string()]);
	assert!(mails[0].body.contains("created 1 | duplicates 0 | invalid 0 | completed"));
}

#[tokio::test]
async fn rerunning_ingestion_creates_nothing_new() {
	let h = harness();
	let (robot, _) = h.seed_robot(Provider::Ambi).expect("Failed to seed robot.");

	h.portals.with_records(
		Provider::Ambi,
		vec![ambi_row("1001", "山田 太郎", "ヤマダ タロウ", "taro@example.com")],
	);
	enqueue(&h, robot.robot_id, Provider::Ambi, &["1001"]).await;
	h.engine.run_entry_ingestion_at(NOW).await.expect("Ingestion failed.");

	let second = h.engine.run_entry_ingestion_at(NOW).await.expect("Ingestion failed.");

	assert!(second.partitions.is_empty());
	assert!(!second.digest_sent);

	// The same notification arriving again is deduplicated against the stored candidate.
	enqueue(&h, robot.robot_id, Provider::Ambi, &["1001"]).await;

	let third = h.engine.run_entry_ingestion_at(NOW + Duration::hours(1)).await.expect("Ingestion failed.");

	assert_eq!(third.partitions[0].duplicates, 1);
	assert_eq!(h.store.state().candidates.len(), 1);
	assert_eq!(h.store.state().tasks.len(), 1);
}

#[tokio::test]
async fn duplicates_within_a_batch_and_nameless_rows_are_counted() {
	let h = harness();
	let (robot, _) = h.seed_robot(Provider::Ambi).expect("Failed to seed robot.");

	enqueue(&h, robot.robot_id, Provider::Ambi, &["1", "2", "3"]).await;
	h.portals.with_records(
		Provider::Ambi,
		vec![
			ambi_row("1", "山田 太郎", "ヤマダ タロウ", "taro@example.com"),
			ambi_row("2", "山田　太郎", "ﾔﾏﾀﾞ ﾀﾛｳ", "TARO@example.com"),
			ambi_row("3", "", "", "nobody@example.com"),
		],
	);

	let report = h.engine.run_entry_ingestion_at(NOW).await.expect("Ingestion failed.");
	let partition = &report.partitions[0];

	assert_eq!((partition.created, partition.duplicates, partition.invalid), (1, 1, 1));
	assert!(h.store.pending_ids().is_empty());
}

#[tokio::test]
async fn candidates_outside_the_lookback_window_do_not_block_creation() {
	let h = harness();
	let (robot, _) = h.seed_robot(Provider::Ambi).expect("Failed to seed robot.");
	let old = CandidateDraft {
		last_name: "山田".to_string(),
		first_name: "太郎".to_string(),
		email: Some("taro@example.com".to_string()),
		..CandidateDraft::default()
	};

	h.store.seed_candidate(robot.agency_id, old, NOW - Duration::days(3));
	enqueue(&h, robot.robot_id, Provider::Ambi, &["1001"]).await;
	h.portals.with_records(
		Provider::Ambi,
		vec![ambi_row("1001", "山田 太郎", "ヤマダ タロウ", "taro@example.com")],
	);

	let report = h.engine.run_entry_ingestion_at(NOW).await.expect("Ingestion failed.");

	assert_eq!(report.partitions[0].created, 1);
}

#[tokio::test]
async fn a_failed_partition_leaves_entries_pending_and_spares_others() {
	let h = harness();
	let (ambi_robot, _) = h.seed_robot(Provider::Ambi).expect("Failed to seed robot.");
	let (ran_robot, _) = h.seed_robot(Provider::Ran).expect("Failed to seed robot.");

	enqueue(&h, ambi_robot.robot_id, Provider::Ambi, &["A-1"]).await;
	enqueue(&h, ran_robot.robot_id, Provider::Ran, &["R-1"]).await;
	h.portals.fail_fetch(Provider::Ambi, "detail page did not load");

	let report = h.engine.run_entry_ingestion_at(NOW).await.expect("Ingestion failed.");
	let ambi = report.partitions.iter().find(|p| p.provider == Provider::Ambi).expect("No AMBI.");
	let ran = report.partitions.iter().find(|p| p.provider == Provider::Ran).expect("No RAN.");

	let PartitionStatus::Failed { failure } = &ambi.status else {
		panic!("Expected the AMBI partition to fail, got {:?}.", ambi.status);
	};

	assert_eq!(failure.kind, FailureKind::Portal);
	assert_eq!(ran.status, PartitionStatus::Completed);
	assert_eq!(h.store.pending_ids(), vec!["A-1".to_string()]);

	let mails = h.notifier.sent();

	assert_eq!(mails.len(), 1);
	assert!(mails[0].subject.contains("FAILED"));
	assert!(mails[0].body.contains("detail page did not load"));
}

#[tokio::test]
async fn a_crash_during_extraction_reports_once_without_orphans() {
	let h = harness();
	let (robot, _) = h.seed_robot(Provider::Ambi).expect("Failed to seed robot.");

	enqueue(&h, robot.robot_id, Provider::Ambi, &["1001"]).await;
	h.portals.with_records(
		Provider::Ambi,
		vec![ambi_row("1001", "山田 太郎", "ヤマダ タロウ", "taro@example.com")],
	);
	h.portals.panic_on_fetch(Provider::Ambi, "renderer crashed");

	let report = h.engine.run_entry_ingestion_at(NOW).await.expect("Ingestion failed.");

	let PartitionStatus::Failed { failure } = &report.partitions[0].status else {
		panic!("Expected a failed partition, got {:?}.", report.partitions[0].status);
	};

	assert_eq!(failure.kind, FailureKind::AutomationFault);
	assert!(h.store.state().candidates.is_empty());
	assert!(h.store.state().tasks.is_empty());
	assert_eq!(h.store.pending_ids(), vec!["1001".to_string()]);
	assert_eq!(h.notifier.sent().len(), 1);
	assert_eq!(h.portals.released(), 1);
	assert_eq!(h.portals.open_sessions(), 0);
}

#[tokio::test]
async fn busy_robots_are_deferred() {
	let h = harness();
	let (robot, _) = h.seed_robot(Provider::Ambi).expect("Failed to seed robot.");

	enqueue(&h, robot.robot_id, Provider::Ambi, &["1001"]).await;

	let _dispatching = h.engine.flight().try_acquire(FlightKey::Robot(robot.robot_id));
	let report = h.engine.run_entry_ingestion_at(NOW).await.expect("Ingestion failed.");

	assert_eq!(report.partitions[0].status, PartitionStatus::Deferred);
	assert!(h.portals.opened().is_empty());
	assert_eq!(h.store.pending_ids(), vec!["1001".to_string()]);
}

#[tokio::test]
async fn missing_service_is_a_configuration_failure() {
	let h = harness();
	let (robot, _) = h.seed_robot(Provider::Ran).expect("Failed to seed robot.");

	enqueue(&h, robot.robot_id, Provider::MynaviScouting, &["77"]).await;

	let report = h.engine.run_entry_ingestion_at(NOW).await.expect("Ingestion failed.");

	let PartitionStatus::Failed { failure } = &report.partitions[0].status else {
		panic!("Expected a failed partition, got {:?}.", report.partitions[0].status);
	};

	assert_eq!(failure.kind, FailureKind::Configuration);
	assert!(h.portals.opened().is_empty());
}

#[tokio::test]
async fn overlapping_ingestion_is_rejected() {
	let h = harness();
	let _running = h.engine.flight().try_acquire(FlightKey::Ingestion);
	let result = h.engine.run_entry_ingestion_at(NOW).await;

	assert!(matches!(result, Err(Error::AlreadyRunning { .. })));
}
