use time::{Duration, OffsetDateTime, Weekday, macros::datetime};

use scout_domain::{Provider, ScoutType, schedule::WeekdayMask};
use scout_service::{Error, FailureKind, FlightKey, RunOutcome};
use scout_storage::models::ScoutServiceTemplate;
use scout_testkit::{
	SendScript,
	fixtures::{self, Harness, OPERATOR, STAFF},
};

// Wednesday 14:00 in UTC+9.
const NOW: OffsetDateTime = datetime!(2026-10-21 05:00 UTC);

fn harness_with(configure: impl FnOnce(&mut scout_config::Config)) -> Harness {
	let mut cfg = fixtures::config();

	configure(&mut cfg);

	Harness::new(cfg).expect("Failed to build harness.")
}

fn due(service_id: uuid::Uuid, position: i32, title: &str, ceiling: i32) -> ScoutServiceTemplate {
	fixtures::template(service_id, position, title, 14, ceiling)
}

#[tokio::test]
async fn run_cap_limits_later_templates() {
	let h = harness_with(|cfg| cfg.dispatch.max_sends_per_run = 120);
	let (robot, service) = h.seed_robot(Provider::Ran).expect("Failed to seed robot.");
	let first = due(service.service_id, 0, "営業 経験者", 100);
	let second = due(service.service_id, 1, "営業 未経験", 100);
	let third = due(service.service_id, 2, "事務", 50);

	for template in [&first, &second, &third] {
		h.store.add_template(template.clone());
	}

	let report = h.engine.run_scout_dispatch_at(robot.robot_id, NOW).await.expect("Dispatch failed.");
	let ceilings = h.portals.requests().iter().map(|(_, req)| req.ceiling).collect::<Vec<_>>();

	assert_eq!(report.outcome, RunOutcome::Completed);
	assert_eq!(ceilings, vec![100, 20]);
	assert_eq!(report.sent, 120);
	assert_eq!(h.store.template(first.template_id).map(|t| t.last_send_count), Some(100));
	assert_eq!(h.store.template(second.template_id).map(|t| t.last_send_count), Some(20));
	assert_eq!(h.store.template(third.template_id).and_then(|t| t.last_send_at), None);
	assert_eq!(h.store.service(service.service_id).map(|s| s.last_send_count), Some(120));
	assert_eq!(h.portals.open_sessions(), 0);
}

#[tokio::test]
async fn ambi_grants_snap_to_bulk_sizes() {
	let h = harness_with(|cfg| cfg.dispatch.max_sends_per_run = 420);
	let (robot, service) = h.seed_robot(Provider::Ambi).expect("Failed to seed robot.");

	h.store.add_template(due(service.service_id, 0, "first", 300));
	h.store.add_template(due(service.service_id, 1, "second", 500));
	h.store.add_template(due(service.service_id, 2, "third", 100));

	let report = h.engine.run_scout_dispatch_at(robot.robot_id, NOW).await.expect("Dispatch failed.");
	let ceilings = h.portals.requests().iter().map(|(_, req)| req.ceiling).collect::<Vec<_>>();

	// 300 leaves 120 under the cap, which snaps to 100; the remaining 20 fits no bulk size.
	assert_eq!(ceilings, vec![300, 100]);
	assert_eq!(report.sent, 400);
}

#[tokio::test]
async fn disabled_send_button_is_a_recorded_zero_send() {
	let h = harness_with(|_| {});
	let (robot, service) = h.seed_robot(Provider::Ran).expect("Failed to seed robot.");
	let template = due(service.service_id, 0, "満員", 30);

	h.store.add_template(template.clone());
	h.portals.with_send("満員", SendScript::Disabled);

	let report = h.engine.run_scout_dispatch_at(robot.robot_id, NOW).await.expect("Dispatch failed.");
	let stored = h.store.template(template.template_id).expect("Template missing.");
	let mails = h.notifier.sent();

	assert_eq!(report.outcome, RunOutcome::Completed);
	assert_eq!(stored.last_send_at, Some(NOW));
	assert_eq!(stored.last_send_count, 0);
	assert_eq!(mails.len(), 1);
	assert!(mails[0].body.contains("- 満員 / ご案内 | 2026-10-21 14:00 | 0 | success"));
}

#[tokio::test]
async fn only_the_first_provider_by_priority_is_dispatched() {
	let h = harness_with(|_| {});
	let (robot, ran) = h.seed_robot(Provider::Ran).expect("Failed to seed robot.");
	let ambi = fixtures::service(
		robot.robot_id,
		Provider::Ambi,
		fixtures::sealed("ambi-password").expect("Failed to seal."),
	);

	h.store.add_service(ambi.clone());
	h.store.add_template(due(ambi.service_id, 0, "ambi condition", 50));
	h.store.add_template(due(ran.service_id, 0, "ran condition", 50));

	let report = h.engine.run_scout_dispatch_at(robot.robot_id, NOW).await.expect("Dispatch failed.");

	assert_eq!(report.provider, Some(Provider::Ran));
	assert_eq!(report.deferred, vec![Provider::Ambi]);
	assert_eq!(h.portals.opened(), vec![Provider::Ran]);
	assert!(h.notifier.sent()[0].body.contains("Deferred providers: AMBI"));
}

#[tokio::test]
async fn weekday_mask_and_hour_gate_dispatch() {
	let h = harness_with(|_| {});
	let (robot, service) = h.seed_robot(Provider::Ran).expect("Failed to seed robot.");
	let mut template = due(service.service_id, 0, "平日のみ", 10);

	template.weekday_mask = WeekdayMask::ALL.without(Weekday::Tuesday).bits();
	h.store.add_template(template);

	let tuesday = NOW - Duration::days(1);
	let wrong_hour = NOW + Duration::hours(1);

	for now in [tuesday, wrong_hour] {
		let report =
			h.engine.run_scout_dispatch_at(robot.robot_id, now).await.expect("Dispatch failed.");

		assert_eq!(report.outcome, RunOutcome::NothingDue);
	}

	assert!(h.portals.opened().is_empty());
	assert!(h.notifier.sent().is_empty());

	let report = h.engine.run_scout_dispatch_at(robot.robot_id, NOW).await.expect("Dispatch failed.");

	assert_eq!(report.outcome, RunOutcome::Completed);
	assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn inactive_robot_does_nothing() {
	let h = harness_with(|_| {});
	let mut robot = fixtures::robot(uuid::Uuid::new_v4());

	robot.is_scout_active = false;
	h.store.add_robot(robot.clone());

	let report = h.engine.run_scout_dispatch_at(robot.robot_id, NOW).await.expect("Dispatch failed.");

	assert_eq!(report.outcome, RunOutcome::Inactive);
	assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn crash_mid_run_reports_once_and_keeps_progress() {
	let h = harness_with(|_| {});
	let (robot, service) = h.seed_robot(Provider::Ran).expect("Failed to seed robot.");
	let first = due(service.service_id, 0, "ok", 30);
	let second = due(service.service_id, 1, "boom", 30);

	h.store.add_template(first.clone());
	h.store.add_template(second);
	h.portals.with_send("boom", SendScript::Panics("checkbox vanished".to_string()));

	let report = h.engine.run_scout_dispatch_at(robot.robot_id, NOW).await.expect("Dispatch failed.");
	let mails = h.notifier.sent();

	let RunOutcome::Failed { failure } = &report.outcome else {
		panic!("Expected a failed run, got {:?}.", report.outcome);
	};

	assert_eq!(failure.kind, FailureKind::AutomationFault);
	assert!(failure.message.contains("checkbox vanished"));
	assert_eq!(mails.len(), 1);
	assert!(mails[0].body.contains("Failure: automation fault"));
	assert!(mails[0].body.contains("- ok / ご案内 | 2026-10-21 14:00 | 30 | success"));
	assert_eq!(h.store.template(first.template_id).map(|t| t.last_send_count), Some(30));
	assert_eq!(h.portals.open_sessions(), 0);
	assert_eq!(h.portals.released(), 1);
	assert!(!h.engine.flight().is_held(FlightKey::Robot(robot.robot_id)));
}

#[tokio::test]
async fn a_crashing_robot_leaves_other_robots_browsers_open() {
	let h = harness_with(|_| {});
	let (crashing, crashing_service) = h.seed_robot(Provider::Ran).expect("Failed to seed robot.");
	let (busy, busy_service) = h.seed_robot(Provider::Ambi).expect("Failed to seed robot.");

	h.store.add_template(due(crashing_service.service_id, 0, "boom", 30));
	h.store.add_template(due(busy_service.service_id, 0, "slow", 50));
	h.portals.with_send("boom", SendScript::Panics("checkbox vanished".to_string()));
	h.portals.with_send("slow", SendScript::Gated(50));

	let busy_run = h.engine.run_scout_dispatch_at(busy.robot_id, NOW);
	let crashing_run = async {
		// Start only once the other robot holds its browser.
		while h.portals.open_sessions() == 0 {
			tokio::task::yield_now().await;
		}

		let report = h.engine.run_scout_dispatch_at(crashing.robot_id, NOW).await;

		h.portals.open_gate();

		report
	};
	let (busy_report, crashing_report) = tokio::join!(busy_run, crashing_run);
	let busy_report = busy_report.expect("Dispatch failed.");
	let crashing_report = crashing_report.expect("Dispatch failed.");

	assert!(matches!(crashing_report.outcome, RunOutcome::Failed { .. }));
	assert_eq!(busy_report.outcome, RunOutcome::Completed);
	assert_eq!(busy_report.sent, 50);
	assert_eq!(h.portals.released(), 1);
	assert_eq!(h.portals.revoked(), 0);
	assert_eq!(h.portals.open_sessions(), 0);
}

#[tokio::test]
async fn deadline_expiry_is_classified_as_timeout() {
	let h = harness_with(|cfg| cfg.runtime.run_deadline_secs = 1);
	let (robot, service) = h.seed_robot(Provider::Ran).expect("Failed to seed robot.");

	h.store.add_template(due(service.service_id, 0, "slow", 10));
	h.portals.with_send("slow", SendScript::Hangs);

	let report = h.engine.run_scout_dispatch_at(robot.robot_id, NOW).await.expect("Dispatch failed.");

	let RunOutcome::Failed { failure } = &report.outcome else {
		panic!("Expected a failed run, got {:?}.", report.outcome);
	};

	assert_eq!(failure.kind, FailureKind::Timeout);
	assert_eq!(h.portals.released(), 1);
	assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn partial_send_failure_persists_the_partial_count() {
	let h = harness_with(|_| {});
	let (robot, service) = h.seed_robot(Provider::Ran).expect("Failed to seed robot.");
	let template = due(service.service_id, 0, "途中", 50);

	h.store.add_template(template.clone());
	h.portals.with_send(
		"途中",
		SendScript::FailsAfter { sent: 7, message: "button#scout-send".to_string() },
	);

	let report = h.engine.run_scout_dispatch_at(robot.robot_id, NOW).await.expect("Dispatch failed.");

	let RunOutcome::Failed { failure } = &report.outcome else {
		panic!("Expected a failed run, got {:?}.", report.outcome);
	};

	assert_eq!(failure.kind, FailureKind::Portal);
	assert_eq!(h.store.template(template.template_id).map(|t| t.last_send_count), Some(7));
	assert_eq!(h.store.service(service.service_id).map(|s| s.last_send_count), Some(7));
	assert_eq!(h.portals.closed(), 1);
}

#[tokio::test]
async fn stale_and_fresh_sends_are_reported_differently() {
	let h = harness_with(|_| {});
	let (robot, service) = h.seed_robot(Provider::Ran).expect("Failed to seed robot.");
	let mut stale = due(service.service_id, 0, "stale", 40);
	let mut fresh = due(service.service_id, 1, "fresh", 25);

	stale.last_send_at = Some(NOW - Duration::hours(13));
	stale.last_send_count = 40;
	fresh.last_send_at = Some(NOW - Duration::hours(11));
	fresh.last_send_count = 25;
	h.store.add_template(stale);
	h.store.add_template(fresh);
	h.portals.with_send("stale", SendScript::FailsAfter { sent: 0, message: "gone".to_string() });

	h.engine.run_scout_dispatch_at(robot.robot_id, NOW).await.expect("Dispatch failed.");

	let body = &h.notifier.sent()[0].body;

	assert!(body.contains("- stale / ご案内 |  | 0 | failure"));
	assert!(body.contains("- fresh / ご案内 | 2026-10-21 03:00 | 25 | success"));
}

#[tokio::test]
async fn idle_services_restart_their_send_total() {
	let h = harness_with(|_| {});
	let (robot, mut service) = h.seed_robot(Provider::Ran).expect("Failed to seed robot.");
	let mut template = due(service.service_id, 0, "idle", 10);

	template.last_send_at = Some(NOW - Duration::days(5));
	service.last_send_count = 500;
	h.store.state().services[0] = service.clone();
	h.store.add_template(template);

	h.engine.run_scout_dispatch_at(robot.robot_id, NOW).await.expect("Dispatch failed.");

	assert_eq!(h.store.service(service.service_id).map(|s| s.last_send_count), Some(10));
}

#[tokio::test]
async fn test_mode_cancels_sends_and_keeps_staff_off_the_digest() {
	let h = harness_with(|cfg| cfg.runtime.mode = "test".to_string());
	let (robot, service) = h.seed_robot(Provider::Ambi).expect("Failed to seed robot.");
	let mut template = due(service.service_id, 0, "premium", 50);

	template.scout_type = ScoutType::Premium.as_str().to_string();
	h.store.add_template(template);

	h.engine.run_scout_dispatch_at(robot.robot_id, NOW).await.expect("Dispatch failed.");

	let requests = h.portals.requests();
	let mails = h.notifier.sent();

	assert!(!requests[0].1.live);
	assert_eq!(requests[0].1.scout_type, ScoutType::Premium);
	assert_eq!(mails[0].to, vec![OPERATOR.to_string()]);
	assert!(mails[0].body.contains("Mode: test"));
}

#[tokio::test]
async fn live_mode_copies_staff() {
	let h = harness_with(|_| {});
	let (robot, service) = h.seed_robot(Provider::Ran).expect("Failed to seed robot.");

	h.store.add_template(due(service.service_id, 0, "live", 5));
	h.engine.run_scout_dispatch_at(robot.robot_id, NOW).await.expect("Dispatch failed.");

	assert_eq!(h.notifier.sent()[0].to, vec![OPERATOR.to_string(), STAFF.to_string()]);
}

#[tokio::test]
async fn overlapping_trigger_is_rejected() {
	let h = harness_with(|_| {});
	let (robot, _) = h.seed_robot(Provider::Ran).expect("Failed to seed robot.");
	let _held = h.engine.flight().try_acquire(FlightKey::Robot(robot.robot_id));
	let result = h.engine.run_scout_dispatch_at(robot.robot_id, NOW).await;

	assert!(matches!(result, Err(Error::AlreadyRunning { .. })));
	assert!(h.portals.opened().is_empty());
}

#[tokio::test]
async fn unreadable_credentials_are_a_configuration_failure() {
	let h = harness_with(|_| {});
	let (robot, mut service) = h.seed_robot(Provider::Ran).expect("Failed to seed robot.");

	service.password_sealed = "not-sealed".to_string();
	h.store.state().services[0] = service.clone();
	h.store.add_template(due(service.service_id, 0, "any", 5));

	let report = h.engine.run_scout_dispatch_at(robot.robot_id, NOW).await.expect("Dispatch failed.");

	let RunOutcome::Failed { failure } = &report.outcome else {
		panic!("Expected a failed run, got {:?}.", report.outcome);
	};

	assert_eq!(failure.kind, FailureKind::Configuration);
	assert!(h.portals.opened().is_empty());
	assert_eq!(h.notifier.sent().len(), 1);
}
