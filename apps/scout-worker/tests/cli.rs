use clap::Parser;
use uuid::Uuid;

use scout_domain::{Provider, secret::CredentialCipher};
use scout_testkit::fixtures::{self, CREDENTIAL_KEY, Harness};
use scout_worker::{Args, Command, triggers};

#[test]
fn parses_every_trigger() {
	let robot_id = Uuid::new_v4();
	let robot_arg = robot_id.to_string();
	let dispatch = Args::try_parse_from([
		"scout-worker",
		"-c",
		"scout.toml",
		"dispatch",
		"--robot-id",
		robot_arg.as_str(),
	])
	.expect("dispatch should parse");

	assert_eq!(dispatch.command, Command::Dispatch { robot_id });

	for (word, command) in [
		("ingest", Command::Ingest),
		("dispatch-all", Command::DispatchAll),
		("seal-password", Command::SealPassword),
	] {
		let args = Args::try_parse_from(["scout-worker", "--config", "scout.toml", word])
			.expect("trigger should parse");

		assert_eq!(args.command, command);
	}

	assert!(Args::try_parse_from(["scout-worker", "-c", "scout.toml", "dispatch"]).is_err());
	assert!(
		Args::try_parse_from([
			"scout-worker",
			"-c",
			"scout.toml",
			"dispatch",
			"--robot-id",
			"robot-1",
		])
		.is_err()
	);
}

#[test]
fn sealed_passwords_open_with_the_configured_key() {
	let sealed =
		triggers::seal_password(&fixtures::config(), "portal-pass\n").expect("Sealing failed.");
	let cipher = CredentialCipher::from_base64_key(CREDENTIAL_KEY).expect("Key is valid.");

	assert_eq!(cipher.open(&sealed).expect("Opening failed."), "portal-pass");
	assert!(triggers::seal_password(&fixtures::config(), "\n").is_err());
}

#[tokio::test]
async fn dispatch_all_reports_every_active_robot() {
	let h = Harness::new(fixtures::config()).expect("Failed to build harness.");

	h.seed_robot(Provider::Ran).expect("Failed to seed robot.");
	h.seed_robot(Provider::Ambi).expect("Failed to seed robot.");

	let output =
		triggers::execute(&h.engine, Command::DispatchAll).await.expect("Dispatch failed.");
	let reports: serde_json::Value = serde_json::from_str(&output).expect("Output is JSON.");

	assert_eq!(reports.as_array().map(Vec::len), Some(2));
	assert!(
		reports
			.as_array()
			.into_iter()
			.flatten()
			.all(|report| report["outcome"]["status"] == "nothing_due")
	);
}
