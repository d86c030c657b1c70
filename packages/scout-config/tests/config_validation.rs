use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use scout_config::Config;

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

fn sample_toml_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Value = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");
	let mut table = root.as_table_mut().expect("Sample config must be a table.");

	for part in section.split('.') {
		table = table
			.get_mut(part)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Sample config must include [{section}]."));
	}

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render sample config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("scout_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse test config.")
}

#[test]
fn loads_and_normalizes_sample() {
	let path = write_temp_config(SAMPLE_CONFIG_TOML.to_string());
	let result = scout_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Sample config must load.");

	assert_eq!(cfg.portals.ran.base_url, "https://ran.example.jp");
	assert_eq!(cfg.mailbox.api_base, "https://gmail.googleapis.com");
	assert!(cfg.security.trigger_token.is_none());
	assert!(!cfg.runtime.is_live());
	assert_eq!(cfg.mail.subject_prefix, "[scout]");
}

#[test]
fn runtime_mode_must_be_known() {
	let payload = sample_toml_with("runtime", "mode", Value::String("staging".to_string()));
	let path = write_temp_config(payload);
	let result = scout_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected runtime.mode validation error.");

	assert!(
		err.to_string().contains("runtime.mode must be one of live or test."),
		"Unexpected error: {err}"
	);
}

#[test]
fn run_cap_must_be_positive() {
	let mut cfg = base_config();

	cfg.dispatch.max_sends_per_run = 0;

	let err = scout_config::validate(&cfg).expect_err("Expected run cap validation error.");

	assert!(
		err.to_string().contains("dispatch.max_sends_per_run must be greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn portal_base_url_must_be_http() {
	let payload =
		sample_toml_with("portals.ambi", "base_url", Value::String("ambi.example.jp".to_string()));
	let path = write_temp_config(payload);
	let result = scout_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected base_url validation error.");

	assert!(
		err.to_string().contains("portals.ambi.base_url must be an http(s) URL."),
		"Unexpected error: {err}"
	);
}

#[test]
fn lookback_and_staleness_windows_must_be_positive() {
	let mut cfg = base_config();

	cfg.runtime.stale_after_hours = 0;

	let err = scout_config::validate(&cfg).expect_err("Expected stale window validation error.");

	assert!(
		err.to_string().contains("runtime.stale_after_hours must be greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn operator_address_must_look_like_email() {
	let mut cfg = base_config();

	cfg.mail.operator_address = "ops".to_string();

	let err = scout_config::validate(&cfg).expect_err("Expected operator address error.");

	assert!(
		err.to_string().contains("mail.operator_address must be an email address."),
		"Unexpected error: {err}"
	);
}

#[test]
fn defaults_apply_when_omitted() {
	let mut root: Value = toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.");
	let runtime = root
		.get_mut("runtime")
		.and_then(Value::as_table_mut)
		.expect("Sample config must include [runtime].");

	runtime.remove("run_deadline_secs");
	runtime.remove("entry_lookback_days");

	let cfg: Config =
		toml::from_str(&toml::to_string(&root).expect("Failed to render config."))
			.expect("Failed to parse config.");

	assert_eq!(cfg.runtime.run_deadline_secs, 2_400);
	assert_eq!(cfg.runtime.entry_lookback_days, 2);
}
