use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub runtime: Runtime,
	pub dispatch: Dispatch,
	pub portals: Portals,
	pub mail: Mail,
	pub mailbox: Mailbox,
	pub security: Security,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Runtime {
	/// Either "live" or "test". Test mode runs the send flow without confirming the final dialog
	/// and keeps the digest away from staff.
	pub mode: String,
	#[serde(default = "default_run_deadline_secs")]
	pub run_deadline_secs: u64,
	#[serde(default = "default_utc_offset_hours")]
	pub utc_offset_hours: i8,
	pub download_dir: PathBuf,
	#[serde(default = "default_entry_lookback_days")]
	pub entry_lookback_days: i64,
	#[serde(default = "default_stale_after_hours")]
	pub stale_after_hours: i64,
	#[serde(default = "default_service_idle_reset_days")]
	pub service_idle_reset_days: i64,
}
impl Runtime {
	pub fn is_live(&self) -> bool {
		self.mode == "live"
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Dispatch {
	pub max_sends_per_run: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Portals {
	pub webdriver_url: String,
	#[serde(default = "default_true")]
	pub headless: bool,
	#[serde(default = "default_step_timeout_ms")]
	pub step_timeout_ms: u64,
	#[serde(default = "default_download_timeout_ms")]
	pub download_timeout_ms: u64,
	pub ran: PortalEndpoint,
	pub ambi: PortalEndpoint,
	pub mynavi_scouting: PortalEndpoint,
	pub mynavi_agent_scout: PortalEndpoint,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortalEndpoint {
	pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Mail {
	pub smtp_host: String,
	pub smtp_port: u16,
	pub username: String,
	pub password: String,
	pub from: String,
	pub operator_address: String,
	#[serde(default = "default_subject_prefix")]
	pub subject_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Mailbox {
	pub api_base: String,
	pub user_id: String,
	pub access_token: String,
	#[serde(default = "default_mailbox_timeout_ms")]
	pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Security {
	/// Base64 encoded 32 byte key used to open sealed portal passwords.
	pub credential_key: String,
	/// Optional bearer token required on the run trigger endpoints.
	pub trigger_token: Option<String>,
	/// Optional token expected in the `token` query parameter of the push webhook.
	pub push_token: Option<String>,
}

fn default_run_deadline_secs() -> u64 {
	40 * 60
}

fn default_utc_offset_hours() -> i8 {
	9
}

fn default_entry_lookback_days() -> i64 {
	2
}

fn default_stale_after_hours() -> i64 {
	12
}

fn default_service_idle_reset_days() -> i64 {
	4
}

fn default_true() -> bool {
	true
}

fn default_step_timeout_ms() -> u64 {
	30_000
}

fn default_download_timeout_ms() -> u64 {
	120_000
}

fn default_mailbox_timeout_ms() -> u64 {
	10_000
}

fn default_subject_prefix() -> String {
	"[scout]".to_string()
}
