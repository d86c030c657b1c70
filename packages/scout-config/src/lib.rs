mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Dispatch, Mail, Mailbox, PortalEndpoint, Portals, Postgres, Runtime, Security,
	Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if !matches!(cfg.runtime.mode.as_str(), "live" | "test") {
		return Err(Error::Validation {
			message: "runtime.mode must be one of live or test.".to_string(),
		});
	}
	if cfg.runtime.run_deadline_secs == 0 {
		return Err(Error::Validation {
			message: "runtime.run_deadline_secs must be greater than zero.".to_string(),
		});
	}
	if !(-12..=14).contains(&cfg.runtime.utc_offset_hours) {
		return Err(Error::Validation {
			message: "runtime.utc_offset_hours must be in the range -12..=14.".to_string(),
		});
	}
	if cfg.runtime.download_dir.as_os_str().is_empty() {
		return Err(Error::Validation {
			message: "runtime.download_dir must be non-empty.".to_string(),
		});
	}

	for (label, value) in [
		("runtime.entry_lookback_days", cfg.runtime.entry_lookback_days),
		("runtime.stale_after_hours", cfg.runtime.stale_after_hours),
		("runtime.service_idle_reset_days", cfg.runtime.service_idle_reset_days),
	] {
		if value <= 0 {
			return Err(Error::Validation { message: format!("{label} must be greater than zero.") });
		}
	}

	if cfg.dispatch.max_sends_per_run == 0 {
		return Err(Error::Validation {
			message: "dispatch.max_sends_per_run must be greater than zero.".to_string(),
		});
	}
	if cfg.portals.webdriver_url.trim().is_empty() {
		return Err(Error::Validation {
			message: "portals.webdriver_url must be non-empty.".to_string(),
		});
	}
	if cfg.portals.step_timeout_ms == 0 || cfg.portals.download_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "portals.step_timeout_ms and portals.download_timeout_ms must be greater than zero."
				.to_string(),
		});
	}

	for (label, endpoint) in [
		("portals.ran", &cfg.portals.ran),
		("portals.ambi", &cfg.portals.ambi),
		("portals.mynavi_scouting", &cfg.portals.mynavi_scouting),
		("portals.mynavi_agent_scout", &cfg.portals.mynavi_agent_scout),
	] {
		if !endpoint.base_url.starts_with("https://") && !endpoint.base_url.starts_with("http://")
		{
			return Err(Error::Validation {
				message: format!("{label}.base_url must be an http(s) URL."),
			});
		}
	}

	if cfg.mail.smtp_host.trim().is_empty() {
		return Err(Error::Validation { message: "mail.smtp_host must be non-empty.".to_string() });
	}
	if cfg.mail.smtp_port == 0 {
		return Err(Error::Validation {
			message: "mail.smtp_port must be greater than zero.".to_string(),
		});
	}

	for (label, address) in
		[("mail.from", &cfg.mail.from), ("mail.operator_address", &cfg.mail.operator_address)]
	{
		if !address.contains('@') {
			return Err(Error::Validation {
				message: format!("{label} must be an email address."),
			});
		}
	}
	for (label, value) in [
		("mailbox.api_base", &cfg.mailbox.api_base),
		("mailbox.user_id", &cfg.mailbox.user_id),
		("security.credential_key", &cfg.security.credential_key),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for endpoint in [
		&mut cfg.portals.ran,
		&mut cfg.portals.ambi,
		&mut cfg.portals.mynavi_scouting,
		&mut cfg.portals.mynavi_agent_scout,
	] {
		endpoint.base_url = endpoint.base_url.trim().trim_end_matches('/').to_string();
	}

	cfg.mailbox.api_base = cfg.mailbox.api_base.trim().trim_end_matches('/').to_string();

	if cfg.security.trigger_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false)
	{
		cfg.security.trigger_token = None;
	}
	if cfg.security.push_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false) {
		cfg.security.push_token = None;
	}
}
