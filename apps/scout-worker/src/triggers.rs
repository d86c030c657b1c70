use std::sync::Arc;

use color_eyre::eyre;

use scout_config::Config;
use scout_domain::secret::CredentialCipher;
use scout_mail::{GmailMailbox, SmtpNotifier};
use scout_portals::{BrowserPortals, WebDriverLauncher};
use scout_service::{Ports, ScoutEngine};
use scout_storage::db::Db;

use crate::Command;

pub async fn connect(config: Config) -> color_eyre::Result<ScoutEngine> {
	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let launcher = Arc::new(WebDriverLauncher::from_config(&config));
	let portals = BrowserPortals::from_config(&config, launcher);
	let ports = Ports {
		store: Arc::new(db),
		portals: Arc::new(portals),
		notifier: Arc::new(SmtpNotifier::from_config(&config.mail)?),
		mailbox: Arc::new(GmailMailbox::from_config(&config.mailbox)?),
	};

	Ok(ScoutEngine::new(config, ports)?)
}

/// Runs one trigger and returns its report as pretty JSON.
pub async fn execute(engine: &ScoutEngine, command: Command) -> color_eyre::Result<String> {
	let output = match command {
		Command::Ingest => {
			let report = engine.run_entry_ingestion().await?;

			tracing::info!(
				partitions = report.partitions.len(),
				failed = report.partitions.iter().filter(|partition| partition.status.is_failed()).count(),
				"Entry ingestion finished."
			);

			serde_json::to_string_pretty(&report)?
		},
		Command::Dispatch { robot_id } => {
			let report = engine.run_scout_dispatch(robot_id).await?;

			tracing::info!(%robot_id, sent = report.sent, "Scout dispatch finished.");

			serde_json::to_string_pretty(&report)?
		},
		Command::DispatchAll => {
			let reports = engine.run_dispatch_all().await?;

			tracing::info!(robots = reports.len(), "Scout dispatch finished for every active robot.");

			serde_json::to_string_pretty(&reports)?
		},
		Command::SealPassword => {
			return Err(eyre::eyre!("seal-password does not run against the engine."));
		},
	};

	Ok(output)
}

pub fn seal_password(config: &Config, password: &str) -> color_eyre::Result<String> {
	let password = password.trim_end_matches(['\r', '\n']);

	if password.is_empty() {
		return Err(eyre::eyre!("Password must not be empty."));
	}

	let cipher = CredentialCipher::from_base64_key(&config.security.credential_key)?;

	Ok(cipher.seal(password)?)
}
