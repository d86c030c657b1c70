use std::sync::Arc;

use scout_config::Config;
use scout_mail::{GmailMailbox, SmtpNotifier};
use scout_portals::{BrowserPortals, WebDriverLauncher};
use scout_service::{Ports, ScoutEngine};
use scout_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<ScoutEngine>,
}
impl AppState {
	/// Connects Postgres, the WebDriver endpoint, SMTP and the mailbox API.
	pub async fn new(config: Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let launcher = Arc::new(WebDriverLauncher::from_config(&config));
		let portals = BrowserPortals::from_config(&config, launcher);
		let notifier = SmtpNotifier::from_config(&config.mail)?;
		let mailbox = GmailMailbox::from_config(&config.mailbox)?;
		let ports = Ports {
			store: Arc::new(db),
			portals: Arc::new(portals),
			notifier: Arc::new(notifier),
			mailbox: Arc::new(mailbox),
		};
		let engine = ScoutEngine::new(config, ports)?;

		Ok(Self::from_engine(Arc::new(engine)))
	}

	pub fn from_engine(engine: Arc<ScoutEngine>) -> Self {
		Self { engine }
	}
}
