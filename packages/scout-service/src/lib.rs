pub mod digest;
pub mod dispatch;
pub mod flight;
pub mod inbound;
pub mod ingestion;
pub mod resilience;
pub mod store;

mod error;

pub use dispatch::{DispatchReport, RunContext, RunOutcome, TemplateProgress};
pub use error::{Error, Result};
pub use flight::{FlightGuard, FlightKey, SingleFlight};
pub use inbound::InboundReport;
pub use ingestion::{IngestionReport, PartitionReport, PartitionStatus};
pub use resilience::{FailureKind, RunFailure, run_guarded};
pub use store::Store;

use std::{sync::Arc, time::Duration};

use uuid::Uuid;

use scout_config::Config;
use scout_domain::secret::CredentialCipher;
use scout_mail::{Mailbox, Notifier, OutgoingMail};
use scout_portals::{Credentials, Portals};
use scout_storage::models::ScoutService;

/// External collaborators of the engine. Tests swap in fakes.
pub struct Ports {
	pub store: Arc<dyn Store>,
	pub portals: Arc<dyn Portals>,
	pub notifier: Arc<dyn Notifier>,
	pub mailbox: Arc<dyn Mailbox>,
}

pub struct ScoutEngine {
	pub cfg: Config,
	pub ports: Ports,
	cipher: CredentialCipher,
	flight: SingleFlight,
}
impl ScoutEngine {
	pub fn new(cfg: Config, ports: Ports) -> Result<Self> {
		let cipher = CredentialCipher::from_base64_key(&cfg.security.credential_key)?;

		Ok(Self { cfg, ports, cipher, flight: SingleFlight::new() })
	}

	pub fn flight(&self) -> &SingleFlight {
		&self.flight
	}

	pub(crate) fn run_deadline(&self) -> Duration {
		Duration::from_secs(self.cfg.runtime.run_deadline_secs)
	}

	pub(crate) fn credentials(&self, service: &ScoutService) -> Result<Credentials, RunFailure> {
		let password = self.cipher.open(&service.password_sealed).map_err(|err| {
			RunFailure::configuration(format!(
				"Credentials for {} service {} cannot be opened: {err}",
				service.provider, service.service_id
			))
		})?;

		Ok(Credentials { login_id: service.login_id.clone(), password })
	}

	/// Sends a digest. Delivery problems are logged and never change the run result.
	pub(crate) async fn deliver(&self, mail: &OutgoingMail) -> bool {
		match self.ports.notifier.send(mail).await {
			Ok(()) => true,
			Err(err) => {
				tracing::error!(error = %err, subject = %mail.subject, "Failed to send digest.");

				false
			},
		}
	}

	/// Closes the browsers an aborted run left open. Sessions of other runs are untouched.
	pub(crate) async fn release_sessions(&self, run_id: Uuid) {
		let released = self.ports.portals.release_owned(run_id).await;

		if released > 0 {
			tracing::warn!(%run_id, released, "Released browser sessions left by an aborted run.");
		}
	}
}
