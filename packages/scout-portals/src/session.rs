//! Engine-facing portal sessions, registered per run so a failed run can release the browsers it
//! left open without touching other runs.

use std::{
	collections::HashMap,
	fmt,
	path::PathBuf,
	sync::{
		Arc, Mutex,
		atomic::{AtomicU64, Ordering},
	},
	time::Duration,
};

use uuid::Uuid;

use scout_domain::{Provider, RawRecord, ScoutType};

use crate::{
	Error, Result,
	browser::{BoxFuture, BrowserLauncher, BrowserSession},
	driver::PortalDriver,
};

#[derive(Clone)]
pub struct Credentials {
	pub login_id: String,
	pub password: String,
}
impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials")
			.field("login_id", &self.login_id)
			.field("password", &"<redacted>")
			.finish()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
	pub search_title: String,
	pub message_title: String,
	pub scout_type: ScoutType,
	pub ceiling: u32,
	pub age_limit: Option<u32>,
	/// When false the final confirmation is cancelled and the would-be count is reported.
	pub live: bool,
}

#[derive(Debug, thiserror::Error)]
#[error("Send stopped after {sent} scouts: {source}")]
pub struct SendFailure {
	pub sent: u32,
	#[source]
	pub source: Error,
}

pub trait PortalSession
where
	Self: Send,
{
	fn provider(&self) -> Provider;

	fn fetch_entries<'a>(&'a mut self, ids: &'a [String])
	-> BoxFuture<'a, Result<Vec<RawRecord>>>;

	fn send_scout<'a>(
		&'a mut self,
		request: &'a SendRequest,
	) -> BoxFuture<'a, Result<u32, SendFailure>>;

	fn close(self: Box<Self>) -> BoxFuture<'static, Result<()>>;
}

pub trait Portals
where
	Self: Send + Sync,
{
	/// Launches a browser for the run `owner` and logs in. The browser is released again when
	/// login fails.
	fn open<'a>(
		&'a self,
		owner: Uuid,
		provider: Provider,
		credentials: &'a Credentials,
	) -> BoxFuture<'a, Result<Box<dyn PortalSession>>>;

	/// Closes every session `owner` still holds. Sessions of other runs stay open. Returns how
	/// many were closed.
	fn release_owned(&self, owner: Uuid) -> BoxFuture<'_, usize>;
}

/// Base URL per portal.
#[derive(Debug, Clone)]
pub struct PortalEndpoints {
	pub ran: String,
	pub ambi: String,
	pub mynavi_scouting: String,
	pub mynavi_agent_scout: String,
}
impl PortalEndpoints {
	pub fn from_config(cfg: &scout_config::Portals) -> Self {
		Self {
			ran: cfg.ran.base_url.clone(),
			ambi: cfg.ambi.base_url.clone(),
			mynavi_scouting: cfg.mynavi_scouting.base_url.clone(),
			mynavi_agent_scout: cfg.mynavi_agent_scout.base_url.clone(),
		}
	}

	pub fn base_url(&self, provider: Provider) -> &str {
		match provider {
			Provider::Ran => &self.ran,
			Provider::Ambi => &self.ambi,
			Provider::MynaviScouting => &self.mynavi_scouting,
			Provider::MynaviAgentScout => &self.mynavi_agent_scout,
		}
	}
}

struct Registered {
	owner: Uuid,
	browser: Arc<dyn BrowserSession>,
}

type Registry = Arc<Mutex<HashMap<u64, Registered>>>;

/// [`Portals`] backed by real browser sessions from a [`BrowserLauncher`].
pub struct BrowserPortals {
	launcher: Arc<dyn BrowserLauncher>,
	endpoints: PortalEndpoints,
	download_dir: PathBuf,
	download_wait: Duration,
	registry: Registry,
	next_id: AtomicU64,
}
impl BrowserPortals {
	pub fn new(
		launcher: Arc<dyn BrowserLauncher>,
		endpoints: PortalEndpoints,
		download_dir: PathBuf,
		download_wait: Duration,
	) -> Self {
		Self {
			launcher,
			endpoints,
			download_dir,
			download_wait,
			registry: Arc::new(Mutex::new(HashMap::new())),
			next_id: AtomicU64::new(1),
		}
	}

	pub fn from_config(cfg: &scout_config::Config, launcher: Arc<dyn BrowserLauncher>) -> Self {
		Self::new(
			launcher,
			PortalEndpoints::from_config(&cfg.portals),
			cfg.runtime.download_dir.clone(),
			Duration::from_millis(cfg.portals.download_timeout_ms),
		)
	}

	pub fn open_sessions(&self) -> usize {
		self.registry.lock().unwrap_or_else(|err| err.into_inner()).len()
	}

	pub fn sessions_owned_by(&self, owner: Uuid) -> usize {
		self.registry
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.values()
			.filter(|entry| entry.owner == owner)
			.count()
	}

	async fn open_inner(
		&self,
		owner: Uuid,
		provider: Provider,
		credentials: &Credentials,
	) -> Result<Box<dyn PortalSession>> {
		let browser = self.launcher.launch().await?;
		let id = self.next_id.fetch_add(1, Ordering::SeqCst);

		self.registry
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.insert(id, Registered { owner, browser: browser.clone() });

		let driver = PortalDriver::for_provider(provider);
		let base_url = self.endpoints.base_url(provider).to_string();

		if let Err(err) = driver.authenticate(browser.as_ref(), &base_url, credentials).await {
			release(&self.registry, id, browser).await;

			return Err(err);
		}

		tracing::info!(provider = %provider, %owner, "Portal session opened.");

		Ok(Box::new(BrowserPortalSession {
			id,
			driver,
			browser,
			base_url,
			download_dir: self.download_dir.clone(),
			download_wait: self.download_wait,
			registry: self.registry.clone(),
		}))
	}

	async fn release_owned_inner(&self, owner: Uuid) -> usize {
		let sessions = {
			let mut registry = self.registry.lock().unwrap_or_else(|err| err.into_inner());
			let ids = registry
				.iter()
				.filter(|(_, entry)| entry.owner == owner)
				.map(|(id, _)| *id)
				.collect::<Vec<_>>();

			ids.into_iter()
				.filter_map(|id| registry.remove(&id).map(|entry| (id, entry.browser)))
				.collect::<Vec<_>>()
		};
		let count = sessions.len();

		for (id, browser) in sessions {
			if let Err(err) = browser.close().await {
				tracing::warn!(session = id, error = %err, "Failed to release browser session.");
			}
		}

		count
	}
}
impl Portals for BrowserPortals {
	fn open<'a>(
		&'a self,
		owner: Uuid,
		provider: Provider,
		credentials: &'a Credentials,
	) -> BoxFuture<'a, Result<Box<dyn PortalSession>>> {
		Box::pin(self.open_inner(owner, provider, credentials))
	}

	fn release_owned(&self, owner: Uuid) -> BoxFuture<'_, usize> {
		Box::pin(self.release_owned_inner(owner))
	}
}

struct BrowserPortalSession {
	id: u64,
	driver: PortalDriver,
	browser: Arc<dyn BrowserSession>,
	base_url: String,
	download_dir: PathBuf,
	download_wait: Duration,
	registry: Registry,
}
impl PortalSession for BrowserPortalSession {
	fn provider(&self) -> Provider {
		self.driver.provider()
	}

	fn fetch_entries<'a>(
		&'a mut self,
		ids: &'a [String],
	) -> BoxFuture<'a, Result<Vec<RawRecord>>> {
		Box::pin(self.driver.fetch_entries(
			self.browser.as_ref(),
			&self.base_url,
			ids,
			&self.download_dir,
			self.download_wait,
		))
	}

	fn send_scout<'a>(
		&'a mut self,
		request: &'a SendRequest,
	) -> BoxFuture<'a, Result<u32, SendFailure>> {
		Box::pin(self.driver.select_and_send(self.browser.as_ref(), &self.base_url, request))
	}

	fn close(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
		let Self { id, browser, registry, .. } = *self;

		Box::pin(async move {
			registry.lock().unwrap_or_else(|err| err.into_inner()).remove(&id);

			browser.close().await
		})
	}
}

async fn release(registry: &Registry, id: u64, browser: Arc<dyn BrowserSession>) {
	registry.lock().unwrap_or_else(|err| err.into_inner()).remove(&id);

	if let Err(err) = browser.close().await {
		tracing::warn!(session = id, error = %err, "Failed to release browser session.");
	}
}
