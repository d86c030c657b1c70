//! Portals that answer from canned data instead of driving a browser.

use std::{
	collections::{HashMap, HashSet},
	sync::{Arc, Mutex, MutexGuard},
	time::Duration,
};

use tokio::sync::Notify;
use uuid::Uuid;

use scout_domain::{Provider, RawRecord, signal::BULK_EXPORT_ID};
use scout_portals::{
	BoxFuture, Credentials, Error, PortalSession, Portals, Result, SendFailure, SendRequest,
};

/// What a send for one saved condition does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendScript {
	/// Sends this many, capped by the request ceiling.
	Sends(u32),
	/// The send button is disabled.
	Disabled,
	/// Stops with a portal error after `sent` scouts.
	FailsAfter { sent: u32, message: String },
	Panics(String),
	/// Never finishes.
	Hangs,
	/// Waits for [`FakePortals::open_gate`], then sends this many.
	Gated(u32),
}

#[derive(Default)]
struct PortalsState {
	records: HashMap<Provider, Vec<RawRecord>>,
	sends: HashMap<String, SendScript>,
	open_failures: HashMap<Provider, String>,
	fetch_failures: HashMap<Provider, String>,
	fetch_panics: HashMap<Provider, String>,
	requests: Vec<(Provider, SendRequest)>,
	fetched: Vec<(Provider, Vec<String>)>,
	opened: Vec<Provider>,
	/// Live sessions by id, with the run that owns each.
	live: HashMap<u64, Uuid>,
	/// Sessions released while their run still held them.
	revoked: HashSet<u64>,
	next_id: u64,
	closed: usize,
	released: usize,
}

#[derive(Clone, Default)]
pub struct FakePortals {
	state: Arc<Mutex<PortalsState>>,
	gate: Arc<Notify>,
}
impl FakePortals {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_records(&self, provider: Provider, records: Vec<RawRecord>) -> &Self {
		self.lock().records.insert(provider, records);

		self
	}

	/// Scripts the send for the saved condition titled `search_title`. Unscripted conditions send
	/// the full ceiling.
	pub fn with_send(&self, search_title: &str, script: SendScript) -> &Self {
		self.lock().sends.insert(search_title.to_string(), script);

		self
	}

	pub fn fail_login(&self, provider: Provider) -> &Self {
		self.lock().open_failures.insert(provider, provider.label().to_string());

		self
	}

	pub fn fail_fetch(&self, provider: Provider, message: &str) -> &Self {
		self.lock().fetch_failures.insert(provider, message.to_string());

		self
	}

	pub fn panic_on_fetch(&self, provider: Provider, message: &str) -> &Self {
		self.lock().fetch_panics.insert(provider, message.to_string());

		self
	}

	pub fn requests(&self) -> Vec<(Provider, SendRequest)> {
		self.lock().requests.clone()
	}

	pub fn fetched(&self) -> Vec<(Provider, Vec<String>)> {
		self.lock().fetched.clone()
	}

	pub fn opened(&self) -> Vec<Provider> {
		self.lock().opened.clone()
	}

	pub fn closed(&self) -> usize {
		self.lock().closed
	}

	pub fn released(&self) -> usize {
		self.lock().released
	}

	/// Sessions neither closed nor released.
	pub fn open_sessions(&self) -> usize {
		self.lock().live.len()
	}

	pub fn sessions_owned_by(&self, owner: Uuid) -> usize {
		self.lock().live.values().filter(|held| **held == owner).count()
	}

	/// Sessions that were released out from under a run still using them.
	pub fn revoked(&self) -> usize {
		self.lock().revoked.len()
	}

	/// Lets one [`SendScript::Gated`] send through.
	pub fn open_gate(&self) {
		self.gate.notify_one();
	}

	fn lock(&self) -> MutexGuard<'_, PortalsState> {
		self.state.lock().unwrap_or_else(|err| err.into_inner())
	}
}
impl Portals for FakePortals {
	fn open<'a>(
		&'a self,
		owner: Uuid,
		provider: Provider,
		_credentials: &'a Credentials,
	) -> BoxFuture<'a, Result<Box<dyn PortalSession>>> {
		Box::pin(async move {
			let mut state = self.lock();

			state.opened.push(provider);

			if let Some(label) = state.open_failures.get(&provider) {
				return Err(Error::Auth { provider: label.clone() });
			}

			state.next_id += 1;

			let id = state.next_id;

			state.live.insert(id, owner);

			Ok(Box::new(FakeSession {
				id,
				provider,
				state: self.state.clone(),
				gate: self.gate.clone(),
			}) as Box<dyn PortalSession>)
		})
	}

	fn release_owned(&self, owner: Uuid) -> BoxFuture<'_, usize> {
		Box::pin(async move {
			let mut state = self.lock();
			let ids = state
				.live
				.iter()
				.filter(|(_, held)| **held == owner)
				.map(|(id, _)| *id)
				.collect::<Vec<_>>();

			for id in &ids {
				state.live.remove(id);
				state.revoked.insert(*id);
			}

			state.released += ids.len();

			ids.len()
		})
	}
}

struct FakeSession {
	id: u64,
	provider: Provider,
	state: Arc<Mutex<PortalsState>>,
	gate: Arc<Notify>,
}
impl FakeSession {
	fn lock(&self) -> MutexGuard<'_, PortalsState> {
		self.state.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn ensure_alive(&self) -> Result<()> {
		if self.lock().revoked.contains(&self.id) {
			return Err(Error::Browser { message: "Browser session was closed.".to_string() });
		}

		Ok(())
	}
}
impl PortalSession for FakeSession {
	fn provider(&self) -> Provider {
		self.provider
	}

	fn fetch_entries<'a>(
		&'a mut self,
		ids: &'a [String],
	) -> BoxFuture<'a, Result<Vec<RawRecord>>> {
		Box::pin(async move {
			let (panic_message, failure, records) = {
				let mut state = self.lock();

				state.fetched.push((self.provider, ids.to_vec()));

				(
					state.fetch_panics.get(&self.provider).cloned(),
					state.fetch_failures.get(&self.provider).cloned(),
					state.records.get(&self.provider).cloned().unwrap_or_default(),
				)
			};

			if let Some(message) = panic_message {
				panic!("{message}");
			}
			if let Some(message) = failure {
				return Err(Error::Browser { message });
			}

			let everything = ids.iter().any(|id| id == BULK_EXPORT_ID);

			Ok(records
				.into_iter()
				.filter(|record| {
					everything
						|| record
							.external_id
							.as_ref()
							.is_none_or(|external_id| ids.contains(external_id))
				})
				.collect())
		})
	}

	fn send_scout<'a>(
		&'a mut self,
		request: &'a SendRequest,
	) -> BoxFuture<'a, Result<u32, SendFailure>> {
		Box::pin(async move {
			let script = {
				let mut state = self.lock();

				state.requests.push((self.provider, request.clone()));

				state
					.sends
					.get(&request.search_title)
					.cloned()
					.unwrap_or(SendScript::Sends(request.ceiling))
			};

			let sent = match script {
				SendScript::Sends(count) => count.min(request.ceiling),
				SendScript::Disabled => 0,
				SendScript::FailsAfter { sent, message } => {
					return Err(SendFailure {
						sent: sent.min(request.ceiling),
						source: Error::ElementMissing { selector: message },
					});
				},
				SendScript::Panics(message) => panic!("{message}"),
				SendScript::Hangs => {
					tokio::time::sleep(Duration::from_secs(3_600)).await;

					0
				},
				SendScript::Gated(count) => {
					self.gate.notified().await;

					count.min(request.ceiling)
				},
			};

			self.ensure_alive().map_err(|source| SendFailure { sent: 0, source })?;

			Ok(sent)
		})
	}

	fn close(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
		Box::pin(async move {
			let mut state = self.state.lock().unwrap_or_else(|err| err.into_inner());

			state.live.remove(&self.id);

			state.closed += 1;

			Ok(())
		})
	}
}
