use std::{
	collections::HashSet,
	sync::{
		Mutex,
		atomic::{AtomicBool, Ordering},
	},
};

use scout_mail::{BoxFuture, Error, Mailbox, Notifier, OutgoingMail, Result};

/// Records every mail instead of sending it.
#[derive(Default)]
pub struct CapturingNotifier {
	sent: Mutex<Vec<OutgoingMail>>,
	failing: AtomicBool,
}
impl CapturingNotifier {
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes every later send fail after recording the mail.
	pub fn fail_sends(&self) {
		self.failing.store(true, Ordering::SeqCst);
	}

	pub fn sent(&self) -> Vec<OutgoingMail> {
		self.sent.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}
impl Notifier for CapturingNotifier {
	fn send<'a>(&'a self, mail: &'a OutgoingMail) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.sent.lock().unwrap_or_else(|err| err.into_inner()).push(mail.clone());

			if self.failing.load(Ordering::SeqCst) {
				return Err(Error::Api { status: 503, message: "SMTP relay unavailable.".to_string() });
			}

			Ok(())
		})
	}
}

#[derive(Debug, Clone)]
struct FakeMessage {
	query: String,
	id: String,
	body: String,
}

#[derive(Default)]
struct MailboxState {
	messages: Vec<FakeMessage>,
	read: HashSet<String>,
	queries: Vec<String>,
	crashing: HashSet<String>,
}

/// An in-memory mailbox keyed by the exact search query each message answers to.
#[derive(Default)]
pub struct FakeMailbox {
	state: Mutex<MailboxState>,
}
impl FakeMailbox {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn deliver(&self, query: &str, id: &str, body: &str) {
		self.lock().messages.push(FakeMessage {
			query: query.to_string(),
			id: id.to_string(),
			body: body.to_string(),
		});
	}

	/// Makes reading the body of `id` panic, the way a broken parser dependency would.
	pub fn crash_on_body(&self, id: &str) {
		self.lock().crashing.insert(id.to_string());
	}

	pub fn is_read(&self, id: &str) -> bool {
		self.lock().read.contains(id)
	}

	pub fn queries(&self) -> Vec<String> {
		self.lock().queries.clone()
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, MailboxState> {
		self.state.lock().unwrap_or_else(|err| err.into_inner())
	}
}
impl Mailbox for FakeMailbox {
	fn list_unread<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(async move {
			let mut state = self.lock();

			state.queries.push(query.to_string());

			let ids = state
				.messages
				.iter()
				.filter(|message| message.query == query && !state.read.contains(&message.id))
				.map(|message| message.id.clone())
				.collect();

			Ok(ids)
		})
	}

	fn message_body<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move {
			let crashing = self.lock().crashing.contains(id);

			if crashing {
				panic!("Mailbox client crashed while reading {id}.");
			}

			self.lock()
				.messages
				.iter()
				.find(|message| message.id == id)
				.map(|message| message.body.clone())
				.ok_or_else(|| Error::EmptyBody { id: id.to_string() })
		})
	}

	fn mark_read<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.lock().read.insert(id.to_string());

			Ok(())
		})
	}
}
