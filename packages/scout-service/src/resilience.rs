//! The single recovery boundary every run executes under.
//!
//! A run future is raced against its deadline and unwinding is caught, so a timeout or a panic
//! deep inside a portal driver becomes a [`RunFailure`] the caller can report.

use std::{
	any::Any,
	backtrace::Backtrace,
	cell::RefCell,
	future::Future,
	panic::{self, AssertUnwindSafe},
	sync::Once,
	time::Duration,
};

use futures::FutureExt as _;
use serde::Serialize;

use crate::Error;

const ENGINE_CRATES: [&str; 5] =
	["scout_service", "scout_portals", "scout_domain", "scout_mail", "scout_storage"];
const MAX_STACK_FRAMES: usize = 24;

static HOOK: Once = Once::new();

thread_local! {
	static LAST_PANIC_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
	Configuration,
	Portal,
	Storage,
	Mailbox,
	Timeout,
	AutomationFault,
}
impl FailureKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Configuration => "configuration",
			Self::Portal => "portal",
			Self::Storage => "storage",
			Self::Mailbox => "mailbox",
			Self::Timeout => "timeout",
			Self::AutomationFault => "automation fault",
		}
	}
}

/// A classified run failure, ready for the digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{} failure: {message}", .kind.as_str())]
pub struct RunFailure {
	pub kind: FailureKind,
	pub message: String,
	/// Engine frames captured when the failure was a panic.
	pub stack: Option<String>,
}
impl RunFailure {
	pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
		Self { kind, message: message.into(), stack: None }
	}

	pub fn configuration(message: impl Into<String>) -> Self {
		Self::new(FailureKind::Configuration, message)
	}
}
impl From<scout_portals::Error> for RunFailure {
	fn from(err: scout_portals::Error) -> Self {
		let kind = if err.is_timeout() { FailureKind::Timeout } else { FailureKind::Portal };

		Self::new(kind, err.to_string())
	}
}
impl From<Error> for RunFailure {
	fn from(err: Error) -> Self {
		let kind = match &err {
			Error::Storage { .. } => FailureKind::Storage,
			Error::Mailbox { .. } | Error::Signal { .. } => FailureKind::Mailbox,
			Error::Aborted { .. } => FailureKind::AutomationFault,
			Error::AlreadyRunning { .. }
			| Error::InvalidRequest { .. }
			| Error::Configuration { .. } => FailureKind::Configuration,
		};

		Self::new(kind, err.to_string())
	}
}

impl From<RunFailure> for Error {
	fn from(failure: RunFailure) -> Self {
		Self::Aborted { message: failure.to_string() }
	}
}

/// Installs a panic hook that records a backtrace for the panicking thread. Idempotent.
pub fn install_panic_hook() {
	HOOK.call_once(|| {
		let previous = panic::take_hook();

		panic::set_hook(Box::new(move |info| {
			let trace = Backtrace::force_capture().to_string();

			LAST_PANIC_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));

			previous(info);
		}));
	});
}

/// Runs `fut` under `deadline`, converting elapsed time and panics into a [`RunFailure`].
///
/// On timeout the future is dropped at its current await point.
pub async fn run_guarded<F, T>(deadline: Duration, fut: F) -> Result<T, RunFailure>
where
	F: Future<Output = Result<T, RunFailure>> + Send,
{
	install_panic_hook();

	match tokio::time::timeout(deadline, AssertUnwindSafe(fut).catch_unwind()).await {
		Ok(Ok(result)) => result,
		Ok(Err(payload)) => Err(classify_panic(payload.as_ref())),
		Err(_) => Err(RunFailure::new(
			FailureKind::Timeout,
			format!("Run exceeded its {}s deadline.", deadline.as_secs()),
		)),
	}
}

fn classify_panic(payload: &(dyn Any + Send)) -> RunFailure {
	let message = panic_message(payload);
	let lowered = message.to_lowercase();
	let kind = if lowered.contains("deadline") || lowered.contains("timeout") {
		FailureKind::Timeout
	} else {
		FailureKind::AutomationFault
	};
	let trace = LAST_PANIC_TRACE.with(|slot| slot.borrow_mut().take());
	let stack = trace.map(|trace| engine_frames(&trace)).filter(|frames| !frames.is_empty());

	RunFailure { kind, message, stack }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		return (*message).to_string();
	}
	if let Some(message) = payload.downcast_ref::<String>() {
		return message.clone();
	}

	"Panic with a non-string payload.".to_string()
}

/// Keeps only backtrace frames (and their source lines) that belong to engine crates.
pub fn engine_frames(trace: &str) -> String {
	let mut out = Vec::new();
	let mut keep_location = false;

	for line in trace.lines() {
		let trimmed = line.trim_start();

		if trimmed.starts_with("at ") {
			if keep_location {
				out.push(format!("      {trimmed}"));
			}

			continue;
		}

		let symbol = trimmed.split_once(": ").map(|(_, symbol)| symbol).unwrap_or(trimmed);

		keep_location = ENGINE_CRATES.iter().any(|krate| symbol.starts_with(&format!("{krate}::")))
			&& out.len() < MAX_STACK_FRAMES * 2;

		if keep_location {
			out.push(symbol.to_string());
		}
	}

	out.join("\n")
}
