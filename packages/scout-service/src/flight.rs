//! Per-key single-flight guard: a second run for a held key is refused instead of queued.

use std::{
	collections::HashSet,
	fmt,
	sync::{Arc, Mutex},
};

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlightKey {
	Robot(Uuid),
	Ingestion,
	Inbound(Uuid),
}
impl fmt::Display for FlightKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Robot(id) => write!(f, "robot {id}"),
			Self::Ingestion => f.write_str("entry ingestion"),
			Self::Inbound(id) => write!(f, "inbound detection for robot {id}"),
		}
	}
}

#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
	held: Arc<Mutex<HashSet<FlightKey>>>,
}
impl SingleFlight {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns `None` while another guard for `key` is alive.
	pub fn try_acquire(&self, key: FlightKey) -> Option<FlightGuard> {
		let mut held = self.held.lock().unwrap_or_else(|err| err.into_inner());

		if !held.insert(key) {
			return None;
		}

		Some(FlightGuard { key, held: self.held.clone() })
	}

	pub fn is_held(&self, key: FlightKey) -> bool {
		self.held.lock().unwrap_or_else(|err| err.into_inner()).contains(&key)
	}
}

#[derive(Debug)]
pub struct FlightGuard {
	key: FlightKey,
	held: Arc<Mutex<HashSet<FlightKey>>>,
}
impl FlightGuard {
	pub fn key(&self) -> FlightKey {
		self.key
	}
}
impl Drop for FlightGuard {
	fn drop(&mut self) {
		self.held.lock().unwrap_or_else(|err| err.into_inner()).remove(&self.key);
	}
}
