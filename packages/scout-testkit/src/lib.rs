//! Fakes and fixtures shared by the workspace's integration tests.

pub mod browser;
pub mod fixtures;
pub mod mail;
pub mod portals;
pub mod store;

mod db;
mod error;

pub use browser::{ScriptedBrowser, ScriptedLauncher};
pub use db::{TestDatabase, env_dsn, with_test_db};
pub use error::{Error, Result};
pub use mail::{CapturingNotifier, FakeMailbox};
pub use portals::{FakePortals, SendScript};
pub use store::MemoryStore;
