pub mod columns;
pub mod dedupe;
pub mod freshness;
pub mod normalize;
pub mod provider;
pub mod quota;
pub mod record;
pub mod schedule;
pub mod secret;
pub mod signal;

mod error;

pub use error::{Error, Result};
pub use provider::{Provider, ScoutType};
pub use record::{CandidateDraft, Gender, RawRecord};
