use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Candidate sourcing portals driven by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
	Ran,
	Ambi,
	MynaviScouting,
	MynaviAgentScout,
}
impl Provider {
	/// Dispatch priority. The first provider with due templates wins a scheduler invocation.
	pub const PRIORITY: [Provider; 4] =
		[Provider::Ran, Provider::Ambi, Provider::MynaviScouting, Provider::MynaviAgentScout];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Ran => "ran",
			Self::Ambi => "ambi",
			Self::MynaviScouting => "mynavi_scouting",
			Self::MynaviAgentScout => "mynavi_agent_scout",
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			Self::Ran => "RAN",
			Self::Ambi => "AMBI",
			Self::MynaviScouting => "Mynavi Scouting",
			Self::MynaviAgentScout => "Mynavi Agent Scout",
		}
	}

	pub fn priority(self) -> usize {
		Self::PRIORITY.iter().position(|provider| *provider == self).unwrap_or(usize::MAX)
	}

	/// Bulk send sizes accepted by the portal. Empty means any count.
	pub fn send_increments(self) -> &'static [u32] {
		match self {
			Self::Ambi => &[50, 100, 300, 500],
			Self::Ran | Self::MynaviScouting | Self::MynaviAgentScout => &[],
		}
	}

	pub fn scout_types(self) -> &'static [ScoutType] {
		match self {
			Self::Ran => &[ScoutType::Normal, ScoutType::Repeat, ScoutType::SendOtherJob],
			Self::Ambi => &[
				ScoutType::Normal,
				ScoutType::Premium,
				ScoutType::NormalRepeat,
				ScoutType::PremiumRepeat,
			],
			Self::MynaviScouting | Self::MynaviAgentScout => &[ScoutType::Normal],
		}
	}

	pub fn supports(self, scout_type: ScoutType) -> bool {
		self.scout_types().contains(&scout_type)
	}

	pub fn ensure_supports(self, scout_type: ScoutType) -> Result<()> {
		if self.supports(scout_type) {
			return Ok(());
		}

		Err(Error::UnsupportedScoutType {
			provider: self.label().to_string(),
			scout_type: scout_type.as_str().to_string(),
		})
	}
}
impl fmt::Display for Provider {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}
impl FromStr for Provider {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw.trim() {
			"ran" => Ok(Self::Ran),
			"ambi" => Ok(Self::Ambi),
			"mynavi_scouting" => Ok(Self::MynaviScouting),
			"mynavi_agent_scout" => Ok(Self::MynaviAgentScout),
			other => Err(Error::UnknownProvider(other.to_string())),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoutType {
	Normal,
	Repeat,
	SendOtherJob,
	Premium,
	NormalRepeat,
	PremiumRepeat,
}
impl ScoutType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Normal => "normal",
			Self::Repeat => "repeat",
			Self::SendOtherJob => "send_other_job",
			Self::Premium => "premium",
			Self::NormalRepeat => "normal_repeat",
			Self::PremiumRepeat => "premium_repeat",
		}
	}

	pub fn is_premium(self) -> bool {
		matches!(self, Self::Premium | Self::PremiumRepeat)
	}
}
impl FromStr for ScoutType {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw.trim() {
			"normal" => Ok(Self::Normal),
			"repeat" => Ok(Self::Repeat),
			"send_other_job" => Ok(Self::SendOtherJob),
			"premium" => Ok(Self::Premium),
			"normal_repeat" => Ok(Self::NormalRepeat),
			"premium_repeat" => Ok(Self::PremiumRepeat),
			other => Err(Error::UnknownScoutType(other.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_storage_names() {
		for provider in Provider::PRIORITY {
			assert_eq!(provider.as_str().parse::<Provider>().expect("parse failed"), provider);
		}

		assert!("indeed".parse::<Provider>().is_err());
	}

	#[test]
	fn scout_types_are_provider_specific() {
		assert!(Provider::Ran.supports(ScoutType::SendOtherJob));
		assert!(!Provider::Ambi.supports(ScoutType::SendOtherJob));
		assert!(Provider::Ambi.supports(ScoutType::PremiumRepeat));
		assert!(Provider::MynaviScouting.ensure_supports(ScoutType::Repeat).is_err());
	}
}
