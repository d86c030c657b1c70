use serde::{Deserialize, Serialize};
use time::Date;

/// Field values read from a portal, keyed by their on-page or column position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
	pub external_id: Option<String>,
	pub fields: Vec<String>,
}
impl RawRecord {
	pub fn new<I, S>(external_id: Option<String>, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self { external_id, fields: fields.into_iter().map(Into::into).collect() }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
	Male,
	Female,
	Other,
}
impl Gender {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Male => "male",
			Self::Female => "female",
			Self::Other => "other",
		}
	}
}

/// Canonical candidate fields before persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateDraft {
	pub external_id: Option<String>,
	pub last_name: String,
	pub first_name: String,
	pub last_name_kana: Option<String>,
	pub first_name_kana: Option<String>,
	pub email: Option<String>,
	pub phone: Option<String>,
	pub birthday: Option<Date>,
	pub gender: Option<Gender>,
	pub prefecture: Option<String>,
	pub address: Option<String>,
	pub final_education: Option<String>,
	pub current_company: Option<String>,
	pub current_position: Option<String>,
	pub annual_income: Option<i32>,
	pub memo: String,
}
impl CandidateDraft {
	pub fn has_name(&self) -> bool {
		!self.last_name.trim().is_empty() && !self.first_name.trim().is_empty()
	}
}
