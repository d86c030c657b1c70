//! Candidate identity used to suppress duplicate ingestion.

use unicode_normalization::UnicodeNormalization;

use crate::CandidateDraft;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupeKey {
	last_name: String,
	first_name: String,
	last_name_kana: Option<String>,
	first_name_kana: Option<String>,
	email: Option<String>,
}
impl DedupeKey {
	pub fn new(
		last_name: &str,
		first_name: &str,
		last_name_kana: Option<&str>,
		first_name_kana: Option<&str>,
		email: Option<&str>,
	) -> Self {
		Self {
			last_name: fold(last_name),
			first_name: fold(first_name),
			last_name_kana: last_name_kana.map(fold).filter(|value| !value.is_empty()),
			first_name_kana: first_name_kana.map(fold).filter(|value| !value.is_empty()),
			email: email
				.map(|value| value.trim().to_lowercase())
				.filter(|value| !value.is_empty()),
		}
	}

	pub fn from_draft(draft: &CandidateDraft) -> Self {
		Self::new(
			&draft.last_name,
			&draft.first_name,
			draft.last_name_kana.as_deref(),
			draft.first_name_kana.as_deref(),
			draft.email.as_deref(),
		)
	}

	/// Names must agree. Optional keys only decide the outcome when both sides carry one.
	pub fn matches(&self, other: &Self) -> bool {
		if self.last_name != other.last_name || self.first_name != other.first_name {
			return false;
		}

		let mut shared = 0;
		let mut agreeing = 0;

		for (left, right) in [
			(&self.last_name_kana, &other.last_name_kana),
			(&self.first_name_kana, &other.first_name_kana),
			(&self.email, &other.email),
		] {
			if let (Some(left), Some(right)) = (left, right) {
				shared += 1;

				if left == right {
					agreeing += 1;
				}
			}
		}

		shared == 0 || agreeing > 0
	}
}

fn fold(raw: &str) -> String {
	raw.nfkc().filter(|c| !c.is_whitespace()).collect()
}
