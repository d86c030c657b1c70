//! Position tables for each portal's detail view or CSV export.
//!
//! Positions absent from a table are ignored by the normalizer. Tables are ordered; when two
//! rules write the same field the later one wins.

use crate::Provider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
	ExternalId,
	LastName,
	FirstName,
	FullName,
	LastNameKana,
	FirstNameKana,
	FullNameKana,
	Email,
	Phone,
	Birthday,
	Gender,
	Prefecture,
	Address,
	FinalEducation,
	CurrentCompany,
	CurrentPosition,
	AnnualIncome,
	/// Free text appended to the audit memo under the given label.
	Memo(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
	/// Splits "姓 名" on an ASCII or ideographic space.
	SplitName,
	Date,
	Gender,
	Phone,
	/// Parses "550万円" style amounts into units of 10,000 JPY.
	IncomeManYen,
	Email,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRule {
	pub position: usize,
	pub field: Field,
	pub transform: Option<Transform>,
}

const fn rule(position: usize, field: Field, transform: Option<Transform>) -> ColumnRule {
	ColumnRule { position, field, transform }
}

pub const RAN_DETAIL: &[ColumnRule] = &[
	rule(0, Field::ExternalId, None),
	rule(1, Field::FullName, Some(Transform::SplitName)),
	rule(2, Field::FullNameKana, Some(Transform::SplitName)),
	rule(3, Field::Birthday, Some(Transform::Date)),
	rule(4, Field::Gender, Some(Transform::Gender)),
	rule(5, Field::Prefecture, None),
	rule(6, Field::Phone, Some(Transform::Phone)),
	rule(7, Field::Email, Some(Transform::Email)),
	rule(8, Field::FinalEducation, None),
	rule(9, Field::CurrentCompany, None),
	rule(10, Field::CurrentPosition, None),
	rule(11, Field::AnnualIncome, Some(Transform::IncomeManYen)),
	rule(12, Field::Memo("職務経歴"), None),
	rule(13, Field::Memo("希望条件"), None),
];

pub const AMBI_DETAIL: &[ColumnRule] = &[
	rule(0, Field::ExternalId, None),
	rule(1, Field::FullName, Some(Transform::SplitName)),
	rule(2, Field::FullNameKana, Some(Transform::SplitName)),
	rule(3, Field::Gender, Some(Transform::Gender)),
	rule(4, Field::Birthday, Some(Transform::Date)),
	rule(5, Field::Prefecture, None),
	rule(6, Field::Email, Some(Transform::Email)),
	rule(7, Field::Phone, Some(Transform::Phone)),
	rule(8, Field::FinalEducation, None),
	rule(9, Field::CurrentCompany, None),
	rule(10, Field::CurrentPosition, None),
	rule(11, Field::AnnualIncome, Some(Transform::IncomeManYen)),
	rule(12, Field::Memo("職務経歴"), None),
	rule(13, Field::Memo("自己PR"), None),
];

pub const MYNAVI_SCOUTING_CSV: &[ColumnRule] = &[
	rule(0, Field::ExternalId, None),
	rule(2, Field::FullName, Some(Transform::SplitName)),
	rule(3, Field::FullNameKana, Some(Transform::SplitName)),
	rule(4, Field::Birthday, Some(Transform::Date)),
	rule(5, Field::Gender, Some(Transform::Gender)),
	rule(6, Field::Email, Some(Transform::Email)),
	rule(7, Field::Phone, Some(Transform::Phone)),
	rule(8, Field::Prefecture, None),
	rule(9, Field::Address, None),
	rule(10, Field::FinalEducation, None),
	rule(11, Field::CurrentCompany, None),
	rule(12, Field::AnnualIncome, Some(Transform::IncomeManYen)),
	rule(13, Field::Memo("職務経歴"), None),
	rule(14, Field::Memo("保有資格"), None),
	rule(15, Field::Memo("応募求人"), None),
];

pub const MYNAVI_AGENT_SCOUT_CSV: &[ColumnRule] = &[
	rule(0, Field::ExternalId, None),
	rule(1, Field::LastName, None),
	rule(2, Field::FirstName, None),
	rule(3, Field::LastNameKana, None),
	rule(4, Field::FirstNameKana, None),
	rule(5, Field::Gender, Some(Transform::Gender)),
	rule(6, Field::Birthday, Some(Transform::Date)),
	rule(7, Field::Email, Some(Transform::Email)),
	rule(8, Field::Phone, Some(Transform::Phone)),
	rule(9, Field::Prefecture, None),
	rule(10, Field::Address, None),
	rule(12, Field::FinalEducation, None),
	rule(13, Field::CurrentCompany, None),
	rule(14, Field::CurrentPosition, None),
	rule(15, Field::AnnualIncome, Some(Transform::IncomeManYen)),
	rule(16, Field::Memo("職務経歴"), None),
	rule(17, Field::Memo("希望勤務地"), None),
	rule(18, Field::Memo("備考"), None),
];

pub fn for_provider(provider: Provider) -> &'static [ColumnRule] {
	match provider {
		Provider::Ran => RAN_DETAIL,
		Provider::Ambi => AMBI_DETAIL,
		Provider::MynaviScouting => MYNAVI_SCOUTING_CSV,
		Provider::MynaviAgentScout => MYNAVI_AGENT_SCOUT_CSV,
	}
}

/// Position holding the portal's own applicant id, when the table maps one.
pub fn external_id_position(rules: &[ColumnRule]) -> Option<usize> {
	rules.iter().find(|rule| rule.field == Field::ExternalId).map(|rule| rule.position)
}
