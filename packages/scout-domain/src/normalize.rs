use time::{Date, Month};
use unicode_normalization::UnicodeNormalization;

use crate::{
	CandidateDraft, Gender, RawRecord,
	columns::{ColumnRule, Field, Transform},
};

/// A position the normalizer could not use. The rest of the row is still mapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedField {
	pub position: usize,
	pub field: Field,
	pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
	pub draft: CandidateDraft,
	pub skipped: Vec<SkippedField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
	Text(String),
	Name(String, String),
	Date(Date),
	Gender(Gender),
	Number(i32),
}

pub fn normalize(record: &RawRecord, rules: &[ColumnRule]) -> Normalized {
	let mut draft =
		CandidateDraft { external_id: record.external_id.clone(), ..CandidateDraft::default() };
	let mut skipped = Vec::new();

	for rule in rules {
		let Some(raw) = record.fields.get(rule.position) else {
			continue;
		};
		let raw = raw.trim();

		if raw.is_empty() {
			continue;
		}

		let result =
			apply(rule.transform, raw).and_then(|value| assign(&mut draft, rule.field, value));

		if let Err(reason) = result {
			skipped.push(SkippedField { position: rule.position, field: rule.field, reason });
		}
	}

	Normalized { draft, skipped }
}

fn apply(transform: Option<Transform>, raw: &str) -> Result<Value, String> {
	let Some(transform) = transform else {
		return Ok(Value::Text(raw.to_string()));
	};

	match transform {
		Transform::SplitName => split_name(raw).map(|(last, first)| Value::Name(last, first)),
		Transform::Date => parse_date(raw).map(Value::Date),
		Transform::Gender => parse_gender(raw).map(Value::Gender),
		Transform::Phone => parse_phone(raw).map(Value::Text),
		Transform::IncomeManYen => parse_income(raw).map(Value::Number),
		Transform::Email => parse_email(raw).map(Value::Text),
	}
}

fn assign(draft: &mut CandidateDraft, field: Field, value: Value) -> Result<(), String> {
	match (field, value) {
		(Field::FullName, Value::Name(last, first)) => {
			draft.last_name = last;
			draft.first_name = first;
		},
		(Field::FullName, Value::Text(text)) => {
			let (last, first) = split_name(&text)?;

			draft.last_name = last;
			draft.first_name = first;
		},
		(Field::FullNameKana, Value::Name(last, first)) => {
			draft.last_name_kana = Some(last);
			draft.first_name_kana = Some(first);
		},
		(Field::FullNameKana, Value::Text(text)) => {
			let (last, first) = split_name(&text)?;

			draft.last_name_kana = Some(last);
			draft.first_name_kana = Some(first);
		},
		(Field::ExternalId, Value::Text(text)) => draft.external_id = Some(text),
		(Field::LastName, Value::Text(text)) => draft.last_name = fold_width(&text),
		(Field::FirstName, Value::Text(text)) => draft.first_name = fold_width(&text),
		(Field::LastNameKana, Value::Text(text)) => draft.last_name_kana = Some(fold_width(&text)),
		(Field::FirstNameKana, Value::Text(text)) =>
			draft.first_name_kana = Some(fold_width(&text)),
		(Field::Email, Value::Text(text)) => draft.email = Some(text),
		(Field::Phone, Value::Text(text)) => draft.phone = Some(text),
		(Field::Birthday, Value::Date(date)) => draft.birthday = Some(date),
		(Field::Gender, Value::Gender(gender)) => draft.gender = Some(gender),
		(Field::Prefecture, Value::Text(text)) => draft.prefecture = Some(text),
		(Field::Address, Value::Text(text)) => draft.address = Some(text),
		(Field::FinalEducation, Value::Text(text)) => draft.final_education = Some(text),
		(Field::CurrentCompany, Value::Text(text)) => draft.current_company = Some(text),
		(Field::CurrentPosition, Value::Text(text)) => draft.current_position = Some(text),
		(Field::AnnualIncome, Value::Number(amount)) => draft.annual_income = Some(amount),
		(Field::Memo(label), Value::Text(text)) => append_memo(&mut draft.memo, label, &text),
		(field, value) => return Err(format!("{value:?} cannot populate {field:?}.")),
	}

	Ok(())
}

fn append_memo(memo: &mut String, label: &str, text: &str) {
	if !memo.is_empty() {
		memo.push_str("\n\n");
	}

	memo.push('【');
	memo.push_str(label);
	memo.push_str("】\n");
	memo.push_str(text);
}

fn fold_width(raw: &str) -> String {
	raw.nfkc().collect::<String>().trim().to_string()
}

fn split_name(raw: &str) -> Result<(String, String), String> {
	let folded = fold_width(raw);
	let mut parts = folded.split_whitespace();
	let (Some(last), Some(first)) = (parts.next(), parts.next()) else {
		return Err(format!("Name {raw:?} has no separator between family and given name."));
	};
	let rest = parts.collect::<Vec<_>>();
	let first =
		if rest.is_empty() { first.to_string() } else { format!("{first} {}", rest.join(" ")) };

	Ok((last.to_string(), first))
}

fn parse_date(raw: &str) -> Result<Date, String> {
	let folded = fold_width(raw);
	let runs = digit_runs(&folded);
	let [year, month, day] = match runs.as_slice() {
		[year, month, day, ..] if year.len() == 4 && month.len() <= 2 && day.len() <= 2 =>
			[*year, *month, *day],
		_ => return Err(format!("Date {raw:?} is not recognized.")),
	};
	let year = year.parse::<i32>().map_err(|_| format!("Date {raw:?} has an invalid year."))?;
	let month = month
		.parse::<u8>()
		.ok()
		.and_then(|month| Month::try_from(month).ok())
		.ok_or_else(|| format!("Date {raw:?} has an invalid month."))?;
	let day = day.parse::<u8>().map_err(|_| format!("Date {raw:?} has an invalid day."))?;

	Date::from_calendar_date(year, month, day).map_err(|err| format!("Date {raw:?}: {err}."))
}

fn digit_runs(text: &str) -> Vec<&str> {
	text.split(|c: char| !c.is_ascii_digit()).filter(|run| !run.is_empty()).collect()
}

fn parse_gender(raw: &str) -> Result<Gender, String> {
	let folded = fold_width(raw).to_lowercase();

	match folded.as_str() {
		"男" | "男性" | "male" | "m" => Ok(Gender::Male),
		"女" | "女性" | "female" | "f" => Ok(Gender::Female),
		"その他" | "other" | "回答しない" => Ok(Gender::Other),
		_ => Err(format!("Gender {raw:?} is not recognized.")),
	}
}

fn parse_phone(raw: &str) -> Result<String, String> {
	let digits = fold_width(raw).chars().filter(char::is_ascii_digit).collect::<String>();

	if !(10..=11).contains(&digits.len()) {
		return Err(format!("Phone {raw:?} does not have 10 or 11 digits."));
	}

	Ok(digits)
}

fn parse_income(raw: &str) -> Result<i32, String> {
	let folded = fold_width(raw).replace(',', "");
	let number = digit_runs(&folded)
		.first()
		.copied()
		.ok_or_else(|| format!("Income {raw:?} has no amount."))?;
	let amount =
		number.parse::<i64>().map_err(|_| format!("Income {raw:?} is out of range."))?;
	let man_yen = if folded.contains('万') { amount } else { amount / 10_000 };

	i32::try_from(man_yen).map_err(|_| format!("Income {raw:?} is out of range."))
}

fn parse_email(raw: &str) -> Result<String, String> {
	let folded = fold_width(raw).to_lowercase();

	if folded.contains(char::is_whitespace) || folded.split('@').count() != 2 {
		return Err(format!("Email {raw:?} is malformed."));
	}

	Ok(folded)
}
