use time::{Duration, Weekday, macros::{date, datetime}};

use scout_domain::{
	Gender, Provider, RawRecord,
	columns::{self, Field},
	dedupe::DedupeKey,
	freshness,
	normalize::normalize,
	quota,
	schedule::{self, WeekdayMask},
};

fn ambi_row() -> RawRecord {
	RawRecord::new(
		Some("98765".to_string()),
		[
			"98765",
			"山田 太郎",
			"ヤマダ タロウ",
			"男性",
			"1990年4月1日",
			"東京都",
			"Taro@Example.com",
			"090-1234-5678",
			"東京大学",
			"株式会社サンプル",
			"営業",
			"550万円",
			"法人営業 5年",
			"粘り強さ",
		],
	)
}

#[test]
fn ambi_detail_row_maps_to_canonical_candidate() {
	let normalized = normalize(&ambi_row(), columns::for_provider(Provider::Ambi));
	let draft = normalized.draft;

	assert!(normalized.skipped.is_empty());
	assert_eq!(draft.external_id.as_deref(), Some("98765"));
	assert_eq!((draft.last_name.as_str(), draft.first_name.as_str()), ("山田", "太郎"));
	assert_eq!(draft.last_name_kana.as_deref(), Some("ヤマダ"));
	assert_eq!(draft.email.as_deref(), Some("taro@example.com"));
	assert_eq!(draft.phone.as_deref(), Some("09012345678"));
	assert_eq!(draft.birthday, Some(date!(1990 - 04 - 01)));
	assert_eq!(draft.gender, Some(Gender::Male));
	assert_eq!(draft.annual_income, Some(550));
	assert_eq!(draft.memo, "【職務経歴】\n法人営業 5年\n\n【自己PR】\n粘り強さ");
}

#[test]
fn unparsable_positions_are_skipped_without_dropping_the_row() {
	let mut row = ambi_row();

	row.fields[4] = "不明".to_string();
	row.fields[7] = "12".to_string();
	row.fields.truncate(12);

	let normalized = normalize(&row, columns::AMBI_DETAIL);
	let skipped = normalized.skipped.iter().map(|field| field.field).collect::<Vec<_>>();

	assert_eq!(skipped, vec![Field::Birthday, Field::Phone]);
	assert!(normalized.draft.has_name());
	assert!(normalized.draft.memo.is_empty());
}

#[test]
fn row_without_name_is_not_a_candidate() {
	let row = RawRecord::new(None, ["1", "", "", "", "", "", "x@example.com"]);
	let normalized = normalize(&row, columns::MYNAVI_AGENT_SCOUT_CSV);

	assert!(!normalized.draft.has_name());
}

#[test]
fn normalized_duplicates_are_detected_across_widths() {
	let first = normalize(&ambi_row(), columns::AMBI_DETAIL).draft;
	let mut second_row = ambi_row();

	second_row.fields[1] = "山田\u{3000}太郎".to_string();
	second_row.fields[2] = String::new();

	let second = normalize(&second_row, columns::AMBI_DETAIL).draft;

	assert!(DedupeKey::from_draft(&first).matches(&DedupeKey::from_draft(&second)));
}

#[test]
fn tuesday_excluded_mask_gates_by_weekday_and_hour() {
	let mask = WeekdayMask::ALL.without(Weekday::Tuesday);
	let tuesday = schedule::local_time(datetime!(2026-10-20 05:00 UTC), 9);
	let wednesday = schedule::local_time(datetime!(2026-10-21 05:00 UTC), 9);
	let wednesday_later = schedule::local_time(datetime!(2026-10-21 06:00 UTC), 9);

	assert!(!schedule::is_due(14, mask, tuesday));
	assert!(schedule::is_due(14, mask, wednesday));
	assert!(!schedule::is_due(14, mask, wednesday_later));
}

#[test]
fn stale_sends_are_reported_as_zero() {
	let started = datetime!(2026-10-21 05:00 UTC);
	let window = Duration::hours(12);

	assert_eq!(
		freshness::reported_count(Some(started - Duration::hours(13)), 40, started, window),
		0
	);
	assert_eq!(
		freshness::reported_count(Some(started - Duration::hours(11)), 40, started, window),
		40
	);
}

#[test]
fn ambi_allotment_snaps_to_bulk_sizes() {
	let increments = Provider::Ambi.send_increments();

	assert_eq!(quota::allot(500, 420, increments), 300);
	assert_eq!(quota::allot(100, 1_000, increments), 100);
	assert_eq!(quota::allot(100, 40, increments), 0);
	assert_eq!(quota::allot(80, 30, Provider::Ran.send_increments()), 30);
}
