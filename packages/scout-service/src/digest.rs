//! Plain-text digests mailed after every run that did work.

use std::fmt::Write as _;

use time::{Duration, OffsetDateTime, UtcOffset, macros::format_description};

use scout_domain::freshness;
use scout_mail::OutgoingMail;

use crate::{
	ScoutEngine,
	dispatch::RunContext,
	ingestion::{PartitionReport, PartitionStatus},
	resilience::RunFailure,
};

#[derive(Debug, Clone)]
pub struct DigestSettings {
	pub operator: String,
	pub subject_prefix: String,
	pub live: bool,
	pub utc_offset_hours: i8,
	pub stale_after: Duration,
}
impl DigestSettings {
	pub fn from_config(cfg: &scout_config::Config) -> Self {
		Self {
			operator: cfg.mail.operator_address.clone(),
			subject_prefix: cfg.mail.subject_prefix.clone(),
			live: cfg.runtime.is_live(),
			utc_offset_hours: cfg.runtime.utc_offset_hours,
			stale_after: Duration::hours(cfg.runtime.stale_after_hours),
		}
	}

	fn format_local(&self, at: OffsetDateTime) -> String {
		let offset = UtcOffset::from_hms(self.utc_offset_hours, 0, 0).unwrap_or(UtcOffset::UTC);

		at.to_offset(offset)
			.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
			.unwrap_or_else(|_| at.to_string())
	}
}

impl ScoutEngine {
	pub(crate) fn digest_settings(&self) -> DigestSettings {
		DigestSettings::from_config(&self.cfg)
	}
}

/// Operator always; the robot's staff address too, but only in live mode.
pub fn dispatch_recipients(settings: &DigestSettings, staff_email: Option<&str>) -> Vec<String> {
	let mut to = vec![settings.operator.clone()];

	if settings.live
		&& let Some(staff) = staff_email.map(str::trim).filter(|staff| !staff.is_empty())
		&& !staff.eq_ignore_ascii_case(&settings.operator)
	{
		to.push(staff.to_string());
	}

	to
}

pub fn render_dispatch(
	settings: &DigestSettings,
	ctx: &RunContext,
	failure: Option<&RunFailure>,
) -> OutgoingMail {
	let robot = ctx.robot_name.clone().unwrap_or_else(|| ctx.robot_id.to_string());
	let provider = ctx.provider.map(|provider| provider.label()).unwrap_or("-");
	let status = if failure.is_some() { "FAILED" } else { "completed" };
	let mut body = String::new();

	let _ = writeln!(body, "Scout dispatch for {robot} ({provider}): {status}.");
	let _ = writeln!(body, "Run started: {}", settings.format_local(ctx.started_at));

	if !settings.live {
		let _ = writeln!(body, "Mode: test (final confirmation was cancelled).");
	}

	let _ = writeln!(body);

	let mut reported_total = 0;

	for template in &ctx.templates {
		let stale =
			freshness::is_stale(template.last_send_at, ctx.started_at, settings.stale_after);
		let at = match template.last_send_at {
			Some(at) if !stale => settings.format_local(at),
			_ => String::new(),
		};
		let count = freshness::reported_count(
			template.last_send_at,
			template.last_send_count,
			ctx.started_at,
			settings.stale_after,
		);
		let result = if stale { "failure" } else { "success" };

		reported_total += i64::from(count);

		let _ = writeln!(
			body,
			"- {} / {} | {at} | {count} | {result}",
			template.search_title, template.message_title
		);
	}

	let _ = writeln!(body);
	let _ = writeln!(body, "Total sent this run: {} (reported: {reported_total})", ctx.sent);

	if !ctx.deferred.is_empty() {
		let deferred =
			ctx.deferred.iter().map(|provider| provider.label()).collect::<Vec<_>>().join(", ");
		let _ = writeln!(body, "Deferred providers: {deferred}");
	}

	write_failure(&mut body, failure);

	OutgoingMail {
		to: dispatch_recipients(settings, ctx.staff_email.as_deref()),
		subject: format!("{} Scout dispatch {status}: {robot}", settings.subject_prefix),
		body,
	}
}

pub fn render_ingestion(
	settings: &DigestSettings,
	started_at: OffsetDateTime,
	partitions: &[PartitionReport],
) -> OutgoingMail {
	let failed = partitions.iter().any(|partition| partition.status.is_failed());
	let status = if failed { "FAILED" } else { "completed" };
	let mut body = String::new();
	let (mut created, mut duplicates, mut invalid) = (0, 0, 0);

	let _ = writeln!(body, "Entry ingestion: {status}.");
	let _ = writeln!(body, "Run started: {}", settings.format_local(started_at));
	let _ = writeln!(body);

	for partition in partitions {
		created += partition.created;
		duplicates += partition.duplicates;
		invalid += partition.invalid;

		let _ = writeln!(
			body,
			"- {} | robot {} | created {} | duplicates {} | invalid {} | {}",
			partition.provider.label(),
			partition.robot_id,
			partition.created,
			partition.duplicates,
			partition.invalid,
			partition.status.describe(),
		);
	}

	let _ = writeln!(body);
	let _ = writeln!(
		body,
		"Totals: created {created}, duplicates {duplicates}, invalid {invalid}."
	);

	for partition in partitions {
		if let PartitionStatus::Failed { failure } = &partition.status {
			let _ = writeln!(body);
			let _ = writeln!(
				body,
				"{} for robot {}:",
				partition.provider.label(),
				partition.robot_id
			);

			write_failure(&mut body, Some(failure));
		}
	}

	OutgoingMail {
		to: vec![settings.operator.clone()],
		subject: format!("{} Entry ingestion {status}", settings.subject_prefix),
		body,
	}
}

pub fn render_inbound_failure(
	settings: &DigestSettings,
	address: Option<&str>,
	failure: &RunFailure,
) -> OutgoingMail {
	let mut body = String::new();

	let _ = writeln!(body, "Inbound entry detection failed for {}.", address.unwrap_or("-"));

	write_failure(&mut body, Some(failure));

	OutgoingMail {
		to: vec![settings.operator.clone()],
		subject: format!("{} Inbound detection FAILED", settings.subject_prefix),
		body,
	}
}

fn write_failure(body: &mut String, failure: Option<&RunFailure>) {
	let Some(failure) = failure else {
		return;
	};

	let _ = writeln!(body, "Failure: {}", failure.kind.as_str());
	let _ = writeln!(body, "Detail: {}", failure.message);

	if let Some(stack) = &failure.stack {
		let _ = writeln!(body, "Stack:");
		let _ = writeln!(body, "{stack}");
	}
}
