//! Turns portal notification mails into pending entries.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use scout_domain::{
	Provider,
	signal::{self, BULK_EXPORT_ID, PushEnvelope, PushNotice, SIGNAL_RULES, SignalRule},
};
use scout_storage::models::AgentRobot;

use crate::{
	Error, Result, ScoutEngine, digest,
	flight::FlightKey,
	resilience::{self, RunFailure},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InboundReport {
	pub robot_id: Option<Uuid>,
	pub history_id: u64,
	/// Ids newly queued for ingestion.
	pub enqueued: Vec<String>,
	/// Ids that were already pending for the robot and provider.
	pub already_pending: Vec<String>,
	/// Providers whose notification mails queued a bulk export instead of single ids.
	pub export_requested: Vec<Provider>,
	/// Providers with neither an id pattern nor a bulk export.
	pub skipped_providers: Vec<Provider>,
	/// Another notification for the same robot was being processed.
	pub busy: bool,
}

impl ScoutEngine {
	pub async fn handle_push(&self, envelope: &PushEnvelope) -> Result<InboundReport> {
		self.handle_push_at(envelope, OffsetDateTime::now_utc()).await
	}

	/// Decodes the notification, then detects entries under the run deadline. Every failure after
	/// decoding, a panic included, mails the operator before it is returned.
	pub async fn handle_push_at(
		&self,
		envelope: &PushEnvelope,
		now: OffsetDateTime,
	) -> Result<InboundReport> {
		let notice = signal::decode_push(envelope)?;

		tracing::info!(
			address = %notice.email_address,
			history_id = notice.history_id,
			"Mailbox change notification received."
		);

		let guarded =
			resilience::run_guarded(self.run_deadline(), async { Ok(self.detect(&notice, now).await) })
				.await;

		match guarded {
			Ok(Ok(report)) => Ok(report),
			Ok(Err(err)) => {
				tracing::error!(address = %notice.email_address, error = %err, "Inbound detection failed.");
				self.report_inbound_failure(&notice.email_address, &RunFailure::from(err.clone()))
					.await;

				Err(err)
			},
			Err(failure) => {
				tracing::error!(
					address = %notice.email_address,
					kind = failure.kind.as_str(),
					error = %failure.message,
					"Inbound detection aborted."
				);
				self.report_inbound_failure(&notice.email_address, &failure).await;

				Err(Error::from(failure))
			},
		}
	}

	async fn detect(&self, notice: &PushNotice, now: OffsetDateTime) -> Result<InboundReport> {
		let mut report = InboundReport { history_id: notice.history_id, ..InboundReport::default() };
		let robot =
			self.ports.store.robot_by_inbound_address(&notice.email_address).await?.ok_or_else(
				|| Error::Configuration {
					message: format!("No robot receives mail at {}.", notice.email_address),
				},
			)?;

		report.robot_id = Some(robot.robot_id);

		let Some(_guard) = self.flight().try_acquire(FlightKey::Inbound(robot.robot_id)) else {
			tracing::info!(
				robot_id = %robot.robot_id,
				"Inbound detection already running for this robot; unread mail is picked up by that run."
			);

			report.busy = true;

			return Ok(report);
		};

		for rule in SIGNAL_RULES {
			if rule.has_pattern() {
				self.collect_rule(&robot, rule, now, &mut report).await?;
			} else if rule.requests_export() {
				self.collect_export_request(&robot, rule, now, &mut report).await?;
			} else {
				tracing::info!(
					provider = %rule.provider,
					"No id pattern configured; skipping provider."
				);
				report.skipped_providers.push(rule.provider);
			}
		}

		tracing::info!(
			robot_id = %robot.robot_id,
			enqueued = report.enqueued.len(),
			already_pending = report.already_pending.len(),
			exports = report.export_requested.len(),
			"Inbound detection completed."
		);

		Ok(report)
	}

	async fn collect_rule(
		&self,
		robot: &AgentRobot,
		rule: &SignalRule,
		now: OffsetDateTime,
		report: &mut InboundReport,
	) -> Result<()> {
		let mailbox = &self.ports.mailbox;
		let message_ids = mailbox.list_unread(&rule.query()).await?;

		for message_id in message_ids {
			let body = mailbox.message_body(&message_id).await?;
			let Some(external_id) = rule.extract_id(&body)? else {
				return Err(Error::Signal {
					message: format!(
						"{} notification {message_id} does not carry an applicant id.",
						rule.provider.label()
					),
				});
			};
			let queued = self
				.ports
				.store
				.enqueue_entry(robot.robot_id, rule.provider, &external_id, now)
				.await?;

			mailbox.mark_read(&message_id).await?;

			tracing::info!(
				robot_id = %robot.robot_id,
				provider = %rule.provider,
				external_id = %external_id,
				queued,
				"Entry signal processed."
			);

			if queued {
				report.enqueued.push(external_id);
			} else {
				report.already_pending.push(external_id);
			}
		}

		Ok(())
	}

	/// Any number of matching mails queue a single bulk export for the provider.
	async fn collect_export_request(
		&self,
		robot: &AgentRobot,
		rule: &SignalRule,
		now: OffsetDateTime,
		report: &mut InboundReport,
	) -> Result<()> {
		let mailbox = &self.ports.mailbox;
		let message_ids = mailbox.list_unread(&rule.query()).await?;

		if message_ids.is_empty() {
			return Ok(());
		}

		let queued = self
			.ports
			.store
			.enqueue_entry(robot.robot_id, rule.provider, BULK_EXPORT_ID, now)
			.await?;

		for message_id in &message_ids {
			mailbox.mark_read(message_id).await?;
		}

		tracing::info!(
			robot_id = %robot.robot_id,
			provider = %rule.provider,
			mails = message_ids.len(),
			queued,
			"Bulk export requested."
		);
		report.export_requested.push(rule.provider);

		Ok(())
	}

	async fn report_inbound_failure(&self, address: &str, failure: &RunFailure) {
		let mail = digest::render_inbound_failure(&self.digest_settings(), Some(address), failure);

		self.deliver(&mail).await;
	}
}
