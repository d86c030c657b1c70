//! Turns pending portal entries into candidates, one (robot, provider) partition at a time.

use std::{
	collections::BTreeMap,
	sync::{Arc, Mutex},
	time::{Duration as StdDuration, Instant},
};

use serde::Serialize;
use time::{Date, Duration, OffsetDateTime};
use uuid::Uuid;

use scout_domain::{
	Provider, RawRecord, columns, dedupe::DedupeKey, normalize, schedule, signal::BULK_EXPORT_ID,
};
use scout_storage::models::{NewCandidate, PendingEntry};

use crate::{
	Error, Result, ScoutEngine, digest,
	flight::FlightKey,
	resilience::{self, FailureKind, RunFailure},
};

/// A bulk export spans the portal's last week, so dedupe must look back at least that far.
const BULK_EXPORT_LOOKBACK_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PartitionStatus {
	Completed,
	/// The robot was busy with another run; entries stay pending.
	Deferred,
	Failed { failure: RunFailure },
}
impl PartitionStatus {
	pub fn is_failed(&self) -> bool {
		matches!(self, Self::Failed { .. })
	}

	pub fn describe(&self) -> String {
		match self {
			Self::Completed => "completed".to_string(),
			Self::Deferred => "deferred (robot busy)".to_string(),
			Self::Failed { failure } => format!("failed ({})", failure.kind.as_str()),
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionReport {
	pub robot_id: Uuid,
	pub provider: Provider,
	pub entries: usize,
	pub created: u32,
	pub duplicates: u32,
	pub invalid: u32,
	pub status: PartitionStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
	pub partitions: Vec<PartitionReport>,
	pub digest_sent: bool,
}

#[derive(Debug, Default)]
struct Counters {
	created: u32,
	duplicates: u32,
	invalid: u32,
}

/// Per-partition state threaded through record ingestion.
struct Batch<'a> {
	agency_id: Uuid,
	robot_id: Uuid,
	provider: Provider,
	now: OffsetDateTime,
	due_on: Date,
	/// Stored candidates in the lookback window plus those created earlier in this batch.
	known: Vec<DedupeKey>,
	counters: &'a Mutex<Counters>,
}

impl ScoutEngine {
	pub async fn run_entry_ingestion(&self) -> Result<IngestionReport> {
		self.run_entry_ingestion_at(OffsetDateTime::now_utc()).await
	}

	pub async fn run_entry_ingestion_at(&self, now: OffsetDateTime) -> Result<IngestionReport> {
		let Some(_guard) = self.flight().try_acquire(FlightKey::Ingestion) else {
			return Err(Error::AlreadyRunning { key: FlightKey::Ingestion.to_string() });
		};
		let started = Instant::now();
		let entries = self.ports.store.list_unprocessed_entries().await?;
		let mut partitions = Vec::new();

		for ((robot_id, provider), entries) in partition(entries) {
			let report = self.ingest_partition_guarded(robot_id, provider, entries, now, started).await;

			partitions.push(report);
		}

		let digest_sent = if partitions.is_empty() {
			tracing::info!("No pending entries to ingest.");

			false
		} else {
			let mail = digest::render_ingestion(&self.digest_settings(), now, &partitions);

			self.deliver(&mail).await
		};

		Ok(IngestionReport { partitions, digest_sent })
	}

	async fn ingest_partition_guarded(
		&self,
		robot_id: Uuid,
		provider: Provider,
		entries: Vec<PendingEntry>,
		now: OffsetDateTime,
		started: Instant,
	) -> PartitionReport {
		let entry_count = entries.len();
		let counters = Arc::new(Mutex::new(Counters::default()));
		let status = match self.flight().try_acquire(FlightKey::Robot(robot_id)) {
			None => {
				tracing::info!(%robot_id, provider = %provider, "Partition deferred; robot is busy.");

				PartitionStatus::Deferred
			},
			Some(_robot_guard) => {
				let run_id = Uuid::new_v4();
				let remaining = self.run_deadline().saturating_sub(started.elapsed());
				let result = if remaining.is_zero() {
					Err(RunFailure::new(
						FailureKind::Timeout,
						"Run deadline passed before the partition started.",
					))
				} else {
					resilience::run_guarded(
						remaining.max(StdDuration::from_millis(1)),
						self.ingest_partition(
							run_id,
							robot_id,
							provider,
							&entries,
							now,
							counters.clone(),
						),
					)
					.await
				};

				match result {
					Ok(()) => PartitionStatus::Completed,
					Err(failure) => {
						self.release_sessions(run_id).await;

						tracing::error!(
							%robot_id,
							provider = %provider,
							kind = failure.kind.as_str(),
							error = %failure.message,
							"Ingestion partition failed; entries stay pending."
						);

						PartitionStatus::Failed { failure }
					},
				}
			},
		};
		let counters = counters.lock().unwrap_or_else(|err| err.into_inner());

		PartitionReport {
			robot_id,
			provider,
			entries: entry_count,
			created: counters.created,
			duplicates: counters.duplicates,
			invalid: counters.invalid,
			status,
		}
	}

	async fn ingest_partition(
		&self,
		run_id: Uuid,
		robot_id: Uuid,
		provider: Provider,
		entries: &[PendingEntry],
		now: OffsetDateTime,
		counters: Arc<Mutex<Counters>>,
	) -> Result<(), RunFailure> {
		let store = &self.ports.store;
		let robot = store
			.load_robot(robot_id)
			.await?
			.ok_or_else(|| RunFailure::configuration(format!("Robot {robot_id} does not exist.")))?;
		let service = store
			.list_scout_services(robot_id)
			.await?
			.into_iter()
			.find(|service| service.provider == provider.as_str())
			.ok_or_else(|| {
				RunFailure::configuration(format!(
					"Robot {robot_id} has no {} scout service.",
					provider.label()
				))
			})?;
		let credentials = self.credentials(&service)?;
		let ids = unique_ids(entries);
		let mut session = self.ports.portals.open(run_id, provider, &credentials).await?;
		let fetched = session.fetch_entries(&ids).await;

		if let Err(err) = session.close().await {
			tracing::warn!(%robot_id, provider = %provider, error = %err, "Failed to close portal session.");
		}

		let records = fetched?;
		let lookback = if ids.iter().any(|id| id == BULK_EXPORT_ID) {
			self.cfg.runtime.entry_lookback_days.max(BULK_EXPORT_LOOKBACK_DAYS)
		} else {
			self.cfg.runtime.entry_lookback_days
		};
		let since = now - Duration::days(lookback);
		let known = store
			.recent_candidates(robot.agency_id, since)
			.await?
			.iter()
			.map(|row| {
				DedupeKey::new(
					&row.last_name,
					&row.first_name,
					row.last_name_kana.as_deref(),
					row.first_name_kana.as_deref(),
					row.email.as_deref(),
				)
			})
			.collect::<Vec<_>>();
		let mut batch = Batch {
			agency_id: robot.agency_id,
			robot_id,
			provider,
			now,
			due_on: schedule::local_time(now, self.cfg.runtime.utc_offset_hours).date(),
			known,
			counters: &counters,
		};

		for record in &records {
			self.ingest_record(&mut batch, record).await?;
		}

		let entry_ids = entries.iter().map(|entry| entry.entry_id).collect::<Vec<_>>();
		let marked = store.mark_entries_processed(&entry_ids, now).await?;
		let counters = counters.lock().unwrap_or_else(|err| err.into_inner());

		tracing::info!(
			%robot_id,
			provider = %provider,
			records = records.len(),
			created = counters.created,
			duplicates = counters.duplicates,
			invalid = counters.invalid,
			marked,
			"Ingestion partition completed."
		);

		Ok(())
	}

	async fn ingest_record(&self, batch: &mut Batch<'_>, record: &RawRecord) -> Result<(), RunFailure> {
		let provider = batch.provider;
		let normalized = normalize::normalize(record, columns::for_provider(provider));

		for skipped in &normalized.skipped {
			tracing::warn!(
				provider = %provider,
				external_id = record.external_id.as_deref().unwrap_or("-"),
				position = skipped.position,
				reason = %skipped.reason,
				"Skipped an unparsable field."
			);
		}

		let draft = normalized.draft;

		if !draft.has_name() {
			bump(batch.counters, |c| c.invalid += 1);

			return Ok(());
		}

		let key = DedupeKey::from_draft(&draft);

		if batch.known.iter().any(|existing| existing.matches(&key)) {
			tracing::info!(
				provider = %provider,
				external_id = draft.external_id.as_deref().unwrap_or("-"),
				"Duplicate candidate skipped."
			);
			bump(batch.counters, |c| c.duplicates += 1);

			return Ok(());
		}

		let created = self
			.ports
			.store
			.create_candidate(&NewCandidate {
				agency_id: batch.agency_id,
				robot_id: batch.robot_id,
				provider: provider.as_str().to_string(),
				draft,
				due_on: batch.due_on,
				created_at: batch.now,
			})
			.await?;

		tracing::info!(
			provider = %provider,
			job_seeker_id = %created.job_seeker_id,
			"Candidate created."
		);

		batch.known.push(key);
		bump(batch.counters, |c| c.created += 1);

		Ok(())
	}
}

/// Groups entries by robot and provider. Rows with an unknown provider are logged and left alone.
fn partition(entries: Vec<PendingEntry>) -> BTreeMap<(Uuid, Provider), Vec<PendingEntry>> {
	let mut out: BTreeMap<(Uuid, Provider), Vec<PendingEntry>> = BTreeMap::new();

	for entry in entries {
		match entry.provider.parse::<Provider>() {
			Ok(provider) => out.entry((entry.robot_id, provider)).or_default().push(entry),
			Err(err) => tracing::warn!(entry_id = %entry.entry_id, error = %err, "Skipping entry."),
		}
	}

	out
}

fn unique_ids(entries: &[PendingEntry]) -> Vec<String> {
	let mut ids = Vec::with_capacity(entries.len());

	for entry in entries {
		if !ids.contains(&entry.external_id) {
			ids.push(entry.external_id.clone());
		}
	}

	ids
}

fn bump(counters: &Mutex<Counters>, f: impl FnOnce(&mut Counters)) {
	f(&mut counters.lock().unwrap_or_else(|err| err.into_inner()));
}
