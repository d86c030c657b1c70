//! Persistence port used by the engine, implemented for the Postgres [`Db`].

use time::OffsetDateTime;
use uuid::Uuid;

use scout_domain::Provider;
use scout_portals::BoxFuture;
use scout_storage::{
	db::Db,
	models::{
		AgentRobot, CandidateIdentity, CreatedCandidate, NewCandidate, PendingEntry, ScoutService,
		ScoutServiceTemplate,
	},
	queries,
};

use crate::{Error, Result};

pub trait Store
where
	Self: Send + Sync,
{
	fn load_robot(&self, robot_id: Uuid) -> BoxFuture<'_, Result<Option<AgentRobot>>>;

	fn robot_by_inbound_address<'a>(
		&'a self,
		address: &'a str,
	) -> BoxFuture<'a, Result<Option<AgentRobot>>>;

	fn list_active_robots(&self) -> BoxFuture<'_, Result<Vec<AgentRobot>>>;

	fn list_scout_services(&self, robot_id: Uuid) -> BoxFuture<'_, Result<Vec<ScoutService>>>;

	fn list_templates(&self, service_id: Uuid) -> BoxFuture<'_, Result<Vec<ScoutServiceTemplate>>>;

	fn record_template_send(
		&self,
		template_id: Uuid,
		sent_at: OffsetDateTime,
		count: i32,
	) -> BoxFuture<'_, Result<()>>;

	fn update_service_send_count(&self, service_id: Uuid, count: i32)
	-> BoxFuture<'_, Result<()>>;

	fn list_unprocessed_entries(&self) -> BoxFuture<'_, Result<Vec<PendingEntry>>>;

	/// Returns false when the id is already pending for the robot and provider.
	fn enqueue_entry<'a>(
		&'a self,
		robot_id: Uuid,
		provider: Provider,
		external_id: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>>;

	fn mark_entries_processed<'a>(
		&'a self,
		entry_ids: &'a [Uuid],
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<u64>>;

	fn recent_candidates(
		&self,
		agency_id: Uuid,
		since: OffsetDateTime,
	) -> BoxFuture<'_, Result<Vec<CandidateIdentity>>>;

	/// Writes the candidate and its document shell, message group and interview task atomically.
	fn create_candidate<'a>(
		&'a self,
		candidate: &'a NewCandidate,
	) -> BoxFuture<'a, Result<CreatedCandidate>>;
}

impl Store for Db {
	fn load_robot(&self, robot_id: Uuid) -> BoxFuture<'_, Result<Option<AgentRobot>>> {
		Box::pin(async move { queries::load_robot(self, robot_id).await.map_err(Error::from) })
	}

	fn robot_by_inbound_address<'a>(
		&'a self,
		address: &'a str,
	) -> BoxFuture<'a, Result<Option<AgentRobot>>> {
		Box::pin(async move {
			queries::robot_by_inbound_address(self, address).await.map_err(Error::from)
		})
	}

	fn list_active_robots(&self) -> BoxFuture<'_, Result<Vec<AgentRobot>>> {
		Box::pin(async move { queries::list_active_robots(self).await.map_err(Error::from) })
	}

	fn list_scout_services(&self, robot_id: Uuid) -> BoxFuture<'_, Result<Vec<ScoutService>>> {
		Box::pin(async move {
			queries::list_scout_services(self, robot_id).await.map_err(Error::from)
		})
	}

	fn list_templates(&self, service_id: Uuid) -> BoxFuture<'_, Result<Vec<ScoutServiceTemplate>>> {
		Box::pin(async move { queries::list_templates(self, service_id).await.map_err(Error::from) })
	}

	fn record_template_send(
		&self,
		template_id: Uuid,
		sent_at: OffsetDateTime,
		count: i32,
	) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			queries::record_template_send(self, template_id, sent_at, count)
				.await
				.map_err(Error::from)
		})
	}

	fn update_service_send_count(
		&self,
		service_id: Uuid,
		count: i32,
	) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			queries::update_service_send_count(self, service_id, count).await.map_err(Error::from)
		})
	}

	fn list_unprocessed_entries(&self) -> BoxFuture<'_, Result<Vec<PendingEntry>>> {
		Box::pin(async move { queries::list_unprocessed_entries(self).await.map_err(Error::from) })
	}

	fn enqueue_entry<'a>(
		&'a self,
		robot_id: Uuid,
		provider: Provider,
		external_id: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			queries::enqueue_entry(self, robot_id, provider.as_str(), external_id, now)
				.await
				.map_err(Error::from)
		})
	}

	fn mark_entries_processed<'a>(
		&'a self,
		entry_ids: &'a [Uuid],
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			queries::mark_entries_processed(self, entry_ids, now).await.map_err(Error::from)
		})
	}

	fn recent_candidates(
		&self,
		agency_id: Uuid,
		since: OffsetDateTime,
	) -> BoxFuture<'_, Result<Vec<CandidateIdentity>>> {
		Box::pin(async move {
			queries::recent_candidates(self, agency_id, since).await.map_err(Error::from)
		})
	}

	fn create_candidate<'a>(
		&'a self,
		candidate: &'a NewCandidate,
	) -> BoxFuture<'a, Result<CreatedCandidate>> {
		Box::pin(async move { queries::create_candidate(self, candidate).await.map_err(Error::from) })
	}
}
