//! An in-memory [`Store`] whose rows tests can inspect directly.

use std::sync::{Mutex, MutexGuard};

use time::{Date, OffsetDateTime};
use uuid::Uuid;

use scout_domain::{CandidateDraft, Provider};
use scout_portals::BoxFuture;
use scout_service::{Error, Result, Store};
use scout_storage::{
	models::{
		AgentRobot, CandidateIdentity, CreatedCandidate, NewCandidate, PendingEntry, ScoutService,
		ScoutServiceTemplate,
	},
	queries::{TASK_GROUP_KIND, TASK_INITIAL_STATE},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCandidate {
	pub job_seeker_id: Uuid,
	pub agency_id: Uuid,
	pub robot_id: Uuid,
	pub provider: String,
	pub draft: CandidateDraft,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessageGroup {
	pub message_group_id: Uuid,
	pub job_seeker_id: Uuid,
	pub channel_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTask {
	pub task_id: Uuid,
	pub task_group_id: Uuid,
	pub job_seeker_id: Uuid,
	pub kind: String,
	pub state: String,
	pub due_on: Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateSend {
	pub template_id: Uuid,
	pub sent_at: OffsetDateTime,
	pub count: i32,
}

#[derive(Debug, Default)]
pub struct MemoryState {
	pub robots: Vec<AgentRobot>,
	pub services: Vec<ScoutService>,
	pub templates: Vec<ScoutServiceTemplate>,
	pub entries: Vec<PendingEntry>,
	pub candidates: Vec<StoredCandidate>,
	/// `(document_id, job_seeker_id)` of each blank document shell.
	pub documents: Vec<(Uuid, Uuid)>,
	pub message_groups: Vec<StoredMessageGroup>,
	pub tasks: Vec<StoredTask>,
	pub template_sends: Vec<TemplateSend>,
	/// Fails every storage call when set.
	pub unavailable: bool,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
	state: Mutex<MemoryState>,
}
impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn state(&self) -> MutexGuard<'_, MemoryState> {
		self.state.lock().unwrap_or_else(|err| err.into_inner())
	}

	pub fn add_robot(&self, robot: AgentRobot) {
		self.state().robots.push(robot);
	}

	pub fn add_service(&self, service: ScoutService) {
		self.state().services.push(service);
	}

	pub fn add_template(&self, template: ScoutServiceTemplate) {
		self.state().templates.push(template);
	}

	/// Seeds a job seeker created earlier, outside the run under test.
	pub fn seed_candidate(&self, agency_id: Uuid, draft: CandidateDraft, created_at: OffsetDateTime) {
		self.state().candidates.push(StoredCandidate {
			job_seeker_id: Uuid::new_v4(),
			agency_id,
			robot_id: Uuid::nil(),
			provider: String::new(),
			draft,
			created_at,
		});
	}

	pub fn template(&self, template_id: Uuid) -> Option<ScoutServiceTemplate> {
		self.state().templates.iter().find(|row| row.template_id == template_id).cloned()
	}

	pub fn service(&self, service_id: Uuid) -> Option<ScoutService> {
		self.state().services.iter().find(|row| row.service_id == service_id).cloned()
	}

	pub fn pending_ids(&self) -> Vec<String> {
		self.state()
			.entries
			.iter()
			.filter(|entry| !entry.is_processed)
			.map(|entry| entry.external_id.clone())
			.collect()
	}

	fn guarded(&self) -> Result<MutexGuard<'_, MemoryState>> {
		let state = self.state();

		if state.unavailable {
			return Err(Error::Storage { message: "Store is unavailable.".to_string() });
		}

		Ok(state)
	}

	fn create_candidate_now(&self, candidate: &NewCandidate) -> Result<CreatedCandidate> {
		let mut state = self.guarded()?;
		let created = CreatedCandidate {
			job_seeker_id: Uuid::new_v4(),
			document_id: Uuid::new_v4(),
			message_group_id: Uuid::new_v4(),
			task_group_id: Uuid::new_v4(),
			task_id: Uuid::new_v4(),
		};

		state.candidates.push(StoredCandidate {
			job_seeker_id: created.job_seeker_id,
			agency_id: candidate.agency_id,
			robot_id: candidate.robot_id,
			provider: candidate.provider.clone(),
			draft: candidate.draft.clone(),
			created_at: candidate.created_at,
		});
		state.documents.push((created.document_id, created.job_seeker_id));
		state.message_groups.push(StoredMessageGroup {
			message_group_id: created.message_group_id,
			job_seeker_id: created.job_seeker_id,
			channel_id: None,
		});
		state.tasks.push(StoredTask {
			task_id: created.task_id,
			task_group_id: created.task_group_id,
			job_seeker_id: created.job_seeker_id,
			kind: TASK_GROUP_KIND.to_string(),
			state: TASK_INITIAL_STATE.to_string(),
			due_on: candidate.due_on,
		});

		Ok(created)
	}
}
impl Store for MemoryStore {
	fn load_robot(&self, robot_id: Uuid) -> BoxFuture<'_, Result<Option<AgentRobot>>> {
		Box::pin(async move {
			Ok(self.guarded()?.robots.iter().find(|robot| robot.robot_id == robot_id).cloned())
		})
	}

	fn robot_by_inbound_address<'a>(
		&'a self,
		address: &'a str,
	) -> BoxFuture<'a, Result<Option<AgentRobot>>> {
		Box::pin(async move {
			Ok(self
				.guarded()?
				.robots
				.iter()
				.find(|robot| robot.inbound_address.eq_ignore_ascii_case(address.trim()))
				.cloned())
		})
	}

	fn list_active_robots(&self) -> BoxFuture<'_, Result<Vec<AgentRobot>>> {
		Box::pin(async move {
			Ok(self.guarded()?.robots.iter().filter(|robot| robot.is_scout_active).cloned().collect())
		})
	}

	fn list_scout_services(&self, robot_id: Uuid) -> BoxFuture<'_, Result<Vec<ScoutService>>> {
		Box::pin(async move {
			Ok(self
				.guarded()?
				.services
				.iter()
				.filter(|service| service.robot_id == robot_id)
				.cloned()
				.collect())
		})
	}

	fn list_templates(&self, service_id: Uuid) -> BoxFuture<'_, Result<Vec<ScoutServiceTemplate>>> {
		Box::pin(async move {
			let mut templates = self
				.guarded()?
				.templates
				.iter()
				.filter(|template| template.service_id == service_id)
				.cloned()
				.collect::<Vec<_>>();

			templates.sort_by_key(|template| template.position);

			Ok(templates)
		})
	}

	fn record_template_send(
		&self,
		template_id: Uuid,
		sent_at: OffsetDateTime,
		count: i32,
	) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			let mut state = self.guarded()?;

			if let Some(template) =
				state.templates.iter_mut().find(|template| template.template_id == template_id)
			{
				template.last_send_at = Some(sent_at);
				template.last_send_count = count;
			}

			state.template_sends.push(TemplateSend { template_id, sent_at, count });

			Ok(())
		})
	}

	fn update_service_send_count(
		&self,
		service_id: Uuid,
		count: i32,
	) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			if let Some(service) =
				self.guarded()?.services.iter_mut().find(|service| service.service_id == service_id)
			{
				service.last_send_count = count;
			}

			Ok(())
		})
	}

	fn list_unprocessed_entries(&self) -> BoxFuture<'_, Result<Vec<PendingEntry>>> {
		Box::pin(async move {
			Ok(self.guarded()?.entries.iter().filter(|entry| !entry.is_processed).cloned().collect())
		})
	}

	fn enqueue_entry<'a>(
		&'a self,
		robot_id: Uuid,
		provider: Provider,
		external_id: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let mut state = self.guarded()?;
			let pending = state.entries.iter().any(|entry| {
				!entry.is_processed
					&& entry.robot_id == robot_id
					&& entry.provider == provider.as_str()
					&& entry.external_id == external_id
			});

			if pending {
				return Ok(false);
			}

			state.entries.push(PendingEntry {
				entry_id: Uuid::new_v4(),
				robot_id,
				provider: provider.as_str().to_string(),
				external_id: external_id.to_string(),
				is_processed: false,
				created_at: now,
				processed_at: None,
			});

			Ok(true)
		})
	}

	fn mark_entries_processed<'a>(
		&'a self,
		entry_ids: &'a [Uuid],
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			let mut state = self.guarded()?;
			let mut marked = 0;

			for entry in state.entries.iter_mut() {
				if !entry.is_processed && entry_ids.contains(&entry.entry_id) {
					entry.is_processed = true;
					entry.processed_at = Some(now);
					marked += 1;
				}
			}

			Ok(marked)
		})
	}

	fn recent_candidates(
		&self,
		agency_id: Uuid,
		since: OffsetDateTime,
	) -> BoxFuture<'_, Result<Vec<CandidateIdentity>>> {
		Box::pin(async move {
			Ok(self
				.guarded()?
				.candidates
				.iter()
				.filter(|row| row.agency_id == agency_id && row.created_at >= since)
				.map(|row| CandidateIdentity {
					job_seeker_id: row.job_seeker_id,
					last_name: row.draft.last_name.clone(),
					first_name: row.draft.first_name.clone(),
					last_name_kana: row.draft.last_name_kana.clone(),
					first_name_kana: row.draft.first_name_kana.clone(),
					email: row.draft.email.clone(),
				})
				.collect())
		})
	}

	fn create_candidate<'a>(
		&'a self,
		candidate: &'a NewCandidate,
	) -> BoxFuture<'a, Result<CreatedCandidate>> {
		Box::pin(async move { self.create_candidate_now(candidate) })
	}
}
