//! Hourly scout dispatch for one robot.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use scout_domain::{
	Provider, ScoutType, freshness, quota,
	schedule::{self, WeekdayMask},
};
use scout_portals::{PortalSession, SendFailure, SendRequest};
use scout_storage::models::{AgentRobot, ScoutService, ScoutServiceTemplate};

use crate::{
	Error, Result, ScoutEngine, digest,
	flight::FlightKey,
	resilience::{self, RunFailure},
};

/// Progress of one due template, kept outside the run future so a crash can still be reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateProgress {
	pub template_id: Uuid,
	pub search_title: String,
	pub message_title: String,
	#[serde(with = "time::serde::rfc3339::option")]
	pub last_send_at: Option<OffsetDateTime>,
	pub last_send_count: i32,
	pub attempted: bool,
}
impl TemplateProgress {
	fn from_template(template: &ScoutServiceTemplate) -> Self {
		Self {
			template_id: template.template_id,
			search_title: template.search_title.clone(),
			message_title: template.message_title.clone(),
			last_send_at: template.last_send_at,
			last_send_count: template.last_send_count,
			attempted: false,
		}
	}
}

/// State of the dispatch run in flight.
#[derive(Debug, Clone)]
pub struct RunContext {
	/// Owner of every portal session this run opens.
	pub run_id: Uuid,
	pub robot_id: Uuid,
	pub started_at: OffsetDateTime,
	pub deadline: OffsetDateTime,
	pub robot_name: Option<String>,
	pub staff_email: Option<String>,
	pub provider: Option<Provider>,
	pub service_id: Option<Uuid>,
	pub deferred: Vec<Provider>,
	pub templates: Vec<TemplateProgress>,
	pub sent: u32,
}
impl RunContext {
	fn new(robot_id: Uuid, started_at: OffsetDateTime, deadline: std::time::Duration) -> Self {
		Self {
			run_id: Uuid::new_v4(),
			robot_id,
			started_at,
			deadline: started_at + deadline,
			robot_name: None,
			staff_email: None,
			provider: None,
			service_id: None,
			deferred: Vec::new(),
			templates: Vec::new(),
			sent: 0,
		}
	}
}

type SharedContext = Arc<Mutex<RunContext>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
	Completed,
	Inactive,
	NothingDue,
	Failed { failure: RunFailure },
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
	pub robot_id: Uuid,
	pub provider: Option<Provider>,
	pub deferred: Vec<Provider>,
	pub sent: u32,
	pub templates: Vec<TemplateProgress>,
	pub outcome: RunOutcome,
	pub digest_sent: bool,
}

impl ScoutEngine {
	pub async fn run_scout_dispatch(&self, robot_id: Uuid) -> Result<DispatchReport> {
		self.run_scout_dispatch_at(robot_id, OffsetDateTime::now_utc()).await
	}

	pub async fn run_scout_dispatch_at(
		&self,
		robot_id: Uuid,
		now: OffsetDateTime,
	) -> Result<DispatchReport> {
		let key = FlightKey::Robot(robot_id);
		let Some(_guard) = self.flight().try_acquire(key) else {
			tracing::info!(%robot_id, "Dispatch skipped because the robot is busy.");

			return Err(Error::AlreadyRunning { key: key.to_string() });
		};
		let ctx = Arc::new(Mutex::new(RunContext::new(robot_id, now, self.run_deadline())));
		let run_id = lock(&ctx).run_id;
		let result =
			resilience::run_guarded(self.run_deadline(), self.dispatch(ctx.clone(), now)).await;

		if result.is_err() {
			self.release_sessions(run_id).await;
		}

		let snapshot = ctx.lock().unwrap_or_else(|err| err.into_inner()).clone();
		let outcome = match result {
			Ok(outcome) => outcome,
			Err(failure) => {
				tracing::error!(
					%robot_id,
					kind = failure.kind.as_str(),
					error = %failure.message,
					"Dispatch run failed."
				);

				RunOutcome::Failed { failure }
			},
		};
		let worked = matches!(outcome, RunOutcome::Completed | RunOutcome::Failed { .. });
		let digest_sent = if worked {
			let failure = match &outcome {
				RunOutcome::Failed { failure } => Some(failure),
				_ => None,
			};
			let mail = digest::render_dispatch(&self.digest_settings(), &snapshot, failure);

			self.deliver(&mail).await
		} else {
			false
		};

		Ok(DispatchReport {
			robot_id,
			provider: snapshot.provider,
			deferred: snapshot.deferred,
			sent: snapshot.sent,
			templates: snapshot.templates,
			outcome,
			digest_sent,
		})
	}

	/// Dispatches every active robot in turn. Busy robots are skipped.
	pub async fn run_dispatch_all(&self) -> Result<Vec<DispatchReport>> {
		let now = OffsetDateTime::now_utc();
		let robots = self.ports.store.list_active_robots().await?;
		let mut reports = Vec::with_capacity(robots.len());

		for robot in robots {
			match self.run_scout_dispatch_at(robot.robot_id, now).await {
				Ok(report) => reports.push(report),
				Err(Error::AlreadyRunning { .. }) => {},
				Err(err) => return Err(err),
			}
		}

		Ok(reports)
	}

	async fn dispatch(&self, ctx: SharedContext, now: OffsetDateTime) -> Result<RunOutcome, RunFailure> {
		let (run_id, robot_id) = {
			let ctx = lock(&ctx);

			(ctx.run_id, ctx.robot_id)
		};
		let robot = self
			.ports
			.store
			.load_robot(robot_id)
			.await?
			.ok_or_else(|| RunFailure::configuration(format!("Robot {robot_id} does not exist.")))?;

		{
			let mut ctx = lock(&ctx);

			ctx.robot_name = Some(robot.name.clone());
			ctx.staff_email = Some(robot.staff_email.clone());
		}

		if !robot.is_scout_active {
			tracing::info!(%robot_id, "Robot is not scout-active.");

			return Ok(RunOutcome::Inactive);
		}

		let Some(plan) = self.plan(&robot, now).await? else {
			tracing::info!(%robot_id, "No scout templates are due.");

			return Ok(RunOutcome::NothingDue);
		};

		{
			let mut ctx = lock(&ctx);

			ctx.provider = Some(plan.provider);
			ctx.service_id = Some(plan.service.service_id);
			ctx.deferred = plan.deferred.clone();
			ctx.templates = plan.due.iter().map(TemplateProgress::from_template).collect();
		}

		for provider in &plan.deferred {
			tracing::info!(
				%robot_id,
				provider = %provider,
				"Due templates deferred to a later run; one provider is dispatched per run."
			);
		}

		let credentials = self.credentials(&plan.service)?;
		let mut session = self.ports.portals.open(run_id, plan.provider, &credentials).await?;
		let result = self.send_templates(&ctx, &plan, session.as_mut(), now).await;

		if let Err(err) = session.close().await {
			tracing::warn!(%robot_id, error = %err, "Failed to close portal session.");
		}

		result.map(|()| RunOutcome::Completed)
	}

	async fn plan(&self, robot: &AgentRobot, now: OffsetDateTime) -> Result<Option<Plan>, RunFailure> {
		let local_now = schedule::local_time(now, self.cfg.runtime.utc_offset_hours);
		let services = self.ports.store.list_scout_services(robot.robot_id).await?;
		let mut candidates = Vec::new();

		for service in services.into_iter().filter(|service| service.is_active) {
			let provider = match service.provider.parse::<Provider>() {
				Ok(provider) => provider,
				Err(err) => {
					tracing::warn!(service_id = %service.service_id, error = %err, "Skipping service.");

					continue;
				},
			};
			let templates = self.ports.store.list_templates(service.service_id).await?;
			let due = templates
				.iter()
				.filter(|template| {
					u8::try_from(template.trigger_hour)
						.map(|hour| {
							schedule::is_due(
								hour,
								WeekdayMask::from_bits(template.weekday_mask),
								local_now,
							)
						})
						.unwrap_or(false)
				})
				.cloned()
				.collect::<Vec<_>>();

			if !due.is_empty() {
				candidates.push(Plan { provider, service, templates, due, deferred: Vec::new() });
			}
		}

		candidates.sort_by_key(|plan| plan.provider.priority());

		let mut candidates = candidates.into_iter();
		let Some(mut plan) = candidates.next() else {
			return Ok(None);
		};

		plan.deferred = candidates.map(|deferred| deferred.provider).collect();

		Ok(Some(plan))
	}

	async fn send_templates(
		&self,
		ctx: &SharedContext,
		plan: &Plan,
		session: &mut dyn PortalSession,
		now: OffsetDateTime,
	) -> Result<(), RunFailure> {
		let store = &self.ports.store;
		let idle = Duration::days(self.cfg.runtime.service_idle_reset_days);
		let mut service_total =
			if freshness::all_idle(plan.templates.iter().map(|t| t.last_send_at), now, idle) {
				tracing::info!(
					service_id = %plan.service.service_id,
					"Every template has been idle; resetting the service send total."
				);

				0
			} else {
				plan.service.last_send_count
			};
		let mut remaining = self.cfg.dispatch.max_sends_per_run;
		let mut failure = None;

		for (index, template) in plan.due.iter().enumerate() {
			let scout_type = match template.scout_type.parse::<ScoutType>() {
				Ok(scout_type) => scout_type,
				Err(err) => {
					failure = Some(RunFailure::configuration(format!(
						"Template {} has an invalid scout type: {err}",
						template.template_id
					)));

					break;
				},
			};
			let ceiling = u32::try_from(template.send_ceiling).unwrap_or(0);
			let allotted = quota::allot(ceiling, remaining, plan.provider.send_increments());

			if allotted == 0 {
				tracing::info!(
					template_id = %template.template_id,
					remaining,
					"Run send cap reached; stopping dispatch."
				);

				break;
			}

			let request = SendRequest {
				search_title: template.search_title.clone(),
				message_title: template.message_title.clone(),
				scout_type,
				ceiling: allotted,
				age_limit: template.age_limit.and_then(|limit| u32::try_from(limit).ok()),
				live: self.cfg.runtime.is_live(),
			};

			lock(ctx).templates[index].attempted = true;

			let (sent, error) = match session.send_scout(&request).await {
				Ok(sent) => (sent, None),
				Err(SendFailure { sent, source }) => (sent, Some(source)),
			};

			if error.is_none() || sent > 0 {
				let count = i32::try_from(sent).unwrap_or(i32::MAX);

				store.record_template_send(template.template_id, now, count).await?;

				let mut ctx = lock(ctx);

				ctx.templates[index].last_send_at = Some(now);
				ctx.templates[index].last_send_count = count;
				ctx.sent += sent;
			}

			tracing::info!(
				template_id = %template.template_id,
				provider = %plan.provider,
				allotted,
				sent,
				"Template dispatched."
			);

			remaining = remaining.saturating_sub(sent);
			service_total = service_total.saturating_add(i32::try_from(sent).unwrap_or(i32::MAX));

			if let Some(err) = error {
				failure = Some(RunFailure::from(err));

				break;
			}
		}

		store.update_service_send_count(plan.service.service_id, service_total).await?;

		match failure {
			Some(failure) => Err(failure),
			None => Ok(()),
		}
	}
}

struct Plan {
	provider: Provider,
	service: ScoutService,
	/// Every template of the service, due or not.
	templates: Vec<ScoutServiceTemplate>,
	due: Vec<ScoutServiceTemplate>,
	deferred: Vec<Provider>,
}

fn lock(ctx: &SharedContext) -> std::sync::MutexGuard<'_, RunContext> {
	ctx.lock().unwrap_or_else(|err| err.into_inner())
}
