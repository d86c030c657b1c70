use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Result,
	db::Db,
	models::{
		AgentRobot, CandidateIdentity, CreatedCandidate, NewCandidate, PendingEntry, ScoutService,
		ScoutServiceTemplate,
	},
};

pub const TASK_GROUP_KIND: &str = "interview_scheduling";
pub const TASK_INITIAL_STATE: &str = "awaiting_schedule";

const ROBOT_COLUMNS: &str =
	"robot_id, agency_id, name, is_scout_active, staff_email, inbound_address";
const SERVICE_COLUMNS: &str = "service_id, robot_id, provider, login_id, password_sealed, \
	is_active, last_send_count, reply_template_id";
const TEMPLATE_COLUMNS: &str = "template_id, service_id, position, search_title, message_title, \
	scout_type, trigger_hour, trigger_minute, weekday_mask, send_ceiling, age_limit, last_send_at, \
	last_send_count";

pub async fn insert_robot(db: &Db, robot: &AgentRobot) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO agent_robots (
	robot_id,
	agency_id,
	name,
	is_scout_active,
	staff_email,
	inbound_address
)
VALUES ($1, $2, $3, $4, $5, $6)",
	)
	.bind(robot.robot_id)
	.bind(robot.agency_id)
	.bind(robot.name.as_str())
	.bind(robot.is_scout_active)
	.bind(robot.staff_email.as_str())
	.bind(robot.inbound_address.as_str())
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn insert_service(db: &Db, service: &ScoutService) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO scout_services (
	service_id,
	robot_id,
	provider,
	login_id,
	password_sealed,
	is_active,
	last_send_count,
	reply_template_id
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
	)
	.bind(service.service_id)
	.bind(service.robot_id)
	.bind(service.provider.as_str())
	.bind(service.login_id.as_str())
	.bind(service.password_sealed.as_str())
	.bind(service.is_active)
	.bind(service.last_send_count)
	.bind(service.reply_template_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn insert_template(db: &Db, template: &ScoutServiceTemplate) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO scout_service_templates (
	template_id,
	service_id,
	position,
	search_title,
	message_title,
	scout_type,
	trigger_hour,
	trigger_minute,
	weekday_mask,
	send_ceiling,
	age_limit,
	last_send_at,
	last_send_count
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
	)
	.bind(template.template_id)
	.bind(template.service_id)
	.bind(template.position)
	.bind(template.search_title.as_str())
	.bind(template.message_title.as_str())
	.bind(template.scout_type.as_str())
	.bind(template.trigger_hour)
	.bind(template.trigger_minute)
	.bind(template.weekday_mask)
	.bind(template.send_ceiling)
	.bind(template.age_limit)
	.bind(template.last_send_at)
	.bind(template.last_send_count)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn load_robot(db: &Db, robot_id: Uuid) -> Result<Option<AgentRobot>> {
	let sql = format!("SELECT {ROBOT_COLUMNS} FROM agent_robots WHERE robot_id = $1");
	let robot = sqlx::query_as::<_, AgentRobot>(&sql).bind(robot_id).fetch_optional(&db.pool).await?;

	Ok(robot)
}

pub async fn robot_by_inbound_address(db: &Db, address: &str) -> Result<Option<AgentRobot>> {
	let sql = format!(
		"SELECT {ROBOT_COLUMNS} FROM agent_robots WHERE lower(inbound_address) = lower($1)"
	);
	let robot =
		sqlx::query_as::<_, AgentRobot>(&sql).bind(address.trim()).fetch_optional(&db.pool).await?;

	Ok(robot)
}

pub async fn list_active_robots(db: &Db) -> Result<Vec<AgentRobot>> {
	let sql = format!(
		"SELECT {ROBOT_COLUMNS} FROM agent_robots WHERE is_scout_active ORDER BY created_at, robot_id"
	);
	let robots = sqlx::query_as::<_, AgentRobot>(&sql).fetch_all(&db.pool).await?;

	Ok(robots)
}

pub async fn list_scout_services(db: &Db, robot_id: Uuid) -> Result<Vec<ScoutService>> {
	let sql = format!(
		"SELECT {SERVICE_COLUMNS} FROM scout_services WHERE robot_id = $1 ORDER BY created_at, service_id"
	);
	let services = sqlx::query_as::<_, ScoutService>(&sql).bind(robot_id).fetch_all(&db.pool).await?;

	Ok(services)
}

pub async fn list_templates(db: &Db, service_id: Uuid) -> Result<Vec<ScoutServiceTemplate>> {
	let sql = format!(
		"SELECT {TEMPLATE_COLUMNS} FROM scout_service_templates WHERE service_id = $1 \
		ORDER BY position, template_id"
	);
	let templates =
		sqlx::query_as::<_, ScoutServiceTemplate>(&sql).bind(service_id).fetch_all(&db.pool).await?;

	Ok(templates)
}

pub async fn record_template_send(
	db: &Db,
	template_id: Uuid,
	sent_at: OffsetDateTime,
	count: i32,
) -> Result<()> {
	sqlx::query(
		"\
UPDATE scout_service_templates
SET last_send_at = $2, last_send_count = $3
WHERE template_id = $1",
	)
	.bind(template_id)
	.bind(sent_at)
	.bind(count)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn update_service_send_count(db: &Db, service_id: Uuid, count: i32) -> Result<()> {
	sqlx::query(
		"\
UPDATE scout_services
SET last_send_count = $2, updated_at = now()
WHERE service_id = $1",
	)
	.bind(service_id)
	.bind(count)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn list_unprocessed_entries(db: &Db) -> Result<Vec<PendingEntry>> {
	let entries = sqlx::query_as::<_, PendingEntry>(
		"\
SELECT entry_id, robot_id, provider, external_id, is_processed, created_at, processed_at
FROM pending_entries
WHERE NOT is_processed
ORDER BY created_at, entry_id",
	)
	.fetch_all(&db.pool)
	.await?;

	Ok(entries)
}

/// Returns false when the id is already waiting for the same robot and provider.
pub async fn enqueue_entry(
	db: &Db,
	robot_id: Uuid,
	provider: &str,
	external_id: &str,
	now: OffsetDateTime,
) -> Result<bool> {
	let result = sqlx::query(
		"\
INSERT INTO pending_entries (entry_id, robot_id, provider, external_id, is_processed, created_at)
VALUES ($1, $2, $3, $4, false, $5)
ON CONFLICT (robot_id, provider, external_id) WHERE NOT is_processed DO NOTHING",
	)
	.bind(Uuid::new_v4())
	.bind(robot_id)
	.bind(provider)
	.bind(external_id)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() == 1)
}

pub async fn mark_entries_processed(
	db: &Db,
	entry_ids: &[Uuid],
	now: OffsetDateTime,
) -> Result<u64> {
	if entry_ids.is_empty() {
		return Ok(0);
	}

	let result = sqlx::query(
		"\
UPDATE pending_entries
SET is_processed = true, processed_at = $2
WHERE entry_id = ANY($1) AND NOT is_processed",
	)
	.bind(entry_ids)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected())
}

pub async fn recent_candidates(
	db: &Db,
	agency_id: Uuid,
	since: OffsetDateTime,
) -> Result<Vec<CandidateIdentity>> {
	let rows = sqlx::query_as::<_, CandidateIdentity>(
		"\
SELECT job_seeker_id, last_name, first_name, last_name_kana, first_name_kana, email
FROM job_seekers
WHERE agency_id = $1 AND created_at >= $2
ORDER BY created_at",
	)
	.bind(agency_id)
	.bind(since)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

/// Writes the job seeker with its document shell, message group and interview task in one
/// transaction.
pub async fn create_candidate(db: &Db, candidate: &NewCandidate) -> Result<CreatedCandidate> {
	let mut tx = db.pool.begin().await?;
	let created = insert_candidate_rows(&mut tx, candidate).await?;

	tx.commit().await?;

	Ok(created)
}

async fn insert_candidate_rows(
	tx: &mut Transaction<'_, Postgres>,
	candidate: &NewCandidate,
) -> Result<CreatedCandidate> {
	let created = CreatedCandidate {
		job_seeker_id: Uuid::new_v4(),
		document_id: Uuid::new_v4(),
		message_group_id: Uuid::new_v4(),
		task_group_id: Uuid::new_v4(),
		task_id: Uuid::new_v4(),
	};
	let draft = &candidate.draft;

	sqlx::query(
		"\
INSERT INTO job_seekers (
	job_seeker_id,
	agency_id,
	robot_id,
	provider,
	external_id,
	last_name,
	first_name,
	last_name_kana,
	first_name_kana,
	email,
	phone,
	birthday,
	gender,
	prefecture,
	address,
	final_education,
	current_company,
	current_position,
	annual_income,
	memo,
	created_at
)
VALUES (
	$1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21
)",
	)
	.bind(created.job_seeker_id)
	.bind(candidate.agency_id)
	.bind(candidate.robot_id)
	.bind(candidate.provider.as_str())
	.bind(draft.external_id.as_deref())
	.bind(draft.last_name.as_str())
	.bind(draft.first_name.as_str())
	.bind(draft.last_name_kana.as_deref())
	.bind(draft.first_name_kana.as_deref())
	.bind(draft.email.as_deref())
	.bind(draft.phone.as_deref())
	.bind(draft.birthday)
	.bind(draft.gender.map(|gender| gender.as_str()))
	.bind(draft.prefecture.as_deref())
	.bind(draft.address.as_deref())
	.bind(draft.final_education.as_deref())
	.bind(draft.current_company.as_deref())
	.bind(draft.current_position.as_deref())
	.bind(draft.annual_income)
	.bind(draft.memo.as_str())
	.bind(candidate.created_at)
	.execute(&mut **tx)
	.await?;
	sqlx::query(
		"INSERT INTO job_seeker_documents (document_id, job_seeker_id, created_at) VALUES ($1, $2, $3)",
	)
	.bind(created.document_id)
	.bind(created.job_seeker_id)
	.bind(candidate.created_at)
	.execute(&mut **tx)
	.await?;
	sqlx::query(
		"\
INSERT INTO message_groups (message_group_id, job_seeker_id, channel_id, created_at)
VALUES ($1, $2, NULL, $3)",
	)
	.bind(created.message_group_id)
	.bind(created.job_seeker_id)
	.bind(candidate.created_at)
	.execute(&mut **tx)
	.await?;
	sqlx::query(
		"INSERT INTO task_groups (task_group_id, job_seeker_id, kind, created_at) VALUES ($1, $2, $3, $4)",
	)
	.bind(created.task_group_id)
	.bind(created.job_seeker_id)
	.bind(TASK_GROUP_KIND)
	.bind(candidate.created_at)
	.execute(&mut **tx)
	.await?;
	sqlx::query(
		"\
INSERT INTO tasks (task_id, task_group_id, state, due_on, created_at)
VALUES ($1, $2, $3, $4, $5)",
	)
	.bind(created.task_id)
	.bind(created.task_group_id)
	.bind(TASK_INITIAL_STATE)
	.bind(candidate.due_on)
	.bind(candidate.created_at)
	.execute(&mut **tx)
	.await?;

	Ok(created)
}
