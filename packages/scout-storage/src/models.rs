use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AgentRobot {
	pub robot_id: Uuid,
	pub agency_id: Uuid,
	pub name: String,
	pub is_scout_active: bool,
	pub staff_email: String,
	pub inbound_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ScoutService {
	pub service_id: Uuid,
	pub robot_id: Uuid,
	pub provider: String,
	pub login_id: String,
	pub password_sealed: String,
	pub is_active: bool,
	pub last_send_count: i32,
	pub reply_template_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ScoutServiceTemplate {
	pub template_id: Uuid,
	pub service_id: Uuid,
	pub position: i32,
	pub search_title: String,
	pub message_title: String,
	pub scout_type: String,
	pub trigger_hour: i16,
	pub trigger_minute: i16,
	pub weekday_mask: i16,
	pub send_ceiling: i32,
	pub age_limit: Option<i32>,
	pub last_send_at: Option<OffsetDateTime>,
	pub last_send_count: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PendingEntry {
	pub entry_id: Uuid,
	pub robot_id: Uuid,
	pub provider: String,
	pub external_id: String,
	pub is_processed: bool,
	pub created_at: OffsetDateTime,
	pub processed_at: Option<OffsetDateTime>,
}

/// The fields dedupe compares for an already stored job seeker.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CandidateIdentity {
	pub job_seeker_id: Uuid,
	pub last_name: String,
	pub first_name: String,
	pub last_name_kana: Option<String>,
	pub first_name_kana: Option<String>,
	pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCandidate {
	pub agency_id: Uuid,
	pub robot_id: Uuid,
	pub provider: String,
	pub draft: scout_domain::CandidateDraft,
	/// Due date of the initial interview scheduling task.
	pub due_on: Date,
	pub created_at: OffsetDateTime,
}

/// Ids of the rows written for one new candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedCandidate {
	pub job_seeker_id: Uuid,
	pub document_id: Uuid,
	pub message_group_id: Uuid,
	pub task_group_id: Uuid,
	pub task_id: Uuid,
}
