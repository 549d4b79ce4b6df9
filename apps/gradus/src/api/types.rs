//! # API Request/Response Types
//!
//! The JSON structures for the HTTP API, plus the mapping from engine
//! errors to HTTP status codes. Ids cross the wire as raw `u64`s; the
//! newtypes exist only inside the core.

use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use gradus_core::{
    DefenseStage, GradusError, Group, GroupPartition, ReviewDisposition, Role, Schedule,
    ScheduleStatus, Thesis, ThesisPartition, User, UserId,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH & STATUS
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Roster status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub users: usize,
    pub groups: usize,
    pub theses: usize,
    pub schedules: usize,
}

// =============================================================================
// ENUM PARSING
// =============================================================================

/// Parse a role name from the wire.
pub fn parse_role(s: &str) -> Result<Role, GradusError> {
    match s {
        "student" => Ok(Role::Student),
        "adviser" => Ok(Role::Adviser),
        "panel" => Ok(Role::Panel),
        "admin" => Ok(Role::Admin),
        other => Err(GradusError::InvalidInput(format!(
            "unknown role '{}'",
            other
        ))),
    }
}

/// Parse a review disposition from the wire.
pub fn parse_disposition(s: &str) -> Result<ReviewDisposition, GradusError> {
    match s {
        "approve" => Ok(ReviewDisposition::Approve),
        "reject" => Ok(ReviewDisposition::Reject),
        "request_revision" => Ok(ReviewDisposition::RequestRevision),
        other => Err(GradusError::InvalidInput(format!(
            "unknown disposition '{}'",
            other
        ))),
    }
}

/// Parse a defense stage from the wire.
pub fn parse_stage(s: &str) -> Result<DefenseStage, GradusError> {
    match s {
        "concept" => Ok(DefenseStage::Concept),
        "proposal" => Ok(DefenseStage::Proposal),
        "final" => Ok(DefenseStage::Final),
        other => Err(GradusError::InvalidInput(format!(
            "unknown stage '{}'",
            other
        ))),
    }
}

/// Parse a schedule status from the wire.
pub fn parse_schedule_status(s: &str) -> Result<ScheduleStatus, GradusError> {
    match s {
        "pending" => Ok(ScheduleStatus::Pending),
        "scheduled" => Ok(ScheduleStatus::Scheduled),
        "in_progress" => Ok(ScheduleStatus::InProgress),
        "completed" => Ok(ScheduleStatus::Completed),
        "cancelled" => Ok(ScheduleStatus::Cancelled),
        "rescheduled" => Ok(ScheduleStatus::Rescheduled),
        other => Err(GradusError::InvalidInput(format!(
            "unknown schedule status '{}'",
            other
        ))),
    }
}

// =============================================================================
// USER TYPES
// =============================================================================

/// User registration request. `actor_id` is absent only for the bootstrap
/// registration of the first (admin) user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub actor_id: Option<u64>,
    pub name: String,
    pub role: String,
}

/// A user as shown to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: u64,
    pub name: String,
    pub role: String,
    pub active: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.0,
            name: user.name.clone(),
            role: user.role.name().to_string(),
            active: user.active,
        }
    }
}

// =============================================================================
// GROUP TYPES
// =============================================================================

/// Group creation request. The actor becomes the leader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    pub actor_id: u64,
    pub name: String,
    #[serde(default)]
    pub member_ids: Vec<u64>,
    #[serde(default)]
    pub possible_topics: Vec<String>,
    pub preferred_adviser_id: Option<u64>,
}

/// Leader edit of a pending or rejected group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateGroupRequest {
    pub actor_id: u64,
    pub name: Option<String>,
    pub possible_topics: Option<Vec<String>>,
    pub preferred_adviser_id: Option<u64>,
}

/// Bare actor body for verbs that need nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorRequest {
    pub actor_id: u64,
}

/// Group rejection with an optional reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectRequest {
    pub actor_id: u64,
    pub reason: Option<String>,
}

/// Adviser assignment request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignAdviserRequest {
    pub actor_id: u64,
    pub adviser_id: u64,
}

/// Panel assignment request. Replaces the whole set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignPanelRequest {
    pub actor_id: u64,
    pub panel_ids: Vec<u64>,
}

/// Member removal request (self-removal or admin removal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveMemberRequest {
    pub actor_id: u64,
    pub member_id: u64,
}

/// A group as shown to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupResponse {
    pub id: u64,
    pub name: String,
    pub status: String,
    pub leader_id: u64,
    pub member_ids: Vec<u64>,
    pub adviser_id: Option<u64>,
    pub preferred_adviser_id: Option<u64>,
    pub panel_ids: Vec<u64>,
    pub possible_topics: Vec<String>,
    pub rejection_reason: Option<String>,
}

impl From<&Group> for GroupResponse {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id.0,
            name: group.name.clone(),
            status: group.status.name().to_string(),
            leader_id: group.leader.0,
            member_ids: group.members.iter().map(|m| m.0).collect(),
            adviser_id: group.adviser.map(|a| a.0),
            preferred_adviser_id: group.preferred_adviser.map(|a| a.0),
            panel_ids: group.panels.iter().map(|p| p.0).collect(),
            possible_topics: group.possible_topics.clone(),
            rejection_reason: group.rejection_reason.clone(),
        }
    }
}

/// Mine/others partition of visible groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupListResponse {
    pub mine: Vec<GroupResponse>,
    pub others: Vec<GroupResponse>,
}

impl From<&GroupPartition> for GroupListResponse {
    fn from(partition: &GroupPartition) -> Self {
        Self {
            mine: partition.mine.iter().map(GroupResponse::from).collect(),
            others: partition.others.iter().map(GroupResponse::from).collect(),
        }
    }
}

// =============================================================================
// THESIS TYPES
// =============================================================================

/// Thesis creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateThesisRequest {
    pub actor_id: u64,
    pub group_id: u64,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Adviser or panel review request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub actor_id: u64,
    pub disposition: String,
    pub feedback: Option<String>,
}

/// A thesis as shown to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThesisResponse {
    pub id: u64,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub keywords: Vec<String>,
    pub group_id: u64,
    pub proposer_id: u64,
    pub status: String,
    pub adviser_feedback: Option<String>,
    pub panel_feedback: Option<String>,
    pub rejection_reason: Option<String>,
}

impl From<&Thesis> for ThesisResponse {
    fn from(thesis: &Thesis) -> Self {
        Self {
            id: thesis.id.0,
            title: thesis.title.clone(),
            abstract_text: thesis.abstract_text.clone(),
            keywords: thesis.keywords.clone(),
            group_id: thesis.group.0,
            proposer_id: thesis.proposer.0,
            status: thesis.status.name().to_string(),
            adviser_feedback: thesis.adviser_feedback.clone(),
            panel_feedback: thesis.panel_feedback.clone(),
            rejection_reason: thesis.rejection_reason.clone(),
        }
    }
}

/// Mine/others partition of visible theses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThesisListResponse {
    pub mine: Vec<ThesisResponse>,
    pub others: Vec<ThesisResponse>,
}

impl From<&ThesisPartition> for ThesisListResponse {
    fn from(partition: &ThesisPartition) -> Self {
        Self {
            mine: partition.mine.iter().map(ThesisResponse::from).collect(),
            others: partition.others.iter().map(ThesisResponse::from).collect(),
        }
    }
}

// =============================================================================
// SCHEDULE TYPES
// =============================================================================

/// Schedule creation request. `stage` defaults to the thesis' current
/// defense band when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduleRequest {
    pub actor_id: u64,
    pub thesis_id: u64,
    pub stage: Option<String>,
    pub slot: String,
    pub location: String,
    #[serde(default)]
    pub panel_ids: Vec<u64>,
}

/// Calendar status update for a schedule record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleStatusRequest {
    pub actor_id: u64,
    pub status: String,
}

/// A schedule record as shown to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResponse {
    pub id: u64,
    pub thesis_id: u64,
    pub stage: String,
    pub slot: String,
    pub location: String,
    pub panel_ids: Vec<u64>,
    pub status: String,
}

impl From<&Schedule> for ScheduleResponse {
    fn from(schedule: &Schedule) -> Self {
        Self {
            id: schedule.id.0,
            thesis_id: schedule.thesis.0,
            stage: schedule.stage.name().to_string(),
            slot: schedule.slot.clone(),
            location: schedule.location.clone(),
            panel_ids: schedule.panels.iter().map(|p| p.0).collect(),
            status: schedule.status.name().to_string(),
        }
    }
}

// =============================================================================
// EXPORT RESPONSE
// =============================================================================

/// Snapshot export response. Payload travels base64-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub success: bool,
    pub data: Option<String>,
    pub checksum: Option<u64>,
    pub error: Option<String>,
}

impl ExportResponse {
    pub fn success(data: Vec<u8>, checksum: u64) -> Self {
        Self {
            success: true,
            data: Some(base64::Engine::encode(
                &base64::engine::general_purpose::STANDARD,
                &data,
            )),
            checksum: Some(checksum),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            checksum: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// QUERY PARAMS & ERROR MAPPING
// =============================================================================

/// `actor_id` query parameter for read endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ActorQuery {
    pub actor_id: u64,
}

impl ActorQuery {
    /// The actor as a core id.
    #[must_use]
    pub fn actor(&self) -> UserId {
        UserId(self.actor_id)
    }
}

/// Structured error body carried by every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub error: String,
}

/// Map an engine error to its HTTP representation.
///
/// Forbidden → 403, InvalidTransition → 409, PreconditionFailed → 422,
/// NotFound → 404, bad input/serialization → 400, storage → 500.
#[must_use]
pub fn error_response(err: &GradusError) -> Response {
    let (status, kind) = match err {
        GradusError::Forbidden { .. } => (StatusCode::FORBIDDEN, "forbidden"),
        GradusError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
        GradusError::PreconditionFailed { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "precondition_failed")
        }
        GradusError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        GradusError::InvalidInput(_) | GradusError::SerializationError(_) => {
            (StatusCode::BAD_REQUEST, "invalid_input")
        }
        GradusError::IoError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
    };

    (
        status,
        Json(ErrorBody {
            kind: kind.to_string(),
            error: err.to_string(),
        }),
    )
        .into_response()
}
