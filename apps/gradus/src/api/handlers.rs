//! # API Endpoint Handlers
//!
//! One handler per engine command, each following the same shape: parse
//! the wire types, take the engine lock (write for mutations, read for
//! views), delegate, map the result or the error.

use super::{
    AppState,
    types::{
        ActorQuery, ActorRequest, AssignAdviserRequest, AssignPanelRequest, CreateGroupRequest,
        CreateScheduleRequest, CreateThesisRequest, ErrorBody, ExportResponse, GroupListResponse,
        GroupResponse, HealthResponse, RegisterUserRequest, RejectRequest, RemoveMemberRequest,
        ReviewRequest, ScheduleResponse, ScheduleStatusRequest, StatusResponse,
        ThesisListResponse, ThesisResponse, UpdateGroupRequest, UserResponse, error_response,
        parse_disposition, parse_role, parse_schedule_status, parse_stage,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gradus_core::{GroupId, ScheduleId, ThesisId, UserId, roster_to_bytes, snapshot_checksum};

// =============================================================================
// HEALTH & STATUS
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Roster counts.
pub async fn status_handler(State(state): State<AppState>) -> Response {
    let engine = state.engine.read().await;
    match engine.counts() {
        Ok(counts) => (
            StatusCode::OK,
            Json(StatusResponse {
                users: counts.users,
                groups: counts.groups,
                theses: counts.theses,
                schedules: counts.schedules,
            }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// USER HANDLERS
// =============================================================================

/// Register a user (bootstrap-gated, then admin-only).
pub async fn register_user_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterUserRequest>,
) -> Response {
    let role = match parse_role(&req.role) {
        Ok(role) => role,
        Err(e) => return error_response(&e),
    };
    let mut engine = state.engine.write().await;
    match engine.register_user(req.actor_id.map(UserId), &req.name, role) {
        Ok(user) => (StatusCode::CREATED, Json(UserResponse::from(&user))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// List the directory. Admin-only.
pub async fn list_users_handler(
    State(state): State<AppState>,
    Query(query): Query<ActorQuery>,
) -> Response {
    let engine = state.engine.read().await;
    match engine.users(query.actor()) {
        Ok(users) => {
            let users: Vec<UserResponse> = users.iter().map(UserResponse::from).collect();
            (StatusCode::OK, Json(users)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Deactivate a user. Admin-only.
pub async fn deactivate_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
    Json(req): Json<ActorRequest>,
) -> Response {
    let mut engine = state.engine.write().await;
    match engine.deactivate_user(UserId(req.actor_id), UserId(user_id)) {
        Ok(user) => (StatusCode::OK, Json(UserResponse::from(&user))).into_response(),
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// GROUP HANDLERS
// =============================================================================

/// Create a group with the actor as leader.
pub async fn create_group_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateGroupRequest>,
) -> Response {
    let members: Vec<UserId> = req.member_ids.iter().copied().map(UserId).collect();
    let mut engine = state.engine.write().await;
    match engine.create_group(
        UserId(req.actor_id),
        &req.name,
        &members,
        req.possible_topics,
        req.preferred_adviser_id.map(UserId),
    ) {
        Ok(group) => (StatusCode::CREATED, Json(GroupResponse::from(&group))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// List visible groups, partitioned mine/others.
pub async fn list_groups_handler(
    State(state): State<AppState>,
    Query(query): Query<ActorQuery>,
) -> Response {
    let engine = state.engine.read().await;
    match engine.visible_groups(query.actor()) {
        Ok(partition) => {
            (StatusCode::OK, Json(GroupListResponse::from(&partition))).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Load one group the actor may view.
pub async fn get_group_handler(
    State(state): State<AppState>,
    Path(group_id): Path<u64>,
    Query(query): Query<ActorQuery>,
) -> Response {
    let engine = state.engine.read().await;
    match engine.group_view(query.actor(), GroupId(group_id)) {
        Ok(group) => (StatusCode::OK, Json(GroupResponse::from(&group))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Leader edit of a pending or rejected group.
pub async fn update_group_handler(
    State(state): State<AppState>,
    Path(group_id): Path<u64>,
    Json(req): Json<UpdateGroupRequest>,
) -> Response {
    let mut engine = state.engine.write().await;
    match engine.update_group(
        UserId(req.actor_id),
        GroupId(group_id),
        req.name,
        req.possible_topics,
        req.preferred_adviser_id.map(UserId),
    ) {
        Ok(group) => (StatusCode::OK, Json(GroupResponse::from(&group))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Approve a pending group. Admin-only.
pub async fn approve_group_handler(
    State(state): State<AppState>,
    Path(group_id): Path<u64>,
    Json(req): Json<ActorRequest>,
) -> Response {
    let mut engine = state.engine.write().await;
    match engine.approve_group(UserId(req.actor_id), GroupId(group_id)) {
        Ok(group) => (StatusCode::OK, Json(GroupResponse::from(&group))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Reject a pending group. Admin-only.
pub async fn reject_group_handler(
    State(state): State<AppState>,
    Path(group_id): Path<u64>,
    Json(req): Json<RejectRequest>,
) -> Response {
    let mut engine = state.engine.write().await;
    match engine.reject_group(UserId(req.actor_id), GroupId(group_id), req.reason) {
        Ok(group) => (StatusCode::OK, Json(GroupResponse::from(&group))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Resubmit a rejected group. Leader-only.
pub async fn resubmit_group_handler(
    State(state): State<AppState>,
    Path(group_id): Path<u64>,
    Json(req): Json<ActorRequest>,
) -> Response {
    let mut engine = state.engine.write().await;
    match engine.resubmit_group(UserId(req.actor_id), GroupId(group_id)) {
        Ok(group) => (StatusCode::OK, Json(GroupResponse::from(&group))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Assign an adviser. Admin-only.
pub async fn assign_adviser_handler(
    State(state): State<AppState>,
    Path(group_id): Path<u64>,
    Json(req): Json<AssignAdviserRequest>,
) -> Response {
    let mut engine = state.engine.write().await;
    match engine.assign_adviser(
        UserId(req.actor_id),
        GroupId(group_id),
        UserId(req.adviser_id),
    ) {
        Ok(group) => (StatusCode::OK, Json(GroupResponse::from(&group))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Assign the panel set. Admin or the group's own adviser.
pub async fn assign_panel_handler(
    State(state): State<AppState>,
    Path(group_id): Path<u64>,
    Json(req): Json<AssignPanelRequest>,
) -> Response {
    let panels: Vec<UserId> = req.panel_ids.iter().copied().map(UserId).collect();
    let mut engine = state.engine.write().await;
    match engine.assign_panel(UserId(req.actor_id), GroupId(group_id), &panels) {
        Ok(group) => (StatusCode::OK, Json(GroupResponse::from(&group))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Remove a non-leader member.
pub async fn remove_member_handler(
    State(state): State<AppState>,
    Path(group_id): Path<u64>,
    Json(req): Json<RemoveMemberRequest>,
) -> Response {
    let mut engine = state.engine.write().await;
    match engine.remove_member(
        UserId(req.actor_id),
        GroupId(group_id),
        UserId(req.member_id),
    ) {
        Ok(group) => (StatusCode::OK, Json(GroupResponse::from(&group))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Delete a group. Leader or admin.
pub async fn delete_group_handler(
    State(state): State<AppState>,
    Path(group_id): Path<u64>,
    Query(query): Query<ActorQuery>,
) -> Response {
    let mut engine = state.engine.write().await;
    match engine.delete_group(query.actor(), GroupId(group_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// THESIS HANDLERS
// =============================================================================

/// Create a thesis for an approved group.
pub async fn create_thesis_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateThesisRequest>,
) -> Response {
    let mut engine = state.engine.write().await;
    match engine.create_thesis(
        UserId(req.actor_id),
        GroupId(req.group_id),
        &req.title,
        &req.abstract_text,
        req.keywords,
    ) {
        Ok(thesis) => (StatusCode::CREATED, Json(ThesisResponse::from(&thesis))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// List visible theses, partitioned mine/others.
pub async fn list_theses_handler(
    State(state): State<AppState>,
    Query(query): Query<ActorQuery>,
) -> Response {
    let engine = state.engine.read().await;
    match engine.visible_theses(query.actor()) {
        Ok(partition) => {
            (StatusCode::OK, Json(ThesisListResponse::from(&partition))).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Load one thesis the actor may view.
pub async fn get_thesis_handler(
    State(state): State<AppState>,
    Path(thesis_id): Path<u64>,
    Query(query): Query<ActorQuery>,
) -> Response {
    let engine = state.engine.read().await;
    match engine.thesis_view(query.actor(), ThesisId(thesis_id)) {
        Ok(thesis) => (StatusCode::OK, Json(ThesisResponse::from(&thesis))).into_response(),
        Err(e) => error_response(&e),
    }
}

fn thesis_action_response(
    result: Result<gradus_core::Thesis, gradus_core::GradusError>,
) -> Response {
    match result {
        Ok(thesis) => (StatusCode::OK, Json(ThesisResponse::from(&thesis))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Submit the current stage's work. Proposer-only.
pub async fn submit_handler(
    State(state): State<AppState>,
    Path(thesis_id): Path<u64>,
    Json(req): Json<ActorRequest>,
) -> Response {
    let mut engine = state.engine.write().await;
    thesis_action_response(engine.submit(UserId(req.actor_id), ThesisId(thesis_id)))
}

/// Resubmit after revisions. Proposer-only.
pub async fn resubmit_handler(
    State(state): State<AppState>,
    Path(thesis_id): Path<u64>,
    Json(req): Json<ActorRequest>,
) -> Response {
    let mut engine = state.engine.write().await;
    thesis_action_response(engine.resubmit(UserId(req.actor_id), ThesisId(thesis_id)))
}

/// Adviser disposition over a submission.
pub async fn adviser_review_handler(
    State(state): State<AppState>,
    Path(thesis_id): Path<u64>,
    Json(req): Json<ReviewRequest>,
) -> Response {
    let disposition = match parse_disposition(&req.disposition) {
        Ok(d) => d,
        Err(e) => return error_response(&e),
    };
    let mut engine = state.engine.write().await;
    thesis_action_response(engine.adviser_review(
        UserId(req.actor_id),
        ThesisId(thesis_id),
        disposition,
        req.feedback,
    ))
}

/// Panel disposition over a defended stage.
pub async fn panel_review_handler(
    State(state): State<AppState>,
    Path(thesis_id): Path<u64>,
    Json(req): Json<ReviewRequest>,
) -> Response {
    let disposition = match parse_disposition(&req.disposition) {
        Ok(d) => d,
        Err(e) => return error_response(&e),
    };
    let mut engine = state.engine.write().await;
    thesis_action_response(engine.panel_review(
        UserId(req.actor_id),
        ThesisId(thesis_id),
        disposition,
        req.feedback,
    ))
}

/// Record a booked defense slot on the lifecycle. Adviser or admin.
pub async fn schedule_defense_handler(
    State(state): State<AppState>,
    Path(thesis_id): Path<u64>,
    Json(req): Json<ActorRequest>,
) -> Response {
    let mut engine = state.engine.write().await;
    thesis_action_response(engine.schedule_defense(UserId(req.actor_id), ThesisId(thesis_id)))
}

/// Record the defense as held. Panel named on the schedule.
pub async fn conclude_defense_handler(
    State(state): State<AppState>,
    Path(thesis_id): Path<u64>,
    Json(req): Json<ActorRequest>,
) -> Response {
    let mut engine = state.engine.write().await;
    thesis_action_response(engine.conclude_defense(UserId(req.actor_id), ThesisId(thesis_id)))
}

/// Declare research underway. Proposer-only.
pub async fn begin_research_handler(
    State(state): State<AppState>,
    Path(thesis_id): Path<u64>,
    Json(req): Json<ActorRequest>,
) -> Response {
    let mut engine = state.engine.write().await;
    thesis_action_response(engine.begin_research(UserId(req.actor_id), ThesisId(thesis_id)))
}

/// Archive a fully approved thesis. Admin-only.
pub async fn archive_handler(
    State(state): State<AppState>,
    Path(thesis_id): Path<u64>,
    Json(req): Json<ActorRequest>,
) -> Response {
    let mut engine = state.engine.write().await;
    thesis_action_response(engine.archive(UserId(req.actor_id), ThesisId(thesis_id)))
}

// =============================================================================
// SCHEDULE HANDLERS
// =============================================================================

/// Record a defense slot. Adviser or admin.
pub async fn create_schedule_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateScheduleRequest>,
) -> Response {
    let stage = match req.stage.as_deref().map(parse_stage).transpose() {
        Ok(stage) => stage,
        Err(e) => return error_response(&e),
    };
    let panels: Vec<UserId> = req.panel_ids.iter().copied().map(UserId).collect();
    let mut engine = state.engine.write().await;
    match engine.create_schedule(
        UserId(req.actor_id),
        ThesisId(req.thesis_id),
        stage,
        &req.slot,
        &req.location,
        &panels,
    ) {
        Ok(schedule) => {
            (StatusCode::CREATED, Json(ScheduleResponse::from(&schedule))).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Move a schedule record on the calendar. Adviser or admin.
pub async fn schedule_status_handler(
    State(state): State<AppState>,
    Path(schedule_id): Path<u64>,
    Json(req): Json<ScheduleStatusRequest>,
) -> Response {
    let status = match parse_schedule_status(&req.status) {
        Ok(status) => status,
        Err(e) => return error_response(&e),
    };
    let mut engine = state.engine.write().await;
    match engine.set_schedule_status(UserId(req.actor_id), ScheduleId(schedule_id), status) {
        Ok(schedule) => (StatusCode::OK, Json(ScheduleResponse::from(&schedule))).into_response(),
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// EXPORT HANDLER
// =============================================================================

/// Export the roster as a base64 snapshot with checksum.
pub async fn export_handler(State(state): State<AppState>) -> Response {
    let engine = state.engine.read().await;
    let snapshot = match engine.export() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ExportResponse::error(format!("Export failed: {}", e))),
            )
                .into_response();
        }
    };
    match roster_to_bytes(&snapshot) {
        Ok(bytes) => {
            let checksum = snapshot_checksum(&bytes);
            (StatusCode::OK, Json(ExportResponse::success(bytes, checksum))).into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ExportResponse::error(format!("Export failed: {}", e))),
        )
            .into_response(),
    }
}

// =============================================================================
// FALLBACK
// =============================================================================

/// 404 for unknown routes, with the same error body shape.
pub async fn not_found_handler() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            kind: "not_found".to_string(),
            error: "unknown route".to_string(),
        }),
    )
        .into_response()
}
