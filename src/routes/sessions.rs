use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::{AuthenticatedUser, Role};
use crate::detail::{load_session_detail, SessionDetail};
use crate::error::{AppError, AppResult};
use crate::filter::{SessionFilter, SessionFilterRequest};
use crate::listing::{self, PageRequest};
use crate::session::{to_iso, NewSession, SessionChanges, SessionKind, SessionSummary};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SessionListQuery {
    pub team: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub triaging_confirmed: Option<bool>,
    pub history: Option<bool>,
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionListEntry {
    pub id: Uuid,
    pub kind: SessionKind,
    pub name: String,
    pub contact: String,
    pub event_at: String,
    pub severity: String,
    pub category: String,
    pub triaging_confirmed: bool,
    pub mark_as_complete: bool,
    pub flag: Option<bool>,
}

impl From<SessionSummary> for SessionListEntry {
    fn from(summary: SessionSummary) -> Self {
        Self {
            id: summary.id,
            kind: summary.kind,
            name: summary.name,
            contact: summary.contact,
            event_at: to_iso(summary.event_at),
            severity: summary.severity,
            category: summary.category,
            triaging_confirmed: summary.triaging_confirmed,
            mark_as_complete: summary.mark_as_complete,
            flag: summary.flag,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub total_count: i64,
    pub records: Vec<SessionListEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SessionLookupQuery {
    pub sid: Option<String>,
    pub flag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct KindQuery {
    pub flag: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedSession {
    pub id: Uuid,
    pub kind: SessionKind,
}

#[derive(Debug, Deserialize)]
pub struct UrgencyRequest {
    pub urgency: String,
}

#[derive(Debug, Deserialize)]
pub struct TeamRequest {
    pub team: String,
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    #[serde(default)]
    pub action_taken_notes: String,
    #[serde(default)]
    pub mark_as_complete: bool,
}

/// The `flag` parameter names which table a session id belongs to. It is
/// required and must be one of the known kinds.
pub(crate) fn parse_kind(flag: Option<&str>) -> AppResult<SessionKind> {
    let flag = flag
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::bad_request("flag is required"))?;
    Ok(flag.parse()?)
}

fn optional_kind(raw: Option<&str>) -> AppResult<Option<SessionKind>> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => Ok(Some(value.parse()?)),
        None => Ok(None),
    }
}

fn required_text(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::bad_request(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

pub async fn list_sessions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<SessionListQuery>,
) -> AppResult<Json<SessionListResponse>> {
    let SessionListQuery {
        team,
        search,
        page,
        limit,
        triaging_confirmed,
        history,
        kind,
    } = query;

    let page = PageRequest::new(page, limit)?;
    let kind = optional_kind(kind.as_deref())?;
    let team = user.visible_team(team)?;

    let request = SessionFilterRequest {
        team,
        search,
        triaging_confirmed,
        history,
        kind,
    };
    let filter = SessionFilter::compile(&request, &state.config.active_categories);
    let result = listing::list_sessions(state.store(), &filter, page).await?;

    Ok(Json(SessionListResponse {
        total_count: result.total_count,
        records: result.records.into_iter().map(SessionListEntry::from).collect(),
    }))
}

pub async fn get_session(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<SessionLookupQuery>,
) -> AppResult<Json<SessionDetail>> {
    let kind = parse_kind(query.flag.as_deref())?;
    let sid = query
        .sid
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::bad_request("sid is required"))?;
    let id = Uuid::parse_str(sid).map_err(|_| AppError::bad_request("sid must be a UUID"))?;

    let detail = load_session_detail(state.store(), kind, id).await?;
    user.can_access(&detail.category)?;
    Ok(Json(detail))
}

pub async fn create_session(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<NewSession>,
) -> AppResult<(StatusCode, Json<CreatedSession>)> {
    payload.validate().map_err(AppError::bad_request)?;
    let kind = payload.kind();

    let id = state.store().insert_session(payload).await?;
    info!(session_id = %id, kind = %kind, created_by = %user.email, "session created");

    Ok((StatusCode::CREATED, Json(CreatedSession { id, kind })))
}

pub async fn update_urgency(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(sid): Path<Uuid>,
    Query(query): Query<KindQuery>,
    Json(payload): Json<UrgencyRequest>,
) -> AppResult<StatusCode> {
    user.require_admin()?;
    let kind = parse_kind(query.flag.as_deref())?;
    let urgency = required_text(&payload.urgency, "urgency")?;

    apply_changes(&state, kind, sid, SessionChanges::urgency(urgency)).await
}

pub async fn update_team(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(sid): Path<Uuid>,
    Query(query): Query<KindQuery>,
    Json(payload): Json<TeamRequest>,
) -> AppResult<StatusCode> {
    user.require_admin()?;
    let kind = parse_kind(query.flag.as_deref())?;
    let team = required_text(&payload.team, "team")?;

    apply_changes(&state, kind, sid, SessionChanges::team(team)).await
}

pub async fn take_action(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(sid): Path<Uuid>,
    Query(query): Query<KindQuery>,
    Json(payload): Json<ActionRequest>,
) -> AppResult<StatusCode> {
    let kind = parse_kind(query.flag.as_deref())?;
    ensure_access(&state, &user, kind, sid).await?;
    let changes = SessionChanges::action(payload.action_taken_notes.trim(), payload.mark_as_complete);

    apply_changes(&state, kind, sid, changes).await
}

/// Fails with 404 when the record is absent and 403 when it belongs to a
/// team the caller is not part of.
pub(crate) async fn ensure_access(
    state: &AppState,
    user: &AuthenticatedUser,
    kind: SessionKind,
    id: Uuid,
) -> AppResult<()> {
    if matches!(user.role, Role::Admin) {
        return Ok(());
    }
    let record = state.store().get_session(kind, id).await?;
    user.can_access(record.category())
}

async fn apply_changes(
    state: &AppState,
    kind: SessionKind,
    id: Uuid,
    changes: SessionChanges,
) -> AppResult<StatusCode> {
    let updated = state.store().update_session(kind, id, changes).await?;
    if updated == 0 {
        return Err(AppError::not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}
