use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::sessions::{ensure_access, parse_kind, KindQuery};
use crate::auth::AuthenticatedUser;
use crate::detail::CommentResponse;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddCommentQuery {
    pub email: Option<String>,
    pub flag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct AddedComment {
    pub comment_id: i32,
    pub comment: String,
}

pub async fn add_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(sid): Path<Uuid>,
    Query(query): Query<AddCommentQuery>,
    Json(payload): Json<AddCommentRequest>,
) -> AppResult<(StatusCode, Json<AddedComment>)> {
    let kind = parse_kind(query.flag.as_deref())?;
    let email = query
        .email
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::bad_request("email is required"))?
        .to_string();
    let body = payload.comment.trim();
    if body.is_empty() {
        return Err(AppError::bad_request("comment must not be empty"));
    }

    ensure_access(&state, &user, kind, sid).await?;

    let comment = state
        .store()
        .insert_comment(kind, sid, body.to_string(), email)
        .await?;
    info!(session_id = %sid, comment_id = comment.id, kind = %kind, "comment added");

    Ok((
        StatusCode::CREATED,
        Json(AddedComment {
            comment_id: comment.id,
            comment: comment.body,
        }),
    ))
}

pub async fn list_comments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(sid): Path<Uuid>,
    Query(query): Query<KindQuery>,
) -> AppResult<Json<Vec<CommentResponse>>> {
    let kind = parse_kind(query.flag.as_deref())?;

    let record = state.store().get_session(kind, sid).await?;
    user.can_access(record.category())?;
    let comments = state.store().comments_for(sid).await?;

    Ok(Json(comments.into_iter().map(CommentResponse::from).collect()))
}
