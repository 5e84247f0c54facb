use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::identity::{
    generate_password, IdentityRole, IdentityUser, NewIdentityUser, DEFAULT_PASSWORD_LENGTH,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    pub role_id: Option<String>,
}

/// The temporary password is only ever returned here.
#[derive(Debug, Serialize)]
pub struct CreatedUser {
    #[serde(flatten)]
    pub user: IdentityUser,
    pub temporary_password: String,
}

pub async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<UserSearchQuery>,
) -> AppResult<Json<Vec<IdentityUser>>> {
    user.require_admin()?;
    let users = state.identity()?.search_users(query.search.as_deref()).await?;
    Ok(Json(users))
}

pub async fn create_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<CreatedUser>)> {
    user.require_admin()?;
    let email = payload.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::bad_request("email must be a valid address"));
    }
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }
    let identity = state.identity()?;

    let password = generate_password(DEFAULT_PASSWORD_LENGTH);
    let created = identity
        .create_user(&NewIdentityUser {
            email: email.to_string(),
            name: name.to_string(),
            password: password.clone(),
            role_id: payload
                .role_id
                .map(|role| role.trim().to_string())
                .filter(|role| !role.is_empty()),
        })
        .await?;
    info!(user_id = %created.user_id, created_by = %user.email, "identity user created");

    Ok((
        StatusCode::CREATED,
        Json(CreatedUser {
            user: created,
            temporary_password: password,
        }),
    ))
}

pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<String>,
) -> AppResult<StatusCode> {
    user.require_admin()?;
    if user_id == user.subject {
        return Err(AppError::bad_request("cannot delete the signed-in user"));
    }
    state.identity()?.delete_user(&user_id).await?;
    info!(user_id = %user_id, deleted_by = %user.email, "identity user deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn user_roles(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<IdentityRole>>> {
    user.require_admin()?;
    let roles = state.identity()?.user_roles(&user_id).await?;
    Ok(Json(roles))
}
