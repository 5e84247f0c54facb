pub mod jwt;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

pub const ADMIN_ROLE: &str = "admin";

/// Administrators see every category; team staff only their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Team(String),
}

impl Role {
    pub fn resolve(raw: &str, active_categories: &[String]) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case(ADMIN_ROLE) {
            return Some(Role::Admin);
        }
        active_categories
            .iter()
            .find(|category| category.eq_ignore_ascii_case(raw))
            .map(|category| Role::Team(category.clone()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub subject: String,
    pub email: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn require_admin(&self) -> AppResult<()> {
        match self.role {
            Role::Admin => Ok(()),
            Role::Team(_) => Err(AppError::forbidden()),
        }
    }

    /// Team staff may only read or act on records filed under their team.
    pub fn can_access(&self, category: &str) -> AppResult<()> {
        match &self.role {
            Role::Admin => Ok(()),
            Role::Team(team) if team.eq_ignore_ascii_case(category.trim()) => Ok(()),
            Role::Team(_) => Err(AppError::forbidden()),
        }
    }

    /// Category a listing is allowed to cover. Team staff are pinned to their
    /// own team and may not ask for another one.
    pub fn visible_team(&self, requested: Option<String>) -> AppResult<Option<String>> {
        let requested = requested.filter(|team| !team.trim().is_empty());
        match &self.role {
            Role::Admin => Ok(requested),
            Role::Team(team) => match requested {
                Some(other) if !other.trim().eq_ignore_ascii_case(team) => {
                    Err(AppError::forbidden())
                }
                _ => Ok(Some(team.clone())),
            },
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized())?;

        let claims = state
            .jwt
            .verify_token(bearer.token())
            .map_err(|_| AppError::unauthorized())?;

        let role = Role::resolve(&claims.role, &state.config.active_categories)
            .ok_or_else(AppError::forbidden)?;

        Ok(AuthenticatedUser {
            subject: claims.sub,
            email: claims.email,
            role,
        })
    }
}
