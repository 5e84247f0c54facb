//! Identity-provider integration used by the user-management endpoints.
//!
//! Each call exchanges the client credentials for a management token and
//! then talks to the management API with it.

use std::time::Duration;

use async_trait::async_trait;
use rand::{rngs::OsRng, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::IdentityConfig;

pub const DEFAULT_PASSWORD_LENGTH: usize = 16;

const PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider not configured")]
    NotConfigured,
    #[error("invalid identity configuration: {0}")]
    Config(String),
    #[error("identity request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("identity provider returned {status}: {message}")]
    Status { status: u16, message: String },
}

pub type IdentityResult<T> = Result<T, IdentityError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityUser {
    pub user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityRole {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewIdentityUser {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role_id: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    async fn user_roles(&self, user_id: &str) -> IdentityResult<Vec<IdentityRole>>;

    async fn create_user(&self, user: &NewIdentityUser) -> IdentityResult<IdentityUser>;

    async fn delete_user(&self, user_id: &str) -> IdentityResult<()>;

    async fn search_users(&self, term: Option<&str>) -> IdentityResult<Vec<IdentityUser>>;
}

#[derive(Debug, Clone)]
pub struct Auth0Client {
    http: reqwest::Client,
    base_url: Url,
    audience: String,
    client_id: String,
    client_secret: String,
    connection: String,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    audience: &'a str,
    grant_type: &'static str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Serialize)]
struct CreateUserRequest<'a> {
    email: &'a str,
    name: &'a str,
    password: &'a str,
    connection: &'a str,
    email_verified: bool,
}

#[derive(Serialize)]
struct AssignRolesRequest<'a> {
    roles: [&'a str; 1],
}

impl Auth0Client {
    pub fn from_config(config: &IdentityConfig) -> IdentityResult<Self> {
        let base_url = Url::parse(&format!("https://{}/", config.domain))
            .map_err(|err| IdentityError::Config(format!("invalid AUTH0_DOMAIN: {err}")))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            http,
            audience: format!("https://{}/api/v2/", config.domain),
            base_url,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            connection: config.connection.clone(),
        })
    }

    /// Points the client at another host, keeping the audience unchanged.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    fn endpoint<I>(&self, segments: I) -> IdentityResult<Url>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| IdentityError::Config("base url cannot carry a path".to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn management_token(&self) -> IdentityResult<String> {
        let response = self
            .http
            .post(self.endpoint(["oauth", "token"])?)
            .json(&TokenRequest {
                client_id: &self.client_id,
                client_secret: &self.client_secret,
                audience: &self.audience,
                grant_type: "client_credentials",
            })
            .send()
            .await?;
        let token: TokenResponse = ensure_success(response).await?.json().await?;
        Ok(token.access_token)
    }
}

async fn ensure_success(response: reqwest::Response) -> IdentityResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| value.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(body);
    Err(IdentityError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl IdentityProvider for Auth0Client {
    async fn user_roles(&self, user_id: &str) -> IdentityResult<Vec<IdentityRole>> {
        let token = self.management_token().await?;
        let response = self
            .http
            .get(self.endpoint(["api", "v2", "users", user_id, "roles"])?)
            .bearer_auth(token)
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn create_user(&self, user: &NewIdentityUser) -> IdentityResult<IdentityUser> {
        let token = self.management_token().await?;
        let response = self
            .http
            .post(self.endpoint(["api", "v2", "users"])?)
            .bearer_auth(&token)
            .json(&CreateUserRequest {
                email: &user.email,
                name: &user.name,
                password: &user.password,
                connection: &self.connection,
                email_verified: false,
            })
            .send()
            .await?;
        let created: IdentityUser = ensure_success(response).await?.json().await?;
        debug!(user_id = %created.user_id, "created identity user");

        if let Some(role_id) = user.role_id.as_deref() {
            let response = self
                .http
                .post(self.endpoint(["api", "v2", "users", created.user_id.as_str(), "roles"])?)
                .bearer_auth(&token)
                .json(&AssignRolesRequest { roles: [role_id] })
                .send()
                .await?;
            ensure_success(response).await?;
        }

        Ok(created)
    }

    async fn delete_user(&self, user_id: &str) -> IdentityResult<()> {
        let token = self.management_token().await?;
        let response = self
            .http
            .delete(self.endpoint(["api", "v2", "users", user_id])?)
            .bearer_auth(token)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn search_users(&self, term: Option<&str>) -> IdentityResult<Vec<IdentityUser>> {
        let token = self.management_token().await?;
        let mut request = self
            .http
            .get(self.endpoint(["api", "v2", "users"])?)
            .bearer_auth(token);
        if let Some(query) = term.and_then(search_query) {
            request = request.query(&[("q", query.as_str()), ("search_engine", "v3")]);
        }
        let response = request.send().await?;
        Ok(ensure_success(response).await?.json().await?)
    }
}

/// Builds a wildcard search over email and name. Characters with meaning in
/// the provider's query syntax are dropped.
fn search_query(term: &str) -> Option<String> {
    let cleaned: String = term
        .trim()
        .chars()
        .filter(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '_' | '-'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Some(format!("email:*{cleaned}* OR name:*{cleaned}*"))
}

/// Random password containing at least one lowercase letter, uppercase
/// letter, digit and punctuation character.
pub fn generate_password(length: usize) -> String {
    let length = length.max(4);
    let mut rng = OsRng;
    loop {
        let candidate: String = (0..length)
            .map(|_| PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())] as char)
            .collect();
        if candidate.chars().any(|ch| ch.is_ascii_lowercase())
            && candidate.chars().any(|ch| ch.is_ascii_uppercase())
            && candidate.chars().any(|ch| ch.is_ascii_digit())
            && candidate.chars().any(|ch| ch.is_ascii_punctuation())
        {
            return candidate;
        }
    }
}
