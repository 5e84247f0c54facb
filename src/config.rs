use std::env;

use anyhow::{Context, Result};
use url::Url;

use crate::db::DEFAULT_MAX_POOL_SIZE;
use crate::filter::default_active_categories;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_pool_size: u32,
    pub server_host: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub cors_allowed_origin: Option<String>,
    pub request_timeout_secs: u64,
    pub active_categories: Vec<String>,
    pub identity: Option<IdentityConfig>,
}

/// Credentials for the identity provider's management API.
#[derive(Clone, Debug)]
pub struct IdentityConfig {
    pub domain: String,
    pub client_id: String,
    pub client_secret: String,
    pub connection: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_pool_size = env::var("DATABASE_MAX_POOL_SIZE")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_POOL_SIZE);
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("SERVER_PORT must be a valid u16")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let jwt_issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "triage".to_string());
        let jwt_audience =
            env::var("JWT_AUDIENCE").unwrap_or_else(|_| "triage-clients".to_string());
        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN").ok();
        let request_timeout_secs = env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_REQUEST_TIMEOUT_SECS.to_string())
            .parse()
            .context("REQUEST_TIMEOUT_SECS must be an integer")?;
        let active_categories = env::var("ACTIVE_CATEGORIES")
            .ok()
            .map(|raw| parse_categories(&raw))
            .filter(|categories| !categories.is_empty())
            .unwrap_or_else(default_active_categories);
        let identity = identity_from_env()?;

        Ok(Self {
            database_url,
            database_max_pool_size,
            server_host,
            server_port,
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            cors_allowed_origin,
            request_timeout_secs,
            active_categories,
            identity,
        })
    }

    pub fn redacted_database_url(&self) -> String {
        redact_database_url(&self.database_url)
    }
}

fn identity_from_env() -> Result<Option<IdentityConfig>> {
    let Ok(domain) = env::var("AUTH0_DOMAIN") else {
        return Ok(None);
    };
    let client_id = env::var("AUTH0_CLIENT_ID")
        .context("AUTH0_CLIENT_ID must be set when AUTH0_DOMAIN is set")?;
    let client_secret = env::var("AUTH0_CLIENT_SECRET")
        .context("AUTH0_CLIENT_SECRET must be set when AUTH0_DOMAIN is set")?;
    let connection = env::var("AUTH0_CONNECTION")
        .unwrap_or_else(|_| "Username-Password-Authentication".to_string());

    Ok(Some(IdentityConfig {
        domain,
        client_id,
        client_secret,
        connection,
    }))
}

fn parse_categories(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

fn redact_database_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) => {
            let _ = parsed.set_password(Some("*****"));
            parsed.to_string()
        }
        Err(_) => "***".to_string(),
    }
}
