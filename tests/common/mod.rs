use std::env;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use diesel::connection::SimpleConnection;
use diesel::PgConnection;
use diesel_migrations::MigrationHarness;
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use triage_backend::auth::jwt::JwtService;
use triage_backend::config::AppConfig;
use triage_backend::db::{self, PgPool};
use triage_backend::filter::default_active_categories;
use triage_backend::identity::{
    IdentityError, IdentityProvider, IdentityResult, IdentityRole, IdentityUser, NewIdentityUser,
};
use triage_backend::routes;
use triage_backend::session::NewSession;
use triage_backend::state::AppState;
use triage_backend::store::{PgRecordStore, RecordStore};
use uuid::Uuid;

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub const STAFF_EMAIL: &str = "staff@example.org";

/// In-process identity provider keeping users in a map.
#[derive(Default)]
pub struct FakeIdentity {
    users: Mutex<Vec<(IdentityUser, Vec<IdentityRole>)>>,
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn user_roles(&self, user_id: &str) -> IdentityResult<Vec<IdentityRole>> {
        let guard = self.users.lock().await;
        guard
            .iter()
            .find(|(user, _)| user.user_id == user_id)
            .map(|(_, roles)| roles.clone())
            .ok_or_else(|| missing(user_id))
    }

    async fn create_user(&self, new_user: &NewIdentityUser) -> IdentityResult<IdentityUser> {
        let mut guard = self.users.lock().await;
        if guard
            .iter()
            .any(|(user, _)| user.email.as_deref() == Some(new_user.email.as_str()))
        {
            return Err(IdentityError::Status {
                status: 409,
                message: "The user already exists.".to_string(),
            });
        }
        let user = IdentityUser {
            user_id: format!("fake-{}", guard.len() + 1),
            email: Some(new_user.email.clone()),
            name: Some(new_user.name.clone()),
        };
        let roles = new_user
            .role_id
            .iter()
            .map(|id| IdentityRole {
                id: id.clone(),
                name: id.trim_start_matches("rol_").to_string(),
                description: None,
            })
            .collect();
        guard.push((user.clone(), roles));
        Ok(user)
    }

    async fn delete_user(&self, user_id: &str) -> IdentityResult<()> {
        let mut guard = self.users.lock().await;
        let before = guard.len();
        guard.retain(|(user, _)| user.user_id != user_id);
        if guard.len() == before {
            return Err(missing(user_id));
        }
        Ok(())
    }

    async fn search_users(&self, term: Option<&str>) -> IdentityResult<Vec<IdentityUser>> {
        let guard = self.users.lock().await;
        let term = term.unwrap_or_default().to_lowercase();
        Ok(guard
            .iter()
            .map(|(user, _)| user.clone())
            .filter(|user| {
                term.is_empty()
                    || user
                        .email
                        .as_deref()
                        .is_some_and(|email| email.to_lowercase().contains(&term))
            })
            .collect())
    }
}

fn missing(user_id: &str) -> IdentityError {
    IdentityError::Status {
        status: 404,
        message: format!("user {user_id} does not exist"),
    }
}

pub struct TestApp {
    pub state: AppState,
    pool: PgPool,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::with_identity(Some(Arc::new(FakeIdentity::default()))).await
    }

    pub async fn with_identity(identity: Option<Arc<dyn IdentityProvider>>) -> Result<Self> {
        let database_url = env::var("TEST_DATABASE_URL")
            .context("TEST_DATABASE_URL must be set for integration tests")?;

        let config = AppConfig {
            database_url: database_url.clone(),
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            cors_allowed_origin: None,
            request_timeout_secs: 30,
            active_categories: default_active_categories(),
            identity: None,
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let store: Arc<dyn RecordStore> = Arc::new(PgRecordStore::new(pool.clone()));
        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(store, identity, config, jwt);
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            pool,
            router,
        })
    }

    pub async fn cleanup(&self) -> Result<()> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get cleanup connection: {err}"))?;
            truncate_all(&mut conn)?;
            Ok(())
        })
        .await
        .context("cleanup task panicked")?
    }

    /// Bearer token for a caller holding `role`.
    pub fn token(&self, role: &str) -> Result<String> {
        self.state
            .jwt
            .generate_token("staff-1", STAFF_EMAIL, role)
    }

    /// Inserts a record straight through the store. `session` uses the same
    /// JSON shape as `POST /api/sessions`.
    #[allow(dead_code)]
    pub async fn insert_session(&self, session: Value) -> Result<Uuid> {
        let session: NewSession = serde_json::from_value(session)?;
        Ok(self.state.store.insert_session(session).await?)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        self.send(Method::GET, path, None, token).await
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        self.send(Method::DELETE, path, None, token).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        self.send(Method::POST, path, Some(body), token).await
    }

    #[allow(dead_code)]
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        self.send(Method::PUT, path, Some(body), token).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(method).uri(path);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(body.map(Body::from).unwrap_or_else(Body::empty))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

pub async fn body_json<T: DeserializeOwned>(response: hyper::Response<Body>) -> Result<T> {
    let body = body_to_vec(response.into_body()).await?;
    Ok(serde_json::from_slice(&body)?)
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        conn.run_pending_migrations(db::MIGRATIONS)
            .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute("TRUNCATE TABLE comments, chat_records, manual_records RESTART IDENTITY;")
        .context("failed to truncate tables")?;
    Ok(())
}
