use std::sync::Arc;

use crate::{
    auth::jwt::JwtService,
    config::AppConfig,
    error::{AppError, AppResult},
    identity::IdentityProvider,
    store::RecordStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub identity: Option<Arc<dyn IdentityProvider>>,
    pub config: Arc<AppConfig>,
    pub jwt: JwtService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RecordStore>,
        identity: Option<Arc<dyn IdentityProvider>>,
        config: AppConfig,
        jwt: JwtService,
    ) -> Self {
        Self {
            store,
            identity,
            config: Arc::new(config),
            jwt,
        }
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn identity(&self) -> AppResult<&dyn IdentityProvider> {
        self.identity
            .as_deref()
            .ok_or_else(|| AppError::unavailable("identity provider not configured"))
    }
}
