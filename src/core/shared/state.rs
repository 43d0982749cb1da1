use std::sync::Arc;

use crate::core::access::AccessResolver;
use crate::core::config::AppConfig;
use crate::core::store::CrmStore;
use crate::security::auth_api::AuthConfig;
use crate::security::jwt::JwtManager;
use crate::security::password::PasswordHasher;

pub struct AppState {
    pub store: Arc<dyn CrmStore>,
    pub access: AccessResolver,
    pub jwt: Arc<JwtManager>,
    pub passwords: Arc<PasswordHasher>,
    pub auth: Arc<AuthConfig>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn CrmStore>) -> anyhow::Result<Self> {
        let jwt = JwtManager::from_settings(&config.auth)?;
        let passwords = PasswordHasher::new(&config.auth)?;
        Ok(Self {
            access: AccessResolver::new(store.clone()),
            store,
            jwt: Arc::new(jwt),
            passwords: Arc::new(passwords),
            auth: Arc::new(AuthConfig::default()),
            config: Arc::new(config),
        })
    }
}
