pub mod admin_service;
pub mod approval_service;
pub mod auth_service;
pub mod directory_service;

use std::sync::Arc;

use crate::{
    api::DirectoryApi,
    auth::TokenStore,
    config::SearchConfig,
    query::QuerySynchronizer,
    store::{DirectoryStore, SharedStore},
};

pub use admin_service::AdminService;
pub use approval_service::{ApprovalService, ToggleOutcome};
pub use auth_service::AuthService;
pub use directory_service::DirectoryService;

pub struct ServiceContext {
    pub api: Arc<dyn DirectoryApi>,
    pub tokens: Arc<dyn TokenStore>,
    pub store: SharedStore,
    pub auth_service: Arc<AuthService>,
    pub directory_service: Arc<DirectoryService>,
    pub admin_service: Arc<AdminService>,
    pub approval_service: Arc<ApprovalService>,
    pub search: Arc<QuerySynchronizer>,
}

impl ServiceContext {
    pub fn new(api: Arc<dyn DirectoryApi>, tokens: Arc<dyn TokenStore>, search: &SearchConfig) -> Self {
        let store = DirectoryStore::shared();

        let auth_service = Arc::new(AuthService::new(api.clone(), tokens.clone()));
        let directory_service = Arc::new(DirectoryService::new(api.clone(), store.clone()));
        let admin_service = Arc::new(AdminService::new(api.clone(), store.clone()));
        let approval_service = Arc::new(ApprovalService::new(api.clone(), store.clone()));
        let search = Arc::new(QuerySynchronizer::new(api.clone(), store.clone(), search.debounce()));

        Self {
            api,
            tokens,
            store,
            auth_service,
            directory_service,
            admin_service,
            approval_service,
            search,
        }
    }
}
