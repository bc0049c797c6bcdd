use std::sync::Arc;

use crate::{
    api::DirectoryApi,
    domain::UserId,
    error::Result,
    store::{ListKey, SharedStore},
};

pub struct AdminService {
    api: Arc<dyn DirectoryApi>,
    store: SharedStore,
}

impl AdminService {
    pub fn new(api: Arc<dyn DirectoryApi>, store: SharedStore) -> Self {
        Self { api, store }
    }

    /// Fetch every user with their members. Also fills the all-members view.
    pub async fn load_users(&self) -> Result<()> {
        let sent = self.store.write().await.begin_users_load();

        match self.api.all_users().await {
            Ok(roster) => {
                if roster.total_users != roster.users.len() {
                    tracing::debug!(
                        "Roster reports {} users but carried {}",
                        roster.total_users,
                        roster.users.len()
                    );
                }
                self.store.write().await.finish_users_load(roster.users, sent);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to load users: {}", e);
                self.store.write().await.fail_users_load(e.clone());
                Err(e)
            }
        }
    }

    pub async fn load_user_members(&self, user_id: &UserId) -> Result<()> {
        let key = ListKey::UserMembers(user_id.clone());
        let sent = self.store.write().await.begin_load(&key);

        match self.api.user_members(user_id).await {
            Ok(page) => {
                self.store.write().await.finish_load(&key, page.members, sent);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to load members of user {}: {}", user_id, e);
                self.store.write().await.fail_load(&key, e.clone());
                Err(e)
            }
        }
    }
}
