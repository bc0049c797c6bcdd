use std::sync::Arc;

use crate::{
    api::DirectoryApi,
    domain::*,
    error::{AppError, Result},
    store::{ListKey, SharedStore},
};

/// The signed-in user's side of the directory: their profile, their own
/// members, and the details view.
pub struct DirectoryService {
    api: Arc<dyn DirectoryApi>,
    store: SharedStore,
}

impl DirectoryService {
    pub fn new(api: Arc<dyn DirectoryApi>, store: SharedStore) -> Self {
        Self { api, store }
    }

    /// Fetch the profile together with the user's own members.
    pub async fn load_profile(&self) -> Result<()> {
        let sent = self.store.write().await.begin_load(&ListKey::MyMembers);

        match self.api.current_user().await {
            Ok(directory) => {
                self.store.write().await.set_profile(directory, sent);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to load profile: {}", e);
                self.store.write().await.fail_load(&ListKey::MyMembers, e.clone());
                Err(e)
            }
        }
    }

    /// Validate locally, then create. Invalid input never reaches the network.
    pub async fn create_member(&self, request: CreateMemberRequest) -> Result<Member> {
        let request = request.validated()?;
        let mut member = self.api.create_member(&request).await?;

        let mut store = self.store.write().await;
        if member.user_id.is_none() {
            member.user_id = store.profile().map(|u| u.id.clone());
        }
        store.add_my_member(member.clone());

        tracing::info!("Created member {} ({})", member.full_name(), member.id);
        Ok(member)
    }

    /// Send a partial update. Returns `None` without contacting the backend
    /// when the patch is empty.
    pub async fn update_member(&self, id: &MemberId, request: UpdateMemberRequest) -> Result<Option<Member>> {
        if request.is_empty() {
            tracing::debug!("No changes for member {}, nothing sent", id);
            return Ok(None);
        }

        let request = request.validated()?;
        let sent = self.store.read().await.epoch();
        let member = self.api.update_member(id, &request).await?;
        self.store.write().await.upsert_member_as_of(member.clone(), sent);

        tracing::info!("Updated member {}", id);
        Ok(Some(member))
    }

    /// Edit the stored copy of a member and send only what changed.
    pub async fn edit_member<F>(&self, id: &MemberId, photo: Option<PhotoUpload>, edit: F) -> Result<Option<Member>>
    where
        F: FnOnce(&mut Member),
    {
        let original = self
            .store
            .read()
            .await
            .member(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Member {} is not loaded", id)))?;

        let mut edited = original.clone();
        edit(&mut edited);

        self.update_member(id, UpdateMemberRequest::between(&original, &edited, photo))
            .await
    }

    pub async fn has_pending_members(&self) -> bool {
        self.store.read().await.has_pending(&ListKey::MyMembers)
    }

    /// Ask an administrator to review pending members. Only offered while at
    /// least one of the user's members is unapproved.
    pub async fn request_approval(&self) -> Result<()> {
        if !self.has_pending_members().await {
            return Err(AppError::BadRequest("No members are awaiting approval".to_string()));
        }

        self.api.request_approval().await?;
        tracing::info!("Approval requested");
        Ok(())
    }

    /// Profile edits are applied once the backend confirms them.
    pub async fn update_profile(&self, request: UpdateUserRequest) -> Result<User> {
        if request.is_empty() {
            return Err(AppError::BadRequest("Nothing to update".to_string()));
        }

        let sent = self.store.read().await.epoch();
        let directory = self.api.update_user(&request).await?;
        let user = directory.user.clone();
        self.store.write().await.update_profile(directory, sent);

        tracing::info!("Updated profile {}", user.id);
        Ok(user)
    }

    /// Load a member with its owner and siblings for the details view.
    pub async fn open_member(&self, id: &MemberId) -> Result<()> {
        let sent = self.store.write().await.begin_load(&ListKey::Siblings);

        match self.api.get_member(id).await {
            Ok(details) => {
                self.store.write().await.focus(details, sent);
                Ok(())
            }
            Err(e) => {
                self.store.write().await.fail_load(&ListKey::Siblings, e.clone());
                Err(e)
            }
        }
    }
}
