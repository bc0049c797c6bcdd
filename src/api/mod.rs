use async_trait::async_trait;

use crate::{
    auth::TokenScope,
    domain::*,
    error::Result,
};

pub mod client;
pub mod dto;

pub use client::HttpDirectoryApi;

/// A member together with the other members of its owner's directory, as
/// served to the details view.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberDetails {
    pub member: Member,
    pub owner: Option<User>,
    pub siblings: Vec<Member>,
}

/// A user with the members of their directory.
#[derive(Debug, Clone, PartialEq)]
pub struct UserDirectory {
    pub user: User,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRoster {
    pub users: Vec<UserDirectory>,
    pub total_users: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberPage {
    pub members: Vec<Member>,
    pub total_members: usize,
}

/// The REST contract of the directory backend. Implementations hand back
/// canonical domain values only; wire shapes never leak past this trait.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    // Members (user scope)
    async fn list_members(&self) -> Result<Vec<Member>>;
    async fn search_members(&self, query: &str) -> Result<Vec<Member>>;
    async fn get_member(&self, id: &MemberId) -> Result<MemberDetails>;
    async fn create_member(&self, request: &CreateMemberRequest) -> Result<Member>;
    async fn update_member(&self, id: &MemberId, request: &UpdateMemberRequest) -> Result<Member>;

    // Own profile (user scope)
    async fn current_user(&self) -> Result<UserDirectory>;
    async fn update_user(&self, request: &UpdateUserRequest) -> Result<UserDirectory>;
    async fn request_approval(&self) -> Result<()>;

    // Sign-in, returns the bearer token for `scope`
    async fn login(&self, scope: TokenScope, credentials: &Credentials) -> Result<String>;
    async fn register(&self, scope: TokenScope, request: &RegisterRequest) -> Result<String>;

    // Admin scope
    async fn all_users(&self) -> Result<UserRoster>;
    async fn user_members(&self, user_id: &UserId) -> Result<MemberPage>;
    async fn toggle_approval(&self, id: &MemberId) -> Result<Member>;
}
