//! Normalized in-memory directory state.
//!
//! Every member exists exactly once, in `members`, keyed by id. Views (the
//! dashboard list, "my members", the admin aggregate, a user's members, the
//! focused member's siblings) are ordered id lists over that map, so an
//! update to a record is visible in every view that lists it.
//!
//! Mutators are crate-private: only the services change state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    api::{MemberDetails, UserDirectory},
    domain::{Member, MemberId, User, UserId},
    error::AppError,
    projection::{self, collate, ApprovalStats, Projection, ProjectionOptions, UserStats},
};

pub type SharedStore = Arc<RwLock<DirectoryStore>>;

/// Count of confirmed approval changes at the moment a request went out.
/// A response carrying an older approval state than a confirmation made
/// after that moment does not overwrite it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Epoch(u64);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListKey {
    /// Dashboard: every member, or the latest search result.
    Directory,
    /// The signed-in user's own members.
    MyMembers,
    /// The focused member's owner's other members.
    Siblings,
    /// Admin: every member across every user.
    AllMembers,
    /// Admin: one user's members.
    UserMembers(UserId),
}

/// One view's ids plus its fetch status. A failed fetch records its error
/// next to the ids from the last successful one.
#[derive(Debug, Clone, PartialEq)]
pub struct ListState<K> {
    ids: Vec<K>,
    loading: bool,
    loaded: bool,
    error: Option<AppError>,
}

impl<K> Default for ListState<K> {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            loading: false,
            loaded: false,
            error: None,
        }
    }
}

impl<K> ListState<K> {
    pub fn ids(&self) -> &[K] {
        &self.ids
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// At least one fetch has succeeded.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn error(&self) -> Option<&AppError> {
        self.error.as_ref()
    }

    fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    fn finish(&mut self, ids: Vec<K>) {
        self.ids = ids;
        self.loading = false;
        self.loaded = true;
        self.error = None;
    }

    fn fail(&mut self, error: AppError) {
        self.loading = false;
        self.error = Some(error);
    }
}

#[derive(Debug, Default)]
pub struct DirectoryStore {
    members: HashMap<MemberId, Member>,
    users: HashMap<UserId, User>,
    member_lists: HashMap<ListKey, ListState<MemberId>>,
    user_list: ListState<UserId>,
    profile: Option<UserId>,
    focused: Option<MemberId>,
    toggle_errors: HashMap<MemberId, AppError>,
    approvals: u64,
    confirmed_at: HashMap<MemberId, u64>,
}

impl DirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStore {
        Arc::new(RwLock::new(Self::new()))
    }

    // ---- reads ----

    pub fn member(&self, id: &MemberId) -> Option<&Member> {
        self.members.get(id)
    }

    pub fn user(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    pub fn list(&self, key: &ListKey) -> Option<&ListState<MemberId>> {
        self.member_lists.get(key)
    }

    pub fn is_loading(&self, key: &ListKey) -> bool {
        self.list(key).is_some_and(ListState::is_loading)
    }

    pub fn error(&self, key: &ListKey) -> Option<&AppError> {
        self.list(key).and_then(ListState::error)
    }

    /// Members of a view, in view order.
    pub fn members(&self, key: &ListKey) -> Vec<&Member> {
        self.list(key)
            .map(|list| list.ids.iter().filter_map(|id| self.members.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn project(&self, key: &ListKey, query: &str, options: &ProjectionOptions) -> Projection<'_> {
        projection::project(self.members(key), query, options)
    }

    pub fn has_pending(&self, key: &ListKey) -> bool {
        self.members(key).iter().any(|m| m.is_pending())
    }

    pub fn approval_stats(&self, key: &ListKey, now: DateTime<Utc>) -> ApprovalStats {
        ApprovalStats::from_members(self.members(key), now)
    }

    pub fn user_list(&self) -> &ListState<UserId> {
        &self.user_list
    }

    /// Users from the admin roster, in roster order.
    pub fn users(&self) -> Vec<&User> {
        self.user_list
            .ids
            .iter()
            .filter_map(|id| self.users.get(id))
            .collect()
    }

    /// Members of `user_id` within the admin aggregate.
    pub fn member_count(&self, user_id: &UserId) -> usize {
        self.members(&ListKey::AllMembers)
            .iter()
            .filter(|m| m.user_id.as_ref() == Some(user_id))
            .count()
    }

    pub fn user_stats(&self, now: DateTime<Utc>) -> UserStats {
        UserStats::from_users(
            self.users().into_iter().map(|u| (u, self.member_count(&u.id))),
            now,
        )
    }

    pub fn profile(&self) -> Option<&User> {
        self.profile.as_ref().and_then(|id| self.users.get(id))
    }

    pub fn focused(&self) -> Option<&Member> {
        self.focused.as_ref().and_then(|id| self.members.get(id))
    }

    pub fn focused_owner(&self) -> Option<&User> {
        self.focused()
            .and_then(|m| m.user_id.as_ref())
            .and_then(|id| self.users.get(id))
    }

    /// Siblings of the focused member, by first name.
    pub fn siblings(&self) -> Vec<&Member> {
        let mut siblings = self.members(&ListKey::Siblings);
        siblings.sort_by(|a, b| collate(&a.first_name, &b.first_name));
        siblings
    }

    pub fn toggle_error(&self, id: &MemberId) -> Option<&AppError> {
        self.toggle_errors.get(id)
    }

    /// Take before sending a request whose response will be stored.
    pub fn epoch(&self) -> Epoch {
        Epoch(self.approvals)
    }

    // ---- updates ----

    fn list_mut(&mut self, key: &ListKey) -> &mut ListState<MemberId> {
        self.member_lists.entry(key.clone()).or_default()
    }

    /// Store a record fetched just now.
    pub(crate) fn upsert_member(&mut self, member: Member) -> MemberId {
        let now = self.epoch();
        self.upsert_member_as_of(member, now)
    }

    /// Replace a member record from a response to a request sent at
    /// `sent`. A record without an owner keeps the owner already known for
    /// that id, and an approval confirmed after `sent` wins over the one
    /// the response carries.
    pub(crate) fn upsert_member_as_of(&mut self, mut member: Member, sent: Epoch) -> MemberId {
        if let Some(existing) = self.members.get(&member.id) {
            if member.user_id.is_none() {
                member.user_id = existing.user_id.clone();
            }
            if self.confirmed_at.get(&member.id).is_some_and(|&at| at > sent.0) {
                if member.is_approved != existing.is_approved {
                    tracing::debug!("Keeping confirmed approval for member {}", member.id);
                }
                member.is_approved = existing.is_approved;
            }
        }
        let id = member.id.clone();
        self.members.insert(id.clone(), member);
        id
    }

    pub(crate) fn upsert_user(&mut self, user: User) -> UserId {
        let id = user.id.clone();
        self.users.insert(id.clone(), user);
        id
    }

    fn upsert_members(&mut self, members: Vec<Member>, sent: Epoch) -> Vec<MemberId> {
        members
            .into_iter()
            .map(|m| self.upsert_member_as_of(m, sent))
            .collect()
    }

    pub(crate) fn begin_load(&mut self, key: &ListKey) -> Epoch {
        self.list_mut(key).begin();
        self.epoch()
    }

    pub(crate) fn finish_load(&mut self, key: &ListKey, members: Vec<Member>, sent: Epoch) {
        let ids = self.upsert_members(members, sent);
        self.list_mut(key).finish(ids);
    }

    pub(crate) fn fail_load(&mut self, key: &ListKey, error: AppError) {
        self.list_mut(key).fail(error);
    }

    pub(crate) fn begin_users_load(&mut self) -> Epoch {
        self.user_list.begin();
        self.list_mut(&ListKey::AllMembers).begin();
        self.epoch()
    }

    /// Admin roster: users in order, and the aggregate member list
    /// flattened from their directories.
    pub(crate) fn finish_users_load(&mut self, directories: Vec<UserDirectory>, sent: Epoch) {
        let mut user_ids = Vec::with_capacity(directories.len());
        let mut member_ids = Vec::new();
        for directory in directories {
            user_ids.push(self.upsert_user(directory.user));
            member_ids.extend(self.upsert_members(directory.members, sent));
        }
        self.user_list.finish(user_ids);
        self.list_mut(&ListKey::AllMembers).finish(member_ids);
    }

    pub(crate) fn fail_users_load(&mut self, error: AppError) {
        self.user_list.fail(error.clone());
        self.list_mut(&ListKey::AllMembers).fail(error);
    }

    pub(crate) fn set_profile(&mut self, directory: UserDirectory, sent: Epoch) {
        let user_id = self.upsert_user(directory.user);
        self.profile = Some(user_id);
        self.finish_load(&ListKey::MyMembers, directory.members, sent);
    }

    /// Profile fields changed on the server; member lists stay as they are
    /// unless the response carried them.
    pub(crate) fn update_profile(&mut self, directory: UserDirectory, sent: Epoch) {
        let user_id = self.upsert_user(directory.user);
        self.profile = Some(user_id);
        if !directory.members.is_empty() {
            self.finish_load(&ListKey::MyMembers, directory.members, sent);
        }
    }

    pub(crate) fn add_my_member(&mut self, member: Member) -> MemberId {
        let id = self.upsert_member(member);
        let list = self.list_mut(&ListKey::MyMembers);
        if !list.ids.contains(&id) {
            list.ids.push(id.clone());
        }
        id
    }

    pub(crate) fn focus(&mut self, details: MemberDetails, sent: Epoch) {
        if let Some(owner) = details.owner {
            self.upsert_user(owner);
        }
        let id = self.upsert_member_as_of(details.member, sent);
        self.focused = Some(id);
        self.finish_load(&ListKey::Siblings, details.siblings, sent);
    }

    /// Apply a server-confirmed approval state to the one record for `id`.
    pub(crate) fn confirm_approval(&mut self, id: &MemberId, is_approved: bool) -> bool {
        self.toggle_errors.remove(id);
        self.approvals += 1;
        self.confirmed_at.insert(id.clone(), self.approvals);
        match self.members.get_mut(id) {
            Some(member) => {
                member.is_approved = is_approved;
                true
            }
            None => false,
        }
    }

    pub(crate) fn record_toggle_error(&mut self, id: &MemberId, error: AppError) {
        self.toggle_errors.insert(id.clone(), error);
    }
}
