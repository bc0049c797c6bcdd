#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::{oneshot, Notify};

use kindred::{
    api::{DirectoryApi, MemberDetails, MemberPage, UserDirectory, UserRoster},
    auth::{MemoryTokenStore, TokenScope},
    config::SearchConfig,
    domain::*,
    error::{AppError, Result},
    service::ServiceContext,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List,
    Search(String),
    Get(MemberId),
    Create,
    Update(MemberId),
    CurrentUser,
    UpdateUser,
    RequestApproval,
    Login(TokenScope),
    Register(TokenScope),
    AllUsers,
    UserMembers(UserId),
    Toggle(MemberId),
}

/// Scripted in-process backend. Responses can be held back with `gate` to
/// control the order in which concurrent requests complete.
#[derive(Default)]
pub struct FakeApi {
    calls: Mutex<Vec<Call>>,
    called: Notify,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    members: Mutex<Vec<Member>>,
    search_results: Mutex<HashMap<String, Vec<Member>>>,
    profile: Mutex<Option<UserDirectory>>,
    roster: Mutex<Vec<UserDirectory>>,
    approvals: Mutex<HashMap<MemberId, bool>>,
    failing_toggles: Mutex<HashSet<MemberId>>,
    offline: Mutex<bool>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_members(&self, members: Vec<Member>) {
        *self.members.lock().unwrap() = members;
    }

    pub fn with_search(&self, query: &str, members: Vec<Member>) {
        self.search_results.lock().unwrap().insert(query.to_string(), members);
    }

    pub fn with_profile(&self, directory: UserDirectory) {
        *self.profile.lock().unwrap() = Some(directory);
    }

    pub fn with_roster(&self, roster: Vec<UserDirectory>) {
        let mut approvals = self.approvals.lock().unwrap();
        for directory in &roster {
            for member in &directory.members {
                approvals.insert(member.id.clone(), member.is_approved);
            }
        }
        *self.roster.lock().unwrap() = roster;
    }

    /// Member list and search requests fail as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    fn network(&self) -> Result<()> {
        if *self.offline.lock().unwrap() {
            return Err(AppError::Network("connection refused".to_string()));
        }
        Ok(())
    }

    pub fn fail_toggle(&self, id: &str) {
        self.failing_toggles.lock().unwrap().insert(MemberId::new(id));
    }

    /// Hold back the response to the request identified by `key` (for
    /// example `search:a`, `toggle:m1` or `user_members:u1`) until the
    /// sender fires.
    pub fn gate(&self, key: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(key.to_string(), rx);
        tx
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub async fn wait_for_calls(&self, count: usize) {
        while self.calls.lock().unwrap().len() < count {
            self.called.notified().await;
        }
    }

    async fn record(&self, call: Call, gate_key: Option<String>) {
        self.calls.lock().unwrap().push(call);
        self.called.notify_one();

        let gate = gate_key.and_then(|key| self.gates.lock().unwrap().remove(&key));
        if let Some(gate) = gate {
            let _ = gate.await;
        }
    }

    fn find_member(&self, id: &MemberId) -> Option<Member> {
        let roster = self.roster.lock().unwrap();
        let members = self.members.lock().unwrap();
        let found = roster
            .iter()
            .flat_map(|d| d.members.iter())
            .chain(members.iter())
            .find(|m| &m.id == id)
            .cloned();
        found
    }
}

#[async_trait]
impl DirectoryApi for FakeApi {
    async fn list_members(&self) -> Result<Vec<Member>> {
        self.record(Call::List, Some("list".to_string())).await;
        self.network()?;
        Ok(self.members.lock().unwrap().clone())
    }

    async fn search_members(&self, query: &str) -> Result<Vec<Member>> {
        self.record(Call::Search(query.to_string()), Some(format!("search:{}", query)))
            .await;
        self.network()?;
        Ok(self
            .search_results
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_member(&self, id: &MemberId) -> Result<MemberDetails> {
        self.record(Call::Get(id.clone()), None).await;
        let member = self
            .find_member(id)
            .ok_or_else(|| AppError::NotFound(format!("member {}", id)))?;
        Ok(MemberDetails {
            member,
            owner: None,
            siblings: Vec::new(),
        })
    }

    async fn create_member(&self, request: &CreateMemberRequest) -> Result<Member> {
        self.record(Call::Create, None).await;
        let mut created = member("new", "u1", &request.first_name, &request.last_name, false, 1);
        created.user_id = None;
        created.address = request.address.clone();
        created.dob = request.dob;
        Ok(created)
    }

    async fn update_member(&self, id: &MemberId, request: &UpdateMemberRequest) -> Result<Member> {
        self.record(Call::Update(id.clone()), None).await;
        let mut updated = self
            .find_member(id)
            .or_else(|| {
                self.profile
                    .lock()
                    .unwrap()
                    .as_ref()
                    .and_then(|p| p.members.iter().find(|m| &m.id == id).cloned())
            })
            .ok_or_else(|| AppError::NotFound(format!("member {}", id)))?;
        if let Some(first_name) = &request.first_name {
            updated.first_name = first_name.clone();
        }
        Ok(updated)
    }

    async fn current_user(&self) -> Result<UserDirectory> {
        self.record(Call::CurrentUser, None).await;
        self.profile
            .lock()
            .unwrap()
            .clone()
            .ok_or(AppError::Unauthorized(TokenScope::User))
    }

    async fn update_user(&self, request: &UpdateUserRequest) -> Result<UserDirectory> {
        self.record(Call::UpdateUser, Some("update_user".to_string())).await;
        let mut profile = self.profile.lock().unwrap();
        let directory = profile
            .as_mut()
            .ok_or(AppError::Unauthorized(TokenScope::User))?;
        if let Some(about_us) = &request.about_us {
            directory.user.about_us = about_us.clone();
        }
        if request.category.is_some() {
            directory.user.category = request.category;
        }
        Ok(UserDirectory {
            user: directory.user.clone(),
            members: Vec::new(),
        })
    }

    async fn request_approval(&self) -> Result<()> {
        self.record(Call::RequestApproval, None).await;
        Ok(())
    }

    async fn login(&self, scope: TokenScope, credentials: &Credentials) -> Result<String> {
        self.record(Call::Login(scope), None).await;
        if credentials.password == "wrong" {
            return Err(AppError::BadRequest("Invalid credentials".to_string()));
        }
        Ok(format!("{}-token", scope))
    }

    async fn register(&self, scope: TokenScope, _request: &RegisterRequest) -> Result<String> {
        self.record(Call::Register(scope), None).await;
        Ok(format!("{}-token", scope))
    }

    async fn all_users(&self) -> Result<UserRoster> {
        self.record(Call::AllUsers, None).await;
        let approvals = self.approvals.lock().unwrap().clone();
        let users: Vec<UserDirectory> = self
            .roster
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .map(|mut directory| {
                for member in &mut directory.members {
                    member.is_approved = approvals.get(&member.id).copied().unwrap_or(member.is_approved);
                }
                directory
            })
            .collect();
        let total_users = users.len();
        Ok(UserRoster { users, total_users })
    }

    async fn user_members(&self, user_id: &UserId) -> Result<MemberPage> {
        self.record(Call::UserMembers(user_id.clone()), Some(format!("user_members:{}", user_id)))
            .await;
        let members: Vec<Member> = self
            .roster
            .lock()
            .unwrap()
            .iter()
            .filter(|d| &d.user.id == user_id)
            .flat_map(|d| d.members.clone())
            .collect();
        let total_members = members.len();
        Ok(MemberPage { members, total_members })
    }

    async fn toggle_approval(&self, id: &MemberId) -> Result<Member> {
        self.record(Call::Toggle(id.clone()), Some(format!("toggle:{}", id))).await;
        if self.failing_toggles.lock().unwrap().contains(id) {
            return Err(AppError::UnexpectedResponse("500 Internal Server Error: boom".to_string()));
        }

        let mut toggled = self
            .find_member(id)
            .ok_or_else(|| AppError::NotFound(format!("member {}", id)))?;
        let mut approvals = self.approvals.lock().unwrap();
        let approved = approvals.entry(id.clone()).or_insert(toggled.is_approved);
        *approved = !*approved;
        toggled.is_approved = *approved;
        // The backend answers without the owner reference.
        toggled.user_id = None;
        Ok(toggled)
    }
}

pub fn member(id: &str, owner: &str, first: &str, last: &str, approved: bool, day: u32) -> Member {
    Member {
        id: MemberId::new(id),
        user_id: Some(UserId::new(owner)),
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: format!("{}@example.com", first.to_lowercase()),
        phone_number: String::new(),
        address: "12 Lake Road".to_string(),
        dob: None,
        dp: Some(format!("/uploads/{}.png", id)),
        is_approved: approved,
        created_at: Utc.with_ymd_and_hms(2024, 1, day, 9, 0, 0).single(),
        family_head: None,
    }
}

pub fn user(id: &str, email: &str) -> User {
    User {
        id: UserId::new(id),
        email: email.to_string(),
        category: Some(Category::Kolar),
        about_us: String::new(),
        banner: None,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).single(),
    }
}

pub fn context(api: Arc<FakeApi>) -> ServiceContext {
    context_with_tokens(api, Arc::new(MemoryTokenStore::new()))
}

pub fn context_with_tokens(api: Arc<FakeApi>, tokens: Arc<MemoryTokenStore>) -> ServiceContext {
    ServiceContext::new(api, tokens, &SearchConfig::default())
}
