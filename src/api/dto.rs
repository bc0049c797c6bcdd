//! Wire shapes served by the directory backend.
//!
//! The backend is inconsistent about nesting: members arrive bare or under
//! `member`, lists bare or under `members`, and `userId` is either an id or
//! the populated owner (which in turn carries `membersArray`). Everything in
//! here exists to fold those variants into the canonical domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{
    api::{MemberDetails, MemberPage, UserDirectory, UserRoster},
    domain::{parse_dob, Category, Member, MemberId, User, UserId},
    error::{AppError, Result},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDto {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dob: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dp: Option<String>,
    #[serde(default)]
    pub is_approved: Option<bool>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub family_head: Option<bool>,
    #[serde(default)]
    pub user_id: Option<OwnerRef>,
}

/// `userId` as stored (an id) or populated with the owning user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OwnerRef {
    Id(String),
    Populated(Box<UserDto>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub about_us: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub banner: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    #[serde(default, alias = "membersArray")]
    pub members: Vec<MemberEntry>,
}

/// Embedded member references are sometimes left unpopulated.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MemberEntry {
    Id(String),
    Full(MemberDto),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MemberListBody {
    Bare(Vec<MemberDto>),
    Wrapped { members: Vec<MemberDto> },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MemberBody {
    Wrapped { member: MemberDto },
    Bare(MemberDto),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UserBody {
    Wrapped { user: UserDto },
    Bare(UserDto),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRosterDto {
    #[serde(default)]
    pub user_array: Vec<UserDto>,
    pub total_users: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPageDto {
    #[serde(default)]
    pub members: Vec<MemberDto>,
    pub total_members: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TokenDto {
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error)
    }
}

impl MemberDto {
    /// Normalise into a `Member`. `owner` fills in the owning user when the
    /// record was embedded in a user and carries no `userId` of its own.
    pub fn into_member(self, owner: Option<&UserId>) -> Result<Member> {
        if self.id.trim().is_empty() {
            return Err(AppError::UnexpectedResponse("member without an id".to_string()));
        }

        let user_id = match &self.user_id {
            Some(OwnerRef::Id(id)) => Some(UserId::new(id.clone())),
            Some(OwnerRef::Populated(user)) => Some(UserId::new(user.id.clone())),
            None => owner.cloned(),
        };

        let dob = self.dob.as_deref().filter(|s| !s.trim().is_empty()).and_then(|raw| {
            parse_dob(raw)
                .map_err(|_| tracing::warn!("Ignoring unparseable dob {:?} on member {}", raw, self.id))
                .ok()
        });

        Ok(Member {
            id: MemberId::new(self.id.clone()),
            user_id,
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            phone_number: self.phone_number.unwrap_or_default(),
            address: self.address.unwrap_or_default(),
            dob,
            dp: self.dp.filter(|s| !s.is_empty()),
            is_approved: self.is_approved.unwrap_or(false),
            created_at: parse_timestamp(self.created_at.as_deref()),
            family_head: self.family_head,
        })
    }

    /// Focused member plus its owner's other members.
    pub fn into_details(mut self) -> Result<MemberDetails> {
        let owner = match self.user_id.take() {
            Some(OwnerRef::Populated(user)) => {
                self.user_id = Some(OwnerRef::Id(user.id.clone()));
                Some(*user)
            }
            other => {
                self.user_id = other;
                None
            }
        };

        let member = self.into_member(None)?;

        match owner {
            Some(user) => {
                let directory = user.into_directory()?;
                let siblings = directory
                    .members
                    .into_iter()
                    .filter(|m| m.id != member.id)
                    .collect();
                Ok(MemberDetails {
                    member,
                    owner: Some(directory.user),
                    siblings,
                })
            }
            None => Ok(MemberDetails {
                member,
                owner: None,
                siblings: Vec::new(),
            }),
        }
    }
}

impl UserDto {
    pub fn into_directory(self) -> Result<UserDirectory> {
        let user_id = UserId::new(self.id.clone());

        let category = self.category.as_deref().filter(|s| !s.is_empty()).and_then(|raw| {
            let parsed = Category::from_str(raw);
            if parsed.is_none() {
                tracing::warn!("Unknown category {:?} on user {}", raw, self.id);
            }
            parsed
        });

        let mut members = Vec::with_capacity(self.members.len());
        for entry in self.members {
            match entry {
                MemberEntry::Full(dto) => members.push(dto.into_member(Some(&user_id))?),
                MemberEntry::Id(id) => {
                    tracing::debug!("Skipping unpopulated member reference {} on user {}", id, user_id);
                }
            }
        }

        let user = User {
            id: user_id,
            email: self.email.unwrap_or_default(),
            category,
            about_us: self.about_us.unwrap_or_default(),
            banner: self.banner.filter(|s| !s.is_empty()),
            created_at: parse_timestamp(self.created_at.as_deref()),
        };

        Ok(UserDirectory { user, members })
    }
}

impl MemberListBody {
    pub fn into_members(self) -> Result<Vec<Member>> {
        let dtos = match self {
            MemberListBody::Bare(members) | MemberListBody::Wrapped { members } => members,
        };
        dtos.into_iter().map(|dto| dto.into_member(None)).collect()
    }
}

impl MemberBody {
    pub fn into_dto(self) -> MemberDto {
        match self {
            MemberBody::Wrapped { member } | MemberBody::Bare(member) => member,
        }
    }
}

impl UserBody {
    pub fn into_directory(self) -> Result<UserDirectory> {
        match self {
            UserBody::Wrapped { user } | UserBody::Bare(user) => user.into_directory(),
        }
    }
}

impl UserRosterDto {
    pub fn into_roster(self) -> Result<UserRoster> {
        let users = self
            .user_array
            .into_iter()
            .map(UserDto::into_directory)
            .collect::<Result<Vec<_>>>()?;
        let total_users = self.total_users.unwrap_or(users.len());
        Ok(UserRoster { users, total_users })
    }
}

impl MemberPageDto {
    /// Members of `owner`'s directory.
    pub fn into_page(self, owner: &UserId) -> Result<MemberPage> {
        let members = self
            .members
            .into_iter()
            .map(|dto| dto.into_member(Some(owner)))
            .collect::<Result<Vec<_>>>()?;
        let total_members = self.total_members.unwrap_or(members.len());
        Ok(MemberPage { members, total_members })
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(_) => {
            tracing::warn!("Ignoring unparseable timestamp {:?}", raw);
            None
        }
    }
}

/// Accept strings, numbers and booleans for text fields; `null` becomes `None`.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_member_normalisation() {
        let dto: MemberDto = serde_json::from_value(json!({
            "_id": "m1",
            "firstName": "Jane",
            "lastName": "Doe",
            "phoneNumber": 5551111,
            "dob": "1990-04-02T00:00:00.000Z",
            "isApproved": true,
            "createdAt": "2024-01-05T10:00:00.000Z",
            "userId": "u1",
            "__v": 0
        }))
        .unwrap();

        let member = dto.into_member(None).unwrap();
        assert_eq!(member.id.as_str(), "m1");
        assert_eq!(member.phone_number, "5551111");
        assert_eq!(member.email, "");
        assert_eq!(member.user_id, Some(UserId::new("u1")));
        assert!(member.is_approved);
        assert_eq!(member.dob.unwrap().to_string(), "1990-04-02");
        assert!(member.created_at.is_some());
    }

    #[test]
    fn test_bad_dates_do_not_fail_the_record() {
        let dto: MemberDto = serde_json::from_value(json!({
            "_id": "m1",
            "dob": "someday",
            "createdAt": "later"
        }))
        .unwrap();

        let member = dto.into_member(None).unwrap();
        assert!(member.dob.is_none());
        assert!(member.created_at.is_none());
        assert!(!member.is_approved);
    }

    #[test]
    fn test_list_body_shapes() {
        let bare: MemberListBody = serde_json::from_value(json!([{ "_id": "a" }])).unwrap();
        assert_eq!(bare.into_members().unwrap().len(), 1);

        let wrapped: MemberListBody =
            serde_json::from_value(json!({ "members": [{ "_id": "a" }, { "_id": "b" }] })).unwrap();
        assert_eq!(wrapped.into_members().unwrap().len(), 2);
    }

    #[test]
    fn test_member_body_shapes() {
        let wrapped: MemberBody =
            serde_json::from_value(json!({ "member": { "_id": "a", "isApproved": true } })).unwrap();
        assert_eq!(wrapped.into_dto().id, "a");

        let bare: MemberBody = serde_json::from_value(json!({ "_id": "b" })).unwrap();
        assert_eq!(bare.into_dto().id, "b");
    }

    #[test]
    fn test_details_with_populated_owner() {
        let body: MemberBody = serde_json::from_value(json!({
            "member": {
                "_id": "m2",
                "firstName": "Bob",
                "userId": {
                    "_id": "u1",
                    "banner": "https://cdn/banner.png",
                    "membersArray": [
                        { "_id": "m1", "firstName": "Amy" },
                        { "_id": "m2", "firstName": "Bob" },
                        "m3"
                    ]
                }
            }
        }))
        .unwrap();

        let details = body.into_dto().into_details().unwrap();
        assert_eq!(details.member.user_id, Some(UserId::new("u1")));
        assert_eq!(details.owner.unwrap().banner.as_deref(), Some("https://cdn/banner.png"));
        assert_eq!(details.siblings.len(), 1);
        assert_eq!(details.siblings[0].id.as_str(), "m1");
        assert_eq!(details.siblings[0].user_id, Some(UserId::new("u1")));
    }

    #[test]
    fn test_roster_members_inherit_owner() {
        let roster: UserRosterDto = serde_json::from_value(json!({
            "userArray": [{
                "_id": "u1",
                "email": "owner@example.com",
                "category": "kolar",
                "members": [{ "_id": "m1" }]
            }, {
                "_id": "u2",
                "category": "downtown"
            }],
            "totalUsers": 2
        }))
        .unwrap();

        let roster = roster.into_roster().unwrap();
        assert_eq!(roster.total_users, 2);
        assert_eq!(roster.users[0].user.category, Some(Category::Kolar));
        assert_eq!(roster.users[0].members[0].user_id, Some(UserId::new("u1")));
        assert_eq!(roster.users[1].user.category, None);
    }
}
