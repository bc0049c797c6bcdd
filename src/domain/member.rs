use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::UserId;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical contact record. Every response shape the backend produces is
/// normalised into this before it reaches the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    pub user_id: Option<UserId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    pub dob: Option<NaiveDate>,
    pub dp: Option<String>,
    pub is_approved: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub family_head: Option<bool>,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_pending(&self) -> bool {
        !self.is_approved
    }

    /// Lowercased, space-joined string form of every field value, missing
    /// values rendered as empty strings.
    pub fn search_text(&self) -> String {
        let values = [
            self.id.to_string(),
            self.user_id.as_ref().map(ToString::to_string).unwrap_or_default(),
            self.first_name.clone(),
            self.last_name.clone(),
            self.email.clone(),
            self.phone_number.clone(),
            self.address.clone(),
            self.dob.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            self.dp.clone().unwrap_or_default(),
            self.is_approved.to_string(),
            self.created_at.map(|dt| dt.to_rfc3339()).unwrap_or_default(),
            self.family_head.map(|f| f.to_string()).unwrap_or_default(),
        ];
        values.join(" ").to_lowercase()
    }
}

/// An image picked from disk, sent as a multipart file part.
#[derive(Clone, PartialEq, Serialize)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Guess the content type from the file extension.
    pub fn from_file_name(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        let content_type = match extension.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            _ => "application/octet-stream",
        };
        Self::new(file_name, content_type, bytes)
    }
}

impl fmt::Debug for PhotoUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhotoUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, Validate)]
pub struct CreateMemberRequest {
    #[validate(length(min = 1, message = "First name is required."))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required."))]
    pub last_name: String,
    #[validate(length(min = 1, message = "Address is required."))]
    pub address: String,
    #[validate(email(message = "Email must be a valid address."))]
    pub email: Option<String>,
    pub phone_number: Option<String>,
    #[validate(required(message = "Date of birth is required."))]
    pub dob: Option<NaiveDate>,
    #[validate(required(message = "Profile picture is required."))]
    pub dp: Option<PhotoUpload>,
}

impl CreateMemberRequest {
    /// Trim text input and check required fields. Nothing that fails here
    /// is ever sent.
    pub fn validated(mut self) -> Result<Self> {
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.address = self.address.trim().to_string();
        self.email = non_blank(self.email);
        self.phone_number = non_blank(self.phone_number);
        self.validate()?;
        Ok(self)
    }
}

/// Partial update: only `Some` fields are sent.
#[derive(Debug, Clone, Default, Validate)]
pub struct UpdateMemberRequest {
    #[validate(length(min = 1, message = "First name is required."))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "Last name is required."))]
    pub last_name: Option<String>,
    #[validate(length(min = 1, message = "Address is required."))]
    pub address: Option<String>,
    #[validate(email(message = "Email must be a valid address."))]
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub dob: Option<NaiveDate>,
    pub dp: Option<PhotoUpload>,
}

impl UpdateMemberRequest {
    /// Fields of `edited` that differ from `original`, plus an optional new photo.
    pub fn between(original: &Member, edited: &Member, dp: Option<PhotoUpload>) -> Self {
        fn changed(before: &str, after: &str) -> Option<String> {
            let after = after.trim();
            (before.trim() != after).then(|| after.to_string())
        }

        Self {
            first_name: changed(&original.first_name, &edited.first_name),
            last_name: changed(&original.last_name, &edited.last_name),
            address: changed(&original.address, &edited.address),
            email: changed(&original.email, &edited.email),
            phone_number: changed(&original.phone_number, &edited.phone_number),
            dob: if original.dob != edited.dob { edited.dob } else { None },
            dp,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.address.is_none()
            && self.email.is_none()
            && self.phone_number.is_none()
            && self.dob.is_none()
            && self.dp.is_none()
    }

    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Lenient date-of-birth parsing: plain dates and full timestamps both occur.
pub fn parse_dob(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|_| AppError::single_field("dob", "Date of birth must look like YYYY-MM-DD."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jane() -> Member {
        Member {
            id: MemberId::new("m1"),
            user_id: Some(UserId::new("u1")),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: "jane@example.com".to_string(),
            phone_number: "555-1111".to_string(),
            address: "12 Kolar Road".to_string(),
            dob: NaiveDate::from_ymd_opt(1990, 4, 2),
            dp: None,
            is_approved: false,
            created_at: None,
            family_head: None,
        }
    }

    fn draft() -> CreateMemberRequest {
        CreateMemberRequest {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            address: "12 Kolar Road".to_string(),
            email: Some("jane@example.com".to_string()),
            phone_number: None,
            dob: NaiveDate::from_ymd_opt(1990, 4, 2),
            dp: Some(PhotoUpload::from_file_name("jane.png", vec![1, 2, 3])),
        }
    }

    #[test]
    fn test_search_text_includes_every_field() {
        let text = jane().search_text();
        assert!(text.contains("jane"));
        assert!(text.contains("555-1111"));
        assert!(text.contains("1990-04-02"));
        assert!(text.contains("false"));
        assert!(text.contains("u1"));
    }

    #[test]
    fn test_create_request_requires_fields() {
        let mut request = draft();
        request.first_name = "   ".to_string();
        request.dp = None;

        let err = request.validated().unwrap_err();
        let fields = err.field_errors().unwrap();
        assert!(fields.contains_key("first_name"));
        assert!(fields.contains_key("dp"));
        assert!(!fields.contains_key("last_name"));
    }

    #[test]
    fn test_create_request_blank_email_is_optional() {
        let mut request = draft();
        request.email = Some("  ".to_string());
        let request = request.validated().unwrap();
        assert!(request.email.is_none());

        let mut request = draft();
        request.email = Some("not-an-email".to_string());
        assert!(request.validated().is_err());
    }

    #[test]
    fn test_update_between_only_changed_fields() {
        let original = jane();
        let mut edited = original.clone();
        edited.phone_number = "555-2222".to_string();
        edited.first_name = " Jane ".to_string();

        let patch = UpdateMemberRequest::between(&original, &edited, None);
        assert_eq!(patch.phone_number.as_deref(), Some("555-2222"));
        assert!(patch.first_name.is_none());
        assert!(patch.dob.is_none());
        assert!(!patch.is_empty());

        let unchanged = UpdateMemberRequest::between(&original, &original, None);
        assert!(unchanged.is_empty());
    }

    #[test]
    fn test_parse_dob() {
        assert_eq!(parse_dob("1990-04-02").unwrap(), NaiveDate::from_ymd_opt(1990, 4, 2).unwrap());
        assert_eq!(
            parse_dob("1990-04-02T00:00:00.000Z").unwrap(),
            NaiveDate::from_ymd_opt(1990, 4, 2).unwrap()
        );
        assert!(parse_dob("yesterday").is_err());
    }

    #[test]
    fn test_photo_content_type() {
        assert_eq!(PhotoUpload::from_file_name("a.JPG", vec![]).content_type, "image/jpeg");
        assert_eq!(PhotoUpload::from_file_name("a", vec![]).content_type, "application/octet-stream");
    }
}
