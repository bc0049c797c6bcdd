use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::PhotoUpload;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Directory owner. Member ownership lives on `Member::user_id`; the store
/// resolves a user's members from there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub category: Option<Category>,
    pub about_us: String,
    pub banner: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Neighbourhood tag a directory belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    AshokaGarden,
    Kolar,
    Mandideep,
    PansheelNagar,
    Mangalvara,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::AshokaGarden,
        Category::Kolar,
        Category::Mandideep,
        Category::PansheelNagar,
        Category::Mangalvara,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::AshokaGarden => "ashoka_garden",
            Category::Kolar => "kolar",
            Category::Mandideep => "mandideep",
            Category::PansheelNagar => "pansheel_nagar",
            Category::Mangalvara => "mangalvara",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::AshokaGarden => "Ashoka Garden",
            Category::Kolar => "Kolar",
            Category::Mandideep => "Mandideep",
            Category::PansheelNagar => "Pansheel Nagar",
            Category::Mangalvara => "Mangalvara",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ashoka_garden" => Some(Category::AshokaGarden),
            "kolar" => Some(Category::Kolar),
            "mandideep" => Some(Category::Mandideep),
            "pansheel_nagar" => Some(Category::PansheelNagar),
            "mangalvara" => Some(Category::Mangalvara),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUserRequest {
    pub about_us: Option<String>,
    pub category: Option<Category>,
    pub banner: Option<PhotoUpload>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.about_us.is_none() && self.category.is_none() && self.banner.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct Credentials {
    #[validate(email(message = "Email must be a valid address."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Email must be a valid address."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about_us: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_str(category.as_str()), Some(category));
        }
        assert_eq!(Category::from_str("KOLAR"), Some(Category::Kolar));
        assert_eq!(Category::from_str("downtown"), None);
    }

    #[test]
    fn test_category_serializes_as_tag() {
        let json = serde_json::to_string(&Category::PansheelNagar).unwrap();
        assert_eq!(json, "\"pansheel_nagar\"");
    }
}
