use crate::{
    domain::{Category, User},
    projection::SortDirection,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserSortKey {
    #[default]
    CreatedAt,
    Email,
}

/// Admin user-list query: free text over email and category, an optional
/// exact category, and a sort.
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub text: String,
    pub category: Option<Category>,
    pub sort: UserSortKey,
    pub direction: SortDirection,
}

impl UserQuery {
    /// Apply a `<key>-<direction>` sort such as `email-asc`.
    pub fn with_sort(mut self, s: &str) -> Option<Self> {
        let (key, direction) = s.split_once('-')?;
        self.sort = match key.to_lowercase().as_str() {
            "createdat" | "created" => UserSortKey::CreatedAt,
            "email" => UserSortKey::Email,
            _ => return None,
        };
        self.direction = SortDirection::from_str(direction)?;
        Some(self)
    }
}

pub fn project_users<'a, I>(users: I, query: &UserQuery) -> Vec<&'a User>
where
    I: IntoIterator<Item = &'a User>,
{
    let needle = query.text.trim().to_lowercase();

    let mut visible: Vec<&User> = users
        .into_iter()
        .filter(|u| query.category.map_or(true, |c| u.category == Some(c)))
        .filter(|u| {
            needle.is_empty()
                || u.email.to_lowercase().contains(&needle)
                || u.category.is_some_and(|c| c.as_str().contains(&needle))
        })
        .collect();

    visible.sort_by(|a, b| {
        let ordering = match query.sort {
            UserSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            UserSortKey::Email => a.email.to_lowercase().cmp(&b.email.to_lowercase()),
        };
        query.direction.apply(ordering)
    });

    visible
}
