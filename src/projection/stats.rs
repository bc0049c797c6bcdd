use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::domain::{Member, User};

/// Approval counts over a member list. Always recomputed from the list it is
/// given; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ApprovalStats {
    pub total: usize,
    pub approved: usize,
    pub pending: usize,
    pub new_this_month: usize,
}

impl ApprovalStats {
    pub fn from_members<'a, I>(members: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a Member>,
    {
        members.into_iter().fold(Self::default(), |mut stats, member| {
            stats.total += 1;
            if member.is_approved {
                stats.approved += 1;
            } else {
                stats.pending += 1;
            }
            if member.created_at.is_some_and(|at| same_month(at, now)) {
                stats.new_this_month += 1;
            }
            stats
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct UserStats {
    pub total: usize,
    pub with_members: usize,
    pub new_this_month: usize,
}

impl UserStats {
    /// `users` pairs each user with the number of members in their directory.
    pub fn from_users<'a, I>(users: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = (&'a User, usize)>,
    {
        users.into_iter().fold(Self::default(), |mut stats, (user, member_count)| {
            stats.total += 1;
            if member_count > 0 {
                stats.with_members += 1;
            }
            if user.created_at.is_some_and(|at| same_month(at, now)) {
                stats.new_this_month += 1;
            }
            stats
        })
    }
}

fn same_month(at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    at.year() == now.year() && at.month() == now.month()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MemberId, UserId};
    use chrono::TimeZone;

    fn member(id: &str, approved: bool, created: Option<DateTime<Utc>>) -> Member {
        Member {
            id: MemberId::new(id),
            user_id: None,
            first_name: id.to_string(),
            last_name: String::new(),
            email: String::new(),
            phone_number: String::new(),
            address: String::new(),
            dob: None,
            dp: None,
            is_approved: approved,
            created_at: created,
            family_head: None,
        }
    }

    #[test]
    fn test_approval_stats() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        let this_month = Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        let last_year = Some(Utc.with_ymd_and_hms(2023, 3, 1, 9, 0, 0).unwrap());

        let members = vec![
            member("a", true, this_month),
            member("b", false, last_year),
            member("c", false, None),
        ];

        let stats = ApprovalStats::from_members(&members, now);
        assert_eq!(
            stats,
            ApprovalStats { total: 3, approved: 1, pending: 2, new_this_month: 1 }
        );
    }

    #[test]
    fn test_user_stats() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        let user = |id: &str, created| User {
            id: UserId::new(id),
            email: format!("{}@example.com", id),
            category: None,
            about_us: String::new(),
            banner: None,
            created_at: created,
        };
        let a = user("a", Some(now));
        let b = user("b", None);

        let stats = UserStats::from_users(vec![(&a, 2), (&b, 0)], now);
        assert_eq!(stats, UserStats { total: 2, with_members: 1, new_this_month: 1 });
    }
}
