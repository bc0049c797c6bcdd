//! Render projections over member lists: filter, then either a flat sort or
//! alphabetic grouping. Nothing here owns data; every function borrows the
//! members it is given and hands back references in display order.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::domain::{Member, MemberId};

pub mod stats;
pub mod users;

pub use stats::{ApprovalStats, UserStats};
pub use users::{project_users, UserQuery, UserSortKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    CreatedAt,
    /// `firstName + " " + lastName`, case-insensitive.
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Parse the `<key>-<direction>` form used by sort pickers, e.g.
    /// `createdAt-desc` or `name-asc`.
    pub fn parse(s: &str) -> Option<Self> {
        let (key, direction) = s.split_once('-')?;
        let key = match key.to_lowercase().as_str() {
            "createdat" | "created" => SortKey::CreatedAt,
            "name" => SortKey::Name,
            _ => return None,
        };
        Some(Self::new(key, SortDirection::from_str(direction)?))
    }
}

/// Approval status filter of the admin member list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Approved,
    Pending,
}

impl StatusFilter {
    pub fn matches(&self, member: &Member) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Approved => member.is_approved,
            StatusFilter::Pending => !member.is_approved,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "all" => Some(StatusFilter::All),
            "approved" => Some(StatusFilter::Approved),
            "pending" => Some(StatusFilter::Pending),
            _ => None,
        }
    }
}

/// After filtering, a projection is either sorted flat or grouped, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// List/grid views. `None` keeps input order.
    Flat(Option<SortSpec>),
    /// Directory home view: buckets by first-name initial.
    Grouped,
}

impl Default for Layout {
    fn default() -> Self {
        Layout::Flat(None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProjectionOptions {
    pub layout: Layout,
    pub status: StatusFilter,
}

impl ProjectionOptions {
    pub fn flat(sort: Option<SortSpec>) -> Self {
        Self {
            layout: Layout::Flat(sort),
            status: StatusFilter::All,
        }
    }

    pub fn grouped() -> Self {
        Self {
            layout: Layout::Grouped,
            status: StatusFilter::All,
        }
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group<'a> {
    pub key: String,
    pub members: Vec<&'a Member>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection<'a> {
    Flat(Vec<&'a Member>),
    Grouped(Vec<Group<'a>>),
}

impl<'a> Projection<'a> {
    /// Members in display order, groups concatenated.
    pub fn members(&self) -> Vec<&'a Member> {
        match self {
            Projection::Flat(members) => members.clone(),
            Projection::Grouped(groups) => groups
                .iter()
                .flat_map(|g| g.members.iter().copied())
                .collect(),
        }
    }

    pub fn ids(&self) -> Vec<MemberId> {
        self.members().into_iter().map(|m| m.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        match self {
            Projection::Flat(members) => members.len(),
            Projection::Grouped(groups) => groups.iter().map(|g| g.members.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn project<'a, I>(members: I, query: &str, options: &ProjectionOptions) -> Projection<'a>
where
    I: IntoIterator<Item = &'a Member>,
{
    let mut visible = filter(members, query, options.status);
    match options.layout {
        Layout::Flat(Some(spec)) => {
            sort(&mut visible, spec);
            Projection::Flat(visible)
        }
        Layout::Flat(None) => Projection::Flat(visible),
        Layout::Grouped => Projection::Grouped(group(visible)),
    }
}

/// Case-insensitive substring match against every field of the member,
/// surrounding whitespace included. A blank query matches everything.
pub fn filter<'a, I>(members: I, query: &str, status: StatusFilter) -> Vec<&'a Member>
where
    I: IntoIterator<Item = &'a Member>,
{
    let match_all = query.trim().is_empty();
    let needle = query.to_lowercase();
    members
        .into_iter()
        .filter(|m| status.matches(m))
        .filter(|m| match_all || m.search_text().contains(&needle))
        .collect()
}

/// Stable sort; ties keep their input order in both directions.
pub fn sort(members: &mut [&Member], spec: SortSpec) {
    match spec.key {
        SortKey::CreatedAt => {
            members.sort_by(|a, b| spec.direction.apply(a.created_at.cmp(&b.created_at)));
        }
        SortKey::Name => {
            members.sort_by(|a, b| {
                let a_name = a.full_name().to_lowercase();
                let b_name = b.full_name().to_lowercase();
                spec.direction.apply(a_name.cmp(&b_name))
            });
        }
    }
}

/// Bucket by the uppercased first character of `firstName` (`#` when
/// blank). Buckets ascend by key; members within a bucket ascend by
/// first name.
pub fn group(members: Vec<&Member>) -> Vec<Group<'_>> {
    let mut buckets: BTreeMap<String, Vec<&Member>> = BTreeMap::new();
    for member in members {
        buckets.entry(initial(&member.first_name)).or_default().push(member);
    }

    buckets
        .into_iter()
        .map(|(key, mut members)| {
            members.sort_by(|a, b| collate(&a.first_name, &b.first_name));
            Group { key, members }
        })
        .collect()
}

fn initial(first_name: &str) -> String {
    match first_name.trim().chars().next() {
        Some(c) => c.to_uppercase().collect(),
        None => "#".to_string(),
    }
}

/// Human ordering for names: case-folded comparison first, then a lowercase
/// letter before its uppercase form, then raw code points.
pub fn collate(a: &str, b: &str) -> Ordering {
    let folded = a.to_lowercase().cmp(&b.to_lowercase());
    if folded != Ordering::Equal {
        return folded;
    }

    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca == cb {
            continue;
        }
        return match (ca.is_lowercase(), cb.is_lowercase()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => ca.cmp(&cb),
        };
    }
    a.cmp(b)
}
