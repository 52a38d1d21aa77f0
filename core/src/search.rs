use std::collections::HashSet;

use anyhow::Result;
use http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::{
    authority::{MemberRoleQuery, SessionAuthority},
    member::{MemberRecord, MemberRole},
};

pub const DEFAULT_SEARCH_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    #[serde(rename = "createdAt")]
    CreatedAt,
    #[serde(rename = "user.name")]
    Name,
    #[serde(rename = "email")]
    Email,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberFilters {
    #[serde(default)]
    pub roles: Option<Vec<MemberRole>>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: Option<SortField>,
    #[serde(default)]
    pub sort_direction: Option<SortDirection>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberPage {
    pub members: Vec<MemberRecord>,
    pub total: usize,
}

/// Multi-role member search: fan out one membership fetch per requested role,
/// merge, deduplicate, filter, sort and paginate.
///
/// `total` counts the filtered set before pagination. An empty or absent role
/// set performs zero fetches and yields `{members: [], total: 0}`; callers
/// that want every role must request every role explicitly.
///
/// Any fetch failure aborts the whole search; no partial page is ever
/// returned and no retry happens here.
pub async fn search_members(
    authority: &dyn SessionAuthority,
    headers: &HeaderMap,
    organization_id: &str,
    filters: &MemberFilters,
) -> Result<MemberPage> {
    let roles: &[MemberRole] = filters.roles.as_deref().unwrap_or(&[]);

    // Fetches are merged in the declared role order, which also fixes the
    // dedup tie-break below.
    let mut working: Vec<MemberRecord> = Vec::new();
    for role in roles {
        let fetched = authority
            .list_members(
                headers,
                MemberRoleQuery {
                    organization_id,
                    role: *role,
                },
            )
            .await?;
        working.extend(fetched);
    }

    // A member fetched under several roles collapses to its first occurrence.
    let mut seen = HashSet::with_capacity(working.len());
    working.retain(|member| seen.insert(member.id.clone()));

    if let Some(search) = filters.search.as_deref().filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        working.retain(|member| matches_search(member, &needle));
    }

    sort_members(&mut working, filters.sort_by, filters.sort_direction);

    let total = working.len();
    let limit = filters.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let offset = filters.offset.unwrap_or(0);
    let members = working.into_iter().skip(offset).take(limit).collect();

    Ok(MemberPage { members, total })
}

fn matches_search(member: &MemberRecord, needle: &str) -> bool {
    let name = member.user.name.as_deref().unwrap_or_default().to_lowercase();
    let email = member
        .user
        .email
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    name.contains(needle) || email.contains(needle)
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Time(i64),
    Text(String),
}

fn sort_key(member: &MemberRecord, field: SortField) -> SortKey {
    match field {
        SortField::CreatedAt => SortKey::Time(member.created_at.timestamp_millis()),
        SortField::Name => SortKey::Text(
            member
                .user
                .name
                .as_deref()
                .unwrap_or_default()
                .to_lowercase(),
        ),
        SortField::Email => SortKey::Text(
            member
                .user
                .email
                .as_deref()
                .unwrap_or_default()
                .to_lowercase(),
        ),
    }
}

fn sort_members(
    members: &mut [MemberRecord],
    sort_by: Option<SortField>,
    direction: Option<SortDirection>,
) {
    let Some(field) = sort_by else {
        // Implicit default: newest membership first.
        members.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        return;
    };

    // Direction flips the comparison, never the key; sort_by is stable, so
    // equal keys keep their pre-sort order either way.
    let descending = !matches!(direction, Some(SortDirection::Asc));
    members.sort_by(|a, b| {
        let ordering = sort_key(a, field).cmp(&sort_key(b, field));
        if descending { ordering.reverse() } else { ordering }
    });
}
