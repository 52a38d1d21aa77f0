use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::HeaderMap;
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};
use tracing::debug;

use crate::{
    authority::{
        AuthSession, MemberRoleQuery, OrganizationSummary, SessionAuthority, SessionRecord,
        SessionUser, extract_session_token,
    },
    db::Database,
    member::{MemberRecord, MemberRole, MemberUser},
};

/// Session authority backed by the local relational store: sessions, users,
/// organizations and membership rows all live in the same database the rest
/// of the server uses.
#[derive(Clone)]
pub struct SqlSessionAuthority {
    pool: Pool<Sqlite>,
}

impl SqlSessionAuthority {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    async fn session_for_token(&self, token: &str) -> Result<Option<AuthSession>> {
        let row = sqlx::query(
            "SELECT s.id AS session_id, s.user_id, s.created_at, s.expires_at, \
                    u.name, u.email, u.image \
             FROM sessions s JOIN users u ON u.id = s.user_id \
             WHERE s.token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .context("failed to look up session")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let session = SessionRecord {
            id: row.get("session_id"),
            user_id: row.get("user_id"),
            created_at: datetime_from_row(&row, "created_at"),
            expires_at: datetime_from_row(&row, "expires_at"),
        };

        if session.is_expired(Utc::now()) {
            return Ok(None);
        }

        let user = SessionUser {
            id: session.user_id.clone(),
            name: row.get("name"),
            email: row.get("email"),
            image: row.get("image"),
        };

        Ok(Some(AuthSession { user, session }))
    }
}

#[async_trait]
impl SessionAuthority for SqlSessionAuthority {
    async fn resolve_session(&self, headers: &HeaderMap) -> Result<Option<AuthSession>> {
        let Some(token) = extract_session_token(headers) else {
            return Ok(None);
        };

        self.session_for_token(&token).await
    }

    async fn list_organizations(&self, headers: &HeaderMap) -> Result<Vec<OrganizationSummary>> {
        let Some(auth) = self.resolve_session(headers).await? else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query(
            "SELECT DISTINCT o.id, o.name, o.slug, o.logo, o.created_at \
             FROM organizations o JOIN members m ON m.organization_id = o.id \
             WHERE m.user_id = ? \
             ORDER BY o.created_at ASC, o.id ASC",
        )
        .bind(&auth.user.id)
        .fetch_all(&self.pool)
        .await
        .context("failed to list organizations")?;

        Ok(rows
            .into_iter()
            .map(|row| OrganizationSummary {
                id: row.get("id"),
                name: row.get("name"),
                slug: row.get("slug"),
                logo: row.get("logo"),
                created_at: datetime_from_row(&row, "created_at"),
            })
            .collect())
    }

    async fn list_members(
        &self,
        _headers: &HeaderMap,
        query: MemberRoleQuery<'_>,
    ) -> Result<Vec<MemberRecord>> {
        // Tag-set containment: a row's role column may hold several
        // comma-separated roles, so the same row (same id) can match more
        // than one requested role. The search engine dedups by id.
        let rows = sqlx::query(
            "SELECT m.id, m.organization_id, m.user_id, m.role, m.created_at, \
                    u.name, u.email, u.image \
             FROM members m JOIN users u ON u.id = m.user_id \
             WHERE m.organization_id = ? AND instr(m.role, ?) > 0 \
             ORDER BY m.created_at ASC, m.id ASC",
        )
        .bind(query.organization_id)
        .bind(query.role.as_str())
        .fetch_all(&self.pool)
        .await
        .context("failed to list members")?;

        let mut members = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(member) = decode_member_row(&row, query.role)? {
                members.push(member);
            }
        }

        debug!(
            organization_id = query.organization_id,
            role = query.role.as_str(),
            count = members.len(),
            "listed members for role"
        );

        Ok(members)
    }
}

fn decode_member_row(row: &SqliteRow, requested: MemberRole) -> Result<Option<MemberRecord>> {
    let raw_role: String = row.get("role");

    let mut tags = Vec::new();
    for tag in raw_role.split(',') {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        tags.push(MemberRole::parse(tag)?);
    }

    // The SQL containment match is a prefilter over the raw column; only rows
    // whose parsed tag set actually carries the requested role count.
    if !tags.contains(&requested) {
        return Ok(None);
    }

    let user_id: String = row.get("user_id");

    Ok(Some(MemberRecord {
        id: row.get("id"),
        organization_id: row.get("organization_id"),
        user_id: user_id.clone(),
        role: requested,
        created_at: datetime_from_row(row, "created_at"),
        user: MemberUser {
            id: user_id,
            name: row.get("name"),
            email: row.get("email"),
            image: row.get("image"),
        },
    }))
}

fn datetime_from_row(row: &SqliteRow, column: &str) -> DateTime<Utc> {
    let seconds: i64 = row.get(column);
    DateTime::from_timestamp(seconds, 0).unwrap_or_default()
}
