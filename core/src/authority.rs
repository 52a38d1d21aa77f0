use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::{
    HeaderMap,
    header::{AUTHORIZATION, COOKIE},
};
use serde::Serialize;

use crate::member::{MemberRecord, MemberRole};

pub const SESSION_COOKIE_NAME: &str = "roster_session";

#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Identity resolved for one invocation: the caller and the session that
/// proved them. Never cached across invocations.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: SessionUser,
    pub session: SessionRecord,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSummary {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct MemberRoleQuery<'a> {
    pub organization_id: &'a str,
    pub role: MemberRole,
}

/// External identity/membership provider consumed by this core. The caller
/// passes the raw request headers through; how a session token is represented
/// inside them is the authority's business.
#[async_trait]
pub trait SessionAuthority: Send + Sync {
    /// Resolve the current session, or `None` when the headers carry no
    /// usable credential.
    async fn resolve_session(&self, headers: &HeaderMap) -> Result<Option<AuthSession>>;

    /// Organizations the current session belongs to. An anonymous caller gets
    /// an empty list, not an error.
    async fn list_organizations(&self, headers: &HeaderMap) -> Result<Vec<OrganizationSummary>>;

    /// Membership rows of one organization matching one role.
    async fn list_members(
        &self,
        headers: &HeaderMap,
        query: MemberRoleQuery<'_>,
    ) -> Result<Vec<MemberRecord>>;
}

pub(crate) fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    for parsed in cookie::Cookie::split_parse(raw) {
        if let Ok(parsed) = parsed {
            if parsed.name() == name {
                return Some(parsed.value().to_owned());
            }
        }
    }
    None
}

pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let mut segments = value.split_whitespace();
    let scheme = segments.next()?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = segments.next()?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_owned())
}

/// Session token from either the `Authorization: Bearer` header or the
/// session cookie, bearer taking precedence.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    extract_bearer_token(headers).or_else(|| extract_cookie(headers, SESSION_COOKIE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn bearer_token_is_extracted_case_insensitively() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("BEARER tok-123"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("tok-123"));
    }

    #[test]
    fn session_cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; roster_session=tok-456; locale=en"),
        );
        assert_eq!(extract_session_token(&headers).as_deref(), Some("tok-456"));
    }

    #[test]
    fn empty_or_malformed_credentials_yield_none() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_session_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_session_token(&headers), None);

        assert_eq!(extract_session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn expired_session_is_detected() {
        let now = Utc::now();
        let session = SessionRecord {
            id: "s1".into(),
            user_id: "u1".into(),
            created_at: now,
            expires_at: now,
        };
        assert!(session.is_expired(now));
    }
}
