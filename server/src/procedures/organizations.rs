use std::sync::Arc;

use serde::Deserialize;

use roster_core::{
    authority::OrganizationSummary,
    project::OrganizationStats,
    search::{self, MemberFilters, MemberPage},
};

use crate::{
    error::AppError,
    procedure::{
        FieldViolation, Procedure, ProcedureContext, ProcedureInput, ProcedureOutput,
        ProcedureRouter, RequireSession,
    },
    state::AppState,
};

pub(crate) fn register(router: &mut ProcedureRouter) {
    router.register(Procedure::new("organizations.list", list_organizations));
    router.register(
        Procedure::new("organizations.searchMembers", search_members)
            .with_interceptor(Arc::new(RequireSession)),
    );
    router.register(
        Procedure::new("organizations.stats", organization_stats)
            .with_interceptor(Arc::new(RequireSession)),
    );
}

impl ProcedureOutput for Vec<OrganizationSummary> {}

/// Session optional: an anonymous caller gets an empty list, not an error.
async fn list_organizations(
    state: AppState,
    ctx: ProcedureContext,
    _input: (),
) -> Result<Vec<OrganizationSummary>, AppError> {
    state
        .authority
        .list_organizations(ctx.headers())
        .await
        .map_err(AppError::from_anyhow)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchMembersInput {
    organization_id: String,
    #[serde(default)]
    filters: Option<MemberFilters>,
}

impl ProcedureInput for SearchMembersInput {
    fn validate(&self) -> Result<(), FieldViolation> {
        if self.organization_id.trim().is_empty() {
            return Err(FieldViolation {
                field: "organizationId",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

impl ProcedureOutput for MemberPage {
    fn verify(&self) -> Result<(), String> {
        if self.members.len() > self.total {
            return Err(format!(
                "page holds {} members but total is {}",
                self.members.len(),
                self.total
            ));
        }
        Ok(())
    }
}

async fn search_members(
    state: AppState,
    ctx: ProcedureContext,
    input: SearchMembersInput,
) -> Result<MemberPage, AppError> {
    let filters = input.filters.unwrap_or_default();

    search::search_members(
        state.authority.as_ref(),
        ctx.headers(),
        &input.organization_id,
        &filters,
    )
    .await
    .map_err(AppError::from_anyhow)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrganizationStatsInput {
    organization_id: String,
}

impl ProcedureInput for OrganizationStatsInput {
    fn validate(&self) -> Result<(), FieldViolation> {
        if self.organization_id.trim().is_empty() {
            return Err(FieldViolation {
                field: "organizationId",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

impl ProcedureOutput for OrganizationStats {
    fn verify(&self) -> Result<(), String> {
        if self.total_projects < 0 || self.total_participants < 0 || self.total_activities < 0 {
            return Err("statistics counts must not be negative".to_owned());
        }
        Ok(())
    }
}

async fn organization_stats(
    state: AppState,
    _ctx: ProcedureContext,
    input: OrganizationStatsInput,
) -> Result<OrganizationStats, AppError> {
    state
        .project_store
        .organization_stats(&input.organization_id)
        .await
        .map_err(AppError::from_anyhow)
}

#[cfg(test)]
mod tests {
    use crate::test_support::{
        seed_activity, seed_expired_session, seed_member, seed_organization, seed_participant,
        seed_project, seed_session, seed_user, setup_state,
    };
    use axum::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
    use serde_json::{Value as JsonValue, json};

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn search_members_requires_a_session() {
        let (_tmp, _db, state) = setup_state().await;

        let err = state
            .procedures
            .clone()
            .dispatch(
                &state,
                "organizations.searchMembers",
                HeaderMap::new(),
                json!({ "organizationId": "org" }),
            )
            .await
            .unwrap_err();

        assert_eq!(err.name(), "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn an_expired_session_is_no_session() {
        let (_tmp, db, state) = setup_state().await;
        let user_id = seed_user(&db, "old@example.com", None).await;
        let token = seed_expired_session(&db, &user_id).await;

        let err = state
            .procedures
            .clone()
            .dispatch(
                &state,
                "organizations.searchMembers",
                bearer(&token),
                json!({ "organizationId": "org" }),
            )
            .await
            .unwrap_err();

        assert_eq!(err.name(), "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn empty_organization_id_is_a_validation_error() {
        let (_tmp, db, state) = setup_state().await;
        let user_id = seed_user(&db, "v@example.com", None).await;
        let token = seed_session(&db, &user_id).await;

        let err = state
            .procedures
            .clone()
            .dispatch(
                &state,
                "organizations.searchMembers",
                bearer(&token),
                json!({ "organizationId": "  " }),
            )
            .await
            .unwrap_err();

        assert_eq!(err.name(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn tag_set_membership_collapses_to_one_entry() {
        let (_tmp, db, state) = setup_state().await;
        let caller = seed_user(&db, "caller@example.com", None).await;
        let token = seed_session(&db, &caller).await;
        let org = seed_organization(&db, "Acme", "acme").await;

        let ann = seed_user(&db, "ann@example.com", Some("Ann")).await;
        let bob = seed_user(&db, "bob@example.com", Some("Bob")).await;
        seed_member(&db, &org, &ann, "owner", 100).await;
        // One row carrying two roles; it surfaces under both role queries
        // with the same membership id.
        seed_member(&db, &org, &bob, "admin,member", 200).await;

        let value = state
            .procedures
            .clone()
            .dispatch(
                &state,
                "organizations.searchMembers",
                bearer(&token),
                json!({
                    "organizationId": org,
                    "filters": { "roles": ["owner", "member", "admin"] }
                }),
            )
            .await
            .unwrap();

        assert_eq!(value["total"], 2);
        let members = value["members"].as_array().unwrap();
        assert_eq!(members.len(), 2);
        // Default sort is newest first; Bob's row is the younger one.
        assert_eq!(members[0]["user"]["email"], "bob@example.com");
        assert_eq!(members[0]["role"], "member");
        assert_eq!(members[1]["user"]["email"], "ann@example.com");
    }

    #[tokio::test]
    async fn search_filter_and_pagination_flow_through_the_procedure() {
        let (_tmp, db, state) = setup_state().await;
        let caller = seed_user(&db, "caller2@example.com", None).await;
        let token = seed_session(&db, &caller).await;
        let org = seed_organization(&db, "Globex", "globex").await;

        for (i, email) in ["alice@x.com", "alan@x.com", "carol@x.com"].iter().enumerate() {
            let user = seed_user(&db, email, None).await;
            seed_member(&db, &org, &user, "member", 100 + i as i64).await;
        }

        let value = state
            .procedures
            .clone()
            .dispatch(
                &state,
                "organizations.searchMembers",
                bearer(&token),
                json!({
                    "organizationId": org,
                    "filters": {
                        "roles": ["member"],
                        "search": "AL",
                        "sortBy": "email",
                        "sortDirection": "asc",
                        "limit": 1,
                        "offset": 1
                    }
                }),
            )
            .await
            .unwrap();

        assert_eq!(value["total"], 2);
        let members = value["members"].as_array().unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0]["user"]["email"], "alice@x.com");
    }

    #[tokio::test]
    async fn unknown_stored_role_surfaces_as_internal_error() {
        let (_tmp, db, state) = setup_state().await;
        let caller = seed_user(&db, "caller3@example.com", None).await;
        let token = seed_session(&db, &caller).await;
        let org = seed_organization(&db, "Initech", "initech").await;
        let user = seed_user(&db, "rogue@example.com", None).await;
        seed_member(&db, &org, &user, "member,superuser", 100).await;

        let err = state
            .procedures
            .clone()
            .dispatch(
                &state,
                "organizations.searchMembers",
                bearer(&token),
                json!({
                    "organizationId": org,
                    "filters": { "roles": ["member"] }
                }),
            )
            .await
            .unwrap_err();

        assert_eq!(err.name(), "INTERNAL_SERVER_ERROR");
    }

    #[tokio::test]
    async fn organizations_list_is_empty_without_a_session() {
        let (_tmp, _db, state) = setup_state().await;

        let value = state
            .procedures
            .clone()
            .dispatch(
                &state,
                "organizations.list",
                HeaderMap::new(),
                JsonValue::Null,
            )
            .await
            .unwrap();

        assert_eq!(value, json!([]));
    }

    #[tokio::test]
    async fn organizations_list_returns_the_sessions_memberships() {
        let (_tmp, db, state) = setup_state().await;
        let user = seed_user(&db, "member@example.com", None).await;
        let token = seed_session(&db, &user).await;
        let org_a = seed_organization(&db, "Acme", "acme").await;
        let _org_b = seed_organization(&db, "Globex", "globex").await;
        seed_member(&db, &org_a, &user, "member", 100).await;

        let value = state
            .procedures
            .clone()
            .dispatch(&state, "organizations.list", bearer(&token), JsonValue::Null)
            .await
            .unwrap();

        let organizations = value.as_array().unwrap();
        assert_eq!(organizations.len(), 1);
        assert_eq!(organizations[0]["slug"], "acme");
    }

    #[tokio::test]
    async fn stats_count_only_active_projects() {
        let (_tmp, db, state) = setup_state().await;
        let owner = seed_user(&db, "owner@example.com", None).await;
        let token = seed_session(&db, &owner).await;
        let org = seed_organization(&db, "Acme", "acme").await;

        let active_a = seed_project(&db, &org, &owner, false).await;
        let active_b = seed_project(&db, &org, &owner, false).await;
        let archived = seed_project(&db, &org, &owner, true).await;

        let traveler = seed_user(&db, "traveler@example.com", None).await;
        let other = seed_user(&db, "other@example.com", None).await;
        // The same user across two active projects counts once.
        seed_participant(&db, &active_a, &traveler).await;
        seed_participant(&db, &active_b, &traveler).await;
        seed_participant(&db, &active_b, &other).await;
        seed_participant(&db, &archived, &other).await;

        seed_activity(&db, &active_a).await;
        seed_activity(&db, &active_b).await;
        seed_activity(&db, &archived).await;

        let value = state
            .procedures
            .clone()
            .dispatch(
                &state,
                "organizations.stats",
                bearer(&token),
                json!({ "organizationId": org }),
            )
            .await
            .unwrap();

        assert_eq!(value["totalProjects"], 2);
        assert_eq!(value["totalParticipants"], 2);
        assert_eq!(value["totalActivities"], 2);
    }
}
