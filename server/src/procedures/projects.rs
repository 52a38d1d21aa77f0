use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use roster_core::project::{NewProject, ProjectRecord};

use crate::{
    error::AppError,
    procedure::{
        FieldViolation, Procedure, ProcedureContext, ProcedureInput, ProcedureOutput,
        ProcedureRouter, RequireSession,
    },
    state::AppState,
};

pub(crate) fn register(router: &mut ProcedureRouter) {
    router.register(
        Procedure::new("project.create", create_project)
            .with_interceptor(Arc::new(RequireSession)),
    );
    router.register(
        Procedure::new("project.list", list_projects).with_interceptor(Arc::new(RequireSession)),
    );
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateProjectInput {
    organization_id: String,
    name: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    #[serde(default)]
    location: Option<String>,
    country: String,
    #[serde(default)]
    welcome_message: Option<String>,
}

impl ProcedureInput for CreateProjectInput {
    fn validate(&self) -> Result<(), FieldViolation> {
        if self.organization_id.trim().is_empty() {
            return Err(FieldViolation {
                field: "organizationId",
                reason: "must not be empty",
            });
        }
        if self.name.trim().is_empty() {
            return Err(FieldViolation {
                field: "name",
                reason: "must not be empty",
            });
        }
        if self.country.trim().is_empty() {
            return Err(FieldViolation {
                field: "country",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct CreateProjectOutput {
    success: bool,
    project: ProjectRecord,
}

impl ProcedureOutput for CreateProjectOutput {}

/// The caller becomes the responsible user of the new project.
async fn create_project(
    state: AppState,
    ctx: ProcedureContext,
    input: CreateProjectInput,
) -> Result<CreateProjectOutput, AppError> {
    let identity = ctx.identity()?;

    let project = state
        .project_store
        .create(NewProject {
            organization_id: input.organization_id,
            name: input.name,
            start_date: input.start_date,
            end_date: input.end_date,
            location: input.location,
            country: input.country,
            welcome_message: input.welcome_message,
            responsible_user_id: identity.user.id.clone(),
        })
        .await
        .map_err(AppError::from_anyhow)?;

    Ok(CreateProjectOutput {
        success: true,
        project,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListProjectsInput {
    organization_id: String,
}

impl ProcedureInput for ListProjectsInput {
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

impl ProcedureOutput for Vec<ProjectRecord> {}

async fn list_projects(
    state: AppState,
    _ctx: ProcedureContext,
    input: ListProjectsInput,
) -> Result<Vec<ProjectRecord>, AppError> {
    state
        .project_store
        .list_for_organization(&input.organization_id)
        .await
        .map_err(AppError::from_anyhow)
}
