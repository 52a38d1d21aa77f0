use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    procedure::{
        Procedure, ProcedureContext, ProcedureInput, ProcedureOutput, ProcedureRouter,
        RequireSession,
    },
    state::AppState,
};

pub(crate) fn register(router: &mut ProcedureRouter) {
    router.register(Procedure::new("health", health));
    router.register(Procedure::new("helloWorld", hello_world));
    router.register(
        Procedure::new("user.getProfile", get_profile).with_interceptor(Arc::new(RequireSession)),
    );
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthOutput {
    status: &'static str,
    version: String,
    environment: String,
    uptime_seconds: u64,
    timestamp: DateTime<Utc>,
}

impl ProcedureOutput for HealthOutput {}

async fn health(state: AppState, _ctx: ProcedureContext, _input: ()) -> Result<HealthOutput, AppError> {
    Ok(HealthOutput {
        status: "ok",
        version: state.metadata.version.clone(),
        environment: state.metadata.environment.clone(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        timestamp: Utc::now(),
    })
}

#[derive(Deserialize)]
struct HelloInput {
    #[serde(default)]
    name: Option<String>,
}

impl ProcedureInput for HelloInput {}

#[derive(Serialize)]
struct HelloOutput {
    message: String,
    timestamp: DateTime<Utc>,
}

impl ProcedureOutput for HelloOutput {}

async fn hello_world(
    _state: AppState,
    _ctx: ProcedureContext,
    input: HelloInput,
) -> Result<HelloOutput, AppError> {
    let name = input.name.as_deref().unwrap_or("World");
    Ok(HelloOutput {
        message: format!("Hello, {name}!"),
        timestamp: Utc::now(),
    })
}

#[derive(Serialize)]
struct ProfileUser {
    id: String,
    name: Option<String>,
    email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileSession {
    id: String,
    expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct ProfileOutput {
    user: ProfileUser,
    session: ProfileSession,
}

impl ProcedureOutput for ProfileOutput {}

async fn get_profile(
    _state: AppState,
    ctx: ProcedureContext,
    _input: (),
) -> Result<ProfileOutput, AppError> {
    let identity = ctx.identity()?;

    Ok(ProfileOutput {
        user: ProfileUser {
            id: identity.user.id.clone(),
            name: identity.user.name.clone(),
            email: identity.user.email.clone(),
        },
        session: ProfileSession {
            id: identity.session.id.clone(),
            expires_at: identity.session.expires_at,
        },
    })
}
