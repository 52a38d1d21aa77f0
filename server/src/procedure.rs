use std::{collections::HashMap, future::Future, sync::Arc};

use anyhow::anyhow;
use async_trait::async_trait;
use axum::http::HeaderMap;
use futures_util::future::BoxFuture;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value as JsonValue;

use roster_core::authority::{SessionRecord, SessionUser};

use crate::{error::AppError, observability, state::AppState};

/// Request-scoped context handed to interceptors and handlers. Built fresh
/// for every invocation and discarded afterwards; carries the raw inbound
/// headers and, once an authorization stage ran, the resolved identity.
#[derive(Clone)]
pub struct ProcedureContext {
    headers: HeaderMap,
    identity: Option<Identity>,
}

#[derive(Clone)]
pub struct Identity {
    pub user: SessionUser,
    pub session: SessionRecord,
}

impl ProcedureContext {
    /// Pure construction; always succeeds, never performs I/O.
    pub fn from_headers(headers: HeaderMap) -> Self {
        Self {
            headers,
            identity: None,
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Identity resolved by an authorization stage. A handler calling this
    /// without having composed `RequireSession` is a programming error.
    pub fn identity(&self) -> Result<&Identity, AppError> {
        self.identity.as_ref().ok_or_else(|| {
            AppError::internal(anyhow!(
                "handler requires an identity but no authorization stage ran"
            ))
        })
    }

    pub fn identity_opt(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }
}

/// One stage of a procedure's interceptor chain. Stages run in declaration
/// order; a stage either hands back an (optionally upgraded) context or
/// short-circuits the whole invocation by returning an error, in which case
/// the remaining stages and the handler never run.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(
        &self,
        state: &AppState,
        ctx: ProcedureContext,
    ) -> Result<ProcedureContext, AppError>;
}

/// The authorization gate: resolves the caller's session through the session
/// authority and fails closed with `UNAUTHENTICATED` when there is none.
/// Identity is re-resolved on every invocation, never cached.
pub struct RequireSession;

#[async_trait]
impl Interceptor for RequireSession {
    async fn intercept(
        &self,
        state: &AppState,
        ctx: ProcedureContext,
    ) -> Result<ProcedureContext, AppError> {
        let resolved = state
            .authority
            .resolve_session(ctx.headers())
            .await
            .map_err(AppError::from_anyhow)?;

        let Some(auth) = resolved else {
            return Err(AppError::unauthenticated());
        };

        observability::record_authenticated_identity(
            Some(&auth.user.id),
            Some(&auth.session.id),
        );

        Ok(ctx.with_identity(Identity {
            user: auth.user,
            session: auth.session,
        }))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldViolation {
    pub field: &'static str,
    pub reason: &'static str,
}

/// Declared input contract of a procedure. Decoding happens first; domain
/// checks run through `validate` and reject with field-level detail before
/// the handler is ever called.
pub trait ProcedureInput: DeserializeOwned + Send {
    fn validate(&self) -> Result<(), FieldViolation> {
        Ok(())
    }
}

impl ProcedureInput for () {}

/// Declared output contract. A handler whose output fails `verify` has a bug;
/// the result is surfaced as an internal error, never coerced.
pub trait ProcedureOutput: Serialize + Send {
    fn verify(&self) -> Result<(), String> {
        Ok(())
    }
}

type RunFn = dyn Fn(AppState, ProcedureContext, JsonValue) -> BoxFuture<'static, Result<JsonValue, AppError>>
    + Send
    + Sync;

/// A named operation: interceptor chain + input contract + output contract +
/// handler. Procedures hold no mutable state between invocations.
pub struct Procedure {
    name: &'static str,
    interceptors: Vec<Arc<dyn Interceptor>>,
    run: Arc<RunFn>,
}

impl Procedure {
    pub fn new<I, O, F, Fut>(name: &'static str, handler: F) -> Self
    where
        I: ProcedureInput + 'static,
        O: ProcedureOutput + 'static,
        F: Fn(AppState, ProcedureContext, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, AppError>> + Send + 'static,
    {
        let run: Arc<RunFn> = Arc::new(move |state, ctx, raw| {
            let boxed: BoxFuture<'static, Result<JsonValue, AppError>> =
                match decode_input::<I>(raw) {
                    Ok(input) => {
                        let fut = handler(state, ctx, input);
                        Box::pin(async move {
                            let output = fut.await?;
                            if let Err(detail) = output.verify() {
                                return Err(AppError::output_contract_violation(name, &detail));
                            }
                            serde_json::to_value(&output)
                                .map_err(|err| AppError::internal(err.into()))
                        })
                    }
                    Err(err) => Box::pin(async move { Err(err) }),
                };
            boxed
        });

        Self {
            name,
            interceptors: Vec::new(),
            run,
        }
    }

    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn invoke(
        &self,
        state: &AppState,
        headers: HeaderMap,
        input: JsonValue,
    ) -> Result<JsonValue, AppError> {
        let mut ctx = ProcedureContext::from_headers(headers);

        for stage in &self.interceptors {
            ctx = stage.intercept(state, ctx).await?;
        }

        (self.run)(state.clone(), ctx, input).await
    }
}

fn decode_input<I: ProcedureInput>(raw: JsonValue) -> Result<I, AppError> {
    let input: I =
        serde_json::from_value(raw).map_err(|err| AppError::validation_message(err.to_string()))?;
    input
        .validate()
        .map_err(|violation| AppError::validation(violation.field, violation.reason))?;
    Ok(input)
}

/// Name-addressed procedure registry, the dispatch surface behind
/// `POST /rpc/{name}` and the REST aliases.
#[derive(Default)]
pub struct ProcedureRouter {
    procedures: HashMap<&'static str, Procedure>,
}

impl ProcedureRouter {
    pub fn register(&mut self, procedure: Procedure) {
        let previous = self.procedures.insert(procedure.name(), procedure);
        assert!(previous.is_none(), "duplicate procedure registration");
    }

    pub fn get(&self, name: &str) -> Option<&Procedure> {
        self.procedures.get(name)
    }

    pub async fn dispatch(
        &self,
        state: &AppState,
        name: &str,
        headers: HeaderMap,
        input: JsonValue,
    ) -> Result<JsonValue, AppError> {
        let Some(procedure) = self.get(name) else {
            return Err(AppError::procedure_not_found(name));
        };

        procedure.invoke(state, headers, input).await
    }
}
