// Router configuration

use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{health_handlers::*, rpc_handlers::*},
    observability,
    state::AppState,
};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    Router::new()
        // Health & Info
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        // Procedure dispatch
        .route("/rpc/{name}", post(rpc_handler))
        .route("/api/rpc/{name}", post(rpc_handler))
        // Organizations
        .route("/organizations", get(list_organizations_handler))
        .route("/api/organizations", get(list_organizations_handler))
        .route(
            "/organizations/members/search",
            post(search_members_handler),
        )
        .route(
            "/api/organizations/members/search",
            post(search_members_handler),
        )
        .route("/organizations/stats", post(organization_stats_handler))
        .route("/api/organizations/stats", post(organization_stats_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(observability::http_make_span())
                .on_response(observability::response_logger()),
        )
        .layer(cors)
        .layer(observability::request_context_layer())
        .with_state(state)
}
