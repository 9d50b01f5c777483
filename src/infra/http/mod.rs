//! HTTP surface: `POST /print`, its CORS preflight and `GET /status`.

mod error;
mod handlers;
mod middleware;
mod models;
mod state;

pub use error::ApiError;
pub use models::{ErrorBody, ErrorDetails, PrintRequest, PrintResponse, StatusResponse};
pub use state::HttpState;

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, post},
};

use middleware::{apply_cors, log_responses, set_request_context};

pub fn build_router(state: HttpState) -> Router {
    let print_routes = Router::new()
        .route(
            "/print",
            post(handlers::print)
                .options(handlers::preflight)
                .fallback(handlers::method_not_allowed),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            apply_cors,
        ));

    let status_routes = Router::new().route(
        "/status",
        get(handlers::status).fallback(handlers::method_not_allowed),
    );

    print_routes
        .merge(status_routes)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
