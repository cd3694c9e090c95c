//! Paygate HTTP surface
//!
//! Payment interface plus thin administrative CRUD, assembled into one
//! axum router with request-id propagation, tracing and panic recovery.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use std::sync::Arc;

use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Assemble the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let payment = Router::new()
        .route(
            "/profiles/:pid/transactions/authorize/card",
            post(handlers::transaction::card_authorize),
        )
        .route(
            "/profiles/:pid/transactions/preauthorize/card",
            post(handlers::transaction::card_preauthorize),
        )
        .route(
            "/profiles/:pid/transactions/:tid/confirm",
            post(handlers::transaction::confirm),
        )
        .route(
            "/profiles/:pid/transactions/:tid/reverse",
            post(handlers::transaction::reverse),
        )
        .route(
            "/profiles/:pid/transactions/:tid/refund",
            post(handlers::transaction::refund),
        )
        .route(
            "/profiles/:pid/transactions/:tid/rebill",
            post(handlers::transaction::rebill),
        )
        .route(
            "/profiles/:pid/transactions/:tid/processpares",
            post(handlers::transaction::process_pares),
        )
        .route(
            "/profiles/:pid/transactions/:tid/processcres",
            post(handlers::transaction::process_cres),
        )
        .route(
            "/profiles/:pid/transactions/:tid/completemethodurl",
            post(handlers::transaction::complete_method_url),
        )
        .route(
            "/profiles/:pid/transactions/:tid",
            get(handlers::transaction::get_transaction),
        );

    let admin = Router::new()
        .route("/currencies", post(handlers::currency::create))
        .route("/currencies", get(handlers::currency::list))
        .route("/currencies/:id", get(handlers::currency::get))
        .route("/currencies/:id", patch(handlers::currency::patch))
        .route("/currencies/:id", delete(handlers::currency::delete))
        .route("/profiles", post(handlers::profile::create))
        .route("/profiles", get(handlers::profile::list))
        .route("/profiles/:pid", get(handlers::profile::get))
        .route("/profiles/:pid", patch(handlers::profile::patch))
        .route("/profiles/:pid", delete(handlers::profile::delete))
        .route("/accounts", post(handlers::account::create))
        .route("/accounts", get(handlers::account::list))
        .route("/accounts/:id", get(handlers::account::get))
        .route("/accounts/:id", patch(handlers::account::patch))
        .route("/accounts/:id", delete(handlers::account::delete))
        .route("/routes", post(handlers::route::create))
        .route("/routes", get(handlers::route::list))
        .route("/routes/:id", get(handlers::route::get))
        .route("/routes/:id", patch(handlers::route::patch))
        .route("/routes/:id", delete(handlers::route::delete));

    Router::new()
        .merge(payment)
        .merge(admin)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::new())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}
