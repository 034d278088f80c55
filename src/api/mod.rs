// CRUD Gateway - REST API with Axum
//
// Routes (all under /api):
//   GET    /health
//   POST   /auth/login
//   GET|POST|DELETE /years
//   GET|POST|DELETE /income
//   GET|POST|DELETE /expenses
//   GET    /summary

pub mod auth;
pub mod envelope;
pub mod handlers;

pub use auth::{AuthSettings, Claims, SessionUser};
pub use envelope::{ApiError, ApiResponse};

use crate::db::Store;
use crate::schema::SchemaValidator;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone, Debug)]
pub struct AppState {
    pub store: Store,
    pub validator: SchemaValidator,
    pub auth: AuthSettings,
}

impl AppState {
    pub fn new(store: Store, auth: AuthSettings) -> Self {
        AppState {
            store,
            validator: SchemaValidator::new(),
            auth,
        }
    }
}

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    let records = Router::new()
        .route(
            "/years",
            get(handlers::list_years)
                .post(handlers::create_year)
                .delete(handlers::delete_year),
        )
        .route(
            "/income",
            get(handlers::list_income)
                .post(handlers::create_income)
                .delete(handlers::delete_income),
        )
        .route(
            "/expenses",
            get(handlers::list_expenses)
                .post(handlers::create_expense)
                .delete(handlers::delete_expense),
        )
        .route("/summary", get(handlers::get_summary))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/auth/login", post(auth::login))
        .merge(records)
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
}
