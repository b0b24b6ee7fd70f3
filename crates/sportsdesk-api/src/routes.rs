use crate::{auth, handlers, AppState};
use axum::{middleware, routing::get, Router};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

pub fn create_router(state: AppState) -> Router {
    // Every data route sits behind bearer verification.
    let api = Router::new()
        .route("/api/f1", get(handlers::get_races))
        .route("/api/f1/{country}", get(handlers::get_country_races))
        .route("/api/football", get(handlers::get_games))
        .route("/api/football/{team}", get(handlers::get_team_games))
        .route("/api/epic_games", get(handlers::get_epic_games))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .route("/", get(handlers::landing_page))
        .route("/health", get(handlers::health))
        .merge(api)
        .fallback(handlers::not_found)
        .layer(RequestBodyLimitLayer::new(state.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
