//! Route definitions for the reference resources.

use axum::routing::get;
use axum::Router;

use crate::handlers::reference;
use crate::state::AppState;

/// Routes for every reference entity, keyed by its kebab-case name.
///
/// ```text
/// GET    /{entity}        -> list
/// POST   /{entity}        -> create
/// PUT    /{entity}        -> update
/// GET    /{entity}/{id}   -> get_by_id
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{entity}",
            get(reference::list)
                .post(reference::create)
                .put(reference::update),
        )
        .route("/{entity}/{id}", get(reference::get_by_id))
}
