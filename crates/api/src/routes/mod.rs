pub mod health;
pub mod reference;
pub mod stock;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /stock                       list (GET), create (POST, multipart), update (PUT, multipart)
/// /stock/{id}                  get
///
/// /{entity}                    list, create, update   entity: series, supplier, material,
/// /{entity}/{id}               get                    design, environment, color-name,
///                                                     color-scheme
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/stock", stock::router())
        .merge(reference::router())
}
