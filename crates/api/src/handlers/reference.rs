//! Handlers for the simple reference resources (`/series`, `/material`,
//! `/color-name`, ...). One set of handlers serves every
//! [`ReferenceEntity`]; the entity comes from the path.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use stockroom_core::error::CoreError;
use stockroom_core::pagination::{page_window, PageQuery, PageWindow};
use stockroom_core::types::DbId;
use stockroom_db::models::reference::{
    CreateReference, ReferenceEntity, ReferenceRow, UpdateReference,
};
use stockroom_db::repositories::ReferenceRepo;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// One page of reference rows.
#[derive(Debug, Serialize)]
pub struct ReferencePage {
    #[serde(flatten)]
    pub window: PageWindow,
    pub list: Vec<ReferenceRow>,
}

fn not_found(entity: ReferenceEntity, id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: entity.entity(),
        id,
    })
}

/// POST /api/v1/{entity}
pub async fn create(
    State(state): State<AppState>,
    Path(entity): Path<ReferenceEntity>,
    Json(input): Json<CreateReference>,
) -> AppResult<(StatusCode, Json<DataResponse<ReferenceRow>>)> {
    input
        .validate()
        .map_err(|e| CoreError::Validation(e.to_string()))?;
    if entity.requires_code() && input.code.is_none() {
        return Err(CoreError::Validation(format!("{} requires a code", entity.entity())).into());
    }

    let row = ReferenceRepo::create(&state.pool, entity, &input).await?;
    tracing::info!(entity = entity.table(), id = row.id, "Reference created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: row })))
}

/// GET /api/v1/{entity}?page=&pageSize=
pub async fn list(
    State(state): State<AppState>,
    Path(entity): Path<ReferenceEntity>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<DataResponse<ReferencePage>>> {
    let total = ReferenceRepo::count(&state.pool, entity).await?;
    let window = page_window(total, &query, state.config.default_page_size);
    let list = if total == 0 {
        Vec::new()
    } else {
        ReferenceRepo::list_page(&state.pool, entity, window.limit(), window.offset()).await?
    };
    Ok(Json(DataResponse {
        data: ReferencePage { window, list },
    }))
}

/// GET /api/v1/{entity}/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path((entity, id)): Path<(ReferenceEntity, DbId)>,
) -> AppResult<Json<DataResponse<ReferenceRow>>> {
    let row = ReferenceRepo::find_by_id(&state.pool, entity, id)
        .await?
        .ok_or_else(|| not_found(entity, id))?;
    Ok(Json(DataResponse { data: row }))
}

/// PUT /api/v1/{entity}
///
/// The row id travels in the body and may be a number or a numeric string.
pub async fn update(
    State(state): State<AppState>,
    Path(entity): Path<ReferenceEntity>,
    Json(input): Json<UpdateReference>,
) -> AppResult<Json<DataResponse<ReferenceRow>>> {
    let id = input
        .id
        .parse()
        .ok_or_else(|| AppError::BadRequest(format!("Invalid id: {}", input.id)))?;
    input
        .validate()
        .map_err(|e| CoreError::Validation(e.to_string()))?;

    let row = ReferenceRepo::update(&state.pool, entity, id, &input)
        .await?
        .ok_or_else(|| not_found(entity, id))?;
    Ok(Json(DataResponse { data: row }))
}
