//! Handlers for the `/stock` resource.
//!
//! Create and update take multipart forms; the heavy lifting happens in
//! [`stockroom_db::stock_sync`].

use std::collections::HashMap;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use stockroom_core::error::CoreError;
use stockroom_core::images::{discard_uploads, parse_update_field};
use stockroom_core::pagination::PageQuery;
use stockroom_core::types::DbId;
use stockroom_db::models::stock::StockDetail;
use stockroom_db::stock_sync::{
    CreateOutcome, CreateStockRequest, StockPage, UpdateOutcome, UpdateStockRequest,
};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;
use crate::uploads::decode_multipart;

/// POST /api/v1/stock
///
/// Header fields, `color_<n>`/`colorScheme_<n>` variant fields, tag id
/// lists, and three image files per variant in variant order.
pub async fn create(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<CreateOutcome>>)> {
    let form = decode_multipart(multipart, &state.config.upload_dir).await?;
    let outcome = state
        .stock_engine()
        .create(CreateStockRequest {
            fields: form.fields,
            files: form.files,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: outcome })))
}

/// GET /api/v1/stock?page=&pageSize=
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<DataResponse<StockPage>>> {
    let page = state
        .stock_engine()
        .list(&query, state.config.default_page_size)
        .await?;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/stock/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<StockDetail>>> {
    let detail = state
        .stock_engine()
        .get(id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Stock",
            id,
        }))?;
    Ok(Json(DataResponse { data: detail }))
}

/// PUT /api/v1/stock
///
/// The full desired state: header fields with `id`, the `variants` JSON
/// field, tag id lists, and image files named `<slot>_<variantId>`.
pub async fn update(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<UpdateOutcome>>> {
    let form = decode_multipart(multipart, &state.config.upload_dir).await?;

    // Every file must be keyed `<slot>_<variantId>`, once.
    let mut files = HashMap::with_capacity(form.files.len());
    let mut rejected = Vec::new();
    let mut problem = None;
    for file in form.files {
        let issue = if parse_update_field(&file.field_name).is_none() {
            Some(format!("Unknown file field {}", file.field_name))
        } else if files.contains_key(&file.field_name) {
            Some(format!("File field {} is submitted more than once", file.field_name))
        } else {
            None
        };
        match issue {
            Some(message) => {
                problem.get_or_insert(message);
                rejected.push(file);
            }
            None => {
                files.insert(file.field_name.clone(), file);
            }
        }
    }
    if let Some(message) = problem {
        discard_uploads(files.values().chain(&rejected)).await;
        return Err(AppError::BadRequest(message));
    }

    let outcome = state
        .stock_engine()
        .update(UpdateStockRequest {
            fields: form.fields,
            files,
        })
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}
