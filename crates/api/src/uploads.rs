//! Multipart decoding for the stock forms.
//!
//! Text fields collect into a [`FieldBag`]; file fields are streamed to
//! `<upload_dir>/stock/<uuid>.<ext>` as they arrive. If decoding fails
//! part-way, the files already written are removed before the error is
//! returned.

use std::path::Path;

use axum::extract::multipart::Field;
use axum::extract::Multipart;
use stockroom_core::images::{discard_uploads, UploadedFile};
use stockroom_core::variant_form::FieldBag;
use tokio::io::AsyncWriteExt;

use crate::error::AppError;

/// Accepted image extensions, lowercase.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

/// Subdirectory of the upload root holding stock images.
const STOCK_DIR: &str = "stock";

/// A decoded multipart form, files in submission order.
#[derive(Debug, Default)]
pub struct DecodedForm {
    pub fields: FieldBag,
    pub files: Vec<UploadedFile>,
}

/// Lowercased extension of `file_name` when it is an accepted image type.
pub fn image_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Read every field of `multipart`, storing files under `upload_dir`.
pub async fn decode_multipart(
    mut multipart: Multipart,
    upload_dir: &Path,
) -> Result<DecodedForm, AppError> {
    let mut form = DecodedForm::default();
    match read_fields(&mut multipart, upload_dir, &mut form).await {
        Ok(()) => Ok(form),
        Err(e) => {
            discard_uploads(&form.files).await;
            Err(e)
        }
    }
}

async fn read_fields(
    multipart: &mut Multipart,
    upload_dir: &Path,
    form: &mut DecodedForm,
) -> Result<(), AppError> {
    let dir = upload_dir.join(STOCK_DIR);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::InternalError(format!("create upload dir: {e}")))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match field.file_name().map(str::to_string) {
            // Browsers submit untouched file inputs with an empty name.
            Some(original_name) if original_name.is_empty() => continue,
            Some(original_name) => {
                let ext = image_extension(&original_name).ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "Unsupported image '{original_name}'. Supported: {}",
                        IMAGE_EXTENSIONS.join(", ")
                    ))
                })?;
                let stored_path = dir.join(format!("{}.{ext}", uuid::Uuid::new_v4()));
                // Record the file before writing so a failed write is cleaned up too.
                form.files.push(UploadedFile {
                    field_name: name,
                    original_name,
                    stored_path: stored_path.clone(),
                });
                write_field(field, &stored_path).await?;
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.fields.entry(name).or_default().push(text);
            }
        }
    }

    tracing::debug!(
        fields = form.fields.len(),
        files = form.files.len(),
        "Multipart form decoded"
    );
    Ok(())
}

async fn write_field(mut field: Field<'_>, path: &Path) -> Result<(), AppError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| AppError::InternalError(format!("create {}: {e}", path.display())))?;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| AppError::InternalError(format!("write {}: {e}", path.display())))?;
    }
    file.flush()
        .await
        .map_err(|e| AppError::InternalError(format!("flush {}: {e}", path.display())))?;
    Ok(())
}
