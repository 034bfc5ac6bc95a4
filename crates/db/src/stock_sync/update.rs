use std::collections::{HashMap, HashSet};

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use stockroom_core::images::{
    delete_best_effort, discard_uploads, servable_path, update_field_name, ImageRef, ImageSlot,
    UploadedFile, VariantImages,
};
use stockroom_core::tags::TagKind;
use stockroom_core::types::DbId;
use stockroom_core::variant_form::{clean_ids, first_value, id_list_field, FieldBag};

use super::gate::validate_header;
use super::{Progress, StockSyncEngine, StockSyncError};
use crate::models::audit::Author;
use crate::models::stock::StockHeaderInput;
use crate::models::stock_color::{NewStockColor, StockColor, StockColorUpdate};
use crate::repositories::{JunctionRepo, StockColorRepo, StockRepo};

/// A decoded update form: text fields plus files keyed by field name
/// (`<slot>_<variantId>`, see [`update_field_name`]).
#[derive(Debug, Clone, Default)]
pub struct UpdateStockRequest {
    pub fields: FieldBag,
    pub files: HashMap<String, UploadedFile>,
}

/// One entry of the JSON `variants` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSubmission {
    /// Id of an existing variant, or a negative placeholder for a new one.
    pub id: DbId,
    /// `ColorName` id.
    pub color: DbId,
    #[serde(default)]
    pub color_scheme: Vec<DbId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutcome {
    pub id: DbId,
    /// Variant ids kept (or created) by this update.
    pub preserved: Vec<DbId>,
    /// Variant ids deleted because they were left out.
    pub removed: Vec<DbId>,
    pub message: String,
}

/// The shape-checked form, before anything is read from storage.
#[derive(Debug)]
struct Submission {
    stock_id: DbId,
    header: StockHeaderInput,
    variants: Vec<VariantSubmission>,
    tags: Vec<(TagKind, Vec<DbId>)>,
}

enum VariantWrite {
    Insert(VariantImages),
    Update {
        existing: StockColor,
        replacements: HashMap<ImageSlot, ImageRef>,
    },
}

struct PlannedVariant {
    color_name_id: DbId,
    color_name: String,
    color_schemes: Vec<DbId>,
    write: VariantWrite,
}

fn parse_submission(fields: &FieldBag) -> Result<Submission, StockSyncError> {
    let raw_id = first_value(fields, "id").unwrap_or_default();
    let stock_id = raw_id
        .parse::<DbId>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| StockSyncError::InvalidIdentifier(raw_id.to_string()))?;

    let header = validate_header(fields)?;

    let raw_variants = first_value(fields, "variants")
        .ok_or_else(|| StockSyncError::InvalidShape("variants is required".into()))?;
    let variants: Vec<VariantSubmission> = serde_json::from_str(raw_variants)
        .map_err(|e| StockSyncError::InvalidShape(format!("variants: {e}")))?;

    let mut seen = HashSet::new();
    for variant in &variants {
        if variant.id == 0 {
            return Err(StockSyncError::InvalidShape(
                "variant id 0 is neither existing nor new".into(),
            ));
        }
        if !seen.insert(variant.id) {
            return Err(StockSyncError::InvalidShape(format!(
                "variant {} is listed more than once",
                variant.id
            )));
        }
    }

    let tags = TagKind::ALL
        .into_iter()
        .map(|kind| (kind, id_list_field(fields, kind.field_name())))
        .collect();

    Ok(Submission {
        stock_id,
        header,
        variants,
        tags,
    })
}

impl StockSyncEngine<'_> {
    /// Reconcile a stock with the submitted state.
    ///
    /// Submitted variants and tags are upserted; variants, scheme links and
    /// tags left out are deleted, and the image files of deleted variants
    /// are removed best-effort. Every shape and reference check runs before
    /// the first write. Concurrent updates of the same stock are serialized.
    pub async fn update(
        &self,
        request: UpdateStockRequest,
    ) -> Result<UpdateOutcome, StockSyncError> {
        let UpdateStockRequest { fields, mut files } = request;
        let progress = Progress::new("updated");

        let submission = match parse_submission(&fields) {
            Ok(submission) => submission,
            Err(e) => {
                discard_uploads(files.values()).await;
                return Err(e);
            }
        };
        let stock_id = submission.stock_id;

        let guard = self.locks.lock(stock_id).await;

        let plan = self.plan_variants(&submission, &files, &progress).await;
        let planned = match plan {
            Ok((planned, consumed)) => {
                files.retain(|name, _| !consumed.contains(name));
                planned
            }
            Err(e) => {
                drop(guard);
                discard_uploads(files.values()).await;
                return Err(e);
            }
        };
        if !files.is_empty() {
            tracing::warn!(
                stock_id,
                unused = files.len(),
                "Discarding uploads that match no submitted variant"
            );
            discard_uploads(files.values()).await;
        }

        let result = self.apply_update(&submission, planned, &progress).await;
        drop(guard);
        result
    }

    /// Check every submitted variant against storage and assign its uploads.
    /// Returns the plan and the upload field names it consumed.
    async fn plan_variants(
        &self,
        submission: &Submission,
        files: &HashMap<String, UploadedFile>,
        progress: &Progress,
    ) -> Result<(Vec<PlannedVariant>, HashSet<String>), StockSyncError> {
        let stock_id = submission.stock_id;
        let storage = |e: sqlx::Error| progress.fail(e);

        StockRepo::find_by_id(self.pool, stock_id)
            .await
            .map_err(storage)?
            .ok_or(StockSyncError::StockNotFound(stock_id))?;

        let mut existing: HashMap<DbId, StockColor> =
            StockColorRepo::list_by_stock(self.pool, stock_id)
                .await
                .map_err(storage)?
                .into_iter()
                .map(|color| (color.id, color))
                .collect();

        let mut color_names: HashMap<DbId, String> = HashMap::new();
        let mut consumed = HashSet::new();
        let mut planned = Vec::with_capacity(submission.variants.len());

        for variant in &submission.variants {
            let mut images = HashMap::new();
            for slot in ImageSlot::ALL {
                let name = update_field_name(variant.id, slot);
                if let Some(file) = files.get(&name) {
                    let image = ImageRef {
                        path: servable_path(self.upload_root, &file.stored_path)?,
                        original_name: file.original_name.clone(),
                    };
                    images.insert(slot, image);
                    consumed.insert(name);
                }
            }

            let write = if variant.id < 0 {
                let mut take = |slot: ImageSlot| {
                    images.remove(&slot).ok_or(StockSyncError::MissingImage {
                        variant_id: variant.id,
                        slot,
                    })
                };
                VariantWrite::Insert(VariantImages {
                    stock: take(ImageSlot::Stock)?,
                    color: take(ImageSlot::Color)?,
                    removal: take(ImageSlot::Removal)?,
                })
            } else {
                let existing = existing.remove(&variant.id).ok_or_else(|| {
                    StockSyncError::InvalidShape(format!(
                        "variant {} does not belong to stock {stock_id}",
                        variant.id
                    ))
                })?;
                VariantWrite::Update {
                    existing,
                    replacements: images,
                }
            };

            let color_name = match color_names.get(&variant.color) {
                Some(name) => name.clone(),
                None => {
                    let name = StockColorRepo::color_name(self.pool, variant.color)
                        .await
                        .map_err(storage)?
                        .ok_or(StockSyncError::InvalidColorReference {
                            color_name_id: variant.color,
                        })?;
                    color_names.insert(variant.color, name.clone());
                    name
                }
            };

            planned.push(PlannedVariant {
                color_name_id: variant.color,
                color_name,
                color_schemes: clean_ids(variant.color_scheme.iter().copied()),
                write,
            });
        }

        Ok((planned, consumed))
    }

    async fn apply_update(
        &self,
        submission: &Submission,
        planned: Vec<PlannedVariant>,
        progress: &Progress,
    ) -> Result<UpdateOutcome, StockSyncError> {
        let stock_id = submission.stock_id;
        let author = &submission.header.author;

        // Rows are written in submission order so new variants get ascending
        // ids; their links fan out afterwards.
        let variant_writes = async {
            let mut written = Vec::with_capacity(planned.len());
            for variant in planned {
                written.push(self.write_variant(stock_id, variant, author, progress).await?);
            }
            try_join_all(written.iter().map(|(id, schemes)| {
                self.link_updated_variant(stock_id, *id, schemes, author, progress)
            }))
            .await?;
            Ok::<_, sqlx::Error>(written.into_iter().map(|(id, _)| id).collect::<Vec<_>>())
        };
        let tag_writes = try_join_all(
            submission
                .tags
                .iter()
                .map(|(kind, ids)| self.reconcile_tags(stock_id, *kind, ids, author, progress)),
        );
        let (preserved, _) =
            tokio::try_join!(variant_writes, tag_writes).map_err(|e| progress.fail(e))?;

        StockRepo::update_header(self.pool, stock_id, &submission.header)
            .await
            .and_then(|row| row.ok_or(sqlx::Error::RowNotFound))
            .map_err(|e| progress.fail(e))?;
        progress.record("stock");

        let orphans = StockColorRepo::list_orphans(self.pool, stock_id, &preserved)
            .await
            .map_err(|e| progress.fail(e))?;
        let removed = self
            .remove_orphans(stock_id, orphans, progress)
            .await
            .map_err(|e| progress.fail(e))?;

        tracing::info!(
            stock_id,
            preserved = preserved.len(),
            removed = removed.len(),
            "Stock reconciled"
        );

        Ok(UpdateOutcome {
            id: stock_id,
            preserved,
            removed,
            message: progress.success_message(),
        })
    }

    /// Insert or update one variant row. Returns its id and scheme ids.
    async fn write_variant(
        &self,
        stock_id: DbId,
        variant: PlannedVariant,
        author: &Author,
        progress: &Progress,
    ) -> Result<(DbId, Vec<DbId>), sqlx::Error> {
        let PlannedVariant {
            color_name_id,
            color_name,
            color_schemes,
            write,
        } = variant;

        let id = match write {
            VariantWrite::Insert(images) => {
                let input = NewStockColor {
                    stock_id,
                    color_name_id,
                    name: color_name,
                    images,
                };
                StockColorRepo::create(self.pool, &input, author).await?.id
            }
            VariantWrite::Update {
                existing,
                replacements,
            } => {
                let input = StockColorUpdate {
                    color_name_id,
                    name: color_name,
                    images: replacements,
                };
                let row = StockColorRepo::update(self.pool, existing.id, stock_id, &input, author)
                    .await?
                    .ok_or(sqlx::Error::RowNotFound)?;

                let old = existing.images();
                let replaced: Vec<&ImageRef> = input
                    .images
                    .iter()
                    .map(|(slot, new)| (old.get(*slot), new))
                    .filter(|(old, new)| old.path != new.path)
                    .map(|(old, _)| old)
                    .collect();
                if !replaced.is_empty() {
                    delete_best_effort(self.upload_root, replaced).await;
                }
                row.id
            }
        };
        progress.record("stock_color");
        Ok((id, color_schemes))
    }

    /// Link a written variant to its stock and reconcile its schemes.
    async fn link_updated_variant(
        &self,
        stock_id: DbId,
        id: DbId,
        color_schemes: &[DbId],
        author: &Author,
        progress: &Progress,
    ) -> Result<(), sqlx::Error> {
        JunctionRepo::upsert_many(self.pool, &self.junctions.variants, stock_id, &[id], author)
            .await?;
        progress.record("stock_stock_color");

        let schemes = &self.junctions.schemes;
        JunctionRepo::upsert_many(self.pool, schemes, id, color_schemes, author).await?;
        JunctionRepo::delete_unlisted(self.pool, schemes, id, color_schemes).await?;
        progress.record("stock_color_color_scheme");
        Ok(())
    }

    /// Upsert the submitted tags of one kind and drop the others.
    async fn reconcile_tags(
        &self,
        stock_id: DbId,
        kind: TagKind,
        ids: &[DbId],
        author: &Author,
        progress: &Progress,
    ) -> Result<(), sqlx::Error> {
        let junction = self.junctions.tag(kind);
        JunctionRepo::upsert_many(self.pool, junction, stock_id, ids, author).await?;
        let removed = JunctionRepo::delete_unlisted(self.pool, junction, stock_id, ids).await?;

        tracing::debug!(
            stock_id,
            tag = kind.field_name(),
            kept = ids.len(),
            removed,
            "Tags reconciled"
        );
        progress.record(kind.field_name());
        Ok(())
    }

    /// Delete left-out variants with their links; their files are removed
    /// concurrently and best-effort. Returns the deleted ids.
    async fn remove_orphans(
        &self,
        stock_id: DbId,
        orphans: Vec<StockColor>,
        progress: &Progress,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        if orphans.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<DbId> = orphans.iter().map(|color| color.id).collect();
        let images: Vec<ImageRef> = orphans
            .iter()
            .flat_map(|color| color.images().into_refs())
            .collect();

        let rows = async {
            JunctionRepo::delete_by_targets(self.pool, &self.junctions.variants, &ids).await?;
            JunctionRepo::delete_by_owners(self.pool, &self.junctions.schemes, &ids).await?;
            StockColorRepo::delete_many(self.pool, &ids).await
        };
        let (files_removed, rows) =
            tokio::join!(delete_best_effort(self.upload_root, &images), rows);
        let rows_removed = rows?;
        progress.record("cleanup");

        tracing::info!(stock_id, rows_removed, files_removed, "Removed orphaned variants");
        Ok(ids)
    }
}
