use futures::future::try_join_all;
use serde::Serialize;
use stockroom_core::images::{
    delete_best_effort, discard_uploads, group_in_threes, UploadedFile, VariantImages,
};
use stockroom_core::tags::TagKind;
use stockroom_core::types::DbId;
use stockroom_core::variant_form::{id_list_field, parse_variant_fields, FieldBag, VariantEntry};

use super::gate::validate_header;
use super::{Progress, StockSyncEngine, StockSyncError};
use crate::models::audit::Author;
use crate::models::stock::StockHeaderInput;
use crate::models::stock_color::NewStockColor;
use crate::repositories::{JunctionRepo, StockColorRepo, StockRepo};

/// A decoded create form: text fields plus files in submission order.
#[derive(Debug, Clone, Default)]
pub struct CreateStockRequest {
    pub fields: FieldBag,
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateOutcome {
    pub id: DbId,
    pub variant_ids: Vec<DbId>,
    /// Form indices of variants skipped because they are incomplete or their
    /// color does not exist.
    pub skipped: Vec<u32>,
    pub message: String,
}

struct PreparedVariant {
    index: u32,
    entry: VariantEntry,
    images: VariantImages,
}

impl StockSyncEngine<'_> {
    /// Create a stock with its tags and color variants.
    ///
    /// Uploaded files are consumed three per variant in ascending form index
    /// order. If the request is rejected before anything is written, the
    /// uploads are removed.
    pub async fn create(
        &self,
        request: CreateStockRequest,
    ) -> Result<CreateOutcome, StockSyncError> {
        let CreateStockRequest { fields, files } = request;

        let (header, variants) = match self.prepare_create(&fields, &files) {
            Ok(prepared) => prepared,
            Err(e) => {
                discard_uploads(&files).await;
                return Err(e);
            }
        };
        let tags: Vec<(TagKind, Vec<DbId>)> = TagKind::ALL
            .into_iter()
            .map(|kind| (kind, id_list_field(&fields, kind.field_name())))
            .collect();

        let progress = Progress::new("inserted");
        let author = &header.author;

        let stock = StockRepo::create(self.pool, &header)
            .await
            .map_err(|e| progress.fail(e))?;
        progress.record("stock");

        let tag_writes = try_join_all(
            tags.iter()
                .map(|(kind, ids)| self.insert_tags(stock.id, *kind, ids, author, &progress)),
        );
        // Rows are inserted in form index order so variant ids follow it;
        // their links fan out afterwards.
        let variant_writes = async {
            let mut written = Vec::with_capacity(variants.len());
            let mut skipped = Vec::new();
            for variant in variants {
                let index = variant.index;
                match self.insert_variant(stock.id, variant, author, &progress).await? {
                    Some(row) => written.push(row),
                    None => skipped.push(index),
                }
            }
            try_join_all(written.iter().map(|(id, schemes)| {
                self.link_created_variant(stock.id, *id, schemes, author, &progress)
            }))
            .await?;
            let ids: Vec<DbId> = written.into_iter().map(|(id, _)| id).collect();
            Ok::<_, sqlx::Error>((ids, skipped))
        };
        let (_, (variant_ids, skipped)) =
            tokio::try_join!(tag_writes, variant_writes).map_err(|e| progress.fail(e))?;

        tracing::info!(
            stock_id = stock.id,
            variants = variant_ids.len(),
            skipped = skipped.len(),
            "Stock created"
        );

        Ok(CreateOutcome {
            id: stock.id,
            variant_ids,
            skipped,
            message: progress.success_message(),
        })
    }

    fn prepare_create(
        &self,
        fields: &FieldBag,
        files: &[UploadedFile],
    ) -> Result<(StockHeaderInput, Vec<PreparedVariant>), StockSyncError> {
        let header = validate_header(fields)?;
        let entries = parse_variant_fields(fields);
        let images = group_in_threes(self.upload_root, files, entries.len())?;

        let variants = entries
            .into_iter()
            .zip(images)
            .map(|((index, entry), images)| PreparedVariant {
                index,
                entry,
                images,
            })
            .collect();
        Ok((header, variants))
    }

    async fn insert_tags(
        &self,
        stock_id: DbId,
        kind: TagKind,
        ids: &[DbId],
        author: &Author,
        progress: &Progress,
    ) -> Result<(), sqlx::Error> {
        if ids.is_empty() {
            return Ok(());
        }
        JunctionRepo::insert_many(self.pool, self.junctions.tag(kind), stock_id, ids, author)
            .await?;
        progress.record(kind.field_name());
        Ok(())
    }

    /// Insert one variant row. Returns its id and scheme ids, or `None` when
    /// the entry is incomplete or its color does not exist; the files of a
    /// skipped variant are removed.
    async fn insert_variant(
        &self,
        stock_id: DbId,
        variant: PreparedVariant,
        author: &Author,
        progress: &Progress,
    ) -> Result<Option<(DbId, Vec<DbId>)>, sqlx::Error> {
        let PreparedVariant {
            index,
            entry,
            images,
        } = variant;

        let descriptor = match entry.into_descriptor() {
            Ok(descriptor) => descriptor,
            Err(missing) => {
                tracing::warn!(stock_id, index, missing, "Skipping incomplete variant");
                delete_best_effort(self.upload_root, images.refs()).await;
                return Ok(None);
            }
        };

        let Some(name) = StockColorRepo::color_name(self.pool, descriptor.color).await? else {
            tracing::warn!(
                stock_id,
                index,
                color_name_id = descriptor.color,
                "Skipping variant with unknown color"
            );
            delete_best_effort(self.upload_root, images.refs()).await;
            return Ok(None);
        };

        let color = StockColorRepo::create(
            self.pool,
            &NewStockColor {
                stock_id,
                color_name_id: descriptor.color,
                name,
                images,
            },
            author,
        )
        .await?;
        progress.record("stock_color");

        Ok(Some((color.id, descriptor.color_schemes)))
    }

    /// Link an inserted variant to its stock and its color schemes.
    async fn link_created_variant(
        &self,
        stock_id: DbId,
        id: DbId,
        color_schemes: &[DbId],
        author: &Author,
        progress: &Progress,
    ) -> Result<(), sqlx::Error> {
        let variants = &self.junctions.variants;
        JunctionRepo::insert_many(self.pool, variants, stock_id, &[id], author).await?;
        progress.record("stock_stock_color");

        let schemes = &self.junctions.schemes;
        JunctionRepo::insert_many(self.pool, schemes, id, color_schemes, author).await?;
        progress.record("stock_color_color_scheme");
        Ok(())
    }
}
