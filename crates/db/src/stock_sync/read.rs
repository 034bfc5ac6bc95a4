use std::collections::HashSet;

use futures::future::try_join_all;
use serde::Serialize;
use stockroom_core::pagination::{page_window, PageQuery, PageWindow};
use stockroom_core::tags::TagKind;
use stockroom_core::types::DbId;

use super::StockSyncEngine;
use crate::models::reference::{ReferenceEntity, ReferenceRow};
use crate::models::stock::{Stock, StockDetail};
use crate::models::stock_color::{StockColor, StockColorWithSchemes};
use crate::repositories::{JunctionRepo, ReferenceRepo, StockColorRepo, StockRepo};

/// One page of fully resolved stocks.
#[derive(Debug, Clone, Serialize)]
pub struct StockPage {
    #[serde(flatten)]
    pub window: PageWindow,
    pub list: Vec<StockDetail>,
}

impl StockSyncEngine<'_> {
    /// Page through stocks, resolving every relation of each one.
    pub async fn list(
        &self,
        query: &PageQuery,
        default_size: i64,
    ) -> Result<StockPage, sqlx::Error> {
        let total = StockRepo::count(self.pool).await?;
        let window = page_window(total, query, default_size);

        if total == 0 {
            return Ok(StockPage {
                window,
                list: Vec::new(),
            });
        }

        let stocks = StockRepo::list_page(self.pool, window.limit(), window.offset()).await?;
        let list = try_join_all(stocks.into_iter().map(|stock| self.detail(stock))).await?;

        tracing::debug!(page = window.start, rows = list.len(), total, "Stock page read");
        Ok(StockPage { window, list })
    }

    /// Resolve one stock by id, or `None` when it does not exist.
    pub async fn get(&self, stock_id: DbId) -> Result<Option<StockDetail>, sqlx::Error> {
        match StockRepo::find_by_id(self.pool, stock_id).await? {
            Some(stock) => Ok(Some(self.detail(stock).await?)),
            None => Ok(None),
        }
    }

    async fn detail(&self, stock: Stock) -> Result<StockDetail, sqlx::Error> {
        let series = ReferenceRepo::find_by_id(self.pool, ReferenceEntity::Series, stock.series_id);
        let supplier = async {
            match stock.supplier_id {
                Some(id) => {
                    ReferenceRepo::find_by_id(self.pool, ReferenceEntity::Supplier, id).await
                }
                None => Ok(None),
            }
        };

        let (series, supplier, material, design, environment, colors) = tokio::try_join!(
            series,
            supplier,
            self.tags(stock.id, TagKind::Material),
            self.tags(stock.id, TagKind::Design),
            self.tags(stock.id, TagKind::Environment),
            self.colors(stock.id),
        )?;

        let mut seen = HashSet::new();
        let color_schemes = colors
            .iter()
            .flat_map(|color| color.color_schemes.iter())
            .filter(|scheme| seen.insert(scheme.id))
            .cloned()
            .collect();

        Ok(StockDetail {
            stock,
            series,
            supplier,
            material,
            design,
            environment,
            colors,
            color_schemes,
        })
    }

    /// Linked ids first, then the rows they point at.
    async fn tags(&self, stock_id: DbId, kind: TagKind) -> Result<Vec<ReferenceRow>, sqlx::Error> {
        let ids = JunctionRepo::targets(self.pool, self.junctions.tag(kind), stock_id).await?;
        ReferenceRepo::find_by_ids(self.pool, kind.into(), &ids).await
    }

    async fn colors(&self, stock_id: DbId) -> Result<Vec<StockColorWithSchemes>, sqlx::Error> {
        let colors = StockColorRepo::list_by_stock(self.pool, stock_id).await?;
        try_join_all(colors.into_iter().map(|color| self.with_schemes(color))).await
    }

    async fn with_schemes(&self, color: StockColor) -> Result<StockColorWithSchemes, sqlx::Error> {
        let ids = JunctionRepo::targets(self.pool, &self.junctions.schemes, color.id).await?;
        let color_schemes =
            ReferenceRepo::find_by_ids(self.pool, ReferenceEntity::ColorScheme, &ids).await?;
        Ok(StockColorWithSchemes {
            color,
            color_schemes,
        })
    }
}
