use sqlx::Row;

use pourwatch_core::domain::organization::OrganizationId;
use pourwatch_core::domain::sales::{SaleEvent, SaleItem};
use pourwatch_core::reconciliation::UsageWindow;

use super::{decode_error, parse_timestamp, timestamp_text, RepositoryError, SaleEventRepository};
use crate::DbPool;

pub struct SqlSaleEventRepository {
    pool: DbPool,
}

impl SqlSaleEventRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_sale(row: &sqlx::sqlite::SqliteRow) -> Result<SaleEvent, RepositoryError> {
    let occurred_at: String = row.try_get("occurred_at").map_err(decode_error)?;
    let items: String = row.try_get("items").map_err(decode_error)?;

    Ok(SaleEvent {
        sale_id: row.try_get("id").map_err(decode_error)?,
        organization_id: OrganizationId(row.try_get("organization_id").map_err(decode_error)?),
        timestamp: parse_timestamp("occurred_at", &occurred_at)?,
        items: serde_json::from_str::<Vec<SaleItem>>(&items).map_err(decode_error)?,
    })
}

#[async_trait::async_trait]
impl SaleEventRepository for SqlSaleEventRepository {
    async fn list_in_window(
        &self,
        organization_id: &OrganizationId,
        window: &UsageWindow,
    ) -> Result<Vec<SaleEvent>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, organization_id, occurred_at, items
             FROM sale_event
             WHERE organization_id = ? AND occurred_at >= ? AND occurred_at < ?
             ORDER BY occurred_at, id",
        )
        .bind(&organization_id.0)
        .bind(timestamp_text(window.start))
        .bind(timestamp_text(window.end))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_sale).collect()
    }

    async fn save(&self, sale: SaleEvent) -> Result<(), RepositoryError> {
        let items = serde_json::to_string(&sale.items).map_err(decode_error)?;

        // Sales are immutable once recorded; replays of the same id are ignored.
        sqlx::query(
            "INSERT INTO sale_event (id, organization_id, occurred_at, items)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&sale.sale_id)
        .bind(&sale.organization_id.0)
        .bind(timestamp_text(sale.timestamp))
        .bind(items)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
