use sqlx::Row;

use pourwatch_core::domain::inventory::{InventoryItem, InventoryItemId};
use pourwatch_core::domain::organization::OrganizationId;
use pourwatch_core::domain::product::ProductId;

use super::{decode_error, InventoryItemRepository, RepositoryError};
use crate::DbPool;

pub struct SqlInventoryItemRepository {
    pool: DbPool,
}

impl SqlInventoryItemRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<InventoryItem, RepositoryError> {
    Ok(InventoryItem {
        id: InventoryItemId(row.try_get("id").map_err(decode_error)?),
        organization_id: OrganizationId(row.try_get("organization_id").map_err(decode_error)?),
        product_id: ProductId(row.try_get("product_id").map_err(decode_error)?),
        location_id: row.try_get("location_id").map_err(decode_error)?,
        quantity_on_hand: row.try_get("quantity_on_hand").map_err(decode_error)?,
    })
}

#[async_trait::async_trait]
impl InventoryItemRepository for SqlInventoryItemRepository {
    async fn find_for_product(
        &self,
        organization_id: &OrganizationId,
        product_id: &ProductId,
    ) -> Result<Option<InventoryItem>, RepositoryError> {
        // Several locations may stock the product; the lowest id is the stable pick.
        let row = sqlx::query(
            "SELECT id, organization_id, product_id, location_id, quantity_on_hand
             FROM inventory_item
             WHERE organization_id = ? AND product_id = ?
             ORDER BY id
             LIMIT 1",
        )
        .bind(&organization_id.0)
        .bind(&product_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_item).transpose()
    }

    async fn save(&self, item: InventoryItem) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO inventory_item (id, organization_id, product_id, location_id, quantity_on_hand)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 location_id = excluded.location_id,
                 quantity_on_hand = excluded.quantity_on_hand",
        )
        .bind(&item.id.0)
        .bind(&item.organization_id.0)
        .bind(&item.product_id.0)
        .bind(&item.location_id)
        .bind(item.quantity_on_hand)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
