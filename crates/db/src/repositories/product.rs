use sqlx::Row;

use pourwatch_core::domain::organization::OrganizationId;
use pourwatch_core::domain::product::{Product, ProductId};

use super::{decode_error, parse_decimal, ProductRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let organization_id: String = row.try_get("organization_id").map_err(decode_error)?;
    let name: String = row.try_get("name").map_err(decode_error)?;
    let unit_cost: String = row.try_get("unit_cost").map_err(decode_error)?;

    Ok(Product {
        id: ProductId(id),
        organization_id: OrganizationId(organization_id),
        name,
        unit_cost: parse_decimal("unit_cost", &unit_cost)?,
    })
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn list_for_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, organization_id, name, unit_cost
             FROM product WHERE organization_id = ? ORDER BY id",
        )
        .bind(&organization_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_product).collect()
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO product (id, organization_id, name, unit_cost)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 unit_cost = excluded.unit_cost",
        )
        .bind(&product.id.0)
        .bind(&product.organization_id.0)
        .bind(&product.name)
        .bind(product.unit_cost.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
