use sqlx::Row;

use pourwatch_core::domain::organization::OrganizationId;
use pourwatch_core::domain::recipe::{RecipeDefinition, RecipeId, RecipeIngredient};

use super::{decode_error, RecipeRepository, RepositoryError};
use crate::DbPool;

pub struct SqlRecipeRepository {
    pool: DbPool,
}

impl SqlRecipeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_recipe(row: &sqlx::sqlite::SqliteRow) -> Result<RecipeDefinition, RepositoryError> {
    let ingredients: String = row.try_get("ingredients").map_err(decode_error)?;

    Ok(RecipeDefinition {
        recipe_id: RecipeId(row.try_get("id").map_err(decode_error)?),
        organization_id: OrganizationId(row.try_get("organization_id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        ingredients: serde_json::from_str::<Vec<RecipeIngredient>>(&ingredients)
            .map_err(decode_error)?,
    })
}

#[async_trait::async_trait]
impl RecipeRepository for SqlRecipeRepository {
    async fn list_for_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<RecipeDefinition>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, organization_id, name, ingredients
             FROM recipe WHERE organization_id = ? ORDER BY id",
        )
        .bind(&organization_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_recipe).collect()
    }

    async fn save(&self, recipe: RecipeDefinition) -> Result<(), RepositoryError> {
        let ingredients = serde_json::to_string(&recipe.ingredients).map_err(decode_error)?;

        sqlx::query(
            "INSERT INTO recipe (id, organization_id, name, ingredients)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 ingredients = excluded.ingredients",
        )
        .bind(&recipe.recipe_id.0)
        .bind(&recipe.organization_id.0)
        .bind(&recipe.name)
        .bind(ingredients)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
