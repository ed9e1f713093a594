use chrono::Utc;
use pourwatch_db::{DemoSeedDataset, Repositories, SeedResult};

use crate::commands::{open_database, prepare, CommandResult};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let repositories = Repositories::sql(pool.clone());
        let seeded = DemoSeedDataset::load(&repositories, Utc::now())
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 6u8));
        pool.close().await;
        seeded
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", describe(&seeded)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn describe(seeded: &SeedResult) -> String {
    format!(
        "demo dataset loaded for organization `{}`: {} products, {} inventory items, {} recipes, {} sales, {} counts",
        seeded.organization_id,
        seeded.products,
        seeded.inventory_items,
        seeded.recipes,
        seeded.sales,
        seeded.counts
    )
}
