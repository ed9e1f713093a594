use chrono::{Duration, TimeZone, Utc};

use pourwatch_core::reconciliation::UsageWindow;
use pourwatch_db::{connect_with_settings, migrations, DemoSeedDataset, Repositories};

type SeedContractTestResult<T = ()> = Result<T, String>;

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        match (&$left, &$right) {
            (left, right) => {
                if left != right {
                    return Err(format!(
                        "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                        left, right
                    ));
                }
            }
        }
    };
}

async fn sql_repositories() -> SeedContractTestResult<Repositories> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|error| format!("connect failed: {error}"))?;
    migrations::run_pending(&pool).await.map_err(|error| format!("migrate failed: {error}"))?;
    Ok(Repositories::sql(pool))
}

#[tokio::test]
async fn demo_seed_loads_into_sqlite_and_is_rerunnable() -> SeedContractTestResult {
    let repos = sql_repositories().await?;
    let now = Utc.with_ymd_and_hms(2026, 3, 8, 18, 0, 0).single().ok_or("bad timestamp")?;

    let first = DemoSeedDataset::load(&repos, now).await.map_err(|error| error.to_string())?;
    let second = DemoSeedDataset::load(&repos, now).await.map_err(|error| error.to_string())?;
    require_eq!(first, second);

    let org = DemoSeedDataset::organization_id();
    let window = UsageWindow::trailing(now, 168);

    let products = repos.products.list_for_organization(&org).await.map_err(|e| e.to_string())?;
    let recipes = repos.recipes.list_for_organization(&org).await.map_err(|e| e.to_string())?;
    let sales = repos.sales.list_in_window(&org, &window).await.map_err(|e| e.to_string())?;
    let counts =
        repos.counts.list_completed_in_window(&org, &window).await.map_err(|e| e.to_string())?;
    let channels = repos.organizations.notification_channels(&org).await.map_err(|e| e.to_string())?;

    require_eq!(products.len(), first.products);
    require_eq!(recipes.len(), first.recipes);
    require_eq!(sales.len(), first.sales);
    require_eq!(counts.len(), 1);
    require_eq!(channels.has_email_recipients(), true);
    require_eq!(repos.organizations.list_ids().await.map_err(|e| e.to_string())?, vec![org]);
    Ok(())
}

#[tokio::test]
async fn demo_lime_has_no_inventory_item() -> SeedContractTestResult {
    let repos = sql_repositories().await?;
    let now = Utc.with_ymd_and_hms(2026, 3, 8, 18, 0, 0).single().ok_or("bad timestamp")?;
    let seeded = DemoSeedDataset::load(&repos, now).await.map_err(|error| error.to_string())?;
    let org = DemoSeedDataset::organization_id();

    let lime = repos
        .inventory
        .find_for_product(&org, &pourwatch_core::ProductId("prod-lime".to_string()))
        .await
        .map_err(|error| error.to_string())?;
    let vodka = repos
        .inventory
        .find_for_product(&org, &pourwatch_core::ProductId("prod-vodka".to_string()))
        .await
        .map_err(|error| error.to_string())?;

    require_eq!(lime, None);
    require_eq!(vodka.map(|item| item.id.0), Some("inv-prod-vodka".to_string()));
    require_eq!(seeded.inventory_items, seeded.products - 1);

    let outside = UsageWindow::new(now - Duration::days(30), now - Duration::days(20));
    let stale = repos.sales.list_in_window(&org, &outside).await.map_err(|e| e.to_string())?;
    require_eq!(stale.len(), 0);
    Ok(())
}
