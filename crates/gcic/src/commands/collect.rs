//! Run one synchronous collection cycle of all tiers

use gcic_collect::collectors::{registry, run_tier, CollectorContext, Tier};
use gcic_collect::CollectorOutcome;
use gcic_core::constants;
use gcic_core::Result;
use gcic_db::Database;
use std::sync::Arc;

use crate::output::{print_db_stats, print_success};

pub async fn execute() -> Result<()> {
    let db = Database::open(&constants::db_path()).await?;
    let ctx = Arc::new(CollectorContext::new(db.clone()));
    let all = registry();

    println!("Running single collection cycle...");
    for tier in Tier::ALL {
        let collectors: Vec<_> = all.iter().filter(|c| c.tier() == tier).cloned().collect();
        let results = run_tier(&ctx, &collectors).await;
        for (name, outcome) in results {
            let marker = match outcome {
                CollectorOutcome::Ok => "✓",
                CollectorOutcome::Degraded => "-",
                CollectorOutcome::Failed => "✗",
            };
            println!("  [{}] {} {}", tier.as_str(), marker, name);
        }
    }

    print_success("Collection complete");
    println!();
    print_db_stats(&db).await?;
    db.close().await;
    Ok(())
}
