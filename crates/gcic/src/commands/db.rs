//! Database inspection and maintenance

use gcic_core::constants;
use gcic_core::Result;
use gcic_db::Database;

use crate::cli::DbAction;
use crate::output::{print_db_stats, print_success};

pub async fn execute(action: Option<DbAction>) -> Result<()> {
    match action.unwrap_or(DbAction::Stats) {
        DbAction::Path => {
            println!("{}", constants::db_path().display());
            Ok(())
        }
        DbAction::Prune => {
            let db = Database::open_existing(&constants::db_path()).await?;
            let removed = db.prune(constants::now_epoch()).await?;
            print_success(&format!("Database pruned ({} rows removed)", removed));
            print_db_stats(&db).await?;
            db.close().await;
            Ok(())
        }
        DbAction::Stats => {
            let db = Database::open_existing(&constants::db_path()).await?;
            print_db_stats(&db).await?;
            db.close().await;
            Ok(())
        }
    }
}
