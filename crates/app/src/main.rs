use std::path::PathBuf;

use anyhow::Context;
use swagstock_app::{AppConfig, Inventory};
use swagstock_backup::BackupReason;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("failed to read configuration")?;
    swagstock_observability::init(config.log_format);

    let mut inventory = Inventory::start(config)
        .await
        .context("failed to open the data file")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = run(&mut inventory, &args).await;
    inventory.shutdown().await;
    result
}

async fn run(inventory: &mut Inventory, args: &[String]) -> anyhow::Result<()> {
    match args.first().map(String::as_str) {
        None | Some("status") => {
            let db = inventory.db()?;
            let branches = db.reference().branches(false).await?;
            let low = db.catalog().low_stock(None).await?;
            let deleted = db.auditor().count().await?;
            tracing::info!(
                data_file = %db.path().display(),
                branches = branches.len(),
                low_stock = low.len(),
                deleted_items = deleted,
                "status"
            );
            for row in low {
                println!("{}\t{}\t{} {} (min {})", row.branch, row.description, row.quantity, row.unit, row.min_stock);
            }
        }
        Some("backup") => {
            let reason = args.get(1).map(|r| BackupReason::custom(r)).unwrap_or(BackupReason::Manual);
            match inventory.backup(reason).await? {
                Some(snapshot) => println!("{}", snapshot.path.display()),
                None => anyhow::bail!("no data file to back up"),
            }
        }
        Some("list-backups") => {
            for snapshot in inventory.backups().list_backups().await? {
                println!(
                    "{}\t{}\t{} bytes\t{}",
                    snapshot.filename,
                    snapshot.reason,
                    snapshot.size,
                    snapshot.modified.to_rfc3339()
                );
            }
        }
        Some("restore") => {
            let path = args.get(1).map(PathBuf::from).context("usage: swagstock restore <backup file>")?;
            let report = inventory.restore(&path).await?;
            if let Some(safety) = report.safety_backup {
                println!("previous state saved to {}", safety.path.display());
            }
        }
        Some(other) => anyhow::bail!("unknown command '{other}' (expected status, backup, list-backups or restore)"),
    }
    Ok(())
}
