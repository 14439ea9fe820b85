use colored::*;
use migration::Migrator;
use sea_orm::DatabaseConnection;
use sea_orm_migration::prelude::*;
use std::io::{self, Write};
use std::time::Instant;

const STATUS_COLUMN: usize = 80;

/// Applies pending migrations one at a time so each gets its own status line.
/// Already-applied migrations are listed as skipped.
pub async fn run_pending(db: &DatabaseConnection) -> Result<usize, DbErr> {
    let applied: Vec<String> = Migrator::get_applied_migrations(db)
        .await?
        .iter()
        .map(|m| m.name().to_owned())
        .collect();
    for name in &applied {
        status_line(&format!("Skipping {}", name.dimmed()));
        println!("{}", "applied".dimmed());
    }

    let pending = Migrator::get_pending_migrations(db).await?;
    if pending.is_empty() {
        println!("{}", "Schema is up to date".green());
        return Ok(0);
    }

    for migration in &pending {
        status_line(&format!("Applying {}", migration.name().bold()));
        let start = Instant::now();
        match Migrator::up(db, Some(1)).await {
            Ok(()) => {
                let time_str = format!("({:.2?})", start.elapsed()).dimmed();
                println!("{} {}", "done".green(), time_str);
            }
            Err(err) => {
                println!("{}", "failed".red());
                return Err(err);
            }
        }
    }
    Ok(pending.len())
}

fn status_line(label: &str) {
    let dots = ".".repeat(STATUS_COLUMN.saturating_sub(label.len()));
    print!("{label}{dots} ");
    io::stdout().flush().ok();
}
