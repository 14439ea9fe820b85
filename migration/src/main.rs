use std::{env, fs, path::Path};
use util::config::AppConfig;

mod runner;

/// `migration [up|fresh|clean]`. `fresh` and `clean` also wipe the object store,
/// since face baselines are keyed by user id.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (db_path, storage_root) = {
        let cfg = AppConfig::global();
        (cfg.database_path.clone(), cfg.storage_root.clone())
    };

    match env::args().nth(1).as_deref() {
        Some("clean") => {
            remove_db_file(&db_path)?;
            remove_storage(&storage_root)?;
        }
        Some("fresh") => {
            remove_db_file(&db_path)?;
            remove_storage(&storage_root)?;
            migrate(&db_path).await?;
        }
        None | Some("up") => migrate(&db_path).await?,
        Some(other) => {
            eprintln!("unknown command '{other}', expected up, fresh or clean");
            std::process::exit(2);
        }
    }
    Ok(())
}

async fn migrate(db_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let url = if db_path.starts_with("sqlite:") {
        db_path.to_owned()
    } else {
        if let Some(parent) = Path::new(db_path).parent() {
            fs::create_dir_all(parent)?;
        }
        format!("sqlite://{db_path}?mode=rwc")
    };

    println!("Running migrations against {url}");
    let db = sea_orm::Database::connect(&url).await?;
    let applied = runner::run_pending(&db).await?;
    println!("{applied} migration(s) applied");
    Ok(())
}

fn remove_db_file(path: &str) -> std::io::Result<()> {
    let db_path = Path::new(path);
    if path.starts_with("sqlite:") {
        println!("Not a file database, nothing to delete: {path}");
    } else if db_path.exists() {
        fs::remove_file(db_path)?;
        println!("Deleted DB: {}", db_path.display());
    } else {
        println!("DB file does not exist: {}", db_path.display());
    }
    Ok(())
}

fn remove_storage(root: &str) -> std::io::Result<()> {
    let storage_path = Path::new(root);
    if storage_path.exists() {
        fs::remove_dir_all(storage_path)?;
        println!("Deleted object storage: {}", storage_path.display());
    } else {
        println!("Object storage does not exist: {}", storage_path.display());
    }
    Ok(())
}
