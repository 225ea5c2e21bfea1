use log::*;
use settlement_engine::{SettlementDatabase, SqliteDatabase};
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
}

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/settlement_test_{}.db", dir.display(), rand::random::<u64>())
}

pub async fn create_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        trace!("🚀️ Nothing to drop at {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("🚀️ Created Sqlite database {url}");
}

/// A migrated database in a fresh, randomly named file.
pub async fn new_test_db(max_connections: u32) -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, max_connections).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    db
}

pub async fn tear_down(mut db: SqliteDatabase) {
    let url = db.url().to_string();
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    Sqlite::drop_database(&url).await.expect("Error dropping database");
}
