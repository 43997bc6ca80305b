use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Build, Rocket};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::migrate::Migrator;
use std::str::FromStr;

// macro to decode some type from SQL JSON text
#[macro_export]
macro_rules! impl_sqlx_json_text_type_and_decode {
    ($type:ident) => {
        impl<DB: sqlx::Database> sqlx::Type<DB> for $type
        where str: sqlx::Type<DB>
        {
            fn type_info() -> <DB as sqlx::Database>::TypeInfo {
                // TEXT columns only
                <&str as sqlx::Type<DB>>::type_info()
            }
        }

        impl<'r, DB: sqlx::Database> sqlx::Decode<'r, DB> for $type
        where &'r str: sqlx::Decode<'r, DB>
        {
            fn decode(value: <DB as sqlx::Database>::ValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let value = <&str as sqlx::Decode<DB>>::decode(value)?;
                Ok(serde_json::from_str::<$type>(value)?)
            }
        }
    };
}

static MIGRATOR: Migrator = sqlx::migrate!("db/migrations");

pub struct DbPool(pub SqlitePool);

pub async fn open_pool(database_url: &str) -> anyhow::Result<SqlitePool> {
    let in_memory = database_url.contains(":memory:");
    let opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true);
    let opts = if in_memory {
        opts
    } else {
        opts.journal_mode(SqliteJournalMode::Wal)
    };
    // every connection to sqlite::memory: is a separate database
    let max_connections = if in_memory { 1 } else { 5 };
    let pool_opts = SqlitePoolOptions::new().max_connections(max_connections);
    let pool_opts = if in_memory {
        // the database lives only as long as its connection
        pool_opts.idle_timeout(None).max_lifetime(None)
    } else {
        pool_opts
    };
    let pool = pool_opts
        .connect_with(opts)
        .await?;
    MIGRATOR.run(&pool).await?;
    Ok(pool)
}

pub struct DbPoolFairing();
#[rocket::async_trait]
impl Fairing for DbPoolFairing {
    fn info(&self) -> Info {
        Info {
            name: "SQLite Database Pool with Migrations",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let database_url = if cfg!(test) {
            "sqlite::memory:".to_string()
        } else {
            match rocket.figment().extract_inner::<String>("database_url") {
                Ok(url) => url,
                Err(err) => {
                    error!("Missing database_url: {err}");
                    return Err(rocket);
                }
            }
        };
        info!("Opening database: {database_url}");
        match open_pool(&database_url).await {
            Ok(pool) => {
                info!("Migrations applied successfully!");
                Ok(rocket.manage(DbPool(pool)))
            }
            Err(err) => {
                error!("Database error: {err:?}");
                Err(rocket)
            }
        }
    }
}
