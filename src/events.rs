use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// An event found by discovery, with whatever links were published for it.
#[derive(Serialize, Deserialize, FromRow, Clone, Debug, Default, PartialEq)]
pub struct EventMetadata {
    pub name: String,
    pub prelims_url: String,
    pub finals_url: String,
    pub show_id: String,
    pub event_type: Option<String>,
}

pub async fn replace_events(events: &[EventMetadata], pool: &SqlitePool) -> anyhow::Result<()> {
    let mut txn = pool.begin().await?;
    sqlx::query("DELETE FROM events").execute(&mut *txn).await?;
    for event in events {
        sqlx::query("INSERT OR REPLACE INTO events (name, prelims_url, finals_url, show_id, event_type) VALUES (?, ?, ?, ?, ?)")
            .bind(&event.name)
            .bind(&event.prelims_url)
            .bind(&event.finals_url)
            .bind(&event.show_id)
            .bind(&event.event_type)
            .execute(&mut *txn)
            .await?;
    }
    txn.commit().await?;
    Ok(())
}

pub async fn load_events(pool: &SqlitePool) -> Result<Vec<EventMetadata>, sqlx::Error> {
    sqlx::query_as::<_, EventMetadata>("SELECT name, prelims_url, finals_url, show_id, event_type FROM events ORDER BY id")
        .fetch_all(pool)
        .await
}
