use std::time::Duration;

use crate::{adapters::persistence::PostgresPersistence, infra::db::init_db};

pub mod app;
pub mod config;
pub mod db;
pub mod maintenance;
pub mod setup;
pub mod stripe_events;
pub mod webhook_signature;

pub async fn postgres_persistence(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> anyhow::Result<PostgresPersistence> {
    let pool = init_db(database_url, max_connections, acquire_timeout).await?;
    let persistence = PostgresPersistence::new(pool);
    Ok(persistence)
}
