use anyhow::{Context, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;

pub mod api;
mod axumext;
pub mod config;
mod monitoring;

pub async fn migrate(db: &DatabaseConnection) -> Result<(), anyhow::Error> {
    Migrator::up(db, None)
        .await
        .context("Database migration failed")
}
