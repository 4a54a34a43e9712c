use anyhow::Context;

use sea_orm::{ConnectOptions, Database};

use school_directory::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "school_directory=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let settings = Settings::from_env()?;

    let db = Database::connect(
        ConnectOptions::new(settings.database_url.clone())
            .max_connections(settings.max_connections)
            .to_owned(),
    )
    .await
    .context("could not connect to DB_URL")?;

    school_directory::migrate(&db).await?;
    school_directory::api::serve(db, &settings).await?;

    Ok(())
}
