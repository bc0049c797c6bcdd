mod cli;

use std::sync::Arc;

use clap::Parser;
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kindred::{
    api::HttpDirectoryApi,
    auth::SqliteTokenStore,
    config::Settings,
    error::AppError,
    service::ServiceContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so command output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kindred=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = cli::Cli::parse();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::debug!("Using directory backend at {}", settings.api.base_url);

    // Token storage
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.storage.max_connections)
        .connect(&settings.storage.url)
        .await?;
    let tokens = Arc::new(SqliteTokenStore::migrated(db_pool).await?);

    let api = Arc::new(HttpDirectoryApi::new(&settings.api, tokens.clone())?);
    let service_context = ServiceContext::new(api, tokens, &settings.search);

    if let Err(e) = cli::run(cli, &service_context).await {
        if let Some(AppError::Unauthorized(scope)) = e.downcast_ref::<AppError>() {
            anyhow::bail!("{}. Run `{}` first.", e, scope.login_hint());
        }
        if let Some(fields) = e.downcast_ref::<AppError>().and_then(AppError::field_errors) {
            for (field, messages) in fields {
                eprintln!("  {}: {}", field, messages.join(" "));
            }
        }
        return Err(e);
    }

    Ok(())
}
