use std::{sync::Arc, time::Duration};

use engine::CurrencyCode;
use migration::{Migrator, MigratorTrait};
use settings::Database;
use telegram_bot::{ConversationEngine, HttpRateLookup};

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "expensplit={level},telegram_bot={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.database).await?;

    let Some(telegram) = settings.telegram else {
        tracing::info!("no telegram settings found, database migrated");
        return Ok(());
    };

    let engine = engine::Engine::builder().database(db).build().await?;

    let reference: CurrencyCode = settings.rates.reference.parse()?;
    let rates = HttpRateLookup::new(
        &settings.rates.url,
        Duration::from_secs(settings.rates.timeout_secs),
    )?;
    let conversation = ConversationEngine::new(Arc::new(engine), Arc::new(rates))
        .owner(telegram.owner)
        .reference_currency(reference);

    let bot = telegram_bot::Bot::builder()
        .token(&telegram.token)
        .conversation(conversation)
        .build()?;
    bot.run().await;

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
    };
    tracing::info!(%url, "opening database");

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
