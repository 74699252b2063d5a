mod commands;
mod error;
mod events;
mod models;
mod settings;
mod store;
mod tasks;
mod xp;

use events::event_handler;
use poise::serenity_prelude as serenity;
use settings::Settings;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use store::Store;
use tracing_subscriber::EnvFilter;
use xp::XpEngine;

#[derive(Clone)]
pub struct Data {
    pub settings: Arc<Settings>,
    pub store: Store,
    pub engine: Arc<XpEngine>,
    pub tasks_started: Arc<AtomicBool>,
}

impl Data {
    pub fn new(settings: Settings, store: Store) -> Self {
        let engine = XpEngine::new(
            store.clone(),
            Arc::new(settings.levels.clone()),
            settings.xp_cooldown,
        );
        Self {
            settings: Arc::new(settings),
            store,
            engine: Arc::new(engine),
            tasks_started: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns true for the first caller only, until `release_tasks` is called.
    pub fn claim_tasks(&self) -> bool {
        !self.tasks_started.swap(true, Ordering::SeqCst)
    }

    pub fn release_tasks(&self) {
        self.tasks_started.store(false, Ordering::SeqCst);
    }
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let settings = Settings::from_env().inspect_err(|e| tracing::error!("Startup aborted: {}", e))?;
    tracing::info!(
        "Loaded {} level roles, {} prestige levels and {} periodic jobs",
        settings.levels.level_roles().len(),
        settings.levels.prestige_level_roles().len(),
        settings.jobs.len()
    );
    let store = Store::connect(&settings.database_url).await?;
    let token = settings.discord_token.clone();
    let data = Data::new(settings, store);

    let intents = serenity::GatewayIntents::non_privileged();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![commands::levels::level(), commands::xp::xp()],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(data)
            })
        })
        .build();

    serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?
        .start()
        .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_data() -> Data {
    let settings = Settings::from_lookup(|key| match key {
        "DISCORD_TOKEN" => Some("token".to_string()),
        "DATABASE_URL" => Some("sqlite::memory:".to_string()),
        _ => None,
    })
    .unwrap();
    Data::new(settings, store::memory_store().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tasks_are_claimed_once_until_released() {
        let data = test_data().await;
        assert!(data.claim_tasks());
        assert!(!data.claim_tasks());

        data.release_tasks();
        assert!(data.clone().claim_tasks());
        assert!(!data.claim_tasks());
    }
}
