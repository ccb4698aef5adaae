use botflow::{
    config::Config,
    handler::{engine_handler, spawn_sweeper},
    Engine,
};
use envconfig::Envconfig;
use log::{info, warn};
use teloxide::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    pretty_env_logger::init();
    if let Err(err) = dotenv {
        warn!("No .env file loaded: {err}");
    }
    let config = Config::init_from_env()?;

    let bot = Bot::new(&config.bot_token);
    let engine = Engine::new(bot.clone());
    let sweeper = spawn_sweeper(
        engine.clone(),
        config.script_ttl(),
        config.sweep_interval(),
    );

    info!("Starting dispatcher");
    Dispatcher::builder(bot, engine_handler())
        .dependencies(dptree::deps![engine])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    sweeper.abort();
    Ok(())
}
