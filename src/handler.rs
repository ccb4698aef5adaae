use std::str::FromStr;
use std::time::Duration;

use log::{error, info, warn};
use teloxide::{
    dispatching::{DpHandlerDescription, UpdateFilterExt},
    dptree::{self, Handler},
    prelude::DependencyMap,
    types::{CallbackQuery, Message, Update},
    Bot,
};
use tokio::task::JoinHandle;

use crate::{
    action::AnswerOptions,
    commands::ScriptCommand,
    event::{ButtonPress, InboundMessage},
    scripts::{counter, greeting},
    Engine, EngineResult, Messenger, Outcome,
};

pub type BotEngine = Engine<Bot>;

pub type BotHandler = Handler<'static, DependencyMap, EngineResult<()>, DpHandlerDescription>;

/// Routes commands, replies and button presses into the engine. Updates no
/// script waits for fall through to whatever branch comes next.
pub fn engine_handler() -> BotHandler {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_map(|m: Message| m.text().and_then(|t| ScriptCommand::from_str(t).ok()))
                .endpoint(handle_command),
        )
        .branch(
            Update::filter_message()
                .map(|m: Message| InboundMessage::from(&m))
                .filter(|engine: BotEngine, inbound: InboundMessage| {
                    inbound
                        .correlation_key()
                        .is_some_and(|key| engine.is_awaiting_reply(&key).unwrap_or(false))
                })
                .endpoint(handle_reply),
        )
        .branch(
            Update::filter_callback_query()
                .filter_map(|q: CallbackQuery| ButtonPress::from_query(&q))
                .filter(|engine: BotEngine, press: ButtonPress| {
                    engine
                        .is_awaiting_menu(&press.correlation_key())
                        .unwrap_or(false)
                })
                .endpoint(handle_press),
        )
}

async fn handle_command(engine: BotEngine, cmd: ScriptCommand, msg: Message) -> EngineResult<()> {
    let chat_id = msg.chat.id.0;
    info!("Starting {cmd:?} in chat {chat_id}");
    match cmd {
        ScriptCommand::Start => engine.reply().start(chat_id, greeting()).await?,
        ScriptCommand::Menu { start } => engine.menu().start(chat_id, counter(start)).await?,
    };

    Ok(())
}

async fn handle_reply(engine: BotEngine, inbound: InboundMessage) -> EngineResult<()> {
    let outcome = engine.reply().handle(&inbound).await?;
    info!("Reply in chat {}: {outcome:?}", inbound.chat_id);
    Ok(())
}

async fn handle_press(engine: BotEngine, press: ButtonPress) -> EngineResult<()> {
    deliver_press(&engine, &press).await
}

/// Hands the press to the menu driver. Presses that end `Busy` or in an
/// error still get an empty answer so the client stops waiting.
pub(crate) async fn deliver_press<M: Messenger>(
    engine: &Engine<M>,
    press: &ButtonPress,
) -> EngineResult<()> {
    let result = engine.menu().handle(press).await;
    match &result {
        Ok(Outcome::Busy) | Err(_) => {
            if let Err(err) = engine
                .messenger()
                .answer_query(&press.query_id, AnswerOptions::default())
                .await
            {
                warn!("Failed to answer press on {}: {err}", press.correlation_key());
            }
        }
        Ok(outcome) => info!("Press on {}: {outcome:?}", press.correlation_key()),
    }

    result.map(|_| ())
}

/// Periodically drops conversations nobody answered within `ttl`.
pub fn spawn_sweeper<M>(engine: Engine<M>, ttl: Duration, every: Duration) -> JoinHandle<()>
where
    M: Messenger + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(every).await;
            if let Err(err) = engine.expire(ttl) {
                error!("Failed to sweep stale conversations: {err}");
            }
        }
    })
}
