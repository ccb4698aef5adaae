use log::{debug, info, warn};

use crate::{
    action::{Action, ActionKind},
    event::{CorrelationKey, InboundMessage},
    index::Checkout,
    messenger::{Markup, Messenger, SendOptions},
    script::{BoxedScript, Resume},
    EngineError, EngineResult,
};

use super::{first_action, Binding, Engine, Flow, Outcome};

/// Advances scripts that wait for the user's next message.
pub struct ReplyDriver<'a, M> {
    engine: &'a Engine<M>,
}

impl<'a, M: Messenger> ReplyDriver<'a, M> {
    pub fn new(engine: &'a Engine<M>) -> Self {
        Self { engine }
    }

    /// Runs `script` up to its first `TextMessage`, sends it as a forced
    /// reply and registers the script under the sent message.
    pub async fn start(&self, chat_id: i64, mut script: BoxedScript) -> EngineResult<CorrelationKey> {
        let mut step = script.resume(Resume::Start);
        loop {
            let (text, options) = match first_action(step, Flow::Reply, ActionKind::TextMessage) {
                Ok(Action::TextMessage { text, options }) => (text, options),
                Ok(other) => {
                    let err = EngineError::InvalidFirstAction {
                        flow: Flow::Reply,
                        expected: ActionKind::TextMessage,
                        got: other.kind().to_string(),
                    };
                    return Err(self.engine.abort(None, None, script, err));
                }
                Err(err) => return Err(self.engine.abort(None, None, script, err)),
            };

            let options =
                SendOptions::from_text(&options).markup(Markup::ForceReply { selective: false });
            match self.engine.messenger().send_text(chat_id, &text, options).await {
                Ok(sent) => {
                    let key = sent.key();
                    self.engine.settle(None, Some(Binding::reply(key)), script)?;
                    info!("Started reply script in chat {chat_id}, awaiting reply to {key}");
                    return Ok(key);
                }
                Err(err) => {
                    let err = EngineError::from(err);
                    step = match script.throw(&err) {
                        Some(step) => step,
                        None => return Err(self.engine.abort(None, None, script, err)),
                    };
                }
            }
        }
    }

    /// Resumes the script waiting for a reply to the message `msg` replies to.
    pub async fn handle(&self, msg: &InboundMessage) -> EngineResult<Outcome> {
        let key = match msg.correlation_key() {
            Some(key) => key,
            None => return Ok(Outcome::Ignored),
        };

        let checkout = self.engine.lock()?.checkout_reply(&key);
        let mut script = match checkout {
            Checkout::Absent => return Ok(Outcome::Ignored),
            Checkout::Busy => {
                warn!("Reply to {key} arrived while its script is still running");
                return Ok(Outcome::Busy);
            }
            Checkout::Ready(script) => script,
        };

        debug!("Resuming reply script on {key}");
        let mut step = script.resume(Resume::Message(msg.clone()));
        let mut binding = Some(Binding::reply(key));
        loop {
            let (actions, finished) = step.into_parts();
            match self.perform(actions, msg, key, &mut binding).await {
                Ok(()) => {
                    let binding = if finished { None } else { binding };
                    return self.engine.settle(Some(key), binding, script);
                }
                Err(err) if err.is_transport() => {
                    step = match script.throw(&err) {
                        Some(step) => step,
                        None => return Err(self.engine.abort(Some(key), binding, script, err)),
                    };
                }
                Err(err) => return Err(self.engine.abort(Some(key), binding, script, err)),
            }
        }
    }

    async fn perform(
        &self,
        actions: Vec<Action>,
        msg: &InboundMessage,
        origin: CorrelationKey,
        binding: &mut Option<Binding>,
    ) -> EngineResult<()> {
        let messenger = self.engine.messenger();

        for action in actions {
            if binding.is_none() {
                warn!("Skipping {} after script terminated", action.kind());
                continue;
            }

            match action {
                Action::TextMessage { text, options } => {
                    let options = SendOptions::from_text(&options)
                        .reply_to(msg.message_id)
                        .markup(Markup::ForceReply { selective: false });
                    let sent = messenger.send_text(msg.chat_id, &text, options).await?;
                    *binding = Some(Binding::reply(sent.key()));
                }
                Action::DeleteMessage => {
                    messenger.delete(msg.chat_id, msg.message_id).await?;
                }
                Action::InlineMenu {
                    text,
                    keyboard,
                    options,
                } => {
                    let options = SendOptions::from_text(&options)
                        .reply_to(msg.message_id)
                        .markup(Markup::Inline(keyboard));
                    let sent = messenger.send_text(msg.chat_id, &text, options).await?;
                    *binding = Some(Binding::menu(sent.key()));
                }
                Action::Terminate { text } => {
                    self.engine.unregister(&origin)?;
                    if let Some(current) = binding.take() {
                        self.engine.unregister(&current.key)?;
                    }
                    if let Some(text) = text {
                        let options = SendOptions::default().reply_to(msg.message_id);
                        messenger.send_text(msg.chat_id, &text, options).await?;
                    }
                }
                other => {
                    return Err(EngineError::InvalidAction {
                        flow: Flow::Reply,
                        kind: other.kind(),
                    })
                }
            }
        }

        Ok(())
    }
}
