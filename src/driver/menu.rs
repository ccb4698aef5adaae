use log::{debug, info, warn};

use crate::{
    action::{Action, ActionKind},
    event::{ButtonPress, CorrelationKey},
    index::Checkout,
    messenger::{EditOptions, Markup, Messenger, SendOptions},
    script::{BoxedScript, Resume},
    EngineError, EngineResult,
};

use super::{first_action, Binding, Engine, Flow, Outcome};

enum Performed {
    Continue,
    Switch(BoxedScript),
}

/// Advances scripts that wait for a button press on a menu they sent.
pub struct MenuDriver<'a, M> {
    engine: &'a Engine<M>,
}

impl<'a, M: Messenger> MenuDriver<'a, M> {
    pub fn new(engine: &'a Engine<M>) -> Self {
        Self { engine }
    }

    /// Runs `script` up to its first `InlineMenu`, sends the menu and
    /// registers the script under it.
    pub async fn start(&self, chat_id: i64, mut script: BoxedScript) -> EngineResult<CorrelationKey> {
        let mut step = script.resume(Resume::Start);
        loop {
            let (text, keyboard, options) =
                match first_action(step, Flow::Menu, ActionKind::InlineMenu) {
                    Ok(Action::InlineMenu {
                        text,
                        keyboard,
                        options,
                    }) => (text, keyboard, options),
                    Ok(other) => {
                        let err = EngineError::InvalidFirstAction {
                            flow: Flow::Menu,
                            expected: ActionKind::InlineMenu,
                            got: other.kind().to_string(),
                        };
                        return Err(self.engine.abort(None, None, script, err));
                    }
                    Err(err) => return Err(self.engine.abort(None, None, script, err)),
                };

            let options = SendOptions::from_text(&options).markup(Markup::Inline(keyboard));
            match self.engine.messenger().send_text(chat_id, &text, options).await {
                Ok(sent) => {
                    let key = sent.key();
                    self.engine.settle(None, Some(Binding::menu(key)), script)?;
                    info!("Started menu script in chat {chat_id}, awaiting press on {key}");
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

    /// Resumes the script bound to the menu the button belongs to.
    ///
    /// A `SwitchScript` replaces the script under the same menu and hands it
    /// the press right away, while the slot is still checked out. A
    /// replacement that switches again is bound and waits for the next press.
    pub async fn handle(&self, press: &ButtonPress) -> EngineResult<Outcome> {
        let key = press.correlation_key();
        let checkout = self.engine.lock()?.checkout_menu(&key);
        let mut script = match checkout {
            Checkout::Absent => return Ok(Outcome::Ignored),
            Checkout::Busy => {
                warn!("Press on {key} arrived while its script is still running");
                return Ok(Outcome::Busy);
            }
            Checkout::Ready(script) => script,
        };

        debug!("Resuming menu script on {key} with {:?}", press.data);
        let mut step = script.resume(Resume::Button(press.clone()));
        let mut binding = Some(Binding::menu(key));
        let mut switched = false;
        loop {
            let (actions, finished) = step.into_parts();
            match self.perform(actions, press, key, &mut binding).await {
                Ok(Performed::Continue) => {
                    let binding = if finished { None } else { binding };
                    return self.engine.settle(Some(key), binding, script);
                }
                Ok(Performed::Switch(next)) if switched => {
                    warn!("Replacement script on {key} switched again, it waits for the next press");
                    return self.engine.settle(Some(key), Some(Binding::menu(key)), next);
                }
                Ok(Performed::Switch(next)) => {
                    info!("Switched script on {key}, delivering the press to it");
                    switched = true;
                    script = next;
                    binding = Some(Binding::menu(key));
                    step = script.resume(Resume::Button(press.clone()));
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
        press: &ButtonPress,
        origin: CorrelationKey,
        binding: &mut Option<Binding>,
    ) -> EngineResult<Performed> {
        let messenger = self.engine.messenger();
        let (chat_id, message_id) = (press.chat_id, press.message_id);

        let mut actions = actions.into_iter();
        while let Some(action) = actions.next() {
            if binding.is_none() {
                warn!("Skipping {} after script terminated", action.kind());
                continue;
            }

            match action {
                Action::InlineMenu {
                    text,
                    keyboard,
                    options,
                } => {
                    let options = EditOptions {
                        parse_mode: options.parse_mode,
                        keyboard: Some(keyboard),
                    };
                    messenger.edit_text(chat_id, message_id, &text, options).await?;
                }
                Action::UpdateMenu {
                    keyboard,
                    text: Some(text),
                } => {
                    let options = EditOptions {
                        parse_mode: None,
                        keyboard: Some(keyboard),
                    };
                    messenger.edit_text(chat_id, message_id, &text, options).await?;
                }
                Action::UpdateMenu {
                    keyboard,
                    text: None,
                } => {
                    messenger.edit_keyboard(chat_id, message_id, keyboard).await?;
                }
                Action::AnswerQuery(options) => {
                    messenger.answer_query(&press.query_id, options).await?;
                }
                Action::SwitchScript(next) => {
                    let dropped = actions.len();
                    if dropped > 0 {
                        warn!("Dropping {dropped} actions after SwitchScript");
                    }
                    return Ok(Performed::Switch(next));
                }
                Action::TextMessage { text, options } => {
                    let options = SendOptions::from_text(&options)
                        .reply_to(message_id)
                        .markup(Markup::ForceReply { selective: false });
                    let sent = messenger.send_text(chat_id, &text, options).await?;
                    *binding = Some(Binding::reply(sent.key()));
                }
                Action::Terminate { text } => {
                    self.engine.unregister(&origin)?;
                    if let Some(current) = binding.take() {
                        self.engine.unregister(&current.key)?;
                    }
                    if let Some(text) = text {
                        messenger
                            .edit_text(chat_id, message_id, &text, EditOptions::default())
                            .await?;
                    }
                }
                other => {
                    return Err(EngineError::InvalidAction {
                        flow: Flow::Menu,
                        kind: other.kind(),
                    })
                }
            }
        }

        Ok(Performed::Continue)
    }
}
