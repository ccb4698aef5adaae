use async_trait::async_trait;
use log::warn;
use teloxide::prelude::*;
use teloxide::types::{
    ForceReply, InlineKeyboardMarkup, MessageId, ParseMode, ReplyMarkup, ReplyParameters,
};
use teloxide::{ApiError, Bot, RequestError};

use crate::action::{AnswerOptions, TextOptions};
use crate::event::CorrelationKey;

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("telegram request failed: {0}")]
    RequestError(#[from] RequestError),
    #[error("messenger failure: {0}")]
    Other(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Identifiers of a message the bot sent or edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub message_id: i32,
}

impl SentMessage {
    pub fn key(&self) -> CorrelationKey {
        CorrelationKey::new(self.chat_id, self.message_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    ForceReply { selective: bool },
    Inline(InlineKeyboardMarkup),
}

impl From<Markup> for ReplyMarkup {
    fn from(markup: Markup) -> Self {
        match markup {
            Markup::ForceReply { selective } => ReplyMarkup::ForceReply(ForceReply {
                selective,
                ..ForceReply::new()
            }),
            Markup::Inline(kbd) => ReplyMarkup::InlineKeyboard(kbd),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub parse_mode: Option<ParseMode>,
    pub disable_notification: bool,
    pub protect_content: bool,
    pub reply_to_message_id: Option<i32>,
    pub reply_markup: Option<Markup>,
}

impl SendOptions {
    pub fn from_text(options: &TextOptions) -> Self {
        Self {
            parse_mode: options.parse_mode,
            disable_notification: options.disable_notification,
            protect_content: options.protect_content,
            ..Default::default()
        }
    }

    pub fn reply_to(self, message_id: i32) -> Self {
        Self {
            reply_to_message_id: Some(message_id),
            ..self
        }
    }

    pub fn markup(self, markup: Markup) -> Self {
        Self {
            reply_markup: Some(markup),
            ..self
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditOptions {
    pub parse_mode: Option<ParseMode>,
    /// `None` strips the buttons from the edited message.
    pub keyboard: Option<InlineKeyboardMarkup>,
}

/// The network side of the engine. Every call is awaited by the driver
/// before the correlation index is updated.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        options: SendOptions,
    ) -> TransportResult<SentMessage>;

    async fn delete(&self, chat_id: i64, message_id: i32) -> TransportResult<()>;

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        options: EditOptions,
    ) -> TransportResult<SentMessage>;

    async fn edit_keyboard(
        &self,
        chat_id: i64,
        message_id: i32,
        keyboard: InlineKeyboardMarkup,
    ) -> TransportResult<SentMessage>;

    async fn answer_query(&self, query_id: &str, options: AnswerOptions) -> TransportResult<()>;
}

/// The replied-to message may be gone already, e.g. a user's answer a script
/// deleted right before sending its menu.
fn reply_parameters(message_id: i32) -> ReplyParameters {
    ReplyParameters::new(MessageId(message_id)).allow_sending_without_reply()
}

#[async_trait]
impl Messenger for Bot {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        options: SendOptions,
    ) -> TransportResult<SentMessage> {
        let msg = self.send_message(ChatId(chat_id), text);
        let msg = match options.parse_mode {
            Some(parse_mode) => msg.parse_mode(parse_mode),
            None => msg,
        };
        let msg = match options.reply_to_message_id {
            Some(id) => msg.reply_parameters(reply_parameters(id)),
            None => msg,
        };
        let msg = match options.reply_markup {
            Some(markup) => msg.reply_markup(ReplyMarkup::from(markup)),
            None => msg,
        };
        let msg = msg
            .disable_notification(options.disable_notification)
            .protect_content(options.protect_content);

        let msg = msg.await?;

        Ok(SentMessage {
            chat_id: msg.chat.id.0,
            message_id: msg.id.0,
        })
    }

    async fn delete(&self, chat_id: i64, message_id: i32) -> TransportResult<()> {
        self.delete_message(ChatId(chat_id), MessageId(message_id))
            .await?;
        Ok(())
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        options: EditOptions,
    ) -> TransportResult<SentMessage> {
        let msg = self.edit_message_text(ChatId(chat_id), MessageId(message_id), text);
        let msg = match options.parse_mode {
            Some(parse_mode) => msg.parse_mode(parse_mode),
            None => msg,
        };
        let msg = match options.keyboard {
            Some(kbd) => msg.reply_markup(kbd),
            None => msg,
        };

        match msg.await {
            Ok(msg) => Ok(SentMessage {
                chat_id: msg.chat.id.0,
                message_id: msg.id.0,
            }),
            Err(RequestError::Api(ApiError::MessageNotModified)) => {
                warn!("Edit of message ({chat_id}, {message_id}) changed nothing");
                Ok(SentMessage {
                    chat_id,
                    message_id,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn edit_keyboard(
        &self,
        chat_id: i64,
        message_id: i32,
        keyboard: InlineKeyboardMarkup,
    ) -> TransportResult<SentMessage> {
        let msg = self
            .edit_message_reply_markup(ChatId(chat_id), MessageId(message_id))
            .reply_markup(keyboard);

        match msg.await {
            Ok(msg) => Ok(SentMessage {
                chat_id: msg.chat.id.0,
                message_id: msg.id.0,
            }),
            Err(RequestError::Api(ApiError::MessageNotModified)) => {
                warn!("Keyboard of message ({chat_id}, {message_id}) is already up to date");
                Ok(SentMessage {
                    chat_id,
                    message_id,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn answer_query(&self, query_id: &str, options: AnswerOptions) -> TransportResult<()> {
        let answer = self.answer_callback_query(query_id.to_string());
        let answer = match options.text {
            Some(text) => answer.text(text),
            None => answer,
        };
        let answer = match options.cache_time {
            Some(secs) => answer.cache_time(secs),
            None => answer,
        };
        answer.show_alert(options.show_alert).await?;

        Ok(())
    }
}
