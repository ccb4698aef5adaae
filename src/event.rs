use serde::{Deserialize, Serialize};
use teloxide::{
    dispatching::dialogue::GetChatId,
    types::{CallbackQuery, Message},
};

/// A bot-sent message a script is waiting on: `(chat id, message id)`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationKey {
    pub chat_id: i64,
    pub message_id: i32,
}

impl CorrelationKey {
    pub fn new(chat_id: i64, message_id: i32) -> Self {
        Self {
            chat_id,
            message_id,
        }
    }
}

impl std::fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.chat_id, self.message_id)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub message_id: i32,
    /// Id of the message this one replies to.
    pub reply_to: Option<i32>,
    pub from: Option<u64>,
    pub text: Option<String>,
}

impl InboundMessage {
    /// Key of the replied-to message; `None` for messages that reply to nothing.
    pub fn correlation_key(&self) -> Option<CorrelationKey> {
        self.reply_to
            .map(|message_id| CorrelationKey::new(self.chat_id, message_id))
    }
}

impl From<&Message> for InboundMessage {
    fn from(msg: &Message) -> Self {
        Self {
            chat_id: msg.chat.id.0,
            message_id: msg.id.0,
            reply_to: msg.reply_to_message().map(|m| m.id.0),
            from: msg.from.as_ref().map(|u| u.id.0),
            text: msg.text().map(str::to_string),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ButtonPress {
    pub query_id: String,
    /// Chat and id of the message carrying the pressed button.
    pub chat_id: i64,
    pub message_id: i32,
    pub data: Option<String>,
    pub from: u64,
}

impl ButtonPress {
    /// `None` when Telegram no longer ships the menu message (too old).
    pub fn from_query(q: &CallbackQuery) -> Option<Self> {
        let chat_id = q.chat_id()?.0;
        let message_id = q.message.as_ref()?.id().0;

        Some(Self {
            query_id: q.id.to_string(),
            chat_id,
            message_id,
            data: q.data.clone(),
            from: q.from.id.0,
        })
    }

    pub fn correlation_key(&self) -> CorrelationKey {
        CorrelationKey::new(self.chat_id, self.message_id)
    }
}
