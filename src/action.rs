use enum_stringify::EnumStringify;
use serde::{Deserialize, Serialize};
use teloxide::types::{InlineKeyboardMarkup, ParseMode};

use crate::script::BoxedScript;

/// Formatting knobs a script can attach to a text it wants sent.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TextOptions {
    #[serde(default)]
    pub parse_mode: Option<ParseMode>,
    #[serde(default)]
    pub disable_notification: bool,
    #[serde(default)]
    pub protect_content: bool,
}

impl TextOptions {
    pub fn parse_mode(parse_mode: ParseMode) -> Self {
        Self {
            parse_mode: Some(parse_mode),
            ..Default::default()
        }
    }
}

/// What the user sees after pressing a button: a toast, an alert, or just
/// the spinner going away.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerOptions {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub show_alert: bool,
    #[serde(default)]
    pub cache_time: Option<u32>,
}

impl AnswerOptions {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

#[derive(EnumStringify, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    TextMessage,
    DeleteMessage,
    InlineMenu,
    UpdateMenu,
    AnswerQuery,
    Terminate,
    SwitchScript,
}

/// One effect a script asks the driver to perform.
pub enum Action {
    TextMessage {
        text: String,
        options: TextOptions,
    },
    /// Deletes the message that caused the current resumption.
    DeleteMessage,
    InlineMenu {
        text: String,
        keyboard: InlineKeyboardMarkup,
        options: TextOptions,
    },
    /// Edits the triggering menu in place. Without text only the buttons change.
    UpdateMenu {
        keyboard: InlineKeyboardMarkup,
        text: Option<String>,
    },
    AnswerQuery(AnswerOptions),
    Terminate {
        text: Option<String>,
    },
    /// Hands the conversation over to a fresh, not yet started script.
    SwitchScript(BoxedScript),
}

impl Action {
    pub fn text_message<S: Into<String>>(text: S) -> Self {
        Self::text_message_with(text, TextOptions::default())
    }

    pub fn text_message_with<S: Into<String>>(text: S, options: TextOptions) -> Self {
        Self::TextMessage {
            text: text.into(),
            options,
        }
    }

    pub fn delete_message() -> Self {
        Self::DeleteMessage
    }

    pub fn inline_menu<S: Into<String>>(text: S, keyboard: InlineKeyboardMarkup) -> Self {
        Self::inline_menu_with(text, keyboard, TextOptions::default())
    }

    pub fn inline_menu_with<S: Into<String>>(
        text: S,
        keyboard: InlineKeyboardMarkup,
        options: TextOptions,
    ) -> Self {
        Self::InlineMenu {
            text: text.into(),
            keyboard,
            options,
        }
    }

    pub fn update_menu(keyboard: InlineKeyboardMarkup, text: Option<String>) -> Self {
        Self::UpdateMenu { keyboard, text }
    }

    pub fn answer_query(options: AnswerOptions) -> Self {
        Self::AnswerQuery(options)
    }

    pub fn terminate() -> Self {
        Self::Terminate { text: None }
    }

    pub fn terminate_with<S: Into<String>>(text: S) -> Self {
        Self::Terminate {
            text: Some(text.into()),
        }
    }

    pub fn switch_script(next: BoxedScript) -> Self {
        Self::SwitchScript(next)
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::TextMessage { .. } => ActionKind::TextMessage,
            Action::DeleteMessage => ActionKind::DeleteMessage,
            Action::InlineMenu { .. } => ActionKind::InlineMenu,
            Action::UpdateMenu { .. } => ActionKind::UpdateMenu,
            Action::AnswerQuery(_) => ActionKind::AnswerQuery,
            Action::Terminate { .. } => ActionKind::Terminate,
            Action::SwitchScript(_) => ActionKind::SwitchScript,
        }
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::TextMessage { text, options } => f
                .debug_struct("TextMessage")
                .field("text", text)
                .field("options", options)
                .finish(),
            Action::DeleteMessage => write!(f, "DeleteMessage"),
            Action::InlineMenu {
                text,
                keyboard,
                options,
            } => f
                .debug_struct("InlineMenu")
                .field("text", text)
                .field("keyboard", keyboard)
                .field("options", options)
                .finish(),
            Action::UpdateMenu { keyboard, text } => f
                .debug_struct("UpdateMenu")
                .field("keyboard", keyboard)
                .field("text", text)
                .finish(),
            Action::AnswerQuery(options) => f.debug_tuple("AnswerQuery").field(options).finish(),
            Action::Terminate { text } => f.debug_struct("Terminate").field("text", text).finish(),
            // scripts are opaque
            Action::SwitchScript(_) => write!(f, "SwitchScript(..)"),
        }
    }
}
