pub mod action;
pub mod commands;
pub mod config;
pub mod driver;
pub mod event;
pub mod handler;
pub mod index;
pub mod messenger;
pub mod script;
pub mod scripts;
pub mod utils;

use action::ActionKind;
use driver::Flow;
use messenger::TransportError;

pub use action::Action;
pub use driver::{Binding, Engine, MenuDriver, Outcome, ReplyDriver};
pub use event::{ButtonPress, CorrelationKey, InboundMessage};
pub use messenger::Messenger;
pub use script::{BoxedScript, Resume, Script, Step};

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("invalid first action in {flow} flow: expected single {expected}, got {got}")]
    InvalidFirstAction {
        flow: Flow,
        expected: ActionKind,
        got: String,
    },
    #[error("script finished before yielding its first action in {0} flow")]
    FinishedBeforeStart(Flow),
    #[error("invalid action {kind} in {flow} flow")]
    InvalidAction { flow: Flow, kind: ActionKind },
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
    #[error("error while locking correlation index: {0}")]
    MutexError(String),
}

impl EngineError {
    /// Script broke the action protocol; fatal to that script.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidFirstAction { .. } | Self::FinishedBeforeStart(_) | Self::InvalidAction { .. }
        )
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
