pub mod menu;
pub mod reply;

#[cfg(test)]
pub(crate) mod tests;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use enum_stringify::EnumStringify;
use itertools::Itertools;
use log::{debug, error, info};

use crate::{
    action::{Action, ActionKind},
    event::CorrelationKey,
    index::CorrelationIndex,
    messenger::Messenger,
    script::{BoxedScript, Step},
    EngineError, EngineResult,
};

pub use menu::MenuDriver;
pub use reply::ReplyDriver;

#[derive(EnumStringify, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[enum_stringify(case = "flat")]
pub enum Flow {
    Reply,
    Menu,
}

/// Where a suspended script waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Binding {
    pub flow: Flow,
    pub key: CorrelationKey,
}

impl Binding {
    pub fn reply(key: CorrelationKey) -> Self {
        Self {
            flow: Flow::Reply,
            key,
        }
    }

    pub fn menu(key: CorrelationKey) -> Self {
        Self {
            flow: Flow::Menu,
            key,
        }
    }
}

/// How an inbound event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No script waits on the event.
    Ignored,
    /// The waiting script is being resumed by another event right now.
    Busy,
    Suspended(Binding),
    Finished,
}

/// Shared state of both drivers: the messenger and the correlation index.
pub struct Engine<M> {
    messenger: Arc<M>,
    index: Arc<Mutex<CorrelationIndex>>,
}

impl<M> Clone for Engine<M> {
    fn clone(&self) -> Self {
        Self {
            messenger: Arc::clone(&self.messenger),
            index: Arc::clone(&self.index),
        }
    }
}

impl<M: Messenger> Engine<M> {
    pub fn new(messenger: M) -> Self {
        Self::with_messenger(Arc::new(messenger))
    }

    pub fn with_messenger(messenger: Arc<M>) -> Self {
        Self {
            messenger,
            index: Arc::new(Mutex::new(CorrelationIndex::new())),
        }
    }

    pub fn reply(&self) -> ReplyDriver<'_, M> {
        ReplyDriver::new(self)
    }

    pub fn menu(&self) -> MenuDriver<'_, M> {
        MenuDriver::new(self)
    }

    pub fn messenger(&self) -> &M {
        &self.messenger
    }

    pub fn is_awaiting_reply(&self, key: &CorrelationKey) -> EngineResult<bool> {
        Ok(self.lock()?.is_awaiting_reply(key))
    }

    pub fn is_awaiting_menu(&self, key: &CorrelationKey) -> EngineResult<bool> {
        Ok(self.lock()?.is_awaiting_menu(key))
    }

    /// Drops every conversation that waited longer than `max_age`.
    pub fn expire(&self, max_age: Duration) -> EngineResult<usize> {
        let removed = self.lock()?.expire(max_age);
        if removed > 0 {
            info!("Expired {removed} stale conversations");
        }
        Ok(removed)
    }

    pub fn active(&self) -> EngineResult<usize> {
        Ok(self.lock()?.len())
    }

    pub(crate) fn lock(&self) -> EngineResult<MutexGuard<'_, CorrelationIndex>> {
        self.index
            .lock()
            .map_err(|err| EngineError::MutexError(format!("previous holder panicked: {err}")))
    }

    pub(crate) fn unregister(&self, key: &CorrelationKey) -> EngineResult<()> {
        self.lock()?.unregister(key);
        Ok(())
    }

    /// Releases the key the script was resumed from and binds the script
    /// where it now waits. Without a binding the script is dropped.
    pub(crate) fn settle(
        &self,
        origin: Option<CorrelationKey>,
        binding: Option<Binding>,
        script: BoxedScript,
    ) -> EngineResult<Outcome> {
        let mut index = self.lock()?;
        if let Some(origin) = origin {
            index.unregister(&origin);
        }

        match binding {
            Some(binding) => {
                match binding.flow {
                    Flow::Reply => index.register_reply(binding.key, script),
                    Flow::Menu => index.register_menu(binding.key, script),
                };
                debug!("Script now awaits {} on {}", binding.flow, binding.key);
                Ok(Outcome::Suspended(binding))
            }
            None => {
                debug!("Script finished");
                Ok(Outcome::Finished)
            }
        }
    }

    /// Ends a script after an unhandled error. Protocol violations are still
    /// thrown into the script so it can clean up, but its answer is ignored.
    pub(crate) fn abort(
        &self,
        origin: Option<CorrelationKey>,
        binding: Option<Binding>,
        mut script: BoxedScript,
        err: EngineError,
    ) -> EngineError {
        if err.is_protocol_violation() {
            let _ = script.throw(&err);
        }
        drop(script);

        let keys = origin.into_iter().chain(binding.map(|b| b.key));
        match self.lock() {
            Ok(mut index) => keys.for_each(|key| {
                index.unregister(&key);
            }),
            Err(lock_err) => error!("Failed to clean up aborted script: {lock_err}"),
        }
        error!("Script aborted: {err}");

        err
    }
}

/// The one action of a script's first step. Callers check its kind.
pub(crate) fn first_action(step: Step, flow: Flow, expected: ActionKind) -> EngineResult<Action> {
    let mut actions = match step {
        Step::Yield(actions) => actions,
        Step::Done(_) => return Err(EngineError::FinishedBeforeStart(flow)),
    };

    match actions.len() {
        1 => Ok(actions.remove(0)),
        0 => Err(EngineError::InvalidFirstAction {
            flow,
            expected,
            got: "nothing".to_string(),
        }),
        _ => Err(EngineError::InvalidFirstAction {
            flow,
            expected,
            got: actions.iter().map(Action::kind).join(", "),
        }),
    }
}
