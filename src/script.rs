use std::collections::VecDeque;

use crate::{
    action::Action,
    event::{ButtonPress, InboundMessage},
    EngineError,
};

/// What a script is resumed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resume {
    Start,
    Message(InboundMessage),
    Button(ButtonPress),
}

impl Resume {
    /// Text of the inbound message, if resumed by one.
    pub fn text(&self) -> Option<&str> {
        match self {
            Resume::Message(msg) => msg.text.as_deref(),
            _ => None,
        }
    }

    /// Callback data of the pressed button, if resumed by a press.
    pub fn data(&self) -> Option<&str> {
        match self {
            Resume::Button(press) => press.data.as_deref(),
            _ => None,
        }
    }
}

/// Result of running a script up to its next suspension point.
#[derive(Debug)]
pub enum Step {
    /// Suspended; the actions are performed in order.
    Yield(Vec<Action>),
    /// Finished, optionally with one last action.
    Done(Option<Action>),
}

impl Step {
    pub fn done() -> Self {
        Self::Done(None)
    }

    pub fn finish(action: Action) -> Self {
        Self::Done(Some(action))
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// Splits the step into the actions to perform and whether the script ended.
    pub fn into_parts(self) -> (Vec<Action>, bool) {
        match self {
            Step::Yield(actions) => (actions, false),
            Step::Done(action) => (action.into_iter().collect(), true),
        }
    }
}

impl From<Action> for Step {
    fn from(action: Action) -> Self {
        Self::Yield(vec![action])
    }
}

impl From<Vec<Action>> for Step {
    fn from(actions: Vec<Action>) -> Self {
        Self::Yield(actions)
    }
}

/// A resumable dialogue procedure.
///
/// The driver calls [`Script::resume`] once with [`Resume::Start`] and then
/// once per correlated event. Errors met while performing the yielded actions
/// are delivered through [`Script::throw`]; returning `None` leaves the error
/// unhandled and ends the script.
pub trait Script: Send {
    fn resume(&mut self, input: Resume) -> Step;

    fn throw(&mut self, _err: &EngineError) -> Option<Step> {
        None
    }
}

pub type BoxedScript = Box<dyn Script>;

type Stage = Box<dyn FnOnce(Resume) -> Step + Send>;
type Recover = Box<dyn FnMut(&EngineError) -> Option<Step> + Send>;

/// Linear script: every resumption runs the next stage. Once the stages run
/// out the script is done.
#[derive(Default)]
pub struct Sequence {
    stages: VecDeque<Stage>,
    recover: Option<Recover>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then<F>(mut self, stage: F) -> Self
    where
        F: FnOnce(Resume) -> Step + Send + 'static,
    {
        self.stages.push_back(Box::new(stage));
        self
    }

    pub fn on_error<F>(mut self, recover: F) -> Self
    where
        F: FnMut(&EngineError) -> Option<Step> + Send + 'static,
    {
        self.recover = Some(Box::new(recover));
        self
    }

    pub fn remaining(&self) -> usize {
        self.stages.len()
    }

    pub fn boxed(self) -> BoxedScript {
        Box::new(self)
    }
}

impl Script for Sequence {
    fn resume(&mut self, input: Resume) -> Step {
        match self.stages.pop_front() {
            Some(stage) => stage(input),
            None => Step::done(),
        }
    }

    fn throw(&mut self, err: &EngineError) -> Option<Step> {
        self.recover.as_mut().and_then(|recover| recover(err))
    }
}

/// Script driven by a single closure holding its own state.
pub struct FnScript<F>(F);

impl<F> FnScript<F>
where
    F: FnMut(Resume) -> Step + Send + 'static,
{
    pub fn boxed(f: F) -> BoxedScript {
        Box::new(Self(f))
    }
}

impl<F> Script for FnScript<F>
where
    F: FnMut(Resume) -> Step + Send,
{
    fn resume(&mut self, input: Resume) -> Step {
        (self.0)(input)
    }
}
