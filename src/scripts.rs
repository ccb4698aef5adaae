//! Dialogues the host binary offers out of the box.

use log::warn;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::{
    action::{Action, AnswerOptions},
    buttons_markup,
    script::{BoxedScript, FnScript, Resume, Script, Step},
    EngineError,
};

const YES: &str = "YES";
const NO: &str = "NO";
const INC: &str = "INC";
const DEC: &str = "DEC";
const DONE: &str = "DONE";

fn yes_no() -> InlineKeyboardMarkup {
    buttons_markup!([
        InlineKeyboardButton::callback("Yes", YES),
        InlineKeyboardButton::callback("No", NO)
    ])
}

/// Asks for a name, then offers to continue with [`Questionnaire`].
#[derive(Default)]
pub struct Greeting {
    name: Option<String>,
}

pub fn greeting() -> BoxedScript {
    Box::new(Greeting::default())
}

impl Script for Greeting {
    fn resume(&mut self, input: Resume) -> Step {
        match input {
            Resume::Start => Action::text_message("Hi! What is your name?").into(),
            Resume::Message(msg) => {
                let name = msg.text.unwrap_or_else(|| "stranger".to_string());
                let text = format!("Nice to meet you, {name}! Shall we go on?");
                self.name = Some(name);
                Action::inline_menu(text, yes_no()).into()
            }
            Resume::Button(press) => {
                let name = self.name.take().unwrap_or_default();
                match press.data.as_deref() {
                    Some(YES) => Step::finish(Action::switch_script(Box::new(
                        Questionnaire::new(name),
                    ))),
                    _ => vec![
                        Action::answer_query(AnswerOptions::default()),
                        Action::terminate_with(format!("See you, {name}!")),
                    ]
                    .into(),
                }
            }
        }
    }

    fn throw(&mut self, err: &EngineError) -> Option<Step> {
        warn!("Greeting for {:?} interrupted: {err}", self.name);
        None
    }
}

/// Takes over a menu press and keeps asking until it gets a number.
pub struct Questionnaire {
    name: String,
}

impl Questionnaire {
    pub fn new(name: String) -> Self {
        Self { name }
    }
}

impl Script for Questionnaire {
    fn resume(&mut self, input: Resume) -> Step {
        match input {
            Resume::Button(_) => vec![
                Action::answer_query(AnswerOptions::text("Nice!")),
                Action::update_menu(
                    InlineKeyboardMarkup::new(Vec::<Vec<InlineKeyboardButton>>::new()),
                    Some(format!("Nice to meet you, {}!", self.name)),
                ),
                Action::text_message(format!("How old are you, {}?", self.name)),
            ]
            .into(),
            Resume::Message(msg) => {
                let age = msg.text.as_deref().map(|t| t.trim().parse::<u8>());
                match age {
                    Some(Ok(age)) => Step::finish(Action::terminate_with(format!(
                        "Got it, {} is {age}.",
                        self.name
                    ))),
                    _ => Action::text_message("Please send your age as a number.").into(),
                }
            }
            Resume::Start => Action::text_message(format!("How old are you, {}?", self.name)).into(),
        }
    }
}

fn counter_keyboard() -> InlineKeyboardMarkup {
    buttons_markup!(
        [
            InlineKeyboardButton::callback("-", DEC),
            InlineKeyboardButton::callback("+", INC)
        ],
        [InlineKeyboardButton::callback("Done", DONE)]
    )
}

/// Menu with a number the user moves up and down.
pub fn counter(start: i64) -> BoxedScript {
    let mut count = start;
    FnScript::boxed(move |input| match input.data() {
        None => Action::inline_menu(format!("Count: {count}"), counter_keyboard()).into(),
        Some(DONE) => Step::finish(Action::terminate_with(format!("Final count: {count}"))),
        Some(data) => {
            match data {
                INC => count += 1,
                DEC => count -= 1,
                _ => {}
            }
            vec![
                Action::answer_query(AnswerOptions::default()),
                Action::update_menu(counter_keyboard(), Some(format!("Count: {count}"))),
            ]
            .into()
        }
    })
}
