use std::str::FromStr;

use teloxide::utils::command::ParseError;

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("parse error: {0:?}")]
    ParseError(#[from] ParseError),
    #[error("failed to validate command: {0:?}")]
    ValidationError(String),
}

#[derive(Clone, Debug)]
pub struct BotCommand {
    command: String,
    args: Option<String>,
}

impl FromStr for BotCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (command, args) = s.split_once(' ').map_or((s, None), |s| (s.0, Some(s.1)));
        // `/start@my_bot` in group chats
        let command = command.split('@').next().unwrap_or(command);

        match command.strip_prefix('/') {
            Some(command) => Ok(Self {
                command: command.to_string(),
                args: args.map(str::to_string),
            }),
            None => Err(CommandError::ParseError(ParseError::IncorrectFormat(
                "Not a command".into(),
            ))),
        }
    }
}

impl BotCommand {
    pub fn from_validate(s: &str, cmds: &[&str]) -> Result<Self, CommandError> {
        let bc = Self::from_str(s)?;

        if !cmds.contains(&bc.command.as_str()) {
            return Err(CommandError::ValidationError(format!(
                "invalid command {}",
                bc.command
            )));
        };

        Ok(bc)
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> Option<&str> {
        self.args.as_deref()
    }
}

/// Commands that start a conversation script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptCommand {
    /// Reply-flow greeting.
    Start,
    /// Menu-flow counter, optionally seeded: `/menu 5`.
    Menu { start: i64 },
}

impl ScriptCommand {
    pub const NAMES: &'static [&'static str] = &["start", "menu"];
}

impl TryFrom<&BotCommand> for ScriptCommand {
    type Error = CommandError;

    fn try_from(bc: &BotCommand) -> Result<Self, Self::Error> {
        match bc.command() {
            "start" => Ok(Self::Start),
            "menu" => {
                let start = match bc.args().map(str::trim) {
                    None | Some("") => 0,
                    Some(arg) => arg.parse().map_err(|_| {
                        CommandError::ValidationError(format!("not a number: {arg}"))
                    })?,
                };
                Ok(Self::Menu { start })
            }
            other => Err(CommandError::ValidationError(format!(
                "invalid command {other}"
            ))),
        }
    }
}

impl FromStr for ScriptCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bc = BotCommand::from_validate(s, Self::NAMES)?;
        Self::try_from(&bc)
    }
}
