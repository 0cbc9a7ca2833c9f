//! Module `commands`
//!
//! Tokenizes one line of client input and maps it onto the fixed verb set
//! `USER`, `LIST`, `GET`, `PUT`, `DEL`, `QUIT`. Also defines the result types
//! returned by command handlers.

use std::fmt;

/// One input line split into a verb and up to two arguments.
///
/// Unused fields are empty strings; tokens after the third are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCommand {
    pub verb: String,
    pub arg1: String,
    pub arg2: String,
}

impl RawCommand {
    /// Splits on ASCII whitespace, so trailing `\n` and `\r\n` never reach a field.
    /// No quoting or escaping: arguments cannot contain whitespace.
    pub fn tokenize(raw: &str) -> Self {
        let mut tokens = raw.split_ascii_whitespace();
        let mut next = || tokens.next().unwrap_or_default().to_string();

        Self {
            verb: next(),
            arg1: next(),
            arg2: next(),
        }
    }

    /// Exact, case-sensitive verb match.
    pub fn into_command(self) -> Command {
        match self.verb.as_str() {
            "USER" => Command::User {
                username: self.arg1,
                password: self.arg2,
            },
            "LIST" => Command::List,
            "GET" => Command::Get(self.arg1),
            "PUT" => Command::Put(self.arg1),
            "DEL" => Command::Del(self.arg1),
            "QUIT" => Command::Quit,
            _ => Command::Unknown(self.verb),
        }
    }
}

/// A client request.
///
/// Filename arguments may be empty; handlers decide how to answer that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    User { username: String, password: String },
    List,
    Get(String),
    Put(String),
    Del(String),
    Quit,
    Unknown(String),
}

impl Command {
    /// Whether the command is rejected until the session authenticates
    pub fn requires_auth(&self) -> bool {
        matches!(
            self,
            Command::List | Command::Get(_) | Command::Put(_) | Command::Del(_)
        )
    }
}

/// Log-safe rendering: the password is never printed.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::User { username, .. } => write!(f, "USER {} ****", username),
            Command::List => write!(f, "LIST"),
            Command::Get(name) => write!(f, "GET {}", name),
            Command::Put(name) => write!(f, "PUT {}", name),
            Command::Del(name) => write!(f, "DEL {}", name),
            Command::Quit => write!(f, "QUIT"),
            Command::Unknown(verb) => write!(f, "unknown verb {:?}", verb),
        }
    }
}

/// Parses a raw command line received from a client into a `Command`.
pub fn parse_command(raw: &str) -> Command {
    RawCommand::tokenize(raw).into_command()
}

/// Represents the outcome status of executing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    Failure(String),
    CloseConnection,
}

/// Outcome of a command plus the status line still to be written.
///
/// `message` is `None` when the handler already streamed its whole
/// response (LIST, successful GET).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub status: CommandStatus,
    pub message: Option<String>,
}

impl CommandResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Success,
            message: Some(message.into()),
        }
    }

    pub fn failure(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Failure(reason.into()),
            message: Some(message.into()),
        }
    }

    pub fn streamed() -> Self {
        Self {
            status: CommandStatus::Success,
            message: None,
        }
    }

    pub fn close(message: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::CloseConnection,
            message: Some(message.into()),
        }
    }
}
