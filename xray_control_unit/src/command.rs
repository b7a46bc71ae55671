//! Line-oriented operator commands.
//!
//! Decodes one line of text into a [`Command`] and dispatches it to the
//! controller. Used by the controller binary's stdin loop.

use crate::controller::SafetyController;
use crate::error::ControllerError;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Decoded operator command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Arm the system.
    Arm,
    /// Disarm the system.
    Disarm,
    /// Run one exposure with the given shutter time.
    Expose(Duration),
    /// Start preview with an optional timeout.
    Preview(Option<Duration>),
    /// Stop preview.
    Stop,
    /// Clear a latched fault.
    Reset,
    /// Open the tray.
    Open,
    /// Close the tray.
    Close,
    /// Align the sample.
    Align,
    /// Rotate the stage one increment.
    Rotate,
    /// Home the rotation stage.
    Home,
    /// Print status.
    Status,
    /// Leave the command loop.
    Quit,
}

/// Command line could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Blank line.
    #[error("empty command")]
    Empty,
    /// Unknown verb.
    #[error("unknown command '{0}'")]
    Unknown(String),
    /// Required argument absent.
    #[error("'{0}' needs a duration in seconds")]
    MissingArgument(&'static str),
    /// Argument is not a positive, finite number of seconds.
    #[error("invalid duration '{0}'")]
    InvalidDuration(String),
    /// Extra tokens after the command.
    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),
}

fn parse_seconds(text: &str) -> Result<Duration, ParseError> {
    text.parse::<f64>()
        .ok()
        .filter(|s| *s > 0.0)
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
        .ok_or_else(|| ParseError::InvalidDuration(text.to_string()))
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(ParseError::Empty)?.to_ascii_lowercase();
        let arg = words.next();

        let cmd = match (verb.as_str(), arg) {
            ("expose", Some(s)) => Self::Expose(parse_seconds(s)?),
            ("expose", None) => return Err(ParseError::MissingArgument("expose")),
            ("preview", Some(s)) => Self::Preview(Some(parse_seconds(s)?)),
            ("preview", None) => Self::Preview(None),
            (_, Some(extra)) if is_known(&verb) => {
                return Err(ParseError::UnexpectedArgument(extra.to_string()));
            }
            ("arm", None) => Self::Arm,
            ("disarm", None) => Self::Disarm,
            ("stop", None) => Self::Stop,
            ("reset", None) => Self::Reset,
            ("open", None) => Self::Open,
            ("close", None) => Self::Close,
            ("align", None) => Self::Align,
            ("rotate", None) => Self::Rotate,
            ("home", None) => Self::Home,
            ("status", None) => Self::Status,
            ("quit" | "exit", None) => Self::Quit,
            _ => return Err(ParseError::Unknown(verb)),
        };
        if let Some(extra) = words.next() {
            return Err(ParseError::UnexpectedArgument(extra.to_string()));
        }
        Ok(cmd)
    }
}

fn is_known(verb: &str) -> bool {
    matches!(
        verb,
        "arm" | "disarm" | "stop" | "reset" | "open" | "close" | "align" | "rotate" | "home"
            | "status" | "quit" | "exit"
    )
}

impl Command {
    /// Run the command. Returns a one-line reply for the operator.
    pub fn execute(self, controller: &SafetyController) -> Result<String, ControllerError> {
        Ok(match self {
            Self::Arm => {
                controller.arm()?;
                "armed".to_string()
            }
            Self::Disarm => {
                controller.disarm()?;
                format!("disarmed ({})", controller.state())
            }
            Self::Expose(shutter) => format!("exposure {}", controller.expose(shutter)?),
            Self::Preview(timeout) => {
                controller.start_preview(timeout)?;
                match timeout {
                    Some(t) => format!("preview started ({:.1}s timeout)", t.as_secs_f64()),
                    None => "preview started".to_string(),
                }
            }
            Self::Stop => {
                controller.stop_preview()?;
                "preview stopped".to_string()
            }
            Self::Reset => {
                controller.reset_fault()?;
                "fault cleared".to_string()
            }
            Self::Open => format!("tray open ({} commands)", controller.open_tray()?),
            Self::Close => format!("tray closed ({} commands)", controller.close_tray()?),
            Self::Align => {
                let r = controller.align_sample()?;
                format!(
                    "aligned (origin after {} steps, traverse {})",
                    r.homing_steps, r.traverse_steps
                )
            }
            Self::Rotate => format!("rotated ({} steps)", controller.rotate_step()?),
            Self::Home => format!("rotation homed ({} steps)", controller.home_rotation()?),
            Self::Status => serde_json::to_string(&controller.status())
                .unwrap_or_else(|e| format!("status unavailable: {e}")),
            Self::Quit => "bye".to_string(),
        })
    }
}
