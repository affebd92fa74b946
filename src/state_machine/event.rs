//! Events that drive the dialogue
//!
//! Raw transport input (text, files, commands, choice tokens) is decoded into
//! an `Event` once, at the boundary. The transition function never looks at
//! raw strings to decide what kind of input it got.

use super::tokens;
use crate::attachments::FileRef;
use crate::calendar::{CalendarToken, YearMonth};
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// `/start`
    Start,
    /// `/cancel` or the cancel choice
    Cancel,
    /// Free text from the user
    Text(String),
    /// A file upload
    File(FileRef),
    /// A menu choice that is not a calendar or cancel token
    Choice(String),
    /// A day picked in a calendar
    DateSelected(NaiveDate),
    /// Calendar page turned to this month
    MonthNav(YearMonth),
    /// Inert input such as calendar captions and padding
    Ignore,
    /// A slash command nobody handles
    UnknownCommand(String),
}

impl Event {
    /// Decode a choice token
    pub fn from_token(token: &str) -> Event {
        if token == tokens::CANCEL {
            return Event::Cancel;
        }
        match CalendarToken::decode(token) {
            Some(CalendarToken::Day(date)) => Event::DateSelected(date),
            Some(CalendarToken::Nav(month)) => Event::MonthNav(month),
            Some(CalendarToken::Noop) => Event::Ignore,
            None => Event::Choice(token.to_string()),
        }
    }

    /// Decode a command name, with or without the leading slash
    pub fn from_command(command: &str) -> Event {
        let name = command.trim().trim_start_matches('/');
        // Commands may carry a bot suffix, as in `/start@desk_bot`
        let name = name.split(['@', ' ']).next().unwrap_or_default();
        match name.to_ascii_lowercase().as_str() {
            "start" => Event::Start,
            "cancel" => Event::Cancel,
            _ => Event::UnknownCommand(name.to_string()),
        }
    }

    /// Decode a text message; slash-prefixed text is treated as a command
    pub fn from_text(text: &str) -> Event {
        if text.trim_start().starts_with('/') {
            Event::from_command(text)
        } else {
            Event::Text(text.to_string())
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Start => "start",
            Event::Cancel => "cancel",
            Event::Text(_) => "text",
            Event::File(_) => "file",
            Event::Choice(_) => "choice",
            Event::DateSelected(_) => "date_selected",
            Event::MonthNav(_) => "month_nav",
            Event::Ignore => "ignore",
            Event::UnknownCommand(_) => "unknown_command",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_token() {
        assert_eq!(Event::from_token("cancel"), Event::Cancel);
        assert_eq!(
            Event::from_token("cal:day:2025-03-10"),
            Event::DateSelected(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
        );
        assert_eq!(
            Event::from_token("cal:nav:2025-04"),
            Event::MonthNav(YearMonth::new(2025, 4).unwrap())
        );
        assert_eq!(Event::from_token("cal:noop"), Event::Ignore);
        assert_eq!(
            Event::from_token("attach_file"),
            Event::Choice("attach_file".into())
        );
        // A malformed calendar token is an ordinary, unmatched choice
        assert_eq!(
            Event::from_token("cal:day:2025-02-30"),
            Event::Choice("cal:day:2025-02-30".into())
        );
    }

    #[test]
    fn test_commands() {
        assert_eq!(Event::from_text("/start"), Event::Start);
        assert_eq!(Event::from_text("/cancel@desk_bot"), Event::Cancel);
        assert_eq!(Event::from_command("START"), Event::Start);
        assert_eq!(
            Event::from_text("/help"),
            Event::UnknownCommand("help".into())
        );
        assert_eq!(Event::from_text("Cable 3x2.5"), Event::Text("Cable 3x2.5".into()));
    }
}
