//! Effects produced by state transitions

use super::state::Destination;
use crate::request::RequestAggregate;
use serde::Serialize;

/// One selectable option in a prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub label: String,
    pub token: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            token: token.into(),
        }
    }
}

/// A message to the user, optionally with rows of choices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Vec<Choice>>,
}

impl Prompt {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            choices: Vec::new(),
        }
    }

    pub fn with_row(mut self, row: Vec<Choice>) -> Self {
        if !row.is_empty() {
            self.choices.push(row);
        }
        self
    }

    pub fn with_rows(mut self, rows: impl IntoIterator<Item = Vec<Choice>>) -> Self {
        for row in rows {
            self = self.with_row(row);
        }
        self
    }

    /// Every token offered, in display order
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.choices.iter().flatten().map(|c| c.token.as_str())
    }

    pub fn offers(&self, token: &str) -> bool {
        self.tokens().any(|t| t == token)
    }
}

/// Effects to be executed after a transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Send a message to the user
    Prompt(Prompt),

    /// Answer a button press without changing what the user sees
    Acknowledge,

    /// Render the finished request and send it to a destination
    Deliver {
        request: Box<RequestAggregate>,
        destination: Destination,
    },
}

impl Effect {
    pub fn deliver(request: RequestAggregate, destination: Destination) -> Self {
        Effect::Deliver {
            request: Box::new(request),
            destination,
        }
    }

    pub fn as_prompt(&self) -> Option<&Prompt> {
        match self {
            Effect::Prompt(prompt) => Some(prompt),
            _ => None,
        }
    }
}

impl From<Prompt> for Effect {
    fn from(prompt: Prompt) -> Self {
        Effect::Prompt(prompt)
    }
}
