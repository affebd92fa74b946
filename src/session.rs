//! Per-conversation dialogue state

mod store;

pub use store::SessionStore;

use crate::attachments::AttachmentCollector;
use crate::request::{DraftItem, ItemField, RequestAggregate, Requester};
use crate::state_machine::state::Step;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one conversation (a chat, a user, whatever the transport
/// keys on)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Which committed item (and which of its fields) is being edited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditCursor {
    pub index: usize,
    /// Unset while the user is still picking a field
    pub field: Option<ItemField>,
}

impl EditCursor {
    pub fn at(index: usize) -> Self {
        Self { index, field: None }
    }
}

/// One conversation's in-progress request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub step: Step,
    pub aggregate: RequestAggregate,
    /// Set exactly while `step.is_edit()`
    pub edit_cursor: Option<EditCursor>,
    pub draft_item: DraftItem,
    /// Attachments collected for the draft or for the item under edit
    pub attachments: AttachmentCollector,
}

impl Session {
    pub fn new(requester: Requester) -> Self {
        Self {
            step: Step::ChoosingCategory,
            aggregate: RequestAggregate::new(requester),
            edit_cursor: None,
            draft_item: DraftItem::default(),
            attachments: AttachmentCollector::default(),
        }
    }

    pub fn has_items(&self) -> bool {
        !self.aggregate.is_empty()
    }

    /// Drop the edit cursor and any half-collected attachments
    pub fn leave_edit(&mut self) {
        self.edit_cursor = None;
        self.attachments.finish();
    }
}
