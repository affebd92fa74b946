//! The request record under construction
//!
//! Header attributes plus an ordered list of committed line items. Every
//! mutation validates its input first and then applies in one step, so a
//! rejected edit leaves the record exactly as it was.

mod item;
mod summary;

pub use item::{
    parse_quantity, Attachment, AttachmentKind, DraftItem, ItemField, ItemModule, ItemValue,
    LineItem, Unit,
};
pub use summary::{format_date, render_summary, split_message, MESSAGE_LIMIT};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from the edit engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("item {index} does not exist (request has {len} items)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("invalid {}: {reason}", .field.as_str())]
    InvalidFieldValue { field: ItemField, reason: String },
    #[error("location must not be empty")]
    EmptyLocation,
}

impl EditError {
    pub fn invalid(field: ItemField, reason: impl Into<String>) -> Self {
        EditError::InvalidFieldValue {
            field,
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Header
// ============================================================================

/// Project category chosen first in the dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Apartment,
    Office,
    Other,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Apartment, Category::Office, Category::Other];

    pub fn token(self) -> &'static str {
        match self {
            Category::Apartment => "apartment",
            Category::Office => "office",
            Category::Other => "other",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Apartment => "Apartment",
            Category::Office => "Office",
            Category::Other => "Other",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.token() == token)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Who is filing the request, as reported by the transport
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl Requester {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: None,
            username: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or("N/A")
    }

    /// `@username` when known, otherwise the raw id
    pub fn handle(&self) -> String {
        match &self.username {
            Some(username) => format!("@{username}"),
            None => self.id.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub category: Option<Category>,
    pub location: Option<String>,
    pub requester: Requester,
    pub global_due_date: Option<NaiveDate>,
}

/// A header attribute update
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderField {
    Category(Category),
    Location(String),
    GlobalDueDate(NaiveDate),
}

// ============================================================================
// Aggregate
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestAggregate {
    pub header: Header,
    items: Vec<LineItem>,
}

impl RequestAggregate {
    pub fn new(requester: Requester) -> Self {
        Self {
            header: Header {
                requester,
                ..Header::default()
            },
            items: Vec::new(),
        }
    }

    /// Committed items in presentation order
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Result<&LineItem, EditError> {
        self.items.get(index).ok_or(EditError::IndexOutOfRange {
            index,
            len: self.items.len(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Set a header attribute. Returns the number of items whose due date was
    /// backfilled (only non-zero for the global due date).
    ///
    /// The global date is a one-time backfill: it fills items with no own
    /// date at this moment and never overrides a date an item already has.
    pub fn set_header_field(&mut self, field: HeaderField) -> Result<usize, EditError> {
        match field {
            HeaderField::Category(category) => {
                self.header.category = Some(category);
                Ok(0)
            }
            HeaderField::Location(location) => {
                let trimmed = location.trim();
                if trimmed.is_empty() {
                    return Err(EditError::EmptyLocation);
                }
                self.header.location = Some(trimmed.to_string());
                Ok(0)
            }
            HeaderField::GlobalDueDate(date) => {
                self.header.global_due_date = Some(date);
                let mut filled = 0;
                for item in self.items.iter_mut().filter(|i| i.due_date.is_none()) {
                    item.due_date = Some(date);
                    filled += 1;
                }
                Ok(filled)
            }
        }
    }

    pub fn append_item(&mut self, line: LineItem) -> Result<(), EditError> {
        let name = item::validate_name(&line.name)?;
        item::validate_quantity(line.quantity)?;
        self.items.push(LineItem { name, ..line });
        Ok(())
    }

    /// Remove an item; later items shift down by one, keeping their order.
    pub fn delete_item(&mut self, index: usize) -> Result<LineItem, EditError> {
        self.check_index(index)?;
        Ok(self.items.remove(index))
    }

    pub fn set_item_field(&mut self, index: usize, value: ItemValue) -> Result<(), EditError> {
        self.check_index(index)?;
        // Validate before touching the item
        let value = match value {
            ItemValue::Name(name) => ItemValue::Name(item::validate_name(&name)?),
            ItemValue::Quantity(q) => {
                item::validate_quantity(q)?;
                ItemValue::Quantity(q)
            }
            other => other,
        };
        let line = &mut self.items[index];
        match value {
            ItemValue::Name(name) => line.name = name,
            ItemValue::Unit(unit) => line.unit = unit,
            ItemValue::Quantity(q) => line.quantity = q,
            ItemValue::Module(module) => line.module = module,
            ItemValue::DueDate(date) => line.due_date = date,
        }
        Ok(())
    }

    /// Swap an item's attachment list for a new one wholesale
    pub fn replace_item_attachments(
        &mut self,
        index: usize,
        attachments: Vec<Attachment>,
    ) -> Result<(), EditError> {
        self.check_index(index)?;
        self.items[index].attachments = attachments;
        Ok(())
    }

    /// The date to render for an item: its own, else the global date
    pub fn effective_due_date(&self, item: &LineItem) -> Option<NaiveDate> {
        item.due_date.or(self.header.global_due_date)
    }

    /// All attachments in item order
    pub fn attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.items.iter().flat_map(|item| item.attachments.iter())
    }

    fn check_index(&self, index: usize) -> Result<(), EditError> {
        if index >= self.items.len() {
            return Err(EditError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn item(name: &str) -> LineItem {
        LineItem {
            name: name.to_string(),
            unit: Unit::Piece,
            quantity: 1.0,
            module: ItemModule::new(1).unwrap(),
            due_date: None,
            attachments: vec![],
        }
    }

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn aggregate_with(names: &[&str]) -> RequestAggregate {
        let mut agg = RequestAggregate::new(Requester::new("42"));
        for name in names {
            agg.append_item(item(name)).unwrap();
        }
        agg
    }
}
