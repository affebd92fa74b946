//! Line item types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::EditError;

// ============================================================================
// Enumerated choices
// ============================================================================

/// Unit of measure offered when entering an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "m")]
    Meter,
    #[serde(rename = "m2")]
    SquareMeter,
    #[serde(rename = "m3")]
    CubicMeter,
    #[serde(rename = "pcs")]
    Piece,
    #[serde(rename = "set")]
    Set,
    #[serde(rename = "unit")]
    ServiceUnit,
}

impl Unit {
    pub const ALL: [Unit; 6] = [
        Unit::Meter,
        Unit::SquareMeter,
        Unit::CubicMeter,
        Unit::Piece,
        Unit::Set,
        Unit::ServiceUnit,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Unit::Meter => "m",
            Unit::SquareMeter => "m2",
            Unit::CubicMeter => "m3",
            Unit::Piece => "pcs",
            Unit::Set => "set",
            Unit::ServiceUnit => "unit",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.token() == token)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Module (section) tag, numbered 1 through 18
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ItemModule(u8);

impl ItemModule {
    pub const MAX: u8 = 18;

    pub fn new(number: u8) -> Option<Self> {
        (1..=Self::MAX).contains(&number).then_some(Self(number))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = ItemModule> {
        (1..=Self::MAX).map(ItemModule)
    }

    pub fn token(self) -> String {
        self.0.to_string()
    }

    /// Tokens are the bare number, without leading zeros.
    pub fn from_token(token: &str) -> Option<Self> {
        if token.starts_with('0') {
            return None;
        }
        token.parse::<u8>().ok().and_then(Self::new)
    }
}

impl TryFrom<u8> for ItemModule {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("module must be 1..={}, got {value}", Self::MAX))
    }
}

impl From<ItemModule> for u8 {
    fn from(module: ItemModule) -> Self {
        module.0
    }
}

impl fmt::Display for ItemModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Attachments
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    File,
    Link,
}

/// A file or link attached to a line item. Only the locator is kept, never
/// the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    /// Transport file id for files, the URL for links
    pub locator: String,
    /// Original file name, when the transport supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Attachment {
    pub fn file(locator: impl Into<String>, name: Option<String>) -> Self {
        Self {
            kind: AttachmentKind::File,
            locator: locator.into(),
            name,
        }
    }

    pub fn link(url: impl Into<String>) -> Self {
        Self {
            kind: AttachmentKind::Link,
            locator: url.into(),
            name: None,
        }
    }

    /// Short human description: the file name for files, the URL for links
    pub fn describe(&self) -> &str {
        match self.kind {
            AttachmentKind::File => self.name.as_deref().unwrap_or("file"),
            AttachmentKind::Link => &self.locator,
        }
    }
}

// ============================================================================
// Line items
// ============================================================================

/// A committed line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub unit: Unit,
    pub quantity: f64,
    pub module: ItemModule,
    /// Own due date; unset falls back to the header's global date when rendered
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Editable item fields, as addressed by the edit cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemField {
    Name,
    Unit,
    Quantity,
    Module,
    DueDate,
    Attachments,
}

impl ItemField {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemField::Name => "name",
            ItemField::Unit => "unit",
            ItemField::Quantity => "quantity",
            ItemField::Module => "module",
            ItemField::DueDate => "due date",
            ItemField::Attachments => "attachments",
        }
    }
}

/// New value for a single scalar item field
#[derive(Debug, Clone, PartialEq)]
pub enum ItemValue {
    Name(String),
    Unit(Unit),
    Quantity(f64),
    Module(ItemModule),
    DueDate(Option<NaiveDate>),
}

/// Parse a user-entered quantity. A decimal comma is accepted.
pub fn parse_quantity(text: &str) -> Result<f64, EditError> {
    let normalized = text.trim().replace(',', ".");
    let value: f64 = normalized
        .parse()
        .map_err(|_| EditError::invalid(ItemField::Quantity, format!("'{}' is not a number", text.trim())))?;
    validate_quantity(value)?;
    Ok(value)
}

pub(crate) fn validate_quantity(value: f64) -> Result<(), EditError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(EditError::invalid(
            ItemField::Quantity,
            "must be a number greater than zero",
        ));
    }
    Ok(())
}

pub(crate) fn validate_name(name: &str) -> Result<String, EditError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(EditError::invalid(ItemField::Name, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// An item being assembled before commit. Kept apart from committed items so
/// a half-filled draft can never show up in the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftItem {
    pub name: Option<String>,
    pub unit: Option<Unit>,
    pub quantity: Option<f64>,
    pub module: Option<ItemModule>,
    pub due_date: Option<NaiveDate>,
}

impl DraftItem {
    pub fn is_empty(&self) -> bool {
        *self == DraftItem::default()
    }

    /// Turn the draft into a committed item. Fails if any required field is
    /// still missing; the draft itself is not consumed on failure.
    pub fn complete(&self, attachments: Vec<Attachment>) -> Result<LineItem, EditError> {
        let missing = |field| EditError::invalid(field, "not entered yet");
        Ok(LineItem {
            name: self.name.clone().ok_or_else(|| missing(ItemField::Name))?,
            unit: self.unit.ok_or_else(|| missing(ItemField::Unit))?,
            quantity: self.quantity.ok_or_else(|| missing(ItemField::Quantity))?,
            module: self.module.ok_or_else(|| missing(ItemField::Module))?,
            due_date: self.due_date,
            attachments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_accepts_decimal_comma() {
        let q = parse_quantity("12,5").unwrap();
        assert!((q - 12.5).abs() < f64::EPSILON);
        let q = parse_quantity(" 3 ").unwrap();
        assert!((q - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_quantity_rejects_garbage_and_non_positive() {
        for bad in ["abc", "", "0", "-1", "NaN", "inf", "1e400"] {
            assert!(
                matches!(parse_quantity(bad), Err(EditError::InvalidFieldValue { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_module_tokens() {
        assert_eq!(ItemModule::from_token("3").map(ItemModule::number), Some(3));
        assert_eq!(ItemModule::from_token("18").map(ItemModule::number), Some(18));
        assert!(ItemModule::from_token("0").is_none());
        assert!(ItemModule::from_token("19").is_none());
        assert!(ItemModule::from_token("03").is_none());
        assert_eq!(ItemModule::all().count(), 18);
    }

    #[test]
    fn test_unit_round_trips_through_token_and_serde() {
        for unit in Unit::ALL {
            assert_eq!(Unit::from_token(unit.token()), Some(unit));
            let json = serde_json::to_string(&unit).unwrap();
            assert_eq!(json, format!("\"{}\"", unit.token()));
        }
    }

    #[test]
    fn test_incomplete_draft_does_not_complete() {
        let draft = DraftItem {
            name: Some("Cable".into()),
            unit: Some(Unit::Meter),
            ..DraftItem::default()
        };
        let err = draft.complete(vec![]).unwrap_err();
        assert!(matches!(
            err,
            EditError::InvalidFieldValue {
                field: ItemField::Quantity,
                ..
            }
        ));
    }

    #[test]
    fn test_attachment_description() {
        assert_eq!(Attachment::file("abc", Some("plan.pdf".into())).describe(), "plan.pdf");
        assert_eq!(Attachment::file("abc", None).describe(), "file");
        assert_eq!(
            Attachment::link("https://example.com/x").describe(),
            "https://example.com/x"
        );
    }
}
