//! Choice tokens carried by buttons
//!
//! Plain menu actions are fixed strings. Parameterised choices use a
//! `prefix:value` form so one step can offer a variable number of them.

use crate::request::ItemField;

pub const CANCEL: &str = "cancel";
pub const BACK: &str = "back";

pub const SKIP_DATE: &str = "skip_date";
pub const CLEAR_DATE: &str = "clear_date";

pub const ATTACH_FILE: &str = "attach_file";
pub const ATTACH_LINK: &str = "attach_link";
pub const FINISH: &str = "finish";
pub const KEEP: &str = "keep";

pub const ADD_MORE: &str = "add_more";
pub const REVIEW: &str = "review";

pub const EDIT_ITEM: &str = "edit_item";
pub const ADD_ITEM: &str = "add_item";
pub const DELETE_ITEM: &str = "delete_item";
pub const SET_GLOBAL_DATE: &str = "set_global_date";
pub const SEND: &str = "send";
pub const CONFIRM: &str = "confirm";

const ITEM_PREFIX: &str = "item:";
const FIELD_PREFIX: &str = "field:";
const DEST_PREFIX: &str = "dest:";

/// Token selecting the item at zero-based `index`
pub fn item(index: usize) -> String {
    format!("{ITEM_PREFIX}{index}")
}

pub fn parse_item(token: &str) -> Option<usize> {
    let rest = token.strip_prefix(ITEM_PREFIX)?;
    if rest.len() > 1 && rest.starts_with('0') {
        return None;
    }
    rest.parse().ok()
}

pub fn field(field: ItemField) -> String {
    let name = match field {
        ItemField::Name => "name",
        ItemField::Unit => "unit",
        ItemField::Quantity => "quantity",
        ItemField::Module => "module",
        ItemField::DueDate => "date",
        ItemField::Attachments => "attachments",
    };
    format!("{FIELD_PREFIX}{name}")
}

pub fn parse_field(token: &str) -> Option<ItemField> {
    match token.strip_prefix(FIELD_PREFIX)? {
        "name" => Some(ItemField::Name),
        "unit" => Some(ItemField::Unit),
        "quantity" => Some(ItemField::Quantity),
        "module" => Some(ItemField::Module),
        "date" => Some(ItemField::DueDate),
        "attachments" => Some(ItemField::Attachments),
        _ => None,
    }
}

pub fn destination(id: &str) -> String {
    format!("{DEST_PREFIX}{id}")
}

pub fn parse_destination(token: &str) -> Option<&str> {
    token.strip_prefix(DEST_PREFIX).filter(|id| !id.is_empty())
}
