//! Dialogue steps and the context a transition runs in

use crate::request::{ItemField, Requester};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Where the dialogue currently is. A conversation without a session is
/// implicitly idle; there are no resting "sent" or "cancelled" steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    #[default]
    ChoosingCategory,
    ChoosingLocation,
    EnteringName,
    ChoosingUnit,
    EnteringQuantity,
    ChoosingModule,
    PickingItemDate,
    AttachmentChoice,
    FileInput,
    LinkInput,
    AskAddMore,
    ReviewMenu,
    SelectItemToEdit,
    SelectItemToDelete,
    PickFieldToEdit,
    EditName,
    EditUnit,
    EditQuantity,
    EditModule,
    EditDate,
    EditAttachmentChoice,
    EditFileInput,
    EditLinkInput,
    PickGlobalDate,
    ConfirmSend,
    ChoosingDestination,
}

impl Step {
    #[cfg(test)]
    pub const ALL: [Step; 26] = [
        Step::ChoosingCategory,
        Step::ChoosingLocation,
        Step::EnteringName,
        Step::ChoosingUnit,
        Step::EnteringQuantity,
        Step::ChoosingModule,
        Step::PickingItemDate,
        Step::AttachmentChoice,
        Step::FileInput,
        Step::LinkInput,
        Step::AskAddMore,
        Step::ReviewMenu,
        Step::SelectItemToEdit,
        Step::SelectItemToDelete,
        Step::PickFieldToEdit,
        Step::EditName,
        Step::EditUnit,
        Step::EditQuantity,
        Step::EditModule,
        Step::EditDate,
        Step::EditAttachmentChoice,
        Step::EditFileInput,
        Step::EditLinkInput,
        Step::PickGlobalDate,
        Step::ConfirmSend,
        Step::ChoosingDestination,
    ];

    /// Steps that operate on one committed item and therefore need an edit
    /// cursor
    #[cfg(test)]
    pub fn is_edit(self) -> bool {
        matches!(
            self,
            Step::PickFieldToEdit
                | Step::EditName
                | Step::EditUnit
                | Step::EditQuantity
                | Step::EditModule
                | Step::EditDate
                | Step::EditAttachmentChoice
                | Step::EditFileInput
                | Step::EditLinkInput
        )
    }

    /// Steps that wait for free text (or a file) rather than a choice
    pub fn expects_input(self) -> bool {
        matches!(
            self,
            Step::ChoosingLocation
                | Step::EnteringName
                | Step::EnteringQuantity
                | Step::FileInput
                | Step::LinkInput
                | Step::EditName
                | Step::EditQuantity
                | Step::EditFileInput
                | Step::EditLinkInput
        )
    }

    /// Steps showing a calendar
    pub fn shows_calendar(self) -> bool {
        matches!(self, Step::PickingItemDate | Step::EditDate | Step::PickGlobalDate)
    }

    /// The edit step that changes `field`
    pub fn editing(field: ItemField) -> Step {
        match field {
            ItemField::Name => Step::EditName,
            ItemField::Unit => Step::EditUnit,
            ItemField::Quantity => Step::EditQuantity,
            ItemField::Module => Step::EditModule,
            ItemField::DueDate => Step::EditDate,
            ItemField::Attachments => Step::EditAttachmentChoice,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Step::ChoosingCategory => "choosing_category",
            Step::ChoosingLocation => "choosing_location",
            Step::EnteringName => "entering_name",
            Step::ChoosingUnit => "choosing_unit",
            Step::EnteringQuantity => "entering_quantity",
            Step::ChoosingModule => "choosing_module",
            Step::PickingItemDate => "picking_item_date",
            Step::AttachmentChoice => "attachment_choice",
            Step::FileInput => "file_input",
            Step::LinkInput => "link_input",
            Step::AskAddMore => "ask_add_more",
            Step::ReviewMenu => "review_menu",
            Step::SelectItemToEdit => "select_item_to_edit",
            Step::SelectItemToDelete => "select_item_to_delete",
            Step::PickFieldToEdit => "pick_field_to_edit",
            Step::EditName => "edit_name",
            Step::EditUnit => "edit_unit",
            Step::EditQuantity => "edit_quantity",
            Step::EditModule => "edit_module",
            Step::EditDate => "edit_date",
            Step::EditAttachmentChoice => "edit_attachment_choice",
            Step::EditFileInput => "edit_file_input",
            Step::EditLinkInput => "edit_link_input",
            Step::PickGlobalDate => "pick_global_date",
            Step::ConfirmSend => "confirm_send",
            Step::ChoosingDestination => "choosing_destination",
        }
    }
}

/// A configured place a finished request can be sent to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub id: String,
    pub label: String,
    pub webhook_url: String,
}

/// Everything a transition needs besides the session itself
#[derive(Debug, Clone)]
pub struct FlowContext {
    pub requester: Requester,
    /// Used to open calendars on the current month
    pub today: NaiveDate,
    pub destinations: Arc<[Destination]>,
}

impl FlowContext {
    pub fn new(requester: Requester, today: NaiveDate, destinations: Arc<[Destination]>) -> Self {
        Self {
            requester,
            today,
            destinations,
        }
    }

    pub fn destination(&self, id: &str) -> Option<&Destination> {
        self.destinations.iter().find(|d| d.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_names_are_unique() {
        let mut names: Vec<_> = Step::ALL.iter().map(|s| s.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Step::ALL.len());
    }

    #[test]
    fn test_every_field_has_an_edit_step() {
        for field in [
            ItemField::Name,
            ItemField::Unit,
            ItemField::Quantity,
            ItemField::Module,
            ItemField::DueDate,
            ItemField::Attachments,
        ] {
            assert!(Step::editing(field).is_edit());
        }
        assert!(!Step::SelectItemToEdit.is_edit());
    }
}
