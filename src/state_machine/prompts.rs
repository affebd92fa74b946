//! Prompt texts and choice menus for every step

use super::effect::{Choice, Prompt};
use super::state::{Destination, FlowContext, Step};
use super::tokens;
use crate::calendar::{self, YearMonth};
use crate::request::{
    format_date, render_summary, split_message, Attachment, Category, ItemField, ItemModule,
    LineItem, RequestAggregate, Unit, MESSAGE_LIMIT,
};
use crate::session::Session;
use std::fmt::Write;

const MODULES_PER_ROW: usize = 6;
const UNITS_PER_ROW: usize = 3;

pub const UNROUTABLE: &str =
    "Sorry, I did not understand that. Please use the offered choices, or send /cancel to stop.";

fn cancel_row() -> Vec<Choice> {
    vec![Choice::new("Cancel request", tokens::CANCEL)]
}

fn back_row() -> Vec<Choice> {
    vec![Choice::new("Back", tokens::BACK)]
}

/// Prefix a step's usual prompt with a correction
pub fn corrective(message: &str, base: Prompt) -> Prompt {
    Prompt {
        text: format!("{message}\n\n{}", base.text),
        choices: base.choices,
    }
}

// ============================================================================
// Session lifecycle
// ============================================================================

pub fn welcome() -> Prompt {
    corrective("Hello! I will help you put together a supply request.", category())
}

pub fn already_in_progress() -> Prompt {
    Prompt::text(
        "A request is already in progress. Finish it or send /cancel to start over.",
    )
}

pub fn cancelled() -> Prompt {
    Prompt::text("Request cancelled. Send /start to begin a new one.")
}

pub fn nothing_to_cancel() -> Prompt {
    Prompt::text("There is no active request to cancel.")
}

pub fn sending(destination: &Destination) -> Prompt {
    Prompt::text(format!("Sending the request to {}...", destination.label))
}

pub fn sent(destination: &Destination) -> Prompt {
    Prompt::text(format!(
        "Request sent to {}. Send /start to create another one.",
        destination.label
    ))
}

pub fn delivery_failed(error: &str) -> Prompt {
    Prompt::text(format!(
        "Sending failed: {error}\nThe request was discarded. Send /start to create it again."
    ))
}

// ============================================================================
// Header and item entry
// ============================================================================

pub fn category() -> Prompt {
    Prompt::text("Choose the project type:")
        .with_rows(
            Category::ALL
                .iter()
                .map(|c| vec![Choice::new(c.label(), c.token())]),
        )
        .with_row(cancel_row())
}

pub fn location(category: Option<Category>) -> Prompt {
    let text = match category {
        Some(category) => format!("Project: {category}\nEnter the location (object) name:"),
        None => "Enter the location (object) name:".to_string(),
    };
    Prompt::text(text).with_row(cancel_row())
}

pub fn item_name() -> Prompt {
    Prompt::text("Enter the item name:").with_row(cancel_row())
}

fn unit_rows() -> Vec<Vec<Choice>> {
    Unit::ALL
        .chunks(UNITS_PER_ROW)
        .map(|row| row.iter().map(|u| Choice::new(u.token(), u.token())).collect())
        .collect()
}

fn module_rows() -> Vec<Vec<Choice>> {
    let modules: Vec<ItemModule> = ItemModule::all().collect();
    modules
        .chunks(MODULES_PER_ROW)
        .map(|row| {
            row.iter()
                .map(|m| Choice::new(m.to_string(), m.token()))
                .collect()
        })
        .collect()
}

pub fn unit() -> Prompt {
    Prompt::text("Choose the unit of measure:")
        .with_rows(unit_rows())
        .with_row(back_row())
        .with_row(cancel_row())
}

pub fn quantity() -> Prompt {
    Prompt::text("Enter the quantity (a number, e.g. 12.5):").with_row(cancel_row())
}

pub fn module() -> Prompt {
    Prompt::text("Choose the module:")
        .with_rows(module_rows())
        .with_row(cancel_row())
}

fn calendar(text: &str, month: YearMonth, extra: Vec<Choice>) -> Prompt {
    let grid = calendar::render(month);
    let rows = grid.rows().into_iter().map(|row| {
        row.into_iter()
            .map(|cell| Choice::new(cell.label, cell.token.encode()))
            .collect()
    });
    Prompt::text(text)
        .with_rows(rows)
        .with_row(extra)
        .with_row(cancel_row())
}

pub fn item_date(month: YearMonth) -> Prompt {
    calendar(
        "Choose the delivery date for this item:",
        month,
        vec![Choice::new("No date", tokens::SKIP_DATE)],
    )
}

fn attachment_list(text: &mut String, attachments: &[Attachment]) {
    for (i, attachment) in attachments.iter().enumerate() {
        let _ = write!(text, "\n{}. {}", i + 1, attachment.describe());
    }
}

pub fn attachment_choice(collected: &[Attachment]) -> Prompt {
    let mut text = if collected.is_empty() {
        "Attach a file or a link to this item?".to_string()
    } else {
        "Attached so far:".to_string()
    };
    attachment_list(&mut text, collected);
    let finish = if collected.is_empty() {
        "No attachments"
    } else {
        "Done, save item"
    };
    Prompt::text(text)
        .with_row(vec![
            Choice::new("Attach file", tokens::ATTACH_FILE),
            Choice::new("Attach link", tokens::ATTACH_LINK),
        ])
        .with_row(vec![Choice::new(finish, tokens::FINISH)])
        .with_row(cancel_row())
}

pub fn file_input() -> Prompt {
    Prompt::text("Send the file (document or photo):").with_row(cancel_row())
}

pub fn link_input() -> Prompt {
    Prompt::text("Send the link (http:// or https://):").with_row(cancel_row())
}

pub fn add_more(count: usize) -> Prompt {
    Prompt::text(format!(
        "Item saved. The request has {count} item(s). Add another one?"
    ))
    .with_row(vec![
        Choice::new("Add item", tokens::ADD_MORE),
        Choice::new("Review request", tokens::REVIEW),
    ])
    .with_row(cancel_row())
}

// ============================================================================
// Review and editing
// ============================================================================

pub fn review_menu() -> Prompt {
    Prompt::text("What would you like to do?")
        .with_row(vec![
            Choice::new("Edit item", tokens::EDIT_ITEM),
            Choice::new("Add item", tokens::ADD_ITEM),
        ])
        .with_row(vec![
            Choice::new("Delete item", tokens::DELETE_ITEM),
            Choice::new("Set date for all", tokens::SET_GLOBAL_DATE),
        ])
        .with_row(vec![Choice::new("Send request", tokens::SEND)])
        .with_row(cancel_row())
}

fn summary_chunks(request: &RequestAggregate) -> impl Iterator<Item = Prompt> {
    split_message(&render_summary(request), MESSAGE_LIMIT)
        .into_iter()
        .map(Prompt::text)
}

/// The full summary, split to fit the transport, followed by the menu
pub fn review(request: &RequestAggregate) -> Vec<Prompt> {
    summary_chunks(request).chain([review_menu()]).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemListPurpose {
    Edit,
    Delete,
}

pub fn item_list(request: &RequestAggregate, purpose: ItemListPurpose) -> Prompt {
    let text = match purpose {
        ItemListPurpose::Edit => "Which item do you want to edit?",
        ItemListPurpose::Delete => "Which item do you want to delete?",
    };
    let rows = request.items().iter().enumerate().map(|(i, item)| {
        vec![Choice::new(
            format!("{}. {} ({} {})", i + 1, item.name, item.quantity, item.unit),
            tokens::item(i),
        )]
    });
    Prompt::text(text)
        .with_rows(rows)
        .with_row(back_row())
        .with_row(cancel_row())
}

pub fn field_menu(index: usize, item: &LineItem) -> Prompt {
    let date = item
        .due_date
        .map_or_else(|| "not set".to_string(), format_date);
    let mut text = format!(
        "Item {}: {}\nUnit: {}\nQuantity: {}\nModule: {}\nDelivery date: {date}",
        index + 1,
        item.name,
        item.unit,
        item.quantity,
        item.module,
    );
    if !item.attachments.is_empty() {
        text.push_str("\nAttachments:");
        attachment_list(&mut text, &item.attachments);
    }
    text.push_str("\n\nWhat do you want to change?");

    let field = |label: &str, f: ItemField| Choice::new(label, tokens::field(f));
    Prompt::text(text)
        .with_row(vec![
            field("Name", ItemField::Name),
            field("Unit", ItemField::Unit),
        ])
        .with_row(vec![
            field("Quantity", ItemField::Quantity),
            field("Module", ItemField::Module),
        ])
        .with_row(vec![
            field("Delivery date", ItemField::DueDate),
            field("Attachments", ItemField::Attachments),
        ])
        .with_row(back_row())
        .with_row(cancel_row())
}

pub fn edit_name(item: &LineItem) -> Prompt {
    Prompt::text(format!("Current name: {}\nEnter the new name:", item.name))
        .with_row(back_row())
        .with_row(cancel_row())
}

pub fn edit_unit(item: &LineItem) -> Prompt {
    Prompt::text(format!("Current unit: {}\nChoose the new unit:", item.unit))
        .with_rows(unit_rows())
        .with_row(back_row())
        .with_row(cancel_row())
}

pub fn edit_quantity(item: &LineItem) -> Prompt {
    Prompt::text(format!(
        "Current quantity: {}\nEnter the new quantity:",
        item.quantity
    ))
    .with_row(back_row())
    .with_row(cancel_row())
}

pub fn edit_module(item: &LineItem) -> Prompt {
    Prompt::text(format!("Current module: {}\nChoose the new module:", item.module))
        .with_rows(module_rows())
        .with_row(back_row())
        .with_row(cancel_row())
}

pub fn edit_date(month: YearMonth) -> Prompt {
    calendar(
        "Choose the new delivery date:",
        month,
        vec![
            Choice::new("Clear date", tokens::CLEAR_DATE),
            Choice::new("Back", tokens::BACK),
        ],
    )
}

pub fn edit_attachments(collected: &[Attachment], current: &[Attachment]) -> Prompt {
    let mut text = String::from("Current attachments:");
    if current.is_empty() {
        text.push_str(" none");
    }
    attachment_list(&mut text, current);
    if collected.is_empty() {
        text.push_str("\n\nAttach new files or links to replace them, or keep the current ones.");
    } else {
        text.push_str("\n\nNew attachments:");
        attachment_list(&mut text, collected);
    }
    Prompt::text(text)
        .with_row(vec![
            Choice::new("Attach file", tokens::ATTACH_FILE),
            Choice::new("Attach link", tokens::ATTACH_LINK),
        ])
        .with_row(vec![
            Choice::new("Save new list", tokens::FINISH),
            Choice::new("Keep current", tokens::KEEP),
        ])
        .with_row(back_row())
        .with_row(cancel_row())
}

pub fn global_date(month: YearMonth) -> Prompt {
    calendar(
        "Choose a delivery date for the whole request. Items without their own date will get it:",
        month,
        vec![Choice::new("Back", tokens::BACK)],
    )
}

/// Calendar for a date-picking step, opened on `month`
pub fn date_step(step: Step, month: YearMonth) -> Option<Prompt> {
    match step {
        Step::PickingItemDate => Some(item_date(month)),
        Step::EditDate => Some(edit_date(month)),
        Step::PickGlobalDate => Some(global_date(month)),
        _ => None,
    }
}

// ============================================================================
// Sending
// ============================================================================

pub fn confirm_menu() -> Prompt {
    Prompt::text("Is everything correct?")
        .with_row(vec![
            Choice::new("Confirm", tokens::CONFIRM),
            Choice::new("Back", tokens::BACK),
        ])
        .with_row(cancel_row())
}

pub fn confirm_send(request: &RequestAggregate) -> Vec<Prompt> {
    summary_chunks(request).chain([confirm_menu()]).collect()
}

pub fn destinations(destinations: &[Destination]) -> Prompt {
    Prompt::text("Where should the request be sent?")
        .with_rows(
            destinations
                .iter()
                .map(|d| vec![Choice::new(d.label.clone(), tokens::destination(&d.id))]),
        )
        .with_row(back_row())
        .with_row(cancel_row())
}

/// The usual prompt for the session's current step, used when re-prompting
pub fn for_step(session: &Session, ctx: &FlowContext) -> Prompt {
    let this_month = YearMonth::of(ctx.today);
    let edited = session
        .edit_cursor
        .and_then(|cursor| session.aggregate.item(cursor.index).ok());

    match (session.step, edited) {
        (Step::ChoosingCategory, _) => category(),
        (Step::ChoosingLocation, _) => location(session.aggregate.header.category),
        (Step::EnteringName, _) => item_name(),
        (Step::ChoosingUnit, _) => unit(),
        (Step::EnteringQuantity, _) => quantity(),
        (Step::ChoosingModule, _) => module(),
        (Step::PickingItemDate, _) => item_date(this_month),
        (Step::AttachmentChoice, _) => attachment_choice(session.attachments.entries()),
        (Step::FileInput | Step::EditFileInput, _) => file_input(),
        (Step::LinkInput | Step::EditLinkInput, _) => link_input(),
        (Step::AskAddMore, _) => add_more(session.aggregate.len()),
        (Step::SelectItemToEdit, _) => item_list(&session.aggregate, ItemListPurpose::Edit),
        (Step::SelectItemToDelete, _) => item_list(&session.aggregate, ItemListPurpose::Delete),
        (Step::PickGlobalDate, _) => global_date(this_month),
        (Step::ConfirmSend, _) => confirm_menu(),
        (Step::ChoosingDestination, _) => destinations(&ctx.destinations),
        (Step::EditDate, _) => edit_date(this_month),
        (Step::PickFieldToEdit, Some(item)) => {
            let index = session.edit_cursor.map_or(0, |c| c.index);
            field_menu(index, item)
        }
        (Step::EditName, Some(item)) => edit_name(item),
        (Step::EditUnit, Some(item)) => edit_unit(item),
        (Step::EditQuantity, Some(item)) => edit_quantity(item),
        (Step::EditModule, Some(item)) => edit_module(item),
        (Step::EditAttachmentChoice, Some(item)) => {
            edit_attachments(session.attachments.entries(), &item.attachments)
        }
        (Step::ReviewMenu, _) | (_, None) => review_menu(),
    }
}
