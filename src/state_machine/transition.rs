//! Pure state transition function
//!
//! `transition` maps (session, event) to the next session and the effects to
//! run. It performs no I/O. Every failure is resolved in here: the caller
//! always gets a result with at least one effect.

use super::effect::{Effect, Prompt};
use super::event::Event;
use super::prompts::{self, ItemListPurpose};
use super::state::{FlowContext, Step};
use super::tokens;
use crate::attachments::{AttachmentError, AttachmentPayload};
use crate::calendar::YearMonth;
use crate::request::{
    format_date, parse_quantity, Category, DraftItem, EditError, HeaderField, ItemField,
    ItemModule, ItemValue, Unit,
};
use crate::session::{EditCursor, Session};
use thiserror::Error;

/// Result of a state transition. `session: None` means the conversation is
/// idle again (sent, cancelled, or never started).
#[derive(Debug)]
pub struct TransitionResult {
    pub session: Option<Session>,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn keep(session: Session) -> Self {
        Self {
            session: Some(session),
            effects: vec![],
        }
    }

    pub fn end() -> Self {
        Self {
            session: None,
            effects: vec![],
        }
    }

    /// Move the session to `step` and show `prompt`
    fn goto(mut session: Session, step: Step, prompt: Prompt) -> Self {
        session.step = step;
        Self::keep(session).with_prompt(prompt)
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_prompt(self, prompt: Prompt) -> Self {
        self.with_effect(Effect::Prompt(prompt))
    }

    pub fn with_prompts(mut self, prompts: impl IntoIterator<Item = Prompt>) -> Self {
        self.effects.extend(prompts.into_iter().map(Effect::Prompt));
        self
    }
}

/// Why an event could not be applied. Always recovered from inside
/// `transition`; never seen by callers.
#[derive(Debug, Error)]
enum FlowError {
    /// Bad input for the step; re-prompt in place
    #[error("{0}")]
    Invalid(String),
    /// The edited item no longer exists
    #[error(transparent)]
    StaleIndex(EditError),
    /// Input the step has no transition for
    #[error("unroutable event")]
    Unroutable,
    /// A choice that is not on offer; answered silently
    #[error("ignored")]
    Ignored,
}

impl From<EditError> for FlowError {
    fn from(e: EditError) -> Self {
        match e {
            EditError::IndexOutOfRange { .. } => FlowError::StaleIndex(e),
            other => FlowError::Invalid(capitalize(&other.to_string())),
        }
    }
}

impl From<AttachmentError> for FlowError {
    fn from(e: AttachmentError) -> Self {
        FlowError::Invalid(capitalize(&e.to_string()))
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Pure transition function
///
/// Given the same session, context and event this always produces the same
/// result. Events are applied to a copy of the session; when applying fails
/// the copy is dropped, so a rejected event never leaves a partial write.
pub fn transition(session: Option<&Session>, ctx: &FlowContext, event: Event) -> TransitionResult {
    let Some(current) = session else {
        return begin(ctx, event);
    };

    match event {
        Event::Cancel => TransitionResult::end().with_prompt(prompts::cancelled()),
        Event::Start if current.has_items() => TransitionResult::keep(current.clone())
            .with_prompt(prompts::already_in_progress())
            .with_prompt(prompts::for_step(current, ctx)),
        Event::Start => begin(ctx, Event::Start),
        event => match apply(current.clone(), ctx, event) {
            Ok(result) => result,
            Err(e) => recover(current, ctx, e),
        },
    }
}

/// Event for a conversation with no session
fn begin(ctx: &FlowContext, event: Event) -> TransitionResult {
    match event {
        Event::Cancel => TransitionResult::end().with_prompt(prompts::nothing_to_cancel()),
        Event::Ignore => TransitionResult::end().with_effect(Effect::Acknowledge),
        _ => TransitionResult::keep(Session::new(ctx.requester.clone()))
            .with_prompt(prompts::welcome()),
    }
}

fn recover(current: &Session, ctx: &FlowContext, error: FlowError) -> TransitionResult {
    match error {
        FlowError::Ignored => TransitionResult::keep(current.clone()).with_effect(Effect::Acknowledge),
        FlowError::Invalid(message) => TransitionResult::keep(current.clone())
            .with_prompt(prompts::corrective(&message, prompts::for_step(current, ctx))),
        FlowError::Unroutable => TransitionResult::keep(current.clone()).with_prompt(
            prompts::corrective(prompts::UNROUTABLE, prompts::for_step(current, ctx)),
        ),
        FlowError::StaleIndex(e) => {
            tracing::debug!(error = %e, step = current.step.name(), "Stale item index");
            let mut session = current.clone();
            session.leave_edit();
            session.step = Step::ReviewMenu;
            let listing = prompts::review(&session.aggregate);
            TransitionResult::keep(session)
                .with_prompt(Prompt::text(
                    "That item no longer exists. Here is the current list.",
                ))
                .with_prompts(listing)
        }
    }
}

#[allow(clippy::too_many_lines)]
fn apply(mut s: Session, ctx: &FlowContext, event: Event) -> Result<TransitionResult, FlowError> {
    let this_month = YearMonth::of(ctx.today);

    match (s.step, event) {
        // ============================================================
        // Header
        // ============================================================
        (Step::ChoosingCategory, Event::Choice(token)) => {
            let category = Category::from_token(&token).ok_or(FlowError::Ignored)?;
            s.aggregate
                .set_header_field(HeaderField::Category(category))?;
            Ok(TransitionResult::goto(
                s,
                Step::ChoosingLocation,
                prompts::location(Some(category)),
            ))
        }

        (Step::ChoosingLocation, Event::Text(text)) => {
            s.aggregate.set_header_field(HeaderField::Location(text))?;
            Ok(TransitionResult::goto(s, Step::EnteringName, prompts::item_name()))
        }

        // ============================================================
        // Item entry
        // ============================================================
        (Step::EnteringName, Event::Text(text)) => {
            let name = text.trim();
            if name.is_empty() {
                return Err(EditError::invalid(ItemField::Name, "must not be empty").into());
            }
            s.draft_item.name = Some(name.to_string());
            Ok(TransitionResult::goto(s, Step::ChoosingUnit, prompts::unit()))
        }

        (Step::ChoosingUnit, Event::Choice(token)) if token == tokens::BACK => {
            Ok(TransitionResult::goto(s, Step::EnteringName, prompts::item_name()))
        }

        (Step::ChoosingUnit, Event::Choice(token)) => {
            let unit = Unit::from_token(&token).ok_or(FlowError::Ignored)?;
            s.draft_item.unit = Some(unit);
            Ok(TransitionResult::goto(s, Step::EnteringQuantity, prompts::quantity()))
        }

        (Step::EnteringQuantity, Event::Text(text)) => {
            s.draft_item.quantity = Some(parse_quantity(&text)?);
            Ok(TransitionResult::goto(s, Step::ChoosingModule, prompts::module()))
        }

        (Step::ChoosingModule, Event::Choice(token)) => {
            let module = ItemModule::from_token(&token).ok_or(FlowError::Ignored)?;
            s.draft_item.module = Some(module);
            Ok(TransitionResult::goto(
                s,
                Step::PickingItemDate,
                prompts::item_date(this_month),
            ))
        }

        (Step::PickingItemDate, Event::DateSelected(date)) => {
            s.draft_item.due_date = Some(date);
            let prompt = prompts::corrective(
                &format!("Delivery date: {}", format_date(date)),
                prompts::attachment_choice(&[]),
            );
            Ok(TransitionResult::goto(s, Step::AttachmentChoice, prompt))
        }

        (Step::PickingItemDate, Event::Choice(token)) if token == tokens::SKIP_DATE => {
            s.draft_item.due_date = None;
            Ok(TransitionResult::goto(
                s,
                Step::AttachmentChoice,
                prompts::attachment_choice(&[]),
            ))
        }

        (step, Event::MonthNav(month)) if step.shows_calendar() => {
            let prompt = prompts::date_step(step, month).ok_or(FlowError::Ignored)?;
            Ok(TransitionResult::keep(s).with_prompt(prompt))
        }

        // ============================================================
        // Attachments for the draft item
        // ============================================================
        (Step::AttachmentChoice, Event::Choice(token)) => match token.as_str() {
            tokens::ATTACH_FILE => {
                s.attachments.begin_file();
                Ok(TransitionResult::goto(s, Step::FileInput, prompts::file_input()))
            }
            tokens::ATTACH_LINK => {
                s.attachments.begin_link();
                Ok(TransitionResult::goto(s, Step::LinkInput, prompts::link_input()))
            }
            tokens::FINISH => commit_item(s),
            _ => Err(FlowError::Ignored),
        },

        (Step::FileInput | Step::LinkInput, Event::Text(text)) => {
            s.attachments.receive(AttachmentPayload::Text(text))?;
            let prompt = prompts::attachment_choice(s.attachments.entries());
            Ok(TransitionResult::goto(s, Step::AttachmentChoice, prompt))
        }

        (Step::FileInput | Step::LinkInput, Event::File(file)) => {
            s.attachments.receive(AttachmentPayload::File(file))?;
            let prompt = prompts::attachment_choice(s.attachments.entries());
            Ok(TransitionResult::goto(s, Step::AttachmentChoice, prompt))
        }

        // ============================================================
        // Loop control
        // ============================================================
        (Step::AskAddMore, Event::Choice(token)) => match token.as_str() {
            tokens::ADD_MORE => Ok(TransitionResult::goto(s, Step::EnteringName, prompts::item_name())),
            tokens::REVIEW => Ok(to_review(s, None)),
            _ => Err(FlowError::Ignored),
        },

        // ============================================================
        // Review menu
        // ============================================================
        (Step::ReviewMenu, Event::Choice(token)) => match token.as_str() {
            tokens::EDIT_ITEM => {
                if s.aggregate.is_empty() {
                    return Err(FlowError::Invalid("There are no items to edit.".into()));
                }
                let prompt = prompts::item_list(&s.aggregate, ItemListPurpose::Edit);
                Ok(TransitionResult::goto(s, Step::SelectItemToEdit, prompt))
            }
            tokens::ADD_ITEM => {
                s.draft_item = DraftItem::default();
                Ok(TransitionResult::goto(s, Step::EnteringName, prompts::item_name()))
            }
            tokens::DELETE_ITEM => {
                if s.aggregate.is_empty() {
                    return Err(FlowError::Invalid("There are no items to delete.".into()));
                }
                let prompt = prompts::item_list(&s.aggregate, ItemListPurpose::Delete);
                Ok(TransitionResult::goto(s, Step::SelectItemToDelete, prompt))
            }
            tokens::SET_GLOBAL_DATE => Ok(TransitionResult::goto(
                s,
                Step::PickGlobalDate,
                prompts::global_date(this_month),
            )),
            tokens::SEND => {
                if s.aggregate.is_empty() {
                    return Err(FlowError::Invalid(
                        "Add at least one item before sending.".into(),
                    ));
                }
                let summary = prompts::confirm_send(&s.aggregate);
                s.step = Step::ConfirmSend;
                Ok(TransitionResult::keep(s).with_prompts(summary))
            }
            _ => Err(FlowError::Ignored),
        },

        (
            Step::SelectItemToEdit
            | Step::SelectItemToDelete
            | Step::PickGlobalDate
            | Step::ConfirmSend,
            Event::Choice(token),
        ) if token == tokens::BACK => Ok(to_review(s, None)),

        (Step::SelectItemToEdit, Event::Choice(token)) => {
            let index = select_item(&s, &token)?;
            let item = s.aggregate.item(index)?;
            let prompt = prompts::field_menu(index, item);
            s.edit_cursor = Some(EditCursor::at(index));
            Ok(TransitionResult::goto(s, Step::PickFieldToEdit, prompt))
        }

        (Step::SelectItemToDelete, Event::Choice(token)) => {
            let index = select_item(&s, &token)?;
            let removed = s.aggregate.delete_item(index)?;
            tracing::debug!(index, name = %removed.name, "Deleted item");
            let mut notice = format!("Item \"{}\" deleted.", removed.name);
            if s.aggregate.is_empty() {
                notice.push_str(" The request has no items now; add one or cancel.");
            }
            Ok(to_review(s, Some(notice)))
        }

        // ============================================================
        // Editing a committed item
        // ============================================================
        (Step::PickFieldToEdit, Event::Choice(token)) if token == tokens::BACK => {
            s.leave_edit();
            Ok(to_review(s, None))
        }

        (Step::PickFieldToEdit, Event::Choice(token)) => {
            let field = tokens::parse_field(&token).ok_or(FlowError::Ignored)?;
            let index = cursor_index(&s)?;
            let item = s.aggregate.item(index)?;
            let prompt = match field {
                ItemField::Name => prompts::edit_name(item),
                ItemField::Unit => prompts::edit_unit(item),
                ItemField::Quantity => prompts::edit_quantity(item),
                ItemField::Module => prompts::edit_module(item),
                ItemField::DueDate => prompts::edit_date(this_month),
                ItemField::Attachments => prompts::edit_attachments(&[], &item.attachments),
            };
            s.attachments.finish();
            s.edit_cursor = Some(EditCursor {
                index,
                field: Some(field),
            });
            Ok(TransitionResult::goto(s, Step::editing(field), prompt))
        }

        (
            Step::EditName
            | Step::EditUnit
            | Step::EditQuantity
            | Step::EditModule
            | Step::EditDate
            | Step::EditAttachmentChoice,
            Event::Choice(token),
        ) if token == tokens::BACK => back_to_fields(s),

        (Step::EditName, Event::Text(text)) => {
            edit_field(s, ItemValue::Name(text), "Name updated.")
        }

        (Step::EditUnit, Event::Choice(token)) => {
            let unit = Unit::from_token(&token).ok_or(FlowError::Ignored)?;
            edit_field(s, ItemValue::Unit(unit), "Unit updated.")
        }

        (Step::EditQuantity, Event::Text(text)) => {
            let quantity = parse_quantity(&text)?;
            edit_field(s, ItemValue::Quantity(quantity), "Quantity updated.")
        }

        (Step::EditModule, Event::Choice(token)) => {
            let module = ItemModule::from_token(&token).ok_or(FlowError::Ignored)?;
            edit_field(s, ItemValue::Module(module), "Module updated.")
        }

        (Step::EditDate, Event::DateSelected(date)) => {
            let notice = format!("Delivery date set to {}.", format_date(date));
            edit_field(s, ItemValue::DueDate(Some(date)), &notice)
        }

        (Step::EditDate, Event::Choice(token)) if token == tokens::CLEAR_DATE => {
            edit_field(s, ItemValue::DueDate(None), "Delivery date cleared.")
        }

        (Step::EditAttachmentChoice, Event::Choice(token)) => match token.as_str() {
            tokens::ATTACH_FILE => {
                cursor_index(&s)?;
                s.attachments.begin_file();
                Ok(TransitionResult::goto(s, Step::EditFileInput, prompts::file_input()))
            }
            tokens::ATTACH_LINK => {
                cursor_index(&s)?;
                s.attachments.begin_link();
                Ok(TransitionResult::goto(s, Step::EditLinkInput, prompts::link_input()))
            }
            tokens::FINISH => {
                let index = cursor_index(&s)?;
                let replacement = s.attachments.finish();
                let notice = if replacement.is_empty() {
                    "Attachments removed.".to_string()
                } else {
                    format!("Attachments replaced ({}).", replacement.len())
                };
                s.aggregate.replace_item_attachments(index, replacement)?;
                Ok(finish_edit(s, notice))
            }
            tokens::KEEP => {
                cursor_index(&s)?;
                Ok(finish_edit(s, "Attachments unchanged.".to_string()))
            }
            _ => Err(FlowError::Ignored),
        },

        (Step::EditFileInput | Step::EditLinkInput, Event::Text(text)) => {
            s.attachments.receive(AttachmentPayload::Text(text))?;
            edit_attachments_menu(s)
        }

        (Step::EditFileInput | Step::EditLinkInput, Event::File(file)) => {
            s.attachments.receive(AttachmentPayload::File(file))?;
            edit_attachments_menu(s)
        }

        // ============================================================
        // Global date
        // ============================================================
        (Step::PickGlobalDate, Event::DateSelected(date)) => {
            let filled = s
                .aggregate
                .set_header_field(HeaderField::GlobalDueDate(date))?;
            let notice = format!(
                "Delivery date {} set for the request; applied to {filled} item(s) without their own date.",
                format_date(date)
            );
            Ok(to_review(s, Some(notice)))
        }

        // ============================================================
        // Sending
        // ============================================================
        (Step::ConfirmSend, Event::Choice(token)) if token == tokens::CONFIRM => {
            if ctx.destinations.is_empty() {
                return Err(FlowError::Invalid(
                    "No destinations are configured, the request cannot be sent.".into(),
                ));
            }
            Ok(TransitionResult::goto(
                s,
                Step::ChoosingDestination,
                prompts::destinations(&ctx.destinations),
            ))
        }

        (Step::ChoosingDestination, Event::Choice(token)) if token == tokens::BACK => {
            let summary = prompts::confirm_send(&s.aggregate);
            s.step = Step::ConfirmSend;
            Ok(TransitionResult::keep(s).with_prompts(summary))
        }

        (Step::ChoosingDestination, Event::Choice(token)) => {
            let destination = tokens::parse_destination(&token)
                .and_then(|id| ctx.destination(id))
                .ok_or(FlowError::Ignored)?;
            if s.aggregate.is_empty() {
                return Err(FlowError::Invalid(
                    "Add at least one item before sending.".into(),
                ));
            }
            Ok(TransitionResult::end()
                .with_prompt(prompts::sending(destination))
                .with_effect(Effect::deliver(s.aggregate, destination.clone())))
        }

        // ============================================================
        // Everything else
        // ============================================================
        (_, Event::Ignore) => Err(FlowError::Ignored),

        // Stale buttons from an earlier menu
        (step, Event::Choice(_) | Event::DateSelected(_) | Event::MonthNav(_))
            if !step.expects_input() =>
        {
            Err(FlowError::Ignored)
        }

        _ => Err(FlowError::Unroutable),
    }
}

/// Commit the draft and its attachments as a new line item
fn commit_item(mut s: Session) -> Result<TransitionResult, FlowError> {
    let attachments = s.attachments.entries().to_vec();
    let line = s.draft_item.complete(attachments)?;
    s.aggregate.append_item(line)?;
    s.attachments.finish();
    s.draft_item = DraftItem::default();
    tracing::debug!(items = s.aggregate.len(), "Committed item");
    let prompt = prompts::add_more(s.aggregate.len());
    Ok(TransitionResult::goto(s, Step::AskAddMore, prompt))
}

/// Parse an item selection and check it against the current list
fn select_item(s: &Session, token: &str) -> Result<usize, FlowError> {
    let index = tokens::parse_item(token).ok_or(FlowError::Ignored)?;
    if index >= s.aggregate.len() {
        return Err(FlowError::Invalid(format!(
            "Item {} does not exist. Choose one of the listed items.",
            index + 1
        )));
    }
    Ok(index)
}

/// Index of the item under edit, checked against the current list
fn cursor_index(s: &Session) -> Result<usize, FlowError> {
    let len = s.aggregate.len();
    match s.edit_cursor {
        Some(cursor) if cursor.index < len => Ok(cursor.index),
        Some(cursor) => Err(FlowError::StaleIndex(EditError::IndexOutOfRange {
            index: cursor.index,
            len,
        })),
        None => Err(FlowError::StaleIndex(EditError::IndexOutOfRange { index: len, len })),
    }
}

fn edit_field(mut s: Session, value: ItemValue, notice: &str) -> Result<TransitionResult, FlowError> {
    let index = cursor_index(&s)?;
    s.aggregate.set_item_field(index, value)?;
    Ok(finish_edit(s, notice.to_string()))
}

fn edit_attachments_menu(s: Session) -> Result<TransitionResult, FlowError> {
    let index = cursor_index(&s)?;
    let item = s.aggregate.item(index)?;
    let prompt = prompts::edit_attachments(s.attachments.entries(), &item.attachments);
    Ok(TransitionResult::goto(s, Step::EditAttachmentChoice, prompt))
}

fn back_to_fields(mut s: Session) -> Result<TransitionResult, FlowError> {
    let index = cursor_index(&s)?;
    let prompt = prompts::field_menu(index, s.aggregate.item(index)?);
    s.attachments.finish();
    s.edit_cursor = Some(EditCursor::at(index));
    Ok(TransitionResult::goto(s, Step::PickFieldToEdit, prompt))
}

fn finish_edit(mut s: Session, notice: String) -> TransitionResult {
    s.leave_edit();
    to_review(s, Some(notice))
}

/// Back to the review menu with the full summary, optionally preceded by a
/// notice
fn to_review(mut s: Session, notice: Option<String>) -> TransitionResult {
    let listing = prompts::review(&s.aggregate);
    s.step = Step::ReviewMenu;
    let result = TransitionResult::keep(s);
    let result = match notice {
        Some(notice) => result.with_prompt(Prompt::text(notice)),
        None => result,
    };
    result.with_prompts(listing)
}
