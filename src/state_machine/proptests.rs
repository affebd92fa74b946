//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across arbitrary event sequences.

use super::effect::Effect;
use super::event::Event;
use super::state::Step;
use super::tokens;
use super::transition::testing::{context, drive, reviewing};
use super::transition::transition;
use crate::attachments::{FileRef, MediaKind};
use crate::request::ItemField;
use crate::session::Session;
use proptest::prelude::*;
use proptest::sample::select;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn choice_pool() -> Vec<Event> {
    let fields = [
        ItemField::Name,
        ItemField::Unit,
        ItemField::Quantity,
        ItemField::Module,
        ItemField::DueDate,
        ItemField::Attachments,
    ];
    let mut raw: Vec<String> = [
        "apartment",
        "office",
        "m",
        "pcs",
        "1",
        "18",
        "0",
        tokens::BACK,
        tokens::SKIP_DATE,
        tokens::CLEAR_DATE,
        tokens::ATTACH_FILE,
        tokens::ATTACH_LINK,
        tokens::FINISH,
        tokens::KEEP,
        tokens::ADD_MORE,
        tokens::REVIEW,
        tokens::EDIT_ITEM,
        tokens::ADD_ITEM,
        tokens::DELETE_ITEM,
        tokens::SET_GLOBAL_DATE,
        tokens::SEND,
        tokens::CONFIRM,
        "cal:day:2025-03-10",
        "cal:day:2025-04-01",
        "cal:nav:2025-04",
        "cal:noop",
        "dest:procurement",
        "dest:nowhere",
        "bogus",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    raw.extend((0..4).map(tokens::item));
    raw.extend(fields.into_iter().map(tokens::field));
    raw.iter().map(|t| Event::from_token(t)).collect()
}

fn arb_event() -> impl Strategy<Value = Event> {
    let doc = Event::File(FileRef {
        file_id: "doc".into(),
        file_name: Some("plan.pdf".into()),
        media: MediaKind::Document,
    });
    prop_oneof![
        6 => select(choice_pool()),
        3 => select(vec![
            Event::Text("Cable".into()),
            Event::Text("12,5".into()),
            Event::Text("abc".into()),
            Event::Text("   ".into()),
            Event::Text("https://example.com/x".into()),
            doc,
        ]),
        1 => "[a-zA-Z0-9 ]{1,12}".prop_map(Event::Text),
        1 => select(vec![Event::Start, Event::Cancel, Event::from_text("/help")]),
    ]
}

/// Enough events to make most steps reachable
fn arb_events() -> impl Strategy<Value = Vec<Event>> {
    prop::collection::vec(arb_event(), 1..80)
}

fn names(session: &Session) -> Vec<String> {
    session
        .aggregate
        .items()
        .iter()
        .map(|i| i.name.clone())
        .collect()
}

/// Steps from which an event may legitimately change committed items
fn may_touch_items(step: Step, event: &Event) -> bool {
    step.is_edit()
        || matches!(step, Step::SelectItemToDelete | Step::PickGlobalDate)
        || (step == Step::AttachmentChoice && *event == Event::Choice(tokens::FINISH.into()))
}

// ============================================================================
// Invariants
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Every event gets a reaction, the edit cursor matches the step, and
    /// committed items only change through commit, delete or edit
    #[test]
    fn prop_session_invariants_hold(events in arb_events()) {
        let ctx = context();
        let mut session: Option<Session> = None;

        for event in events {
            let before = session.clone();
            let result = transition(before.as_ref(), &ctx, event.clone());
            prop_assert!(!result.effects.is_empty(), "no reaction to {:?}", event);

            if event == Event::Cancel {
                prop_assert!(result.session.is_none());
            }

            if let Some(after) = &result.session {
                prop_assert_eq!(after.edit_cursor.is_some(), after.step.is_edit(),
                    "cursor {:?} at {:?}", after.edit_cursor, after.step);
                if let Some(cursor) = after.edit_cursor {
                    prop_assert!(cursor.index < after.aggregate.len());
                }
                if after.step != Step::FileInput && after.step != Step::LinkInput
                    && after.step != Step::EditFileInput && after.step != Step::EditLinkInput
                {
                    prop_assert_eq!(after.attachments.expected(), None);
                }

                if let Some(prev) = &before {
                    let same_session = prev.aggregate.header.requester == after.aggregate.header.requester
                        && !(event == Event::Start && !prev.has_items());
                    if same_session && !may_touch_items(prev.step, &event) {
                        prop_assert_eq!(names(prev), names(after), "items changed at {:?}", prev.step);
                        prop_assert_eq!(prev.aggregate.items(), after.aggregate.items());
                    }
                    let grew = after.aggregate.len() > prev.aggregate.len();
                    if grew {
                        prop_assert_eq!(after.aggregate.len(), prev.aggregate.len() + 1);
                        prop_assert_eq!(prev.step, Step::AttachmentChoice);
                        prop_assert_eq!(&names(after)[..prev.aggregate.len()], &names(prev)[..]);
                        prop_assert!(after.draft_item.is_empty());
                    }
                }
            }

            for effect in &result.effects {
                if let Effect::Deliver { request, .. } = effect {
                    prop_assert!(result.session.is_none());
                    prop_assert!(!request.is_empty());
                }
            }

            session = result.session;
        }
    }

    /// Committed items appear in commit order with nothing else mixed in
    #[test]
    fn prop_items_kept_in_commit_order(item_names in prop::collection::vec("[A-Za-z]{1,10}", 1..6)) {
        let ctx = context();
        let refs: Vec<&str> = item_names.iter().map(String::as_str).collect();
        let session = reviewing(&ctx, &refs);
        prop_assert_eq!(names(&session), item_names);
        prop_assert!(session.draft_item.is_empty());
    }

    /// An out-of-range selection changes nothing
    #[test]
    fn prop_out_of_range_selection_is_idempotent(
        count in 1usize..5,
        extra in 0usize..10,
        delete in any::<bool>(),
    ) {
        let ctx = context();
        let labels: Vec<String> = (0..count).map(|i| format!("item{i}")).collect();
        let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
        let menu = if delete { tokens::DELETE_ITEM } else { tokens::EDIT_ITEM };
        let selecting = drive(Some(reviewing(&ctx, &refs)), &ctx, [Event::from_token(menu)])
            .session
            .unwrap();

        let result = transition(Some(&selecting), &ctx, Event::from_token(&tokens::item(count + extra)));
        prop_assert_eq!(result.session.as_ref(), Some(&selecting));
    }

    /// Deleting item k shifts the later items down in order
    #[test]
    fn prop_delete_shifts_later_items((count, k) in (1usize..7).prop_flat_map(|n| (Just(n), 0..n))) {
        let ctx = context();
        let labels: Vec<String> = (0..count).map(|i| format!("item{i}")).collect();
        let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
        let session = drive(
            Some(reviewing(&ctx, &refs)),
            &ctx,
            [Event::from_token(tokens::DELETE_ITEM), Event::from_token(&tokens::item(k))],
        )
        .session
        .unwrap();

        let mut expected = labels.clone();
        expected.remove(k);
        prop_assert_eq!(names(&session), expected);
        prop_assert_eq!(session.step, Step::ReviewMenu);
    }
}
