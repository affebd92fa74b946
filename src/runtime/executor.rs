//! Dialogue executor: one inbound event in, effects out

use super::traits::{Formatter, Inbound, Notifier, Transport};
use crate::request::RequestAggregate;
use crate::session::{ConversationId, SessionStore};
use crate::state_machine::{
    prompts, transition, Destination, Effect, FlowContext, Prompt, Step,
};
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tracing::Instrument;

/// Runs events for any conversation against the shared session store.
///
/// Everything for one conversation happens under that conversation's slot
/// lock: transition, commit, then effects. A second event for the same
/// conversation waits until the first one's replies have gone out.
pub struct FlowExecutor<T, F, N>
where
    T: Transport,
    F: Formatter,
    N: Notifier,
{
    store: Arc<SessionStore>,
    transport: T,
    formatter: F,
    notifier: N,
    destinations: Arc<[Destination]>,
    /// Fixed calendar date; the local date is used when unset
    today: Option<NaiveDate>,
}

impl<T, F, N> FlowExecutor<T, F, N>
where
    T: Transport,
    F: Formatter,
    N: Notifier,
{
    pub fn new(
        store: Arc<SessionStore>,
        transport: T,
        formatter: F,
        notifier: N,
        destinations: Arc<[Destination]>,
    ) -> Self {
        Self {
            store,
            transport,
            formatter,
            notifier,
            destinations,
            today: None,
        }
    }

    /// Pin the date calendars open on
    #[cfg(test)]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    #[cfg(test)]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Handle one inbound event to completion
    pub async fn dispatch(&self, inbound: Inbound) {
        let span = tracing::info_span!(
            "dispatch",
            conversation_id = %inbound.conversation,
            event = inbound.event.kind(),
        );
        self.dispatch_inner(inbound).instrument(span).await;
    }

    async fn dispatch_inner(&self, inbound: Inbound) {
        let Inbound {
            conversation,
            requester,
            event,
        } = inbound;

        let mut guard = self.store.lock(&conversation).await;
        let ctx = FlowContext::new(
            requester,
            self.today
                .unwrap_or_else(|| Local::now().date_naive()),
            Arc::clone(&self.destinations),
        );

        let before = guard.as_ref().map(|s| s.step);
        let result = transition(guard.as_ref(), &ctx, event);
        let after = result.session.as_ref().map(|s| s.step);
        if before != after {
            tracing::debug!(
                from = before.map_or("none", Step::name),
                to = after.map_or("none", Step::name),
                "Step changed"
            );
        }

        // Commit before any effect runs; a failed delivery must not
        // resurrect the session it ended
        *guard = result.session;

        for effect in result.effects {
            self.execute_effect(&conversation, effect).await;
        }

        let ended = guard.is_none();
        drop(guard);
        if ended {
            self.store.release(&conversation).await;
        }
    }

    async fn execute_effect(&self, conversation: &ConversationId, effect: Effect) {
        match effect {
            Effect::Prompt(prompt) => self.send(conversation, &prompt).await,
            Effect::Acknowledge => {
                if let Err(e) = self.transport.acknowledge(conversation).await {
                    tracing::warn!(error = %e, "Failed to acknowledge");
                }
            }
            Effect::Deliver {
                request,
                destination,
            } => {
                let reply = match self.deliver(&request, &destination).await {
                    Ok(()) => {
                        tracing::info!(
                            destination = %destination.id,
                            items = request.len(),
                            "Request delivered"
                        );
                        prompts::sent(&destination)
                    }
                    Err(e) => {
                        tracing::error!(
                            destination = %destination.id,
                            error = %e,
                            "Request delivery failed"
                        );
                        prompts::delivery_failed(&e.to_string())
                    }
                };
                self.send(conversation, &reply).await;
            }
        }
    }

    async fn deliver(
        &self,
        request: &RequestAggregate,
        destination: &Destination,
    ) -> Result<(), super::DeliveryError> {
        let artifact = self.formatter.render(request)?;
        let attachments: Vec<_> = request.attachments().cloned().collect();
        self.notifier
            .deliver(&artifact, &attachments, destination)
            .await
    }

    async fn send(&self, conversation: &ConversationId, prompt: &Prompt) {
        if let Err(e) = self.transport.send_prompt(conversation, prompt).await {
            tracing::warn!(error = %e, "Failed to send prompt");
        }
    }
}
