//! Polling transport: events arrive over HTTP, replies wait in a per
//! conversation outbox until the client fetches them

use super::types::Outbound;
use crate::runtime::{Inbound, Transport, TransportError};
use crate::session::ConversationId;
use crate::state_machine::Prompt;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Replies kept per conversation; older ones are dropped first
const MAX_PENDING: usize = 64;

/// Outboxes nobody has touched for this long are discarded
const UNCLAIMED_TTL: Duration = Duration::from_secs(15 * 60);

struct Outbox {
    messages: VecDeque<Outbound>,
    touched: Instant,
}

pub struct HttpTransport {
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    inbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Inbound>>,
    outbox: Mutex<HashMap<ConversationId, Outbox>>,
    ttl: Duration,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            inbound_tx,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            outbox: Mutex::default(),
            ttl: UNCLAIMED_TTL,
        }
    }

    #[cfg(test)]
    fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Hand an event to whoever is reading `receive`
    pub fn enqueue(&self, inbound: Inbound) -> Result<(), TransportError> {
        self.inbound_tx
            .send(inbound)
            .map_err(|_| TransportError::Closed)
    }

    /// Take every reply queued for a conversation
    pub fn drain(&self, conversation: &ConversationId) -> Vec<Outbound> {
        self.outbox
            .lock()
            .ok()
            .and_then(|mut outbox| outbox.remove(conversation))
            .map(|pending| pending.messages.into())
            .unwrap_or_default()
    }

    #[cfg(test)]
    fn pending_conversations(&self) -> usize {
        self.outbox.lock().map(|outbox| outbox.len()).unwrap_or_default()
    }

    fn push(&self, conversation: &ConversationId, message: Outbound) -> Result<(), TransportError> {
        let mut outbox = self
            .outbox
            .lock()
            .map_err(|_| TransportError::Failed("outbox lock poisoned".into()))?;
        let ttl = self.ttl;
        outbox.retain(|_, pending| pending.touched.elapsed() < ttl);

        let pending = outbox.entry(conversation.clone()).or_insert_with(|| Outbox {
            messages: VecDeque::new(),
            touched: Instant::now(),
        });
        if pending.messages.len() == MAX_PENDING {
            pending.messages.pop_front();
            tracing::warn!(conversation_id = %conversation, "Outbox full, dropped oldest reply");
        }
        pending.messages.push_back(message);
        pending.touched = Instant::now();
        Ok(())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn receive(&self) -> Option<Inbound> {
        self.inbound_rx.lock().await.recv().await
    }

    async fn send_prompt(
        &self,
        conversation: &ConversationId,
        prompt: &Prompt,
    ) -> Result<(), TransportError> {
        self.push(conversation, Outbound::Prompt(prompt.clone()))
    }

    async fn acknowledge(&self, conversation: &ConversationId) -> Result<(), TransportError> {
        self.push(conversation, Outbound::Ack)
    }
}
