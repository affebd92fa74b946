//! Runtime for driving dialogues
//!
//! Inbound events are fanned out to one worker task per conversation, so
//! events for one conversation are handled strictly in arrival order while
//! different conversations proceed in parallel.

mod error;
mod executor;
mod sheet;
pub mod traits;
mod webhook;

#[cfg(test)]
pub mod testing;

pub use error::{DeliveryError, TransportError};
pub use executor::FlowExecutor;
pub use sheet::SheetFormatter;
pub use traits::*;
pub use webhook::{HttpBlobStore, WebhookNotifier};

use crate::session::ConversationId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

/// How long a worker waits for another event before retiring
const DEFAULT_IDLE: Duration = Duration::from_secs(60);

type Workers = Arc<RwLock<HashMap<ConversationId, mpsc::UnboundedSender<Inbound>>>>;

/// Owns the executor and the per-conversation workers
pub struct FlowRuntime<T, F, N>
where
    T: Transport + 'static,
    F: Formatter + 'static,
    N: Notifier + 'static,
{
    executor: Arc<FlowExecutor<T, F, N>>,
    workers: Workers,
    idle: Duration,
}

impl<T, F, N> FlowRuntime<T, F, N>
where
    T: Transport + 'static,
    F: Formatter + 'static,
    N: Notifier + 'static,
{
    pub fn new(executor: FlowExecutor<T, F, N>) -> Self {
        Self {
            executor: Arc::new(executor),
            workers: Arc::default(),
            idle: DEFAULT_IDLE,
        }
    }

    #[cfg(test)]
    pub fn with_idle(mut self, idle: Duration) -> Self {
        self.idle = idle;
        self
    }

    #[cfg(test)]
    pub fn executor(&self) -> &Arc<FlowExecutor<T, F, N>> {
        &self.executor
    }

    /// Pull events from the transport until it shuts down
    pub async fn run(&self) {
        tracing::info!("Dialogue runtime started");
        while let Some(inbound) = self.executor.transport().receive().await {
            self.submit(inbound).await;
        }
        tracing::info!("Transport closed, dialogue runtime stopped");
    }

    /// Queue an event behind any earlier events for the same conversation
    pub async fn submit(&self, inbound: Inbound) {
        let inbound = {
            let workers = self.workers.read().await;
            match workers.get(&inbound.conversation) {
                Some(tx) => match tx.send(inbound) {
                    Ok(()) => return,
                    Err(mpsc::error::SendError(back)) => back,
                },
                None => inbound,
            }
        };

        let mut workers = self.workers.write().await;
        // Another submit may have started a worker while we waited
        let inbound = match workers.get(&inbound.conversation) {
            Some(tx) => match tx.send(inbound) {
                Ok(()) => return,
                Err(mpsc::error::SendError(back)) => back,
            },
            None => inbound,
        };

        let conversation = inbound.conversation.clone();
        let (tx, rx) = mpsc::unbounded_channel();
        workers.insert(conversation.clone(), tx);
        tracing::debug!(conversation_id = %conversation, "Starting conversation worker");

        tokio::spawn(serve(
            Arc::clone(&self.executor),
            Arc::clone(&self.workers),
            conversation,
            inbound,
            rx,
            self.idle,
        ));
    }

    /// Number of conversations with a live worker
    #[cfg(test)]
    pub async fn active_workers(&self) -> usize {
        self.workers.read().await.len()
    }
}

/// Worker loop for one conversation. Retires after `idle` without events;
/// retirement happens under the map's write lock, so an event is either
/// seen here or routed to a fresh worker, never dropped.
async fn serve<T, F, N>(
    executor: Arc<FlowExecutor<T, F, N>>,
    workers: Workers,
    conversation: ConversationId,
    first: Inbound,
    mut rx: mpsc::UnboundedReceiver<Inbound>,
    idle: Duration,
) where
    T: Transport + 'static,
    F: Formatter + 'static,
    N: Notifier + 'static,
{
    executor.dispatch(first).await;
    loop {
        match tokio::time::timeout(idle, rx.recv()).await {
            Ok(Some(inbound)) => executor.dispatch(inbound).await,
            Ok(None) => break,
            Err(_) => {
                let mut map = workers.write().await;
                if let Ok(inbound) = rx.try_recv() {
                    drop(map);
                    executor.dispatch(inbound).await;
                } else {
                    map.remove(&conversation);
                    break;
                }
            }
        }
    }
    tracing::debug!(conversation_id = %conversation, "Conversation worker retired");
}
