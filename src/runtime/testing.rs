//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::error::{BlobError, DeliveryError, TransportError};
use super::executor::FlowExecutor;
use super::sheet::SheetFormatter;
use super::traits::*;
use crate::request::fixtures::date;
use crate::request::{Attachment, RequestAggregate, Requester};
use crate::session::{ConversationId, SessionStore};
use crate::state_machine::{Destination, Event, Prompt};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Mock Transport
// ============================================================================

/// Transport that replays queued events and records everything sent
#[allow(dead_code)]
#[derive(Default)]
pub struct MockTransport {
    inbound: Mutex<VecDeque<Inbound>>,
    /// Record of all prompts sent, in order
    pub sent: Mutex<Vec<(ConversationId, Prompt)>>,
    /// Record of all acknowledgements
    pub acknowledged: Mutex<Vec<ConversationId>>,
    fail: AtomicBool,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, inbound: Inbound) {
        self.inbound.lock().unwrap().push_back(inbound);
    }

    /// Make every send fail from now on
    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn prompts_for(&self, conversation: &ConversationId) -> Vec<Prompt> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == conversation)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn acks(&self) -> Vec<ConversationId> {
        self.acknowledged.lock().unwrap().clone()
    }

    /// Poll until `conversation` has received at least `count` prompts
    pub async fn wait_for_prompts(
        &self,
        conversation: &ConversationId,
        count: usize,
        timeout: Duration,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.prompts_for(conversation).len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn receive(&self) -> Option<Inbound> {
        self.inbound.lock().unwrap().pop_front()
    }

    async fn send_prompt(
        &self,
        conversation: &ConversationId,
        prompt: &Prompt,
    ) -> Result<(), TransportError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::Failed("mock send failure".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((conversation.clone(), prompt.clone()));
        Ok(())
    }

    async fn acknowledge(&self, conversation: &ConversationId) -> Result<(), TransportError> {
        self.acknowledged.lock().unwrap().push(conversation.clone());
        Ok(())
    }
}

// ============================================================================
// Mock Formatter
// ============================================================================

/// Formatter that always fails
pub struct MockFormatter;

impl MockFormatter {
    pub fn failing() -> Self {
        Self
    }
}

impl Formatter for MockFormatter {
    fn render(&self, _request: &RequestAggregate) -> Result<Artifact, DeliveryError> {
        Err(DeliveryError::Format("template missing".into()))
    }
}

// ============================================================================
// Mock Notifier
// ============================================================================

/// What a notifier was asked to deliver
#[derive(Debug, Clone)]
pub struct Delivery {
    pub destination: String,
    pub file_name: String,
    pub attachments: Vec<Attachment>,
}

/// Notifier that records deliveries, or fails with a fixed reason
#[allow(dead_code)]
#[derive(Default)]
pub struct MockNotifier {
    failure: Option<String>,
    delivered: Mutex<Vec<Delivery>>,
}

#[allow(dead_code)]
impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            delivered: Mutex::default(),
        }
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn deliver(
        &self,
        artifact: &Artifact,
        attachments: &[Attachment],
        destination: &Destination,
    ) -> Result<(), DeliveryError> {
        if let Some(reason) = &self.failure {
            return Err(DeliveryError::notify(&destination.label, reason.as_str()));
        }
        self.delivered.lock().unwrap().push(Delivery {
            destination: destination.id.clone(),
            file_name: artifact.file_name.clone(),
            attachments: attachments.to_vec(),
        });
        Ok(())
    }
}

// ============================================================================
// Mock Blob Store
// ============================================================================

/// In-memory blob store
#[derive(Default)]
pub struct MockBlobStore {
    blobs: HashMap<String, Vec<u8>>,
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(mut self, locator: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.blobs.insert(locator.into(), bytes);
        self
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, BlobError> {
        self.blobs
            .get(locator)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(locator.to_string()))
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub type TestExecutor = FlowExecutor<MockTransport, SheetFormatter, Arc<MockNotifier>>;

pub fn destinations() -> Arc<[Destination]> {
    Arc::from(vec![Destination {
        id: "procurement".into(),
        label: "Procurement".into(),
        webhook_url: "http://127.0.0.1:9/requests".into(),
    }])
}

pub fn requester() -> Requester {
    Requester {
        id: "1001".into(),
        full_name: Some("Anna Petrova".into()),
        username: Some("anna".into()),
    }
}

pub fn inbound(conversation: &ConversationId, event: Event) -> Inbound {
    Inbound {
        conversation: conversation.clone(),
        requester: requester(),
        event,
    }
}

/// Executor over mocks with calendars and sheets pinned to 2025-03-01
pub fn executor(notifier: Arc<MockNotifier>) -> TestExecutor {
    FlowExecutor::new(
        Arc::new(SessionStore::new()),
        MockTransport::new(),
        SheetFormatter::created_on(date(2025, 3, 1)),
        notifier,
        destinations(),
    )
    .with_today(date(2025, 3, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_replays_in_order() {
        let transport = MockTransport::new();
        let conv = ConversationId::new("c");
        transport.queue(inbound(&conv, Event::Start));
        transport.queue(inbound(&conv, Event::Cancel));

        assert_eq!(transport.receive().await.unwrap().event, Event::Start);
        assert_eq!(transport.receive().await.unwrap().event, Event::Cancel);
        assert!(transport.receive().await.is_none());
    }

    #[tokio::test]
    async fn test_mock_notifier_records_or_fails() {
        let artifact = Artifact {
            file_name: "r.csv".into(),
            content_type: "text/csv".into(),
            bytes: vec![],
        };
        let dest = &destinations()[0];

        let ok = MockNotifier::new();
        ok.deliver(&artifact, &[Attachment::link("https://x")], dest)
            .await
            .unwrap();
        assert_eq!(ok.deliveries()[0].attachments.len(), 1);

        let failing = MockNotifier::failing("down");
        let err = failing.deliver(&artifact, &[], dest).await.unwrap_err();
        assert_eq!(err.to_string(), "Procurement did not accept the request: down");
    }

    #[tokio::test]
    async fn test_mock_blob_store() {
        let store = MockBlobStore::new().with_blob("a", vec![1, 2]);
        assert_eq!(store.fetch("a").await.unwrap(), vec![1, 2]);
        assert!(matches!(store.fetch("b").await, Err(BlobError::NotFound(_))));
    }
}
