//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use super::error::{BlobError, DeliveryError, TransportError};
use crate::request::{Attachment, RequestAggregate, Requester};
use crate::session::ConversationId;
use crate::state_machine::{Destination, Event, Prompt};
use async_trait::async_trait;
use std::sync::Arc;

/// One decoded event from one conversation
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub conversation: ConversationId,
    pub requester: Requester,
    pub event: Event,
}

/// A rendered request ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// The chat channel: events in, prompts out
#[async_trait]
pub trait Transport: Send + Sync {
    /// Next inbound event; `None` once the transport has shut down
    async fn receive(&self) -> Option<Inbound>;

    async fn send_prompt(
        &self,
        conversation: &ConversationId,
        prompt: &Prompt,
    ) -> Result<(), TransportError>;

    /// Answer a choice without sending anything visible
    async fn acknowledge(&self, conversation: &ConversationId) -> Result<(), TransportError>;
}

/// Renders a finished request into a document
pub trait Formatter: Send + Sync {
    fn render(&self, request: &RequestAggregate) -> Result<Artifact, DeliveryError>;
}

/// Sends a rendered request and its attachments to a destination
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(
        &self,
        artifact: &Artifact,
        attachments: &[Attachment],
        destination: &Destination,
    ) -> Result<(), DeliveryError>;
}

/// Where attachment bytes live. The dialogue only keeps locators.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, BlobError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn receive(&self) -> Option<Inbound> {
        (**self).receive().await
    }

    async fn send_prompt(
        &self,
        conversation: &ConversationId,
        prompt: &Prompt,
    ) -> Result<(), TransportError> {
        (**self).send_prompt(conversation, prompt).await
    }

    async fn acknowledge(&self, conversation: &ConversationId) -> Result<(), TransportError> {
        (**self).acknowledge(conversation).await
    }
}

impl<T: Formatter + ?Sized> Formatter for Arc<T> {
    fn render(&self, request: &RequestAggregate) -> Result<Artifact, DeliveryError> {
        (**self).render(request)
    }
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    async fn deliver(
        &self,
        artifact: &Artifact,
        attachments: &[Attachment],
        destination: &Destination,
    ) -> Result<(), DeliveryError> {
        (**self).deliver(artifact, attachments, destination).await
    }
}

#[async_trait]
impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, BlobError> {
        (**self).fetch(locator).await
    }
}
