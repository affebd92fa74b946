//! HTTP adapters: webhook notifier and blob store

use super::error::{BlobError, DeliveryError};
use super::traits::{Artifact, BlobStore, Notifier};
use crate::request::{Attachment, AttachmentKind};
use crate::state_machine::Destination;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

/// Body posted to a destination's webhook
#[derive(Debug, Serialize)]
struct DeliveryPayload<'a> {
    /// Fresh per delivery attempt
    request_id: String,
    destination: &'a str,
    subject: String,
    artifact: EncodedFile<'a>,
    attachments: Vec<EncodedAttachment<'a>>,
}

#[derive(Debug, Serialize)]
struct EncodedFile<'a> {
    file_name: &'a str,
    content_type: &'a str,
    /// Base64
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum EncodedAttachment<'a> {
    File {
        name: &'a str,
        /// Base64
        data: String,
    },
    Link {
        url: &'a str,
    },
}

/// Posts finished requests as JSON to the destination's webhook URL. File
/// attachments are fetched from the blob store and inlined.
pub struct WebhookNotifier<B: BlobStore> {
    client: Client,
    blobs: B,
}

impl<B: BlobStore> WebhookNotifier<B> {
    pub fn new(blobs: B, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, blobs })
    }

    async fn encode_attachment<'a>(
        &self,
        attachment: &'a Attachment,
    ) -> Result<EncodedAttachment<'a>, DeliveryError> {
        match attachment.kind {
            AttachmentKind::Link => Ok(EncodedAttachment::Link {
                url: &attachment.locator,
            }),
            AttachmentKind::File => {
                let bytes = self.blobs.fetch(&attachment.locator).await.map_err(|source| {
                    DeliveryError::Attachment {
                        locator: attachment.locator.clone(),
                        source,
                    }
                })?;
                Ok(EncodedAttachment::File {
                    name: attachment.describe(),
                    data: BASE64.encode(bytes),
                })
            }
        }
    }
}

#[async_trait]
impl<B: BlobStore> Notifier for WebhookNotifier<B> {
    async fn deliver(
        &self,
        artifact: &Artifact,
        attachments: &[Attachment],
        destination: &Destination,
    ) -> Result<(), DeliveryError> {
        let mut encoded = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            encoded.push(self.encode_attachment(attachment).await?);
        }

        let request_id = Uuid::new_v4().to_string();
        let payload = DeliveryPayload {
            request_id: request_id.clone(),
            destination: &destination.id,
            subject: format!("New supply request: {}", artifact.file_name),
            artifact: EncodedFile {
                file_name: &artifact.file_name,
                content_type: &artifact.content_type,
                data: BASE64.encode(&artifact.bytes),
            },
            attachments: encoded,
        };

        tracing::info!(
            request_id = %request_id,
            destination = %destination.id,
            attachments = attachments.len(),
            "Posting request to webhook"
        );

        let response = self
            .client
            .post(&destination.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    format!("request timed out: {e}")
                } else if e.is_connect() {
                    format!("connection failed: {e}")
                } else {
                    format!("request failed: {e}")
                };
                DeliveryError::notify(&destination.label, reason)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::notify(
                &destination.label,
                format!("HTTP {status}: {body}"),
            ));
        }
        Ok(())
    }
}

/// Fetches attachment bytes over HTTP as `{base_url}/{locator}`
pub struct HttpBlobStore {
    client: Client,
    base_url: String,
}

impl HttpBlobStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, BlobError> {
        let url = format!("{}/{}", self.base_url, locator);
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(BlobError::NotFound(locator.to_string()));
        }
        let bytes = response.error_for_status()?.bytes().await?;
        Ok(bytes.to_vec())
    }
}
