//! Attachment collection for a single line item
//!
//! The collector is armed with an expected kind (`begin_file`/`begin_link`),
//! receives one payload at a time, and hands the accumulated list back on
//! `finish`. A rejected payload leaves the expected kind armed so the user can
//! simply try again.

use crate::request::{Attachment, AttachmentKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Media class of an uploaded file, as reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Document,
    Photo,
    /// Stickers, voice notes and anything else that is not a document
    Unsupported,
}

/// Reference to a file held by the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    pub media: MediaKind,
}

/// Something the user sent while an attachment was expected
#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentPayload {
    Text(String),
    File(FileRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachmentError {
    #[error("not waiting for an attachment")]
    NotExpecting,
    #[error("please send a file (document or photo)")]
    ExpectedFile,
    #[error("please send a link starting with http:// or https://")]
    ExpectedLink,
    #[error("'{0}' is not a valid link; it must start with http:// or https://")]
    MalformedLink(String),
    #[error("this kind of file is not supported; send a document or a photo")]
    UnsupportedFile,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachmentCollector {
    expected: Option<AttachmentKind>,
    entries: Vec<Attachment>,
}

impl AttachmentCollector {
    pub fn begin_file(&mut self) {
        self.expected = Some(AttachmentKind::File);
    }

    pub fn begin_link(&mut self) {
        self.expected = Some(AttachmentKind::Link);
    }

    #[cfg(test)]
    pub fn expected(&self) -> Option<AttachmentKind> {
        self.expected
    }

    /// Attachments collected so far, in arrival order
    pub fn entries(&self) -> &[Attachment] {
        &self.entries
    }

    /// Validate a payload against the expected kind and append it.
    pub fn receive(&mut self, payload: AttachmentPayload) -> Result<&Attachment, AttachmentError> {
        let expected = self.expected.ok_or(AttachmentError::NotExpecting)?;
        let attachment = match (expected, payload) {
            (AttachmentKind::File, AttachmentPayload::File(file)) => {
                if file.media == MediaKind::Unsupported {
                    return Err(AttachmentError::UnsupportedFile);
                }
                Attachment::file(file.file_id, file.file_name)
            }
            (AttachmentKind::File, AttachmentPayload::Text(_)) => {
                return Err(AttachmentError::ExpectedFile)
            }
            (AttachmentKind::Link, AttachmentPayload::Text(text)) => {
                let url = text.trim();
                if !is_link(url) {
                    return Err(AttachmentError::MalformedLink(url.to_string()));
                }
                Attachment::link(url)
            }
            (AttachmentKind::Link, AttachmentPayload::File(_)) => {
                return Err(AttachmentError::ExpectedLink)
            }
        };
        self.expected = None;
        self.entries.push(attachment);
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Hand back everything collected and reset the collector
    pub fn finish(&mut self) -> Vec<Attachment> {
        self.expected = None;
        std::mem::take(&mut self.entries)
    }
}

fn is_link(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty() && !host.chars().any(char::is_whitespace))
}
