use crate::traits::MessageSender;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, StatusCode};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const PAYLOAD_JSON_FIELD: &str = "payload_json";
pub const ATTACHMENT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to open attachment {}: {source}", path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("webhook returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// One message to post, with optional display overrides and files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationRequest {
    pub message: String,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub attachments: Vec<PathBuf>,
}

impl NotificationRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), ..Self::default() }
    }

    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    pub fn with_avatar_url(mut self, avatar_url: Option<String>) -> Self {
        self.avatar_url = avatar_url;
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<PathBuf>) -> Self {
        self.attachments = attachments;
        self
    }

    /// The JSON object Discord expects, without keys for unset fields.
    pub fn payload(&self) -> WebhookPayload<'_> {
        WebhookPayload {
            content: &self.message,
            username: self.username.as_deref().filter(|u| !u.is_empty()),
            avatar_url: self.avatar_url.as_deref().filter(|a| !a.is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload<'a> {
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<&'a str>,
}

/// A file part of the multipart body.
///
/// The open handle moves into the request body, so it is released once the
/// request finishes or is dropped on an error path.
#[derive(Debug)]
pub struct AttachmentPart {
    pub field_name: String,
    pub file_name: String,
    pub content: tokio::fs::File,
    pub length: u64,
}

impl AttachmentPart {
    pub async fn open(index: usize, path: &Path) -> Result<Self, NotifyError> {
        let attachment_err = |source| NotifyError::Attachment { path: path.to_path_buf(), source };

        let content = tokio::fs::File::open(path).await.map_err(attachment_err)?;
        let length = content.metadata().await.map_err(attachment_err)?.len();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self { field_name: format!("file{}", index), file_name, content, length })
    }

    fn into_part(self) -> Result<(String, Part), NotifyError> {
        let part = Part::stream_with_length(Body::from(self.content), self.length)
            .file_name(self.file_name)
            .mime_str(ATTACHMENT_CONTENT_TYPE)?;

        Ok((self.field_name, part))
    }
}

/// Opens every existing attachment, keeping the index from the original list.
/// Missing paths are skipped with a warning.
pub async fn collect_attachments(paths: &[PathBuf]) -> Result<Vec<AttachmentPart>, NotifyError> {
    let mut parts = Vec::with_capacity(paths.len());

    for (index, path) in paths.iter().enumerate() {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            warn!("Attachment '{}' not found, skipping", path.display());
            continue;
        }

        parts.push(AttachmentPart::open(index, path).await?);
    }

    Ok(parts)
}

/// Posts messages to a single webhook.
#[derive(Clone, Debug)]
pub struct Notifier {
    webhook_url: String,
    client: Client,
}

impl Notifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self::with_client(webhook_url, Client::new())
    }

    pub fn with_client(webhook_url: impl Into<String>, client: Client) -> Self {
        Self { webhook_url: webhook_url.into(), client }
    }

    /// Sends the message. Failures are logged and reported as `false`.
    #[tracing::instrument(
        name = "send_message",
        skip(self, request),
        fields(attachments = request.attachments.len())
    )]
    pub async fn send_message(&self, request: &NotificationRequest) -> bool {
        match self.try_send(request).await {
            Ok(()) => {
                info!("Message sent successfully");
                true
            }
            Err(e) => {
                error!("Failed to send message: {}", e);
                false
            }
        }
    }

    async fn try_send(&self, request: &NotificationRequest) -> Result<(), NotifyError> {
        let payload = request.payload();

        let response = if request.attachments.is_empty() {
            debug!("Sending JSON payload");
            self.client.post(&self.webhook_url).json(&payload).send().await?
        } else {
            let form = build_form(&payload, collect_attachments(&request.attachments).await?)?;
            self.client.post(&self.webhook_url).multipart(form).send().await?
        };

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status { status, body });
        }

        Ok(())
    }
}

fn build_form(payload: &WebhookPayload<'_>, attachments: Vec<AttachmentPart>) -> Result<Form, NotifyError> {
    debug!("Sending multipart payload with {} file part(s)", attachments.len());

    let mut form = Form::new().text(PAYLOAD_JSON_FIELD, serde_json::to_string(payload)?);
    for attachment in attachments {
        let (name, part) = attachment.into_part()?;
        form = form.part(name, part);
    }

    Ok(form)
}

#[async_trait]
impl MessageSender for Notifier {
    async fn send_message(&self, request: &NotificationRequest) -> bool {
        Notifier::send_message(self, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_payload_message_only() {
        let request = NotificationRequest::new("hello");

        assert_eq!(to_value(request.payload()).unwrap(), json!({ "content": "hello" }));
    }

    #[test]
    fn test_payload_with_username_and_avatar() {
        let request = NotificationRequest::new("hello")
            .with_username(Some("bot".to_string()))
            .with_avatar_url(Some("https://example.com/a.png".to_string()));

        assert_eq!(
            to_value(request.payload()).unwrap(),
            json!({
                "content": "hello",
                "username": "bot",
                "avatar_url": "https://example.com/a.png"
            })
        );
    }

    #[test]
    fn test_payload_skips_empty_optionals() {
        let request = NotificationRequest::new("")
            .with_username(Some(String::new()))
            .with_avatar_url(None);

        assert_eq!(to_value(request.payload()).unwrap(), json!({ "content": "" }));
    }

    #[tokio::test]
    async fn test_collect_attachments_keeps_original_index() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.txt");
        let b = temp_dir.path().join("b.txt");
        fs::write(&a, "aaa").unwrap();
        fs::write(&b, "bb").unwrap();

        let paths = vec![a, temp_dir.path().join("missing.txt"), b];
        let parts = collect_attachments(&paths).await.unwrap();

        let summary: Vec<_> = parts
            .iter()
            .map(|p| (p.field_name.as_str(), p.file_name.as_str(), p.length))
            .collect();
        assert_eq!(summary, vec![("file0", "a.txt", 3), ("file2", "b.txt", 2)]);
    }

    #[tokio::test]
    async fn test_collect_attachments_all_missing() {
        let temp_dir = TempDir::new().unwrap();
        let paths = vec![temp_dir.path().join("x"), temp_dir.path().join("y")];

        let parts = collect_attachments(&paths).await.unwrap();

        assert!(parts.is_empty());
    }
}
