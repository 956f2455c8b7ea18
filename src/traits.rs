use crate::notifications::NotificationRequest;
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// Trait for delivering a notification
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send the request, returning whether the webhook accepted it
    async fn send_message(&self, request: &NotificationRequest) -> bool;
}
