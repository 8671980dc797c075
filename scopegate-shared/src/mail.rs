//! Outgoing mail
//!
//! Registration and password reset hand a link to a [`Mailer`]. The default
//! [`LogMailer`] writes messages to the log instead of sending them;
//! [`MemoryMailer`] keeps them in memory so tests can read the token back.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Mail delivery errors
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

/// A composed message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Mail {
    /// Email verification message carrying `token`
    pub fn verification(base_url: &str, to: &str, token: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Verify your email address".to_string(),
            body: format!(
                "Confirm your address by opening {}/verify-email?token={}\n\nThe link expires in 24 hours.",
                base_url.trim_end_matches('/'),
                token
            ),
        }
    }

    /// Password reset message carrying `token`
    pub fn password_reset(base_url: &str, to: &str, token: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Reset your password".to_string(),
            body: format!(
                "Choose a new password at {}/reset-password?token={}\n\nThe link expires in 1 hour. \
                 If you did not ask for a reset, ignore this message.",
                base_url.trim_end_matches('/'),
                token
            ),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: Mail) -> Result<(), MailError>;
}

/// Logs messages instead of delivering them
///
/// The body carries a live token, so it is logged at `debug` only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        tracing::info!(to = %mail.to, subject = %mail.subject, "outgoing mail");
        tracing::debug!(body = %mail.body, "outgoing mail body");
        Ok(())
    }
}

/// Collects messages in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryMailer {
    sent: Arc<Mutex<Vec<Mail>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Mail> {
        self.sent.lock().await.clone()
    }

    /// Most recent message addressed to `to`
    pub async fn last_to(&self, to: &str) -> Option<Mail> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|m| m.to == to)
            .cloned()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        self.sent.lock().await.push(mail);
        Ok(())
    }
}

/// Pulls the `token` query value out of a message body
pub fn extract_token(body: &str) -> Option<&str> {
    let start = body.find("token=")? + "token=".len();
    let rest = &body[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());

    (end > 0).then(|| &rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_link() {
        let mail = Mail::verification("https://app.example.com/", "a@b.co", "abc123");
        assert!(mail
            .body
            .contains("https://app.example.com/verify-email?token=abc123"));
        assert_eq!(extract_token(&mail.body), Some("abc123"));
    }

    #[test]
    fn test_reset_link() {
        let mail = Mail::password_reset("http://localhost:3000", "a@b.co", "xyz");
        assert!(mail.body.contains("http://localhost:3000/reset-password?token=xyz"));
        assert_eq!(extract_token(&mail.body), Some("xyz"));
    }

    #[test]
    fn test_extract_token_missing() {
        assert_eq!(extract_token("no link here"), None);
        assert_eq!(extract_token("token=\n"), None);
    }

    #[tokio::test]
    async fn test_memory_mailer_collects() {
        let mailer = MemoryMailer::new();
        mailer
            .send(Mail::verification("http://x", "one@x.io", "t1"))
            .await
            .unwrap();
        mailer
            .send(Mail::verification("http://x", "one@x.io", "t2"))
            .await
            .unwrap();

        assert_eq!(mailer.sent().await.len(), 2);
        let last = mailer.last_to("one@x.io").await.unwrap();
        assert_eq!(extract_token(&last.body), Some("t2"));
        assert!(mailer.last_to("two@x.io").await.is_none());
    }

    #[tokio::test]
    async fn test_log_mailer_succeeds() {
        assert!(LogMailer
            .send(Mail::password_reset("http://x", "a@b.co", "t"))
            .await
            .is_ok());
    }
}
