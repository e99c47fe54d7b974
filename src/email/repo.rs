//! In-memory email repository
//!
//! Non-durable by design for this snapshot; the handlers only touch this
//! surface, so a persistent implementation can replace it without handler
//! changes.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Delivery status of an email
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    Pending,
    Sent,
    Failed,
    Bounced,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Bounced => "bounced",
        }
    }
}

impl std::fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Email {
    pub id: Uuid,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub status: EmailStatus,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// In-memory store; writes exclusive, reads shared
#[derive(Default)]
pub struct EmailRepo {
    inner: RwLock<HashMap<Uuid, Email>>,
}

impl EmailRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new email in `pending` state
    pub fn insert(&self, recipient: &str, subject: &str, body: &str) -> Email {
        let email = Email {
            id: Uuid::new_v4(),
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            status: EmailStatus::Pending,
            created_at: Utc::now(),
            sent_at: None,
        };

        let mut map = self.inner.write().expect("email repo lock poisoned");
        map.insert(email.id, email.clone());
        email
    }

    pub fn get(&self, id: Uuid) -> Option<Email> {
        let map = self.inner.read().expect("email repo lock poisoned");
        map.get(&id).cloned()
    }

    /// All emails, newest first
    pub fn list(&self) -> Vec<Email> {
        let map = self.inner.read().expect("email repo lock poisoned");
        let mut emails: Vec<Email> = map.values().cloned().collect();
        emails.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        emails
    }

    /// pending → sent; records the send time
    pub fn mark_sent(&self, id: Uuid) -> Result<Email, AppError> {
        self.transition(id, EmailStatus::Sent)
    }

    /// pending → failed
    pub fn mark_failed(&self, id: Uuid) -> Result<Email, AppError> {
        self.transition(id, EmailStatus::Failed)
    }

    fn transition(&self, id: Uuid, to: EmailStatus) -> Result<Email, AppError> {
        let mut map = self.inner.write().expect("email repo lock poisoned");
        let email = map.get_mut(&id).ok_or(AppError::EmailNotFound)?;

        if email.status != EmailStatus::Pending {
            return Err(AppError::Conflict(format!(
                "email is {} and can no longer transition",
                email.status
            )));
        }

        email.status = to;
        if to == EmailStatus::Sent {
            email.sent_at = Some(Utc::now());
        }

        Ok(email.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_starts_pending() {
        let repo = EmailRepo::new();
        let email = repo.insert("a@example.com", "hi", "body");
        assert_eq!(email.status, EmailStatus::Pending);
        assert!(email.sent_at.is_none());
        assert_eq!(repo.get(email.id).unwrap().id, email.id);
    }

    #[test]
    fn pending_to_sent_sets_sent_at() {
        let repo = EmailRepo::new();
        let email = repo.insert("a@example.com", "hi", "body");
        let sent = repo.mark_sent(email.id).unwrap();
        assert_eq!(sent.status, EmailStatus::Sent);
        assert!(sent.sent_at.is_some());
    }

    #[test]
    fn pending_to_failed_keeps_sent_at_empty() {
        let repo = EmailRepo::new();
        let email = repo.insert("a@example.com", "hi", "body");
        let failed = repo.mark_failed(email.id).unwrap();
        assert_eq!(failed.status, EmailStatus::Failed);
        assert!(failed.sent_at.is_none());
    }

    #[test]
    fn sent_email_cannot_transition_again() {
        let repo = EmailRepo::new();
        let email = repo.insert("a@example.com", "hi", "body");
        repo.mark_sent(email.id).unwrap();

        let err = repo.mark_failed(email.id).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn transition_on_missing_email_is_not_found() {
        let repo = EmailRepo::new();
        let err = repo.mark_sent(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::EmailNotFound));
    }

    #[test]
    fn list_is_newest_first() {
        let repo = EmailRepo::new();
        let first = repo.insert("a@example.com", "1", "b");
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = repo.insert("b@example.com", "2", "b");

        let listed = repo.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }
}
