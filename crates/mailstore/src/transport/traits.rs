//! Transport trait definitions

use anyhow::Result;

use crate::models::Email;

/// Trait for sending and receiving mail
pub trait Mailer: Send + Sync {
    /// Send an email and return the copy as sent (with its sent date stamped)
    fn send(&self, email: &Email) -> Result<Email>;

    /// Fetch every message not yet seen; each is returned once
    fn receive_unseen(&self) -> Result<Vec<Email>>;
}
