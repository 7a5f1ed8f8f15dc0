//! In-process transport
//!
//! Delivers mail addressed to its own mailbox straight into an unseen queue.
//! Used for tests and for running the client without a mail server.

use anyhow::{Result, bail};
use chrono::Utc;
use log::{debug, info};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use super::Mailer;
use crate::models::{AddressRole, Email, EmailAddress, Flags, directory};

/// A mailer whose server is an in-memory queue
///
/// Sending stamps the sent date and, when the owner's address is among the
/// recipients, queues a recipient copy: BCC removed, received date and
/// message number set, flags marked recent.
pub struct LoopbackMailer {
    owner: EmailAddress,
    unseen: Mutex<VecDeque<Email>>,
    next_number: AtomicI64,
}

impl LoopbackMailer {
    /// Create a loopback mailbox for `owner`
    pub fn new(owner: impl Into<EmailAddress>) -> Self {
        Self {
            owner: owner.into(),
            unseen: Mutex::new(VecDeque::new()),
            next_number: AtomicI64::new(1),
        }
    }

    pub fn owner(&self) -> &EmailAddress {
        &self.owner
    }

    /// Queue an incoming email as if another sender had delivered it
    pub fn deliver(&self, email: &Email) {
        let mut copy = email.clone();
        copy.id = None;
        copy.bcc.clear();
        copy.directory = directory::INBOX.to_string();
        copy.received_date = Some(Utc::now());
        copy.message_number = self.next_number.fetch_add(1, Ordering::SeqCst);
        copy.flags = Some(Flags::unseen());

        debug!(
            "Queued message {} from {} for {}",
            copy.message_number, copy.from.email, self.owner.email
        );
        self.unseen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(copy);
    }

    /// Number of messages waiting to be received
    pub fn pending(&self) -> usize {
        self.unseen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn addressed_to_owner(&self, email: &Email) -> bool {
        [AddressRole::To, AddressRole::Cc, AddressRole::Bcc]
            .into_iter()
            .flat_map(|role| email.recipients(role))
            .any(|addr| addr.email.eq_ignore_ascii_case(&self.owner.email))
    }
}

impl Mailer for LoopbackMailer {
    fn send(&self, email: &Email) -> Result<Email> {
        if email.from.email.trim().is_empty() {
            bail!("Cannot send an email without a sender");
        }
        if email.to.is_empty() && email.cc.is_empty() && email.bcc.is_empty() {
            bail!("Cannot send an email without recipients");
        }

        let mut sent = email.clone();
        sent.id = None;
        sent.directory = directory::SENT.to_string();
        sent.sent_date = Some(Utc::now());
        sent.received_date = None;
        sent.flags = None;

        if self.addressed_to_owner(&sent) {
            self.deliver(&sent);
        }

        info!("Sent '{}' from {}", sent.subject, sent.from.email);
        Ok(sent)
    }

    fn receive_unseen(&self) -> Result<Vec<Email>> {
        let mut unseen = self
            .unseen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let received: Vec<Email> = unseen.drain(..).collect();
        if !received.is_empty() {
            info!("Received {} unseen message(s) for {}", received.len(), self.owner.email);
        }
        Ok(received)
    }
}
