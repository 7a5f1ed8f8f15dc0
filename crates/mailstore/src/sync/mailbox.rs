//! Moving mail between the transport and local storage

use anyhow::{Context, Result};
use log::{error, info};

use crate::models::{Email, directory};
use crate::storage::MailStore;
use crate::transport::Mailer;

/// Statistics from a receive pass
#[derive(Debug, Default, Clone)]
pub struct SyncStats {
    /// Number of messages handed over by the transport
    pub messages_fetched: usize,
    /// Number of new messages stored
    pub messages_stored: usize,
    /// Number of messages skipped (already in the inbox)
    pub messages_skipped: usize,
    /// Number of messages that failed to store
    pub errors: usize,
    /// Duration of the receive pass
    pub duration_ms: u64,
}

/// Send an email and file the sent copy under `sent`
///
/// Returns the stored copy, with its id assigned.
pub fn send_and_store(mailer: &dyn Mailer, store: &dyn MailStore, email: &Email) -> Result<Email> {
    let mut sent = mailer.send(email).context("Failed to send email")?;
    sent.directory = directory::SENT.to_string();

    store
        .save(&mut sent)
        .context("Email was sent but could not be stored")?;
    Ok(sent)
}

/// Fetch unseen mail and file it under `inbox`
///
/// A message already in the inbox (same content and the same sent date) is
/// skipped, so redelivered mail is not stored twice. A message that fails to
/// store is logged and counted; the rest of the batch still goes through.
pub fn receive_into_inbox(mailer: &dyn Mailer, store: &dyn MailStore) -> Result<SyncStats> {
    let start = std::time::Instant::now();
    let mut stats = SyncStats::default();

    let received = mailer
        .receive_unseen()
        .context("Failed to receive unseen mail")?;
    stats.messages_fetched = received.len();

    if received.is_empty() {
        stats.duration_ms = start.elapsed().as_millis() as u64;
        return Ok(stats);
    }

    let mut inbox = store.find_in_directory(directory::INBOX)?;

    for mut email in received {
        let duplicate = inbox
            .iter()
            .any(|stored| stored.sent_date == email.sent_date && stored.is_equivalent(&email));
        if duplicate {
            stats.messages_skipped += 1;
            continue;
        }

        email.id = None;
        email.directory = directory::INBOX.to_string();
        match store.save(&mut email) {
            Ok(_) => {
                stats.messages_stored += 1;
                inbox.push(email);
            }
            Err(e) => {
                error!("Failed to store message {}: {}", email.message_number, e);
                stats.errors += 1;
            }
        }
    }

    stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Inbox sync: {} fetched, {} stored, {} skipped, {} errors in {}ms",
        stats.messages_fetched,
        stats.messages_stored,
        stats.messages_skipped,
        stats.errors,
        stats.duration_ms
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::models::EmailAddress;
    use crate::storage::SqliteMailStore;
    use crate::transport::LoopbackMailer;
    use tempfile::TempDir;

    fn store() -> (TempDir, SqliteMailStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteMailStore::open(&DatabaseConfig::new(dir.path(), "test")).unwrap();
        (dir, store)
    }

    fn note_to_self() -> Email {
        Email::builder("me@x.com")
            .to(["me@x.com"])
            .bcc(["archive@x.com"])
            .subject("reminder")
            .text("buy milk")
            .attachment("list.txt", b"milk\neggs".to_vec())
            .build()
    }

    #[test]
    fn test_send_and_store_files_under_sent() {
        let (_dir, store) = store();
        let mailer = LoopbackMailer::new("me@x.com");

        let stored = send_and_store(&mailer, &store, &note_to_self()).unwrap();
        assert!(stored.id.is_some());

        let sent = store.find_in_directory(directory::SENT).unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].bcc.len(), 1);
        assert!(sent[0].sent_date.is_some());
    }

    #[test]
    fn test_received_copy_matches_sent_copy() {
        let (_dir, store) = store();
        let mailer = LoopbackMailer::new("me@x.com");

        let sent = send_and_store(&mailer, &store, &note_to_self()).unwrap();
        let stats = receive_into_inbox(&mailer, &store).unwrap();
        assert_eq!(stats.messages_fetched, 1);
        assert_eq!(stats.messages_stored, 1);

        let inbox = store.find_in_directory(directory::INBOX).unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(inbox[0].bcc.is_empty());
        assert!(inbox[0].flags.is_some());
        assert!(inbox[0].is_equivalent(&sent));
    }

    #[test]
    fn test_redelivered_mail_is_skipped() {
        let (_dir, store) = store();
        let mailer = LoopbackMailer::new("me@x.com");

        let sent = mailer.send(&note_to_self()).unwrap();
        receive_into_inbox(&mailer, &store).unwrap();

        mailer.deliver(&sent);
        let stats = receive_into_inbox(&mailer, &store).unwrap();
        assert_eq!(stats.messages_skipped, 1);
        assert_eq!(stats.messages_stored, 0);
        assert_eq!(store.count_in_directory(directory::INBOX).unwrap(), 1);
    }

    #[test]
    fn test_bad_message_does_not_stop_batch() {
        let (_dir, store) = store();
        let mailer = LoopbackMailer::new("me@x.com");

        let mut broken = note_to_self();
        broken.from = EmailAddress::new("");
        mailer.deliver(&broken);
        mailer.deliver(&note_to_self());

        let stats = receive_into_inbox(&mailer, &store).unwrap();
        assert_eq!(stats.messages_fetched, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.messages_stored, 1);
    }

    #[test]
    fn test_nothing_to_receive() {
        let (_dir, store) = store();
        let mailer = LoopbackMailer::new("me@x.com");
        let stats = receive_into_inbox(&mailer, &store).unwrap();
        assert_eq!(stats.messages_fetched, 0);
        assert_eq!(store.count().unwrap(), 0);
    }
}
