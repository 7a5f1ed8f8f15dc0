//! Integration tests for the mailstore crate
//!
//! These tests verify the complete flow from composing to storing and reading back.

use std::sync::Arc;

use mailstore::models::{AddressRole, Email, EmailAddress, EmailId, directory};
use mailstore::storage::{
    AddressCatalog, ConnectionFactory, ConnectionProvider, DirectoryCatalog, MailStore,
    SqliteMailStore,
};
use mailstore::{DatabaseConfig, LoopbackMailer, Mailer, StoreError};
use mailstore::{receive_into_inbox, send_and_store};
use tempfile::TempDir;

/// Helper to open a store, its catalogs and the raw connection provider
fn open(dir: &TempDir) -> (Arc<ConnectionProvider>, SqliteMailStore) {
    let provider = Arc::new(ConnectionProvider::new(&DatabaseConfig::new(dir.path(), "it")).unwrap());
    let store = SqliteMailStore::new(provider.clone());
    (provider, store)
}

fn row_count(provider: &ConnectionProvider, table: &str) -> i64 {
    let conn = provider.connect().unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .unwrap()
}

/// Helper to create a test email
fn make_email(from: &str, subject: &str, directory: &str) -> Email {
    Email::builder(from)
        .directory(directory)
        .to(["a@x.com", "b@x.com"])
        .cc(["c@x.com"])
        .bcc(["d@x.com"])
        .reply_to(["replies@x.com"])
        .subject(subject)
        .text(format!("Body of {}", subject))
        .html(format!("<p>Body of {}</p>", subject))
        .attachment("notes.txt", b"some notes".to_vec())
        .build()
}

#[test]
fn test_sent_email_with_attachment_round_trip() {
    let dir = TempDir::new().unwrap();
    let (_provider, store) = open(&dir);

    let pic = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
    let mut email = Email::builder("me@x.com")
        .directory("sent")
        .to(["a@x.com"])
        .subject("hi")
        .text("see picture")
        .attachment("pic.jpg", pic.clone())
        .build();
    store.save(&mut email).unwrap();

    let sent = store.find_in_directory("sent").unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "hi");
    assert_eq!(sent[0].attachments.len(), 1);
    assert_eq!(sent[0].attachments[0].filename, "pic.jpg");
    assert_eq!(sent[0].attachments[0].data, pic);
    assert!(sent[0].is_equivalent(&email));
}

#[test]
fn test_every_role_survives_round_trip() {
    let dir = TempDir::new().unwrap();
    let (_provider, store) = open(&dir);

    let mut email = make_email("sender@x.com", "roles", "work");
    let id = store.save(&mut email).unwrap();
    let loaded = store.find_by_id(id).unwrap().unwrap();

    for role in AddressRole::ALL {
        assert_eq!(
            loaded.recipients(role),
            email.recipients(role),
            "{} recipients differ",
            role
        );
    }
    assert_eq!(loaded.bodies, email.bodies);
    assert_eq!(loaded.directory, "work");
}

#[test]
fn test_directory_rows_are_shared() {
    let dir = TempDir::new().unwrap();
    let (provider, store) = open(&dir);
    let before = row_count(&provider, "directories");

    for i in 0..3 {
        let mut email = make_email("sender@x.com", &format!("n{}", i), "projects");
        store.save(&mut email).unwrap();
    }

    assert_eq!(row_count(&provider, "directories"), before + 1);
    assert_eq!(store.count_in_directory("projects").unwrap(), 3);
}

#[test]
fn test_address_rows_are_shared() {
    let dir = TempDir::new().unwrap();
    let (provider, store) = open(&dir);

    let mut first = make_email("shared@x.com", "one", directory::INBOX);
    let mut second = make_email("shared@x.com", "two", directory::INBOX);
    store.save(&mut first).unwrap();
    store.save(&mut second).unwrap();

    // shared@, a@, b@, c@, d@, replies@
    assert_eq!(row_count(&provider, "addresses"), 6);
    assert_eq!(store.addresses().count().unwrap(), 6);
}

#[test]
fn test_delete_is_idempotent_and_leaves_no_orphans() {
    let dir = TempDir::new().unwrap();
    let (provider, store) = open(&dir);

    let mut keep = make_email("sender@x.com", "keep", directory::INBOX);
    let mut gone = make_email("sender@x.com", "gone", directory::INBOX);
    store.save(&mut keep).unwrap();
    let id = store.save(&mut gone).unwrap();

    assert_eq!(store.delete(id).unwrap(), 1);
    assert_eq!(store.delete(id).unwrap(), 0);
    assert_eq!(store.delete(EmailId(9999)).unwrap(), 0);

    assert!(store.find_by_id(id).unwrap().is_none());
    assert_eq!(row_count(&provider, "attachments"), 1);
    // to a, to b, cc c, bcc d, reply-to
    assert_eq!(row_count(&provider, "email_address"), 5);
    assert_eq!(store.find_all().unwrap()[0].subject, "keep");
}

#[test]
fn test_update_directory_creates_target() {
    let dir = TempDir::new().unwrap();
    let (_provider, store) = open(&dir);

    let mut email = make_email("sender@x.com", "move me", directory::INBOX);
    store.save(&mut email).unwrap();
    assert!(store.directories().find_id("archive").unwrap().is_none());

    email.directory = "archive".into();
    assert_eq!(store.update_directory(&email).unwrap(), 1);

    assert!(store.directories().find_id("archive").unwrap().is_some());
    assert!(store.find_in_directory(directory::INBOX).unwrap().is_empty());
    let archived = store.find_in_directory("archive").unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].id, email.id);
}

#[test]
fn test_catalogs_share_one_database() {
    let dir = TempDir::new().unwrap();
    let (provider, store) = open(&dir);
    let directories = DirectoryCatalog::new(provider.clone());
    let addresses = AddressCatalog::new(provider.clone());

    let id = directories.create("receipts").unwrap();
    assert_eq!(store.directories().find_id("receipts").unwrap(), Some(id));
    assert!(matches!(
        directories.create("receipts"),
        Err(StoreError::DuplicateName(_))
    ));

    let addr = addresses.find_or_create_id("someone@x.com").unwrap();
    assert_eq!(store.addresses().find_id("someone@x.com").unwrap(), Some(addr));
}

#[test]
fn test_reopening_keeps_data() {
    let dir = TempDir::new().unwrap();
    let id = {
        let (_provider, store) = open(&dir);
        let mut email = make_email("sender@x.com", "persisted", "keep");
        store.save(&mut email).unwrap()
    };

    let (_provider, store) = open(&dir);
    let loaded = store.find_by_id(id).unwrap().unwrap();
    assert_eq!(loaded.subject, "persisted");
    assert_eq!(loaded.directory, "keep");
}

#[test]
fn test_range_pages_through_all_mail() {
    let dir = TempDir::new().unwrap();
    let (_provider, store) = open(&dir);

    for i in 0..5 {
        let mut email = make_email("sender@x.com", &format!("page {}", i), directory::INBOX);
        store.save(&mut email).unwrap();
    }

    let subjects: Vec<String> = [0, 2, 4]
        .into_iter()
        .flat_map(|start| store.find_range(start, 2).unwrap())
        .map(|email| email.subject)
        .collect();
    assert_eq!(subjects, ["page 0", "page 1", "page 2", "page 3", "page 4"]);
}

#[test]
fn test_bcc_only_visible_on_sender_copy() {
    let dir = TempDir::new().unwrap();
    let (_provider, store) = open(&dir);
    let mailer = LoopbackMailer::new("a@x.com");

    let outgoing = make_email("me@x.com", "loopback", directory::SENT);
    let sent = send_and_store(&mailer, &store, &outgoing).unwrap();
    let stats = receive_into_inbox(&mailer, &store).unwrap();
    assert_eq!(stats.messages_stored, 1);

    let sent_copy = store.find_by_id(sent.id.unwrap()).unwrap().unwrap();
    assert_eq!(sent_copy.bcc, vec![EmailAddress::new("d@x.com")]);

    let inbox = store.find_in_directory(directory::INBOX).unwrap();
    assert_eq!(inbox.len(), 1);
    assert!(inbox[0].bcc.is_empty());
    assert!(inbox[0].is_equivalent(&sent_copy));
    assert!(sent_copy.is_equivalent(&inbox[0]));
}

#[test]
fn test_unknown_sender_cannot_send() {
    let mailer = LoopbackMailer::new("a@x.com");
    let mut email = make_email("me@x.com", "nobody", directory::SENT);
    email.from = EmailAddress::new(" ");
    assert!(mailer.send(&email).is_err());
}
