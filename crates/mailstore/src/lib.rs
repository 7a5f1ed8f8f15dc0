//! Mailstore - persistence for a personal email client
//!
//! This crate provides platform-independent mail storage including:
//! - Domain models (Email, EmailAddress, AddressRole, Attachment)
//! - A normalized SQLite schema with directory and address catalogs
//! - A message store that decomposes and rebuilds complete emails
//! - Domain equality for emails (order-independent, BCC-blind)
//! - A transport trait with an in-process loopback implementation
//! - Send/receive helpers that file mail into `sent` and `inbox`
//!
//! This crate has zero UI dependencies.

pub mod config;
pub mod equivalence;
pub mod error;
pub mod models;
pub mod storage;
pub mod sync;
pub mod transport;

pub use config::DatabaseConfig;
pub use equivalence::{AttachmentMatch, equivalent, equivalent_with};
pub use error::{Result, StoreError};
pub use models::{
    AddressRole, Attachment, BodyKind, Directory, Email, EmailAddress, EmailBuilder, EmailId,
    Flags, MessageBody,
};
pub use storage::{
    AddressCatalog, ConnectionFactory, ConnectionProvider, DirectoryCatalog, MailStore,
    SqliteMailStore,
};
pub use sync::{SyncStats, receive_into_inbox, send_and_store};
pub use transport::{LoopbackMailer, Mailer};
