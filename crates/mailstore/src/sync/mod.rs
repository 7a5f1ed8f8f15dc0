//! Sync between the transport and local storage
//!
//! Sent mail is filed under `sent`; unseen incoming mail is filed under
//! `inbox`, skipping messages that are already there.

mod mailbox;

pub use mailbox::{SyncStats, receive_into_inbox, send_and_store};
