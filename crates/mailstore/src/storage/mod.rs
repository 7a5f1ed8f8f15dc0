//! Storage layer
//!
//! Maps [`Email`](crate::models::Email) values onto a normalized SQLite
//! schema. Directories and addresses are dimension tables with
//! get-or-create semantics; attachments and envelope roles hang off each
//! email row.

mod addresses;
mod connection;
mod dimension;
mod directories;
mod messages;
mod schema;
mod traits;

pub use addresses::AddressCatalog;
pub use connection::{ConnectionFactory, ConnectionProvider};
pub use directories::DirectoryCatalog;
pub use messages::SqliteMailStore;
pub use traits::MailStore;
