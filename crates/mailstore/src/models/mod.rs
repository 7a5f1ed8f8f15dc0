//! Domain models for mail entities

mod address;
pub mod directory;
mod email;

pub use address::{AddressRole, EmailAddress};
pub use directory::Directory;
pub use email::{Attachment, BodyKind, Email, EmailBuilder, EmailId, Flags, MessageBody};
