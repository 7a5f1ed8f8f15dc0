//! Mail transport
//!
//! The network side of the client is a collaborator behind the [`Mailer`]
//! trait: it accepts an [`Email`](crate::models::Email) to send and hands
//! back unseen incoming mail as `Email` values.

mod loopback;
mod traits;

pub use loopback::LoopbackMailer;
pub use traits::Mailer;
