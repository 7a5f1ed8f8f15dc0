//! Domain equality for emails
//!
//! The same email looks different depending on where it came from: a freshly
//! composed value, the copy returned by the transport after sending, and the
//! copy fetched back from a server can order recipients, parts and
//! attachments differently, and only the sender ever sees BCC. Equivalence
//! therefore compares:
//!
//! - `from` by address string
//! - `to` and `cc` as multisets of address strings
//! - attachments as multisets keyed by filename plus content (or size)
//! - bodies as multisets of trimmed content
//! - subject exactly
//!
//! BCC, reply-to, dates, directory, id and flags are ignored. Inputs are
//! never reordered; every comparison sorts its own copies.

use crate::models::{Attachment, Email, EmailAddress, MessageBody};

/// How strictly attachments are compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AttachmentMatch {
    /// Same filename and identical bytes
    #[default]
    Content,
    /// Same filename and same byte length
    Size,
}

/// True when `a` and `b` are the same email in the domain sense
pub fn equivalent(a: &Email, b: &Email) -> bool {
    equivalent_with(a, b, AttachmentMatch::default())
}

/// Like [`equivalent`], with an explicit attachment strictness
pub fn equivalent_with(a: &Email, b: &Email, attachments: AttachmentMatch) -> bool {
    a.from.email == b.from.email
        && same_addresses(&a.to, &b.to)
        && same_addresses(&a.cc, &b.cc)
        && same_attachments(&a.attachments, &b.attachments, attachments)
        && same_bodies(&a.bodies, &b.bodies)
        && a.subject == b.subject
}

impl Email {
    /// Domain equality; see the [`equivalence`](crate::equivalence) module
    pub fn is_equivalent(&self, other: &Email) -> bool {
        equivalent(self, other)
    }
}

fn sorted<T: Ord>(mut items: Vec<T>) -> Vec<T> {
    items.sort_unstable();
    items
}

fn address_key(list: &[EmailAddress]) -> Vec<&str> {
    sorted(list.iter().map(|addr| addr.email.as_str()).collect())
}

fn content_key(list: &[Attachment]) -> Vec<(&str, &[u8])> {
    sorted(
        list.iter()
            .map(|att| (att.filename.as_str(), att.data.as_slice()))
            .collect(),
    )
}

fn size_key(list: &[Attachment]) -> Vec<(&str, usize)> {
    sorted(
        list.iter()
            .map(|att| (att.filename.as_str(), att.size()))
            .collect(),
    )
}

fn body_key(list: &[MessageBody]) -> Vec<&str> {
    sorted(list.iter().map(|body| body.content.trim()).collect())
}

fn same_addresses(a: &[EmailAddress], b: &[EmailAddress]) -> bool {
    a.len() == b.len() && address_key(a) == address_key(b)
}

fn same_attachments(a: &[Attachment], b: &[Attachment], mode: AttachmentMatch) -> bool {
    if a.len() != b.len() {
        return false;
    }
    match mode {
        AttachmentMatch::Content => content_key(a) == content_key(b),
        AttachmentMatch::Size => size_key(a) == size_key(b),
    }
}

fn same_bodies(a: &[MessageBody], b: &[MessageBody]) -> bool {
    a.len() == b.len() && body_key(a) == body_key(b)
}
