//! Email model: the self-contained value exchanged with the transport layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{AddressRole, EmailAddress, directory};

/// Database identifier for a stored email
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EmailId(pub i64);

impl EmailId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for EmailId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for EmailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content type of a body part
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    #[default]
    Plain,
    Html,
}

/// One text or HTML part of a message body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub kind: BodyKind,
    pub content: String,
}

impl MessageBody {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            kind: BodyKind::Plain,
            content: content.into(),
        }
    }

    pub fn html(content: impl Into<String>) -> Self {
        Self {
            kind: BodyKind::Html,
            content: content.into(),
        }
    }
}

/// A named binary attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// Size of the attachment in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Receipt state of a received email
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    #[serde(default)]
    pub seen: bool,
    #[serde(default)]
    pub answered: bool,
    #[serde(default)]
    pub flagged: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub recent: bool,
}

impl Flags {
    const SEEN: i64 = 1;
    const ANSWERED: i64 = 1 << 1;
    const FLAGGED: i64 = 1 << 2;
    const DELETED: i64 = 1 << 3;
    const DRAFT: i64 = 1 << 4;
    const RECENT: i64 = 1 << 5;

    /// Flags for a message that has just arrived and not been opened
    pub fn unseen() -> Self {
        Self {
            recent: true,
            ..Self::default()
        }
    }

    /// Pack into the integer stored in `emails.flags`
    pub fn to_bits(self) -> i64 {
        let mut bits = 0;
        for (set, bit) in [
            (self.seen, Self::SEEN),
            (self.answered, Self::ANSWERED),
            (self.flagged, Self::FLAGGED),
            (self.deleted, Self::DELETED),
            (self.draft, Self::DRAFT),
            (self.recent, Self::RECENT),
        ] {
            if set {
                bits |= bit;
            }
        }
        bits
    }

    pub fn from_bits(bits: i64) -> Self {
        Self {
            seen: bits & Self::SEEN != 0,
            answered: bits & Self::ANSWERED != 0,
            flagged: bits & Self::FLAGGED != 0,
            deleted: bits & Self::DELETED != 0,
            draft: bits & Self::DRAFT != 0,
            recent: bits & Self::RECENT != 0,
        }
    }
}

/// A complete email: envelope, bodies, attachments and storage metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
    /// Assigned by the store on first save; `None` until then
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EmailId>,
    /// Sequence number on the originating server
    #[serde(default)]
    pub message_number: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_date: Option<DateTime<Utc>>,
    /// Name of the directory this email is filed under
    pub directory: String,
    pub from: EmailAddress,
    #[serde(default)]
    pub to: Vec<EmailAddress>,
    #[serde(default)]
    pub cc: Vec<EmailAddress>,
    #[serde(default)]
    pub bcc: Vec<EmailAddress>,
    #[serde(default)]
    pub reply_to: Vec<EmailAddress>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub bodies: Vec<MessageBody>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Only present on received emails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<Flags>,
}

impl Email {
    /// Create a new email builder for an outgoing message from `from`
    pub fn builder(from: impl Into<EmailAddress>) -> EmailBuilder {
        EmailBuilder::new(from.into())
    }

    /// Addresses filed under `role`
    pub fn recipients(&self, role: AddressRole) -> &[EmailAddress] {
        match role {
            AddressRole::Bcc => &self.bcc,
            AddressRole::Cc => &self.cc,
            AddressRole::To => &self.to,
            AddressRole::ReplyTo => &self.reply_to,
        }
    }

    /// Mutable access to the addresses filed under `role`
    pub fn recipients_mut(&mut self, role: AddressRole) -> &mut Vec<EmailAddress> {
        match role {
            AddressRole::Bcc => &mut self.bcc,
            AddressRole::Cc => &mut self.cc,
            AddressRole::To => &mut self.to,
            AddressRole::ReplyTo => &mut self.reply_to,
        }
    }

    /// Whether this email came in from a server rather than being composed locally
    pub fn is_received(&self) -> bool {
        self.received_date.is_some()
    }

    /// The authoritative timestamp: received date for incoming mail, sent date otherwise
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.received_date.or(self.sent_date)
    }

    /// Concatenated plain-text parts, falling back to HTML parts
    pub fn text(&self) -> String {
        let plain: Vec<&str> = self
            .bodies
            .iter()
            .filter(|b| b.kind == BodyKind::Plain)
            .map(|b| b.content.as_str())
            .collect();
        if !plain.is_empty() {
            return plain.join("\n");
        }
        self.bodies
            .iter()
            .map(|b| b.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Builder for creating Email instances
pub struct EmailBuilder {
    email: Email,
}

impl EmailBuilder {
    fn new(from: EmailAddress) -> Self {
        Self {
            email: Email {
                id: None,
                message_number: 0,
                received_date: None,
                sent_date: None,
                directory: directory::SENT.to_string(),
                from,
                to: Vec::new(),
                cc: Vec::new(),
                bcc: Vec::new(),
                reply_to: Vec::new(),
                subject: String::new(),
                bodies: Vec::new(),
                attachments: Vec::new(),
                flags: None,
            },
        }
    }

    pub fn directory(mut self, directory: impl Into<String>) -> Self {
        self.email.directory = directory.into();
        self
    }

    pub fn to(mut self, to: impl IntoIterator<Item = impl Into<EmailAddress>>) -> Self {
        self.email.to = to.into_iter().map(Into::into).collect();
        self
    }

    pub fn cc(mut self, cc: impl IntoIterator<Item = impl Into<EmailAddress>>) -> Self {
        self.email.cc = cc.into_iter().map(Into::into).collect();
        self
    }

    pub fn bcc(mut self, bcc: impl IntoIterator<Item = impl Into<EmailAddress>>) -> Self {
        self.email.bcc = bcc.into_iter().map(Into::into).collect();
        self
    }

    pub fn reply_to(mut self, reply_to: impl IntoIterator<Item = impl Into<EmailAddress>>) -> Self {
        self.email.reply_to = reply_to.into_iter().map(Into::into).collect();
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.email.subject = subject.into();
        self
    }

    pub fn text(mut self, content: impl Into<String>) -> Self {
        self.email.bodies.push(MessageBody::plain(content));
        self
    }

    pub fn html(mut self, content: impl Into<String>) -> Self {
        self.email.bodies.push(MessageBody::html(content));
        self
    }

    pub fn attachment(mut self, filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.email.attachments.push(Attachment::new(filename, data));
        self
    }

    pub fn message_number(mut self, message_number: i64) -> Self {
        self.email.message_number = message_number;
        self
    }

    pub fn sent_date(mut self, sent_date: DateTime<Utc>) -> Self {
        self.email.sent_date = Some(sent_date);
        self
    }

    pub fn received_date(mut self, received_date: DateTime<Utc>) -> Self {
        self.email.received_date = Some(received_date);
        self
    }

    pub fn flags(mut self, flags: Flags) -> Self {
        self.email.flags = Some(flags);
        self
    }

    pub fn build(self) -> Email {
        self.email
    }
}

/// Serde adapter that encodes attachment bytes as standard base64 text
mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_to_sent() {
        let email = Email::builder("me@example.com")
            .to(["you@example.com"])
            .subject("hi")
            .build();

        assert_eq!(email.directory, directory::SENT);
        assert_eq!(email.id, None);
        assert_eq!(email.from.email, "me@example.com");
        assert_eq!(email.to.len(), 1);
        assert!(email.flags.is_none());
    }

    #[test]
    fn test_recipients_by_role() {
        let mut email = Email::builder("me@example.com")
            .to(["a@x.com"])
            .cc(["b@x.com", "c@x.com"])
            .bcc(["d@x.com"])
            .build();

        assert_eq!(email.recipients(AddressRole::To).len(), 1);
        assert_eq!(email.recipients(AddressRole::Cc).len(), 2);
        assert_eq!(email.recipients(AddressRole::Bcc).len(), 1);
        assert!(email.recipients(AddressRole::ReplyTo).is_empty());

        email
            .recipients_mut(AddressRole::ReplyTo)
            .push(EmailAddress::new("e@x.com"));
        assert_eq!(email.reply_to[0].email, "e@x.com");
    }

    #[test]
    fn test_email_id_accessors() {
        let id = EmailId::new(42);
        assert_eq!(id, EmailId(42));
        assert_eq!(id.get(), 42);
    }

    #[test]
    fn test_is_received() {
        let composed = Email::builder("me@example.com").build();
        assert!(!composed.is_received());

        let received = Email::builder("me@example.com")
            .received_date(chrono::Utc::now())
            .build();
        assert!(received.is_received());
    }

    #[test]
    fn test_flags_bits() {
        let flags = Flags {
            seen: true,
            flagged: true,
            ..Flags::default()
        };
        assert_eq!(Flags::from_bits(flags.to_bits()), flags);
        assert_eq!(Flags::default().to_bits(), 0);
        assert!(Flags::from_bits(Flags::unseen().to_bits()).recent);
    }

    #[test]
    fn test_text_prefers_plain_parts() {
        let email = Email::builder("me@example.com")
            .html("<p>hello</p>")
            .text("hello")
            .build();
        assert_eq!(email.text(), "hello");

        let html_only = Email::builder("me@example.com").html("<p>hi</p>").build();
        assert_eq!(html_only.text(), "<p>hi</p>");
    }

    #[test]
    fn test_json_attachment_is_base64() {
        let email = Email::builder("me@example.com")
            .attachment("a.bin", vec![0u8, 1, 2, 255])
            .build();

        let json = serde_json::to_string(&email).unwrap();
        assert!(json.contains("\"AAEC/w==\""));

        let parsed: Email = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.attachments[0].data, vec![0u8, 1, 2, 255]);
    }
}
