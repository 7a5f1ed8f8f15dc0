//! Directory model: a named folder that emails are filed under

use serde::{Deserialize, Serialize};

/// Directory that received mail is filed into
pub const INBOX: &str = "inbox";
/// Directory that sent mail is filed into
pub const SENT: &str = "sent";

/// A stored directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    /// Database primary key
    pub id: i64,
    /// Unique, trimmed, non-empty name
    pub name: String,
}

/// Trim a directory name, returning `None` when nothing is left
pub fn normalize_name(name: &str) -> Option<&str> {
    let name = name.trim();
    if name.is_empty() { None } else { Some(name) }
}
