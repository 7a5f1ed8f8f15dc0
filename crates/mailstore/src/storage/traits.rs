//! Storage trait definitions

use crate::error::Result;
use crate::models::{Email, EmailId};

/// Trait for email storage operations
///
/// Lookups report absence as `None` or an empty list, and mutations report
/// how many rows they touched; neither treats "not found" as an error.
pub trait MailStore: Send + Sync {
    /// Persist a new email and assign its id
    ///
    /// On success `email.id` is set, so the caller can keep using the same value.
    fn save(&self, email: &mut Email) -> Result<EmailId>;

    /// Get an email by id
    fn find_by_id(&self, id: EmailId) -> Result<Option<Email>>;

    /// All emails, ordered by id
    fn find_all(&self) -> Result<Vec<Email>>;

    /// All emails filed under a directory, ordered by id
    fn find_in_directory(&self, directory: &str) -> Result<Vec<Email>>;

    /// A page of emails ordered by id, skipping `start` and returning at most `count`
    fn find_range(&self, start: i64, count: i64) -> Result<Vec<Email>>;

    /// Move a stored email to `email.directory`, creating the directory if needed
    ///
    /// An email without a stored id moves nothing and returns 0.
    fn update_directory(&self, email: &Email) -> Result<usize>;

    /// Delete an email together with its attachments and envelope rows
    fn delete(&self, id: EmailId) -> Result<usize>;

    /// Count stored emails
    fn count(&self) -> Result<usize>;
}
