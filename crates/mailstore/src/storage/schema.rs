//! Database schema
//!
//! Each migration is applied in order. The user_version pragma tracks which
//! migrations have been applied.

use rusqlite_migration::{M, Migrations};

pub(crate) fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            -- Directory dimension
            CREATE TABLE directories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            INSERT INTO directories (name) VALUES ('inbox'), ('sent');

            -- Address dimension (append-only)
            CREATE TABLE addresses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                address TEXT NOT NULL UNIQUE
            );

            -- Emails; bodies are a JSON array of parts
            CREATE TABLE emails (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                msg_number INTEGER NOT NULL DEFAULT 0,
                rcv_date TEXT,
                directory INTEGER NOT NULL,
                from_email INTEGER NOT NULL,
                message TEXT NOT NULL DEFAULT '[]',
                sent_date TEXT,
                subject TEXT NOT NULL DEFAULT '',
                FOREIGN KEY (directory) REFERENCES directories(id) ON DELETE RESTRICT,
                FOREIGN KEY (from_email) REFERENCES addresses(id)
            );

            CREATE INDEX idx_emails_directory ON emails(directory);

            -- Attachments are owned by exactly one email
            CREATE TABLE attachments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                binary_data BLOB NOT NULL,
                filename TEXT NOT NULL,
                email INTEGER NOT NULL,
                FOREIGN KEY (email) REFERENCES emails(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_attachments_email ON attachments(email);

            -- Envelope roles: 1=BCC, 2=CC, 3=TO, 4=REPLYTO
            CREATE TABLE email_address (
                email_id INTEGER NOT NULL,
                address_id INTEGER NOT NULL,
                address_type INTEGER NOT NULL CHECK (address_type BETWEEN 1 AND 4),
                position INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (email_id) REFERENCES emails(id) ON DELETE CASCADE,
                FOREIGN KEY (address_id) REFERENCES addresses(id)
            );

            CREATE INDEX idx_email_address_email ON email_address(email_id, address_type);
            "#,
        ),
        // Migration 2: Persist receipt flags of received mail
        M::up(
            r#"
            ALTER TABLE emails ADD COLUMN flags INTEGER;
            "#,
        ),
    ])
}
