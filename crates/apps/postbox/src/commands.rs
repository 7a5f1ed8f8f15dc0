//! Subcommand handlers

use std::path::Path;

use anyhow::{Context, Result, bail};
use log::info;
use mailstore::{DatabaseConfig, Email, EmailId, MailStore, SqliteMailStore};

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn list_dirs(store: &SqliteMailStore, json: bool) -> Result<()> {
    let dirs = store.directories().list()?;

    if json {
        let items: Vec<serde_json::Value> = dirs
            .iter()
            .map(|dir| -> Result<serde_json::Value> {
                Ok(serde_json::json!({
                    "id": dir.id,
                    "name": dir.name,
                    "emails": store.count_in_directory(&dir.name)?,
                }))
            })
            .collect::<Result<_>>()?;
        return print_json(&serde_json::json!({ "directories": items }));
    }

    for dir in &dirs {
        let count = store.count_in_directory(&dir.name)?;
        println!("  {:<4} {:<30} {:>6}", dir.id, dir.name, count);
    }
    Ok(())
}

pub fn create_dir(store: &SqliteMailStore, name: &str, json: bool) -> Result<()> {
    let id = store.directories().create(name)?;
    if json {
        return print_json(&serde_json::json!({ "id": id, "name": name.trim() }));
    }
    println!("Created directory '{}' ({})", name.trim(), id);
    Ok(())
}

pub fn rename_dir(store: &SqliteMailStore, old_name: &str, new_name: &str, json: bool) -> Result<()> {
    let renamed = store.directories().rename(old_name, new_name)?;
    if json {
        return print_json(&serde_json::json!({ "renamed": renamed }));
    }
    if renamed == 0 {
        bail!("No directory named '{}'", old_name);
    }
    println!("Renamed '{}' to '{}'", old_name, new_name);
    Ok(())
}

pub fn delete_dir(store: &SqliteMailStore, name: &str, json: bool) -> Result<()> {
    let deleted = store.directories().delete(name)?;
    if json {
        return print_json(&serde_json::json!({ "deleted": deleted }));
    }
    if deleted == 0 {
        bail!("No directory named '{}'", name);
    }
    println!("Deleted directory '{}'", name);
    Ok(())
}

pub fn list_mail(
    store: &SqliteMailStore,
    dir: Option<&str>,
    start: Option<i64>,
    count: Option<i64>,
    json: bool,
) -> Result<()> {
    let emails = match (dir, count) {
        (Some(dir), _) => store.find_in_directory(dir)?,
        (None, Some(count)) => store.find_range(start.unwrap_or(0), count)?,
        (None, None) => store.find_all()?,
    };

    if json {
        let items: Vec<serde_json::Value> = emails.iter().map(summary_json).collect();
        return print_json(&serde_json::json!({
            "result_count": emails.len(),
            "results": items,
        }));
    }

    for email in &emails {
        let id = email.id.map(|id| id.to_string()).unwrap_or_default();
        let date = email
            .date()
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "  {:<6} {:<12} {:<17} {:<30} {}",
            id,
            email.directory,
            date,
            truncate(&email.from.email, 30),
            truncate(&email.subject, 50)
        );
    }
    Ok(())
}

pub fn show_mail(store: &SqliteMailStore, id: i64, json: bool) -> Result<()> {
    let Some(email) = store.find_by_id(EmailId::new(id))? else {
        bail!("No email with id {}", id);
    };

    if json {
        return print_json(&serde_json::to_value(&email)?);
    }

    println!("Directory: {}", email.directory);
    println!("From:      {}", email.from.display());
    for role in mailstore::AddressRole::ALL {
        let list = email.recipients(role);
        if !list.is_empty() {
            let joined: Vec<String> = list.iter().map(|addr| addr.display()).collect();
            println!("{:<10} {}", format!("{}:", role), joined.join(", "));
        }
    }
    if let Some(date) = email.sent_date {
        println!("Sent:      {}", date.to_rfc3339());
    }
    if let Some(date) = email.received_date {
        println!("Received:  {}", date.to_rfc3339());
    }
    println!("Subject:   {}", email.subject);
    for attachment in &email.attachments {
        println!("Attached:  {} ({} bytes)", attachment.filename, attachment.size());
    }
    println!();
    println!("{}", email.text());
    Ok(())
}

pub fn move_mail(store: &SqliteMailStore, id: i64, directory: &str, json: bool) -> Result<()> {
    let Some(mut email) = store.find_by_id(EmailId::new(id))? else {
        bail!("No email with id {}", id);
    };
    email.directory = directory.to_string();
    let moved = store.update_directory(&email)?;

    if json {
        return print_json(&serde_json::json!({ "moved": moved }));
    }
    println!("Moved email {} to '{}'", id, directory.trim());
    Ok(())
}

pub fn delete_mail(store: &SqliteMailStore, id: i64, json: bool) -> Result<()> {
    let deleted = store.delete(EmailId::new(id))?;
    if json {
        return print_json(&serde_json::json!({ "deleted": deleted }));
    }
    if deleted == 0 {
        bail!("No email with id {}", id);
    }
    println!("Deleted email {}", id);
    Ok(())
}

pub fn import_mail(store: &SqliteMailStore, path: &Path, json: bool) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let emails = parse_import(&content)
        .with_context(|| format!("Failed to parse emails from {}", path.display()))?;

    let mut ids = Vec::with_capacity(emails.len());
    for mut email in emails {
        // Imported files may carry ids from another store
        email.id = None;
        ids.push(store.save(&mut email)?.get());
    }
    info!("Imported {} email(s) from {}", ids.len(), path.display());

    if json {
        return print_json(&serde_json::json!({ "imported": ids }));
    }
    println!("Imported {} email(s)", ids.len());
    Ok(())
}

pub fn show_config(db_config: &DatabaseConfig, file: Option<&Path>, json: bool) -> Result<()> {
    let file = file
        .map(Path::to_path_buf)
        .or_else(DatabaseConfig::default_config_path);

    if json {
        return print_json(&serde_json::json!({
            "config_file": file,
            "database": db_config.database_path(),
            "config": db_config,
        }));
    }

    match file {
        Some(path) if path.exists() => println!("Config file: {}", path.display()),
        Some(path) => println!("Config file: {} (not present, using defaults)", path.display()),
        None => println!("Config file: unavailable on this platform"),
    }
    println!("Database:    {}", db_config.database_path().display());
    println!("Timeout:     {}ms", db_config.busy_timeout_ms);
    Ok(())
}

pub fn init_config(db_config: &DatabaseConfig, file: Option<&Path>, json: bool) -> Result<()> {
    db_config.validate()?;

    let written = match file {
        Some(path) => {
            db_config.save_to(path)?;
            path.to_path_buf()
        }
        None => {
            db_config.save()?;
            DatabaseConfig::default_config_path()
                .context("Could not determine config directory")?
        }
    };
    info!("Wrote database config to {}", written.display());

    if json {
        return print_json(&serde_json::json!({ "written": written }));
    }
    println!("Wrote {}", written.display());
    Ok(())
}

/// Accepts either a single email object or an array of them
fn parse_import(content: &str) -> serde_json::Result<Vec<Email>> {
    if content.trim_start().starts_with('[') {
        serde_json::from_str(content)
    } else {
        serde_json::from_str(content).map(|email| vec![email])
    }
}

fn summary_json(email: &Email) -> serde_json::Value {
    serde_json::json!({
        "id": email.id,
        "directory": email.directory,
        "date": email.date().map(|d| d.to_rfc3339()),
        "from": email.from.email,
        "subject": email.subject,
        "received": email.is_received(),
        "attachments": email.attachments.len(),
    })
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", cut)
}
