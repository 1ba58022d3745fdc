//! Text output for search results, favorites and database records.

use gokp_core::favorites::{DATABASE_PATH, DATABASE_SOURCE, FAVORITE_INDEX};
use gokp_core::metavault::KEY_FILE_PATH;
use gokp_core::models::{Field, PASSWORD, TITLE, URL, USERNAME};
use gokp_core::{DatabaseRecord, Entry, SearchResult};
use std::io::{self, Write};

const NOTES_PREVIEW: usize = 100;
const PROTECTED: &str = "[PROTECTED]";
const RULE: &str = "--------------------";
const WIDE_RULE: &str = "-------------------------------------------------------";

/// Notes cut down to [`NOTES_PREVIEW`] characters.
pub fn notes_preview(notes: &str) -> String {
    match notes.char_indices().nth(NOTES_PREVIEW) {
        Some((cut, _)) => format!("{}...", &notes[..cut]),
        None => notes.to_string(),
    }
}

fn masked(field: &Field) -> &str {
    if field.protected || field.key == PASSWORD {
        PROTECTED
    } else {
        &field.value
    }
}

pub fn search_result(
    out: &mut dyn Write,
    selection: usize,
    result: &SearchResult,
) -> io::Result<()> {
    let entry = &result.entry;

    writeln!(out, "\n{RULE}")?;
    writeln!(out, "Selection: {selection}")?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "Title:     {}", entry.title)?;
    writeln!(out, "Database:  {}", result.db_name)?;
    if !entry.username.is_empty() {
        writeln!(out, "Username:  {}", entry.username)?;
    }
    if !entry.url.is_empty() {
        writeln!(out, "URL:       {}", entry.url)?;
    }
    if !entry.notes.is_empty() {
        writeln!(out, "Notes:     {}", notes_preview(&entry.notes))?;
    }
    writeln!(out, "UUID:      {}", entry.uuid_hex())?;

    if !entry.custom.is_empty() {
        writeln!(out, "Custom Attributes:")?;
        for field in &entry.custom {
            writeln!(out, "- {}: {}", field.key, masked(field))?;
        }
    }
    Ok(())
}

/// The numbered list shown before asking which result to keep.
pub fn selection_summary(out: &mut dyn Write, results: &[SearchResult]) -> io::Result<()> {
    writeln!(out, "\n{RULE}")?;
    write!(out, "SUMMARY SELECTION LIST:")?;
    for (i, result) in results.iter().enumerate() {
        write!(
            out,
            "\n{}: {} (UUID: {}, DB: {})",
            i + 1,
            result.entry.title,
            result.entry.uuid_hex(),
            result.db_name
        )?;
    }
    writeln!(out)
}

pub fn favorite(
    out: &mut dyn Write,
    index: u64,
    entry: &Entry,
    show_password: bool,
) -> io::Result<()> {
    writeln!(out, "\n------ Entry -------")?;
    writeln!(out, "Favorite: {index}")?;
    writeln!(out, "Title:    {}", entry.title)?;
    if !entry.username.is_empty() {
        writeln!(out, "Username: {}", entry.username)?;
    }
    if !entry.url.is_empty() {
        writeln!(out, "URL:      {}", entry.url)?;
    }
    if show_password {
        writeln!(out, "----- Password -----")?;
        writeln!(out, "{}", entry.password)?;
    }
    writeln!(out, "{RULE}")
}

/// One block of `gokp favorites list`.
pub fn favorite_summary(out: &mut dyn Write, entry: &Entry, detail: bool) -> io::Result<()> {
    writeln!(out, "\n{WIDE_RULE}")?;
    writeln!(
        out,
        "[{}] | Title: {} | Username: {}",
        entry.attribute(FAVORITE_INDEX),
        entry.title,
        entry.username
    )?;
    writeln!(out, "{WIDE_RULE}")?;
    writeln!(out, "Database:  {}", entry.attribute(DATABASE_SOURCE))?;
    if !entry.url.is_empty() {
        writeln!(out, "URL:       {}", entry.url)?;
    }

    let shown = [TITLE, USERNAME, URL, DATABASE_SOURCE];
    let (provenance, rest): (Vec<Field>, Vec<Field>) = entry
        .fields()
        .into_iter()
        .filter(|f| !shown.contains(&f.key.as_str()))
        .partition(|f| f.key == DATABASE_PATH || f.key == FAVORITE_INDEX);

    writeln!(out, "Custom Attributes:")?;
    writeln!(out, "- {}: {}", DATABASE_SOURCE, entry.attribute(DATABASE_SOURCE))?;
    for field in &provenance {
        writeln!(out, "- {}: {}", field.key, field.value)?;
    }
    if detail {
        for field in rest.iter().filter(|f| !f.value.is_empty()) {
            writeln!(out, "- {}: {}", field.key, masked(field))?;
        }
    }
    Ok(())
}

pub fn database_list(out: &mut dyn Write, records: &[DatabaseRecord]) -> io::Result<()> {
    writeln!(out, "Databases:")?;
    for record in records {
        writeln!(out, "- {}", record.name)?;
        writeln!(out, "    Path: {}", record.path.display())?;
        if let Some(key_file) = &record.key_file {
            writeln!(out, "    Key:  {}", key_file.display())?;
        }
    }
    Ok(())
}

/// Every attribute of each record, secrets masked.
pub fn database_dump(out: &mut dyn Write, entries: &[Entry]) -> io::Result<()> {
    writeln!(out, "Databases:")?;
    for entry in entries {
        writeln!(out, "\n--- {} ---", entry.title)?;
        for field in entry.fields() {
            if field.key == KEY_FILE_PATH && field.value.is_empty() {
                continue;
            }
            writeln!(out, "{}: {}", field.key, masked(&field))?;
        }
    }
    Ok(())
}
