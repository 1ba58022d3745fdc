//! Search across every external database registered in the meta-vault.
//!
//! Each external is opened, walked and locked before the next one is
//! touched. Results keep a deterministic order: record order in the
//! `databases` group, then pre-order over groups, then entry order.

use crate::database::Vault;
use crate::error::{Error, Result};
use crate::metavault::{DatabaseRecord, MetaVault};
use crate::models::{Entry, Group};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::fmt;
use std::path::PathBuf;

/// Flags accepted by `gokp search`.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    pub exact: bool,
    /// Only search the root-level group with this name.
    pub group: Option<String>,
    /// Only search the registered database with this nickname.
    pub database: Option<String>,
}

/// A matched entry together with the database it came from.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub entry: Entry,
    pub db_name: String,
    pub db_path: PathBuf,
}

/// Why an external database did not take part in a search.
#[derive(Debug)]
pub enum SkipReason {
    NoPath,
    Missing(PathBuf),
    Unreadable(Error),
}

#[derive(Debug)]
pub struct Skipped {
    pub name: String,
    pub reason: SkipReason,
}

impl fmt::Display for Skipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            SkipReason::NoPath => write!(
                f,
                "Database '{}' has no path configured, skipping.",
                self.name
            ),
            SkipReason::Missing(path) => write!(
                f,
                "Database file '{}' not found for database '{}', skipping.",
                path.display(),
                self.name
            ),
            SkipReason::Unreadable(err) => write!(
                f,
                "Failed to open database '{}': {}, skipping.",
                self.name, err
            ),
        }
    }
}

/// Outcome of a fan-out search.
#[derive(Debug, Default)]
pub struct SearchReport {
    pub results: Vec<SearchResult>,
    /// Number of externals that were opened and walked.
    pub searched: usize,
    pub skipped: Vec<Skipped>,
}

/// Search every database recorded in `meta`.
pub fn search(meta: &MetaVault, query: &str, options: &SearchOptions) -> Result<SearchReport> {
    let records = meta.database_records()?;
    Ok(search_records(&records, query, options))
}

/// Search the given external databases one after another.
pub fn search_records(
    records: &[DatabaseRecord],
    query: &str,
    options: &SearchOptions,
) -> SearchReport {
    let mut report = SearchReport::default();

    for record in records {
        if options
            .database
            .as_deref()
            .is_some_and(|wanted| wanted != record.name)
        {
            continue;
        }

        let vault = match open_record(record) {
            Ok(vault) => vault,
            Err(reason) => {
                let skipped = Skipped {
                    name: record.name.clone(),
                    reason,
                };
                tracing::info!("{}", skipped);
                report.skipped.push(skipped);
                continue;
            }
        };

        report.searched += 1;
        let matches = search_vault(&vault, query, options);
        vault.lock();

        tracing::debug!("{} match(es) in '{}'", matches.len(), record.name);
        report
            .results
            .extend(matches.into_iter().map(|entry| SearchResult {
                entry,
                db_name: record.name.clone(),
                db_path: record.path.clone(),
            }));
    }

    report
}

fn open_record(record: &DatabaseRecord) -> std::result::Result<Vault, SkipReason> {
    if record.path.as_os_str().is_empty() {
        return Err(SkipReason::NoPath);
    }
    if !record.path.exists() {
        return Err(SkipReason::Missing(record.path.clone()));
    }
    Vault::open(&record.path, &record.password, record.key_file.as_deref())
        .map_err(SkipReason::Unreadable)
}

/// Skim matcher used for the in-order (fuzzy) pass.
///
/// Smart-case is off: case folding is decided by `case_sensitive` alone.
pub fn matcher() -> SkimMatcherV2 {
    SkimMatcherV2::default().respect_case()
}

/// Matching entries of one opened vault.
pub fn search_vault(vault: &Vault, query: &str, options: &SearchOptions) -> Vec<Entry> {
    let matcher = matcher();
    let mut found = Vec::new();

    let start = match options.group.as_deref() {
        Some(name) => vault.group(&[name]),
        None => Some(vault.root()),
    };
    if let Some(group) = start {
        search_group(&matcher, &group, query, options, &mut found);
    }

    found
}

/// Pre-order walk: a group's own entries, then each subgroup.
pub fn search_group(
    matcher: &SkimMatcherV2,
    group: &Group,
    query: &str,
    options: &SearchOptions,
    found: &mut Vec<Entry>,
) {
    for entry in &group.entries {
        if matches(matcher, entry, query, options.case_sensitive, options.exact) {
            found.push(entry.clone());
        }
    }
    for child in &group.groups {
        search_group(matcher, child, query, options, found);
    }
}

fn normalize(text: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        text.to_string()
    } else {
        text.to_lowercase()
    }
}

/// Whether `entry` matches `query`.
///
/// Exact mode compares Title, UserName, URL and Notes for equality. Otherwise
/// any substring hit on those fields or the joined custom values wins, and
/// failing that an in-order fuzzy hit from `matcher`.
pub fn matches(
    matcher: &SkimMatcherV2,
    entry: &Entry,
    query: &str,
    case_sensitive: bool,
    exact: bool,
) -> bool {
    let query = normalize(query, case_sensitive);
    let standard = [&entry.title, &entry.username, &entry.url, &entry.notes]
        .map(|field| normalize(field, case_sensitive));

    if exact {
        return standard.iter().any(|field| *field == query);
    }

    let custom = normalize(&entry.custom_values(), case_sensitive);
    let fields: Vec<&str> = standard
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(custom.as_str()))
        .collect();

    fields.iter().any(|field| field.contains(query.as_str()))
        || fields
            .iter()
            .any(|field| matcher.fuzzy_match(field, &query).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NOTES, TITLE, URL, USERNAME};

    fn entry(title: &str) -> Entry {
        Entry::new().with(TITLE, title)
    }

    fn hit(e: &Entry, query: &str, case_sensitive: bool, exact: bool) -> bool {
        matches(&matcher(), e, query, case_sensitive, exact)
    }

    #[test]
    fn in_order_matching_edges() {
        let m = matcher();
        let fuzzy = |text: &str, pattern: &str| m.fuzzy_match(text, pattern).is_some();

        assert!(fuzzy("gmail", ""));
        assert!(fuzzy("", ""));
        assert!(!fuzzy("", "g"));
        assert!(fuzzy("google mail", "gml"));
        assert!(!fuzzy("google mail", "lmg"));
        assert!(fuzzy("café", "cé"));
        assert!(!fuzzy("google mail", "GML"));
    }

    #[test]
    fn case_folding() {
        let e = entry("Gmail work");
        assert!(hit(&e, "gmail", false, false));
        assert!(!hit(&e, "gmail", true, false));
        assert!(hit(&e, "Gmail", true, false));
        assert!(!hit(&e, "GW", true, false));
        assert!(hit(&e, "GW", false, false));
    }

    #[test]
    fn exact_mode_only_checks_standard_fields() {
        let e = Entry::new()
            .with(TITLE, "My Email")
            .with(USERNAME, "ada")
            .with(URL, "https://mail.example")
            .with(NOTES, "primary")
            .with("Recovery", "backup-codes");

        assert!(hit(&e, "My Email", true, true));
        assert!(hit(&e, "my email", false, true));
        assert!(hit(&e, "ada", true, true));
        assert!(hit(&e, "primary", true, true));
        assert!(!hit(&e, "My", true, true));
        assert!(!hit(&e, "backup-codes", true, true));
    }

    #[test]
    fn custom_attributes_participate_outside_exact_mode() {
        let e = entry("bank").with("Account", "12345").with("Branch", "north");
        assert!(hit(&e, "12345 north", false, false));
        assert!(hit(&e, "nrth", false, false));
        assert!(!hit(&e, "south", false, false));
    }

    #[test]
    fn password_is_never_searched() {
        let e = entry("x").with_protected(crate::models::PASSWORD, "zebra");
        assert!(!hit(&e, "zebra", false, false));
    }

    #[test]
    fn walk_is_pre_order() {
        let mut root = Group::new("Root");
        root.entries.push(entry("mail one"));
        let mut child = Group::new("Child");
        child.entries.push(entry("mail two"));
        let mut grandchild = Group::new("Grandchild");
        grandchild.entries.push(entry("mail three"));
        child.groups.push(grandchild);
        root.groups.push(child);
        root.entries.push(entry("mail four"));

        let mut found = Vec::new();
        search_group(&matcher(), &root, "mail", &SearchOptions::default(), &mut found);
        let titles: Vec<_> = found.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["mail one", "mail four", "mail two", "mail three"]);
    }

    #[test]
    fn entries_at_the_root_are_searched() {
        let mut vault = Vault::create("pw");
        vault.add_group(&["Personal"]);
        vault.add_entry(&[], &entry("gmail root")).unwrap();
        vault.add_entry(&["Personal"], &entry("gmail nested")).unwrap();

        let titles: Vec<_> = search_vault(&vault, "gmail", &SearchOptions::default())
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, ["gmail root", "gmail nested"]);
    }

    #[test]
    fn group_filter_only_matches_root_groups() {
        let mut vault = Vault::create("pw");
        vault.add_group(&["Personal", "Email"]);
        vault.add_entry(&["Personal", "Email"], &entry("gmail")).unwrap();

        let scoped = |group: &str| SearchOptions {
            group: Some(group.to_string()),
            ..SearchOptions::default()
        };
        assert_eq!(search_vault(&vault, "gmail", &scoped("Personal")).len(), 1);
        assert!(search_vault(&vault, "gmail", &scoped("Email")).is_empty());
    }
}
