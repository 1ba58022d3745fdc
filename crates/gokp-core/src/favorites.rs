//! Favorites: snapshots of external entries kept in the meta-vault.
//!
//! Each favorite carries a `Favorite Index`. The next index handed out is
//! one more than the largest existing index, with the largest seeded at 1,
//! so the first favorite gets index 2.

use crate::error::{Error, Result};
use crate::metavault::{
    timestamp_datetime, timestamp_iso, MetaVault, CREATED_DATE, FAVORITES_GROUP, LAST_MODIFIED,
};
use crate::models::{Entry, NOTES, PASSWORD, TITLE, URL, USERNAME};
use crate::search::SearchResult;

pub const DATABASE_SOURCE: &str = "Database Source";
pub const DATABASE_PATH: &str = "Database path";
/// Hex UUID of the origin entry (not of the external database).
pub const DATABASE_UUID: &str = "Database UUID";
pub const FAVORITE_INDEX: &str = "Favorite Index";

const INDEX_SEED: i64 = 1;
const FAVORITE_NOTES: &str = "Entry from external KeePass database managed by gokp";

/// Scan existing favorites for a duplicate origin and the largest index.
///
/// Stored indices are signed; anything below the seed is outvoted by it.
fn next_index(favorites: &[Entry], origin_hex: &str) -> Result<u64> {
    let mut max_index = INDEX_SEED;

    for favorite in favorites {
        if favorite.attribute(DATABASE_UUID) == origin_hex {
            return Err(Error::AlreadyFavorited(favorite.title.clone()));
        }
        if let Some(raw) = favorite.get(FAVORITE_INDEX) {
            let index = raw.parse::<i64>().map_err(|_| Error::CorruptIndex {
                title: favorite.title.clone(),
                value: raw.to_string(),
            })?;
            max_index = max_index.max(index);
        }
    }

    // max_index >= INDEX_SEED, so the sign is never negative
    Ok(max_index.unsigned_abs() + 1)
}

fn favorite_entry(result: &SearchResult, index: u64) -> Entry {
    let origin = &result.entry;
    Entry::new()
        .with(TITLE, origin.title.clone())
        .with(USERNAME, origin.username.clone())
        .with_protected(PASSWORD, origin.password.clone())
        .with(URL, origin.url.clone())
        .with(DATABASE_SOURCE, result.db_name.clone())
        .with(DATABASE_PATH, result.db_path.display().to_string())
        .with(DATABASE_UUID, origin.uuid_hex())
        .with(FAVORITE_INDEX, index.to_string())
        .with(CREATED_DATE, timestamp_datetime())
        .with(LAST_MODIFIED, timestamp_iso())
        .with(NOTES, FAVORITE_NOTES)
}

/// Append `result` to the favorites group and return its index.
///
/// The meta-vault is modified in memory only; callers save it.
pub fn add(meta: &mut MetaVault, result: &SearchResult) -> Result<u64> {
    let favorites = list(meta)?;
    let index = next_index(&favorites, &result.entry.uuid_hex())?;

    if result.entry.password.is_empty() {
        return Err(Error::MissingPassword(result.entry.title.clone()));
    }

    meta.append(FAVORITES_GROUP, &favorite_entry(result, index))?;
    tracing::info!(
        "Added '{}' from '{}' as favorite #{}",
        result.entry.title,
        result.db_name,
        index
    );
    Ok(index)
}

/// The favorite whose index is `index`; first match wins.
pub fn by_index(meta: &MetaVault, index: u64) -> Result<Option<Entry>> {
    let wanted = index.to_string();
    Ok(list(meta)?
        .into_iter()
        .find(|favorite| favorite.attribute(FAVORITE_INDEX) == wanted))
}

/// All favorites in insertion order.
pub fn list(meta: &MetaVault) -> Result<Vec<Entry>> {
    meta.group_entries(FAVORITES_GROUP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn favorite(index: &str, origin: &str) -> Entry {
        Entry::new()
            .with(TITLE, format!("fav {index}"))
            .with(DATABASE_UUID, origin)
            .with(FAVORITE_INDEX, index)
    }

    #[test]
    fn first_index_is_two() {
        assert_eq!(next_index(&[], "aa").unwrap(), 2);
    }

    #[test]
    fn next_index_follows_the_maximum() {
        let existing = [favorite("2", "aa"), favorite("7", "bb"), favorite("3", "cc")];
        assert_eq!(next_index(&existing, "dd").unwrap(), 8);
    }

    #[test]
    fn negative_indices_parse_and_lose_to_the_seed() {
        let mixed = [favorite("-3", "aa"), favorite("2", "bb")];
        assert_eq!(next_index(&mixed, "cc").unwrap(), 3);

        let negative_only = [favorite("-3", "aa")];
        assert_eq!(next_index(&negative_only, "cc").unwrap(), 2);
    }

    #[test]
    fn duplicate_origin_is_rejected() {
        let existing = [favorite("2", "aa")];
        assert!(matches!(
            next_index(&existing, "aa"),
            Err(Error::AlreadyFavorited(_))
        ));
    }

    #[test]
    fn unparsable_index_is_corrupt() {
        let existing = [favorite("two", "aa")];
        assert!(matches!(
            next_index(&existing, "bb"),
            Err(Error::CorruptIndex { value, .. }) if value == "two"
        ));
    }

    #[test]
    fn snapshot_copies_origin_and_provenance() {
        let origin = Entry::new()
            .with(TITLE, "gmail")
            .with(USERNAME, "ada")
            .with_protected(PASSWORD, "pw")
            .with(URL, "https://mail.google.com")
            .with(NOTES, "not copied");
        let result = SearchResult {
            db_name: "personal".into(),
            db_path: PathBuf::from("/data/a.kdbx"),
            entry: origin.clone(),
        };

        let fav = favorite_entry(&result, 2);
        assert_eq!(fav.title, "gmail");
        assert_eq!(fav.username, "ada");
        assert_eq!(fav.password, "pw");
        assert_eq!(fav.url, "https://mail.google.com");
        assert_eq!(fav.notes, FAVORITE_NOTES);
        assert_eq!(fav.attribute(DATABASE_SOURCE), "personal");
        assert_eq!(fav.attribute(DATABASE_PATH), "/data/a.kdbx");
        assert_eq!(fav.attribute(DATABASE_UUID), origin.uuid_hex());
        assert_eq!(fav.attribute(FAVORITE_INDEX), "2");
        assert_ne!(fav.uuid, origin.uuid);
    }
}
