//! The gokp index database.
//!
//! A meta-vault is a KDBX file whose root holds exactly two groups:
//! `databases`, one entry per registered external database, and
//! `favorites`, snapshots of entries picked from those databases.

use crate::database::Vault;
use crate::error::{Error, Result};
use crate::models::{Entry, Group, NOTES, PASSWORD, TITLE, USERNAME};
use chrono::Local;
use std::path::{Path, PathBuf};

pub const DATABASES_GROUP: &str = "databases";
pub const FAVORITES_GROUP: &str = "favorites";

pub const DATABASE_PATH: &str = "Database Path";
pub const KEY_FILE_PATH: &str = "Key File Path";
pub const DATABASE_TYPE: &str = "Database Type";
pub const FORMAT: &str = "Format";
pub const CREATED_DATE: &str = "Created Date";
pub const LAST_MODIFIED: &str = "Last Modified";

const DATABASE_NOTES: &str = "External KeePass database managed by gokp";

/// Local time as `YYYY-MM-DD HH:MM:SS`.
pub fn timestamp_datetime() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Local time in RFC 3339.
pub fn timestamp_iso() -> String {
    Local::now().to_rfc3339()
}

/// Typed view of one entry in the `databases` group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseRecord {
    pub name: String,
    pub password: String,
    pub path: PathBuf,
    pub key_file: Option<PathBuf>,
}

impl DatabaseRecord {
    pub fn from_entry(entry: &Entry) -> Self {
        let key_file = entry.attribute(KEY_FILE_PATH);
        Self {
            name: entry.title.clone(),
            password: entry.password.clone(),
            path: PathBuf::from(entry.attribute(DATABASE_PATH)),
            key_file: (!key_file.is_empty()).then(|| PathBuf::from(key_file)),
        }
    }

    fn to_entry(&self) -> Entry {
        let key_file = self
            .key_file
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        Entry::new()
            .with(TITLE, self.name.clone())
            .with(USERNAME, "")
            .with_protected(PASSWORD, self.password.clone())
            .with(DATABASE_PATH, self.path.display().to_string())
            .with(KEY_FILE_PATH, key_file)
            .with(DATABASE_TYPE, "KeePass")
            .with(FORMAT, "KDBX")
            .with(CREATED_DATE, timestamp_datetime())
            .with(LAST_MODIFIED, timestamp_iso())
            .with(NOTES, DATABASE_NOTES)
    }
}

/// An unlocked meta-vault bound to its file.
#[derive(Debug)]
pub struct MetaVault {
    vault: Vault,
    path: PathBuf,
}

impl MetaVault {
    /// Initialize a fresh meta-vault at `path` and write it to disk.
    pub fn create(path: &Path, password: &str) -> Result<Self> {
        let mut vault = Vault::create(password);
        vault.add_group(&[DATABASES_GROUP]);
        vault.add_group(&[FAVORITES_GROUP]);
        vault.save(path)?;

        tracing::info!("Created meta-vault at {}", path.display());
        Ok(Self {
            vault,
            path: path.to_path_buf(),
        })
    }

    /// Open the meta-vault at `path`.
    pub fn open(path: &Path, password: &str) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::MetaVaultMissing(path.to_path_buf()));
        }
        let vault = Vault::open(path, password, None)?;
        Ok(Self {
            vault,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the in-memory state back to the meta-vault file.
    pub fn save(&self) -> Result<()> {
        self.vault.save(&self.path)
    }

    pub fn lock(self) {
        self.vault.lock();
    }

    pub fn find_group(&self, name: &str) -> Option<Group> {
        self.vault.group(&[name])
    }

    pub fn find_group_index(&self, name: &str) -> Option<usize> {
        self.vault.root_group_index(name)
    }

    /// Entries of the root group `name`, in insertion order.
    pub(crate) fn group_entries(&self, name: &str) -> Result<Vec<Entry>> {
        self.find_group(name)
            .map(|g| g.entries)
            .ok_or_else(|| Error::GroupMissing(name.to_string()))
    }

    pub(crate) fn append(&mut self, group: &str, entry: &Entry) -> Result<()> {
        self.vault.add_entry(&[group], entry)
    }

    /// Append a database record. Callers check for duplicate titles first.
    pub fn add_database_record(
        &mut self,
        title: &str,
        password: &str,
        db_path: &Path,
        key_file: Option<&Path>,
    ) -> Result<()> {
        let record = DatabaseRecord {
            name: title.to_string(),
            password: password.to_string(),
            path: db_path.to_path_buf(),
            key_file: key_file.map(Path::to_path_buf),
        };
        self.append(DATABASES_GROUP, &record.to_entry())
    }

    /// Add a database record unless one with the same title exists.
    pub fn register_database(
        &mut self,
        title: &str,
        password: &str,
        db_path: &Path,
        key_file: Option<&Path>,
    ) -> Result<()> {
        if self.read_database_record(title).is_some() {
            return Err(Error::DuplicateDatabase(title.to_string()));
        }
        self.add_database_record(title, password, db_path, key_file)?;
        tracing::info!("Registered database '{}' at {}", title, db_path.display());
        Ok(())
    }

    pub fn read_database_record(&self, title: &str) -> Option<Entry> {
        self.list_databases()
            .ok()?
            .into_iter()
            .find(|entry| entry.title == title)
    }

    pub fn list_databases(&self) -> Result<Vec<Entry>> {
        self.group_entries(DATABASES_GROUP)
    }

    pub fn database_records(&self) -> Result<Vec<DatabaseRecord>> {
        Ok(self
            .list_databases()?
            .iter()
            .map(DatabaseRecord::from_entry)
            .collect())
    }
}
