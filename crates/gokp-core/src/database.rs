//! KeePass database operations wrapper.
//!
//! A [`Vault`] exists only while a KDBX file is decoded in memory. Protected
//! values are readable for the lifetime of the handle; [`Vault::save`]
//! re-encrypts them on the way to disk and [`Vault::lock`] consumes the
//! handle so nothing can be read or saved afterwards.

use crate::error::{Error, Result};
use crate::models::{Entry, Group};
use keepass::config::DatabaseConfig;
use keepass::db::Node;
use keepass::{Database, DatabaseKey};
use std::fs::File;
use std::path::Path;

/// An unlocked KDBX database.
pub struct Vault {
    db: Database,
    key: DatabaseKey,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("root", &self.db.root.name)
            .finish_non_exhaustive()
    }
}

fn child_group<'g>(group: &'g keepass::db::Group, name: &str) -> Option<&'g keepass::db::Group> {
    group.children.iter().find_map(|node| match node {
        Node::Group(g) if g.name == name => Some(g),
        _ => None,
    })
}

fn child_group_mut<'g>(
    group: &'g mut keepass::db::Group,
    name: &str,
) -> Option<&'g mut keepass::db::Group> {
    group.children.iter_mut().find_map(|node| match node {
        Node::Group(g) if g.name == name => Some(g),
        _ => None,
    })
}

/// Credentials for a database: the password plus the key file, or the key
/// file alone when the password is empty.
fn database_key(password: &str, key_file: Option<&Path>) -> Result<DatabaseKey> {
    let Some(key_path) = key_file else {
        return Ok(DatabaseKey::new().with_password(password));
    };

    let mut key = DatabaseKey::new();
    if !password.is_empty() {
        key = key.with_password(password);
    }
    let mut key_source =
        File::open(key_path).map_err(|_| Error::KeyFileNotFound(key_path.to_path_buf()))?;
    key.with_keyfile(&mut key_source)
        .map_err(|e| Error::io(format!("Failed to read key file {}", key_path.display()), e))
}

impl Vault {
    /// Create an empty in-memory database protected by `password`.
    pub fn create(password: &str) -> Self {
        Self {
            db: Database::new(DatabaseConfig::default()),
            key: DatabaseKey::new().with_password(password),
        }
    }

    /// Like [`Vault::create`], with the same credential rules as [`Vault::open`].
    pub fn create_with_key_file(password: &str, key_file: Option<&Path>) -> Result<Self> {
        Ok(Self {
            db: Database::new(DatabaseConfig::default()),
            key: database_key(password, key_file)?,
        })
    }

    /// Open and unlock a KeePass database.
    ///
    /// With a key file the credentials are the password plus the key file;
    /// an empty password with a key file means key-file-only.
    pub fn open(path: &Path, password: &str, key_file: Option<&Path>) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let key = database_key(password, key_file)?;
        let mut source = File::open(path)
            .map_err(|e| Error::io(format!("Failed to open database file {}", path.display()), e))?;
        let db = Database::open(&mut source, key.clone()).map_err(|e| Error::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        tracing::debug!("Unlocked database {}", path.display());
        Ok(Self { db, key })
    }

    /// Save the database to disk, replacing `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut file = File::create(path).map_err(|e| {
            Error::io(format!("Failed to create database file {}", path.display()), e)
        })?;

        self.db
            .save(&mut file, self.key.clone())
            .map_err(|e| Error::Save {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        tracing::debug!("Saved database {}", path.display());
        Ok(())
    }

    /// Drop the decoded contents without writing anything.
    pub fn lock(self) {
        tracing::debug!("Locked database {:?}", self.db.root.name);
    }

    /// The whole tree, starting at the root group.
    pub fn root(&self) -> Group {
        Group::from_keepass(&self.db.root)
    }

    /// Every group directly below the root, in file order.
    pub fn root_groups(&self) -> Vec<Group> {
        self.db
            .root
            .children
            .iter()
            .filter_map(|node| match node {
                Node::Group(g) => Some(Group::from_keepass(g)),
                Node::Entry(_) => None,
            })
            .collect()
    }

    /// The group reached by following `path` from the root; first match per level.
    pub fn group(&self, path: &[&str]) -> Option<Group> {
        path.iter()
            .try_fold(&self.db.root, |group, name| child_group(group, name))
            .map(Group::from_keepass)
    }

    /// Position of the root group called `name` among the root groups.
    pub fn root_group_index(&self, name: &str) -> Option<usize> {
        self.db
            .root
            .children
            .iter()
            .filter_map(|node| match node {
                Node::Group(g) => Some(g),
                Node::Entry(_) => None,
            })
            .position(|g| g.name == name)
    }

    /// Create every missing group along `path`.
    pub fn add_group(&mut self, path: &[&str]) {
        let mut group = &mut self.db.root;
        for name in path {
            if child_group(group, name).is_none() {
                group
                    .children
                    .push(Node::Group(keepass::db::Group::new(name)));
            }
            group = match child_group_mut(group, name) {
                Some(child) => child,
                None => return,
            };
        }
    }

    /// Append `entry` to the group at `path`.
    pub fn add_entry(&mut self, path: &[&str], entry: &Entry) -> Result<()> {
        let group = path
            .iter()
            .try_fold(&mut self.db.root, |group, name| child_group_mut(group, name))
            .ok_or_else(|| Error::GroupMissing(path.join("/")))?;

        group.children.push(Node::Entry(entry.to_keepass()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PASSWORD, TITLE};
    use tempfile::TempDir;

    #[test]
    fn groups_nest_and_keep_order() {
        let mut vault = Vault::create("pw");
        vault.add_group(&["Personal", "Email"]);
        vault.add_group(&["Work"]);
        vault.add_group(&["Personal", "Banking"]);

        let names: Vec<_> = vault.root_groups().into_iter().map(|g| g.name).collect();
        assert_eq!(names, ["Personal", "Work"]);

        let personal = vault.group(&["Personal"]).unwrap();
        let children: Vec<_> = personal.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(children, ["Email", "Banking"]);
        assert_eq!(vault.root_group_index("Work"), Some(1));
        assert_eq!(vault.root_group_index("Email"), None);
    }

    #[test]
    fn adding_to_missing_group_fails() {
        let mut vault = Vault::create("pw");
        let err = vault.add_entry(&["nowhere"], &Entry::new()).unwrap_err();
        assert!(matches!(err, Error::GroupMissing(name) if name == "nowhere"));
    }

    #[test]
    fn save_then_open_round_trips_protected_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("round.kdbx");

        let mut vault = Vault::create("master");
        vault.add_group(&["Personal"]);
        let entry = Entry::new()
            .with(TITLE, "gmail")
            .with_protected(PASSWORD, "p@ss");
        vault.add_entry(&["Personal"], &entry).unwrap();
        vault.save(&path).unwrap();
        vault.lock();

        let reopened = Vault::open(&path, "master", None).unwrap();
        let group = reopened.group(&["Personal"]).unwrap();
        assert_eq!(group.entries, vec![entry]);
    }

    #[test]
    fn open_reports_missing_file_and_wrong_password() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.kdbx");

        assert!(matches!(
            Vault::open(&path, "pw", None),
            Err(Error::FileNotFound(_))
        ));

        Vault::create("right").save(&path).unwrap();
        assert!(matches!(
            Vault::open(&path, "wrong", None),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn open_reports_missing_key_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.kdbx");
        Vault::create("pw").save(&path).unwrap();

        let missing = dir.path().join("absent.key");
        assert!(matches!(
            Vault::open(&path, "pw", Some(missing.as_path())),
            Err(Error::KeyFileNotFound(_))
        ));
    }

    fn write_key_file(dir: &Path) -> std::path::PathBuf {
        let key_path = dir.join("vault.key");
        std::fs::write(&key_path, b"any bytes at all, hashed by the codec").unwrap();
        key_path
    }

    #[test]
    fn password_and_key_file_are_both_required() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("both.kdbx");
        let key_path = write_key_file(dir.path());

        let mut vault = Vault::create_with_key_file("master", Some(key_path.as_path())).unwrap();
        vault.add_group(&["Personal"]);
        vault
            .add_entry(&["Personal"], &Entry::new().with(TITLE, "gmail"))
            .unwrap();
        vault.save(&path).unwrap();
        vault.lock();

        let reopened = Vault::open(&path, "master", Some(key_path.as_path())).unwrap();
        assert_eq!(reopened.group(&["Personal"]).unwrap().entries.len(), 1);

        for (password, key_file) in [
            ("wrong", Some(key_path.as_path())),
            ("", Some(key_path.as_path())),
            ("master", None),
        ] {
            assert!(matches!(
                Vault::open(&path, password, key_file),
                Err(Error::Decode { .. })
            ));
        }
    }

    #[test]
    fn key_file_alone_unlocks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keyonly.kdbx");
        let key_path = write_key_file(dir.path());

        Vault::create_with_key_file("", Some(key_path.as_path()))
            .unwrap()
            .save(&path)
            .unwrap();

        assert!(Vault::open(&path, "", Some(key_path.as_path())).is_ok());
        assert!(matches!(
            Vault::open(&path, "guess", Some(key_path.as_path())),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn creating_with_a_missing_key_file_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.key");
        assert!(matches!(
            Vault::create_with_key_file("pw", Some(missing.as_path())),
            Err(Error::KeyFileNotFound(_))
        ));
    }
}
