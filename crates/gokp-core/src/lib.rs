//! Core of gokp: one KeePass "meta-vault" that indexes many others.
//!
//! This crate holds every piece of state and logic behind the `gokp` CLI:
//! the meta-vault schema, cross-database search, favorites, config,
//! keystore access and the timed clipboard reveal. It never prompts and
//! never exits the process.

pub mod clipboard;
pub mod config;
pub mod database;
pub mod error;
pub mod favorites;
pub mod keystore;
pub mod metavault;
pub mod models;
pub mod paths;
pub mod search;

pub use config::{Config, ConfigStore};
pub use database::Vault;
pub use error::{Error, ErrorKind, Result};
pub use metavault::{DatabaseRecord, MetaVault};
pub use models::{Entry, Field, Group};
pub use paths::Paths;
pub use search::{SearchOptions, SearchReport, SearchResult};
