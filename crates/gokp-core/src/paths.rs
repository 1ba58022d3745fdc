//! Filesystem locations used by gokp.
//!
//! Everything lives under `~/.gokp`, or `~/test/.gokp` in test mode.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

pub const APP_DIR: &str = ".gokp";
pub const TEST_DIR: &str = "test";
pub const META_VAULT_FILE: &str = "gokp.kdbx";
pub const CONFIG_FILE: &str = "config.json";
const EXECUTABLE_FILE: &str = "keepass.exe";

/// Resolved locations for one profile (production or test).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub config_dir: PathBuf,
    pub executable: PathBuf,
    pub meta_vault: PathBuf,
}

impl Paths {
    /// Build the layout below an explicit home directory. Performs no I/O.
    pub fn under(home: &Path, test: bool) -> Self {
        let config_dir = if test {
            home.join(TEST_DIR).join(APP_DIR)
        } else {
            home.join(APP_DIR)
        };

        Self {
            executable: config_dir.join(EXECUTABLE_FILE),
            meta_vault: config_dir.join(META_VAULT_FILE),
            config_dir,
        }
    }

    /// Build the layout below the current user's home directory.
    pub fn resolve(test: bool) -> Result<Self> {
        let home = dirs::home_dir().ok_or(Error::HomeDirUnavailable)?;
        Ok(Self::under(&home, test))
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_layout() {
        let paths = Paths::under(Path::new("/home/ada"), false);
        assert_eq!(paths.config_dir, PathBuf::from("/home/ada/.gokp"));
        assert_eq!(paths.meta_vault, PathBuf::from("/home/ada/.gokp/gokp.kdbx"));
        assert_eq!(paths.executable, PathBuf::from("/home/ada/.gokp/keepass.exe"));
        assert_eq!(paths.config_file(), PathBuf::from("/home/ada/.gokp/config.json"));
    }

    #[test]
    fn test_mode_layout() {
        let paths = Paths::under(Path::new("/home/ada"), true);
        assert_eq!(paths.config_dir, PathBuf::from("/home/ada/test/.gokp"));
        assert_eq!(paths.meta_vault, PathBuf::from("/home/ada/test/.gokp/gokp.kdbx"));
    }
}
