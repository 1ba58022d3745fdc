//! Command runner.
//!
//! Every command borrows its collaborators from [`App`], so the whole
//! surface runs the same way against the real terminal, keychain and
//! clipboard as against in-memory stand-ins.

use crate::cli::{
    AuthCommand, Command, ConfigAction, FavoritesArgs, FavoritesCommand, ManageCommand,
    SearchArgs, SetupCommand,
};
use crate::prompt::Prompt;
use crate::render;
use anyhow::{Context, Result};
use gokp_core::clipboard::{self, Clipboard, Finish, SystemClipboard};
use gokp_core::keystore::{SecretStore, SERVICE, USER};
use gokp_core::{favorites, search};
use gokp_core::{Config, ConfigStore, Error, MetaVault, Paths, SearchOptions};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Whether `err` should end the process with a failure status.
///
/// Errors that do not come from gokp-core (prompt I/O, runtime start-up)
/// are always fatal.
pub fn is_fatal(err: &anyhow::Error) -> bool {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<Error>())
        .map_or(true, |e| e.kind().is_fatal())
}

pub struct App<'a> {
    paths: Paths,
    keystore: &'a dyn SecretStore,
    prompt: &'a mut dyn Prompt,
    out: &'a mut dyn Write,
    clipboard: Option<Box<dyn Clipboard>>,
    show_progress: bool,
}

impl<'a> App<'a> {
    pub fn new(
        paths: Paths,
        keystore: &'a dyn SecretStore,
        prompt: &'a mut dyn Prompt,
        out: &'a mut dyn Write,
    ) -> Self {
        Self {
            paths,
            keystore,
            prompt,
            out,
            clipboard: None,
            show_progress: true,
        }
    }

    /// Use `clipboard` instead of the desktop clipboard, and draw no countdown bar.
    #[cfg(test)]
    pub fn with_clipboard(mut self, clipboard: Box<dyn Clipboard>) -> Self {
        self.clipboard = Some(clipboard);
        self.show_progress = false;
        self
    }

    pub fn run(&mut self, command: Command) -> Result<()> {
        tracing::debug!("Using profile at {}", self.paths.config_dir.display());
        match command {
            Command::Setup(SetupCommand::Init) => self.setup_init(),
            Command::Setup(SetupCommand::Delete { force }) => self.setup_delete(force),
            Command::Auth(AuthCommand::Login) => self.login(),
            Command::Auth(AuthCommand::Logout) => self.logout(),
            Command::Config { action } => self.config(action),
            Command::Manage(ManageCommand::Add {
                name,
                path,
                password,
                key,
            }) => self.manage_add(&name, &path, password.as_deref(), key.as_deref()),
            Command::Manage(ManageCommand::List) => self.manage_list(),
            Command::Manage(ManageCommand::Open { name, setup }) => self.manage_open(&name, setup),
            Command::Search(args) => self.search(args),
            Command::Favorites(args) => self.favorites(args),
        }
    }

    fn ask_password(&mut self) -> Result<String> {
        let password = self
            .prompt
            .password("Enter admin password: ")
            .context("failed to read password")?;
        if password.is_empty() {
            return Err(Error::InvalidInput("Password is required".to_string()).into());
        }
        Ok(password)
    }

    fn confirm(&mut self, message: &str) -> Result<bool> {
        self.prompt
            .confirm(message)
            .context("failed to read confirmation")
    }

    /// Keystore first, prompt second.
    fn admin_password(&mut self) -> Result<String> {
        match self.keystore.get(SERVICE, USER) {
            Ok(secret) => Ok(secret),
            Err(e) => {
                tracing::debug!("No usable keystore secret ({}), prompting", e);
                self.ask_password()
            }
        }
    }

    fn open_meta(&mut self) -> Result<MetaVault> {
        let path = self.paths.meta_vault.clone();
        if !path.is_file() {
            return Err(Error::MetaVaultMissing(path).into());
        }
        let password = self.admin_password()?;
        Ok(MetaVault::open(&path, &password)?)
    }

    fn config_store(&self) -> ConfigStore {
        ConfigStore::new(self.paths.config_file())
    }

    fn setup_init(&mut self) -> Result<()> {
        let dir = self.paths.config_dir.clone();
        let meta_path = self.paths.meta_vault.clone();

        if !dir.exists() {
            writeln!(self.out, "Creating {} folder", dir.display())?;
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }

        if meta_path.exists() {
            writeln!(
                self.out,
                "\nWARNING: A gokp database already exists. This will delete it and create a fresh one."
            )?;
            if !self.confirm("Proceed (yes/no)? ")? {
                writeln!(self.out, "END: gokp setup cancelled")?;
                return Ok(());
            }
            fs::remove_file(&meta_path)
                .with_context(|| format!("failed to remove {}", meta_path.display()))?;
        }

        writeln!(self.out, "\nSTEP 1: Create gokp app database.")?;
        let password = self.ask_password()?;

        let save_to_keystore = self
            .confirm("\nWould you like to save this password to the local OS key store (yes/no)? ")?;
        if save_to_keystore {
            match self.keystore.set(SERVICE, USER, &password) {
                Ok(()) => writeln!(self.out, "Saved gokp password to keystore")?,
                Err(e) => writeln!(self.out, "Warning: could not save password to keystore: {e}")?,
            }
        }

        let store = self.config_store();
        writeln!(self.out, "\nCreating default config.json in {}", dir.display())?;
        store.save(&Config::default())?;

        MetaVault::create(&meta_path, &password)?.lock();
        writeln!(
            self.out,
            "\nDONE: gokp app database created.\n\nFor information on registering external KeePass databases: `gokp manage --help`"
        )?;
        Ok(())
    }

    fn setup_delete(&mut self, force: bool) -> Result<()> {
        let dir = self.paths.config_dir.clone();
        let meta_path = self.paths.meta_vault.clone();

        if !meta_path.exists() {
            writeln!(self.out, "No gokp database found to delete.")?;
            return Ok(());
        }

        if !force {
            writeln!(
                self.out,
                "WARNING: This will permanently delete your gokp database at:\n{}",
                meta_path.display()
            )?;
            if !self.confirm("\nAre you sure you want to proceed? (yes/no): ")? {
                writeln!(self.out, "Deletion cancelled.")?;
                return Ok(());
            }
        }

        fs::remove_file(&meta_path)
            .with_context(|| format!("failed to delete {}", meta_path.display()))?;
        writeln!(self.out, "Successfully deleted gokp database: {}", meta_path.display())?;

        if force
            || self.confirm(
                "\nWould you like to remove the stored password from keystore as well? (yes/no): ",
            )?
        {
            match self.keystore.delete(SERVICE, USER) {
                Ok(()) => writeln!(self.out, "Password removed from keystore.")?,
                Err(Error::SecretNotFound { .. }) => {
                    writeln!(self.out, "No password stored in keystore.")?
                }
                Err(e) => writeln!(
                    self.out,
                    "Warning: failed to remove password from keystore: {e}"
                )?,
            }
        }

        let store = self.config_store();
        if !store.path().exists() {
            writeln!(self.out, "No config.json found to delete.")?;
        } else if force
            || self.confirm(&format!(
                "\nWould you like to remove config.json from {}? (yes/no): ",
                store.path().display()
            ))?
        {
            match store.remove() {
                Ok(_) => writeln!(self.out, "Removed: {}", store.path().display())?,
                Err(e) => writeln!(self.out, "Warning: {e}")?,
            }
        }

        if is_empty_dir(&dir)
            && (force
                || self.confirm("\nThe .gokp folder is now empty. Remove it as well? (yes/no): ")?)
        {
            match fs::remove_dir(&dir) {
                Ok(()) => writeln!(self.out, "Removed folder: {}", dir.display())?,
                Err(e) => writeln!(
                    self.out,
                    "Warning: failed to remove folder {}: {e}",
                    dir.display()
                )?,
            }
        }

        writeln!(self.out, "\ngokp database deletion completed.")?;
        Ok(())
    }

    fn login(&mut self) -> Result<()> {
        let password = self.ask_password()?;
        self.keystore.set(SERVICE, USER, &password)?;
        writeln!(self.out, "Saved gokp password to keystore")?;
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        self.keystore.delete(SERVICE, USER)?;
        writeln!(self.out, "gokp password cleared.")?;
        Ok(())
    }

    fn config(&mut self, action: Option<ConfigAction>) -> Result<()> {
        let store = self.config_store();
        match action {
            None | Some(ConfigAction::Read) => {
                let config = store.load()?;
                writeln!(self.out, "Current Configuration:")?;
                writeln!(self.out, "- Clipboard Timeout: {} seconds", config.clipboard_timeout)?;
            }
            Some(ConfigAction::Update {
                clipboard_timeout: None,
            }) => {
                writeln!(
                    self.out,
                    "ERROR: Please provide a clipboard timeout value using --clipboard-timeout flag."
                )?;
            }
            Some(ConfigAction::Update {
                clipboard_timeout: Some(raw),
            }) => {
                store.update_clipboard_timeout(&raw)?;
                writeln!(self.out, "Config saved to {}", store.path().display())?;
                writeln!(self.out, "Configuration updated successfully.")?;
            }
        }
        Ok(())
    }

    fn manage_add(
        &mut self,
        name: &str,
        path: &Path,
        password: Option<&str>,
        key: Option<&Path>,
    ) -> Result<()> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()).into());
        }
        if let Some(key) = key {
            if !key.exists() {
                return Err(Error::KeyFileNotFound(key.to_path_buf()).into());
            }
        }

        let mut meta = self.open_meta()?;
        meta.register_database(name, password.unwrap_or_default(), path, key)?;
        meta.save()?;
        meta.lock();

        writeln!(
            self.out,
            "\nSuccessfully added new database entry '{name}' to the gokp database."
        )?;
        writeln!(self.out, "Database path: {}", path.display())?;
        if let Some(key) = key {
            writeln!(self.out, "Key file: {}", key.display())?;
        }
        Ok(())
    }

    fn manage_list(&mut self) -> Result<()> {
        let meta = self.open_meta()?;
        let records = meta.database_records()?;
        meta.lock();

        if records.is_empty() {
            writeln!(
                self.out,
                "No external databases configured. Use 'gokp manage add' to add databases first."
            )?;
            return Ok(());
        }
        render::database_list(self.out, &records)?;
        Ok(())
    }

    fn manage_open(&mut self, name: &str, setup: bool) -> Result<()> {
        writeln!(self.out, "{name}")?;
        tracing::debug!("manage open --setup={} has no effect", setup);

        let meta = self.open_meta()?;
        let entries = meta.list_databases()?;
        meta.lock();

        render::database_dump(self.out, &entries)?;
        Ok(())
    }

    fn search(&mut self, args: SearchArgs) -> Result<()> {
        let mut meta = self.open_meta()?;
        let records = meta.database_records()?;

        if records.is_empty() {
            meta.lock();
            writeln!(
                self.out,
                "No external databases configured. Use 'gokp manage add' to add databases first."
            )?;
            return Ok(());
        }

        let options = SearchOptions {
            case_sensitive: args.case_sensitive,
            exact: args.exact,
            group: args.group,
            database: args.database,
        };
        let report = search::search_records(&records, &args.query, &options);

        for skipped in &report.skipped {
            writeln!(self.out, "Warning: {skipped}")?;
        }
        if report.searched == 0 {
            meta.lock();
            writeln!(self.out, "No accessible external databases found.")?;
            return Ok(());
        }
        if report.results.is_empty() {
            meta.lock();
            writeln!(
                self.out,
                "No entries found matching '{}' in {} database(s).",
                args.query, report.searched
            )?;
            return Ok(());
        }

        writeln!(
            self.out,
            "Found {} entries matching '{}' across {} database(s):",
            report.results.len(),
            args.query,
            report.searched
        )?;
        for (i, result) in report.results.iter().enumerate() {
            render::search_result(self.out, i + 1, result)?;
        }

        if args.favorites {
            render::selection_summary(self.out, &report.results)?;
            let answer = self
                .prompt
                .line("\nEntry number for entry to save:\n> ")
                .context("failed to read selection")?;
            let answer = answer.trim();

            if answer.is_empty() {
                writeln!(self.out, "\nError: no input provided. Please try again.")?;
            } else {
                let picked = answer
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| report.results.get(i));

                match picked {
                    None => writeln!(
                        self.out,
                        "\nError: no entry found for selection '{answer}'. Please try again."
                    )?,
                    Some(result) => {
                        writeln!(
                            self.out,
                            "\nSelected entry: {} (UUID: {}, DB: {})",
                            result.entry.title,
                            result.entry.uuid_hex(),
                            result.db_name
                        )?;
                        let index = favorites::add(&mut meta, result)?;
                        meta.save()?;
                        writeln!(self.out, "Entry added to favorites successfully as #{index}.")?;
                    }
                }
            }
        }

        meta.lock();
        Ok(())
    }

    fn favorites(&mut self, args: FavoritesArgs) -> Result<()> {
        if let Some(FavoritesCommand::List { detail }) = args.command {
            return self.favorites_list(detail);
        }

        let Some(raw) = args.index else {
            writeln!(
                self.out,
                "Index argument required. Use `gokp favorites list` to see all favorites."
            )?;
            return Ok(());
        };
        let index = raw
            .trim()
            .parse::<u64>()
            .map_err(|_| Error::InvalidInput(format!("Invalid index: {raw}")))?;

        let meta = self.open_meta()?;
        let found = favorites::by_index(&meta, index)?;
        meta.lock();

        let Some(entry) = found else {
            writeln!(self.out, "No favorite found at index {index}")?;
            return Ok(());
        };

        render::favorite(self.out, index, &entry, args.password)?;
        if !args.password && !args.copy {
            writeln!(
                self.out,
                "Favorite #{index} found. Use -p to show password or -c to copy to clipboard"
            )?;
        }
        if args.copy {
            self.reveal(index, &entry.password)?;
        }
        Ok(())
    }

    fn favorites_list(&mut self, detail: bool) -> Result<()> {
        let meta = self.open_meta()?;
        let entries = favorites::list(&meta)?;
        meta.lock();

        if entries.is_empty() {
            writeln!(
                self.out,
                "No favorites yet. Use `gokp search -f QUERY` to add one."
            )?;
            return Ok(());
        }
        for entry in &entries {
            render::favorite_summary(self.out, entry, detail)?;
        }
        Ok(())
    }

    /// Copy `secret` to the clipboard until the timeout runs out or the user interrupts.
    fn reveal(&mut self, index: u64, secret: &str) -> Result<()> {
        let seconds = self.config_store().load()?.clipboard_timeout;
        let mut clip: Box<dyn Clipboard> = match self.clipboard.take() {
            Some(clip) => clip,
            None => Box::new(SystemClipboard::new()?),
        };
        let progress: Box<dyn Write + Send> = if self.show_progress {
            Box::new(io::stdout())
        } else {
            Box::new(io::sink())
        };

        writeln!(
            self.out,
            "\nCopying password for favorite #{index} to the clipboard. \
             It will be cleared in {seconds} seconds (press Ctrl+C to clear now):"
        )?;
        self.out.flush()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start the clipboard timer")?;
        let outcome = runtime.block_on(clipboard::copy_then_clear(
            clip.as_mut(),
            secret,
            seconds,
            progress,
            clipboard::interrupted(),
        ));
        self.clipboard = Some(clip);
        let outcome = outcome?;

        if outcome.finish == Finish::Interrupted {
            writeln!(self.out, "\n\nInterrupted! Clearing clipboard now...")?;
        }
        writeln!(self.out, "{}", outcome.restore.message())?;
        Ok(())
    }
}

fn is_empty_dir(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}
