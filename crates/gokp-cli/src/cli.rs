//! Command tree.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// gokp - search and reuse entries across many KeePass databases
#[derive(Parser, Debug)]
#[command(name = "gokp", version)]
#[command(about = "A CLI that coordinates access to many KeePass databases")]
pub struct Cli {
    /// Run against the test profile in ~/test/.gokp
    #[arg(short, long, global = true)]
    pub test: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the gokp app database
    #[command(subcommand)]
    Setup(SetupCommand),

    /// Manage the gokp password in the OS keystore
    #[command(subcommand)]
    Auth(AuthCommand),

    /// Read or change gokp configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Manage entries pointing at external KeePass databases
    #[command(subcommand)]
    Manage(ManageCommand),

    /// Search entries in every registered external database
    Search(SearchArgs),

    /// Use and manage favorite entries
    #[command(visible_alias = "fav")]
    Favorites(FavoritesArgs),
}

#[derive(Subcommand, Debug)]
pub enum SetupCommand {
    /// Create the gokp app database
    Init,

    /// Delete the gokp app database
    Delete {
        /// Skip every confirmation and remove everything
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Save the gokp password to the OS keystore
    Login,
    /// Remove the gokp password from the OS keystore
    Logout,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the current configuration
    Read,
    /// Change configuration values
    Update {
        /// Seconds before a copied password is cleared
        #[arg(short = 'c', long)]
        clipboard_timeout: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ManageCommand {
    /// Register an external KeePass database
    Add {
        /// Nickname for the database
        name: String,

        /// Path to the KeePass database file
        #[arg(short, long)]
        path: PathBuf,

        /// Password for the database
        #[arg(short = 'w', long)]
        password: Option<String>,

        /// Path to the key file
        #[arg(short, long)]
        key: Option<PathBuf>,
    },

    /// List registered databases
    List,

    /// Show every stored attribute of the registered databases
    Open {
        name: String,

        /// Reserved; accepted and ignored
        #[arg(short, long)]
        setup: bool,
    },
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    pub query: String,

    /// Case-sensitive search
    #[arg(short, long)]
    pub case_sensitive: bool,

    /// Exact match only (no fuzzy search)
    #[arg(short, long)]
    pub exact: bool,

    /// Search only in this root-level group
    #[arg(short, long)]
    pub group: Option<String>,

    /// Search only in this registered database
    #[arg(short, long)]
    pub database: Option<String>,

    /// Pick one of the results and save it as a favorite
    #[arg(short, long)]
    pub favorites: bool,
}

#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub struct FavoritesArgs {
    #[command(subcommand)]
    pub command: Option<FavoritesCommand>,

    /// Favorite index, as shown by `gokp favorites list`
    pub index: Option<String>,

    /// Print the password
    #[arg(short, long)]
    pub password: bool,

    /// Copy the password to the clipboard and clear it later
    #[arg(short, long)]
    pub copy: bool,
}

#[derive(Subcommand, Debug)]
pub enum FavoritesCommand {
    /// List favorites
    List {
        /// Show every attribute
        #[arg(short, long)]
        detail: bool,
    },
}
