use clap::{Parser, Subcommand};
use std::path::PathBuf;

fn get_version() -> &'static str {
    const BASE_VERSION: &str = env!("CARGO_PKG_VERSION");

    if let Some(tag) = option_env!("LSP_KOTLIN_GIT_TAG") {
        return tag;
    }

    let commit = option_env!("LSP_KOTLIN_GIT_COMMIT").unwrap_or("unknown");
    let branch = option_env!("LSP_KOTLIN_GIT_BRANCH").unwrap_or("unknown");

    // Leaked once at startup; clap wants a 'static str.
    let version = format!("v{}-{} ({})", BASE_VERSION, commit, branch);
    Box::leak(version.into_boxed_str())
}

#[derive(Parser)]
#[command(name = "lsp-kotlin")]
#[command(about = "Installs and updates the Kotlin language server")]
#[command(version = get_version(), propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (use multiple times for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reduce output to errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Settings file to read instead of the default LSP-kotlin.json
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Storage root the LSP-kotlin directory is created in
    #[arg(long, global = true)]
    pub storage_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show installed and desired server versions
    Status,

    /// Install or update the server if needed
    Install {
        /// Reinstall even when the installed version is current
        #[arg(short, long)]
        force: bool,
    },

    /// Print the path of the server launcher
    Path,

    /// Print the command used to launch the server, one argument per line
    Command,

    /// Inspect the resolved settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show the current version
    Version,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show resolved settings
    Show {
        /// Output format (json, yaml)
        #[arg(long, default_value = "json")]
        format: String,
    },
}
