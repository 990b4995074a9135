mod cli;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ConfigAction};
use console::style;
use lsp_kotlin::config::{default_settings_file_path, resolve_settings, JsonSettings};
use lsp_kotlin::{Installer, InstallerSettings};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli)?;

    let settings = load_settings(&cli)?;

    match cli.command {
        Commands::Version => {
            println!("lsp-kotlin v{}", env!("CARGO_PKG_VERSION"));
        }

        Commands::Config { action } => match action {
            ConfigAction::Show { format } => match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&settings)?),
                "yaml" => print!("{}", serde_yaml::to_string(&settings)?),
                other => {
                    return Err(anyhow!(
                        "Unsupported format '{}'. Use 'json' or 'yaml'.",
                        other
                    ))
                }
            },
        },

        Commands::Path => {
            let installer = Installer::new(settings)?;
            println!("{}", installer.binary_path().display());
        }

        Commands::Command => {
            let installer = Installer::new(settings)?;
            for arg in installer.server_command() {
                println!("{}", arg);
            }
        }

        Commands::Status => {
            let mut installer = Installer::new(settings)?;
            print_status(&mut installer);
        }

        Commands::Install { force } => {
            let mut installer = Installer::new(settings)?;
            if !installer.needs_update_or_install() && !force {
                tracing::info!(
                    "kotlin-language-server {} is already installed",
                    installer.desired_version()
                );
                println!("{}", installer.binary_path().display());
                return Ok(());
            }

            eprintln!(
                "Installing kotlin-language-server {}...",
                installer.desired_version()
            );
            match installer.install_or_update().await {
                Ok(path) => println!("{}", path.display()),
                Err(e) => {
                    tracing::error!("Failed to install kotlin-language-server: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

fn setup_logging(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if cli.quiet {
        "error"
    } else if cli.verbose == 0 {
        "warn"
    } else if cli.verbose == 1 {
        "info"
    } else {
        "debug"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    Ok(())
}

fn load_settings(cli: &Cli) -> Result<InstallerSettings> {
    let mut values = match cli.settings.clone().or_else(default_settings_file_path) {
        Some(path) => JsonSettings::load(&path)
            .with_context(|| format!("Could not load settings from {}", path.display()))?,
        None => JsonSettings::default(),
    };
    values.apply_env_overrides();

    if let Some(storage_path) = &cli.storage_path {
        values.set("storage_path", storage_path.to_string_lossy().to_string());
    }

    resolve_settings(&values).context("Invalid settings")
}

fn print_status(installer: &mut Installer) {
    let needs_install = installer.needs_update_or_install();
    let recorded = installer
        .installed_version()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "none".to_string());
    let installed_at = installer
        .installed_at()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());

    println!("--- kotlin-language-server ---");
    println!("  Desired version:   {}", installer.desired_version());
    println!("  Installed version: {}", recorded);
    println!("  Installed at:      {}", installed_at);
    println!("  Install dir:       {}", installer.install_dir().display());
    println!("  Binary:            {}", installer.binary_path().display());
    println!("  Platform:          {}", installer.settings().platform);
    if needs_install {
        println!("  Status:            {}", style("needs install").yellow());
    } else {
        println!("  Status:            {}", style("up to date").green());
    }
    println!("------------------------------");
}
