mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use conwatch_core::config::AppConfig;
use conwatch_core::Theme;
use conwatch_runtime::Runtime;

#[derive(Parser)]
#[command(name = "conwatch", version)]
#[command(about = "Track and resume video progress across web pages")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the watch history, pinned entries first
    List {
        /// Case-insensitive match on title or hostname
        filter: Option<String>,
        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle the pin on an entry
    Pin { id: String },
    /// Remove an entry
    Delete { id: String },
    /// Print the resume link for an entry
    Play {
        id: String,
        /// Open the link in the default browser
        #[arg(long)]
        open: bool,
    },
    /// Save a page without a video
    Bookmark {
        url: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        favicon: Option<String>,
    },
    /// Show or change settings
    Settings {
        #[arg(long)]
        theme: Option<Theme>,
        /// Comma-separated hosts allowed to save on the timer
        #[arg(long)]
        autosave: Option<String>,
    },
    /// Run detection and metadata extraction on a page snapshot
    Inspect { snapshot: PathBuf },
    /// Save progress from a page snapshot
    Save {
        snapshot: PathBuf,
        /// Evaluate as a timer tick instead of a user request
        #[arg(long)]
        periodic: bool,
        /// Go through the keyboard-shortcut save on the focused tab
        #[arg(long, conflicts_with = "periodic")]
        shortcut: bool,
    },
    /// Apply the resume marker in a snapshot's locator
    Resume { snapshot: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("conwatch=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "Config unreadable, using defaults");
            AppConfig::default()
        }
    };

    let result = match cli.command {
        // Needs no store.
        Command::Resume { snapshot } => commands::resume(&snapshot),
        command => match Runtime::open(config) {
            Ok(rt) => run(&rt, command).await,
            Err(e) => Err(e.into()),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(rt: &Runtime, command: Command) -> Result<(), commands::CliError> {
    match command {
        Command::List { filter, json } => {
            commands::list(rt, filter.as_deref().unwrap_or_default(), json).await
        }
        Command::Pin { id } => commands::pin(rt, &id).await,
        Command::Delete { id } => commands::delete(rt, &id).await,
        Command::Play { id, open } => commands::play(rt, &id, open).await,
        Command::Bookmark {
            url,
            title,
            favicon,
        } => commands::bookmark(rt, url, title, favicon).await,
        Command::Settings { theme, autosave } => commands::settings(rt, theme, autosave).await,
        Command::Inspect { snapshot } => commands::inspect(rt, &snapshot).await,
        Command::Save {
            snapshot,
            shortcut: true,
            ..
        } => commands::save_shortcut(rt, &snapshot).await,
        Command::Save {
            snapshot, periodic, ..
        } => commands::save(rt, &snapshot, periodic).await,
        Command::Resume { snapshot } => commands::resume(&snapshot),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_settings_theme_parses() {
        let cli = Cli::parse_from(["conwatch", "settings", "--theme", "Dark"]);
        let Command::Settings { theme, autosave } = cli.command else {
            panic!("expected settings");
        };
        assert_eq!(theme, Some(Theme::Dark));
        assert!(autosave.is_none());
    }

    #[test]
    fn test_save_shortcut_flag() {
        let cli = Cli::parse_from(["conwatch", "save", "page.json", "--shortcut"]);
        let Command::Save {
            snapshot,
            periodic,
            shortcut,
        } = cli.command
        else {
            panic!("expected save");
        };
        assert_eq!(snapshot, PathBuf::from("page.json"));
        assert!(shortcut && !periodic);

        let both = ["conwatch", "save", "p.json", "--shortcut", "--periodic"];
        assert!(Cli::try_parse_from(both).is_err());
    }
}
