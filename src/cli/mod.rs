//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod say;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;

use crate::cli::say::run_say;
use crate::core::config::{data::path_display, Config};
use crate::core::persistence::{FileStore, MemoryStore, PersistenceAdapter};
use crate::core::theme::ThemeMode;
use crate::ui::chat_loop::run_chat;
use crate::utils::logging::{init_file_logging, init_stderr_logging};

#[derive(Parser)]
#[command(name = "askterm")]
#[command(about = "A terminal chat client for a question-answering endpoint")]
#[command(
    long_about = "askterm is a full-screen terminal chat window that sends each question to an \
answering endpoint and types the reply out character by character.\n\n\
Controls:\n\
  Type              Enter your message in the input field\n\
  Enter             Send the message\n\
  Up/Down/PgUp/PgDn Scroll through the conversation\n\
  Ctrl+T            Toggle light/dark mode\n\
  Ctrl+N            Start a new conversation\n\
  Esc/Ctrl+C        Quit the application\n\n\
Environment Variables:\n\
  ASKTERM_LOG       Log filter directives (default: askterm=info)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Answering endpoint to use instead of the configured one
    #[arg(short = 'e', long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Continue the previously saved conversation
    #[arg(short = 'r', long, global = true)]
    pub resume: bool,

    /// Write diagnostic logs to this file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Ask a single question and print the answer
    Say {
        /// The question to ask
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        question: Vec<String>,
        /// Print the answer at once instead of typing it out
        #[arg(long)]
        instant: bool,
    },
    /// Erase the saved conversation
    Reset,
    /// Show or change the stored light/dark preference
    Theme {
        mode: Option<ThemeArg>,
    },
    /// Set a configuration value, or show the configuration without a value
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set for the key
        value: Option<String>,
    },
    /// Unset a configuration value
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ThemeArg {
    Light,
    Dark,
    Toggle,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

/// Folds command-line overrides into the loaded configuration.
fn apply_overrides(config: &mut Config, args: &Args) -> Result<(), Box<dyn Error>> {
    if let Some(endpoint) = &args.endpoint {
        config.set_value("endpoint", endpoint)?;
    }
    if args.resume {
        config.resume_history = Some(true);
    }
    Ok(())
}

/// The on-disk store, or a memory-only one when no data directory exists.
fn open_persistence(config: &Config) -> Arc<dyn PersistenceAdapter> {
    match config.storage_dir() {
        Some(dir) => Arc::new(FileStore::new(dir)),
        None => {
            warn!("No data directory available; conversation will not be saved");
            Arc::new(MemoryStore::new())
        }
    }
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let mut args = Args::parse();
    let mut config = Config::load()?;
    apply_overrides(&mut config, &args)?;

    match args.command.take().unwrap_or(Commands::Chat) {
        Commands::Chat => {
            init_file_logging(args.log_file.as_deref())?;
            let persistence = open_persistence(&config);
            run_chat(config, persistence).await
        }
        Commands::Say { question, instant } => {
            match args.log_file.as_deref() {
                Some(path) => init_file_logging(Some(path))?,
                None => init_stderr_logging()?,
            }
            run_say(question, instant, &config).await
        }
        Commands::Reset => {
            let persistence = open_persistence(&config);
            persistence.clear_conversation()?;
            println!("✅ Conversation erased");
            Ok(())
        }
        Commands::Theme { mode } => {
            let persistence = open_persistence(&config);
            let current = persistence.load_theme();
            let dark = match mode {
                None => {
                    println!("{}", ThemeMode::from_dark(current).label());
                    return Ok(());
                }
                Some(ThemeArg::Light) => false,
                Some(ThemeArg::Dark) => true,
                Some(ThemeArg::Toggle) => !current,
            };
            persistence.save_theme(dark)?;
            println!("✅ Switched to {}", ThemeMode::from_dark(dark).label());
            Ok(())
        }
        Commands::Set { key, value } => {
            // Overrides must not leak into the saved file.
            let mut stored = Config::load()?;
            match value {
                Some(value) => {
                    if let Err(err) = stored.set_value(&key, &value) {
                        eprintln!("❌ {err}");
                        std::process::exit(1);
                    }
                    stored.save()?;
                    println!("✅ Set {key} to: {value}");
                }
                None => stored.print_all(),
            }
            Ok(())
        }
        Commands::Unset { key } => {
            let mut stored = Config::load()?;
            if let Err(err) = stored.unset_value(&key) {
                eprintln!("❌ {err}");
                std::process::exit(1);
            }
            stored.save()?;
            match Config::get_config_path() {
                Some(path) => println!("✅ Unset {key} in {}", path_display(path)),
                None => println!("✅ Unset {key}"),
            }
            Ok(())
        }
    }
}
