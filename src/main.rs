//! # docchat CLI
//!
//! ## Usage
//!
//! ```bash
//! docchat --config ./config/docchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docchat chat <FILES>...` | Index the files, then answer questions from stdin |
//! | `docchat ask <FILES>... --question "..."` | Index the files and answer one question |
//! | `docchat chunks <FILE>` | Show how a file is extracted and chunked (offline) |
//! | `docchat completions <SHELL>` | Print shell completions |
//!
//! ## Examples
//!
//! ```bash
//! export OPENAI_API_KEY=sk-...
//! docchat chat handbook.pdf faq.docx --transcript chat.json
//! docchat ask report.pdf --question "What was the Q3 revenue?"
//! docchat chunks notes.md
//! ```

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

use docchat::{chat, config, inspect};

/// docchat: ask questions about your documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docchat.example.toml` for every option.
#[derive(Parser)]
#[command(
    name = "docchat",
    about = "docchat: chat with your PDF, Office and text documents",
    version,
    long_about = "docchat extracts text from uploaded documents, splits it into overlapping \
    chunks, embeds them into an in-memory index, and answers questions with a language model \
    using only the most relevant passages as context."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/docchat.toml`; built-in defaults are used if
    /// the file does not exist.
    #[arg(long, global = true, default_value = "./config/docchat.toml")]
    config: PathBuf,

    /// Enable debug logging on stderr (overrides RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index documents and chat about them.
    ///
    /// Reads one question per line from stdin. Recognized commands:
    /// `/history`, `/sources`, `/reset` (rebuild the index, clear history)
    /// and `/quit`.
    Chat {
        /// Documents to index (pdf, docx, pptx, txt, md).
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write the conversation as JSON to this path on exit.
        #[arg(long)]
        transcript: Option<PathBuf>,
    },

    /// Index documents and answer a single question.
    Ask {
        /// Documents to index (pdf, docx, pptx, txt, md).
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// The question to answer.
        #[arg(long, short)]
        question: String,
    },

    /// Extract and chunk a file without calling any service.
    Chunks {
        file: PathBuf,
    },

    /// Print shell completions.
    Completions {
        shell: Shell,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("docchat=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Commands that don't require config
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "docchat", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Chat { files, transcript } => {
            chat::run_chat(&cfg, &files, transcript.as_deref()).await?;
        }
        Commands::Ask { files, question } => {
            chat::run_ask(&cfg, &files, &question).await?;
        }
        Commands::Chunks { file } => {
            inspect::run_chunks(&file, &cfg.chunking)?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
