use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use scribe_config::EditorConfig;
use scribe_core::sanitize::{BackendKind, Sanitizer};

/// Sanitizes rich-text markup read from files or standard input.
#[derive(Parser, Debug)]
#[command(name = "scribe", version, about)]
struct Cli {
    /// Markup files to sanitize. Reads standard input when none are given.
    files: Vec<PathBuf>,

    /// Use the narrower paste profile.
    #[arg(long)]
    paste: bool,

    /// Tree backend: auto, fallback or host. Overrides the config file.
    #[arg(long)]
    backend: Option<BackendKind>,

    /// Config file to use instead of scribe.json next to the executable.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout carries only markup
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::load_or_create(&EditorConfig::config_path()),
    };

    let backend = match cli.backend {
        Some(kind) => kind,
        None => config
            .tree_backend
            .parse::<BackendKind>()
            .map_err(anyhow::Error::msg)?,
    };
    let paste = cli.paste || config.paste_by_default();
    let profile = if paste { "paste" } else { "content" };

    let sanitizer = Sanitizer::with_backend(backend);
    tracing::info!(backend = %sanitizer.backend(), profile, "Starting scribe");

    let clean = |markup: &str| {
        if paste {
            sanitizer.sanitize_for_paste(markup)
        } else {
            sanitizer.sanitize(markup)
        }
    };

    let mut out = io::stdout().lock();
    if cli.files.is_empty() {
        let mut markup = String::new();
        io::stdin()
            .read_to_string(&mut markup)
            .context("Failed to read standard input")?;
        writeln!(out, "{}", clean(&markup)).context("Failed to write output")?;
    } else {
        for path in &cli.files {
            let markup = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read file: {}", path.display()))?;
            writeln!(out, "{}", clean(&markup)).context("Failed to write output")?;
            tracing::debug!(file = %path.display(), "Sanitized");
        }
    }
    out.flush().context("Failed to flush output")?;

    Ok(())
}
