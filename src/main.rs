//! forum-labeler - Dictionary Term Recognition for Forum Text
//!
//! Main CLI entry point for labeling text, inspecting the LLM provider pool
//! and asking single is-form-of questions.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use forum_labeler::config::LabelerConfig;
use forum_labeler::language::Language;
use forum_labeler::llm::{LlmJudge, ProviderPool, TermJudge};
use forum_labeler::pipeline::{ProcessStatus, SentencesLabeler, Topic};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "forum-labeler")]
#[command(version)]
#[command(about = "Dictionary term recognition and validation for forum text", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one is-form-of question through the provider pool
    Ask {
        /// LLM provider config directory
        #[arg(long)]
        dir: PathBuf,

        /// Word found in text
        #[arg(long)]
        candidate: String,

        /// Dictionary value
        #[arg(long)]
        base: String,

        #[arg(long, default_value = "ru")]
        language: String,

        #[arg(long, default_value = "fish")]
        entry_type: String,
    },

    /// Label a plain-text file as one topic, printing JSON lines
    Label {
        /// Config file (default: labeler.toml searched upward)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Input text file
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long, default_value = "")]
        forum_url: String,

        #[arg(long, default_value = "")]
        topic_url: String,
    },

    /// List providers loaded from a config directory
    Providers {
        /// LLM provider config directory
        #[arg(long)]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Ask {
            dir,
            candidate,
            base,
            language,
            entry_type,
        } => cmd_ask(&dir, &candidate, &base, &language, &entry_type),
        Commands::Label {
            config,
            input,
            forum_url,
            topic_url,
        } => cmd_label(config.as_deref(), &input, forum_url, topic_url),
        Commands::Providers { dir } => cmd_providers(&dir),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let mut clog = colog::default_builder();
    clog.filter(None, level);
    clog.init();
}

fn cmd_label(config: Option<&Path>, input: &Path, forum_url: String, topic_url: String) -> Result<()> {
    let config = match config {
        Some(path) => LabelerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            let cwd = std::env::current_dir().context("Failed to get current directory")?;
            LabelerConfig::find_and_load(&cwd).context("Failed to load labeler.toml")?
        }
    };

    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read input {}", input.display()))?;

    let mut labeler = SentencesLabeler::from_config(&config).context("Failed to set up labeler")?;
    let topic = Topic {
        forum_url,
        topic_url,
        content,
    };

    let outcome = labeler.process_topic(&topic).context("Labeling failed")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for sentence in &outcome.sentences {
        writeln!(out, "{}", serde_json::to_string(sentence)?)?;
    }
    out.flush()?;

    labeler.flush();
    let meta = labeler.result();
    log::info!(
        "Labeled {} sentences with {} labels ({})",
        meta.total_sentences,
        meta.total_labels_loaded,
        meta.language
    );
    if outcome.status == ProcessStatus::Stopped {
        log::info!("Stopped at max_sentences = {}", config.labeler.max_sentences);
    }

    Ok(())
}

fn cmd_providers(dir: &Path) -> Result<()> {
    println!("LLM Providers");
    println!("=============");
    println!();

    let pool = ProviderPool::from_dir(dir);
    if pool.is_empty() {
        println!("No providers loaded from {}.", dir.display());
        println!();
        println!("Each provider needs a <name>.json config and a key, either");
        println!("inline, in <name>_key.json, or in the configured env var.");
        return Ok(());
    }

    println!("{:<14} {:<40} {:>8} {:>8} {:>8}", "NAME", "MODEL", "PRIORITY", "RPM", "RPD");
    println!("{:-<14} {:-<40} {:->8} {:->8} {:->8}", "", "", "", "", "");
    for p in pool.summaries() {
        println!(
            "{:<14} {:<40} {:>8} {:>8} {:>8}",
            p.name, p.model, p.priority, p.limits.requests_per_minute, p.limits.requests_per_day
        );
    }
    println!();

    Ok(())
}

fn cmd_ask(dir: &Path, candidate: &str, base: &str, language: &str, entry_type: &str) -> Result<()> {
    let language: Language = match language.parse() {
        Ok(lang) => lang,
        Err(other) => bail!("Unsupported language: {}", other),
    };

    let pool = ProviderPool::from_dir(dir);
    if pool.is_empty() {
        bail!("No LLM providers available in {}", dir.display());
    }

    let judge = LlmJudge::new(pool);
    let verdict = judge
        .is_form_of(candidate, base, language, entry_type)
        .context("LLM request failed")?;

    println!("{} → {}: {}", candidate, base, if verdict { "TRUE" } else { "FALSE" });
    Ok(())
}
