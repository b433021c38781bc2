//! # Know Pipe CLI (`kp`)
//!
//! The `kp` binary drives the knowledge pipeline: it builds a guide library
//! from a source-analysis manifest, or discovers patterns in an unlabeled
//! data directory and writes the manifest itself.
//!
//! ## Usage
//!
//! ```bash
//! kp --config ./config/kp.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kp init` | Create the library directory layout |
//! | `kp run` | Run the manifest-driven pipeline |
//! | `kp discover <dir> [use case]` | Auto mode: discover, write a manifest, build guides |
//! | `kp scan <root>` | Print the per-category inventory |
//! | `kp sample <file>` | Print the samples a file produces |
//! | `kp parse <file> --stream <s>` | Parse a saved analysis text and print the records |
//!
//! ## Examples
//!
//! ```bash
//! # Build guides from a hand-written manifest
//! kp run --manifest ./intake/SOURCE_ANALYSIS.md
//!
//! # Let the analysis service propose the manifest
//! kp discover ./data/apps "JSON API docs for our integrations"
//!
//! # Check what the sampler would send for one file
//! kp sample ./data/apps/billing.json
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use know_pipe::assembler::GenerationStamp;
use know_pipe::config::{self, Config};
use know_pipe::gateway::create_gateway;
use know_pipe::library;
use know_pipe::models::{FileCategory, InsightSource, MediaKind, Record};
use know_pipe::parser::{Parser as AnalysisParser, Stream};
use know_pipe::pipeline::{self, RunContext, RunReport};
use know_pipe::progress::ProgressMode;
use know_pipe::sampler;
use know_pipe::scanner;
use know_pipe::source_analysis::DEFAULT_OUTPUT;
use know_pipe::stream_docs::identify_doc_type;
use know_pipe::stream_media::media_kind_of;

/// Know Pipe CLI: turn unlabeled code, docs, images and logs into
/// "how to build X" guides.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means all defaults.
#[derive(Parser)]
#[command(
    name = "kp",
    about = "Know Pipe: build a library of implementation guides from unlabeled sources",
    version,
    long_about = "Know Pipe samples code, documentation, images and logs, sends bounded \
    excerpts to an analysis service, parses the answers into patterns and insights, and \
    assembles them into cross-linked Markdown guides."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/kp.toml`. Scan, sampling, parser, stream,
    /// output and analysis settings are read from this file.
    #[arg(long, global = true, default_value = "./config/kp.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Create the library directory layout.
    ///
    /// Creates `how_to_build/`, `patterns/`, `architecture/` and `gotchas/`
    /// under the configured output root. Safe to run repeatedly.
    Init,

    /// Run the manifest-driven pipeline.
    ///
    /// Reads the manifest's code, documentation and multimodal sections,
    /// analyzes each stream, and writes the guide library.
    Run {
        /// Source-analysis manifest to read.
        #[arg(long, default_value = "./intake/SOURCE_ANALYSIS.md")]
        manifest: PathBuf,

        /// Progress on stderr: `human`, `json` or `off`.
        /// Defaults to `human` when stderr is a terminal.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Auto mode: discover data patterns, write a manifest, build guides.
    Discover {
        /// Unlabeled data directory to scan.
        data_dir: PathBuf,

        /// What the generated guides should help with.
        use_case: Option<String>,

        /// Where to write the generated manifest.
        #[arg(long, default_value = DEFAULT_OUTPUT)]
        out: PathBuf,

        /// Progress on stderr: `human`, `json` or `off`.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Print the per-category inventory of a directory.
    ///
    /// No analysis requests are made.
    Scan {
        /// Root directory to scan.
        root: PathBuf,
    },

    /// Print the samples a single file produces.
    Sample {
        /// File to sample.
        file: PathBuf,

        /// Category override (e.g. `structured-data`, `config`).
        /// Defaults to the category derived from the file name.
        #[arg(long)]
        category: Option<String>,
    },

    /// Parse a saved analysis text and print the records as JSON.
    Parse {
        /// File holding the analysis text.
        file: PathBuf,

        /// Parser profile: `code`, `doc`, `multimodal` or `data`.
        #[arg(long)]
        stream: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,know_pipe=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Init => {
            library::init_layout(&cfg.output.root)?;
            println!("init {}", cfg.output.root.display());
            println!("ok");
        }
        Commands::Run { manifest, progress } => {
            let reporter = progress_mode(progress.as_deref())?.reporter();
            let gateway = create_gateway(&cfg.analysis)?;
            let ctx = RunContext::new(&cfg, gateway.as_ref(), reporter.as_ref());
            let result = pipeline::run_manifest(&manifest, &ctx, &GenerationStamp::now()).await;
            report_or_exit(result);
        }
        Commands::Discover {
            data_dir,
            use_case,
            out,
            progress,
        } => {
            let reporter = progress_mode(progress.as_deref())?.reporter();
            let gateway = create_gateway(&cfg.analysis)?;
            let ctx = RunContext::new(&cfg, gateway.as_ref(), reporter.as_ref());
            let use_case = use_case.unwrap_or_default();
            let result =
                pipeline::run_auto(&data_dir, &use_case, &out, &ctx, &GenerationStamp::now()).await;
            report_or_exit(result);
        }
        Commands::Scan { root } => {
            run_scan(&cfg, &root)?;
        }
        Commands::Sample { file, category } => {
            run_sample(&cfg, &file, category.as_deref())?;
        }
        Commands::Parse { file, stream } => {
            run_parse(&cfg, &file, &stream)?;
        }
    }

    Ok(())
}

fn progress_mode(flag: Option<&str>) -> anyhow::Result<ProgressMode> {
    match flag {
        Some(s) => s.parse().map_err(anyhow::Error::msg),
        None => Ok(ProgressMode::default_for_tty()),
    }
}

fn report_or_exit(result: anyhow::Result<RunReport>) {
    match result {
        Ok(report) => pipeline::print_summary(&report),
        Err(e) => {
            tracing::error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

fn run_scan(cfg: &Config, root: &Path) -> anyhow::Result<()> {
    let inventory = scanner::scan(root, &cfg.scan)?;
    println!("scan {}", root.display());
    for (category, files) in inventory.iter() {
        let dropped = inventory.dropped(category);
        if dropped > 0 {
            println!("  {}: {} (+{} over cap)", category, files.len(), dropped);
        } else {
            println!("  {}: {}", category, files.len());
        }
        for file in files {
            println!("    {}", file.display());
        }
    }
    println!("  total: {}", inventory.total());
    println!("ok");
    Ok(())
}

fn run_sample(cfg: &Config, file: &Path, category: Option<&str>) -> anyhow::Result<()> {
    let category = match category {
        Some(c) => c.parse::<FileCategory>().map_err(anyhow::Error::msg)?,
        None => scanner::classify(file),
    };
    let samples = sampler::try_sample(file, category, &cfg.sampling)?;

    println!("sample {} ({})", file.display(), category);
    for (i, s) in samples.iter().enumerate() {
        println!("--- {} [{}] {} chars", i + 1, s.kind.as_str(), s.text.chars().count());
        for (key, value) in &s.metadata {
            println!("  {}: {}", key, value);
        }
        println!("{}", s.text);
    }
    println!("samples: {}", samples.len());
    Ok(())
}

fn run_parse(cfg: &Config, file: &Path, stream: &str) -> anyhow::Result<()> {
    let stream: Stream = stream.parse().map_err(anyhow::Error::msg)?;
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read analysis text: {}", file.display()))?;
    let context = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let source = match stream {
        Stream::Multimodal => InsightSource::Media(media_kind_of(file).unwrap_or(MediaKind::Logs)),
        _ => InsightSource::Doc(identify_doc_type(file)),
    };

    let records: Vec<Record> =
        AnalysisParser::new(stream.profile(), &cfg.parser).parse(&raw, file, &context, source);
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
