use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use lyric_corpus::assembler::{assemble_concurrent, AssemblerConfig, ErrorPolicy};
use lyric_corpus::discovery::{discover_songs, DiscoveryConfig};
use lyric_corpus::reader::{AsyncFileReader, ReaderConfig};
use lyric_corpus::run_stats::{unix_now, RunStats};
use lyric_corpus::serializer::{write_outputs, OutputPlan, SerializerConfig};
use lyric_corpus::tagger::{LexiconTagger, Tagger};
use lyric_corpus::{frequency, normalizer};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lyric-corpus")]
#[command(about = "Compile album/song lyric files into a tagged word corpus")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the corpus document from a lyrics root directory
    Compile(CompileArgs),
    /// Write normalized copies of the given files into an output directory
    FixChars {
        /// Files to normalize
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory receiving the normalized copies
        #[arg(long)]
        out_dir: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct CompileArgs {
    /// Root directory with one subdirectory per album
    root_dir: PathBuf,

    /// Corpus document path
    #[arg(long, default_value = "lyrics-compiled/lyrics.json")]
    out: PathBuf,

    /// Also write the word frequency index to this path
    #[arg(long)]
    frequencies_out: Option<PathBuf>,

    /// Also write a song key -> raw file path document
    #[arg(long)]
    source_map_out: Option<PathBuf>,

    /// What to do with a file that fails to segment or tag (abort or skip)
    #[arg(long, default_value = "abort")]
    policy: ErrorPolicy,

    /// Abort on first error, overriding --policy
    #[arg(long)]
    fail_fast: bool,

    /// Maximum files processed concurrently (default: CPU count)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-file tagging deadline in milliseconds, 0 disables it
    #[arg(long, default_value_t = 30_000)]
    tag_timeout_ms: u64,

    /// Album directory names to leave out (repeatable)
    #[arg(long = "exclude-album")]
    exclude_albums: Vec<String>,

    /// TSV lexicon (word<TAB>TAG) layered over the built-in tagger
    #[arg(long)]
    lexicon: Option<PathBuf>,

    /// Stats output file path
    #[arg(long, default_value = "run_stats.json")]
    stats_out: PathBuf,

    /// Suppress console progress
    #[arg(long)]
    no_progress: bool,

    /// Indent JSON output
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let args = Args::parse();
    info!(?args, "Parsed CLI arguments");

    match args.command {
        Command::Compile(compile_args) => compile(compile_args).await,
        Command::FixChars { files, out_dir } => {
            let written = normalizer::fix_files(files.as_slice(), &out_dir)
                .await
                .context("fix-chars failed")?;
            println!("Normalized {} files into {}", written.len(), out_dir.display());
            Ok(())
        }
    }
}

async fn compile(args: CompileArgs) -> Result<()> {
    let run_start = unix_now();
    let started = Instant::now();

    if !args.root_dir.exists() {
        anyhow::bail!("Root directory does not exist: {}", args.root_dir.display());
    }
    if !args.root_dir.is_dir() {
        anyhow::bail!("Root path is not a directory: {}", args.root_dir.display());
    }

    let progress = if args.no_progress {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template("{spinner} [{elapsed}] {msg}")?);
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    };

    progress.set_message("Discovering songs");
    let discovery_config = DiscoveryConfig {
        excluded_albums: args.exclude_albums.clone(),
    };
    let files = discover_songs(&args.root_dir, &discovery_config)?;

    let tagger: Arc<dyn Tagger> = match &args.lexicon {
        Some(path) => Arc::new(LexiconTagger::load(path)?),
        None => Arc::new(LexiconTagger::new()),
    };

    let assembler_config = AssemblerConfig {
        policy: if args.fail_fast { ErrorPolicy::Abort } else { args.policy },
        concurrency: args.concurrency.unwrap_or_else(num_cpus::get).max(1),
        tag_timeout: (args.tag_timeout_ms > 0).then(|| Duration::from_millis(args.tag_timeout_ms)),
    };

    progress.set_message(format!("Assembling {} songs", files.len()));
    let reader = AsyncFileReader::new(ReaderConfig::default());
    let assembly = assemble_concurrent(files, tagger, reader, &assembler_config).await?;

    let index = args.frequencies_out.as_ref().map(|_| frequency::index(&assembly.corpus));

    progress.set_message("Writing output");
    let plan = OutputPlan {
        corpus: args.out.clone(),
        frequencies: args.frequencies_out.clone(),
        sources: args.source_map_out.clone(),
    };
    let serializer_config = SerializerConfig { pretty: args.pretty };
    write_outputs(
        &plan,
        &assembly.corpus,
        index.as_ref(),
        &args.root_dir,
        &serializer_config,
    )
    .await?;
    progress.finish_and_clear();

    let mut stats = RunStats::new(run_start);
    for file_stats in assembly.file_stats {
        stats.record(file_stats);
    }
    stats.distinct_words = index.as_ref().map_or(0, |index| index.len() as u64);
    stats.total_processing_time_ms = started.elapsed().as_millis() as u64;
    stats
        .write(&args.stats_out)
        .await
        .with_context(|| format!("writing stats to {}", args.stats_out.display()))?;

    println!("lyric-corpus v{} - compile complete", env!("CARGO_PKG_VERSION"));
    println!("  Songs compiled: {}", assembly.corpus.len());
    if !assembly.skipped.is_empty() {
        println!("  Skipped: {}", assembly.skipped.len());
        for skipped in &assembly.skipped {
            println!("    {}: {}", skipped.file.source_id(), skipped.error);
        }
    }
    println!("  Corpus written to {}", args.out.display());

    info!(
        "Compile finished in {}ms: {} songs, {} skipped",
        stats.total_processing_time_ms,
        assembly.corpus.len(),
        assembly.skipped.len()
    );
    Ok(())
}
