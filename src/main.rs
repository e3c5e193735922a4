use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use appledict_reader::{DictError, DictionaryReader, IndexSource, ReaderOptions};
use clap::{Parser, Subcommand};
use log::LevelFilter;

const DEFAULT_BODY: &str = "oxford.dictionary/Contents/Body.data";
const SUGGESTION_LIMIT: usize = 8;

#[derive(Debug, Parser)]
#[command(name = "appledict")]
#[command(about = "Look up entries in an Apple Dictionary Body.data container")]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to the container
    #[clap(long, short, default_value = DEFAULT_BODY, global = true)]
    body: PathBuf,
    /// Index cache location, defaults to <body>.index.json
    #[clap(long, global = true)]
    cache: Option<PathBuf>,
    /// Neither read nor write the index cache
    #[clap(long, action, global = true)]
    no_cache: bool,
    /// Rescan the container even if a valid cache exists
    #[clap(long, action, global = true)]
    rebuild: bool,
    /// Offset of the first block header
    #[clap(long, value_parser = parse_offset, global = true)]
    first_block_offset: Option<u64>,
    /// Verbose mode - sets the log level to info, defaults to warning level
    #[clap(long, short, action, default_value = "false", global = true)]
    verbose: bool,
    /// Debug mode - sets the log level to debug, defaults to warning level
    #[clap(long, action, default_value = "false", global = true)]
    debug: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the raw markup of an entry
    Lookup {
        /// The word or phrase; multiple arguments are joined with spaces
        #[clap(required = true, num_args = 1..)]
        words: Vec<String>,
        /// Print every homonym instead of only the last one in the container
        #[clap(long, action)]
        all: bool,
    },
    /// List every headword, one per line
    List {
        /// Write to this file instead of stdout
        #[clap(long, short)]
        output: Option<PathBuf>,
    },
    /// Build or load the index and report on it
    Index,
}

fn parse_offset(s: &str) -> std::result::Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid offset {:?}: {}", s, e))
}

fn init_logging(cli: &Cli) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if cli.debug {
        builder.filter_level(LevelFilter::Debug);
    } else if cli.verbose {
        builder.filter_level(LevelFilter::Info);
    }
    let _ = builder.try_init();
}

fn options(cli: &Cli) -> ReaderOptions {
    let mut options = ReaderOptions {
        cache_path: cli.cache.clone(),
        use_cache: !cli.no_cache,
        force_rebuild: cli.rebuild,
        ..ReaderOptions::default()
    };
    if let Some(offset) = cli.first_block_offset {
        options.first_block_offset = offset;
    }
    options
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli);

    let reader = DictionaryReader::open(&cli.body, options(&cli))
        .with_context(|| format!("failed to open {}", cli.body.display()))?;

    match &cli.command {
        Commands::Lookup { words, all } => lookup(&reader, &words.join(" "), *all),
        Commands::List { output } => list(&reader, output.as_ref()),
        Commands::Index => {
            report(&reader);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn lookup(reader: &DictionaryReader, word: &str, all: bool) -> Result<ExitCode> {
    let result = if all {
        reader.lookup_all(word)
    } else {
        reader.lookup(word).map(|entry| vec![entry])
    };

    let entries = match result {
        Ok(entries) => entries,
        Err(DictError::NotFound { query }) => {
            let suggestions = reader.suggest(&query, SUGGESTION_LIMIT);
            if suggestions.is_empty() {
                println!("\"{}\" not found in dictionary.", query);
            } else {
                println!("\"{}\" not found. Did you mean: {}?", query, suggestions.join(", "));
            }
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e).with_context(|| format!("failed to read entry for {:?}", word)),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for entry in entries {
        out.write_all(entry.as_bytes())?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(ExitCode::SUCCESS)
}

fn list(reader: &DictionaryReader, output: Option<&PathBuf>) -> Result<ExitCode> {
    let mut out: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut count = 0usize;
    for headword in reader.headwords() {
        writeln!(out, "{}", headword)?;
        count += 1;
    }
    out.flush()?;

    match output {
        Some(path) => eprintln!("Wrote {} words to {}", count, path.display()),
        None => eprintln!("\n# Total: {} words", count),
    }
    Ok(ExitCode::SUCCESS)
}

fn report(reader: &DictionaryReader) {
    let index = reader.index();
    let source = match reader.index_source() {
        IndexSource::Cache => "loaded from cache",
        IndexSource::Scan => "built by scanning",
    };
    println!("Container:  {}", reader.container_path().display());
    println!("Size:       {} bytes", index.fingerprint.size);
    println!("Extent:     {:#x}", index.extent);
    println!("Headwords:  {} ({})", index.len(), source);
    println!("Homonyms:   {}", index.homonyms().count());
    match reader.cache_path() {
        Some(path) => println!("Cache:      {}", path.display()),
        None => println!("Cache:      disabled"),
    }
}
