//! CaskDB admin tool
//!
//! Opens a data directory directly and runs one operation against it.

use std::path::PathBuf;
use std::process::ExitCode;

use caskdb::{CaskError, Config, Engine, Recovery, SyncStrategy};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// CaskDB admin tool
#[derive(Parser, Debug)]
#[command(name = "caskdb")]
#[command(about = "Inspect and modify a CaskDB data directory")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./caskdb_data")]
    data_dir: PathBuf,

    /// Active log file name inside the data directory
    #[arg(long, default_value = "caskdb.data")]
    log_file: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Rewrite the log keeping only live records
    Merge,

    /// Print key count and log size
    Stats,

    /// Scan the log and report corrupted records without opening an engine
    Verify,
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> caskdb::Result<ExitCode> {
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .log_file_name(&args.log_file)
        .sync_strategy(SyncStrategy::EveryWrite)
        .build();

    match args.command {
        Commands::Verify => verify(&config),
        command => execute(config, command),
    }
}

fn verify(config: &Config) -> caskdb::Result<ExitCode> {
    config.validate()?;
    let result = Recovery::verify(&config.log_path())?;

    println!("records:   {}", result.records_recovered);
    println!("corrupted: {}", result.records_corrupted);
    for offset in &result.corrupted_offsets {
        println!("  at offset {}", offset);
    }
    println!("live keys: {}", result.live_keys);
    println!("torn tail: {} bytes", result.torn_tail_bytes());

    let clean = result.records_corrupted == 0 && !result.has_torn_tail();
    Ok(if clean { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn execute(config: Config, command: Commands) -> caskdb::Result<ExitCode> {
    let engine = Engine::open(config)?;

    let code = match command {
        Commands::Put { key, value } => {
            engine.put(key.as_bytes(), value.as_bytes())?;
            println!("OK");
            ExitCode::SUCCESS
        }
        Commands::Get { key } => match engine.get(key.as_bytes()) {
            Ok(value) => {
                println!("{}", String::from_utf8_lossy(&value));
                ExitCode::SUCCESS
            }
            Err(CaskError::KeyNotFound) => {
                eprintln!("key not found");
                ExitCode::FAILURE
            }
            Err(e) => return Err(e),
        },
        Commands::Merge => {
            let stats = engine.merge()?;
            println!(
                "merged {} keys: {} -> {} bytes",
                stats.live_keys, stats.bytes_before, stats.bytes_after
            );
            ExitCode::SUCCESS
        }
        Commands::Stats => {
            println!("log:       {}", engine.log_path().display());
            println!("live keys: {}", engine.key_count());
            println!("log size:  {} bytes", engine.log_size());
            ExitCode::SUCCESS
        }
        Commands::Verify => verify(engine.config())?,
    };

    engine.close()?;
    Ok(code)
}
