// bin/commands/stats.rs

use crate::commands::config;
use clap::Args;
use std::path::PathBuf;
use std::time::Instant;
use wigindex::error::WigError;
use wigindex::{open_source, ChunkRunner, WigStats};

#[derive(Args)]
pub struct StatsArgs {
    /// Input Wig, BigWig or bedGraph file.
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Worker threads (defaults to WIGIDX_THREADS or the number of CPUs).
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Bases read per query (defaults to WIGIDX_CHUNK_SIZE or 200000).
    #[arg(long)]
    pub chunk_size: Option<u64>,
}

pub fn run(args: StatsArgs) -> Result<(), WigError> {
    let start = Instant::now();

    let config = config(&args.input, args.threads, args.chunk_size);
    eprintln!("Opening {}...", args.input.display());
    let source = open_source(&args.input, &config)?;
    let runner = ChunkRunner::new(&config)?;

    eprintln!(
        "Scanning {} chromosomes on {} threads...",
        source.chromosomes().len(),
        runner.threads()
    );
    let stats = WigStats::compute(&runner, source.as_ref())?;
    print!("{}", stats.report());

    eprintln!("Analysis completed in {:?}", start.elapsed());
    Ok(())
}
