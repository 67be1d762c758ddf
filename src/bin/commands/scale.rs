// bin/commands/scale.rs

use crate::commands::config;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use wigindex::error::WigError;
use wigindex::{open_source, ChunkRunner, TrackHeader};

#[derive(Args)]
pub struct ScaleArgs {
    /// Input Wig, BigWig or bedGraph file.
    #[arg(value_name = "signal.wig")]
    pub input: PathBuf,

    /// Output Wig file, gzip-compressed if it ends in .gz.
    #[arg(short, long, value_name = "scaled.wig")]
    pub output: PathBuf,

    /// Multiply every value by this.
    #[arg(long, allow_negative_numbers = true)]
    pub factor: f64,

    /// Track name of the output (defaults to the input's file name).
    #[arg(long)]
    pub name: Option<String>,

    /// Worker threads (defaults to WIGIDX_THREADS or the number of CPUs).
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Bases read per query (defaults to WIGIDX_CHUNK_SIZE or 200000).
    #[arg(long)]
    pub chunk_size: Option<u64>,
}

pub fn run(args: ScaleArgs) -> Result<(), WigError> {
    let start = Instant::now();

    if args.output == args.input {
        return Err("Output must not overwrite the input file.".into());
    }

    let config = config(&args.input, args.threads, args.chunk_size);
    let source = open_source(&args.input, &config)?;
    let runner = ChunkRunner::new(&config)?;

    let name = args.name.unwrap_or_else(|| {
        let stem = args
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{} x {}", stem, args.factor)
    });
    let track = TrackHeader::default()
        .with_name(name)
        .with_description(format!("{} scaled by {}", args.input.display(), args.factor));

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    progress.set_message(format!(
        "Scaling {} chromosomes by {}",
        source.chromosomes().len(),
        args.factor
    ));
    progress.enable_steady_tick(Duration::from_millis(100));

    let factor = args.factor;
    let result = runner.transform_values(source.as_ref(), &args.output, &track, |v| v * factor);
    progress.finish_and_clear();
    result?;

    eprintln!(
        "Wrote {} in {:?}",
        args.output.display(),
        start.elapsed()
    );
    Ok(())
}
