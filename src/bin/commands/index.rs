// bin/commands/index.rs

use clap::Args;
use std::path::PathBuf;
use std::time::Instant;
use wigindex::error::WigError;
use wigindex::{WigConfig, WigFile};

#[derive(Args)]
pub struct IndexArgs {
    /// Input Wig file (plain text).
    #[arg(value_name = "signal.wig")]
    pub input: PathBuf,

    /// zstd compression level for the .widx sidecar.
    #[arg(short, long, default_value_t = 3)]
    pub level: i32,

    /// Print each chromosome's header and line range.
    #[arg(long)]
    pub summary: bool,
}

pub fn run(args: IndexArgs) -> Result<(), WigError> {
    let start = Instant::now();

    if !args.input.exists() {
        return Err(format!("Input file {} does not exist.", args.input.display()).into());
    }

    // Always rescan, never trust an existing sidecar.
    let config = WigConfig::from_env().use_index_cache(false);
    let wig = WigFile::open_with_config(&args.input, config)?;
    let sidecar = wig.write_index(args.level)?;

    eprintln!(
        "Indexed {} chromosomes ({} lines) into {}",
        wig.index().chromosomes().count(),
        wig.index().num_lines(),
        sidecar.display()
    );
    if args.summary {
        print!("{}", wig);
    }

    eprintln!("Indexing completed in {:?}", start.elapsed());
    Ok(())
}
