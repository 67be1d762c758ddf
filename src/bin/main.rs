#[cfg(feature = "cli")]
mod commands;

#[cfg(feature = "cli")]
mod cli {
    #[cfg(feature = "dev")]
    use super::commands::random_wig;
    use super::commands::{index, query, scale, spots_to_wig, stats};
    use clap::Parser;
    use tracing_subscriber::EnvFilter;
    use wigindex::error::WigError;

    #[derive(Parser)]
    #[command(author, version, about, long_about = None)]
    pub struct Cli {
        /// Log more (repeat for trace output). RUST_LOG overrides this.
        #[arg(short, long, action = clap::ArgAction::Count, global = true)]
        verbose: u8,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(clap::Subcommand)]
    enum Commands {
        /// Build the .widx line index next to a Wig file.
        Index(index::IndexArgs),
        /// Query a region (or a BED file of regions) of a Wig, BigWig or bedGraph file.
        Query(query::QueryArgs),
        /// Summary statistics over every value in a file.
        Stats(stats::StatsArgs),
        /// Multiply every value by a constant, writing a new Wig file.
        Scale(scale::ScaleArgs),
        /// Average a Bed/bedGraph file of spots into a fixedStep Wig file.
        SpotsToWig(spots_to_wig::SpotsToWigArgs),
        #[cfg(feature = "dev")]
        /// Generate a random Wig file for benchmarking (only with dev feature)
        RandomWig(random_wig::RandomWigArgs),
    }

    fn init_logging(verbose: u8) {
        let default_level = match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    pub fn run() -> Result<(), WigError> {
        let cli = Cli::parse();
        init_logging(cli.verbose);
        match cli.command {
            Commands::Index(args) => index::run(args),
            Commands::Query(args) => query::run(args),
            Commands::Stats(args) => stats::run(args),
            Commands::Scale(args) => scale::run(args),
            Commands::SpotsToWig(args) => spots_to_wig::run(args),
            #[cfg(feature = "dev")]
            Commands::RandomWig(args) => random_wig::run(args),
        }
    }
}

fn main() {
    #[cfg(feature = "cli")]
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("CLI feature not enabled. Please rebuild with --features cli");
        std::process::exit(1);
    }
}
