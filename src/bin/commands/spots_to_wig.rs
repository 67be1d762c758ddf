// bin/commands/spots_to_wig.rs

use crate::commands::read_chrom_sizes;
use clap::Args;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use wigindex::error::WigError;
use wigindex::io::OutputStream;
use wigindex::{SpotArray, TrackHeader};

#[derive(Args)]
pub struct SpotsToWigArgs {
    /// Input Bed (score column) or bedGraph file, optionally gzipped.
    #[arg(value_name = "spots.bedGraph")]
    pub input: PathBuf,

    /// Output Wig file. Writes to stdout if omitted.
    #[arg(short, long, value_name = "spots.wig")]
    pub output: Option<PathBuf>,

    /// Two-column chrom sizes file. Each chromosome is then written from
    /// base 1 to its end, instead of over the spots' extent only.
    #[arg(long, value_name = "genome.sizes")]
    pub sizes: Option<PathBuf>,

    /// Track name of the output.
    #[arg(long)]
    pub name: Option<String>,
}

pub fn run(args: SpotsToWigArgs) -> Result<(), WigError> {
    let start = Instant::now();

    let array = SpotArray::from_file(&args.input)?;
    eprintln!(
        "Loaded {} spots on {} chromosomes from {}",
        array.num_spots(),
        array.data().len(),
        args.input.display()
    );

    let sizes = args.sizes.as_deref().map(read_chrom_sizes).transpose()?;
    let name = args.name.unwrap_or_else(|| {
        args.input
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let track = TrackHeader::default().with_name(name);

    let mut writer = OutputStream::new(args.output.as_ref()).writer()?;
    array.write_wig(&mut writer, &track, sizes.as_ref())?;
    writer.flush()?;

    eprintln!("Conversion completed in {:?}", start.elapsed());
    Ok(())
}
