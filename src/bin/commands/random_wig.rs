// bin/commands/random_wig.rs

use clap::Args;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;
use std::path::PathBuf;
use wigindex::error::WigError;
use wigindex::io::OutputStream;
use wigindex::{ContigHeader, TrackHeader};

#[derive(Args)]
pub struct RandomWigArgs {
    /// Output file path (.wig or .wig.gz)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of chromosomes
    #[arg(short = 'c', long, default_value = "3")]
    pub num_chroms: usize,

    /// Bases per chromosome
    #[arg(short = 'n', long, default_value = "1000000")]
    pub length: u64,

    /// Fraction of bases written as NaN
    #[arg(long, default_value = "0.0")]
    pub missing: f64,

    /// Optional seed for random number generation
    #[arg(short, long)]
    pub seed: Option<u64>,
}

pub fn run(args: RandomWigArgs) -> Result<(), WigError> {
    eprintln!(
        "Generating {} random chromosomes of {} bases to {}",
        args.num_chroms,
        args.length,
        args.output
            .as_ref()
            .map_or("<stdout>".to_string(), |v| v.to_string_lossy().to_string())
    );
    if !(0.0..=1.0).contains(&args.missing) {
        return Err("--missing must be between 0 and 1.".into());
    }

    let output = OutputStream::new(args.output);
    let mut output_writer = output.writer()?;

    let mut rng = match args.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let track = TrackHeader::default().with_name("random");
    writeln!(output_writer, "{}", track)?;
    for i in 1..=args.num_chroms {
        let chrom = format!("chr{}", i);
        writeln!(output_writer, "{}", ContigHeader::fixed(&chrom, 1, 1, 1))?;
        for _ in 0..args.length {
            match random_value(&mut rng, args.missing) {
                Some(value) => writeln!(output_writer, "{:.3}", value)?,
                None => writeln!(output_writer, "NaN")?,
            }
        }
    }
    output_writer.flush()?;

    eprintln!("Done!");
    Ok(())
}

fn random_value<R: Rng>(rng: &mut R, missing: f64) -> Option<f64> {
    if missing > 0.0 && rng.gen_bool(missing) {
        return None;
    }
    // Mostly low background with the occasional peak
    if rng.gen_bool(0.02) {
        Some(rng.gen_range(10.0..100.0))
    } else {
        Some(rng.gen_range(0.0..2.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use wigindex::WigFile;

    #[test]
    fn test_reproducible_generation() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        let first: Vec<_> = (0..100).map(|_| random_value(&mut a, 0.1)).collect();
        let second: Vec<_> = (0..100).map(|_| random_value(&mut b, 0.1)).collect();
        assert_eq!(first, second);
        assert!(random_value(&mut a, 1.0).is_none());
    }

    #[test]
    fn test_output_is_indexable() -> Result<(), WigError> {
        let test_file = NamedTempFile::new().unwrap();
        let args = RandomWigArgs {
            output: Some(test_file.path().to_path_buf()),
            num_chroms: 2,
            length: 10,
            missing: 0.0,
            seed: Some(42),
        };

        run(args)?;

        let wig = WigFile::open(test_file.path())?;
        assert_eq!(wig.index().chromosomes().collect::<Vec<_>>(), vec!["chr1", "chr2"]);
        assert_eq!(wig.chr_length("chr2")?, 10);
        assert_eq!(wig.query("chr1", 1, 10)?.coverage(), 10);
        Ok(())
    }
}
