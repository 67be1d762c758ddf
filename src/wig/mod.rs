// wig/mod.rs

use std::path::Path;

use crate::config::WigConfig;
use crate::contig::Contig;
use crate::error::WigError;
use crate::interval::{GenomicInterval, Position};
use crate::spots::SpotArray;
use crate::transform::Chunks;

pub mod bigwig;
pub mod file;
pub mod header;
pub mod index;
pub mod lines;

pub use bigwig::{BigWigFile, BigWigInfo, CommandOutput, CommandRunner, SystemRunner};
pub use file::WigFile;
pub use header::{ContigHeader, StepType, TrackHeader};
pub use index::{ChromEntry, WigIndex};
pub use lines::LineIndex;

/// Anything that answers genomic range queries with a [`Contig`].
///
/// Implementations are read-only, so one source can be shared across the
/// threads of a [`crate::transform::ChunkRunner`].
pub trait WigSource: Send + Sync {
    /// Chromosome names in file order.
    fn chromosomes(&self) -> Vec<String>;

    fn includes(&self, chr: &str) -> bool {
        self.chromosomes().iter().any(|c| c == chr)
    }

    /// The chromosome's length as the source defines it.
    fn chr_length(&self, chr: &str) -> Result<u64, WigError>;

    /// The base-pair range holding data, or `None` if there is none.
    fn chr_extent(&self, chr: &str) -> Result<Option<GenomicInterval>, WigError>;

    /// Values for `start..=stop`; either order is accepted.
    fn query(&self, chr: &str, start: Position, stop: Position) -> Result<Contig, WigError>;

    /// Dense values for `start..=stop`, in Crick order when `start > stop`.
    fn values(
        &self,
        chr: &str,
        start: Position,
        stop: Position,
    ) -> Result<Vec<Option<f64>>, WigError> {
        let contig = self.query(chr, start, stop)?;
        let mut values: Vec<Option<f64>> = (start.min(stop)..=start.max(stop))
            .map(|bp| contig.get(bp))
            .collect();
        if start > stop {
            values.reverse();
        }
        Ok(values)
    }

    /// Windows of `chunk_size` bases covering the chromosome's extent.
    fn chunks(&self, chr: &str, chunk_size: u64) -> Result<Chunks, WigError> {
        Ok(match self.chr_extent(chr)? {
            Some(extent) => Chunks::new(extent.start, extent.stop, chunk_size),
            None => Chunks::empty(),
        })
    }
}

/// Parse one Wig value. `NaN` is the marker for a missing value.
pub(crate) fn parse_value(text: &str) -> Result<Option<f64>, WigError> {
    let value: f64 = text.trim().parse()?;
    Ok((!value.is_nan()).then_some(value))
}

pub(crate) fn parse_value_bytes(line: &[u8]) -> Result<Option<f64>, WigError> {
    let text = std::str::from_utf8(line)
        .map_err(|_| WigError::format("value line is not valid UTF-8"))?;
    parse_value(text)
}

/// Open a file as the matching source: `.bw`/`.bigwig` through the BigWig
/// tools, Bed/BedGraph (optionally gzipped) as a [`SpotArray`], anything
/// else as text Wig.
pub fn open_source(path: &Path, config: &WigConfig) -> Result<Box<dyn WigSource>, WigError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let stem = name.strip_suffix(".gz").unwrap_or(&name);

    if stem.ends_with(".bw") || stem.ends_with(".bigwig") {
        Ok(Box::new(BigWigFile::open_with_config(path, config.clone())?))
    } else if [".bed", ".bedgraph", ".bg"].iter().any(|ext| stem.ends_with(ext)) {
        Ok(Box::new(SpotArray::from_file(path)?))
    } else {
        Ok(Box::new(WigFile::open_with_config(path, config.clone())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_utils::{TestDir, TWO_CHROM_WIG};

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("3.5").unwrap(), Some(3.5));
        assert_eq!(parse_value(" -1 ").unwrap(), Some(-1.0));
        assert_eq!(parse_value("NaN").unwrap(), None);
        assert!(parse_value("").is_err());
        assert!(parse_value_bytes(b"x").is_err());
    }

    #[test]
    fn test_open_source_dispatch() {
        let test_dir = TestDir::new("open_source").expect("Failed to create test dir");
        let wig = test_dir
            .write_file("t.wig", TWO_CHROM_WIG)
            .expect("Failed to write wig");
        let bed = test_dir
            .write_file("t.bedGraph", "chrI\t0\t5\t1.0\n")
            .expect("Failed to write bedGraph");
        let config = WigConfig::default();

        let source = open_source(&wig, &config).unwrap();
        assert_eq!(source.chromosomes(), vec!["chrI", "chrII"]);

        let source = open_source(&bed, &config).unwrap();
        assert_eq!(source.chromosomes(), vec!["chrI"]);
        assert_eq!(source.values("chrI", 5, 4).unwrap(), vec![Some(1.0), Some(1.0)]);
    }

    #[test]
    fn test_default_values_fill_gaps() {
        let test_dir = TestDir::new("values_gaps").expect("Failed to create test dir");
        let wig = test_dir
            .write_file("gaps.wig", "fixedStep chrom=c start=1 step=1\nNaN\n2\nNaN\n")
            .expect("Failed to write wig");
        let source = open_source(&wig, &WigConfig::default()).unwrap();
        assert_eq!(source.values("c", 1, 3).unwrap(), vec![None, Some(2.0), None]);
        assert_eq!(source.values("c", 3, 1).unwrap(), vec![None, Some(2.0), None]);
    }
}
