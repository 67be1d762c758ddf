// file.rs

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::{debug, info, warn};

use super::header::{ContigHeader, StepType, TrackHeader};
use super::index::WigIndex;
use super::{parse_value_bytes, WigSource};
use crate::chromosome::Chromosome;
use crate::config::WigConfig;
use crate::contig::Contig;
use crate::error::WigError;
use crate::interval::{GenomicInterval, Position};

/// A text Wig file, memory-mapped and indexed by chromosome and line.
///
/// Opening scans the file once (or loads a fresh `.widx` sidecar). Queries
/// then read only the lines they need.
pub struct WigFile {
    path: PathBuf,
    mmap: Mmap,
    index: WigIndex,
}

impl WigFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WigError> {
        Self::open_with_config(path, WigConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: WigConfig) -> Result<Self, WigError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        if file.metadata()?.len() == 0 {
            return Err(WigError::format(format!("{} is empty", path.display())));
        }
        let mmap = unsafe { Mmap::map(&file)? };

        let cached = if config.use_index_cache {
            WigIndex::read_cache(&path)?
        } else {
            None
        };
        let index = match cached {
            Some(index) => {
                debug!("loaded index cache for {}", path.display());
                index
            }
            None => {
                let index = WigIndex::build(&mmap, config.line_index_shift)?;
                if config.use_index_cache {
                    if let Err(e) = index.write_cache(&path, config.index_level) {
                        warn!("could not write index cache for {}: {}", path.display(), e);
                    }
                }
                index
            }
        };

        info!(
            "opened {} ({} chromosomes, {} lines)",
            path.display(),
            index.chroms.len(),
            index.num_lines()
        );
        Ok(Self { path, mmap, index })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn track(&self) -> &TrackHeader {
        &self.index.track
    }

    pub fn index(&self) -> &WigIndex {
        &self.index
    }

    /// Write the `.widx` sidecar for this file.
    pub fn write_index(&self, level: i32) -> Result<PathBuf, WigError> {
        self.index.write_cache(&self.path, level)
    }

    pub fn header(&self, chr: &str) -> Result<&ContigHeader, WigError> {
        Ok(&self.index.entry(chr)?.header)
    }

    /// Line of the chromosome's header.
    pub fn chr_start(&self, chr: &str) -> Result<u64, WigError> {
        self.index.chr_start(chr)
    }

    /// Last line belonging to the chromosome.
    pub fn chr_stop(&self, chr: &str) -> Result<u64, WigError> {
        self.index.chr_stop(chr)
    }

    /// Data lines (values) in the chromosome's block.
    pub fn chr_length(&self, chr: &str) -> Result<u64, WigError> {
        self.index.data_lines(chr)
    }

    /// Base pairs spanned by the chromosome's stored points.
    pub fn chr_extent(&self, chr: &str) -> Result<Option<GenomicInterval>, WigError> {
        let header = self.header(chr)?;
        let n = self.chr_length(chr)?;
        if n == 0 {
            return Ok(None);
        }

        match header.step_type {
            StepType::Fixed => Ok(Some(GenomicInterval::new(
                header.start,
                header.start + (n - 1) * header.step,
            ))),
            StepType::Variable => {
                let first = self.chr_start(chr)? + 1;
                let last = self.chr_stop(chr)?;
                let mut positions = self
                    .index
                    .lines
                    .lines(&self.mmap, first, last)?
                    .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
                    .map(variable_step_position);
                let Some(low) = positions.next().transpose()? else {
                    return Ok(None);
                };
                let high = positions.last().transpose()?.unwrap_or(low);
                Ok(Some(GenomicInterval::new(low, high)))
            }
        }
    }

    /// Read `start..=stop` straight from the file's lines.
    ///
    /// Only fixedStep chromosomes with step 1 can be addressed this way.
    pub fn query(&self, chr: &str, start: Position, stop: Position) -> Result<Contig, WigError> {
        let entry = self.index.entry(chr)?;
        let header = &entry.header;
        if header.step_type != StepType::Fixed {
            return Err(WigError::range(format!(
                "random queries need fixedStep data, {} is variableStep",
                chr
            )));
        }
        if header.step != 1 {
            return Err(WigError::range(format!(
                "random queries need step=1, {} has step={}",
                chr, header.step
            )));
        }

        let low = start.min(stop);
        let high = start.max(stop);
        let n = self.chr_length(chr)?;
        if n == 0 || low < header.start || high > header.start + n - 1 {
            return Err(WigError::range(format!(
                "{}:{}-{} outside indexed extent {}-{}",
                chr,
                low,
                high,
                header.start,
                (header.start + n).saturating_sub(1)
            )));
        }

        let first = entry.start_line + 1 + (low - header.start) / header.step;
        let last = first + (high - low);
        debug!("{}:{}-{} -> lines {}..={}", chr, low, high, first, last);

        let mut contig = Contig::new(chr);
        for (i, line) in self.index.lines.lines(&self.mmap, first, last)?.enumerate() {
            if let Some(value) = parse_value_bytes(line)? {
                contig.set(low + i as u64, value);
            }
        }
        Ok(contig)
    }

    /// Parse a whole chromosome block into memory.
    pub fn load_chromosome(&self, chr: &str) -> Result<Chromosome, WigError> {
        let first = self.chr_start(chr)?;
        let last = self.chr_stop(chr)?;
        let begin = self.index.lines.line_offset(&self.mmap, first)?;
        let end = if last < self.index.num_lines() {
            self.index.lines.line_offset(&self.mmap, last + 1)?
        } else {
            self.mmap.len()
        };

        let text = std::str::from_utf8(&self.mmap[begin..end])
            .map_err(|_| WigError::format(format!("{} block is not valid UTF-8", chr)))?;
        Chromosome::parse(text.lines())
    }
}

fn variable_step_position(line: &[u8]) -> Result<Position, WigError> {
    let text = std::str::from_utf8(line)
        .map_err(|_| WigError::format("variableStep line is not valid UTF-8"))?;
    let field = text
        .split_whitespace()
        .next()
        .ok_or_else(|| WigError::format("empty variableStep line"))?;
    Ok(field.parse()?)
}

impl WigSource for WigFile {
    fn chromosomes(&self) -> Vec<String> {
        self.index.chroms.keys().cloned().collect()
    }

    fn includes(&self, chr: &str) -> bool {
        self.index.chroms.contains_key(chr)
    }

    fn chr_length(&self, chr: &str) -> Result<u64, WigError> {
        WigFile::chr_length(self, chr)
    }

    fn chr_extent(&self, chr: &str) -> Result<Option<GenomicInterval>, WigError> {
        WigFile::chr_extent(self, chr)
    }

    fn query(&self, chr: &str, start: Position, stop: Position) -> Result<Contig, WigError> {
        WigFile::query(self, chr, start, stop)
    }
}

impl fmt::Display for WigFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Wig file: {}", self.path.display())?;
        writeln!(f, "{}", self.index.track)?;
        writeln!(f, "Chromosomes:")?;
        for (chr, entry) in &self.index.chroms {
            let stop = self.index.chr_stop(chr).unwrap_or(entry.start_line);
            writeln!(f, "\t{}: lines {}-{} ({})", chr, entry.start_line, stop, entry.header)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_utils::{TestDir, TWO_CHROM_WIG};

    fn open_two_chrom(name: &str) -> (TestDir, WigFile) {
        let test_dir = TestDir::new(name).expect("Failed to create test dir");
        let path = test_dir
            .write_file("test.wig", TWO_CHROM_WIG)
            .expect("Failed to write wig");
        let config = WigConfig::default().line_index_shift(2);
        let wig = WigFile::open_with_config(&path, config).expect("Failed to open wig");
        (test_dir, wig)
    }

    #[test]
    fn test_chr_lines() {
        let (_dir, wig) = open_two_chrom("wig_lines");
        assert_eq!(wig.chr_start("chrI").unwrap(), 2);
        assert_eq!(wig.chr_stop("chrI").unwrap(), 11);
        assert_eq!(wig.chr_stop("chrII").unwrap(), 20);
        assert_eq!(wig.chr_length("chrI").unwrap(), 9);
        assert_eq!(
            wig.chr_extent("chrII").unwrap(),
            Some(GenomicInterval::new(1, 8))
        );
        assert_eq!(wig.track().name(), Some("test"));
    }

    #[test]
    fn test_query_watson_and_crick() {
        let (_dir, wig) = open_two_chrom("wig_query");
        let contig = wig.query("chrI", 3, 6).unwrap();
        assert_eq!(contig.coverage(), 4);
        assert_eq!(
            contig.bases(3, 6).unwrap(),
            vec![Some(4.0), Some(9.0), Some(0.0), Some(6.0)]
        );

        let watson = WigSource::values(&wig, "chrII", 2, 5).unwrap();
        let crick = WigSource::values(&wig, "chrII", 5, 2).unwrap();
        assert_eq!(watson.len(), 4);
        assert_eq!(crick, watson.into_iter().rev().collect::<Vec<_>>());
    }

    #[test]
    fn test_query_bounds() {
        let (_dir, wig) = open_two_chrom("wig_bounds");
        assert!(wig.query("chrI", 1, 9).is_ok());
        assert!(matches!(wig.query("chrI", 9, 10), Err(WigError::Range(_))));
        assert!(matches!(wig.query("chrI", 0, 3), Err(WigError::Range(_))));
        assert!(matches!(
            wig.query("chrZ", 1, 2),
            Err(WigError::UnknownChromosome(_))
        ));
    }

    #[test]
    fn test_query_rejects_variable_and_stepped() {
        let test_dir = TestDir::new("wig_reject").expect("Failed to create test dir");
        let text = "variableStep chrom=chrA\n5\t1\n9\t2\nfixedStep chrom=chrB start=1 step=5\n1\n2\n";
        let path = test_dir.write_file("mixed.wig", text).expect("Failed to write wig");
        let wig = WigFile::open(&path).unwrap();

        assert!(matches!(wig.query("chrA", 5, 6), Err(WigError::Range(_))));
        assert!(matches!(wig.query("chrB", 1, 1), Err(WigError::Range(_))));
        assert_eq!(
            wig.chr_extent("chrA").unwrap(),
            Some(GenomicInterval::new(5, 9))
        );
        assert_eq!(
            wig.chr_extent("chrB").unwrap(),
            Some(GenomicInterval::new(1, 6))
        );

        let chr_a = wig.load_chromosome("chrA").unwrap();
        assert_eq!(chr_a.start, 5);
        assert_eq!(chr_a.values(), &[1.0, 1.0, 1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_load_chromosome() {
        let (_dir, wig) = open_two_chrom("wig_load");
        let chr_i = wig.load_chromosome("chrI").unwrap();
        assert_eq!(chr_i.len(), 9);
        assert_eq!(chr_i.get(7), Some(44.0));
        let chr_ii = wig.load_chromosome("chrII").unwrap();
        assert_eq!(chr_ii.len(), 8);
        assert_eq!(chr_ii.stop(), 8);
    }

    #[test]
    fn test_open_errors() {
        let test_dir = TestDir::new("wig_open_errors").expect("Failed to create test dir");
        let empty = test_dir.write_file("empty.wig", "").unwrap();
        assert!(matches!(WigFile::open(&empty), Err(WigError::Format(_))));

        let headerless = test_dir.write_file("values.wig", "1\n2\n3\n").unwrap();
        assert!(matches!(WigFile::open(&headerless), Err(WigError::Format(_))));

        assert!(matches!(
            WigFile::open(test_dir.path().join("missing.wig")),
            Err(WigError::IOError(_))
        ));
    }

    #[test]
    fn test_index_cache_is_used() {
        let test_dir = TestDir::new("wig_cache").expect("Failed to create test dir");
        let path = test_dir.write_file("c.wig", TWO_CHROM_WIG).unwrap();
        let config = WigConfig::default().use_index_cache(true);

        let first = WigFile::open_with_config(&path, config.clone()).unwrap();
        assert!(WigIndex::sidecar_path(&path).exists());
        let second = WigFile::open_with_config(&path, config).unwrap();
        assert_eq!(first.index(), second.index());
        assert_eq!(second.query("chrII", 8, 8).unwrap().get(8), Some(8.0));
    }

    #[test]
    fn test_display_summary() {
        let (_dir, wig) = open_two_chrom("wig_display");
        let summary = wig.to_string();
        assert!(summary.contains("chrI: lines 2-11"));
        assert!(summary.contains("chrII: lines 12-20"));
    }
}
