// index.rs

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::header::{ContigHeader, TrackHeader};
use super::lines::LineIndex;
use crate::error::WigError;

/// Extension of the persisted index written next to a Wig file.
pub const INDEX_EXTENSION: &str = "widx";

/// Where one chromosome's block starts in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromEntry {
    pub header: ContigHeader,
    /// 1-based line number of the fixedStep/variableStep line.
    pub start_line: u64,
    /// Last non-blank line of the block; the header line when it has no data.
    pub stop_line: u64,
    /// Byte offset of that line.
    pub byte_offset: u64,
}

/// The chromosome and line index of a text Wig file.
///
/// Entries are kept in file order, so the block following a chromosome is
/// always the next entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WigIndex {
    pub track: TrackHeader,
    pub chroms: IndexMap<String, ChromEntry>,
    pub lines: LineIndex,
}

#[derive(Serialize, Deserialize)]
struct CachedIndex {
    file_len: u64,
    mtime: u64,
    index: WigIndex,
}

impl WigIndex {
    /// Scan `data` once, recording every chromosome header line and a
    /// line checkpoint table.
    pub fn build(data: &[u8], shift: u32) -> Result<Self, WigError> {
        let mut track = None;
        let mut chroms: IndexMap<String, ChromEntry> = IndexMap::new();

        let lines = LineIndex::scan(data, shift, |number, offset, line| {
            if number == 1 {
                let first = String::from_utf8_lossy(line);
                track = Some(TrackHeader::from_first_line(Some(&first)));
            }
            if !ContigHeader::is_header_line(line) {
                // Blank lines never extend a block.
                if !line.iter().all(u8::is_ascii_whitespace) {
                    if let Some((_, entry)) = chroms.last_mut() {
                        entry.stop_line = number;
                    }
                }
                return Ok(());
            }

            let text = std::str::from_utf8(line).map_err(|_| {
                WigError::format(format!("line {} is not valid UTF-8", number))
            })?;
            let header = ContigHeader::parse(text)?;
            debug!("found {} at line {}", header, number);

            if let Some(previous) = chroms.get(&header.chrom) {
                return Err(WigError::format(format!(
                    "chromosome {} appears twice (lines {} and {})",
                    header.chrom, previous.start_line, number
                )));
            }
            chroms.insert(
                header.chrom.clone(),
                ChromEntry {
                    header,
                    start_line: number,
                    stop_line: number,
                    byte_offset: offset as u64,
                },
            );
            Ok(())
        })?;

        if chroms.is_empty() {
            return Err(WigError::format("no fixedStep or variableStep headers found"));
        }
        chroms.sort_by(|_, a, _, b| a.start_line.cmp(&b.start_line));

        Ok(Self {
            track: track.unwrap_or_default(),
            chroms,
            lines,
        })
    }

    pub fn entry(&self, chr: &str) -> Result<&ChromEntry, WigError> {
        self.chroms
            .get(chr)
            .ok_or_else(|| WigError::UnknownChromosome(chr.to_string()))
    }

    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.chroms.keys().map(String::as_str)
    }

    pub fn num_lines(&self) -> u64 {
        self.lines.num_lines()
    }

    /// Line of the chromosome's header.
    pub fn chr_start(&self, chr: &str) -> Result<u64, WigError> {
        Ok(self.entry(chr)?.start_line)
    }

    /// Last non-blank line of the chromosome's block. Blank lines before
    /// the next header or at the end of the file belong to no block.
    pub fn chr_stop(&self, chr: &str) -> Result<u64, WigError> {
        Ok(self.entry(chr)?.stop_line)
    }

    /// Number of data lines in the chromosome's block.
    pub fn data_lines(&self, chr: &str) -> Result<u64, WigError> {
        Ok(self.chr_stop(chr)? - self.chr_start(chr)?)
    }

    pub fn sidecar_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".");
        name.push(INDEX_EXTENSION);
        PathBuf::from(name)
    }

    /// Persist to the sidecar as zstd-compressed bincode, stamped with the
    /// Wig file's size and modification time.
    pub fn write_cache(&self, wig_path: &Path, level: i32) -> Result<PathBuf, WigError> {
        let (file_len, mtime) = file_stamp(wig_path)?;
        let sidecar = Self::sidecar_path(wig_path);
        let file = BufWriter::new(File::create(&sidecar)?);
        let mut encoder = zstd::Encoder::new(file, level)?;
        bincode::serialize_into(
            &mut encoder,
            &CachedIndex {
                file_len,
                mtime,
                index: self.clone(),
            },
        )?;
        encoder.finish()?.flush()?;
        debug!("wrote index cache {}", sidecar.display());
        Ok(sidecar)
    }

    /// Load the sidecar if it exists and still matches the Wig file.
    pub fn read_cache(wig_path: &Path) -> Result<Option<Self>, WigError> {
        let sidecar = Self::sidecar_path(wig_path);
        if !sidecar.exists() {
            return Ok(None);
        }

        let (file_len, mtime) = file_stamp(wig_path)?;
        let decoder = zstd::Decoder::new(File::open(&sidecar)?)?;
        let cached: CachedIndex = match bincode::deserialize_from(decoder) {
            Ok(cached) => cached,
            Err(e) => {
                warn!("ignoring unreadable index cache {}: {}", sidecar.display(), e);
                return Ok(None);
            }
        };

        if cached.file_len != file_len || cached.mtime != mtime {
            warn!("index cache {} is stale, rebuilding", sidecar.display());
            return Ok(None);
        }
        Ok(Some(cached.index))
    }
}

fn file_stamp(path: &Path) -> Result<(u64, u64), WigError> {
    let metadata = fs::metadata(path)?;
    let mtime = metadata
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Ok((metadata.len(), mtime))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_utils::{TestDir, TWO_CHROM_WIG};

    #[test]
    fn test_index_two_chromosomes() {
        let index = WigIndex::build(TWO_CHROM_WIG.as_bytes(), 2).unwrap();
        assert_eq!(index.chromosomes().collect::<Vec<_>>(), vec!["chrI", "chrII"]);
        assert_eq!(index.num_lines(), 20);
        assert_eq!(index.chr_start("chrI").unwrap(), 2);
        assert_eq!(index.chr_stop("chrI").unwrap(), 11);
        assert_eq!(index.chr_start("chrII").unwrap(), 12);
        assert_eq!(index.chr_stop("chrII").unwrap(), 20);
        assert_eq!(index.data_lines("chrI").unwrap(), 9);
        assert_eq!(index.data_lines("chrII").unwrap(), 8);
        assert_eq!(index.track.name(), Some("test"));
    }

    #[test]
    fn test_byte_offsets_point_at_headers() {
        let data = TWO_CHROM_WIG.as_bytes();
        let index = WigIndex::build(data, 2).unwrap();
        for entry in index.chroms.values() {
            let offset = entry.byte_offset as usize;
            assert!(ContigHeader::is_header_line(&data[offset..]));
            assert_eq!(index.lines.line_offset(data, entry.start_line).unwrap(), offset);
        }
    }

    #[test]
    fn test_trailing_blank_lines_ignored() {
        let text = format!("{}\n\n", TWO_CHROM_WIG);
        let index = WigIndex::build(text.as_bytes(), 2).unwrap();
        assert_eq!(index.num_lines(), 22);
        assert_eq!(index.chr_stop("chrII").unwrap(), 20);
    }

    #[test]
    fn test_blank_line_between_blocks() {
        let text = "fixedStep chrom=chrA start=1 step=1\n1\n2\n3\n\nfixedStep chrom=chrB start=1 step=1\n4\n \n";
        let index = WigIndex::build(text.as_bytes(), 2).unwrap();
        assert_eq!(index.chr_start("chrA").unwrap(), 1);
        assert_eq!(index.chr_stop("chrA").unwrap(), 4);
        assert_eq!(index.data_lines("chrA").unwrap(), 3);
        assert_eq!(index.chr_start("chrB").unwrap(), 6);
        assert_eq!(index.chr_stop("chrB").unwrap(), 7);
        assert_eq!(index.data_lines("chrB").unwrap(), 1);
    }

    #[test]
    fn test_header_without_data() {
        let text = "fixedStep chrom=chrA start=1 step=1\n\nfixedStep chrom=chrB start=1 step=1\n4\n";
        let index = WigIndex::build(text.as_bytes(), 2).unwrap();
        assert_eq!(index.chr_stop("chrA").unwrap(), 1);
        assert_eq!(index.data_lines("chrA").unwrap(), 0);
    }

    #[test]
    fn test_index_errors() {
        assert!(matches!(
            WigIndex::build(b"track type=wiggle_0\n1\n2\n", 2),
            Err(WigError::Format(_))
        ));
        let duplicate = "fixedStep chrom=chr1 start=1\n1\nfixedStep chrom=chr1 start=5\n2\n";
        assert!(matches!(
            WigIndex::build(duplicate.as_bytes(), 2),
            Err(WigError::Format(_))
        ));
        let index = WigIndex::build(TWO_CHROM_WIG.as_bytes(), 2).unwrap();
        assert!(matches!(
            index.chr_stop("chrZ"),
            Err(WigError::UnknownChromosome(_))
        ));
    }

    #[test]
    fn test_missing_track_header_uses_default() {
        let index = WigIndex::build(b"variableStep chrom=chrM\n5\t1.0\n", 2).unwrap();
        assert_eq!(index.track, TrackHeader::default());
        assert_eq!(index.chr_stop("chrM").unwrap(), 2);
    }

    #[test]
    fn test_cache_round_trip_and_staleness() {
        let test_dir = TestDir::new("index_cache").expect("Failed to create test dir");
        let path = test_dir
            .write_file("test.wig", TWO_CHROM_WIG)
            .expect("Failed to write wig");

        let index = WigIndex::build(TWO_CHROM_WIG.as_bytes(), 2).unwrap();
        let sidecar = index.write_cache(&path, 3).expect("Failed to write cache");
        assert_eq!(sidecar, test_dir.path().join("test.wig.widx"));

        let cached = WigIndex::read_cache(&path).unwrap().expect("cache should be fresh");
        assert_eq!(cached, index);

        // Same mtime second, different size.
        std::fs::write(&path, format!("{}1\n", TWO_CHROM_WIG)).unwrap();
        assert!(WigIndex::read_cache(&path).unwrap().is_none());
    }
}
