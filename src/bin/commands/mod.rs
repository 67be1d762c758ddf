// bin/commands/mod.rs

pub mod index;
pub mod query;
#[cfg(feature = "dev")]
pub mod random_wig;
pub mod scale;
pub mod spots_to_wig;
pub mod stats;

use csv::ReaderBuilder;
use indexmap::IndexMap;
use std::path::Path;
use wigindex::error::WigError;
use wigindex::io::InputStream;
use wigindex::wig::index::WigIndex;
use wigindex::WigConfig;

/// Parse `seqname:start-end` with 1-based inclusive coordinates (like
/// tabix's region argument). `start > end` asks for the Crick strand.
pub fn parse_region(region: &str) -> Result<(&str, u64, u64), WigError> {
    let (seqname, coords) = region
        .rsplit_once(':')
        .ok_or("Invalid region format. Expected seqname:start-end.")?;
    let (start, end) = coords
        .split_once('-')
        .ok_or("Invalid region format. Expected start-end.")?;

    let start: u64 = start
        .replace(',', "")
        .parse()
        .map_err(|_| "Invalid start coordinate.")?;
    let end: u64 = end
        .replace(',', "")
        .parse()
        .map_err(|_| "Invalid end coordinate.")?;
    if start == 0 || end == 0 {
        return Err("Coordinates are 1-based and must be greater than 0.".into());
    }

    Ok((seqname, start, end))
}

/// Read a two-column `chrom<TAB>size` file.
pub fn read_chrom_sizes(path: &Path) -> Result<IndexMap<String, u64>, WigError> {
    let reader = InputStream::new(path).reader()?;
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(reader);

    let mut sizes = IndexMap::new();
    for result in csv_reader.records() {
        let record = result?;
        let chrom = record.get(0).ok_or("Missing chrom")?;
        let size: u64 = record.get(1).ok_or("Missing size")?.trim().parse()?;
        sizes.insert(chrom.to_string(), size);
    }
    Ok(sizes)
}

/// Environment configuration with command-line overrides. The index cache
/// is switched on when `input` already has a sidecar from `wigidx index`.
pub fn config(input: &Path, threads: Option<usize>, chunk_size: Option<u64>) -> WigConfig {
    let mut config = WigConfig::from_env();
    if WigIndex::sidecar_path(input).exists() {
        config = config.use_index_cache(true);
    }
    if let Some(threads) = threads {
        config = config.threads(threads);
    }
    if let Some(chunk_size) = chunk_size {
        config = config.chunk_size(chunk_size);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_region() {
        assert_eq!(parse_region("chrI:3-6").unwrap(), ("chrI", 3, 6));
        assert_eq!(parse_region("chrI:6-3").unwrap(), ("chrI", 6, 3));
        assert_eq!(
            parse_region("HLA-A:1,000-2,000").unwrap(),
            ("HLA-A", 1000, 2000)
        );
        assert!(parse_region("chrI").is_err());
        assert!(parse_region("chrI:5").is_err());
        assert!(parse_region("chrI:0-5").is_err());
        assert!(parse_region("chrI:a-5").is_err());
    }

    #[test]
    fn test_config_reads_existing_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.wig");
        std::fs::write(&path, "fixedStep chrom=chr1 start=1 step=1\n1\n2\n").unwrap();
        assert!(!WigIndex::sidecar_path(&path).exists());

        let wig = wigindex::WigFile::open(&path).unwrap();
        wig.write_index(3).unwrap();
        let config = config(&path, Some(1), None);
        assert!(config.use_index_cache);

        let reopened = wigindex::WigFile::open_with_config(&path, config).unwrap();
        assert_eq!(reopened.index(), wig.index());
        assert_eq!(reopened.chr_length("chr1").unwrap(), 2);
    }

    #[test]
    fn test_read_chrom_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genome.sizes");
        std::fs::write(&path, "chrI\t230218\nchrII\t813184\n").unwrap();
        let sizes = read_chrom_sizes(&path).unwrap();
        assert_eq!(sizes.get("chrII"), Some(&813184));
        assert_eq!(sizes.keys().next().map(String::as_str), Some("chrI"));
    }
}
