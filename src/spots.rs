// spots.rs

use std::hash::BuildHasherDefault;
use std::io::Write;
use std::path::Path;

use csv::ReaderBuilder;
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHasher};
use tracing::{debug, info};

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::contig::Contig;
use crate::error::WigError;
use crate::interval::{GenomicCoordinates, GenomicInterval, Position};
use crate::io::InputStream;
use crate::records::{Spot, SpotFormat};
use crate::wig::header::{ContigHeader, TrackHeader};
use crate::wig::WigSource;

/// Items grouped by chromosome, in the order chromosomes were first seen.
#[derive(Debug, Clone)]
pub struct GenomicData<T> {
    data: IndexMap<String, Vec<T>, BuildHasherDefault<FxHasher>>,
}

impl<T> Default for GenomicData<T> {
    fn default() -> Self {
        Self {
            data: IndexMap::default(),
        }
    }
}

impl<T> GenomicData<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn includes(&self, chr: &str) -> bool {
        self.data.contains_key(chr)
    }

    pub fn chr(&self, chr: &str) -> Option<&[T]> {
        self.data.get(chr).map(Vec::as_slice)
    }

    pub fn chr_mut(&mut self, chr: &str) -> &mut Vec<T> {
        self.data.entry(chr.to_string()).or_default()
    }

    pub fn push(&mut self, chr: &str, item: T) {
        match self.data.get_mut(chr) {
            Some(items) => items.push(item),
            None => {
                self.data.insert(chr.to_string(), vec![item]);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[T])> {
        self.data.iter().map(|(chr, items)| (chr.as_str(), items.as_slice()))
    }

    /// Number of chromosomes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of items across all chromosomes.
    pub fn num_items(&self) -> usize {
        self.data.values().map(Vec::len).sum()
    }
}

/// Sparse per-locus values (probes, peaks, bedGraph rows) that answer
/// window queries by averaging every overlapping spot.
///
/// Spots on each chromosome are kept sorted by their low coordinate, and
/// the longest spot per chromosome is tracked, so a query only visits the
/// spots that can reach its window.
#[derive(Debug, Clone, Default)]
pub struct SpotArray {
    data: GenomicData<Spot>,
    max_length: FxHashMap<String, u64>,
}

fn spot_span(spot: &Spot) -> u64 {
    spot.high() - spot.low() + 1
}

impl SpotArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_spots<I>(spots: I) -> Self
    where
        I: IntoIterator<Item = (String, Spot)>,
    {
        let mut array = Self::new();
        for (chr, spot) in spots {
            array.data.push(&chr, spot);
        }
        array.reindex();
        array
    }

    /// Load a Bed or BedGraph file, picking the format from its name.
    pub fn from_file(path: &Path) -> Result<Self, WigError> {
        Self::load(path, SpotFormat::from_path(path))
    }

    pub fn load(path: &Path, format: SpotFormat) -> Result<Self, WigError> {
        let reader = InputStream::new(path).reader()?;
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .comment(Some(b'#'))
            .flexible(true)
            .quoting(false)
            .from_reader(reader);

        let mut array = Self::new();
        for result in csv_reader.records() {
            let record = result?;
            let first = record.get(0).unwrap_or("");
            if first.starts_with("track") || first.starts_with("browser") || record.len() == 1 {
                continue;
            }
            let (chr, spot) = format.parse_fields(record.iter())?;
            array.data.push(&chr, spot);
        }
        array.reindex();

        info!(
            "loaded {} spots on {} chromosomes from {}",
            array.num_spots(),
            array.data.len(),
            path.display()
        );
        Ok(array)
    }

    fn reindex(&mut self) {
        let chromosomes: Vec<String> = self.data.chromosomes().map(str::to_string).collect();
        for chr in chromosomes {
            let spots = self.data.chr_mut(&chr);
            spots.sort_by_key(|s| s.low());
            let longest = spots.iter().map(spot_span).max().unwrap_or(0);
            self.max_length.insert(chr, longest);
        }
    }

    /// Insert a spot, keeping its chromosome sorted.
    pub fn push(&mut self, chr: &str, spot: Spot) {
        let span = spot_span(&spot);
        let spots = self.data.chr_mut(chr);
        let at = spots.partition_point(|s| s.low() <= spot.low());
        spots.insert(at, spot);
        let longest = self.max_length.entry(chr.to_string()).or_insert(0);
        *longest = (*longest).max(span);
    }

    pub fn data(&self) -> &GenomicData<Spot> {
        &self.data
    }

    pub fn num_spots(&self) -> usize {
        self.data.num_items()
    }

    fn spot_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data
            .iter()
            .flat_map(|(_, spots)| spots.iter().filter_map(|s| s.value))
    }

    /// Sum of all spot values.
    pub fn total(&self) -> f64 {
        self.spot_values().sum()
    }

    pub fn mean(&self) -> Option<f64> {
        let n = self.spot_values().count();
        (n > 0).then(|| self.total() / n as f64)
    }

    /// Population standard deviation of the spot values.
    pub fn stdev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let n = self.spot_values().count() as f64;
        let squares: f64 = self.spot_values().map(|v| (v - mean).powi(2)).sum();
        Some((squares / n).sqrt())
    }

    fn spots(&self, chr: &str) -> Result<&[Spot], WigError> {
        self.data
            .chr(chr)
            .ok_or_else(|| WigError::UnknownChromosome(chr.to_string()))
    }

    /// Valued spots that overlap `[low, high]`.
    fn overlapping<'a>(
        &'a self,
        chr: &str,
        low: Position,
        high: Position,
    ) -> Result<impl Iterator<Item = &'a Spot> + 'a, WigError> {
        let spots = self.spots(chr)?;
        let longest = self.max_length.get(chr).copied().unwrap_or(0);
        let first = spots.partition_point(|s| s.low() + longest <= low);
        let last = spots.partition_point(|s| s.low() <= high);
        Ok(spots[first..last.max(first)]
            .iter()
            .filter(move |s| s.is_valid() && s.value.is_some() && s.overlaps(low, high)))
    }

    /// Per-base average of all spots overlapping `start..=stop`. Bases no
    /// spot covers have no value.
    pub fn query(&self, chr: &str, start: Position, stop: Position) -> Result<Contig, WigError> {
        let low = start.min(stop);
        let high = start.max(stop);
        if low == 0 {
            return Err(WigError::range("coordinates are 1-based"));
        }

        let width = (high - low + 1) as usize;
        let mut total = vec![0.0f64; width];
        let mut count = vec![0u32; width];
        let mut visited = 0usize;
        for spot in self.overlapping(chr, low, high)? {
            let value = spot.value.unwrap_or_default();
            for bp in spot.low().max(low)..=spot.high().min(high) {
                let i = (bp - low) as usize;
                total[i] += value;
                count[i] += 1;
            }
            visited += 1;
        }
        debug!("{}:{}-{} averaged {} spots", chr, low, high, visited);

        Ok(Contig::from_dense(
            chr,
            low,
            total
                .into_iter()
                .zip(count)
                .map(|(t, n)| (n > 0).then(|| t / n as f64)),
        ))
    }

    /// The value at one base: the covering spot's value, the median when
    /// several spots cover it, otherwise nothing.
    pub fn value(&self, chr: &str, base: Position) -> Result<Option<f64>, WigError> {
        let mut values: Vec<f64> = self
            .overlapping(chr, base, base)?
            .filter_map(|s| s.value)
            .collect();
        values.sort_by(f64::total_cmp);

        let n = values.len();
        Ok(match n {
            0 => None,
            _ if n % 2 == 1 => Some(values[n / 2]),
            _ => Some((values[n / 2 - 1] + values[n / 2]) / 2.0),
        })
    }

    /// Last base covered by any spot.
    pub fn chr_length(&self, chr: &str) -> Result<u64, WigError> {
        Ok(self.spots(chr)?.iter().map(|s| s.high()).max().unwrap_or(0))
    }

    pub fn chr_extent(&self, chr: &str) -> Result<Option<GenomicInterval>, WigError> {
        let spots = self.spots(chr)?;
        let (Some(first), Some(high)) = (spots.first(), spots.iter().map(|s| s.high()).max())
        else {
            return Ok(None);
        };
        Ok(Some(GenomicInterval::new(first.low(), high)))
    }

    /// Write the averaged values as fixedStep Wig, one block per
    /// chromosome. With `chrom_sizes`, each block covers the whole
    /// chromosome and spots beyond its end are dropped.
    pub fn write_wig<W: Write>(
        &self,
        writer: &mut W,
        track: &TrackHeader,
        chrom_sizes: Option<&IndexMap<String, u64>>,
    ) -> Result<(), WigError> {
        writeln!(writer, "{}", track)?;
        for chr in self.data.chromosomes() {
            let Some(extent) = self.chr_extent(chr)? else {
                continue;
            };
            let (first, last) = match chrom_sizes.and_then(|sizes| sizes.get(chr)) {
                Some(&size) => (1, size),
                None => (extent.start, extent.stop),
            };
            if first > last {
                continue;
            }

            writeln!(writer, "{}", ContigHeader::fixed(chr, first, 1, 1))?;
            let mut chunk_low = first;
            while chunk_low <= last {
                let chunk_high = last.min(chunk_low + DEFAULT_CHUNK_SIZE - 1);
                let contig = self.query(chr, chunk_low, chunk_high)?;
                for bp in chunk_low..=chunk_high {
                    match contig.get(bp) {
                        Some(value) => writeln!(writer, "{}", value)?,
                        None => writeln!(writer, "NaN")?,
                    }
                }
                chunk_low = chunk_high + 1;
            }
        }
        Ok(())
    }
}

impl WigSource for SpotArray {
    fn chromosomes(&self) -> Vec<String> {
        self.data.chromosomes().map(str::to_string).collect()
    }

    fn includes(&self, chr: &str) -> bool {
        self.data.includes(chr)
    }

    fn chr_length(&self, chr: &str) -> Result<u64, WigError> {
        SpotArray::chr_length(self, chr)
    }

    fn chr_extent(&self, chr: &str) -> Result<Option<GenomicInterval>, WigError> {
        SpotArray::chr_extent(self, chr)
    }

    fn query(&self, chr: &str, start: Position, stop: Position) -> Result<Contig, WigError> {
        SpotArray::query(self, chr, start, stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_utils::TestDir;

    fn spot(start: Position, stop: Position, value: f64) -> Spot {
        Spot::new(start, stop, Some(value))
    }

    #[test]
    fn test_genomic_data_order() {
        let mut data = GenomicData::new();
        data.push("chr2", 1);
        data.push("chr1", 2);
        data.push("chr2", 3);
        assert_eq!(data.chromosomes().collect::<Vec<_>>(), vec!["chr2", "chr1"]);
        assert_eq!(data.chr("chr2"), Some(&[1, 3][..]));
        assert_eq!(data.len(), 2);
        assert_eq!(data.num_items(), 3);
        assert!(data.chr("chrX").is_none());
    }

    #[test]
    fn test_overlapping_spots_average() {
        let array = SpotArray::from_spots(vec![
            ("chr1".to_string(), spot(10, 20, 2.0)),
            ("chr1".to_string(), spot(15, 25, 4.0)),
        ]);
        let contig = array.query("chr1", 1, 30).unwrap();
        for bp in 15..=20 {
            assert_eq!(contig.get(bp), Some(3.0));
        }
        assert_eq!(contig.get(12), Some(2.0));
        assert_eq!(contig.get(22), Some(4.0));
        assert_eq!(contig.get(5), None);
        assert_eq!(contig.get(26), None);
    }

    #[test]
    fn test_unsorted_and_crick_spots() {
        let array = SpotArray::from_spots(vec![
            ("chr1".to_string(), spot(500, 400, 1.0)),
            ("chr1".to_string(), spot(1, 1000, 5.0)),
            ("chr1".to_string(), spot(450, 460, 3.0)),
        ]);
        let contig = array.query("chr1", 455, 455).unwrap();
        assert_eq!(contig.get(455), Some(3.0));
        let contig = array.query("chr1", 999, 990).unwrap();
        assert_eq!(contig.get(995), Some(5.0));
    }

    #[test]
    fn test_push_keeps_queries_correct() {
        let mut array = SpotArray::new();
        array.push("chr1", spot(100, 200, 1.0));
        array.push("chr1", spot(1, 5000, 3.0));
        array.push("chr1", spot(50, 60, 8.0));
        assert_eq!(array.query("chr1", 150, 150).unwrap().get(150), Some(2.0));
        assert_eq!(array.query("chr1", 4000, 4000).unwrap().get(4000), Some(3.0));
        assert_eq!(array.num_spots(), 3);
    }

    #[test]
    fn test_value_single_and_median() {
        let array = SpotArray::from_spots(vec![
            ("chr1".to_string(), spot(1, 10, 1.0)),
            ("chr1".to_string(), spot(5, 10, 9.0)),
            ("chr1".to_string(), spot(5, 6, 4.0)),
            ("chr1".to_string(), spot(8, 10, 2.0)),
        ]);
        assert_eq!(array.value("chr1", 2).unwrap(), Some(1.0));
        assert_eq!(array.value("chr1", 5).unwrap(), Some(4.0));
        assert_eq!(array.value("chr1", 7).unwrap(), Some(5.0));
        assert_eq!(array.value("chr1", 9).unwrap(), Some(2.0));
        assert_eq!(array.value("chr1", 11).unwrap(), None);
        assert!(array.value("chrX", 1).is_err());
    }

    #[test]
    fn test_summary_statistics() {
        let array = SpotArray::from_spots(vec![
            ("chr1".to_string(), spot(1, 2, 2.0)),
            ("chr2".to_string(), spot(1, 2, 4.0)),
            ("chr2".to_string(), Spot::new(5, 6, None)),
        ]);
        assert_eq!(array.num_spots(), 3);
        assert_eq!(array.total(), 6.0);
        assert_eq!(array.mean(), Some(3.0));
        assert_eq!(array.stdev(), Some(1.0));
        assert_eq!(SpotArray::new().stdev(), None);
    }

    #[test]
    fn test_extent_and_length() {
        let array = SpotArray::from_spots(vec![
            ("chr1".to_string(), spot(30, 40, 1.0)),
            ("chr1".to_string(), spot(5, 10, 1.0)),
        ]);
        assert_eq!(array.chr_length("chr1").unwrap(), 40);
        assert_eq!(
            array.chr_extent("chr1").unwrap(),
            Some(GenomicInterval::new(5, 40))
        );
    }

    #[test]
    fn test_load_bedgraph_gz_and_bed() {
        let test_dir = TestDir::new("spots_load").expect("Failed to create test dir");
        let bedgraph = test_dir
            .write_file(
                "s.bedGraph",
                "track type=bedGraph name=\"x y\"\n#comment\nchr1\t9\t20\t2\nchr1\t14\t25\t4\n",
            )
            .expect("Failed to write bedGraph");
        let array = SpotArray::from_file(&bedgraph).unwrap();
        assert_eq!(array.num_spots(), 2);
        assert_eq!(array.query("chr1", 15, 15).unwrap().get(15), Some(3.0));

        let bed = test_dir
            .write_file("s.bed", "chr2\t0\t10\tp1\t7\t-\nchr2\t10\t20\tp2\t.\t+\n")
            .expect("Failed to write bed");
        let array = SpotArray::from_file(&bed).unwrap();
        let spots = array.data().chr("chr2").unwrap();
        assert!(spots[0].is_crick());
        assert_eq!(spots[1].value, None);
        assert_eq!(array.value("chr2", 5).unwrap(), Some(7.0));
    }

    #[test]
    fn test_write_wig() {
        let array = SpotArray::from_spots(vec![
            ("chr1".to_string(), spot(2, 3, 1.0)),
            ("chr1".to_string(), spot(5, 5, 2.0)),
        ]);
        let track = TrackHeader::default().with_name("spots");

        let mut out = Vec::new();
        array.write_wig(&mut out, &track, None).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "fixedStep chrom=chr1 start=2 step=1 span=1");
        assert_eq!(&lines[2..], ["1", "1", "NaN", "2"]);

        let mut sizes = IndexMap::new();
        sizes.insert("chr1".to_string(), 4);
        let mut out = Vec::new();
        array.write_wig(&mut out, &track, Some(&sizes)).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "fixedStep chrom=chr1 start=1 step=1 span=1");
        assert_eq!(&lines[2..], ["NaN", "1", "1", "NaN"]);
    }
}
