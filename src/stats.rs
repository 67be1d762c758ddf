// src/stats.rs

use serde::{Deserialize, Serialize};

use crate::contig::Contig;
use crate::error::WigError;
use crate::transform::ChunkRunner;
use crate::wig::WigSource;

/// Summary statistics over every value of a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WigStats {
    pub num_values: u64,
    pub total: f64,
    pub mean: Option<f64>,
    /// Population standard deviation
    pub stdev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub chromosomes: Vec<ChromosomeStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromosomeStats {
    pub chr: String,
    pub num_values: u64,
    pub total: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

// Running moments, mergeable across chromosomes.
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    n: u64,
    mean: f64,
    m2: f64,
    total: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Accumulator {
    fn push(mut self, value: f64) -> Self {
        self.n += 1;
        self.total += value;
        let delta = value - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (value - self.mean);
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
        self
    }

    fn add_contig(self, contig: &Contig) -> Self {
        contig.values().fold(self, Self::push)
    }

    fn merge(self, other: Self) -> Self {
        if self.n == 0 {
            return other;
        }
        if other.n == 0 {
            return self;
        }
        let n = self.n + other.n;
        let delta = other.mean - self.mean;
        Self {
            n,
            mean: self.mean + delta * other.n as f64 / n as f64,
            m2: self.m2 + other.m2 + delta * delta * (self.n as f64 * other.n as f64) / n as f64,
            total: self.total + other.total,
            min: self.min.zip(other.min).map(|(a, b)| a.min(b)),
            max: self.max.zip(other.max).map(|(a, b)| a.max(b)),
        }
    }
}

impl WigStats {
    /// Scan the whole source chunk by chunk on the runner's pool.
    pub fn compute<S>(runner: &ChunkRunner, source: &S) -> Result<Self, WigError>
    where
        S: WigSource + ?Sized,
    {
        let per_chromosome = runner.chunk_map(source, Accumulator::default, Accumulator::add_contig)?;

        let mut overall = Accumulator::default();
        let mut chromosomes = Vec::with_capacity(per_chromosome.len());
        for (chr, acc) in per_chromosome {
            chromosomes.push(ChromosomeStats {
                chr,
                num_values: acc.n,
                total: acc.total,
                min: acc.min,
                max: acc.max,
            });
            overall = overall.merge(acc);
        }

        let has_values = overall.n > 0;
        Ok(Self {
            num_values: overall.n,
            total: overall.total,
            mean: has_values.then_some(overall.mean),
            stdev: has_values.then(|| (overall.m2 / overall.n as f64).sqrt()),
            min: overall.min,
            max: overall.max,
            chromosomes,
        })
    }

    /// Human-readable summary.
    pub fn report(&self) -> String {
        let fmt_opt = |v: Option<f64>| v.map_or_else(|| "NA".to_string(), |v| format!("{:.4}", v));

        let mut report = String::new();
        report.push_str(&format!("Values:\t{}\n", self.num_values));
        report.push_str(&format!("Total:\t{:.4}\n", self.total));
        report.push_str(&format!("Mean:\t{}\n", fmt_opt(self.mean)));
        report.push_str(&format!("Stdev:\t{}\n", fmt_opt(self.stdev)));
        report.push_str(&format!("Min:\t{}\n", fmt_opt(self.min)));
        report.push_str(&format!("Max:\t{}\n", fmt_opt(self.max)));
        for chr in &self.chromosomes {
            report.push_str(&format!(
                "{}\t{}\t{:.4}\t{}\t{}\n",
                chr.chr,
                chr.num_values,
                chr.total,
                fmt_opt(chr.min),
                fmt_opt(chr.max)
            ));
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WigConfig;
    use crate::records::Spot;
    use crate::spots::SpotArray;
    use crate::test_utils::test_utils::{TestDir, TWO_CHROM_WIG};
    use crate::wig::WigFile;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_stats_over_wig() {
        let test_dir = TestDir::new("stats").expect("Failed to create test dir");
        let path = test_dir.write_file("t.wig", TWO_CHROM_WIG).unwrap();
        let wig = WigFile::open(&path).unwrap();
        let runner = ChunkRunner::new(&WigConfig::default().chunk_size(3).threads(2)).unwrap();

        let stats = WigStats::compute(&runner, &wig).unwrap();
        assert_eq!(stats.num_values, 17);
        assert!(close(stats.total, 110.0));
        assert!(close(stats.mean.unwrap(), 110.0 / 17.0));
        assert_eq!(stats.min, Some(0.0));
        assert_eq!(stats.max, Some(44.0));
        assert_eq!(stats.chromosomes[0].chr, "chrI");
        assert_eq!(stats.chromosomes[1].num_values, 8);

        let values: Vec<f64> = vec![
            0.0, 3.0, 4.0, 9.0, 0.0, 6.0, 44.0, 3.0, 5.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0,
        ];
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        assert!(close(stats.stdev.unwrap(), var.sqrt()));
        assert!(stats.report().contains("Values:\t17"));
    }

    #[test]
    fn test_stats_without_values() {
        let array = SpotArray::from_spots(vec![("chr1".to_string(), Spot::new(1, 5, None))]);
        let runner = ChunkRunner::new(&WigConfig::default().threads(1)).unwrap();
        let stats = WigStats::compute(&runner, &array).unwrap();
        assert_eq!(stats.num_values, 0);
        assert_eq!(stats.mean, None);
        assert_eq!(stats.stdev, None);
        assert!(stats.report().contains("Mean:\tNA"));
    }
}
