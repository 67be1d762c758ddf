// bigwig.rs

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info};

use super::WigSource;
use crate::config::WigConfig;
use crate::contig::Contig;
use crate::error::WigError;
use crate::interval::{GenomicInterval, Position};

/// Captured result of an external program.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Runs the external BigWig tools. Swapped out in tests.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, WigError>;
}

/// Spawns real processes found on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn find_program(program: &str) -> Option<PathBuf> {
        let candidate = Path::new(program);
        if candidate.components().count() > 1 {
            return candidate.is_file().then(|| candidate.to_path_buf());
        }
        env::var_os("PATH").and_then(|paths| {
            env::split_paths(&paths)
                .map(|dir| dir.join(program))
                .find(|path| path.is_file())
        })
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, WigError> {
        let resolved = Self::find_program(program)
            .ok_or_else(|| WigError::ExternalTool(format!("{} not found on PATH", program)))?;
        debug!("running {} {}", resolved.display(), args.join(" "));

        let output = Command::new(&resolved)
            .args(args)
            .output()
            .map_err(|e| WigError::ExternalTool(format!("failed to run {}: {}", program, e)))?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// What `bigWigInfo -chroms` reports about a file.
#[derive(Debug, Clone, PartialEq)]
pub struct BigWigInfo {
    pub chroms: IndexMap<String, u64>,
    pub bases_covered: Option<u64>,
    pub mean: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub std: Option<f64>,
}

// version, isCompressed, isSwapped, primaryDataSize, primaryIndexSize,
// zoomLevels, chromCount and at least one statistic.
const MIN_INFO_LINES: usize = 8;

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, WigError> {
    value
        .replace(',', "")
        .parse()
        .map_err(|_| WigError::format(format!("bad {} value '{}' in bigWigInfo output", key, value)))
}

impl BigWigInfo {
    pub fn parse(output: &str) -> Result<Self, WigError> {
        let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.len() < MIN_INFO_LINES {
            return Err(WigError::format(format!(
                "bigWigInfo printed {} lines, expected at least {}",
                lines.len(),
                MIN_INFO_LINES
            )));
        }

        let mut chroms = IndexMap::new();
        let mut bases_covered = None;
        let mut mean = None;
        let mut min = None;
        let mut max = None;
        let mut std = None;

        for line in lines {
            if line.starts_with(char::is_whitespace) {
                let fields: Vec<&str> = line.split_whitespace().collect();
                let [name, _id, size] = fields.as_slice() else {
                    return Err(WigError::format(format!("bad chromosome line '{}'", line.trim())));
                };
                chroms.insert(name.to_string(), parse_number(name, size)?);
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "basesCovered" => bases_covered = Some(parse_number(key, value)?),
                "mean" => mean = Some(parse_number(key, value)?),
                "min" => min = Some(parse_number(key, value)?),
                "max" => max = Some(parse_number(key, value)?),
                "std" => std = Some(parse_number(key, value)?),
                _ => {}
            }
        }

        let (Some(min), Some(max)) = (min, max) else {
            return Err(WigError::format("bigWigInfo output has no min/max"));
        };
        Ok(Self {
            chroms,
            bases_covered,
            mean,
            min,
            max,
            std,
        })
    }
}

/// A BigWig file read through the UCSC command-line tools.
pub struct BigWigFile {
    path: PathBuf,
    info: BigWigInfo,
    config: WigConfig,
    runner: Arc<dyn CommandRunner>,
}

impl BigWigFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WigError> {
        Self::open_with_config(path, WigConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: WigConfig) -> Result<Self, WigError> {
        Self::open_with_runner(path, config, Arc::new(SystemRunner))
    }

    /// Open with a specific [`CommandRunner`]. Fails fast if the info tool
    /// is missing or rejects the file.
    pub fn open_with_runner(
        path: impl AsRef<Path>,
        config: WigConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, WigError> {
        let path = path.as_ref().to_path_buf();
        let args = vec![path.to_string_lossy().into_owned(), "-chroms".to_string()];
        let output = runner.run(&config.bigwig_info, &args)?;
        if !output.success {
            return Err(WigError::ExternalTool(format!(
                "{} failed on {}: {}",
                config.bigwig_info,
                path.display(),
                output.stderr.trim()
            )));
        }
        let info = BigWigInfo::parse(&output.stdout)?;
        info!(
            "opened {} ({} chromosomes, min {}, max {})",
            path.display(),
            info.chroms.len(),
            info.min,
            info.max
        );

        Ok(Self {
            path,
            info,
            config,
            runner,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self) -> &BigWigInfo {
        &self.info
    }

    pub fn min(&self) -> f64 {
        self.info.min
    }

    pub fn max(&self) -> f64 {
        self.info.max
    }

    pub fn chr_length(&self, chr: &str) -> Result<u64, WigError> {
        self.info
            .chroms
            .get(chr)
            .copied()
            .ok_or_else(|| WigError::UnknownChromosome(chr.to_string()))
    }

    fn check_range(&self, chr: &str, low: Position, high: Position) -> Result<(), WigError> {
        let length = self.chr_length(chr)?;
        if low < 1 || high > length {
            return Err(WigError::range(format!(
                "{}:{}-{} outside 1-{}",
                chr, low, high, length
            )));
        }
        Ok(())
    }

    /// Run the summary tool over `[low, high]` (1-based, inclusive) with
    /// `bins` bins.
    fn summary(
        &self,
        chr: &str,
        low: Position,
        high: Position,
        bins: u64,
    ) -> Result<Vec<Option<f64>>, WigError> {
        let args = vec![
            self.path.to_string_lossy().into_owned(),
            chr.to_string(),
            (low - 1).to_string(),
            high.to_string(),
            bins.to_string(),
        ];
        let output = self.runner.run(&self.config.bigwig_summary, &args)?;

        let no_data = |text: &str| text.trim_start().starts_with("no data in region");
        if no_data(&output.stdout) || no_data(&output.stderr) {
            return Err(WigError::MissingData {
                chrom: chr.to_string(),
                start: low,
                stop: high,
            });
        }
        if !output.success {
            return Err(WigError::ExternalTool(format!(
                "{} failed on {}:{}-{}: {}",
                self.config.bigwig_summary,
                chr,
                low,
                high,
                output.stderr.trim()
            )));
        }

        let values = output
            .stdout
            .split_whitespace()
            .map(|field| match field {
                "n/a" => Ok(None),
                _ => field.parse::<f64>().map(Some),
            })
            .collect::<Result<Vec<_>, _>>()?;
        if values.len() as u64 != bins {
            return Err(WigError::format(format!(
                "{} returned {} bins, expected {}",
                self.config.bigwig_summary,
                values.len(),
                bins
            )));
        }
        Ok(values)
    }

    /// Values for `start..=stop`, one per base.
    pub fn query(&self, chr: &str, start: Position, stop: Position) -> Result<Contig, WigError> {
        self.query_with_step(chr, start, stop, 1)
    }

    /// Binned values for `start..=stop`, one bin every `step` bases, each
    /// stored at its first base. The range must be a whole number of bins.
    /// Large ranges are fetched in chunks.
    pub fn query_with_step(
        &self,
        chr: &str,
        start: Position,
        stop: Position,
        step: u64,
    ) -> Result<Contig, WigError> {
        if step == 0 {
            return Err(WigError::range("query step must be at least 1"));
        }
        let low = start.min(stop);
        let high = start.max(stop);
        self.check_range(chr, low, high)?;
        if (high - low + 1) % step != 0 {
            return Err(WigError::range(format!(
                "{}:{}-{} is not a whole number of {} bp bins",
                chr, low, high, step
            )));
        }

        // Keep chunk boundaries on bin boundaries.
        let chunk_size = (self.config.chunk_size / step).max(1) * step;
        let mut contig = Contig::new(chr);
        let mut chunk_low = low;
        while chunk_low <= high {
            let chunk_high = high.min(chunk_low + chunk_size - 1);
            let bins = (chunk_high - chunk_low + 1) / step;
            for (i, value) in self.summary(chr, chunk_low, chunk_high, bins)?.into_iter().enumerate() {
                if let Some(value) = value {
                    contig.set(chunk_low + i as u64 * step, value);
                }
            }
            chunk_low = chunk_high + 1;
        }
        Ok(contig)
    }

    /// Mean over `start..=stop` in a single bin.
    pub fn query_average(
        &self,
        chr: &str,
        start: Position,
        stop: Position,
    ) -> Result<Option<f64>, WigError> {
        let low = start.min(stop);
        let high = start.max(stop);
        self.check_range(chr, low, high)?;
        Ok(self.summary(chr, low, high, 1)?.into_iter().next().flatten())
    }
}

impl WigSource for BigWigFile {
    fn chromosomes(&self) -> Vec<String> {
        self.info.chroms.keys().cloned().collect()
    }

    fn includes(&self, chr: &str) -> bool {
        self.info.chroms.contains_key(chr)
    }

    fn chr_length(&self, chr: &str) -> Result<u64, WigError> {
        BigWigFile::chr_length(self, chr)
    }

    fn chr_extent(&self, chr: &str) -> Result<Option<GenomicInterval>, WigError> {
        let length = BigWigFile::chr_length(self, chr)?;
        Ok((length > 0).then(|| GenomicInterval::new(1, length)))
    }

    fn query(&self, chr: &str, start: Position, stop: Position) -> Result<Contig, WigError> {
        BigWigFile::query(self, chr, start, stop)
    }
}

impl fmt::Display for BigWigFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BigWig file: {}", self.path.display())?;
        writeln!(f, "min: {}\tmax: {}", self.info.min, self.info.max)?;
        if let (Some(mean), Some(std)) = (self.info.mean, self.info.std) {
            writeln!(f, "mean: {}\tstd: {}", mean, std)?;
        }
        writeln!(f, "Chromosomes:")?;
        for (chr, length) in &self.info.chroms {
            writeln!(f, "\t{}: {}", chr, length)?;
        }
        Ok(())
    }
}
