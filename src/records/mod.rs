// records/mod.rs
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::WigError;
use crate::interval::{GenomicCoordinates, Position};

/// A genomic "spot" with a value, e.g. a microarray probe, a peak call or
/// a bedGraph entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    pub start: Position,
    pub stop: Position,
    pub id: Option<String>,
    pub value: Option<f64>,
}

impl Spot {
    pub fn new(start: Position, stop: Position, value: Option<f64>) -> Self {
        Self {
            start,
            stop,
            id: None,
            value,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl GenomicCoordinates for Spot {
    fn start(&self) -> Position {
        self.start
    }

    fn stop(&self) -> Position {
        self.stop
    }
}

impl fmt::Display for Spot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Spot: {},{},{},{}",
            self.id.as_deref().unwrap_or(""),
            self.start,
            self.stop,
            self.value.map_or_else(String::new, |v| v.to_string())
        )
    }
}

/// The interval text formats spots can be loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotFormat {
    /// `chrom start stop [name] [score] [strand] ...`
    Bed,
    /// `chrom start stop value`
    BedGraph,
}

impl SpotFormat {
    /// Guess the format from a file name, defaulting to Bed.
    pub fn from_path(path: &std::path::Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let name = name.strip_suffix(".gz").unwrap_or(&name);
        if name.ends_with(".bedgraph") || name.ends_with(".bg") {
            SpotFormat::BedGraph
        } else {
            SpotFormat::Bed
        }
    }

    /// Parse one tab-delimited row into its chromosome and [`Spot`].
    ///
    /// Bed starts are 0-based half-open and are shifted to 1-based here.
    pub fn parse_fields<'a, I>(&self, fields: I) -> Result<(String, Spot), WigError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let fields: Vec<&str> = fields.into_iter().collect();
        if fields.len() < 3 {
            return Err(WigError::format(format!(
                "interval row needs at least 3 fields, found {}",
                fields.len()
            )));
        }

        let chrom = fields[0].to_string();
        let start0: Position = fields[1].trim().parse()?;
        let stop: Position = fields[2].trim().parse()?;
        if start0 >= stop {
            return Err(WigError::format(format!(
                "invalid interval {}:{}-{}, covers no bases",
                chrom, start0, stop
            )));
        }

        let mut spot = Spot::new(start0 + 1, stop, None);
        match self {
            SpotFormat::BedGraph => {
                if let Some(value) = fields.get(3) {
                    spot.value = Some(value.trim().parse()?);
                }
            }
            SpotFormat::Bed => {
                if let Some(name) = fields.get(3) {
                    spot.id = Some(name.to_string());
                }
                if let Some(score) = fields.get(4).map(|s| s.trim()).filter(|s| *s != ".") {
                    spot.value = Some(score.parse()?);
                }
                if fields.get(5).map(|s| s.trim()) == Some("-") {
                    std::mem::swap(&mut spot.start, &mut spot.stop);
                }
            }
        }

        Ok((chrom, spot))
    }
}
