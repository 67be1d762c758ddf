// interval.rs

use serde::{Deserialize, Serialize};

/// A 1-based chromosomal coordinate. Zero marks an unset coordinate.
pub type Position = u64;

/// Trait for types that have genomic coordinates.
///
/// Coordinates are 1-based and inclusive. A `stop` smaller than `start`
/// denotes an interval on the Crick (reverse) strand.
pub trait GenomicCoordinates {
    /// The first base, in reading direction.
    fn start(&self) -> Position;

    /// The last base, in reading direction.
    fn stop(&self) -> Position;

    /// The minimum chromosomal coordinate, regardless of strand.
    fn low(&self) -> Position {
        self.start().min(self.stop())
    }

    /// The maximum chromosomal coordinate, regardless of strand.
    fn high(&self) -> Position {
        self.start().max(self.stop())
    }

    /// Number of bases covered, or `None` if either coordinate is unset.
    fn length(&self) -> Option<u64> {
        if self.start() == 0 || self.stop() == 0 {
            return None;
        }
        Some(self.high() - self.low() + 1)
    }

    /// Integer midpoint, or `None` if either coordinate is unset.
    fn center(&self) -> Option<Position> {
        if self.start() == 0 || self.stop() == 0 {
            return None;
        }
        Some((self.start() + self.stop()) / 2)
    }

    fn is_watson(&self) -> bool {
        self.stop() >= self.start()
    }

    fn is_crick(&self) -> bool {
        !self.is_watson()
    }

    /// Whether this interval encompasses a given base.
    fn contains(&self, position: Position) -> bool {
        self.low() <= position && position <= self.high()
    }

    /// Whether this interval shares at least one base with `[low, high]`.
    fn overlaps(&self, low: Position, high: Position) -> bool {
        self.low() <= high && self.high() >= low
    }

    /// Both coordinates set. Crick orientation is legal.
    fn is_valid(&self) -> bool {
        self.start() > 0 && self.stop() > 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenomicInterval {
    pub start: Position,
    pub stop: Position,
}

impl GenomicInterval {
    pub fn new(start: Position, stop: Position) -> Self {
        Self { start, stop }
    }
}

impl GenomicCoordinates for GenomicInterval {
    fn start(&self) -> Position {
        self.start
    }

    fn stop(&self) -> Position {
        self.stop
    }
}
