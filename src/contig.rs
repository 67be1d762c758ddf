// contig.rs

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};

use crate::error::WigError;
use crate::interval::Position;
use crate::wig::header::ContigHeader;

/// A block of single-bp genomic values on one chromosome.
///
/// Values are stored sparsely by absolute base-pair coordinate, so a contig
/// may have gaps. `start`/`stop` are the smallest and largest coordinates
/// holding a value, and bounds checks use that envelope: a coordinate
/// inside the envelope that was never set passes the check and reads back
/// as `None`.
///
/// `NaN` is the text marker for "no data" and is never stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contig {
    pub chr: String,
    values: BTreeMap<Position, f64>,
}

impl Contig {
    pub fn new(chr: impl Into<String>) -> Self {
        Self {
            chr: chr.into(),
            values: BTreeMap::new(),
        }
    }

    /// Build a contig from consecutive values beginning at `start`.
    pub fn from_values<I>(chr: impl Into<String>, start: Position, values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        Self::from_dense(chr, start, values.into_iter().map(Some))
    }

    /// Build a contig from consecutive, possibly missing, values beginning at `start`.
    pub fn from_dense<I>(chr: impl Into<String>, start: Position, values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let mut contig = Self::new(chr);
        for (i, value) in values.into_iter().enumerate() {
            if let Some(value) = value {
                contig.set(start + i as u64, value);
            }
        }
        contig
    }

    /// Set the value at a base. Setting `NaN` clears it.
    pub fn set(&mut self, position: Position, value: f64) {
        if value.is_nan() {
            self.values.remove(&position);
        } else {
            self.values.insert(position, value);
        }
    }

    pub fn remove(&mut self, position: Position) -> Option<f64> {
        self.values.remove(&position)
    }

    /// Direct lookup. Absent coordinates are "no data", not an error.
    pub fn get(&self, position: Position) -> Option<f64> {
        self.values.get(&position).copied()
    }

    /// The first base pair with data.
    pub fn start(&self) -> Option<Position> {
        self.values.keys().next().copied()
    }

    /// The last base pair with data.
    pub fn stop(&self) -> Option<Position> {
        self.values.keys().next_back().copied()
    }

    /// Width of the `[start, stop]` envelope, gaps included.
    pub fn len(&self) -> u64 {
        match (self.start(), self.stop()) {
            (Some(start), Some(stop)) => stop - start + 1,
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of bases that actually hold a value.
    pub fn coverage(&self) -> usize {
        self.values.len()
    }

    /// Whether `[low, high]` falls inside the envelope.
    pub fn includes(&self, low: Position, high: Position) -> bool {
        match (self.start(), self.stop()) {
            (Some(start), Some(stop)) => low >= start && high <= stop && low <= high,
            _ => false,
        }
    }

    fn check_range(&self, low: Position, high: Position) -> Result<(), WigError> {
        if self.includes(low, high) {
            Ok(())
        } else {
            Err(WigError::range(format!(
                "contig {} does not include bases {}..{}",
                self.chr, low, high
            )))
        }
    }

    /// Bounds-checked lookup of a single base.
    pub fn at(&self, position: Position) -> Result<Option<f64>, WigError> {
        self.check_range(position, position)?;
        Ok(self.get(position))
    }

    /// Values for `from..=to`. When `from > to` the values are returned in
    /// Crick (reverse) order.
    pub fn bases(&self, from: Position, to: Position) -> Result<Vec<Option<f64>>, WigError> {
        let low = from.min(to);
        let high = from.max(to);
        self.check_range(low, high)?;

        let mut values: Vec<Option<f64>> = (low..=high).map(|bp| self.get(bp)).collect();
        if from > to {
            values.reverse();
        }
        Ok(values)
    }

    /// `length` values beginning at `start`.
    pub fn slice(&self, start: Position, length: u64) -> Result<Vec<Option<f64>>, WigError> {
        if length == 0 {
            return Err(WigError::range("slice length must be at least 1"));
        }
        let stop = start
            .checked_add(length - 1)
            .ok_or_else(|| WigError::range(format!("slice of {} from {} overflows", length, start)))?;
        self.bases(start, stop)
    }

    /// Iterate over the `(position, value)` pairs that hold data, in order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, f64)> + '_ {
        self.values.iter().map(|(&pos, &value)| (pos, value))
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.values().copied()
    }

    pub fn sum(&self) -> f64 {
        self.values().sum()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.sum() / self.coverage() as f64)
        }
    }

    /// Apply `f` to every stored value.
    pub fn map_values<F>(&self, f: F) -> Contig
    where
        F: Fn(f64) -> f64,
    {
        let mut out = Contig::new(self.chr.clone());
        for (pos, value) in self.iter() {
            out.set(pos, f(value));
        }
        out
    }

    /// Serialize as a fixedStep block covering the whole envelope.
    pub fn to_fixed_step(&self) -> String {
        self.to_string()
    }

    /// Serialize as a variableStep block with only the explicit pairs.
    pub fn to_variable_step(&self) -> String {
        VariableStep(self).to_string()
    }

    pub fn write_fixed_step<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        writeln!(writer, "{}", self)
    }

    pub fn write_variable_step<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "{}", VariableStep(self))
    }

    /// Write the `position<TAB>value` lines without a header, for appending
    /// chunks under a header written once.
    pub fn write_variable_step_body<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for (pos, value) in self.iter() {
            writeln!(writer, "{}\t{}", pos, value)?;
        }
        Ok(())
    }
}

impl fmt::Display for Contig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (Some(start), Some(stop)) = (self.start(), self.stop()) else {
            return write!(f, "{}", ContigHeader::fixed(&self.chr, 1, 1, 1));
        };

        write!(f, "{}", ContigHeader::fixed(&self.chr, start, 1, 1))?;
        for bp in start..=stop {
            match self.get(bp) {
                Some(value) => write!(f, "\n{}", value)?,
                None => write!(f, "\nNaN")?,
            }
        }
        Ok(())
    }
}

struct VariableStep<'a>(&'a Contig);

impl fmt::Display for VariableStep<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", ContigHeader::variable(&self.0.chr, 1))?;
        for (pos, value) in self.0.iter() {
            write!(f, "\n{}\t{}", pos, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> Contig {
        Contig::from_values("chrI", 1, vec![0.0, 3.0, 4.0, 9.0, 0.0, 6.0, 44.0, 3.0, 5.0, 7.0])
    }

    #[test]
    fn test_envelope() {
        let contig = example();
        assert_eq!(contig.start(), Some(1));
        assert_eq!(contig.stop(), Some(10));
        assert_eq!(contig.len(), 10);
        assert_eq!(contig.coverage(), 10);
        assert!(contig.includes(1, 10));
        assert!(!contig.includes(0, 10));
        assert!(!contig.includes(1, 11));
    }

    #[test]
    fn test_bases_and_crick() {
        let contig = example();
        let watson = contig.bases(3, 6).unwrap();
        assert_eq!(watson, vec![Some(4.0), Some(9.0), Some(0.0), Some(6.0)]);

        let crick = contig.bases(6, 3).unwrap();
        assert_eq!(crick, vec![Some(6.0), Some(0.0), Some(9.0), Some(4.0)]);

        assert_eq!(contig.slice(3, 2).unwrap(), vec![Some(4.0), Some(9.0)]);
        assert!(contig.slice(3, 0).is_err());
    }

    #[test]
    fn test_out_of_envelope() {
        let contig = example();
        assert!(matches!(contig.at(11), Err(WigError::Range(_))));
        assert!(matches!(contig.bases(9, 11), Err(WigError::Range(_))));
        assert!(Contig::new("chrI").at(1).is_err());
        assert!(matches!(
            contig.slice(u64::MAX - 1, 5),
            Err(WigError::Range(_))
        ));
    }

    #[test]
    fn test_gap_inside_envelope_is_lenient() {
        let mut contig = Contig::new("chr1");
        contig.set(10, 1.0);
        contig.set(20, 2.0);

        assert_eq!(contig.len(), 11);
        assert_eq!(contig.coverage(), 2);
        assert_eq!(contig.at(15).unwrap(), None);
        assert_eq!(contig.get(15), None);
        assert_eq!(contig.at(20).unwrap(), Some(2.0));
    }

    #[test]
    fn test_nan_is_missing() {
        let mut contig = Contig::from_dense("chr1", 5, vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(contig.coverage(), 2);
        contig.set(5, f64::NAN);
        assert_eq!(contig.get(5), None);
        assert_eq!(contig.start(), Some(7));
    }

    #[test]
    fn test_fixed_step_serialization() {
        let contig = Contig::from_dense("chr2", 100, vec![Some(1.5), None, Some(-2.0)]);
        assert_eq!(
            contig.to_fixed_step(),
            "fixedStep chrom=chr2 start=100 step=1 span=1\n1.5\nNaN\n-2"
        );
    }

    #[test]
    fn test_variable_step_serialization() {
        let contig = Contig::from_dense("chr2", 100, vec![Some(1.5), None, Some(-2.0)]);
        assert_eq!(
            contig.to_variable_step(),
            "variableStep chrom=chr2 span=1\n100\t1.5\n102\t-2"
        );

        let mut body = Vec::new();
        contig.write_variable_step_body(&mut body).unwrap();
        assert_eq!(String::from_utf8(body).unwrap(), "100\t1.5\n102\t-2\n");

        assert_eq!(Contig::new("chr3").to_variable_step(), "variableStep chrom=chr3 span=1");
    }

    #[test]
    fn test_summaries() {
        let contig = Contig::from_values("chr1", 1, vec![1.0, 2.0, 3.0]);
        assert_eq!(contig.sum(), 6.0);
        assert_eq!(contig.mean(), Some(2.0));
        assert_eq!(Contig::new("x").mean(), None);

        let doubled = contig.map_values(|v| v * 2.0);
        assert_eq!(doubled.bases(1, 3).unwrap(), vec![Some(2.0), Some(4.0), Some(6.0)]);
    }
}
