// chromosome.rs

use std::io::{self, Write};
use std::path::Path;

use tracing::debug;

use crate::contig::Contig;
use crate::error::WigError;
use crate::interval::Position;
use crate::io::InputStream;
use crate::wig::header::{ContigHeader, StepType};
use crate::wig::parse_value;

/// A dense block of values for one chromosome, or a contiguous piece of it.
///
/// Stored point `i` sits at `start + i * step` and represents `span` bases.
/// Missing values are stored as `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct Chromosome {
    pub chr: String,
    pub start: Position,
    pub step: u64,
    pub span: u64,
    values: Vec<f64>,
}

impl Chromosome {
    /// A zero-filled chromosome of `length` points.
    pub fn new(length: usize, start: Position, step: u64, span: u64) -> Self {
        Self {
            chr: String::new(),
            start: start.max(1),
            step: step.max(1),
            span: span.max(1),
            values: vec![0.0; length],
        }
    }

    /// Read lines `start_line..=end_line` of a Wig file and parse them as
    /// one chromosome block.
    pub fn load(path: &Path, start_line: u64, end_line: u64) -> Result<Self, WigError> {
        let lines = InputStream::new(path).read_line_range(start_line, end_line)?;
        Self::parse(lines.iter().map(String::as_str))
    }

    /// Parse a header line followed by its data lines.
    ///
    /// variableStep data is expanded to a dense step-1 buffer: each value
    /// is carried forward to the base before the next explicit position,
    /// and the last value covers its own span.
    pub fn parse<'a, I>(lines: I) -> Result<Self, WigError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut lines = lines.into_iter().filter(|line| !line.trim().is_empty());
        let first = lines
            .next()
            .ok_or_else(|| WigError::format("chromosome block is empty"))?;
        let header = ContigHeader::parse(first)?;

        let chromosome = match header.step_type {
            StepType::Fixed => {
                let values = lines
                    .map(|line| parse_value(line).map(|v| v.unwrap_or(f64::NAN)))
                    .collect::<Result<Vec<_>, _>>()?;
                Self {
                    chr: header.chrom,
                    start: header.start,
                    step: header.step,
                    span: header.span,
                    values,
                }
            }
            StepType::Variable => Self::fill_variable_step(header, lines)?,
        };

        debug!(
            "parsed {} with {} points from {}",
            chromosome.chr,
            chromosome.len(),
            chromosome.start
        );
        Ok(chromosome)
    }

    fn fill_variable_step<'a, I>(header: ContigHeader, lines: I) -> Result<Self, WigError>
    where
        I: Iterator<Item = &'a str>,
    {
        let mut pairs: Vec<(Position, f64)> = Vec::new();
        for line in lines {
            let mut fields = line.split_whitespace();
            let (Some(pos), Some(value), None) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(WigError::format(format!(
                    "expected 'position value' in variableStep line '{}'",
                    line
                )));
            };
            let pos: Position = pos.parse()?;
            if pos == 0 {
                return Err(WigError::format("variableStep positions are 1-based"));
            }
            if let Some(&(previous, _)) = pairs.last() {
                if pos <= previous {
                    return Err(WigError::format(format!(
                        "variableStep positions must increase ({} after {})",
                        pos, previous
                    )));
                }
            }
            pairs.push((pos, parse_value(value)?.unwrap_or(f64::NAN)));
        }

        let Some(&(first, _)) = pairs.first() else {
            return Ok(Self {
                chr: header.chrom,
                start: 1,
                step: 1,
                span: 1,
                values: Vec::new(),
            });
        };
        let last = pairs.last().map_or(first, |&(pos, _)| pos);
        let length = (last + header.span - first) as usize;

        let mut values = Vec::with_capacity(length);
        for window in pairs.windows(2) {
            let (pos, value) = window[0];
            let (next, _) = window[1];
            values.extend(std::iter::repeat(value).take((next - pos) as usize));
        }
        if let Some(&(_, value)) = pairs.last() {
            values.extend(std::iter::repeat(value).take(header.span as usize));
        }

        Ok(Self {
            chr: header.chrom,
            start: first,
            step: 1,
            span: 1,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Position of the last stored point.
    pub fn stop(&self) -> Position {
        match self.values.len() {
            0 => self.start - 1,
            n => self.start + (n as u64 - 1) * self.step,
        }
    }

    pub fn includes(&self, low: Position, high: Position) -> bool {
        !self.is_empty() && low <= high && low >= self.start && high <= self.stop()
    }

    fn index_of(&self, position: Position) -> Option<usize> {
        if position < self.start || (position - self.start) % self.step != 0 {
            return None;
        }
        let i = ((position - self.start) / self.step) as usize;
        (i < self.values.len()).then_some(i)
    }

    /// The value stored for `position`, if a point sits there.
    pub fn get(&self, position: Position) -> Option<f64> {
        self.index_of(position)
            .map(|i| self.values[i])
            .filter(|v| !v.is_nan())
    }

    pub fn set(&mut self, position: Position, value: f64) -> Result<(), WigError> {
        let i = self.index_of(position).ok_or_else(|| {
            WigError::range(format!(
                "no stored point at {} in {}..={} step {}",
                position,
                self.start,
                self.stop(),
                self.step
            ))
        })?;
        self.values[i] = value;
        Ok(())
    }

    /// Values for `from..=to`, reversed when `from > to`.
    pub fn bases(&self, from: Position, to: Position) -> Result<Vec<Option<f64>>, WigError> {
        let low = from.min(to);
        let high = from.max(to);
        if !self.includes(low, high) {
            return Err(WigError::range(format!(
                "bases {}..{} outside {}..={}",
                low,
                high,
                self.start,
                self.stop()
            )));
        }

        let mut values: Vec<Option<f64>> = (low..=high).map(|bp| self.get(bp)).collect();
        if from > to {
            values.reverse();
        }
        Ok(values)
    }

    /// The raw buffer, `NaN` where missing.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Sparse copy holding one entry per stored point.
    pub fn to_contig(&self) -> Contig {
        let mut contig = Contig::new(self.chr.clone());
        for (i, &value) in self.values.iter().enumerate() {
            contig.set(self.start + i as u64 * self.step, value);
        }
        contig
    }

    pub fn write_fixed_step<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(
            writer,
            "{}",
            ContigHeader::fixed(&self.chr, self.start, self.step, self.span)
        )?;
        for value in &self.values {
            writeln!(writer, "{}", value)?;
        }
        Ok(())
    }
}
