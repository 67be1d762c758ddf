// lines.rs

use serde::{Deserialize, Serialize};

use crate::error::WigError;

/// A sparse line-number → byte-offset table over a text buffer.
///
/// Lines are numbered from 1. The byte offset of every `2^shift`-th line
/// is recorded, so reaching any line costs one table lookup plus a
/// forward scan over at most `2^shift - 1` lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineIndex {
    shift: u32,
    // Offset of line (k << shift) + 1.
    checkpoints: Vec<u64>,
    num_lines: u64,
}

impl LineIndex {
    /// Build the table in a single pass, handing every line (without its
    /// terminator) to `on_line` along with its 1-based number and offset.
    pub fn scan<F>(data: &[u8], shift: u32, mut on_line: F) -> Result<Self, WigError>
    where
        F: FnMut(u64, usize, &[u8]) -> Result<(), WigError>,
    {
        let mask = (1u64 << shift) - 1;
        let mut checkpoints = Vec::new();
        let mut num_lines = 0u64;
        let mut offset = 0usize;

        while offset < data.len() {
            if num_lines & mask == 0 {
                checkpoints.push(offset as u64);
            }
            num_lines += 1;

            let end = data[offset..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(data.len(), |i| offset + i);
            on_line(num_lines, offset, trim_cr(&data[offset..end]))?;
            offset = end + 1;
        }

        Ok(Self {
            shift,
            checkpoints,
            num_lines,
        })
    }

    pub fn build(data: &[u8], shift: u32) -> Self {
        // The callback never fails.
        Self::scan(data, shift, |_, _, _| Ok(())).unwrap_or(Self {
            shift,
            checkpoints: Vec::new(),
            num_lines: 0,
        })
    }

    pub fn num_lines(&self) -> u64 {
        self.num_lines
    }

    /// Byte offset where `line` begins.
    pub fn line_offset(&self, data: &[u8], line: u64) -> Result<usize, WigError> {
        if line == 0 || line > self.num_lines {
            return Err(WigError::range(format!(
                "line {} outside 1..={}",
                line, self.num_lines
            )));
        }

        let slot = ((line - 1) >> self.shift) as usize;
        let mut current = (slot as u64) << self.shift;
        let mut offset = self.checkpoints[slot] as usize;
        while current + 1 < line {
            let next = data[offset..]
                .iter()
                .position(|&b| b == b'\n')
                .ok_or_else(|| WigError::range(format!("line {} past end of data", line)))?;
            offset += next + 1;
            current += 1;
        }
        Ok(offset)
    }

    /// The lines `first..=last`, without terminators.
    pub fn lines<'a>(
        &self,
        data: &'a [u8],
        first: u64,
        last: u64,
    ) -> Result<impl Iterator<Item = &'a [u8]> + 'a, WigError> {
        if first > last || last > self.num_lines {
            return Err(WigError::range(format!(
                "line range {}..={} outside 1..={}",
                first, last, self.num_lines
            )));
        }
        let offset = self.line_offset(data, first)?;
        let count = (last - first + 1) as usize;
        Ok(data[offset..]
            .split(|&b| b == b'\n')
            .take(count)
            .map(trim_cr))
    }

    /// A single line, if it exists.
    pub fn line<'a>(&self, data: &'a [u8], line: u64) -> Result<&'a [u8], WigError> {
        self.lines(data, line, line)?
            .next()
            .ok_or_else(|| WigError::range(format!("line {} not found", line)))
    }
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}
