// header.rs

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::WigError;
use crate::interval::Position;

/// Track line keys understood by genome browsers.
pub const TRACK_KEYS: [&str; 17] = [
    "type",
    "name",
    "description",
    "visibility",
    "color",
    "altColor",
    "priority",
    "autoScale",
    "alwaysZero",
    "gridDefault",
    "maxHeightPixels",
    "graphType",
    "viewLimits",
    "yLineMark",
    "yLineOnOff",
    "windowingFunction",
    "smoothingWindow",
];

/// Split `key=value` tokens on whitespace, keeping double-quoted values
/// (which may contain spaces) together and stripping their quotes.
fn tokenize(line: &str) -> Result<Vec<(String, Option<String>)>, WigError> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        let mut value = None;
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                break;
            }
            chars.next();
            if c == '=' {
                let mut v = String::new();
                if chars.peek() == Some(&'"') {
                    chars.next();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '"' {
                            closed = true;
                            break;
                        }
                        v.push(c);
                    }
                    if !closed {
                        return Err(WigError::format(format!("unterminated quote in '{}'", line)));
                    }
                } else {
                    while let Some(&c) = chars.peek() {
                        if c.is_whitespace() {
                            break;
                        }
                        v.push(c);
                        chars.next();
                    }
                }
                value = Some(v);
                break;
            }
            key.push(c);
        }
        tokens.push((key, value));
    }

    Ok(tokens)
}

/// The `track ...` line at the top of a Wig file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackHeader {
    fields: IndexMap<String, String>,
}

impl Default for TrackHeader {
    fn default() -> Self {
        let mut fields = IndexMap::new();
        fields.insert("type".to_string(), "wiggle_0".to_string());
        fields.insert("name".to_string(), String::new());
        fields.insert("description".to_string(), String::new());
        fields.insert("autoScale".to_string(), "off".to_string());
        fields.insert("visibility".to_string(), "full".to_string());
        Self { fields }
    }
}

impl TrackHeader {
    /// Parse a `track` line. Unknown keys are warned about and dropped.
    pub fn parse(line: &str) -> Result<Self, WigError> {
        let line = line.trim();
        let rest = line
            .strip_prefix("track")
            .filter(|r| r.is_empty() || r.starts_with(char::is_whitespace))
            .ok_or_else(|| WigError::format(format!("not a track line: '{}'", line)))?;

        let mut fields = IndexMap::new();
        for (key, value) in tokenize(rest)? {
            let Some(value) = value else {
                warn!("ignoring track header token without a value: '{}'", key);
                continue;
            };
            if TRACK_KEYS.contains(&key.as_str()) {
                fields.insert(key, value);
            } else {
                warn!("ignoring unknown track header key '{}'", key);
            }
        }
        Ok(Self { fields })
    }

    /// Header for a file whose first line may or may not be a track line.
    pub fn from_first_line(line: Option<&str>) -> Self {
        match line {
            Some(line) if line.trim_start().starts_with("track") => {
                Self::parse(line).unwrap_or_else(|e| {
                    warn!("unparseable track header, using default: {}", e);
                    Self::default()
                })
            }
            _ => Self::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<(), WigError> {
        if !TRACK_KEYS.contains(&key) {
            return Err(WigError::format(format!("unknown track header key '{}'", key)));
        }
        self.fields.insert(key.to_string(), value.into());
        Ok(())
    }

    pub fn name(&self) -> Option<&str> {
        self.get("name")
    }

    pub fn description(&self) -> Option<&str> {
        self.get("description")
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.fields.insert("name".to_string(), name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.fields.insert("description".to_string(), description.into());
        self
    }
}

impl fmt::Display for TrackHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track")?;
        for (key, value) in &self.fields {
            let quote = key == "name"
                || key == "description"
                || value.is_empty()
                || value.contains(char::is_whitespace);
            if quote {
                write!(f, " {}=\"{}\"", key, value)?;
            } else {
                write!(f, " {}={}", key, value)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepType {
    Fixed,
    Variable,
}

impl StepType {
    pub fn keyword(&self) -> &'static str {
        match self {
            StepType::Fixed => "fixedStep",
            StepType::Variable => "variableStep",
        }
    }
}

/// A `fixedStep`/`variableStep` line opening one chromosome's block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContigHeader {
    pub step_type: StepType,
    pub chrom: String,
    pub start: Position,
    pub step: u64,
    pub span: u64,
}

impl ContigHeader {
    pub fn fixed(chrom: &str, start: Position, step: u64, span: u64) -> Self {
        Self {
            step_type: StepType::Fixed,
            chrom: chrom.to_string(),
            start,
            step,
            span,
        }
    }

    pub fn variable(chrom: &str, span: u64) -> Self {
        Self {
            step_type: StepType::Variable,
            chrom: chrom.to_string(),
            start: 1,
            step: 1,
            span,
        }
    }

    /// Whether a raw line opens a chromosome block.
    pub fn is_header_line(line: &[u8]) -> bool {
        line.starts_with(b"fixedStep") || line.starts_with(b"variableStep")
    }

    pub fn parse(line: &str) -> Result<Self, WigError> {
        let line = line.trim();
        let (keyword, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let step_type = match keyword {
            "fixedStep" => StepType::Fixed,
            "variableStep" => StepType::Variable,
            _ => {
                return Err(WigError::format(format!(
                    "expected fixedStep or variableStep header, found '{}'",
                    line
                )))
            }
        };

        let mut chrom = None;
        let mut start = 1;
        let mut step = 1;
        let mut span = 1;
        for (key, value) in tokenize(rest)? {
            let Some(value) = value else {
                return Err(WigError::format(format!("malformed header token '{}'", key)));
            };
            match key.as_str() {
                "chrom" => chrom = Some(value),
                "start" => start = parse_coordinate(&key, &value, line)?,
                "step" => step = parse_coordinate(&key, &value, line)?,
                "span" => span = parse_coordinate(&key, &value, line)?,
                other => warn!("ignoring unknown contig header key '{}'", other),
            }
        }

        let chrom = chrom
            .ok_or_else(|| WigError::format(format!("header line has no chrom: '{}'", line)))?;
        if start == 0 || step == 0 || span == 0 {
            return Err(WigError::format(format!(
                "start, step and span must be positive in '{}'",
                line
            )));
        }

        Ok(Self {
            step_type,
            chrom,
            start,
            step,
            span,
        })
    }
}

fn parse_coordinate(key: &str, value: &str, line: &str) -> Result<u64, WigError> {
    value.parse().map_err(|_| {
        WigError::format(format!("invalid {}={} in '{}'", key, value, line))
    })
}

impl fmt::Display for ContigHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step_type {
            StepType::Fixed => write!(
                f,
                "fixedStep chrom={} start={} step={} span={}",
                self.chrom, self.start, self.step, self.span
            ),
            StepType::Variable => write!(f, "variableStep chrom={} span={}", self.chrom, self.span),
        }
    }
}
