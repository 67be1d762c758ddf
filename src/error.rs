// error.rs

use std::num::{ParseFloatError, ParseIntError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WigError {
    #[error("Format error: {0}")]
    Format(String),

    #[error("Range error: {0}")]
    Range(String),

    #[error("Chromosome {0} not found")]
    UnknownChromosome(String),

    #[error("No data in region {chrom}:{start}-{stop}")]
    MissingData { chrom: String, start: u64, stop: u64 },

    #[error("External tool error: {0}")]
    ExternalTool(String),

    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("Parse integer error: {0}")]
    ParseIntError(#[from] ParseIntError),

    #[error("Parse float error: {0}")]
    ParseFloatError(#[from] ParseFloatError),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Bincode error: {0}")]
    BincodeError(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("{0}")]
    StringError(String),

    #[cfg(feature = "cli")]
    #[error("Template error: {0}")]
    TemplateError(#[from] indicatif::style::TemplateError),
}

impl WigError {
    /// Whether a batch caller can skip the offending window and keep going.
    /// Range and missing-data failures are local to one query; everything
    /// else means the source itself is unusable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WigError::Range(_) | WigError::UnknownChromosome(_) | WigError::MissingData { .. }
        )
    }

    pub(crate) fn format(msg: impl Into<String>) -> Self {
        WigError::Format(msg.into())
    }

    pub(crate) fn range(msg: impl Into<String>) -> Self {
        WigError::Range(msg.into())
    }
}

// Add a convenience implementation for &str errors
impl From<&str> for WigError {
    fn from(error: &str) -> Self {
        WigError::StringError(error.to_string())
    }
}

impl From<String> for WigError {
    fn from(error: String) -> Self {
        WigError::StringError(error)
    }
}

impl From<Box<bincode::ErrorKind>> for WigError {
    fn from(error: Box<bincode::ErrorKind>) -> Self {
        WigError::BincodeError(error.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for WigError {
    fn from(error: rayon::ThreadPoolBuildError) -> Self {
        WigError::ThreadPool(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(WigError::range("off the end").is_recoverable());
        assert!(WigError::UnknownChromosome("chrZ".into()).is_recoverable());
        assert!(WigError::MissingData {
            chrom: "chr1".into(),
            start: 1,
            stop: 10
        }
        .is_recoverable());

        assert!(!WigError::format("bad header").is_recoverable());
        assert!(!WigError::ExternalTool("bigWigInfo missing".into()).is_recoverable());
    }

    #[test]
    fn test_messages() {
        let err = WigError::MissingData {
            chrom: "chrII".into(),
            start: 5,
            stop: 9,
        };
        assert_eq!(err.to_string(), "No data in region chrII:5-9");
        assert_eq!(
            WigError::UnknownChromosome("chrZ".into()).to_string(),
            "Chromosome chrZ not found"
        );
    }
}
