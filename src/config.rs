// config.rs

use std::env;

use tracing::warn;

/// Default window size for chunked traversal and BigWig sub-queries.
pub const DEFAULT_CHUNK_SIZE: u64 = 200_000;

/// Default log2 spacing of the line checkpoint table.
pub const DEFAULT_LINE_INDEX_SHIFT: u32 = 12;

/// Configuration for opening and traversing Wig sources
#[derive(Debug, Clone)]
pub struct WigConfig {
    /// Bases per chunk in chunked traversal and BigWig summary calls
    pub chunk_size: u64,
    /// Worker threads for chunked transforms
    pub threads: usize,
    /// A line offset is recorded every 2^line_index_shift lines
    pub line_index_shift: u32,
    /// Read and write the `.widx` sidecar next to text Wig files
    pub use_index_cache: bool,
    /// zstd level for the sidecar
    pub index_level: i32,
    /// Program printing BigWig chromosome sizes and summary statistics
    pub bigwig_info: String,
    /// Program printing binned BigWig values
    pub bigwig_summary: String,
}

impl Default for WigConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            threads: num_cpus::get(),
            line_index_shift: DEFAULT_LINE_INDEX_SHIFT,
            use_index_cache: false,
            index_level: 3,
            bigwig_info: "bigWigInfo".to_string(),
            bigwig_summary: "bigWigSummary".to_string(),
        }
    }
}

impl WigConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, overridden by `WIGIDX_CHUNK_SIZE` and `WIGIDX_THREADS`
    /// when they are set to positive integers, and by `WIGIDX_INDEX_CACHE`
    /// (`1`/`true`/`0`/`false`).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(size) = env_positive("WIGIDX_CHUNK_SIZE") {
            config.chunk_size = size;
        }
        if let Some(threads) = env_positive("WIGIDX_THREADS") {
            config.threads = threads as usize;
        }
        if let Some(enabled) = env_flag("WIGIDX_INDEX_CACHE") {
            config.use_index_cache = enabled;
        }
        config
    }

    pub fn chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn line_index_shift(mut self, shift: u32) -> Self {
        self.line_index_shift = shift.min(32);
        self
    }

    pub fn use_index_cache(mut self, enabled: bool) -> Self {
        self.use_index_cache = enabled;
        self
    }

    pub fn bigwig_tools(mut self, info: impl Into<String>, summary: impl Into<String>) -> Self {
        self.bigwig_info = info.into();
        self.bigwig_summary = summary.into();
        self
    }
}

fn env_positive(key: &str) -> Option<u64> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            warn!("ignoring {}={:?}, expected a positive integer", key, raw);
            None
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    let raw = env::var(key).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!("ignoring {}={:?}, expected true or false", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WigConfig::default();
        assert_eq!(config.chunk_size, 200_000);
        assert_eq!(config.line_index_shift, 12);
        assert!(config.threads >= 1);
        assert_eq!(config.bigwig_info, "bigWigInfo");
        assert_eq!(config.bigwig_summary, "bigWigSummary");
    }

    #[test]
    fn test_builder_clamps() {
        let config = WigConfig::new().chunk_size(0).threads(0).line_index_shift(99);
        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.threads, 1);
        assert_eq!(config.line_index_shift, 32);
    }

    #[test]
    fn test_env_parsing() {
        env::set_var("WIGIDX_TEST_POSITIVE", "5000");
        env::set_var("WIGIDX_TEST_ZERO", "0");
        env::set_var("WIGIDX_TEST_JUNK", "lots");
        assert_eq!(env_positive("WIGIDX_TEST_POSITIVE"), Some(5000));
        assert_eq!(env_positive("WIGIDX_TEST_ZERO"), None);
        assert_eq!(env_positive("WIGIDX_TEST_JUNK"), None);
        assert_eq!(env_positive("WIGIDX_TEST_UNSET_VARIABLE"), None);
    }

    #[test]
    fn test_env_flag_parsing() {
        env::set_var("WIGIDX_TEST_FLAG_ON", "True");
        env::set_var("WIGIDX_TEST_FLAG_OFF", "0");
        env::set_var("WIGIDX_TEST_FLAG_JUNK", "maybe");
        assert_eq!(env_flag("WIGIDX_TEST_FLAG_ON"), Some(true));
        assert_eq!(env_flag("WIGIDX_TEST_FLAG_OFF"), Some(false));
        assert_eq!(env_flag("WIGIDX_TEST_FLAG_JUNK"), None);
        assert_eq!(env_flag("WIGIDX_TEST_FLAG_UNSET"), None);
    }
}
