// transform.rs

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info};

use crate::config::WigConfig;
use crate::contig::Contig;
use crate::error::WigError;
use crate::interval::{GenomicInterval, Position};
use crate::io::OutputStream;
use crate::wig::header::{ContigHeader, TrackHeader};
use crate::wig::WigSource;

/// Consecutive inclusive windows of at most `size` bases covering
/// `start..=stop`. The last window may be shorter.
#[derive(Debug, Clone)]
pub struct Chunks {
    next: Position,
    stop: Position,
    size: u64,
    done: bool,
}

impl Chunks {
    pub fn new(start: Position, stop: Position, size: u64) -> Self {
        Self {
            next: start.min(stop),
            stop: start.max(stop),
            size: size.max(1),
            done: false,
        }
    }

    pub fn empty() -> Self {
        Self {
            next: 1,
            stop: 0,
            size: 1,
            done: true,
        }
    }
}

impl Iterator for Chunks {
    type Item = GenomicInterval;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.next > self.stop {
            return None;
        }
        let low = self.next;
        let high = self.stop.min(low.saturating_add(self.size - 1));
        if high == self.stop {
            self.done = true;
        } else {
            self.next = high + 1;
        }
        Some(GenomicInterval::new(low, high))
    }
}

/// Runs per-chromosome work over a [`WigSource`] on a worker pool.
///
/// Chromosomes are processed in parallel and chunks within a chromosome in
/// order. Results always come back in chromosome order.
pub struct ChunkRunner {
    pool: ThreadPool,
    chunk_size: u64,
}

impl ChunkRunner {
    pub fn new(config: &WigConfig) -> Result<Self, WigError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("wigidx-worker-{}", i))
            .build()?;
        Ok(Self {
            pool,
            chunk_size: config.chunk_size,
        })
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn per_chromosome<S, T, F>(&self, source: &S, work: F) -> Result<Vec<(String, T)>, WigError>
    where
        S: WigSource + ?Sized,
        T: Send,
        F: Fn(usize, &str) -> Result<T, WigError> + Sync,
    {
        let chromosomes = source.chromosomes();
        self.pool.install(|| {
            chromosomes
                .par_iter()
                .enumerate()
                .map(|(i, chr)| work(i, chr).map(|result| (chr.clone(), result)))
                .collect()
        })
    }

    /// Call `f` with every chunk of every chromosome.
    pub fn each_chunk<S, F>(&self, source: &S, f: F) -> Result<(), WigError>
    where
        S: WigSource + ?Sized,
        F: Fn(&Contig) -> Result<(), WigError> + Sync,
    {
        self.per_chromosome(source, |_, chr| {
            for chunk in source.chunks(chr, self.chunk_size)? {
                f(&source.query(chr, chunk.start, chunk.stop)?)?;
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Fold every chunk of each chromosome into a per-chromosome result.
    pub fn chunk_map<S, T, I, F>(
        &self,
        source: &S,
        init: I,
        fold: F,
    ) -> Result<Vec<(String, T)>, WigError>
    where
        S: WigSource + ?Sized,
        T: Send,
        I: Fn() -> T + Sync,
        F: Fn(T, &Contig) -> T + Sync,
    {
        self.per_chromosome(source, |_, chr| {
            let mut acc = init();
            for chunk in source.chunks(chr, self.chunk_size)? {
                acc = fold(acc, &source.query(chr, chunk.start, chunk.stop)?);
            }
            Ok(acc)
        })
    }

    /// Build a new Wig file chunk by chunk.
    ///
    /// `f` is called with each chunk's chromosome and bounds and returns the
    /// transformed values. Every chromosome is written to its own temporary
    /// variableStep file, and the parts are then joined under `track` into
    /// `output` (gzip-compressed when it ends in `.gz`). Temporary files
    /// are removed whether or not the transform succeeds.
    pub fn transform<S, F>(
        &self,
        source: &S,
        output: &Path,
        track: &TrackHeader,
        f: F,
    ) -> Result<(), WigError>
    where
        S: WigSource + ?Sized,
        F: Fn(&str, Position, Position) -> Result<Contig, WigError> + Sync,
    {
        let parent = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let scratch = tempfile::Builder::new()
            .prefix(".wigidx-transform")
            .tempdir_in(parent)?;
        info!(
            "transforming {} chromosomes into {}",
            source.chromosomes().len(),
            output.display()
        );

        let parts = self.per_chromosome(source, |i, chr| {
            let part = scratch.path().join(format!("{:05}.part", i));
            let mut writer = BufWriter::new(File::create(&part)?);
            writeln!(writer, "{}", ContigHeader::variable(chr, 1))?;
            for chunk in source.chunks(chr, self.chunk_size)? {
                debug!("{}:{}-{}", chr, chunk.start, chunk.stop);
                f(chr, chunk.start, chunk.stop)?.write_variable_step_body(&mut writer)?;
            }
            writer.flush()?;
            Ok(part)
        })?;

        join_parts(output, track, parts.iter().map(|(_, part)| part))?;
        info!("wrote {}", output.display());
        Ok(())
    }

    /// [`transform`](Self::transform) applying `f` to every value.
    pub fn transform_values<S, F>(
        &self,
        source: &S,
        output: &Path,
        track: &TrackHeader,
        f: F,
    ) -> Result<(), WigError>
    where
        S: WigSource + ?Sized,
        F: Fn(f64) -> f64 + Sync,
    {
        self.transform(source, output, track, |chr, start, stop| {
            Ok(source.query(chr, start, stop)?.map_values(&f))
        })
    }
}

fn join_parts<'a, I>(output: &Path, track: &TrackHeader, parts: I) -> Result<(), WigError>
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    let mut writer = OutputStream::new(Some(output)).writer()?;
    writeln!(writer, "{}", track)?;
    for part in parts {
        io::copy(&mut File::open(part)?, &mut writer)?;
    }
    writer.flush()?;
    Ok(())
}
