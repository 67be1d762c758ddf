pub mod chromosome;
pub mod config;
pub mod contig;
pub mod error;
pub mod interval;
pub mod io;
pub mod records;
pub mod spots;
pub mod stats;
pub mod transform;
pub mod wig;

pub use chromosome::Chromosome;
pub use config::WigConfig;
pub use contig::Contig;
pub use error::WigError;
pub use interval::{GenomicCoordinates, GenomicInterval, Position};
pub use io::*;
pub use records::*;
pub use spots::{GenomicData, SpotArray};
pub use stats::WigStats;
pub use transform::{ChunkRunner, Chunks};
pub use wig::{
    open_source, BigWigFile, CommandRunner, ContigHeader, SystemRunner, TrackHeader, WigFile,
    WigSource,
};

#[cfg(test)]
pub(crate) mod test_utils;
