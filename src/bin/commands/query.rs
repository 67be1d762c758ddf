// bin/commands/query.rs

use crate::commands::{config, parse_region};
use clap::{Args, ValueEnum};
use csv::ReaderBuilder;
use flate2::Compression;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use tracing::warn;
use wigindex::error::WigError;
use wigindex::io::{InputStream, OutputStream};
use wigindex::{open_source, Contig, ContigHeader, WigSource};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One value per base, NaN where there is no data.
    Values,
    /// A fixedStep block per region.
    Fixed,
    /// A variableStep block per region, only bases with data.
    Variable,
}

#[derive(Args)]
pub struct QueryArgs {
    /// Output file.
    #[arg(short, long, value_name = "region.wig")]
    pub output: Option<String>,

    /// The query region, in the format seqname:start-end where start and end are
    /// 1-based inclusive coordinates (like tabix's region argument). A start
    /// past the end reads the Crick strand.
    #[arg(
        value_name = "chrI:1000-2000",
        required_unless_present = "regions"
    )]
    pub region: Option<String>,

    /// Input BED file for batch queries. Regions that fall outside the data
    /// are skipped with a warning.
    #[arg(long, value_name = "regions.bed", required_unless_present = "region")]
    pub regions: Option<PathBuf>,

    /// Input Wig, BigWig or bedGraph file.
    #[arg(short, long, value_name = "signal.wig")]
    pub input: PathBuf,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Values)]
    pub format: OutputFormat,

    /// Worker threads (defaults to WIGIDX_THREADS or the number of CPUs).
    #[arg(short, long)]
    pub threads: Option<usize>,
}

pub fn run(args: QueryArgs) -> Result<(), WigError> {
    let duration_start = Instant::now();

    let output_stream = OutputStream::builder()
        .filepath(args.output)
        .buffer_size(256 * 1024)
        .compression_level(None::<Compression>)
        .build();
    let mut output_writer = output_stream.writer()?;

    if !args.input.exists() {
        return Err(format!("Input file {} does not exist.", args.input.display()).into());
    }

    let source = open_source(&args.input, &config(&args.input, args.threads, None))?;

    if let Some(region) = args.region {
        eprintln!("Query region {} in {}", region, args.input.display());
        let (chr, start, stop) = parse_region(&region)?;
        write_region(source.as_ref(), chr, start, stop, args.format, &mut output_writer)?;
    } else if let Some(regions_file) = args.regions {
        eprintln!(
            "Querying regions from {} in {}",
            regions_file.display(),
            args.input.display()
        );
        query_bed_regions(
            source.as_ref(),
            &regions_file,
            args.format,
            &mut output_writer,
        )?;
    }

    output_writer.flush()?;
    eprintln!("Query completed in {:?}", duration_start.elapsed());
    Ok(())
}

fn write_region<W: Write>(
    source: &dyn WigSource,
    chr: &str,
    start: u64,
    stop: u64,
    format: OutputFormat,
    writer: &mut W,
) -> Result<(), WigError> {
    match format {
        OutputFormat::Values => {
            for value in source.values(chr, start, stop)? {
                match value {
                    Some(value) => writeln!(writer, "{}", value)?,
                    None => writeln!(writer, "NaN")?,
                }
            }
        }
        OutputFormat::Fixed => {
            let contig = source.query(chr, start, stop)?;
            write_fixed_region(&contig, start.min(stop), start.max(stop), writer)?;
        }
        OutputFormat::Variable => {
            source.query(chr, start, stop)?.write_variable_step(writer)?;
        }
    }
    Ok(())
}

// Written over the query's own bounds, so leading and trailing gaps come
// out as NaN.
fn write_fixed_region<W: Write>(
    contig: &Contig,
    low: u64,
    high: u64,
    writer: &mut W,
) -> Result<(), WigError> {
    writeln!(writer, "{}", ContigHeader::fixed(&contig.chr, low, 1, 1))?;
    for bp in low..=high {
        match contig.get(bp) {
            Some(value) => writeln!(writer, "{}", value)?,
            None => writeln!(writer, "NaN")?,
        }
    }
    Ok(())
}

fn query_bed_regions<W: Write>(
    source: &dyn WigSource,
    regions_file: &PathBuf,
    format: OutputFormat,
    output_writer: &mut W,
) -> Result<(), WigError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(InputStream::new(regions_file).reader()?);

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );

    let mut num_regions = 0;
    let mut num_skipped = 0;
    for record in reader.records() {
        let record = record?;
        let chrom = record.get(0).ok_or("Missing chrom")?;
        // BED is 0-based half-open
        let start: u64 = record
            .get(1)
            .ok_or("Missing start")?
            .parse()
            .map_err(|_| "Invalid start coordinate")?;
        let end: u64 = record
            .get(2)
            .ok_or("Missing end")?
            .parse()
            .map_err(|_| "Invalid end coordinate")?;
        let crick = record.get(5).map(str::trim) == Some("-");
        if end <= start {
            warn!("skipping empty region {}:{}-{}", chrom, start, end);
            num_skipped += 1;
            continue;
        }

        let (from, to) = if crick {
            (end, start + 1)
        } else {
            (start + 1, end)
        };
        let result = match format {
            OutputFormat::Values => source.values(chrom, from, to).and_then(|values| {
                let values: Vec<String> = values
                    .into_iter()
                    .map(|v| v.map_or_else(|| "NaN".to_string(), |v| v.to_string()))
                    .collect();
                writeln!(
                    output_writer,
                    "{}\t{}\t{}\t{}",
                    chrom,
                    start,
                    end,
                    values.join(",")
                )?;
                Ok(())
            }),
            _ => write_region(source, chrom, from, to, format, output_writer),
        };

        match result {
            Ok(()) => num_regions += 1,
            Err(e) if e.is_recoverable() => {
                warn!("skipping {}:{}-{}: {}", chrom, start, end, e);
                num_skipped += 1;
            }
            Err(e) => {
                progress.finish_and_clear();
                return Err(e);
            }
        }
        progress.set_message(format!("{} regions queried", num_regions));
        progress.tick();
    }

    progress.finish_and_clear();
    eprintln!(
        "{} regions queried, {} skipped.",
        num_regions, num_skipped
    );
    Ok(())
}
