//! Parse a DS9 region file and print the markers it describes.
//!
//! Usage: `ds9reg <file> [--config parser.toml] [--format text|json] [--strict] [--debug]`
//!
//! Coordinates are printed as written; no image is attached. Syntax errors
//! go to stderr and make the exit status 1.

use clap::{Parser, ValueEnum};
use ds9_regions::{parse_regions_with, Error, MemoryFrame, ParserConfig};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "ds9reg")]
#[command(about = "Parse a DS9 region file and list its markers")]
struct Args {
    /// Region file to read
    file: PathBuf,

    /// Parser settings in TOML
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Stop at the first syntax error
    #[arg(long)]
    strict: bool,

    /// Print the parser trace to stderr
    #[arg(long)]
    debug: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(false).with_writer(io::stderr).init();
}

fn run(args: &Args) -> Result<usize, Error> {
    let mut config = match &args.config {
        Some(path) => ParserConfig::load(path)?,
        None => ParserConfig::default(),
    };
    if args.strict {
        config.recover = false;
    }
    if args.debug {
        config.debug_level = 1;
    }

    let text = std::fs::read_to_string(&args.file)
        .map_err(|source| Error::Io { path: args.file.clone(), source })?;
    info!("Parsing {}", args.file.display());

    let mut frame = MemoryFrame::new();
    let mut failures = 0;
    let file = args.file.display().to_string();
    let report = parse_regions_with(&text, &mut frame, &config, |err| {
        failures += 1;
        eprintln!("{}:{}", file, err);
    });
    // errors were already printed by the callback
    if let Err(Error::Syntax(_)) = report {
        return Ok(failures);
    }
    report?;

    let records = frame.records();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let written = match args.format {
        Format::Json => serde_json::to_writer_pretty(&mut out, &records)
            .map_err(io::Error::from)
            .and_then(|()| writeln!(out)),
        Format::Text => records.iter().try_for_each(|record| {
            let geometry = serde_json::to_string(record.marker).map_err(io::Error::from)?;
            writeln!(out, "{}\t{}\tcolor={}", record.marker.shape_name(), geometry, record.style.color)
        }),
    };
    written.map_err(|source| Error::Io { path: PathBuf::from("<stdout>"), source })?;
    Ok(failures)
}

fn main() {
    init_logging();

    let args = Args::parse();

    match run(&args) {
        Ok(0) => {}
        Ok(count) => {
            error!("{} syntax error(s) in {}", count, args.file.display());
            process::exit(1);
        }
        Err(err) => {
            error!("{}", err);
            process::exit(1);
        }
    }
}
