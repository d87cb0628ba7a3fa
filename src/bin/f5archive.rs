use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use f5archive::error::exit_code;
use f5archive::{Archive, ArchiveError, ArchiveHeader, FillOutcome, Source};

#[derive(Parser, Debug)]
#[command(version, about = "Spread a payload across an ordered set of JPEG covers using matrix-embedded F5", long_about = None)]
#[command(propagate_version = true)]
struct CliArgs {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Embed a payload across an ordered list of JPEG covers.
    Pack(PackArgs),
    /// Recover a payload from an archive header plus its matching covers.
    Unpack(UnpackArgs),
    /// Report coefficient capacity and the rate `pack` would auto-select.
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
struct PackArgs {
    /// Ordered list of JPEG cover files (mutated in place).
    #[arg(required = true)]
    covers: Vec<PathBuf>,

    /// File whose bytes are the payload to hide.
    #[arg(short = 'd', long = "data", value_name = "payload file", required = true)]
    payload: PathBuf,

    /// Where to write the archive header (rate, payload length, manifest).
    #[arg(short = 'o', long = "out", value_name = "header file", required = true)]
    header_out: PathBuf,

    /// Explicit embedding rate (1-24). Auto-selected from capacity if unset.
    #[arg(short = 'k', long, value_parser = clap::value_parser!(u8).range(1..=24))]
    rate: Option<u8>,
}

#[derive(Args, Debug)]
struct UnpackArgs {
    /// Archive header written by `pack`.
    #[arg(short = 'a', long = "archive", value_name = "header file", required = true)]
    header: PathBuf,

    /// Candidate JPEG files to match against the header's manifest, in any
    /// order; each is bound to its slot by content fingerprint.
    #[arg(required = true)]
    candidates: Vec<PathBuf>,

    /// Where to write the recovered payload bytes.
    #[arg(short = 'o', long = "out", value_name = "payload file", required = true)]
    payload_out: PathBuf,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// JPEG cover files to scan.
    #[arg(required = true)]
    covers: Vec<PathBuf>,

    /// Hypothetical payload size in bytes, to show the rate `pack` would pick.
    #[arg(long, value_name = "bytes", default_value_t = 0)]
    payload_size: u64,
}

fn main() -> ExitCode {
    env_logger::init();

    let args = CliArgs::parse();
    let result = match args.command {
        Commands::Pack(args) => run_pack(args),
        Commands::Unpack(args) => run_unpack(args),
        Commands::Analyze(args) => run_analyze(args),
    };

    match result {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("f5archive: {err}");
            ExitCode::from((-err.exit_code()) as u8)
        }
    }
}

fn run_pack(args: PackArgs) -> Result<i32, ArchiveError> {
    let payload = fs::read(&args.payload)?;

    let mut archive = Archive::new();
    for cover in &args.covers {
        archive.append_file(cover.clone());
    }
    if let Some(k) = args.rate {
        archive.set_k(k);
    }

    archive.pack(&payload)?;

    let header = ArchiveHeader::new(archive.meta().k, archive.meta().msg_size, archive.export_order_used()?);
    fs::write(&args.header_out, header.to_bytes())?;

    log::info!("packed {} bytes across {} of {} covers at k={}", payload.len(), archive.used(), archive.size(), archive.meta().k);

    Ok(exit_code::OK)
}

fn run_unpack(args: UnpackArgs) -> Result<i32, ArchiveError> {
    let header_bytes = fs::read(&args.header)?;
    let header = ArchiveHeader::from_bytes(&header_bytes)?;

    let mut archive = Archive::new();
    archive.import_order(&header.order)?;
    archive.set_k(header.k);
    archive.set_msg_size(header.msg_size);

    for candidate in &args.candidates {
        match archive.fill_by_hash(Source::File(candidate.clone()))? {
            FillOutcome::Complete => break,
            FillOutcome::Filled => {}
            FillOutcome::NotFound => {
                log::warn!("{} does not match any manifest slot", candidate.display());
            }
        }
    }

    if archive.filled() != archive.size() {
        return Err(ArchiveError::NotComplete { filled: archive.filled(), size: archive.size() });
    }

    let payload = archive.unpack()?;
    fs::write(&args.payload_out, &payload)?;

    Ok(exit_code::OK)
}

fn run_analyze(args: AnalyzeArgs) -> Result<i32, ArchiveError> {
    let mut archive = Archive::new();
    for cover in &args.covers {
        archive.append_file(cover.clone());
    }

    archive.analyze()?;
    let capacity = archive.capacity();
    println!("full={} shrinkable={}", capacity.full, capacity.shrinkable);

    if args.payload_size > 0 {
        let k = f5archive::calc_k(&capacity, args.payload_size);
        println!("suggested k={} for a {}-byte payload", k, args.payload_size);
    }

    Ok(exit_code::OK)
}
