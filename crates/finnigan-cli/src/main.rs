use anyhow::Context;
use clap::{Parser, Subcommand};
use finnigan::{PeakMode, RawFile};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "finnigan", about = "Finnigan RAW file dump/export CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show file-level information.
    Info { file: PathBuf },

    /// Export a single scan as JSON.
    Scan {
        file: PathBuf,
        #[arg(short, long)]
        number: u32,
        /// Require profile data (error if the scan has none).
        #[arg(long)]
        profile: bool,
    },

    /// Export a scan range as JSON lines.
    Scans {
        file: PathBuf,
        #[arg(long)]
        from: Option<u32>,
        #[arg(long)]
        to: Option<u32>,
        /// Require profile data (error if a scan has none).
        #[arg(long)]
        profile: bool,
        /// Decode scan payloads in parallel.
        #[arg(long)]
        parallel: bool,
    },

    /// Show the scan parameters record for a scan.
    Params {
        file: PathBuf,
        #[arg(short, long)]
        number: u32,
    },

    /// List the file's instrument error log.
    Errors { file: PathBuf },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { file } => {
            let raw = open(&file)?;
            let meta = raw.metadata();
            println!("Version:    v{}", raw.version());
            println!("Acquired:   {}", meta.acquisition_date);
            println!("Instrument: {} (SN {})", meta.instrument_model, meta.instrument_serial);
            println!("Software:   {}", meta.software_version);
            println!("Sample:     {}", meta.sample_name);
            println!(
                "Scans:      {}-{} ({:.2}-{:.2} min)",
                meta.first_scan, meta.last_scan, meta.start_time, meta.end_time
            );
            println!("Mass range: {:.2}-{:.2}", meta.low_mass, meta.high_mass);
            println!("Errors:     {}", raw.error_log().len());
        }

        Commands::Scan {
            file,
            number,
            profile,
        } => {
            let raw = open(&file)?;
            let scan = raw
                .scan_with_mode(number, mode(profile))
                .with_context(|| format!("reading scan {number}"))?;
            print_scan_json(&scan)?;
        }

        Commands::Scans {
            file,
            from,
            to,
            profile,
            parallel,
        } => {
            let raw = open(&file)?;
            let from = from.unwrap_or_else(|| raw.first_scan());
            let to = to.unwrap_or_else(|| raw.last_scan());
            if parallel {
                for scan in raw.read_scans_parallel(from, to, mode(profile))? {
                    print_scan_json(&scan)?;
                }
            } else {
                for scan in raw.scans_with_mode(from, to, mode(profile))? {
                    print_scan_json(&scan?)?;
                }
            }
        }

        Commands::Params { file, number } => {
            let raw = open(&file)?;
            let map = raw.scan_parameters(number)?;
            let mut labels = raw.param_labels();
            labels.retain(|l| !l.is_empty());
            for label in labels {
                if let Some(value) = map.get(&label) {
                    println!("{label}: {value}");
                }
            }
        }

        Commands::Errors { file } => {
            let raw = open(&file)?;
            for entry in raw.error_log() {
                println!("{:8.3} min  {}", entry.time, entry.message);
            }
        }
    }

    Ok(())
}

fn open(path: &PathBuf) -> anyhow::Result<RawFile> {
    RawFile::open_mmap(path).with_context(|| format!("opening {}", path.display()))
}

fn mode(profile: bool) -> PeakMode {
    if profile {
        PeakMode::Profile
    } else {
        PeakMode::Centroid
    }
}

fn print_scan_json(scan: &finnigan::Scan) -> anyhow::Result<()> {
    let peaks = scan.peaks()?;
    let json = serde_json::json!({
        "metadata": scan.metadata,
        "peaks": peaks,
    });
    println!("{}", serde_json::to_string(&json)?);
    Ok(())
}
