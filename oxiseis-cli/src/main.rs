//! OxiSeis CLI - SeisPEG compression for seismic traces
//!
//! A Pure Rust command-line front end for the SeisPEG codec.

mod commands;
mod utils;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use commands::{BenchOptions, CompressOptions, cmd_bench, cmd_compress, cmd_decompress, cmd_info};
use oxiseis_seispeg::{ByteOrder, Policy};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "oxiseis")]
#[command(author, version, about = "SeisPEG compression for seismic traces")]
#[command(long_about = "
OxiSeis compresses frames of 32-bit float seismic traces with the SeisPEG
lapped-transform codec.

Raw files hold little-endian f32 samples, trace after trace.

Examples:
  oxiseis compress shot.f32 shot.spg --n1 1500 --n2 240
  oxiseis compress shot.f32 shot.spg --n1 1500 --n2 240 -d 0.05 --policy fastest
  oxiseis decompress shot.spg restored.f32
  oxiseis info shot.spg --json
  oxiseis bench --n1 1000 --n2 120 --frames 16 --parallel

Set OXISEIS_LOG (e.g. OXISEIS_LOG=debug) to control logging.
")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Block-size policy.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Small blocks and 8-point transforms
    Fastest,
    /// Large blocks and 16-point transforms
    Max,
}

impl From<PolicyArg> for Policy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::Fastest => Policy::Fastest,
            PolicyArg::Max => Policy::MaxCompression,
        }
    }
}

/// Byte order of the compressed data.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ByteOrderArg {
    /// Big-endian (JavaSeis default)
    Big,
    /// Little-endian
    Little,
}

impl From<ByteOrderArg> for ByteOrder {
    fn from(o: ByteOrderArg) -> Self {
        match o {
            ByteOrderArg::Big => ByteOrder::BigEndian,
            ByteOrderArg::Little => ByteOrder::LittleEndian,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a raw f32 trace file
    #[command(alias = "c")]
    Compress {
        /// Raw input file
        input: PathBuf,

        /// Compressed output file
        output: PathBuf,

        /// Samples per trace
        #[arg(long)]
        n1: usize,

        /// Traces per frame
        #[arg(long)]
        n2: usize,

        /// Quantization step relative to the block RMS
        #[arg(short, long, default_value_t = 0.1)]
        distortion: f32,

        /// Block-size policy
        #[arg(short, long, value_enum, default_value = "max")]
        policy: PolicyArg,

        /// Byte order of the compressed data
        #[arg(long, value_enum, default_value = "big")]
        byte_order: ByteOrderArg,

        /// Exponent of a t^e gain applied before compression
        #[arg(long, default_value_t = 0.0)]
        gain: f32,

        /// Show a progress bar
        #[arg(long)]
        progress: bool,
    },

    /// Decompress to a raw f32 trace file
    #[command(alias = "x")]
    Decompress {
        /// Compressed input file
        input: PathBuf,

        /// Raw output file
        output: PathBuf,

        /// Show a progress bar
        #[arg(long)]
        progress: bool,
    },

    /// Show information about a compressed file
    #[command(alias = "i")]
    Info {
        /// Compressed file
        input: PathBuf,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },

    /// Benchmark the codec on synthetic frames
    Bench {
        /// Samples per trace
        #[arg(long, default_value_t = 1000)]
        n1: usize,

        /// Traces per frame
        #[arg(long, default_value_t = 120)]
        n2: usize,

        /// Number of frames
        #[arg(long, default_value_t = 8)]
        frames: usize,

        /// Distortions to sweep
        #[arg(
            short,
            long,
            value_delimiter = ',',
            default_value = "0.01,0.05,0.1,0.2"
        )]
        distortion: Vec<f32>,

        /// Block-size policy
        #[arg(short, long, value_enum, default_value = "max")]
        policy: PolicyArg,

        /// Compress frames on all cores
        #[arg(long)]
        parallel: bool,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },
}

/// Install the stderr logger.
///
/// `-v` flags override `OXISEIS_LOG`; without either only warnings show.
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env("OXISEIS_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Compress {
            input,
            output,
            n1,
            n2,
            distortion,
            policy,
            byte_order,
            gain,
            progress,
        } => cmd_compress(
            &input,
            &output,
            &CompressOptions {
                n1,
                n2,
                distortion,
                policy: policy.into(),
                byte_order: byte_order.into(),
                gain,
                progress,
            },
        ),
        Commands::Decompress {
            input,
            output,
            progress,
        } => cmd_decompress(&input, &output, progress),
        Commands::Info { input, json } => cmd_info(&input, json),
        Commands::Bench {
            n1,
            n2,
            frames,
            distortion,
            policy,
            parallel,
            json,
        } => cmd_bench(&BenchOptions {
            n1,
            n2,
            frames,
            distortions: distortion,
            policy: policy.into(),
            parallel,
            json,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
