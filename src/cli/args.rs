use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "smn-archive")]
#[command(about = "Archive SwissMetNet station readings and export them as CSV")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(
        short,
        long,
        global = true,
        help = "Configuration file [default: ./smn-archive.toml if present]"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the current ten-minute readings and store them in one batch
    Ingest {
        #[arg(
            short,
            long,
            help = "Read a local CSV file instead of downloading the feed"
        )]
        input: Option<PathBuf>,

        #[arg(short, long, help = "Store directory [default: smninfo]")]
        store: Option<PathBuf>,

        #[arg(long, help = "Where to save the raw download [default: data.csv]")]
        raw_output: Option<PathBuf>,
    },

    /// Export stored observations as CSV
    Export {
        #[arg(short, long, help = "Store directory [default: smninfo]")]
        store: Option<PathBuf>,

        #[arg(short, long, help = "Output CSV file [default: smninfo.csv]")]
        output: Option<PathBuf>,

        #[arg(long, help = "Only export this station code")]
        station: Option<String>,
    },

    /// Print the stored keys and a summary of each record
    Dump {
        #[arg(short, long, help = "Store directory [default: smninfo]")]
        store: Option<PathBuf>,

        #[arg(long, help = "Print one JSON object per record")]
        json: bool,

        #[arg(
            short,
            long,
            default_value = "0",
            help = "Maximum records to print (0 = all records)"
        )]
        limit: usize,
    },
}
