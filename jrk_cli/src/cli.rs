//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Config file read when `--config` is not given. Missing is fine.
pub const DEFAULT_CONFIG: &str = "jrk.toml";

#[derive(Parser, Debug)]
#[command(name = "jrk", version, about = "Configure and monitor jrk motor controllers")]
pub struct Cli {
    /// Path to config TOML (defaults to ./jrk.toml when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results and errors as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Answer yes to every confirmation question
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub yes: bool,

    /// OS id of the device to use when more than one is connected
    #[arg(long, value_name = "OS_ID")]
    pub device: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List connected devices
    List,
    /// Show device status, telemetry and derived settings
    Status,
    /// Poll telemetry on the controller cadence
    Watch {
        /// Stop after this many ticks (runs until Ctrl-C when omitted)
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
        /// Also record every sample to this CSV file
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
    /// Show, save or load device settings
    Settings {
        #[command(subcommand)]
        action: SettingsCmd,
    },
    /// Fix and write the device's current settings back to it
    Apply,
    /// Reload settings from the device
    Reload,
    /// Reset the device's settings to factory defaults
    RestoreDefaults,
    /// Probe the motor to find out whether it is inverted
    DetectDirection {
        /// Write the detected invert setting to the device
        #[arg(long, action = ArgAction::SetTrue)]
        apply: bool,
    },
    /// Set the target (0..=4095)
    Target {
        #[arg(value_parser = clap::value_parser!(u16).range(0..=4095))]
        target: u16,
    },
    /// Stop the motor
    Stop,
    /// Let the motor run again after a stop
    Run,
    /// Print the hard current limit for each recommended code
    CurrentTable {
        /// Product id (1 = 18v27, 2 = 24v21)
        #[arg(long, default_value_t = 1)]
        product: u32,
    },
    /// Convert PID gains to and from the multiplier/exponent encoding
    Pid {
        #[command(subcommand)]
        action: PidCmd,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCmd {
    /// Print the device settings in the settings file format
    Show,
    /// Save the device settings to a file
    Save { file: PathBuf },
    /// Load settings from a file
    Load {
        file: PathBuf,
        /// Write the loaded settings to the device
        #[arg(long, action = ArgAction::SetTrue)]
        apply: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum PidCmd {
    /// Encode a gain as multiplier/exponent
    Encode { gain: f64 },
    /// Decode a multiplier/exponent pair
    Decode {
        #[arg(value_parser = clap::value_parser!(u16).range(0..=1023))]
        multiplier: u16,
        #[arg(value_parser = clap::value_parser!(u8).range(0..=17))]
        exponent: u8,
    },
}
