//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Config file used when `--config` is not given and the file exists.
pub const DEFAULT_CONFIG: &str = "etc/tracer.toml";

#[derive(Parser, Debug)]
#[command(name = "tracer", version, about = "PV module I-V curve tracer")]
pub struct Cli {
    /// Path to config TOML (defaults to etc/tracer.toml when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results and errors as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

impl RtLock {
    #[inline]
    pub fn os_default() -> Self {
        if cfg!(target_os = "linux") {
            RtLock::Current
        } else {
            RtLock::None
        }
    }
}

/// Plot aspect ratio as `WIDTHxHEIGHT`, each 1..=8.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Aspect {
    pub width: u8,
    pub height: u8,
}

pub fn parse_aspect(s: &str) -> Result<Aspect, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let parse = |v: &str| -> Result<u8, String> {
        match v.trim().parse::<u8>() {
            Ok(n) if (1..=8).contains(&n) => Ok(n),
            _ => Err(format!("aspect values must be 1..=8, got '{v}'")),
        }
    };
    Ok(Aspect {
        width: parse(w)?,
        height: parse(h)?,
    })
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the device loop on the configured serial port until Ctrl-C
    Serve {
        /// Use the simulated PV module instead of the ADC board
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
        /// Override link.port from the config
        #[arg(long, value_name = "PATH")]
        port: Option<String>,
        /// Enable real-time mode (SCHED_FIFO, affinity, mlockall)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable real-time mode on supported OSes.\n\nLinux: Attempts SCHED_FIFO priority, pins to one CPU, and calls mlockall to keep the process resident. This reduces jitter during acquisition but may require CAP_SYS_NICE / CAP_IPC_LOCK or root.\n\nmacOS: Only mlockall is applied."
        )]
        rt: bool,
        /// SCHED_FIFO priority when --rt is enabled (Linux only)
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
        /// Memory locking mode for --rt: none, current, or all
        #[arg(long, value_enum, value_name = "MODE")]
        rt_lock: Option<RtLock>,
        /// CPU index to pin to when --rt is enabled (Linux only, default 0)
        #[arg(long, value_name = "CPU")]
        rt_cpu: Option<usize>,
    },
    /// Run one sweep against the simulator (or a recorded trace) and print the report
    Sweep {
        /// Replay a recorded CSV trace (headers voltage,current)
        #[arg(long, value_name = "FILE.csv")]
        trace: Option<PathBuf>,
        /// Sent to the device as Config MAX_IV_POINTS
        #[arg(
            long,
            value_name = "N",
            value_parser = clap::value_parser!(u16).range(3..=512)
        )]
        max_points: Option<u16>,
        /// Sent to the device as Config ASPECT_WIDTH / ASPECT_HEIGHT
        #[arg(long, value_name = "WxH", value_parser = parse_aspect)]
        aspect: Option<Aspect>,
    },
    /// Read both ADC channels once with the relay open
    SelfCheck {
        /// Use the simulated PV module instead of the ADC board
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
    },
}
