#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `tracer`: serve the curve tracer over a serial link, or run bench sweeps.

mod backend;
mod cli;
mod error_fmt;
mod rt;
mod serve;
mod sweep;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Result, WrapErr, eyre};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

use crate::cli::{Cli, Commands, DEFAULT_CONFIG, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let json = cli.json;
    let _ = JSON_MODE.set(json);
    if !json {
        let _ = color_eyre::install();
    }

    if let Err(e) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("Error: {}", humanize(&e));
            tracing::debug!(error = ?e, "command failed");
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    init_tracing(&cli, &cfg.logging)?;

    match cli.cmd {
        Commands::Serve {
            sim,
            port,
            rt,
            rt_prio,
            rt_lock,
            rt_cpu,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                .map_err(|e| eyre!("install Ctrl-C handler: {e}"))?;
            let rt = serve::RtOptions {
                enabled: rt,
                prio: rt_prio,
                lock: rt_lock,
                cpu: rt_cpu,
            };
            let sweeps = serve::run_serve(&cfg, sim, port.as_deref(), &rt, shutdown)?;
            if cli.json {
                println!("{}", serde_json::json!({ "sweeps": sweeps }));
            } else {
                println!("served {sweeps} sweep(s)");
            }
        }
        Commands::Sweep {
            trace,
            max_points,
            aspect,
        } => {
            let outcome = sweep::run_sweep(&cfg, trace.as_deref(), max_points, aspect)?;
            if cli.json {
                println!("{}", serde_json::to_string(&outcome.report)?);
            } else {
                for line in &outcome.lines {
                    println!("{line}");
                }
            }
        }
        Commands::SelfCheck { sim } => {
            let check = backend::self_check(&cfg, sim)?;
            if cli.json {
                println!("{}", serde_json::to_string(&check)?);
            } else {
                println!("backend: {}", check.backend);
                println!("CH0 (voltage): {}", check.ch0);
                println!("CH1 (current): {}", check.ch1);
                println!("self-check ok");
            }
        }
    }
    Ok(())
}

/// Explicit paths must exist; the default path is optional.
fn load_config(path: Option<&Path>) -> Result<tracer_config::Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = PathBuf::from(DEFAULT_CONFIG);
            if !p.exists() {
                return Ok(tracer_config::Config::default());
            }
            p
        }
    };
    let text = std::fs::read_to_string(&path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = tracer_config::load_toml(&text)
        .wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

type BoxLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Console logs go to stderr so stdout stays clean for reports.
fn init_tracing(cli: &Cli, logging: &tracer_config::Logging) -> Result<()> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let console: BoxLayer = if cli.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter)
            .boxed()
    };
    let mut layers = vec![console];

    if let Some(file) = logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre!("logging.file must name a file: {file}"))?;
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let level = logging.level.as_deref().unwrap_or("info");
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new(level))
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| eyre!("install tracing subscriber: {e}"))
}
