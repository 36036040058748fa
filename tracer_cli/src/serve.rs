//! `tracer serve`: the device loop on a serial port.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use eyre::{Result, WrapErr};
use tracer_config::Config;
use tracer_core::Device;
use tracer_hardware::SerialLink;

use crate::backend;
use crate::cli::RtLock;
use crate::rt::setup_rt_once;

pub struct RtOptions {
    pub enabled: bool,
    pub prio: Option<i32>,
    pub lock: Option<RtLock>,
    pub cpu: Option<usize>,
}

/// Serve sweeps until `shutdown` is raised. Returns the number of sweeps.
pub fn run_serve(
    cfg: &Config,
    sim: bool,
    port: Option<&str>,
    rt: &RtOptions,
    shutdown: Arc<AtomicBool>,
) -> Result<u32> {
    if rt.enabled {
        setup_rt_once(rt.prio, rt.lock.unwrap_or(RtLock::os_default()), rt.cpu);
    }

    let (adc, relay) = backend::open(cfg, sim)?;
    let port = port.unwrap_or(&cfg.link.port);
    let link = SerialLink::open(port, cfg.link.baud)
        .wrap_err_with(|| format!("open serial link {port}"))?;

    let mut device = Device::builder()
        .with_adc(adc)
        .with_relay(relay)
        .with_link(link)
        .with_idle_tick(Duration::from_millis(cfg.link.idle_tick_ms))
        .with_idle_timeout_ticks(cfg.link.idle_timeout_ticks)
        .with_cancel(shutdown)
        .build()?;
    tracing::info!(port, baud = cfg.link.baud, sim, "serving");
    device.run()
}
