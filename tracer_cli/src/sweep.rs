//! One-shot sweep: the device runs on this thread, a host thread drives it
//! over an in-process link exactly as a serial host would.

use std::path::Path;
use std::thread;
use std::time::Duration;

use eyre::{Result, WrapErr, bail, eyre};
use tracer_config::Config;
use tracer_core::device::{CONFIG_PROCESSED, READY};
use tracer_core::{Device, HostEnd, LinkError, SweepReport, channel_link};

use crate::backend;
use crate::cli::Aspect;

const OUTPUT_COMPLETE: &str = "Output complete";
const HOST_LINE_TIMEOUT: Duration = Duration::from_secs(30);

/// What the host received, and the report as the device built it.
pub struct SweepOutcome {
    pub lines: Vec<String>,
    pub report: SweepReport,
}

fn overrides(max_points: Option<u16>, aspect: Option<Aspect>) -> Vec<String> {
    let mut msgs = Vec::new();
    if let Some(n) = max_points {
        msgs.push(format!("Config MAX_IV_POINTS {n}"));
    }
    if let Some(a) = aspect {
        msgs.push(format!("Config ASPECT_WIDTH {}", a.width));
        msgs.push(format!("Config ASPECT_HEIGHT {}", a.height));
    }
    msgs
}

fn host_session(host: &HostEnd, config: &[String]) -> Result<Vec<String>> {
    host.recv_until(HOST_LINE_TIMEOUT, |l| l == READY)
        .wrap_err("waiting for device Ready")?;
    for msg in config {
        host.send_line(msg)?;
        let replies = host.recv_until(HOST_LINE_TIMEOUT, |l| l == CONFIG_PROCESSED)?;
        if let Some(err) = replies.iter().find(|l| l.starts_with("ERROR:")) {
            bail!("device rejected '{msg}': {err}");
        }
    }
    host.send_line(READY)?;
    host.send_line("Go")?;
    let lines = host.recv_until(HOST_LINE_TIMEOUT, |l| {
        l == OUTPUT_COMPLETE || l.starts_with("ERROR: sweep failed")
    })?;
    // Ready may have been re-announced before the handshake reply landed.
    Ok(lines.into_iter().filter(|l| l != READY).collect())
}

pub fn run_sweep(
    cfg: &Config,
    trace: Option<&Path>,
    max_points: Option<u16>,
    aspect: Option<Aspect>,
) -> Result<SweepOutcome> {
    let (adc, relay) = match trace {
        Some(path) => backend::replay(&tracer_config::load_trace_csv(path)?),
        None => backend::simulated(cfg),
    };

    let (link, host) = channel_link();
    let config = overrides(max_points, aspect);
    let host_thread = thread::spawn(move || host_session(&host, &config));

    let mut device = Device::builder()
        .with_adc(adc)
        .with_relay(relay)
        .with_link(link)
        .with_idle_tick(Duration::from_millis(cfg.link.idle_tick_ms))
        .with_idle_timeout_ticks(cfg.link.idle_timeout_ticks)
        .build()?;
    let served = serve_once(&mut device);
    // Dropping the device disconnects a host still waiting for lines.
    drop(device);

    let host_result = host_thread
        .join()
        .map_err(|_| eyre!("host thread panicked"))?;
    // A device that lost its host reports the host's failure instead.
    let served = match served {
        Err(e) if is_disconnect(&e) => {
            host_result?;
            return Err(e);
        }
        other => other?,
    };
    let lines = host_result?;
    let report = served.ok_or_else(|| {
        let reason = lines
            .iter()
            .rev()
            .find(|l| l.starts_with("ERROR:"))
            .cloned()
            .unwrap_or_else(|| "no report".to_string());
        eyre!("sweep failed on device: {reason}")
    })?;
    Ok(SweepOutcome { lines, report })
}

fn is_disconnect(e: &eyre::Report) -> bool {
    matches!(e.downcast_ref::<LinkError>(), Some(LinkError::Disconnected))
}

fn serve_once<A, R, L>(device: &mut Device<A, R, L>) -> Result<Option<SweepReport>>
where
    A: tracer_traits::AdcBus,
    R: tracer_traits::Relay,
    L: tracer_traits::LinkPort,
{
    if !device.handshake()? {
        bail!("cancelled before handshake completed");
    }
    if device.wait_for_trigger()?.is_none() {
        bail!("cancelled before sweep was triggered");
    }
    device.serve_sweep()
}
