//! Device control loop: handshake, armed wait, sweep, report.

use tracer_traits::{AdcBus, Clock, LinkPort, MonotonicClock, Relay};
use tracing::{debug, info, warn};

use crate::builder::{DeviceBuilder, Missing};
use crate::config::{AcqConfig, ConfigOutcome, ConfigParam};
use crate::error::{LinkError, Result};
use crate::link::{Idle, LineReader};
use crate::report::SweepReport;
use crate::tracer::Tracer;

pub const READY: &str = "Ready";
pub const CONFIG_PROCESSED: &str = "Config processed";

/// A tracer wired to its host link.
///
/// Built with [`Device::builder`]. The configuration can only change during
/// [`Device::handshake`]; once armed it is fixed for every sweep.
pub struct Device<A, R, L, C = MonotonicClock>
where
    C: Clock,
{
    pub(crate) tracer: Tracer<A, R, C>,
    pub(crate) link: L,
    pub(crate) reader: LineReader<C>,
    pub(crate) config: AcqConfig,
    pub(crate) idle_timeout_ticks: u32,
}

impl Device<Missing, Missing, Missing, MonotonicClock> {
    pub fn builder() -> DeviceBuilder<Missing, Missing, Missing, MonotonicClock> {
        DeviceBuilder::new()
    }
}

impl<A: AdcBus, R: Relay, L: LinkPort, C: Clock> Device<A, R, L, C> {
    pub fn config(&self) -> &AcqConfig {
        &self.config
    }

    pub fn tracer(&self) -> &Tracer<A, R, C> {
        &self.tracer
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    fn send(&mut self, line: &str) -> Result<()> {
        self.link.write_line(line).map_err(|e| {
            match e.downcast::<LinkError>() {
                Ok(link) => *link,
                Err(other) => LinkError::Port(other.to_string()),
            }
        })?;
        Ok(())
    }

    /// Announce `Ready` until the host answers with a line containing it.
    ///
    /// Every pass re-announces. Config lines received meanwhile are applied
    /// and acknowledged. Returns `false` if cancelled first.
    pub fn handshake(&mut self) -> Result<bool> {
        loop {
            if self.reader.is_cancelled() {
                return Ok(false);
            }
            self.send(READY)?;
            match self
                .reader
                .read_line(&mut self.link, Idle::Ticks(self.idle_timeout_ticks))
            {
                Ok(Some(line)) if line.contains(READY) => {
                    info!("handshake complete");
                    return Ok(true);
                }
                Ok(Some(line)) if line.contains("Config") => self.process_config(&line)?,
                Ok(Some(line)) => debug!(%line, "ignored during handshake"),
                Ok(None) => {}
                Err(LinkError::TooLong { .. }) => self.send("ERROR: message too long")?,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Apply one `Config` message and acknowledge it.
    ///
    /// Rejections are reported to the host as an `ERROR:` line; the
    /// acknowledgement is sent either way.
    pub fn process_config(&mut self, line: &str) -> Result<()> {
        match self.config.apply_message(line) {
            Ok(ConfigOutcome::Applied { param, value }) => {
                debug!(param = param.name(), value, "config applied");
                if param == ConfigParam::ClkDiv {
                    let divider = self.config.clk_div;
                    if let Err(e) = self.tracer.set_clock_divider(divider) {
                        warn!(error = %e, divider, "clock divider rejected by adc");
                        self.send(&format!("ERROR: {e}"))?;
                    }
                }
            }
            Ok(ConfigOutcome::Ignored) => debug!(%line, "incomplete config ignored"),
            Err(e) => {
                warn!(error = %e, %line, "config rejected");
                self.send(&format!("ERROR: {e}"))?;
            }
        }
        self.send(CONFIG_PROCESSED)
    }

    /// Block until any line arrives. `None` when cancelled.
    pub fn wait_for_trigger(&mut self) -> Result<Option<String>> {
        loop {
            match self.reader.read_line(&mut self.link, Idle::Unbounded) {
                Ok(line) => return Ok(line),
                Err(LinkError::TooLong { .. }) => self.send("ERROR: message too long")?,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Run one sweep and send its report. A failed sweep is reported to the
    /// host and yields `None`; only link failures are errors here.
    pub fn serve_sweep(&mut self) -> Result<Option<SweepReport>> {
        match self.tracer.sweep(&self.config) {
            Ok(report) => {
                report.write_to(&mut self.link)?;
                Ok(Some(report))
            }
            Err(e) => {
                warn!(error = %e, "sweep failed");
                self.send(&format!("ERROR: sweep failed: {e}"))?;
                Ok(None)
            }
        }
    }

    /// Handshake, then serve a sweep per trigger until cancelled.
    /// Returns the number of completed sweeps.
    pub fn run(&mut self) -> Result<u32> {
        let mut sweeps = 0u32;
        if !self.handshake()? {
            return Ok(sweeps);
        }
        while let Some(trigger) = self.wait_for_trigger()? {
            debug!(%trigger, "sweep triggered");
            if self.serve_sweep()?.is_some() {
                sweeps += 1;
            }
        }
        info!(sweeps, "device loop stopped");
        Ok(sweeps)
    }
}
