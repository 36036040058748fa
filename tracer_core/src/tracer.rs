//! One complete sweep: open-circuit sampling, Isc, scaling, acquisition.

use tracer_traits::{AdcBus, Clock, MonotonicClock, Relay};
use tracing::{debug, info, warn};

use crate::config::AcqConfig;
use crate::engine::{self, EngineParams};
use crate::error::{Result, TracerError};
use crate::hw_error::hw_report;
use crate::isc::{OpenCircuit, measure_open_circuit, poll_isc};
use crate::report::SweepReport;
use crate::scale::{compute_scale_factors, min_distance};

/// Owns the converter and relay for the duration of the program.
pub struct Tracer<A, R, C = MonotonicClock> {
    adc: A,
    relay: R,
    clock: C,
}

impl<A: AdcBus, R: Relay> Tracer<A, R, MonotonicClock> {
    pub fn new(adc: A, relay: R) -> Self {
        Self::with_clock(adc, relay, MonotonicClock::new())
    }
}

impl<A: AdcBus, R: Relay, C: Clock> Tracer<A, R, C> {
    pub fn with_clock(adc: A, relay: R, clock: C) -> Self {
        Self { adc, relay, clock }
    }

    pub fn set_clock_divider(&mut self, divider: u8) -> Result<()> {
        self.adc.set_clock_divider(divider).map_err(hw_report)?;
        debug!(divider, "adc clock divider set");
        Ok(())
    }

    /// Run one sweep with `cfg`. The relay is opened again before returning,
    /// whether or not the sweep succeeded.
    pub fn sweep(&mut self, cfg: &AcqConfig) -> Result<SweepReport> {
        cfg.validate().map_err(TracerError::from)?;
        self.relay.set_active(false).map_err(hw_report)?;
        let open_circuit = measure_open_circuit(
            &mut self.adc,
            cfg.voc_poll_samples,
            cfg.zero_poll_samples,
        )?;

        self.relay.set_active(true).map_err(hw_report)?;
        let result = self.sweep_closed(cfg, open_circuit);
        let released = self.relay.set_active(false).map_err(hw_report);

        match (result, released) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), released) => {
                if let Err(release_err) = released {
                    warn!(error = %release_err, "relay release failed after sweep error");
                }
                Err(e)
            }
        }
    }

    fn sweep_closed(&mut self, cfg: &AcqConfig, open_circuit: OpenCircuit) -> Result<SweepReport> {
        let isc = poll_isc(
            &mut self.adc,
            cfg.max_isc_poll,
            cfg.isc_stable_adc,
            cfg.min_isc_adc,
        )?;
        let scale = compute_scale_factors(
            isc.isc,
            open_circuit.voc,
            cfg.aspect_width,
            cfg.aspect_height,
        );
        let min_distance = min_distance(isc.isc, open_circuit.voc, scale, cfg.max_iv_points);
        debug!(?scale, min_distance, "scale factors");

        let params = EngineParams::from_config(cfg, scale, min_distance);
        let epoch = self.clock.now();
        let run = engine::run(&mut self.adc, params)?;
        let elapsed_us = self.clock.us_since(epoch);

        info!(
            points = run.curve.len(),
            measurements = run.measurements,
            end = ?run.end,
            elapsed_us,
            "sweep complete"
        );
        Ok(SweepReport {
            open_circuit,
            isc,
            scale,
            min_distance,
            curve: run.curve,
            measurements: run.measurements,
            end: run.end,
            elapsed_us,
        })
    }

    pub fn adc(&self) -> &A {
        &self.adc
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
