//! Acquisition and decimation.
//!
//! The relay is closed and the load capacitor charges from Isc towards Voc.
//! Conversion pairs arrive far faster than the curve needs them, so each new
//! pair is kept only if it is at least `min_distance` (weighted Manhattan
//! distance) from the last kept point. A kept point's current is revised once
//! from the next current sample, because the voltage conversion sits between
//! two current conversions.

use serde::Serialize;
use tracer_traits::{AdcBus, Channel};
use tracing::{debug, trace};

use crate::config::AcqConfig;
use crate::curve::{CurveBuffer, IvPoint};
use crate::error::{CurveError, Result};
use crate::fixed_point::{interpolate_current, manhattan_distance};
use crate::hw_error::hw_report;
use crate::scale::ScaleFactors;
use crate::status::EndReason;

/// Everything the engine needs for one sweep, frozen at sweep start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineParams {
    pub max_points: u16,
    pub max_discards: u32,
    pub max_measurements: u32,
    pub near_zero_current: u16,
    pub scale: ScaleFactors,
    pub min_distance: u16,
}

impl EngineParams {
    pub fn from_config(cfg: &AcqConfig, scale: ScaleFactors, min_distance: u16) -> Self {
        Self {
            max_points: cfg.max_iv_points,
            max_discards: cfg.max_discards,
            max_measurements: cfg.max_measurements,
            near_zero_current: cfg.near_zero_current,
            scale,
            min_distance,
        }
    }
}

/// What happened to one conversion pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Kept at this index.
    Committed(usize),
    Discarded,
    /// Kept, and the sweep is over.
    Done(EndReason),
}

/// Decimation state machine, fed one conversion pair at a time.
#[derive(Debug, Clone)]
pub struct Engine {
    params: EngineParams,
    curve: CurveBuffer,
    prev_raw_current: u16,
    discards: u32,
    measurements: u32,
}

impl Engine {
    /// Commit the first pair unconditionally.
    pub fn start(
        params: EngineParams,
        current: u16,
        voltage: u16,
    ) -> std::result::Result<Self, CurveError> {
        let mut curve = CurveBuffer::with_capacity(usize::from(params.max_points))?;
        curve.push(IvPoint::new(voltage, current))?;
        Ok(Self {
            params,
            curve,
            prev_raw_current: current,
            discards: 0,
            measurements: 1,
        })
    }

    /// Conversion pairs consumed so far, including the first point.
    pub fn measurements(&self) -> u32 {
        self.measurements
    }

    pub fn discards(&self) -> u32 {
        self.discards
    }

    pub fn curve(&self) -> &CurveBuffer {
        &self.curve
    }

    pub fn is_pending(&self) -> bool {
        self.curve.is_pending()
    }

    pub fn at_measurement_limit(&self) -> bool {
        self.measurements >= self.params.max_measurements
    }

    /// Feed one `(current, voltage)` pair, read in that order.
    pub fn step(&mut self, current: u16, voltage: u16) -> std::result::Result<Step, CurveError> {
        self.measurements += 1;
        if self.curve.is_pending() {
            self.curve
                .revise_last_current(interpolate_current(self.prev_raw_current, current))?;
        }
        self.prev_raw_current = current;

        let Some(prev) = self.curve.last().copied() else {
            return Err(CurveError::NotRevisable);
        };
        let distance = manhattan_distance(
            voltage.abs_diff(prev.voltage),
            current.abs_diff(prev.current),
            self.params.scale,
        );

        if distance < self.params.min_distance && self.discards < self.params.max_discards {
            self.curve.seal_last();
            self.discards += 1;
            return Ok(Step::Discarded);
        }

        let index = self.curve.push(IvPoint::new(voltage, current))?;
        self.discards = 0;
        trace!(index, voltage, current, distance, "point kept");

        if self.curve.len() >= usize::from(self.params.max_points) {
            return Ok(Step::Done(EndReason::PointsFull));
        }
        if current < self.params.near_zero_current
            && voltage <= prev.voltage
            && current >= prev.current
        {
            return Ok(Step::Done(EndReason::Flattened));
        }
        Ok(Step::Committed(index))
    }

    /// Apply the last point's pending revision from one trailing current sample.
    pub fn finish(&mut self, current: u16) -> std::result::Result<(), CurveError> {
        if self.curve.is_pending() {
            self.curve
                .revise_last_current(interpolate_current(self.prev_raw_current, current))?;
        }
        Ok(())
    }

    pub fn into_run(self, end: EndReason) -> EngineRun {
        EngineRun {
            measurements: self.measurements,
            end,
            curve: self.curve.into_points(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineRun {
    pub curve: Vec<IvPoint>,
    pub measurements: u32,
    pub end: EndReason,
}

/// Run the acquisition loop to completion. The relay must already be closed.
pub fn run<A: AdcBus + ?Sized>(adc: &mut A, params: EngineParams) -> Result<EngineRun> {
    let current = adc.read_channel(Channel::Current).map_err(hw_report)?;
    let voltage = adc.read_channel(Channel::Voltage).map_err(hw_report)?;
    let mut engine = Engine::start(params, current, voltage)?;

    let end = loop {
        if engine.at_measurement_limit() {
            break EndReason::MeasurementLimit;
        }
        let current = adc.read_channel(Channel::Current).map_err(hw_report)?;
        let voltage = adc.read_channel(Channel::Voltage).map_err(hw_report)?;
        if let Step::Done(reason) = engine.step(current, voltage)? {
            break reason;
        }
    };

    if engine.is_pending() {
        let current = adc.read_channel(Channel::Current).map_err(hw_report)?;
        engine.finish(current)?;
    }
    debug!(
        points = engine.curve().len(),
        measurements = engine.measurements(),
        ?end,
        "acquisition finished"
    );
    Ok(engine.into_run(end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> EngineParams {
        EngineParams {
            max_points: 10,
            max_discards: 3,
            max_measurements: 1000,
            near_zero_current: 7,
            scale: ScaleFactors {
                v_scale: 1,
                i_scale: 1,
            },
            min_distance: 100,
        }
    }

    #[test]
    fn first_pair_is_committed_and_pending() {
        let e = Engine::start(params(), 500, 0).unwrap();
        assert_eq!(e.curve().len(), 1);
        assert!(e.is_pending());
        assert_eq!(e.measurements(), 1);
    }

    #[test]
    fn close_pair_is_discarded_and_seals() {
        let mut e = Engine::start(params(), 500, 0).unwrap();
        assert_eq!(e.step(500, 10).unwrap(), Step::Discarded);
        assert!(!e.is_pending());
        // revision used the next sample: (5*500 + 3*500 + 4) >> 3
        assert_eq!(e.curve().points()[0].current, 500);
    }

    #[test]
    fn distance_is_measured_from_revised_point() {
        let mut e = Engine::start(params(), 800, 0).unwrap();
        // revised to (4000 + 1200 + 4) >> 3 = 650; distance 0 + |400 - 650| = 250
        assert_eq!(e.step(400, 0).unwrap(), Step::Committed(1));
        assert_eq!(e.curve().points()[0].current, 650);
    }

    #[test]
    fn discard_budget_forces_commit() {
        let mut e = Engine::start(params(), 500, 0).unwrap();
        for _ in 0..3 {
            assert_eq!(e.step(500, 1).unwrap(), Step::Discarded);
        }
        assert_eq!(e.step(500, 1).unwrap(), Step::Committed(1));
        assert_eq!(e.discards(), 0);
    }

    #[test]
    fn finish_revises_only_pending_point() {
        let mut e = Engine::start(params(), 800, 0).unwrap();
        e.finish(0).unwrap();
        assert_eq!(e.curve().points()[0].current, 500);
        // second finish is a no-op
        e.finish(800).unwrap();
        assert_eq!(e.curve().points()[0].current, 500);
    }
}
