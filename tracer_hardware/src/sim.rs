//! Simulated front ends.
//!
//! A model is shared between an ADC handle and a relay handle (the tracer owns
//! them separately, the physical board has one state). Every conversion
//! advances simulated time by one conversion period once the relay is closed.

use std::cell::RefCell;
use std::rc::Rc;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro128PlusPlus;
use tracer_traits::{ADC_MAX, AdcBus, Channel, Relay};

use crate::mcp3202::is_valid_divider;

const NOISE_SEED: u64 = 0x2545_F491;

pub trait SimModel {
    fn sample(&mut self, ch: Channel) -> u16;
    fn set_relay(&mut self, active: bool);
    fn set_clock_divider(&mut self, _divider: u8) {}
}

/// Cloneable handle to a shared model; implements both `AdcBus` and `Relay`.
pub struct SimHandle<M> {
    model: Rc<RefCell<M>>,
}

impl<M> Clone for SimHandle<M> {
    fn clone(&self) -> Self {
        Self {
            model: Rc::clone(&self.model),
        }
    }
}

impl<M: SimModel> SimHandle<M> {
    pub fn new(model: M) -> Self {
        Self {
            model: Rc::new(RefCell::new(model)),
        }
    }

    /// ADC and relay handles sharing one model.
    pub fn split(model: M) -> (Self, Self) {
        let adc = Self::new(model);
        let relay = adc.clone();
        (adc, relay)
    }

    pub fn with_model<R>(&self, f: impl FnOnce(&M) -> R) -> R {
        f(&self.model.borrow())
    }
}

impl<M: SimModel> AdcBus for SimHandle<M> {
    #[inline]
    fn read_channel(
        &mut self,
        ch: Channel,
    ) -> Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.model.borrow_mut().sample(ch).min(ADC_MAX))
    }

    fn set_clock_divider(
        &mut self,
        divider: u8,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !is_valid_divider(divider) {
            return Err(Box::new(crate::error::HwError::InvalidDivider(divider)));
        }
        self.model.borrow_mut().set_clock_divider(divider);
        Ok(())
    }
}

impl<M: SimModel> Relay for SimHandle<M> {
    fn set_active(&mut self, active: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.model.borrow_mut().set_relay(active);
        Ok(())
    }
}

/// Parameters of the simulated module, all in ADC counts / microseconds.
#[derive(Debug, Clone)]
pub struct PvParams {
    pub isc_adc: f32,
    pub voc_adc: f32,
    /// Diode curvature, as a fraction of Voc (smaller = sharper knee).
    pub knee: f32,
    /// Time to charge the load capacitor to roughly Voc at constant Isc.
    pub ramp_us: f32,
    /// Relay contact settling time constant.
    pub settle_us: f32,
    /// Duration of one conversion at the default clock divider.
    pub conversion_us: f32,
    /// Current channel reading with no current flowing.
    pub zero_offset: u16,
    /// Noise amplitude in counts; each conversion is offset uniformly by
    /// up to `±noise` (0 disables).
    pub noise: u16,
}

impl Default for PvParams {
    fn default() -> Self {
        Self {
            isc_adc: 2000.0,
            voc_adc: 3000.0,
            knee: 0.06,
            ramp_us: 60_000.0,
            settle_us: 40.0,
            conversion_us: 10.0,
            zero_offset: 2,
            noise: 0,
        }
    }
}

/// Single-diode module discharging into a capacitor.
#[derive(Debug)]
pub struct SimulatedPvModule {
    params: PvParams,
    relay_active: bool,
    elapsed_us: f32,
    cap_v: f32,
    divider: u8,
    rng: Xoshiro128PlusPlus,
    conversions: u64,
}

impl SimulatedPvModule {
    pub fn new(params: PvParams) -> Self {
        Self {
            params,
            relay_active: false,
            elapsed_us: 0.0,
            cap_v: 0.0,
            divider: 8,
            rng: Xoshiro128PlusPlus::seed_from_u64(NOISE_SEED),
            conversions: 0,
        }
    }

    pub fn conversions(&self) -> u64 {
        self.conversions
    }

    pub fn relay_active(&self) -> bool {
        self.relay_active
    }

    pub fn clock_divider(&self) -> u8 {
        self.divider
    }

    /// Module current at voltage `v`, before relay settling.
    fn module_current(&self, v: f32) -> f32 {
        let p = &self.params;
        let a = (p.knee * p.voc_adc).max(1.0);
        let denom = (p.voc_adc / a).exp() - 1.0;
        let i = p.isc_adc * (1.0 - ((v / a).exp() - 1.0) / denom);
        i.max(0.0)
    }

    fn step(&mut self) {
        let dt = self.params.conversion_us * f32::from(self.divider) / 8.0;
        let i = self.module_current(self.cap_v);
        self.cap_v += i / self.params.isc_adc * self.params.voc_adc / self.params.ramp_us * dt;
        self.cap_v = self.cap_v.min(self.params.voc_adc);
        self.elapsed_us += dt;
    }

    fn noise(&mut self) -> i32 {
        if self.params.noise == 0 {
            return 0;
        }
        let n = i32::from(self.params.noise);
        self.rng.gen_range(-n..=n)
    }

    fn quantize(&mut self, value: f32) -> u16 {
        let n = self.noise();
        (value.round() as i32 + n).clamp(0, i32::from(ADC_MAX)) as u16
    }
}

impl SimModel for SimulatedPvModule {
    fn sample(&mut self, ch: Channel) -> u16 {
        self.conversions += 1;
        let zero = f32::from(self.params.zero_offset);
        if !self.relay_active {
            return match ch {
                Channel::Voltage => self.quantize(self.params.voc_adc),
                Channel::Current => self.quantize(zero),
            };
        }
        self.step();
        match ch {
            Channel::Voltage => self.quantize(self.cap_v),
            Channel::Current => {
                let settle = 1.0 - (-self.elapsed_us / self.params.settle_us.max(1.0)).exp();
                let i = self.module_current(self.cap_v) * settle;
                self.quantize(i + zero)
            }
        }
    }

    fn set_relay(&mut self, active: bool) {
        if active && !self.relay_active {
            self.elapsed_us = 0.0;
            self.cap_v = 0.0;
        }
        self.relay_active = active;
    }

    fn set_clock_divider(&mut self, divider: u8) {
        self.divider = divider;
    }
}

/// Replays a recorded `(voltage, current)` trace.
///
/// With the relay open the voltage channel reports the trace maximum and the
/// current channel the trace minimum. Once closed, each current conversion
/// advances to the next row and the voltage conversion reports that row.
#[derive(Debug)]
pub struct TraceReplay {
    rows: Vec<(u16, u16)>,
    pos: usize,
    started: bool,
    relay_active: bool,
}

impl TraceReplay {
    pub fn new(rows: Vec<(u16, u16)>) -> Self {
        Self {
            rows,
            pos: 0,
            started: false,
            relay_active: false,
        }
    }

    fn row(&self) -> (u16, u16) {
        self.rows
            .get(self.pos)
            .or(self.rows.last())
            .copied()
            .unwrap_or((0, 0))
    }
}

impl SimModel for TraceReplay {
    fn sample(&mut self, ch: Channel) -> u16 {
        if !self.relay_active {
            return match ch {
                Channel::Voltage => self.rows.iter().map(|r| r.0).max().unwrap_or(0),
                Channel::Current => self.rows.iter().map(|r| r.1).min().unwrap_or(0),
            };
        }
        match ch {
            Channel::Current => {
                if self.started {
                    self.pos = (self.pos + 1).min(self.rows.len().saturating_sub(1));
                }
                self.started = true;
                self.row().1
            }
            Channel::Voltage => self.row().0,
        }
    }

    fn set_relay(&mut self, active: bool) {
        if active && !self.relay_active {
            self.pos = 0;
            self.started = false;
        }
        self.relay_active = active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_circuit_reports_voc_and_zero_current() {
        let (mut adc, _relay) = SimHandle::split(SimulatedPvModule::new(PvParams::default()));
        assert_eq!(adc.read_channel(Channel::Voltage).unwrap(), 3000);
        assert_eq!(adc.read_channel(Channel::Current).unwrap(), 2);
    }

    #[test]
    fn noise_is_centred_for_odd_amplitude() {
        let params = PvParams {
            noise: 3,
            ..PvParams::default()
        };
        let (mut adc, _relay) = SimHandle::split(SimulatedPvModule::new(params));
        let reads = 100_000u32;
        let (mut min, mut max, mut sum) = (u16::MAX, 0u16, 0u64);
        for _ in 0..reads {
            let v = adc.read_channel(Channel::Voltage).unwrap();
            min = min.min(v);
            max = max.max(v);
            sum += u64::from(v);
        }
        let mean = sum as f64 / f64::from(reads);
        assert_eq!((min, max), (2997, 3003));
        assert!((mean - 3000.0).abs() < 0.1, "biased mean {mean}");
    }

    #[test]
    fn closed_relay_sweeps_towards_voc() {
        let (mut adc, mut relay) = SimHandle::split(SimulatedPvModule::new(PvParams::default()));
        relay.set_active(true).unwrap();
        let mut last_v = 0;
        for _ in 0..20_000 {
            let _ = adc.read_channel(Channel::Current).unwrap();
            let v = adc.read_channel(Channel::Voltage).unwrap();
            assert!(v >= last_v, "voltage must not decrease without noise");
            last_v = v;
        }
        assert!(last_v > 2900, "expected near Voc, got {last_v}");
        let i = adc.read_channel(Channel::Current).unwrap();
        assert!(i < 10, "current should collapse near Voc, got {i}");
    }

    #[test]
    fn relay_handle_shares_state() {
        let (adc, mut relay) = SimHandle::split(SimulatedPvModule::new(PvParams::default()));
        relay.set_active(true).unwrap();
        assert!(adc.with_model(|m| m.relay_active()));
    }

    #[test]
    fn trace_replay_steps_on_current_reads() {
        let trace = TraceReplay::new(vec![(0, 900), (10, 890), (20, 880)]);
        let (mut adc, mut relay) = SimHandle::split(trace);
        assert_eq!(adc.read_channel(Channel::Voltage).unwrap(), 20);
        assert_eq!(adc.read_channel(Channel::Current).unwrap(), 880);
        relay.set_active(true).unwrap();
        assert_eq!(adc.read_channel(Channel::Current).unwrap(), 900);
        assert_eq!(adc.read_channel(Channel::Voltage).unwrap(), 0);
        assert_eq!(adc.read_channel(Channel::Current).unwrap(), 890);
        assert_eq!(adc.read_channel(Channel::Current).unwrap(), 880);
        assert_eq!(adc.read_channel(Channel::Current).unwrap(), 880);
    }

    #[test]
    fn sim_rejects_bad_divider() {
        let (mut adc, _) = SimHandle::split(SimulatedPvModule::new(PvParams::default()));
        assert!(adc.set_clock_divider(6).is_err());
        adc.set_clock_divider(16).unwrap();
        assert_eq!(adc.with_model(|m| m.clock_divider()), 16);
    }
}
