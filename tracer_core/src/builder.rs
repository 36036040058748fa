//! Type-state builder for `Device`.
//!
//! `build()` only exists once an ADC, a relay and a link have been supplied.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use tracer_traits::{AdcBus, Clock, LinkPort, MonotonicClock, Relay};

use crate::config::AcqConfig;
use crate::device::Device;
use crate::error::{BuildError, Result};
use crate::link::LineReader;
use crate::tracer::Tracer;

/// Placeholder for a part not yet supplied.
pub struct Missing;

pub struct DeviceBuilder<A, R, L, C> {
    adc: A,
    relay: R,
    link: L,
    clock: C,
    config: AcqConfig,
    idle_tick: Duration,
    idle_timeout_ticks: u32,
    cancel: Option<Arc<AtomicBool>>,
}

impl DeviceBuilder<Missing, Missing, Missing, MonotonicClock> {
    pub fn new() -> Self {
        Self {
            adc: Missing,
            relay: Missing,
            link: Missing,
            clock: MonotonicClock::new(),
            config: AcqConfig::default(),
            idle_tick: Duration::from_millis(1),
            idle_timeout_ticks: 1000,
            cancel: None,
        }
    }
}

impl Default for DeviceBuilder<Missing, Missing, Missing, MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R, L, C> DeviceBuilder<A, R, L, C> {
    pub fn with_adc<A2: AdcBus>(self, adc: A2) -> DeviceBuilder<A2, R, L, C> {
        DeviceBuilder {
            adc,
            relay: self.relay,
            link: self.link,
            clock: self.clock,
            config: self.config,
            idle_tick: self.idle_tick,
            idle_timeout_ticks: self.idle_timeout_ticks,
            cancel: self.cancel,
        }
    }

    pub fn with_relay<R2: Relay>(self, relay: R2) -> DeviceBuilder<A, R2, L, C> {
        DeviceBuilder {
            adc: self.adc,
            relay,
            link: self.link,
            clock: self.clock,
            config: self.config,
            idle_tick: self.idle_tick,
            idle_timeout_ticks: self.idle_timeout_ticks,
            cancel: self.cancel,
        }
    }

    pub fn with_link<L2: LinkPort>(self, link: L2) -> DeviceBuilder<A, R, L2, C> {
        DeviceBuilder {
            adc: self.adc,
            relay: self.relay,
            link,
            clock: self.clock,
            config: self.config,
            idle_tick: self.idle_tick,
            idle_timeout_ticks: self.idle_timeout_ticks,
            cancel: self.cancel,
        }
    }

    /// Replace the default `MonotonicClock`. The clock is shared by sweep
    /// timing and link polling, hence `Clone`.
    pub fn with_clock<C2: Clock + Clone>(self, clock: C2) -> DeviceBuilder<A, R, L, C2> {
        DeviceBuilder {
            adc: self.adc,
            relay: self.relay,
            link: self.link,
            clock,
            config: self.config,
            idle_tick: self.idle_tick,
            idle_timeout_ticks: self.idle_timeout_ticks,
            cancel: self.cancel,
        }
    }

    pub fn with_config(mut self, config: AcqConfig) -> Self {
        self.config = config;
        self
    }

    /// Sleep between empty link polls.
    pub fn with_idle_tick(mut self, tick: Duration) -> Self {
        self.idle_tick = tick;
        self
    }

    /// Empty polls before the handshake re-announces itself.
    pub fn with_idle_timeout_ticks(mut self, ticks: u32) -> Self {
        self.idle_timeout_ticks = ticks;
        self
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }
}

impl<A, R, L, C> DeviceBuilder<A, R, L, C>
where
    A: AdcBus,
    R: Relay,
    L: LinkPort,
    C: Clock + Clone,
{
    /// Validate the configuration and program the ADC clock divider.
    pub fn build(self) -> Result<Device<A, R, L, C>> {
        self.config
            .validate()
            .map_err(|e| BuildError::InvalidConfig(e.to_string()))?;
        if self.idle_timeout_ticks == 0 {
            return Err(eyre::Report::new(BuildError::InvalidLinkTiming(
                "idle timeout must be at least one tick",
            )));
        }

        let mut reader = LineReader::new(self.clock.clone(), self.idle_tick);
        if let Some(flag) = self.cancel {
            reader = reader.with_cancel(flag);
        }
        let mut tracer = Tracer::with_clock(self.adc, self.relay, self.clock);
        tracer
            .set_clock_divider(self.config.clk_div)
            .map_err(|e| BuildError::Hardware(e.to_string()))?;

        Ok(Device {
            tracer,
            link: self.link,
            reader,
            config: self.config,
            idle_timeout_ticks: self.idle_timeout_ticks,
        })
    }
}
