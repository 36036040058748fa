//! Front-end assembly: the ADC board or the simulated module.

use eyre::Result;
use tracer_config::{Config, Simulator};
use tracer_hardware::sim::{PvParams, SimHandle, SimulatedPvModule, TraceReplay};
use tracer_traits::{AdcBus, Channel, Relay};

pub type BoxAdc = Box<dyn AdcBus>;
pub type BoxRelay = Box<dyn Relay>;

pub fn pv_params(s: &Simulator) -> PvParams {
    PvParams {
        isc_adc: s.isc_adc,
        voc_adc: s.voc_adc,
        knee: s.knee,
        ramp_us: s.ramp_us,
        settle_us: s.settle_us,
        conversion_us: s.conversion_us,
        zero_offset: s.zero_offset,
        noise: s.noise,
    }
}

pub fn simulated(cfg: &Config) -> (BoxAdc, BoxRelay) {
    let (adc, relay) = SimHandle::split(SimulatedPvModule::new(pv_params(&cfg.simulator)));
    (Box::new(adc), Box::new(relay))
}

pub fn replay(rows: &[tracer_config::TraceRow]) -> (BoxAdc, BoxRelay) {
    let rows = rows.iter().map(|r| (r.voltage, r.current)).collect();
    let (adc, relay) = SimHandle::split(TraceReplay::new(rows));
    (Box::new(adc), Box::new(relay))
}

/// The simulated module when `sim` is set, otherwise the SPI board.
pub fn open(cfg: &Config, sim: bool) -> Result<(BoxAdc, BoxRelay)> {
    if sim {
        return Ok(simulated(cfg));
    }
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        let divider = tracer_core::AcqConfig::default().clk_div;
        let (adc, relay) = tracer_hardware::open_board(
            cfg.pins.spi_bus,
            cfg.pins.adc_cs,
            cfg.pins.relay,
            divider,
        )
        .map_err(|e| eyre::eyre!("open adc board: {e}"))?;
        Ok((Box::new(adc), Box::new(relay)))
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        eyre::bail!("built without hardware support; rerun with --sim")
    }
}

/// Both channels read once with the relay open.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct SelfCheck {
    pub backend: &'static str,
    pub ch0: u16,
    pub ch1: u16,
}

pub fn self_check(cfg: &Config, sim: bool) -> Result<SelfCheck> {
    let (mut adc, mut relay) = open(cfg, sim)?;
    relay
        .set_active(false)
        .map_err(|e| eyre::eyre!("open relay: {e}"))?;
    let ch0 = adc
        .read_channel(Channel::Voltage)
        .map_err(|e| eyre::eyre!("read channel 0: {e}"))?;
    let ch1 = adc
        .read_channel(Channel::Current)
        .map_err(|e| eyre::eyre!("read channel 1: {e}"))?;
    Ok(SelfCheck {
        backend: if sim { "sim" } else { "hardware" },
        ch0,
        ch1,
    })
}
