//! Hardware access for the curve tracer: ADC framing, relay, host serial link
//! and simulated front ends for bench work without a module attached.

pub mod error;
pub mod mcp3202;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod rpi;
pub mod serial;
pub mod sim;

pub use error::HwError;
pub use mcp3202::{Mcp3202, SpiTransport};
pub use serial::SerialLink;
pub use sim::{PvParams, SimHandle, SimModel, SimulatedPvModule, TraceReplay};

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use rpi::{GpioRelay, RppalSpi};

/// Open the SPI ADC and relay on a Raspberry Pi.
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn open_board(
    spi_bus: u8,
    adc_cs_pin: u8,
    relay_pin: u8,
    clock_divider: u8,
) -> error::Result<(Mcp3202<RppalSpi>, GpioRelay)> {
    let spi = RppalSpi::new(
        spi_bus,
        adc_cs_pin,
        mcp3202::BASE_CLOCK_HZ / u32::from(clock_divider.max(1)),
    )?;
    let adc = Mcp3202::new(spi, clock_divider)?;
    let relay = GpioRelay::new(relay_pin)?;
    tracing::info!(
        spi_bus,
        adc_cs_pin,
        relay_pin,
        clock_divider,
        "board opened"
    );
    Ok((adc, relay))
}
