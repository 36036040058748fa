//! Two-channel 12-bit SPI ADC (MCP3202 command set).
//!
//! Each conversion is one 3-byte full-duplex transfer framed by chip select:
//! start bit, single-ended channel command, then a dummy byte that clocks in the
//! low data byte. The upper four data bits arrive in the low nibble of the
//! second response byte.

use tracer_traits::{AdcBus, Channel};
use tracing::{trace, warn};

use crate::error::{HwError, Result};

pub const START_BYTE: u8 = 0x01;
/// Single-ended mode select.
const SGL: u8 = 0x80;
/// MSB-first output format.
const MSBF: u8 = 0x20;

/// Reference clock the divider applies to.
pub const BASE_CLOCK_HZ: u32 = 16_000_000;
pub use tracer_traits::ADC_MAX;

/// Bytes shifted out for a conversion on `ch`.
#[inline]
pub const fn command_frame(ch: Channel) -> [u8; 3] {
    [START_BYTE, SGL | (ch.index() << 6) | MSBF, 0x00]
}

/// Assemble the 12-bit sample from the bytes shifted in.
#[inline]
pub const fn decode_frame(rx: &[u8; 3]) -> u16 {
    (((rx[1] & 0x0F) as u16) << 8) | rx[2] as u16
}

#[inline]
pub const fn is_valid_divider(divider: u8) -> bool {
    divider >= 2 && divider <= 128 && divider.is_power_of_two()
}

/// Raw bus operations. Chip select is driven explicitly by the caller.
pub trait SpiTransport {
    fn select(&mut self) -> Result<()>;
    fn deselect(&mut self) -> Result<()>;
    fn transfer(&mut self, tx: &[u8; 3], rx: &mut [u8; 3]) -> Result<()>;
    fn set_clock_hz(&mut self, hz: u32) -> Result<()>;
}

/// Holds chip select asserted for its lifetime.
struct ChipSelect<'a, T: SpiTransport> {
    bus: &'a mut T,
}

impl<'a, T: SpiTransport> ChipSelect<'a, T> {
    fn acquire(bus: &'a mut T) -> Result<Self> {
        bus.select()?;
        Ok(Self { bus })
    }

    fn transfer(&mut self, tx: &[u8; 3], rx: &mut [u8; 3]) -> Result<()> {
        self.bus.transfer(tx, rx)
    }
}

impl<T: SpiTransport> Drop for ChipSelect<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.bus.deselect() {
            warn!(error = %e, "failed to release ADC chip select");
        }
    }
}

pub struct Mcp3202<T> {
    bus: T,
    divider: u8,
}

impl<T: SpiTransport> Mcp3202<T> {
    pub fn new(mut bus: T, divider: u8) -> Result<Self> {
        if !is_valid_divider(divider) {
            return Err(HwError::InvalidDivider(divider));
        }
        bus.set_clock_hz(BASE_CLOCK_HZ / u32::from(divider))?;
        Ok(Self { bus, divider })
    }

    pub fn read(&mut self, ch: Channel) -> Result<u16> {
        let tx = command_frame(ch);
        let mut rx = [0u8; 3];
        {
            let mut cs = ChipSelect::acquire(&mut self.bus)?;
            cs.transfer(&tx, &mut rx)?;
        }
        let sample = decode_frame(&rx);
        trace!(channel = ch.index(), sample, "adc conversion");
        Ok(sample)
    }

    pub fn set_divider(&mut self, divider: u8) -> Result<()> {
        if !is_valid_divider(divider) {
            return Err(HwError::InvalidDivider(divider));
        }
        self.bus.set_clock_hz(BASE_CLOCK_HZ / u32::from(divider))?;
        self.divider = divider;
        Ok(())
    }

    pub fn divider(&self) -> u8 {
        self.divider
    }

    pub fn into_inner(self) -> T {
        self.bus
    }
}

impl<T: SpiTransport> AdcBus for Mcp3202<T> {
    #[inline]
    fn read_channel(
        &mut self,
        ch: Channel,
    ) -> std::result::Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.read(ch)?)
    }

    fn set_clock_divider(
        &mut self,
        divider: u8,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.set_divider(divider)?)
    }
}
