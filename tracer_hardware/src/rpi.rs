//! Raspberry Pi bindings (rppal): SPI transport with a manually driven chip
//! select line, and the sweep relay.

use rppal::gpio::{Gpio, OutputPin};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use tracer_traits::Relay;
use tracing::debug;

use crate::error::{HwError, Result};
use crate::mcp3202::SpiTransport;

pub struct RppalSpi {
    spi: Spi,
    cs: OutputPin,
}

impl RppalSpi {
    pub fn new(bus: u8, cs_pin: u8, clock_hz: u32) -> Result<Self> {
        let bus = match bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            other => return Err(HwError::Spi(format!("unsupported SPI bus {other}"))),
        };
        let spi = Spi::new(bus, SlaveSelect::Ss0, clock_hz, Mode::Mode0)
            .map_err(|e| HwError::Spi(e.to_string()))?;
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let mut cs = gpio
            .get(cs_pin)
            .map_err(|e| HwError::Gpio(format!("open adc cs pin {cs_pin}: {e}")))?
            .into_output();
        cs.set_high(); // idle deselected
        debug!(cs_pin, clock_hz, "spi adc transport ready");
        Ok(Self { spi, cs })
    }
}

impl SpiTransport for RppalSpi {
    #[inline]
    fn select(&mut self) -> Result<()> {
        self.cs.set_low();
        Ok(())
    }

    #[inline]
    fn deselect(&mut self) -> Result<()> {
        self.cs.set_high();
        Ok(())
    }

    #[inline]
    fn transfer(&mut self, tx: &[u8; 3], rx: &mut [u8; 3]) -> Result<()> {
        self.spi
            .transfer(rx, tx)
            .map_err(|e| HwError::Spi(e.to_string()))?;
        Ok(())
    }

    fn set_clock_hz(&mut self, hz: u32) -> Result<()> {
        self.spi
            .set_clock_speed(hz)
            .map_err(|e| HwError::Spi(e.to_string()))
    }
}

/// Relay driver input; the board pulls it low to energise the coil.
pub struct GpioRelay {
    pin: OutputPin,
}

impl GpioRelay {
    pub fn new(pin: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let mut pin = gpio
            .get(pin)
            .map_err(|e| HwError::Gpio(format!("open relay pin {pin}: {e}")))?
            .into_output();
        pin.set_high();
        Ok(Self { pin })
    }
}

impl Relay for GpioRelay {
    fn set_active(
        &mut self,
        active: bool,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if active {
            self.pin.set_low();
        } else {
            self.pin.set_high();
        }
        Ok(())
    }
}
