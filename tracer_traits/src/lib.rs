pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Largest value a 12-bit conversion can produce.
pub const ADC_MAX: u16 = 4095;

/// ADC input selector. Channel 0 carries the module voltage, channel 1 the current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Voltage,
    Current,
}

impl Channel {
    /// Single-ended input number on the converter.
    #[inline]
    pub const fn index(self) -> u8 {
        match self {
            Channel::Voltage => 0,
            Channel::Current => 1,
        }
    }
}

pub trait AdcBus {
    /// One chip-select guarded conversion; returns a 12-bit sample.
    fn read_channel(
        &mut self,
        ch: Channel,
    ) -> Result<u16, Box<dyn std::error::Error + Send + Sync>>;
    fn set_clock_divider(
        &mut self,
        divider: u8,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

pub trait Relay {
    /// `true` connects the capacitor and starts the sweep.
    fn set_active(&mut self, active: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Byte-level host link. Reads never block; `Ok(None)` means nothing is pending.
pub trait LinkPort {
    fn read_byte(&mut self) -> Result<Option<u8>, Box<dyn std::error::Error + Send + Sync>>;
    /// Write `line` followed by a line feed.
    fn write_line(&mut self, line: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: AdcBus + ?Sized> AdcBus for Box<T> {
    fn read_channel(
        &mut self,
        ch: Channel,
    ) -> Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_channel(ch)
    }
    fn set_clock_divider(
        &mut self,
        divider: u8,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_clock_divider(divider)
    }
}

impl<T: Relay + ?Sized> Relay for Box<T> {
    fn set_active(&mut self, active: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_active(active)
    }
}

impl<T: LinkPort + ?Sized> LinkPort for Box<T> {
    fn read_byte(&mut self) -> Result<Option<u8>, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_byte()
    }
    fn write_line(&mut self, line: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).write_line(line)
    }
}
