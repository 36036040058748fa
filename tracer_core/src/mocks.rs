//! Scripted stand-ins for hardware and time, for tests and benches.

use std::cell::Cell;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracer_traits::{AdcBus, Channel, Clock, LinkPort, Relay};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Clock that only moves when slept on or advanced.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Cell<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Cell::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, d: Duration) {
        self.offset.set(self.offset.get() + d);
    }

    pub fn elapsed(&self) -> Duration {
        self.offset.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

/// Per-channel sample queues. An empty queue keeps returning its last value.
#[derive(Debug, Default)]
pub struct ScriptedAdc {
    voltage: VecDeque<u16>,
    current: VecDeque<u16>,
    last: [u16; 2],
    reads: u64,
    fail_at: Option<u64>,
    divider: Option<u8>,
}

impl ScriptedAdc {
    pub fn new(
        voltage: impl IntoIterator<Item = u16>,
        current: impl IntoIterator<Item = u16>,
    ) -> Self {
        Self {
            voltage: voltage.into_iter().collect(),
            current: current.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Constant readings on both channels.
    pub fn constant(voltage: u16, current: u16) -> Self {
        Self {
            last: [voltage, current],
            ..Self::default()
        }
    }

    /// Fail the conversion with this zero-based index, and every one after.
    pub fn fail_at(mut self, read: u64) -> Self {
        self.fail_at = Some(read);
        self
    }

    pub fn push(&mut self, ch: Channel, samples: impl IntoIterator<Item = u16>) {
        match ch {
            Channel::Voltage => self.voltage.extend(samples),
            Channel::Current => self.current.extend(samples),
        }
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    pub fn divider(&self) -> Option<u8> {
        self.divider
    }
}

impl AdcBus for ScriptedAdc {
    fn read_channel(&mut self, ch: Channel) -> Result<u16, BoxError> {
        if self.fail_at.is_some_and(|n| self.reads >= n) {
            return Err(Box::new(std::io::Error::other("scripted adc fault")));
        }
        self.reads += 1;
        let queue = match ch {
            Channel::Voltage => &mut self.voltage,
            Channel::Current => &mut self.current,
        };
        let slot = usize::from(ch.index());
        if let Some(v) = queue.pop_front() {
            self.last[slot] = v;
        }
        Ok(self.last[slot])
    }

    fn set_clock_divider(&mut self, divider: u8) -> Result<(), BoxError> {
        self.divider = Some(divider);
        Ok(())
    }
}

/// Relay that records every transition request.
#[derive(Debug, Default)]
pub struct RecordingRelay {
    history: Vec<bool>,
}

impl RecordingRelay {
    pub fn history(&self) -> &[bool] {
        &self.history
    }

    pub fn is_active(&self) -> bool {
        self.history.last().copied().unwrap_or(false)
    }
}

impl Relay for RecordingRelay {
    fn set_active(&mut self, active: bool) -> Result<(), BoxError> {
        self.history.push(active);
        Ok(())
    }
}

/// Host link replaying a fixed byte script.
///
/// `gap(n)` inserts `n` empty polls. Once the script runs out every read
/// fails, so a test can never wait forever.
#[derive(Debug, Default)]
pub struct ScriptedLink {
    script: VecDeque<Option<u8>>,
    written: Vec<String>,
}

impl ScriptedLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(mut self, text: &str) -> Self {
        self.script
            .extend(text.bytes().chain(std::iter::once(b'\n')).map(Some));
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.script.extend(bytes.iter().copied().map(Some));
        self
    }

    pub fn gap(mut self, polls: usize) -> Self {
        self.script.extend(std::iter::repeat_n(None, polls));
        self
    }

    pub fn written(&self) -> &[String] {
        &self.written
    }

    pub fn is_exhausted(&self) -> bool {
        self.script.is_empty()
    }
}

impl LinkPort for ScriptedLink {
    fn read_byte(&mut self) -> Result<Option<u8>, BoxError> {
        self.script
            .pop_front()
            .ok_or_else(|| "link script exhausted".into())
    }

    fn write_line(&mut self, line: &str) -> Result<(), BoxError> {
        self.written.push(line.to_string());
        Ok(())
    }
}
