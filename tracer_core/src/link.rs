//! Line framing over a byte-oriented host link.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel as xch;
use tracer_traits::{Clock, LinkPort};
use tracing::{trace, warn};

use crate::error::LinkError;

/// Longest accepted message, excluding the line terminator.
pub const MAX_MSG_LEN: usize = 35;

/// How long `LineReader::read_line` waits through silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idle {
    /// Give up after this many consecutive empty polls.
    Ticks(u32),
    /// Wait until a line arrives or the reader is cancelled.
    Unbounded,
}

/// Assembles LF-terminated messages from a non-blocking `LinkPort`.
pub struct LineReader<C: Clock> {
    clock: C,
    tick: Duration,
    cancel: Option<Arc<AtomicBool>>,
}

impl<C: Clock> LineReader<C> {
    pub fn new(clock: C, tick: Duration) -> Self {
        Self {
            clock,
            tick,
            cancel: None,
        }
    }

    /// Abandon waits (returning `None`) once `flag` is raised.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|f| f.load(Ordering::Relaxed))
    }

    /// Read one message. `Ok(None)` on idle timeout or cancellation.
    ///
    /// Carriage returns are dropped. A message longer than `MAX_MSG_LEN` is
    /// drained up to its terminator and reported as `LinkError::TooLong`.
    pub fn read_line<L: LinkPort + ?Sized>(
        &self,
        link: &mut L,
        idle: Idle,
    ) -> Result<Option<String>, LinkError> {
        let mut buf: Vec<u8> = Vec::with_capacity(MAX_MSG_LEN);
        let mut overflow = false;
        let mut empty_ticks = 0u32;
        loop {
            if self.is_cancelled() {
                return Ok(None);
            }
            let byte = link.read_byte().map_err(port_error)?;
            match byte {
                Some(b'\n') => {
                    if overflow {
                        warn!(max = MAX_MSG_LEN, "oversized message dropped");
                        return Err(LinkError::TooLong { max: MAX_MSG_LEN });
                    }
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    trace!(%line, "rx");
                    return Ok(Some(line));
                }
                Some(b) => {
                    empty_ticks = 0;
                    if b == b'\r' || overflow {
                        continue;
                    }
                    if buf.len() >= MAX_MSG_LEN {
                        overflow = true;
                    } else {
                        buf.push(b);
                    }
                }
                None => {
                    empty_ticks = empty_ticks.saturating_add(1);
                    if matches!(idle, Idle::Ticks(limit) if empty_ticks > limit) {
                        return Ok(None);
                    }
                    self.clock.sleep(self.tick);
                }
            }
        }
    }
}

fn port_error(e: Box<dyn std::error::Error + Send + Sync>) -> LinkError {
    match e.downcast::<LinkError>() {
        Ok(link) => *link,
        Err(other) => LinkError::Port(other.to_string()),
    }
}

/// Device side of an in-process link backed by crossbeam channels.
pub struct ChannelLink {
    rx: xch::Receiver<u8>,
    tx: xch::Sender<String>,
}

/// Host side of a `ChannelLink`. `Send`, so it can drive the device from
/// another thread.
#[derive(Clone)]
pub struct HostEnd {
    tx: xch::Sender<u8>,
    rx: xch::Receiver<String>,
}

/// A connected device/host pair.
pub fn channel_link() -> (ChannelLink, HostEnd) {
    let (host_tx, dev_rx) = xch::unbounded();
    let (dev_tx, host_rx) = xch::unbounded();
    (
        ChannelLink {
            rx: dev_rx,
            tx: dev_tx,
        },
        HostEnd {
            tx: host_tx,
            rx: host_rx,
        },
    )
}

impl LinkPort for ChannelLink {
    fn read_byte(&mut self) -> Result<Option<u8>, Box<dyn std::error::Error + Send + Sync>> {
        match self.rx.try_recv() {
            Ok(b) => Ok(Some(b)),
            Err(xch::TryRecvError::Empty) => Ok(None),
            Err(xch::TryRecvError::Disconnected) => Err(Box::new(LinkError::Disconnected)),
        }
    }

    fn write_line(&mut self, line: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.tx
            .send(line.to_string())
            .map_err(|_| LinkError::Disconnected.into())
    }
}

impl HostEnd {
    /// Send `line` followed by a line feed.
    pub fn send_line(&self, line: &str) -> Result<(), LinkError> {
        for b in line.bytes().chain(std::iter::once(b'\n')) {
            self.tx.send(b).map_err(|_| LinkError::Disconnected)?;
        }
        Ok(())
    }

    pub fn recv_line_timeout(&self, timeout: Duration) -> Result<String, LinkError> {
        self.rx.recv_timeout(timeout).map_err(|e| match e {
            xch::RecvTimeoutError::Timeout => LinkError::Timeout,
            xch::RecvTimeoutError::Disconnected => LinkError::Disconnected,
        })
    }

    /// Collect lines up to and including the first one matching `done`.
    /// `timeout` applies to each line separately.
    pub fn recv_until(
        &self,
        timeout: Duration,
        mut done: impl FnMut(&str) -> bool,
    ) -> Result<Vec<String>, LinkError> {
        let mut lines = Vec::new();
        loop {
            let line = self.recv_line_timeout(timeout)?;
            let finished = done(&line);
            lines.push(line);
            if finished {
                return Ok(lines);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracer_traits::MonotonicClock;

    #[test]
    fn channel_link_frames_lines() {
        let (mut dev, host) = channel_link();
        host.send_line("Ready").unwrap();
        let reader = LineReader::new(MonotonicClock::new(), Duration::ZERO);
        assert_eq!(
            reader.read_line(&mut dev, Idle::Ticks(10)).unwrap().as_deref(),
            Some("Ready")
        );
        dev.write_line("Config processed").unwrap();
        assert_eq!(
            host.recv_line_timeout(Duration::from_millis(100)).unwrap(),
            "Config processed"
        );
    }

    #[test]
    fn dropped_host_disconnects() {
        let (mut dev, host) = channel_link();
        drop(host);
        let reader = LineReader::new(MonotonicClock::new(), Duration::ZERO);
        assert_eq!(
            reader.read_line(&mut dev, Idle::Unbounded),
            Err(LinkError::Disconnected)
        );
    }
}
