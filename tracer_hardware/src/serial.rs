use std::io::{Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracer_traits::LinkPort;

use crate::error::{HwError, Result};

/// Host link over a serial port.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    pub fn open(path: &str, baud: u32) -> Result<Self> {
        let port = serialport::new(path, baud)
            .timeout(Duration::from_millis(10))
            .open()
            .map_err(|e| HwError::Serial(format!("failed to open port '{path}': {e}")))?;
        tracing::info!(path, baud, "serial link open");
        Ok(Self { port })
    }
}

impl LinkPort for SerialLink {
    fn read_byte(
        &mut self,
    ) -> std::result::Result<Option<u8>, Box<dyn std::error::Error + Send + Sync>> {
        let pending = self
            .port
            .bytes_to_read()
            .map_err(|e| HwError::Serial(e.to_string()))?;
        if pending == 0 {
            return Ok(None);
        }
        let mut byte = [0u8; 1];
        match self.port.read(&mut byte) {
            Ok(1) => Ok(Some(byte[0])),
            Ok(_) => Ok(None),
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(Box::new(HwError::Io(e))),
        }
    }

    fn write_line(
        &mut self,
        line: &str,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.port.write_all(line.as_bytes()).map_err(HwError::Io)?;
        self.port.write_all(b"\n").map_err(HwError::Io)?;
        self.port.flush().map_err(HwError::Io)?;
        Ok(())
    }
}
