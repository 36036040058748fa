#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Launcher configuration and recorded-trace loading for the curve tracer.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated. They
//!   describe the host link, board wiring, logging and the simulated module;
//!   sweep parameters are not here, they start at firmware defaults and are
//!   tuned by the host over the link.
//! - Trace CSV loader enforces headers and ADC ranges for simulator replay.
use serde::Deserialize;
pub use tracer_traits::ADC_MAX;

/// Recorded sweep CSV schema.
///
/// Expected headers:
/// voltage,current
///
/// Example:
/// voltage,current
/// 0,2011
/// 412,1998
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TraceRow {
    pub voltage: u16,
    pub current: u16,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LinkCfg {
    /// Serial device the host is attached to
    pub port: String,
    pub baud: u32,
    /// Delay between polls of an idle link (ms)
    pub idle_tick_ms: u64,
    /// Empty polls tolerated during handshake before re-announcing
    pub idle_timeout_ticks: u32,
}

impl Default for LinkCfg {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud: 57_600,
            idle_tick_ms: 1,
            idle_timeout_ticks: 1000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pins {
    pub spi_bus: u8,
    /// GPIO driven as the ADC chip select
    pub adc_cs: u8,
    /// Relay driver input (active low)
    pub relay: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            spi_bus: 0,
            adc_cs: 25,
            relay: 17,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Simulated module used by `--sim` and the `sweep` command.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Simulator {
    pub isc_adc: f32,
    pub voc_adc: f32,
    pub knee: f32,
    pub ramp_us: f32,
    pub settle_us: f32,
    pub conversion_us: f32,
    pub zero_offset: u16,
    pub noise: u16,
}

impl Default for Simulator {
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

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub link: LinkCfg,
    pub pins: Pins,
    pub logging: Logging,
    pub simulator: Simulator,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Link
        if self.link.port.trim().is_empty() {
            eyre::bail!("link.port must not be empty");
        }
        if self.link.baud == 0 {
            eyre::bail!("link.baud must be > 0");
        }
        if self.link.idle_tick_ms == 0 {
            eyre::bail!("link.idle_tick_ms must be >= 1");
        }
        if self.link.idle_tick_ms > 1000 {
            eyre::bail!("link.idle_tick_ms is unreasonably large (>1s)");
        }
        if self.link.idle_timeout_ticks == 0 {
            eyre::bail!("link.idle_timeout_ticks must be >= 1");
        }

        // Pins
        if self.pins.adc_cs == self.pins.relay {
            eyre::bail!("pins.adc_cs and pins.relay must be different GPIOs");
        }
        if self.pins.spi_bus > 1 {
            eyre::bail!("pins.spi_bus must be 0 or 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        // Simulator
        let s = &self.simulator;
        let adc_max = f32::from(ADC_MAX);
        if !(s.isc_adc > 0.0 && s.isc_adc <= adc_max) {
            eyre::bail!("simulator.isc_adc must be in (0, {ADC_MAX}]");
        }
        if !(s.voc_adc > 0.0 && s.voc_adc <= adc_max) {
            eyre::bail!("simulator.voc_adc must be in (0, {ADC_MAX}]");
        }
        if !(s.knee > 0.0 && s.knee <= 1.0) {
            eyre::bail!("simulator.knee must be in (0.0, 1.0]");
        }
        if !(s.ramp_us > 0.0 && s.ramp_us.is_finite()) {
            eyre::bail!("simulator.ramp_us must be > 0");
        }
        if !(s.settle_us >= 0.0 && s.settle_us.is_finite()) {
            eyre::bail!("simulator.settle_us must be >= 0");
        }
        if !(s.conversion_us > 0.0 && s.conversion_us.is_finite()) {
            eyre::bail!("simulator.conversion_us must be > 0");
        }
        if s.zero_offset >= ADC_MAX {
            eyre::bail!("simulator.zero_offset must be < {ADC_MAX}");
        }

        Ok(())
    }
}

/// Parse a recorded trace from any reader (headers `voltage,current`).
pub fn parse_trace_csv<R: std::io::Read>(reader: R) -> eyre::Result<Vec<TraceRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers: {}", e))?
        .clone();
    let expected = ["voltage", "current"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "trace CSV must have headers 'voltage,current', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<TraceRow>().enumerate() {
        let row = match rec {
            Ok(row) => row,
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        };
        if row.voltage > ADC_MAX || row.current > ADC_MAX {
            eyre::bail!(
                "CSV row {} exceeds the 12-bit ADC range (max {ADC_MAX})",
                idx + 2
            );
        }
        rows.push(row);
    }

    if rows.len() < 2 {
        eyre::bail!("trace requires at least two rows, got {}", rows.len());
    }
    Ok(rows)
}

pub fn load_trace_csv(path: &std::path::Path) -> eyre::Result<Vec<TraceRow>> {
    let file = std::fs::File::open(path)
        .map_err(|e| eyre::eyre!("open trace CSV {:?}: {}", path, e))?;
    parse_trace_csv(file).map_err(|e| eyre::eyre!("{:?}: {}", path, e))
}
