//! Sweep configuration store.
//!
//! `AcqConfig` starts from firmware defaults and is only changed by the host
//! during handshake through `Config <NAME> <VALUE>` messages. The tracer takes
//! it by reference for each sweep, so it cannot change mid-sweep.

use serde::Serialize;

use crate::error::ConfigError;
use crate::fixed_point::ADC_MAX;

/// Hard upper bound on stored curve points.
pub const MAX_IV_POINTS_CAPACITY: u16 = 512;

/// Current readings below this many counts are treated as zero current.
pub const NEAR_ZERO_CURRENT_ADC: u16 = 7;

/// Sweep parameter addressable from the host link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConfigParam {
    ClkDiv,
    MaxIvPoints,
    MinIscAdc,
    MaxIscPoll,
    IscStableAdc,
    MaxDiscards,
    AspectHeight,
    AspectWidth,
}

impl ConfigParam {
    pub const ALL: [ConfigParam; 8] = [
        ConfigParam::ClkDiv,
        ConfigParam::MaxIvPoints,
        ConfigParam::MinIscAdc,
        ConfigParam::MaxIscPoll,
        ConfigParam::IscStableAdc,
        ConfigParam::MaxDiscards,
        ConfigParam::AspectHeight,
        ConfigParam::AspectWidth,
    ];

    /// Wire name used in `Config` messages.
    pub const fn name(self) -> &'static str {
        match self {
            ConfigParam::ClkDiv => "CLK_DIV",
            ConfigParam::MaxIvPoints => "MAX_IV_POINTS",
            ConfigParam::MinIscAdc => "MIN_ISC_ADC",
            ConfigParam::MaxIscPoll => "MAX_ISC_POLL",
            ConfigParam::IscStableAdc => "ISC_STABLE_ADC",
            ConfigParam::MaxDiscards => "MAX_DISCARDS",
            ConfigParam::AspectHeight => "ASPECT_HEIGHT",
            ConfigParam::AspectWidth => "ASPECT_WIDTH",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// Result of a well-formed `Config` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOutcome {
    Applied { param: ConfigParam, value: u32 },
    /// Fewer than two fields after the prefix; nothing changed.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcqConfig {
    /// Divider applied to the ADC bus reference clock.
    pub clk_div: u8,
    /// Curve buffer capacity for this sweep.
    pub max_iv_points: u16,
    /// Isc must exceed this before it can be declared stable.
    pub min_isc_adc: u16,
    pub max_isc_poll: u32,
    /// Largest per-sample drop still considered stable.
    pub isc_stable_adc: u16,
    /// Consecutive discards after which the next point is kept regardless.
    pub max_discards: u32,
    pub aspect_height: u8,
    pub aspect_width: u8,
    /// Emergency stop on total conversion pairs in one sweep.
    pub max_measurements: u32,
    pub voc_poll_samples: u16,
    pub zero_poll_samples: u16,
    pub near_zero_current: u16,
}

impl Default for AcqConfig {
    fn default() -> Self {
        Self {
            clk_div: 8,
            max_iv_points: 275,
            min_isc_adc: 100,
            max_isc_poll: 5000,
            isc_stable_adc: 5,
            max_discards: 300,
            aspect_height: 2,
            aspect_width: 3,
            max_measurements: 1_000_000,
            voc_poll_samples: 400,
            zero_poll_samples: 20,
            near_zero_current: NEAR_ZERO_CURRENT_ADC,
        }
    }
}

fn out_of_range(param: ConfigParam, value: u32, expected: &'static str) -> ConfigError {
    ConfigError::OutOfRange {
        param: param.name(),
        value,
        expected,
    }
}

fn check(param: ConfigParam, value: u32) -> Result<(), ConfigError> {
    let adc_max = u32::from(ADC_MAX);
    let ok = match param {
        ConfigParam::ClkDiv => (2..=128).contains(&value) && value.is_power_of_two(),
        ConfigParam::MaxIvPoints => (3..=u32::from(MAX_IV_POINTS_CAPACITY)).contains(&value),
        ConfigParam::MinIscAdc | ConfigParam::IscStableAdc => value <= adc_max,
        ConfigParam::MaxIscPoll | ConfigParam::MaxDiscards => value >= 1,
        ConfigParam::AspectHeight | ConfigParam::AspectWidth => (1..=8).contains(&value),
    };
    if ok {
        return Ok(());
    }
    let expected = match param {
        ConfigParam::ClkDiv => "a power of two in 2..=128",
        ConfigParam::MaxIvPoints => "3..=512",
        ConfigParam::MinIscAdc | ConfigParam::IscStableAdc => "0..=4095",
        ConfigParam::MaxIscPoll | ConfigParam::MaxDiscards => ">= 1",
        ConfigParam::AspectHeight | ConfigParam::AspectWidth => "1..=8",
    };
    Err(out_of_range(param, value, expected))
}

impl AcqConfig {
    pub fn get(&self, param: ConfigParam) -> u32 {
        match param {
            ConfigParam::ClkDiv => u32::from(self.clk_div),
            ConfigParam::MaxIvPoints => u32::from(self.max_iv_points),
            ConfigParam::MinIscAdc => u32::from(self.min_isc_adc),
            ConfigParam::MaxIscPoll => self.max_isc_poll,
            ConfigParam::IscStableAdc => u32::from(self.isc_stable_adc),
            ConfigParam::MaxDiscards => self.max_discards,
            ConfigParam::AspectHeight => u32::from(self.aspect_height),
            ConfigParam::AspectWidth => u32::from(self.aspect_width),
        }
    }

    /// Validated single-parameter update. On error nothing changes.
    pub fn set(&mut self, param: ConfigParam, value: u32) -> Result<(), ConfigError> {
        check(param, value)?;
        // Ranges above guarantee the narrowing casts are lossless.
        match param {
            ConfigParam::ClkDiv => self.clk_div = value as u8,
            ConfigParam::MaxIvPoints => self.max_iv_points = value as u16,
            ConfigParam::MinIscAdc => self.min_isc_adc = value as u16,
            ConfigParam::MaxIscPoll => self.max_isc_poll = value,
            ConfigParam::IscStableAdc => self.isc_stable_adc = value as u16,
            ConfigParam::MaxDiscards => self.max_discards = value,
            ConfigParam::AspectHeight => self.aspect_height = value as u8,
            ConfigParam::AspectWidth => self.aspect_width = value as u8,
        }
        Ok(())
    }

    /// Apply a host message of the form `Config <NAME> <VALUE>`.
    ///
    /// Parsing starts after the first occurrence of `Config`. Extra fields and
    /// unknown names are errors; a missing name or value is ignored.
    pub fn apply_message(&mut self, msg: &str) -> Result<ConfigOutcome, ConfigError> {
        let Some(pos) = msg.find("Config") else {
            return Err(ConfigError::NotConfig);
        };
        let mut fields = msg[pos + "Config".len()..].split_ascii_whitespace();
        let (name, value) = (fields.next(), fields.next());
        if fields.next().is_some() {
            return Err(ConfigError::TooManyFields);
        }
        let (Some(name), Some(value)) = (name, value) else {
            return Ok(ConfigOutcome::Ignored);
        };
        let param = ConfigParam::from_name(name)
            .ok_or_else(|| ConfigError::UnknownParam(name.to_string()))?;
        let parsed = value.parse::<u32>().map_err(|_| ConfigError::BadValue {
            param: param.name(),
            value: value.to_string(),
        })?;
        self.set(param, parsed)?;
        Ok(ConfigOutcome::Applied {
            param,
            value: parsed,
        })
    }

    /// Check every field, including the ones the host cannot set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for param in ConfigParam::ALL {
            check(param, self.get(param))?;
        }
        if self.max_measurements < u32::from(self.max_iv_points) {
            return Err(ConfigError::OutOfRange {
                param: "max_measurements",
                value: self.max_measurements,
                expected: ">= max_iv_points",
            });
        }
        if self.voc_poll_samples == 0 {
            return Err(ConfigError::OutOfRange {
                param: "voc_poll_samples",
                value: 0,
                expected: ">= 1",
            });
        }
        if self.zero_poll_samples == 0 {
            return Err(ConfigError::OutOfRange {
                param: "zero_poll_samples",
                value: 0,
                expected: ">= 1",
            });
        }
        if self.near_zero_current > ADC_MAX {
            return Err(ConfigError::OutOfRange {
                param: "near_zero_current",
                value: u32::from(self.near_zero_current),
                expected: "0..=4095",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        AcqConfig::default().validate().unwrap();
    }

    #[test]
    fn names_round_trip() {
        for p in ConfigParam::ALL {
            assert_eq!(ConfigParam::from_name(p.name()), Some(p));
        }
        assert_eq!(ConfigParam::from_name("clk_div"), None);
    }

    #[test]
    fn config_prefix_may_follow_other_text() {
        let mut cfg = AcqConfig::default();
        let out = cfg.apply_message("xx Config ASPECT_WIDTH 4").unwrap();
        assert_eq!(
            out,
            ConfigOutcome::Applied {
                param: ConfigParam::AspectWidth,
                value: 4
            }
        );
        assert_eq!(cfg.aspect_width, 4);
    }

    #[test]
    fn rejected_update_leaves_value() {
        let mut cfg = AcqConfig::default();
        assert!(cfg.set(ConfigParam::MaxIvPoints, 2).is_err());
        assert_eq!(cfg.max_iv_points, 275);
    }
}
