//! Human-readable error descriptions and structured JSON error formatting.

use tracer_core::error::{BuildError, ConfigError, LinkError, TracerError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid sweep configuration ({msg}).\nLikely causes: A parameter outside its allowed range.\nHow to fix: Check the values sent with Config messages or CLI flags."
            ),
            BuildError::InvalidLinkTiming(msg) => format!(
                "What happened: Invalid link timing ({msg}).\nLikely causes: link.idle_timeout_ticks set to 0.\nHow to fix: Set [link] idle_tick_ms and idle_timeout_ticks to at least 1."
            ),
            BuildError::Hardware(msg) => format!(
                "What happened: The ADC rejected its initial setup ({msg}).\nLikely causes: SPI bus unavailable or unsupported clock divider.\nHow to fix: Verify SPI is enabled and [pins] matches the wiring."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<TracerError>() {
        return match te {
            TracerError::Timeout => "What happened: ADC conversion timed out.\nLikely causes: MCP3202 not powered or chip select wired to the wrong GPIO.\nHow to fix: Check 3.3V/GND and pins.adc_cs, then rerun self-check.".to_string(),
            TracerError::Hardware(msg) | TracerError::HardwareFault(msg) => format!(
                "What happened: Hardware fault during the sweep ({msg}).\nLikely causes: Loose wiring, SPI/GPIO permissions, or a relay driver fault.\nHow to fix: Run `tracer self-check` and verify the [pins] section."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(le) = err.downcast_ref::<LinkError>() {
        return match le {
            LinkError::Disconnected => "What happened: The host link closed.\nLikely causes: USB serial cable unplugged or the host program exited.\nHow to fix: Reconnect and restart `tracer serve`.".to_string(),
            other => format!(
                "What happened: Host link error ({other}).\nLikely causes: Wrong port or baud rate, or the port is in use.\nHow to fix: Check [link] port/baud or pass --port."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<ConfigError>() {
        return format!(
            "What happened: Sweep parameter rejected ({ce}).\nLikely causes: Unknown name or out-of-range value.\nHow to fix: See the Config message reference for accepted names and ranges."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("serial link") || lower.contains("failed to open port") {
        return format!(
            "What happened: Could not open the serial port.\nLikely causes: Wrong link.port, missing permissions (dialout group), or port busy.\nHow to fix: Check the device path and permissions. Original: {msg}"
        );
    }

    if lower.contains("without hardware support") {
        return "What happened: This binary has no ADC board support.\nLikely causes: Built without the `hardware` feature or not on Linux.\nHow to fix: Add --sim, or rebuild with `--features hardware` on the Pi.".to_string();
    }

    if lower.contains("invalid configuration") || lower.contains("parse config") {
        return format!(
            "What happened: Configuration is invalid or incomplete.\nLikely causes: Unknown keys or out-of-range values in the TOML.\nHow to fix: Edit the TOML config and try again. Original: {msg}"
        );
    }

    // Trace CSV header special-case
    if lower.contains("trace csv must have headers") {
        return "Invalid headers in trace CSV. Expected 'voltage,current'.".to_string();
    }

    if lower.contains("device rejected") {
        return format!(
            "What happened: The device rejected a sweep parameter.\nHow to fix: Adjust the flag value. Original: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 hardware, 4 link, 5 configuration, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() || err.downcast_ref::<ConfigError>().is_some() {
        return 5;
    }
    if let Some(e) = err.downcast_ref::<TracerError>() {
        match e {
            TracerError::Timeout
            | TracerError::Hardware(_)
            | TracerError::HardwareFault(_) => return 3,
            TracerError::Link(_) => return 4,
            TracerError::Config(_) => return 5,
            _ => {}
        }
    }
    if err.downcast_ref::<LinkError>().is_some() {
        return 4;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match exit_code_for_error(err) {
        3 => "Hardware",
        4 => "Link",
        5 => "Config",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_errors_exit_with_config_code() {
        let err = eyre::Report::new(BuildError::InvalidLinkTiming("zero"));
        assert_eq!(exit_code_for_error(&err), 5);
        assert!(humanize(&err).contains("idle_timeout_ticks"));
    }

    #[test]
    fn link_errors_exit_with_link_code() {
        let err = eyre::Report::new(LinkError::Disconnected);
        assert_eq!(exit_code_for_error(&err), 4);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Link");
    }

    #[test]
    fn untyped_errors_fall_back() {
        let err = eyre::eyre!("something odd");
        assert_eq!(exit_code_for_error(&err), 1);
        assert!(humanize(&err).starts_with("Something went wrong."));
    }
}
