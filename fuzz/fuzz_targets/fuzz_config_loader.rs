#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Launcher config: parse and validation errors are fine, panics are not.
    if let Ok(cfg) = tracer_config::load_toml(data) {
        let _ = cfg.validate();
    }

    // The same bytes as a trace CSV; accepted rows must fit 12 bits.
    if let Ok(rows) = tracer_config::parse_trace_csv(data.as_bytes()) {
        assert!(rows.len() >= 2);
        assert!(rows.iter().all(|r| r.voltage <= tracer_config::ADC_MAX
            && r.current <= tracer_config::ADC_MAX));
    }
});
