#![no_main]
use libfuzzer_sys::fuzz_target;
use tracer_core::{AcqConfig, ConfigOutcome};

fuzz_target!(|data: &str| {
    let mut cfg = AcqConfig::default();
    let before = cfg.clone();
    match cfg.apply_message(data) {
        Ok(ConfigOutcome::Applied { param, value }) => assert_eq!(cfg.get(param), value),
        Ok(ConfigOutcome::Ignored) | Err(_) => assert_eq!(cfg, before),
    }
    // Whatever the host sends, the stored config stays sweepable.
    assert!(cfg.validate().is_ok());
});
