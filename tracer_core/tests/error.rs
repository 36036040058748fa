use std::error::Error;

use rstest::rstest;
use tracer_core::hw_error::map_hw_error;
use tracer_core::mocks::{ManualClock, RecordingRelay, ScriptedAdc};
use tracer_core::{AcqConfig, Tracer, TracerError};
#[cfg(feature = "hardware-errors")]
use tracer_hardware::error::HwError;

#[cfg(feature = "hardware-errors")]
#[test]
fn typed_timeout_maps_to_timeout() {
    let e: Box<dyn Error + Send + Sync> = Box::new(HwError::Timeout);
    assert!(matches!(map_hw_error(&*e), TracerError::Timeout));
}

#[cfg(feature = "hardware-errors")]
#[rstest]
#[case(HwError::Spi("transfer failed".into()))]
#[case(HwError::Gpio("pin busy".into()))]
#[case(HwError::InvalidDivider(3))]
fn typed_faults_map_to_hardware_fault(#[case] hw: HwError) {
    let e: Box<dyn Error + Send + Sync> = Box::new(hw);
    assert!(matches!(map_hw_error(&*e), TracerError::HardwareFault(_)));
}

#[rstest]
#[case("read Timeout on spi0", true)]
#[case("device unplugged", false)]
fn untyped_errors_fall_back_to_message(#[case] msg: &str, #[case] is_timeout: bool) {
    let e: Box<dyn Error + Send + Sync> = msg.into();
    match map_hw_error(&*e) {
        TracerError::Timeout => assert!(is_timeout),
        TracerError::Hardware(s) => {
            assert!(!is_timeout);
            assert_eq!(s, msg);
        }
        other => panic!("unexpected mapping {other:?}"),
    }
}

#[test]
fn sweep_error_downcasts_to_tracer_error() {
    let clock = ManualClock::new();
    let adc = ScriptedAdc::constant(3000, 500).fail_at(0);
    let mut tracer = Tracer::with_clock(adc, RecordingRelay::default(), &clock);
    let err = tracer.sweep(&AcqConfig::default()).unwrap_err();
    assert!(err.downcast_ref::<TracerError>().is_some());
    // failure during open-circuit sampling never closes the relay
    assert!(!tracer.relay().is_active());
}

#[test]
fn invalid_config_is_rejected_before_touching_hardware() {
    let clock = ManualClock::new();
    let mut tracer = Tracer::with_clock(
        ScriptedAdc::constant(0, 0),
        RecordingRelay::default(),
        &clock,
    );
    let cfg = AcqConfig {
        max_measurements: 1,
        ..AcqConfig::default()
    };
    let err = tracer.sweep(&cfg).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TracerError>(),
        Some(TracerError::Config(_))
    ));
    assert_eq!(tracer.adc().reads(), 0);
    assert!(tracer.relay().history().is_empty());
}
