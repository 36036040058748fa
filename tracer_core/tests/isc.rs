use tracer_core::TracerError;
use tracer_core::isc::{measure_open_circuit, poll_isc};
use tracer_core::mocks::ScriptedAdc;

#[test]
fn declining_scenario_settles_on_first_stable_window() {
    let mut adc = ScriptedAdc::new([], [50, 30, 28, 27, 26]);
    let out = poll_isc(&mut adc, 100, 5, 20).unwrap();
    // (50, 30, 28) drops by 20; (30, 28, 27) is the first stable window
    assert!(out.stable);
    assert_eq!(out.isc, 30);
    assert_eq!(out.polls, 4);
}

#[test]
fn rising_current_times_out_with_oldest_sample() {
    let mut adc = ScriptedAdc::new([], 1..=10);
    let out = poll_isc(&mut adc, 10, 5, 0).unwrap();
    assert!(!out.stable);
    assert_eq!(out.polls, 10);
    assert_eq!(out.isc, 8);
}

#[test]
fn weak_current_never_stabilises() {
    let mut adc = ScriptedAdc::constant(0, 15);
    let out = poll_isc(&mut adc, 50, 5, 20).unwrap();
    assert!(!out.stable);
    assert_eq!(out.polls, 50);
    assert_eq!(out.isc, 15);
}

#[test]
fn open_circuit_takes_voltage_max_and_current_min() {
    let mut adc = ScriptedAdc::new([2990, 3005, 3000], [5, 2, 4]);
    let oc = measure_open_circuit(&mut adc, 3, 3).unwrap();
    assert_eq!(oc.voc, 3005);
    assert_eq!(oc.zero_current, 2);
    assert_eq!(adc.reads(), 6);
}

#[test]
fn adc_fault_surfaces_as_hardware_error() {
    let mut adc = ScriptedAdc::constant(0, 0).fail_at(0);
    let err = poll_isc(&mut adc, 10, 5, 20).unwrap_err();
    match err.downcast_ref::<TracerError>() {
        Some(TracerError::Hardware(msg)) => assert!(msg.contains("scripted adc fault")),
        other => panic!("expected Hardware, got {other:?}"),
    }
}
