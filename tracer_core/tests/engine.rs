use rstest::rstest;
use tracer_core::engine::{EngineParams, run};
use tracer_core::mocks::ScriptedAdc;
use tracer_core::{EndReason, IvPoint, ScaleFactors};

fn params(max_points: u16, min_distance: u16) -> EngineParams {
    EngineParams {
        max_points,
        max_discards: 300,
        max_measurements: 1_000_000,
        near_zero_current: 7,
        scale: ScaleFactors {
            v_scale: 1,
            i_scale: 1,
        },
        min_distance,
    }
}

#[test]
fn flat_region_commits_every_301st_measurement() {
    let mut adc = ScriptedAdc::constant(100, 500);
    let out = run(&mut adc, params(5, u16::MAX)).unwrap();
    assert_eq!(out.end, EndReason::PointsFull);
    assert_eq!(out.curve.len(), 5);
    assert_eq!(out.measurements, 1 + 4 * 301);
}

#[test]
fn measurement_cap_stops_the_sweep() {
    let mut adc = ScriptedAdc::constant(100, 500);
    let p = EngineParams {
        max_measurements: 100,
        ..params(5, u16::MAX)
    };
    let out = run(&mut adc, p).unwrap();
    assert_eq!(out.end, EndReason::MeasurementLimit);
    assert_eq!(out.measurements, 100);
    assert_eq!(out.curve.len(), 1);
    // the first point was sealed by the first discard: no trailing read
    assert_eq!(adc.reads(), 200);
}

#[test]
fn flattened_current_ends_sweep_and_revises_last_point() {
    let mut adc = ScriptedAdc::new([0, 100, 200, 300], [500, 400, 200, 3]);
    let p = EngineParams {
        max_discards: 3,
        ..params(50, 10)
    };
    let out = run(&mut adc, p).unwrap();
    assert_eq!(out.end, EndReason::Flattened);
    assert_eq!(
        out.curve,
        vec![
            IvPoint::new(0, 463),
            IvPoint::new(100, 325),
            IvPoint::new(200, 126),
            IvPoint::new(300, 3),
            IvPoint::new(300, 3),
        ]
    );
    assert_eq!(out.measurements, 8);
}

#[rstest]
#[case(3)]
#[case(10)]
#[case(50)]
fn steep_ramp_fills_buffer(#[case] max_points: u16) {
    let voltages = (0..200u16).map(|k| k * 20);
    let currents = (0..200u16).map(|k| 2000 - k * 10);
    let mut adc = ScriptedAdc::new(voltages, currents);
    let out = run(&mut adc, params(max_points, 10)).unwrap();
    assert_eq!(out.end, EndReason::PointsFull);
    assert_eq!(out.curve.len(), usize::from(max_points));
    assert_eq!(out.measurements, u32::from(max_points));
}

#[test]
fn adc_fault_aborts_acquisition() {
    let mut adc = ScriptedAdc::constant(100, 500).fail_at(7);
    assert!(run(&mut adc, params(5, u16::MAX)).is_err());
}
