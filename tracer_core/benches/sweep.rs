use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use tracer_core::engine::{self, Engine, EngineParams, Step};
use tracer_core::{AcqConfig, ScaleFactors};
use tracer_hardware::sim::{PvParams, SimHandle, SimulatedPvModule};
use tracer_traits::Relay;

// Synthetic capacitor-charge trace as (current, voltage) pairs with a little noise
fn synth_trace(n: usize, noise: u16, seed: u32) -> Vec<(u16, u16)> {
    let mut state = seed.max(1);
    let mut jitter = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        (x % (u32::from(noise) + 1)) as u16
    };
    (0..n)
        .map(|k| {
            let t = k as f32 / n as f32;
            let v = 3000.0 * (1.0 - (-4.0 * t).exp());
            let i = 2000.0 * (1.0 - ((v / 180.0).exp() - 1.0) / ((3000.0f32 / 180.0).exp() - 1.0));
            let i = (i.max(0.0) as u16 + jitter()).min(4095);
            let v = (v as u16 + jitter()).min(4095);
            (i, v)
        })
        .collect()
}

fn configure(g: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>) {
    // BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p tracer_core --bench sweep
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(10));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }
}

pub fn bench_decimation(c: &mut Criterion) {
    let mut g = c.benchmark_group("decimation");
    configure(&mut g);

    let trace = synth_trace(20_000, 3, 0xC0FFEE);
    for &min_distance in &[10u16, 54, 200] {
        let params = EngineParams {
            max_points: 512,
            max_discards: 300,
            max_measurements: 1_000_000,
            near_zero_current: 7,
            scale: ScaleFactors {
                v_scale: 3,
                i_scale: 6,
            },
            min_distance,
        };
        g.bench_function(format!("min_distance_{min_distance}"), |b| {
            b.iter_batched(
                || trace.clone(),
                |t| {
                    let (i0, v0) = t[0];
                    let Ok(mut e) = Engine::start(params, i0, v0) else {
                        return;
                    };
                    for &(i, v) in &t[1..] {
                        match e.step(black_box(i), black_box(v)) {
                            Ok(Step::Done(_)) | Err(_) => break,
                            Ok(_) => {}
                        }
                    }
                    black_box(e.curve().len());
                },
                BatchSize::SmallInput,
            )
        });
    }
    g.finish();
}

pub fn bench_simulated_sweep(c: &mut Criterion) {
    let mut g = c.benchmark_group("simulated_sweep");
    configure(&mut g);

    let cfg = AcqConfig::default();
    let params = EngineParams::from_config(
        &cfg,
        ScaleFactors {
            v_scale: 6,
            i_scale: 6,
        },
        109,
    );
    g.bench_function("engine_run_default_module", |b| {
        b.iter_batched(
            || {
                let (adc, mut relay) =
                    SimHandle::split(SimulatedPvModule::new(PvParams::default()));
                // the engine expects a closed relay
                let _ = relay.set_active(true);
                adc
            },
            |mut adc| black_box(engine::run(&mut adc, params).map(|r| r.curve.len())),
            BatchSize::SmallInput,
        )
    });
    g.finish();
}

criterion_group!(sweep, bench_decimation, bench_simulated_sweep);
criterion_main!(sweep);
