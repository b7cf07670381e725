use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use turret_core::{AimCfg, AxisCfg, AxisController, DebounceLatch, TargetCenter, TurretController};
use turret_hardware::{SimulatedCamera, SimulatedDetector, SimulatedInputs, SimulatedServoBank};
use turret_traits::ManualClock;

// Target centres sweeping across the frame and back.
fn sweep(n: usize) -> Vec<TargetCenter> {
    (0..n)
        .map(|i| {
            let phase = (i % 1280) as i32;
            let x = if phase < 640 { phase } else { 1279 - phase };
            TargetCenter {
                x,
                y: 240 + (i % 40) as i32 - 20,
                width: 80,
            }
        })
        .collect()
}

fn bench_axis(c: &mut Criterion) {
    let targets = sweep(4096);
    c.bench_function("axis_update_4096", |b| {
        b.iter_batched(
            || AxisController::new(&AimCfg::default(), &AxisCfg::default(), &AxisCfg::default()),
            |mut axes| {
                for t in &targets {
                    black_box(axes.update(Some(*t)));
                }
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_latch(c: &mut Criterion) {
    let base = std::time::Instant::now();
    c.bench_function("latch_trigger_evaluate", |b| {
        let mut latch = DebounceLatch::new(std::time::Duration::from_millis(50));
        let mut t = 0u64;
        b.iter(|| {
            t += 1;
            let now = base + std::time::Duration::from_millis(t);
            if t % 100 == 0 {
                latch.trigger(now);
            }
            black_box(latch.evaluate(now))
        })
    });
}

fn bench_step(c: &mut Criterion) {
    c.bench_function("controller_step_sim_160x120", |b| {
        b.iter_batched(
            || {
                TurretController::builder()
                    .with_camera(SimulatedCamera::new(160, 120))
                    .with_servos(SimulatedServoBank::new())
                    .with_inputs(SimulatedInputs::new())
                    .with_detector(SimulatedDetector::new(7))
                    .with_aim(AimCfg {
                        frame_width: 160,
                        frame_height: 120,
                        ..AimCfg::default()
                    })
                    .with_clock(Box::new(ManualClock::new()))
                    .build()
                    .expect("build")
            },
            |mut ctrl| {
                for _ in 0..50 {
                    black_box(ctrl.step().expect("step"));
                }
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_axis, bench_latch, bench_step);
criterion_main!(benches);
