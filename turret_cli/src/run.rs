//! The `run` and `self-check` commands: config mapping, backend assembly and
//! the summary printed on exit.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use turret_core::mocks::NoDetector;
use turret_core::{RunParams, RunSummary, TurretBuilder, TurretController, TurretSettings};
use turret_hardware::{LogAlertSink, PngCaptureWriter};

/// CLI overrides applied on top of the config file.
#[derive(Debug, Default, Clone)]
pub struct RunOverrides {
    pub max_iterations: Option<u64>,
    pub disable_turret: bool,
    pub capture_dir: Option<PathBuf>,
}

/// Pixels per detector call for the simulated target.
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
const SIM_TARGET_SPEED_PX: i32 = 8;

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

pub fn settings_for(cfg: &turret_config::Config, ov: &RunOverrides) -> TurretSettings {
    let mut settings = TurretSettings::from(cfg);
    if ov.disable_turret {
        settings.fire.enabled = false;
    }
    if let Some(dir) = &ov.capture_dir {
        settings.capture.dir = dir.clone();
    }
    settings
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn sim_camera(cfg: &turret_config::Config) -> turret_hardware::SimulatedCamera {
    use turret_hardware::SimulatedCamera;

    let cam = SimulatedCamera::new(cfg.camera.width, cfg.camera.height);
    match std::env::var("TURRET_TEST_SIM_FRAME_FAIL")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
    {
        Some(n) => cam.fail_after(n),
        None => cam,
    }
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn assemble(
    cfg: &turret_config::Config,
    settings: TurretSettings,
) -> eyre::Result<TurretBuilder<turret_core::Set, turret_core::Set, turret_core::Set>> {
    use turret_hardware::{SimulatedDetector, SimulatedInputs, SimulatedServoBank};

    let inputs = SimulatedInputs::new();
    if env_flag("TURRET_TEST_SIM_DOOR") {
        inputs.set(settings.pins.door, true);
    }
    if env_flag("TURRET_TEST_SIM_MOTION") {
        inputs.set(settings.pins.motion, true);
    }
    let builder = TurretController::builder()
        .with_settings(settings)
        .with_camera(sim_camera(cfg))
        .with_servos(SimulatedServoBank::new())
        .with_inputs(inputs);
    Ok(if env_flag("TURRET_TEST_SIM_NO_PERSON") {
        builder.with_detector(NoDetector)
    } else {
        builder.with_detector(SimulatedDetector::new(SIM_TARGET_SPEED_PX))
    })
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn assemble(
    cfg: &turret_config::Config,
    settings: TurretSettings,
) -> eyre::Result<TurretBuilder<turret_core::Set, turret_core::Set, turret_core::Set>> {
    use turret_core::hw_error::map_hw_error;
    use turret_hardware::gpio::{GpioInputs, GpioServoBank};
    use turret_hardware::v4l2::V4l2Camera;

    let cam = &cfg.camera;
    let camera = V4l2Camera::open(cam.index, cam.width, cam.height, cam.target_fps)
        .map_err(|e| map_hw_error(&e))?;
    let (width, height) = camera.dimensions();
    if (width, height) != (cam.width, cam.height) {
        tracing::warn!(width, height, "camera chose a different frame size");
    }

    let p = settings.pins;
    tracing::info!(pan = p.pan, tilt = p.tilt, fire = p.fire, door = p.door, motion = p.motion, "claiming gpio");
    let servos = GpioServoBank::new(&[p.pan, p.tilt, p.fire])
        .map_err(|e| eyre::eyre!("open servo gpio: {e}"))?;
    let inputs = GpioInputs::new(&[p.door, p.motion])
        .map_err(|e| eyre::eyre!("open sensor gpio: {e}"))?;
    if cfg.vision.enabled {
        tracing::warn!("no vision backend in this build; person detection disabled");
    }
    Ok(TurretController::builder()
        .with_settings(settings)
        .with_camera(camera)
        .with_servos(servos)
        .with_inputs(inputs)
        .with_detector(NoDetector))
}

/// Build the controller with PNG captures and log alerts.
pub fn build_controller(
    cfg: &turret_config::Config,
    ov: &RunOverrides,
) -> eyre::Result<TurretController> {
    let settings = settings_for(cfg, ov);
    tracing::info!(
        armed = settings.fire.enabled,
        capture_dir = %settings.capture.dir.display(),
        "assembling controller"
    );
    assemble(cfg, settings)?
        .with_alerts(PngCaptureWriter::new(), LogAlertSink)
        .build()
}

pub fn run(
    cfg: &turret_config::Config,
    ov: &RunOverrides,
    stats: bool,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<()> {
    let mut ctrl = build_controller(cfg, ov)?;
    let params = RunParams {
        target_fps: cfg.camera.target_fps,
        max_iterations: ov.max_iterations.or(cfg.runner.max_iterations),
        shutdown,
    };
    let summary = turret_core::run(&mut ctrl, &params)?;
    print_summary(&summary, stats);
    Ok(())
}

fn print_summary(summary: &RunSummary, stats: bool) {
    println!(
        "run complete: {} iterations ({})",
        summary.stats.iterations, summary.reason
    );
    if stats {
        let s = &summary.stats;
        println!(
            "loop: skipped_frames={} missed_deadlines={} worst_latency_us={} fire_iterations={} rising_edges={} fps={}",
            s.skipped_frames,
            s.missed_deadlines,
            s.worst_latency.as_micros(),
            s.fire_iterations,
            s.rising_edges,
            s.last_fps
                .map_or_else(|| "n/a".to_string(), |f| format!("{f:.1}")),
        );
        let a = &summary.alerts;
        println!(
            "alerts: submitted={} dispatched={} capture_failures={} dispatch_failures={}",
            a.submitted, a.dispatched, a.capture_failures, a.dispatch_failures
        );
    }
}

/// Validate the config, open every backend and park the servos without
/// running the loop.
pub fn self_check(cfg: &turret_config::Config) -> eyre::Result<()> {
    let mut ctrl = build_controller(cfg, &RunOverrides::default())
        .wrap_err("self-check: controller assembly failed")?;
    ctrl.begin().wrap_err("self-check: servo start commands failed")?;
    ctrl.shutdown(&turret_core::ShutdownReason::IterationLimit);
    println!(
        "self-check ok: pan={}us tilt={}us",
        ctrl.pan_us(),
        ctrl.tilt_us()
    );
    Ok(())
}
