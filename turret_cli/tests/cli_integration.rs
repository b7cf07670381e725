use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

// Minimal valid config for the sim backend; fast pacing keeps runs short.
fn write_config(dir: &Path, extra: &str) -> PathBuf {
    let toml = format!(
        r#"
[pins]
pan_servo = 24
tilt_servo = 23
fire_servo = 25
door_sensor = 17
motion_sensor = 18

[camera]
width = 160
height = 120
target_fps = 240

[aim]
leeway_x = 10
leeway_y = 10
sample_stride = 1

[capture]
dir = "{}"
max_files = 5
{extra}
"#,
        dir.join("captures").display()
    );
    let path = dir.join("turret.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn turret(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("turret").unwrap();
    cmd.arg("--config").arg(cfg).arg("--log-level").arg("warn");
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["run", "--max-iterations", "10"], 0, "run complete: 10 iterations", "stdout")]
#[case(&["run", "--max-iterations", "5", "--stats"], 0, "alerts: submitted=", "stdout")]
#[case(&["run", "--max-iterations", "5", "--disable-turret"], 0, "iteration limit reached", "stdout")]
#[case(&["self-check"], 0, "self-check ok: pan=1500us tilt=1500us", "stdout")]
#[case(&["launch"], 2, "unrecognized subcommand", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");

    let mut cmd = turret(&cfg);
    for a in args {
        cmd.arg(a);
    }
    let assert = cmd.assert().code(exit_code);

    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn missing_config_file_exits_with_config_code() {
    let dir = tempdir().unwrap();
    turret(&dir.path().join("nope.toml"))
        .args(["run", "--max-iterations", "1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("config file could not be read"));
}

#[test]
fn duplicate_pins_are_rejected_before_running() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("dup.toml");
    fs::write(
        &cfg,
        "[pins]\npan_servo = 24\ntilt_servo = 24\nfire_servo = 25\ndoor_sensor = 17\nmotion_sensor = 18\n",
    )
    .unwrap();
    turret(&cfg)
        .args(["run", "--max-iterations", "1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("assigned more than once"));
}

#[test]
fn camera_fault_exits_with_camera_code() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    turret(&cfg)
        .env("TURRET_TEST_SIM_FRAME_FAIL", "3")
        .args(["run", "--max-iterations", "50"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Camera error"))
        .stdout(predicate::str::contains("run complete").not());
}

#[test]
fn json_errors_are_structured() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    let out = turret(&cfg)
        .arg("--json")
        .env("TURRET_TEST_SIM_FRAME_FAIL", "0")
        .args(["run", "--max-iterations", "5"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&out.stderr);
    let line = stderr
        .lines()
        .rev()
        .find(|l| l.contains("\"reason\""))
        .expect("json error line");
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["reason"], "Camera");
    assert_eq!(v["code"], 3);
    assert!(v["message"].as_str().unwrap().contains("Camera error"));
}

#[test]
fn door_trigger_writes_a_capture() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    turret(&cfg)
        .env("TURRET_TEST_SIM_DOOR", "1")
        .env("TURRET_TEST_SIM_NO_PERSON", "1")
        .args(["run", "--max-iterations", "20", "--stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alerts: submitted=1 dispatched=1"));

    let names: Vec<String> = fs::read_dir(dir.path().join("captures"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 1, "{names:?}");
    assert!(names[0].starts_with("door_") && names[0].ends_with(".png"));
}

#[test]
fn capture_dir_flag_overrides_config() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "");
    let other = dir.path().join("elsewhere");
    turret(&cfg)
        .env("TURRET_TEST_SIM_MOTION", "1")
        .env("TURRET_TEST_SIM_NO_PERSON", "1")
        .args(["run", "--max-iterations", "5", "--capture-dir"])
        .arg(&other)
        .assert()
        .success();
    let count = fs::read_dir(&other).unwrap().count();
    assert_eq!(count, 1);
    assert!(!dir.path().join("captures").exists());
}

#[test]
fn runner_section_caps_iterations() {
    let dir = tempdir().unwrap();
    let cfg = write_config(dir.path(), "\n[runner]\nmax_iterations = 7\n");
    turret(&cfg)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("run complete: 7 iterations"));
}

#[test]
fn each_unrotated_run_gets_a_log_file_and_old_ones_are_pruned() {
    let dir = tempdir().unwrap();
    let logs = dir.path().join("logs");
    fs::create_dir_all(&logs).unwrap();
    for i in 0..4 {
        fs::write(logs.join(format!("turret.log.2001-01-0{}", i + 1)), "{}\n").unwrap();
    }
    let extra = format!(
        "\n[logging]\nfile = \"{}\"\nrotation = \"never\"\nmax_files = 2\n",
        logs.join("turret.log").display()
    );
    let cfg = write_config(dir.path(), &extra);
    let log_files = || {
        let mut names: Vec<String> = fs::read_dir(&logs)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("turret.log."))
            .collect();
        names.sort();
        names
    };

    turret(&cfg)
        .args(["run", "--max-iterations", "3"])
        .assert()
        .success();
    let first = log_files();
    assert_eq!(first.len(), 2);
    let first_run = first
        .iter()
        .find(|n| !n.starts_with("turret.log.2001-01-0"))
        .cloned()
        .expect("file for the first run");

    std::thread::sleep(std::time::Duration::from_millis(20));
    turret(&cfg)
        .args(["run", "--max-iterations", "3"])
        .assert()
        .success();
    let second = log_files();
    assert_eq!(second.len(), 2, "max_files bounds separate runs: {second:?}");
    assert!(second.contains(&first_run), "previous run kept: {second:?}");
    assert!(second.iter().all(|n| !n.starts_with("turret.log.2001-01-0")));
}
