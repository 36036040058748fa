use assert_cmd::prelude::*;
use rstest::rstest;
use serde_json::Value;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

fn tracer(dir: &tempfile::TempDir) -> Command {
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, "[link]\nidle_tick_ms = 1\nidle_timeout_ticks = 50\n").unwrap();
    let mut cmd = Command::cargo_bin("tracer").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--json")
        .arg("--log-level")
        .arg("error");
    cmd
}

fn last_json_line(bytes: &[u8]) -> Value {
    let text = String::from_utf8_lossy(bytes);
    let line = text
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .expect("at least one line");
    serde_json::from_str(line).unwrap_or_else(|e| panic!("invalid JSON {line:?}: {e}"))
}

#[rstest]
fn sweep_report_schema() {
    let dir = tempdir().unwrap();
    let out = tracer(&dir).arg("sweep").output().unwrap();
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    let v = last_json_line(&out.stdout);
    for key in [
        "open_circuit",
        "isc",
        "scale",
        "min_distance",
        "curve",
        "measurements",
        "end",
        "elapsed_us",
    ] {
        assert!(v.get(key).is_some(), "missing key {key} in {v}");
    }

    assert_eq!(v["open_circuit"]["voc"], 3000);
    assert_eq!(v["open_circuit"]["zero_current"], 2);
    assert!(v["isc"]["stable"].as_bool().unwrap());
    assert!(v["scale"]["v_scale"].as_u64().unwrap() >= 1);
    assert!(v["scale"]["i_scale"].as_u64().unwrap() >= 1);

    let end = v["end"].as_str().unwrap();
    assert!(
        ["points_full", "flattened", "measurement_limit"].contains(&end),
        "unexpected end reason {end}"
    );

    let curve = v["curve"].as_array().unwrap();
    assert!(curve.len() >= 2 && curve.len() <= 275);
    for p in curve {
        assert!(p["voltage"].as_u64().unwrap() <= 4095);
        assert!(p["current"].as_u64().unwrap() <= 4095);
    }
    assert!(v["measurements"].as_u64().unwrap() as usize >= curve.len());
}

#[rstest]
fn self_check_schema() {
    let dir = tempdir().unwrap();
    let out = tracer(&dir).args(["self-check", "--sim"]).output().unwrap();
    assert!(out.status.success());
    let v = last_json_line(&out.stdout);
    assert_eq!(v["backend"], "sim");
    assert_eq!(v["ch0"], 3000);
    assert_eq!(v["ch1"], 2);
}

#[rstest]
#[case("v,i\n0,2000\n10,1990\n", "Invalid headers")]
#[case("voltage,current\n0,5000\n10,1990\n", "12-bit")]
#[case("voltage,current\n0,2000\n", "at least two rows")]
fn trace_errors_are_json(#[case] csv: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let trace = dir.path().join("trace.csv");
    fs::write(&trace, csv).unwrap();

    let out = tracer(&dir).arg("sweep").arg("--trace").arg(&trace).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    let v = last_json_line(&out.stderr);
    assert_eq!(v["reason"], "Error");
    let msg = v["message"].as_str().unwrap();
    assert!(msg.contains(needle), "{msg}");
}
