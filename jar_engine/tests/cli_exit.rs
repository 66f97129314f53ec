use std::fs;
use std::process::Command;

use anyhow::{Context, Result};
use serde_json::Value;
use tempfile::tempdir;

#[test]
fn missing_watch_directory_fails_at_startup() -> Result<()> {
    let temp = tempdir().context("creating temporary directory")?;
    let status = Command::new(env!("CARGO_BIN_EXE_jar_engine"))
        .arg("--watch-dir")
        .arg(temp.path().join("does-not-exist"))
        .env("RUST_LOG", "off")
        .status()
        .context("executing jar_engine")?;
    assert_eq!(status.code(), Some(1), "unexpected exit {status:?}");
    Ok(())
}

#[test]
fn single_scan_applies_descriptor_and_reports_state() -> Result<()> {
    let temp = tempdir().context("creating temporary directory")?;
    let watch_dir = temp.path().join("queue");
    fs::create_dir(&watch_dir)?;
    let descriptor = watch_dir.join("0001.json");
    fs::write(
        &descriptor,
        r#"{"character":"robot_kyle","animation":"Walk","jarEvent":{"eventType":"MoveEvent","doMove":true,"moveParams":{"movePosX":3,"movePosY":0,"movePosZ":-2}}}"#,
    )?;
    let state_path = temp.path().join("state.json");

    let status = Command::new(env!("CARGO_BIN_EXE_jar_engine"))
        .arg("--watch-dir")
        .arg(&watch_dir)
        .args(["--poll-interval-ms", "10", "--max-scans", "1"])
        .arg("--state-json")
        .arg(&state_path)
        .env("RUST_LOG", "off")
        .status()
        .context("executing jar_engine")?;

    assert!(status.success(), "jar_engine exited with {status:?}");
    assert!(!descriptor.exists(), "descriptor should be consumed");

    let state: Value = serde_json::from_str(
        &fs::read_to_string(&state_path).context("reading state snapshot")?,
    )?;
    let kyle = state["actors"]
        .as_array()
        .and_then(|actors| {
            actors
                .iter()
                .find(|actor| actor["name"] == "robot_kyle")
        })
        .context("robot_kyle missing from snapshot")?;
    assert_eq!(kyle["active_animation"], "Walk");
    let position: Vec<f64> = kyle["pose"]["position"]
        .as_array()
        .context("position array")?
        .iter()
        .filter_map(Value::as_f64)
        .collect();
    for (actual, expected) in position.iter().zip([3.0, 0.0, -2.0]) {
        assert!((actual - expected).abs() < 1e-4, "{position:?}");
    }
    assert_eq!(position.len(), 3);
    assert_eq!(state["recording"], "idle");
    Ok(())
}

#[test]
fn vanished_watch_directory_exits_with_two() -> Result<()> {
    let temp = tempdir().context("creating temporary directory")?;
    let watch_dir = temp.path().join("queue");
    fs::create_dir(&watch_dir)?;

    let mut child = Command::new(env!("CARGO_BIN_EXE_jar_engine"))
        .arg("--watch-dir")
        .arg(&watch_dir)
        .args(["--poll-interval-ms", "20", "--max-scans", "1000"])
        .env("RUST_LOG", "off")
        .spawn()
        .context("spawning jar_engine")?;
    std::thread::sleep(std::time::Duration::from_millis(500));
    fs::remove_dir(&watch_dir)?;

    let status = child.wait().context("waiting for jar_engine")?;
    assert_eq!(status.code(), Some(2), "unexpected exit {status:?}");
    Ok(())
}
