use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use anyhow::{Context, Result};
use jar_descriptor::DecodeError;
use jar_engine::recorder::scripted::ScriptedRecorderFactory;
use jar_engine::scene_config::SceneConfig;
use jar_engine::{
    DirectoryWatcher, DispatchResult, Disposition, EventDispatcher, RecordingSession,
    ScanOutcome, SceneGraph, WatchError, WatchExit, WatchSettings,
};
use tempfile::tempdir;

fn dispatcher() -> Result<EventDispatcher<SceneGraph>> {
    let (stage, registry) = SceneConfig::builtin()
        .build()
        .context("building builtin scene")?;
    let recording = RecordingSession::new(None, Box::new(ScriptedRecorderFactory::new()));
    Ok(EventDispatcher::new(stage, registry, recording))
}

fn watcher(dir: &Path) -> DirectoryWatcher {
    DirectoryWatcher::new(WatchSettings {
        interval: Duration::from_millis(1),
        ..WatchSettings::new(dir)
    })
}

fn remaining(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

#[test]
fn consumes_one_file_per_scan_in_name_order() -> Result<()> {
    let temp = tempdir()?;
    fs::write(
        temp.path().join("002.json"),
        r#"{"character":"robot_kyle","animation":"Run"}"#,
    )?;
    fs::write(
        temp.path().join("001.json"),
        r#"{"character":"robot_kyle","animation":"Walk"}"#,
    )?;
    let mut dispatcher = dispatcher()?;
    let mut watcher = watcher(temp.path());

    let first = watcher.scan_once(&mut dispatcher)?;
    assert!(matches!(
        first,
        ScanOutcome::Consumed {
            ref path,
            deleted: true,
            disposition: Disposition::Processed(DispatchResult::Dispatched),
        } if path.ends_with("001.json")
    ));
    assert_eq!(remaining(temp.path())?, vec!["002.json".to_string()]);
    assert_eq!(
        dispatcher
            .actor_state("robot_kyle")
            .and_then(|state| state.active_animation()),
        Some("Walk")
    );

    watcher.scan_once(&mut dispatcher)?;
    assert!(remaining(temp.path())?.is_empty());
    assert_eq!(
        dispatcher
            .actor_state("robot_kyle")
            .and_then(|state| state.active_animation()),
        Some("Run")
    );

    assert!(matches!(
        watcher.scan_once(&mut dispatcher)?,
        ScanOutcome::Idle
    ));
    assert_eq!(watcher.scans(), 3);
    Ok(())
}

#[test]
fn empty_and_malformed_files_are_deleted_once() -> Result<()> {
    let temp = tempdir()?;
    fs::write(temp.path().join("a.json"), "  \n\t")?;
    fs::write(temp.path().join("b.json"), "{\"character\": ")?;
    fs::write(temp.path().join("c.json"), [0xff, 0xfe, 0x00])?;
    let mut dispatcher = dispatcher()?;
    let mut watcher = watcher(temp.path());

    assert!(matches!(
        watcher.scan_once(&mut dispatcher)?,
        ScanOutcome::Consumed {
            deleted: true,
            disposition: Disposition::Empty,
            ..
        }
    ));
    assert!(matches!(
        watcher.scan_once(&mut dispatcher)?,
        ScanOutcome::Consumed {
            deleted: true,
            disposition: Disposition::Processed(DispatchResult::Rejected(
                DecodeError::MalformedPayload(_)
            )),
            ..
        }
    ));
    assert!(matches!(
        watcher.scan_once(&mut dispatcher)?,
        ScanOutcome::Consumed {
            deleted: true,
            disposition: Disposition::Processed(DispatchResult::Rejected(_)),
            ..
        }
    ));
    assert!(remaining(temp.path())?.is_empty());
    assert!(matches!(
        watcher.scan_once(&mut dispatcher)?,
        ScanOutcome::Idle
    ));
    assert_eq!(dispatcher.stage().events().len(), 0);
    Ok(())
}

#[test]
fn other_extensions_are_left_alone() -> Result<()> {
    let temp = tempdir()?;
    fs::write(temp.path().join("notes.txt"), "hello")?;
    fs::write(temp.path().join("partial.json.tmp"), "{}")?;
    let mut dispatcher = dispatcher()?;
    let mut watcher = watcher(temp.path());

    assert!(matches!(
        watcher.scan_once(&mut dispatcher)?,
        ScanOutcome::Idle
    ));
    assert_eq!(
        remaining(temp.path())?,
        vec!["notes.txt".to_string(), "partial.json.tmp".to_string()]
    );
    Ok(())
}

#[test]
fn missing_directory_is_terminal() -> Result<()> {
    let temp = tempdir()?;
    let watched = temp.path().join("queue");
    fs::create_dir(&watched)?;
    let mut dispatcher = dispatcher()?;
    let mut watcher = watcher(&watched);
    assert!(matches!(
        watcher.scan_once(&mut dispatcher)?,
        ScanOutcome::Idle
    ));

    fs::remove_dir(&watched)?;
    assert!(matches!(
        watcher.scan_once(&mut dispatcher),
        Err(WatchError::DirectoryMissing(ref path)) if path == &watched
    ));
    let stop = AtomicBool::new(false);
    assert_eq!(
        watcher.run(&mut dispatcher, &stop),
        WatchExit::DirectoryMissing
    );
    Ok(())
}

#[test]
fn run_honours_scan_limit_and_stop_flag() -> Result<()> {
    let temp = tempdir()?;
    for index in 0..3 {
        fs::write(
            temp.path().join(format!("{index:03}.json")),
            r#"{"character":"banana_man","animation":"Idle"}"#,
        )?;
    }
    let mut dispatcher = dispatcher()?;
    let mut limited = DirectoryWatcher::new(WatchSettings {
        interval: Duration::from_millis(1),
        max_scans: Some(2),
        ..WatchSettings::new(temp.path())
    });
    let stop = AtomicBool::new(false);
    assert_eq!(
        limited.run(&mut dispatcher, &stop),
        WatchExit::ScanLimitReached
    );
    assert_eq!(limited.scans(), 2);
    assert_eq!(remaining(temp.path())?, vec!["002.json".to_string()]);

    let stop = AtomicBool::new(true);
    let mut stopped = watcher(temp.path());
    assert_eq!(stopped.run(&mut dispatcher, &stop), WatchExit::Stopped);
    assert_eq!(stopped.scans(), 0);
    assert_eq!(remaining(temp.path())?, vec!["002.json".to_string()]);
    Ok(())
}
