use std::sync::{Mutex, Once};

use anyhow::{Context, Result};
use jar_engine::recorder::scripted::ScriptedRecorderFactory;
use jar_engine::scene_config::SceneConfig;
use jar_engine::{DispatchResult, DropReason, EventDispatcher, RecordingSession, SceneGraph};
use log::{Level, LevelFilter, Log, Metadata, Record};

static RECORDS: Mutex<Vec<(Level, String)>> = Mutex::new(Vec::new());

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut records) = RECORDS.lock() {
            records.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

fn capture_logs() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        log::set_logger(&LOGGER).expect("no other logger installed");
        log::set_max_level(LevelFilter::Trace);
    });
}

/// Captured records containing `needle`. Tests run in parallel, so each one
/// filters on text only it produces.
fn records_mentioning(needle: &str) -> Vec<(Level, String)> {
    RECORDS
        .lock()
        .expect("log capture lock")
        .iter()
        .filter(|(_, message)| message.contains(needle))
        .cloned()
        .collect()
}

fn dispatcher_with(recorder: ScriptedRecorderFactory) -> Result<EventDispatcher<SceneGraph>> {
    let (stage, registry) = SceneConfig::builtin()
        .build()
        .context("building builtin scene")?;
    let recording = RecordingSession::new(Some("clips".into()), Box::new(recorder));
    Ok(EventDispatcher::new(stage, registry, recording))
}

#[test]
fn unknown_actor_is_warned_about_once() -> Result<()> {
    capture_logs();
    let mut dispatcher = dispatcher_with(ScriptedRecorderFactory::new())?;

    let result = dispatcher
        .dispatch_raw(r#"{"character":"stowaway","animation":"Sneak","jarEvent":{"eventType":"IgnoreEvent"}}"#);
    assert!(matches!(
        result,
        DispatchResult::Dropped(DropReason::UnknownActor(ref name)) if name == "stowaway"
    ));

    let records = records_mentioning("stowaway");
    let warnings: Vec<_> = records
        .iter()
        .filter(|(level, _)| *level == Level::Warn)
        .collect();
    assert_eq!(warnings.len(), 1, "{records:?}");
    assert!(warnings[0].1.contains("unknown actor"), "{warnings:?}");
    Ok(())
}

#[test]
fn aborted_raw_dispatch_logs_the_payload() -> Result<()> {
    capture_logs();
    let mut dispatcher = dispatcher_with(ScriptedRecorderFactory::failing("no encoder"))?;
    let raw = r#"{"character":"banana_man","animation":"Salute","jarEvent":{"eventType":"RecordEvent","startRecording":true}}"#;

    assert!(matches!(
        dispatcher.dispatch_raw(raw),
        DispatchResult::Aborted(_)
    ));

    let aborts: Vec<_> = records_mentioning("Salute")
        .into_iter()
        .filter(|(level, message)| *level == Level::Warn && message.contains("dispatch aborted"))
        .collect();
    assert_eq!(aborts.len(), 1, "{aborts:?}");
    assert!(aborts[0].1.contains(raw), "{aborts:?}");
    Ok(())
}
