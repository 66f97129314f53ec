use std::{cell::RefCell, path::Path, path::PathBuf, rc::Rc};

use crate::capabilities::{Recorder, RecorderError, RecorderFactory};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderCall {
    Create(PathBuf),
    Prepare,
    Start,
    Stop,
}

#[derive(Debug)]
struct ScriptedFailure {
    call: RecorderCall,
    /// The recorder is left idle, like an encoder that died.
    halts: bool,
}

#[derive(Debug, Default)]
struct Script {
    calls: Vec<RecorderCall>,
    constructions: u32,
    construction_failure: Option<String>,
    fail_next: Option<ScriptedFailure>,
}

/// Factory whose recorders only log the calls they receive.
///
/// Clones share one call log, so a test can keep a handle after boxing the
/// factory into a session.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRecorderFactory {
    script: Rc<RefCell<Script>>,
}

impl ScriptedRecorderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every construction attempt fails with `reason`.
    pub fn failing(reason: &str) -> Self {
        let factory = Self::new();
        factory.set_failure(Some(reason));
        factory
    }

    pub fn set_failure(&self, reason: Option<&str>) {
        self.script.borrow_mut().construction_failure = reason.map(str::to_string);
    }

    /// The next `call` of that kind on any recorder fails once; the
    /// recorder keeps its state.
    pub fn fail_next(&self, call: RecorderCall) {
        self.script.borrow_mut().fail_next = Some(ScriptedFailure { call, halts: false });
    }

    /// Like [`ScriptedRecorderFactory::fail_next`], but the failing recorder
    /// is no longer running afterwards.
    pub fn crash_next(&self, call: RecorderCall) {
        self.script.borrow_mut().fail_next = Some(ScriptedFailure { call, halts: true });
    }

    pub fn calls(&self) -> Vec<RecorderCall> {
        self.script.borrow().calls.clone()
    }

    /// Construction attempts, failed ones included.
    pub fn constructions(&self) -> u32 {
        self.script.borrow().constructions
    }
}

impl RecorderFactory for ScriptedRecorderFactory {
    fn create(&self, output_dir: &Path) -> Result<Box<dyn Recorder>, RecorderError> {
        let mut script = self.script.borrow_mut();
        script.constructions += 1;
        script
            .calls
            .push(RecorderCall::Create(output_dir.to_path_buf()));
        if let Some(reason) = script.construction_failure.clone() {
            return Err(RecorderError::Backend(reason));
        }
        Ok(Box::new(ScriptedRecorder {
            script: Rc::clone(&self.script),
            prepared: false,
            running: false,
        }))
    }
}

#[derive(Debug)]
pub struct ScriptedRecorder {
    script: Rc<RefCell<Script>>,
    prepared: bool,
    running: bool,
}

impl ScriptedRecorder {
    fn log(&mut self, call: RecorderCall) -> Result<(), RecorderError> {
        let mut script = self.script.borrow_mut();
        script.calls.push(call.clone());
        match script.fail_next.take() {
            Some(failure) if failure.call == call => {
                if failure.halts {
                    self.prepared = false;
                    self.running = false;
                }
                Err(RecorderError::Backend(format!("scripted {call:?} failure")))
            }
            pending => {
                script.fail_next = pending;
                Ok(())
            }
        }
    }
}

impl Recorder for ScriptedRecorder {
    fn prepare(&mut self) -> Result<(), RecorderError> {
        self.log(RecorderCall::Prepare)?;
        if self.running {
            return Err(RecorderError::AlreadyRunning);
        }
        self.prepared = true;
        Ok(())
    }

    fn start(&mut self) -> Result<(), RecorderError> {
        self.log(RecorderCall::Start)?;
        if !self.prepared {
            return Err(RecorderError::NotPrepared);
        }
        self.prepared = false;
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecorderError> {
        self.log(RecorderCall::Stop)?;
        if !self.running {
            return Err(RecorderError::NotRunning);
        }
        self.running = false;
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.running
    }
}
