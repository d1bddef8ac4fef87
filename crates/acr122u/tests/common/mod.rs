//! Common test utilities

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use acr122u::{
    CancellationToken, CardConnection, CardService, Config, LogOutput, Payload, Protocol,
    ReaderRecord, ShareMode, State,
};

/// Poll interval used by every scripted context
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Config suited to the scripted service: short waits, no log output
pub fn test_config() -> Config {
    Config::new()
        .with_poll_interval(POLL_INTERVAL)
        .with_log_output(LogOutput::Inherit)
}

type Shared<T> = Arc<Mutex<T>>;

/// What the fake reports once its wait script runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhausted {
    /// Cancel the service token and report a timeout
    Cancel,
    /// Sleep for the requested timeout and report it, forever
    Idle,
}

#[derive(Debug)]
struct Script {
    waits: VecDeque<Result<Vec<State>, pcsc::Error>>,
    connects: VecDeque<Result<Vec<u8>, pcsc::Error>>,
    baselines: Vec<Vec<State>>,
    payloads_cleared: bool,
}

/// Thread safe `CardService` driven by a script of wait and connect results
///
/// Clones share the script, so a test can keep one to inspect what a
/// context did with the other.
#[derive(Debug, Clone)]
pub struct ScriptedService {
    readers: Result<Vec<String>, pcsc::Error>,
    valid: Result<(), pcsc::Error>,
    release: Result<(), pcsc::Error>,
    exhausted: Exhausted,
    cancel: Shared<CancellationToken>,
    script: Shared<Script>,
    calls: Shared<Vec<String>>,
}

impl ScriptedService {
    /// Fake with the given readers that cancels `cancel` when the script ends
    pub fn new(readers: &[&str], cancel: &CancellationToken) -> Self {
        Self {
            readers: Ok(readers.iter().map(ToString::to_string).collect()),
            valid: Ok(()),
            release: Ok(()),
            exhausted: Exhausted::Cancel,
            cancel: Arc::new(Mutex::new(cancel.clone())),
            script: Arc::new(Mutex::new(Script {
                waits: VecDeque::new(),
                connects: VecDeque::new(),
                baselines: Vec::new(),
                payloads_cleared: true,
            })),
            calls: Arc::default(),
        }
    }

    pub fn with_readers(mut self, readers: Result<Vec<String>, pcsc::Error>) -> Self {
        self.readers = readers;
        self
    }

    pub fn with_valid(mut self, valid: Result<(), pcsc::Error>) -> Self {
        self.valid = valid;
        self
    }

    pub fn with_release(mut self, release: Result<(), pcsc::Error>) -> Self {
        self.release = release;
        self
    }

    pub fn with_exhausted(mut self, exhausted: Exhausted) -> Self {
        self.exhausted = exhausted;
        self
    }

    /// Cancel `cancel` instead once the script runs out
    pub fn cancel_with(&self, cancel: &CancellationToken) -> &Self {
        *self.cancel.lock().unwrap() = cancel.clone();
        self
    }

    /// Queue the flags the next wait reports, one entry per reader
    pub fn push_wait(&self, states: &[State]) -> &Self {
        self.lock().waits.push_back(Ok(states.to_vec()));
        self
    }

    /// Queue a failed wait
    pub fn push_wait_error(&self, error: pcsc::Error) -> &Self {
        self.lock().waits.push_back(Err(error));
        self
    }

    /// Queue a successful connect whose card answers with `response`
    pub fn push_card(&self, response: &[u8]) -> &Self {
        self.lock().connects.push_back(Ok(response.to_vec()));
        self
    }

    /// Queue a failed connect
    pub fn push_connect_error(&self, error: pcsc::Error) -> &Self {
        self.lock().connects.push_back(Err(error));
        self
    }

    /// Everything the engine asked of the fake, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of waits issued
    pub fn waits(&self) -> usize {
        self.lock().baselines.len()
    }

    /// Current flags handed to each wait
    pub fn baselines(&self) -> Vec<Vec<State>> {
        self.lock().baselines.clone()
    }

    /// Whether every wait saw records without a payload
    pub fn payloads_cleared(&self) -> bool {
        self.lock().payloads_cleared
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    fn log(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[derive(Debug)]
pub struct ScriptedConnection {
    response: Vec<u8>,
    calls: Shared<Vec<String>>,
}

impl CardConnection for ScriptedConnection {
    fn transmit(&mut self, _command: &[u8]) -> Result<Vec<u8>, pcsc::Error> {
        self.calls.lock().unwrap().push("transmit".to_string());
        Ok(self.response.clone())
    }

    fn disconnect(self) -> Result<(), pcsc::Error> {
        self.calls.lock().unwrap().push("disconnect".to_string());
        Ok(())
    }
}

impl CardService for ScriptedService {
    type Connection = ScriptedConnection;

    fn is_valid(&self) -> Result<(), pcsc::Error> {
        self.valid
    }

    fn list_readers(&self) -> Result<Vec<String>, pcsc::Error> {
        self.readers.clone()
    }

    fn connect(
        &self,
        reader: &str,
        _share_mode: ShareMode,
        _protocol: Protocol,
    ) -> Result<ScriptedConnection, pcsc::Error> {
        self.log(format!("connect {reader}"));
        let response = self
            .lock()
            .connects
            .pop_front()
            .unwrap_or(Err(pcsc::Error::NoSmartcard))?;
        Ok(ScriptedConnection {
            response,
            calls: Arc::clone(&self.calls),
        })
    }

    fn get_status_change(
        &self,
        records: &mut [ReaderRecord],
        timeout: Duration,
    ) -> Result<(), pcsc::Error> {
        let step = {
            let mut script = self.lock();
            script.baselines.push(records.iter().map(ReaderRecord::current_state).collect());
            if records.iter().any(|r| *r.payload() != Payload::Empty) {
                script.payloads_cleared = false;
            }
            script.waits.pop_front()
        };
        self.log("wait");

        let Some(step) = step else {
            match self.exhausted {
                Exhausted::Cancel => self.cancel.lock().unwrap().cancel(),
                Exhausted::Idle => thread::sleep(timeout),
            }
            return Err(pcsc::Error::Timeout);
        };

        for (record, state) in records.iter_mut().zip(step?) {
            record.set_event_state(state);
        }
        Ok(())
    }

    fn release(self) -> Result<(), pcsc::Error> {
        self.release
    }
}
