//! Scripted fakes for driving the REPL engine without a terminal or network.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use aos_core::Credential;
use aos_core::CredentialError;
use aos_core::Dispatcher;
use aos_core::EvaluationError;
use aos_core::Evaluator;
use aos_core::LoadError;
use aos_core::MonitorHandle;
use aos_core::MonitorLifecycle;
use aos_core::ProcessId;
use aos_core::RegistrationError;
use aos_core::ReplError;
use aos_core::Session;
use aos_core::StatusFeed;
use aos_core::capability::CredentialProvider;
use aos_core::capability::DirectiveLoader;
use aos_core::capability::LineSource;
use aos_core::capability::Listing;
use aos_core::capability::ProcessControl;
use aos_core::capability::ProcessRegistry;
use aos_core::capability::ReadOutcome;
use aos_core::capability::RemoteEvaluator;
use aos_core::capability::RemoteReply;
use aos_core::capability::StatusBatch;
use aos_core::capability::StatusSource;
use aos_core::display::Display;
use aos_core::display::Progress;
use aos_core::display::ProgressIndicator;
use async_trait::async_trait;

pub const PROCESS_ID: &str = "process-under-test";
pub const OWNER: &str = "owner-under-test";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Ordered record of side effects across all fakes sharing it.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        lock(&self.0).push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        lock(&self.0).clone()
    }

    pub fn clear(&self) {
        lock(&self.0).clear();
    }

    pub fn count(&self, event: &str) -> usize {
        lock(&self.0).iter().filter(|e| e.as_str() == event).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shown {
    Output,
    Error,
    Notice,
    Status,
}

#[derive(Debug, Default)]
pub struct RecordingDisplay {
    shown: Mutex<Vec<(Shown, String)>>,
    log: EventLog,
}

impl RecordingDisplay {
    pub fn with_log(log: EventLog) -> Self {
        Self {
            shown: Mutex::new(Vec::new()),
            log,
        }
    }

    pub fn shown(&self) -> Vec<(Shown, String)> {
        lock(&self.shown).clone()
    }

    pub fn texts(&self, kind: Shown) -> Vec<String> {
        lock(&self.shown)
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn contains(&self, text: &str) -> bool {
        lock(&self.shown).iter().any(|(_, shown)| shown == text)
    }

    fn record(&self, kind: Shown, text: &str) {
        lock(&self.shown).push((kind, text.to_string()));
    }
}

struct LoggedProgress(EventLog);

impl ProgressIndicator for LoggedProgress {
    fn finish(&mut self) {
        self.0.push("progress.end");
    }
}

impl Display for RecordingDisplay {
    fn output(&self, text: &str) {
        self.record(Shown::Output, text);
    }

    fn error(&self, text: &str) {
        self.record(Shown::Error, text);
    }

    fn notice(&self, text: &str) {
        self.record(Shown::Notice, text);
    }

    fn status(&self, text: &str) {
        self.record(Shown::Status, text);
    }

    fn begin_progress(&self, label: &str) -> Progress {
        self.log.push(format!("progress.begin {label}"));
        Progress::new(Box::new(LoggedProgress(self.log.clone())))
    }
}

/// Feeds pre-scripted lines; reports end of input once exhausted.
#[derive(Debug, Default)]
pub struct ScriptedLines {
    script: VecDeque<ReadOutcome>,
    prompts: Arc<Mutex<Vec<String>>>,
    remembered: Vec<String>,
}

impl ScriptedLines {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: lines
                .into_iter()
                .map(|line| ReadOutcome::Line(line.into()))
                .collect(),
            prompts: Arc::default(),
            remembered: Vec::new(),
        }
    }

    pub fn from_outcomes(outcomes: impl IntoIterator<Item = ReadOutcome>) -> Self {
        Self {
            script: outcomes.into_iter().collect(),
            prompts: Arc::default(),
            remembered: Vec::new(),
        }
    }

    /// Every prompt a read was issued with, in order.
    pub fn prompts(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.prompts)
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// Lines handed over for recall.
    pub fn remembered(&self) -> &[String] {
        &self.remembered
    }
}

#[async_trait]
impl LineSource for ScriptedLines {
    async fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome, ReplError> {
        lock(&self.prompts).push(prompt.to_string());
        Ok(self.script.pop_front().unwrap_or(ReadOutcome::Eof))
    }

    fn remember(&mut self, line: &str) {
        self.remembered.push(line.to_string());
    }
}

/// Remote evaluator returning queued replies, then a default one.
pub struct StubRemote {
    replies: Mutex<VecDeque<Result<RemoteReply, EvaluationError>>>,
    fallback: RemoteReply,
    submissions: Mutex<Vec<String>>,
    log: EventLog,
}

impl StubRemote {
    pub fn new(log: EventLog) -> Self {
        Self::replying(log, RemoteReply::output("ok"))
    }

    pub fn replying(log: EventLog, fallback: RemoteReply) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback,
            submissions: Mutex::new(Vec::new()),
            log,
        }
    }

    pub fn queue(&self, reply: Result<RemoteReply, EvaluationError>) {
        lock(&self.replies).push_back(reply);
    }

    pub fn submissions(&self) -> Vec<String> {
        lock(&self.submissions).clone()
    }
}

#[async_trait]
impl RemoteEvaluator for StubRemote {
    async fn evaluate(
        &self,
        code: &str,
        process_id: &ProcessId,
        credential: &Credential,
    ) -> Result<RemoteReply, EvaluationError> {
        assert_eq!(process_id.as_str(), PROCESS_ID);
        assert_eq!(credential.owner(), OWNER);
        self.log.push(format!("evaluate {code}"));
        lock(&self.submissions).push(code.to_string());
        let queued = lock(&self.replies).pop_front();
        queued.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

#[derive(Debug, Default)]
pub struct StubControl {
    calls: Mutex<Vec<(String, String, String)>>,
    fail_with: Option<String>,
}

impl StubControl {
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_with: Some(message.into()),
        }
    }

    /// `(operation, owner, process id)` for each call.
    pub fn calls(&self) -> Vec<(String, String, String)> {
        lock(&self.calls).clone()
    }

    fn call(
        &self,
        op: &str,
        credential: &Credential,
        process_id: &ProcessId,
    ) -> Result<String, EvaluationError> {
        lock(&self.calls).push((
            op.to_string(),
            credential.owner().to_string(),
            process_id.to_string(),
        ));
        match &self.fail_with {
            Some(message) => Err(EvaluationError::Transport(message.clone())),
            None => Ok(format!("{op} scheduled for {process_id}")),
        }
    }
}

#[async_trait]
impl ProcessControl for StubControl {
    async fn monitor(
        &self,
        credential: &Credential,
        process_id: &ProcessId,
    ) -> Result<String, EvaluationError> {
        self.call("monitor", credential, process_id)
    }

    async fn unmonitor(
        &self,
        credential: &Credential,
        process_id: &ProcessId,
    ) -> Result<String, EvaluationError> {
        self.call("unmonitor", credential, process_id)
    }
}

/// Loader answering from a fixed table of directive → outcome.
#[derive(Debug, Default)]
pub struct StubLoader {
    table: HashMap<String, Result<String, LoadError>>,
    seen: Mutex<Vec<String>>,
}

impl StubLoader {
    pub fn with(mut self, directive: &str, outcome: Result<&str, &str>) -> Self {
        let outcome = outcome.map(str::to_string).map_err(LoadError::new);
        self.table.insert(directive.to_string(), outcome);
        self
    }

    pub fn seen(&self) -> Vec<String> {
        lock(&self.seen).clone()
    }
}

impl DirectiveLoader for StubLoader {
    fn expand(&self, directive: &str) -> Result<String, LoadError> {
        lock(&self.seen).push(directive.to_string());
        self.table
            .get(directive)
            .cloned()
            .unwrap_or_else(|| Err(LoadError::new(format!("no stub for {directive}"))))
    }
}

/// Feed whose handles only write to the event log.
#[derive(Debug, Default)]
pub struct CountingFeed {
    log: EventLog,
}

impl CountingFeed {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

struct CountingHandle(EventLog);

impl MonitorHandle for CountingHandle {
    fn stop(self: Box<Self>) {
        self.0.push("monitor.stop");
    }
}

impl StatusFeed for CountingFeed {
    fn start(&self, process_id: &ProcessId) -> Box<dyn MonitorHandle> {
        assert_eq!(process_id.as_str(), PROCESS_ID);
        self.log.push("monitor.start");
        Box::new(CountingHandle(self.log.clone()))
    }
}

pub struct StubCredentials(pub Option<Credential>);

#[async_trait]
impl CredentialProvider for StubCredentials {
    async fn acquire(&self) -> Result<Credential, CredentialError> {
        self.0.clone().ok_or(CredentialError::MissingModulus)
    }
}

pub struct StubRegistry(pub Option<ProcessId>);

#[async_trait]
impl ProcessRegistry for StubRegistry {
    async fn register(&self, _credential: &Credential) -> Result<ProcessId, RegistrationError> {
        self.0.clone().ok_or_else(|| RegistrationError::MissingId {
            name: "default".to_string(),
        })
    }
}

pub struct StubListing(pub String);

#[async_trait]
impl Listing for StubListing {
    async fn query(&self, credential: &Credential) -> Result<String, EvaluationError> {
        Ok(format!("{} owns: {}", credential.owner(), self.0))
    }
}

/// Status source replaying queued batches, then empty ones.
#[derive(Debug, Default)]
pub struct StubStatus {
    batches: Mutex<VecDeque<Result<StatusBatch, EvaluationError>>>,
    cursors: Mutex<Vec<Option<String>>>,
}

impl StubStatus {
    pub fn queue(&self, batch: Result<StatusBatch, EvaluationError>) {
        lock(&self.batches).push_back(batch);
    }

    /// Cursor passed to each poll.
    pub fn cursors(&self) -> Vec<Option<String>> {
        lock(&self.cursors).clone()
    }
}

#[async_trait]
impl StatusSource for StubStatus {
    async fn poll(
        &self,
        _process_id: &ProcessId,
        cursor: Option<&str>,
    ) -> Result<StatusBatch, EvaluationError> {
        lock(&self.cursors).push(cursor.map(str::to_string));
        let queued = lock(&self.batches).pop_front();
        queued.unwrap_or_else(|| Ok(StatusBatch::default()))
    }
}

pub fn credential() -> Credential {
    Credential::new(serde_json::json!({ "kty": "RSA", "n": "AQAB" }), OWNER)
}

/// A wired-up dispatcher plus handles on every fake behind it.
pub struct Harness {
    pub log: EventLog,
    pub display: Arc<RecordingDisplay>,
    pub remote: Arc<StubRemote>,
    pub control: Arc<StubControl>,
    pub files: Arc<StubLoader>,
    pub blueprints: Arc<StubLoader>,
    pub feed: Arc<CountingFeed>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_loaders(StubLoader::default(), StubLoader::default())
    }

    pub fn with_loaders(files: StubLoader, blueprints: StubLoader) -> Self {
        let log = EventLog::default();
        Self {
            display: Arc::new(RecordingDisplay::with_log(log.clone())),
            remote: Arc::new(StubRemote::new(log.clone())),
            control: Arc::new(StubControl::default()),
            files: Arc::new(files),
            blueprints: Arc::new(blueprints),
            feed: Arc::new(CountingFeed::new(log.clone())),
            log,
        }
    }

    pub fn with_remote(mut self, remote: StubRemote) -> Self {
        self.remote = Arc::new(remote);
        self
    }

    pub fn with_control(mut self, control: StubControl) -> Self {
        self.control = Arc::new(control);
        self
    }

    pub fn evaluator(&self) -> Evaluator {
        Evaluator::new(self.remote.clone(), self.display.clone(), false)
    }

    /// Evaluator that echoes the process id and raw payload of every call.
    pub fn verbose_evaluator(&self) -> Evaluator {
        Evaluator::new(self.remote.clone(), self.display.clone(), true)
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            self.display.clone(),
            self.evaluator(),
            self.control.clone(),
            self.files.clone(),
            self.blueprints.clone(),
        )
    }

    /// A session with the counting feed already live.
    pub fn session(&self) -> Session {
        let mut monitor = MonitorLifecycle::new(self.feed.clone(), ProcessId::new(PROCESS_ID));
        monitor.launch();
        Session::new(ProcessId::new(PROCESS_ID), credential(), None, monitor)
    }

    pub fn evaluations(&self) -> Vec<String> {
        self.remote.submissions()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
