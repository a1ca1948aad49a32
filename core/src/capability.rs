//! Seams between the REPL engine and everything that talks to the outside
//! world. The engine only ever holds these as trait objects.

use async_trait::async_trait;

use crate::error::CredentialError;
use crate::error::EvaluationError;
use crate::error::LoadError;
use crate::error::RegistrationError;
use crate::error::ReplError;
use crate::session::Credential;
use crate::session::ProcessId;

/// Reply to one evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteReply {
    pub output: Option<String>,
    pub error: Option<String>,
    pub prompt: Option<String>,
    /// Untouched payload, echoed when verbose output is enabled.
    pub raw: serde_json::Value,
}

impl RemoteReply {
    pub fn output(text: impl Into<String>) -> Self {
        Self {
            output: Some(text.into()),
            ..Self::default()
        }
    }
}

/// New status entries since `cursor`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusBatch {
    pub cursor: Option<String>,
    pub entries: Vec<String>,
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn acquire(&self) -> Result<Credential, CredentialError>;
}

/// Finds the caller's process, creating one when none exists.
#[async_trait]
pub trait ProcessRegistry: Send + Sync {
    async fn register(&self, credential: &Credential) -> Result<ProcessId, RegistrationError>;
}

/// Sign, send and wait for the result of one code submission. Every call is
/// a separate remote side effect.
#[async_trait]
pub trait RemoteEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        code: &str,
        process_id: &ProcessId,
        credential: &Credential,
    ) -> Result<RemoteReply, EvaluationError>;
}

/// Server-side scheduling of status ticks, behind `.monitor` / `.unmonitor`.
#[async_trait]
pub trait ProcessControl: Send + Sync {
    async fn monitor(
        &self,
        credential: &Credential,
        process_id: &ProcessId,
    ) -> Result<String, EvaluationError>;

    async fn unmonitor(
        &self,
        credential: &Credential,
        process_id: &ProcessId,
    ) -> Result<String, EvaluationError>;
}

#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn poll(
        &self,
        process_id: &ProcessId,
        cursor: Option<&str>,
    ) -> Result<StatusBatch, EvaluationError>;
}

#[async_trait]
pub trait Listing: Send + Sync {
    async fn query(&self, credential: &Credential) -> Result<String, EvaluationError>;
}

/// Turns a directive line (`.load foo.lua`, `.load-blueprint chat`) into the
/// code it stands for.
pub trait DirectiveLoader: Send + Sync {
    fn expand(&self, directive: &str) -> Result<String, LoadError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Ctrl-C: abandon the current line.
    Interrupted,
    /// Ctrl-D or a closed input stream.
    Eof,
}

#[async_trait]
pub trait LineSource: Send {
    async fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome, ReplError>;

    /// Makes `line` available for recall. Called with each line the session
    /// records in its history, in the same order.
    fn remember(&mut self, _line: &str) {}
}
