use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use crate::capability::RemoteEvaluator;
use crate::capability::RemoteReply;
use crate::display::Display;
use crate::session::Session;

pub const SIGNING_LABEL: &str = "[Signing message and sequencing...]";
pub const CONNECTING_LABEL: &str = "[Connecting to Process...]";

/// Code sent on connect to learn the process prompt.
pub const CONNECT_PROBE: &str = "\"Loading...\"";

/// Displayable outcome of one evaluation. Remote failures are folded into
/// `output`, so callers always get one of these back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationResult {
    pub output: Option<String>,
    pub error: Option<String>,
    pub next_prompt: Option<String>,
}

impl EvaluationResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            output: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn show(&self, display: &dyn Display) {
        match (&self.error, &self.output) {
            (Some(error), _) => display.error(error),
            (None, Some(output)) => display.output(output),
            (None, None) => display.empty(),
        }
    }
}

impl From<RemoteReply> for EvaluationResult {
    fn from(reply: RemoteReply) -> Self {
        Self {
            output: reply.output,
            error: reply.error,
            next_prompt: reply.prompt,
        }
    }
}

/// Runs submissions against the remote process one at a time.
#[derive(Clone)]
pub struct Evaluator {
    remote: Arc<dyn RemoteEvaluator>,
    display: Arc<dyn Display>,
    verbose: bool,
}

impl Evaluator {
    pub fn new(remote: Arc<dyn RemoteEvaluator>, display: Arc<dyn Display>, verbose: bool) -> Self {
        Self {
            remote,
            display,
            verbose,
        }
    }

    /// Submits one piece of code. The live feed is suspended for the length
    /// of the call and resumed afterwards, whatever the outcome.
    pub async fn evaluate(&self, submission: &str, session: &mut Session) -> EvaluationResult {
        session.monitor_mut().suspend();
        let result = self.submit(submission, session, SIGNING_LABEL).await;
        session.monitor_mut().resume();
        result
    }

    /// First contact with the process. Returns the prompt it reports, if any.
    pub async fn connect(&self, session: &mut Session) -> Option<String> {
        self.submit(CONNECT_PROBE, session, CONNECTING_LABEL)
            .await
            .next_prompt
    }

    /// Evaluates without displaying the outcome; used for startup loads.
    pub async fn submit_quiet(&self, submission: &str, session: &mut Session) -> EvaluationResult {
        session.monitor_mut().suspend();
        let result = self.submit(submission, session, SIGNING_LABEL).await;
        session.monitor_mut().resume();
        if let Some(error) = &result.error {
            warn!("startup load reported an error: {error}");
        }
        result
    }

    async fn submit(&self, submission: &str, session: &Session, label: &str) -> EvaluationResult {
        let progress = self.display.begin_progress(label);
        debug!(
            process = %session.process_id(),
            bytes = submission.len(),
            "submitting evaluation"
        );
        let outcome = self
            .remote
            .evaluate(submission, session.process_id(), session.credential())
            .await;
        progress.finish();

        match outcome {
            Ok(reply) => {
                if self.verbose {
                    self.echo(session, &reply.raw);
                }
                EvaluationResult::from(reply)
            }
            Err(err) => {
                warn!(process = %session.process_id(), "evaluation failed: {err}");
                if self.verbose {
                    self.echo(session, &serde_json::json!({ "failure": err.to_string() }));
                }
                EvaluationResult::failure(err.to_string())
            }
        }
    }

    fn echo(&self, session: &Session, payload: &serde_json::Value) {
        self.display.notice(&format!("{{ id: '{}' }}", session.process_id()));
        let rendered =
            serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
        self.display.notice(&format!("{{ result: {rendered} }}"));
    }
}
