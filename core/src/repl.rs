use tracing::debug;
use tracing::info;

use crate::capability::LineSource;
use crate::capability::ReadOutcome;
use crate::dispatch::Dispatcher;
use crate::dispatch::Flow;
use crate::error::Result;
use crate::session::Session;

/// The read → dispatch → display loop.
pub struct Repl<L> {
    lines: L,
    dispatcher: Dispatcher,
}

impl<L: LineSource> Repl<L> {
    pub fn new(lines: L, dispatcher: Dispatcher) -> Self {
        Self { lines, dispatcher }
    }

    /// Runs until `.exit` or end of input, which shuts down the same way.
    /// Returns the line source so callers can flush its history.
    pub async fn run(mut self, session: &mut Session) -> Result<L> {
        info!(process = %session.process_id(), "repl started");
        while !session.is_terminated() {
            let prompt = session.current_prompt().to_string();
            let line = match self.lines.read_line(&prompt).await {
                Ok(ReadOutcome::Line(line)) => line,
                Ok(ReadOutcome::Interrupted) => continue,
                Ok(ReadOutcome::Eof) => {
                    debug!("input closed; exiting");
                    self.dispatcher.shutdown(session);
                    break;
                }
                Err(err) => {
                    session.monitor_mut().shutdown();
                    return Err(err);
                }
            };

            if line.trim().is_empty() {
                self.dispatcher.display().empty();
                continue;
            }

            session.record_history(&line);
            self.lines.remember(&line);
            if self.dispatcher.dispatch(session, &line).await == Flow::Exit {
                break;
            }
        }
        info!(
            process = %session.process_id(),
            submitted = session.history().len(),
            "repl finished"
        );
        Ok(self.lines)
    }
}
