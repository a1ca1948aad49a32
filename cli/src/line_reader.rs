//! Line editing on a dedicated OS thread.
//!
//! rustyline blocks and owns the terminal while reading, so the editor lives
//! on its own thread and the async loop asks it for one line at a time.

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread::JoinHandle;

use aos_core::ReplError;
use aos_core::capability::LineSource;
use aos_core::capability::ReadOutcome;
use async_trait::async_trait;
use rustyline::DefaultEditor;
use rustyline::ExternalPrinter;
use rustyline::error::ReadlineError;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::warn;

type ReadReply = Result<ReadOutcome, ReplError>;

enum EditorRequest {
    Read {
        prompt: String,
        reply: oneshot::Sender<ReadReply>,
    },
    /// Append to the recall history.
    Remember(String),
}

pub struct TerminalLines {
    requests: Option<mpsc::Sender<EditorRequest>>,
    thread: Option<JoinHandle<()>>,
}

impl TerminalLines {
    /// Starts the editor thread. History is loaded from `history_file` and
    /// written back when the reader is dropped. The returned printer, when
    /// available, writes above the prompt without corrupting it.
    pub fn spawn(
        history_file: PathBuf,
    ) -> Result<(Self, Option<Box<dyn ExternalPrinter + Send>>), ReplError> {
        let (requests, incoming) = mpsc::channel::<EditorRequest>();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let thread = std::thread::Builder::new()
            .name("aos-readline".into())
            .spawn(move || {
                let mut editor = match DefaultEditor::new() {
                    Ok(editor) => editor,
                    Err(err) => {
                        let _ = ready_tx.send(Err(ReplError::Input(err.to_string())));
                        return;
                    }
                };
                if let Err(err) = editor.load_history(&history_file) {
                    debug!("history not loaded: {err}");
                }
                let printer = editor
                    .create_external_printer()
                    .ok()
                    .map(|printer| Box::new(printer) as Box<dyn ExternalPrinter + Send>);
                let _ = ready_tx.send(Ok(printer));

                serve(&mut editor, &incoming);

                if let Some(parent) = history_file.parent() {
                    let _ = std::fs::create_dir_all(parent);
                }
                if let Err(err) = editor.save_history(&history_file) {
                    warn!(path = %history_file.display(), "failed to save history: {err}");
                }
            })
            .map_err(|err| ReplError::Input(err.to_string()))?;

        let printer = ready_rx
            .recv()
            .map_err(|_| ReplError::Input("line editor exited during startup".to_string()))??;
        Ok((
            Self {
                requests: Some(requests),
                thread: Some(thread),
            },
            printer,
        ))
    }
}

fn serve(editor: &mut DefaultEditor, incoming: &mpsc::Receiver<EditorRequest>) {
    while let Ok(request) = incoming.recv() {
        let (prompt, reply) = match request {
            EditorRequest::Read { prompt, reply } => (prompt, reply),
            EditorRequest::Remember(line) => {
                if let Err(err) = editor.add_history_entry(line.as_str()) {
                    debug!("history entry dropped: {err}");
                }
                continue;
            }
        };
        let outcome = match editor.readline(&prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(err) => Err(ReplError::Input(err.to_string())),
        };
        if reply.send(outcome).is_err() {
            break;
        }
    }
}

#[async_trait]
impl LineSource for TerminalLines {
    async fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome, ReplError> {
        let Some(requests) = &self.requests else {
            return Ok(ReadOutcome::Eof);
        };
        let (reply, answer) = oneshot::channel();
        requests
            .send(EditorRequest::Read {
                prompt: prompt.to_string(),
                reply,
            })
            .map_err(|_| ReplError::Input("line editor is gone".to_string()))?;
        answer
            .await
            .map_err(|_| ReplError::Input("line editor is gone".to_string()))?
    }

    fn remember(&mut self, line: &str) {
        if let Some(requests) = &self.requests
            && requests.send(EditorRequest::Remember(line.to_string())).is_err()
        {
            debug!("line editor is gone; not remembering line");
        }
    }
}

impl Drop for TerminalLines {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!("line editor thread panicked");
        }
    }
}
