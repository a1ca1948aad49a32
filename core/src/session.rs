use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::monitor::MonitorLifecycle;

/// Prompt shown until the process reports one of its own.
pub const DEFAULT_PROMPT: &str = "aos> ";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(String);

impl ProcessId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Signing material for a process owner. The engine never looks inside;
/// adapters decide what the key material means.
#[derive(Clone, PartialEq)]
pub struct Credential {
    key: serde_json::Value,
    owner: String,
}

impl Credential {
    pub fn new(key: serde_json::Value, owner: impl Into<String>) -> Self {
        Self {
            key,
            owner: owner.into(),
        }
    }

    pub fn key(&self) -> &serde_json::Value {
        &self.key
    }

    /// Public address derived from the key material.
    pub fn owner(&self) -> &str {
        &self.owner
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("owner", &self.owner)
            .field("key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Editor,
    Terminated,
}

/// Everything the input loop mutates between reads.
pub struct Session {
    process_id: ProcessId,
    credential: Credential,
    prompt: String,
    mode: Mode,
    editor_buffer: String,
    history: Vec<String>,
    monitor: MonitorLifecycle,
}

impl Session {
    pub fn new(
        process_id: ProcessId,
        credential: Credential,
        prompt: Option<String>,
        monitor: MonitorLifecycle,
    ) -> Self {
        Self {
            process_id,
            credential,
            prompt: prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
            mode: Mode::Normal,
            editor_buffer: String::new(),
            history: Vec::new(),
            monitor,
        }
    }

    pub fn process_id(&self) -> &ProcessId {
        &self.process_id
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn editor_buffer(&self) -> &str {
        &self.editor_buffer
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn monitor(&self) -> &MonitorLifecycle {
        &self.monitor
    }

    pub fn monitor_mut(&mut self) -> &mut MonitorLifecycle {
        &mut self.monitor
    }

    pub fn is_terminated(&self) -> bool {
        self.mode == Mode::Terminated
    }

    /// Text rendered before the next read: nothing while buffering editor
    /// input.
    pub fn current_prompt(&self) -> &str {
        match self.mode {
            Mode::Editor => "",
            Mode::Normal | Mode::Terminated => &self.prompt,
        }
    }

    pub(crate) fn set_prompt(&mut self, prompt: Option<String>) {
        if let Some(prompt) = prompt {
            self.prompt = prompt;
        }
    }

    pub(crate) fn record_history(&mut self, line: &str) {
        self.history.push(line.to_string());
    }

    pub(crate) fn enter_editor(&mut self) {
        self.mode = Mode::Editor;
    }

    pub(crate) fn buffer_line(&mut self, line: &str) {
        self.editor_buffer.push_str(line);
        self.editor_buffer.push('\n');
    }

    /// Leaves editor mode, handing back whatever was buffered.
    pub(crate) fn take_editor_buffer(&mut self) -> String {
        self.mode = Mode::Normal;
        std::mem::take(&mut self.editor_buffer)
    }

    pub(crate) fn terminate(&mut self) {
        self.editor_buffer.clear();
        self.mode = Mode::Terminated;
    }
}
