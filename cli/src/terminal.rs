use std::io::IsTerminal;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use aos_core::display::Display;
use aos_core::display::Progress;
use aos_core::display::ProgressIndicator;
use owo_colors::OwoColorize;
use rustyline::ExternalPrinter;
use tokio::task::JoinHandle;

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const SPINNER_TICK: Duration = Duration::from_millis(80);

pub const SPLASH: &str = r"
      _____                   _______                   _____
     /\    \                 /::\    \                 /\    \
    /::\    \               /::::\    \               /::\    \
   /::::\    \             /::::::\    \             /::::\    \
  /::::::\    \           /::::::::\    \           /::::::\    \
 /:::/\:::\    \         /:::/~~\:::\    \         /:::/\:::\    \
/:::/__\:::\    \       /:::/    \:::\    \       /:::/__\:::\    \
\:::\   \:::\    \     /:::/    / \:::\    \      \:::\   \:::\    \
 \:::\   \:::\____\   /:::/____/   \:::\____\   ___\:::\   \:::\    \
  \:::\  /:::/    /   \:::\    \   /:::/    /  /\   \:::\   \:::\    \
   \:::\/:::/    /     \:::\    \ /:::/    /  /::\   \:::\   \:::\____\
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Error,
    Notice,
    Status,
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Terminal rendering of REPL output. Status lines go through the line
/// editor's printer while it owns the terminal.
pub struct TerminalDisplay {
    color: bool,
    animate: bool,
    printer: Mutex<Option<Box<dyn ExternalPrinter + Send>>>,
    stderr: Arc<Mutex<()>>,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self {
            color: supports_color::on(supports_color::Stream::Stdout).is_some(),
            animate: std::io::stderr().is_terminal(),
            printer: Mutex::new(None),
            stderr: Arc::new(Mutex::new(())),
        }
    }

    /// No color, no spinner.
    pub fn plain() -> Self {
        Self {
            color: false,
            animate: false,
            printer: Mutex::new(None),
            stderr: Arc::new(Mutex::new(())),
        }
    }

    pub fn install_printer(&self, printer: Box<dyn ExternalPrinter + Send>) {
        *lock(&self.printer) = Some(printer);
    }

    pub fn paint(&self, tone: Tone, text: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        match tone {
            Tone::Plain => text.to_string(),
            Tone::Error => text.red().to_string(),
            Tone::Notice => text.green().to_string(),
            Tone::Status => text.cyan().to_string(),
        }
    }

    fn print(&self, tone: Tone, text: &str) {
        let line = self.paint(tone, text);
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{line}");
        let _ = stdout.flush();
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TerminalDisplay {
    fn output(&self, text: &str) {
        self.print(Tone::Plain, text);
    }

    fn error(&self, text: &str) {
        self.print(Tone::Error, text);
    }

    fn notice(&self, text: &str) {
        self.print(Tone::Notice, text);
    }

    fn status(&self, text: &str) {
        let line = self.paint(Tone::Status, text);
        if let Some(printer) = lock(&self.printer).as_mut()
            && printer.print(format!("{line}\n")).is_ok()
        {
            return;
        }
        self.print(Tone::Plain, &line);
    }

    fn begin_progress(&self, label: &str) -> Progress {
        if !self.animate {
            return Progress::none();
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return Progress::none();
        };
        let stopped = Arc::new(AtomicBool::new(false));
        let task = runtime.spawn(spin(
            label.to_string(),
            Arc::clone(&stopped),
            Arc::clone(&self.stderr),
        ));
        Progress::new(Box::new(Spinner {
            stopped,
            task: Some(task),
            stderr: Arc::clone(&self.stderr),
        }))
    }
}

async fn spin(label: String, stopped: Arc<AtomicBool>, stderr: Arc<Mutex<()>>) {
    let mut ticker = tokio::time::interval(SPINNER_TICK);
    for frame in SPINNER_FRAMES.iter().cycle() {
        ticker.tick().await;
        let _guard = lock(&stderr);
        if stopped.load(Ordering::SeqCst) {
            break;
        }
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "\r{frame} {label}");
        let _ = err.flush();
    }
}

struct Spinner {
    stopped: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
    stderr: Arc<Mutex<()>>,
}

impl ProgressIndicator for Spinner {
    fn finish(&mut self) {
        let _guard = lock(&self.stderr);
        self.stopped.store(true, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "\r\x1b[2K");
        let _ = err.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_display_leaves_text_alone() {
        let display = TerminalDisplay::plain();
        for tone in [Tone::Plain, Tone::Error, Tone::Notice, Tone::Status] {
            assert_eq!(display.paint(tone, "boom"), "boom");
        }
    }

    #[test]
    fn colored_errors_are_red() {
        let display = TerminalDisplay {
            color: true,
            ..TerminalDisplay::plain()
        };
        assert_eq!(display.paint(Tone::Error, "boom"), "\u{1b}[31mboom\u{1b}[39m");
        assert_eq!(display.paint(Tone::Plain, "ok"), "ok");
    }

    #[test]
    fn plain_display_has_no_spinner() {
        let display = TerminalDisplay::plain();
        display.begin_progress("[working]").finish();
    }
}
