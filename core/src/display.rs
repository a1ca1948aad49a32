/// Placeholder printed for a blank line or an evaluation with no output.
pub const EMPTY_PLACEHOLDER: &str = "undefined";

/// The shared output stream. Implementations must tolerate calls from the
/// live feed task while the loop is waiting for input.
pub trait Display: Send + Sync {
    /// Ordinary evaluation output.
    fn output(&self, text: &str);

    /// In-band errors and failed commands; rendered distinctly.
    fn error(&self, text: &str);

    /// Banners and other REPL chatter.
    fn notice(&self, text: &str);

    /// One entry from the live feed.
    fn status(&self, text: &str);

    fn empty(&self) {
        self.output(EMPTY_PLACEHOLDER);
    }

    /// Starts a transient progress indication that lasts until the returned
    /// guard is dropped.
    fn begin_progress(&self, label: &str) -> Progress;
}

/// Something that can stop a progress indication.
pub trait ProgressIndicator: Send {
    fn finish(&mut self);
}

/// Scoped progress indication. Ends on drop, so every exit path out of a
/// remote call clears it.
pub struct Progress {
    indicator: Option<Box<dyn ProgressIndicator>>,
}

impl Progress {
    pub fn new(indicator: Box<dyn ProgressIndicator>) -> Self {
        Self {
            indicator: Some(indicator),
        }
    }

    /// A guard with nothing behind it.
    pub fn none() -> Self {
        Self { indicator: None }
    }

    pub fn finish(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(mut indicator) = self.indicator.take() {
            indicator.finish();
        }
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        self.stop();
    }
}
