use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing::warn;

use crate::capability::CredentialProvider;
use crate::capability::DirectiveLoader;
use crate::capability::Listing;
use crate::capability::ProcessRegistry;
use crate::display::Display;
use crate::error::ReplError;
use crate::error::Result;
use crate::evaluate::Evaluator;
use crate::monitor::MonitorLifecycle;
use crate::monitor::StatusFeed;
use crate::session::Session;

#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    /// Print the caller's processes and stop.
    pub list: bool,
    /// Files replayed as `.load <file>` before the first prompt.
    pub load_files: Vec<PathBuf>,
}

pub enum Startup {
    /// `--list` was handled; nothing left to do.
    Listed,
    Ready(Session),
}

/// One-shot setup that hands a connected session to the loop.
pub struct Bootstrap {
    pub credentials: Arc<dyn CredentialProvider>,
    pub registry: Arc<dyn ProcessRegistry>,
    pub listing: Arc<dyn Listing>,
    pub files: Arc<dyn DirectiveLoader>,
    pub feed: Option<Arc<dyn StatusFeed>>,
    pub evaluator: Evaluator,
    pub display: Arc<dyn Display>,
}

impl Bootstrap {
    pub async fn run(&self, options: &StartupOptions) -> Result<Startup> {
        let credential = self.credentials.acquire().await?;
        info!(owner = credential.owner(), "wallet loaded");

        if options.list {
            let listing = self
                .listing
                .query(&credential)
                .await
                .map_err(ReplError::Listing)?;
            self.display.output(&listing);
            return Ok(Startup::Listed);
        }

        let process_id = self.registry.register(&credential).await?;
        info!(process = %process_id, "process registered");
        self.display.notice(&format!("Process: {process_id}"));

        let monitor = match &self.feed {
            Some(feed) => MonitorLifecycle::new(Arc::clone(feed), process_id.clone()),
            None => MonitorLifecycle::disabled(process_id.clone()),
        };
        let mut session = Session::new(process_id, credential, None, monitor);

        let prompt = self.evaluator.connect(&mut session).await;
        session.set_prompt(prompt);

        self.replay_loads(&mut session, &options.load_files).await;

        session.monitor_mut().launch();
        Ok(Startup::Ready(session))
    }

    async fn replay_loads(&self, session: &mut Session, files: &[PathBuf]) {
        let mut chunks = Vec::with_capacity(files.len());
        for file in files {
            let directive = format!(".load {}", file.display());
            match self.files.expand(&directive) {
                Ok(code) => chunks.push(code),
                Err(err) => {
                    warn!(file = %file.display(), "startup load skipped: {err}");
                    self.display.error(err.message());
                }
            }
        }

        let code = chunks.join("\n");
        if code.is_empty() {
            return;
        }
        info!(files = chunks.len(), "replaying startup loads");
        let result = self.evaluator.submit_quiet(&code, session).await;
        session.set_prompt(result.next_prompt);
    }
}
