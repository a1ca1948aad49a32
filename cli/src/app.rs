use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use aos_core::Bootstrap;
use aos_core::Config;
use aos_core::Dispatcher;
use aos_core::Evaluator;
use aos_core::LiveFeed;
use aos_core::Repl;
use aos_core::Startup;
use aos_core::StartupOptions;
use aos_core::display::Display;
use aos_services::BlueprintLoader;
use aos_services::FileLoader;
use aos_services::GatewayClient;
use aos_services::WalletProvider;
use aos_services::export_blueprints;
use tracing::info;

use crate::args::Cli;
use crate::line_reader::TerminalLines;
use crate::logging;
use crate::terminal::SPLASH;
use crate::terminal::TerminalDisplay;

pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config =
        Config::load_with_overrides(cli.overrides()).context("failed to load configuration")?;
    let _log_guard = logging::init(&config.log_dir())?;
    info!(gateway = %config.gateway_url, process = %config.process_name, "aos starting");

    let display = Arc::new(TerminalDisplay::new());

    if let Some(dest) = &cli.get_blueprints {
        copy_blueprints(display.as_ref(), &config.blueprints_dir, dest)?;
        return Ok(ExitCode::SUCCESS);
    }

    display.output(SPLASH);
    display.notice(&format!("aos v{}", env!("CARGO_PKG_VERSION")));

    let gateway =
        Arc::new(GatewayClient::from_config(&config).context("failed to build gateway client")?);
    let files = Arc::new(FileLoader::new());
    let evaluator = Evaluator::new(gateway.clone(), display.clone(), config.verbose);
    let feed = LiveFeed::new(gateway.clone(), display.clone(), config.monitor_interval);

    let bootstrap = Bootstrap {
        credentials: Arc::new(WalletProvider::new(config.wallet.clone())),
        registry: gateway.clone(),
        listing: gateway.clone(),
        files: files.clone(),
        feed: Some(Arc::new(feed)),
        evaluator: evaluator.clone(),
        display: display.clone(),
    };
    let options = StartupOptions {
        list: cli.list,
        load_files: cli.load.clone(),
    };

    let mut session = match bootstrap.run(&options).await {
        Ok(Startup::Listed) => return Ok(ExitCode::SUCCESS),
        Ok(Startup::Ready(session)) => session,
        Err(err) => {
            display.error(&err.to_string());
            return Ok(ExitCode::FAILURE);
        }
    };

    let (lines, printer) = TerminalLines::spawn(config.history_file.clone())?;
    if let Some(printer) = printer {
        display.install_printer(printer);
    }
    let dispatcher = Dispatcher::new(
        display.clone(),
        evaluator,
        gateway,
        files,
        Arc::new(BlueprintLoader::new(config.blueprints_dir.clone())),
    );
    let lines = Repl::new(lines, dispatcher).run(&mut session).await?;
    drop(lines);
    Ok(ExitCode::SUCCESS)
}

fn copy_blueprints(display: &dyn Display, src: &Path, dest: &Path) -> anyhow::Result<()> {
    let written = export_blueprints(src, dest).with_context(|| {
        format!(
            "failed to copy blueprints from {} to {}",
            src.display(),
            dest.display()
        )
    })?;
    if written.is_empty() {
        display.notice(&format!("No blueprints found in {}", src.display()));
        return Ok(());
    }
    for path in &written {
        display.output(&format!("Copied {}", path.display()));
    }
    info!(count = written.len(), dest = %dest.display(), "blueprints exported");
    Ok(())
}
