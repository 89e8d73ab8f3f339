use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use arrange_wm::common::config::{Config, config_file};
use arrange_wm::common::log;
use arrange_wm::engine;
use arrange_wm::gateway::{CommandOutcome, Gateway, SocketGateway};
use arrange_wm::model::AppQuery;
use arrange_wm::opener::{OpenerEvent, WindowOpener};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "arrange", about = "Converge windows to a declared layout")]
struct Cli {
    /// Configuration file. Defaults to ~/.arrange.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Apply a named layout scheme.
    Apply {
        scheme: String,

        /// Launch applications whose windows are missing, wait for them to
        /// appear, then apply the layout a second time.
        #[arg(long)]
        launch: bool,
    },
    /// Parse and validate the configuration without issuing any command.
    Validate,
    /// List the layout schemes the configuration declares.
    Layouts,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    log::init_logging();

    let path = cli.config.unwrap_or_else(config_file);
    let config = if path.exists() {
        Config::read(&path)?
    } else {
        Config::default()
    };

    match cli.command {
        Cmd::Validate => {
            let issues = config.validate();
            if issues.is_empty() {
                println!("ok");
                return Ok(());
            }
            for issue in &issues {
                eprintln!("{issue}");
            }
            bail!("{} configuration issue(s) found", issues.len());
        }
        Cmd::Layouts => {
            let mut names: Vec<_> = config.layouts.keys().cloned().collect();
            names.sort();
            for name in names {
                println!("{name}");
            }
            Ok(())
        }
        Cmd::Apply { scheme, launch } => {
            for issue in config.validate() {
                warn!(issue = %issue, "configuration issue");
            }
            let runtime =
                tokio::runtime::Builder::new_current_thread().enable_all().build()?;
            runtime.block_on(apply(&config, &scheme, launch))
        }
    }
}

async fn apply(config: &Config, scheme: &str, launch: bool) -> anyhow::Result<()> {
    let gateway: Arc<SocketGateway> = Arc::new(match &config.settings.socket_path {
        Some(path) => SocketGateway::new(path),
        None => SocketGateway::with_default_path(),
    });
    info!(socket = %gateway.path().display(), scheme, "applying layout");

    engine::apply_layout(gateway.as_ref(), config.plan_for(scheme)?).await?;

    if launch {
        let missing = missing_queries(gateway.as_ref(), config, scheme).await?;
        if !missing.is_empty() {
            info!(count = missing.len(), "waiting for launched windows");
            let (opener, mut events) =
                WindowOpener::spawn(gateway.clone(), config.settings.opener_config());
            for query in missing {
                opener.add(query);
            }
            drop(opener);
            while let Some(event) = events.recv().await {
                match event {
                    OpenerEvent::WindowOpened(query) => {
                        info!(app = %query.app, "window opened");
                    }
                    OpenerEvent::AllOpened => {
                        engine::apply_layout(gateway.as_ref(), config.plan_for(scheme)?).await?;
                        break;
                    }
                    OpenerEvent::TimedOut { remaining } => {
                        for query in &remaining {
                            warn!(app = %query.app, "window never appeared");
                        }
                        // Place whatever did show up.
                        engine::apply_layout(gateway.as_ref(), config.plan_for(scheme)?).await?;
                        break;
                    }
                }
            }
        }
    }

    focus_first_window(gateway.as_ref(), config, scheme).await;
    Ok(())
}

/// Queries of the scheme that can be launched and currently match no live
/// window.
async fn missing_queries(
    gateway: &dyn Gateway,
    config: &Config,
    scheme: &str,
) -> anyhow::Result<Vec<AppQuery>> {
    let live = gateway.list_windows().await?;
    let queries = config.scheme_queries(scheme)?;
    Ok(queries
        .into_iter()
        .filter(|query| query.open.is_some() && !live.iter().any(|w| query.matches(w)))
        .collect())
}

async fn focus_first_window(gateway: &dyn Gateway, config: &Config, scheme: &str) {
    let Ok(queries) = config.scheme_queries(scheme) else {
        return;
    };
    let Some(first) = queries.first() else {
        return;
    };
    match gateway.list_windows().await {
        Ok(live) => {
            if let Some(window) = live.iter().find(|w| first.matches(w)) {
                let result = gateway.focus_window(window.id).await;
                let _ = CommandOutcome::note(format_args!("focus window {}", window.id), result);
            }
        }
        Err(err) => warn!(error = %err, "could not list windows to focus"),
    }
}
