//! # Signalist — market-news notification pipeline
//!
//! Usage:
//!   signalist init                                   # Write a default config file
//!   signalist serve                                  # Event bus + daily cron until Ctrl-C
//!   signalist send app/user.created --data '{..}'    # Publish one event and wait for its runs
//!   signalist digest                                 # Run the daily digest now
//!   signalist resume <run-id>                        # Re-drive a failed run from its checkpoints
//!   signalist runs --limit 20                        # Recent runs

mod users;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use signalist_channels::{LogMailer, SmtpMailer};
use signalist_core::config::SignalistConfig;
use signalist_core::event::{Event, WorkflowEvent};
use signalist_core::traits::Mailer;
use signalist_functions::{Collaborators, DAILY_NEWS_SUMMARY_ID, register_all};
use signalist_providers::{FinnhubClient, GeminiClient};
use signalist_scheduler::{
    EventBus, RetryPolicy, RunStore, SchedulerEngine, SqliteRunStore, StepRunner, TerminalResult, Trigger,
    spawn_scheduler,
};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::users::FileUserStore;

#[derive(Parser)]
#[command(
    name = "signalist",
    version,
    about = "📈 Signalist — welcome and daily market-news emails"
)]
struct Cli {
    /// Config file (default: ~/.signalist/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Render emails to the log instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file (refuses to overwrite without --force)
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Run the event bus and the cron scheduler until Ctrl-C
    Serve,
    /// Publish an event and wait for every run it starts
    Send {
        /// Event name, e.g. app/user.created
        name: String,
        /// Event payload as JSON
        #[arg(long, default_value = "{}")]
        data: String,
    },
    /// Run the daily news digest now
    Digest,
    /// Resume a run that did not succeed
    Resume { run_id: String },
    /// List recent runs
    Runs {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

fn load_config(path: Option<&str>) -> Result<SignalistConfig> {
    let config = match path {
        Some(p) => SignalistConfig::load_from(&expand_path(p))?,
        None => SignalistConfig::load()?,
    };
    Ok(config)
}

fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let path = path.map(expand_path).unwrap_or_else(SignalistConfig::default_path);
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    SignalistConfig::default().save_to(&path)?;
    Ok(path)
}

fn open_store(config: &SignalistConfig) -> Result<Arc<SqliteRunStore>> {
    let path = expand_path(&config.store.runs_db);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let store = SqliteRunStore::open(&path).with_context(|| format!("open run store {}", path.display()))?;
    Ok(Arc::new(store))
}

fn build_runner(config: &SignalistConfig, store: Arc<dyn RunStore>, dry_run: bool) -> Result<StepRunner> {
    let mailer: Arc<dyn Mailer> = if dry_run {
        tracing::info!("📝 Dry run: emails are logged, not sent");
        Arc::new(LogMailer)
    } else {
        Arc::new(SmtpMailer::new(&config.email)?)
    };

    let deps = Collaborators {
        users: Arc::new(FileUserStore::new(expand_path(&config.store.users_file))),
        news: Arc::new(FinnhubClient::new(&config.news)?),
        inference: Arc::new(GeminiClient::new(&config.inference)?),
        mailer,
    };

    let mut runner = StepRunner::new(store, RetryPolicy::from_config(&config.retry));
    register_all(&mut runner, deps, config)?;
    Ok(runner)
}

fn report(result: &TerminalResult) {
    let status = if result.succeeded() { "✅" } else { "❌" };
    println!(
        "{status} {} [{}] {} after {} attempt(s)",
        result.workflow_id, result.run_id, result.status, result.attempts
    );
    if let Some(output) = &result.output {
        println!("   output: {output}");
    }
    if let Some(error) = &result.error {
        println!("   error:  {error}");
    }
}

async fn serve(config: &SignalistConfig, runner: Arc<StepRunner>) -> Result<()> {
    let (bus, bus_handle) = EventBus::start(runner.clone());

    let scheduler = if config.scheduler.enabled {
        let engine = Arc::new(Mutex::new(SchedulerEngine::from_runner(&runner)?));
        Some(tokio::spawn(spawn_scheduler(
            engine,
            bus.clone(),
            config.scheduler.check_interval_secs,
        )))
    } else {
        tracing::info!("⏸️ Scheduler disabled");
        None
    };

    println!("📈 Signalist v{}", env!("CARGO_PKG_VERSION"));
    println!("   ⏰ Digest cron:  {}", config.scheduler.digest_cron);
    println!("   🗄️  Run store:    {}", config.store.runs_db);
    println!("   👥 Users file:   {}", config.store.users_file);
    println!();

    tokio::signal::ctrl_c().await?;
    tracing::info!("🛑 Shutting down, waiting for in-flight runs");

    if let Some(handle) = scheduler {
        handle.abort();
        let _ = handle.await;
    }
    drop(bus);
    bus_handle.await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "signalist=debug,signalist_scheduler=debug,signalist_functions=debug,signalist_providers=debug,signalist_channels=debug"
    } else {
        "signalist=info,signalist_scheduler=info,signalist_functions=info,signalist_providers=info,signalist_channels=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    if let Command::Init { force } = &cli.command {
        let path = init_config(cli.config.as_deref(), *force)?;
        println!("📝 Config written to {}", path.display());
        println!("   Set GEMINI_API_KEY and FINNHUB_API_KEY or edit the file.");
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    let store = open_store(&config)?;

    if let Command::Runs { limit } = &cli.command {
        for run in store.list_runs(*limit)? {
            println!(
                "{}  {:<20} {:<9} attempts={} trigger={} created={}",
                run.id,
                run.workflow_id,
                run.status.as_str(),
                run.attempts,
                run.trigger.describe(),
                run.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            if let Some(error) = &run.error {
                println!("    └ {error}");
            }
        }
        return Ok(());
    }

    let runner = Arc::new(build_runner(&config, store, cli.dry_run)?);

    match cli.command {
        Command::Serve => serve(&config, runner).await?,
        Command::Send { name, data } => {
            let data: serde_json::Value =
                serde_json::from_str(&data).context("--data must be valid JSON")?;
            let event = WorkflowEvent::try_from(Event::new(&name, data))?;
            let results = runner.run_subscribers(event).await;
            if results.is_empty() {
                println!("⚠️ No workflow handled {name}");
            }
            results.iter().for_each(report);
        }
        Command::Digest => {
            let result = runner
                .run(DAILY_NEWS_SUMMARY_ID, Trigger::event(WorkflowEvent::SendDailyNews))
                .await?;
            report(&result);
        }
        Command::Resume { run_id } => {
            let result = runner.resume(&run_id).await?;
            report(&result);
        }
        Command::Init { .. } | Command::Runs { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::parse_from(["signalist", "--dry-run", "send", "app/user.created", "--data", "{}"]);
        assert!(cli.dry_run);
        assert!(matches!(cli.command, Command::Send { ref name, .. } if name == "app/user.created"));

        let cli = Cli::parse_from(["signalist", "runs", "-l", "5"]);
        assert!(matches!(cli.command, Command::Runs { limit: 5 }));
    }

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        let path_str = path.to_str().unwrap();

        assert_eq!(init_config(Some(path_str), false).unwrap(), path);
        let config = SignalistConfig::load_from(&path).unwrap();
        assert_eq!(config.digest.article_cap, 6);

        assert!(init_config(Some(path_str), false).is_err());
        assert!(init_config(Some(path_str), true).is_ok());
    }

    #[test]
    fn test_expand_path_keeps_absolute() {
        assert_eq!(expand_path("/tmp/runs.db"), Path::new("/tmp/runs.db"));
    }
}
