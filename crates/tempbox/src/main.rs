//! Tempbox - disposable mailboxes from the terminal.
//!
//! Reads commands from stdin while printing session events as they happen.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod app;
mod command;
mod config;
mod render;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tempbox_core::{SnapshotRepository, SystemClock, Workspace};
use tempbox_http::HttpGateway;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::{App, Flow};
use command::Command;
use config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tempbox=info,tempbox_core=info,tempbox_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::load().await?;
    info!("Starting Tempbox against {}", config.api_base_url);

    let gateway = HttpGateway::new(
        &config.api_base_url,
        Duration::from_secs(config.request_timeout_secs),
    )
    .context("configuring the backend client")?;
    let snapshot = open_snapshot(&config).await;
    let workspace = Workspace::new(
        Arc::new(gateway),
        SystemClock::shared(),
        config.session.clone(),
        snapshot,
    )?;
    let app = App::new(workspace);

    let mut events = app.workspace().session().subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(line) = render::event(&event) {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!("Skipped {skipped} session events"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    if let Err(e) = app.workspace().bootstrap().await {
        println!("! could not create a mailbox: {e}");
    }
    println!("{}", render::screen(app.workspace()));
    println!("type `help` for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("! {e}");
                continue;
            }
        };
        match app.execute(command).await {
            Ok((Flow::Quit, _)) => break,
            Ok((Flow::Continue, output)) => println!("{output}"),
            Err(e) => println!("! {e}"),
        }
    }

    printer.abort();
    if let Err(e) = app.workspace().persist().await {
        warn!("Failed to write snapshot: {e}");
    }
    app.workspace().shutdown();
    info!("Bye");
    Ok(())
}

/// Opens the snapshot cache. Failures only disable offline viewing.
async fn open_snapshot(config: &AppConfig) -> Option<SnapshotRepository> {
    let path = match config.snapshot_path() {
        Ok(path) => path,
        Err(e) => {
            warn!("Snapshot cache disabled: {e:#}");
            return None;
        }
    };
    match SnapshotRepository::new(path.to_str().unwrap_or("snapshot.db")).await {
        Ok(repository) => Some(repository),
        Err(e) => {
            warn!("Snapshot cache disabled: {e}");
            None
        }
    }
}
