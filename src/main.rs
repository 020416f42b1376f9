// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! btpush command line tool

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use btpush::bluetooth::BluezConnector;
use btpush::config::Config;
use btpush::{ObexClient, Profile, Progress, TransferState};

/// Push a file to a paired Bluetooth device over OBEX.
#[derive(Debug, Parser)]
#[command(name = "btpush", version, about)]
struct Cli {
    /// Bluetooth address of the peer, e.g. 00:11:22:33:44:55.
    address: String,

    /// File to send.
    file: PathBuf,

    /// Object name announced to the peer. Defaults to the file name.
    #[arg(long)]
    name: Option<String>,

    /// OBEX profile: "opp" (Object Push) or "ftp" (File Transfer).
    #[arg(long, default_value = "opp")]
    profile: Profile,

    /// BODY bytes per PUT packet.
    #[arg(long)]
    block_size: Option<usize>,

    /// Connect to a fixed RFCOMM channel instead of resolving the service.
    #[arg(long)]
    channel: Option<u8>,

    /// Bluetooth adapter, e.g. hci0.
    #[arg(long)]
    adapter: Option<String>,

    /// Read the peer's packet size the way older clients did.
    #[arg(long)]
    legacy_packet_size: bool,

    /// Configuration file to use instead of the default location.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn log_progress(progress: Progress) {
    match progress.state() {
        TransferState::Aborted => warn!("Transfer aborted"),
        state => info!("{:>5.1}% {}", progress.percentage(), state.as_str()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("btpush=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(block_size) = cli.block_size {
        config.transfer.block_size = block_size;
    }
    if cli.channel.is_some() {
        config.bluetooth.rfcomm_channel = cli.channel;
    }
    if cli.adapter.is_some() {
        config.bluetooth.adapter = cli.adapter.clone();
    }
    if cli.legacy_packet_size {
        config.transfer.legacy_packet_size_parse = true;
    }

    let name = match &cli.name {
        Some(name) => name.clone(),
        None => cli
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("cannot derive an object name from {}", cli.file.display()))?,
    };

    let mut file = tokio::fs::File::open(&cli.file).await?;

    let connector = BluezConnector::new(
        config.bluetooth.adapter.as_deref(),
        config.bluetooth.rfcomm_channel,
    )
    .await?;
    let client = ObexClient::new(Arc::new(connector), cli.address.clone(), config.transfer);

    let abort = client.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, aborting transfer");
            abort.abort();
        }
    });

    match client
        .transfer(&mut file, &name, cli.profile, Some(&log_progress))
        .await
    {
        Ok(report) if report.confirmed => info!("'{}' delivered to {}", name, cli.address),
        Ok(_) => warn!(
            "'{}' sent to {}, but the peer never confirmed it",
            name, cli.address
        ),
        Err(e) => bail!("sending '{}' to {} failed: {}", name, cli.address, e),
    }

    Ok(())
}
