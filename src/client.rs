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

//! Pushing files to a single peer.

use std::io::SeekFrom;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncSeek, AsyncSeekExt};
use tracing::{error, info};

use crate::bluetooth::Connector;
use crate::config::TransferConfig;
use crate::error::{Result, TransferError};
use crate::obex::codec;
use crate::obex::constants::sizes::MAX_PACKET;
use crate::obex::{AbortHandle, Channel, Profile, Session, TransferReport};
use crate::progress::{ProgressObserver, ProgressReporter, TransferState};

/// Sends files to one peer device.
///
/// Every transfer opens its own channel and session, so transfers started
/// from separate clients never share state.
pub struct ObexClient<C> {
    connector: Arc<C>,
    address: String,
    config: TransferConfig,
    abort: AbortHandle,
}

impl<C: Connector> ObexClient<C> {
    pub fn new(connector: Arc<C>, address: impl Into<String>, config: TransferConfig) -> Self {
        Self {
            connector,
            address: address.into(),
            config,
            abort: AbortHandle::new(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Handle that aborts transfers of this client from another task.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Abort the running transfer. The client cannot be reused afterwards.
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Send `source` as `name`. Returns whether the peer accepted the object.
    ///
    /// Never fails loudly; use [`transfer`](Self::transfer) for the reason.
    pub async fn send_file<R>(
        &self,
        source: &mut R,
        name: &str,
        profile: Profile,
        observer: Option<&dyn ProgressObserver>,
    ) -> bool
    where
        R: AsyncRead + AsyncSeek + Unpin,
    {
        self.transfer(source, name, profile, observer).await.is_ok()
    }

    /// Send `source` as `name` and report how it went.
    ///
    /// Argument errors come back before any progress is emitted. Every other
    /// failure emits an `Aborted` progress event first.
    pub async fn transfer<R>(
        &self,
        source: &mut R,
        name: &str,
        profile: Profile,
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<TransferReport>
    where
        R: AsyncRead + AsyncSeek + Unpin,
    {
        let total = self.validate(source, name).await?;
        let mut reporter = ProgressReporter::new(observer);
        reporter.report(0.0, TransferState::Connecting);

        info!(
            "Sending '{}' ({} bytes) to {} via {}",
            name, total, self.address, profile
        );

        let outcome = match self.open(profile).await {
            Ok(stream) => {
                let channel = Channel::new(stream, self.config.io_timeout(), self.abort.clone());
                let session = Session::new(&self.address, profile, channel, self.config.clone());
                session.run(source, name, total, &mut reporter).await
            }
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(report) => {
                info!(
                    "Transfer to {} completed: {} chunks, {} bytes{}",
                    self.address,
                    report.chunks_sent,
                    report.bytes_sent,
                    if report.confirmed { "" } else { " (unconfirmed)" }
                );
                reporter.report(100.0, TransferState::Completed);
            }
            Err(e) => {
                error!("Transfer to {} aborted: {}", self.address, e);
                reporter.report(0.0, TransferState::Aborted);
            }
        }
        outcome
    }

    async fn open(&self, profile: Profile) -> Result<C::Stream> {
        let connect = self.connector.connect(&self.address, profile.service_uuid());
        let bounded = async {
            match self.config.connect_timeout() {
                Some(limit) => match tokio::time::timeout(limit, connect).await {
                    Ok(stream) => stream,
                    Err(_) => Err(TransferError::Timeout),
                },
                None => connect.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.abort.token().cancelled() => Err(TransferError::Aborted),
            stream = bounded => stream,
        }
    }

    /// Check arguments and measure the source, leaving it at offset 0.
    async fn validate<R>(&self, source: &mut R, name: &str) -> Result<u64>
    where
        R: AsyncSeek + Unpin,
    {
        if self.address.trim().is_empty() {
            return Err(TransferError::InvalidArgument("address is empty".into()));
        }
        if name.is_empty() {
            return Err(TransferError::InvalidArgument("object name is empty".into()));
        }
        if self.config.block_size == 0 {
            return Err(TransferError::InvalidArgument("block size is zero".into()));
        }
        if codec::max_put_len(name, self.config.block_size) > MAX_PACKET {
            return Err(TransferError::InvalidArgument(format!(
                "block size {} with name '{}' exceeds the maximum packet size",
                self.config.block_size, name
            )));
        }

        let position = source.stream_position().await.map_err(TransferError::Source)?;
        if position != 0 {
            return Err(TransferError::InvalidArgument(format!(
                "source is positioned at {}, expected 0",
                position
            )));
        }
        let total = source
            .seek(SeekFrom::End(0))
            .await
            .map_err(TransferError::Source)?;
        source
            .seek(SeekFrom::Start(0))
            .await
            .map_err(TransferError::Source)?;

        if total > u32::MAX as u64 {
            return Err(TransferError::InvalidArgument(format!(
                "source of {} bytes exceeds the 4 GiB Length header",
                total
            )));
        }
        Ok(total)
    }
}
