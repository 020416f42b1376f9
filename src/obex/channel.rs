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

//! Buffered byte channel to the peer.

use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Result, TransferError};

/// Cancels a running transfer from another task.
///
/// Any read or write suspended on the channel fails with
/// [`TransferError::Aborted`] once triggered.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    token: CancellationToken,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.token.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// An open, connected byte stream with exact-length reads.
pub struct Channel<S> {
    inner: BufReader<S>,
    io_timeout: Option<Duration>,
    abort: AbortHandle,
}

impl<S> Channel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a connected stream. `io_timeout` bounds every single read or write.
    pub fn new(stream: S, io_timeout: Option<Duration>, abort: AbortHandle) -> Self {
        Self {
            inner: BufReader::new(stream),
            io_timeout,
            abort,
        }
    }

    /// Write all bytes and flush.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        guarded(&self.abort, self.io_timeout, self.inner.write_all(bytes)).await?;
        guarded(&self.abort, self.io_timeout, self.inner.flush()).await
    }

    /// Read exactly `n` bytes.
    pub async fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        guarded(&self.abort, self.io_timeout, self.inner.read_exact(&mut buf)).await?;
        Ok(buf)
    }

    /// Bytes already received but not consumed yet.
    pub fn buffered(&self) -> usize {
        self.inner.buffer().len()
    }

    /// Shut down the write side. Errors are ignored.
    pub async fn close(&mut self) {
        if let Err(e) = self.inner.shutdown().await {
            debug!("Channel shutdown failed: {}", e);
        }
    }
}

async fn guarded<T>(
    abort: &AbortHandle,
    io_timeout: Option<Duration>,
    io: impl Future<Output = io::Result<T>>,
) -> Result<T> {
    let bounded = async {
        match io_timeout {
            Some(limit) => match tokio::time::timeout(limit, io).await {
                Ok(result) => result.map_err(TransferError::from),
                Err(_) => Err(TransferError::Timeout),
            },
            None => io.await.map_err(TransferError::from),
        }
    };

    tokio::select! {
        biased;
        _ = abort.token().cancelled() => Err(TransferError::Aborted),
        result = bounded => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read_exact() {
        let (client, mut peer) = tokio::io::duplex(64);
        let mut channel = Channel::new(client, None, AbortHandle::new());

        channel.write(&[1, 2, 3]).await.unwrap();
        let mut got = [0u8; 3];
        peer.read_exact(&mut got).await.unwrap();
        assert_eq!(got, [1, 2, 3]);

        peer.write_all(&[9, 8, 7, 6]).await.unwrap();
        assert_eq!(channel.read_exact(1).await.unwrap(), vec![9]);
        assert_eq!(channel.buffered(), 3);
        assert_eq!(channel.read_exact(3).await.unwrap(), vec![8, 7, 6]);
        assert_eq!(channel.buffered(), 0);
    }

    #[tokio::test]
    async fn test_read_times_out() {
        let (client, _peer) = tokio::io::duplex(64);
        let mut channel = Channel::new(
            client,
            Some(Duration::from_millis(20)),
            AbortHandle::new(),
        );

        let result = channel.read_exact(1).await;
        assert!(matches!(result, Err(TransferError::Timeout)));
    }

    #[tokio::test]
    async fn test_abort_interrupts_read() {
        let (client, _peer) = tokio::io::duplex(64);
        let abort = AbortHandle::new();
        let mut channel = Channel::new(client, None, abort.clone());

        let trigger = abort.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.abort();
        });

        let result = channel.read_exact(1).await;
        assert!(matches!(result, Err(TransferError::Aborted)));
        assert!(abort.is_aborted());
    }

    #[tokio::test]
    async fn test_peer_hangup_is_transport_error() {
        let (client, peer) = tokio::io::duplex(64);
        drop(peer);
        let mut channel = Channel::new(client, None, AbortHandle::new());

        let result = channel.read_exact(2).await;
        assert!(matches!(result, Err(TransferError::Transport(_))));
    }
}
