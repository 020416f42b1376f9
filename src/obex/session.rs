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

//! OBEX session: CONNECT, PUT loop and DISCONNECT over one channel.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::{debug, info, warn};

use crate::config::TransferConfig;
use crate::error::{Result, TransferError};
use crate::progress::{ProgressReporter, TransferState};

use super::channel::Channel;
use super::codec::{self, ConnectResponse, PutChunk};
use super::constants::response;
use super::constants::sizes::PACKET_PREFIX;
use super::profile::Profile;

/// Outcome of a completed push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    /// PUT packets sent.
    pub chunks_sent: u64,
    /// Object bytes sent in BODY headers.
    pub bytes_sent: u64,
    /// The peer answered "Length Required" at some point.
    pub quirk_mode: bool,
    /// The peer answered with an explicit success. When false, success was
    /// assumed because every chunk went out while in quirk mode.
    pub confirmed: bool,
}

/// Per-transfer connection state.
pub struct Session<S> {
    peer: String,
    profile: Profile,
    config: TransferConfig,
    max_server_packet: u32,
    connection_id: Option<u32>,
    channel: Option<Channel<S>>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a session over an already opened channel.
    pub fn new(
        peer: impl Into<String>,
        profile: Profile,
        channel: Channel<S>,
        config: TransferConfig,
    ) -> Self {
        Self {
            peer: peer.into(),
            profile,
            config,
            max_server_packet: 0,
            connection_id: None,
            channel: Some(channel),
        }
    }

    /// Negotiated maximum packet size, 0 until CONNECT succeeded.
    pub fn max_server_packet(&self) -> u32 {
        self.max_server_packet
    }

    /// Connection id handed out by a File Transfer peer.
    pub fn connection_id(&self) -> Option<u32> {
        self.connection_id
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    fn channel(&mut self) -> Result<&mut Channel<S>> {
        self.channel.as_mut().ok_or(TransferError::Closed)
    }

    /// Send CONNECT and negotiate the packet size.
    pub async fn connect(&mut self) -> Result<ConnectResponse> {
        let packet = codec::encode_connect(self.profile, self.config.max_client_packet);
        debug!("Sending CONNECT ({} bytes) to {}", packet.len(), self.peer);

        let channel = self.channel()?;
        channel.write(&packet).await?;

        let code = channel.read_exact(1).await?[0];
        if code != response::SUCCESS {
            return Err(TransferError::ConnectRejected(code));
        }

        let mut raw = vec![code];
        raw.extend(channel.read_exact(2).await?);
        let length = codec::decode_response_header(&raw)?.length;
        if length < PACKET_PREFIX {
            return Err(TransferError::Malformed(format!(
                "connect response length {}",
                length
            )));
        }
        raw.extend(channel.read_exact(length - PACKET_PREFIX).await?);

        let decoded =
            codec::decode_connect_response(&raw, self.profile, self.config.packet_size_parse())?;
        if decoded.max_server_packet == 0 {
            return Err(TransferError::ZeroPacketSize);
        }

        self.max_server_packet = decoded.max_server_packet;
        if self.profile.uses_connection_id() {
            self.connection_id = decoded.connection_id;
        }
        if let Some(who) = &decoded.who {
            debug!("Peer WHO: {}", hex::encode(who));
        }

        info!(
            "OBEX connected to {} ({}, max packet {}, connection id {:?})",
            self.peer, self.profile, self.max_server_packet, self.connection_id
        );
        Ok(decoded)
    }

    /// Read one response and return its code. The response body is consumed.
    async fn read_response(&mut self) -> Result<u8> {
        let channel = self.channel()?;
        let header = codec::decode_response_header(&channel.read_exact(PACKET_PREFIX).await?)?;

        let body_len = header.body_len();
        if body_len > 0 {
            debug!(
                "Response 0x{:02X} carries {} body bytes ({} buffered)",
                header.code,
                body_len,
                channel.buffered()
            );
            channel.read_exact(body_len).await?;
        }
        Ok(header.code)
    }

    /// Push `total` bytes from `source` as `name`, one PUT per block.
    ///
    /// Stops on an explicit success, on a response outside
    /// {success, continue, length required}, or when the source is exhausted.
    /// After a "Length Required" answer the remaining responses are not
    /// checked, and running out of chunks counts as success: such peers never
    /// send a final success code. This is a compatibility heuristic.
    pub(crate) async fn push<R>(
        &mut self,
        source: &mut R,
        name: &str,
        total: u64,
        reporter: &mut ProgressReporter<'_>,
    ) -> Result<TransferReport>
    where
        R: AsyncRead + Unpin,
    {
        if self.max_server_packet == 0 {
            return Err(TransferError::ZeroPacketSize);
        }

        let block_size = self.config.block_size;
        let total_chunks = codec::chunk_count(total, block_size);
        let total_length = u32::try_from(total).map_err(|_| {
            TransferError::InvalidArgument(format!("object of {} bytes is too large", total))
        })?;

        let mut report = TransferReport {
            chunks_sent: 0,
            bytes_sent: 0,
            quirk_mode: false,
            confirmed: false,
        };
        let mut last_code: u8;

        loop {
            let (len, last) = codec::plan_chunk(total - report.bytes_sent, block_size);
            let mut body = vec![0u8; len];
            source
                .read_exact(&mut body)
                .await
                .map_err(TransferError::Source)?;

            let packet = codec::encode_put(&PutChunk {
                profile: self.profile,
                name,
                connection_id: self.connection_id,
                total_length,
                first: report.chunks_sent == 0,
                last,
                body: &body,
            })?;
            debug!(
                "PUT {}/{}: {} bytes ({} body){}",
                report.chunks_sent + 1,
                total_chunks,
                packet.len(),
                len,
                if last { ", final" } else { "" }
            );

            self.channel()?.write(&packet).await?;
            last_code = self.read_response().await?;

            let index = report.chunks_sent;
            report.chunks_sent += 1;
            report.bytes_sent += len as u64;

            if !report.quirk_mode {
                match last_code {
                    response::SUCCESS => {
                        report.confirmed = true;
                        return Ok(report);
                    }
                    response::CONTINUE => {}
                    response::LENGTH_REQUIRED if self.config.tolerate_length_required => {
                        warn!(
                            "{} answered PUT {} with Length Required, ignoring further responses",
                            self.peer, report.chunks_sent
                        );
                        report.quirk_mode = true;
                    }
                    other => return Err(TransferError::UnexpectedResponse(other)),
                }
            }

            reporter.report(
                index as f32 / total_chunks as f32 * 100.0,
                TransferState::InProgress,
            );

            if last {
                break;
            }
        }

        if report.quirk_mode {
            info!(
                "All {} chunks sent to {} in quirk mode, assuming success",
                report.chunks_sent, self.peer
            );
            Ok(report)
        } else {
            Err(TransferError::NotConfirmed(last_code))
        }
    }

    /// Send DISCONNECT without waiting for the answer. Failures are logged only.
    pub async fn disconnect(&mut self) {
        let Some(channel) = self.channel.as_mut() else {
            return;
        };
        if let Err(e) = channel.write(&codec::encode_disconnect()).await {
            debug!("DISCONNECT to {} failed: {}", self.peer, e);
        }
    }

    /// Close the channel and forget negotiated state.
    pub async fn close(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
        self.max_server_packet = 0;
        self.connection_id = None;
    }

    /// Connect, push and tear down. DISCONNECT and close run on every path.
    pub(crate) async fn run<R>(
        mut self,
        source: &mut R,
        name: &str,
        total: u64,
        reporter: &mut ProgressReporter<'_>,
    ) -> Result<TransferReport>
    where
        R: AsyncRead + Unpin,
    {
        let outcome = match self.connect().await {
            Ok(_) => self.push(source, name, total, reporter).await,
            Err(e) => Err(e),
        };

        self.disconnect().await;
        self.close().await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obex::channel::AbortHandle;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    fn session(stream: DuplexStream, profile: Profile) -> Session<DuplexStream> {
        let channel = Channel::new(stream, None, AbortHandle::new());
        Session::new("00:11:22:33:44:55", profile, channel, TransferConfig::default())
    }

    async fn read_packet(peer: &mut DuplexStream) -> Vec<u8> {
        let mut head = [0u8; 3];
        peer.read_exact(&mut head).await.unwrap();
        let len = u16::from_be_bytes([head[1], head[2]]) as usize;
        let mut packet = head.to_vec();
        packet.resize(len, 0);
        peer.read_exact(&mut packet[3..]).await.unwrap();
        packet
    }

    #[tokio::test]
    async fn test_connect_negotiates_packet_size() {
        let (client, mut peer) = tokio::io::duplex(1024);
        let mut session = session(client, Profile::ObjectPush);

        let server = tokio::spawn(async move {
            let packet = read_packet(&mut peer).await;
            peer.write_all(&[0xA0, 0x00, 0x07, 0x10, 0x00, 0x02, 0x00])
                .await
                .unwrap();
            packet
        });

        let response = session.connect().await.unwrap();
        assert!(response.is_success());
        assert_eq!(session.max_server_packet(), 512);
        assert_eq!(session.connection_id(), None);
        assert_eq!(server.await.unwrap()[0], 0x80);
    }

    #[tokio::test]
    async fn test_connect_zero_packet_size_fails() {
        let (client, mut peer) = tokio::io::duplex(1024);
        let mut session = session(client, Profile::ObjectPush);

        tokio::spawn(async move {
            read_packet(&mut peer).await;
            peer.write_all(&[0xA0, 0x00, 0x07, 0x10, 0x00, 0x00, 0x00])
                .await
                .unwrap();
            peer
        });

        let result = session.connect().await;
        assert!(matches!(result, Err(TransferError::ZeroPacketSize)));
        assert_eq!(session.max_server_packet(), 0);
    }

    #[tokio::test]
    async fn test_push_requires_negotiation() {
        let (client, _peer) = tokio::io::duplex(1024);
        let mut session = session(client, Profile::ObjectPush);
        let mut reporter = ProgressReporter::new(None);
        let mut source: &[u8] = b"data";

        let result = session.push(&mut source, "a.txt", 4, &mut reporter).await;
        assert!(matches!(result, Err(TransferError::ZeroPacketSize)));
    }

    #[tokio::test]
    async fn test_close_clears_state() {
        let (client, mut peer) = tokio::io::duplex(1024);
        let mut session = session(client, Profile::ObjectPush);

        tokio::spawn(async move {
            read_packet(&mut peer).await;
            peer.write_all(&[0xA0, 0x00, 0x07, 0x10, 0x00, 0x08, 0x00])
                .await
                .unwrap();
            peer
        });

        session.connect().await.unwrap();
        session.disconnect().await;
        session.close().await;

        assert!(!session.is_open());
        assert_eq!(session.max_server_packet(), 0);
        assert!(matches!(session.connect().await, Err(TransferError::Closed)));
    }
}
