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

//! RFCOMM client connections through BlueZ.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use bluer::rfcomm::{Profile as RfcommProfile, ProfileHandle, Role, SocketAddr, Stream};
use bluer::{Address, Session};
use futures::StreamExt;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, TransferError};

/// Opens byte streams to a peer service.
#[async_trait]
pub trait Connector: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Connect to `service` on the device at `address`.
    async fn connect(&self, address: &str, service: Uuid) -> Result<Self::Stream>;
}

/// RFCOMM stream, keeping the client profile registered while it is open.
pub struct RfcommLink {
    stream: Stream,
    _profile: Option<Box<ProfileHandle>>,
}

impl AsyncRead for RfcommLink {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for RfcommLink {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

/// Connector backed by the local BlueZ daemon.
pub struct BluezConnector {
    session: Session,
    adapter: bluer::Adapter,
    rfcomm_channel: Option<u8>,
}

impl BluezConnector {
    /// Open a BlueZ session on `adapter` (the default adapter when `None`).
    ///
    /// With `rfcomm_channel` set, connections go straight to that channel;
    /// otherwise the channel is looked up from the service UUID.
    pub async fn new(adapter: Option<&str>, rfcomm_channel: Option<u8>) -> anyhow::Result<Self> {
        let session = Session::new().await?;
        debug!("BlueZ session created");

        let adapter = match adapter {
            Some(name) => session.adapter(name)?,
            None => session.default_adapter().await?,
        };
        info!("Using Bluetooth adapter: {}", adapter.name());

        if !adapter.is_powered().await? {
            info!("Powering on Bluetooth adapter...");
            adapter.set_powered(true).await?;
        }

        Ok(Self {
            session,
            adapter,
            rfcomm_channel,
        })
    }

    async fn connect_channel(&self, address: Address, channel: u8) -> anyhow::Result<RfcommLink> {
        info!("Connecting to {} on RFCOMM channel {}", address, channel);
        let stream = Stream::connect(SocketAddr::new(address, channel))
            .await
            .with_context(|| format!("RFCOMM connect to {} channel {}", address, channel))?;
        Ok(RfcommLink {
            stream,
            _profile: None,
        })
    }

    async fn connect_service(&self, address: Address, service: Uuid) -> anyhow::Result<RfcommLink> {
        info!("Connecting to {} service {}", address, service);

        let profile = RfcommProfile {
            uuid: service,
            role: Some(Role::Client),
            require_authentication: Some(false),
            require_authorization: Some(false),
            auto_connect: Some(false),
            ..Default::default()
        };
        let mut handle = self.session.register_profile(profile).await?;

        // BlueZ hands the socket to the registered profile before the
        // connect call returns, so accept it while the call is in flight.
        // A failed connect never produces a request, so race the two.
        let device = self.adapter.device(address)?;
        let mut connect = tokio::spawn(async move { device.connect_profile(&service).await });

        let (request, connected) = tokio::select! {
            request = handle.next() => (request, false),
            result = &mut connect => {
                result??;
                (handle.next().await, true)
            }
        };
        let request =
            request.ok_or_else(|| anyhow!("profile {} unregistered before connecting", service))?;
        let stream = request.accept()?;
        if !connected {
            connect.await??;
        }

        Ok(RfcommLink {
            stream,
            _profile: Some(Box::new(handle)),
        })
    }
}

#[async_trait]
impl Connector for BluezConnector {
    type Stream = RfcommLink;

    async fn connect(&self, address: &str, service: Uuid) -> Result<RfcommLink> {
        let address: Address = address
            .parse()
            .map_err(|_| TransferError::Connect(format!("invalid Bluetooth address '{}'", address)))?;

        let link = match self.rfcomm_channel {
            Some(channel) => self.connect_channel(address, channel).await,
            None => self.connect_service(address, service).await,
        };
        link.map_err(|e| TransferError::Connect(format!("{:#}", e)))
    }
}
