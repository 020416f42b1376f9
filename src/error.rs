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

//! Error types for OBEX transfers.

/// Errors produced while pushing an object to a peer.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// A required argument was missing or out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The transport could not be opened.
    #[error("failed to open channel: {0}")]
    Connect(String),

    #[error("I/O error: {0}")]
    Transport(#[from] std::io::Error),

    /// Reading the local data source failed.
    #[error("source read failed: {0}")]
    Source(#[source] std::io::Error),

    #[error("channel timed out")]
    Timeout,

    #[error("transfer aborted")]
    Aborted,

    #[error("channel is closed")]
    Closed,

    /// The peer answered CONNECT with something other than success.
    #[error("connect rejected by peer (response 0x{0:02X})")]
    ConnectRejected(u8),

    #[error("peer negotiated a zero maximum packet size")]
    ZeroPacketSize,

    /// A PUT was answered with a response code outside the accepted set.
    #[error("unexpected response 0x{0:02X}")]
    UnexpectedResponse(u8),

    /// All chunks were sent but the peer never confirmed the object.
    #[error("peer did not confirm the transfer (last response 0x{0:02X})")]
    NotConfirmed(u8),

    #[error("malformed packet: {0}")]
    Malformed(String),
}

impl TransferError {
    /// Whether this error was raised by argument validation, before any
    /// transport interaction.
    pub fn is_contract(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

pub type Result<T> = std::result::Result<T, TransferError>;
