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

//! OBEX service UUIDs, opcodes, header ids and size limits.

use uuid::Uuid;

/// OBEX Object Push service class.
pub const OPP_SERVICE_UUID: Uuid = Uuid::from_u128(0x00001105_0000_1000_8000_00805f9b34fb);

/// OBEX File Transfer service class.
pub const FTP_SERVICE_UUID: Uuid = Uuid::from_u128(0x00001106_0000_1000_8000_00805f9b34fb);

/// Folder-browsing target sent in the TARGET header of an FTP CONNECT.
///
/// Sent as the canonical big-endian bytes `F9 EC 7B C4 95 3C ...`. Older
/// clients put the mixed-endian GUID layout (`C4 7B EC F9 3C 95 D2 11 ...`)
/// on the wire instead.
pub const FTP_TARGET_UUID: Uuid = Uuid::from_u128(0xF9EC7BC4_953C_11D2_984E_525400DC9E09);

/// OBEX protocol version 1.0.
pub const OBEX_VERSION: u8 = 0x10;

/// Request opcodes.
pub mod opcode {
    pub const CONNECT: u8 = 0x80;
    pub const DISCONNECT: u8 = 0x81;
    pub const PUT: u8 = 0x02;
    pub const PUT_FINAL: u8 = 0x82;
}

/// Response codes (final bit set).
pub mod response {
    pub const CONTINUE: u8 = 0x90;
    pub const SUCCESS: u8 = 0xA0;
    /// "Length Required". Some peers send it mid-transfer even though the
    /// first PUT carried a Length header.
    pub const LENGTH_REQUIRED: u8 = 0xCB;
}

/// Header identifiers.
pub mod header {
    pub const NAME: u8 = 0x01;
    pub const TARGET: u8 = 0x46;
    pub const BODY: u8 = 0x48;
    pub const END_OF_BODY: u8 = 0x49;
    pub const WHO: u8 = 0x4A;
    pub const LENGTH: u8 = 0xC3;
    pub const CONNECTION_ID: u8 = 0xCB;
}

/// Packet size limits.
pub mod sizes {
    /// Maximum packet size offered to the peer in CONNECT.
    pub const MAX_CLIENT_PACKET: u16 = 2048;

    /// Default BODY length of a single PUT.
    pub const DEFAULT_BLOCK_SIZE: usize = 1024;

    /// Opcode plus the 2-byte packet length.
    pub const PACKET_PREFIX: usize = 3;

    /// Header id plus 4-byte value.
    pub const U32_HEADER: usize = 5;

    /// Header id plus 2-byte header length.
    pub const PREFIXED_HEADER: usize = 3;

    /// Largest value the 2-byte packet length field can carry.
    pub const MAX_PACKET: usize = u16::MAX as usize;
}
