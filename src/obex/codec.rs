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

//! OBEX packet encoding and response decoding.
//!
//! Everything here works on byte buffers only; the session drives the I/O.

use crate::error::{Result, TransferError};

use super::constants::sizes::{MAX_PACKET, PACKET_PREFIX, PREFIXED_HEADER, U32_HEADER};
use super::constants::{header, opcode, response, FTP_TARGET_UUID, OBEX_VERSION};
use super::headers::{self, encode_unicode};
use super::profile::Profile;

/// How the negotiated maximum packet size is read from a CONNECT response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacketSizeParse {
    /// Big-endian 16-bit value.
    #[default]
    Standard,
    /// `hi << (8 + lo)` on a 32-bit signed integer, as deployed clients
    /// historically computed it. The low byte only shifts the high byte.
    Legacy,
}

/// Combine the two max-packet-size bytes of a CONNECT response.
pub fn packet_size(hi: u8, lo: u8, parse: PacketSizeParse) -> u32 {
    match parse {
        PacketSizeParse::Standard => u16::from_be_bytes([hi, lo]) as u32,
        PacketSizeParse::Legacy => {
            // Shift counts wrap at 32 and overflow into the sign bit.
            let value = (hi as i32).wrapping_shl(8 + lo as u32);
            value.max(0) as u32
        }
    }
}

/// Build a CONNECT request.
///
/// File Transfer adds a TARGET header naming the folder-browsing service.
pub fn encode_connect(profile: Profile, max_client_packet: u16) -> Vec<u8> {
    let mut packet = vec![opcode::CONNECT, 0, 0, OBEX_VERSION, 0x00];
    packet.extend_from_slice(&max_client_packet.to_be_bytes());

    if profile.uses_connection_id() {
        let target = FTP_TARGET_UUID.as_bytes();
        packet.push(header::TARGET);
        packet.extend_from_slice(&((target.len() + PREFIXED_HEADER) as u16).to_be_bytes());
        packet.extend_from_slice(target);
    }

    write_packet_len(&mut packet);
    packet
}

/// Build the DISCONNECT request.
pub fn encode_disconnect() -> Vec<u8> {
    vec![opcode::DISCONNECT, 0x00, PACKET_PREFIX as u8]
}

/// Parsed CONNECT response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectResponse {
    /// Response code, [`response::SUCCESS`] on success.
    pub code: u8,
    pub version: u8,
    pub flags: u8,
    /// Largest packet the peer accepts; 0 when not negotiated.
    pub max_server_packet: u32,
    /// Session id, File Transfer only.
    pub connection_id: Option<u32>,
    /// WHO header echoed by a File Transfer peer.
    pub who: Option<Vec<u8>>,
}

impl ConnectResponse {
    fn rejected(code: u8) -> Self {
        Self {
            code,
            version: 0,
            flags: 0,
            max_server_packet: 0,
            connection_id: None,
            who: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == response::SUCCESS
    }
}

/// Decode a complete CONNECT response packet.
///
/// Anything but a success code is returned as a rejected response without
/// looking at the rest of the buffer.
pub fn decode_connect_response(
    bytes: &[u8],
    profile: Profile,
    parse: PacketSizeParse,
) -> Result<ConnectResponse> {
    let code = *bytes
        .first()
        .ok_or_else(|| TransferError::Malformed("empty connect response".into()))?;
    if code != response::SUCCESS {
        return Ok(ConnectResponse::rejected(code));
    }

    let header = decode_response_header(bytes)?;
    let body = bytes
        .get(PACKET_PREFIX..header.length)
        .ok_or_else(|| {
            TransferError::Malformed(format!(
                "connect response declares {} bytes, got {}",
                header.length,
                bytes.len()
            ))
        })?;
    if body.len() < 4 {
        return Err(TransferError::Malformed(format!(
            "connect response body too short: {} bytes",
            body.len()
        )));
    }

    let mut decoded = ConnectResponse {
        code,
        version: body[0],
        flags: body[1],
        max_server_packet: packet_size(body[2], body[3], parse),
        connection_id: None,
        who: None,
    };

    if profile.uses_connection_id() {
        let headers = headers::parse_headers(&body[4..])?;
        decoded.connection_id =
            headers::find(&headers, header::CONNECTION_ID).and_then(|h| h.as_u32());
        decoded.who = headers::find(&headers, header::WHO)
            .and_then(|h| h.as_bytes())
            .map(<[u8]>::to_vec);
    }

    Ok(decoded)
}

/// Response code and declared packet length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub code: u8,
    pub length: usize,
}

impl ResponseHeader {
    /// Bytes following the 3-byte prefix.
    pub fn body_len(&self) -> usize {
        self.length.saturating_sub(PACKET_PREFIX)
    }
}

/// Decode the 3-byte prefix shared by every response.
pub fn decode_response_header(bytes: &[u8]) -> Result<ResponseHeader> {
    match bytes {
        [code, hi, lo, ..] => Ok(ResponseHeader {
            code: *code,
            length: u16::from_be_bytes([*hi, *lo]) as usize,
        }),
        _ => Err(TransferError::Malformed(format!(
            "response prefix needs 3 bytes, got {}",
            bytes.len()
        ))),
    }
}

/// Size of the next chunk and whether it is the final one.
///
/// A chunk is final once the remaining bytes fit in one block.
pub fn plan_chunk(remaining: u64, block_size: usize) -> (usize, bool) {
    if remaining <= block_size as u64 {
        (remaining as usize, true)
    } else {
        (block_size, false)
    }
}

/// Number of PUT packets needed for an object; an empty object takes one.
pub fn chunk_count(total: u64, block_size: usize) -> u64 {
    total.div_ceil(block_size as u64).max(1)
}

/// Upper bound on the size of any PUT for this object.
pub fn max_put_len(name: &str, block_size: usize) -> usize {
    PACKET_PREFIX
        + U32_HEADER // connection id
        + U32_HEADER // length
        + PREFIXED_HEADER
        + encode_unicode(name).len()
        + PREFIXED_HEADER
        + block_size
}

/// One PUT request of an object.
#[derive(Debug, Clone)]
pub struct PutChunk<'a> {
    pub profile: Profile,
    pub name: &'a str,
    pub connection_id: Option<u32>,
    /// Total object length, sent in the Length header of the first chunk.
    pub total_length: u32,
    pub first: bool,
    pub last: bool,
    pub body: &'a [u8],
}

/// Build a PUT request.
///
/// Header order: Connection-ID (File Transfer only), then Length and Name on
/// the first chunk, then Body or End-of-Body.
pub fn encode_put(chunk: &PutChunk<'_>) -> Result<Vec<u8>> {
    let op = if chunk.last {
        opcode::PUT_FINAL
    } else {
        opcode::PUT
    };
    let mut packet = vec![op, 0, 0];

    if let Some(id) = chunk
        .connection_id
        .filter(|_| chunk.profile.uses_connection_id())
    {
        headers::put_u32(&mut packet, header::CONNECTION_ID, id);
    }

    if chunk.first {
        headers::put_u32(&mut packet, header::LENGTH, chunk.total_length);
        headers::put_unicode(&mut packet, header::NAME, chunk.name)?;
    }

    let body_id = if chunk.last {
        header::END_OF_BODY
    } else {
        header::BODY
    };
    headers::put_prefixed(&mut packet, body_id, chunk.body)?;

    if packet.len() > MAX_PACKET {
        return Err(TransferError::InvalidArgument(format!(
            "PUT of {} bytes exceeds the packet length field",
            packet.len()
        )));
    }
    write_packet_len(&mut packet);
    Ok(packet)
}

fn write_packet_len(packet: &mut [u8]) {
    let len = (packet.len() as u16).to_be_bytes();
    packet[1] = len[0];
    packet[2] = len[1];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obex::headers::{parse_headers, HeaderValue};

    fn declared_len(packet: &[u8]) -> usize {
        u16::from_be_bytes([packet[1], packet[2]]) as usize
    }

    #[test]
    fn test_connect_opp_layout() {
        let packet = encode_connect(Profile::ObjectPush, 2048);
        assert_eq!(packet, vec![0x80, 0x00, 0x07, 0x10, 0x00, 0x08, 0x00]);
    }

    #[test]
    fn test_connect_ftp_has_target() {
        let packet = encode_connect(Profile::FileTransfer, 2048);
        assert_eq!(packet.len(), 26);
        assert_eq!(declared_len(&packet), packet.len());
        assert_eq!(packet[7], 0x46);
        assert_eq!(&packet[8..10], &[0x00, 19]);
        assert_eq!(&packet[10..], FTP_TARGET_UUID.as_bytes());
        assert_eq!(
            &packet[10..],
            &[
                0xF9, 0xEC, 0x7B, 0xC4, 0x95, 0x3C, 0x11, 0xD2, 0x98, 0x4E, 0x52, 0x54, 0x00,
                0xDC, 0x9E, 0x09
            ]
        );
    }

    #[test]
    fn test_connect_declared_length_matches() {
        for profile in [Profile::ObjectPush, Profile::FileTransfer] {
            for size in [0u16, 255, 2048, u16::MAX] {
                let packet = encode_connect(profile, size);
                assert_eq!(declared_len(&packet), packet.len());
                assert_eq!(&packet[5..7], &size.to_be_bytes());
            }
        }
    }

    #[test]
    fn test_disconnect() {
        assert_eq!(encode_disconnect(), vec![0x81, 0x00, 0x03]);
    }

    #[test]
    fn test_decode_rejected_reads_only_first_byte() {
        let decoded =
            decode_connect_response(&[0x90], Profile::FileTransfer, PacketSizeParse::Standard)
                .unwrap();
        assert!(!decoded.is_success());
        assert_eq!(decoded.code, 0x90);
        assert_eq!(decoded.max_server_packet, 0);

        assert!(decode_connect_response(&[], Profile::ObjectPush, PacketSizeParse::Standard)
            .is_err());
    }

    #[test]
    fn test_decode_opp_response() {
        let bytes = [0xA0, 0x00, 0x07, 0x10, 0x00, 0x04, 0x01];
        let decoded =
            decode_connect_response(&bytes, Profile::ObjectPush, PacketSizeParse::Standard)
                .unwrap();
        assert!(decoded.is_success());
        assert_eq!(decoded.version, 0x10);
        assert_eq!(decoded.max_server_packet, 0x0401);
        assert_eq!(decoded.connection_id, None);
    }

    #[test]
    fn test_decode_ftp_response() {
        let who = FTP_TARGET_UUID.as_bytes();
        let mut bytes = vec![0xA0, 0x00, 0x00, 0x10, 0x00, 0x10, 0x00];
        bytes.extend_from_slice(&[0xCB, 0x00, 0x00, 0x00, 0x42]);
        bytes.extend_from_slice(&[0x4A, 0x00, 19]);
        bytes.extend_from_slice(who);
        let len = bytes.len() as u16;
        bytes[1..3].copy_from_slice(&len.to_be_bytes());

        let decoded =
            decode_connect_response(&bytes, Profile::FileTransfer, PacketSizeParse::Standard)
                .unwrap();
        assert_eq!(decoded.max_server_packet, 0x1000);
        assert_eq!(decoded.connection_id, Some(0x42));
        assert_eq!(decoded.who.as_deref(), Some(&who[..]));

        // Object Push ignores the trailing headers.
        let decoded =
            decode_connect_response(&bytes, Profile::ObjectPush, PacketSizeParse::Standard)
                .unwrap();
        assert_eq!(decoded.connection_id, None);
    }

    #[test]
    fn test_decode_truncated_response() {
        // Declares 7 bytes but carries 5
        let bytes = [0xA0, 0x00, 0x07, 0x10, 0x00];
        assert!(
            decode_connect_response(&bytes, Profile::ObjectPush, PacketSizeParse::Standard)
                .is_err()
        );
    }

    #[test]
    fn test_packet_size_standard_vs_legacy() {
        // Values with a zero low byte agree.
        assert_eq!(packet_size(0x08, 0x00, PacketSizeParse::Standard), 2048);
        assert_eq!(packet_size(0x08, 0x00, PacketSizeParse::Legacy), 2048);

        // Legacy drops the low byte into the shift count.
        assert_eq!(packet_size(0x04, 0x01, PacketSizeParse::Standard), 1025);
        assert_eq!(packet_size(0x04, 0x01, PacketSizeParse::Legacy), 2048);

        // A size below 256 negotiates to zero under the legacy rule.
        assert_eq!(packet_size(0x00, 0xFF, PacketSizeParse::Standard), 255);
        assert_eq!(packet_size(0x00, 0xFF, PacketSizeParse::Legacy), 0);

        // Shift count wraps at 32: 8 + 0x18 = 32 -> shift by 0.
        assert_eq!(packet_size(0x05, 0x18, PacketSizeParse::Legacy), 5);
        // Overflow into the sign bit is treated as not negotiated.
        assert_eq!(packet_size(0x80, 0x10, PacketSizeParse::Legacy), 0);
    }

    #[test]
    fn test_plan_chunk() {
        assert_eq!(plan_chunk(2500, 1024), (1024, false));
        assert_eq!(plan_chunk(1025, 1024), (1024, false));
        assert_eq!(plan_chunk(1024, 1024), (1024, true));
        assert_eq!(plan_chunk(452, 1024), (452, true));
        assert_eq!(plan_chunk(0, 1024), (0, true));
    }

    #[test]
    fn test_chunk_count() {
        assert_eq!(chunk_count(0, 1024), 1);
        assert_eq!(chunk_count(1, 1024), 1);
        assert_eq!(chunk_count(1024, 1024), 1);
        assert_eq!(chunk_count(2048, 1024), 2);
        assert_eq!(chunk_count(2500, 1024), 3);
    }

    #[test]
    fn test_first_put_layout() {
        let body = [0xEE; 10];
        let packet = encode_put(&PutChunk {
            profile: Profile::ObjectPush,
            name: "a.txt",
            connection_id: Some(7),
            total_length: 2500,
            first: true,
            last: false,
            body: &body,
        })
        .unwrap();

        assert_eq!(packet[0], 0x02);
        assert_eq!(declared_len(&packet), packet.len());
        // Object Push never carries the connection id.
        assert_eq!(packet[3], 0xC3);
        assert_eq!(&packet[4..8], &2500u32.to_be_bytes());
        assert_eq!(packet[8], 0x01);

        let headers = parse_headers(&packet[3..]).unwrap();
        assert_eq!(headers.len(), 3);
        assert_eq!(headers[1].value, HeaderValue::Unicode("a.txt".into()));
        assert_eq!(headers[2].id, 0x48);
        assert_eq!(headers[2].as_bytes(), Some(&body[..]));
    }

    #[test]
    fn test_final_ftp_put_layout() {
        let packet = encode_put(&PutChunk {
            profile: Profile::FileTransfer,
            name: "ignored",
            connection_id: Some(0x42),
            total_length: 3,
            first: false,
            last: true,
            body: b"xyz",
        })
        .unwrap();

        assert_eq!(
            packet,
            vec![0x82, 0x00, 0x0E, 0xCB, 0x00, 0x00, 0x00, 0x42, 0x49, 0x00, 0x06, b'x', b'y', b'z']
        );
    }

    #[test]
    fn test_name_round_trip() {
        for name in ["photo.jpg", "Überweisung 2026.pdf", "📷.png", ""] {
            let packet = encode_put(&PutChunk {
                profile: Profile::FileTransfer,
                name,
                connection_id: None,
                total_length: 0,
                first: true,
                last: true,
                body: &[],
            })
            .unwrap();

            let headers = parse_headers(&packet[3..]).unwrap();
            let decoded = headers::find(&headers, header::NAME).and_then(|h| h.as_str());
            assert_eq!(decoded, Some(name));
        }
    }

    #[test]
    fn test_oversized_put_rejected() {
        let body = vec![0u8; MAX_PACKET - 10];
        let result = encode_put(&PutChunk {
            profile: Profile::ObjectPush,
            name: "big.bin",
            connection_id: None,
            total_length: body.len() as u32,
            first: true,
            last: true,
            body: &body,
        });
        assert!(matches!(result, Err(TransferError::InvalidArgument(_))));
    }

    #[test]
    fn test_max_put_len_bounds_real_packets() {
        let body = [0u8; 1024];
        let packet = encode_put(&PutChunk {
            profile: Profile::FileTransfer,
            name: "report.pdf",
            connection_id: Some(1),
            total_length: 1024,
            first: true,
            last: true,
            body: &body,
        })
        .unwrap();
        assert_eq!(packet.len(), max_put_len("report.pdf", 1024));
    }
}
