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

//! OBEX header encoding.
//!
//! The two high bits of a header id select its wire form:
//!
//! | bits | value |
//! |------|-------|
//! | `00` | UTF-16BE text, NUL terminated, 2-byte length prefix |
//! | `01` | byte sequence, 2-byte length prefix |
//! | `10` | single byte |
//! | `11` | 4-byte big-endian integer |
//!
//! Length prefixes count the header id and the prefix itself.

use crate::error::{Result, TransferError};

use super::constants::sizes::{MAX_PACKET, PREFIXED_HEADER};

const KIND_MASK: u8 = 0xC0;
const KIND_UNICODE: u8 = 0x00;
const KIND_BYTES: u8 = 0x40;
const KIND_BYTE: u8 = 0x80;
const KIND_U32: u8 = 0xC0;

/// Decoded header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Unicode(String),
    Bytes(Vec<u8>),
    Byte(u8),
    U32(u32),
}

/// A single OBEX header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub id: u8,
    pub value: HeaderValue,
}

impl Header {
    pub fn as_u32(&self) -> Option<u32> {
        match self.value {
            HeaderValue::U32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.value {
            HeaderValue::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            HeaderValue::Unicode(s) => Some(s),
            _ => None,
        }
    }
}

/// Encode text as UTF-16BE with a trailing NUL code unit.
pub fn encode_unicode(text: &str) -> Vec<u8> {
    text.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(|unit| unit.to_be_bytes())
        .collect()
}

fn decode_unicode(bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(TransferError::Malformed(format!(
            "odd unicode header length {}",
            bytes.len()
        )));
    }

    let mut units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    if units.last() == Some(&0) {
        units.pop();
    }

    String::from_utf16(&units)
        .map_err(|e| TransferError::Malformed(format!("invalid UTF-16 text: {}", e)))
}

fn prefixed_len(payload: usize) -> Result<u16> {
    let total = payload + PREFIXED_HEADER;
    if total > MAX_PACKET {
        return Err(TransferError::InvalidArgument(format!(
            "header of {} bytes does not fit a packet",
            total
        )));
    }
    Ok(total as u16)
}

/// Append a length-prefixed header carrying `payload` as is.
pub fn put_prefixed(buf: &mut Vec<u8>, id: u8, payload: &[u8]) -> Result<()> {
    let len = prefixed_len(payload.len())?;
    buf.push(id);
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(payload);
    Ok(())
}

/// Append a text header.
pub fn put_unicode(buf: &mut Vec<u8>, id: u8, text: &str) -> Result<()> {
    put_prefixed(buf, id, &encode_unicode(text))
}

/// Append a 4-byte integer header.
pub fn put_u32(buf: &mut Vec<u8>, id: u8, value: u32) {
    buf.push(id);
    buf.extend_from_slice(&value.to_be_bytes());
}

/// Parse a run of headers filling `buf` completely.
pub fn parse_headers(buf: &[u8]) -> Result<Vec<Header>> {
    let mut headers = Vec::new();
    let mut offset = 0;

    while offset < buf.len() {
        let id = buf[offset];
        let rest = &buf[offset + 1..];

        let (value, consumed) = match id & KIND_MASK {
            KIND_BYTE => {
                let byte = *rest
                    .first()
                    .ok_or_else(|| truncated(id, 1, rest.len()))?;
                (HeaderValue::Byte(byte), 2)
            }
            KIND_U32 => {
                if rest.len() < 4 {
                    return Err(truncated(id, 4, rest.len()));
                }
                let value = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]);
                (HeaderValue::U32(value), 5)
            }
            kind => {
                if rest.len() < 2 {
                    return Err(truncated(id, 2, rest.len()));
                }
                let len = u16::from_be_bytes([rest[0], rest[1]]) as usize;
                if len < PREFIXED_HEADER {
                    return Err(TransferError::Malformed(format!(
                        "header 0x{:02X} declares length {}",
                        id, len
                    )));
                }
                let payload_len = len - PREFIXED_HEADER;
                let payload = rest
                    .get(2..2 + payload_len)
                    .ok_or_else(|| truncated(id, payload_len, rest.len().saturating_sub(2)))?;

                let value = if kind == KIND_UNICODE {
                    HeaderValue::Unicode(decode_unicode(payload)?)
                } else {
                    debug_assert_eq!(kind, KIND_BYTES);
                    HeaderValue::Bytes(payload.to_vec())
                };
                (value, len)
            }
        };

        headers.push(Header { id, value });
        offset += consumed;
    }

    Ok(headers)
}

fn truncated(id: u8, wanted: usize, available: usize) -> TransferError {
    TransferError::Malformed(format!(
        "header 0x{:02X} needs {} bytes, {} available",
        id, wanted, available
    ))
}

/// Find the first header with the given id.
pub fn find(headers: &[Header], id: u8) -> Option<&Header> {
    headers.iter().find(|h| h.id == id)
}
