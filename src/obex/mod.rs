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

//! OBEX object push engine.
//!
//! Encodes CONNECT/PUT/DISCONNECT requests and drives them over a channel.

pub mod channel;
pub mod codec;
pub mod constants;
pub mod headers;
mod profile;
pub mod session;

pub use channel::{AbortHandle, Channel};
pub use codec::{ConnectResponse, PacketSizeParse, PutChunk};
pub use profile::Profile;
pub use session::{Session, TransferReport};
