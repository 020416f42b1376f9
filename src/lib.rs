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

//! Push files to paired Bluetooth devices over OBEX.
//!
//! Supports the Object Push and File Transfer profiles over RFCOMM.

pub mod bluetooth;
pub mod client;
pub mod config;
pub mod error;
pub mod obex;
pub mod progress;

pub use client::ObexClient;
pub use error::TransferError;
pub use obex::{AbortHandle, Profile, TransferReport};
pub use progress::{Progress, ProgressObserver, TransferState};
