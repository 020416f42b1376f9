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

//! Bluetooth OBEX profiles.

use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::constants::{FTP_SERVICE_UUID, OPP_SERVICE_UUID};

/// Profile used to push an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Object Push Profile.
    ObjectPush,
    /// File Transfer Profile. Requires a connection id on every PUT.
    FileTransfer,
}

impl Profile {
    /// Service class UUID the RFCOMM channel is resolved from.
    pub fn service_uuid(&self) -> Uuid {
        match self {
            Profile::ObjectPush => OPP_SERVICE_UUID,
            Profile::FileTransfer => FTP_SERVICE_UUID,
        }
    }

    /// Whether CONNECT carries a TARGET header and PUTs a connection id.
    pub fn uses_connection_id(&self) -> bool {
        matches!(self, Profile::FileTransfer)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::ObjectPush => "opp",
            Profile::FileTransfer => "ftp",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "opp" | "object-push" => Ok(Self::ObjectPush),
            "ftp" | "file-transfer" => Ok(Self::FileTransfer),
            other => Err(format!("unknown profile '{}', expected 'opp' or 'ftp'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("opp".parse::<Profile>(), Ok(Profile::ObjectPush));
        assert_eq!("FTP".parse::<Profile>(), Ok(Profile::FileTransfer));
        assert_eq!("file-transfer".parse::<Profile>(), Ok(Profile::FileTransfer));
        assert!("hfp".parse::<Profile>().is_err());
    }

    #[test]
    fn test_service_uuids() {
        assert_eq!(Profile::ObjectPush.service_uuid(), OPP_SERVICE_UUID);
        assert_eq!(Profile::FileTransfer.service_uuid(), FTP_SERVICE_UUID);
        assert!(!Profile::ObjectPush.uses_connection_id());
        assert!(Profile::FileTransfer.uses_connection_id());
    }
}
