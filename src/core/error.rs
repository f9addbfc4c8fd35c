// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
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

//! Error types for the emulator core
//!
//! Guest-visible faults (hash failures, runouts, invalid methods) are never
//! reported through this type. They are modelled as interrupt and status bits
//! exactly like the hardware raises them. [`EmulatorError`] is reserved for
//! host-side problems: unmapped accesses from host helpers, bad configuration,
//! I/O failures and corrupt save states.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, EmulatorError>;

/// Errors raised by the emulator core
#[derive(Error, Debug)]
pub enum EmulatorError {
    /// Access outside any backing store (e.g. past the end of VRAM)
    #[error("Invalid memory access at 0x{address:08X}")]
    InvalidMemoryAccess { address: u32 },

    /// Access width does not match the address alignment
    #[error("Unaligned {size}-byte access at 0x{address:08X}")]
    UnalignedAccess { address: u32, size: u32 },

    /// No device decodes this BAR0 offset
    #[error("Unmapped MMIO address 0x{address:08X}")]
    UnmappedAddress { address: u32 },

    /// Every RAMHT slot on the lookup path is occupied
    #[error("RAMHT full: cannot insert object 0x{name:08X} for channel {channel}")]
    RamhtFull { name: u32, channel: u8 },

    /// Channel id outside the 8 channels the FIFO implements
    #[error("Invalid FIFO channel {channel}")]
    InvalidChannel { channel: u8 },

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed or serialized
    #[error("Config error: {0}")]
    ConfigParse(String),

    /// MMIO trace could not be parsed
    #[error("Trace error: {0}")]
    TraceParse(String),

    /// Save state could not be encoded or decoded
    #[error("Save state error: {0}")]
    SaveState(String),

    /// Underlying file I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_format_hex() {
        let err = EmulatorError::InvalidMemoryAccess { address: 0x1C00010 };
        assert_eq!(err.to_string(), "Invalid memory access at 0x01C00010");

        let err = EmulatorError::RamhtFull {
            name: 0x1234,
            channel: 2,
        };
        assert_eq!(
            err.to_string(),
            "RAMHT full: cannot insert object 0x00001234 for channel 2"
        );
    }

    #[test]
    fn test_io_error_converts() {
        fn open_missing() -> Result<String> {
            Ok(std::fs::read_to_string("/nonexistent/nv3rx/file")?)
        }

        assert!(matches!(open_missing(), Err(EmulatorError::Io(_))));
    }
}
