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

//! nv3rx: an NVIDIA NV3 (RIVA 128) command-submission core
//!
//! This crate emulates the part of the RIVA 128 that a guest driver talks to
//! when it submits rendering work: the BAR0 register file, the PFIFO
//! submission engine with its RAMHT/RAMFC/RAMRO structures in instance
//! memory, the PGRAPH object classes, and the PMC/PTIMER glue that turns
//! engine state into a PCI interrupt.
//!
//! # Architecture
//!
//! ```text
//! guest CPU ──► BAR0 ──► Nv3 ──► PFIFO ──► RAMHT ──► PGRAPH ──► VRAM
//!                         │                            │
//!                         └──── PMC_INTR ◄─────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use nv3rx::core::config::Nv3Config;
//! use nv3rx::core::system::Nv3;
//!
//! let mut nv3 = Nv3::new(Nv3Config::default())?;
//!
//! // Enable CACHE1 pushing and pulling, then read the free count of channel 0
//! nv3.write32(0x003200, 1);
//! nv3.write32(0x003240, 1);
//! assert_eq!(nv3.read32(0x800010), 63 << 2);
//! # Ok::<(), nv3rx::EmulatorError>(())
//! ```
//!
//! # Modules
//!
//! - [`core::system`]: the device and its MMIO traces
//! - [`core::pfifo`]: submission engine
//! - [`core::pgraph`]: graphics engine
//! - [`core::ramin`]: instance memory structures
//! - [`core::config`]: board configuration
//!
//! # Error Handling
//!
//! Guest mistakes are reported the way the hardware reports them, through
//! interrupt and status registers. Host-side failures return
//! [`core::error::Result<T>`], an alias for `Result<T, EmulatorError>`.

pub mod core;

// Re-export commonly used types
pub use core::error::{EmulatorError, Result};
