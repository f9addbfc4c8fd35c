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

//! Memory plumbing shared by every NV3 block
//!
//! - [`MmioDevice`]: width-aware register access trait
//! - [`Vram`]: VRAM arena backing PNVM and RAMIN
//! - [`HostMemory`]: system memory reached by PCI/AGP DMA
//! - [`identify_subsystem`]: BAR0 address map

mod host;
mod io_device;
mod region;
mod vram;

pub use host::{HostMemory, OpenBus, SystemRam};
pub use io_device::{merge_lanes, MmioDevice};
pub use region::*;
pub use vram::Vram;
