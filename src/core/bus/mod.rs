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

//! Small leaf blocks: PBUS, PFB and PEXTDEV
//!
//! None of these take part in command submission, but drivers read them
//! during initialisation (RAM size, bus type, crystal) and PGRAPH takes the
//! framebuffer depth from PFB.

mod pbus;
mod pextdev;
mod pfb;

pub use pbus::{Pbus, PBUS_INTR, PBUS_INTR_EN, PBUS_PCI_END, PBUS_PCI_START, PCI_VENDOR_NVIDIA_SGS};
pub use pextdev::{straps, Pextdev, PEXTDEV_STRAPS};
pub use pfb::{Pfb, PFB_BOOT, PFB_CONFIG_0, PFB_CONFIG_1};
