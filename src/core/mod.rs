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

//! Emulation core
//!
//! | Module        | Block                                         |
//! |---------------|-----------------------------------------------|
//! | [`memory`]    | MMIO trait, BAR0 map, VRAM/RAMIN, host memory |
//! | [`ramin`]     | RAMHT, RAMFC, RAMRO, object instances         |
//! | [`pfifo`]     | Command submission                            |
//! | [`pgraph`]    | 2D/3D object classes                          |
//! | [`interrupt`] | PMC                                           |
//! | [`timer`]     | PTIMER                                        |
//! | [`bus`]       | PBUS, PFB, PEXTDEV                            |
//! | [`system`]    | The [`system::Nv3`] device                    |

pub mod bus;
pub mod config;
pub mod error;
pub mod interrupt;
pub mod memory;
pub mod pfifo;
pub mod pgraph;
pub mod ramin;
pub mod system;
pub mod timer;
