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

//! MMIO traces
//!
//! A trace is a list of BAR0 operations replayed in order against an
//! [`Nv3`]. Traces are written as TOML or JSON:
//!
//! ```toml
//! [[op]]
//! kind = "write"
//! addr = 0x800000
//! value = 0x00001234
//!
//! [[op]]
//! kind = "expect"
//! addr = 0x002100
//! value = 0
//!
//! [[op]]
//! kind = "tick"
//! ns = 1000
//! ```
//!
//! `width` defaults to 4 and may be 1, 2 or 4. `expect` compares under an
//! optional `mask` (all ones by default).

use super::Nv3;
use crate::core::error::{EmulatorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_width() -> u8 {
    4
}

fn default_mask() -> u32 {
    0xFFFF_FFFF
}

/// One trace operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TraceOp {
    Write {
        addr: u32,
        value: u32,
        #[serde(default = "default_width")]
        width: u8,
    },
    Read {
        addr: u32,
        #[serde(default = "default_width")]
        width: u8,
    },
    Expect {
        addr: u32,
        value: u32,
        #[serde(default = "default_mask")]
        mask: u32,
        #[serde(default = "default_width")]
        width: u8,
    },
    Tick {
        ns: u64,
    },
    Vblank,
}

/// A failed `expect`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceMismatch {
    /// Index of the operation in the trace
    pub index: usize,
    pub addr: u32,
    pub expected: u32,
    pub actual: u32,
    pub mask: u32,
}

/// Outcome of a replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// `(addr, value)` of every `read`
    pub reads: Vec<(u32, u32)>,
    pub mismatches: Vec<TraceMismatch>,
    pub operations: usize,
}

impl ReplayReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Ordered list of trace operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MmioTrace {
    #[serde(rename = "op", default)]
    pub ops: Vec<TraceOp>,
}

impl MmioTrace {
    /// Parse a TOML trace
    ///
    /// # Errors
    ///
    /// `EmulatorError::TraceParse` for malformed documents,
    /// `EmulatorError::UnalignedAccess` for an access not aligned to its width.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let trace: Self =
            toml::from_str(contents).map_err(|e| EmulatorError::TraceParse(e.to_string()))?;
        trace.validate()?;
        Ok(trace)
    }

    /// Parse a JSON trace
    pub fn from_json(contents: &str) -> Result<Self> {
        let trace: Self = serde_json::from_str(contents)
            .map_err(|e| EmulatorError::TraceParse(e.to_string()))?;
        trace.validate()?;
        Ok(trace)
    }

    /// Load a trace, choosing the format by file extension
    ///
    /// `.json` is parsed as JSON, anything else as TOML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        log::info!("Loading MMIO trace {}", path.display());
        if is_json {
            Self::from_json(&contents)
        } else {
            Self::from_toml(&contents)
        }
    }

    /// Write the trace as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| EmulatorError::TraceParse(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        for op in &self.ops {
            let (addr, width) = match *op {
                TraceOp::Write { addr, width, .. }
                | TraceOp::Read { addr, width }
                | TraceOp::Expect { addr, width, .. } => (addr, width),
                TraceOp::Tick { .. } | TraceOp::Vblank => continue,
            };
            if !matches!(width, 1 | 2 | 4) {
                return Err(EmulatorError::TraceParse(format!(
                    "invalid access width {} at 0x{:06X}",
                    width, addr
                )));
            }
            if addr % width as u32 != 0 {
                return Err(EmulatorError::UnalignedAccess {
                    address: addr,
                    size: width as u32,
                });
            }
        }
        Ok(())
    }

    /// Run every operation against a device
    pub fn replay(&self, nv3: &mut Nv3) -> ReplayReport {
        let mut report = ReplayReport::default();

        for (index, op) in self.ops.iter().enumerate() {
            match *op {
                TraceOp::Write { addr, value, width } => match width {
                    1 => nv3.write8(addr, value as u8),
                    2 => nv3.write16(addr, value as u16),
                    _ => nv3.write32(addr, value),
                },
                TraceOp::Read { addr, width } => {
                    let value = read(nv3, addr, width);
                    report.reads.push((addr, value));
                }
                TraceOp::Expect {
                    addr,
                    value,
                    mask,
                    width,
                } => {
                    let actual = read(nv3, addr, width);
                    if (actual ^ value) & mask != 0 {
                        log::warn!(
                            "Trace op {}: 0x{:06X} expected 0x{:08X} got 0x{:08X} (mask 0x{:08X})",
                            index,
                            addr,
                            value,
                            actual,
                            mask
                        );
                        report.mismatches.push(TraceMismatch {
                            index,
                            addr,
                            expected: value,
                            actual,
                            mask,
                        });
                    }
                }
                TraceOp::Tick { ns } => nv3.tick(ns),
                TraceOp::Vblank => nv3.vblank(),
            }
            report.operations += 1;
        }

        report
    }
}

fn read(nv3: &mut Nv3, addr: u32, width: u8) -> u32 {
    match width {
        1 => nv3.read8(addr) as u32,
        2 => nv3.read16(addr) as u32,
        _ => nv3.read32(addr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Nv3Config;

    const TRACE: &str = r#"
[[op]]
kind = "write"
addr = 0x1C03000
value = 0xCAFEF00D

[[op]]
kind = "expect"
addr = 0x1C03000
value = 0xCAFEF00D

[[op]]
kind = "read"
addr = 0x1C03002
width = 2

[[op]]
kind = "expect"
addr = 0x000000
value = 0x12345678
mask = 0x000000F0

[[op]]
kind = "tick"
ns = 64

[[op]]
kind = "vblank"
"#;

    #[test]
    fn test_parse_toml() {
        let trace = MmioTrace::from_toml(TRACE).unwrap();
        assert_eq!(trace.ops.len(), 6);
        assert_eq!(
            trace.ops[0],
            TraceOp::Write {
                addr: 0x1C03000,
                value: 0xCAFEF00D,
                width: 4
            }
        );
        assert_eq!(trace.ops[5], TraceOp::Vblank);
    }

    #[test]
    fn test_json_round_trip() {
        let trace = MmioTrace::from_toml(TRACE).unwrap();
        let json = trace.to_json().unwrap();
        assert_eq!(MmioTrace::from_json(&json).unwrap(), trace);
    }

    #[test]
    fn test_replay_reports_reads_and_mismatches() {
        let trace = MmioTrace::from_toml(TRACE).unwrap();
        let mut nv3 = Nv3::new(Nv3Config::default()).unwrap();

        let report = trace.replay(&mut nv3);
        assert_eq!(report.operations, 6);
        assert_eq!(report.reads, vec![(0x1C03002, 0xCAFE)]);

        // BOOT nibble for rev C is 2, not 7
        assert_eq!(report.mismatches.len(), 1);
        assert_eq!(report.mismatches[0].index, 3);
        assert_eq!(report.mismatches[0].actual, 0x0003_0120);
        assert!(!report.passed());
    }

    #[test]
    fn test_rejects_bad_width() {
        let err = MmioTrace::from_json(r#"{"op":[{"kind":"read","addr":0,"width":3}]}"#);
        assert!(matches!(err, Err(EmulatorError::TraceParse(_))));
    }

    #[test]
    fn test_rejects_unaligned() {
        let err = MmioTrace::from_json(r#"{"op":[{"kind":"read","addr":2}]}"#);
        assert!(matches!(
            err,
            Err(EmulatorError::UnalignedAccess { address: 2, size: 4 })
        ));
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            MmioTrace::from_toml("[[op]]\nkind = \"jump\""),
            Err(EmulatorError::TraceParse(_))
        ));
    }
}
