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

//! Configuration, trace and save-state files

use nv3rx::core::config::{BusType, Nv3Config, Revision};
use nv3rx::core::memory::PNVM_START;
use nv3rx::core::system::{MmioTrace, Nv3, TraceOp};
use nv3rx::EmulatorError;
use std::io::Write;
use tempfile::{Builder, NamedTempFile, TempDir};

#[test]
fn test_config_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("board.toml");

    let config = Nv3Config {
        revision: Revision::B,
        vram_size: 8,
        bus: BusType::Agp,
        ..Default::default()
    };
    config.save(&path).unwrap();
    assert_eq!(Nv3Config::load(&path).unwrap(), config);
}

#[test]
fn test_config_file_rejects_bad_size() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "vram_size = 16").unwrap();
    assert!(matches!(
        Nv3Config::load(file.path()),
        Err(EmulatorError::InvalidConfig(_))
    ));
}

#[test]
fn test_missing_config_is_io_error() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        Nv3Config::load(dir.path().join("missing.toml")),
        Err(EmulatorError::Io(_))
    ));
}

#[test]
fn test_save_state_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("card.state");

    let mut nv3 = Nv3::new(Nv3Config::default()).unwrap();
    nv3.write32(PNVM_START + 0x80, 0x0BAD_F00D);
    nv3.tick(4096);
    nv3.save_state_to_file(&path).unwrap();

    let mut restored = Nv3::new(Nv3Config::default()).unwrap();
    restored.load_state_from_file(&path).unwrap();
    assert_eq!(restored.read32(PNVM_START + 0x80), 0x0BAD_F00D);
    assert_eq!(restored.ptimer().time(), 4096);
}

#[test]
fn test_save_state_restores_configuration() {
    let config = Nv3Config {
        revision: Revision::A,
        vram_size: 2,
        ..Default::default()
    };
    let small = Nv3::new(config.clone()).unwrap();
    let bytes = small.save_state().unwrap();

    let mut nv3 = Nv3::new(Nv3Config::default()).unwrap();
    nv3.load_state(&bytes).unwrap();
    assert_eq!(nv3.config(), &config);
    assert_eq!(nv3.vram().size(), 2 * 1024 * 1024);
    assert_eq!(nv3.read32(0), 0x0003_0100);
}

#[test]
fn test_trace_files_by_extension() {
    let dir = TempDir::new().unwrap();

    let toml_path = dir.path().join("boot.toml");
    std::fs::write(
        &toml_path,
        "[[op]]\nkind = \"expect\"\naddr = 0\nvalue = 0x00030120\n\n[[op]]\nkind = \"vblank\"\n",
    )
    .unwrap();
    let trace = MmioTrace::load(&toml_path).unwrap();
    assert_eq!(trace.ops.len(), 2);

    let json_path = dir.path().join("boot.json");
    std::fs::write(&json_path, trace.to_json().unwrap()).unwrap();
    let reloaded = MmioTrace::load(&json_path).unwrap();
    assert_eq!(reloaded, trace);
    assert_eq!(reloaded.ops[1], TraceOp::Vblank);

    let mut nv3 = Nv3::new(Nv3Config::default()).unwrap();
    let report = reloaded.replay(&mut nv3);
    assert!(report.passed());
    assert_eq!(report.operations, 2);
}

#[test]
fn test_trace_parse_error() {
    let mut file = Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, "{{\"op\": [{{\"kind\": \"write\"}}]}}").unwrap();
    assert!(matches!(
        MmioTrace::load(file.path()),
        Err(EmulatorError::TraceParse(_))
    ));
}
