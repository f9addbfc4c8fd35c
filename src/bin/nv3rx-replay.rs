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

//! Replay an MMIO trace against an emulated RIVA 128
//!
//! ```text
//! nv3rx-replay trace.toml --config board.toml --dump-ramro
//! ```
//!
//! The process exits with 0 when every `expect` matched, 1 on mismatches and
//! 2 on errors.

use clap::Parser;
use nv3rx::core::config::Nv3Config;
use nv3rx::core::interrupt::PMC_INTR;
use nv3rx::core::memory::SystemRam;
use nv3rx::core::pfifo::PFIFO_INTR;
use nv3rx::core::pgraph::{PGRAPH_DMA_INTR_0, PGRAPH_INTR_0, PGRAPH_INTR_1};
use nv3rx::core::system::{MmioTrace, Nv3};
use std::path::PathBuf;
use std::process;

/// System memory attached for PCI/AGP DMA objects and the DMA pusher
const HOST_RAM_SIZE: usize = 16 * 1024 * 1024;

#[derive(Parser)]
#[command(name = "nv3rx-replay")]
#[command(about = "Replay an MMIO trace against an emulated RIVA 128", long_about = None)]
#[command(version)]
struct Cli {
    /// Trace file (.toml or .json)
    trace: PathBuf,

    /// Board configuration (TOML). Defaults to $NV3RX_CONFIG
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the RAMRO runout log after the replay
    #[arg(long)]
    dump_ramro: bool,

    /// Write a save state after the replay
    #[arg(long, value_name = "PATH")]
    save_state: Option<PathBuf>,

    /// Log every register access
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    // .env is optional
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Trace
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    match run(&cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    }
}

fn run(cli: &Cli) -> nv3rx::Result<bool> {
    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var_os("NV3RX_CONFIG").map(PathBuf::from));
    let config = match config_path {
        Some(path) => Nv3Config::load(path)?,
        None => Nv3Config::default(),
    };

    let trace = MmioTrace::load(&cli.trace)?;
    let mut nv3 = Nv3::with_host(config, Box::new(SystemRam::new(HOST_RAM_SIZE)))?;

    let report = trace.replay(&mut nv3);

    for (addr, value) in &report.reads {
        println!("read  0x{:06X} = 0x{:08X}", addr, value);
    }
    for mismatch in &report.mismatches {
        println!(
            "FAIL  op {} 0x{:06X}: expected 0x{:08X} got 0x{:08X} (mask 0x{:08X})",
            mismatch.index, mismatch.addr, mismatch.expected, mismatch.actual, mismatch.mask
        );
    }

    println!(
        "{} operations, {} mismatches",
        report.operations,
        report.mismatches.len()
    );
    for (name, addr) in [
        ("PMC_INTR", PMC_INTR),
        ("PFIFO_INTR", PFIFO_INTR),
        ("PGRAPH_INTR_0", PGRAPH_INTR_0),
        ("PGRAPH_INTR_1", PGRAPH_INTR_1),
        ("PGRAPH_DMA_INTR_0", PGRAPH_DMA_INTR_0),
    ] {
        println!("{:<18} 0x{:08X}", name, nv3.peek32(addr)?);
    }
    println!("IRQ line           {}", if nv3.irq_asserted() { "asserted" } else { "idle" });

    if cli.dump_ramro {
        let entries = nv3.runout_entries();
        println!("RAMRO: {} entries", entries.len());
        for entry in entries {
            println!(
                "  ch={} subch={} method=0x{:04X} data=0x{:08X} reason={:?}",
                entry.channel(),
                entry.subchannel(),
                entry.method(),
                entry.data,
                entry.reason_kind()
            );
        }
    }

    if let Some(path) = &cli.save_state {
        nv3.save_state_to_file(path)?;
        log::info!("Save state written to {}", path.display());
    }

    Ok(report.passed())
}
