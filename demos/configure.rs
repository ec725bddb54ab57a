//! Example: configuring digitizers from an INI file
//!
//! Run with: cargo run --example configure -- [config.ini]
//!
//! Reads a configuration file with one section per digitizer, connects
//! and configures each one, then prints the effective configuration read
//! back from the hardware. Uses the in-memory mock digitizer, so it runs
//! without any hardware attached.
//!
//! Set RUST_LOG to see the parsing and programming logs, e.g.:
//! RUST_LOG=cfg=debug,dig=debug,conn=info cargo run --example configure

use std::env;
use std::fs;
use std::process::ExitCode;

use digconf::{ConfigTree, Digitizer, MockDigitizer};

const DEFAULT_CONFIG: &str = "\
[daq]
; sections named 'daq' or 'general' hold application settings and are
; not treated as digitizers

[digi1]
LinkType = USB
LinkNum = 0
RecordLength = 2048
PostTriggerSize = 60
SWTriggerMode = TRGMODE_ACQ_ONLY
EnableChannel[0-3] = 1
DCOffset[0-7] = 28672
Register0x8120 = 0xff
";

/// Application-level sections that do not describe a digitizer.
fn is_reserved_section(name: &str) -> bool {
    name.eq_ignore_ascii_case("daq") || name.eq_ignore_ascii_case("general")
}

fn main() -> ExitCode {
    env_logger::init();

    let contents = match env::args().nth(1) {
        Some(path) => match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) => {
                eprintln!("could not read '{path}': {err}");
                return ExitCode::FAILURE;
            }
        },
        None => DEFAULT_CONFIG.to_string(),
    };

    let mut tree = match ConfigTree::from_ini_str(&contents) {
        Ok(tree) => tree,
        Err(err) => {
            eprintln!("could not parse configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    let names: Vec<String> = tree
        .sections()
        .map(|s| s.name().to_string())
        .filter(|name| !is_reserved_section(name))
        .collect();
    println!("configuration for {} digitizer(s) found", names.len());

    let mut effective = ConfigTree::new();
    for name in names {
        let Some(section) = tree.section_mut(&name) else {
            continue;
        };
        let mut digi: Digitizer<MockDigitizer> = match Digitizer::connect(&name, section) {
            Ok(digi) => digi,
            Err(err) => {
                eprintln!("skipping digitizer '{name}': {err}");
                continue;
            }
        };
        if let Err(err) = digi.configure(section) {
            eprintln!("could not configure digitizer '{name}': {err}");
            continue;
        }
        match digi.retrieve_config() {
            Ok(section) => effective.push(section),
            Err(err) => eprintln!("could not read back configuration of '{name}': {err}"),
        }
    }

    println!("\neffective configuration as read back from the hardware:\n");
    print!("{}", effective.to_ini_string());
    ExitCode::SUCCESS
}
