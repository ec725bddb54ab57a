//! # Digitizer Configuration Library
//!
//! A Rust library for configuring waveform digitizers from INI files:
//! parse the configuration, program it into the hardware, and read the
//! effective settings back out.
//!
//! Every hardware setting is **optional**: a setting absent from the
//! configuration is never programmed, so the hardware default stays in
//! effect. A setting that fails to parse or program is dropped with a
//! warning instead of aborting the run — at most that one setting is
//! lost.
//!
//! ## Features
//!
//! - **Optional-value model** — unset settings keep the hardware default
//! - **Channel ranges** — `DCOffset[0-3,7] = 28672` broadcasts one value
//! - **Group folding** — per-channel settings map onto group registers
//!   and mask bits of grouped boards, with consistency warnings
//! - **Failure isolation** — a failing register access loses only that
//!   setting; [`ConfigError`] is reserved for fatal conditions
//! - **Read-back** — retrieve the configuration the hardware actually
//!   holds, in the same INI dialect it was written in
//! - **Testable** — the [`DigitizerHandle`] trait decouples the engine
//!   from the vendor library; [`MockDigitizer`] ships with the crate
//!
//! ## Quick Start
//!
//! ```
//! use digconf::{ConfigTree, Digitizer, MockDigitizer};
//!
//! let ini = "\
//! [digi1]
//! LinkType = USB
//! LinkNum = 0
//! RecordLength = 2048
//! SWTriggerMode = TRGMODE_ACQ_ONLY
//! EnableChannel[0-3] = 1
//! ";
//!
//! let mut tree = ConfigTree::from_ini_str(ini)?;
//! let section = tree.section_mut("digi1").unwrap();
//!
//! // connect consumes the connection keys, configure the register keys
//! let mut digi: Digitizer<MockDigitizer> = Digitizer::connect("digi1", section)?;
//! digi.configure(section)?;
//!
//! // read the effective configuration back from the hardware
//! let effective = digi.retrieve_config()?;
//! assert_eq!(effective.get("RecordLength"), Some("2048"));
//! # Ok::<(), digconf::ConfigError>(())
//! ```
//!
//! ## Configuration Dialect
//!
//! One INI section per digitizer. Keys and section names are
//! case-insensitive. Per-channel settings accept a bracketed channel
//! range after the key name:
//!
//! ```ini
//! [digi1]
//! LinkType = USB
//! LinkNum = 0
//! EnableChannel[0-7] = 1
//! TriggerThreshold[0-3,6] = 100
//! Register0x8120 = 0xff
//! ```
//!
//! `Register0x####` keys program raw address/value pairs after all typed
//! settings, so they can override anything.
//!
//! ## Error Handling
//!
//! Fatal conditions (missing mandatory connection settings, an
//! unreachable device, life-cycle misuse) surface as [`ConfigError`].
//! Per-setting hardware failures are contained: they are logged through
//! the [`log`] facade and reset the affected field to absent.
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade with one target per
//! subsystem (`cfg`, `dig`, `conn`) and the digitizer name prefixed to
//! every record. With `env_logger` installed,
//! `RUST_LOG=cfg=debug,dig=info` separates the subsystems.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod device;
mod digitizer;
mod error;
mod settings;
pub mod enums;
pub mod fields;
pub mod logging;
pub mod mask;
pub mod mock;
pub mod optvec;
pub mod program;
pub mod range;
pub mod tree;

// Public re-exports
pub use device::{DigitizerHandle, HwResult};
pub use digitizer::Digitizer;
pub use enums::{
    AcquisitionMode, ConnectionType, DppAcqMode, DppSaveParam, DppTriggerMode, EnableMode,
    EnumMap, IoLevel, OutputSignalMode, PulsePolarity, RunSyncMode, TriggerMode, TriggerPolarity,
    VENDOR_PREFIX,
};
pub use error::{ConfigError, HardwareError, Result};
pub use fields::{Direction, OptSetting, OptVector};
pub use logging::ChannelLog;
pub use mock::MockDigitizer;
pub use settings::{ConnectionSettings, LinkParams, RegisterSettings};
pub use tree::{ConfigTree, Section};
