//! Bidirectional translation between vendor enumeration codes and the
//! human-readable labels used in configuration files.
//!
//! The vendor driver names every enumeration constant with a fixed
//! namespace prefix ([`VENDOR_PREFIX`], `DGTZ_`). Configuration files carry
//! the label *without* that prefix; lookups prepend it again, so
//! `LinkType = USB` in a file matches the catalog entry `DGTZ_USB`.
//! Matching is case-insensitive, and a failed lookup is an absence rather
//! than an error — the field engine decides whether that is fatal and logs
//! the list of valid labels as a typo aid.
//!
//! # Example
//!
//! ```
//! use digconf::enums::{catalog, ConnectionType, VENDOR_PREFIX};
//!
//! let map = catalog::connection_type();
//! let code = map.find_label(&format!("{VENDOR_PREFIX}usb"));
//! assert_eq!(code, Some(ConnectionType::Usb));
//! assert_eq!(map.display_label(ConnectionType::Usb).unwrap(), "USB");
//! ```

/// Namespace prefix shared by every vendor enumeration label.
pub const VENDOR_PREFIX: &str = "DGTZ_";

/// A bijection between canonical vendor labels and enumeration codes.
///
/// Built once per enumeration type from the static catalogs in
/// [`catalog`]; only lookup-by-label and lookup-by-code are needed.
#[derive(Debug, Clone)]
pub struct EnumMap<C: Copy + PartialEq> {
    entries: Vec<(&'static str, C)>,
}

impl<C: Copy + PartialEq> EnumMap<C> {
    /// Builds a map from `(canonical label, code)` pairs.
    pub fn new(entries: &[(&'static str, C)]) -> Self {
        Self {
            entries: entries.to_vec(),
        }
    }

    /// Case-insensitive exact match of `text` against the canonical labels.
    ///
    /// Returns `None` when nothing matches; absence is not an error here.
    pub fn find_label(&self, text: &str) -> Option<C> {
        self.entries
            .iter()
            .find(|(label, _)| label.eq_ignore_ascii_case(text))
            .map(|(_, code)| *code)
    }

    /// The canonical (prefixed) label for `code`.
    pub fn label(&self, code: C) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(label, _)| *label)
    }

    /// The label for `code` with the vendor prefix stripped, as written to
    /// configuration output.
    pub fn display_label(&self, code: C) -> Option<&'static str> {
        self.label(code)
            .map(|label| label.strip_prefix(VENDOR_PREFIX).unwrap_or(label))
    }

    /// The longest prefix shared by every label in the map
    /// (e.g. `DGTZ_TRGMODE_` for the trigger-mode catalog).
    pub fn common_prefix(&self) -> &'static str {
        let Some(&(first, _)) = self.entries.first() else {
            return "";
        };
        let mut len = first.len();
        for (label, _) in &self.entries {
            len = len.min(label.len());
            for (i, (a, b)) in first.bytes().zip(label.bytes()).enumerate() {
                if i >= len {
                    break;
                }
                if a != b {
                    len = i;
                    break;
                }
            }
        }
        &first[..len]
    }

    /// Every label with the shared prefix stripped, for typo diagnostics.
    pub fn valid_labels(&self) -> Vec<&'static str> {
        let prefix = self.common_prefix();
        self.entries
            .iter()
            .map(|(label, _)| label.strip_prefix(prefix).unwrap_or(label))
            .collect()
    }

    /// Iterates over `(canonical label, code)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, C)> + '_ {
        self.entries.iter().copied()
    }
}

/// Physical link used to reach the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    /// Direct USB link.
    Usb,
    /// Optical link via a controller card.
    OpticalLink,
    /// USB via an A4818 optical bridge.
    UsbA4818,
}

/// Trigger generation/propagation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    /// Trigger source disabled.
    Disabled,
    /// Trigger only forwarded to the trigger output.
    ExtOutOnly,
    /// Trigger only starts an acquisition.
    AcqOnly,
    /// Trigger starts an acquisition and is forwarded.
    AcqAndExtOut,
}

/// Electrical standard of the front-panel I/O connectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoLevel {
    /// NIM levels.
    Nim,
    /// TTL levels.
    Ttl,
}

/// How an acquisition run is started and stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionMode {
    /// Started by software command.
    SwControlled,
    /// Gated by the S-IN input.
    SInControlled,
    /// Started by the first trigger.
    FirstTrgControlled,
}

/// Multi-board run synchronization scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSyncMode {
    /// No synchronization.
    Disabled,
    /// TRG-OUT/TRG-IN daisy chain.
    TrgOutTrgInDaisyChain,
    /// TRG-OUT/S-IN daisy chain.
    TrgOutSinDaisyChain,
    /// S-IN fan-out from the first board.
    SinFanout,
    /// GPIO daisy chain.
    GpioGpioDaisyChain,
}

/// Signal routed to the front-panel output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSignalMode {
    /// Trigger signal.
    Trigger,
    /// Fast trigger of all channels.
    FastTrgAll,
    /// Accepted fast triggers only.
    FastTrgAccepted,
    /// Board-busy signal.
    Busy,
}

/// Edge on which a channel trigger fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerPolarity {
    /// Rising edge.
    OnRisingEdge,
    /// Falling edge.
    OnFallingEdge,
}

/// Polarity of the input pulse (DPP firmware).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulsePolarity {
    /// Positive pulses.
    Positive,
    /// Negative pulses.
    Negative,
}

/// Generic enable/disable switch used by several registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableMode {
    /// Feature enabled.
    Enable,
    /// Feature disabled.
    Disable,
}

/// DPP acquisition mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DppAcqMode {
    /// Raw waveforms only.
    Oscilloscope,
    /// Processed list data only.
    List,
    /// Waveforms and list data.
    Mixed,
}

/// Which processed quantities the DPP firmware saves; the correlated
/// parameter of the acquisition-mode pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DppSaveParam {
    /// Energy only.
    EnergyOnly,
    /// Timestamp only.
    TimeOnly,
    /// Energy and timestamp.
    EnergyAndTime,
    /// Nothing beyond the waveform.
    None,
}

/// DPP trigger handling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DppTriggerMode {
    /// Independent channel triggers.
    Normal,
    /// Coincidence between channels.
    Coincidence,
}

/// Catalog constructors, one per vendor enumeration.
///
/// The maps are cheap to build and constructed on demand at each parse
/// site, mirroring how the generated vendor tables are used.
pub mod catalog {
    use super::*;

    /// Connection/link types.
    pub fn connection_type() -> EnumMap<ConnectionType> {
        EnumMap::new(&[
            ("DGTZ_USB", ConnectionType::Usb),
            ("DGTZ_OpticalLink", ConnectionType::OpticalLink),
            ("DGTZ_USB_A4818", ConnectionType::UsbA4818),
        ])
    }

    /// Trigger modes (software, external and self trigger).
    pub fn trigger_mode() -> EnumMap<TriggerMode> {
        EnumMap::new(&[
            ("DGTZ_TRGMODE_DISABLED", TriggerMode::Disabled),
            ("DGTZ_TRGMODE_EXTOUT_ONLY", TriggerMode::ExtOutOnly),
            ("DGTZ_TRGMODE_ACQ_ONLY", TriggerMode::AcqOnly),
            ("DGTZ_TRGMODE_ACQ_AND_EXTOUT", TriggerMode::AcqAndExtOut),
        ])
    }

    /// Front-panel I/O levels.
    pub fn io_level() -> EnumMap<IoLevel> {
        EnumMap::new(&[
            ("DGTZ_IOLevel_NIM", IoLevel::Nim),
            ("DGTZ_IOLevel_TTL", IoLevel::Ttl),
        ])
    }

    /// Acquisition start/stop modes.
    pub fn acquisition_mode() -> EnumMap<AcquisitionMode> {
        EnumMap::new(&[
            ("DGTZ_SW_CONTROLLED", AcquisitionMode::SwControlled),
            ("DGTZ_S_IN_CONTROLLED", AcquisitionMode::SInControlled),
            ("DGTZ_FIRST_TRG_CONTROLLED", AcquisitionMode::FirstTrgControlled),
        ])
    }

    /// Multi-board run synchronization modes.
    pub fn run_sync_mode() -> EnumMap<RunSyncMode> {
        EnumMap::new(&[
            ("DGTZ_RUN_SYNC_Disabled", RunSyncMode::Disabled),
            (
                "DGTZ_RUN_SYNC_TrgOutTrgInDaisyChain",
                RunSyncMode::TrgOutTrgInDaisyChain,
            ),
            (
                "DGTZ_RUN_SYNC_TrgOutSinDaisyChain",
                RunSyncMode::TrgOutSinDaisyChain,
            ),
            ("DGTZ_RUN_SYNC_SinFanout", RunSyncMode::SinFanout),
            (
                "DGTZ_RUN_SYNC_GpioGpioDaisyChain",
                RunSyncMode::GpioGpioDaisyChain,
            ),
        ])
    }

    /// Front-panel output signal modes.
    pub fn output_signal_mode() -> EnumMap<OutputSignalMode> {
        EnumMap::new(&[
            ("DGTZ_TRIGGER", OutputSignalMode::Trigger),
            ("DGTZ_FASTTRG_ALL", OutputSignalMode::FastTrgAll),
            ("DGTZ_FASTTRG_ACCEPTED", OutputSignalMode::FastTrgAccepted),
            ("DGTZ_BUSY", OutputSignalMode::Busy),
        ])
    }

    /// Channel trigger polarities.
    pub fn trigger_polarity() -> EnumMap<TriggerPolarity> {
        EnumMap::new(&[
            ("DGTZ_TriggerOnRisingEdge", TriggerPolarity::OnRisingEdge),
            ("DGTZ_TriggerOnFallingEdge", TriggerPolarity::OnFallingEdge),
        ])
    }

    /// Input pulse polarities.
    pub fn pulse_polarity() -> EnumMap<PulsePolarity> {
        EnumMap::new(&[
            ("DGTZ_PulsePolarityPositive", PulsePolarity::Positive),
            ("DGTZ_PulsePolarityNegative", PulsePolarity::Negative),
        ])
    }

    /// Enable/disable switches.
    pub fn enable_mode() -> EnumMap<EnableMode> {
        EnumMap::new(&[
            ("DGTZ_ENABLE", EnableMode::Enable),
            ("DGTZ_DISABLE", EnableMode::Disable),
        ])
    }

    /// DPP acquisition modes.
    pub fn dpp_acq_mode() -> EnumMap<DppAcqMode> {
        EnumMap::new(&[
            ("DGTZ_DPP_ACQ_MODE_Oscilloscope", DppAcqMode::Oscilloscope),
            ("DGTZ_DPP_ACQ_MODE_List", DppAcqMode::List),
            ("DGTZ_DPP_ACQ_MODE_Mixed", DppAcqMode::Mixed),
        ])
    }

    /// DPP save-parameter selection.
    pub fn dpp_save_param() -> EnumMap<DppSaveParam> {
        EnumMap::new(&[
            ("DGTZ_DPP_SAVE_PARAM_EnergyOnly", DppSaveParam::EnergyOnly),
            ("DGTZ_DPP_SAVE_PARAM_TimeOnly", DppSaveParam::TimeOnly),
            ("DGTZ_DPP_SAVE_PARAM_EnergyAndTime", DppSaveParam::EnergyAndTime),
            ("DGTZ_DPP_SAVE_PARAM_None", DppSaveParam::None),
        ])
    }

    /// DPP trigger modes.
    pub fn dpp_trigger_mode() -> EnumMap<DppTriggerMode> {
        EnumMap::new(&[
            ("DGTZ_DPP_TriggerMode_Normal", DppTriggerMode::Normal),
            ("DGTZ_DPP_TriggerMode_Coincidence", DppTriggerMode::Coincidence),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let map = catalog::connection_type();
        assert_eq!(map.find_label("dgtz_usb"), Some(ConnectionType::Usb));
        assert_eq!(map.find_label("DGTZ_OPTICALLINK"), Some(ConnectionType::OpticalLink));
        assert_eq!(map.find_label("DGTZ_Ethernet"), None);
    }

    #[test]
    fn test_display_label_strips_vendor_prefix() {
        let map = catalog::trigger_mode();
        assert_eq!(
            map.display_label(TriggerMode::AcqOnly).unwrap(),
            "TRGMODE_ACQ_ONLY"
        );
    }

    #[test]
    fn test_common_prefix() {
        assert_eq!(catalog::trigger_mode().common_prefix(), "DGTZ_TRGMODE_");
        assert_eq!(catalog::io_level().common_prefix(), "DGTZ_IOLevel_");
        // catalogs with no shared stem beyond the namespace
        assert_eq!(catalog::output_signal_mode().common_prefix(), "DGTZ_");
    }

    #[test]
    fn test_valid_labels_strip_common_prefix() {
        let labels = catalog::io_level().valid_labels();
        assert_eq!(labels, vec!["NIM", "TTL"]);
    }

    #[test]
    fn test_label_round_trip_all_catalogs() {
        fn round_trip<C: Copy + PartialEq + std::fmt::Debug>(map: &EnumMap<C>) {
            for (label, code) in map.iter() {
                assert_eq!(map.find_label(label), Some(code));
                assert_eq!(map.label(code), Some(label));
            }
        }
        round_trip(&catalog::connection_type());
        round_trip(&catalog::trigger_mode());
        round_trip(&catalog::io_level());
        round_trip(&catalog::acquisition_mode());
        round_trip(&catalog::run_sync_mode());
        round_trip(&catalog::output_signal_mode());
        round_trip(&catalog::trigger_polarity());
        round_trip(&catalog::pulse_polarity());
        round_trip(&catalog::enable_mode());
        round_trip(&catalog::dpp_acq_mode());
        round_trip(&catalog::dpp_save_param());
        round_trip(&catalog::dpp_trigger_mode());
    }
}
