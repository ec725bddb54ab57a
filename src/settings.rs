//! Typed settings containers.
//!
//! [`ConnectionSettings`] identifies how to reach one physical device;
//! [`RegisterSettings`] holds every configurable hardware register as an
//! optional field. Both own the fields, know which configuration keys they
//! live under, and implement the same contract: `parse` consumes keys from
//! a section, `verify` applies cross-field defaulting and validation, and
//! `fill_section` serializes the set fields back out.
//!
//! A container is created once per logical digitizer, populated from the
//! configuration, mutated in place by `verify`, consumed by the
//! programming engine for writing, repopulated by it for reading back, and
//! finally serialized into the output tree.

use crate::enums::{
    catalog, AcquisitionMode, ConnectionType, DppAcqMode, DppSaveParam, DppTriggerMode,
    EnableMode, IoLevel, OutputSignalMode, PulsePolarity, RunSyncMode, TriggerMode,
    TriggerPolarity,
};
use crate::error::{ConfigError, Result};
use crate::fields::{
    parse_enum_setting, parse_enum_vector_setting, parse_flag_vector_setting, parse_hex_setting,
    parse_number, parse_setting, parse_vector_setting, Direction, OptSetting, OptVector,
};
use crate::logging::{channel, ChannelLog};
use crate::tree::Section;

/// Parameters needed to open the link to one physical device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkParams {
    /// Physical link type.
    pub link_type: ConnectionType,
    /// Link (port) number on the host side.
    pub link_num: i32,
    /// Daisy-chain node id on an optical link.
    pub conet_node: i32,
    /// VME base address of the board (0 when not VME-addressed).
    pub vme_base_address: u32,
}

/// How to reach one physical digitizer.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    name: String,
    log: ChannelLog,
    /// Physical link type (`LinkType`). Mandatory.
    pub link_type: OptSetting<ConnectionType>,
    /// Link number (`LinkNum`). Mandatory.
    pub link_num: OptSetting<i32>,
    /// Daisy-chain node id (`ConetNode`).
    pub conet_node: OptSetting<i32>,
    /// VME base address (`VMEBaseAddress`, hex).
    pub vme_base_address: OptSetting<u32>,
}

impl ConnectionSettings {
    /// Creates an empty container for the digitizer `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            log: ChannelLog::new(name.clone(), channel::CFG),
            name,
            link_type: OptSetting::new("LinkType"),
            link_num: OptSetting::new("LinkNum"),
            conet_node: OptSetting::new("ConetNode"),
            vme_base_address: OptSetting::new("VMEBaseAddress"),
        }
    }

    /// The digitizer (section) name this container belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, section: &mut Section, direction: Direction) {
        parse_enum_setting(
            &self.log,
            section,
            &mut self.link_type,
            &catalog::connection_type(),
            direction,
        );
        parse_setting(&self.log, section, &mut self.link_num, direction);
        parse_setting(&self.log, section, &mut self.conet_node, direction);
        parse_hex_setting(&self.log, section, &mut self.vme_base_address, direction);
        self.log
            .debug(format_args!("done with processing connection settings"));
    }

    /// Populates the fields from a configuration section, consuming the
    /// keys it recognizes.
    pub fn parse(&mut self, section: &mut Section) {
        self.process(section, Direction::Reading);
    }

    /// Serializes the set fields into `section`.
    pub fn fill_section(&mut self, section: &mut Section) {
        self.process(section, Direction::Writing);
    }

    /// Serializes the set fields into a fresh section named after the
    /// digitizer.
    pub fn create_section(&mut self) -> Section {
        let mut section = Section::new(self.name.clone());
        self.fill_section(&mut section);
        section
    }

    /// Applies cross-field defaulting and validates mandatory settings.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingSetting`] when `LinkType` or `LinkNum` is
    /// absent (or failed to parse) — these identify the device and have no
    /// sensible default.
    pub fn verify(&mut self) -> Result<()> {
        if self.link_type.value.is_none() {
            self.log.error(format_args!(
                "missing (or invalid) non-optional setting 'LinkType' in section '{}'",
                self.name
            ));
            return Err(ConfigError::missing_setting("LinkType", &self.name));
        }
        if self.link_num.value.is_none() {
            self.log.error(format_args!(
                "missing (or invalid) non-optional setting 'LinkNum' in section '{}'",
                self.name
            ));
            return Err(ConfigError::missing_setting("LinkNum", &self.name));
        }
        if self.link_type.value == Some(ConnectionType::Usb) {
            if matches!(self.conet_node.value, Some(node) if node != 0) {
                self.log.debug(format_args!(
                    "when using LinkType=USB, ConetNode needs to be '0'; fixed"
                ));
            }
            if matches!(self.vme_base_address.value, Some(addr) if addr != 0) {
                self.log.debug(format_args!(
                    "when using LinkType=USB, VMEBaseAddress needs to be '0'; fixed"
                ));
            }
            self.conet_node.value = Some(0);
            self.vme_base_address.value = Some(0);
        }
        self.log
            .debug(format_args!("done with verifying connection settings"));
        Ok(())
    }

    /// Builds the link parameters. Call after [`verify`](Self::verify).
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingSetting`] when a required field is absent.
    pub fn link_params(&self) -> Result<LinkParams> {
        Ok(LinkParams {
            link_type: self
                .link_type
                .value
                .ok_or_else(|| ConfigError::missing_setting("LinkType", &self.name))?,
            link_num: self
                .link_num
                .value
                .ok_or_else(|| ConfigError::missing_setting("LinkNum", &self.name))?,
            conet_node: self.conet_node.value.unwrap_or(0),
            vme_base_address: self.vme_base_address.value.unwrap_or(0),
        })
    }

    /// Logs the current settings at info severity, one key per line.
    pub fn print(&mut self) {
        let mut section = Section::new(self.name.clone());
        self.fill_section(&mut section);
        self.log
            .info(format_args!("config for '{}':", self.name));
        for (key, value) in section.entries() {
            self.log.info(format_args!("\t{key} = {value}"));
        }
    }
}

/// The full set of configurable hardware registers for one digitizer.
///
/// Vector fields are sized to the channel count the device reported at
/// connection time.
#[derive(Debug, Clone)]
pub struct RegisterSettings {
    name: String,
    log: ChannelLog,

    /// Events per block transfer (`MaxNumEventsBLT`). Standard firmware only.
    pub max_num_events_blt: OptSetting<u32>,
    /// Software trigger mode (`SWTriggerMode`).
    pub sw_trigger_mode: OptSetting<TriggerMode>,
    /// External trigger mode (`ExternalTriggerMode`).
    pub external_trigger_mode: OptSetting<TriggerMode>,
    /// Front-panel I/O level (`IOLevel`).
    pub io_level: OptSetting<IoLevel>,
    /// Run synchronization mode (`RunSynchronizationMode`).
    pub run_sync_mode: OptSetting<RunSyncMode>,
    /// Front-panel output signal mode (`OutputSignalMode`).
    pub out_signal_mode: OptSetting<OutputSignalMode>,
    /// Acquisition start/stop mode (`AcquisitionMode`).
    pub acquisition_mode: OptSetting<AcquisitionMode>,
    /// Record length in samples (`RecordLength`).
    pub record_length: OptSetting<u32>,
    /// Post-trigger fraction in percent (`PostTriggerSize`).
    pub post_trigger_size: OptSetting<u32>,
    /// Dual-edge sampling mode (`DESMode`). 751 family only.
    pub des_mode: OptSetting<EnableMode>,
    /// DPP acquisition mode (`DPPAcquisitionMode`); programmed together
    /// with [`dpp_acq_mode_param`](Self::dpp_acq_mode_param).
    pub dpp_acq_mode: OptSetting<DppAcqMode>,
    /// DPP save-parameter selection (`DPPSaveParam`), the second half of
    /// the acquisition-mode pair.
    pub dpp_acq_mode_param: OptSetting<DppSaveParam>,
    /// DPP trigger mode (`DPPTriggerMode`).
    pub dpp_trigger_mode: OptSetting<DppTriggerMode>,

    /// Per-channel enable flags (`EnableChannel`), folded into the enable
    /// mask register.
    pub ch_enable: OptVector<bool>,
    /// Per-channel trigger polarity (`TriggerPolarity`).
    pub ch_trigger_polarity: OptVector<TriggerPolarity>,
    /// Per-channel trigger threshold (`TriggerThreshold`).
    pub ch_trigger_threshold: OptVector<u32>,
    /// Per-channel self-trigger mode (`SelfTriggerMode`).
    pub ch_self_trigger: OptVector<TriggerMode>,
    /// Per-channel DC offset (`DCOffset`).
    pub ch_dc_offset: OptVector<u32>,
    /// DPP pre-trigger size in samples (`DPPPreTriggerSize`).
    pub dpp_pre_trigger_size: OptVector<u32>,
    /// DPP input pulse polarity (`PulsePolarity`).
    pub dpp_ch_pulse_polarity: OptVector<PulsePolarity>,

    /// Raw address/value register writes (`Register0x####` keys), applied
    /// as a final pass after the typed settings.
    pub register_values: Vec<(u32, u32)>,
}

impl RegisterSettings {
    /// Creates an empty container for a device with `nchannels` channels.
    pub fn new(name: impl Into<String>, nchannels: usize) -> Self {
        let name = name.into();
        Self {
            log: ChannelLog::new(name.clone(), channel::CFG),
            name,
            max_num_events_blt: OptSetting::new("MaxNumEventsBLT"),
            sw_trigger_mode: OptSetting::new("SWTriggerMode"),
            external_trigger_mode: OptSetting::new("ExternalTriggerMode"),
            io_level: OptSetting::new("IOLevel"),
            run_sync_mode: OptSetting::new("RunSynchronizationMode"),
            out_signal_mode: OptSetting::new("OutputSignalMode"),
            acquisition_mode: OptSetting::new("AcquisitionMode"),
            record_length: OptSetting::new("RecordLength"),
            post_trigger_size: OptSetting::new("PostTriggerSize"),
            des_mode: OptSetting::new("DESMode"),
            dpp_acq_mode: OptSetting::new("DPPAcquisitionMode"),
            dpp_acq_mode_param: OptSetting::new("DPPSaveParam"),
            dpp_trigger_mode: OptSetting::new("DPPTriggerMode"),
            ch_enable: OptVector::new("EnableChannel", nchannels),
            ch_trigger_polarity: OptVector::new("TriggerPolarity", nchannels),
            ch_trigger_threshold: OptVector::new("TriggerThreshold", nchannels),
            ch_self_trigger: OptVector::new("SelfTriggerMode", nchannels),
            ch_dc_offset: OptVector::new("DCOffset", nchannels),
            dpp_pre_trigger_size: OptVector::new("DPPPreTriggerSize", nchannels),
            dpp_ch_pulse_polarity: OptVector::new("PulsePolarity", nchannels),
            register_values: Vec::new(),
        }
    }

    /// The digitizer (section) name this container belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of channels the vector fields are sized for.
    pub fn nchannels(&self) -> usize {
        self.ch_enable.len()
    }

    fn process(&mut self, section: &mut Section, direction: Direction) {
        let log = &self.log;
        parse_setting(log, section, &mut self.max_num_events_blt, direction);
        parse_enum_setting(
            log,
            section,
            &mut self.sw_trigger_mode,
            &catalog::trigger_mode(),
            direction,
        );
        parse_enum_setting(
            log,
            section,
            &mut self.external_trigger_mode,
            &catalog::trigger_mode(),
            direction,
        );
        parse_enum_setting(log, section, &mut self.io_level, &catalog::io_level(), direction);
        parse_enum_setting(
            log,
            section,
            &mut self.run_sync_mode,
            &catalog::run_sync_mode(),
            direction,
        );
        parse_enum_setting(
            log,
            section,
            &mut self.out_signal_mode,
            &catalog::output_signal_mode(),
            direction,
        );
        parse_enum_setting(
            log,
            section,
            &mut self.acquisition_mode,
            &catalog::acquisition_mode(),
            direction,
        );
        parse_setting(log, section, &mut self.record_length, direction);
        parse_setting(log, section, &mut self.post_trigger_size, direction);
        parse_enum_setting(log, section, &mut self.des_mode, &catalog::enable_mode(), direction);
        parse_enum_setting(
            log,
            section,
            &mut self.dpp_acq_mode,
            &catalog::dpp_acq_mode(),
            direction,
        );
        parse_enum_setting(
            log,
            section,
            &mut self.dpp_acq_mode_param,
            &catalog::dpp_save_param(),
            direction,
        );
        parse_enum_setting(
            log,
            section,
            &mut self.dpp_trigger_mode,
            &catalog::dpp_trigger_mode(),
            direction,
        );

        parse_flag_vector_setting(log, section, &mut self.ch_enable, direction);
        parse_enum_vector_setting(
            log,
            section,
            &mut self.ch_trigger_polarity,
            &catalog::trigger_polarity(),
            direction,
        );
        parse_vector_setting(log, section, &mut self.ch_trigger_threshold, direction);
        parse_enum_vector_setting(
            log,
            section,
            &mut self.ch_self_trigger,
            &catalog::trigger_mode(),
            direction,
        );
        parse_vector_setting(log, section, &mut self.ch_dc_offset, direction);
        parse_vector_setting(log, section, &mut self.dpp_pre_trigger_size, direction);
        parse_enum_vector_setting(
            log,
            section,
            &mut self.dpp_ch_pulse_polarity,
            &catalog::pulse_polarity(),
            direction,
        );

        self.process_register_values(section, direction);
        self.log
            .debug(format_args!("done with processing register settings"));
    }

    /// Raw register writes: every `Register0x####` key carries the target
    /// address in its name and the value (hex or decimal) as its value.
    fn process_register_values(&mut self, section: &mut Section, direction: Direction) {
        match direction {
            Direction::Reading => {
                let keys: Vec<(String, String)> = section
                    .entries()
                    .filter(|(key, _)| {
                        key.len() > 8 && key.as_bytes()[..8].eq_ignore_ascii_case(b"Register")
                    })
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect();
                for (key, raw) in keys {
                    let Some(address) = parse_number(&key[8..]) else {
                        self.log.warn(format_args!(
                            "could not parse register address in key '{key}', ignoring it"
                        ));
                        continue;
                    };
                    let Some(value) = parse_number(&raw) else {
                        self.log.warn(format_args!(
                            "could not parse value '{raw}' for register key '{key}', ignoring it"
                        ));
                        continue;
                    };
                    self.log.debug(format_args!(
                        "raw register write {address:#x} = {value:#x}"
                    ));
                    self.register_values.push((address, value));
                    section.take(&key);
                }
            }
            Direction::Writing => {
                for (address, value) in &self.register_values {
                    section.put(format!("Register{address:#x}"), format!("{value:#x}"));
                }
            }
        }
    }

    /// Populates the fields from a configuration section, consuming the
    /// keys it recognizes.
    pub fn parse(&mut self, section: &mut Section) {
        self.process(section, Direction::Reading);
    }

    /// Serializes the set fields into `section`.
    pub fn fill_section(&mut self, section: &mut Section) {
        self.process(section, Direction::Writing);
    }

    /// Applies cross-field defaulting and validation.
    pub fn verify(&mut self) -> Result<()> {
        if let Some(percent) = self.post_trigger_size.value {
            if percent > 100 {
                self.log.warn(format_args!(
                    "'PostTriggerSize' is a percentage of the record length, clamping {percent} to 100"
                ));
                self.post_trigger_size.value = Some(100);
            }
        }
        // the DPP acquisition mode is programmed as a correlated pair
        if self.dpp_acq_mode.value.is_some() != self.dpp_acq_mode_param.value.is_some() {
            self.log.warn(format_args!(
                "'DPPAcquisitionMode' and 'DPPSaveParam' must both be given to be programmed; the incomplete pair will be skipped"
            ));
        }
        self.log
            .debug(format_args!("done with verifying register settings"));
        Ok(())
    }

    /// Logs the current settings at info severity, one key per line.
    pub fn print(&mut self) {
        let mut section = Section::new(self.name.clone());
        self.fill_section(&mut section);
        self.log
            .info(format_args!("config for '{}':", self.name));
        for (key, value) in section.entries() {
            self.log.info(format_args!("\t{key} = {value}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection_section(entries: &[(&str, &str)]) -> Section {
        let mut section = Section::new("digi1");
        for (key, value) in entries {
            section.put(*key, *value);
        }
        section
    }

    #[test]
    fn test_connection_parse_and_verify() {
        let mut section = connection_section(&[
            ("LinkType", "USB"),
            ("LinkNum", "0"),
            ("ConetNode", "0"),
            ("VMEBaseAddress", "0x0"),
        ]);
        let mut conn = ConnectionSettings::new("digi1");
        conn.parse(&mut section);
        assert!(section.is_empty());
        conn.verify().unwrap();
        let params = conn.link_params().unwrap();
        assert_eq!(params.link_type, ConnectionType::Usb);
        assert_eq!(params.link_num, 0);
    }

    #[test]
    fn test_connection_missing_link_type_is_fatal() {
        let mut section = connection_section(&[("LinkNum", "0")]);
        let mut conn = ConnectionSettings::new("digi1");
        conn.parse(&mut section);
        assert!(matches!(
            conn.verify(),
            Err(ConfigError::MissingSetting { .. })
        ));
    }

    #[test]
    fn test_connection_usb_forces_node_and_address() {
        let mut section = connection_section(&[
            ("LinkType", "USB"),
            ("LinkNum", "1"),
            ("ConetNode", "3"),
            ("VMEBaseAddress", "0x32100000"),
        ]);
        let mut conn = ConnectionSettings::new("digi1");
        conn.parse(&mut section);
        conn.verify().unwrap();
        let params = conn.link_params().unwrap();
        assert_eq!(params.conet_node, 0);
        assert_eq!(params.vme_base_address, 0);
    }

    #[test]
    fn test_connection_round_trip() {
        let mut section = connection_section(&[
            ("LinkType", "OpticalLink"),
            ("LinkNum", "2"),
            ("ConetNode", "1"),
            ("VMEBaseAddress", "0x32100000"),
        ]);
        let mut conn = ConnectionSettings::new("digi1");
        conn.parse(&mut section);
        let mut out = Section::new("digi1");
        conn.fill_section(&mut out);
        assert_eq!(out.get("LinkType"), Some("OpticalLink"));
        assert_eq!(out.get("LinkNum"), Some("2"));
        assert_eq!(out.get("ConetNode"), Some("1"));
        assert_eq!(out.get("VMEBaseAddress"), Some("0x32100000"));
    }

    #[test]
    fn test_register_parse_typed_fields() {
        let mut section = connection_section(&[
            ("RecordLength", "1024"),
            ("SWTriggerMode", "TRGMODE_ACQ_ONLY"),
            ("EnableChannel[0-1]", "1"),
            ("DCOffset[0-3]", "32768"),
        ]);
        let mut reg = RegisterSettings::new("digi1", 4);
        reg.parse(&mut section);
        assert!(section.is_empty());
        assert_eq!(reg.record_length.value, Some(1024));
        assert_eq!(reg.sw_trigger_mode.value, Some(TriggerMode::AcqOnly));
        assert_eq!(
            reg.ch_enable.values,
            vec![Some(true), Some(true), None, None]
        );
        assert_eq!(reg.ch_dc_offset.values, vec![Some(32768); 4]);
    }

    #[test]
    fn test_register_values_parsed_from_keys() {
        let mut section = connection_section(&[
            ("Register0x8000", "0x01"),
            ("Register0x810C", "64"),
            ("RegisterOops", "1"),
        ]);
        let mut reg = RegisterSettings::new("digi1", 4);
        reg.parse(&mut section);
        assert_eq!(reg.register_values, vec![(0x8000, 0x01), (0x810c, 64)]);
        // unparsable address stays for the unknown-keys diagnostic
        assert_eq!(section.get("RegisterOops"), Some("1"));
    }

    #[test]
    fn test_register_values_round_trip() {
        let mut reg = RegisterSettings::new("digi1", 4);
        reg.register_values.push((0x8120, 0xff));
        let mut out = Section::new("digi1");
        reg.fill_section(&mut out);
        assert_eq!(out.get("Register0x8120"), Some("0xff"));
    }

    #[test]
    fn test_verify_clamps_post_trigger_percentage() {
        let mut reg = RegisterSettings::new("digi1", 4);
        reg.post_trigger_size.value = Some(150);
        reg.verify().unwrap();
        assert_eq!(reg.post_trigger_size.value, Some(100));
    }

    #[test]
    fn test_unknown_keys_remain_after_parse() {
        let mut section = connection_section(&[
            ("RecordLength", "1024"),
            ("RecrodLength", "2048"), // typo stays behind
        ]);
        let mut reg = RegisterSettings::new("digi1", 4);
        reg.parse(&mut section);
        let leftover: Vec<_> = section.entries().collect();
        assert_eq!(leftover, vec![("RecrodLength", "2048")]);
    }
}
