//! One digitizer through its configuration life cycle.
//!
//! A [`Digitizer`] is created by [`connect`](Digitizer::connect)ing with
//! the connection settings of its configuration section, then
//! [`configure`](Digitizer::configure)d with the register settings of the
//! same section, and can afterwards have its effective configuration read
//! back from the hardware with
//! [`retrieve_config`](Digitizer::retrieve_config).
//!
//! # Example
//!
//! ```
//! use digconf::{ConfigTree, Digitizer, MockDigitizer};
//!
//! let mut tree = ConfigTree::from_ini_str(
//!     "[digi1]\nLinkType = USB\nLinkNum = 0\nRecordLength = 1024\n",
//! )?;
//! let section = tree.section_mut("digi1").unwrap();
//! let mut digi: Digitizer<MockDigitizer> = Digitizer::connect("digi1", section)?;
//! digi.configure(section)?;
//! let effective = digi.retrieve_config()?;
//! assert_eq!(effective.get("RecordLength"), Some("1024"));
//! # Ok::<(), digconf::ConfigError>(())
//! ```

use crate::device::DigitizerHandle;
use crate::enums::ConnectionType;
use crate::error::{ConfigError, Result};
use crate::fields::Direction;
use crate::logging::{channel, ChannelLog};
use crate::optvec::all_values_same;
use crate::program::{program_loop, program_mask, program_pair, program_value};
use crate::settings::{ConnectionSettings, RegisterSettings};
use crate::tree::Section;

/// A connected digitizer and its settings.
#[derive(Debug)]
pub struct Digitizer<D> {
    name: String,
    log: ChannelLog,
    conn: ConnectionSettings,
    handle: D,
    reg: Option<RegisterSettings>,
}

impl<D: DigitizerHandle> Digitizer<D> {
    /// Parses the connection settings from `section` and opens the link.
    ///
    /// Consumes the connection keys from the section; the register keys
    /// stay for a subsequent [`configure`](Self::configure).
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingSetting`] when a mandatory connection setting
    /// is absent, [`ConfigError::Connection`] when the device cannot be
    /// opened. Both are fatal for this digitizer.
    pub fn connect(name: impl Into<String>, section: &mut Section) -> Result<Self> {
        let name = name.into();
        let mut conn = ConnectionSettings::new(name.clone());
        conn.parse(section);
        conn.verify()?;
        let params = conn.link_params()?;
        let conn_log = ChannelLog::new(name.clone(), channel::CONN);
        conn_log.info(format_args!(
            "establishing connection (linkType={:?}, linkNum={}, conetNode={}, vmeBaseAddress={:#x})",
            params.link_type, params.link_num, params.conet_node, params.vme_base_address
        ));
        let handle = match D::open(&params) {
            Ok(handle) => handle,
            Err(source) => {
                conn_log.error(format_args!(
                    "could not establish communication: {source}"
                ));
                conn_log.error(format_args!(
                    "please check the physical connection and the connection settings"
                ));
                if params.link_type == ConnectionType::Usb {
                    conn_log.error(format_args!(
                        "when using a USB link, make sure the vendor USB driver kernel module is installed and loaded, especially after kernel updates"
                    ));
                }
                return Err(ConfigError::Connection { name, source });
            }
        };
        let log = ChannelLog::new(name.clone(), channel::DIG);
        log.info(format_args!(
            "connected: model {} (serial {}), {} channels in {} groups, {} ADC bits, ROC FW {}, AMC FW {}, DPP FW: {}",
            handle.model_name(),
            handle.serial_number(),
            handle.channels(),
            handle.groups(),
            handle.adc_bits(),
            handle.roc_firmware(),
            handle.amc_firmware(),
            if handle.has_dpp_fw() { "yes" } else { "no" }
        ));
        Ok(Self {
            name,
            log,
            conn,
            handle,
            reg: None,
        })
    }

    /// Wraps an already-open handle, bypassing connection settings.
    pub fn from_handle(name: impl Into<String>, handle: D) -> Self {
        let name = name.into();
        Self {
            log: ChannelLog::new(name.clone(), channel::DIG),
            conn: ConnectionSettings::new(name.clone()),
            name,
            handle,
            reg: None,
        }
    }

    /// The digitizer (section) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying device handle.
    pub fn handle(&self) -> &D {
        &self.handle
    }

    /// The register settings, once configured.
    pub fn register_settings(&self) -> Option<&RegisterSettings> {
        self.reg.as_ref()
    }

    /// Parses the register settings from `section` and programs them into
    /// the device.
    ///
    /// Every key left in the section afterwards is unknown (or misspelled)
    /// and reported as a warning.
    ///
    /// # Errors
    ///
    /// [`ConfigError::AlreadyConfigured`] when called twice.
    pub fn configure(&mut self, section: &mut Section) -> Result<()> {
        if self.reg.is_some() {
            return Err(ConfigError::AlreadyConfigured(self.name.clone()));
        }
        let mut reg = RegisterSettings::new(self.name.clone(), self.handle.channels() as usize);
        reg.parse(section);
        reg.verify()?;
        self.verify_settings(&mut reg);
        self.reg = Some(reg);
        self.program(Direction::Writing);
        for (key, value) in section.entries() {
            self.log.warn(format_args!(
                "unknown setting in section {} ignored: {key} = {value}",
                self.name
            ));
        }
        Ok(())
    }

    /// Reads the effective configuration back from the hardware and
    /// returns it as a section, connection settings included.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NotConfigured`] before [`configure`](Self::configure)
    /// has run.
    pub fn retrieve_config(&mut self) -> Result<Section> {
        if self.reg.is_none() {
            return Err(ConfigError::NotConfigured(self.name.clone()));
        }
        self.program(Direction::Reading);
        let mut section = self.conn.create_section();
        if let Some(reg) = self.reg.as_mut() {
            reg.fill_section(&mut section);
        }
        Ok(section)
    }

    /// Model- and firmware-dependent checks on the parsed settings.
    fn verify_settings(&self, reg: &mut RegisterSettings) {
        if self.handle.has_dpp_fw() {
            if reg.max_num_events_blt.value.is_some() {
                self.log.warn(format_args!(
                    "'{}' does not apply to DPP firmware and will not be programmed; use the DPP event aggregation instead",
                    reg.max_num_events_blt.name
                ));
            }
            if reg.ch_trigger_threshold.count_set() > 0 {
                self.log.warn(format_args!(
                    "'{}' does not apply to DPP firmware and will not be programmed",
                    reg.ch_trigger_threshold.name
                ));
            }
        }
        if !self.handle.is_751_family() && reg.des_mode.value.is_some() {
            self.log.warn(format_args!(
                "'{}' only applies to the x751 family and will not be programmed for model {}",
                reg.des_mode.name,
                self.handle.model_name()
            ));
        }
    }

    /// Moves the register settings between the in-memory fields and the
    /// hardware, honoring the model and firmware of the connected board.
    fn program(&mut self, direction: Direction) {
        let Some(reg) = self.reg.as_mut() else { return };
        let dev = &mut self.handle;
        let log = &self.log;
        let grouped = dev.groups() > 1;
        let group_size = dev.group_size();

        // data readout; DPP firmware uses event aggregation instead
        if !dev.has_dpp_fw() {
            program_value(
                dev,
                log,
                reg.max_num_events_blt.name,
                D::set_max_num_events_blt,
                D::max_num_events_blt,
                &mut reg.max_num_events_blt.value,
                direction,
            );
        }

        // trigger
        program_value(
            dev,
            log,
            reg.sw_trigger_mode.name,
            D::set_sw_trigger_mode,
            D::sw_trigger_mode,
            &mut reg.sw_trigger_mode.value,
            direction,
        );
        program_value(
            dev,
            log,
            reg.external_trigger_mode.name,
            D::set_external_trigger_mode,
            D::external_trigger_mode,
            &mut reg.external_trigger_mode.value,
            direction,
        );
        program_value(
            dev,
            log,
            reg.io_level.name,
            D::set_io_level,
            D::io_level,
            &mut reg.io_level.value,
            direction,
        );
        program_value(
            dev,
            log,
            reg.run_sync_mode.name,
            D::set_run_sync_mode,
            D::run_sync_mode,
            &mut reg.run_sync_mode.value,
            direction,
        );
        program_value(
            dev,
            log,
            reg.out_signal_mode.name,
            D::set_output_signal_mode,
            D::output_signal_mode,
            &mut reg.out_signal_mode.value,
            direction,
        );
        if !dev.has_dpp_fw() {
            program_loop(
                dev,
                log,
                D::set_trigger_polarity,
                D::trigger_polarity,
                &mut reg.ch_trigger_polarity,
                group_size,
                direction,
            );
            if grouped {
                program_loop(
                    dev,
                    log,
                    D::set_group_trigger_threshold,
                    D::group_trigger_threshold,
                    &mut reg.ch_trigger_threshold,
                    group_size,
                    direction,
                );
            } else {
                program_loop(
                    dev,
                    log,
                    D::set_channel_trigger_threshold,
                    D::channel_trigger_threshold,
                    &mut reg.ch_trigger_threshold,
                    1,
                    direction,
                );
            }
        }
        if grouped {
            program_loop(
                dev,
                log,
                D::set_group_self_trigger,
                D::group_self_trigger,
                &mut reg.ch_self_trigger,
                group_size,
                direction,
            );
        } else {
            program_loop(
                dev,
                log,
                D::set_channel_self_trigger,
                D::channel_self_trigger,
                &mut reg.ch_self_trigger,
                1,
                direction,
            );
        }

        // acquisition; the record length must be programmed before the
        // post-trigger size
        program_value(
            dev,
            log,
            reg.acquisition_mode.name,
            D::set_acquisition_mode,
            D::acquisition_mode,
            &mut reg.acquisition_mode.value,
            direction,
        );
        program_value(
            dev,
            log,
            reg.record_length.name,
            D::set_record_length,
            D::record_length,
            &mut reg.record_length.value,
            direction,
        );
        program_value(
            dev,
            log,
            reg.post_trigger_size.name,
            D::set_post_trigger_size,
            D::post_trigger_size,
            &mut reg.post_trigger_size.value,
            direction,
        );
        if grouped {
            program_mask(
                dev,
                log,
                D::set_group_enable_mask,
                D::group_enable_mask,
                &mut reg.ch_enable,
                group_size,
                direction,
            );
            program_loop(
                dev,
                log,
                D::set_group_dc_offset,
                D::group_dc_offset,
                &mut reg.ch_dc_offset,
                group_size,
                direction,
            );
        } else {
            program_mask(
                dev,
                log,
                D::set_channel_enable_mask,
                D::channel_enable_mask,
                &mut reg.ch_enable,
                1,
                direction,
            );
            program_loop(
                dev,
                log,
                D::set_channel_dc_offset,
                D::channel_dc_offset,
                &mut reg.ch_dc_offset,
                1,
                direction,
            );
        }

        if dev.is_751_family() {
            program_value(
                dev,
                log,
                reg.des_mode.name,
                D::set_des_mode,
                D::des_mode,
                &mut reg.des_mode.value,
                direction,
            );
        }

        // DPP settings are addressed channel by channel even on grouped
        // boards, so the loops below never fold groups
        if dev.has_dpp_fw() {
            if dev.is_dpp_ci_fw() {
                // this firmware holds a single board-wide pre-trigger
                let nchannels = reg.dpp_pre_trigger_size.len();
                if !all_values_same(&reg.dpp_pre_trigger_size.values, 0, nchannels) {
                    log.warn(format_args!(
                        "firmware only supports one common pre-trigger but '{}' is not set to the same value for all channels; applying the first channel's value to all",
                        reg.dpp_pre_trigger_size.name
                    ));
                }
                let mut common = reg.dpp_pre_trigger_size.values.first().copied().flatten();
                program_value(
                    dev,
                    log,
                    reg.dpp_pre_trigger_size.name,
                    D::set_dpp_pre_trigger_all,
                    |dev| dev.dpp_pre_trigger_size(0),
                    &mut common,
                    direction,
                );
                reg.dpp_pre_trigger_size.values.fill(common);
            } else {
                program_loop(
                    dev,
                    log,
                    D::set_dpp_pre_trigger_size,
                    D::dpp_pre_trigger_size,
                    &mut reg.dpp_pre_trigger_size,
                    1,
                    direction,
                );
            }
            program_loop(
                dev,
                log,
                D::set_channel_pulse_polarity,
                D::channel_pulse_polarity,
                &mut reg.dpp_ch_pulse_polarity,
                1,
                direction,
            );
            program_pair(
                dev,
                log,
                reg.dpp_acq_mode.name,
                D::set_dpp_acquisition_mode,
                D::dpp_acquisition_mode,
                &mut reg.dpp_acq_mode.value,
                &mut reg.dpp_acq_mode_param.value,
                direction,
            );
            program_value(
                dev,
                log,
                reg.dpp_trigger_mode.name,
                D::set_dpp_trigger_mode,
                D::dpp_trigger_mode,
                &mut reg.dpp_trigger_mode.value,
                direction,
            );
        }

        // raw register writes come last so they can override anything the
        // typed settings programmed
        if direction == Direction::Writing {
            for &(address, value) in &reg.register_values {
                if let Err(err) = dev.write_register(address, value) {
                    log.error(format_args!(
                        "communication with digitizer {} (serial {}) failed: writing register {address:#x} with value {value:#x}: {err}",
                        dev.model_name(),
                        dev.serial_number()
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{DppAcqMode, DppSaveParam, TriggerMode};
    use crate::mock::MockDigitizer;
    use crate::tree::ConfigTree;

    fn tree(ini: &str) -> ConfigTree {
        ConfigTree::from_ini_str(ini).unwrap()
    }

    #[test]
    fn test_connect_configure_retrieve() {
        let mut tree = tree(
            "[digi1]\n\
             LinkType = USB\n\
             LinkNum = 0\n\
             RecordLength = 2048\n\
             SWTriggerMode = TRGMODE_ACQ_ONLY\n\
             EnableChannel[0-3] = 1\n\
             DCOffset[0-7] = 28672\n",
        );
        let section = tree.section_mut("digi1").unwrap();
        let mut digi: Digitizer<MockDigitizer> = Digitizer::connect("digi1", section).unwrap();
        digi.configure(section).unwrap();
        assert!(section.is_empty());

        let effective = digi.retrieve_config().unwrap();
        assert_eq!(effective.get("LinkType"), Some("USB"));
        assert_eq!(effective.get("RecordLength"), Some("2048"));
        assert_eq!(effective.get("SWTriggerMode"), Some("TRGMODE_ACQ_ONLY"));
        assert_eq!(effective.get("EnableChannel[0]"), Some("1"));
        assert_eq!(effective.get("EnableChannel[4]"), Some("0"));
        // read-back reports everything the hardware holds, set or not
        assert_eq!(effective.get("PostTriggerSize"), Some("50"));
    }

    #[test]
    fn test_connect_fails_without_link_type() {
        let mut tree = tree("[digi1]\nLinkNum = 0\n");
        let section = tree.section_mut("digi1").unwrap();
        let result: Result<Digitizer<MockDigitizer>> = Digitizer::connect("digi1", section);
        assert!(matches!(result, Err(ConfigError::MissingSetting { .. })));
    }

    #[test]
    fn test_connect_reports_open_failure() {
        let mut tree = tree("[digi1]\nLinkType = OpticalLink\nLinkNum = 0\n");
        let section = tree.section_mut("digi1").unwrap();
        let result: Result<Digitizer<MockDigitizer>> = Digitizer::connect("digi1", section);
        assert!(matches!(result, Err(ConfigError::Connection { .. })));
    }

    #[test]
    fn test_configure_twice_is_an_error() {
        let mut tree = tree("[digi1]\nLinkType = USB\nLinkNum = 0\n");
        let section = tree.section_mut("digi1").unwrap();
        let mut digi: Digitizer<MockDigitizer> = Digitizer::connect("digi1", section).unwrap();
        digi.configure(section).unwrap();
        assert!(matches!(
            digi.configure(section),
            Err(ConfigError::AlreadyConfigured(_))
        ));
    }

    #[test]
    fn test_retrieve_before_configure_is_an_error() {
        let mut tree = tree("[digi1]\nLinkType = USB\nLinkNum = 0\n");
        let section = tree.section_mut("digi1").unwrap();
        let mut digi: Digitizer<MockDigitizer> = Digitizer::connect("digi1", section).unwrap();
        assert!(matches!(
            digi.retrieve_config(),
            Err(ConfigError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_grouped_board_folds_channels() {
        let mut section = Section::new("digi1");
        section.put("EnableChannel[0-1]", "1");
        section.put("EnableChannel[2-3]", "0");
        section.put("DCOffset[0-3]", "28672");
        let mut digi = Digitizer::from_handle("digi1", MockDigitizer::new(4, 2));
        digi.configure(&mut section).unwrap();
        assert_eq!(digi.handle().clone().group_enable_mask().unwrap(), 0b01);
        assert_eq!(digi.handle().clone().group_dc_offset(0).unwrap(), 28672);

        // read-back expands the group mask to the channel vector again
        let effective = digi.retrieve_config().unwrap();
        assert_eq!(effective.get("EnableChannel[0]"), Some("1"));
        assert_eq!(effective.get("EnableChannel[1]"), Some("1"));
        assert_eq!(effective.get("EnableChannel[2]"), Some("0"));
        assert_eq!(effective.get("EnableChannel[3]"), Some("0"));
        assert_eq!(effective.get("DCOffset[3]"), Some("28672"));
    }

    #[test]
    fn test_failed_setting_lost_others_programmed() {
        let mut section = Section::new("digi1");
        section.put("RecordLength", "2048");
        section.put("PostTriggerSize", "40");
        let handle = MockDigitizer::new(8, 1).fail_on("record_length");
        let mut digi = Digitizer::from_handle("digi1", handle);
        digi.configure(&mut section).unwrap();
        let reg = digi.register_settings().unwrap();
        assert_eq!(reg.record_length.value, None);
        assert_eq!(reg.post_trigger_size.value, Some(40));
        assert_eq!(digi.handle().clone().post_trigger_size().unwrap(), 40);
    }

    #[test]
    fn test_dpp_ci_common_pre_trigger() {
        let mut section = Section::new("digi1");
        section.put("DPPPreTriggerSize[0]", "128");
        section.put("DPPPreTriggerSize[1]", "256");
        let handle = MockDigitizer::new(4, 1).with_dpp_ci();
        let mut digi = Digitizer::from_handle("digi1", handle);
        digi.configure(&mut section).unwrap();
        let reg = digi.register_settings().unwrap();
        // first channel's value applied board-wide
        assert_eq!(reg.dpp_pre_trigger_size.values, vec![Some(128); 4]);
        let mut dg = digi.handle().clone();
        for ch in 0..4 {
            assert_eq!(dg.dpp_pre_trigger_size(ch).unwrap(), 128);
        }
    }

    #[test]
    fn test_dpp_pair_and_trigger_mode() {
        let mut section = Section::new("digi1");
        section.put("DPPAcquisitionMode", "DPP_ACQ_MODE_Mixed");
        section.put("DPPSaveParam", "DPP_SAVE_PARAM_EnergyAndTime");
        section.put("DPPTriggerMode", "DPP_TriggerMode_Normal");
        let handle = MockDigitizer::new(4, 1).with_dpp();
        let mut digi = Digitizer::from_handle("digi1", handle);
        digi.configure(&mut section).unwrap();
        let mut dg = digi.handle().clone();
        assert_eq!(
            dg.dpp_acquisition_mode().unwrap(),
            (DppAcqMode::Mixed, DppSaveParam::EnergyAndTime)
        );
    }

    #[test]
    fn test_dpp_skips_standard_only_settings() {
        let mut section = Section::new("digi1");
        section.put("MaxNumEventsBLT", "1023");
        section.put("TriggerThreshold[0-3]", "100");
        let handle = MockDigitizer::new(4, 1).with_dpp();
        let mut digi = Digitizer::from_handle("digi1", handle);
        digi.configure(&mut section).unwrap();
        let mut dg = digi.handle().clone();
        // power-on defaults untouched
        assert_eq!(dg.max_num_events_blt().unwrap(), 1);
        assert_eq!(dg.channel_trigger_threshold(0).unwrap(), 0);
    }

    #[test]
    fn test_register_values_written_last() {
        let mut section = Section::new("digi1");
        section.put("Register0x8120", "0xff");
        section.put("Register0x810C", "64");
        let mut digi = Digitizer::from_handle("digi1", MockDigitizer::new(8, 1));
        digi.configure(&mut section).unwrap();
        assert_eq!(
            digi.handle().registers,
            vec![(0x8120, 0xff), (0x810c, 64)]
        );
    }

    #[test]
    fn test_self_trigger_modes_programmed() {
        let mut section = Section::new("digi1");
        section.put("SelfTriggerMode[0-7]", "TRGMODE_ACQ_ONLY");
        let mut digi = Digitizer::from_handle("digi1", MockDigitizer::new(8, 1));
        digi.configure(&mut section).unwrap();
        let mut dg = digi.handle().clone();
        assert_eq!(
            dg.channel_self_trigger(5).unwrap(),
            TriggerMode::AcqOnly
        );
    }
}
