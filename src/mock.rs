//! An in-memory digitizer for tests and dry runs.
//!
//! [`MockDigitizer`] keeps every register as a plain field, starts from
//! realistic power-on defaults and records raw register writes. Individual
//! accessors can be made to fail with [`fail_on`](MockDigitizer::fail_on)
//! to exercise the per-setting failure isolation of the programming
//! engine.

use std::collections::HashSet;

use crate::device::{DigitizerHandle, HwResult};
use crate::enums::{
    AcquisitionMode, ConnectionType, DppAcqMode, DppSaveParam, DppTriggerMode, EnableMode,
    IoLevel, OutputSignalMode, PulsePolarity, RunSyncMode, TriggerMode, TriggerPolarity,
};
use crate::error::HardwareError;
use crate::settings::LinkParams;

/// A digitizer whose registers live in memory.
#[derive(Debug, Clone)]
pub struct MockDigitizer {
    model: String,
    serial: u32,
    nchannels: u32,
    ngroups: u32,
    adc_bits: u32,
    dpp_fw: bool,
    dpp_ci_fw: bool,
    family_751: bool,
    failing: HashSet<&'static str>,

    max_num_events_blt: u32,
    sw_trigger_mode: TriggerMode,
    external_trigger_mode: TriggerMode,
    io_level: IoLevel,
    run_sync_mode: RunSyncMode,
    output_signal_mode: OutputSignalMode,
    trigger_polarity: Vec<TriggerPolarity>,
    trigger_threshold: Vec<u32>,
    self_trigger: Vec<TriggerMode>,
    acquisition_mode: AcquisitionMode,
    record_length: u32,
    post_trigger_size: u32,
    enable_mask: u32,
    dc_offset: Vec<u32>,
    des_mode: EnableMode,
    dpp_pre_trigger: Vec<u32>,
    pulse_polarity: Vec<PulsePolarity>,
    dpp_acq_mode: (DppAcqMode, DppSaveParam),
    dpp_trigger_mode: DppTriggerMode,
    /// Raw register writes in the order they were issued.
    pub registers: Vec<(u32, u32)>,
}

impl MockDigitizer {
    /// Creates a board with `nchannels` channels in `ngroups` groups and
    /// power-on register defaults.
    pub fn new(nchannels: u32, ngroups: u32) -> Self {
        let n = nchannels as usize;
        Self {
            model: "V1730".to_string(),
            serial: 12345,
            nchannels,
            ngroups,
            adc_bits: 14,
            dpp_fw: false,
            dpp_ci_fw: false,
            family_751: false,
            failing: HashSet::new(),
            max_num_events_blt: 1,
            sw_trigger_mode: TriggerMode::Disabled,
            external_trigger_mode: TriggerMode::AcqOnly,
            io_level: IoLevel::Nim,
            run_sync_mode: RunSyncMode::Disabled,
            output_signal_mode: OutputSignalMode::Trigger,
            trigger_polarity: vec![TriggerPolarity::OnRisingEdge; n],
            trigger_threshold: vec![0; n],
            self_trigger: vec![TriggerMode::Disabled; n],
            acquisition_mode: AcquisitionMode::SwControlled,
            record_length: 1024,
            post_trigger_size: 50,
            enable_mask: 0,
            dc_offset: vec![0x8000; n],
            des_mode: EnableMode::Disable,
            dpp_pre_trigger: vec![0; n],
            pulse_polarity: vec![PulsePolarity::Positive; n],
            dpp_acq_mode: (DppAcqMode::List, DppSaveParam::EnergyAndTime),
            dpp_trigger_mode: DppTriggerMode::Normal,
            registers: Vec::new(),
        }
    }

    /// Sets the reported model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Reports the board as running DPP firmware.
    pub fn with_dpp(mut self) -> Self {
        self.dpp_fw = true;
        self
    }

    /// Reports the board as running DPP-CI firmware (implies DPP).
    pub fn with_dpp_ci(mut self) -> Self {
        self.dpp_fw = true;
        self.dpp_ci_fw = true;
        self
    }

    /// Reports the board as part of the x751 family.
    pub fn with_751(mut self) -> Self {
        self.family_751 = true;
        self
    }

    /// Makes every accessor for the named register fail. The name matches
    /// the getter, e.g. `"record_length"` fails both `record_length` and
    /// `set_record_length`.
    pub fn fail_on(mut self, name: &'static str) -> Self {
        self.failing.insert(name);
        self
    }

    fn access(&self, name: &'static str) -> HwResult<()> {
        if self.failing.contains(name) {
            Err(HardwareError::new(name, "communication error"))
        } else {
            Ok(())
        }
    }

    fn channel_index(&self, channel: u32, name: &'static str) -> HwResult<usize> {
        if channel < self.nchannels {
            Ok(channel as usize)
        } else {
            Err(HardwareError::new(name, format!("invalid channel {channel}")))
        }
    }
}

impl DigitizerHandle for MockDigitizer {
    fn open(params: &LinkParams) -> HwResult<Self> {
        match params.link_type {
            ConnectionType::Usb | ConnectionType::UsbA4818 => Ok(Self::new(8, 1)),
            ConnectionType::OpticalLink => {
                Err(HardwareError::new("open", "no optical controller present"))
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn serial_number(&self) -> u32 {
        self.serial
    }

    fn channels(&self) -> u32 {
        self.nchannels
    }

    fn groups(&self) -> u32 {
        self.ngroups
    }

    fn adc_bits(&self) -> u32 {
        self.adc_bits
    }

    fn roc_firmware(&self) -> &str {
        "4.18"
    }

    fn amc_firmware(&self) -> &str {
        if self.dpp_ci_fw {
            "130.02"
        } else if self.dpp_fw {
            "136.02"
        } else {
            "4.17"
        }
    }

    fn has_dpp_fw(&self) -> bool {
        self.dpp_fw
    }

    fn is_dpp_ci_fw(&self) -> bool {
        self.dpp_ci_fw
    }

    fn is_751_family(&self) -> bool {
        self.family_751
    }

    fn set_max_num_events_blt(&mut self, value: u32) -> HwResult<()> {
        self.access("max_num_events_blt")?;
        self.max_num_events_blt = value;
        Ok(())
    }

    fn max_num_events_blt(&mut self) -> HwResult<u32> {
        self.access("max_num_events_blt")?;
        Ok(self.max_num_events_blt)
    }

    fn set_sw_trigger_mode(&mut self, mode: TriggerMode) -> HwResult<()> {
        self.access("sw_trigger_mode")?;
        self.sw_trigger_mode = mode;
        Ok(())
    }

    fn sw_trigger_mode(&mut self) -> HwResult<TriggerMode> {
        self.access("sw_trigger_mode")?;
        Ok(self.sw_trigger_mode)
    }

    fn set_external_trigger_mode(&mut self, mode: TriggerMode) -> HwResult<()> {
        self.access("external_trigger_mode")?;
        self.external_trigger_mode = mode;
        Ok(())
    }

    fn external_trigger_mode(&mut self) -> HwResult<TriggerMode> {
        self.access("external_trigger_mode")?;
        Ok(self.external_trigger_mode)
    }

    fn set_io_level(&mut self, level: IoLevel) -> HwResult<()> {
        self.access("io_level")?;
        self.io_level = level;
        Ok(())
    }

    fn io_level(&mut self) -> HwResult<IoLevel> {
        self.access("io_level")?;
        Ok(self.io_level)
    }

    fn set_run_sync_mode(&mut self, mode: RunSyncMode) -> HwResult<()> {
        self.access("run_sync_mode")?;
        self.run_sync_mode = mode;
        Ok(())
    }

    fn run_sync_mode(&mut self) -> HwResult<RunSyncMode> {
        self.access("run_sync_mode")?;
        Ok(self.run_sync_mode)
    }

    fn set_output_signal_mode(&mut self, mode: OutputSignalMode) -> HwResult<()> {
        self.access("output_signal_mode")?;
        self.output_signal_mode = mode;
        Ok(())
    }

    fn output_signal_mode(&mut self) -> HwResult<OutputSignalMode> {
        self.access("output_signal_mode")?;
        Ok(self.output_signal_mode)
    }

    fn set_trigger_polarity(&mut self, channel: u32, polarity: TriggerPolarity) -> HwResult<()> {
        self.access("trigger_polarity")?;
        let i = self.channel_index(channel, "trigger_polarity")?;
        self.trigger_polarity[i] = polarity;
        Ok(())
    }

    fn trigger_polarity(&mut self, channel: u32) -> HwResult<TriggerPolarity> {
        self.access("trigger_polarity")?;
        let i = self.channel_index(channel, "trigger_polarity")?;
        Ok(self.trigger_polarity[i])
    }

    fn set_channel_trigger_threshold(&mut self, channel: u32, value: u32) -> HwResult<()> {
        self.access("trigger_threshold")?;
        let i = self.channel_index(channel, "trigger_threshold")?;
        self.trigger_threshold[i] = value;
        Ok(())
    }

    fn channel_trigger_threshold(&mut self, channel: u32) -> HwResult<u32> {
        self.access("trigger_threshold")?;
        let i = self.channel_index(channel, "trigger_threshold")?;
        Ok(self.trigger_threshold[i])
    }

    fn set_group_trigger_threshold(&mut self, group: u32, value: u32) -> HwResult<()> {
        self.set_channel_trigger_threshold(group * self.group_size(), value)
    }

    fn group_trigger_threshold(&mut self, group: u32) -> HwResult<u32> {
        self.channel_trigger_threshold(group * self.group_size())
    }

    fn set_channel_self_trigger(&mut self, channel: u32, mode: TriggerMode) -> HwResult<()> {
        self.access("self_trigger")?;
        let i = self.channel_index(channel, "self_trigger")?;
        self.self_trigger[i] = mode;
        Ok(())
    }

    fn channel_self_trigger(&mut self, channel: u32) -> HwResult<TriggerMode> {
        self.access("self_trigger")?;
        let i = self.channel_index(channel, "self_trigger")?;
        Ok(self.self_trigger[i])
    }

    fn set_group_self_trigger(&mut self, group: u32, mode: TriggerMode) -> HwResult<()> {
        self.set_channel_self_trigger(group * self.group_size(), mode)
    }

    fn group_self_trigger(&mut self, group: u32) -> HwResult<TriggerMode> {
        self.channel_self_trigger(group * self.group_size())
    }

    fn set_acquisition_mode(&mut self, mode: AcquisitionMode) -> HwResult<()> {
        self.access("acquisition_mode")?;
        self.acquisition_mode = mode;
        Ok(())
    }

    fn acquisition_mode(&mut self) -> HwResult<AcquisitionMode> {
        self.access("acquisition_mode")?;
        Ok(self.acquisition_mode)
    }

    fn set_record_length(&mut self, samples: u32) -> HwResult<()> {
        self.access("record_length")?;
        self.record_length = samples;
        Ok(())
    }

    fn record_length(&mut self) -> HwResult<u32> {
        self.access("record_length")?;
        Ok(self.record_length)
    }

    fn set_post_trigger_size(&mut self, percent: u32) -> HwResult<()> {
        self.access("post_trigger_size")?;
        self.post_trigger_size = percent;
        Ok(())
    }

    fn post_trigger_size(&mut self) -> HwResult<u32> {
        self.access("post_trigger_size")?;
        Ok(self.post_trigger_size)
    }

    fn set_channel_enable_mask(&mut self, mask: u32) -> HwResult<()> {
        self.access("enable_mask")?;
        self.enable_mask = mask;
        Ok(())
    }

    fn channel_enable_mask(&mut self) -> HwResult<u32> {
        self.access("enable_mask")?;
        Ok(self.enable_mask)
    }

    fn set_group_enable_mask(&mut self, mask: u32) -> HwResult<()> {
        self.set_channel_enable_mask(mask)
    }

    fn group_enable_mask(&mut self) -> HwResult<u32> {
        self.channel_enable_mask()
    }

    fn set_channel_dc_offset(&mut self, channel: u32, value: u32) -> HwResult<()> {
        self.access("dc_offset")?;
        let i = self.channel_index(channel, "dc_offset")?;
        self.dc_offset[i] = value;
        Ok(())
    }

    fn channel_dc_offset(&mut self, channel: u32) -> HwResult<u32> {
        self.access("dc_offset")?;
        let i = self.channel_index(channel, "dc_offset")?;
        Ok(self.dc_offset[i])
    }

    fn set_group_dc_offset(&mut self, group: u32, value: u32) -> HwResult<()> {
        self.set_channel_dc_offset(group * self.group_size(), value)
    }

    fn group_dc_offset(&mut self, group: u32) -> HwResult<u32> {
        self.channel_dc_offset(group * self.group_size())
    }

    fn set_des_mode(&mut self, mode: EnableMode) -> HwResult<()> {
        self.access("des_mode")?;
        self.des_mode = mode;
        Ok(())
    }

    fn des_mode(&mut self) -> HwResult<EnableMode> {
        self.access("des_mode")?;
        Ok(self.des_mode)
    }

    fn set_dpp_pre_trigger_size(&mut self, channel: u32, samples: u32) -> HwResult<()> {
        self.access("dpp_pre_trigger_size")?;
        let i = self.channel_index(channel, "dpp_pre_trigger_size")?;
        self.dpp_pre_trigger[i] = samples;
        Ok(())
    }

    fn dpp_pre_trigger_size(&mut self, channel: u32) -> HwResult<u32> {
        self.access("dpp_pre_trigger_size")?;
        let i = self.channel_index(channel, "dpp_pre_trigger_size")?;
        Ok(self.dpp_pre_trigger[i])
    }

    fn set_dpp_pre_trigger_all(&mut self, samples: u32) -> HwResult<()> {
        self.access("dpp_pre_trigger_size")?;
        self.dpp_pre_trigger.fill(samples);
        Ok(())
    }

    fn set_channel_pulse_polarity(
        &mut self,
        channel: u32,
        polarity: PulsePolarity,
    ) -> HwResult<()> {
        self.access("pulse_polarity")?;
        let i = self.channel_index(channel, "pulse_polarity")?;
        self.pulse_polarity[i] = polarity;
        Ok(())
    }

    fn channel_pulse_polarity(&mut self, channel: u32) -> HwResult<PulsePolarity> {
        self.access("pulse_polarity")?;
        let i = self.channel_index(channel, "pulse_polarity")?;
        Ok(self.pulse_polarity[i])
    }

    fn set_dpp_acquisition_mode(&mut self, mode: DppAcqMode, param: DppSaveParam) -> HwResult<()> {
        self.access("dpp_acquisition_mode")?;
        self.dpp_acq_mode = (mode, param);
        Ok(())
    }

    fn dpp_acquisition_mode(&mut self) -> HwResult<(DppAcqMode, DppSaveParam)> {
        self.access("dpp_acquisition_mode")?;
        Ok(self.dpp_acq_mode)
    }

    fn set_dpp_trigger_mode(&mut self, mode: DppTriggerMode) -> HwResult<()> {
        self.access("dpp_trigger_mode")?;
        self.dpp_trigger_mode = mode;
        Ok(())
    }

    fn dpp_trigger_mode(&mut self) -> HwResult<DppTriggerMode> {
        self.access("dpp_trigger_mode")?;
        Ok(self.dpp_trigger_mode)
    }

    fn write_register(&mut self, address: u32, value: u32) -> HwResult<()> {
        self.access("write_register")?;
        self.registers.push((address, value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_by_link_type() {
        let usb = LinkParams {
            link_type: ConnectionType::Usb,
            link_num: 0,
            conet_node: 0,
            vme_base_address: 0,
        };
        assert!(MockDigitizer::open(&usb).is_ok());

        let optical = LinkParams {
            link_type: ConnectionType::OpticalLink,
            ..usb
        };
        assert!(MockDigitizer::open(&optical).is_err());
    }

    #[test]
    fn test_group_accessors_share_channel_storage() {
        let mut dg = MockDigitizer::new(8, 2);
        assert_eq!(dg.group_size(), 4);
        dg.set_group_dc_offset(1, 0x7000).unwrap();
        assert_eq!(dg.channel_dc_offset(4).unwrap(), 0x7000);
        assert_eq!(dg.group_dc_offset(1).unwrap(), 0x7000);
    }

    #[test]
    fn test_fail_on_register() {
        let mut dg = MockDigitizer::new(8, 1).fail_on("record_length");
        assert!(dg.set_record_length(2048).is_err());
        assert!(dg.record_length().is_err());
        assert!(dg.set_post_trigger_size(40).is_ok());
    }

    #[test]
    fn test_pre_trigger_all_broadcasts() {
        let mut dg = MockDigitizer::new(4, 1).with_dpp_ci();
        dg.set_dpp_pre_trigger_all(128).unwrap();
        for ch in 0..4 {
            assert_eq!(dg.dpp_pre_trigger_size(ch).unwrap(), 128);
        }
    }
}
