//! The hardware abstraction seam.
//!
//! [`DigitizerHandle`] is the full surface the programming engine needs
//! from a digitizer: opening the link, the board identity and topology,
//! and one getter/setter pair per programmable register. A production
//! implementation wraps the vendor library; the tests use
//! [`MockDigitizer`](crate::mock::MockDigitizer).
//!
//! Every accessor returns [`HwResult`] so a failing register access can be
//! reported per setting instead of aborting the whole programming pass.
//! Getters take `&mut self` since reading a register is a bus transaction
//! on real hardware.

use crate::enums::{
    AcquisitionMode, DppAcqMode, DppSaveParam, DppTriggerMode, EnableMode, IoLevel,
    OutputSignalMode, PulsePolarity, RunSyncMode, TriggerMode, TriggerPolarity,
};
use crate::error::HardwareError;
use crate::settings::LinkParams;

/// Result of a single hardware access.
pub type HwResult<T> = std::result::Result<T, HardwareError>;

/// Access to one physical digitizer board.
///
/// Topology is fixed per board: `channels()` inputs arranged in `groups()`
/// hardware groups. For an ungrouped board `groups()` equals `channels()`
/// and `channels_per_group()` is 1; settings that the hardware only holds
/// per group are then addressed per channel.
pub trait DigitizerHandle: Sized {
    /// Opens the link described by `params`.
    ///
    /// # Errors
    ///
    /// A [`HardwareError`] when the device cannot be reached.
    fn open(params: &LinkParams) -> HwResult<Self>;

    /// Board model name, e.g. `V1730`.
    fn model_name(&self) -> &str;
    /// Board serial number.
    fn serial_number(&self) -> u32;
    /// Number of input channels.
    fn channels(&self) -> u32;
    /// Number of hardware channel groups.
    fn groups(&self) -> u32;
    /// Channels per hardware group.
    fn channels_per_group(&self) -> u32 {
        self.channels() / self.groups().max(1)
    }
    /// Channels folded into one mask bit or group register: the channels
    /// per group on a grouped board, 1 on an ungrouped board.
    fn group_size(&self) -> u32 {
        if self.groups() > 1 {
            self.channels_per_group()
        } else {
            1
        }
    }
    /// ADC resolution in bits.
    fn adc_bits(&self) -> u32;
    /// ROC FPGA firmware release string.
    fn roc_firmware(&self) -> &str;
    /// AMC FPGA firmware release string.
    fn amc_firmware(&self) -> &str;

    /// True when the board runs DPP firmware.
    fn has_dpp_fw(&self) -> bool;
    /// True when the board runs DPP-CI firmware.
    fn is_dpp_ci_fw(&self) -> bool;
    /// True for boards of the x751 family.
    fn is_751_family(&self) -> bool;

    /// Sets the number of events per block transfer. Standard firmware
    /// only; DPP firmware uses event aggregation instead.
    fn set_max_num_events_blt(&mut self, value: u32) -> HwResult<()>;
    /// Reads the number of events per block transfer.
    fn max_num_events_blt(&mut self) -> HwResult<u32>;

    /// Sets the software trigger mode.
    fn set_sw_trigger_mode(&mut self, mode: TriggerMode) -> HwResult<()>;
    /// Reads the software trigger mode.
    fn sw_trigger_mode(&mut self) -> HwResult<TriggerMode>;

    /// Sets the external trigger mode.
    fn set_external_trigger_mode(&mut self, mode: TriggerMode) -> HwResult<()>;
    /// Reads the external trigger mode.
    fn external_trigger_mode(&mut self) -> HwResult<TriggerMode>;

    /// Sets the front-panel I/O signal level.
    fn set_io_level(&mut self, level: IoLevel) -> HwResult<()>;
    /// Reads the front-panel I/O signal level.
    fn io_level(&mut self) -> HwResult<IoLevel>;

    /// Sets the multi-board run synchronization mode.
    fn set_run_sync_mode(&mut self, mode: RunSyncMode) -> HwResult<()>;
    /// Reads the multi-board run synchronization mode.
    fn run_sync_mode(&mut self) -> HwResult<RunSyncMode>;

    /// Sets the front-panel output signal mode.
    fn set_output_signal_mode(&mut self, mode: OutputSignalMode) -> HwResult<()>;
    /// Reads the front-panel output signal mode.
    fn output_signal_mode(&mut self) -> HwResult<OutputSignalMode>;

    /// Sets the trigger edge polarity of a channel.
    fn set_trigger_polarity(&mut self, channel: u32, polarity: TriggerPolarity) -> HwResult<()>;
    /// Reads the trigger edge polarity of a channel.
    fn trigger_polarity(&mut self, channel: u32) -> HwResult<TriggerPolarity>;

    /// Sets the trigger threshold of a channel.
    fn set_channel_trigger_threshold(&mut self, channel: u32, value: u32) -> HwResult<()>;
    /// Reads the trigger threshold of a channel.
    fn channel_trigger_threshold(&mut self, channel: u32) -> HwResult<u32>;

    /// Sets the trigger threshold of a group.
    fn set_group_trigger_threshold(&mut self, group: u32, value: u32) -> HwResult<()>;
    /// Reads the trigger threshold of a group.
    fn group_trigger_threshold(&mut self, group: u32) -> HwResult<u32>;

    /// Sets the self-trigger mode of a channel.
    fn set_channel_self_trigger(&mut self, channel: u32, mode: TriggerMode) -> HwResult<()>;
    /// Reads the self-trigger mode of a channel.
    fn channel_self_trigger(&mut self, channel: u32) -> HwResult<TriggerMode>;

    /// Sets the self-trigger mode of a group.
    fn set_group_self_trigger(&mut self, group: u32, mode: TriggerMode) -> HwResult<()>;
    /// Reads the self-trigger mode of a group.
    fn group_self_trigger(&mut self, group: u32) -> HwResult<TriggerMode>;

    /// Sets the acquisition start/stop mode.
    fn set_acquisition_mode(&mut self, mode: AcquisitionMode) -> HwResult<()>;
    /// Reads the acquisition start/stop mode.
    fn acquisition_mode(&mut self) -> HwResult<AcquisitionMode>;

    /// Sets the record length in samples.
    fn set_record_length(&mut self, samples: u32) -> HwResult<()>;
    /// Reads the record length in samples.
    fn record_length(&mut self) -> HwResult<u32>;

    /// Sets the post-trigger fraction of the record, in percent.
    fn set_post_trigger_size(&mut self, percent: u32) -> HwResult<()>;
    /// Reads the post-trigger fraction of the record, in percent.
    fn post_trigger_size(&mut self) -> HwResult<u32>;

    /// Sets the channel enable mask, one bit per channel.
    fn set_channel_enable_mask(&mut self, mask: u32) -> HwResult<()>;
    /// Reads the channel enable mask.
    fn channel_enable_mask(&mut self) -> HwResult<u32>;

    /// Sets the group enable mask, one bit per group.
    fn set_group_enable_mask(&mut self, mask: u32) -> HwResult<()>;
    /// Reads the group enable mask.
    fn group_enable_mask(&mut self) -> HwResult<u32>;

    /// Sets the DC offset of a channel.
    fn set_channel_dc_offset(&mut self, channel: u32, value: u32) -> HwResult<()>;
    /// Reads the DC offset of a channel.
    fn channel_dc_offset(&mut self, channel: u32) -> HwResult<u32>;

    /// Sets the DC offset of a group.
    fn set_group_dc_offset(&mut self, group: u32, value: u32) -> HwResult<()>;
    /// Reads the DC offset of a group.
    fn group_dc_offset(&mut self, group: u32) -> HwResult<u32>;

    /// Sets the dual-edge sampling mode. x751 family only.
    fn set_des_mode(&mut self, mode: EnableMode) -> HwResult<()>;
    /// Reads the dual-edge sampling mode.
    fn des_mode(&mut self) -> HwResult<EnableMode>;

    /// Sets the DPP pre-trigger size of a channel, in samples.
    fn set_dpp_pre_trigger_size(&mut self, channel: u32, samples: u32) -> HwResult<()>;
    /// Reads the DPP pre-trigger size of a channel, in samples.
    fn dpp_pre_trigger_size(&mut self, channel: u32) -> HwResult<u32>;
    /// Sets one pre-trigger size common to all channels. Used for DPP-CI
    /// firmware, which holds a single board-wide pre-trigger.
    fn set_dpp_pre_trigger_all(&mut self, samples: u32) -> HwResult<()>;

    /// Sets the DPP input pulse polarity of a channel.
    fn set_channel_pulse_polarity(&mut self, channel: u32, polarity: PulsePolarity)
        -> HwResult<()>;
    /// Reads the DPP input pulse polarity of a channel.
    fn channel_pulse_polarity(&mut self, channel: u32) -> HwResult<PulsePolarity>;

    /// Sets the DPP acquisition mode together with its save-parameter
    /// selection; the hardware only accepts the pair.
    fn set_dpp_acquisition_mode(&mut self, mode: DppAcqMode, param: DppSaveParam) -> HwResult<()>;
    /// Reads the DPP acquisition mode and save-parameter selection.
    fn dpp_acquisition_mode(&mut self) -> HwResult<(DppAcqMode, DppSaveParam)>;

    /// Sets the DPP trigger mode.
    fn set_dpp_trigger_mode(&mut self, mode: DppTriggerMode) -> HwResult<()>;
    /// Reads the DPP trigger mode.
    fn dpp_trigger_mode(&mut self) -> HwResult<DppTriggerMode>;

    /// Writes a raw 32-bit value to a board register address.
    fn write_register(&mut self, address: u32, value: u32) -> HwResult<()>;
}
