//! The generic device programming engine.
//!
//! Each function takes a getter/setter pair of one [`DigitizerHandle`]
//! register and moves an optional field through it in either
//! [`Direction`]: writing sends the value only when the field is set
//! (an absent field keeps the hardware default), reading always fetches
//! the value into the field.
//!
//! A failing hardware access never aborts the pass. The failure is logged
//! with the setting name and, when writing, the attempted value, and the
//! affected field is reset to absent so a later read-back does not report
//! a value the hardware never accepted. At most that one setting is lost.
//!
//! The vector variants fold per-channel values into the group-addressed
//! registers of grouped boards; `group_size` is the number of channels
//! sharing one group register or mask bit (1 on ungrouped boards, see
//! [`DigitizerHandle::group_size`]).

use std::fmt;

use crate::device::{DigitizerHandle, HwResult};
use crate::error::HardwareError;
use crate::fields::{Direction, OptVector};
use crate::logging::ChannelLog;
use crate::mask::{mask_to_vec, vec_to_mask};
use crate::optvec::all_values_same;

fn report_failure<D: DigitizerHandle>(
    dev: &D,
    log: &ChannelLog,
    name: &str,
    attempted: Option<&dyn fmt::Debug>,
    err: &HardwareError,
) {
    match attempted {
        Some(value) => log.error(format_args!(
            "communication with digitizer {} (serial {}) failed: programming '{name}' with value {value:?}: {err}",
            dev.model_name(),
            dev.serial_number()
        )),
        None => log.error(format_args!(
            "communication with digitizer {} (serial {}) failed: reading '{name}': {err}",
            dev.model_name(),
            dev.serial_number()
        )),
    }
}

/// Programs one scalar register through a getter/setter pair.
pub fn program_value<D, T, W, R>(
    dev: &mut D,
    log: &ChannelLog,
    name: &str,
    write: W,
    read: R,
    field: &mut Option<T>,
    direction: Direction,
) where
    D: DigitizerHandle,
    T: Copy + fmt::Debug,
    W: Fn(&mut D, T) -> HwResult<()>,
    R: Fn(&mut D) -> HwResult<T>,
{
    match direction {
        Direction::Writing => {
            let Some(value) = *field else { return };
            if let Err(err) = write(dev, value) {
                report_failure(dev, log, name, Some(&value), &err);
                *field = None;
            }
        }
        Direction::Reading => match read(dev) {
            Ok(value) => *field = Some(value),
            Err(err) => {
                report_failure(dev, log, name, None, &err);
                *field = None;
            }
        },
    }
}

/// Programs one channel- or group-addressed register through a
/// getter/setter pair taking an index.
pub fn program_indexed<D, T, W, R>(
    dev: &mut D,
    log: &ChannelLog,
    name: &str,
    write: W,
    read: R,
    index: u32,
    field: &mut Option<T>,
    direction: Direction,
) where
    D: DigitizerHandle,
    T: Copy + fmt::Debug,
    W: Fn(&mut D, u32, T) -> HwResult<()>,
    R: Fn(&mut D, u32) -> HwResult<T>,
{
    program_value(
        dev,
        log,
        name,
        |dev, value| write(dev, index, value),
        |dev| read(dev, index),
        field,
        direction,
    );
}

/// Programs two correlated registers that the hardware only accepts
/// together. Writing requires both fields to be set; a failure resets
/// both.
pub fn program_pair<D, A, B, W, R>(
    dev: &mut D,
    log: &ChannelLog,
    name: &str,
    write: W,
    read: R,
    first: &mut Option<A>,
    second: &mut Option<B>,
    direction: Direction,
) where
    D: DigitizerHandle,
    A: Copy + fmt::Debug,
    B: Copy + fmt::Debug,
    W: Fn(&mut D, A, B) -> HwResult<()>,
    R: Fn(&mut D) -> HwResult<(A, B)>,
{
    match direction {
        Direction::Writing => {
            let (Some(a), Some(b)) = (*first, *second) else {
                return;
            };
            if let Err(err) = write(dev, a, b) {
                report_failure(dev, log, name, Some(&(a, b)), &err);
                *first = None;
                *second = None;
            }
        }
        Direction::Reading => match read(dev) {
            Ok((a, b)) => {
                *first = Some(a);
                *second = Some(b);
            }
            Err(err) => {
                report_failure(dev, log, name, None, &err);
                *first = None;
                *second = None;
            }
        },
    }
}

/// Programs a per-channel boolean vector through a single mask register.
///
/// Writing folds the vector into a mask with one bit per `group_size`
/// channels and warns when the fold is lossy (channels within one group
/// differ); a fully unset vector keeps the hardware default. Reading
/// expands the mask back into the vector.
pub fn program_mask<D, W, R>(
    dev: &mut D,
    log: &ChannelLog,
    write: W,
    read: R,
    field: &mut OptVector<bool>,
    group_size: u32,
    direction: Direction,
) where
    D: DigitizerHandle,
    W: Fn(&mut D, u32) -> HwResult<()>,
    R: Fn(&mut D) -> HwResult<u32>,
{
    let mut mask = None;
    if direction == Direction::Writing {
        if field.count_set() == 0 {
            return;
        }
        let folded = vec_to_mask(&field.values, group_size, 1);
        if group_size > 1
            && vec_to_mask(&field.values, 1, group_size) != vec_to_mask(&field.values, 1, 1)
        {
            log.warn(format_args!(
                "channel mask for '{}' cannot be exactly mapped to the groups of digitizer {}; using group mask {folded:#x} instead",
                field.name,
                dev.model_name()
            ));
        }
        mask = Some(folded);
    }
    program_value(dev, log, field.name, write, read, &mut mask, direction);
    if direction == Direction::Reading {
        mask_to_vec(mask, &mut field.values, group_size);
    }
}

/// Programs a per-channel vector through an indexed getter/setter pair,
/// folding channels into groups on grouped boards.
///
/// One register access per group: writing skips unset channels and warns
/// per group whose channels disagree; reading fetches one representative
/// per group and broadcasts the value to the whole group.
pub fn program_loop<D, T, W, R>(
    dev: &mut D,
    log: &ChannelLog,
    write: W,
    read: R,
    field: &mut OptVector<T>,
    group_size: u32,
    direction: Direction,
) where
    D: DigitizerHandle,
    T: Copy + PartialEq + fmt::Debug,
    W: Fn(&mut D, u32, T) -> HwResult<()>,
    R: Fn(&mut D, u32) -> HwResult<T>,
{
    let size = group_size.max(1) as usize;
    let nchannels = field.values.len();
    if size > 1 {
        for group in 0..nchannels.div_ceil(size) {
            let (start, stop) = (group * size, (group + 1) * size);
            if !all_values_same(&field.values, start, stop) {
                log.warn(format_args!(
                    "channels {start} to {stop} for '{}' are set to different values and cannot be consistently mapped to the groups of digitizer {}",
                    field.name,
                    dev.model_name()
                ));
            }
        }
    }
    for channel in 0..nchannels {
        match direction {
            // leave the hardware default for unset channels
            Direction::Writing if field.values[channel].is_none() => continue,
            // one read per group, at its first channel
            Direction::Reading if channel % size != 0 => continue,
            _ => {}
        }
        let index = (channel / size) as u32;
        let mut slot = field.values[channel];
        program_indexed(
            dev, log, field.name, &write, &read, index, &mut slot, direction,
        );
        field.values[channel] = slot;
        if direction == Direction::Reading && size > 1 {
            for i in channel..(channel + size).min(nchannels) {
                field.values[i] = slot;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DigitizerHandle;
    use crate::logging::{channel, ChannelLog};
    use crate::mock::MockDigitizer;

    fn test_log() -> ChannelLog {
        ChannelLog::new("digi1", channel::DIG)
    }

    #[test]
    fn test_program_value_writes_set_field() {
        let mut dg = MockDigitizer::new(8, 1);
        let log = test_log();
        let mut field = Some(2048);
        program_value(
            &mut dg,
            &log,
            "RecordLength",
            MockDigitizer::set_record_length,
            MockDigitizer::record_length,
            &mut field,
            Direction::Writing,
        );
        assert_eq!(field, Some(2048));
        assert_eq!(dg.record_length().unwrap(), 2048);
    }

    #[test]
    fn test_program_value_skips_unset_field() {
        let mut dg = MockDigitizer::new(8, 1);
        let log = test_log();
        let mut field: Option<u32> = None;
        program_value(
            &mut dg,
            &log,
            "RecordLength",
            MockDigitizer::set_record_length,
            MockDigitizer::record_length,
            &mut field,
            Direction::Writing,
        );
        // hardware default untouched
        assert_eq!(dg.record_length().unwrap(), 1024);
    }

    #[test]
    fn test_program_value_reads_back() {
        let mut dg = MockDigitizer::new(8, 1);
        let log = test_log();
        let mut field: Option<u32> = None;
        program_value(
            &mut dg,
            &log,
            "RecordLength",
            MockDigitizer::set_record_length,
            MockDigitizer::record_length,
            &mut field,
            Direction::Reading,
        );
        assert_eq!(field, Some(1024));
    }

    #[test]
    fn test_failed_write_resets_field_and_continues() {
        let mut dg = MockDigitizer::new(8, 1).fail_on("record_length");
        let log = test_log();
        let mut record_length = Some(2048);
        let mut post_trigger = Some(40);
        program_value(
            &mut dg,
            &log,
            "RecordLength",
            MockDigitizer::set_record_length,
            MockDigitizer::record_length,
            &mut record_length,
            Direction::Writing,
        );
        program_value(
            &mut dg,
            &log,
            "PostTriggerSize",
            MockDigitizer::set_post_trigger_size,
            MockDigitizer::post_trigger_size,
            &mut post_trigger,
            Direction::Writing,
        );
        // only the failing setting is lost
        assert_eq!(record_length, None);
        assert_eq!(post_trigger, Some(40));
        assert_eq!(dg.post_trigger_size().unwrap(), 40);
    }

    #[test]
    fn test_program_pair_requires_both_values() {
        let mut dg = MockDigitizer::new(8, 1).with_dpp();
        let log = test_log();
        let mut mode = Some(crate::enums::DppAcqMode::Mixed);
        let mut param: Option<crate::enums::DppSaveParam> = None;
        program_pair(
            &mut dg,
            &log,
            "DPPAcquisitionMode",
            MockDigitizer::set_dpp_acquisition_mode,
            MockDigitizer::dpp_acquisition_mode,
            &mut mode,
            &mut param,
            Direction::Writing,
        );
        // nothing written: the power-on default remains
        assert_eq!(
            dg.dpp_acquisition_mode().unwrap(),
            (
                crate::enums::DppAcqMode::List,
                crate::enums::DppSaveParam::EnergyAndTime
            )
        );
    }

    #[test]
    fn test_program_mask_ungrouped() {
        let mut dg = MockDigitizer::new(4, 1);
        let log = test_log();
        let mut field = OptVector::new("EnableChannel", 4);
        field.values = vec![Some(true), Some(false), Some(true), None];
        program_mask(
            &mut dg,
            &log,
            MockDigitizer::set_channel_enable_mask,
            MockDigitizer::channel_enable_mask,
            &mut field,
            1,
            Direction::Writing,
        );
        assert_eq!(dg.channel_enable_mask().unwrap(), 0b0101);

        let mut read_back = OptVector::new("EnableChannel", 4);
        program_mask(
            &mut dg,
            &log,
            MockDigitizer::set_channel_enable_mask,
            MockDigitizer::channel_enable_mask,
            &mut read_back,
            1,
            Direction::Reading,
        );
        assert_eq!(
            read_back.values,
            vec![Some(true), Some(false), Some(true), Some(false)]
        );
    }

    #[test]
    fn test_program_mask_folds_groups() {
        let mut dg = MockDigitizer::new(4, 2);
        let log = test_log();
        let mut field = OptVector::new("EnableChannel", 4);
        field.values = vec![Some(true), Some(true), Some(false), Some(false)];
        let group_size = dg.group_size();
        program_mask(
            &mut dg,
            &log,
            MockDigitizer::set_group_enable_mask,
            MockDigitizer::group_enable_mask,
            &mut field,
            group_size,
            Direction::Writing,
        );
        assert_eq!(dg.group_enable_mask().unwrap(), 0b01);
    }

    #[test]
    fn test_program_mask_wide_board_high_channel() {
        // 64 channels in 8 groups: the lossless reference mask cannot
        // represent channels past bit 31, but folding and programming
        // must still go through
        let mut dg = MockDigitizer::new(64, 8);
        let log = test_log();
        let mut field = OptVector::new("EnableChannel", 64);
        field.values[32] = Some(true);
        let group_size = dg.group_size();
        program_mask(
            &mut dg,
            &log,
            MockDigitizer::set_group_enable_mask,
            MockDigitizer::group_enable_mask,
            &mut field,
            group_size,
            Direction::Writing,
        );
        assert_eq!(dg.group_enable_mask().unwrap(), 1 << 4);
    }

    #[test]
    fn test_program_mask_all_unset_keeps_default() {
        let mut dg = MockDigitizer::new(4, 1);
        dg.set_channel_enable_mask(0b1111).unwrap();
        let log = test_log();
        let mut field: OptVector<bool> = OptVector::new("EnableChannel", 4);
        program_mask(
            &mut dg,
            &log,
            MockDigitizer::set_channel_enable_mask,
            MockDigitizer::channel_enable_mask,
            &mut field,
            1,
            Direction::Writing,
        );
        assert_eq!(dg.channel_enable_mask().unwrap(), 0b1111);
    }

    #[test]
    fn test_program_loop_writes_only_set_channels() {
        let mut dg = MockDigitizer::new(4, 1);
        let log = test_log();
        let mut field = OptVector::new("DCOffset", 4);
        field.values = vec![Some(0x7000), None, Some(0x9000), None];
        program_loop(
            &mut dg,
            &log,
            MockDigitizer::set_channel_dc_offset,
            MockDigitizer::channel_dc_offset,
            &mut field,
            1,
            Direction::Writing,
        );
        assert_eq!(dg.channel_dc_offset(0).unwrap(), 0x7000);
        assert_eq!(dg.channel_dc_offset(1).unwrap(), 0x8000);
        assert_eq!(dg.channel_dc_offset(2).unwrap(), 0x9000);
    }

    #[test]
    fn test_program_loop_reads_once_per_group_and_broadcasts() {
        let mut dg = MockDigitizer::new(4, 2);
        dg.set_group_dc_offset(0, 0x7000).unwrap();
        dg.set_group_dc_offset(1, 0x9000).unwrap();
        let log = test_log();
        let mut field: OptVector<u32> = OptVector::new("DCOffset", 4);
        let group_size = dg.group_size();
        program_loop(
            &mut dg,
            &log,
            MockDigitizer::set_group_dc_offset,
            MockDigitizer::group_dc_offset,
            &mut field,
            group_size,
            Direction::Reading,
        );
        assert_eq!(
            field.values,
            vec![Some(0x7000), Some(0x7000), Some(0x9000), Some(0x9000)]
        );
    }

    #[test]
    fn test_program_loop_failure_isolated_per_channel() {
        let mut dg = MockDigitizer::new(4, 1).fail_on("dc_offset");
        let log = test_log();
        let mut field = OptVector::new("DCOffset", 4);
        field.values = vec![Some(0x7000); 4];
        program_loop(
            &mut dg,
            &log,
            MockDigitizer::set_channel_dc_offset,
            MockDigitizer::channel_dc_offset,
            &mut field,
            1,
            Direction::Writing,
        );
        assert_eq!(field.values, vec![None; 4]);
    }
}
