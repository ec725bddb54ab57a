//! Parsing and serialization of individual optional settings.
//!
//! Every hardware setting is held as an *optional* value — absent means
//! "not specified in the configuration", in which case the hardware default
//! is left untouched on write. The primitives here move such fields between
//! a [`Section`] of the configuration tree and their typed in-memory form,
//! in either [`Direction`].
//!
//! Reading consumes keys from the section as they parse successfully;
//! a key whose value fails type coercion stays in the section so the
//! unknown-keys diagnostic can point at it. Writing emits a key only for
//! set fields and notes omissions at debug severity.
//!
//! Per-channel settings use the bracketed range syntax handled by
//! [`crate::range`]: a key `DCOffset[0-3,7]` broadcasts its value to the
//! listed channels.

use std::fmt;
use std::str::FromStr;

use crate::enums::{EnumMap, VENDOR_PREFIX};
use crate::logging::ChannelLog;
use crate::range::expand_range;
use crate::tree::Section;

/// Direction of a parse/serialize or program pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Configuration tree (or hardware) into the in-memory fields.
    Reading,
    /// In-memory fields into the configuration tree (or hardware).
    Writing,
}

/// An optional scalar setting together with its configuration key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptSetting<T> {
    /// The value; `None` means "not specified".
    pub value: Option<T>,
    /// The configuration key this setting is stored under.
    pub name: &'static str,
}

impl<T> OptSetting<T> {
    /// Creates an unset setting with the given key.
    pub fn new(name: &'static str) -> Self {
        Self { value: None, name }
    }
}

/// An optional per-channel setting together with its configuration key.
///
/// The vector length is fixed at construction from the device channel
/// count; indices are channel numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptVector<T> {
    /// One optional value per channel.
    pub values: Vec<Option<T>>,
    /// The configuration key prefix this setting is stored under.
    pub name: &'static str,
}

impl<T: Copy> OptVector<T> {
    /// Creates a vector of `nchannels` unset entries.
    pub fn new(name: &'static str, nchannels: usize) -> Self {
        Self {
            values: vec![None; nchannels],
            name,
        }
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the vector has no channels.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of set entries.
    pub fn count_set(&self) -> usize {
        crate::optvec::count_set(&self.values, 0, self.values.len())
    }
}

/// Moves a scalar setting between section and field.
pub fn parse_setting<T: FromStr + fmt::Display>(
    log: &ChannelLog,
    section: &mut Section,
    field: &mut OptSetting<T>,
    direction: Direction,
) {
    match direction {
        Direction::Reading => {
            let Some(raw) = section.get(field.name).map(str::to_string) else {
                log.debug(format_args!("could not find key '{}'", field.name));
                field.value = None;
                return;
            };
            match raw.parse::<T>() {
                Ok(value) => {
                    section.take(field.name);
                    log.debug(format_args!(
                        "found key {} with value '{}'",
                        field.name, value
                    ));
                    field.value = Some(value);
                }
                Err(_) => {
                    log.warn(format_args!(
                        "value '{}' for key '{}' could not be converted, ignoring it",
                        raw, field.name
                    ));
                    field.value = None;
                }
            }
        }
        Direction::Writing => match &field.value {
            Some(value) => section.put(field.name, value.to_string()),
            None => log.debug(format_args!(
                "value for '{}' not defined, setting will be omitted in output",
                field.name
            )),
        },
    }
}

/// Parses a numeric string that may carry a `0x` hex prefix.
pub(crate) fn parse_number(text: &str) -> Option<u32> {
    let text: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        text.parse::<u32>().ok()
    }
}

/// Moves a hex-formatted scalar setting between section and field.
///
/// Reading accepts `0x`-prefixed hex; a value without the prefix is parsed
/// as plain base 10 with a warning. Writing always emits `0x...`.
pub fn parse_hex_setting(
    log: &ChannelLog,
    section: &mut Section,
    field: &mut OptSetting<u32>,
    direction: Direction,
) {
    match direction {
        Direction::Reading => {
            let Some(raw) = section.get(field.name).map(str::to_string) else {
                log.debug(format_args!("could not find key '{}'", field.name));
                field.value = None;
                return;
            };
            let trimmed = raw.trim();
            if !(trimmed.starts_with("0x") || trimmed.starts_with("0X")) {
                log.warn(format_args!(
                    "key '{}' with value '{}' does not appear to be a hex value, handling as base 10 instead",
                    field.name, raw
                ));
            }
            match parse_number(&raw) {
                Some(value) => {
                    section.take(field.name);
                    log.debug(format_args!(
                        "key '{}' with string value '{}' converted to value {}",
                        field.name, raw, value
                    ));
                    field.value = Some(value);
                }
                None => {
                    log.warn(format_args!(
                        "value '{}' for key '{}' could not be converted, ignoring it",
                        raw, field.name
                    ));
                    field.value = None;
                }
            }
        }
        Direction::Writing => match field.value {
            Some(value) => section.put(field.name, format!("{value:#x}")),
            None => log.debug(format_args!(
                "value for '{}' not defined, setting will be omitted in output",
                field.name
            )),
        },
    }
}

/// Moves an enum-backed scalar setting between section and field.
///
/// Labels in the configuration omit the vendor prefix; the lookup prepends
/// [`VENDOR_PREFIX`] and matches case-insensitively. An unmatched label
/// leaves the field absent and logs the list of valid labels.
pub fn parse_enum_setting<C: Copy + PartialEq + fmt::Debug>(
    log: &ChannelLog,
    section: &mut Section,
    field: &mut OptSetting<C>,
    map: &EnumMap<C>,
    direction: Direction,
) {
    match direction {
        Direction::Reading => {
            let Some(raw) = section.get(field.name).map(str::to_string) else {
                log.debug(format_args!("could not find key '{}'", field.name));
                field.value = None;
                return;
            };
            match map.find_label(&format!("{VENDOR_PREFIX}{raw}")) {
                Some(code) => {
                    section.take(field.name);
                    log.debug(format_args!(
                        "value of key {} with value '{}' converted to {:?}",
                        field.name, raw, code
                    ));
                    field.value = Some(code);
                }
                None => {
                    log.warn(format_args!(
                        "value '{}' for key '{}' does not match any known label; valid values are: {}",
                        raw,
                        field.name,
                        map.valid_labels().join(", ")
                    ));
                    field.value = None;
                }
            }
        }
        Direction::Writing => {
            let Some(code) = field.value else { return };
            match map.display_label(code) {
                Some(label) => section.put(field.name, label),
                None => log.error(format_args!(
                    "no label known for value {:?} of '{}'",
                    code, field.name
                )),
            }
        }
    }
}

/// Collects the keys of `section` that address `name` with a bracketed
/// range, together with their values.
fn bracketed_keys(section: &Section, name: &str) -> Vec<(String, String)> {
    section
        .entries()
        .filter(|(key, _)| {
            key.len() > name.len()
                && matches!(key.as_bytes()[name.len()], b'[' | b'(')
                && key.as_bytes()[..name.len()].eq_ignore_ascii_case(name.as_bytes())
        })
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn read_vector_entries<T: Copy>(
    log: &ChannelLog,
    section: &mut Section,
    name: &str,
    values: &mut [Option<T>],
    parse_value: impl Fn(&str) -> Option<T>,
    invalid_value: impl Fn(&str, &str) -> String,
) {
    for (key, raw) in bracketed_keys(section, name) {
        log.debug(format_args!(
            "found a matching key: '{key}' with value '{raw}'"
        ));
        let range: String = key[name.len()..]
            .trim_start_matches(['[', '('])
            .trim_end_matches([']', ')'])
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if !range
            .chars()
            .all(|c| c.is_ascii_digit() || c == ',' || c == '-')
        {
            log.error(format_args!(
                "could not parse range '{range}' specified in setting '{key}' with value '{raw}'; only '-', ',' and digits are allowed"
            ));
            continue;
        }
        let indices = match expand_range(&range) {
            Ok(indices) => indices,
            Err(err) => {
                log.error(format_args!(
                    "could not parse range '{range}' specified in setting '{key}': {err}"
                ));
                continue;
            }
        };
        log.debug(format_args!("expanded range '{range}' into {indices:?}"));
        let Some(value) = parse_value(&raw) else {
            log.warn(format_args!("{}", invalid_value(&key, &raw)));
            continue;
        };
        for index in indices {
            match values.get_mut(index as usize) {
                Some(slot) => *slot = Some(value),
                None => log.error(format_args!(
                    "channel number '{index}' in setting '{name}' is out of range"
                )),
            }
        }
        section.take(&key);
    }
}

fn write_vector_entries<T: Copy>(
    log: &ChannelLog,
    section: &mut Section,
    name: &str,
    values: &[Option<T>],
    format_value: impl Fn(T) -> String,
) {
    for (index, value) in values.iter().enumerate() {
        match value {
            Some(value) => section.put(format!("{name}[{index}]"), format_value(*value)),
            None => log.debug(format_args!(
                "value for '{name}' not defined for channel #{index}, setting will be omitted in output"
            )),
        }
    }
}

/// Moves a per-channel setting between section and field.
///
/// Reading accepts any key of the form `name[range]` (or `name(range)`)
/// and broadcasts the parsed value to every channel the range lists.
/// Writing emits one `name[index]` key per set channel; ranges are never
/// re-compressed on output.
pub fn parse_vector_setting<T: FromStr + fmt::Display + Copy>(
    log: &ChannelLog,
    section: &mut Section,
    field: &mut OptVector<T>,
    direction: Direction,
) {
    match direction {
        Direction::Reading => read_vector_entries(
            log,
            section,
            field.name,
            &mut field.values,
            |raw| raw.parse::<T>().ok(),
            |key, raw| format!("value '{raw}' for key '{key}' could not be converted, ignoring it"),
        ),
        Direction::Writing => write_vector_entries(log, section, field.name, &field.values, |v| {
            v.to_string()
        }),
    }
}

/// Interprets a configuration flag value.
///
/// Accepts `1`/`0`, `true`/`false`, `on`/`off` and `yes`/`no`
/// (case-insensitive).
pub fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Moves a per-channel boolean setting between section and field.
///
/// Reading accepts the flag spellings of [`parse_flag`]; writing emits
/// `1`/`0`.
pub fn parse_flag_vector_setting(
    log: &ChannelLog,
    section: &mut Section,
    field: &mut OptVector<bool>,
    direction: Direction,
) {
    match direction {
        Direction::Reading => read_vector_entries(
            log,
            section,
            field.name,
            &mut field.values,
            parse_flag,
            |key, raw| format!("value '{raw}' for key '{key}' is not a valid flag, ignoring it"),
        ),
        Direction::Writing => write_vector_entries(log, section, field.name, &field.values, |v| {
            if v { "1" } else { "0" }.to_string()
        }),
    }
}

/// Moves an enum-backed per-channel setting between section and field.
pub fn parse_enum_vector_setting<C: Copy + PartialEq + fmt::Debug>(
    log: &ChannelLog,
    section: &mut Section,
    field: &mut OptVector<C>,
    map: &EnumMap<C>,
    direction: Direction,
) {
    match direction {
        Direction::Reading => read_vector_entries(
            log,
            section,
            field.name,
            &mut field.values,
            |raw| map.find_label(&format!("{VENDOR_PREFIX}{raw}")),
            |key, raw| {
                format!(
                    "value '{raw}' for key '{key}' does not match any known label; valid values are: {}",
                    map.valid_labels().join(", ")
                )
            },
        ),
        Direction::Writing => {
            // resolve labels up front so the formatter stays infallible
            for (index, value) in field.values.iter().enumerate() {
                match value {
                    Some(code) => match map.display_label(*code) {
                        Some(label) => section.put(format!("{}[{index}]", field.name), label),
                        None => log.error(format_args!(
                            "no label known for value {:?} of '{}'",
                            code, field.name
                        )),
                    },
                    None => log.debug(format_args!(
                        "value for '{}' not defined for channel #{index}, setting will be omitted in output",
                        field.name
                    )),
                }
            }
        }
    }
}
