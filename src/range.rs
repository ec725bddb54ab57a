//! Channel-range expansion.
//!
//! Configuration keys address channels with a compact range syntax:
//! a comma-separated list of single indices and inclusive `low-high`
//! spans, e.g. `"0-3,5,7"`. This module expands that syntax into an
//! explicit index list.
//!
//! There is deliberately no inverse (compression) operation: serialized
//! configurations always emit one key per channel, so input written with
//! ranges comes back fully expanded.
//!
//! # Example
//!
//! ```
//! use digconf::range::expand_range;
//!
//! assert_eq!(expand_range("0-2,5,7-8").unwrap(), vec![0, 1, 2, 5, 7, 8]);
//! assert_eq!(expand_range("3").unwrap(), vec![3]);
//! assert!(expand_range("a-2").is_err());
//! ```

use crate::error::{ConfigError, Result};

/// Expands a comma-separated list of indices and inclusive ranges into an
/// explicit index list.
///
/// Whitespace anywhere in the input is ignored. Each token is either a
/// single non-negative integer or `low-high` (both bounds included).
///
/// # Errors
///
/// Returns [`ConfigError::InvalidRange`] for empty input, non-numeric
/// tokens, or spans with more than one `-`.
pub fn expand_range(range: &str) -> Result<Vec<u32>> {
    let cleaned: String = range.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(ConfigError::invalid_range(range, "empty range"));
    }
    let mut indices = Vec::new();
    for token in cleaned.split(',') {
        let mut bounds = token.split('-');
        let low = parse_bound(token, bounds.next().unwrap_or(""))?;
        let high = match bounds.next() {
            Some(h) => parse_bound(token, h)?,
            None => low,
        };
        if bounds.next().is_some() {
            return Err(ConfigError::invalid_range(
                token,
                "more than one '-' in span",
            ));
        }
        for i in low..=high {
            indices.push(i);
        }
    }
    Ok(indices)
}

fn parse_bound(token: &str, bound: &str) -> Result<u32> {
    bound
        .parse::<u32>()
        .map_err(|_| ConfigError::invalid_range(token, format!("'{bound}' is not a number")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_value() {
        assert_eq!(expand_range("3").unwrap(), vec![3]);
    }

    #[test]
    fn test_mixed_ranges() {
        assert_eq!(expand_range("0-2,5,7-8").unwrap(), vec![0, 1, 2, 5, 7, 8]);
    }

    #[test]
    fn test_whitespace_ignored() {
        assert_eq!(expand_range(" 0 - 2 , 5 ").unwrap(), vec![0, 1, 2, 5]);
    }

    #[test]
    fn test_reversed_span_is_empty() {
        // low > high expands to nothing, matching an inclusive low..=high loop
        assert_eq!(expand_range("5-3").unwrap(), Vec::<u32>::new());
    }

    #[test]
    fn test_malformed_token_is_error() {
        assert!(expand_range("a-2").is_err());
        assert!(expand_range("1,x").is_err());
        assert!(expand_range("1-2-3").is_err());
        assert!(expand_range("-3").is_err());
        assert!(expand_range("").is_err());
    }
}
