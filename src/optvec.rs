//! Predicates over vectors of optional values.
//!
//! Per-channel settings are stored as `Vec<Option<T>>`, where an absent
//! entry means "not specified". These helpers answer the questions the
//! programming engine asks before folding channels into hardware groups:
//! is anything set at all, is everything in a group set to the same value,
//! which value was it. All functions are pure and restrict themselves to
//! the half-open index range `[start, stop)` (`stop` is clamped to the
//! vector length).
//!
//! # Example
//!
//! ```
//! use digconf::optvec::{all_values_same, count_set, first_set_value};
//!
//! let v = vec![Some(1), None, Some(1), None];
//! assert!(all_values_same(&v, 0, v.len()));
//! assert_eq!(count_set(&v, 0, v.len()), 2);
//! assert_eq!(first_set_value(&v, 0, v.len()), Some(1));
//! ```

fn window<T>(values: &[Option<T>], start: usize, stop: usize) -> &[Option<T>] {
    values.get(start..stop.min(values.len())).unwrap_or(&[])
}

/// Counts the `Some(true)` entries in `[start, stop)`.
pub fn count_true(values: &[Option<bool>], start: usize, stop: usize) -> usize {
    window(values, start, stop)
        .iter()
        .filter(|v| **v == Some(true))
        .count()
}

/// Counts the set entries in `[start, stop)`.
pub fn count_set<T>(values: &[Option<T>], start: usize, stop: usize) -> usize {
    window(values, start, stop)
        .iter()
        .filter(|v| v.is_some())
        .count()
}

/// Returns the first set value in `[start, stop)`, or `None` when no entry
/// in the range is set.
pub fn first_set_value<T: Copy>(values: &[Option<T>], start: usize, stop: usize) -> Option<T> {
    window(values, start, stop).iter().find_map(|v| *v)
}

/// Tests whether every set value in `[start, stop)` equals the first set
/// value in that range. Vacuously true when nothing is set.
pub fn all_values_same<T: Copy + PartialEq>(
    values: &[Option<T>],
    start: usize,
    stop: usize,
) -> bool {
    let first = first_set_value(values, start, stop);
    window(values, start, stop)
        .iter()
        .all(|v| v.is_none() || *v == first)
}

/// Tests whether every entry in `[start, stop)` is set.
pub fn all_values_set<T>(values: &[Option<T>], start: usize, stop: usize) -> bool {
    window(values, start, stop).iter().all(|v| v.is_some())
}

/// Tests whether no entry in `[start, stop)` is set.
pub fn no_values_set<T>(values: &[Option<T>], start: usize, stop: usize) -> bool {
    window(values, start, stop).iter().all(|v| v.is_none())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_true() {
        let v = vec![Some(true), Some(false), None, Some(true)];
        assert_eq!(count_true(&v, 0, v.len()), 2);
        assert_eq!(count_true(&v, 1, 3), 0);
        assert_eq!(count_true(&v, 3, usize::MAX), 1);
    }

    #[test]
    fn test_count_set() {
        let v = vec![Some(1), None, Some(3), None];
        assert_eq!(count_set(&v, 0, v.len()), 2);
        assert_eq!(count_set(&v, 1, 2), 0);
    }

    #[test]
    fn test_first_set_value() {
        let v = vec![None, Some(7), Some(8)];
        assert_eq!(first_set_value(&v, 0, v.len()), Some(7));
        assert_eq!(first_set_value(&v, 2, v.len()), Some(8));
        assert_eq!(first_set_value::<i32>(&[None, None], 0, 2), None);
    }

    #[test]
    fn test_all_values_same() {
        assert!(all_values_same(&[Some(1), None, Some(1)], 0, 3));
        assert!(!all_values_same(&[Some(1), Some(2)], 0, 2));
        assert!(all_values_same::<i32>(&[None, None], 0, 2));
        // only the sub-range counts
        assert!(all_values_same(&[Some(1), Some(2), Some(2)], 1, 3));
    }

    #[test]
    fn test_all_values_set() {
        assert!(all_values_set(&[Some(1), Some(2)], 0, 2));
        assert!(!all_values_set(&[Some(1), None], 0, 2));
        assert!(all_values_set(&[Some(1), None], 0, 1));
    }

    #[test]
    fn test_no_values_set() {
        assert!(no_values_set::<i32>(&[None, None], 0, 2));
        assert!(!no_values_set(&[None, Some(1)], 0, 2));
        assert!(no_values_set(&[None, Some(1)], 0, 1));
    }
}
