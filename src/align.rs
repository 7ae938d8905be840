/// Rounds `value` up to the next multiple of `to`, which must be a power of two.
///
/// # Examples
///
/// ```rust
/// use brkalloc::align;
///
/// assert_eq!(align!(13, 4), 16);
/// assert_eq!(align!(16, 16), 16);
/// assert_eq!(align!(0, 8), 0);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr, $to:expr) => {
    ($value + $to - 1) & !($to - 1)
  };
}

/// Overflow-checked variant of [`align!`] for sizes that come from callers.
pub fn checked_align(
  value: usize,
  to: usize,
) -> Option<usize> {
  debug_assert!(to.is_power_of_two());
  value.checked_add(to - 1)?;
  Some(align!(value, to))
}

/// Bytes needed after `value` to reach the next multiple of `to`.
pub fn padding(
  value: usize,
  to: usize,
) -> usize {
  debug_assert!(to.is_power_of_two());
  value.wrapping_neg() & (to - 1)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_align() {
    let unit = 16;

    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (unit * i + 1)..=(unit * (i + 1));

      let expected_alignment = unit * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size, unit));
        assert_eq!(Some(expected), checked_align(size, unit));
      }
    }
  }

  #[test]
  fn test_checked_align_overflow() {
    assert_eq!(checked_align(usize::MAX, 8), None);
    assert_eq!(checked_align(usize::MAX - 7, 8), Some(usize::MAX - 7));
  }

  #[test]
  fn test_padding() {
    assert_eq!(padding(0, 4), 0);
    assert_eq!(padding(1, 4), 3);
    assert_eq!(padding(5, 4), 3);
    assert_eq!(padding(6, 4), 2);
    assert_eq!(padding(8, 4), 0);
  }
}
