//! An in-memory stand-in for the process break.

use tracing::debug;

use crate::{brk::BreakProvider, error::BreakError};

/// Lowest address handed out by [`SimulatedBreak::new`]. Non-zero so that
/// `0` stays free to mean "no address".
pub const DEFAULT_BASE: usize = 0x1000;

/// A fixed-capacity address range backed by an owned buffer.
///
/// Addresses start at `base` and the break can move anywhere in
/// `[base, base + capacity]`. Tests can force every adjustment to fail
/// with [`set_refusing`](Self::set_refusing) and observe how often the
/// break was moved.
#[derive(Debug, Clone)]
pub struct SimulatedBreak {
  base: usize,
  memory: Vec<u8>,
  brk: usize,
  refusing: bool,
  grow_count: usize,
  shrink_count: usize,
}

impl SimulatedBreak {
  pub fn new(capacity: usize) -> Self {
    Self::with_base(DEFAULT_BASE, capacity)
  }

  pub fn with_base(
    base: usize,
    capacity: usize,
  ) -> Self {
    assert!(base != 0, "the simulated range must not start at address 0");

    Self {
      base,
      memory: vec![0; capacity],
      brk: base,
      refusing: false,
      grow_count: 0,
      shrink_count: 0,
    }
  }

  pub fn base(&self) -> usize {
    self.base
  }

  pub fn capacity(&self) -> usize {
    self.memory.len()
  }

  /// The break, read without going through [`BreakProvider::adjust`].
  pub fn brk(&self) -> usize {
    self.brk
  }

  /// Makes every non-zero adjustment fail with [`BreakError::Refused`].
  pub fn set_refusing(
    &mut self,
    refusing: bool,
  ) {
    self.refusing = refusing;
  }

  /// Number of successful adjustments that grew the break.
  pub fn grow_count(&self) -> usize {
    self.grow_count
  }

  /// Number of successful adjustments that shrank the break.
  pub fn shrink_count(&self) -> usize {
    self.shrink_count
  }

  fn offset(
    &self,
    addr: usize,
    len: usize,
  ) -> usize {
    let in_range = addr >= self.base && addr.checked_add(len).is_some_and(|end| end <= self.brk);

    assert!(
      in_range,
      "access to [{:#x}, +{}) outside claimed range [{:#x}, {:#x})",
      addr, len, self.base, self.brk
    );

    addr - self.base
  }
}

impl BreakProvider for SimulatedBreak {
  fn adjust(
    &mut self,
    increment: isize,
  ) -> Result<usize, BreakError> {
    let old = self.brk;

    if increment == 0 {
      return Ok(old);
    }

    if self.refusing {
      return Err(BreakError::Refused { increment });
    }

    let claimed = self.brk - self.base;

    if increment > 0 {
      let requested = increment.unsigned_abs();
      let available = self.memory.len() - claimed;

      if requested > available {
        return Err(BreakError::OutOfMemory { requested, available });
      }

      self.grow_count += 1;
    } else {
      let requested = increment.unsigned_abs();

      if requested > claimed {
        return Err(BreakError::Underflow {
          requested,
          available: claimed,
        });
      }

      self.shrink_count += 1;
    }

    self.brk = old.wrapping_add_signed(increment);

    debug!(increment, old_break = old, new_break = self.brk, "simulated break moved");

    Ok(old)
  }

  fn read_bytes(
    &self,
    addr: usize,
    buf: &mut [u8],
  ) {
    let offset = self.offset(addr, buf.len());
    buf.copy_from_slice(&self.memory[offset..offset + buf.len()]);
  }

  fn write_bytes(
    &mut self,
    addr: usize,
    bytes: &[u8],
  ) {
    let offset = self.offset(addr, bytes.len());
    self.memory[offset..offset + bytes.len()].copy_from_slice(bytes);
  }

  fn fill(
    &mut self,
    addr: usize,
    len: usize,
    byte: u8,
  ) {
    let offset = self.offset(addr, len);
    self.memory[offset..offset + len].fill(byte);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_grow_returns_previous_break() {
    let mut brk = SimulatedBreak::new(256);

    assert_eq!(brk.adjust(0), Ok(DEFAULT_BASE));
    assert_eq!(brk.adjust(64), Ok(DEFAULT_BASE));
    assert_eq!(brk.adjust(32), Ok(DEFAULT_BASE + 64));
    assert_eq!(brk.current(), Ok(DEFAULT_BASE + 96));
    assert_eq!(brk.grow_count(), 2);
  }

  #[test]
  fn test_shrink() {
    let mut brk = SimulatedBreak::new(256);

    brk.adjust(128).unwrap();

    assert_eq!(brk.adjust(-28), Ok(DEFAULT_BASE + 128));
    assert_eq!(brk.brk(), DEFAULT_BASE + 100);
    assert_eq!(brk.shrink_count(), 1);
  }

  #[test]
  fn test_failures_leave_break_unmoved() {
    let mut brk = SimulatedBreak::new(64);

    assert_eq!(brk.capacity(), 64);
    assert_eq!(
      brk.adjust(65),
      Err(BreakError::OutOfMemory {
        requested: 65,
        available: 64
      })
    );
    assert_eq!(
      brk.adjust(-1),
      Err(BreakError::Underflow {
        requested: 1,
        available: 0
      })
    );

    brk.set_refusing(true);
    assert_eq!(brk.adjust(8), Err(BreakError::Refused { increment: 8 }));
    assert_eq!(brk.adjust(0), Ok(DEFAULT_BASE));

    brk.set_refusing(false);
    assert_eq!(brk.adjust(8), Ok(DEFAULT_BASE));
    assert_eq!(brk.brk(), DEFAULT_BASE + 8);
  }

  #[test]
  fn test_words_and_bytes() {
    let mut brk = SimulatedBreak::new(64);
    let start = brk.adjust(32).unwrap();

    brk.write_word(start + 3, 0xDEAD_BEEF);
    assert_eq!(brk.read_word(start + 3), 0xDEAD_BEEF);

    brk.fill(start, 32, 0xAB);
    let mut buf = [0u8; 32];
    brk.read_bytes(start, &mut buf);
    assert!(buf.iter().all(|&b| b == 0xAB));

    brk.write_bytes(start + 30, b"hi");
    let mut tail = [0u8; 2];
    brk.read_bytes(start + 30, &mut tail);
    assert_eq!(&tail, b"hi");
  }

  #[test]
  #[should_panic(expected = "outside claimed range")]
  fn test_access_past_break_panics() {
    let mut brk = SimulatedBreak::new(64);
    let start = brk.adjust(16).unwrap();

    brk.read_word(start + 16);
  }
}
