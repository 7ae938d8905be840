//! The break primitive both allocators are built on.

use std::mem;

use crate::error::BreakError;

pub(crate) const WORD: usize = mem::size_of::<usize>();

/// A contiguous address range that can be grown or shrunk at its upper end.
///
/// Besides moving the break, a provider owns access to the memory below it:
/// allocators read and write their headers through these accessors instead
/// of dereferencing addresses themselves. Touching an address outside the
/// claimed range is a bug in the caller and panics.
pub trait BreakProvider {
  /// Moves the break by `increment` bytes and returns the break as it was
  /// before the move. `adjust(0)` reads the break without moving it.
  ///
  /// On error the break is left where it was.
  fn adjust(
    &mut self,
    increment: isize,
  ) -> Result<usize, BreakError>;

  /// Copies `buf.len()` bytes starting at `addr` into `buf`.
  fn read_bytes(
    &self,
    addr: usize,
    buf: &mut [u8],
  );

  /// Copies `bytes` to memory starting at `addr`.
  fn write_bytes(
    &mut self,
    addr: usize,
    bytes: &[u8],
  );

  /// Sets `len` bytes starting at `addr` to `byte`.
  fn fill(
    &mut self,
    addr: usize,
    len: usize,
    byte: u8,
  );

  /// Current break, without moving it.
  fn current(&mut self) -> Result<usize, BreakError> {
    self.adjust(0)
  }

  fn read_word(
    &self,
    addr: usize,
  ) -> usize {
    let mut buf = [0u8; WORD];
    self.read_bytes(addr, &mut buf);
    usize::from_ne_bytes(buf)
  }

  fn write_word(
    &mut self,
    addr: usize,
    value: usize,
  ) {
    self.write_bytes(addr, &value.to_ne_bytes());
  }
}

#[cfg(unix)]
pub use self::sbrk::SbrkBreak;

#[cfg(unix)]
mod sbrk {
  use std::ptr;

  use libc::{c_void, intptr_t, sbrk};
  use tracing::debug;

  use super::BreakProvider;
  use crate::error::BreakError;

  /// The real program break of the current process, moved with `sbrk(2)`.
  ///
  /// The provider never shrinks the break below the address it observed
  /// when it was created, and only lets allocators touch memory between
  /// that address and the break.
  pub struct SbrkBreak {
    origin: usize,
    brk: usize,
  }

  impl SbrkBreak {
    /// Snapshots the current break as the lowest address this provider
    /// will hand out.
    ///
    /// # Safety
    ///
    /// Nothing else in the process may move the break (no other `brk` or
    /// `sbrk` caller, including a `brk`-based system allocator on another
    /// thread) while this provider or an allocator built on it is alive.
    pub unsafe fn new() -> Result<Self, BreakError> {
      let brk = unsafe { sbrk(0) };

      if brk == usize::MAX as *mut c_void {
        return Err(BreakError::Refused { increment: 0 });
      }

      Ok(Self {
        origin: brk as usize,
        brk: brk as usize,
      })
    }

    /// The break observed when the provider was created.
    pub fn origin(&self) -> usize {
      self.origin
    }

    fn check_range(
      &self,
      addr: usize,
      len: usize,
    ) {
      let in_range = addr >= self.origin && addr.checked_add(len).is_some_and(|end| end <= self.brk);

      assert!(
        in_range,
        "access to [{:#x}, +{}) outside claimed range [{:#x}, {:#x})",
        addr, len, self.origin, self.brk
      );
    }
  }

  impl BreakProvider for SbrkBreak {
    fn adjust(
      &mut self,
      increment: isize,
    ) -> Result<usize, BreakError> {
      if increment < 0 && increment.unsigned_abs() > self.brk - self.origin {
        return Err(BreakError::Underflow {
          requested: increment.unsigned_abs(),
          available: self.brk - self.origin,
        });
      }

      let old = unsafe { sbrk(increment as intptr_t) };

      if old == usize::MAX as *mut c_void {
        return Err(BreakError::Refused { increment });
      }

      let old = old as usize;
      self.brk = old.wrapping_add_signed(increment);

      if increment != 0 {
        debug!(increment, old_break = old, new_break = self.brk, "sbrk moved the program break");
      }

      Ok(old)
    }

    fn read_bytes(
      &self,
      addr: usize,
      buf: &mut [u8],
    ) {
      self.check_range(addr, buf.len());
      unsafe { ptr::copy_nonoverlapping(addr as *const u8, buf.as_mut_ptr(), buf.len()) }
    }

    fn write_bytes(
      &mut self,
      addr: usize,
      bytes: &[u8],
    ) {
      self.check_range(addr, bytes.len());
      unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), addr as *mut u8, bytes.len()) }
    }

    fn fill(
      &mut self,
      addr: usize,
      len: usize,
      byte: u8,
    ) {
      self.check_range(addr, len);
      unsafe { ptr::write_bytes(addr as *mut u8, byte, len) }
    }
  }
}
