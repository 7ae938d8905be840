use crate::brk::{BreakProvider, WORD};

/// Bytes in one free-list header, which is also the allocation unit.
pub const UNIT: usize = Header::SIZE;

/// Boundary tag at the start of every free-list block.
///
/// ```text
///   addr          addr + WORD          addr + UNIT
///   ┌─────────────┬────────────────────┬──────────────────────┐
///   │ next (addr) │ size (in units)    │ payload ...          │
///   └─────────────┴────────────────────┴──────────────────────┘
/// ```
///
/// `next` is only meaningful while the block sits in the free list.
/// `size` counts units and includes the header itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
  pub next: usize,
  pub size: usize,
}

impl Header {
  pub const SIZE: usize = 2 * WORD;

  const NEXT: usize = 0;
  const UNITS: usize = WORD;

  pub fn read<P: BreakProvider>(
    provider: &P,
    addr: usize,
  ) -> Self {
    Self {
      next: Self::next(provider, addr),
      size: Self::size(provider, addr),
    }
  }

  pub fn write<P: BreakProvider>(
    self,
    provider: &mut P,
    addr: usize,
  ) {
    Self::set_next(provider, addr, self.next);
    Self::set_size(provider, addr, self.size);
  }

  pub fn next<P: BreakProvider>(
    provider: &P,
    addr: usize,
  ) -> usize {
    provider.read_word(addr + Self::NEXT)
  }

  pub fn size<P: BreakProvider>(
    provider: &P,
    addr: usize,
  ) -> usize {
    provider.read_word(addr + Self::UNITS)
  }

  pub fn set_next<P: BreakProvider>(
    provider: &mut P,
    addr: usize,
    next: usize,
  ) {
    provider.write_word(addr + Self::NEXT, next);
  }

  pub fn set_size<P: BreakProvider>(
    provider: &mut P,
    addr: usize,
    size: usize,
  ) {
    provider.write_word(addr + Self::UNITS, size);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::simulated::SimulatedBreak;

  #[test]
  fn test_header_round_trips_through_memory() {
    let mut brk = SimulatedBreak::new(4 * UNIT);
    let addr = brk.adjust(2 * UNIT as isize).unwrap();

    Header { next: 0x2000, size: 7 }.write(&mut brk, addr);
    Header::set_size(&mut brk, addr + UNIT, 1);

    assert_eq!(Header::read(&brk, addr), Header { next: 0x2000, size: 7 });
    assert_eq!(Header::size(&brk, addr + UNIT), 1);
    assert_eq!(brk.read_word(addr), 0x2000);
  }
}
