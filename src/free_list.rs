//! Next-fit free-list allocator with boundary tags.
//!
//! ```text
//!   sentinel (addr 0, size 0)
//!       │
//!       ▼
//!   ┌────────┐   ┌────────┐   ┌────────┐
//!   │ free A │──▶│ free B │──▶│ free C │──┐
//!   └────────┘   └────────┘   └────────┘  │
//!       ▲                                 │
//!       └────────────── sentinel ◀────────┘
//!
//!   Free blocks are linked in ascending address order. The highest
//!   block links back to the sentinel, which links to the lowest.
//! ```
//!
//! Allocations are carved off the tail of a free block so the block keeps
//! its place in the list. Released blocks are merged with whichever
//! neighbors touch them, and once the whole heap has coalesced into a
//! single block that ends at the break, it is handed back.

use std::iter;

use thiserror::Error;
use tracing::debug;

use crate::{
  align::checked_align,
  allocator::{Allocator, array_size},
  block::{Header, UNIT},
  brk::BreakProvider,
  config::FreeListConfig,
  error::AllocError,
};

/// Address of the list sentinel. It lives in the allocator rather than in
/// heap memory and sorts below every real block.
const SENTINEL: usize = 0;

/// A block currently on the free list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlock {
  /// Address of the block header.
  pub addr: usize,
  /// Block size in bytes, header included.
  pub size: usize,
}

/// A broken free-list invariant, reported by
/// [`FreeListAllocator::check_invariants`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvariantViolation {
  #[error("free block {addr:#x} does not sort above {prev:#x}")]
  Unordered { prev: usize, addr: usize },

  #[error("free blocks {first:#x} and {second:#x} touch but were not merged")]
  Unmerged { first: usize, second: usize },

  #[error("free block {0:#x} is empty")]
  Empty(usize),

  #[error("roving pointer {0:#x} is not on the free list")]
  RovingLost(usize),
}

/// General-purpose allocator over a [`BreakProvider`].
pub struct FreeListAllocator<P: BreakProvider> {
  provider: P,
  config: FreeListConfig,
  /// `next` of the sentinel.
  base_next: usize,
  /// Where the next search starts: the block before the first candidate.
  roving: usize,
}

impl<P: BreakProvider> FreeListAllocator<P> {
  pub fn new(provider: P) -> Self {
    Self::with_config(provider, FreeListConfig::default())
  }

  pub fn with_config(
    provider: P,
    config: FreeListConfig,
  ) -> Self {
    Self {
      provider,
      config: FreeListConfig {
        min_chunk_units: config.min_chunk_units.max(1),
      },
      base_next: SENTINEL,
      roving: SENTINEL,
    }
  }

  /// Tears the allocator down and hands back its provider. Outstanding
  /// allocations stay where they are.
  pub fn destroy(self) -> P {
    self.provider
  }

  pub fn provider(&self) -> &P {
    &self.provider
  }

  pub fn provider_mut(&mut self) -> &mut P {
    &mut self.provider
  }

  pub fn config(&self) -> FreeListConfig {
    self.config
  }

  /// Walks the free list from the lowest address up.
  pub fn free_blocks(&self) -> impl Iterator<Item = FreeBlock> + '_ {
    iter::successors(Some(self.base_next), move |&addr| Some(self.next_of(addr)))
      .take_while(|&addr| addr != SENTINEL)
      .map(move |addr| FreeBlock {
        addr,
        size: self.size_of(addr) * UNIT,
      })
  }

  /// Verifies ordering, coalescing and the roving pointer.
  pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
    let mut roving_seen = self.roving == SENTINEL;
    let mut prev = SENTINEL;
    let mut addr = self.base_next;

    while addr != SENTINEL {
      if addr <= prev {
        return Err(InvariantViolation::Unordered { prev, addr });
      }

      if self.size_of(addr) == 0 {
        return Err(InvariantViolation::Empty(addr));
      }

      if prev != SENTINEL && self.end_of(prev) == addr {
        return Err(InvariantViolation::Unmerged {
          first: prev,
          second: addr,
        });
      }

      roving_seen |= addr == self.roving;
      prev = addr;
      addr = self.next_of(addr);
    }

    if !roving_seen {
      return Err(InvariantViolation::RovingLost(self.roving));
    }

    Ok(())
  }

  fn next_of(
    &self,
    addr: usize,
  ) -> usize {
    if addr == SENTINEL {
      self.base_next
    } else {
      Header::next(&self.provider, addr)
    }
  }

  fn set_next(
    &mut self,
    addr: usize,
    next: usize,
  ) {
    if addr == SENTINEL {
      self.base_next = next;
    } else {
      Header::set_next(&mut self.provider, addr, next);
    }
  }

  fn size_of(
    &self,
    addr: usize,
  ) -> usize {
    if addr == SENTINEL {
      0
    } else {
      Header::size(&self.provider, addr)
    }
  }

  fn end_of(
    &self,
    addr: usize,
  ) -> usize {
    addr + self.size_of(addr) * UNIT
  }

  fn predecessor(
    &self,
    node: usize,
  ) -> usize {
    let mut p = node;

    loop {
      let q = self.next_of(p);
      if q == node {
        return p;
      }
      p = q;
    }
  }

  /// Units for a request of `nbytes`, one of them for the header.
  fn units_for(nbytes: usize) -> Result<usize, AllocError> {
    checked_align(nbytes, UNIT)
      .and_then(|bytes| (bytes / UNIT).checked_add(1))
      .ok_or(AllocError::SizeOverflow {
        count: 1,
        size: nbytes,
      })
  }

  /// Claims at least `units` more units from the break and threads them
  /// onto the free list. Returns the new roving pointer.
  fn morecore(
    &mut self,
    units: usize,
  ) -> Result<usize, AllocError> {
    let units = units.max(self.config.min_chunk_units);

    let increment = units
      .checked_mul(UNIT)
      .and_then(|bytes| isize::try_from(bytes).ok())
      .ok_or(AllocError::SizeOverflow { count: units, size: UNIT })?;

    let addr = self.provider.adjust(increment)?;

    debug!(units, addr, "morecore claimed a chunk");

    Header {
      next: SENTINEL,
      size: units,
    }
    .write(&mut self.provider, addr);
    self.insert(addr);

    Ok(self.roving)
  }

  /// Links the block at `bp` into the list, merging it with any neighbor
  /// it touches. Leaves the roving pointer just before the block that now
  /// holds `bp`.
  fn insert(
    &mut self,
    bp: usize,
  ) {
    let mut before = None;
    let mut p = self.roving;

    loop {
      let q = self.next_of(p);
      debug_assert_ne!(bp, q, "block {bp:#x} is already free");

      if bp > p && bp < q {
        break;
      }

      // `p` is the highest block and `bp` lies past it or below the lowest.
      if p >= q && (bp > p || bp < q) {
        break;
      }

      before = Some(p);
      p = q;
    }

    let q = self.next_of(p);
    let bp_size = Header::size(&self.provider, bp);

    if bp + bp_size * UNIT == q {
      Header {
        next: self.next_of(q),
        size: bp_size + self.size_of(q),
      }
      .write(&mut self.provider, bp);
    } else {
      Header::set_next(&mut self.provider, bp, q);
    }

    if p != SENTINEL && self.end_of(p) == bp {
      Header {
        next: Header::next(&self.provider, bp),
        size: self.size_of(p) + Header::size(&self.provider, bp),
      }
      .write(&mut self.provider, p);

      self.roving = before.unwrap_or_else(|| self.predecessor(p));
    } else {
      self.set_next(p, bp);
      self.roving = p;
    }
  }

  /// Hands the heap back when it has coalesced into one block ending at
  /// the break. A refusal keeps the block on the list.
  fn return_to_break(&mut self) {
    let first = self.base_next;

    if first == SENTINEL || self.next_of(first) != SENTINEL {
      return;
    }

    let end = self.end_of(first);

    if self.provider.current().ok() != Some(end) {
      return;
    }

    let bytes = self.size_of(first) * UNIT;
    let Ok(decrement) = isize::try_from(bytes) else {
      return;
    };

    match self.provider.adjust(-decrement) {
      Ok(_) => {
        debug!(addr = first, bytes, "returned free heap to the break");
        self.base_next = SENTINEL;
        self.roving = SENTINEL;
      }
      Err(err) => debug!(%err, addr = first, bytes, "break refused to shrink, keeping free heap"),
    }
  }
}

impl<P: BreakProvider> Allocator for FreeListAllocator<P> {
  fn allocate(
    &mut self,
    nbytes: usize,
  ) -> Result<usize, AllocError> {
    let units = Self::units_for(nbytes)?;

    let mut prev = self.roving;
    let mut p = self.next_of(prev);

    loop {
      let size = self.size_of(p);

      if size >= units {
        let block = if size == units {
          let next = self.next_of(p);
          self.set_next(prev, next);
          p
        } else {
          let remaining = size - units;
          Header::set_size(&mut self.provider, p, remaining);

          let tail = p + remaining * UNIT;
          Header::set_size(&mut self.provider, tail, units);
          tail
        };

        self.roving = prev;

        return Ok(block + UNIT);
      }

      if p == self.roving {
        p = self.morecore(units)?;
      }

      prev = p;
      p = self.next_of(p);
    }
  }

  /// Releases `ptr`. Passing an address this allocator did not hand out,
  /// or releasing one twice, corrupts the free list. `0` is ignored.
  fn release(
    &mut self,
    ptr: usize,
  ) {
    if ptr == 0 {
      return;
    }

    self.insert(ptr - UNIT);
    self.return_to_break();
  }

  fn allocate_zeroed(
    &mut self,
    count: usize,
    elem_size: usize,
  ) -> Result<usize, AllocError> {
    let size = array_size(count, elem_size)?;
    let ptr = self.allocate(size)?;

    self.provider.fill(ptr, size, 0);

    Ok(ptr)
  }
}
