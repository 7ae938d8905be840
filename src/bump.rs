use tracing::{debug, warn};

use crate::{
  align::padding,
  allocator::{Allocator, array_size},
  brk::{BreakProvider, WORD},
  config::BumpConfig,
  error::AllocError,
};

/// Bytes of the size prefix stored in front of every allocation.
pub const PREFIX: usize = WORD;

/// Payload sizes are padded to a multiple of this.
pub const ALIGN: usize = 4;

/// The region an active arena has claimed from the break.
///
/// ```text
///   begin                          current_end            end
///   ┌──────┬────────┬─────────────┬──────┬────────┬──────┬────────────┐
///   │ pad  │ prefix │ payload ... │ pad  │ prefix │ ...  │   unused   │
///   └──────┴────────┴─────────────┴──────┴────────┴──────┴────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaBounds {
  pub begin: usize,
  pub current_end: usize,
  pub end: usize,
}

/// Arena allocator that only ever reclaims its most recent allocation.
///
/// Releasing any other block leaks it: the arena has no free list and
/// cannot move the blocks that came after it. Release in reverse
/// allocation order to get memory back.
pub struct BumpAllocator<P: BreakProvider> {
  provider: P,
  config: BumpConfig,
  arena: Option<ArenaBounds>,
}

impl<P: BreakProvider> BumpAllocator<P> {
  pub fn new(provider: P) -> Self {
    Self::with_config(provider, BumpConfig::default())
  }

  pub fn with_config(
    provider: P,
    config: BumpConfig,
  ) -> Self {
    Self {
      provider,
      config,
      arena: None,
    }
  }

  /// Hands the claimed region back to the break, when nothing else moved
  /// it since, and returns the provider.
  pub fn destroy(mut self) -> P {
    if let Some(arena) = self.arena {
      self.give_back(arena.begin, arena.end);
    }

    self.provider
  }

  pub fn provider(&self) -> &P {
    &self.provider
  }

  pub fn provider_mut(&mut self) -> &mut P {
    &mut self.provider
  }

  pub fn config(&self) -> BumpConfig {
    self.config
  }

  /// `None` until the first allocation and again after the arena drains.
  pub fn bounds(&self) -> Option<ArenaBounds> {
    self.arena
  }

  fn alloc_size(size: usize) -> Result<usize, AllocError> {
    size
      .checked_add(padding(size, ALIGN))
      .and_then(|n| n.checked_add(PREFIX))
      .ok_or(AllocError::SizeOverflow { count: 1, size })
  }

  fn growth(
    &self,
    alloc_size: usize,
  ) -> Result<(usize, isize), AllocError> {
    self
      .config
      .grown(alloc_size)
      .and_then(|bytes| isize::try_from(bytes).ok().map(|increment| (bytes, increment)))
      .ok_or(AllocError::SizeOverflow {
        count: 1,
        size: alloc_size,
      })
  }

  fn claim(
    &mut self,
    alloc_size: usize,
  ) -> Result<ArenaBounds, AllocError> {
    let (bytes, increment) = self.growth(alloc_size)?;
    let begin = self.provider.adjust(increment)?;

    debug!(begin, bytes, "bump arena claimed");

    Ok(ArenaBounds {
      begin,
      current_end: begin,
      end: begin + bytes,
    })
  }

  fn extend(
    &mut self,
    arena: ArenaBounds,
    alloc_size: usize,
  ) -> Result<ArenaBounds, AllocError> {
    let (bytes, increment) = self.growth(alloc_size)?;
    let old = self.provider.adjust(increment)?;

    if old != arena.end {
      warn!(expected = arena.end, found = old, "break moved under the bump arena");

      if let Err(err) = self.provider.adjust(-increment) {
        warn!(%err, "could not hand back discontiguous chunk");
      }

      return Err(AllocError::Discontiguous {
        expected: arena.end,
        found: old,
      });
    }

    debug!(end = arena.end + bytes, bytes, "bump arena extended");

    Ok(ArenaBounds {
      end: arena.end + bytes,
      ..arena
    })
  }

  /// Returns `[from, to)` to the break if `to` is still the break.
  fn give_back(
    &mut self,
    from: usize,
    to: usize,
  ) -> bool {
    if self.provider.current().ok() != Some(to) {
      return false;
    }

    let Ok(decrement) = isize::try_from(to - from) else {
      return false;
    };

    match self.provider.adjust(-decrement) {
      Ok(_) => true,
      Err(err) => {
        debug!(%err, from, to, "break refused to shrink");
        false
      }
    }
  }

  fn shrink(
    &mut self,
    arena: ArenaBounds,
  ) {
    if self.give_back(arena.current_end, arena.end) {
      debug!(end = arena.current_end, released = arena.end - arena.current_end, "bump arena shrunk");

      self.arena = Some(ArenaBounds {
        end: arena.current_end,
        ..arena
      });
    }
  }

  fn drain(
    &mut self,
    arena: ArenaBounds,
  ) {
    if self.give_back(arena.begin, arena.end) {
      debug!(begin = arena.begin, bytes = arena.end - arena.begin, "bump arena drained");

      self.arena = None;
    }
  }
}

impl<P: BreakProvider> Allocator for BumpAllocator<P> {
  fn allocate(
    &mut self,
    size: usize,
  ) -> Result<usize, AllocError> {
    let alloc_size = Self::alloc_size(size)?;

    let arena = match self.arena {
      None => self.claim(alloc_size)?,
      Some(arena) if arena.end - arena.current_end < alloc_size => self.extend(arena, alloc_size)?,
      Some(arena) => arena,
    };

    let current_end = arena.current_end + alloc_size;
    let ptr = current_end - size;

    self.arena = Some(ArenaBounds { current_end, ..arena });
    self.provider.write_word(ptr - PREFIX, size);

    Ok(ptr)
  }

  /// Reclaims `ptr` if it is the most recent allocation. Addresses outside
  /// the arena are ignored; older blocks are leaked.
  fn release(
    &mut self,
    ptr: usize,
  ) {
    let Some(arena) = self.arena else {
      return;
    };

    if ptr < arena.begin + PREFIX || ptr > arena.current_end {
      return;
    }

    let size = self.provider.read_word(ptr - PREFIX);

    if ptr.checked_add(size) != Some(arena.current_end) {
      warn!(ptr, current_end = arena.current_end, "released block is not the most recent allocation, leaking it");
      return;
    }

    let Some(start) = (ptr - PREFIX).checked_sub(padding(size, ALIGN)).filter(|&start| start >= arena.begin) else {
      return;
    };

    let arena = ArenaBounds {
      current_end: start,
      ..arena
    };
    self.arena = Some(arena);

    if start == arena.begin {
      self.drain(arena);
    } else if arena.end - start > self.config.shrink_threshold {
      self.shrink(arena);
    }
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
