//! Tunables for both allocators.

/// Settings for [`FreeListAllocator`](crate::FreeListAllocator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeListConfig {
  /// Smallest number of header units requested from the break at once.
  /// Larger chunks mean fewer break adjustments.
  pub min_chunk_units: usize,
}

impl Default for FreeListConfig {
  fn default() -> Self {
    Self { min_chunk_units: 1024 }
  }
}

/// Settings for [`BumpAllocator`](crate::BumpAllocator).
///
/// Every growth claims `alloc_size * growth_numerator / growth_denominator`
/// bytes, rounded up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BumpConfig {
  pub growth_numerator: usize,
  pub growth_denominator: usize,
  /// Unused bytes above `current_end` tolerated before the arena gives
  /// them back to the break.
  pub shrink_threshold: usize,
}

impl BumpConfig {
  pub(crate) fn grown(
    &self,
    alloc_size: usize,
  ) -> Option<usize> {
    alloc_size
      .checked_mul(self.growth_numerator)
      .map(|n| n.div_ceil(self.growth_denominator.max(1)))
      .map(|n| n.max(alloc_size))
  }
}

impl Default for BumpConfig {
  fn default() -> Self {
    Self {
      growth_numerator: 3,
      growth_denominator: 2,
      shrink_threshold: 4096,
    }
  }
}
