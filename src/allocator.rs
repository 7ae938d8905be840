use crate::error::AllocError;

/// The malloc/free/calloc surface shared by both allocators.
///
/// Addresses are plain `usize` values inside the allocator's break
/// provider; `0` is never returned.
pub trait Allocator {
  /// Reserves at least `size` bytes.
  fn allocate(
    &mut self,
    size: usize,
  ) -> Result<usize, AllocError>;

  /// Gives back memory obtained from [`allocate`](Self::allocate) or
  /// [`allocate_zeroed`](Self::allocate_zeroed) on the same allocator.
  fn release(
    &mut self,
    ptr: usize,
  );

  /// Reserves `count * elem_size` bytes, all set to zero.
  fn allocate_zeroed(
    &mut self,
    count: usize,
    elem_size: usize,
  ) -> Result<usize, AllocError>;
}

pub(crate) fn array_size(
  count: usize,
  elem_size: usize,
) -> Result<usize, AllocError> {
  count.checked_mul(elem_size).ok_or(AllocError::SizeOverflow {
    count,
    size: elem_size,
  })
}
