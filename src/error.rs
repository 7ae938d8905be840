use thiserror::Error;

/// Reasons a break adjustment can be refused. The break is left unmoved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BreakError {
  #[error("break adjustment of {increment} bytes refused by the host")]
  Refused { increment: isize },

  #[error("cannot grow break by {requested} bytes, only {available} left")]
  OutOfMemory { requested: usize, available: usize },

  #[error("cannot shrink break by {requested} bytes, only {available} claimed")]
  Underflow { requested: usize, available: usize },
}

/// Allocation failures reported by both allocators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  #[error("memory exhausted: {0}")]
  Exhausted(#[from] BreakError),

  #[error("allocation of {count} x {size} bytes overflows the address space")]
  SizeOverflow { count: usize, size: usize },

  #[error("break moved by another client: expected {expected:#x}, found {found:#x}")]
  Discontiguous { expected: usize, found: usize },
}
