//! # brkalloc - Memory Allocators on a Single Break
//!
//! This crate provides two allocators that get all of their memory from one
//! primitive: moving the end of a contiguous address range (the program
//! break) up or down.
//!
//! ```text
//!   Address space managed through the break:
//!
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │ claimed region                           │    unclaimed      │
//!   └──────────────────────────────────────────────────────────────┘
//!   ▲                                          ▲
//!   │                                          │
//!  origin                                    break
//!                                      adjust(+n) moves it right,
//!                                      adjust(-n) moves it left
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   brkalloc
//!   ├── align      - Alignment helpers (align!, checked_align, padding)
//!   ├── allocator  - The malloc/free/calloc trait both allocators implement
//!   ├── block      - Free-list boundary tag layout
//!   ├── brk        - BreakProvider trait and the sbrk(2) provider
//!   ├── bump       - BumpAllocator (tail-only reclamation)
//!   ├── config     - Tunables for both allocators
//!   ├── error      - BreakError / AllocError
//!   ├── free_list  - FreeListAllocator (next-fit, coalescing)
//!   └── simulated  - In-memory break for tests and demos
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brkalloc::{Allocator, BreakProvider, FreeListAllocator, SimulatedBreak};
//!
//! let mut heap = FreeListAllocator::new(SimulatedBreak::new(1 << 20));
//!
//! let ptr = heap.allocate(64).unwrap();
//! heap.provider_mut().write_bytes(ptr, b"Hello, world!");
//!
//! heap.release(ptr);
//!
//! // Everything was released, so the break is back where it started.
//! assert_eq!(heap.provider().brk(), heap.provider().base());
//! ```
//!
//! ## Free List vs. Bump
//!
//! ```text
//!   FreeListAllocator                    BumpAllocator
//!
//!   ┌────┬──────┬────┬──────┬────┐       ┌────┬────┬────┬──────────┐
//!   │used│ free │used│ free │used│       │ A1 │ A2 │ A3 │  unused  │
//!   └────┴──────┴────┴──────┴────┘       └────┴────┴────┴──────────┘
//!          ▲           ▲                                ▲
//!          └─ linked ──┘                           current_end
//!
//!   any block can be released,           only the newest block is
//!   neighbors are merged                 reclaimed, others leak
//! ```
//!
//! Pick one discipline per provider; addresses from one allocator mean
//! nothing to the other.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: allocators take `&mut self` and do no locking
//! - **No validation of released addresses** on the free-list allocator
//! - **Exclusive break**: each allocator assumes it is the only client of its
//!   provider

pub mod align;
mod allocator;
mod block;
mod brk;
mod bump;
mod config;
mod error;
mod free_list;
mod simulated;

pub use allocator::Allocator;
pub use block::{Header, UNIT};
#[cfg(unix)]
pub use brk::SbrkBreak;
pub use brk::BreakProvider;
pub use bump::{ALIGN, ArenaBounds, BumpAllocator, PREFIX};
pub use config::{BumpConfig, FreeListConfig};
pub use error::{AllocError, BreakError};
pub use free_list::{FreeBlock, FreeListAllocator, InvariantViolation};
pub use simulated::{DEFAULT_BASE, SimulatedBreak};
