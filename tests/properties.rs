use brkalloc::{Allocator, BreakProvider, BumpAllocator, FreeListAllocator, FreeListConfig, SimulatedBreak};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
  Allocate(usize),
  Zeroed(usize, usize),
  Release(usize),
}

fn op() -> impl Strategy<Value = Op> {
  prop_oneof![
    4 => (0usize..700).prop_map(Op::Allocate),
    1 => (0usize..24, 0usize..24).prop_map(|(count, size)| Op::Zeroed(count, size)),
    3 => any::<usize>().prop_map(Op::Release),
  ]
}

#[derive(Debug, Clone, Copy)]
struct Live {
  ptr: usize,
  size: usize,
  tag: u8,
}

impl Live {
  fn overlaps(
    &self,
    other: &Live,
  ) -> bool {
    self.size > 0 && other.size > 0 && self.ptr < other.ptr + other.size && other.ptr < self.ptr + self.size
  }
}

/// Applies `ops`, tagging every live block with its own byte pattern, and
/// checks after each step that live blocks are disjoint and intact.
fn run<A, P>(
  allocator: &mut A,
  provider: impl Fn(&mut A) -> &mut P,
  ops: &[Op],
  mut check: impl FnMut(&A, &[Live]) -> Result<(), TestCaseError>,
) -> Result<Vec<Live>, TestCaseError>
where
  A: Allocator,
  P: BreakProvider,
{
  let mut live: Vec<Live> = Vec::new();

  for (step, op) in ops.iter().enumerate() {
    let tag = (step % 255) as u8 + 1;

    match *op {
      Op::Allocate(size) => {
        let ptr = allocator.allocate(size).map_err(|e| TestCaseError::fail(e.to_string()))?;
        provider(&mut *allocator).fill(ptr, size, tag);
        live.push(Live { ptr, size, tag });
      }
      Op::Zeroed(count, size) => {
        let ptr = allocator
          .allocate_zeroed(count, size)
          .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let mut buf = vec![0xFFu8; count * size];
        provider(&mut *allocator).read_bytes(ptr, &mut buf);
        prop_assert!(buf.iter().all(|&b| b == 0));

        provider(&mut *allocator).fill(ptr, count * size, tag);
        live.push(Live {
          ptr,
          size: count * size,
          tag,
        });
      }
      Op::Release(pick) => {
        if live.is_empty() {
          continue;
        }

        let block = live.remove(pick % live.len());
        let mut buf = vec![0u8; block.size];
        provider(&mut *allocator).read_bytes(block.ptr, &mut buf);
        prop_assert!(buf.iter().all(|&b| b == block.tag), "block {:#x} was overwritten", block.ptr);

        allocator.release(block.ptr);
      }
    }

    if let Some(new) = live.last().copied() {
      for other in &live[..live.len() - 1] {
        prop_assert!(!new.overlaps(other), "{new:?} overlaps {other:?}");
        prop_assert_ne!(new.ptr, other.ptr);
      }
    }

    check(&*allocator, live.as_slice())?;
  }

  Ok(live)
}

proptest! {
  #[test]
  fn free_list_blocks_stay_disjoint(ops in prop::collection::vec(op(), 1..80), min_chunk_units in 1usize..2048) {
    let mut heap = FreeListAllocator::with_config(SimulatedBreak::new(1 << 22), FreeListConfig { min_chunk_units });

    let live = run(&mut heap, |heap| heap.provider_mut(), &ops, |heap, _| {
      heap.check_invariants().map_err(|e| TestCaseError::fail(e.to_string()))
    })?;

    for block in &live {
      heap.release(block.ptr);
    }

    heap.check_invariants().map_err(|e| TestCaseError::fail(e.to_string()))?;
    prop_assert_eq!(heap.free_blocks().count(), 0);
    prop_assert_eq!(heap.provider().brk(), heap.provider().base());
  }

  #[test]
  fn bump_never_rewinds_below_live_blocks(ops in prop::collection::vec(op(), 1..80)) {
    let mut arena = BumpAllocator::new(SimulatedBreak::new(1 << 22));

    run(&mut arena, |arena| arena.provider_mut(), &ops, |arena, live| {
      match arena.bounds() {
        Some(bounds) => {
          prop_assert!(bounds.begin <= bounds.current_end && bounds.current_end <= bounds.end);
          prop_assert!(bounds.end <= arena.provider().brk());

          for block in live {
            prop_assert!(block.ptr + block.size <= bounds.current_end);
          }
        }
        None => prop_assert!(live.is_empty()),
      }

      Ok(())
    })?;
  }
}
