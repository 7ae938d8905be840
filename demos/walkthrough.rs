use brkalloc::{Allocator, BreakProvider, BumpAllocator, FreeListAllocator, SimulatedBreak};
use tracing_subscriber::EnvFilter;

const MAXLEN: usize = 64;
const ROWS: usize = 3;
const COLS: usize = 4;
const WORD: usize = std::mem::size_of::<usize>();

/// Prints where the break currently is.
fn print_program_break(
  label: &str,
  provider: &SimulatedBreak,
) {
  println!(
    "[{}] program break = {:#x} ({} of {} bytes claimed)",
    label,
    provider.brk(),
    provider.brk() - provider.base(),
    provider.capacity()
  );
}

/// Copies a greeting into a zeroed 64-byte buffer and reads it back.
fn greeting<A: Allocator>(
  allocator: &mut A,
  provider: impl Fn(&mut A) -> &mut SimulatedBreak,
) {
  let greeting = b"Hello, world!";

  let data = match allocator.allocate(MAXLEN) {
    Ok(ptr) => ptr,
    Err(err) => {
      println!("Failed to allocate {MAXLEN} bytes of memory: {err}");
      return;
    }
  };

  provider(&mut *allocator).fill(data, MAXLEN, 0);
  provider(&mut *allocator).write_bytes(data, greeting);

  let mut buf = [0u8; MAXLEN];
  provider(&mut *allocator).read_bytes(data, &mut buf);
  let len = buf.iter().position(|&b| b == 0).unwrap_or(MAXLEN);

  println!("String: '{}' at {:#x}", String::from_utf8_lossy(&buf[..len]), data);

  allocator.release(data);
}

/// Builds a ROWS x COLS matrix as an array of row pointers, numbers the
/// cells, prints them and frees rows before the row array.
fn matrix<A: Allocator>(
  allocator: &mut A,
  provider: impl Fn(&mut A) -> &mut SimulatedBreak,
) {
  let Ok(rows) = allocator.allocate(ROWS * WORD) else {
    println!("Failed to allocate the row array");
    return;
  };

  for r in 0..ROWS {
    let Ok(row) = allocator.allocate(COLS * 4) else {
      println!("Failed to allocate row {r}");
      return;
    };
    provider(&mut *allocator).write_word(rows + r * WORD, row);
  }

  let mut count = 0i32;
  for r in 0..ROWS {
    let row = provider(&mut *allocator).read_word(rows + r * WORD);
    for c in 0..COLS {
      count += 1;
      provider(&mut *allocator).write_bytes(row + c * 4, &count.to_ne_bytes());
    }
  }

  let mut cells = Vec::with_capacity(ROWS * COLS);
  for r in 0..ROWS {
    let row = provider(&mut *allocator).read_word(rows + r * WORD);
    for c in 0..COLS {
      let mut cell = [0u8; 4];
      provider(&mut *allocator).read_bytes(row + c * 4, &mut cell);
      cells.push(i32::from_ne_bytes(cell).to_string());
    }
  }
  println!("{}", cells.join(" "));

  for r in 0..ROWS {
    let row = provider(&mut *allocator).read_word(rows + r * WORD);
    allocator.release(row);
  }
  allocator.release(rows);
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  // --------------------------------------------------------------------
  // 1) Free-list allocator. Rows are freed in allocation order, which
  //    the free list handles by coalescing.
  // --------------------------------------------------------------------
  let mut heap = FreeListAllocator::new(SimulatedBreak::new(1 << 20));
  print_program_break("free list: start", heap.provider());

  greeting(&mut heap, |heap| heap.provider_mut());
  print_program_break("free list: after greeting", heap.provider());

  matrix(&mut heap, |heap| heap.provider_mut());
  print_program_break("free list: after matrix", heap.provider());

  let big = heap.allocate(64 * 1024);
  print_program_break("free list: after 64 KiB", heap.provider());
  if let Ok(big) = big {
    heap.release(big);
  }
  print_program_break("free list: end", heap.provider());

  // --------------------------------------------------------------------
  // 2) Bump allocator. The same matrix frees rows oldest first, so only
  //    the last row comes back; the rest leak and the arena never drains.
  // --------------------------------------------------------------------
  let mut arena = BumpAllocator::new(SimulatedBreak::new(1 << 20));
  print_program_break("bump: start", arena.provider());

  greeting(&mut arena, |arena| arena.provider_mut());
  print_program_break("bump: after greeting", arena.provider());

  matrix(&mut arena, |arena| arena.provider_mut());
  print_program_break("bump: after matrix", arena.provider());
  println!("bump: arena bounds = {:?}", arena.bounds());

  let provider = arena.destroy();
  print_program_break("bump: destroyed", &provider);
}
