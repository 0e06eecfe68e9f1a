//! # rarena - A First-Fit Arena Allocator
//!
//! This crate provides a **first-fit heap** with explicit block headers,
//! built on top of coarse memory regions ("arenas") mapped from the OS with
//! `mmap(2)`.
//!
//! ## Overview
//!
//! Each arena is carved into consecutive blocks. A block is a header followed
//! by its payload, and the blocks of an arena always cover it exactly:
//!
//! ```text
//!   Arena (4096 bytes by default):
//!
//!   ┌──────┬─────────────┬──────┬────────────────┬──────┬──────────────────┐
//!   │ Hdr  │  in use     │ Hdr  │     free       │ Hdr  │     in use       │
//!   │first │  100 bytes  │      │   200 bytes    │      │  rest, last      │
//!   └──────┴─────────────┴──────┴────────────────┴──────┴──────────────────┘
//!          ▲
//!          └── Pointer returned to user
//! ```
//!
//! - **allocate** walks the arenas newest first and takes the first free
//!   block that is large enough, splitting off the slack as a new free block.
//!   If no arena fits, a new one is mapped.
//! - **release** marks the block free and merges it with free neighbours.
//! - **reallocate** shrinks or grows in place when it can, and otherwise
//!   moves the payload to a new block.
//!
//! ```text
//!   Splitting (allocate 100 from a 400 byte free block):
//!
//!   ┌──────┬──────────────────────────────┐
//!   │ Hdr  │        free, 400             │
//!   └──────┴──────────────────────────────┘
//!                       │
//!                       ▼
//!   ┌──────┬──────────┬──────┬────────────┐
//!   │ Hdr  │ used,100 │ Hdr  │ free, 284  │
//!   └──────┴──────────┴──────┴────────────┘
//!
//!   Coalescing (release the middle block):
//!
//!   ┌──────┬──────────┬──────┬──────────┬──────┬──────────┐
//!   │ Hdr  │ free     │ Hdr  │ released │ Hdr  │ free     │
//!   └──────┴──────────┴──────┴──────────┴──────┴──────────┘
//!                       │
//!                       ▼
//!   ┌──────┬────────────────────────────────────────────────┐
//!   │ Hdr  │ free, all three payloads plus two headers      │
//!   └──────┴────────────────────────────────────────────────┘
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   rarena
//!   ├── align      - 4 byte size rounding (align!, checked_align)
//!   ├── block      - Block header and read-only BlockInfo
//!   ├── index      - Header address -> (arena, offset) lookup
//!   ├── arena      - Arenas and the manager that maps them
//!   ├── config     - HeapConfig
//!   ├── error      - HeapError
//!   └── heap       - Heap, the allocate / release / reallocate facade
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rarena::Heap;
//!
//! let mut heap = Heap::new();
//!
//! let ptr = heap.allocate(64).unwrap().expect("non-zero size");
//! unsafe { ptr.as_ptr().write_bytes(0xAB, 64) };
//!
//! let ptr = heap.reallocate(ptr.as_ptr(), 256).unwrap().unwrap();
//! assert_eq!(unsafe { *ptr.as_ptr().add(63) }, 0xAB);
//!
//! heap.release(ptr.as_ptr());
//! print!("{heap}");
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded only**: `Heap` is neither `Send` nor `Sync`
//! - **No release to the OS**: arenas are unmapped only when the heap drops
//! - **No double-free detection**: releasing a reused block corrupts state
//! - **4 byte alignment**: payloads are not suitable for wider types
//! - **Unix-only**: requires `libc` and `mmap`

pub mod align;
pub mod arena;
pub mod block;
mod coalesce;
pub mod config;
pub mod error;
mod first_fit;
mod heap;
mod index;
mod os;
mod split;

pub use arena::{Arena, Blocks};
pub use block::{BlockInfo, HEADER_SIZE};
pub use config::HeapConfig;
pub use error::HeapError;
pub use heap::Heap;
pub use index::ArenaId;
