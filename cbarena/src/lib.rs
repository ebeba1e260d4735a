#![no_std]

//! This library contains [`Arena`], a fixed-size bump allocator that lives in a single block of
//! virtual memory, the [`Allocator`] trait it implements, and [`VirtualMemory`], the provider it
//! gets its memory from.
//!
//! Containers should be generic over [`Allocator`] (or take a `&dyn Allocator`), so that they
//! don't depend on the arena directly.

extern crate alloc;

mod allocator;
mod arena;
mod memory;

pub use crate::allocator::AllocError;
pub use crate::allocator::Allocator;
pub use crate::allocator::alloc;
pub use crate::allocator::alloc_array;
pub use crate::allocator::dealloc;
pub use crate::arena::ARENA_HEADER_SIZE;
pub use crate::arena::Arena;
pub use crate::arena::ArenaInitError;
pub use crate::memory::FALLBACK_PAGE_SIZE;
pub use crate::memory::VirtualMemory;
pub use crate::memory::VirtualMemoryBlock;
pub use crate::memory::VirtualMemoryError;
