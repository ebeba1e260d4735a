#![no_std]

//! A growable array for memory handed out by an [`cbarena::Allocator`], usually an arena.

mod dynarray;

pub use dynarray::DynArray;
