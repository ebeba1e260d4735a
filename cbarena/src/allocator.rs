use core::alloc::Layout;
use core::ptr::NonNull;

use crate::arena::Arena;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    #[error("Zero-sized allocations are not supported")]
    ZeroSize,
    #[error("Alignment {align} is not a power of two")]
    InvalidAlignment { align: usize },
    #[error("Out of memory: requested {requested} bytes, {remaining} bytes remaining")]
    OutOfMemory { requested: usize, remaining: usize },
}

/// An allocation strategy.
///
/// Containers are generic over this trait (or take a `&dyn Allocator`), so that they don't care
/// where their memory comes from. [`Arena`] is the strategy this crate provides.
///
/// # Safety
///
/// Memory returned by [`Allocator::allocate`] must be valid for reads and writes of
/// `layout.size()` bytes, aligned to `layout.align()`, and must not overlap any other live
/// allocation from the same allocator. It stays valid until it is deallocated, or until the
/// allocator reclaims it by other means documented by the implementation (e.g.
/// [`Arena::reset`]).
pub unsafe trait Allocator {
    /// Allocates memory described by `layout`. Zero-sized layouts are rejected with
    /// [`AllocError::ZeroSize`].
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError>;

    /// Gives `bytes` of memory back to the allocator.
    ///
    /// Strategies that track individual allocations need `ptr`. Strategies that don't, like the
    /// arena, accept `None`.
    ///
    /// # Safety
    ///
    /// If given, `ptr` must have been returned by [`Allocator::allocate`] on this allocator with a
    /// layout of size `bytes`, and must not be used afterwards.
    unsafe fn deallocate(&self, bytes: usize, ptr: Option<NonNull<u8>>);

    /// Returns the arena this allocator is, if it is one.
    fn as_arena(&self) -> Option<&Arena> {
        None
    }
}

unsafe impl<A: Allocator + ?Sized> Allocator for &A {
    #[inline(always)]
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        A::allocate(*self, layout)
    }

    #[inline(always)]
    unsafe fn deallocate(&self, bytes: usize, ptr: Option<NonNull<u8>>) {
        unsafe { A::deallocate(*self, bytes, ptr) }
    }

    #[inline(always)]
    fn as_arena(&self) -> Option<&Arena> {
        A::as_arena(*self)
    }
}

/// Allocates `bytes` aligned to `alignment` from any allocator.
///
/// `bytes` must be nonzero and `alignment` a power of two. Running out of memory is fatal.
#[track_caller]
pub fn alloc<A: Allocator + ?Sized>(allocator: &A, bytes: usize, alignment: usize) -> NonNull<u8> {
    assert!(bytes > 0, "Can't allocate zero bytes");
    assert!(alignment.is_power_of_two(), "Alignment {alignment} is not a power of two");

    let layout = match Layout::from_size_align(bytes, alignment) {
        Ok(layout) => layout,
        Err(_) => fatal_alloc(AllocError::OutOfMemory {
            requested: bytes,
            remaining: 0,
        }),
    };

    match allocator.allocate(layout) {
        Ok(p) => p.cast(),
        Err(err) => fatal_alloc(err),
    }
}

/// Allocates uninitialized space for `count` values of `T`. Running out of memory is fatal.
#[track_caller]
pub fn alloc_array<T, A: Allocator + ?Sized>(allocator: &A, count: usize) -> NonNull<T> {
    let layout = match Layout::array::<T>(count) {
        Ok(layout) => layout,
        Err(_) => fatal_alloc(AllocError::OutOfMemory {
            requested: usize::MAX,
            remaining: 0,
        }),
    };

    alloc(allocator, layout.size(), layout.align()).cast()
}

/// Gives `bytes` back to the allocator. `ptr` may be omitted for strategies that don't need it.
///
/// # Safety
///
/// See [`Allocator::deallocate`]. Omitting `ptr` for a strategy that needs it leaks the memory.
#[track_caller]
pub unsafe fn dealloc<A: Allocator + ?Sized>(allocator: &A, bytes: usize, ptr: Option<NonNull<u8>>) {
    assert!(bytes > 0, "Can't deallocate zero bytes");
    unsafe { allocator.deallocate(bytes, ptr) };
}

#[cold]
#[track_caller]
pub(crate) fn fatal_alloc(err: AllocError) -> ! {
    log::error!("{err}");
    panic!("{err}");
}
