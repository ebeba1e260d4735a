use core::alloc::Layout;
use core::cell::Cell;
use core::ptr::NonNull;

use cbbits::checked_align_up;

use crate::allocator::AllocError;
use crate::allocator::Allocator;
use crate::memory::VirtualMemory;
use crate::memory::VirtualMemoryBlock;
use crate::memory::VirtualMemoryError;

pub const ARENA_HEADER_SIZE: usize = size_of::<ArenaHeader>();

// Lives at the very start of the arena's own virtual memory block, so releasing the block releases
// the header too.
#[repr(C, align(16))]
struct ArenaHeader {
    block_size: usize,

    base: NonNull<u8>,
    size: usize,

    last: Cell<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Failed to create arena: {0}")]
pub struct ArenaInitError(#[from] pub VirtualMemoryError);

/// A fixed-size bump allocator carved out of a single virtual memory block. Implements
/// [`Allocator`].
///
/// Allocating bumps an offset (`last`) into the block. Individual allocations are never
/// reclaimed, [`Allocator::deallocate`] does nothing. Instead, memory is given back in bulk by
/// moving the offset back: [`Arena::pop`] by a byte count, [`Arena::set_checkpoint`] to an offset
/// previously observed with [`Arena::checkpoint`], or [`Arena::reset`] to zero.
///
/// The arena never grows. Once the block is exhausted, allocations fail.
///
/// Frame-scoped allocation looks like this:
///
/// ```
/// use cbarena::Arena;
/// use cbarena::VirtualMemory;
///
/// let vm = VirtualMemory::new();
/// let mut arena = Arena::new(vm, 1 << 20);
///
/// for _ in 0..3 {
///     let frame_start = arena.checkpoint();
///
///     let scratch = arena.alloc(4096, 16);
///     unsafe { scratch.as_ptr().write_bytes(0xFF, 4096) };
///
///     arena.set_checkpoint(frame_start);
/// }
///
/// assert!(arena.allocated_size() == 0);
/// arena.destroy();
/// ```
#[derive(Debug)]
pub struct Arena {
    header: NonNull<ArenaHeader>,
    vm: VirtualMemory,
}

impl Arena {
    /// Creates an arena able to hold at least `minimum_bytes`, rounded up to the page size.
    ///
    /// The arena reserves one virtual memory block, slightly larger than that, because the arena
    /// stores its own bookkeeping at the front of the block. Failing to reserve is fatal.
    #[track_caller]
    pub fn new(vm: VirtualMemory, minimum_bytes: usize) -> Self {
        match Self::try_new(vm, minimum_bytes) {
            Ok(arena) => arena,
            Err(err) => {
                log::error!("{err}");
                panic!("{err}");
            }
        }
    }

    /// Like [`Self::new`], but reports failure to reserve memory as an error.
    pub fn try_new(vm: VirtualMemory, minimum_bytes: usize) -> Result<Self, ArenaInitError> {
        assert!(minimum_bytes > 0, "Can't create an empty arena");

        // The usable size is what a header-less arena would have gotten, so that the header never
        // eats into capacity the caller asked for.
        let size = vm.round_to_page(minimum_bytes).ok_or(VirtualMemoryError::SizeOverflow {
            requested: minimum_bytes,
            page_size: vm.page_size(),
        })?;
        let block_size = size
            .checked_add(ARENA_HEADER_SIZE)
            .ok_or(VirtualMemoryError::SizeOverflow {
                requested: size,
                page_size: vm.page_size(),
            })?;

        let block = vm.try_reserve(block_size)?;
        debug_assert!(block.size() >= ARENA_HEADER_SIZE + size);
        debug_assert!(block.ptr().addr().get() % align_of::<ArenaHeader>() == 0);

        let header: NonNull<ArenaHeader> = block.ptr().cast();

        // SAFETY: The block is at least ARENA_HEADER_SIZE + size bytes long.
        let base = unsafe { block.ptr().add(ARENA_HEADER_SIZE) };

        // SAFETY: The block is freshly reserved, large enough for the header and aligned at least
        // to the page size, which is more than the header needs.
        unsafe {
            header.write(ArenaHeader {
                block_size: block.size(),

                base,
                size,

                last: Cell::new(0),
            });
        }

        log::debug!(
            "Created arena with {size} usable bytes in a {} byte block at {:p}",
            block.size(),
            block.ptr(),
        );

        Ok(Self { header, vm })
    }

    /// Returns the arena bound to `allocator`. Calling this with any other kind of allocator is a
    /// bug and panics.
    #[track_caller]
    pub fn from_allocator<A: Allocator + ?Sized>(allocator: &A) -> &Arena {
        match allocator.as_arena() {
            Some(arena) => arena,
            None => {
                log::error!("Allocator is not bound to an arena");
                panic!("Allocator is not bound to an arena");
            }
        }
    }

    #[inline]
    fn header(&self) -> &ArenaHeader {
        // SAFETY: The header lives as long as the block, which lives as long as we do.
        unsafe { self.header.as_ref() }
    }

    /// Returns the start of the usable memory, right after the header.
    #[inline]
    pub fn base(&self) -> NonNull<u8> {
        self.header().base
    }

    /// Returns the current offset, i.e. the amount of allocated memory in bytes, including
    /// alignment padding.
    #[inline]
    pub fn allocated_size(&self) -> usize {
        self.header().last.get()
    }

    /// Returns the amount of usable memory in bytes.
    #[inline]
    pub fn reserved_size(&self) -> usize {
        self.header().size
    }

    #[inline]
    pub fn remaining_size(&self) -> usize {
        let header = self.header();
        header.size - header.last.get()
    }

    /// Returns the size of the underlying virtual memory block, including the header.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.header().block_size
    }

    /// Attempts to allocate a block of memory.
    ///
    /// The allocation starts at the current offset rounded up so that the returned pointer is
    /// aligned to `layout.align()`. Fails with [`AllocError::OutOfMemory`], if the allocation
    /// would not fit, leaving the arena untouched. An allocation ending exactly at the end of the
    /// arena fits.
    #[inline(always)]
    pub fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        if layout.size() == 0 {
            return Err(AllocError::ZeroSize);
        }

        let header = self.header();
        let base = header.base.addr().get();
        let last = header.last.get();

        debug_assert!(last <= header.size);

        let out_of_memory = AllocError::OutOfMemory {
            requested: layout.size(),
            remaining: header.size - last,
        };

        // Align the address, not just the offset, so that alignments larger than the header's
        // also hold.
        let start_addr = checked_align_up(base + last, layout.align()).ok_or(out_of_memory)?;
        let start = start_addr - base;
        let end = start.checked_add(layout.size()).ok_or(out_of_memory)?;

        if end > header.size {
            return Err(out_of_memory);
        }

        header.last.set(end);

        // SAFETY: start + size <= header.size, so the pointer stays within the block.
        let ptr = unsafe { header.base.add(start) };

        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    /// Allocates `bytes` aligned to `alignment`. Running out of memory is fatal.
    #[inline]
    #[track_caller]
    pub fn alloc(&self, bytes: usize, alignment: usize) -> NonNull<u8> {
        crate::allocator::alloc(self, bytes, alignment)
    }

    /// Returns the current offset. Pass it to [`Self::set_checkpoint`] later to free everything
    /// allocated in between.
    #[inline]
    pub fn checkpoint(&self) -> usize {
        self.header().last.get()
    }

    /// Moves the offset back by `bytes`. Popping more than is allocated panics.
    #[inline]
    #[track_caller]
    pub fn pop(&mut self, bytes: usize) {
        // SAFETY: This is fine, because we have a &mut.
        unsafe { self.pop_unchecked(bytes) };
    }

    /// Moves the offset back by `bytes`. Popping more than is allocated panics.
    ///
    /// # Safety
    ///
    /// Memory in the popped range becomes eligible to be handed out again, but this is not
    /// enforced by Rust's lifetime tracking. Nothing may use data stored there anymore.
    #[inline]
    #[track_caller]
    pub unsafe fn pop_unchecked(&self, bytes: usize) {
        let header = self.header();
        let last = header.last.get();

        if bytes > last {
            log::error!("Can't pop {bytes} bytes from arena with only {last} bytes allocated");
            panic!("Can't pop {bytes} bytes from arena with only {last} bytes allocated");
        }

        header.last.set(last - bytes);
    }

    /// Sets the offset to a value previously returned by [`Self::checkpoint`].
    #[inline]
    #[track_caller]
    pub fn set_checkpoint(&mut self, offset: usize) {
        // SAFETY: This is fine, because we have a &mut.
        unsafe { self.set_checkpoint_unchecked(offset) };
    }

    /// Sets the offset to a value previously returned by [`Self::checkpoint`].
    ///
    /// This only requires a shared reference, which makes it possible to rewind the arena while
    /// long-lived containers still borrow it. Offsets beyond the arena's size panic.
    ///
    /// # Safety
    ///
    /// After rewinding, data stored above the offset becomes eligible to overwrite, but this is
    /// not enforced by Rust's lifetime tracking. Care must be taken to not rewind the arena below
    /// where live data resides.
    #[inline]
    #[track_caller]
    pub unsafe fn set_checkpoint_unchecked(&self, offset: usize) {
        let header = self.header();

        if offset > header.size {
            log::error!("Checkpoint {offset} is outside of arena of size {}", header.size);
            panic!("Checkpoint {offset} is outside of arena of size {}", header.size);
        }

        header.last.set(offset);
    }

    /// Resets the arena, invalidating all previous allocations.
    #[inline]
    pub fn reset(&mut self) {
        self.set_checkpoint(0);
    }

    /// Resets the arena, invalidating all previous allocations.
    ///
    /// # Safety
    ///
    /// See [`Self::set_checkpoint_unchecked`].
    #[inline]
    pub unsafe fn reset_unchecked(&self) {
        unsafe { self.set_checkpoint_unchecked(0) };
    }

    /// Releases the arena's memory back to the OS. Dropping the arena does the same.
    pub fn destroy(self) {
        log::debug!(
            "Destroying arena at {:p} with {} of {} bytes allocated",
            self.header,
            self.allocated_size(),
            self.reserved_size(),
        );

        drop(self);
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        let block_size = self.header().block_size;

        // SAFETY: We reserved this block in Arena::try_new, and the header is at its start. The
        // header is not accessed after this.
        let block = unsafe { VirtualMemoryBlock::from_raw_parts(self.header.cast(), block_size) };
        self.vm.release(block);
    }
}

unsafe impl Allocator for Arena {
    #[inline(always)]
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        Arena::allocate(self, layout)
    }

    // Arenas don't reclaim individual allocations. Use pop, set_checkpoint or reset.
    #[inline(always)]
    unsafe fn deallocate(&self, _bytes: usize, _ptr: Option<NonNull<u8>>) {}

    #[inline(always)]
    fn as_arena(&self) -> Option<&Arena> {
        Some(self)
    }
}
