use core::ffi::c_void;
use core::ptr;
use core::ptr::NonNull;

use cbbits::checked_align_up;

/// Page size assumed on platforms where we can't ask the OS.
pub const FALLBACK_PAGE_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VirtualMemoryError {
    #[error("Requested {requested} bytes overflow when rounded up to page size {page_size}")]
    SizeOverflow { requested: usize, page_size: usize },
    #[error("Failed to reserve {size} bytes of virtual memory")]
    ReserveFailed { size: usize },
    #[error("Failed to release {size} bytes of virtual memory at {addr:#x}")]
    ReleaseFailed { addr: usize, size: usize },
    #[error("Attempted to release a null pointer")]
    NullPointer,
}

/// A contiguous, readable and writable region of memory reserved from the OS.
///
/// The block does not release itself when dropped. It has to be given back to the
/// [`VirtualMemory`] that reserved it.
#[derive(Debug, PartialEq, Eq)]
pub struct VirtualMemoryBlock {
    ptr: NonNull<u8>,
    size: usize,
}

impl VirtualMemoryBlock {
    /// Reassembles a block from its parts.
    ///
    /// # Safety
    ///
    /// `ptr` and `size` must describe a block previously returned by [`VirtualMemory::reserve`]
    /// (or [`VirtualMemory::try_reserve`]) that wasn't released yet.
    pub unsafe fn from_raw_parts(ptr: NonNull<u8>, size: usize) -> Self {
        Self { ptr, size }
    }

    #[inline]
    pub fn ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Size in bytes, always a multiple of the page size the block was reserved with.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

/// Provider of virtual memory blocks.
///
/// The page size is queried once, when the provider is created, and then travels with the value.
/// Create one early and hand copies of it to everything that needs to reserve memory.
///
/// Blocks are reserved with `mmap(2)` on Unix and `VirtualAlloc` on Windows. Elsewhere, or with
/// the `heap_fallback` feature, they are zeroed page-aligned heap allocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualMemory {
    page_size: usize,
}

impl VirtualMemory {
    /// Creates a provider using the page size of the current system.
    pub fn new() -> Self {
        Self::with_page_size(os::page_size())
    }

    /// Creates a provider that rounds reservations to `page_size`, which must be a power of two.
    ///
    /// This doesn't change the OS page size. Reservations smaller than what the OS uses internally
    /// will still reserve (and release) whole OS pages.
    pub fn with_page_size(page_size: usize) -> Self {
        assert!(page_size.is_power_of_two(), "Unsupported page size {page_size}");
        Self { page_size }
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Rounds `bytes` up to the nearest multiple of the page size.
    #[inline]
    pub fn round_to_page(&self, bytes: usize) -> Option<usize> {
        checked_align_up(bytes, self.page_size)
    }

    /// Reserves a zero-initialized block of at least `minimum_bytes`, rounded up to the page size.
    pub fn try_reserve(&self, minimum_bytes: usize) -> Result<VirtualMemoryBlock, VirtualMemoryError> {
        assert!(minimum_bytes > 0, "Can't reserve an empty block of virtual memory");

        let size = self
            .round_to_page(minimum_bytes)
            .ok_or(VirtualMemoryError::SizeOverflow {
                requested: minimum_bytes,
                page_size: self.page_size,
            })?;

        let ptr = os::reserve(size, self.page_size);
        let ptr = NonNull::new(ptr as *mut u8).ok_or(VirtualMemoryError::ReserveFailed { size })?;

        log::debug!("Reserved {size} bytes of virtual memory at {ptr:p}");

        Ok(VirtualMemoryBlock { ptr, size })
    }

    /// Reserves a zero-initialized block of at least `minimum_bytes`, rounded up to the page size.
    ///
    /// There's nothing sensible to do when the OS runs out of memory, so failing to reserve is
    /// fatal.
    #[track_caller]
    pub fn reserve(&self, minimum_bytes: usize) -> VirtualMemoryBlock {
        match self.try_reserve(minimum_bytes) {
            Ok(block) => block,
            Err(err) => fatal(err),
        }
    }

    /// Gives the block back to the OS.
    pub fn try_release(&self, block: VirtualMemoryBlock) -> Result<(), VirtualMemoryError> {
        let VirtualMemoryBlock { ptr, size } = block;

        // SAFETY: Blocks can only be obtained by reserving, and releasing consumes them.
        if unsafe { !os::release(ptr.as_ptr() as *mut c_void, size, self.page_size) } {
            return Err(VirtualMemoryError::ReleaseFailed {
                addr: ptr.addr().get(),
                size,
            });
        }

        log::debug!("Released {size} bytes of virtual memory at {ptr:p}");

        Ok(())
    }

    /// Gives the block back to the OS. Failing to release is fatal.
    #[track_caller]
    pub fn release(&self, block: VirtualMemoryBlock) {
        if let Err(err) = self.try_release(block) {
            fatal(err);
        }
    }

    /// Releases a block described by a raw pointer and a size. Releasing a null pointer, or a
    /// region the OS doesn't think we own, is fatal.
    ///
    /// # Safety
    ///
    /// Unless null, `ptr` and `size` must describe a block reserved by this provider that wasn't
    /// released yet. Nothing may access the block afterwards.
    #[track_caller]
    pub unsafe fn release_raw(&self, ptr: *mut u8, size: usize) {
        let Some(ptr) = NonNull::new(ptr) else {
            fatal(VirtualMemoryError::NullPointer);
        };

        // SAFETY: Upheld by caller.
        let block = unsafe { VirtualMemoryBlock::from_raw_parts(ptr, size) };
        self.release(block);
    }
}

impl Default for VirtualMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[cold]
#[track_caller]
fn fatal(err: VirtualMemoryError) -> ! {
    log::error!("{err}");
    panic!("{err}");
}

#[cfg(all(target_family = "unix", not(feature = "heap_fallback")))]
mod os {
    use super::*;

    pub fn page_size() -> usize {
        use libc::_SC_PAGESIZE;
        use libc::sysconf;

        let page_size = unsafe { sysconf(_SC_PAGESIZE) };
        if page_size < 1 {
            log::warn!("sysconf reported page size {page_size}, using {FALLBACK_PAGE_SIZE}");
            return FALLBACK_PAGE_SIZE;
        }

        page_size as usize
    }

    pub fn reserve(size: usize, _page_size: usize) -> *mut c_void {
        use libc::MAP_ANONYMOUS;
        use libc::MAP_FAILED;
        use libc::MAP_PRIVATE;
        use libc::PROT_READ;
        use libc::PROT_WRITE;
        use libc::mmap;

        // Anonymous mappings are zero-filled. Pages are mapped in by the OS fault handlers when
        // first touched, so there's no separate commit step.
        let p = unsafe {
            mmap(
                ptr::null_mut(),
                size,
                PROT_READ | PROT_WRITE,
                MAP_PRIVATE | MAP_ANONYMOUS,
                -1,
                0,
            )
        };

        if p == MAP_FAILED { ptr::null_mut() } else { p }
    }

    pub unsafe fn release(ptr: *mut c_void, size: usize, _page_size: usize) -> bool {
        use libc::munmap;

        unsafe { munmap(ptr, size) == 0 }
    }
}

#[cfg(all(target_family = "windows", not(feature = "heap_fallback")))]
mod os {
    use super::*;

    pub fn page_size() -> usize {
        use windows_sys::Win32::System::SystemInformation::GetSystemInfo;
        use windows_sys::Win32::System::SystemInformation::SYSTEM_INFO;

        let mut system_info: SYSTEM_INFO = unsafe { core::mem::zeroed() };
        unsafe {
            GetSystemInfo(&mut system_info);
        }

        if system_info.dwPageSize == 0 {
            log::warn!("GetSystemInfo reported page size 0, using {FALLBACK_PAGE_SIZE}");
            return FALLBACK_PAGE_SIZE;
        }

        system_info.dwPageSize as usize
    }

    pub fn reserve(size: usize, _page_size: usize) -> *mut c_void {
        use windows_sys::Win32::System::Memory::MEM_COMMIT;
        use windows_sys::Win32::System::Memory::MEM_RESERVE;
        use windows_sys::Win32::System::Memory::PAGE_READWRITE;
        use windows_sys::Win32::System::Memory::VirtualAlloc;

        // Committed pages are zero-filled.
        unsafe { VirtualAlloc(ptr::null(), size, MEM_RESERVE | MEM_COMMIT, PAGE_READWRITE) }
    }

    pub unsafe fn release(ptr: *mut c_void, _size: usize, _page_size: usize) -> bool {
        use windows_sys::Win32::System::Memory::MEM_RELEASE;
        use windows_sys::Win32::System::Memory::VirtualFree;

        // NOTE: MEM_RELEASE requires size 0, it always releases the whole reservation.
        unsafe { VirtualFree(ptr, 0, MEM_RELEASE) != 0 }
    }
}

// Without a virtual memory primitive, the zero-fill comes from alloc_zeroed and the page rounding
// is only nominal.
#[cfg(any(
    feature = "heap_fallback",
    not(any(target_family = "unix", target_family = "windows"))
))]
mod os {
    use core::alloc::Layout;

    use super::*;

    // Whatever page size the provider was configured with, blocks must be able to hold the
    // arena header at their start.
    const MIN_ALIGN: usize = 16;

    pub fn page_size() -> usize {
        FALLBACK_PAGE_SIZE
    }

    pub fn reserve(size: usize, page_size: usize) -> *mut c_void {
        let Ok(layout) = Layout::from_size_align(size, usize::max(page_size, MIN_ALIGN)) else {
            return ptr::null_mut();
        };

        // SAFETY: Size is nonzero, the provider never reserves empty blocks.
        unsafe { alloc::alloc::alloc_zeroed(layout) as *mut c_void }
    }

    pub unsafe fn release(ptr: *mut c_void, size: usize, page_size: usize) -> bool {
        let Ok(layout) = Layout::from_size_align(size, usize::max(page_size, MIN_ALIGN)) else {
            return false;
        };

        // SAFETY: The block was allocated with the same layout in reserve.
        unsafe { alloc::alloc::dealloc(ptr as *mut u8, layout) };

        true
    }
}
