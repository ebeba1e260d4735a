use core::alloc::Layout;
use core::fmt;
use core::marker::PhantomData;
use core::ops::Deref;
use core::ops::DerefMut;
use core::ops::Index;
use core::ops::IndexMut;
use core::ptr;
use core::ptr::NonNull;
use core::slice;

use bytemuck::Zeroable;
use cbarena::AllocError;
use cbarena::Allocator;
use cbbits::checked_align_up;

/// A growable array of `T`, storing its elements in memory obtained from an [`Allocator`].
///
/// The array doesn't hold on to the allocator. Every operation that (de)allocates takes it as a
/// parameter, and it has to be the same allocator every time. The lifetime `'a` ties the elements
/// to the borrow of that allocator.
///
/// Dropping the array doesn't give the memory back. Call [`DynArray::dealloc`] for that, or
/// just forget the array, if the arena it lives in is about to be reset anyway.
///
/// ```
/// use cbarena::Arena;
/// use cbarena::VirtualMemory;
/// use cbdynarray::DynArray;
///
/// let arena = Arena::new(VirtualMemory::new(), 1 << 20);
///
/// let mut indices: DynArray<u32> = DynArray::new();
/// for i in 0..100 {
///     indices.push(&arena, i);
/// }
///
/// assert!(indices.len() == 100);
/// assert!(indices[99] == 99);
///
/// indices.dealloc(&arena);
/// ```
pub struct DynArray<'a, T: Copy> {
    data: Option<NonNull<T>>,
    len: usize,
    capacity: usize,

    #[cfg(debug_assertions)]
    allocator_id: usize,

    _allocation: PhantomData<&'a mut [T]>,
}

impl<'a, T: Copy> DynArray<'a, T> {
    /// Creates an empty array without backing memory. Nothing is allocated until the first push.
    #[inline]
    pub const fn new() -> Self {
        // Zero-sized types would need zero-sized allocations, which allocators reject.
        const { assert!(size_of::<T>() > 0) };

        Self {
            data: None,
            len: 0,
            capacity: 0,

            #[cfg(debug_assertions)]
            allocator_id: 0,

            _allocation: PhantomData,
        }
    }

    /// Creates an array of `num_elements` zeroed elements with room for `capacity` elements.
    ///
    /// A `capacity` of 0 means an exact fit. Otherwise `capacity` must not be smaller than
    /// `num_elements`. An array with no capacity is created without backing memory.
    #[track_caller]
    pub fn create<A>(allocator: &'a A, num_elements: usize, capacity: usize) -> Self
    where
        A: Allocator + ?Sized,
        T: Zeroable,
    {
        let mut array = Self::new();
        array.reserve(allocator, num_elements, capacity);
        array
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub const fn remaining_capacity(&self) -> usize {
        self.capacity - self.len
    }

    /// Returns whether the array has backing memory.
    #[inline]
    pub const fn is_backed(&self) -> bool {
        self.data.is_some()
    }

    /// Returns the pointer to the backing memory. Panics if there is none.
    #[inline]
    #[track_caller]
    pub fn data(&self) -> NonNull<T> {
        match self.data {
            Some(data) => data,
            None => panic!("DynArray has no backing memory"),
        }
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }

        let data = self.data?;

        // SAFETY: Everything up to len is initialized.
        Some(unsafe { data.add(index).as_ref() })
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len {
            return None;
        }

        let data = self.data?;

        // SAFETY: Everything up to len is initialized, and we have a &mut.
        Some(unsafe { data.add(index).as_mut() })
    }

    #[inline]
    #[track_caller]
    pub fn front(&self) -> &T {
        match self.get(0) {
            Some(value) => value,
            None => panic!("Can't get the front of an empty DynArray"),
        }
    }

    #[inline]
    #[track_caller]
    pub fn back(&self) -> &T {
        match self.len.checked_sub(1).and_then(|last| self.get(last)) {
            Some(value) => value,
            None => panic!("Can't get the back of an empty DynArray"),
        }
    }

    /// Appends `value`, growing the backing memory if there is no capacity left.
    ///
    /// Growing allocates room for `capacity + capacity / 4 + 16` elements rounded up to a multiple
    /// of 8, copies the elements over and deallocates the old memory.
    pub fn try_push<A: Allocator + ?Sized>(&mut self, allocator: &'a A, value: T) -> Result<(), AllocError> {
        debug_assert!(self.len <= self.capacity);

        if self.len == self.capacity {
            self.grow(allocator)?;
        }

        let data = self.data();

        // SAFETY: len < capacity after growing.
        unsafe { data.add(self.len).write(value) };
        self.len += 1;

        Ok(())
    }

    /// Appends `value`, growing the backing memory if there is no capacity left. Running out of
    /// memory is fatal.
    #[inline]
    #[track_caller]
    pub fn push<A: Allocator + ?Sized>(&mut self, allocator: &'a A, value: T) {
        if let Err(err) = self.try_push(allocator, value) {
            log::error!("Failed to push value: {err}");
            panic!("Failed to push value: {err}");
        }
    }

    /// Removes the last element and returns it, or returns `None`, if the array is empty.
    /// Capacity is left untouched.
    #[inline]
    pub fn try_pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }

        self.len -= 1;

        let data = self.data?;

        // SAFETY: The element at the old len - 1 is initialized.
        Some(unsafe { data.add(self.len).read() })
    }

    /// Removes the last element and returns it. Popping an empty array panics.
    #[inline]
    #[track_caller]
    pub fn pop(&mut self) -> T {
        match self.try_pop() {
            Some(value) => value,
            None => panic!("Can't pop from an empty DynArray"),
        }
    }

    /// Allocates backing memory for an array that doesn't have any, and sets its length to
    /// `num_elements` zeroed elements.
    ///
    /// A `capacity` of 0 means an exact fit. Otherwise `capacity` must not be smaller than
    /// `num_elements`.
    #[track_caller]
    pub fn reserve<A>(&mut self, allocator: &'a A, num_elements: usize, capacity: usize)
    where
        A: Allocator + ?Sized,
        T: Zeroable,
    {
        assert!(self.data.is_none(), "Can only reserve for a DynArray without backing memory");
        let capacity = resolve_capacity(num_elements, capacity);

        let data = match allocate_elements::<T, A>(allocator, capacity) {
            Ok(data) => data,
            Err(err) => {
                log::error!("Failed to reserve DynArray: {err}");
                panic!("Failed to reserve DynArray: {err}");
            }
        };

        if let Some(data) = data {
            // SAFETY: The memory is fresh and has room for capacity >= num_elements elements.
            // Zeroes are a valid T.
            unsafe { data.write_bytes(0, num_elements) };
        }

        self.bind(allocator);

        self.data = data;
        self.len = num_elements;
        self.capacity = capacity;
    }

    /// Moves the elements to new backing memory with room for `max(capacity, num_elements)`
    /// elements and sets the length to `num_elements`.
    ///
    /// The first `min(len, num_elements)` elements are copied over, any elements above that are
    /// zeroed. This always reallocates, even if the current capacity would suffice.
    ///
    /// A `capacity` of 0 means an exact fit. Otherwise `capacity` must not be smaller than
    /// `num_elements`.
    #[track_caller]
    pub fn resize<A>(&mut self, allocator: &'a A, num_elements: usize, capacity: usize)
    where
        A: Allocator + ?Sized,
        T: Zeroable,
    {
        let capacity = resolve_capacity(num_elements, capacity);

        let data = match allocate_elements::<T, A>(allocator, capacity) {
            Ok(data) => data,
            Err(err) => {
                log::error!("Failed to resize DynArray: {err}");
                panic!("Failed to resize DynArray: {err}");
            }
        };

        let copy_count = usize::min(self.len, num_elements);
        if let Some(data) = data {
            // SAFETY: The new memory is fresh, so it doesn't overlap the old. Both have room for
            // copy_count elements, and everything from copy_count to num_elements fits as well.
            unsafe {
                if let Some(old_data) = self.data {
                    ptr::copy_nonoverlapping(old_data.as_ptr(), data.as_ptr(), copy_count);
                }
                data.add(copy_count).write_bytes(0, num_elements - copy_count);
            }
        }

        log::trace!(
            "Resized DynArray from {}/{} to {num_elements}/{capacity} elements",
            self.len,
            self.capacity,
        );

        self.release(allocator);
        self.bind(allocator);

        self.data = data;
        self.len = num_elements;
        self.capacity = capacity;
    }

    /// Gives the backing memory back to the allocator.
    #[inline]
    pub fn dealloc<A: Allocator + ?Sized>(mut self, allocator: &'a A) {
        self.release(allocator);
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        match self.data {
            // SAFETY: Everything up to len is initialized.
            Some(data) => unsafe { slice::from_raw_parts(data.as_ptr(), self.len) },
            None => &[],
        }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match self.data {
            // SAFETY: Everything up to len is initialized, and we have a &mut.
            Some(data) => unsafe { slice::from_raw_parts_mut(data.as_ptr(), self.len) },
            None => &mut [],
        }
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    #[inline(never)]
    fn grow<A: Allocator + ?Sized>(&mut self, allocator: &'a A) -> Result<(), AllocError> {
        let out_of_memory = AllocError::OutOfMemory {
            requested: usize::MAX,
            remaining: 0,
        };

        let new_capacity = self
            .capacity
            .checked_add(self.capacity / 4 + 16)
            .and_then(|c| checked_align_up(c, 8))
            .ok_or(out_of_memory)?;

        let new_data = allocate_elements::<T, A>(allocator, new_capacity)?;
        // The growth rule always adds at least 16, so there's something to allocate.
        let new_data = new_data.ok_or(out_of_memory)?;

        if let Some(old_data) = self.data {
            // SAFETY: The new memory is fresh, so it doesn't overlap the old, and it is larger.
            unsafe { ptr::copy_nonoverlapping(old_data.as_ptr(), new_data.as_ptr(), self.len) };
        }

        log::trace!("Growing DynArray from {} to {new_capacity} elements", self.capacity);

        self.release(allocator);
        self.bind(allocator);

        self.data = Some(new_data);
        self.capacity = new_capacity;

        Ok(())
    }

    fn release<A: Allocator + ?Sized>(&mut self, allocator: &'a A) {
        if let Some(data) = self.data.take() {
            #[cfg(debug_assertions)]
            debug_assert!(
                self.allocator_id == allocator_id(allocator),
                "DynArray must be deallocated by the allocator it was allocated with"
            );

            // SAFETY: We allocated this memory from the allocator with exactly this many
            // elements, and we no longer use it.
            unsafe { allocator.deallocate(self.capacity * size_of::<T>(), Some(data.cast())) };
        }
    }

    #[cfg(debug_assertions)]
    fn bind<A: Allocator + ?Sized>(&mut self, allocator: &'a A) {
        self.allocator_id = allocator_id(allocator);
    }

    #[cfg(not(debug_assertions))]
    fn bind<A: Allocator + ?Sized>(&mut self, _allocator: &'a A) {}
}

fn resolve_capacity(num_elements: usize, capacity: usize) -> usize {
    assert!(
        capacity == 0 || num_elements <= capacity,
        "Capacity {capacity} is smaller than the number of elements {num_elements}"
    );

    if capacity == 0 { num_elements } else { capacity }
}

fn allocate_elements<T, A: Allocator + ?Sized>(allocator: &A, capacity: usize) -> Result<Option<NonNull<T>>, AllocError> {
    if capacity == 0 {
        return Ok(None);
    }

    let layout = Layout::array::<T>(capacity).map_err(|_| AllocError::OutOfMemory {
        requested: usize::MAX,
        remaining: 0,
    })?;

    let data = allocator.allocate(layout)?;

    Ok(Some(data.cast()))
}

// Identifies the allocator across calls. References to the same arena, however many times
// wrapped, resolve to the arena itself.
#[cfg(debug_assertions)]
fn allocator_id<A: Allocator + ?Sized>(allocator: &A) -> usize {
    match allocator.as_arena() {
        Some(arena) => arena as *const cbarena::Arena as usize,
        None => allocator as *const A as *const () as usize,
    }
}

impl<T: Copy> Default for DynArray<'_, T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for DynArray<'_, T> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Copy + PartialEq> PartialEq<[T]> for DynArray<'_, T> {
    #[inline]
    fn eq(&self, rhs: &[T]) -> bool {
        self.as_slice() == rhs
    }
}

impl<T: Copy> Index<usize> for DynArray<'_, T> {
    type Output = T;

    #[inline]
    #[track_caller]
    fn index(&self, index: usize) -> &T {
        let len = self.len;
        match self.get(index) {
            Some(value) => value,
            None => panic!("Index {index} out of bounds for DynArray of length {len}"),
        }
    }
}

impl<T: Copy> IndexMut<usize> for DynArray<'_, T> {
    #[inline]
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut T {
        let len = self.len;
        match self.get_mut(index) {
            Some(value) => value,
            None => panic!("Index {index} out of bounds for DynArray of length {len}"),
        }
    }
}

impl<T: Copy> Deref for DynArray<'_, T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Copy> DerefMut for DynArray<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Copy> AsRef<[T]> for DynArray<'_, T> {
    #[inline]
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<'b, T: Copy> IntoIterator for &'b DynArray<'_, T> {
    type Item = &'b T;
    type IntoIter = slice::Iter<'b, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'b, T: Copy> IntoIterator for &'b mut DynArray<'_, T> {
    type Item = &'b mut T;
    type IntoIter = slice::IterMut<'b, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    extern crate alloc;

    use alloc::vec::Vec;
    use core::cell::Cell;

    use cbarena::Arena;
    use cbarena::VirtualMemory;
    use oorandom::Rand32;

    use super::*;

    fn arena() -> Arena {
        Arena::new(VirtualMemory::new(), 4 << 20)
    }

    // Forwards to an arena, counting calls.
    struct CountingAllocator<'a> {
        arena: &'a Arena,
        allocations: Cell<usize>,
        deallocations: Cell<usize>,
    }

    unsafe impl Allocator for CountingAllocator<'_> {
        fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
            self.allocations.set(self.allocations.get() + 1);
            self.arena.allocate(layout)
        }

        unsafe fn deallocate(&self, bytes: usize, ptr: Option<NonNull<u8>>) {
            self.deallocations.set(self.deallocations.get() + 1);
            unsafe { self.arena.deallocate(bytes, ptr) }
        }
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_push_get_len_pop() {
        let arena = arena();
        let mut v: DynArray<i32> = DynArray::new();

        assert!(v.len() == 0);
        assert!(!v.is_backed());

        v.push(&arena, 12);
        assert!(v.len() == 1);

        v.push(&arena, 13);
        assert!(v.len() == 2);

        assert!(v.get(0) == Some(&12));
        assert!(v.get(1) == Some(&13));
        assert!(v.get(2) == None);
        assert!(*v.front() == 12);
        assert!(*v.back() == 13);

        assert!(v.pop() == 13);
        assert!(v.len() == 1);
        assert!(v.pop() == 12);
        assert!(v.len() == 0);
        assert!(v.try_pop() == None);

        // Popping doesn't shrink.
        assert!(v.capacity() == 16);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_growth_schedule() {
        let arena = arena();
        let mut v: DynArray<u32> = DynArray::new();
        assert!(v.capacity() == 0);

        v.push(&arena, 0);
        assert!(v.capacity() == 16);

        for i in 1..16 {
            v.push(&arena, i);
        }
        assert!(v.capacity() == 16);

        v.push(&arena, 16);
        assert!(v.len() == 17);
        assert!(v.capacity() == 40);

        for i in 17..41 {
            v.push(&arena, i);
        }
        assert!(v.capacity() == 72);

        for (i, &value) in v.iter().enumerate() {
            assert!(value == i as u32);
        }
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_growth_allocates_and_deallocates_once() {
        let arena = arena();
        let allocator = CountingAllocator {
            arena: &arena,
            allocations: Cell::new(0),
            deallocations: Cell::new(0),
        };

        let mut v: DynArray<u64> = DynArray::new();

        v.push(&allocator, 1);
        assert!(allocator.allocations.get() == 1);
        // There was nothing to deallocate yet.
        assert!(allocator.deallocations.get() == 0);

        for i in 1..16 {
            v.push(&allocator, i);
        }
        assert!(allocator.allocations.get() == 1);

        v.push(&allocator, 16);
        assert!(allocator.allocations.get() == 2);
        assert!(allocator.deallocations.get() == 1);

        v.dealloc(&allocator);
        assert!(allocator.deallocations.get() == 2);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_push_matches_reserve() {
        let arena = arena();
        let mut r = Rand32::new(0);

        for _ in 0..20 {
            let n = r.rand_range(1..500) as usize;
            let values: Vec<u32> = (0..n).map(|_| r.rand_u32()).collect();

            let mut pushed: DynArray<u32> = DynArray::new();
            for &value in &values {
                pushed.push(&arena, value);
            }

            let mut reserved: DynArray<u32> = DynArray::new();
            reserved.reserve(&arena, n, 0);
            for (i, &value) in values.iter().enumerate() {
                reserved[i] = value;
            }

            assert!(pushed.len() == reserved.len());
            for i in 0..n {
                assert!(pushed[i] == reserved[i]);
            }
            assert!(pushed == *values.as_slice());
        }
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_push_pop_inverse() {
        let arena = arena();
        let mut r = Rand32::new(1);
        let mut v: DynArray<u16> = DynArray::new();

        v.push(&arena, 7);

        for _ in 0..200 {
            let len = v.len();
            let value = r.rand_u32() as u16;

            v.push(&arena, value);
            assert!(v.pop() == value);
            assert!(v.len() == len);

            // Keep the array growing, so that pushes cross growth boundaries.
            v.push(&arena, value);
        }
    }

    #[test]
    #[should_panic(expected = "empty DynArray")]
    fn test_pop_empty() {
        let mut v: DynArray<u8> = DynArray::new();
        v.pop();
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    #[should_panic(expected = "out of bounds")]
    fn test_index_out_of_bounds() {
        let arena = arena();
        let v: DynArray<u8> = DynArray::create(&arena, 4, 8);
        let _ = v[4];
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_index_unbacked() {
        let v: DynArray<u8> = DynArray::new();
        let _ = v[0];
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_create() {
        let arena = arena();

        let exact: DynArray<u32> = DynArray::create(&arena, 10, 0);
        assert!(exact.len() == 10);
        assert!(exact.capacity() == 10);
        assert!(exact.iter().all(|&v| v == 0));

        let roomy: DynArray<u32> = DynArray::create(&arena, 10, 32);
        assert!(roomy.len() == 10);
        assert!(roomy.capacity() == 32);

        let empty: DynArray<u32> = DynArray::create(&arena, 0, 0);
        assert!(empty.len() == 0);
        assert!(!empty.is_backed());
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_create_zeroes_reused_memory() {
        let mut arena = arena();
        let checkpoint = arena.checkpoint();

        {
            let mut dirty: DynArray<u8> = DynArray::create(&arena, 64, 0);
            dirty.as_mut_slice().fill(0xFF);
        }

        arena.set_checkpoint(checkpoint);

        let clean: DynArray<u8> = DynArray::create(&arena, 64, 0);
        assert!(clean.iter().all(|&v| v == 0));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    #[should_panic(expected = "smaller than the number of elements")]
    fn test_create_capacity_too_small() {
        let arena = arena();
        let _v: DynArray<u32> = DynArray::create(&arena, 10, 5);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    #[should_panic(expected = "without backing memory")]
    fn test_reserve_backed() {
        let arena = arena();
        let mut v: DynArray<u32> = DynArray::create(&arena, 1, 0);
        v.reserve(&arena, 10, 0);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_resize() {
        let arena = arena();

        let mut v: DynArray<i64> = DynArray::new();
        for i in 0..10 {
            v.push(&arena, i);
        }
        let old_data = v.data();

        // Always reallocates, even though capacity would suffice.
        v.resize(&arena, 12, 0);
        assert!(v.data() != old_data);
        assert!(v.len() == 12);
        assert!(v.capacity() == 12);
        assert!(v == [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 0, 0][..]);

        v.resize(&arena, 3, 8);
        assert!(v.len() == 3);
        assert!(v.capacity() == 8);
        assert!(v == [0, 1, 2][..]);

        v.push(&arena, 42);
        assert!(v == [0, 1, 2, 42][..]);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_resize_unbacked() {
        let arena = arena();

        let mut v: DynArray<u8> = DynArray::new();
        v.resize(&arena, 5, 0);
        assert!(v == [0, 0, 0, 0, 0][..]);

        v.resize(&arena, 0, 0);
        assert!(v.is_empty());
        assert!(!v.is_backed());
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_try_push_out_of_memory() {
        let arena = Arena::new(VirtualMemory::with_page_size(4096), 4096);

        // 16 elements of 256 bytes fill the whole arena, the next growth (40 elements) can't fit.
        let mut v: DynArray<[u8; 256]> = DynArray::new();
        for _ in 0..16 {
            v.push(&arena, [1; 256]);
        }

        let result = v.try_push(&arena, [2; 256]);
        assert!(matches!(result, Err(AllocError::OutOfMemory { .. })));
        assert!(v.len() == 16);
        assert!(v.capacity() == 16);
        assert!(v.iter().all(|x| x[0] == 1));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_iter_mut() {
        let arena = arena();
        let mut v: DynArray<i32> = DynArray::new();

        v.push(&arena, 12);
        v.push(&arena, 13);

        for x in &mut v {
            *x += 1;
        }

        let d = Vec::from_iter(v.iter().copied());
        assert!(d == &[13, 14]);

        v.sort_by(|a, b| b.cmp(a));
        assert!(v == [14, 13][..]);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_through_trait_object() {
        let arena = arena();
        let allocator: &dyn Allocator = &arena;

        let mut v: DynArray<f32> = DynArray::create(allocator, 2, 0);
        v[0] = 1.0;
        v[1] = 2.0;
        v.push(allocator, 3.0);

        assert!(v == [1.0, 2.0, 3.0][..]);
        v.dealloc(allocator);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[cfg_attr(miri, ignore)]
    #[should_panic(expected = "allocator it was allocated with")]
    fn test_mixing_allocators() {
        let arena_a = arena();
        let arena_b = arena();

        let mut v: DynArray<u8> = DynArray::new();
        v.push(&arena_a, 1);
        for _ in 0..16 {
            v.push(&arena_b, 2);
        }
    }
}
