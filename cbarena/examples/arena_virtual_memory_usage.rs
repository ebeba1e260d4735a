use cbarena::Arena;
use cbarena::VirtualMemory;

// The arena gets its memory from the virtual memory provider as a single block. The first few
// bytes of the block hold the arena's bookkeeping, the rest is handed out by bumping an offset.
//
// Reserving large arenas is cheap. The OS only backs pages with physical memory once they are
// touched, so the reported memory use of the program stays low until the arena fills up.

fn main() {
    println!("Running arena virtual memory example:\n\n");

    let vm = VirtualMemory::new();

    let block = vm.reserve(1);
    println!(
        "Reserving 1B gave a block of {}B at {:p} (page size {}B)",
        block.size(),
        block.ptr(),
        vm.page_size(),
    );
    vm.release(block);

    let arena = Arena::new(vm, 1 << 30);
    println!(
        "Arena (before use) has reserved size {}MB in a block of {}MB, allocated size {}KB",
        arena.reserved_size() >> 20,
        arena.block_size() >> 20,
        arena.allocated_size() >> 10,
    );

    for i in 0..64 {
        let p = arena.alloc(1 << 20, 4096);
        unsafe { p.write_bytes(i as u8, 1 << 20) };
    }

    println!(
        "Arena (after use) has reserved size {}MB, allocated size {}MB, remaining size {}MB",
        arena.reserved_size() >> 20,
        arena.allocated_size() >> 20,
        arena.remaining_size() >> 20,
    );

    let too_big = Arena::try_new(vm, usize::MAX);
    println!("Creating an arena of usize::MAX bytes fails with: {}", too_big.unwrap_err());

    arena.destroy();
}
